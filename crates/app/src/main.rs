//! Pawpark - venue check-in console
//!
//! Check in at a dog park, see who is there now and who left recently,
//! and chat with the people present.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod console;
mod state;

use pawpark_core::Config;

/// Venue hint from the first argument (`venue=<slug>` or a bare slug),
/// else from `$PAWPARK_VENUE`
fn venue_hint(arg: Option<String>, env: Option<String>) -> Option<String> {
    arg.map(|a| match a.strip_prefix("venue=") {
        Some(slug) => slug.to_string(),
        None => a,
    })
    .filter(|slug| !slug.trim().is_empty())
    .or(env)
}

fn main() {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Pawpark");

    let config = match state::AppState::config_path().and_then(Config::load) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            std::process::exit(1);
        }
    };

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };
    let _guard = runtime.enter();

    let app_state = match state::AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application: {}", e);
            std::process::exit(1);
        }
    };

    let hint = venue_hint(
        std::env::args().nth(1),
        std::env::var(state::VENUE_ENV).ok(),
    );

    if let Err(e) = runtime.block_on(console::run(&app_state, hint)) {
        tracing::error!("Session ended with error: {}", e);
        std::process::exit(1);
    }
}
