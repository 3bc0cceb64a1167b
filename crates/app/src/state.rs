//! Application state management

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use pawpark_core::{
    Config, Error, FileTokenJar, JsonlMirror, Mirror, Moderator, Notifier, Result, SessionDeps,
    SqliteBackend,
};
use pawpark_sync::MirrorForwarder;
use tracing::info;

/// Environment variable overriding the config file location
pub const CONFIG_ENV: &str = "PAWPARK_CONFIG";

/// Environment variable naming the venue when no argument is given
pub const VENUE_ENV: &str = "PAWPARK_VENUE";

/// Long-lived resources shared by the console session
pub struct AppState {
    data_dir: PathBuf,
    pub config: Config,
    pub backend: Arc<SqliteBackend>,
    pub jar: Arc<FileTokenJar>,
    pub mirror: Option<Arc<JsonlMirror>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        Self::with_data_dir(Self::project_dirs()?.data_dir().to_path_buf(), config)
    }

    pub fn with_data_dir(data_dir: PathBuf, config: Config) -> Result<Self> {
        std::fs::create_dir_all(&data_dir)?;

        let db_path = config
            .storage
            .path
            .clone()
            .unwrap_or_else(|| data_dir.join("pawpark.db"));
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let backend = Arc::new(SqliteBackend::open(&db_path)?);
        let jar = Arc::new(FileTokenJar::new(data_dir.join("identity.cookie")));

        let mirror = match &config.mirror.path {
            Some(path) => Some(Arc::new(JsonlMirror::open(path)?)),
            None => None,
        };

        info!(db = %db_path.display(), mirror = mirror.is_some(), "Application state ready");

        Ok(Self {
            data_dir,
            config,
            backend,
            jar,
            mirror,
        })
    }

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "pawpark", "pawpark").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })
    }

    /// `$PAWPARK_CONFIG`, else `pawpark.toml` in the platform config dir
    pub fn config_path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::project_dirs()?.config_dir().join("pawpark.toml"))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Collaborators for a session. Mirror writes go through a background
    /// forwarder, so this must run inside the tokio runtime when a mirror
    /// is configured.
    pub fn session_deps(&self, notifier: Arc<dyn Notifier>) -> SessionDeps {
        let mut deps = SessionDeps::new(self.backend.clone(), self.jar.clone())
            .with_notifier(notifier)
            .with_moderator(Moderator::with_extra(&self.config.moderation.extra_words));

        if let Some(mirror) = &self.mirror {
            let inner: Arc<dyn Mirror> = mirror.clone();
            deps = deps.with_mirror(Arc::new(MirrorForwarder::spawn(inner)));
        }
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pawpark_core::{NoopNotifier, Venue};
    use tempfile::tempdir;

    #[test]
    fn test_state_creates_store_in_data_dir() {
        let dir = tempdir().unwrap();
        let state = AppState::with_data_dir(dir.path().join("data"), Config::default()).unwrap();

        assert!(dir.path().join("data").join("pawpark.db").exists());
        assert_eq!(state.jar.path(), dir.path().join("data").join("identity.cookie"));
        assert!(state.mirror.is_none());
    }

    #[tokio::test]
    async fn test_session_deps_carry_config() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.moderation.extra_words = vec!["grr".into()];
        config.mirror.path = Some(dir.path().join("mirror.jsonl"));
        let state = AppState::with_data_dir(dir.path().to_path_buf(), config).unwrap();

        let deps = state.session_deps(Arc::new(NoopNotifier));
        assert_eq!(deps.moderator.mask("grr dog"), "*** dog");
        assert!(deps.mirror.is_some());

        let bootstrap = deps.bootstrap(None, &state.config.default_venue());
        assert_eq!(bootstrap.venue, Venue::default());
    }
}
