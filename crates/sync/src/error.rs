//! Sync error types

/// Sync result type
pub type Result<T> = std::result::Result<T, Error>;

/// Sync errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Channel closed")]
    Closed,

    #[error(transparent)]
    Core(#[from] pawpark_core::Error),
}
