use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, WormError>;

/// Errors that can occur while configuring, running or validating an evolutionary run.
#[derive(Debug, thiserror::Error)]
pub enum WormError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    /// A stored genome requested by the validator does not exist.
    #[error("NEAT genome file doesn't exist: {}", .0.display())]
    GenomeNotFound(PathBuf),

    #[error("Saved population doesn't exist: {}", .0.display())]
    PopulationNotFound(PathBuf),

    #[error("Invalid genome: {0}")]
    InvalidGenome(String),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
