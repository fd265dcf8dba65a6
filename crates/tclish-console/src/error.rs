use tclish_core::{DbError, StateError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_yaml::Error),

    #[error("Malformed bundle archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Failed to fetch bundle {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Module {0} not found in the bundle")]
    ModuleNotFound(String),

    #[error("Importing module {module} failed: {message}")]
    Import { module: String, message: String },

    #[error("Invalid palette colour '{0}', expected #RRGGBB")]
    InvalidColor(String),

    #[error("The palette needs at least one colour")]
    EmptyPalette,

    #[error("Runtime is not available: {0}")]
    NotReady(String),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
