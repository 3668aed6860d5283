use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("Data directory not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to list directory: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Scan task failed: {0}")]
    Internal(String),
}

impl IndexerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    pub fn is_invalid_path(&self) -> bool {
        matches!(self, Self::InvalidPath(_))
    }
}
