use thiserror::Error;

pub type Result<T> = std::result::Result<T, PackError>;

#[derive(Error, Debug)]
pub enum PackError {
    /// Request body does not have the expected shape; nothing was loaded.
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Unexpected failure outside any single file load
    #[error("Aggregation failed: {0}")]
    Internal(String),
}

impl PackError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
