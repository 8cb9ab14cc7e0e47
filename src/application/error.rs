use thiserror::Error;

use crate::explorer::ExplorerError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Address not found: {0}")]
    NotFound(String),

    #[error("Address already watched: {0}")]
    AlreadyWatched(String),

    #[error("Explorer error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<ExplorerError> for AppError {
    fn from(err: ExplorerError) -> Self {
        match err {
            ExplorerError::InvalidArgument(msg) => AppError::Validation(msg),
            ExplorerError::Upstream(msg) => AppError::Upstream(msg),
        }
    }
}
