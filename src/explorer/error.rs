use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExplorerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Timeout, non-success status, transport failure or an unreadable body.
    #[error("Explorer request failed: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for ExplorerError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ExplorerError::Upstream(format!("request timed out: {}", err))
        } else {
            ExplorerError::Upstream(err.to_string())
        }
    }
}
