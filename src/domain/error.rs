use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    #[error("failed to fetch index: {0}")]
    IndexFetch(String),

    #[error("no entries found for '{package}'")]
    IndexEmpty { package: String },

    #[error("cancelled by user")]
    Cancelled,

    #[error("download preflight failed: {0}")]
    Preflight(String),

    #[error("transfer failed: {0}")]
    TransferIo(String),

    #[error("cannot write destination {path}: {message}")]
    Destination { path: String, message: String },

    #[error("terminal error: {0}")]
    Terminal(String),

    #[error("download interrupted")]
    Interrupted,
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        AppError::Terminal(error.to_string())
    }
}
