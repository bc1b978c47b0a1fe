use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageWriteError {
    #[error("storage request failed: {0}")]
    Transport(String),
    #[error("storage request timed out")]
    TimedOut,
    #[error("storage rejected the object (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("storage returned an unreadable response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for StorageWriteError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimedOut
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredictionFetchError {
    #[error("prediction request failed: {0}")]
    Transport(String),
    #[error("prediction request timed out")]
    TimedOut,
    #[error("prediction backend answered HTTP {status}")]
    Status { status: u16 },
    #[error("prediction backend returned an unreadable response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for PredictionFetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimedOut
        } else if err.is_decode() {
            Self::InvalidResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Failures of a user-triggered upload action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    #[error("no file selected")]
    NoFileSelected,
    #[error("an upload is already in progress")]
    UploadInFlight,
    #[error(transparent)]
    StorageWrite(#[from] StorageWriteError),
}
