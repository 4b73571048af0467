use portal_core::error::PortalError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("file not found: {0}")]
    NotFound(String),

    /// The upload or locator is not acceptable (bad extension, empty
    /// payload, path tricks).
    #[error("rejected file: {0}")]
    Rejected(String),

    #[error("file is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
}

impl From<FileError> for PortalError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound(locator) => PortalError::not_found("file", locator),
            FileError::Rejected(_) | FileError::TooLarge { .. } => PortalError::Validation {
                message: err.to_string(),
            },
            FileError::Io(msg) => PortalError::Storage(msg),
        }
    }
}
