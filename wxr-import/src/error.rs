//! Error types for wxr-import
//!
//! Store and parse failures use [`wxr_common::Error`]. Attachment retrieval has
//! its own error type because each failure mode maps to a distinct diagnostic.

use thiserror::Error;

/// Transport-level failure while retrieving a remote file
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection refused, DNS failure, timeout before headers
    #[error("Remote server did not respond: {0}")]
    NoResponse(String),

    /// Writing the body to disk failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why an attachment could not be imported
#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("Fetching attachments is not allowed or an empty URL was provided")]
    FetchingDisabled,

    #[error("Could not reserve a file in the upload area: {0}")]
    UploadDir(String),

    #[error("Remote server did not respond: {0}")]
    NoResponse(String),

    #[error("Remote server returned error response {status} {reason}")]
    HttpStatus { status: u16, reason: String },

    #[error("Remote file is incorrect size (expected {expected} bytes, got {actual})")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("Zero size file downloaded")]
    ZeroSize,

    #[error("Remote file is too large, limit is {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Invalid file type")]
    InvalidFileType,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] wxr_common::Error),
}

impl AttachmentError {
    /// Diagnostic code for this failure
    pub fn code(&self) -> &'static str {
        match self {
            AttachmentError::FetchingDisabled => "ATTACHMENT_FETCH_DISABLED",
            AttachmentError::UploadDir(_) => "ATTACHMENT_UPLOAD_DIR",
            AttachmentError::NoResponse(_) => "ATTACHMENT_NO_RESPONSE",
            AttachmentError::HttpStatus { .. } => "ATTACHMENT_HTTP_STATUS",
            AttachmentError::SizeMismatch { .. } => "ATTACHMENT_SIZE_MISMATCH",
            AttachmentError::ZeroSize => "ATTACHMENT_ZERO_SIZE",
            AttachmentError::TooLarge { .. } => "ATTACHMENT_TOO_LARGE",
            AttachmentError::InvalidFileType => "ATTACHMENT_INVALID_TYPE",
            AttachmentError::Io(_) => "ATTACHMENT_IO",
            AttachmentError::Store(_) => "ATTACHMENT_STORE",
        }
    }
}

impl From<FetchError> for AttachmentError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NoResponse(msg) => AttachmentError::NoResponse(msg),
            FetchError::Io(e) => AttachmentError::Io(e),
        }
    }
}
