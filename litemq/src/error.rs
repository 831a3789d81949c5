use std::fmt;

use litemq_codec::frame::{self, ErrorCode};

/// The own result type where the error part is a async friendly error.
pub type Result<T> = std::result::Result<T, Error>;

/// Shorthand of a boxed Send, Sync error.
pub type Error = Box<dyn std::error::Error + Send + Sync>;

/// Negative outcome of a dequeue which had to wait for a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DequeueError {
    /// The caller cancelled the wait before a message arrived.
    Cancelled,
    /// The queue was purged while the caller was waiting on it.
    Purged,
}

impl DequeueError {
    pub fn code(&self) -> ErrorCode {
        match self {
            DequeueError::Cancelled => ErrorCode::Cancelled,
            DequeueError::Purged => ErrorCode::Purged,
        }
    }

    pub fn into_frame(self) -> frame::Frame {
        frame::error(self.code(), &self.to_string())
    }
}

impl fmt::Display for DequeueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DequeueError::Cancelled => write!(f, "Dequeue cancelled"),
            DequeueError::Purged => write!(f, "Queue purged while waiting"),
        }
    }
}

impl std::error::Error for DequeueError {}

/// Runtime error of a connection, the client gets it as an error frame before the connection is
/// closed.
#[derive(Debug)]
pub struct RuntimeError {
    pub code: ErrorCode,
    pub text: String,
}

impl From<RuntimeError> for frame::Frame {
    fn from(err: RuntimeError) -> frame::Frame {
        frame::error(err.code, &err.text)
    }
}

impl<T> From<RuntimeError> for Result<T> {
    fn from(value: RuntimeError) -> Self {
        Err(Box::new(value))
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for RuntimeError {}

/// Helper to create runtime errors in functions returning `Result`.
pub fn runtime_error<T>(code: ErrorCode, text: &str) -> Result<T> {
    RuntimeError {
        code,
        text: text.to_owned(),
    }
    .into()
}
