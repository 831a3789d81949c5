//! Data structures and converter functions for dealing with LiteMQ frames.
//!
//! All the data types are in the `frame` module, the `codec` implements
//! the encoding and the decoding.
pub mod codec;
pub mod frame;


use std::fmt;

/// Error struct used by the crate.
#[derive(Debug)]
pub struct FrameError {
    pub code: u16,
    pub message: String,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &self)
    }
}

impl std::error::Error for FrameError {}

impl From<FrameError> for std::io::Error {
    fn from(err: FrameError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    }
}

/// Shorthand for making errors with error code and error message.
///
/// ```no_run
/// use litemq_codec::frame_error;
/// use litemq_codec::FrameError;
///
/// fn non_empty(name: &str) -> Result<&str, FrameError> {
///     if name.is_empty() {
///         return frame_error!(10, "Queue name is empty");
///     }
///
///     Ok(name)
/// }
/// ```
#[macro_export]
macro_rules! frame_error {
    ($code:expr, $message:expr) => {
        ::std::result::Result::Err($crate::FrameError {
            code: $code,
            message: ::std::string::String::from($message),
        })
    };
}
