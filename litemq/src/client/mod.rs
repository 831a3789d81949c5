//! Serving client connections of the queue protocol.
pub mod conn;
pub(crate) mod handler;
