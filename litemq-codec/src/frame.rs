//! Request and response frames of the LiteMQ protocol.
//!
//! Every frame on the wire looks like
//!
//! ```text
//! +------+-----------+----------------+------+
//! | type | size: u32 | body (size)    | 0xCE |
//! +------+-----------+----------------+------+
//! ```
//!
//! Clients send [`Request`] frames and the broker answers every request with exactly one
//! [`Response`] frame, in the order the requests arrived.
use bytes::Bytes;

pub const HEALTH: u8 = 0x01;
pub const ENQUEUE: u8 = 0x02;
pub const DEQUEUE: u8 = 0x03;
pub const LENGTH: u8 = 0x04;
pub const PURGE: u8 = 0x05;
pub const FLUSH: u8 = 0x06;

pub const HEALTH_OK: u8 = 0x11;
pub const QUEUE_LENGTH: u8 = 0x12;
pub const MESSAGE: u8 = 0x13;
pub const FLUSH_OK: u8 = 0x14;
pub const ERROR: u8 = 0x1F;

pub const FRAME_END: u8 = 0xCE;

/// Length of the type and size fields in front of the body.
pub const FRAME_HEADER_SIZE: usize = 5;

/// Error codes carried by [`Response::Error`] frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    /// Dequeue wait ran out of the requested time.
    Timeout = 408,
    /// Queue was purged while the consumer was waiting on it.
    Purged = 410,
    /// The client pipelined more requests than the connection buffers.
    TooManyRequests = 429,
    /// The consumer gave up waiting, typically because the connection is closing.
    Cancelled = 499,
    FrameError = 501,
    UnexpectedFrame = 505,
}

impl ErrorCode {
    pub fn from_u16(code: u16) -> Option<ErrorCode> {
        match code {
            408 => Some(ErrorCode::Timeout),
            410 => Some(ErrorCode::Purged),
            429 => Some(ErrorCode::TooManyRequests),
            499 => Some(ErrorCode::Cancelled),
            501 => Some(ErrorCode::FrameError),
            505 => Some(ErrorCode::UnexpectedFrame),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnqueueArgs {
    pub queue: String,
    pub data: Bytes,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DequeueArgs {
    pub queue: String,
    /// Maximum wait in milliseconds, 0 means waiting until the message arrives.
    pub timeout_ms: u32,
}

impl DequeueArgs {
    pub fn queue(mut self, queue: &str) -> Self {
        self.queue = queue.to_string();
        self
    }

    pub fn timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn frame(self) -> Frame {
        Frame::Request(Request::Dequeue(self))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorArgs {
    pub code: u16,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Health,
    Enqueue(EnqueueArgs),
    Dequeue(DequeueArgs),
    Length(String),
    Purge(String),
    Flush,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    HealthOk,
    /// Buffered message count, answer of Enqueue, Length and Purge.
    QueueLength(u64),
    Message(Bytes),
    FlushOk { queues: u64, messages: u64 },
    Error(ErrorArgs),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Request(Request),
    Response(Response),
}

pub fn health() -> Frame {
    Frame::Request(Request::Health)
}

pub fn enqueue(queue: &str, data: impl Into<Bytes>) -> Frame {
    Frame::Request(Request::Enqueue(EnqueueArgs {
        queue: queue.to_string(),
        data: data.into(),
    }))
}

pub fn dequeue(queue: &str) -> Frame {
    DequeueArgs::default().queue(queue).frame()
}

pub fn length(queue: &str) -> Frame {
    Frame::Request(Request::Length(queue.to_string()))
}

pub fn purge(queue: &str) -> Frame {
    Frame::Request(Request::Purge(queue.to_string()))
}

pub fn flush() -> Frame {
    Frame::Request(Request::Flush)
}

pub fn health_ok() -> Frame {
    Frame::Response(Response::HealthOk)
}

pub fn queue_length(count: u64) -> Frame {
    Frame::Response(Response::QueueLength(count))
}

pub fn message(data: Bytes) -> Frame {
    Frame::Response(Response::Message(data))
}

pub fn flush_ok(queues: u64, messages: u64) -> Frame {
    Frame::Response(Response::FlushOk { queues, messages })
}

pub fn error(code: ErrorCode, text: &str) -> Frame {
    Frame::Response(Response::Error(ErrorArgs {
        code: code as u16,
        text: text.to_string(),
    }))
}
