use crate::frame::*;
use crate::{frame_error, FrameError};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Frames with a bigger body than this are refused by the decoder.
pub const MAX_FRAME_SIZE: usize = 64 * 1024 * 1024;

const FRAME_ERROR_CODE: u16 = ErrorCode::FrameError as u16;

/// Placeholder for LiteMQ encoder and decoder functions.
pub struct LiteCodec {}

impl Encoder<Frame> for LiteCodec {
    type Error = std::io::Error;

    fn encode(&mut self, event: Frame, buf: &mut BytesMut) -> Result<(), Self::Error> {
        let start = buf.len();

        let frame_type = match &event {
            Frame::Request(request) => request_type(request),
            Frame::Response(response) => response_type(response),
        };

        buf.put_u8(frame_type);
        // size is patched once the body is written
        buf.put_u32(0);

        let result = match event {
            Frame::Request(request) => encode_request(buf, request),
            Frame::Response(response) => encode_response(buf, response),
        };

        if let Err(e) = result {
            buf.truncate(start);

            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }

        let body_len = buf.len() - start - FRAME_HEADER_SIZE;

        if body_len > MAX_FRAME_SIZE {
            buf.truncate(start);

            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Frame body is too large ({} bytes)", body_len),
            ));
        }

        buf[start + 1..start + FRAME_HEADER_SIZE].copy_from_slice(&(body_len as u32).to_be_bytes());
        buf.put_u8(FRAME_END);

        Ok(())
    }
}

impl Decoder for LiteCodec {
    type Item = Frame;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }

        let body_len = frame_body_len(src);

        if body_len > MAX_FRAME_SIZE {
            return Err(frame_error(format!("Frame body is too large ({} bytes)", body_len)));
        }

        let frame_len = FRAME_HEADER_SIZE + body_len + 1;

        if src.len() < frame_len {
            src.reserve(frame_len - src.len());

            return Ok(None);
        }

        let frame_type = src.get_u8();
        src.advance(4);

        let mut body = src.split_to(body_len).freeze();

        if src.get_u8() != FRAME_END {
            return Err(frame_error("Missing frame end marker"));
        }

        let frame = decode_body(frame_type, &mut body)?;

        if body.has_remaining() {
            return Err(frame_error(format!(
                "{} trailing bytes in frame {:02X}",
                body.remaining(),
                frame_type
            )));
        }

        Ok(Some(frame))
    }
}

fn frame_error(message: impl Into<String>) -> std::io::Error {
    FrameError {
        code: FRAME_ERROR_CODE,
        message: message.into(),
    }
    .into()
}

/// Reads the size field of the frame header, the buffer needs to have the full header.
fn frame_body_len(src: &BytesMut) -> usize {
    let mut bs = [0u8; 4];
    bs.copy_from_slice(&src[1..FRAME_HEADER_SIZE]);

    u32::from_be_bytes(bs) as usize
}

fn request_type(request: &Request) -> u8 {
    match request {
        Request::Health => HEALTH,
        Request::Enqueue(_) => ENQUEUE,
        Request::Dequeue(_) => DEQUEUE,
        Request::Length(_) => LENGTH,
        Request::Purge(_) => PURGE,
        Request::Flush => FLUSH,
    }
}

fn response_type(response: &Response) -> u8 {
    match response {
        Response::HealthOk => HEALTH_OK,
        Response::QueueLength(_) => QUEUE_LENGTH,
        Response::Message(_) => MESSAGE,
        Response::FlushOk { .. } => FLUSH_OK,
        Response::Error(_) => ERROR,
    }
}

fn decode_body(frame_type: u8, body: &mut Bytes) -> Result<Frame, FrameError> {
    let frame = match frame_type {
        HEALTH => Frame::Request(Request::Health),
        ENQUEUE => {
            let queue = decode_short_string(body)?;
            let data = decode_long_bytes(body)?;

            Frame::Request(Request::Enqueue(EnqueueArgs { queue, data }))
        }
        DEQUEUE => {
            let queue = decode_short_string(body)?;
            let timeout_ms = decode_u32(body)?;

            Frame::Request(Request::Dequeue(DequeueArgs { queue, timeout_ms }))
        }
        LENGTH => Frame::Request(Request::Length(decode_short_string(body)?)),
        PURGE => Frame::Request(Request::Purge(decode_short_string(body)?)),
        FLUSH => Frame::Request(Request::Flush),
        HEALTH_OK => Frame::Response(Response::HealthOk),
        QUEUE_LENGTH => Frame::Response(Response::QueueLength(decode_u64(body)?)),
        MESSAGE => Frame::Response(Response::Message(decode_long_bytes(body)?)),
        FLUSH_OK => {
            let queues = decode_u64(body)?;
            let messages = decode_u64(body)?;

            Frame::Response(Response::FlushOk { queues, messages })
        }
        ERROR => {
            let code = decode_u16(body)?;
            let text = decode_short_string(body)?;

            Frame::Response(Response::Error(ErrorArgs { code, text }))
        }
        f => return frame_error!(FRAME_ERROR_CODE, format!("Unknown frame {:02X}", f)),
    };

    Ok(frame)
}

fn ensure_remaining(buf: &Bytes, len: usize) -> Result<(), FrameError> {
    if buf.remaining() < len {
        return frame_error!(
            FRAME_ERROR_CODE,
            format!("Frame is truncated, need {} bytes, got {}", len, buf.remaining())
        );
    }

    Ok(())
}

fn decode_u16(buf: &mut Bytes) -> Result<u16, FrameError> {
    ensure_remaining(buf, 2)?;

    Ok(buf.get_u16())
}

fn decode_u32(buf: &mut Bytes) -> Result<u32, FrameError> {
    ensure_remaining(buf, 4)?;

    Ok(buf.get_u32())
}

fn decode_u64(buf: &mut Bytes) -> Result<u64, FrameError> {
    ensure_remaining(buf, 8)?;

    Ok(buf.get_u64())
}

fn decode_short_string(buf: &mut Bytes) -> Result<String, FrameError> {
    let len = decode_u16(buf)? as usize;
    ensure_remaining(buf, len)?;

    let sb = buf.split_to(len);

    match String::from_utf8(sb.to_vec()) {
        Ok(s) => Ok(s),
        Err(_) => frame_error!(FRAME_ERROR_CODE, "String is not valid UTF-8"),
    }
}

fn decode_long_bytes(buf: &mut Bytes) -> Result<Bytes, FrameError> {
    let len = decode_u32(buf)? as usize;
    ensure_remaining(buf, len)?;

    Ok(buf.split_to(len))
}

fn encode_request(buf: &mut BytesMut, request: Request) -> Result<(), FrameError> {
    match request {
        Request::Health | Request::Flush => Ok(()),
        Request::Enqueue(args) => {
            encode_short_string(buf, &args.queue)?;
            encode_long_bytes(buf, &args.data)
        }
        Request::Dequeue(args) => {
            encode_short_string(buf, &args.queue)?;
            buf.put_u32(args.timeout_ms);

            Ok(())
        }
        Request::Length(queue) | Request::Purge(queue) => encode_short_string(buf, &queue),
    }
}

fn encode_response(buf: &mut BytesMut, response: Response) -> Result<(), FrameError> {
    match response {
        Response::HealthOk => Ok(()),
        Response::QueueLength(count) => {
            buf.put_u64(count);

            Ok(())
        }
        Response::Message(data) => encode_long_bytes(buf, &data),
        Response::FlushOk { queues, messages } => {
            buf.put_u64(queues);
            buf.put_u64(messages);

            Ok(())
        }
        Response::Error(args) => {
            buf.put_u16(args.code);
            encode_short_string(buf, &args.text)
        }
    }
}

fn encode_short_string(buf: &mut BytesMut, s: &str) -> Result<(), FrameError> {
    if s.len() > u16::MAX as usize {
        return frame_error!(FRAME_ERROR_CODE, format!("String is too long ({} bytes)", s.len()));
    }

    buf.put_u16(s.len() as u16);
    buf.put(s.as_bytes());

    Ok(())
}

fn encode_long_bytes(buf: &mut BytesMut, data: &[u8]) -> Result<(), FrameError> {
    if data.len() > MAX_FRAME_SIZE {
        return frame_error!(FRAME_ERROR_CODE, format!("Data is too large ({} bytes)", data.len()));
    }

    buf.put_u32(data.len() as u32);
    buf.put(data);

    Ok(())
}
