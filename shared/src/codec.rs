//! Length-prefixed codec for link framing
//!
//! All frames are carried as:
//! ```text
//! [ 4 bytes: length (u32, big-endian) ][ N bytes: protobuf Frame ]
//! ```
//!
//! This keeps frame boundaries intact over TCP and serial byte streams.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;
use thiserror::Error;

use crate::Frame;

/// Maximum encoded frame size; node payloads never exceed 255 bytes
pub const MAX_FRAME_SIZE: u32 = 512;

/// Errors that can occur during encoding/decoding
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),

    #[error("Invalid frame length prefix: {0}")]
    InvalidLength(u32),

    #[error("Protobuf decode error: {0}")]
    DecodeError(#[from] prost::DecodeError),

    #[error("Protobuf encode error: {0}")]
    EncodeError(#[from] prost::EncodeError),
}

/// Encode a frame into a length-prefixed byte buffer
pub fn encode(frame: &Frame) -> Result<Bytes, CodecError> {
    let mut buf = BytesMut::new();
    encode_into(frame, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode a frame directly into a provided buffer
pub fn encode_into(frame: &Frame, buf: &mut BytesMut) -> Result<(), CodecError> {
    let frame_len = frame.encoded_len();

    if frame_len > MAX_FRAME_SIZE as usize {
        return Err(CodecError::FrameTooLarge(frame_len));
    }

    buf.reserve(4 + frame_len);
    buf.put_u32(frame_len as u32);
    frame.encode(buf)?;

    Ok(())
}

/// Try to decode a length-prefixed frame from a buffer
///
/// Returns:
/// - `Ok(Some(frame))` if a complete frame was decoded
/// - `Ok(None)` if more data is needed
/// - `Err(...)` if the data is invalid
pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
    if buf.len() < 4 {
        return Ok(None);
    }

    // Peek at the length prefix without consuming
    let frame_len = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);

    if frame_len > MAX_FRAME_SIZE {
        return Err(CodecError::InvalidLength(frame_len));
    }

    let total_len = 4 + frame_len as usize;
    if buf.len() < total_len {
        return Ok(None);
    }

    buf.advance(4);
    let frame_bytes = buf.split_to(frame_len as usize);
    let frame = Frame::decode(frame_bytes)?;

    Ok(Some(frame))
}

/// Decoder state machine for streaming decoding
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Partial frame data being accumulated
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a new frame decoder
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Add data to the decoder buffer
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame from the buffer
    ///
    /// Call this repeatedly until it returns `Ok(None)` to drain all complete frames
    pub fn decode_next(&mut self) -> Result<Option<Frame>, CodecError> {
        decode(&mut self.buffer)
    }

    /// Get the current buffer length (for debugging)
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }
}
