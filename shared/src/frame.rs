//! Link frame message
//!
//! The unit carried by the frame transport between host and node. On the node
//! side a decoded frame becomes an [`InboundMessage`]; replies travel back as
//! frames on the fixed reply channel.

use prost::Message;
use thiserror::Error;

use crate::{InboundMessage, OutboundReply};

/// Errors converting a decoded frame into a node message
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame field {field} out of range: {value}")]
    FieldOutOfRange { field: &'static str, value: u32 },
}

#[derive(Clone, PartialEq, Message)]
pub struct Frame {
    #[prost(uint32, tag = "1")]
    pub channel_id: u32,

    #[prost(uint32, tag = "2")]
    pub sequence: u32,

    #[prost(uint32, tag = "3")]
    pub port: u32,

    #[prost(bytes = "vec", tag = "4")]
    pub payload: Vec<u8>,
}

impl Frame {
    /// Create a request frame carrying a command payload
    pub fn request(sequence: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            channel_id: 0,
            sequence: sequence.into(),
            port: 0,
            payload: payload.into(),
        }
    }

    /// Create a frame for a queued reply, numbered by the transmitting side
    pub fn reply(reply: &OutboundReply, sequence: u8) -> Self {
        Self {
            channel_id: reply.channel_id.into(),
            sequence: sequence.into(),
            port: 0,
            payload: reply.as_bytes().to_vec(),
        }
    }
}

fn narrow(field: &'static str, value: u32) -> Result<u8, FrameError> {
    u8::try_from(value).map_err(|_| FrameError::FieldOutOfRange { field, value })
}

impl TryFrom<Frame> for InboundMessage {
    type Error = FrameError;

    fn try_from(frame: Frame) -> Result<Self, Self::Error> {
        if frame.payload.len() > u8::MAX as usize {
            return Err(FrameError::FieldOutOfRange {
                field: "payload length",
                value: frame.payload.len() as u32,
            });
        }

        Ok(InboundMessage {
            channel_id: narrow("channel_id", frame.channel_id)?,
            sequence: narrow("sequence", frame.sequence)?,
            port: narrow("port", frame.port)?,
            payload: frame.payload.into(),
        })
    }
}
