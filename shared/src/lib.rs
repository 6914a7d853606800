//! Climate Node Shared Protocol Types
//!
//! This crate provides the command catalog, reply text format and frame codec
//! shared between the node firmware and the host-side controller.

pub mod catalog;
pub mod codec;
pub mod frame;
pub mod reply;

use bytes::Bytes;
use std::time::{SystemTime, UNIX_EPOCH};

pub use catalog::{Command, SensorId, SwitchId};
pub use frame::Frame;
pub use reply::{Reply, ReplyError};

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Protocol limits and timing constants
pub mod limits {
    /// Every command code on the wire is exactly this many ASCII bytes
    pub const COMMAND_CODE_LEN: usize = 10;

    /// Channel id used for every query reply
    pub const REPLY_CHANNEL_ID: u8 = 1;

    /// Number of temperature/humidity sensor slots
    pub const SENSOR_SLOTS: usize = 2;

    /// Number of on/off actuators
    pub const SWITCH_COUNT: usize = 4;

    /// Retries of the 3-byte sensor read before falling back to the cached value
    pub const SENSOR_READ_RETRIES: u32 = 100;

    /// Delay between sensor read attempts in milliseconds
    pub const SENSOR_RETRY_DELAY_MS: u64 = 1;

    /// Interval between collector polls in milliseconds
    pub const SENSOR_POLL_INTERVAL_MS: u64 = 2000;

    /// How long the host waits for a reply before retrying a query
    pub const REPLY_TIMEOUT_MS: u64 = 1000;

    /// Maximum query retries on the host before giving up
    pub const QUERY_MAX_RETRIES: u32 = 3;
}

/// A de-framed message handed over by the framing engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub channel_id: u8,
    pub sequence: u8,
    pub payload: Bytes,
    pub port: u8,
}

impl InboundMessage {
    /// Create a message with the given sequence number and payload
    pub fn new(channel_id: u8, sequence: u8, payload: impl Into<Bytes>, port: u8) -> Self {
        Self {
            channel_id,
            sequence,
            payload: payload.into(),
            port,
        }
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// A reply queued for transmission by the framing engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundReply {
    pub channel_id: u8,
    pub text: String,
}

impl OutboundReply {
    /// Create a reply on the fixed reply channel
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            channel_id: limits::REPLY_CHANNEL_ID,
            text: text.into(),
        }
    }

    /// Raw ASCII bytes as they go on the wire
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }
}
