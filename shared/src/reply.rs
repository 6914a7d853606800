//! Reply text format
//!
//! ```text
//! <decimal_sequence>:<key>=<value>[;<value>]*
//! ```
//!
//! The leading sequence number is the only thing tying a reply to the request
//! that caused it. The framing layer appends nothing else.

use std::fmt::Write;
use thiserror::Error;

/// Errors parsing a reply received by the host
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ReplyError {
    #[error("Missing ':' after sequence number")]
    MissingSequence,

    #[error("Invalid sequence number: {0}")]
    InvalidSequence(String),

    #[error("Missing '=' after reply key")]
    MissingKey,
}

/// Format a sensor reading the way it appears on the wire (two decimals)
pub fn format_reading(value: f32) -> String {
    format!("{:.2}", value)
}

/// Format a switch state the way it appears on the wire
pub fn format_switch(on: bool) -> &'static str {
    if on {
        "1"
    } else {
        "0"
    }
}

/// Build a complete reply text for `sequence`
pub fn format_reply<I, V>(sequence: u8, key: &str, values: I) -> String
where
    I: IntoIterator<Item = V>,
    V: AsRef<str>,
{
    let mut text = String::with_capacity(64);
    // Writing into a String cannot fail
    let _ = write!(text, "{}:{}=", sequence, key);
    for (i, value) in values.into_iter().enumerate() {
        if i > 0 {
            text.push(';');
        }
        text.push_str(value.as_ref());
    }
    text
}

/// A reply as seen by the host
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub sequence: u8,
    pub key: String,
    pub values: Vec<String>,
}

impl Reply {
    /// Parse reply text produced by [`format_reply`]
    pub fn parse(text: &str) -> Result<Self, ReplyError> {
        let (sequence, rest) = text.split_once(':').ok_or(ReplyError::MissingSequence)?;
        let sequence = sequence
            .parse::<u8>()
            .map_err(|_| ReplyError::InvalidSequence(sequence.to_string()))?;
        let (key, values) = rest.split_once('=').ok_or(ReplyError::MissingKey)?;

        Ok(Self {
            sequence,
            key: key.to_string(),
            values: values.split(';').map(str::to_string).collect(),
        })
    }

    /// First value as a reading
    pub fn reading(&self) -> Option<f32> {
        self.values.first()?.parse().ok()
    }

    /// First value as a switch state
    pub fn switch(&self) -> Option<bool> {
        match self.values.first()?.as_str() {
            "1" => Some(true),
            "0" => Some(false),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_value_reply() {
        let text = format_reply(12, "temp01", [format_reading(21.456)]);
        assert_eq!(text, "12:temp01=21.46");
    }

    #[test]
    fn test_composite_reply_joined() {
        let text = format_reply(0, "status", ["1.00", "2.00", "0", "1"]);
        assert_eq!(text, "0:status=1.00;2.00;0;1");
    }

    #[test]
    fn test_value_formatting() {
        assert_eq!(format_reading(0.0), "0.00");
        assert_eq!(format_reading(-46.85), "-46.85");
        assert_eq!(format_switch(true), "1");
        assert_eq!(format_switch(false), "0");
    }

    #[test]
    fn test_parse_composite() {
        let reply = Reply::parse("255:status=20.00;21.50;40.00;41.25;1;0;0;1").expect("parse failed");
        assert_eq!(reply.sequence, 255);
        assert_eq!(reply.key, "status");
        assert_eq!(reply.values.len(), 8);
        assert_eq!(reply.values[3], "41.25");
    }

    #[test]
    fn test_parse_typed_values() {
        let reading = Reply::parse("4:humd02=55.10").expect("parse failed");
        assert_eq!(reading.reading(), Some(55.10));

        let switch = Reply::parse("5:sw03=1").expect("parse failed");
        assert_eq!(switch.switch(), Some(true));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Reply::parse("temp01=1.00"), Err(ReplyError::MissingSequence));
        assert_eq!(
            Reply::parse("999:temp01=1.00"),
            Err(ReplyError::InvalidSequence("999".into()))
        );
        assert_eq!(Reply::parse("3:temp01"), Err(ReplyError::MissingKey));
    }
}
