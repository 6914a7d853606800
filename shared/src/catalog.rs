//! Command Catalog
//!
//! The closed set of 10-byte command codes understood by the node. Lookup is
//! an exact comparison of the first [`COMMAND_CODE_LEN`] payload bytes; any
//! trailing bytes are reserved and ignored.

use crate::limits::COMMAND_CODE_LEN;
use std::fmt;

/// One of the two temperature/humidity sensor slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorId {
    One,
    Two,
}

impl SensorId {
    pub const ALL: [SensorId; 2] = [SensorId::One, SensorId::Two];

    /// Zero-based slot index
    pub fn index(self) -> usize {
        match self {
            SensorId::One => 0,
            SensorId::Two => 1,
        }
    }

    /// One-based number as it appears in command codes and reply keys
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

/// One of the four on/off actuators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SwitchId {
    One,
    Two,
    Three,
    Four,
}

impl SwitchId {
    pub const ALL: [SwitchId; 4] = [SwitchId::One, SwitchId::Two, SwitchId::Three, SwitchId::Four];

    /// Zero-based switch index
    pub fn index(self) -> usize {
        match self {
            SwitchId::One => 0,
            SwitchId::Two => 1,
            SwitchId::Three => 2,
            SwitchId::Four => 3,
        }
    }

    /// One-based number as it appears in command codes and reply keys
    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }
}

/// A recognised command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Composite query of every reading and switch
    Status,
    /// Query a single temperature reading
    Temperature(SensorId),
    /// Query a single humidity reading
    Humidity(SensorId),
    /// Drive a switch on or off (never replies)
    SetSwitch { switch: SwitchId, on: bool },
    /// Query a single switch state
    SwitchState(SwitchId),
}

type Code = [u8; COMMAND_CODE_LEN];

/// Every code the node answers to
static CATALOG: [(&Code, Command); 17] = [
    (b"get_ardsta", Command::Status),
    (b"get_temp01", Command::Temperature(SensorId::One)),
    (b"get_temp02", Command::Temperature(SensorId::Two)),
    (b"get_humd01", Command::Humidity(SensorId::One)),
    (b"get_humd02", Command::Humidity(SensorId::Two)),
    (b"set_sw01on", Command::SetSwitch { switch: SwitchId::One, on: true }),
    (b"set_sw01of", Command::SetSwitch { switch: SwitchId::One, on: false }),
    (b"get_sw01st", Command::SwitchState(SwitchId::One)),
    (b"set_sw02on", Command::SetSwitch { switch: SwitchId::Two, on: true }),
    (b"set_sw02of", Command::SetSwitch { switch: SwitchId::Two, on: false }),
    (b"get_sw02st", Command::SwitchState(SwitchId::Two)),
    (b"set_sw03on", Command::SetSwitch { switch: SwitchId::Three, on: true }),
    (b"set_sw03of", Command::SetSwitch { switch: SwitchId::Three, on: false }),
    (b"get_sw03st", Command::SwitchState(SwitchId::Three)),
    (b"set_sw04on", Command::SetSwitch { switch: SwitchId::Four, on: true }),
    (b"set_sw04of", Command::SetSwitch { switch: SwitchId::Four, on: false }),
    (b"get_sw04st", Command::SwitchState(SwitchId::Four)),
];

impl Command {
    /// Look up the command encoded in the first 10 bytes of `payload`.
    ///
    /// Returns `None` for payloads shorter than a command code and for codes
    /// that are not in the catalog.
    pub fn parse(payload: &[u8]) -> Option<Command> {
        let code = payload.get(..COMMAND_CODE_LEN)?;
        CATALOG
            .iter()
            .find(|(candidate, _)| candidate.as_slice() == code)
            .map(|(_, command)| *command)
    }

    /// The wire code for this command
    pub fn code(&self) -> &'static [u8; COMMAND_CODE_LEN] {
        use SensorId as S;
        use SwitchId as W;

        match *self {
            Command::Status => b"get_ardsta",
            Command::Temperature(S::One) => b"get_temp01",
            Command::Temperature(S::Two) => b"get_temp02",
            Command::Humidity(S::One) => b"get_humd01",
            Command::Humidity(S::Two) => b"get_humd02",
            Command::SetSwitch { switch: W::One, on: true } => b"set_sw01on",
            Command::SetSwitch { switch: W::One, on: false } => b"set_sw01of",
            Command::SetSwitch { switch: W::Two, on: true } => b"set_sw02on",
            Command::SetSwitch { switch: W::Two, on: false } => b"set_sw02of",
            Command::SetSwitch { switch: W::Three, on: true } => b"set_sw03on",
            Command::SetSwitch { switch: W::Three, on: false } => b"set_sw03of",
            Command::SetSwitch { switch: W::Four, on: true } => b"set_sw04on",
            Command::SetSwitch { switch: W::Four, on: false } => b"set_sw04of",
            Command::SwitchState(W::One) => b"get_sw01st",
            Command::SwitchState(W::Two) => b"get_sw02st",
            Command::SwitchState(W::Three) => b"get_sw03st",
            Command::SwitchState(W::Four) => b"get_sw04st",
        }
    }

    /// Key used in the reply text, `None` for commands that never reply
    pub fn reply_key(&self) -> Option<String> {
        match self {
            Command::Status => Some("status".into()),
            Command::Temperature(id) => Some(format!("temp{:02}", id.number())),
            Command::Humidity(id) => Some(format!("humd{:02}", id.number())),
            Command::SwitchState(id) => Some(format!("sw{:02}", id.number())),
            Command::SetSwitch { .. } => None,
        }
    }

    /// Whether the node answers this command with a reply
    pub fn expects_reply(&self) -> bool {
        !matches!(self, Command::SetSwitch { .. })
    }

    /// Every command in catalog order
    pub fn all() -> impl Iterator<Item = Command> {
        CATALOG.iter().map(|(_, command)| *command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.code()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique() {
        let codes: HashSet<_> = CATALOG.iter().map(|(code, _)| *code).collect();
        assert_eq!(codes.len(), CATALOG.len());

        let commands: Vec<_> = Command::all().collect();
        for (i, a) in commands.iter().enumerate() {
            for b in &commands[i + 1..] {
                assert_ne!(a, b, "duplicate command value in catalog");
            }
        }
    }

    #[test]
    fn test_code_agrees_with_table() {
        for (code, command) in CATALOG.iter() {
            assert_eq!(command.code(), *code, "{:?}", command);
        }
    }

    #[test]
    fn test_every_code_parses_to_itself() {
        for command in Command::all() {
            assert_eq!(Command::parse(command.code()), Some(command));
        }
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        assert_eq!(
            Command::parse(b"get_temp02 and then some"),
            Some(Command::Temperature(SensorId::Two))
        );
        assert_eq!(
            Command::parse(b"set_sw03onXYZ"),
            Some(Command::SetSwitch { switch: SwitchId::Three, on: true })
        );
    }

    #[test]
    fn test_short_payload_rejected() {
        assert_eq!(Command::parse(b""), None);
        assert_eq!(Command::parse(b"get_temp0"), None);
        assert_eq!(Command::parse(b"get_ardst"), None);
    }

    #[test]
    fn test_match_is_exact_and_case_sensitive() {
        assert_eq!(Command::parse(b"GET_ARDSTA"), None);
        assert_eq!(Command::parse(b"get_temp03"), None);
        assert_eq!(Command::parse(b"xget_temp01"), None);
        assert_eq!(Command::parse(b"set_sw05on"), None);
        assert_eq!(Command::parse(b"get_sw01on"), None);
    }

    #[test]
    fn test_reply_keys() {
        assert_eq!(Command::Status.reply_key().as_deref(), Some("status"));
        assert_eq!(
            Command::Temperature(SensorId::Two).reply_key().as_deref(),
            Some("temp02")
        );
        assert_eq!(
            Command::Humidity(SensorId::One).reply_key().as_deref(),
            Some("humd01")
        );
        assert_eq!(
            Command::SwitchState(SwitchId::Four).reply_key().as_deref(),
            Some("sw04")
        );
        assert!(Command::SetSwitch { switch: SwitchId::One, on: true }
            .reply_key()
            .is_none());
    }

    #[test]
    fn test_display_is_wire_code() {
        assert_eq!(Command::SwitchState(SwitchId::Two).to_string(), "get_sw02st");
    }
}
