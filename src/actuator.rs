//! Actuator outputs
//!
//! Switches map onto digital output lines. The GPIO primitive itself belongs
//! to the board; the node only needs `set_output(line, level)`.

use climate_shared::{limits, SwitchId};
use std::sync::Arc;
use tracing::info;

/// Logic level of a digital output line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(on: bool) -> Self {
        if on {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Digital output primitive provided by the board
pub trait OutputLines: Send + Sync {
    fn set_output(&self, line: u8, level: Level);
}

/// Default output lines for switches 1..4
pub const DEFAULT_SWITCH_LINES: [u8; limits::SWITCH_COUNT] = [22, 23, 24, 25];

/// Maps each switch onto its output line
#[derive(Clone)]
pub struct SwitchBank {
    outputs: Arc<dyn OutputLines>,
    lines: [u8; limits::SWITCH_COUNT],
}

impl SwitchBank {
    /// Create a bank using the default line mapping
    pub fn new(outputs: Arc<dyn OutputLines>) -> Self {
        Self::with_lines(outputs, DEFAULT_SWITCH_LINES)
    }

    pub fn with_lines(outputs: Arc<dyn OutputLines>, lines: [u8; limits::SWITCH_COUNT]) -> Self {
        Self { outputs, lines }
    }

    /// Output line wired to a switch
    pub fn line(&self, switch: SwitchId) -> u8 {
        self.lines[switch.index()]
    }

    /// Set the output line for `switch`
    pub fn drive(&self, switch: SwitchId, on: bool) {
        self.outputs.set_output(self.line(switch), on.into());
    }

    /// Put every line into its safe (off) level
    pub fn all_off(&self) {
        for switch in SwitchId::ALL {
            self.drive(switch, false);
        }
    }
}

/// Output lines for running off-target: every write goes to the log
#[derive(Debug, Default)]
pub struct LoggingOutputs;

impl OutputLines for LoggingOutputs {
    fn set_output(&self, line: u8, level: Level) {
        info!("[GPIO] line {} -> {:?}", line, level);
    }
}

/// Output lines that remember the last level written to each line
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingOutputs {
    levels: std::sync::Mutex<std::collections::HashMap<u8, Level>>,
    writes: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl RecordingOutputs {
    pub fn level(&self, line: u8) -> Option<Level> {
        self.levels.lock().ok()?.get(&line).copied()
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[cfg(test)]
impl OutputLines for RecordingOutputs {
    fn set_output(&self, line: u8, level: Level) {
        if let Ok(mut levels) = self.levels.lock() {
            levels.insert(line, level);
        }
        self.writes.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }
}
