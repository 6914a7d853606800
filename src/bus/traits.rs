//! Two-wire bus trait abstraction

use std::fmt;

/// Status reported when a write transaction ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusStatus {
    /// Transaction completed
    Success,
    /// Transmit buffer overflowed
    BufferFull,
    /// Device did not acknowledge its address
    AddressNack,
    /// Device did not acknowledge a data byte
    DataNack,
    /// Unspecified bus fault
    Other,
    /// Clean not-acknowledged condition that leaves the bus usable
    NotAcknowledged,
    /// A status code the driver does not know
    Unknown(u8),
}

impl BusStatus {
    /// Map a raw driver status code
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => BusStatus::Success,
            1 => BusStatus::BufferFull,
            2 => BusStatus::AddressNack,
            3 => BusStatus::DataNack,
            4 => BusStatus::Other,
            7 => BusStatus::NotAcknowledged,
            other => BusStatus::Unknown(other),
        }
    }

    /// Raw driver status code
    pub fn code(self) -> u8 {
        match self {
            BusStatus::Success => 0,
            BusStatus::BufferFull => 1,
            BusStatus::AddressNack => 2,
            BusStatus::DataNack => 3,
            BusStatus::Other => 4,
            BusStatus::NotAcknowledged => 7,
            BusStatus::Unknown(code) => code,
        }
    }

    /// Whether the status should be reported as a bus fault
    pub fn is_fault(self) -> bool {
        !matches!(self, BusStatus::Success | BusStatus::NotAcknowledged)
    }
}

impl fmt::Display for BusStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusStatus::Success => write!(f, "success"),
            BusStatus::BufferFull => write!(f, "transmit buffer full"),
            BusStatus::AddressNack => write!(f, "address not acknowledged"),
            BusStatus::DataNack => write!(f, "data not acknowledged"),
            BusStatus::Other => write!(f, "bus error"),
            BusStatus::NotAcknowledged => write!(f, "not acknowledged"),
            BusStatus::Unknown(code) => write!(f, "unknown status {}", code),
        }
    }
}

/// Transaction primitives of a two-wire bus master
pub trait TwoWireBus: Send {
    /// Start buffering a write to the device at `address`
    fn begin_transaction(&mut self, address: u8);

    /// Queue one byte for the current write
    fn write(&mut self, byte: u8);

    /// Transmit the queued bytes. With `send_stop == false` the bus stays
    /// held so the next read continues the same transaction.
    fn end_transaction(&mut self, send_stop: bool) -> BusStatus;

    /// Read up to `count` bytes from `address`, returning how many arrived
    fn request_read(&mut self, address: u8, count: usize) -> usize;

    /// Take the next received byte
    fn read_byte(&mut self) -> u8;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        for code in [0u8, 1, 2, 3, 4, 7, 9] {
            assert_eq!(BusStatus::from_code(code).code(), code);
        }
        assert_eq!(BusStatus::from_code(9), BusStatus::Unknown(9));
    }

    #[test]
    fn test_fault_classification() {
        assert!(!BusStatus::Success.is_fault());
        assert!(!BusStatus::NotAcknowledged.is_fault());
        assert!(BusStatus::AddressNack.is_fault());
        assert!(BusStatus::DataNack.is_fault());
        assert!(BusStatus::Unknown(5).is_fault());
    }
}
