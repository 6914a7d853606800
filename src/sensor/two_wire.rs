//! Two-wire humidity/temperature sensor driver
//!
//! Each reading is a register-select write followed by a 3-byte read:
//! ```text
//! [ MSB ][ LSB (low 2 bits = status) ][ checksum ]
//! ```
//! Short reads are retried per [`RetryPolicy`]. When every attempt fails the
//! last valid reading for that quantity is returned instead.

use super::retry::RetryPolicy;
use crate::bus::TwoWireBus;
use tracing::{debug, trace, warn};

/// Bus address of the sensor device
pub const DEVICE_ADDRESS: u8 = 0x40;

/// Bytes in a measurement response
const RESPONSE_LEN: usize = 3;

/// Clears the status bits carried in the low byte
const STATUS_MASK: u8 = 0b1111_1100;

/// The two quantities the device measures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Humidity,
}

impl Quantity {
    /// Measurement register selected before reading
    pub fn register(self) -> u8 {
        match self {
            Quantity::Temperature => 0xF3,
            Quantity::Humidity => 0xF5,
        }
    }

    /// (scale, offset) of the linear raw-to-physical transform
    fn transform(self) -> (f32, f32) {
        match self {
            Quantity::Temperature => (0.002681274, -46.85),
            Quantity::Humidity => (0.001907349, -6.0),
        }
    }

    /// Convert a masked raw word into °C or %RH
    pub fn to_physical(self, raw: u16) -> f32 {
        let (scale, offset) = self.transform();
        raw as f32 * scale + offset
    }

    /// Nearest masked raw word for a physical value
    pub fn raw_from_physical(self, value: f32) -> u16 {
        let (scale, offset) = self.transform();
        let raw = ((value - offset) / scale).round().clamp(0.0, u16::MAX as f32) as u16;
        raw & 0xFFFC
    }

    fn index(self) -> usize {
        match self {
            Quantity::Temperature => 0,
            Quantity::Humidity => 1,
        }
    }
}

/// A decoded measurement
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorReading {
    pub raw16: u16,
    pub physical: f32,
}

impl SensorReading {
    pub fn from_raw(quantity: Quantity, raw16: u16) -> Self {
        Self {
            raw16,
            physical: quantity.to_physical(raw16),
        }
    }
}

/// Combine the first two response bytes into a big-endian word with the
/// status bits cleared. The checksum byte is not used.
pub fn decode_word(response: [u8; RESPONSE_LEN]) -> u16 {
    u16::from_be_bytes([response[0], response[1] & STATUS_MASK])
}

/// Driver for one sensor device on its own bus
pub struct TwoWireSensor<B> {
    bus: B,
    retry: RetryPolicy,
    /// Last valid reading per quantity
    last: [SensorReading; 2],
    /// Register-select writes that ended with a fault status
    bus_faults: u32,
}

impl<B: TwoWireBus> TwoWireSensor<B> {
    pub fn new(bus: B, retry: RetryPolicy) -> Self {
        Self {
            bus,
            retry,
            last: [SensorReading::default(); 2],
            bus_faults: 0,
        }
    }

    /// Temperature in °C
    pub async fn temperature(&mut self) -> f32 {
        self.read(Quantity::Temperature).await.physical
    }

    /// Relative humidity in %
    pub async fn humidity(&mut self) -> f32 {
        self.read(Quantity::Humidity).await.physical
    }

    /// Last valid reading for a quantity (zero before the first success)
    pub fn last_valid(&self, quantity: Quantity) -> SensorReading {
        self.last[quantity.index()]
    }

    /// Number of faulted register-select writes seen so far
    pub fn bus_faults(&self) -> u32 {
        self.bus_faults
    }

    /// Take a fresh reading, falling back to the last valid one on timeout
    pub async fn read(&mut self, quantity: Quantity) -> SensorReading {
        self.select_register(quantity.register());

        match self.fetch_response().await {
            Some(response) => {
                let reading = SensorReading::from_raw(quantity, decode_word(response));
                trace!(
                    "[SENSOR] {:?} raw=0x{:04X} -> {:.2}",
                    quantity,
                    reading.raw16,
                    reading.physical
                );
                self.last[quantity.index()] = reading;
                reading
            }
            None => {
                let stale = self.last_valid(quantity);
                debug!(
                    "[SENSOR] {:?} read timed out after {} attempts ({:?} waiting), using last value {:.2}",
                    quantity,
                    self.retry.max_attempts(),
                    self.retry.worst_case_delay(),
                    stale.physical
                );
                stale
            }
        }
    }

    /// Register-select write without a stop condition, so the following
    /// read continues the same transaction
    fn select_register(&mut self, register: u8) {
        self.bus.begin_transaction(DEVICE_ADDRESS);
        self.bus.write(register);
        let status = self.bus.end_transaction(false);
        if status.is_fault() {
            self.bus_faults += 1;
            warn!("[SENSOR] Two-wire bus error code {}: {}", status.code(), status);
        }
    }

    async fn fetch_response(&mut self) -> Option<[u8; RESPONSE_LEN]> {
        let mut retries = 0;
        loop {
            if self.bus.request_read(DEVICE_ADDRESS, RESPONSE_LEN) == RESPONSE_LEN {
                return Some([
                    self.bus.read_byte(),
                    self.bus.read_byte(),
                    self.bus.read_byte(),
                ]);
            }
            if retries >= self.retry.retries {
                return None;
            }
            retries += 1;
            tokio::time::sleep(self.retry.delay).await;
        }
    }
}
