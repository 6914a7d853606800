//! Simulated two-wire bus
//!
//! Models a humidity/temperature device at [`DEVICE_ADDRESS`] that answers a
//! register-select write followed by a 3-byte read. Clones share the same
//! device, so a test can keep a handle while the sensor owns the bus.

use super::traits::{BusStatus, TwoWireBus};
use crate::sensor::{Quantity, DEVICE_ADDRESS};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::trace;

/// Status bits the device reports in the low byte of each measurement type
const TEMPERATURE_STATUS_BITS: u8 = 0b00;
const HUMIDITY_STATUS_BITS: u8 = 0b10;

#[derive(Debug, Default)]
struct SimDevice {
    temperature_raw: u16,
    humidity_raw: u16,
    selected: Option<u8>,
    tx_address: u8,
    tx_buffer: Vec<u8>,
    rx_buffer: VecDeque<u8>,
    short_reads: usize,
    forced_status: Option<u8>,
    read_requests: usize,
    #[cfg(test)]
    last_write: Option<WriteRecord>,
}

/// The most recent completed write transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRecord {
    pub address: u8,
    pub bytes: Vec<u8>,
    pub send_stop: bool,
}

impl SimDevice {
    fn response(&self) -> Option<[u8; 3]> {
        let (raw, status_bits) = match self.selected? {
            reg if reg == Quantity::Temperature.register() => {
                (self.temperature_raw, TEMPERATURE_STATUS_BITS)
            }
            reg if reg == Quantity::Humidity.register() => (self.humidity_raw, HUMIDITY_STATUS_BITS),
            _ => return None,
        };
        let [hi, lo] = raw.to_be_bytes();
        Some([hi, (lo & 0xFC) | status_bits, 0x00])
    }
}

/// Shared handle to a simulated device on its own bus
#[derive(Debug, Clone, Default)]
pub struct SimulatedBus {
    device: Arc<Mutex<SimDevice>>,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn device(&self) -> MutexGuard<'_, SimDevice> {
        self.device.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set the raw measurement words the device will report
    pub fn set_raw(&self, temperature: u16, humidity: u16) {
        let mut device = self.device();
        device.temperature_raw = temperature;
        device.humidity_raw = humidity;
    }

    /// Set the environment in physical units
    pub fn set_environment(&self, celsius: f32, relative_humidity: f32) {
        self.set_raw(
            Quantity::Temperature.raw_from_physical(celsius),
            Quantity::Humidity.raw_from_physical(relative_humidity),
        );
    }

    /// Make the next `count` read requests return a short (1 byte) response
    #[cfg(test)]
    pub fn fail_next_reads(&self, count: usize) {
        self.device().short_reads = count;
    }

    /// Force the status code of every following write transaction
    #[cfg(test)]
    pub fn force_status(&self, status: Option<BusStatus>) {
        self.device().forced_status = status.map(BusStatus::code);
    }

    /// Number of read requests issued so far
    #[cfg(test)]
    pub fn read_requests(&self) -> usize {
        self.device().read_requests
    }

    /// The last write transaction the device saw
    #[cfg(test)]
    pub fn last_write(&self) -> Option<WriteRecord> {
        self.device().last_write.clone()
    }
}

impl TwoWireBus for SimulatedBus {
    fn begin_transaction(&mut self, address: u8) {
        let mut device = self.device();
        device.tx_address = address;
        device.tx_buffer.clear();
    }

    fn write(&mut self, byte: u8) {
        self.device().tx_buffer.push(byte);
    }

    fn end_transaction(&mut self, send_stop: bool) -> BusStatus {
        let mut device = self.device();
        let record = WriteRecord {
            address: device.tx_address,
            bytes: device.tx_buffer.clone(),
            send_stop,
        };
        trace!(
            "[BUS] write 0x{:02X} {:02X?} stop={}",
            record.address,
            record.bytes,
            record.send_stop
        );
        #[cfg(test)]
        {
            device.last_write = Some(record);
        }
        if let Some(code) = device.forced_status {
            return BusStatus::from_code(code);
        }
        if device.tx_address != DEVICE_ADDRESS {
            return BusStatus::AddressNack;
        }
        let register = device.tx_buffer.first().copied();
        if register.is_some() {
            device.selected = register;
        }
        BusStatus::Success
    }

    fn request_read(&mut self, address: u8, count: usize) -> usize {
        let mut device = self.device();
        device.read_requests += 1;
        device.rx_buffer.clear();

        if address != DEVICE_ADDRESS {
            return 0;
        }

        if device.short_reads > 0 {
            device.short_reads -= 1;
            device.rx_buffer.push_back(0xEE);
            return device.rx_buffer.len().min(count);
        }

        match device.response() {
            Some(bytes) => {
                device.rx_buffer.extend(bytes.iter().take(count));
                device.rx_buffer.len()
            }
            None => 0,
        }
    }

    fn read_byte(&mut self) -> u8 {
        self.device().rx_buffer.pop_front().unwrap_or(0xFF)
    }
}
