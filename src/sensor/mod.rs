//! Temperature/Humidity Sensor Module
//!
//! Reads a two-wire humidity/temperature device and keeps the device state
//! current through a periodic collector.

mod collector;
mod retry;
mod two_wire;

pub use collector::{Collector, CollectorConfig};
pub use retry::RetryPolicy;
pub use two_wire::{Quantity, TwoWireSensor, DEVICE_ADDRESS};
