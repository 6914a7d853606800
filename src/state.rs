//! Device State
//!
//! The single shared record of last-known readings and switch states. Every
//! field group sits behind its own lock so that the collector writing a
//! reading and the dispatcher answering a query never observe a partial value.

use crate::actuator::SwitchBank;
use climate_shared::{limits, SensorId, SwitchId};
use tokio::sync::RwLock;

/// A point-in-time copy of every field, in composite reply order
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatusSnapshot {
    pub temperature: [f32; limits::SENSOR_SLOTS],
    pub humidity: [f32; limits::SENSOR_SLOTS],
    pub switches: [bool; limits::SWITCH_COUNT],
}

/// Shared device state
#[derive(Debug, Default)]
pub struct DeviceState {
    temperature: [RwLock<f32>; limits::SENSOR_SLOTS],
    humidity: [RwLock<f32>; limits::SENSOR_SLOTS],
    switches: [RwLock<bool>; limits::SWITCH_COUNT],
}

impl DeviceState {
    /// Create a state with zeroed readings and every switch off
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn temperature(&self, sensor: SensorId) -> f32 {
        *self.temperature[sensor.index()].read().await
    }

    pub async fn humidity(&self, sensor: SensorId) -> f32 {
        *self.humidity[sensor.index()].read().await
    }

    pub async fn switch(&self, switch: SwitchId) -> bool {
        *self.switches[switch.index()].read().await
    }

    /// Store a new temperature for a sensor slot
    pub async fn set_temperature(&self, sensor: SensorId, value: f32) {
        *self.temperature[sensor.index()].write().await = value;
    }

    /// Store a new humidity for a sensor slot
    pub async fn set_humidity(&self, sensor: SensorId, value: f32) {
        *self.humidity[sensor.index()].write().await = value;
    }

    /// Drive a switch output and record the commanded value.
    ///
    /// The switch lock is held across the output write, so a concurrent
    /// reader sees either the old value or the new one, never a state where
    /// the line and the recorded value disagree.
    pub async fn apply_switch(&self, switch: SwitchId, on: bool, bank: &SwitchBank) {
        let mut state = self.switches[switch.index()].write().await;
        bank.drive(switch, on);
        *state = on;
    }

    /// Copy every field for the composite status reply
    pub async fn snapshot(&self) -> StatusSnapshot {
        let mut snapshot = StatusSnapshot::default();
        for sensor in SensorId::ALL {
            snapshot.temperature[sensor.index()] = self.temperature(sensor).await;
            snapshot.humidity[sensor.index()] = self.humidity(sensor).await;
        }
        for switch in SwitchId::ALL {
            snapshot.switches[switch.index()] = self.switch(switch).await;
        }
        snapshot
    }
}
