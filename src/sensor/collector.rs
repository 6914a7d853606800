//! Periodic sensor collector
//!
//! Polls every registered sensor on a fixed interval and stores the results in
//! the device state slot the sensor is wired to.

use super::two_wire::TwoWireSensor;
use crate::bus::TwoWireBus;
use crate::state::DeviceState;
use climate_shared::{limits, SensorId};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for the collector task
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Time between polls
    pub interval: Duration,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(limits::SENSOR_POLL_INTERVAL_MS),
        }
    }
}

/// Owns the sensors and writes their readings into the device state
pub struct Collector<B> {
    config: CollectorConfig,
    state: Arc<DeviceState>,
    sensors: Vec<(SensorId, TwoWireSensor<B>)>,
}

impl<B: TwoWireBus + 'static> Collector<B> {
    pub fn new(state: Arc<DeviceState>, config: CollectorConfig) -> Self {
        Self {
            config,
            state,
            sensors: Vec::new(),
        }
    }

    /// Register the sensor that feeds `slot`
    pub fn add_sensor(&mut self, slot: SensorId, sensor: TwoWireSensor<B>) {
        self.sensors.push((slot, sensor));
    }

    /// Read every sensor once and update the device state
    pub async fn poll_once(&mut self) {
        for (slot, sensor) in &mut self.sensors {
            let temperature = sensor.temperature().await;
            self.state.set_temperature(*slot, temperature).await;

            let humidity = sensor.humidity().await;
            self.state.set_humidity(*slot, humidity).await;

            debug!(
                "[COLLECTOR] sensor {}: {:.2} C, {:.2} %RH (bus faults: {})",
                slot.number(),
                temperature,
                humidity,
                sensor.bus_faults()
            );
        }
    }

    /// Run the polling loop on its own task
    pub fn spawn(mut self) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                "[COLLECTOR] Polling {} sensor(s) every {:?}",
                self.sensors.len(),
                self.config.interval
            );
            let mut ticker = interval(self.config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.poll_once().await;
            }
        })
    }
}
