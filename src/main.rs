mod actuator;
mod bus;
mod command;
mod link;
mod sensor;
mod state;

use actuator::{LoggingOutputs, SwitchBank};
use bus::SimulatedBus;
use command::{outbound_queue, CommandDispatcher};
use link::{LinkConfig, LinkEvent, LinkManager, LinkTransport};
use sensor::{Collector, CollectorConfig, RetryPolicy, TwoWireSensor};
use state::DeviceState;
use climate_shared::SensorId;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let transport = match std::env::args().nth(1) {
        Some(port) => LinkTransport::serial(port),
        None => LinkTransport::default(),
    };
    let config = LinkConfig {
        transport,
        ..Default::default()
    };

    info!("Climate node starting");
    info!("  Link: {:?}", config.transport);

    let state = Arc::new(DeviceState::new());

    // All switches start off
    let switches = SwitchBank::new(Arc::new(LoggingOutputs));
    switches.all_off();

    // Off-target the sensors sit on simulated buses
    let mut collector = Collector::new(state.clone(), CollectorConfig::default());
    for (slot, celsius, humidity) in [(SensorId::One, 21.5, 45.0), (SensorId::Two, 19.0, 60.0)] {
        let bus = SimulatedBus::new();
        bus.set_environment(celsius, humidity);
        collector.add_sensor(slot, TwoWireSensor::new(bus, RetryPolicy::default()));
    }
    let _collector_handle = collector.spawn();
    info!("Sensor collector started");

    let (outbound, outbound_rx) = outbound_queue();
    let dispatcher = CommandDispatcher::new(state.clone(), switches, outbound);
    let mut link = LinkManager::new(config, outbound_rx);

    // Main event loop
    loop {
        match link.recv().await {
            Some(LinkEvent::Connected { transport }) => {
                info!("Connected via {}", transport);
            }
            Some(LinkEvent::Disconnected { reason }) => {
                warn!("Disconnected: {}", reason);
            }
            Some(LinkEvent::Received(message)) => {
                dispatcher.dispatch(&message).await;
            }
            None => {
                error!("Link manager closed");
                break;
            }
        }
    }
}
