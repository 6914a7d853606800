//! Query handlers (`get_*` commands)

use super::HandlerContext;
use climate_shared::reply::{format_reading, format_switch};
use climate_shared::{Command, OutboundReply, SensorId, SwitchId};

/// Handle `get_ardsta`
///
/// Values are always in the order temp1, temp2, hum1, hum2, sw1..sw4.
pub async fn handle_status(ctx: &HandlerContext<'_>) -> OutboundReply {
    let snapshot = ctx.state.snapshot().await;

    let values = snapshot
        .temperature
        .iter()
        .chain(snapshot.humidity.iter())
        .map(|v| format_reading(*v))
        .chain(snapshot.switches.iter().map(|on| format_switch(*on).to_string()));

    ctx.reply(Command::Status, values)
}

/// Handle `get_tempNN`
pub async fn handle_temperature(ctx: &HandlerContext<'_>, sensor: SensorId) -> OutboundReply {
    let value = ctx.state.temperature(sensor).await;
    ctx.reply(Command::Temperature(sensor), [format_reading(value)])
}

/// Handle `get_humdNN`
pub async fn handle_humidity(ctx: &HandlerContext<'_>, sensor: SensorId) -> OutboundReply {
    let value = ctx.state.humidity(sensor).await;
    ctx.reply(Command::Humidity(sensor), [format_reading(value)])
}

/// Handle `get_swNNst`
pub async fn handle_switch_state(ctx: &HandlerContext<'_>, switch: SwitchId) -> OutboundReply {
    let on = ctx.state.switch(switch).await;
    ctx.reply(Command::SwitchState(switch), [format_switch(on)])
}
