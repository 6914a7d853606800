//! Switch command handler (`set_swNNon` / `set_swNNof`)

use super::HandlerContext;
use climate_shared::SwitchId;
use tracing::info;

/// Drive the switch output and record its new state. Never replies.
pub async fn handle_set_switch(ctx: &HandlerContext<'_>, switch: SwitchId, on: bool) {
    ctx.state.apply_switch(switch, on, ctx.switches).await;
    info!(
        "  [SWITCH] sw{:02} -> {} (line {})",
        switch.number(),
        if on { "on" } else { "off" },
        ctx.switches.line(switch)
    );
}
