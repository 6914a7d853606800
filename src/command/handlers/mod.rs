//! Command handlers for the catalog entries

mod query;
mod switch;

pub use query::{handle_humidity, handle_status, handle_switch_state, handle_temperature};
pub use switch::handle_set_switch;

use crate::actuator::SwitchBank;
use crate::state::DeviceState;
use climate_shared::{reply, Command, OutboundReply};

/// Context passed to command handlers
#[derive(Clone, Copy)]
pub struct HandlerContext<'a> {
    pub state: &'a DeviceState,
    pub switches: &'a SwitchBank,
    /// Sequence number of the request being handled
    pub sequence: u8,
}

impl HandlerContext<'_> {
    /// Build the reply for `command` from already formatted values
    fn reply<I, V>(&self, command: Command, values: I) -> OutboundReply
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let key = command.reply_key().unwrap_or_default();
        OutboundReply::new(reply::format_reply(self.sequence, &key, values))
    }
}
