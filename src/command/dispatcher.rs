//! Command dispatcher - matches inbound messages and runs their handlers

use super::handlers::{self, HandlerContext};
use super::outbound::OutboundQueue;
use crate::actuator::SwitchBank;
use crate::state::DeviceState;
use climate_shared::{limits, Command, InboundMessage, OutboundReply};
use std::sync::Arc;
use tracing::{debug, trace};

/// Result of dispatching one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Query answered; the reply has been queued
    Replied(OutboundReply),
    /// Switch command applied; nothing is sent back
    Applied,
    /// Payload too short or code not in the catalog; nothing happened
    Ignored,
}

/// Dispatches inbound commands against the device state
pub struct CommandDispatcher {
    state: Arc<DeviceState>,
    switches: SwitchBank,
    outbound: OutboundQueue,
}

impl CommandDispatcher {
    /// Create a new command dispatcher
    pub fn new(state: Arc<DeviceState>, switches: SwitchBank, outbound: OutboundQueue) -> Self {
        Self {
            state,
            switches,
            outbound,
        }
    }

    /// Handle one inbound message.
    ///
    /// Produces at most one side effect and at most one reply. Short and
    /// unknown payloads are dropped without a reply.
    pub async fn dispatch(&self, message: &InboundMessage) -> CommandResult {
        if message.len() < limits::COMMAND_CODE_LEN {
            trace!(
                "Dropping short payload: seq={} len={}",
                message.sequence,
                message.len()
            );
            return CommandResult::Ignored;
        }

        let Some(command) = Command::parse(&message.payload) else {
            trace!("Dropping unknown command: seq={}", message.sequence);
            return CommandResult::Ignored;
        };

        debug!(
            "Dispatching command: seq={} code={} port={}",
            message.sequence, command, message.port
        );

        let ctx = HandlerContext {
            state: &self.state,
            switches: &self.switches,
            sequence: message.sequence,
        };

        let reply = match command {
            Command::Status => handlers::handle_status(&ctx).await,
            Command::Temperature(sensor) => handlers::handle_temperature(&ctx, sensor).await,
            Command::Humidity(sensor) => handlers::handle_humidity(&ctx, sensor).await,
            Command::SwitchState(switch) => handlers::handle_switch_state(&ctx, switch).await,
            Command::SetSwitch { switch, on } => {
                handlers::handle_set_switch(&ctx, switch, on).await;
                return CommandResult::Applied;
            }
        };

        debug!("  Reply queued: {}", reply.text);
        self.outbound.submit(reply.clone());
        CommandResult::Replied(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::{Level, RecordingOutputs};
    use crate::command::outbound_queue;
    use climate_shared::{SensorId, SwitchId};
    use tokio::sync::mpsc::error::TryRecvError;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        dispatcher: CommandDispatcher,
        state: Arc<DeviceState>,
        outputs: Arc<RecordingOutputs>,
        replies: UnboundedReceiver<OutboundReply>,
    }

    fn harness() -> Harness {
        let state = Arc::new(DeviceState::new());
        let outputs = Arc::new(RecordingOutputs::default());
        let (queue, replies) = outbound_queue();
        let dispatcher =
            CommandDispatcher::new(state.clone(), SwitchBank::new(outputs.clone()), queue);
        Harness {
            dispatcher,
            state,
            outputs,
            replies,
        }
    }

    fn message(sequence: u8, payload: &'static [u8]) -> InboundMessage {
        InboundMessage::new(0, sequence, payload, 0)
    }

    impl Harness {
        async fn send(&self, sequence: u8, payload: &'static [u8]) -> CommandResult {
            self.dispatcher.dispatch(&message(sequence, payload)).await
        }

        fn next_reply(&mut self) -> Option<String> {
            self.replies.try_recv().ok().map(|r| r.text)
        }

        fn assert_no_reply(&mut self) {
            assert_eq!(self.replies.try_recv(), Err(TryRecvError::Empty));
        }
    }

    #[tokio::test]
    async fn test_temperature_and_humidity_queries() {
        let mut h = harness();
        h.state.set_temperature(SensorId::One, 21.5).await;
        h.state.set_temperature(SensorId::Two, -3.25).await;
        h.state.set_humidity(SensorId::One, 45.0).await;
        h.state.set_humidity(SensorId::Two, 61.126).await;

        h.send(1, b"get_temp01").await;
        h.send(2, b"get_temp02").await;
        h.send(3, b"get_humd01").await;
        h.send(4, b"get_humd02").await;

        assert_eq!(h.next_reply().as_deref(), Some("1:temp01=21.50"));
        assert_eq!(h.next_reply().as_deref(), Some("2:temp02=-3.25"));
        assert_eq!(h.next_reply().as_deref(), Some("3:humd01=45.00"));
        assert_eq!(h.next_reply().as_deref(), Some("4:humd02=61.13"));
        h.assert_no_reply();
    }

    #[tokio::test]
    async fn test_status_reply_field_order() {
        let mut h = harness();
        // Update in an order unrelated to the reply order
        h.send(0, b"set_sw04on").await;
        h.state.set_humidity(SensorId::Two, 4.0).await;
        h.state.set_temperature(SensorId::One, 1.0).await;
        h.send(0, b"set_sw02on").await;
        h.state.set_humidity(SensorId::One, 3.0).await;
        h.state.set_temperature(SensorId::Two, 2.0).await;

        let result = h.send(77, b"get_ardsta").await;

        let expected = "77:status=1.00;2.00;3.00;4.00;0;1;0;1";
        assert_eq!(result, CommandResult::Replied(OutboundReply::new(expected)));
        assert_eq!(h.next_reply().as_deref(), Some(expected));
        h.assert_no_reply();
    }

    #[tokio::test]
    async fn test_set_switch_drives_output_without_reply() {
        let mut h = harness();

        for (code, switch, line) in [
            (&b"set_sw01on"[..], SwitchId::One, 22),
            (&b"set_sw02on"[..], SwitchId::Two, 23),
            (&b"set_sw03on"[..], SwitchId::Three, 24),
            (&b"set_sw04on"[..], SwitchId::Four, 25),
        ] {
            assert_eq!(h.send(9, code).await, CommandResult::Applied);
            assert!(h.state.switch(switch).await);
            assert_eq!(h.outputs.level(line), Some(Level::High));
        }

        assert_eq!(h.send(9, b"set_sw03of").await, CommandResult::Applied);
        assert!(!h.state.switch(SwitchId::Three).await);
        assert_eq!(h.outputs.level(24), Some(Level::Low));

        h.assert_no_reply();
    }

    #[tokio::test]
    async fn test_repeated_on_is_idempotent() {
        let mut h = harness();
        for _ in 0..3 {
            h.send(1, b"set_sw01on").await;
            assert!(h.state.switch(SwitchId::One).await);
            assert_eq!(h.outputs.level(22), Some(Level::High));
        }
        h.assert_no_reply();
    }

    #[tokio::test]
    async fn test_alternating_switch_tracks_last_command() {
        let mut h = harness();
        let sequence: [(&'static [u8], bool); 5] = [
            (&b"set_sw02on"[..], true),
            (&b"set_sw02of"[..], false),
            (&b"set_sw02of"[..], false),
            (&b"set_sw02on"[..], true),
            (&b"set_sw02of"[..], false),
        ];

        for (i, (code, on)) in sequence.into_iter().enumerate() {
            h.send(0, code).await;
            h.send(i as u8, b"get_sw02st").await;
            let expected = format!("{}:sw02={}", i, if on { 1 } else { 0 });
            assert_eq!(h.next_reply(), Some(expected));
            assert_eq!(h.outputs.level(23), Some(Level::from(on)));
        }
    }

    #[tokio::test]
    async fn test_short_payloads_are_ignored() {
        let mut h = harness();
        for payload in [&b""[..], b"g", b"get_temp0", b"set_sw01o"] {
            assert_eq!(h.send(5, payload).await, CommandResult::Ignored);
        }
        h.assert_no_reply();
        assert_eq!(h.outputs.write_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_commands_are_ignored() {
        let mut h = harness();
        for payload in [
            &b"get_temp03"[..],
            b"GET_ARDSTA",
            b"set_sw05on",
            b"hello world",
            b" get_temp01",
        ] {
            assert_eq!(h.send(5, payload).await, CommandResult::Ignored);
        }
        h.assert_no_reply();
        assert_eq!(h.outputs.write_count(), 0);
        assert_eq!(h.state.snapshot().await, Default::default());
    }

    #[tokio::test]
    async fn test_trailing_payload_bytes_ignored() {
        let mut h = harness();
        assert_eq!(h.send(8, b"set_sw01on;extra").await, CommandResult::Applied);
        h.send(9, b"get_sw01st????").await;
        assert_eq!(h.next_reply().as_deref(), Some("9:sw01=1"));
    }

    #[tokio::test]
    async fn test_interleaved_sequences_correlate() {
        let mut h = harness();
        h.state.set_temperature(SensorId::One, 10.0).await;
        h.state.set_humidity(SensorId::Two, 20.0).await;

        h.send(200, b"get_humd02").await;
        h.send(3, b"set_sw01on").await;
        h.send(255, b"get_sw01st").await;
        h.send(0, b"get_temp01").await;

        assert_eq!(h.next_reply().as_deref(), Some("200:humd02=20.00"));
        assert_eq!(h.next_reply().as_deref(), Some("255:sw01=1"));
        assert_eq!(h.next_reply().as_deref(), Some("0:temp01=10.00"));
        h.assert_no_reply();
    }

    #[tokio::test]
    async fn test_every_catalog_entry() {
        for command in Command::all() {
            let mut h = harness();
            let payload = InboundMessage::new(0, 42, command.code().to_vec(), 0);
            let result = h.dispatcher.dispatch(&payload).await;

            if command.expects_reply() {
                let reply = h.next_reply().expect("query should reply");
                let key = command.reply_key().expect("query has a key");
                assert!(reply.starts_with(&format!("42:{}=", key)), "{}", reply);
                assert!(matches!(result, CommandResult::Replied(_)));
                assert_eq!(h.outputs.write_count(), 0);
            } else {
                assert_eq!(result, CommandResult::Applied);
                assert_eq!(h.outputs.write_count(), 1);
            }
            h.assert_no_reply();
        }
    }
}
