//! Outbound reply queue
//!
//! The dispatcher only appends; the link drains the queue and owns
//! transmission ordering.

use climate_shared::OutboundReply;
use tokio::sync::mpsc;
use tracing::warn;

/// Append-only handle to the outbound reply queue
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<OutboundReply>,
}

/// Create the reply queue and the receiver the link drains
pub fn outbound_queue() -> (OutboundQueue, mpsc::UnboundedReceiver<OutboundReply>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutboundQueue { tx }, rx)
}

impl OutboundQueue {
    /// Queue a reply for transmission (fire-and-forget)
    pub fn submit(&self, reply: OutboundReply) {
        if self.tx.send(reply).is_err() {
            warn!("[CMD] Outbound queue closed, reply dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replies_keep_submission_order() {
        let (queue, mut rx) = outbound_queue();
        queue.submit(OutboundReply::new("1:sw01=0"));
        queue.submit(OutboundReply::new("2:sw02=1"));

        assert_eq!(rx.recv().await.map(|r| r.text), Some("1:sw01=0".into()));
        assert_eq!(rx.recv().await.map(|r| r.text), Some("2:sw02=1".into()));
    }

    #[test]
    fn test_submit_after_close_does_not_panic() {
        let (queue, rx) = outbound_queue();
        drop(rx);
        queue.submit(OutboundReply::new("0:temp01=0.00"));
    }
}
