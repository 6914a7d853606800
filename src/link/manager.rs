//! Link manager with automatic reconnection
//!
//! Owns the byte stream to the host controller. Inbound frames are decoded
//! and surfaced as [`LinkEvent::Received`]; queued replies are framed and
//! written back with a per-link transmit sequence.

use super::serial::{SerialConnector, DEFAULT_BAUD};
use super::tcp::TcpConnector;
use super::traits::{TransportConnector, TransportStream};
use anyhow::{anyhow, Result};
use bytes::BytesMut;
use climate_shared::codec::{self, FrameDecoder};
use climate_shared::{Frame, InboundMessage, OutboundReply};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Events emitted by the link manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Link is up
    Connected { transport: &'static str },
    /// Link dropped; a reconnect is scheduled
    Disconnected { reason: String },
    /// A command frame arrived
    Received(InboundMessage),
}

/// Which byte stream carries the frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTransport {
    Tcp { address: String },
    Serial { port: String, baud: u32 },
}

impl LinkTransport {
    pub fn serial(port: impl Into<String>) -> Self {
        LinkTransport::Serial {
            port: port.into(),
            baud: DEFAULT_BAUD,
        }
    }
}

impl Default for LinkTransport {
    fn default() -> Self {
        LinkTransport::Tcp {
            address: "127.0.0.1:7600".into(),
        }
    }
}

/// Configuration for the link manager
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub transport: LinkTransport,
    /// Reconnection delay (initial)
    pub reconnect_delay: Duration,
    /// Maximum reconnection delay
    pub max_reconnect_delay: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            transport: LinkTransport::default(),
            reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Keeps the link up and relays frames in both directions
pub struct LinkManager {
    event_rx: mpsc::Receiver<LinkEvent>,
}

impl LinkManager {
    /// Start the link loop, sending replies drained from `outbound_rx`
    pub fn new(config: LinkConfig, outbound_rx: mpsc::UnboundedReceiver<OutboundReply>) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<LinkEvent>(100);

        tokio::spawn(async move {
            link_loop(config, outbound_rx, event_tx).await;
        });

        Self { event_rx }
    }

    /// Receive the next link event
    pub async fn recv(&mut self) -> Option<LinkEvent> {
        self.event_rx.recv().await
    }
}

async fn link_loop(
    config: LinkConfig,
    outbound_rx: mpsc::UnboundedReceiver<OutboundReply>,
    event_tx: mpsc::Sender<LinkEvent>,
) {
    match config.transport.clone() {
        LinkTransport::Tcp { address } => {
            run_connector(TcpConnector::new(address), &config, outbound_rx, event_tx).await
        }
        LinkTransport::Serial { port, baud } => {
            run_connector(
                SerialConnector::new(port, baud),
                &config,
                outbound_rx,
                event_tx,
            )
            .await
        }
    }
}

fn next_delay(current: Duration, max: Duration) -> Duration {
    std::cmp::min(current * 2, max)
}

/// Connect, serve, and reconnect until the manager is dropped
async fn run_connector<C: TransportConnector>(
    connector: C,
    config: &LinkConfig,
    mut outbound_rx: mpsc::UnboundedReceiver<OutboundReply>,
    event_tx: mpsc::Sender<LinkEvent>,
) {
    let mut reconnect_delay = config.reconnect_delay;
    let mut tx_sequence: u8 = 0;

    loop {
        match timeout(config.connect_timeout, connector.connect()).await {
            Ok(Ok(stream)) => {
                reconnect_delay = config.reconnect_delay;

                let connected = LinkEvent::Connected {
                    transport: connector.name(),
                };
                if event_tx.send(connected).await.is_err() {
                    return;
                }

                let reason =
                    match run_session(stream, &mut outbound_rx, &event_tx, &mut tx_sequence).await
                    {
                        Ok(()) => return,
                        Err(e) => e.to_string(),
                    };

                if event_tx
                    .send(LinkEvent::Disconnected { reason })
                    .await
                    .is_err()
                {
                    return;
                }
            }
            Ok(Err(e)) => {
                debug!("{} connect failed: {:#}", connector.name(), e);
            }
            Err(_) => {
                debug!("{} connect timed out", connector.name());
            }
        }

        if event_tx.is_closed() {
            return;
        }

        tokio::time::sleep(reconnect_delay).await;
        reconnect_delay = next_delay(reconnect_delay, config.max_reconnect_delay);
    }
}

/// Serve one established link.
///
/// Returns `Ok(())` only when the event receiver is gone; any link failure is
/// an error carrying the disconnect reason.
async fn run_session<S: TransportStream>(
    stream: S,
    outbound_rx: &mut mpsc::UnboundedReceiver<OutboundReply>,
    event_tx: &mpsc::Sender<LinkEvent>,
    tx_sequence: &mut u8,
) -> Result<()> {
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut decoder = FrameDecoder::new();
    let mut read_buf = BytesMut::with_capacity(1024);

    let result: Result<()> = async {
        loop {
            tokio::select! {
                Some(reply) = outbound_rx.recv() => {
                    let frame = Frame::reply(&reply, *tx_sequence);
                    *tx_sequence = tx_sequence.wrapping_add(1);

                    let encoded = codec::encode(&frame)?;
                    writer.write_all(&encoded).await?;
                }

                read = reader.read_buf(&mut read_buf) => {
                    let n = read.map_err(|e| anyhow!("Read error: {}", e))?;
                    if n == 0 {
                        return Err(anyhow!("Link closed by peer"));
                    }
                    decoder.extend(&read_buf);
                    read_buf.clear();

                    while let Some(frame) = decoder.decode_next()? {
                        let message = match InboundMessage::try_from(frame) {
                            Ok(message) => message,
                            Err(e) => {
                                warn!("Dropping malformed frame: {}", e);
                                continue;
                            }
                        };
                        if event_tx.send(LinkEvent::Received(message)).await.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
    .await;

    let mut stream = reader.unsplit(writer);
    if let Err(e) = TransportStream::shutdown(&mut stream).await {
        debug!("Link shutdown error: {}", e);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::{TcpListener, TcpStream};

    async fn read_frame(peer: &mut TcpStream, decoder: &mut FrameDecoder) -> Frame {
        let mut buf = [0u8; 256];
        loop {
            if let Some(frame) = decoder.decode_next().expect("decode failed") {
                return frame;
            }
            let n = peer.read(&mut buf).await.expect("read failed");
            assert!(n > 0, "link closed");
            decoder.extend(&buf[..n]);
        }
    }

    async fn start() -> (
        LinkManager,
        mpsc::UnboundedSender<OutboundReply>,
        TcpStream,
    ) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
        let config = LinkConfig {
            transport: LinkTransport::Tcp {
                address: listener.local_addr().expect("no addr").to_string(),
            },
            reconnect_delay: Duration::from_millis(10),
            ..Default::default()
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let mut manager = LinkManager::new(config, rx);
        let (peer, _) = listener.accept().await.expect("accept failed");

        assert_eq!(
            manager.recv().await,
            Some(LinkEvent::Connected { transport: "TCP" })
        );
        (manager, tx, peer)
    }

    #[tokio::test]
    async fn test_inbound_frames_become_messages() {
        let (mut manager, _tx, mut peer) = start().await;

        let mut bytes = BytesMut::new();
        codec::encode_into(&Frame::request(5, b"get_ardsta".to_vec()), &mut bytes)
            .expect("encode failed");
        codec::encode_into(&Frame::request(6, b"set_sw01on".to_vec()), &mut bytes)
            .expect("encode failed");
        peer.write_all(&bytes).await.expect("write failed");

        assert_eq!(
            manager.recv().await,
            Some(LinkEvent::Received(InboundMessage::new(0, 5, &b"get_ardsta"[..], 0)))
        );
        assert_eq!(
            manager.recv().await,
            Some(LinkEvent::Received(InboundMessage::new(0, 6, &b"set_sw01on"[..], 0)))
        );
    }

    #[tokio::test]
    async fn test_out_of_range_frame_is_dropped() {
        let (mut manager, _tx, mut peer) = start().await;

        let bad = Frame {
            channel_id: 0,
            sequence: 300,
            port: 0,
            payload: b"get_ardsta".to_vec(),
        };
        let mut bytes = BytesMut::new();
        codec::encode_into(&bad, &mut bytes).expect("encode failed");
        codec::encode_into(&Frame::request(7, b"get_temp01".to_vec()), &mut bytes)
            .expect("encode failed");
        peer.write_all(&bytes).await.expect("write failed");

        match manager.recv().await {
            Some(LinkEvent::Received(message)) => assert_eq!(message.sequence, 7),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_replies_use_reply_channel_and_tx_sequence() {
        let (_manager, tx, mut peer) = start().await;
        let mut decoder = FrameDecoder::new();

        tx.send(OutboundReply::new("9:temp01=21.50")).expect("send failed");
        tx.send(OutboundReply::new("10:sw02=1")).expect("send failed");

        let first = read_frame(&mut peer, &mut decoder).await;
        let second = read_frame(&mut peer, &mut decoder).await;

        assert_eq!(first.channel_id, 1);
        assert_eq!(first.sequence, 0);
        assert_eq!(first.payload, b"9:temp01=21.50");
        assert_eq!(second.sequence, 1);
        assert_eq!(second.payload, b"10:sw02=1");
    }

    #[tokio::test]
    async fn test_peer_close_reports_disconnect() {
        let (mut manager, _tx, peer) = start().await;
        drop(peer);

        match manager.recv().await {
            Some(LinkEvent::Disconnected { reason }) => assert!(reason.contains("closed")),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let max = Duration::from_secs(30);
        let mut delay = Duration::from_secs(1);
        let mut seen = Vec::new();
        for _ in 0..7 {
            seen.push(delay.as_secs());
            delay = next_delay(delay, max);
        }
        assert_eq!(seen, vec![1, 2, 4, 8, 16, 30, 30]);
    }

    #[test]
    fn test_default_transport() {
        assert_eq!(
            LinkConfig::default().transport,
            LinkTransport::Tcp {
                address: "127.0.0.1:7600".into()
            }
        );
        assert_eq!(
            LinkTransport::serial("/dev/ttyACM0"),
            LinkTransport::Serial {
                port: "/dev/ttyACM0".into(),
                baud: 115_200
            }
        );
    }
}
