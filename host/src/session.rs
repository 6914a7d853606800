//! Node session handling

use anyhow::Result;
use climate_shared::codec::{self, FrameDecoder};
use climate_shared::Frame;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::warn;

/// Handle to send frames to the connected node
#[derive(Clone)]
pub struct SessionHandle {
    pub addr: SocketAddr,
    writer: Arc<Mutex<WriteHalf<TcpStream>>>,
    pub connected_at: Instant,
}

impl SessionHandle {
    /// Send a frame to the node
    pub async fn send(&self, frame: &Frame) -> Result<()> {
        let encoded = codec::encode(frame)?;
        let mut writer = self.writer.lock().await;
        writer.write_all(&encoded).await?;
        Ok(())
    }
}

/// Active node session
pub struct NodeSession {
    handle: SessionHandle,
    reader: ReadHalf<TcpStream>,
    decoder: FrameDecoder,
    read_buf: Vec<u8>,
}

impl NodeSession {
    /// Create a new session from an accepted TCP stream
    pub fn new(stream: TcpStream, addr: SocketAddr) -> Self {
        let (reader, writer) = tokio::io::split(stream);

        let handle = SessionHandle {
            addr,
            writer: Arc::new(Mutex::new(writer)),
            connected_at: Instant::now(),
        };

        Self {
            handle,
            reader,
            decoder: FrameDecoder::new(),
            read_buf: vec![0u8; 1024],
        }
    }

    /// Get a cloneable handle for sending frames
    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Read the next frame from the node.
    /// Returns None once the connection is closed or unreadable.
    pub async fn recv(&mut self) -> Option<Frame> {
        loop {
            match self.decoder.decode_next() {
                Ok(Some(frame)) => return Some(frame),
                Ok(None) => {}
                Err(e) => {
                    warn!("Decode error from {}: {}", self.handle.addr, e);
                    return None;
                }
            }

            match self.reader.read(&mut self.read_buf).await {
                Ok(0) => return None,
                Ok(n) => {
                    self.decoder.extend(&self.read_buf[..n]);
                }
                Err(e) => {
                    warn!("Read error from {}: {}", self.handle.addr, e);
                    return None;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::net::TcpListener;

    /// Host-side session plus the node end of a loopback connection
    pub(crate) async fn loopback() -> (NodeSession, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
        let addr = listener.local_addr().expect("no addr");
        let (node, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let (stream, peer) = accepted.expect("accept failed");
        (NodeSession::new(stream, peer), node.expect("connect failed"))
    }

    #[tokio::test]
    async fn test_send_and_recv_frames() {
        let (mut session, mut node) = loopback().await;

        session
            .handle()
            .send(&Frame::request(3, b"get_temp01".to_vec()))
            .await
            .expect("send failed");

        let mut decoder = FrameDecoder::new();
        let mut buf = [0u8; 128];
        let sent = loop {
            if let Some(frame) = decoder.decode_next().expect("decode failed") {
                break frame;
            }
            let n = node.read(&mut buf).await.expect("read failed");
            decoder.extend(&buf[..n]);
        };
        assert_eq!(sent.sequence, 3);
        assert_eq!(sent.payload, b"get_temp01");

        let reply = Frame {
            channel_id: 1,
            sequence: 0,
            port: 0,
            payload: b"3:temp01=21.50".to_vec(),
        };
        node.write_all(&codec::encode(&reply).expect("encode failed"))
            .await
            .expect("write failed");
        assert_eq!(session.recv().await, Some(reply));

        drop(node);
        assert_eq!(session.recv().await, None);
    }
}
