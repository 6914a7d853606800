//! Serial link transport

use super::traits::{TransportConnector, TransportStream};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Default serial line speed
pub const DEFAULT_BAUD: u32 = 115_200;

/// Serial port wrapper implementing TransportStream
pub struct SerialTransportStream {
    inner: SerialStream,
}

impl AsyncRead for SerialTransportStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for SerialTransportStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

#[async_trait]
impl TransportStream for SerialTransportStream {
    async fn shutdown(&mut self) -> Result<()> {
        tokio::io::AsyncWriteExt::flush(&mut self.inner).await?;
        Ok(())
    }
}

/// Opens a serial device (e.g. "/dev/ttyUSB0")
pub struct SerialConnector {
    port: String,
    baud: u32,
}

impl SerialConnector {
    pub fn new(port: impl Into<String>, baud: u32) -> Self {
        Self {
            port: port.into(),
            baud,
        }
    }
}

#[async_trait]
impl TransportConnector for SerialConnector {
    type Stream = SerialTransportStream;

    async fn connect(&self) -> Result<Self::Stream> {
        let inner = tokio_serial::new(self.port.as_str(), self.baud)
            .open_native_async()
            .with_context(|| format!("opening serial port {} at {} baud", self.port, self.baud))?;
        Ok(SerialTransportStream { inner })
    }

    fn name(&self) -> &'static str {
        "Serial"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_port_fails_to_open() {
        let connector = SerialConnector::new("/dev/climate-node-does-not-exist", DEFAULT_BAUD);
        assert_eq!(connector.name(), "Serial");
        assert!(connector.connect().await.is_err());
    }
}
