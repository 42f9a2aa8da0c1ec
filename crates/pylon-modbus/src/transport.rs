// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Serial transport: port opening and RTU frame timing.
//!
//! [`FrameIo`] implements the RTU response reader: the first reply byte must
//! arrive within [`FIRST_BYTE_TIMEOUT`], and the frame ends at the first
//! inter-byte silence of at least [`FRAME_GAP`]. The [`PortFactory`] seam
//! exists so the engines run over real serial hardware in production and over
//! in-memory duplex links in tests.

use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_serial::SerialPortBuilderExt;

use crate::error::{ModbusError, ModbusResult};
use crate::frame;

/// Default timeout for the first byte of a reply.
pub const FIRST_BYTE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default inter-byte silence that terminates a frame.
pub const FRAME_GAP: Duration = Duration::from_millis(30);

// =============================================================================
// Link and PortFactory
// =============================================================================

/// A bidirectional byte stream carrying RTU frames.
pub trait Link: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T> Link for T where T: AsyncRead + AsyncWrite + Send + Unpin {}

/// An owned, type-erased link.
pub type BoxedLink = Box<dyn Link>;

/// Opens serial links by OS device path.
pub trait PortFactory: Send + Sync {
    /// Opens the device at `path` with 8N1 framing at `baud`.
    fn open(&self, path: &str, baud: u32) -> ModbusResult<BoxedLink>;
}

/// The production [`PortFactory`]: real serial ports via `tokio-serial`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialFactory;

impl PortFactory for SerialFactory {
    fn open(&self, path: &str, baud: u32) -> ModbusResult<BoxedLink> {
        let stream = tokio_serial::new(path, baud)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .open_native_async()
            .map_err(|e| ModbusError::Port(io::Error::other(e)))?;

        Ok(Box::new(stream))
    }
}

// =============================================================================
// FrameIo
// =============================================================================

/// RTU frame reader/writer over a [`Link`].
///
/// Writes append the CRC; reads buffer until the line goes silent, then
/// validate and strip it. One `FrameIo` serializes all I/O on its link.
pub struct FrameIo<L> {
    link: L,
    first_byte_timeout: Duration,
    frame_gap: Duration,
    trace_frames: bool,
}

impl<L: Link> FrameIo<L> {
    /// Wraps a link with the default RTU timings.
    pub fn new(link: L) -> Self {
        Self {
            link,
            first_byte_timeout: FIRST_BYTE_TIMEOUT,
            frame_gap: FRAME_GAP,
            trace_frames: false,
        }
    }

    /// Overrides the response timings.
    pub fn with_timeouts(mut self, first_byte_timeout: Duration, frame_gap: Duration) -> Self {
        self.first_byte_timeout = first_byte_timeout;
        self.frame_gap = frame_gap;
        self
    }

    /// Enables hex tracing of every frame at debug level.
    pub fn with_frame_tracing(mut self, enabled: bool) -> Self {
        self.trace_frames = enabled;
        self
    }

    /// Writes `body` as one frame, CRC appended.
    pub async fn write_frame(&mut self, body: &[u8]) -> ModbusResult<()> {
        let mut wire = Vec::with_capacity(body.len() + 2);
        wire.extend_from_slice(body);
        frame::append_crc(&mut wire);

        if self.trace_frames {
            tracing::debug!(frame = %hex(&wire), "tx");
        }

        self.link.write_all(&wire).await?;
        self.link.flush().await?;
        Ok(())
    }

    /// Reads one frame and returns its CRC-stripped body.
    ///
    /// Fails with [`ModbusError::FrameTimeout`] if no byte arrives within the
    /// first-byte timeout and with [`ModbusError::FrameCorrupt`] on a bad
    /// checksum.
    pub async fn read_frame(&mut self) -> ModbusResult<Vec<u8>> {
        let mut wire = Vec::new();
        let mut buf = [0u8; 64];

        let n = match timeout(self.first_byte_timeout, self.link.read(&mut buf)).await {
            Ok(Ok(0)) => {
                return Err(ModbusError::Port(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "link closed",
                )))
            }
            Ok(Ok(n)) => n,
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(ModbusError::FrameTimeout(self.first_byte_timeout)),
        };
        wire.extend_from_slice(&buf[..n]);

        // Accumulate until the inter-byte gap elapses or the frame cannot
        // legally grow any further.
        while wire.len() < frame::MAX_FRAME_LEN {
            match timeout(self.frame_gap, self.link.read(&mut buf)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => wire.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => break,
            }
        }

        if self.trace_frames {
            tracing::debug!(frame = %hex(&wire), "rx");
        }

        Ok(frame::check_crc(&wire)?.to_vec())
    }

    /// Consumes the wrapper and returns the link.
    pub fn into_inner(self) -> L {
        self.link
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (FrameIo<tokio::io::DuplexStream>, tokio::io::DuplexStream) {
        let (near, far) = tokio::io::duplex(1024);
        // Short timings keep the tests fast without changing behavior.
        let io = FrameIo::new(near)
            .with_timeouts(Duration::from_millis(100), Duration::from_millis(10));
        (io, far)
    }

    #[tokio::test]
    async fn test_write_appends_crc() {
        let (mut io, mut far) = pair();
        io.write_frame(&[0x03, 0x03, 0x00, 0x10, 0x00, 0x01])
            .await
            .unwrap();

        let mut wire = vec![0u8; 8];
        far.read_exact(&mut wire).await.unwrap();

        assert_eq!(&wire[..6], &[0x03, 0x03, 0x00, 0x10, 0x00, 0x01]);
        assert_eq!(frame::check_crc(&wire).unwrap(), &wire[..6]);
    }

    #[tokio::test]
    async fn test_read_frame_terminates_on_gap() {
        let (mut io, mut far) = pair();

        let mut wire = vec![0x03, 0x03, 0x02, 0x00, 0x64];
        frame::append_crc(&mut wire);
        far.write_all(&wire).await.unwrap();

        let body = io.read_frame().await.unwrap();
        assert_eq!(body, &[0x03, 0x03, 0x02, 0x00, 0x64]);
    }

    #[tokio::test]
    async fn test_read_frame_reassembles_split_writes() {
        let (mut io, mut far) = pair();

        let mut wire = vec![0x01, 0x05, 0x00, 0x05, 0xFF, 0x00];
        frame::append_crc(&mut wire);
        let (head, tail) = wire.split_at(3);

        let head = head.to_vec();
        let tail = tail.to_vec();
        let writer = tokio::spawn(async move {
            far.write_all(&head).await.unwrap();
            // Within the inter-byte gap: still the same frame.
            tokio::time::sleep(Duration::from_millis(2)).await;
            far.write_all(&tail).await.unwrap();
            far
        });

        let body = io.read_frame().await.unwrap();
        assert_eq!(body, &[0x01, 0x05, 0x00, 0x05, 0xFF, 0x00]);
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_frame_times_out_when_silent() {
        let (mut io, _far) = pair();
        let err = io.read_frame().await.unwrap_err();
        assert!(matches!(err, ModbusError::FrameTimeout(_)));
    }

    #[tokio::test]
    async fn test_read_frame_rejects_bad_crc() {
        let (mut io, mut far) = pair();

        let mut wire = vec![0x03, 0x03, 0x02, 0x00, 0x64];
        frame::append_crc(&mut wire);
        wire[3] ^= 0x01;
        far.write_all(&wire).await.unwrap();

        let err = io.read_frame().await.unwrap_err();
        assert!(matches!(err, ModbusError::FrameCorrupt { .. }));
    }

    #[tokio::test]
    async fn test_read_frame_closed_link_is_port_error() {
        let (mut io, far) = pair();
        drop(far);
        let err = io.read_frame().await.unwrap_err();
        assert!(err.is_port_fatal());
    }
}
