// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Mock implementations of the gateway's hardware and transport seams.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

use pylon_core::bus::{PointMessage, PointSink};
use pylon_core::error::BusResult;
use pylon_core::point::Point;
use pylon_core::types::NodeId;
use pylon_modbus::error::{ModbusError, ModbusResult};
use pylon_modbus::frame;
use pylon_modbus::transport::{BoxedLink, PortFactory};

// =============================================================================
// RecordingSink
// =============================================================================

/// A [`PointSink`] that records every published point.
#[derive(Default)]
pub struct RecordingSink {
    messages: Mutex<Vec<PointMessage>>,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns all recorded messages.
    pub fn messages(&self) -> Vec<PointMessage> {
        self.messages.lock().clone()
    }

    /// Returns the numeric values published for a node, in order.
    pub fn values_for(&self, node: &str) -> Vec<f64> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.node.as_str() == node)
            .map(|m| m.point.value)
            .collect()
    }

    /// Forgets everything recorded so far.
    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

impl PointSink for RecordingSink {
    fn send_point(&self, node: &NodeId, point: Point) -> BusResult<()> {
        self.messages.lock().push(PointMessage {
            node: node.clone(),
            point,
        });
        Ok(())
    }
}

// =============================================================================
// MockPortFactory
// =============================================================================

/// A [`PortFactory`] handing out pre-staged in-memory duplex links.
///
/// Each [`stage`](Self::stage) call queues one link for a device path and
/// returns the peer half for the test to drive. Opening a path with nothing
/// staged fails like a missing device would.
#[derive(Default)]
pub struct MockPortFactory {
    staged: Mutex<HashMap<String, VecDeque<DuplexStream>>>,
    opened: Mutex<Vec<(String, u32)>>,
}

impl MockPortFactory {
    /// Creates a factory with nothing staged.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues a link for the next open of `path`; returns the peer half.
    pub fn stage(&self, path: &str) -> DuplexStream {
        let (near, far) = tokio::io::duplex(1024);
        self.staged
            .lock()
            .entry(path.to_string())
            .or_default()
            .push_back(near);
        far
    }

    /// Returns every `(path, baud)` open in order.
    pub fn opens(&self) -> Vec<(String, u32)> {
        self.opened.lock().clone()
    }
}

impl PortFactory for MockPortFactory {
    fn open(&self, path: &str, baud: u32) -> ModbusResult<BoxedLink> {
        self.opened.lock().push((path.to_string(), baud));

        let link = self
            .staged
            .lock()
            .get_mut(path)
            .and_then(|queue| queue.pop_front())
            .ok_or_else(|| {
                ModbusError::Port(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no staged link for {path}"),
                ))
            })?;

        Ok(Box::new(link))
    }
}

// =============================================================================
// Scripted slave
// =============================================================================

/// Serves a bit-exact request/reply script over the peer half of a link.
///
/// Each script entry is `(request_body, reply_body)` without checksums; the
/// slave asserts every incoming frame byte-for-byte (CRC included) and
/// answers with the scripted reply. The task returns the link when the
/// script is exhausted so a test can extend the conversation.
pub fn scripted_slave(
    mut link: DuplexStream,
    script: Vec<(Vec<u8>, Vec<u8>)>,
) -> JoinHandle<DuplexStream> {
    tokio::spawn(async move {
        for (step, (request_body, reply_body)) in script.into_iter().enumerate() {
            let mut expected = request_body;
            frame::append_crc(&mut expected);

            let mut request = vec![0u8; expected.len()];
            link.read_exact(&mut request)
                .await
                .unwrap_or_else(|e| panic!("slave read failed at step {step}: {e}"));
            assert_eq!(request, expected, "unexpected request at step {step}");

            let mut wire = reply_body;
            frame::append_crc(&mut wire);
            link.write_all(&wire)
                .await
                .unwrap_or_else(|e| panic!("slave write failed at step {step}: {e}"));
        }
        link
    })
}
