// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Point bus: the outward publish seam for protocol subsystems.
//!
//! Protocol engines publish observed point changes through a [`PointSink`];
//! delivery is fire-and-forget with at-least-once semantics and no per-node
//! ordering guarantee. [`PointBus`] is the in-process implementation, a
//! broadcast channel that fans published points out to any number of
//! subscribers (the store-sync task, loggers, external bridges).

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::BusResult;
use crate::point::Point;
use crate::types::NodeId;

// =============================================================================
// PointMessage
// =============================================================================

/// A published point, addressed to the node it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointMessage {
    /// The node the point belongs to.
    pub node: NodeId,
    /// The point payload.
    pub point: Point,
}

// =============================================================================
// PointSink
// =============================================================================

/// Outward publish surface for point changes.
pub trait PointSink: Send + Sync {
    /// Publishes a point for `node`. Fire-and-forget; implementations must
    /// not block on slow consumers.
    fn send_point(&self, node: &NodeId, point: Point) -> BusResult<()>;
}

// =============================================================================
// PointBus
// =============================================================================

/// Broadcast-channel point bus.
///
/// Publishing with no active subscribers is not an error; the point is
/// simply dropped, matching the fire-and-forget contract.
#[derive(Debug, Clone)]
pub struct PointBus {
    sender: broadcast::Sender<PointMessage>,
}

impl PointBus {
    /// Creates a bus with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to all published points.
    pub fn subscribe(&self) -> broadcast::Receiver<PointMessage> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for PointBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl PointSink for PointBus {
    fn send_point(&self, node: &NodeId, point: Point) -> BusResult<()> {
        let message = PointMessage {
            node: node.clone(),
            point,
        };

        tracing::trace!(
            node = %message.node,
            point_type = %message.point.typ,
            value = message.point.value,
            "publishing point"
        );

        // A send error only means there are no subscribers right now.
        let _ = self.sender.send(message);
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
