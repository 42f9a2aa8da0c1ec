// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the core data model.

use thiserror::Error;

use crate::types::NodeId;

/// Result alias for config store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result alias for point bus operations.
pub type BusResult<T> = Result<T, BusError>;

/// Errors from the configuration store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced node does not exist.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// The referenced parent node does not exist.
    #[error("parent node not found: {0}")]
    ParentNotFound(NodeId),

    /// A node with this id already exists.
    #[error("duplicate node id: {0}")]
    DuplicateNode(NodeId),

    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a backend error from any message.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors from the point bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// The underlying transport rejected the publish.
    #[error("point publish failed: {0}")]
    Publish(String),
}

impl BusError {
    /// Creates a publish error from any message.
    pub fn publish(message: impl Into<String>) -> Self {
        Self::Publish(message.into())
    }
}
