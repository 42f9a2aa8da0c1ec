// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Node identity and node types.
//!
//! The gateway configuration is a tree of typed nodes. Each node carries a
//! list of typed attribute [`Points`](crate::point::Points); parent/child
//! edges live in the store, not on the node itself.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::point::Points;

// =============================================================================
// NodeId
// =============================================================================

/// Opaque identity of a configuration node.
///
/// Node ids are assigned by the configuration store and are stable across
/// restarts. The gateway never interprets their contents.
///
/// # Examples
///
/// ```
/// use pylon_core::types::NodeId;
///
/// let id = NodeId::new("bus-1");
/// assert_eq!(id.as_str(), "bus-1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a new node id.
    #[inline]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the id and returns the inner string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for NodeId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Node
// =============================================================================

/// A configuration node: identity, type tag, and attribute points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identity.
    pub id: NodeId,
    /// Node type tag (see [`crate::point::node_type`]).
    #[serde(rename = "type")]
    pub typ: String,
    /// Attribute points.
    #[serde(default)]
    pub points: Points,
}

impl Node {
    /// Creates a node with no points.
    pub fn new(id: impl Into<NodeId>, typ: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            typ: typ.into(),
            points: Points::default(),
        }
    }

    /// Creates a node with the given points.
    pub fn with_points(id: impl Into<NodeId>, typ: impl Into<String>, points: Points) -> Self {
        Self {
            id: id.into(),
            typ: typ.into(),
            points,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
