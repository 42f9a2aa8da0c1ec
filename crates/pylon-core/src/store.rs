// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration store: the query surface protocol subsystems consume.
//!
//! Subsystems poll the store rather than subscribing to it; a subsystem's
//! control loop re-queries the tree every tick and reconciles its runtime
//! state against whatever it finds. [`MemoryStore`] is the in-process
//! implementation used by the gateway binary and the test suites; a
//! database-backed store only needs to provide the same two queries.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::point::Point;
use crate::types::{Node, NodeId};

// =============================================================================
// ConfigStore
// =============================================================================

/// Read surface over the configuration node tree.
pub trait ConfigStore: Send + Sync {
    /// Returns the id of the tree root.
    fn root_node_id(&self) -> NodeId;

    /// Returns the children of `parent` whose type tag equals `type_filter`.
    fn node_children(&self, parent: &NodeId, type_filter: &str) -> StoreResult<Vec<Node>>;
}

// =============================================================================
// MemoryStore
// =============================================================================

/// Node type tag of the synthetic tree root.
const ROOT_TYPE: &str = "device";

struct StoreInner {
    root: NodeId,
    nodes: HashMap<NodeId, Node>,
    children: HashMap<NodeId, Vec<NodeId>>,
}

/// Thread-safe in-memory configuration tree.
///
/// # Examples
///
/// ```
/// use pylon_core::point::{node_type, point_type, Point};
/// use pylon_core::store::{ConfigStore, MemoryStore};
/// use pylon_core::types::Node;
///
/// let store = MemoryStore::new();
/// let root = store.root_node_id();
///
/// let mut bus = Node::new("bus-1", node_type::MODBUS);
/// bus.points.upsert(Point::new_value(point_type::BAUD, 9600.0));
/// store.add_node(&root, bus).unwrap();
///
/// let buses = store.node_children(&root, node_type::MODBUS).unwrap();
/// assert_eq!(buses.len(), 1);
/// ```
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    /// Creates an empty store with a root node id of `"root"`.
    pub fn new() -> Self {
        Self::with_root("root")
    }

    /// Creates an empty store with the given root node id.
    pub fn with_root(root: impl Into<NodeId>) -> Self {
        let root = root.into();
        let mut nodes = HashMap::new();
        nodes.insert(root.clone(), Node::new(root.clone(), ROOT_TYPE));

        Self {
            inner: RwLock::new(StoreInner {
                root,
                nodes,
                children: HashMap::new(),
            }),
        }
    }

    /// Adds a node under `parent`.
    pub fn add_node(&self, parent: &NodeId, node: Node) -> StoreResult<()> {
        let mut inner = self.inner.write();

        if !inner.nodes.contains_key(parent) {
            return Err(StoreError::ParentNotFound(parent.clone()));
        }
        if inner.nodes.contains_key(&node.id) {
            return Err(StoreError::DuplicateNode(node.id.clone()));
        }

        inner
            .children
            .entry(parent.clone())
            .or_default()
            .push(node.id.clone());
        inner.nodes.insert(node.id.clone(), node);

        Ok(())
    }

    /// Removes a node and, recursively, its descendants.
    pub fn remove_node(&self, id: &NodeId) -> StoreResult<()> {
        let mut inner = self.inner.write();

        if !inner.nodes.contains_key(id) {
            return Err(StoreError::NodeNotFound(id.clone()));
        }

        let mut pending = vec![id.clone()];
        while let Some(next) = pending.pop() {
            if let Some(kids) = inner.children.remove(&next) {
                pending.extend(kids);
            }
            inner.nodes.remove(&next);
        }

        for kids in inner.children.values_mut() {
            kids.retain(|child| child != id);
        }

        Ok(())
    }

    /// Upserts a point on a node.
    pub fn set_point(&self, id: &NodeId, point: Point) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let node = inner
            .nodes
            .get_mut(id)
            .ok_or_else(|| StoreError::NodeNotFound(id.clone()))?;
        node.points.upsert(point);
        Ok(())
    }

    /// Returns a snapshot of a node.
    pub fn node(&self, id: &NodeId) -> Option<Node> {
        self.inner.read().nodes.get(id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for MemoryStore {
    fn root_node_id(&self) -> NodeId {
        self.inner.read().root.clone()
    }

    fn node_children(&self, parent: &NodeId, type_filter: &str) -> StoreResult<Vec<Node>> {
        let inner = self.inner.read();

        if !inner.nodes.contains_key(parent) {
            return Err(StoreError::NodeNotFound(parent.clone()));
        }

        let Some(kids) = inner.children.get(parent) else {
            return Ok(Vec::new());
        };

        Ok(kids
            .iter()
            .filter_map(|id| inner.nodes.get(id))
            .filter(|node| node.typ == type_filter)
            .cloned()
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================
