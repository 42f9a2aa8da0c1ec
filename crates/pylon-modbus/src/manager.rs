// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The bus manager: a reconciliation control loop, not a scheduler.
//!
//! [`BusManager::tick`] is intended to run on a fixed cadence. Each tick is
//! an idempotent reconciliation of the live endpoints against the
//! configuration tree; transient failures are logged, the offending entity
//! is skipped, and the next tick heals whatever it can. Endpoints whose bus
//! node disappeared are closed at the end of every tick.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use pylon_core::bus::PointSink;
use pylon_core::point::node_type;
use pylon_core::store::ConfigStore;
use pylon_core::types::NodeId;

use crate::endpoint::{BusEndpoint, BusRole};
use crate::error::ModbusResult;
use crate::io::IoView;
use crate::transport::PortFactory;

/// Owns every Modbus bus endpoint and reconciles them against the store.
pub struct BusManager {
    store: Arc<dyn ConfigStore>,
    sink: Arc<dyn PointSink>,
    ports: Arc<dyn PortFactory>,
    endpoints: HashMap<NodeId, BusEndpoint>,
}

impl BusManager {
    /// Creates a manager with no endpoints.
    pub fn new(
        store: Arc<dyn ConfigStore>,
        sink: Arc<dyn PointSink>,
        ports: Arc<dyn PortFactory>,
    ) -> Self {
        Self {
            store,
            sink,
            ports,
            endpoints: HashMap::new(),
        }
    }

    /// Runs one reconciliation pass.
    ///
    /// Only a root-level store failure aborts the pass; everything below a
    /// bus node is logged and skipped per entity. The removal sweep for
    /// vanished bus nodes always runs.
    pub async fn tick(&mut self) -> ModbusResult<()> {
        let root = self.store.root_node_id();
        let bus_nodes = self.store.node_children(&root, node_type::MODBUS)?;

        let mut seen = HashSet::new();

        for bus_node in &bus_nodes {
            seen.insert(bus_node.id.clone());

            if !self.endpoints.contains_key(&bus_node.id) {
                match BusEndpoint::new(bus_node, self.sink.clone(), self.ports.clone()) {
                    Ok(endpoint) => {
                        self.endpoints.insert(bus_node.id.clone(), endpoint);
                    }
                    Err(err) => {
                        tracing::warn!(bus = %bus_node.id, error = %err, "invalid modbus bus node");
                        continue;
                    }
                }
            }

            let Some(endpoint) = self.endpoints.get_mut(&bus_node.id) else {
                continue;
            };

            if let Err(err) = endpoint.reconcile(bus_node).await {
                tracing::warn!(bus = %bus_node.id, error = %err, "bus reconcile failed");
                continue;
            }

            let io_nodes = match self.store.node_children(&bus_node.id, node_type::MODBUS_IO) {
                Ok(nodes) => nodes,
                Err(err) => {
                    tracing::warn!(bus = %bus_node.id, error = %err, "listing modbus IO nodes failed");
                    continue;
                }
            };

            for io_node in &io_nodes {
                let view = match IoView::from_node(endpoint.role(), io_node) {
                    Ok(view) => view,
                    Err(err) => {
                        tracing::warn!(io = %io_node.id, error = %err, "invalid modbus IO node");
                        continue;
                    }
                };

                let result = match endpoint.role() {
                    BusRole::Client => endpoint.client_io(&view).await,
                    BusRole::Server => endpoint.server_io(&view),
                };

                if let Err(err) = result {
                    tracing::warn!(io = %io_node.id, error = %err, "modbus IO pass failed");
                }
            }
        }

        let stale: Vec<NodeId> = self
            .endpoints
            .keys()
            .filter(|id| !seen.contains(*id))
            .cloned()
            .collect();

        for id in stale {
            if let Some(mut endpoint) = self.endpoints.remove(&id) {
                tracing::info!(bus = %id, port = endpoint.port_name(), "removing modbus bus");
                endpoint.close().await;
            }
        }

        Ok(())
    }

    /// Closes every endpoint. Called once at gateway shutdown.
    pub async fn shutdown(&mut self) {
        for (_, mut endpoint) in self.endpoints.drain() {
            endpoint.close().await;
        }
    }

    /// Returns the ids of the live endpoints.
    pub fn endpoint_ids(&self) -> Vec<NodeId> {
        self.endpoints.keys().cloned().collect()
    }

    /// Returns the number of live endpoints.
    pub fn endpoint_count(&self) -> usize {
        self.endpoints.len()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pylon_core::bus::PointBus;
    use pylon_core::point::{point_type, point_value, Point};
    use pylon_core::store::MemoryStore;
    use pylon_core::types::Node;

    use crate::error::{ModbusError, ModbusResult};
    use crate::transport::BoxedLink;

    struct DuplexFactory {
        peers: Mutex<Vec<tokio::io::DuplexStream>>,
        fail: Mutex<HashSet<String>>,
    }

    impl DuplexFactory {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                peers: Mutex::new(Vec::new()),
                fail: Mutex::new(HashSet::new()),
            })
        }

        fn fail_path(&self, path: &str) {
            self.fail.lock().insert(path.to_string());
        }
    }

    impl PortFactory for DuplexFactory {
        fn open(&self, path: &str, _baud: u32) -> ModbusResult<BoxedLink> {
            if self.fail.lock().contains(path) {
                return Err(ModbusError::Port(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such device",
                )));
            }
            let (near, far) = tokio::io::duplex(1024);
            self.peers.lock().push(far);
            Ok(Box::new(near))
        }
    }

    fn bus_node(id: &str, port: &str) -> Node {
        let mut node = Node::new(id, node_type::MODBUS);
        node.points
            .upsert(Point::new_text(point_type::CLIENT_SERVER, point_value::SERVER));
        node.points.upsert(Point::new_text(point_type::PORT, port));
        node.points
            .upsert(Point::new_value(point_type::BAUD, 9600.0));
        node.points.upsert(Point::new_value(point_type::ID, 7.0));
        node
    }

    fn manager(store: Arc<MemoryStore>, ports: Arc<DuplexFactory>) -> BusManager {
        BusManager::new(store, Arc::new(PointBus::new(64)), ports)
    }

    #[tokio::test]
    async fn test_endpoint_set_tracks_bus_nodes() {
        let store = Arc::new(MemoryStore::new());
        let root = store.root_node_id();
        store.add_node(&root, bus_node("bus-1", "/dev/ttyUSB0")).unwrap();
        store.add_node(&root, bus_node("bus-2", "/dev/ttyUSB1")).unwrap();

        let mut manager = manager(store.clone(), DuplexFactory::new());
        manager.tick().await.unwrap();

        let mut ids = manager.endpoint_ids();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(ids, vec![NodeId::new("bus-1"), NodeId::new("bus-2")]);

        store.remove_node(&NodeId::new("bus-2")).unwrap();
        manager.tick().await.unwrap();
        assert_eq!(manager.endpoint_ids(), vec![NodeId::new("bus-1")]);

        manager.shutdown().await;
        assert_eq!(manager.endpoint_count(), 0);
    }

    #[tokio::test]
    async fn test_broken_port_does_not_abort_tick() {
        let store = Arc::new(MemoryStore::new());
        let root = store.root_node_id();
        store.add_node(&root, bus_node("bus-bad", "/dev/gone")).unwrap();
        store.add_node(&root, bus_node("bus-ok", "/dev/ttyUSB0")).unwrap();

        let ports = DuplexFactory::new();
        ports.fail_path("/dev/gone");

        let mut manager = manager(store, ports);
        manager.tick().await.unwrap();

        // Both endpoints exist; only the healthy one has an open port.
        assert_eq!(manager.endpoint_count(), 2);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_bus_node_is_skipped() {
        let store = Arc::new(MemoryStore::new());
        let root = store.root_node_id();

        let mut incomplete = Node::new("bus-bad", node_type::MODBUS);
        incomplete
            .points
            .upsert(Point::new_text(point_type::PORT, "/dev/ttyUSB0"));
        store.add_node(&root, incomplete).unwrap();
        store.add_node(&root, bus_node("bus-ok", "/dev/ttyUSB1")).unwrap();

        let mut manager = manager(store, DuplexFactory::new());
        manager.tick().await.unwrap();

        assert_eq!(manager.endpoint_ids(), vec![NodeId::new("bus-ok")]);
        manager.shutdown().await;
    }
}
