// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The gateway runtime: wiring and the reconciliation loop.
//!
//! The runtime seeds the in-memory node tree from the configuration file,
//! builds the point bus and the bus manager, and drives
//! [`BusManager::tick`] on the configured cadence until shutdown. A
//! store-sync task applies every published point back onto the node tree,
//! so values observed on the wire become visible to the next tick.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use pylon_config::GatewayConfig;
use pylon_core::bus::PointBus;
use pylon_core::store::MemoryStore;
use pylon_modbus::manager::BusManager;
use pylon_modbus::transport::SerialFactory;

use crate::error::BinResult;
use crate::shutdown::ShutdownCoordinator;

/// Owns the gateway's long-lived state for one `run` invocation.
pub struct GatewayRuntime {
    config: GatewayConfig,
}

impl GatewayRuntime {
    /// Creates a runtime from a validated configuration.
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    /// Runs until the coordinator signals shutdown.
    pub async fn run(self, shutdown: ShutdownCoordinator) -> BinResult<()> {
        let store = Arc::new(self.config.into_store()?);
        let bus = PointBus::new(1024);
        let mut manager = BusManager::new(
            store.clone(),
            Arc::new(bus.clone()),
            Arc::new(SerialFactory),
        );

        let sync_task = tokio::spawn(store_sync(store.clone(), bus.clone()));

        let mut interval = tokio::time::interval(self.config.gateway.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown_rx = shutdown.subscribe();

        info!(
            buses = self.config.buses.len(),
            tick_interval = ?self.config.gateway.tick_interval,
            "gateway running"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = interval.tick() => {
                    if let Err(err) = manager.tick().await {
                        warn!(error = %err, "reconciliation tick failed");
                    }
                }
            }
        }

        info!("stopping gateway");
        manager.shutdown().await;
        sync_task.abort();

        Ok(())
    }
}

/// Applies published points back onto the node tree.
async fn store_sync(store: Arc<MemoryStore>, bus: PointBus) {
    let mut rx = bus.subscribe();

    loop {
        match rx.recv().await {
            Ok(message) => {
                if let Err(err) = store.set_point(&message.node, message.point) {
                    warn!(node = %message.node, error = %err, "store sync failed");
                }
            }
            Err(RecvError::Lagged(missed)) => {
                warn!(missed, "store sync lagged, points dropped");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
