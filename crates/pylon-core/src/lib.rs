// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # pylon-core
//!
//! Protocol-agnostic core of the pylon industrial IoT gateway.
//!
//! This crate defines the data model the rest of the gateway is built on:
//!
//! - **Nodes and points**: a configuration tree of typed nodes, each carrying
//!   a list of typed attribute points ([`Node`], [`Point`], [`Points`])
//! - **Config store**: the query surface over that tree ([`ConfigStore`]) and
//!   an in-memory implementation ([`MemoryStore`])
//! - **Point bus**: the publish seam protocol subsystems use to push point
//!   changes outward ([`PointSink`], [`PointBus`])
//!
//! Protocol subsystems (such as `pylon-modbus`) consume the store read-only,
//! mirror node state onto their wire protocol, and publish observed changes
//! back through the point bus.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod bus;
pub mod error;
pub mod point;
pub mod store;
pub mod types;

pub use bus::{PointBus, PointMessage, PointSink};
pub use error::{BusError, BusResult, StoreError, StoreResult};
pub use point::{bool_to_float, float_to_bool, node_type, point_type, point_value, Point, Points};
pub use store::{ConfigStore, MemoryStore};
pub use types::{Node, NodeId};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
