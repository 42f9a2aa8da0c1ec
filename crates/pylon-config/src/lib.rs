// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # pylon-config
//!
//! Declarative configuration for the pylon gateway.
//!
//! A configuration file (YAML, TOML or JSON, chosen by extension) describes
//! the gateway settings and the Modbus bus/IO tree. After validation the
//! file is converted into the node tree (`into_store`) that the protocol
//! subsystems reconcile against.
//!
//! ```yaml
//! gateway:
//!   tick_interval: 1s
//! buses:
//!   - id: bus-1
//!     role: client
//!     port: /dev/ttyUSB0
//!     baud: 9600
//!     ios:
//!       - id: boiler-temp
//!         unit_id: 3
//!         address: 16
//!         io_type: holdingRegister
//!         data_format: uint16
//!         scale: 0.1
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{load, load_from_str, ConfigFormat};
pub use schema::{BusConfig, BusRoleConfig, DataFormatConfig, GatewayConfig, GatewaySettings, IoConfig, IoTypeConfig};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
