// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema and conversion into the node tree.

use std::collections::HashSet;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use pylon_core::point::{node_type, point_type, point_value, Point};
use pylon_core::store::{ConfigStore, MemoryStore};
use pylon_core::types::Node;

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// GatewayConfig
// =============================================================================

/// Root of the gateway configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Gateway-wide settings.
    #[serde(default)]
    pub gateway: GatewaySettings,

    /// Modbus buses served by this gateway.
    #[serde(default)]
    pub buses: Vec<BusConfig>,
}

/// Gateway-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySettings {
    /// Cadence of the reconciliation loop.
    #[serde(default = "default_tick_interval", with = "humantime_serde")]
    pub tick_interval: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            tick_interval: default_tick_interval(),
        }
    }
}

fn default_tick_interval() -> Duration {
    Duration::from_secs(1)
}

// =============================================================================
// BusConfig
// =============================================================================

/// One Modbus bus: a serial port in one role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Stable id of the bus node.
    pub id: String,

    /// Role on the serial line.
    pub role: BusRoleConfig,

    /// OS serial device path.
    pub port: String,

    /// Baud rate (8N1 framing).
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// This gateway's unit id; required for server buses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<u8>,

    /// Debug verbosity; non-zero enables frame tracing.
    #[serde(default)]
    pub debug: i64,

    /// IOs on this bus.
    #[serde(default)]
    pub ios: Vec<IoConfig>,
}

fn default_baud() -> u32 {
    9600
}

/// Bus role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BusRoleConfig {
    /// Modbus master.
    Client,
    /// Modbus slave.
    Server,
}

impl BusRoleConfig {
    /// Returns the point value string.
    pub fn as_point_value(&self) -> &'static str {
        match self {
            Self::Client => point_value::CLIENT,
            Self::Server => point_value::SERVER,
        }
    }
}

// =============================================================================
// IoConfig
// =============================================================================

/// One Modbus IO on a bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IoConfig {
    /// Stable id of the IO node.
    pub id: String,

    /// Remote slave unit id; required on client buses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<u8>,

    /// Register or coil address.
    pub address: u16,

    /// Kind of IO.
    pub io_type: IoTypeConfig,

    /// Register data format; required for register kinds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_format: Option<DataFormatConfig>,

    /// Scale factor (`stored = raw * scale + offset`).
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Offset applied after scaling.
    #[serde(default)]
    pub offset: f64,

    /// Initial data model value.
    #[serde(default)]
    pub value: f64,

    /// Initial desired value; defaults to `value` so a freshly configured
    /// IO does not issue a spurious write on its first pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_set: Option<f64>,
}

fn default_scale() -> f64 {
    1.0
}

/// Kind of Modbus IO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IoTypeConfig {
    /// Single-bit, master-writable.
    Coil,
    /// Single-bit, read-only to the master.
    DiscreteInput,
    /// 16-bit, read-only to the master.
    InputRegister,
    /// 16-bit, master-writable.
    HoldingRegister,
}

impl IoTypeConfig {
    /// Returns the point value string.
    pub fn as_point_value(&self) -> &'static str {
        match self {
            Self::Coil => point_value::MODBUS_COIL,
            Self::DiscreteInput => point_value::MODBUS_DISCRETE_INPUT,
            Self::InputRegister => point_value::MODBUS_INPUT_REGISTER,
            Self::HoldingRegister => point_value::MODBUS_HOLDING_REGISTER,
        }
    }

    /// Returns `true` for register-backed kinds.
    pub fn is_register(&self) -> bool {
        matches!(self, Self::InputRegister | Self::HoldingRegister)
    }
}

/// Register data format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormatConfig {
    /// Unsigned 16-bit.
    Uint16,
    /// Signed 16-bit.
    Int16,
    /// Unsigned 32-bit.
    Uint32,
    /// Signed 32-bit.
    Int32,
    /// IEEE-754 single precision.
    Float32,
}

impl DataFormatConfig {
    /// Returns the point value string.
    pub fn as_point_value(&self) -> &'static str {
        match self {
            Self::Uint16 => point_value::UINT16,
            Self::Int16 => point_value::INT16,
            Self::Uint32 => point_value::UINT32,
            Self::Int32 => point_value::INT32,
            Self::Float32 => point_value::FLOAT32,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

impl GatewayConfig {
    /// Validates the whole tree.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.gateway.tick_interval.is_zero() {
            return Err(ConfigError::validation(
                "gateway.tick_interval",
                "must be greater than zero",
            ));
        }

        let mut bus_ids = HashSet::new();
        let mut io_ids = HashSet::new();

        for bus in &self.buses {
            bus.validate()?;

            if !bus_ids.insert(bus.id.as_str()) {
                return Err(ConfigError::validation(
                    format!("buses.{}", bus.id),
                    "duplicate bus id",
                ));
            }

            for io in &bus.ios {
                if !io_ids.insert(io.id.as_str()) {
                    return Err(ConfigError::validation(
                        format!("buses.{}.ios.{}", bus.id, io.id),
                        "duplicate IO id",
                    ));
                }
            }
        }

        Ok(())
    }
}

impl BusConfig {
    fn validate(&self) -> ConfigResult<()> {
        let field = |name: &str| format!("buses.{}.{}", self.id, name);

        if self.id.is_empty() {
            return Err(ConfigError::validation("buses.id", "must not be empty"));
        }
        if self.port.is_empty() {
            return Err(ConfigError::validation(field("port"), "must not be empty"));
        }
        if self.baud == 0 {
            return Err(ConfigError::validation(field("baud"), "must be non-zero"));
        }

        match self.role {
            BusRoleConfig::Server => match self.unit_id {
                None => {
                    return Err(ConfigError::validation(
                        field("unit_id"),
                        "required for server buses",
                    ))
                }
                Some(id) if !(1..=247).contains(&id) => {
                    return Err(ConfigError::validation(
                        field("unit_id"),
                        "must be in 1..=247",
                    ))
                }
                Some(_) => {}
            },
            BusRoleConfig::Client => {
                for io in &self.ios {
                    if io.unit_id.is_none() {
                        return Err(ConfigError::validation(
                            format!("buses.{}.ios.{}.unit_id", self.id, io.id),
                            "required on client buses",
                        ));
                    }
                }
            }
        }

        for io in &self.ios {
            io.validate(&self.id)?;
        }

        Ok(())
    }
}

impl IoConfig {
    fn validate(&self, bus_id: &str) -> ConfigResult<()> {
        let field = |name: &str| format!("buses.{}.ios.{}.{}", bus_id, self.id, name);

        if self.id.is_empty() {
            return Err(ConfigError::validation(
                format!("buses.{bus_id}.ios.id"),
                "must not be empty",
            ));
        }

        if self.io_type.is_register() {
            if self.data_format.is_none() {
                return Err(ConfigError::validation(
                    field("data_format"),
                    "required for register IOs",
                ));
            }
            if self.scale == 0.0 {
                return Err(ConfigError::validation(field("scale"), "must be non-zero"));
            }
        }

        Ok(())
    }
}

// =============================================================================
// Node tree conversion
// =============================================================================

impl GatewayConfig {
    /// Builds the node tree this configuration describes.
    ///
    /// Call [`validate`](Self::validate) first; id collisions surface here
    /// as validation errors otherwise.
    pub fn into_store(&self) -> ConfigResult<MemoryStore> {
        let store = MemoryStore::new();
        let root = store.root_node_id();

        for bus in &self.buses {
            let mut node = Node::new(bus.id.as_str(), node_type::MODBUS);
            node.points.upsert(Point::new_text(
                point_type::CLIENT_SERVER,
                bus.role.as_point_value(),
            ));
            node.points
                .upsert(Point::new_text(point_type::PORT, bus.port.as_str()));
            node.points
                .upsert(Point::new_value(point_type::BAUD, bus.baud as f64));
            node.points
                .upsert(Point::new_value(point_type::DEBUG, bus.debug as f64));
            if let Some(unit_id) = bus.unit_id {
                node.points
                    .upsert(Point::new_value(point_type::ID, unit_id as f64));
            }

            store
                .add_node(&root, node)
                .map_err(|e| ConfigError::validation(format!("buses.{}", bus.id), e.to_string()))?;

            for io in &bus.ios {
                let mut io_node = Node::new(io.id.as_str(), node_type::MODBUS_IO);
                if let Some(unit_id) = io.unit_id {
                    io_node
                        .points
                        .upsert(Point::new_value(point_type::ID, unit_id as f64));
                }
                io_node
                    .points
                    .upsert(Point::new_value(point_type::ADDRESS, io.address as f64));
                io_node.points.upsert(Point::new_text(
                    point_type::MODBUS_IO_TYPE,
                    io.io_type.as_point_value(),
                ));
                if let Some(format) = io.data_format {
                    io_node.points.upsert(Point::new_text(
                        point_type::DATA_FORMAT,
                        format.as_point_value(),
                    ));
                }
                if io.io_type.is_register() {
                    io_node
                        .points
                        .upsert(Point::new_value(point_type::SCALE, io.scale));
                    io_node
                        .points
                        .upsert(Point::new_value(point_type::OFFSET, io.offset));
                }
                io_node
                    .points
                    .upsert(Point::new_value(point_type::VALUE, io.value));
                io_node.points.upsert(Point::new_value(
                    point_type::VALUE_SET,
                    io.value_set.unwrap_or(io.value),
                ));

                store.add_node(&bus.id.as_str().into(), io_node).map_err(|e| {
                    ConfigError::validation(
                        format!("buses.{}.ios.{}", bus.id, io.id),
                        e.to_string(),
                    )
                })?;
            }
        }

        Ok(store)
    }
}

// =============================================================================
// Tests
// =============================================================================
