// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Flattened per-pass view of a Modbus IO node.
//!
//! An [`IoView`] is rebuilt from the configuration store on every
//! reconciliation pass; it never outlives the pass that created it.

use std::fmt;
use std::str::FromStr;

use pylon_core::point::{point_type, point_value};
use pylon_core::types::{Node, NodeId};

use crate::codec::{DataFormat, Transform};
use crate::endpoint::BusRole;
use crate::error::{ModbusError, ModbusResult};

// =============================================================================
// IoType
// =============================================================================

/// The four kinds of Modbus IO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoType {
    /// Single-bit, master-writable.
    Coil,
    /// Single-bit, read-only to the master.
    DiscreteInput,
    /// 16-bit, read-only to the master.
    InputRegister,
    /// 16-bit, master-writable.
    HoldingRegister,
}

impl IoType {
    /// Parses an IO type from its point value string.
    pub fn parse(s: &str) -> ModbusResult<Self> {
        match s {
            point_value::MODBUS_COIL => Ok(Self::Coil),
            point_value::MODBUS_DISCRETE_INPUT => Ok(Self::DiscreteInput),
            point_value::MODBUS_INPUT_REGISTER => Ok(Self::InputRegister),
            point_value::MODBUS_HOLDING_REGISTER => Ok(Self::HoldingRegister),
            other => Err(ModbusError::UnsupportedIoType(other.to_string())),
        }
    }

    /// Returns the point value string for this IO type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coil => point_value::MODBUS_COIL,
            Self::DiscreteInput => point_value::MODBUS_DISCRETE_INPUT,
            Self::InputRegister => point_value::MODBUS_INPUT_REGISTER,
            Self::HoldingRegister => point_value::MODBUS_HOLDING_REGISTER,
        }
    }

    /// Returns `true` for the single-bit kinds.
    pub const fn is_bit(&self) -> bool {
        matches!(self, Self::Coil | Self::DiscreteInput)
    }

    /// Returns `true` for the register-backed kinds.
    pub const fn is_register(&self) -> bool {
        !self.is_bit()
    }
}

impl FromStr for IoType {
    type Err = ModbusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// IoView
// =============================================================================

/// One IO node flattened for a single reconciliation pass.
#[derive(Debug, Clone)]
pub struct IoView {
    /// Identity of the IO node, used as the publish subject.
    pub node_id: NodeId,
    /// Remote slave unit id; meaningful on client buses only.
    pub unit_id: u8,
    /// Register or coil address.
    pub address: u16,
    /// Kind of IO.
    pub io_type: IoType,
    /// Register data format; present exactly for register-backed kinds.
    pub format: Option<DataFormat>,
    /// Scale/offset transform; identity for bit kinds.
    pub transform: Transform,
    /// Last observed value from the data model.
    pub value: f64,
    /// Desired value from the data model.
    pub value_set: f64,
}

impl IoView {
    /// Builds a view from an IO node's points.
    ///
    /// `id` is required on client buses (it addresses the remote slave);
    /// `address` and `modbusIoType` are always required; register-backed
    /// kinds additionally require `dataFormat`, `scale` and `offset`.
    pub fn from_node(role: BusRole, node: &Node) -> ModbusResult<Self> {
        let points = &node.points;

        let unit_id = points.value_int("", point_type::ID, 0);
        if role == BusRole::Client && unit_id.is_none() {
            return Err(ModbusError::ConfigMissing(point_type::ID));
        }

        let address = points
            .value_int("", point_type::ADDRESS, 0)
            .ok_or(ModbusError::ConfigMissing(point_type::ADDRESS))? as u16;

        let io_type = points
            .text("", point_type::MODBUS_IO_TYPE, 0)
            .ok_or(ModbusError::ConfigMissing(point_type::MODBUS_IO_TYPE))?
            .parse::<IoType>()?;

        let (format, transform) = if io_type.is_register() {
            let format = points
                .text("", point_type::DATA_FORMAT, 0)
                .ok_or(ModbusError::ConfigMissing(point_type::DATA_FORMAT))?
                .parse::<DataFormat>()?;
            let scale = points
                .value("", point_type::SCALE, 0)
                .ok_or(ModbusError::ConfigMissing(point_type::SCALE))?;
            let offset = points
                .value("", point_type::OFFSET, 0)
                .ok_or(ModbusError::ConfigMissing(point_type::OFFSET))?;
            (Some(format), Transform::new(scale, offset)?)
        } else {
            (None, Transform::identity())
        };

        Ok(Self {
            node_id: node.id.clone(),
            unit_id: unit_id.unwrap_or(0) as u8,
            address,
            io_type,
            format,
            transform,
            value: points.value("", point_type::VALUE, 0).unwrap_or(0.0),
            value_set: points.value("", point_type::VALUE_SET, 0).unwrap_or(0.0),
        })
    }

    /// Returns the data format of a register-backed IO.
    pub fn register_format(&self) -> ModbusResult<DataFormat> {
        self.format
            .ok_or(ModbusError::ConfigMissing(point_type::DATA_FORMAT))
    }
}

// =============================================================================
// Tests
// =============================================================================
