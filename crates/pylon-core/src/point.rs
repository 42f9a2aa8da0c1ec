// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Points: typed attributes attached to nodes.
//!
//! A point is addressed on its node by the tuple `(key, type, index)` and
//! carries both a numeric and a text payload; which one is meaningful depends
//! on the point type. The string identifiers in [`node_type`], [`point_type`]
//! and [`point_value`] are part of the external contract shared with the
//! configuration store and the message bus and must not be altered.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// String identifiers (external contract)
// =============================================================================

/// Node type tags.
pub mod node_type {
    /// A Modbus bus node.
    pub const MODBUS: &str = "modbus";
    /// A Modbus IO node, child of a bus node.
    pub const MODBUS_IO: &str = "modbusIo";
}

/// Point type tags.
pub mod point_type {
    /// Bus role: client (master) or server (slave).
    pub const CLIENT_SERVER: &str = "clientServer";
    /// OS serial device path.
    pub const PORT: &str = "port";
    /// Serial baud rate.
    pub const BAUD: &str = "baud";
    /// Unit id: the bus's own id (server) or the remote slave id (client IO).
    pub const ID: &str = "id";
    /// Debug verbosity level.
    pub const DEBUG: &str = "debug";
    /// Register or coil address.
    pub const ADDRESS: &str = "address";
    /// IO kind: coil, discrete input, input register, holding register.
    pub const MODBUS_IO_TYPE: &str = "modbusIoType";
    /// Register data format.
    pub const DATA_FORMAT: &str = "dataFormat";
    /// Scale factor applied to raw register values.
    pub const SCALE: &str = "scale";
    /// Offset applied after scaling.
    pub const OFFSET: &str = "offset";
    /// Last observed value.
    pub const VALUE: &str = "value";
    /// Desired value (write request).
    pub const VALUE_SET: &str = "valueSet";
}

/// Well-known point values.
pub mod point_value {
    /// Bus role: Modbus master.
    pub const CLIENT: &str = "client";
    /// Bus role: Modbus slave.
    pub const SERVER: &str = "server";
    /// IO kind: single-bit read/write state.
    pub const MODBUS_COIL: &str = "modbusCoil";
    /// IO kind: single-bit read-only state.
    pub const MODBUS_DISCRETE_INPUT: &str = "modbusDiscreteInput";
    /// IO kind: 16-bit read-only register.
    pub const MODBUS_INPUT_REGISTER: &str = "modbusInputRegister";
    /// IO kind: 16-bit read/write register.
    pub const MODBUS_HOLDING_REGISTER: &str = "modbusHoldingRegister";
    /// Data format: unsigned 16-bit.
    pub const UINT16: &str = "uint16";
    /// Data format: signed 16-bit.
    pub const INT16: &str = "int16";
    /// Data format: unsigned 32-bit, two registers.
    pub const UINT32: &str = "uint32";
    /// Data format: signed 32-bit, two registers.
    pub const INT32: &str = "int32";
    /// Data format: IEEE-754 single precision, two registers.
    pub const FLOAT32: &str = "float32";
}

// =============================================================================
// Point
// =============================================================================

/// A typed attribute on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Point key; the Modbus subsystem only uses the empty key.
    #[serde(default)]
    pub key: String,
    /// Point type tag (see [`point_type`]).
    #[serde(rename = "type")]
    pub typ: String,
    /// Point index; the Modbus subsystem only uses index 0.
    #[serde(default)]
    pub index: u32,
    /// When the point was last written.
    pub time: DateTime<Utc>,
    /// Numeric payload.
    #[serde(default)]
    pub value: f64,
    /// Text payload.
    #[serde(default)]
    pub text: String,
}

impl Point {
    /// Creates a numeric point at key `""`, index 0, stamped now.
    pub fn new_value(typ: impl Into<String>, value: f64) -> Self {
        Self {
            key: String::new(),
            typ: typ.into(),
            index: 0,
            time: Utc::now(),
            value,
            text: String::new(),
        }
    }

    /// Creates a text point at key `""`, index 0, stamped now.
    pub fn new_text(typ: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: String::new(),
            typ: typ.into(),
            index: 0,
            time: Utc::now(),
            value: 0.0,
            text: text.into(),
        }
    }
}

// =============================================================================
// Points
// =============================================================================

/// The ordered point list of a node, with `(key, type, index)` lookups.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Points(Vec<Point>);

impl Points {
    /// Creates an empty point list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the point at `(key, typ, index)`, if present.
    pub fn find(&self, key: &str, typ: &str, index: u32) -> Option<&Point> {
        self.0
            .iter()
            .find(|p| p.key == key && p.typ == typ && p.index == index)
    }

    /// Returns the text payload at `(key, typ, index)`.
    pub fn text(&self, key: &str, typ: &str, index: u32) -> Option<&str> {
        self.find(key, typ, index).map(|p| p.text.as_str())
    }

    /// Returns the numeric payload at `(key, typ, index)`.
    pub fn value(&self, key: &str, typ: &str, index: u32) -> Option<f64> {
        self.find(key, typ, index).map(|p| p.value)
    }

    /// Returns the numeric payload at `(key, typ, index)`, truncated to an
    /// integer.
    pub fn value_int(&self, key: &str, typ: &str, index: u32) -> Option<i64> {
        self.value(key, typ, index).map(|v| v as i64)
    }

    /// Inserts the point, replacing any existing point with the same
    /// `(key, type, index)`.
    pub fn upsert(&mut self, point: Point) {
        match self
            .0
            .iter_mut()
            .find(|p| p.key == point.key && p.typ == point.typ && p.index == point.index)
        {
            Some(existing) => *existing = point,
            None => self.0.push(point),
        }
    }

    /// Iterates over the points.
    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.0.iter()
    }

    /// Returns the number of points.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no points.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Point>> for Points {
    fn from(points: Vec<Point>) -> Self {
        Self(points)
    }
}

impl FromIterator<Point> for Points {
    fn from_iter<I: IntoIterator<Item = Point>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// =============================================================================
// Bool conversions
// =============================================================================

/// Converts a boolean to its point value representation.
#[inline]
pub fn bool_to_float(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Converts a point value to a boolean; any non-zero value is truthy.
#[inline]
pub fn float_to_bool(v: f64) -> bool {
    v != 0.0
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Points {
        vec![
            Point::new_text(point_type::CLIENT_SERVER, point_value::CLIENT),
            Point::new_text(point_type::PORT, "/dev/ttyUSB0"),
            Point::new_value(point_type::BAUD, 9600.0),
            Point::new_value(point_type::ADDRESS, 16.0),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_text_lookup() {
        let points = sample_points();
        assert_eq!(
            points.text("", point_type::PORT, 0),
            Some("/dev/ttyUSB0")
        );
        assert_eq!(points.text("", point_type::SCALE, 0), None);
    }

    #[test]
    fn test_value_lookup() {
        let points = sample_points();
        assert_eq!(points.value("", point_type::BAUD, 0), Some(9600.0));
        assert_eq!(points.value_int("", point_type::ADDRESS, 0), Some(16));
        assert_eq!(points.value("", point_type::OFFSET, 0), None);
    }

    #[test]
    fn test_lookup_respects_key_and_index() {
        let mut points = sample_points();
        let mut keyed = Point::new_value(point_type::BAUD, 19200.0);
        keyed.key = "other".to_string();
        keyed.index = 1;
        points.upsert(keyed);

        assert_eq!(points.value("", point_type::BAUD, 0), Some(9600.0));
        assert_eq!(points.value("other", point_type::BAUD, 1), Some(19200.0));
        assert_eq!(points.value("other", point_type::BAUD, 0), None);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut points = sample_points();
        let before = points.len();
        points.upsert(Point::new_value(point_type::BAUD, 115200.0));
        assert_eq!(points.len(), before);
        assert_eq!(points.value("", point_type::BAUD, 0), Some(115200.0));
    }

    #[test]
    fn test_bool_conversions() {
        assert_eq!(bool_to_float(true), 1.0);
        assert_eq!(bool_to_float(false), 0.0);
        assert!(float_to_bool(1.0));
        assert!(float_to_bool(-2.5));
        assert!(!float_to_bool(0.0));
    }
}
