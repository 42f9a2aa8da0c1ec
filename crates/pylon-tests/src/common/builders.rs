// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Builders for bus and IO nodes carrying the exact point strings.

use pylon_core::point::{node_type, point_type, point_value, Point};
use pylon_core::types::Node;

// =============================================================================
// BusNodeBuilder
// =============================================================================

/// Builds a `modbus` bus node.
pub struct BusNodeBuilder {
    id: String,
    role: &'static str,
    port: String,
    baud: f64,
    unit_id: Option<f64>,
    debug: Option<f64>,
}

impl BusNodeBuilder {
    /// Starts a client bus.
    pub fn client(id: &str, port: &str) -> Self {
        Self {
            id: id.to_string(),
            role: point_value::CLIENT,
            port: port.to_string(),
            baud: 9600.0,
            unit_id: None,
            debug: None,
        }
    }

    /// Starts a server bus with its own unit id.
    pub fn server(id: &str, port: &str, unit_id: u8) -> Self {
        Self {
            id: id.to_string(),
            role: point_value::SERVER,
            port: port.to_string(),
            baud: 9600.0,
            unit_id: Some(unit_id as f64),
            debug: None,
        }
    }

    /// Sets the baud rate.
    pub fn baud(mut self, baud: u32) -> Self {
        self.baud = baud as f64;
        self
    }

    /// Sets the debug level.
    pub fn debug(mut self, level: i64) -> Self {
        self.debug = Some(level as f64);
        self
    }

    /// Builds the node.
    pub fn build(self) -> Node {
        let mut node = Node::new(self.id.as_str(), node_type::MODBUS);
        node.points
            .upsert(Point::new_text(point_type::CLIENT_SERVER, self.role));
        node.points
            .upsert(Point::new_text(point_type::PORT, self.port.as_str()));
        node.points
            .upsert(Point::new_value(point_type::BAUD, self.baud));
        if let Some(unit_id) = self.unit_id {
            node.points
                .upsert(Point::new_value(point_type::ID, unit_id));
        }
        if let Some(debug) = self.debug {
            node.points
                .upsert(Point::new_value(point_type::DEBUG, debug));
        }
        node
    }
}

// =============================================================================
// IoNodeBuilder
// =============================================================================

/// Builds a `modbusIo` node.
pub struct IoNodeBuilder {
    id: String,
    points: Vec<Point>,
}

impl IoNodeBuilder {
    /// Starts an IO node of the given type at an address.
    pub fn new(id: &str, io_type: &str, address: u16) -> Self {
        Self {
            id: id.to_string(),
            points: vec![
                Point::new_text(point_type::MODBUS_IO_TYPE, io_type),
                Point::new_value(point_type::ADDRESS, address as f64),
            ],
        }
    }

    /// Shorthand for a coil IO.
    pub fn coil(id: &str, address: u16) -> Self {
        Self::new(id, point_value::MODBUS_COIL, address)
    }

    /// Shorthand for a discrete input IO.
    pub fn discrete_input(id: &str, address: u16) -> Self {
        Self::new(id, point_value::MODBUS_DISCRETE_INPUT, address)
    }

    /// Shorthand for an input register IO.
    pub fn input_register(id: &str, address: u16) -> Self {
        Self::new(id, point_value::MODBUS_INPUT_REGISTER, address)
    }

    /// Shorthand for a holding register IO.
    pub fn holding_register(id: &str, address: u16) -> Self {
        Self::new(id, point_value::MODBUS_HOLDING_REGISTER, address)
    }

    /// Sets the remote slave unit id (client buses).
    pub fn unit_id(mut self, unit_id: u8) -> Self {
        self.points
            .push(Point::new_value(point_type::ID, unit_id as f64));
        self
    }

    /// Sets the data format point.
    pub fn data_format(mut self, format: &str) -> Self {
        self.points
            .push(Point::new_text(point_type::DATA_FORMAT, format));
        self
    }

    /// Sets the scale and offset points.
    pub fn transform(mut self, scale: f64, offset: f64) -> Self {
        self.points.push(Point::new_value(point_type::SCALE, scale));
        self.points
            .push(Point::new_value(point_type::OFFSET, offset));
        self
    }

    /// Sets the `value` point.
    pub fn value(mut self, value: f64) -> Self {
        self.points.push(Point::new_value(point_type::VALUE, value));
        self
    }

    /// Sets the `valueSet` point.
    pub fn value_set(mut self, value: f64) -> Self {
        self.points
            .push(Point::new_value(point_type::VALUE_SET, value));
        self
    }

    /// Builds the node.
    pub fn build(self) -> Node {
        let mut node = Node::new(self.id.as_str(), node_type::MODBUS_IO);
        for point in self.points {
            node.points.upsert(point);
        }
        node
    }
}
