// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the Modbus subsystem.
//!
//! The bus manager never aborts a tick on these; per-entity failures are
//! logged and skipped, and [`ModbusError::is_port_fatal`] decides whether the
//! serial port must be closed so a later tick reopens it.

use std::io;
use std::time::Duration;

use thiserror::Error;

use pylon_core::error::{BusError, StoreError};

/// Result alias for Modbus operations.
pub type ModbusResult<T> = Result<T, ModbusError>;

/// Errors raised by the Modbus subsystem.
#[derive(Debug, Error)]
pub enum ModbusError {
    /// A required configuration point is absent or has the wrong shape.
    #[error("required configuration point missing: {0}")]
    ConfigMissing(&'static str),

    /// The bus role string is not `client` or `server`.
    #[error("unsupported bus role: {0:?}")]
    UnsupportedRole(String),

    /// The IO type string is not one of the recognized kinds.
    #[error("unsupported modbus IO type: {0:?}")]
    UnsupportedIoType(String),

    /// The data format string is not one of the recognized formats.
    #[error("unsupported data format: {0:?}")]
    UnsupportedFormat(String),

    /// A server bus unit id outside 1..=247.
    #[error("server unit id out of range 1..=247: {0}")]
    InvalidUnitId(i64),

    /// A register IO was configured with a zero scale.
    #[error("register scale must be non-zero")]
    ZeroScale,

    /// The serial port failed at the OS layer.
    #[error("serial port error: {0}")]
    Port(#[from] io::Error),

    /// No reply byte arrived within the response timeout.
    #[error("no response within {0:?}")]
    FrameTimeout(Duration),

    /// A received frame failed its CRC check.
    #[error("frame CRC mismatch: expected {expected:#06x}, received {received:#06x}")]
    FrameCorrupt {
        /// CRC computed over the received payload.
        expected: u16,
        /// CRC carried by the frame.
        received: u16,
    },

    /// The remote slave answered with an exception frame.
    #[error("modbus exception {code:#04x} for function {function:#04x}")]
    Exception {
        /// The function the exception refers to (high bit cleared).
        function: u8,
        /// The exception code byte.
        code: u8,
    },

    /// A reply carried fewer bytes or registers than the request implies.
    #[error("short reply: needed {needed}, got {got}")]
    ShortReply {
        /// Minimum expected length.
        needed: usize,
        /// Actual length.
        got: usize,
    },

    /// A reply echoed a different unit id than the request.
    #[error("unit id mismatch: expected {expected}, got {got}")]
    UnitMismatch {
        /// Unit id of the request.
        expected: u8,
        /// Unit id in the reply.
        got: u8,
    },

    /// A reply echoed a different function code than the request.
    #[error("function mismatch: expected {expected:#04x}, got {got:#04x}")]
    FunctionMismatch {
        /// Function code of the request.
        expected: u8,
        /// Function code in the reply.
        got: u8,
    },

    /// A server register or coil cell that was never created was addressed.
    #[error("unmapped register address {0:#06x}")]
    UnmappedAddress(u16),

    /// An IO pass was attempted while the serial port is closed.
    #[error("serial port is not open")]
    NotOpen,

    /// An IO pass was dispatched against the wrong engine role.
    #[error("bus role does not match IO pass")]
    RoleMismatch,

    /// The configuration store failed.
    #[error("config store error: {0}")]
    Store(#[from] StoreError),

    /// The point bus rejected a publish.
    #[error("point bus error: {0}")]
    Bus(#[from] BusError),
}

impl ModbusError {
    /// Returns `true` if the error means the serial port itself is broken
    /// and must be closed so the next reconciliation pass reopens it.
    ///
    /// Timeouts, CRC failures and protocol exceptions are per-operation:
    /// the port stays open and the operation is retried on a later tick.
    pub fn is_port_fatal(&self) -> bool {
        matches!(self, Self::Port(_))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_fatal_classification() {
        let port = ModbusError::Port(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert!(port.is_port_fatal());

        assert!(!ModbusError::FrameTimeout(Duration::from_secs(1)).is_port_fatal());
        assert!(!ModbusError::FrameCorrupt {
            expected: 0x1234,
            received: 0x4321
        }
        .is_port_fatal());
        assert!(!ModbusError::Exception {
            function: 0x03,
            code: 0x02
        }
        .is_port_fatal());
    }

    #[test]
    fn test_display_formats() {
        let err = ModbusError::Exception {
            function: 0x03,
            code: 0x02,
        };
        assert_eq!(err.to_string(), "modbus exception 0x02 for function 0x03");

        let err = ModbusError::UnsupportedFormat("float64".to_string());
        assert!(err.to_string().contains("float64"));
    }
}
