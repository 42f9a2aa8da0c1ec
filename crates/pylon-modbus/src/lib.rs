// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # pylon-modbus
//!
//! Modbus-RTU protocol subsystem for the pylon industrial IoT gateway.
//!
//! The subsystem owns one or more serial ports, each running a Modbus-RTU
//! endpoint in either client (master) or server (slave) role, bridges
//! register and coil state to the gateway's node/point data model, and
//! publishes observed changes over the point bus.
//!
//! ```text
//! ConfigStore ──poll──▶ BusManager ──owns──▶ BusEndpoint (per bus node)
//!                                                 │
//!                                    ┌────────────┴────────────┐
//!                                    ▼                         ▼
//!                                 Client                    Server
//!                              (poll/write)          (RegisterBank + listener)
//!                                    │                         │
//!                                    └────────▶ FrameIo ◀──────┘
//!                                                 │
//!                                            SerialPort
//! BusEndpoint ──publish "value" points──▶ PointSink
//! ```
//!
//! [`BusManager::tick`](manager::BusManager::tick) is the only entry point
//! the gateway runtime needs: called on a fixed cadence, it reconciles the
//! set of live endpoints against the `modbus` nodes in the store, runs one
//! pass per `modbusIo` child, and tears down endpoints whose node vanished.
//!
//! Supported wire functions: 0x01 Read Coils, 0x02 Read Discrete Inputs,
//! 0x03 Read Holding Registers, 0x04 Read Input Registers, 0x05 Write
//! Single Coil, 0x06 Write Single Register. Modbus-TCP is out of scope.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod client;
pub mod codec;
pub mod endpoint;
pub mod error;
pub mod frame;
pub mod io;
pub mod manager;
pub mod registers;
pub mod server;
pub mod transport;

pub use client::Client;
pub use codec::{DataFormat, Transform};
pub use endpoint::{BusEndpoint, BusRole};
pub use error::{ModbusError, ModbusResult};
pub use io::{IoType, IoView};
pub use manager::BusManager;
pub use registers::RegisterBank;
pub use server::Server;
pub use transport::{BoxedLink, FrameIo, Link, PortFactory, SerialFactory};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
