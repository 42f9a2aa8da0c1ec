// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! A bus endpoint: one serial port running one Modbus role.
//!
//! [`BusEndpoint::reconcile`] applies a bus node's configuration to the
//! endpoint, opening the port lazily and reopening it whenever any of the
//! held settings diverge. IO passes ([`BusEndpoint::client_io`],
//! [`BusEndpoint::server_io`]) keep each configured IO synchronized between
//! the wire, the data model snapshot, and the point bus.
//!
//! Client and server roles are mutually exclusive per endpoint, so serial
//! I/O on a port is strictly serialized: the control loop owns a client
//! port outright, and a server port is owned by its single listener task.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use pylon_core::bus::PointSink;
use pylon_core::point::{bool_to_float, float_to_bool, point_type, point_value, Point};
use pylon_core::types::{Node, NodeId};

use crate::client::Client;
use crate::codec;
use crate::error::{ModbusError, ModbusResult};
use crate::io::{IoType, IoView};
use crate::registers::RegisterBank;
use crate::server::Server;
use crate::transport::{BoxedLink, FrameIo, PortFactory};

// =============================================================================
// BusRole
// =============================================================================

/// The role a bus endpoint plays on its serial line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BusRole {
    /// Master: polls and writes remote slaves.
    Client,
    /// Slave: serves a register bank to a remote master.
    Server,
}

impl BusRole {
    /// Parses a role from its point value string.
    pub fn parse(s: &str) -> ModbusResult<Self> {
        match s {
            point_value::CLIENT => Ok(Self::Client),
            point_value::SERVER => Ok(Self::Server),
            other => Err(ModbusError::UnsupportedRole(other.to_string())),
        }
    }

    /// Returns the point value string for this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Client => point_value::CLIENT,
            Self::Server => point_value::SERVER,
        }
    }
}

impl FromStr for BusRole {
    type Err = ModbusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BusRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Engine
// =============================================================================

/// A running server: its shared bank and the listener task on the port.
struct ServerHandle {
    bank: Arc<RegisterBank>,
    shutdown: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// The role-specific machinery bound to an open port.
enum Engine {
    Client(Client<BoxedLink>),
    Server(ServerHandle),
}

// =============================================================================
// BusEndpoint
// =============================================================================

impl std::fmt::Debug for BusEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusEndpoint")
            .field("node_id", &self.node_id)
            .field("role", &self.role)
            .field("port_name", &self.port_name)
            .field("baud", &self.baud)
            .field("unit_id", &self.unit_id)
            .field("debug_level", &self.debug_level)
            .field("io_initialized", &self.io_initialized)
            .finish_non_exhaustive()
    }
}

/// One configured Modbus bus: a serial port plus its role engine.
pub struct BusEndpoint {
    node_id: NodeId,
    sink: Arc<dyn PointSink>,
    ports: Arc<dyn PortFactory>,

    role: BusRole,
    port_name: String,
    baud: u32,
    unit_id: u8,
    debug_level: i64,

    engine: Option<Engine>,
    io_initialized: HashSet<NodeId>,
}

impl BusEndpoint {
    /// Creates an endpoint from a bus node. The port is not opened here;
    /// [`reconcile`](Self::reconcile) does that on the next pass.
    pub fn new(
        node: &Node,
        sink: Arc<dyn PointSink>,
        ports: Arc<dyn PortFactory>,
    ) -> ModbusResult<Self> {
        let (role, port_name, baud, debug_level) = parse_bus_points(node)?;

        Ok(Self {
            node_id: node.id.clone(),
            sink,
            ports,
            role,
            port_name,
            baud,
            unit_id: 0,
            debug_level,
            engine: None,
            io_initialized: HashSet::new(),
        })
    }

    /// Returns the bus node id.
    pub fn node_id(&self) -> &NodeId {
        &self.node_id
    }

    /// Returns the current role.
    pub fn role(&self) -> BusRole {
        self.role
    }

    /// Returns the configured device path.
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Returns the configured baud rate.
    pub fn baud(&self) -> u32 {
        self.baud
    }

    /// Returns `true` while the port is open.
    pub fn is_open(&self) -> bool {
        self.engine.is_some()
    }

    /// Returns the server register bank, when running as a server.
    pub fn server_bank(&self) -> Option<Arc<RegisterBank>> {
        match &self.engine {
            Some(Engine::Server(handle)) => Some(handle.bank.clone()),
            _ => None,
        }
    }

    /// Applies the bus node's configuration.
    ///
    /// Any change to role, port, baud, server unit id or debug level closes
    /// the open port; a role change additionally resets first-pass state.
    /// With no open port, one is opened and the role engine instantiated.
    pub async fn reconcile(&mut self, node: &Node) -> ModbusResult<()> {
        let (role, port_name, baud, debug_level) = parse_bus_points(node)?;

        let unit_id = match role {
            BusRole::Server => {
                let id = node
                    .points
                    .value_int("", point_type::ID, 0)
                    .ok_or(ModbusError::ConfigMissing(point_type::ID))?;
                if !(1..=247).contains(&id) {
                    return Err(ModbusError::InvalidUnitId(id));
                }
                id as u8
            }
            BusRole::Client => self.unit_id,
        };

        // A finished listener means the port died under the server.
        let listener_dead = matches!(
            &self.engine,
            Some(Engine::Server(handle)) if handle.task.is_finished()
        );
        if listener_dead {
            tracing::warn!(bus = %self.node_id, "server listener died, reopening port");
            self.close_engine().await;
        }

        if role != self.role
            || port_name != self.port_name
            || baud != self.baud
            || unit_id != self.unit_id
            || debug_level != self.debug_level
        {
            if role != self.role {
                self.io_initialized.clear();
            }
            self.close_engine().await;

            self.role = role;
            self.port_name = port_name;
            self.baud = baud;
            self.unit_id = unit_id;
            self.debug_level = debug_level;
        }

        if self.engine.is_none() {
            tracing::info!(
                bus = %self.node_id,
                port = %self.port_name,
                baud = self.baud,
                role = %self.role,
                "opening modbus port"
            );

            let link = self.ports.open(&self.port_name, self.baud)?;
            let io = FrameIo::new(link).with_frame_tracing(self.debug_level > 0);

            self.engine = Some(match self.role {
                BusRole::Client => Engine::Client(Client::new(io)),
                BusRole::Server => {
                    let bank = Arc::new(RegisterBank::new());
                    let (shutdown, receiver) = broadcast::channel(1);
                    let server = Server::new(self.unit_id, bank.clone());
                    let task = tokio::spawn(server.listen(io, receiver));
                    Engine::Server(ServerHandle {
                        bank,
                        shutdown,
                        task,
                    })
                }
            });
        }

        Ok(())
    }

    /// Runs one client-role pass for an IO.
    ///
    /// Reads the remote state, publishes it, and pushes `valueSet` to the
    /// remote when it diverges from what was just read. A port-level failure
    /// closes the port so the next tick reopens it.
    pub async fn client_io(&mut self, io: &IoView) -> ModbusResult<()> {
        let result = self.client_io_inner(io).await;

        if let Err(err) = &result {
            if err.is_port_fatal() {
                tracing::warn!(bus = %self.node_id, error = %err, "port failure, closing modbus port");
                self.close_engine().await;
            }
        }

        result
    }

    async fn client_io_inner(&mut self, io: &IoView) -> ModbusResult<()> {
        let engine = self.engine.as_mut().ok_or(ModbusError::NotOpen)?;
        let client = match engine {
            Engine::Client(client) => client,
            Engine::Server(_) => return Err(ModbusError::RoleMismatch),
        };
        let sink = &*self.sink;

        match io.io_type {
            IoType::Coil => {
                let value = read_remote_bit(client, sink, io).await?;
                if io.value_set != value {
                    client
                        .write_single_coil(io.unit_id, io.address, float_to_bool(io.value_set))
                        .await?;
                    publish_value(sink, &io.node_id, io.value_set)?;
                }
            }
            IoType::DiscreteInput => {
                read_remote_bit(client, sink, io).await?;
            }
            IoType::HoldingRegister => {
                let value = read_remote_register(client, sink, io).await?;
                if io.value_set != value {
                    write_remote_register(client, io).await?;
                    publish_value(sink, &io.node_id, io.value_set)?;
                }
            }
            IoType::InputRegister => {
                read_remote_register(client, sink, io).await?;
            }
        }

        Ok(())
    }

    /// Runs one server-role pass for an IO.
    ///
    /// Read-only kinds continuously push the data model into the bank.
    /// Master-writable kinds are seeded from the model once per endpoint
    /// lifetime; afterwards the bank is authoritative and divergence is
    /// published outward.
    pub fn server_io(&mut self, io: &IoView) -> ModbusResult<()> {
        let engine = self.engine.as_ref().ok_or(ModbusError::NotOpen)?;
        let bank = match engine {
            Engine::Server(handle) => &handle.bank,
            Engine::Client(_) => return Err(ModbusError::RoleMismatch),
        };

        match io.io_type {
            IoType::DiscreteInput => {
                bank.add_coil(io.address);
                bank.write_coil(io.address, float_to_bool(io.value))?;
            }
            IoType::Coil => {
                if !self.io_initialized.contains(&io.node_id) {
                    bank.add_coil(io.address);
                    bank.write_coil(io.address, float_to_bool(io.value))?;
                    self.io_initialized.insert(io.node_id.clone());
                }

                let stored = bank.read_coil(io.address)?;
                if stored != float_to_bool(io.value) {
                    publish_value(&*self.sink, &io.node_id, bool_to_float(stored))?;
                }
            }
            IoType::InputRegister => {
                seed_register(bank, io)?;
            }
            IoType::HoldingRegister => {
                if !self.io_initialized.contains(&io.node_id) {
                    seed_register(bank, io)?;
                    self.io_initialized.insert(io.node_id.clone());
                }

                let format = io.register_format()?;
                let regs = bank.read_regs(io.address, format.reg_count())?;
                let stored = io.transform.apply(codec::decode(format, &regs)?);
                if stored != io.value {
                    publish_value(&*self.sink, &io.node_id, stored)?;
                }
            }
        }

        Ok(())
    }

    /// Closes the port and stops any listener.
    pub async fn close(&mut self) {
        if self.engine.is_some() {
            tracing::info!(bus = %self.node_id, port = %self.port_name, "closing modbus port");
        }
        self.close_engine().await;
    }

    async fn close_engine(&mut self) {
        match self.engine.take() {
            Some(Engine::Client(_)) => {
                // Dropping the client drops the port.
            }
            Some(Engine::Server(handle)) => {
                let _ = handle.shutdown.send(());
                let _ = handle.task.await;
            }
            None => {}
        }
    }
}

/// Parses the bus-level points shared by both roles.
fn parse_bus_points(node: &Node) -> ModbusResult<(BusRole, String, u32, i64)> {
    let role = node
        .points
        .text("", point_type::CLIENT_SERVER, 0)
        .ok_or(ModbusError::ConfigMissing(point_type::CLIENT_SERVER))?
        .parse::<BusRole>()?;

    let port_name = node
        .points
        .text("", point_type::PORT, 0)
        .ok_or(ModbusError::ConfigMissing(point_type::PORT))?
        .to_string();

    let baud = node
        .points
        .value("", point_type::BAUD, 0)
        .ok_or(ModbusError::ConfigMissing(point_type::BAUD))? as u32;

    let debug_level = node.points.value_int("", point_type::DEBUG, 0).unwrap_or(0);

    Ok((role, port_name, baud, debug_level))
}

/// Reads one bit from the remote, publishes it, returns it as a point value.
async fn read_remote_bit(
    client: &mut Client<BoxedLink>,
    sink: &dyn PointSink,
    io: &IoView,
) -> ModbusResult<f64> {
    let bits = match io.io_type {
        IoType::Coil => client.read_coils(io.unit_id, io.address, 1).await?,
        IoType::DiscreteInput => {
            client
                .read_discrete_inputs(io.unit_id, io.address, 1)
                .await?
        }
        other => return Err(ModbusError::UnsupportedIoType(other.to_string())),
    };

    let bit = bits
        .first()
        .copied()
        .ok_or(ModbusError::ShortReply { needed: 1, got: 0 })?;

    let value = bool_to_float(bit);
    publish_value(sink, &io.node_id, value)?;
    Ok(value)
}

/// Reads a register value from the remote, publishes it scaled, returns it.
async fn read_remote_register(
    client: &mut Client<BoxedLink>,
    sink: &dyn PointSink,
    io: &IoView,
) -> ModbusResult<f64> {
    let format = io.register_format()?;
    let count = format.reg_count() as u16;

    let regs = match io.io_type {
        IoType::HoldingRegister => {
            client
                .read_holding_registers(io.unit_id, io.address, count)
                .await?
        }
        IoType::InputRegister => {
            client
                .read_input_registers(io.unit_id, io.address, count)
                .await?
        }
        other => return Err(ModbusError::UnsupportedIoType(other.to_string())),
    };

    let raw = codec::decode(format, &regs)?;
    let value = io.transform.apply(raw);
    publish_value(sink, &io.node_id, value)?;
    Ok(value)
}

/// Pushes `valueSet` to a remote holding register.
///
/// Wide formats are written as two Write Single Register calls at
/// consecutive addresses, low index first, in encoder order; slaves that
/// only implement function 0x06 stay compatible.
async fn write_remote_register(client: &mut Client<BoxedLink>, io: &IoView) -> ModbusResult<()> {
    let format = io.register_format()?;
    let raw = io.transform.invert(io.value_set);

    for (offset, reg) in codec::encode(format, raw).into_iter().enumerate() {
        client
            .write_single_register(io.unit_id, io.address.wrapping_add(offset as u16), reg)
            .await?;
    }

    Ok(())
}

/// Encodes the data model value into the bank, creating cells as needed.
fn seed_register(bank: &RegisterBank, io: &IoView) -> ModbusResult<()> {
    let format = io.register_format()?;
    let regs = codec::encode(format, io.transform.invert(io.value));
    bank.add_regs(io.address, regs.len());
    bank.write_regs(io.address, &regs)
}

fn publish_value(sink: &dyn PointSink, node: &NodeId, value: f64) -> ModbusResult<()> {
    sink.send_point(node, Point::new_value(point_type::VALUE, value))?;
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use pylon_core::bus::PointBus;
    use pylon_core::point::node_type;

    /// Hands out duplex links and keeps the far halves alive.
    struct DuplexFactory {
        opened: Mutex<Vec<(String, u32)>>,
        peers: Mutex<Vec<tokio::io::DuplexStream>>,
    }

    impl DuplexFactory {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                opened: Mutex::new(Vec::new()),
                peers: Mutex::new(Vec::new()),
            })
        }

        fn opens(&self) -> Vec<(String, u32)> {
            self.opened.lock().clone()
        }
    }

    impl PortFactory for DuplexFactory {
        fn open(&self, path: &str, baud: u32) -> ModbusResult<BoxedLink> {
            self.opened.lock().push((path.to_string(), baud));
            let (near, far) = tokio::io::duplex(1024);
            self.peers.lock().push(far);
            Ok(Box::new(near))
        }
    }

    fn bus_node(role: &str, port: &str, baud: f64) -> Node {
        let mut node = Node::new("bus-1", node_type::MODBUS);
        node.points
            .upsert(Point::new_text(point_type::CLIENT_SERVER, role));
        node.points.upsert(Point::new_text(point_type::PORT, port));
        node.points.upsert(Point::new_value(point_type::BAUD, baud));
        node
    }

    fn endpoint(node: &Node, ports: Arc<DuplexFactory>) -> BusEndpoint {
        BusEndpoint::new(node, Arc::new(PointBus::new(16)), ports).unwrap()
    }

    #[test]
    fn test_new_requires_role_port_baud() {
        let ports = DuplexFactory::new();
        let sink: Arc<dyn PointSink> = Arc::new(PointBus::new(16));

        let mut node = Node::new("bus-1", node_type::MODBUS);
        let err = BusEndpoint::new(&node, sink.clone(), ports.clone()).unwrap_err();
        assert!(matches!(err, ModbusError::ConfigMissing("clientServer")));

        node.points
            .upsert(Point::new_text(point_type::CLIENT_SERVER, "peer"));
        let err = BusEndpoint::new(&node, sink, ports).unwrap_err();
        assert!(matches!(err, ModbusError::UnsupportedRole(_)));
    }

    #[tokio::test]
    async fn test_reconcile_opens_once_for_stable_config() {
        let ports = DuplexFactory::new();
        let node = bus_node(point_value::CLIENT, "/dev/ttyUSB0", 9600.0);
        let mut endpoint = endpoint(&node, ports.clone());

        endpoint.reconcile(&node).await.unwrap();
        endpoint.reconcile(&node).await.unwrap();

        assert!(endpoint.is_open());
        assert_eq!(ports.opens(), vec![("/dev/ttyUSB0".to_string(), 9600)]);
        endpoint.close().await;
        assert!(!endpoint.is_open());
    }

    #[tokio::test]
    async fn test_baud_change_reopens_port() {
        let ports = DuplexFactory::new();
        let node = bus_node(point_value::CLIENT, "/dev/ttyUSB0", 9600.0);
        let mut endpoint = endpoint(&node, ports.clone());
        endpoint.reconcile(&node).await.unwrap();

        let changed = bus_node(point_value::CLIENT, "/dev/ttyUSB0", 19200.0);
        endpoint.reconcile(&changed).await.unwrap();

        assert_eq!(
            ports.opens(),
            vec![
                ("/dev/ttyUSB0".to_string(), 9600),
                ("/dev/ttyUSB0".to_string(), 19200),
            ]
        );
        assert_eq!(endpoint.baud(), 19200);
        endpoint.close().await;
    }

    #[tokio::test]
    async fn test_server_requires_unit_id_in_range() {
        let ports = DuplexFactory::new();
        let mut node = bus_node(point_value::SERVER, "/dev/ttyUSB1", 9600.0);
        let mut endpoint = endpoint(&node, ports.clone());

        let err = endpoint.reconcile(&node).await.unwrap_err();
        assert!(matches!(err, ModbusError::ConfigMissing("id")));

        node.points.upsert(Point::new_value(point_type::ID, 300.0));
        let err = endpoint.reconcile(&node).await.unwrap_err();
        assert!(matches!(err, ModbusError::InvalidUnitId(300)));

        node.points.upsert(Point::new_value(point_type::ID, 7.0));
        endpoint.reconcile(&node).await.unwrap();
        assert!(endpoint.server_bank().is_some());
        endpoint.close().await;
    }

    #[tokio::test]
    async fn test_role_flip_swaps_engine() {
        let ports = DuplexFactory::new();
        let node = bus_node(point_value::CLIENT, "/dev/ttyUSB0", 9600.0);
        let mut endpoint = endpoint(&node, ports.clone());
        endpoint.reconcile(&node).await.unwrap();
        assert!(endpoint.server_bank().is_none());

        let mut flipped = bus_node(point_value::SERVER, "/dev/ttyUSB0", 9600.0);
        flipped.points.upsert(Point::new_value(point_type::ID, 7.0));
        endpoint.reconcile(&flipped).await.unwrap();

        assert_eq!(endpoint.role(), BusRole::Server);
        assert!(endpoint.server_bank().is_some());
        assert_eq!(ports.opens().len(), 2);
        endpoint.close().await;
    }

    #[tokio::test]
    async fn test_io_pass_without_port_fails() {
        let ports = DuplexFactory::new();
        let node = bus_node(point_value::CLIENT, "/dev/ttyUSB0", 9600.0);
        let mut endpoint = endpoint(&node, ports);

        let io = IoView {
            node_id: NodeId::new("io-1"),
            unit_id: 1,
            address: 0,
            io_type: IoType::Coil,
            format: None,
            transform: codec::Transform::identity(),
            value: 0.0,
            value_set: 0.0,
        };

        assert!(matches!(
            endpoint.client_io(&io).await.unwrap_err(),
            ModbusError::NotOpen
        ));
    }
}
