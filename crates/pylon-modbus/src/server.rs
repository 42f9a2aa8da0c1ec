// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus-RTU slave.
//!
//! A [`Server`] is bound to one unit id and serves its [`RegisterBank`] to
//! whatever master polls the line. [`Server::handle_frame`] is the pure
//! request dispatcher; [`Server::listen`] is the long-lived listener task a
//! bus endpoint spawns next to its serial port.
//!
//! Unit-id filtering is strict: frames addressed to any other unit produce
//! no reply at all, since another slave on the wire may be the intended
//! recipient.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::error::ModbusError;
use crate::frame::{
    pack_bits, EXCEPTION_FLAG, EXC_ILLEGAL_DATA_ADDRESS, EXC_ILLEGAL_FUNCTION, FUNC_READ_COILS,
    FUNC_READ_DISCRETE_INPUTS, FUNC_READ_HOLDING_REGISTERS, FUNC_READ_INPUT_REGISTERS,
    FUNC_WRITE_SINGLE_COIL, FUNC_WRITE_SINGLE_REGISTER, COIL_ON,
};
use crate::registers::RegisterBank;
use crate::transport::{FrameIo, Link};

/// Modbus-RTU slave bound to a single unit id.
#[derive(Debug)]
pub struct Server {
    unit_id: u8,
    bank: Arc<RegisterBank>,
}

impl Server {
    /// Creates a server for `unit_id` over the shared bank.
    pub fn new(unit_id: u8, bank: Arc<RegisterBank>) -> Self {
        Self { unit_id, bank }
    }

    /// Returns the bound unit id.
    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    /// Returns the shared register bank.
    pub fn bank(&self) -> &Arc<RegisterBank> {
        &self.bank
    }

    /// Dispatches one CRC-stripped request body and builds the reply body.
    ///
    /// Returns `None` when the frame must be answered with silence: a
    /// non-matching unit id, or a request too malformed to echo safely.
    pub fn handle_frame(&self, body: &[u8]) -> Option<Vec<u8>> {
        if body.len() < 2 || body[0] != self.unit_id {
            return None;
        }

        let function = body[1];
        // Every supported request carries exactly two 16-bit fields.
        let payload = body.get(2..);
        let fields = match payload {
            Some(p) if p.len() >= 4 => Some((
                u16::from_be_bytes([p[0], p[1]]),
                u16::from_be_bytes([p[2], p[3]]),
            )),
            _ => None,
        };

        let result = match function {
            FUNC_READ_COILS | FUNC_READ_DISCRETE_INPUTS => {
                let (address, count) = fields?;
                self.read_bits(address, count)
            }
            FUNC_READ_HOLDING_REGISTERS | FUNC_READ_INPUT_REGISTERS => {
                let (address, count) = fields?;
                self.read_words(address, count)
            }
            FUNC_WRITE_SINGLE_COIL => {
                let (address, value) = fields?;
                self.write_bit(address, value)
            }
            FUNC_WRITE_SINGLE_REGISTER => {
                let (address, value) = fields?;
                self.write_word(address, value)
            }
            _ => Err(EXC_ILLEGAL_FUNCTION),
        };

        Some(match result {
            Ok(pdu) => {
                let mut reply = vec![self.unit_id, function];
                reply.extend_from_slice(&pdu);
                reply
            }
            Err(code) => vec![self.unit_id, function | EXCEPTION_FLAG, code],
        })
    }

    fn read_bits(&self, address: u16, count: u16) -> Result<Vec<u8>, u8> {
        let bits = (0..count)
            .map(|offset| self.bank.read_coil(address.wrapping_add(offset)))
            .collect::<Result<Vec<bool>, ModbusError>>()
            .map_err(|_| EXC_ILLEGAL_DATA_ADDRESS)?;

        let bytes = pack_bits(&bits);
        let mut pdu = vec![bytes.len() as u8];
        pdu.extend_from_slice(&bytes);
        Ok(pdu)
    }

    fn read_words(&self, address: u16, count: u16) -> Result<Vec<u8>, u8> {
        let regs = self
            .bank
            .read_regs(address, count as usize)
            .map_err(|_| EXC_ILLEGAL_DATA_ADDRESS)?;

        let mut pdu = vec![(regs.len() * 2) as u8];
        for reg in regs {
            pdu.extend_from_slice(&reg.to_be_bytes());
        }
        Ok(pdu)
    }

    fn write_bit(&self, address: u16, value: u16) -> Result<Vec<u8>, u8> {
        self.bank
            .write_coil(address, value == COIL_ON)
            .map_err(|_| EXC_ILLEGAL_DATA_ADDRESS)?;
        Ok(Self::echo(address, value))
    }

    fn write_word(&self, address: u16, value: u16) -> Result<Vec<u8>, u8> {
        self.bank
            .write_reg(address, value)
            .map_err(|_| EXC_ILLEGAL_DATA_ADDRESS)?;
        Ok(Self::echo(address, value))
    }

    fn echo(address: u16, value: u16) -> Vec<u8> {
        let mut pdu = Vec::with_capacity(4);
        pdu.extend_from_slice(&address.to_be_bytes());
        pdu.extend_from_slice(&value.to_be_bytes());
        pdu
    }

    /// Serves the line until shutdown or a port failure.
    ///
    /// Idle timeouts keep the loop waiting; corrupt or runt frames are
    /// dropped; a port-level failure ends the task, and a later
    /// reconciliation pass reopens the port with a fresh listener.
    pub async fn listen<L: Link>(self, mut io: FrameIo<L>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(unit_id = self.unit_id, "modbus server listening");

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                result = io.read_frame() => match result {
                    Ok(body) => {
                        if let Some(reply) = self.handle_frame(&body) {
                            if let Err(err) = io.write_frame(&reply).await {
                                tracing::warn!(
                                    unit_id = self.unit_id,
                                    error = %err,
                                    "reply write failed, listener exiting"
                                );
                                break;
                            }
                        }
                    }
                    Err(ModbusError::FrameTimeout(_)) => {}
                    Err(err @ (ModbusError::FrameCorrupt { .. } | ModbusError::ShortReply { .. })) => {
                        tracing::debug!(unit_id = self.unit_id, error = %err, "dropping bad frame");
                    }
                    Err(err) => {
                        tracing::warn!(
                            unit_id = self.unit_id,
                            error = %err,
                            "port error, listener exiting"
                        );
                        break;
                    }
                },
            }
        }

        tracing::info!(unit_id = self.unit_id, "modbus server stopped");
    }
}

// =============================================================================
// Tests
// =============================================================================
