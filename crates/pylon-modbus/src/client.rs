// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus-RTU master.
//!
//! One request/response transaction at a time over the owned [`FrameIo`];
//! the control loop is the only caller, so operations are strictly
//! serialized. Replies are validated against the request: echoed unit id,
//! echoed function code (an exception bit surfaces the slave's exception
//! code), and payload length.

use crate::error::{ModbusError, ModbusResult};
use crate::frame::{
    self, EXCEPTION_FLAG, FUNC_READ_COILS, FUNC_READ_DISCRETE_INPUTS,
    FUNC_READ_HOLDING_REGISTERS, FUNC_READ_INPUT_REGISTERS, FUNC_WRITE_SINGLE_COIL,
    FUNC_WRITE_SINGLE_REGISTER,
};
use crate::transport::{FrameIo, Link};

/// Modbus-RTU master over a serial link.
pub struct Client<L> {
    io: FrameIo<L>,
}

impl<L: Link> Client<L> {
    /// Creates a client over the given frame transport.
    pub fn new(io: FrameIo<L>) -> Self {
        Self { io }
    }

    /// Reads `count` coils starting at `address` from `unit`.
    pub async fn read_coils(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<bool>> {
        self.read_bits(FUNC_READ_COILS, unit, address, count).await
    }

    /// Reads `count` discrete inputs starting at `address` from `unit`.
    pub async fn read_discrete_inputs(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<bool>> {
        self.read_bits(FUNC_READ_DISCRETE_INPUTS, unit, address, count)
            .await
    }

    /// Reads `count` holding registers starting at `address` from `unit`.
    pub async fn read_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        self.read_words(FUNC_READ_HOLDING_REGISTERS, unit, address, count)
            .await
    }

    /// Reads `count` input registers starting at `address` from `unit`.
    pub async fn read_input_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        self.read_words(FUNC_READ_INPUT_REGISTERS, unit, address, count)
            .await
    }

    /// Writes a single coil on `unit` (wire value 0xFF00 or 0x0000).
    pub async fn write_single_coil(
        &mut self,
        unit: u8,
        address: u16,
        on: bool,
    ) -> ModbusResult<()> {
        let value = if on { frame::COIL_ON } else { frame::COIL_OFF };
        self.transact(unit, FUNC_WRITE_SINGLE_COIL, address, value)
            .await?;
        Ok(())
    }

    /// Writes a single holding register on `unit`.
    pub async fn write_single_register(
        &mut self,
        unit: u8,
        address: u16,
        value: u16,
    ) -> ModbusResult<()> {
        self.transact(unit, FUNC_WRITE_SINGLE_REGISTER, address, value)
            .await?;
        Ok(())
    }

    async fn read_bits(
        &mut self,
        function: u8,
        unit: u8,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<bool>> {
        let payload = self.transact(unit, function, address, count).await?;
        let data = Self::counted_payload(&payload, (count as usize).div_ceil(8))?;
        Ok(frame::unpack_bits(data, count as usize))
    }

    async fn read_words(
        &mut self,
        function: u8,
        unit: u8,
        address: u16,
        count: u16,
    ) -> ModbusResult<Vec<u16>> {
        let payload = self.transact(unit, function, address, count).await?;
        let data = Self::counted_payload(&payload, count as usize * 2)?;
        Ok(data
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Runs one transaction. Every supported request carries two 16-bit
    /// fields after the function code (address + count, or address + value).
    async fn transact(
        &mut self,
        unit: u8,
        function: u8,
        a: u16,
        b: u16,
    ) -> ModbusResult<Vec<u8>> {
        let body = [
            unit,
            function,
            (a >> 8) as u8,
            a as u8,
            (b >> 8) as u8,
            b as u8,
        ];
        self.io.write_frame(&body).await?;

        let reply = self.io.read_frame().await?;
        if reply.len() < 2 {
            return Err(ModbusError::ShortReply {
                needed: 2,
                got: reply.len(),
            });
        }
        if reply[0] != unit {
            return Err(ModbusError::UnitMismatch {
                expected: unit,
                got: reply[0],
            });
        }

        let echoed = reply[1];
        if echoed & EXCEPTION_FLAG != 0 {
            return Err(ModbusError::Exception {
                function: echoed & !EXCEPTION_FLAG,
                code: reply.get(2).copied().unwrap_or(0),
            });
        }
        if echoed != function {
            return Err(ModbusError::FunctionMismatch {
                expected: function,
                got: echoed,
            });
        }

        Ok(reply[2..].to_vec())
    }

    /// Validates a byte-counted read payload and returns the counted bytes.
    fn counted_payload(payload: &[u8], needed: usize) -> ModbusResult<&[u8]> {
        let byte_count = *payload.first().ok_or(ModbusError::ShortReply {
            needed: 1,
            got: 0,
        })? as usize;
        let data = &payload[1..];

        if byte_count < needed || data.len() < byte_count {
            return Err(ModbusError::ShortReply {
                needed,
                got: byte_count.min(data.len()),
            });
        }

        Ok(&data[..byte_count])
    }
}

// =============================================================================
// Tests
// =============================================================================
