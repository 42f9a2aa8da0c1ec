// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The server-side register store.
//!
//! Registers and coils live in separate address spaces. Cells exist only
//! once created by an `add_*` call (first reference); reads and writes of
//! absent cells fail with [`ModbusError::UnmappedAddress`], which the server
//! surfaces as exception 0x02.
//!
//! The store is shared between the server listener task and the control
//! loop. Each address is an atomic cell; there is no multi-address
//! atomicity, matching the protocol itself, so a reader of a 32-bit pair may
//! observe a torn value.

use dashmap::DashMap;

use crate::error::{ModbusError, ModbusResult};

/// Concurrent register and coil store for a server bus.
#[derive(Debug, Default)]
pub struct RegisterBank {
    regs: DashMap<u16, u16>,
    coils: DashMap<u16, bool>,
}

impl RegisterBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Registers
    // =========================================================================

    /// Creates `count` register cells at `address`, keeping existing values.
    pub fn add_regs(&self, address: u16, count: usize) {
        for offset in 0..count {
            self.regs.entry(address.wrapping_add(offset as u16)).or_insert(0);
        }
    }

    /// Reads one register.
    pub fn read_reg(&self, address: u16) -> ModbusResult<u16> {
        self.regs
            .get(&address)
            .map(|cell| *cell)
            .ok_or(ModbusError::UnmappedAddress(address))
    }

    /// Reads `count` consecutive registers.
    pub fn read_regs(&self, address: u16, count: usize) -> ModbusResult<Vec<u16>> {
        (0..count)
            .map(|offset| self.read_reg(address.wrapping_add(offset as u16)))
            .collect()
    }

    /// Writes one register.
    pub fn write_reg(&self, address: u16, value: u16) -> ModbusResult<()> {
        let mut cell = self
            .regs
            .get_mut(&address)
            .ok_or(ModbusError::UnmappedAddress(address))?;
        *cell = value;
        Ok(())
    }

    /// Writes consecutive registers, verifying all cells exist first.
    pub fn write_regs(&self, address: u16, values: &[u16]) -> ModbusResult<()> {
        for offset in 0..values.len() {
            let addr = address.wrapping_add(offset as u16);
            if !self.regs.contains_key(&addr) {
                return Err(ModbusError::UnmappedAddress(addr));
            }
        }
        for (offset, &value) in values.iter().enumerate() {
            self.write_reg(address.wrapping_add(offset as u16), value)?;
        }
        Ok(())
    }

    // =========================================================================
    // Coils
    // =========================================================================

    /// Creates a coil cell at `address`, keeping an existing value.
    pub fn add_coil(&self, address: u16) {
        self.coils.entry(address).or_insert(false);
    }

    /// Reads one coil.
    pub fn read_coil(&self, address: u16) -> ModbusResult<bool> {
        self.coils
            .get(&address)
            .map(|cell| *cell)
            .ok_or(ModbusError::UnmappedAddress(address))
    }

    /// Writes one coil.
    pub fn write_coil(&self, address: u16, value: bool) -> ModbusResult<()> {
        let mut cell = self
            .coils
            .get_mut(&address)
            .ok_or(ModbusError::UnmappedAddress(address))?;
        *cell = value;
        Ok(())
    }

    /// Number of mapped register cells.
    pub fn reg_count(&self) -> usize {
        self.regs.len()
    }

    /// Number of mapped coil cells.
    pub fn coil_count(&self) -> usize {
        self.coils.len()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cells_exist_only_after_add() {
        let bank = RegisterBank::new();

        assert!(matches!(
            bank.read_reg(0x0020),
            Err(ModbusError::UnmappedAddress(0x0020))
        ));
        assert!(bank.write_reg(0x0020, 1).is_err());

        bank.add_regs(0x0020, 1);
        assert_eq!(bank.read_reg(0x0020).unwrap(), 0);
        bank.write_reg(0x0020, 0xFFFB).unwrap();
        assert_eq!(bank.read_reg(0x0020).unwrap(), 0xFFFB);
    }

    #[test]
    fn test_add_preserves_existing_values() {
        let bank = RegisterBank::new();
        bank.add_regs(0x0010, 2);
        bank.write_reg(0x0010, 42).unwrap();

        bank.add_regs(0x0010, 2);
        assert_eq!(bank.read_reg(0x0010).unwrap(), 42);

        bank.add_coil(5);
        bank.write_coil(5, true).unwrap();
        bank.add_coil(5);
        assert!(bank.read_coil(5).unwrap());
    }

    #[test]
    fn test_multi_register_read_write() {
        let bank = RegisterBank::new();
        bank.add_regs(0x0100, 2);

        bank.write_regs(0x0100, &[0x4048, 0xF5C3]).unwrap();
        assert_eq!(bank.read_regs(0x0100, 2).unwrap(), vec![0x4048, 0xF5C3]);

        // A region straddling an unmapped cell fails without partial writes.
        let err = bank.write_regs(0x0101, &[1, 2]).unwrap_err();
        assert!(matches!(err, ModbusError::UnmappedAddress(0x0102)));
        assert_eq!(bank.read_regs(0x0100, 2).unwrap(), vec![0x4048, 0xF5C3]);
    }

    #[test]
    fn test_coils_separate_from_registers() {
        let bank = RegisterBank::new();
        bank.add_regs(7, 1);
        assert!(bank.read_coil(7).is_err());

        bank.add_coil(7);
        bank.write_coil(7, true).unwrap();
        assert!(bank.read_coil(7).unwrap());
        assert_eq!(bank.read_reg(7).unwrap(), 0);
    }
}
