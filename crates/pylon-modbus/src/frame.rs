// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Modbus-RTU frame primitives: function codes, CRC, bit packing.
//!
//! An RTU frame is `[unit][function][payload...][crc_lo][crc_hi]` with
//! CRC-16/Modbus computed over everything before the checksum. Frame
//! boundaries are carried by line silence, not by the payload, so the
//! transport layer ([`crate::transport::FrameIo`]) owns the timing and this
//! module owns the bytes.

use crc::{Crc, CRC_16_MODBUS};

use crate::error::{ModbusError, ModbusResult};

// =============================================================================
// Wire constants
// =============================================================================

/// Largest legal RTU frame, checksum included.
pub const MAX_FRAME_LEN: usize = 256;

/// Smallest legal RTU frame: unit + function + checksum.
pub const MIN_FRAME_LEN: usize = 4;

/// Read Coils.
pub const FUNC_READ_COILS: u8 = 0x01;
/// Read Discrete Inputs.
pub const FUNC_READ_DISCRETE_INPUTS: u8 = 0x02;
/// Read Holding Registers.
pub const FUNC_READ_HOLDING_REGISTERS: u8 = 0x03;
/// Read Input Registers.
pub const FUNC_READ_INPUT_REGISTERS: u8 = 0x04;
/// Write Single Coil.
pub const FUNC_WRITE_SINGLE_COIL: u8 = 0x05;
/// Write Single Register.
pub const FUNC_WRITE_SINGLE_REGISTER: u8 = 0x06;

/// High bit marking an exception reply.
pub const EXCEPTION_FLAG: u8 = 0x80;
/// Exception: illegal function.
pub const EXC_ILLEGAL_FUNCTION: u8 = 0x01;
/// Exception: illegal data address.
pub const EXC_ILLEGAL_DATA_ADDRESS: u8 = 0x02;

/// Wire value of an asserted coil in Write Single Coil.
pub const COIL_ON: u16 = 0xFF00;
/// Wire value of a cleared coil in Write Single Coil.
pub const COIL_OFF: u16 = 0x0000;

// =============================================================================
// CRC-16/Modbus
// =============================================================================

const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// Computes the CRC-16/Modbus checksum of `data`.
#[inline]
pub fn crc16(data: &[u8]) -> u16 {
    CRC16.checksum(data)
}

/// Appends the checksum to a frame body, low byte first.
pub fn append_crc(frame: &mut Vec<u8>) {
    let crc = crc16(frame);
    frame.extend_from_slice(&crc.to_le_bytes());
}

/// Validates a full frame's checksum and returns the body without it.
pub fn check_crc(frame: &[u8]) -> ModbusResult<&[u8]> {
    if frame.len() < MIN_FRAME_LEN {
        return Err(ModbusError::ShortReply {
            needed: MIN_FRAME_LEN,
            got: frame.len(),
        });
    }

    let split = frame.len() - 2;
    let received = u16::from_le_bytes([frame[split], frame[split + 1]]);
    let expected = crc16(&frame[..split]);

    if received != expected {
        return Err(ModbusError::FrameCorrupt { expected, received });
    }

    Ok(&frame[..split])
}

// =============================================================================
// Coil bit packing
// =============================================================================

/// Packs coil states into payload bytes, LSB first.
pub fn pack_bits(bits: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        if bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    bytes
}

/// Unpacks `count` coil states from payload bytes, LSB first.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Vec<bool> {
    (0..count)
        .map(|i| {
            bytes
                .get(i / 8)
                .map(|byte| byte >> (i % 8) & 0x01 == 1)
                .unwrap_or(false)
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc16_check_vector() {
        // Standard CRC-16/Modbus check input.
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn test_append_is_low_byte_first() {
        let mut frame = b"123456789".to_vec();
        append_crc(&mut frame);
        assert_eq!(&frame[9..], &[0x37, 0x4B]);
    }

    #[test]
    fn test_check_crc_round_trip() {
        let mut frame = vec![0x03, 0x03, 0x00, 0x10, 0x00, 0x01];
        append_crc(&mut frame);
        let body = check_crc(&frame).unwrap();
        assert_eq!(body, &[0x03, 0x03, 0x00, 0x10, 0x00, 0x01]);
    }

    #[test]
    fn test_check_crc_rejects_any_single_bit_flip() {
        let mut frame = vec![0x07, 0x03, 0x02, 0x12, 0x34];
        append_crc(&mut frame);

        for byte in 0..frame.len() {
            for bit in 0..8 {
                let mut corrupt = frame.clone();
                corrupt[byte] ^= 1 << bit;
                assert!(
                    check_crc(&corrupt).is_err(),
                    "flip of byte {byte} bit {bit} went undetected"
                );
            }
        }
    }

    #[test]
    fn test_check_crc_rejects_runt_frames() {
        for len in 0..MIN_FRAME_LEN {
            let frame = vec![0u8; len];
            assert!(matches!(
                check_crc(&frame),
                Err(ModbusError::ShortReply { .. })
            ));
        }
    }

    #[test]
    fn test_bit_packing_round_trip() {
        let bits = vec![
            true, false, true, true, false, false, false, true, // 0x8D
            true, false, true, // 0x05
        ];
        let bytes = pack_bits(&bits);
        assert_eq!(bytes, vec![0x8D, 0x05]);
        assert_eq!(unpack_bits(&bytes, bits.len()), bits);
    }

    #[test]
    fn test_unpack_beyond_payload_is_false() {
        assert_eq!(unpack_bits(&[0x01], 9), {
            let mut expected = vec![false; 9];
            expected[0] = true;
            expected
        });
    }
}
