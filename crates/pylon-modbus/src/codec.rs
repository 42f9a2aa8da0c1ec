// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Register data formats and the scale/offset transform. Pure functions,
//! no I/O.
//!
//! Multi-register values occupy consecutive addresses in big-endian register
//! order: the first register holds the more-significant half. Byte order
//! inside each register is the wire-native big-endian and is handled by the
//! framing layer; this module works in whole `u16` registers.

use std::fmt;
use std::str::FromStr;

use pylon_core::point::point_value;

use crate::error::{ModbusError, ModbusResult};

// =============================================================================
// DataFormat
// =============================================================================

/// Data format of a register-backed IO.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataFormat {
    /// Unsigned 16-bit, one register.
    Uint16,
    /// Signed 16-bit, one register.
    Int16,
    /// Unsigned 32-bit, two registers.
    Uint32,
    /// Signed 32-bit, two registers.
    Int32,
    /// IEEE-754 single precision, two registers.
    Float32,
}

impl DataFormat {
    /// Parses a format from its point value string.
    ///
    /// Unknown formats are a hard configuration error; there is no
    /// conservative fallback register allocation.
    pub fn parse(s: &str) -> ModbusResult<Self> {
        match s {
            point_value::UINT16 => Ok(Self::Uint16),
            point_value::INT16 => Ok(Self::Int16),
            point_value::UINT32 => Ok(Self::Uint32),
            point_value::INT32 => Ok(Self::Int32),
            point_value::FLOAT32 => Ok(Self::Float32),
            other => Err(ModbusError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Returns the point value string for this format.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uint16 => point_value::UINT16,
            Self::Int16 => point_value::INT16,
            Self::Uint32 => point_value::UINT32,
            Self::Int32 => point_value::INT32,
            Self::Float32 => point_value::FLOAT32,
        }
    }

    /// Number of 16-bit registers this format occupies.
    pub const fn reg_count(&self) -> usize {
        match self {
            Self::Uint16 | Self::Int16 => 1,
            Self::Uint32 | Self::Int32 | Self::Float32 => 2,
        }
    }

    /// Returns `true` for two-register formats.
    pub const fn is_wide(&self) -> bool {
        self.reg_count() == 2
    }
}

impl FromStr for DataFormat {
    type Err = ModbusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Encode / decode
// =============================================================================

/// Encodes a raw (unscaled) value into registers for the format.
///
/// Two-register formats return `[high_word, low_word]`; callers write them at
/// `address` and `address + 1` in that order.
pub fn encode(format: DataFormat, raw: f64) -> Vec<u16> {
    match format {
        DataFormat::Uint16 => vec![raw as u16],
        DataFormat::Int16 => vec![raw as i16 as u16],
        DataFormat::Uint32 => split_u32(raw as u32),
        DataFormat::Int32 => split_u32(raw as i32 as u32),
        DataFormat::Float32 => split_u32((raw as f32).to_bits()),
    }
}

/// Decodes registers into a raw (unscaled) value for the format.
pub fn decode(format: DataFormat, regs: &[u16]) -> ModbusResult<f64> {
    let needed = format.reg_count();
    if regs.len() < needed {
        return Err(ModbusError::ShortReply {
            needed,
            got: regs.len(),
        });
    }

    Ok(match format {
        DataFormat::Uint16 => regs[0] as f64,
        DataFormat::Int16 => regs[0] as i16 as f64,
        DataFormat::Uint32 => join_u32(regs) as f64,
        DataFormat::Int32 => join_u32(regs) as i32 as f64,
        DataFormat::Float32 => f32::from_bits(join_u32(regs)) as f64,
    })
}

#[inline]
fn split_u32(v: u32) -> Vec<u16> {
    vec![(v >> 16) as u16, v as u16]
}

#[inline]
fn join_u32(regs: &[u16]) -> u32 {
    (regs[0] as u32) << 16 | regs[1] as u32
}

// =============================================================================
// Transform
// =============================================================================

/// The scale/offset transform between raw register values and point values.
///
/// `stored = raw * scale + offset`; writes use the inverse
/// `raw = (stored - offset) / scale`. A zero scale would make the inverse
/// undefined and is rejected at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    scale: f64,
    offset: f64,
}

impl Transform {
    /// Creates a transform; fails on a zero scale.
    pub fn new(scale: f64, offset: f64) -> ModbusResult<Self> {
        if scale == 0.0 {
            return Err(ModbusError::ZeroScale);
        }
        Ok(Self { scale, offset })
    }

    /// The identity transform (`scale = 1`, `offset = 0`), used for bit IOs.
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset: 0.0,
        }
    }

    /// Returns the scale factor.
    pub fn scale(&self) -> f64 {
        self.scale
    }

    /// Returns the offset.
    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Raw register value to stored point value.
    #[inline]
    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }

    /// Stored point value to raw register value.
    #[inline]
    pub fn invert(&self, stored: f64) -> f64 {
        (stored - self.offset) / self.scale
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_formats() {
        assert_eq!(DataFormat::parse("uint16").unwrap(), DataFormat::Uint16);
        assert_eq!(DataFormat::parse("int16").unwrap(), DataFormat::Int16);
        assert_eq!(DataFormat::parse("uint32").unwrap(), DataFormat::Uint32);
        assert_eq!(DataFormat::parse("int32").unwrap(), DataFormat::Int32);
        assert_eq!(DataFormat::parse("float32").unwrap(), DataFormat::Float32);
    }

    #[test]
    fn test_parse_unknown_format_is_hard_error() {
        assert!(matches!(
            DataFormat::parse("float64"),
            Err(ModbusError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            "".parse::<DataFormat>(),
            Err(ModbusError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_reg_counts() {
        assert_eq!(DataFormat::Uint16.reg_count(), 1);
        assert_eq!(DataFormat::Int16.reg_count(), 1);
        assert_eq!(DataFormat::Uint32.reg_count(), 2);
        assert_eq!(DataFormat::Int32.reg_count(), 2);
        assert_eq!(DataFormat::Float32.reg_count(), 2);
        assert!(DataFormat::Float32.is_wide());
        assert!(!DataFormat::Int16.is_wide());
    }

    #[test]
    fn test_encode_decode_round_trips() {
        let cases: &[(DataFormat, &[f64])] = &[
            (DataFormat::Uint16, &[0.0, 1.0, 100.0, 65535.0]),
            (DataFormat::Int16, &[-32768.0, -5.0, 0.0, 42.0, 32767.0]),
            (DataFormat::Uint32, &[0.0, 70000.0, 4294967295.0]),
            (DataFormat::Int32, &[-2147483648.0, -70000.0, 0.0, 2147483647.0]),
            (
                DataFormat::Float32,
                &[0.0, -1.5, 3.25, 1.0e10, -6.125e-3],
            ),
        ];

        for &(format, values) in cases {
            for &v in values {
                let regs = encode(format, v);
                assert_eq!(regs.len(), format.reg_count(), "{format} {v}");
                assert_eq!(decode(format, &regs).unwrap(), v, "{format} {v}");
            }
        }
    }

    #[test]
    fn test_int16_wire_representation() {
        assert_eq!(encode(DataFormat::Int16, -5.0), vec![0xFFFB]);
        assert_eq!(decode(DataFormat::Int16, &[0xFFFB]).unwrap(), -5.0);
    }

    #[test]
    fn test_wide_formats_are_high_word_first() {
        assert_eq!(encode(DataFormat::Uint32, 0x0001_0002 as f64), vec![0x0001, 0x0002]);
        // ~pi in IEEE-754 single precision.
        let regs = encode(DataFormat::Float32, std::f64::consts::PI);
        assert_eq!(regs, vec![0x4049, 0x0FDB]);
    }

    #[test]
    fn test_float32_bit_reinterpretation() {
        // 0x4048F5C3 is 3.14 in IEEE-754 single precision.
        let value = decode(DataFormat::Float32, &[0x4048, 0xF5C3]).unwrap();
        assert!((value - 3.14).abs() < 1e-6);
    }

    #[test]
    fn test_decode_short_input() {
        assert!(matches!(
            decode(DataFormat::Uint32, &[0x0001]),
            Err(ModbusError::ShortReply { needed: 2, got: 1 })
        ));
        assert!(matches!(
            decode(DataFormat::Uint16, &[]),
            Err(ModbusError::ShortReply { needed: 1, got: 0 })
        ));
    }

    #[test]
    fn test_transform_round_trip() {
        let cases = [
            (0.1, 0.0, 100.0),
            (2.0, -3.0, 41.0),
            (0.5, 10.0, -7.25),
            (1.0, 0.0, 0.0),
        ];

        for (scale, offset, stored) in cases {
            let t = Transform::new(scale, offset).unwrap();
            let raw = t.invert(stored);
            let back = t.apply(raw);
            assert!(
                (back - stored).abs() <= f64::EPSILON * stored.abs().max(1.0),
                "scale {scale} offset {offset} stored {stored} back {back}"
            );
        }
    }

    #[test]
    fn test_zero_scale_rejected() {
        assert!(matches!(
            Transform::new(0.0, 1.0),
            Err(ModbusError::ZeroScale)
        ));
    }

    #[test]
    fn test_identity_transform() {
        let t = Transform::identity();
        assert_eq!(t.apply(12.5), 12.5);
        assert_eq!(t.invert(12.5), 12.5);
    }
}
