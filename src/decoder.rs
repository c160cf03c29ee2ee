/*
 * This file is part of dchu.
 *
 * Copyright (C) 2025 dchu contributors
 *
 * dchu is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * dchu is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with dchu. If not, see <https://www.gnu.org/licenses/>.
 */

//! Sensor package decoding
//!
//! The firmware returns a fixed-layout buffer (function 12). Fan speeds are
//! 16-bit words that are either RPM or a tach period, duty values are
//! percentages, temperatures are whole degrees Celsius.
//!
//! # Units
//!
//! Values are exposed the way hwmon reports them:
//! - fans in RPM
//! - duty rescaled to 0-255
//! - temperatures in millidegrees Celsius

use std::fmt;

use dchu_error::{DchuError, Result};
use serde::{Deserialize, Serialize};

use crate::channel::FirmwareResult;
use crate::constants::{layout, pwm, tach, temperature};

/// Byte order of the 16-bit fan words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Most significant byte at the lower offset
    #[default]
    Big,
    Little,
}

/// Operator-tunable decode parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DecodeConfig {
    pub endianness: Endianness,
    /// Treat fan words as tach periods instead of RPM
    pub invert: bool,
    /// EC tach base clock in Hz (used when `invert` is set)
    pub tach_hz: u32,
    /// Fan pulses per revolution (used when `invert` is set)
    pub pulses_per_rev: u32,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            endianness: Endianness::Big,
            invert: true,
            tach_hz: tach::BASE_HZ,
            pulses_per_rev: tach::PULSES_PER_REV,
        }
    }
}

fn field(buf: &[u8], offset: usize, width: usize) -> Result<&[u8]> {
    if buf.len() < layout::MIN_LEN {
        return Err(DchuError::malformed(format!(
            "{} bytes, need at least {}",
            buf.len(),
            layout::MIN_LEN
        )));
    }
    let end = offset
        .checked_add(width)
        .filter(|&end| end <= buf.len())
        .ok_or_else(|| {
            DchuError::malformed(format!(
                "field at offset {} (width {}) exceeds {}-byte buffer",
                offset,
                width,
                buf.len()
            ))
        })?;
    Ok(&buf[offset..end])
}

/// Read the 16-bit word at `offset`, `offset + 1`
pub fn read_word(buf: &[u8], offset: usize, endianness: Endianness) -> Result<u16> {
    let bytes = field(buf, offset, 2)?;
    let pair = [bytes[0], bytes[1]];
    Ok(match endianness {
        Endianness::Big => u16::from_be_bytes(pair),
        Endianness::Little => u16::from_le_bytes(pair),
    })
}

/// Convert a raw fan word to RPM.
///
/// A zero period or a zero divisor reads as a stopped fan.
pub fn tach_to_rpm(raw: u16, cfg: &DecodeConfig) -> i64 {
    if !cfg.invert {
        return i64::from(raw);
    }
    if raw == 0 || cfg.tach_hz == 0 || cfg.pulses_per_rev == 0 {
        return 0;
    }
    let numerator = u64::from(cfg.tach_hz) * tach::SECONDS_PER_MINUTE;
    let denominator = u64::from(cfg.pulses_per_rev) * u64::from(raw);
    // round half away from zero
    ((numerator + denominator / 2) / denominator) as i64
}

pub fn decode_fan_speed(buf: &[u8], offset: usize, cfg: &DecodeConfig) -> Result<i64> {
    read_word(buf, offset, cfg.endianness).map(|raw| tach_to_rpm(raw, cfg))
}

/// Duty percentage rescaled to 0-255
pub fn decode_duty(buf: &[u8], offset: usize) -> Result<u8> {
    let percent = u32::from(field(buf, offset, 1)?[0]);
    let scaled = (percent * u32::from(pwm::MAX_VALUE) + pwm::PERCENT_SCALE / 2) / pwm::PERCENT_SCALE;
    Ok(scaled.min(u32::from(pwm::MAX_VALUE)) as u8)
}

/// Temperature in millidegrees Celsius. No calibration is applied.
pub fn decode_temp(buf: &[u8], offset: usize) -> Result<i64> {
    let degrees = i64::from(field(buf, offset, 1)?[0]);
    Ok(degrees * temperature::MILLIDEGREES_PER_DEGREE)
}

/// Lowercase hex bytes separated by single spaces
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A sensor package that satisfies the minimum length contract
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorBuffer(Vec<u8>);

impl SensorBuffer {
    pub fn new(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < layout::MIN_LEN {
            return Err(DchuError::malformed(format!(
                "{} bytes, need at least {}",
                bytes.len(),
                layout::MIN_LEN
            )));
        }
        Ok(Self(bytes))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn hex_dump(&self) -> String {
        hex_dump(&self.0)
    }
}

impl TryFrom<FirmwareResult> for SensorBuffer {
    type Error = DchuError;

    fn try_from(result: FirmwareResult) -> Result<Self> {
        match result {
            FirmwareResult::Buffer(bytes) => Self::new(bytes),
            other => Err(DchuError::malformed(format!(
                "expected a buffer, firmware returned {}",
                other.kind()
            ))),
        }
    }
}

impl fmt::Display for SensorBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hex_dump())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sensor_buffer;

    fn plain() -> DecodeConfig {
        DecodeConfig {
            invert: false,
            ..DecodeConfig::default()
        }
    }

    #[test]
    fn test_defaults_match_firmware_ui() {
        let cfg = DecodeConfig::default();
        assert_eq!(cfg.endianness, Endianness::Big);
        assert!(cfg.invert);
        assert_eq!(cfg.tach_hz, 35940);
        assert_eq!(cfg.pulses_per_rev, 1);
    }

    #[test]
    fn test_plain_word_is_rpm() {
        for raw in [0u16, 1, 850, 2400, 0x7fff, u16::MAX] {
            let buf = sensor_buffer([raw, 0, 0], [0; 3], [0; 3]);
            assert_eq!(decode_fan_speed(&buf, 2, &plain()).unwrap(), i64::from(raw));
        }
    }

    #[test]
    fn test_endianness() {
        let mut buf = vec![0u8; 32];
        buf[2] = 0x01;
        buf[3] = 0x02;
        assert_eq!(read_word(&buf, 2, Endianness::Big).unwrap(), 0x0102);
        assert_eq!(read_word(&buf, 2, Endianness::Little).unwrap(), 0x0201);

        let cfg = DecodeConfig {
            endianness: Endianness::Little,
            ..plain()
        };
        assert_eq!(decode_fan_speed(&buf, 2, &cfg).unwrap(), 513);
    }

    #[test]
    fn test_tach_period_conversion() {
        let cfg = DecodeConfig::default();
        // 35940 * 60 / 256 = 8423.4375
        assert_eq!(tach_to_rpm(256, &cfg), 8423);
        // 2156400 / 1000 = 2156.4
        assert_eq!(tach_to_rpm(1000, &cfg), 2156);
        // 2156400 / 7 = 308057.14
        assert_eq!(tach_to_rpm(7, &cfg), 308057);

        let two_pulses = DecodeConfig {
            pulses_per_rev: 2,
            ..cfg
        };
        assert_eq!(tach_to_rpm(1000, &two_pulses), 1078);
    }

    #[test]
    fn test_tach_ties_round_away_from_zero() {
        let cfg = DecodeConfig {
            tach_hz: 3,
            ..DecodeConfig::default()
        };
        // 180 / 8 = 22.5
        assert_eq!(tach_to_rpm(8, &cfg), 23);
        // 180 / 7 = 25.71
        assert_eq!(tach_to_rpm(7, &cfg), 26);
        // 180 / 9 = 20
        assert_eq!(tach_to_rpm(9, &cfg), 20);
    }

    #[test]
    fn test_stalled_fan_reads_zero() {
        let buf = sensor_buffer([0, 0, 0], [0; 3], [0; 3]);
        for cfg in [
            DecodeConfig::default(),
            DecodeConfig { tach_hz: 0, ..DecodeConfig::default() },
            DecodeConfig { pulses_per_rev: 0, ..DecodeConfig::default() },
            DecodeConfig { endianness: Endianness::Little, ..DecodeConfig::default() },
        ] {
            assert_eq!(decode_fan_speed(&buf, 2, &cfg).unwrap(), 0);
        }

        let spinning = sensor_buffer([500, 0, 0], [0; 3], [0; 3]);
        let no_clock = DecodeConfig { tach_hz: 0, ..DecodeConfig::default() };
        assert_eq!(decode_fan_speed(&spinning, 2, &no_clock).unwrap(), 0);
        let no_pulses = DecodeConfig { pulses_per_rev: 0, ..DecodeConfig::default() };
        assert_eq!(decode_fan_speed(&spinning, 2, &no_pulses).unwrap(), 0);
    }

    #[test]
    fn test_extreme_tach_parameters_do_not_overflow() {
        let cfg = DecodeConfig {
            tach_hz: u32::MAX,
            pulses_per_rev: u32::MAX,
            ..DecodeConfig::default()
        };
        assert_eq!(tach_to_rpm(u16::MAX, &cfg), 0);

        let fast = DecodeConfig {
            tach_hz: u32::MAX,
            ..DecodeConfig::default()
        };
        assert_eq!(tach_to_rpm(1, &fast), i64::from(u32::MAX) * 60);
    }

    #[test]
    fn test_duty_scaling() {
        let buf = sensor_buffer([0; 3], [50, 75, 90], [40, 35, 30]);
        assert_eq!(decode_duty(&buf, 16).unwrap(), 128);
        assert_eq!(decode_duty(&buf, 19).unwrap(), 191);
        assert_eq!(decode_duty(&buf, 22).unwrap(), 230);

        let edges = sensor_buffer([0; 3], [0, 100, 200], [0; 3]);
        assert_eq!(decode_duty(&edges, 16).unwrap(), 0);
        assert_eq!(decode_duty(&edges, 19).unwrap(), 255);
        assert_eq!(decode_duty(&edges, 22).unwrap(), 255);
    }

    #[test]
    fn test_temperature_in_millidegrees() {
        let buf = sensor_buffer([0; 3], [0; 3], [40, 35, 30]);
        assert_eq!(decode_temp(&buf, 18).unwrap(), 40000);
        assert_eq!(decode_temp(&buf, 21).unwrap(), 35000);
        assert_eq!(decode_temp(&buf, 24).unwrap(), 30000);

        let hot = sensor_buffer([0; 3], [0; 3], [255, 0, 0]);
        assert_eq!(decode_temp(&hot, 18).unwrap(), 255000);
    }

    #[test]
    fn test_short_buffer_is_malformed() {
        for len in [0usize, 1, 8, 25, 31] {
            let buf = vec![0x11u8; len];
            assert!(matches!(decode_fan_speed(&buf, 2, &plain()), Err(DchuError::MalformedBuffer(_))));
            assert!(matches!(decode_duty(&buf, 16), Err(DchuError::MalformedBuffer(_))));
            assert!(matches!(decode_temp(&buf, 18), Err(DchuError::MalformedBuffer(_))));
            assert!(matches!(SensorBuffer::new(buf), Err(DchuError::MalformedBuffer(_))));
        }
    }

    #[test]
    fn test_field_past_end_is_malformed() {
        let buf = vec![0u8; 32];
        assert!(matches!(read_word(&buf, 31, Endianness::Big), Err(DchuError::MalformedBuffer(_))));
        assert!(matches!(decode_duty(&buf, 32), Err(DchuError::MalformedBuffer(_))));
        assert!(matches!(decode_temp(&buf, usize::MAX), Err(DchuError::MalformedBuffer(_))));
        assert!(read_word(&buf, 30, Endianness::Big).is_ok());
    }

    #[test]
    fn test_longer_buffer_is_accepted() {
        let mut buf = sensor_buffer([100, 0, 0], [0; 3], [0; 3]);
        buf.extend_from_slice(&[0xaa; 16]);
        assert_eq!(decode_fan_speed(&buf, 2, &plain()).unwrap(), 100);
        assert!(decode_duty(&buf, 47).is_ok());
    }

    #[test]
    fn test_sensor_buffer_from_result() {
        let ok = SensorBuffer::try_from(FirmwareResult::Buffer(vec![0; 32])).unwrap();
        assert_eq!(ok.len(), 32);

        for bad in [
            FirmwareResult::Integer(12),
            FirmwareResult::Empty,
            FirmwareResult::Buffer(vec![0; 31]),
        ] {
            assert!(matches!(SensorBuffer::try_from(bad), Err(DchuError::MalformedBuffer(_))));
        }
    }

    #[test]
    fn test_hex_dump() {
        assert_eq!(hex_dump(&[]), "");
        assert_eq!(hex_dump(&[0x00, 0x0f, 0xa0, 0xff]), "00 0f a0 ff");

        let buf = SensorBuffer::new(sensor_buffer([0x0102, 0, 0], [0; 3], [0; 3])).unwrap();
        let dump = buf.hex_dump();
        assert!(dump.starts_with("00 00 01 02 00 00"));
        assert_eq!(dump.split(' ').count(), 32);
        assert_eq!(buf.to_string(), dump);
    }
}
