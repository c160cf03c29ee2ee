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

//! Sensor reads
//!
//! Every read is a fresh firmware round trip; nothing is cached. A snapshot
//! decodes all nine values from one buffer.

use std::sync::Arc;

use dchu_error::{DchuError, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::channel::FirmwareChannel;
use crate::constants::{function, layout};
use crate::decoder::{decode_duty, decode_fan_speed, decode_temp, DecodeConfig, SensorBuffer};

/// All sensor values from a single sensor package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    pub fan1: i64,
    pub fan2: i64,
    pub fan3: i64,
    pub pwm1: u8,
    pub pwm2: u8,
    pub pwm3: u8,
    pub temp1: i64,
    pub temp2: i64,
    pub temp3: i64,
}

impl SensorSnapshot {
    pub fn decode(buf: &SensorBuffer, cfg: &DecodeConfig) -> Result<Self> {
        let bytes = buf.as_bytes();
        let [f1, f2, f3] = layout::FAN_WORDS;
        let [d1, d2, d3] = layout::DUTY;
        let [t1, t2, t3] = layout::TEMP;
        Ok(Self {
            fan1: decode_fan_speed(bytes, f1, cfg)?,
            fan2: decode_fan_speed(bytes, f2, cfg)?,
            fan3: decode_fan_speed(bytes, f3, cfg)?,
            pwm1: decode_duty(bytes, d1)?,
            pwm2: decode_duty(bytes, d2)?,
            pwm3: decode_duty(bytes, d3)?,
            temp1: decode_temp(bytes, t1)?,
            temp2: decode_temp(bytes, t2)?,
            temp3: decode_temp(bytes, t3)?,
        })
    }

    pub fn fans(&self) -> [i64; 3] {
        [self.fan1, self.fan2, self.fan3]
    }

    pub fn pwms(&self) -> [u8; 3] {
        [self.pwm1, self.pwm2, self.pwm3]
    }

    pub fn temps(&self) -> [i64; 3] {
        [self.temp1, self.temp2, self.temp3]
    }
}

/// Map a 1-based channel number to an index into the layout tables
fn slot(channel: usize) -> Result<usize> {
    if (1..=3).contains(&channel) {
        Ok(channel - 1)
    } else {
        Err(DchuError::invalid_argument(format!(
            "sensor channel {} out of range 1..=3",
            channel
        )))
    }
}

pub struct SensorPoller {
    channel: Arc<FirmwareChannel>,
    config: RwLock<DecodeConfig>,
}

impl SensorPoller {
    pub fn new(channel: Arc<FirmwareChannel>, config: DecodeConfig) -> Self {
        Self {
            channel,
            config: RwLock::new(config),
        }
    }

    pub fn decode_config(&self) -> DecodeConfig {
        *self.config.read()
    }

    /// Replace the decode parameters; the next read uses them
    pub fn set_decode_config(&self, config: DecodeConfig) {
        *self.config.write() = config;
        debug!("Decode config updated: {:?}", config);
    }

    /// Fetch a fresh sensor package
    pub fn fetch_buffer(&self) -> Result<SensorBuffer> {
        let result = self.channel.call(function::SENSOR_PACKAGE, None)?;
        SensorBuffer::try_from(result)
    }

    /// Read all nine values from one firmware buffer
    pub fn read_all(&self) -> Result<SensorSnapshot> {
        let buf = self.fetch_buffer()?;
        let cfg = self.decode_config();
        SensorSnapshot::decode(&buf, &cfg)
    }

    /// Fan speed in RPM for fan 1..=3
    pub fn fan_input(&self, channel: usize) -> Result<i64> {
        let offset = layout::FAN_WORDS[slot(channel)?];
        let buf = self.fetch_buffer()?;
        decode_fan_speed(buf.as_bytes(), offset, &self.decode_config())
    }

    /// Duty (0-255) for fan 1..=3
    pub fn pwm(&self, channel: usize) -> Result<u8> {
        let offset = layout::DUTY[slot(channel)?];
        decode_duty(self.fetch_buffer()?.as_bytes(), offset)
    }

    /// Temperature in millidegrees for sensor 1..=3
    pub fn temp_input(&self, channel: usize) -> Result<i64> {
        let offset = layout::TEMP[slot(channel)?];
        decode_temp(self.fetch_buffer()?.as_bytes(), offset)
    }

    /// Hex dump of a fresh sensor package
    pub fn buffer_dump(&self) -> Result<String> {
        Ok(self.fetch_buffer()?.hex_dump())
    }
}
