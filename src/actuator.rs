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

//! Keyboard backlight and fan mode control
//!
//! Writes go through the shared firmware channel. The firmware does not
//! reliably answer brightness reads and has no fan mode read at all, so the
//! controller caches the last state the firmware acknowledged.
//!
//! # Fan modes
//!
//! The firmware codes are sparse: 2 and 4 are not modes.
//!
//! | code | name   |
//! |------|--------|
//! | 0    | auto   |
//! | 1    | max    |
//! | 3    | silent |
//! | 5    | maxq   |
//! | 6    | custom |
//! | 7    | turbo  |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dchu_error::{DchuError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::channel::{FirmwareChannel, FirmwareResult};
use crate::constants::{function, led};

/// Name reported when no mode has been set yet
pub const UNKNOWN_MODE: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanMode {
    Auto,
    Max,
    Silent,
    MaxQ,
    Custom,
    Turbo,
}

impl FanMode {
    pub const ALL: [FanMode; 6] = [
        FanMode::Auto,
        FanMode::Max,
        FanMode::Silent,
        FanMode::MaxQ,
        FanMode::Custom,
        FanMode::Turbo,
    ];

    /// Firmware code
    pub fn code(self) -> u8 {
        match self {
            FanMode::Auto => 0,
            FanMode::Max => 1,
            FanMode::Silent => 3,
            FanMode::MaxQ => 5,
            FanMode::Custom => 6,
            FanMode::Turbo => 7,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FanMode::Auto => "auto",
            FanMode::Max => "max",
            FanMode::Silent => "silent",
            FanMode::MaxQ => "maxq",
            FanMode::Custom => "custom",
            FanMode::Turbo => "turbo",
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| u64::from(mode.code()) == code)
    }

    /// Case-insensitive exact name match
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|mode| mode.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for FanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn parse_code(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().ok();
    }
    None
}

fn code_to_mode(code: u64) -> Result<FanMode> {
    FanMode::from_code(code)
        .ok_or_else(|| DchuError::invalid_argument(format!("fan mode {} out of range", code)))
}

impl FromStr for FanMode {
    type Err = DchuError;

    /// Accepts a numeric code (decimal or `0x` hex) or a mode name.
    /// Surrounding whitespace, such as a trailing newline, is ignored.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        if let Some(code) = parse_code(text) {
            return code_to_mode(code);
        }
        FanMode::from_name(text)
            .ok_or_else(|| DchuError::invalid_argument(format!("unknown fan mode '{}'", text)))
    }
}

/// A fan mode as supplied by a caller, before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest<'a> {
    Code(u64),
    Text(&'a str),
}

impl ModeRequest<'_> {
    pub fn resolve(self) -> Result<FanMode> {
        match self {
            ModeRequest::Code(code) => code_to_mode(code),
            ModeRequest::Text(text) => text.parse(),
        }
    }
}

impl From<u64> for ModeRequest<'_> {
    fn from(code: u64) -> Self {
        ModeRequest::Code(code)
    }
}

impl From<u8> for ModeRequest<'_> {
    fn from(code: u8) -> Self {
        ModeRequest::Code(u64::from(code))
    }
}

impl<'a> From<&'a str> for ModeRequest<'a> {
    fn from(text: &'a str) -> Self {
        ModeRequest::Text(text)
    }
}

impl From<FanMode> for ModeRequest<'_> {
    fn from(mode: FanMode) -> Self {
        ModeRequest::Code(u64::from(mode.code()))
    }
}

/// Last state acknowledged by the firmware
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ActuatorState {
    pub level: u8,
    pub mode: Option<FanMode>,
}

fn command(data: u8, subcommand: u8) -> [u8; function::COMMAND_LEN] {
    [data, 0, 0, subcommand]
}

pub struct ActuatorController {
    channel: Arc<FirmwareChannel>,
    max_brightness: u8,
    state: Mutex<ActuatorState>,
}

impl ActuatorController {
    pub fn new(channel: Arc<FirmwareChannel>, max_brightness: u8) -> Self {
        Self {
            channel,
            max_brightness,
            state: Mutex::new(ActuatorState::default()),
        }
    }

    pub fn max_brightness(&self) -> u8 {
        self.max_brightness
    }

    pub fn state(&self) -> ActuatorState {
        *self.state.lock()
    }

    /// Current backlight level.
    ///
    /// Asks the firmware first; when the read is unsupported or fails the
    /// last commanded level is returned instead.
    pub fn get_brightness(&self) -> u8 {
        let state = self.state.lock();
        match self.channel.call(function::LED_READ, Some(&[0])) {
            Ok(FirmwareResult::Integer(value)) => ((value & 0xff) as u8).min(self.max_brightness),
            Ok(other) => {
                warn!("LED read returned {}, using cached level {}", other.kind(), state.level);
                state.level
            }
            Err(e) => {
                warn!("LED read unsupported ({}), using cached level {}", e, state.level);
                state.level
            }
        }
    }

    /// Set the backlight level, clamped to the device maximum.
    /// Returns the level that was applied.
    pub fn set_brightness(&self, level: u32) -> Result<u8> {
        let level = level.min(u32::from(self.max_brightness)) as u8;
        let mut state = self.state.lock();
        self.channel
            .invoke(function::LED_WRITE, Some(&command(level, 0)))?;
        state.level = level;
        debug!("LED brightness set to {}", level);
        Ok(level)
    }

    /// Set the fan mode from a code, a name, or a [`FanMode`]
    pub fn set_fan_mode<'a>(&self, mode: impl Into<ModeRequest<'a>>) -> Result<FanMode> {
        let mode = mode.into().resolve()?;
        let mut state = self.state.lock();
        self.channel.invoke(
            function::FAN_MODE,
            Some(&command(mode.code(), function::FAN_MODE_SUBCOMMAND)),
        )?;
        state.mode = Some(mode);
        debug!("Fan mode set to {} ({})", mode, mode.code());
        Ok(mode)
    }

    /// Last fan mode the firmware accepted
    pub fn fan_mode(&self) -> Option<FanMode> {
        self.state.lock().mode
    }

    pub fn get_fan_mode_name(&self) -> &'static str {
        self.fan_mode().map_or(UNKNOWN_MODE, FanMode::name)
    }

    /// Diagnostic: raw answer of the LED read function without payload
    pub fn raw_status(&self) -> Result<FirmwareResult> {
        let _state = self.state.lock();
        self.channel.call(function::LED_READ, None)
    }

    /// Diagnostic: raw write to function 31, value clamped to one byte
    pub fn raw_set(&self, value: u64) -> Result<()> {
        let data = value.min(led::RAW_MAX) as u8;
        let _state = self.state.lock();
        self.channel.invoke(function::RAW_SET, Some(&command(data, 0)))
    }
}
