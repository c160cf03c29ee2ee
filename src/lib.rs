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

//! dchu - sensors and controls of Insyde DCHU embedded controllers
//!
//! This library talks to the firmware's ACPI _DSM method, decodes the sensor
//! package (fan speeds, duty cycles, temperatures), and drives the keyboard
//! backlight and fan mode.

pub mod acpi_call;
pub mod actuator;
pub mod channel;
pub mod config;
pub mod constants;
pub mod decoder;
pub mod device;
pub mod poller;

#[cfg(test)]
pub mod test_utils;

pub use actuator::{ActuatorController, ActuatorState, FanMode, ModeRequest};
pub use channel::{DsmMethod, FirmwareCall, FirmwareChannel, FirmwareIdentity, FirmwareResult};
pub use config::Settings;
pub use decoder::{DecodeConfig, Endianness, SensorBuffer};
pub use device::Device;
pub use poller::{SensorPoller, SensorSnapshot};

pub use dchu_error::{DchuError, Result};
