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

//! One DCHU device: the shared channel plus its sensor and actuator halves

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::acpi_call::{find_acpi_path, AcpiCallMethod};
use crate::actuator::ActuatorController;
use crate::channel::{FirmwareChannel, FirmwareIdentity};
use crate::config::Settings;
use crate::constants::{dsm, paths};
use crate::poller::SensorPoller;

pub struct Device {
    channel: Arc<FirmwareChannel>,
    sensors: SensorPoller,
    actuators: ActuatorController,
}

impl Device {
    /// Build a device around an existing channel
    pub fn new(channel: Arc<FirmwareChannel>, settings: &Settings) -> Self {
        Self {
            sensors: SensorPoller::new(Arc::clone(&channel), settings.decode),
            actuators: ActuatorController::new(Arc::clone(&channel), settings.max_brightness),
            channel,
        }
    }

    /// Build a device backed by acpi_call.
    ///
    /// When no ACPI path is configured and none is found in sysfs the device
    /// comes up detached and every firmware call fails with `NotReady`.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::from_settings_in(settings, Path::new(paths::ACPI_DEVICES))
    }

    /// Like [`from_settings`](Self::from_settings), searching `devices_dir` for the device
    pub fn from_settings_in(settings: &Settings, devices_dir: &Path) -> Self {
        let identity = FirmwareIdentity::default();
        let acpi_path = settings
            .acpi_path
            .clone()
            .or_else(|| find_acpi_path(devices_dir, dsm::HID));

        let channel = match acpi_path {
            Some(path) => {
                debug!("Using {} via {}", path, settings.call_node.display());
                FirmwareChannel::new(identity, AcpiCallMethod::new(&settings.call_node, path))
            }
            None => {
                warn!("No {} device found, firmware calls will fail", dsm::HID);
                FirmwareChannel::detached(identity)
            }
        };
        Self::new(Arc::new(channel), settings)
    }

    pub fn channel(&self) -> &Arc<FirmwareChannel> {
        &self.channel
    }

    pub fn sensors(&self) -> &SensorPoller {
        &self.sensors
    }

    pub fn actuators(&self) -> &ActuatorController {
        &self.actuators
    }
}
