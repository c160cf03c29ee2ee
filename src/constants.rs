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

//! Constants for the DCHU firmware contract
//!
//! Centralizes the _DSM identity, function selectors, buffer offsets and
//! tunable defaults. Other modules should not carry their own copies.

/// _DSM identity of the embedded controller
pub mod dsm {
    /// Interface UUID, in the byte order the firmware expects on the wire
    pub const UUID: [u8; 16] = [
        0xE4, 0x24, 0xF2, 0x93, 0xDC, 0xFB, 0xBF, 0x4B,
        0xAD, 0xD6, 0xDB, 0x71, 0xBD, 0xC0, 0xAF, 0xAD,
    ];

    /// _DSM revision
    pub const REVISION: u64 = 1;

    /// ACPI hardware id of the device carrying the method
    pub const HID: &str = "CLV0001";

    /// Method name evaluated on the device
    pub const METHOD: &str = "_DSM";
}

/// Function selectors (fixed by firmware)
pub mod function {
    /// Sensor package: fan words, duty and temperature bytes
    pub const SENSOR_PACKAGE: u32 = 12;

    /// Raw diagnostic write
    pub const RAW_SET: u32 = 31;

    /// Keyboard LED brightness write
    pub const LED_WRITE: u32 = 39;

    /// Keyboard LED brightness read
    pub const LED_READ: u32 = 61;

    /// Fan mode write
    pub const FAN_MODE: u32 = 121;

    /// Subcommand byte carried in the last byte of the fan mode payload
    pub const FAN_MODE_SUBCOMMAND: u8 = 1;

    /// Length of every command payload
    pub const COMMAND_LEN: usize = 4;
}

/// Sensor package layout
pub mod layout {
    /// Shortest buffer the firmware contract allows
    pub const MIN_LEN: usize = 32;

    /// High byte offsets of the 16-bit fan words (CPU, GPU, third fan)
    pub const FAN_WORDS: [usize; 3] = [2, 4, 6];

    /// Duty bytes, percent 0..100
    pub const DUTY: [usize; 3] = [16, 19, 22];

    /// Temperature bytes, whole degrees Celsius
    pub const TEMP: [usize; 3] = [18, 21, 24];
}

/// Tach conversion defaults
pub mod tach {
    /// EC tach base clock in Hz. Matches the vendor UI math
    /// `60 / (5.565217e-05 * raw) * 2`.
    pub const BASE_HZ: u32 = 35940;

    /// Pulses per revolution
    pub const PULSES_PER_REV: u32 = 1;

    pub const SECONDS_PER_MINUTE: u64 = 60;
}

/// PWM scaling
pub mod pwm {
    /// Maximum exposed duty value
    pub const MAX_VALUE: u8 = 255;

    /// Duty bytes are percentages
    pub const PERCENT_SCALE: u32 = 100;
}

/// Temperature scaling
pub mod temperature {
    /// Exposed temperatures are millidegrees Celsius
    pub const MILLIDEGREES_PER_DEGREE: i64 = 1000;
}

/// Keyboard backlight
pub mod led {
    /// Highest brightness level the keyboard backlight accepts
    pub const MAX_BRIGHTNESS: u8 = 5;

    /// Largest value accepted by the raw diagnostic write
    pub const RAW_MAX: u64 = 255;
}

/// Filesystem locations
pub mod paths {
    /// Default settings file
    pub const CONFIG_FILE: &str = "/etc/dchu/config.json";

    /// Environment variable overriding the settings file location
    pub const CONFIG_ENV: &str = "DCHU_CONFIG";

    /// acpi_call procfs node
    pub const ACPI_CALL_NODE: &str = "/proc/acpi/call";

    /// ACPI device directory in sysfs
    pub const ACPI_DEVICES: &str = "/sys/bus/acpi/devices";
}
