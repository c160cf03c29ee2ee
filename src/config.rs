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

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dchu_error::{DchuError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{led, paths};
use crate::decoder::DecodeConfig;

fn default_call_node() -> PathBuf { PathBuf::from(paths::ACPI_CALL_NODE) }
fn default_max_brightness() -> u8 { led::MAX_BRIGHTNESS }

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// ACPI object path of the DCHU device. Discovered from sysfs when unset.
    #[serde(default)]
    pub acpi_path: Option<String>,
    #[serde(default = "default_call_node")]
    pub call_node: PathBuf,
    #[serde(default = "default_max_brightness")]
    pub max_brightness: u8,
    #[serde(default)]
    pub decode: DecodeConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            acpi_path: None,
            call_node: default_call_node(),
            max_brightness: default_max_brightness(),
            decode: DecodeConfig::default(),
        }
    }
}

pub fn config_path() -> PathBuf {
    match env::var_os(paths::CONFIG_ENV) {
        Some(p) if !p.is_empty() => PathBuf::from(p),
        _ => PathBuf::from(paths::CONFIG_FILE),
    }
}

/// Load settings from [`config_path`]
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&config_path())
}

/// Load and validate settings. A missing file yields the defaults.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No settings at {}, using defaults", path.display());
            return Ok(Settings::default());
        }
        Err(e) => return Err(DchuError::node_access(path, e)),
    };
    let settings: Settings = serde_json::from_str(&data)?;
    validate_settings(&settings)?;
    debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(&config_path(), settings)
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    validate_settings(settings)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| DchuError::node_access(parent, e))?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json).map_err(|e| DchuError::node_access(path, e))
}

pub fn validate_settings(settings: &Settings) -> Result<()> {
    if let Some(acpi_path) = &settings.acpi_path {
        if acpi_path.trim().is_empty() {
            return Err(DchuError::config("acpi_path must not be empty"));
        }
    }
    if !settings.call_node.is_absolute() {
        return Err(DchuError::config(format!(
            "call_node must be an absolute path, got {}",
            settings.call_node.display()
        )));
    }
    if settings.max_brightness == 0 {
        return Err(DchuError::config("max_brightness must be at least 1"));
    }
    Ok(())
}
