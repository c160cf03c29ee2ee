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

//! _DSM transport over the `acpi_call` kernel module
//!
//! The module exposes a procfs node (normally `/proc/acpi/call`). Writing a
//! method path followed by its arguments evaluates the method; reading the
//! node back returns the result as text:
//!
//! ```text
//! 0x2                     integer
//! {0x00, 0x00, 0x08, ...} buffer
//! Error: AE_NOT_FOUND     failure
//! ```
//!
//! The node keeps a single, system-wide answer and the write and the
//! read-back are two separate syscalls. Every transaction holds an exclusive
//! `flock` on the node from the write until the answer is read, so callers in
//! other processes (or other channels) cannot swap answers.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use dchu_error::{DchuError, Result};
use tracing::debug;

use crate::channel::{DsmMethod, FirmwareCall, FirmwareIdentity, FirmwareResult};
use crate::constants::dsm;

/// Render bytes in acpi_call buffer syntax
pub fn format_buffer(bytes: &[u8]) -> String {
    let items: Vec<String> = bytes.iter().map(|b| format!("0x{:02x}", b)).collect();
    format!("{{{}}}", items.join(","))
}

/// Parse the text read back from the acpi_call node
pub fn parse_response(function: u32, text: &str) -> Result<FirmwareResult> {
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());

    if let Some(reason) = text.strip_prefix("Error:") {
        return Err(DchuError::io_failure(function, reason.trim()));
    }
    if text.is_empty() || text == "not called" {
        return Err(DchuError::io_failure(function, "method was not evaluated"));
    }

    if let Some(hex) = text.strip_prefix("0x") {
        return u64::from_str_radix(hex, 16)
            .map(FirmwareResult::Integer)
            .map_err(|e| DchuError::io_failure(function, format!("bad integer '{}': {}", text, e)));
    }

    if let Some(body) = text.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
        let mut bytes = Vec::new();
        for item in body.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let digits = item.trim_start_matches("0x");
            let byte = u8::from_str_radix(digits, 16).map_err(|e| {
                DchuError::io_failure(function, format!("bad buffer byte '{}': {}", item, e))
            })?;
            bytes.push(byte);
        }
        return Ok(FirmwareResult::Buffer(bytes));
    }

    // strings, packages and the like are not part of this protocol
    Ok(FirmwareResult::Empty)
}

/// Evaluates `<device>._DSM` through the acpi_call procfs node
#[derive(Debug, Clone)]
pub struct AcpiCallMethod {
    node: PathBuf,
    device_path: String,
}

impl AcpiCallMethod {
    pub fn new(node: impl Into<PathBuf>, device_path: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            device_path: device_path.into(),
        }
    }

    pub fn node(&self) -> &Path {
        &self.node
    }

    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Command line written to the node for one call
    pub fn command(&self, identity: &FirmwareIdentity, call: &FirmwareCall) -> String {
        format!(
            "{}.{} {} 0x{:x} 0x{:x} {}",
            self.device_path,
            dsm::METHOD,
            format_buffer(&identity.uuid),
            identity.revision,
            call.function,
            format_buffer(call.package()[0]),
        )
    }
}

/// Exclusive advisory lock on an open node, released when the file is closed
fn lock_exclusive(file: &File) -> io::Result<()> {
    loop {
        // SAFETY: flock only operates on the descriptor, which `file` keeps open
        if unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) } == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}

impl AcpiCallMethod {
    /// Write one command and read the node's answer under the node lock
    pub(crate) fn transact(&self, command: &str) -> Result<Vec<u8>> {
        let node_err = |e: io::Error| DchuError::node_access(&self.node, e);
        let mut file = match OpenOptions::new().read(true).write(true).open(&self.node) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(DchuError::not_ready(format!(
                    "{} missing (is the acpi_call module loaded?)",
                    self.node.display()
                )));
            }
            Err(e) => return Err(node_err(e)),
        };
        lock_exclusive(&file).map_err(node_err)?;

        // no-op on procfs; drops a stale answer from a plain file
        let _ = file.set_len(0);
        file.write_all(command.as_bytes()).map_err(node_err)?;
        file.seek(SeekFrom::Start(0)).map_err(node_err)?;

        let mut raw = Vec::new();
        file.read_to_end(&mut raw).map_err(node_err)?;
        Ok(raw)
    }
}

impl DsmMethod for AcpiCallMethod {
    fn evaluate(&self, identity: &FirmwareIdentity, call: &FirmwareCall) -> Result<FirmwareResult> {
        let command = self.command(identity, call);
        debug!("acpi_call <- {}", command);
        let raw = self.transact(&command)?;
        let text = String::from_utf8_lossy(&raw);
        debug!("acpi_call -> {}", text.trim_end_matches('\0').trim());
        parse_response(call.function, &text)
    }
}

/// Find the ACPI object path of the first device with hardware id `hid`.
///
/// Looks for `<devices_dir>/<hid>:NN/path`, as found under `/sys/bus/acpi/devices`.
pub fn find_acpi_path(devices_dir: &Path, hid: &str) -> Option<String> {
    let prefix = format!("{}:", hid);
    let mut candidates: Vec<PathBuf> = fs::read_dir(devices_dir)
        .ok()?
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(&prefix))
        .map(|entry| entry.path())
        .collect();
    candidates.sort();

    candidates.into_iter().find_map(|dir| {
        let path = fs::read_to_string(dir.join("path")).ok()?;
        let path = path.trim();
        if path.is_empty() {
            None
        } else {
            debug!("ACPI device {} at {}", hid, path);
            Some(path.to_string())
        }
    })
}
