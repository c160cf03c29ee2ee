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

//! Serialized access to the firmware _DSM method
//!
//! Every consumer (sensor poller, actuator controller, diagnostics) shares one
//! [`FirmwareChannel`]. The channel owns the firmware identity and the attached
//! [`DsmMethod`] transport, and runs at most one call at a time: the firmware
//! answers through a shared transaction window, so two overlapping calls could
//! read each other's output.

use std::fmt;

use dchu_error::{DchuError, Result};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::constants::dsm;
use crate::decoder::hex_dump;

/// Interface id and revision sent with every call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirmwareIdentity {
    pub uuid: [u8; 16],
    pub revision: u64,
}

impl Default for FirmwareIdentity {
    fn default() -> Self {
        Self {
            uuid: dsm::UUID,
            revision: dsm::REVISION,
        }
    }
}

/// One firmware invocation, built per call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareCall {
    pub function: u32,
    pub payload: Option<Vec<u8>>,
}

impl FirmwareCall {
    pub fn new(function: u32, payload: Option<&[u8]>) -> Self {
        Self {
            function,
            payload: payload.map(<[u8]>::to_vec),
        }
    }

    /// Elements of the argument package.
    ///
    /// The package always carries exactly one buffer element; a call without
    /// payload sends an empty buffer.
    pub fn package(&self) -> [&[u8]; 1] {
        [self.payload.as_deref().unwrap_or(&[])]
    }
}

/// Object returned by the firmware
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FirmwareResult {
    Integer(u64),
    Buffer(Vec<u8>),
    /// An object of a type this protocol does not use
    Empty,
}

impl FirmwareResult {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Buffer(_) => "buffer",
            Self::Empty => "empty",
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for FirmwareResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "int {}", value),
            Self::Buffer(bytes) if bytes.is_empty() => write!(f, "buf 0"),
            Self::Buffer(bytes) => write!(f, "buf {} {}", bytes.len(), hex_dump(bytes)),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// Transport that actually evaluates the _DSM method
#[cfg_attr(test, mockall::automock)]
pub trait DsmMethod: Send + Sync {
    fn evaluate(&self, identity: &FirmwareIdentity, call: &FirmwareCall) -> Result<FirmwareResult>;
}

/// Shared, serialized channel to the firmware method
pub struct FirmwareChannel {
    identity: FirmwareIdentity,
    method: Mutex<Option<Box<dyn DsmMethod>>>,
}

impl FirmwareChannel {
    pub fn new(identity: FirmwareIdentity, method: impl DsmMethod + 'static) -> Self {
        Self {
            identity,
            method: Mutex::new(Some(Box::new(method))),
        }
    }

    /// Channel without a handle. Calls fail with `NotReady` until [`attach`](Self::attach).
    pub fn detached(identity: FirmwareIdentity) -> Self {
        Self {
            identity,
            method: Mutex::new(None),
        }
    }

    pub fn identity(&self) -> &FirmwareIdentity {
        &self.identity
    }

    pub fn is_ready(&self) -> bool {
        self.method.lock().is_some()
    }

    /// Attach (or replace) the firmware handle. Waits for any call in flight.
    pub fn attach(&self, method: impl DsmMethod + 'static) {
        *self.method.lock() = Some(Box::new(method));
        debug!("Firmware handle attached");
    }

    /// Drop the firmware handle. Returns whether one was attached.
    pub fn detach(&self) -> bool {
        let was_attached = self.method.lock().take().is_some();
        if was_attached {
            debug!("Firmware handle detached");
        }
        was_attached
    }

    /// Run one firmware call and hand the returned object to the caller
    pub fn call(&self, function: u32, payload: Option<&[u8]>) -> Result<FirmwareResult> {
        let call = FirmwareCall::new(function, payload);
        let guard = self.method.lock();
        let method = guard
            .as_ref()
            .ok_or_else(|| DchuError::not_ready("no firmware handle attached"))?;

        match method.evaluate(&self.identity, &call) {
            Ok(result) => {
                debug!(
                    "DSM fn={} payload_len={} -> {}",
                    function,
                    call.package()[0].len(),
                    result.kind()
                );
                Ok(result)
            }
            Err(e) => {
                warn!("DSM fn={} failed: {}", function, e);
                if e.is_firmware_failure() {
                    Err(e)
                } else {
                    Err(DchuError::io_failure(function, e.to_string()))
                }
            }
        }
    }

    /// Run one firmware call whose answer is not needed
    pub fn invoke(&self, function: u32, payload: Option<&[u8]>) -> Result<()> {
        self.call(function, payload).map(drop)
    }
}

impl fmt::Debug for FirmwareChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirmwareChannel")
            .field("identity", &self.identity)
            .field("ready", &self.is_ready())
            .finish()
    }
}
