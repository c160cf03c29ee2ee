/*
 * Test utilities and mock helpers for dchu
 *
 * This module provides a scripted fake firmware and buffer builders that
 * can be used across the unit test modules.
 */

use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use dchu_error::{DchuError, Result};
use parking_lot::Mutex;

use crate::channel::{DsmMethod, FirmwareCall, FirmwareIdentity, FirmwareResult};

/// Scripted answer for one function selector
pub enum Reply {
    Result(FirmwareResult),
    Fail,
    /// Built from the number of calls answered so far (0-based)
    Sequence(Box<dyn Fn(usize) -> FirmwareResult + Send + Sync>),
}

#[derive(Default)]
struct FakeState {
    replies: Mutex<HashMap<u32, Reply>>,
    calls: Mutex<Vec<FirmwareCall>>,
    answered: AtomicUsize,
    in_flight: AtomicBool,
    overlaps: AtomicUsize,
    delay: Duration,
}

/// Fake firmware that records every call and detects overlapping evaluations.
///
/// Clones share state, so a test can keep one clone after moving another
/// into a channel.
#[derive(Clone, Default)]
pub struct FakeFirmware {
    state: Arc<FakeState>,
}

impl FakeFirmware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fake that sleeps inside every evaluation, widening any race window
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            state: Arc::new(FakeState {
                delay,
                ..FakeState::default()
            }),
        }
    }

    pub fn reply(&self, function: u32, reply: Reply) {
        self.state.replies.lock().insert(function, reply);
    }

    pub fn calls(&self) -> Vec<FirmwareCall> {
        self.state.calls.lock().clone()
    }

    pub fn calls_to(&self, function: u32) -> Vec<FirmwareCall> {
        self.calls().into_iter().filter(|c| c.function == function).collect()
    }

    pub fn overlaps(&self) -> usize {
        self.state.overlaps.load(Ordering::SeqCst)
    }
}

impl DsmMethod for FakeFirmware {
    fn evaluate(&self, _identity: &FirmwareIdentity, call: &FirmwareCall) -> Result<FirmwareResult> {
        if self.state.in_flight.swap(true, Ordering::SeqCst) {
            self.state.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        self.state.calls.lock().push(call.clone());
        if !self.state.delay.is_zero() {
            thread::sleep(self.state.delay);
        }

        let n = self.state.answered.fetch_add(1, Ordering::SeqCst);
        let result = match self.state.replies.lock().get(&call.function) {
            Some(Reply::Result(result)) => Ok(result.clone()),
            Some(Reply::Sequence(build)) => Ok(build(n)),
            Some(Reply::Fail) | None => Err(DchuError::io_failure(call.function, "AE_NOT_FOUND")),
        };

        self.state.in_flight.store(false, Ordering::SeqCst);
        result
    }
}

/// Build a 32-byte sensor package with big-endian fan words
pub fn sensor_buffer(fans: [u16; 3], duty: [u8; 3], temps: [u8; 3]) -> Vec<u8> {
    let mut buf = vec![0u8; 32];
    for (i, offset) in [2usize, 4, 6].into_iter().enumerate() {
        buf[offset..offset + 2].copy_from_slice(&fans[i].to_be_bytes());
    }
    for (i, offset) in [16usize, 19, 22].into_iter().enumerate() {
        buf[offset] = duty[i];
    }
    for (i, offset) in [18usize, 21, 24].into_iter().enumerate() {
        buf[offset] = temps[i];
    }
    buf
}

#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a plain-text subscriber on this thread and return what it logged
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let buffer = LogBuffer::default();
    let writer = buffer.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_target(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(move || writer.clone())
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    let logs = String::from_utf8_lossy(&buffer.0.lock()).into_owned();
    (result, logs)
}
