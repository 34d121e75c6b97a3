//! The multiplexed stream device.
//!
//! [`MuxDevice`] owns the driver state (active signal + acquired lines) behind
//! a single mutex and exposes the byte-stream contract:
//!
//! - `open` / `close` - session lifecycle
//! - `write` - content ignored, toggles the active signal once
//! - `read` - samples the active signal; one-shot per session
//!
//! plus the host lifecycle hooks `on_start` (acquire every line) and
//! `on_stop` (release every line).
//!
//! # Example
//!
//! ```
//! use gpio_mux::device::MuxDevice;
//! use mux_core::{LineId, SignalTable};
//! use mux_driver_mock::MockLineBackend;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(MockLineBackend::new());
//! backend.set_level(LineId(27), true);
//!
//! let device = MuxDevice::new(SignalTable::builtin(), backend);
//! device.on_start()?;
//!
//! let mut session = device.open();
//! assert_eq!(device.read_to_vec(&mut session, 16)?, b"0010");
//! assert!(device.read_to_vec(&mut session, 16)?.is_empty());
//! device.close(session);
//! # Ok(())
//! # }
//! ```

use crate::acquisition::LineAcquisition;
use crate::error::{AcquisitionError, ReadError, SelectError};
use crate::sampler::{self, Sample};
use crate::selector::SignalSelector;
use mux_core::{LineBackend, LineId, SignalTable};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Transfer into a caller buffer failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFault;

/// Destination of a stream read (the caller's buffer).
pub trait ReadSink {
    /// Copy `data` to the caller.
    fn deliver(&mut self, data: &[u8]) -> Result<(), TransferFault>;
}

impl ReadSink for Vec<u8> {
    fn deliver(&mut self, data: &[u8]) -> Result<(), TransferFault> {
        self.extend_from_slice(data);
        Ok(())
    }
}

impl ReadSink for [u8] {
    fn deliver(&mut self, data: &[u8]) -> Result<(), TransferFault> {
        let dst = self.get_mut(..data.len()).ok_or(TransferFault)?;
        dst.copy_from_slice(data);
        Ok(())
    }
}

/// One open stream session and its file offset.
#[derive(Debug, PartialEq, Eq)]
pub struct Session {
    id: Uuid,
    offset: u64,
}

impl Session {
    /// Unique session id, used in logs.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current file offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }
}

/// Process-wide driver state, guarded as a unit.
#[derive(Debug)]
struct DriverState {
    selector: SignalSelector,
    lines: LineAcquisition,
}

/// Snapshot of one signal for status reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStatus {
    /// Signal name
    pub name: String,
    /// Line numbers, most significant first
    pub lines: Vec<u32>,
}

/// Snapshot of the device for the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    /// Whether every line is acquired
    pub up: bool,
    /// Backend name
    pub backend: String,
    /// Active signal index
    pub active_signal: usize,
    /// Active signal name
    pub active_name: String,
    /// The signal table
    pub signals: Vec<SignalStatus>,
    /// Open sessions
    pub sessions: usize,
}

/// The signal multiplexer device.
pub struct MuxDevice {
    table: SignalTable,
    backend: Arc<dyn LineBackend>,
    state: Mutex<DriverState>,
    sessions: AtomicUsize,
}

impl MuxDevice {
    /// Device over `table`, down until [`on_start`](Self::on_start).
    pub fn new(table: SignalTable, backend: Arc<dyn LineBackend>) -> Self {
        let selector = SignalSelector::new(table.len());
        Self {
            table,
            backend,
            state: Mutex::new(DriverState {
                selector,
                lines: LineAcquisition::new(),
            }),
            sessions: AtomicUsize::new(0),
        }
    }

    /// Signal table served by this device.
    pub fn table(&self) -> &SignalTable {
        &self.table
    }

    /// Backend name.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Bring the device up: acquire every line of the table.
    pub fn on_start(&self) -> Result<(), AcquisitionError> {
        let mut state = self.state.lock();
        state.lines.acquire_all(&self.table, self.backend.as_ref())?;
        info!(
            backend = self.backend.name(),
            lines = state.lines.acquired().len(),
            "GPIO multiplexer IS UP"
        );
        Ok(())
    }

    /// Bring the device down: release every line. Never fails.
    pub fn on_stop(&self) {
        let mut state = self.state.lock();
        if state.lines.is_up() {
            state.lines.release_all(self.backend.as_ref());
            info!("GPIO multiplexer is down");
        }
    }

    /// Whether every line is currently acquired.
    pub fn is_up(&self) -> bool {
        self.state.lock().lines.is_up()
    }

    /// Lines currently held, in claim order.
    pub fn acquired_lines(&self) -> Vec<LineId> {
        self.state.lock().lines.acquired().to_vec()
    }

    /// Index of the active signal.
    pub fn active_signal(&self) -> usize {
        self.state.lock().selector.active()
    }

    /// Open a stream session at offset 0.
    ///
    /// Always succeeds; reads on a device that is down fail with
    /// [`ReadError::NotReady`].
    pub fn open(&self) -> Session {
        let session = Session {
            id: Uuid::new_v4(),
            offset: 0,
        };
        self.sessions.fetch_add(1, Ordering::SeqCst);
        info!(session = %session.id, "open()");
        session
    }

    /// Close a session.
    pub fn close(&self, session: Session) {
        self.sessions.fetch_sub(1, Ordering::SeqCst);
        info!(session = %session.id, "close()");
    }

    /// Control write: the bytes are ignored, the active signal advances once.
    ///
    /// Always reports the full length as consumed.
    pub fn write(&self, session: &Session, bytes: &[u8]) -> usize {
        let index = self.toggle();
        debug!(session = %session.id, len = bytes.len(), active = index, "write()");
        bytes.len()
    }

    /// Advance to the next signal (cyclic) and return its index.
    pub fn toggle(&self) -> usize {
        let index = self.state.lock().selector.toggle();
        self.log_selection(index);
        index
    }

    /// Select the signal at `index` directly.
    pub fn select(&self, index: usize) -> Result<usize, SelectError> {
        let index = self.state.lock().selector.select(index)?;
        self.log_selection(index);
        Ok(index)
    }

    fn log_selection(&self, index: usize) {
        if let Some(signal) = self.table.get(index) {
            info!(signal = %signal.name, index, "Selected signal {} for sampling", signal.name);
        }
    }

    /// Sample the active signal without touching any session.
    pub fn sample_active(&self) -> Result<Sample, ReadError> {
        let state = self.state.lock();
        if !state.lines.is_up() {
            return Err(ReadError::NotReady);
        }
        let signal = self
            .table
            .get(state.selector.active())
            .ok_or(ReadError::NotReady)?;
        Ok(sampler::sample(signal, self.backend.as_ref())?)
    }

    /// Stream read into `sink` with the caller's buffer `capacity`.
    ///
    /// 1. Offset past 0: end of data, returns `Ok(0)`.
    /// 2. Sample the active signal.
    /// 3. `capacity` below the sample width: [`ReadError::NoSpace`].
    /// 4. Deliver; a transfer fault is [`ReadError::FaultyBuffer`] and leaves
    ///    the offset alone.
    /// 5. Advance the offset by `capacity` (not by the bytes produced).
    ///
    /// Returns the number of bytes delivered.
    pub fn read<S: ReadSink + ?Sized>(
        &self,
        session: &mut Session,
        capacity: usize,
        sink: &mut S,
    ) -> Result<usize, ReadError> {
        if session.offset > 0 {
            return Ok(0);
        }

        let sample = self.sample_active()?;
        let encoded = sample.as_bytes();

        if capacity < encoded.len() {
            return Err(ReadError::NoSpace {
                needed: encoded.len(),
                capacity,
            });
        }

        sink.deliver(encoded).map_err(|_| ReadError::FaultyBuffer)?;

        session.offset += capacity as u64;
        debug!(session = %session.id, capacity, sample = %sample, "read()");
        Ok(encoded.len())
    }

    /// [`read`](Self::read) into a fresh vector.
    pub fn read_to_vec(&self, session: &mut Session, capacity: usize) -> Result<Vec<u8>, ReadError> {
        let mut out = Vec::with_capacity(capacity.min(mux_core::MAX_LINES));
        self.read(session, capacity, &mut out)?;
        Ok(out)
    }

    /// Snapshot for status reporting.
    pub fn status(&self) -> StatusReport {
        let state = self.state.lock();
        let active = state.selector.active();
        StatusReport {
            up: state.lines.is_up(),
            backend: self.backend.name().to_string(),
            active_signal: active,
            active_name: self
                .table
                .get(active)
                .map(|s| s.name.clone())
                .unwrap_or_default(),
            signals: self
                .table
                .signals()
                .iter()
                .map(|s| SignalStatus {
                    name: s.name.clone(),
                    lines: s.line_ids().map(LineId::get).collect(),
                })
                .collect(),
            sessions: self.sessions.load(Ordering::SeqCst),
        }
    }
}

impl Drop for MuxDevice {
    fn drop(&mut self) {
        self.state.get_mut().lines.release_all(self.backend.as_ref());
    }
}

impl std::fmt::Debug for MuxDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MuxDevice")
            .field("backend", &self.backend.name())
            .field("signals", &self.table.len())
            .field("state", &*self.state.lock())
            .finish()
    }
}
