//! sysfs line backend implementation.

use mux_core::{Direction, LineBackend, LineError, LineId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Standard location of the GPIO class directory.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/class/gpio";

/// Configuration for [`SysfsLineBackend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysfsConfig {
    /// GPIO class directory (default: `/sys/class/gpio`)
    #[serde(default = "default_root")]
    pub root: PathBuf,
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_ROOT)
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
        }
    }
}

/// [`LineBackend`] over the sysfs GPIO interface.
///
/// Only lines exported by this backend may be read or released; lines
/// exported by other processes are left untouched.
#[derive(Debug)]
pub struct SysfsLineBackend {
    root: PathBuf,
    exported: Mutex<BTreeSet<LineId>>,
}

impl SysfsLineBackend {
    /// Backend rooted at `root` (normally [`DEFAULT_SYSFS_ROOT`]).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            exported: Mutex::new(BTreeSet::new()),
        }
    }

    /// Backend from configuration.
    pub fn with_config(config: &SysfsConfig) -> Self {
        Self::new(config.root.clone())
    }

    /// GPIO class directory in use.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lines exported by this backend.
    pub fn exported(&self) -> Vec<LineId> {
        self.exported.lock().iter().copied().collect()
    }

    fn line_dir(&self, line: LineId) -> PathBuf {
        self.root.join(format!("gpio{}", line.get()))
    }

    fn write_attr(&self, line: LineId, path: &Path, value: &str) -> Result<(), LineError> {
        fs::write(path, value).map_err(|e| LineError::from_io(line, e))
    }

    fn unexport(&self, line: LineId) -> Result<(), LineError> {
        self.write_attr(line, &self.root.join("unexport"), &line.get().to_string())
    }

    /// Unexport a line whose claim failed half way.
    fn undo_export(&self, line: LineId) {
        if let Err(e) = self.unexport(line) {
            warn!(line = %line, error = %e, "Failed to unexport after failed claim");
        }
    }
}

impl LineBackend for SysfsLineBackend {
    fn name(&self) -> &'static str {
        "sysfs"
    }

    fn claim_line(&self, line: LineId, direction: Direction) -> Result<(), LineError> {
        let mut exported = self.exported.lock();
        if exported.contains(&line) {
            return Err(LineError::Busy { line });
        }

        self.write_attr(line, &self.root.join("export"), &line.get().to_string())?;

        let dir = self.line_dir(line);
        if !dir.is_dir() {
            self.undo_export(line);
            return Err(LineError::NotFound {
                line,
                message: format!("{} did not appear after export", dir.display()),
            });
        }

        if let Err(e) = self.write_attr(line, &dir.join("direction"), direction.as_str()) {
            self.undo_export(line);
            return Err(e);
        }

        exported.insert(line);
        debug!(line = %line, direction = direction.as_str(), "Exported sysfs line");
        Ok(())
    }

    fn release_line(&self, line: LineId) -> Result<(), LineError> {
        if !self.exported.lock().remove(&line) {
            return Err(LineError::NotClaimed { line });
        }
        self.unexport(line)?;
        debug!(line = %line, "Unexported sysfs line");
        Ok(())
    }

    fn read_line(&self, line: LineId) -> Result<bool, LineError> {
        if !self.exported.lock().contains(&line) {
            return Err(LineError::NotClaimed { line });
        }

        let raw = fs::read_to_string(self.line_dir(line).join("value"))
            .map_err(|e| LineError::from_io(line, e))?;
        match raw.trim() {
            "0" => Ok(false),
            "1" => Ok(true),
            other => Err(LineError::Hardware {
                line,
                message: format!("unexpected value '{}'", other),
            }),
        }
    }
}
