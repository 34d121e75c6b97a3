//! Linux sysfs GPIO backend for gpio-mux.
//!
//! Lines are reserved through the legacy sysfs interface under
//! `/sys/class/gpio`:
//!
//! | Operation | sysfs access |
//! |-----------|--------------|
//! | claim     | write `N` to `export`, then `in` to `gpioN/direction` |
//! | read      | read `gpioN/value` (`0` or `1`) |
//! | release   | write `N` to `unexport` |
//!
//! The kernel refuses to export a line that is already exported (`EBUSY`),
//! which gives the same exclusivity as an in-kernel line request.
//!
//! # Example
//!
//! ```no_run
//! use mux_core::{Direction, LineBackend, LineId};
//! use mux_driver_sysfs::SysfsLineBackend;
//!
//! # fn example() -> Result<(), mux_core::LineError> {
//! let backend = SysfsLineBackend::new("/sys/class/gpio");
//! backend.claim_line(LineId(17), Direction::Input)?;
//! println!("gpio17 = {}", backend.read_line(LineId(17))?);
//! backend.release_line(LineId(17))?;
//! # Ok(())
//! # }
//! ```

mod backend;

pub use backend::{SysfsConfig, SysfsLineBackend, DEFAULT_SYSFS_ROOT};
