//! Backend selection.
//!
//! Builds the [`LineBackend`] named by the configuration: the Linux sysfs
//! GPIO interface for real hardware, or the in-memory mock for simulation.

use crate::config::{BackendConfig, BackendKind};
use crate::error::MuxResult;
use mux_core::LineBackend;
use mux_driver_mock::MockLineBackend;
use mux_driver_sysfs::SysfsLineBackend;
use std::sync::Arc;
use tracing::info;

/// Create the configured line backend.
pub fn build_backend(config: &BackendConfig) -> MuxResult<Arc<dyn LineBackend>> {
    let backend: Arc<dyn LineBackend> = match config.kind {
        BackendKind::Sysfs => {
            info!(root = %config.sysfs.root.display(), "Using sysfs line backend");
            Arc::new(SysfsLineBackend::with_config(&config.sysfs))
        }
        BackendKind::Mock => {
            let mock = MockLineBackend::new();
            mock.set_levels(config.mock_levels()?);
            info!(levels = config.mock_levels.len(), "Using mock line backend");
            Arc::new(mock)
        }
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_mock_backend() {
        let mut config = BackendConfig {
            kind: BackendKind::Mock,
            ..Default::default()
        };
        config.mock_levels.insert("17".to_string(), true);

        let backend = build_backend(&config).unwrap();
        assert_eq!(backend.name(), "mock");
    }

    #[test]
    fn test_build_sysfs_backend() {
        let backend = build_backend(&BackendConfig::default()).unwrap();
        assert_eq!(backend.name(), "sysfs");
    }

    #[test]
    fn test_bad_mock_level_key() {
        let mut config = BackendConfig {
            kind: BackendKind::Mock,
            ..Default::default()
        };
        config.mock_levels.insert("seventeen".to_string(), true);
        assert!(build_backend(&config).is_err());
    }
}
