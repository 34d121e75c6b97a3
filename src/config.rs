//! Configuration System using Figment
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. Compiled-in defaults
//! 2. A TOML file (optional)
//! 3. Environment variables prefixed with `GPIO_MUX_`, nested keys split on `__`
//!
//! The signal table is not part of the configuration; it is fixed at build
//! time (see [`SignalTable::builtin`](mux_core::SignalTable::builtin)).
//!
//! # Example
//! ```no_run
//! use gpio_mux::config::MuxConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), gpio_mux::error::MuxError> {
//! let config = MuxConfig::load(Some(Path::new("gpio-mux.toml")))?;
//! println!("Listening on {}", config.daemon.listen);
//! # Ok(())
//! # }
//! ```
//!
//! ```toml
//! [logging]
//! level = "debug"
//! format = "compact"
//!
//! [daemon]
//! listen = "0.0.0.0:7450"
//!
//! [backend]
//! kind = "mock"
//!
//! [backend.mock_levels]
//! 25 = true
//! ```

use crate::error::{MuxError, MuxResult};
use crate::logging::{parse_log_level, OutputFormat};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use mux_core::{LineId, SignalTable};
use mux_driver_sysfs::SysfsConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "GPIO_MUX_";

/// Default daemon address.
pub const DEFAULT_LISTEN: &str = "127.0.0.1:7450";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MuxConfig {
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
    /// Daemon settings
    #[serde(default)]
    pub daemon: DaemonConfig,
    /// Line backend settings
    #[serde(default)]
    pub backend: BackendConfig,
    /// Client settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
}

/// Daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Socket address the daemon listens on and clients connect to
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
}

/// Which line backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Linux sysfs GPIO
    #[default]
    Sysfs,
    /// In-memory simulation
    Mock,
}

/// Line backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BackendConfig {
    /// Backend selection
    #[serde(default)]
    pub kind: BackendKind,
    /// sysfs backend settings
    #[serde(default)]
    pub sysfs: SysfsConfig,
    /// Initial levels for the mock backend, keyed by line number
    #[serde(default)]
    pub mock_levels: BTreeMap<String, bool>,
}

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Poll interval of `watch` in milliseconds
    #[serde(default = "default_watch_interval")]
    pub watch_interval_ms: u64,
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7450))
}

fn default_watch_interval() -> u64 {
    100
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: OutputFormat::default(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            watch_interval_ms: default_watch_interval(),
        }
    }
}

impl BackendConfig {
    /// Parsed mock levels.
    pub fn mock_levels(&self) -> MuxResult<Vec<(LineId, bool)>> {
        self.mock_levels
            .iter()
            .map(|(key, &high)| {
                key.trim()
                    .parse::<u32>()
                    .map(|id| (LineId(id), high))
                    .map_err(|_| {
                        MuxError::Configuration(format!("Invalid mock line number '{}'", key))
                    })
            })
            .collect()
    }
}

impl MuxConfig {
    /// Layered figment for `path` (skipped when `None` or missing).
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(MuxConfig::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load and validate configuration against the builtin table.
    pub fn load(path: Option<&Path>) -> MuxResult<Self> {
        let config: MuxConfig = Self::figment(path).extract()?;
        config.validate(&SignalTable::builtin())?;
        Ok(config)
    }

    /// Semantic checks that parsing cannot express.
    pub fn validate(&self, table: &SignalTable) -> MuxResult<()> {
        parse_log_level(&self.logging.level).map_err(MuxError::Configuration)?;

        if self.client.watch_interval_ms == 0 {
            return Err(MuxError::Configuration(
                "client.watch_interval_ms must be greater than 0".to_string(),
            ));
        }

        for (line, _) in self.backend.mock_levels()? {
            if !table.contains_line(line) {
                return Err(MuxError::Configuration(format!(
                    "Mock level set for {} which is not in the signal table",
                    line
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    #[serial]
    fn test_defaults() {
        let config = MuxConfig::load(None).unwrap();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.daemon.listen.to_string(), DEFAULT_LISTEN);
        assert_eq!(config.backend.kind, BackendKind::Sysfs);
        assert_eq!(config.client.watch_interval_ms, 100);
    }

    #[test]
    #[serial]
    fn test_toml_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[logging]
level = "debug"
format = "json"

[daemon]
listen = "0.0.0.0:9000"

[backend]
kind = "mock"

[backend.mock_levels]
25 = true
"#
        )
        .unwrap();

        let config = MuxConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, OutputFormat::Json);
        assert_eq!(config.daemon.listen.port(), 9000);
        assert_eq!(config.backend.kind, BackendKind::Mock);
        assert_eq!(
            config.backend.mock_levels().unwrap(),
            vec![(LineId(25), true)]
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("mux.toml", "[logging]\nlevel = \"warn\"\n")?;
            jail.set_env("GPIO_MUX_LOGGING__LEVEL", "error");
            jail.set_env("GPIO_MUX_BACKEND__KIND", "mock");

            let config: MuxConfig = MuxConfig::figment(Some(Path::new("mux.toml"))).extract()?;
            assert_eq!(config.logging.level, "error");
            assert_eq!(config.backend.kind, BackendKind::Mock);
            Ok(())
        });
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let table = SignalTable::builtin();

        let mut config = MuxConfig::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate(&table).is_err());

        let mut config = MuxConfig::default();
        config.client.watch_interval_ms = 0;
        assert!(config.validate(&table).is_err());

        let mut config = MuxConfig::default();
        config.backend.mock_levels.insert("5".to_string(), true);
        assert!(config.validate(&table).is_err());

        let mut config = MuxConfig::default();
        config.backend.mock_levels.insert("gpio5".to_string(), true);
        assert!(config.validate(&table).is_err());

        assert!(MuxConfig::default().validate(&table).is_ok());
    }
}
