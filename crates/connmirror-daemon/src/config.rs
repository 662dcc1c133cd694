//! Runtime configuration
//!
//! Loaded once at startup from `connmirror.toml` under the platform
//! config dir. A missing file yields defaults; a malformed file is a
//! configuration error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use connmirror_core::prelude::*;

/// Transport-level timeout applied to synchronous remote calls.
pub const DEFAULT_REMOTE_TIMEOUT_SECS: u64 = 120;

/// Added to an interface's numeric suffix to form its routing table id.
pub const DEFAULT_ROUTE_TABLE_OFFSET: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub remote_timeout_secs: u64,
    pub route_table_offset: u32,
    /// Locale used for SSID re-encoding instead of the system UI locale.
    pub locale_override: Option<String>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            remote_timeout_secs: DEFAULT_REMOTE_TIMEOUT_SECS,
            route_table_offset: DEFAULT_ROUTE_TABLE_OFFSET,
            locale_override: None,
        }
    }
}

impl DaemonConfig {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Self::default());
            }
            Err(err) => return Err(err.into()),
        };

        toml::from_str(&contents)
            .map_err(|err| Error::config(format!("{}: {err}", path.display())))
    }

    pub fn default_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("connmirror").join("connmirror.toml")
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = DaemonConfig::default();
        assert_eq!(config.remote_timeout_secs, 120);
        assert_eq!(config.route_table_offset, 10);
        assert!(config.locale_override.is_none());
        assert_eq!(config.remote_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, DaemonConfig::default());
    }

    #[test]
    fn test_partial_file_merges_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connmirror.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "route_table_offset = 100").unwrap();

        let config = DaemonConfig::load_from(&path).unwrap();
        assert_eq!(config.route_table_offset, 100);
        assert_eq!(config.remote_timeout_secs, 120);
    }

    #[test]
    fn test_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connmirror.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "remote_timeout_secs = 30").unwrap();
        writeln!(file, "route_table_offset = 20").unwrap();
        writeln!(file, "locale_override = \"ko_KR\"").unwrap();

        let config = DaemonConfig::load_from(&path).unwrap();
        assert_eq!(config.remote_timeout_secs, 30);
        assert_eq!(config.route_table_offset, 20);
        assert_eq!(config.locale_override.as_deref(), Some("ko_KR"));
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("connmirror.toml");
        std::fs::write(&path, "route_table_offset = \"not a number\"").unwrap();

        let err = DaemonConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }
}
