//! Harness configuration.
//!
//! Defaults reproduce the fixed behavior of the harness; an optional YAML
//! file and command-line overrides can change them.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::HarnessError;

/// Number of games the validation entry point simulates.
pub const DEFAULT_NUM_GAMES: u32 = 14;

/// Configuration for one harness run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Entry document of the application under test.
    pub app: PathBuf,
    /// Browser executable (autodetected when unset).
    pub chrome: Option<PathBuf>,
    /// Id of the element whose presence means the app has loaded.
    pub ready_marker: String,
    pub ready_timeout_secs: u64,
    /// Fixed delay after load and after league creation.
    pub settle_secs: u64,
    pub poll_interval_ms: u64,
    pub num_games: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            app: PathBuf::from("index.html"),
            chrome: None,
            ready_marker: "app".to_string(),
            ready_timeout_secs: 10,
            settle_secs: 2,
            poll_interval_ms: 100,
            num_games: DEFAULT_NUM_GAMES,
        }
    }
}

impl HarnessConfig {
    /// Loads a config file; missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let content = fs::read_to_string(path)
            .map_err(|e| HarnessError::Config(format!("{}: {e}", path.display())))?;
        Self::parse(&content).map_err(|e| match e {
            HarnessError::Config(msg) => HarnessError::Config(format!("{}: {msg}", path.display())),
            other => other,
        })
    }

    pub fn parse(content: &str) -> Result<Self, HarnessError> {
        let config: Self =
            serde_yaml_ng::from_str(content).map_err(|e| HarnessError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), HarnessError> {
        if self.num_games == 0 {
            return Err(HarnessError::Config("num_games must be at least 1".to_string()));
        }
        if self.ready_marker.trim().is_empty() {
            return Err(HarnessError::Config("ready_marker must not be empty".to_string()));
        }
        Ok(())
    }

    pub const fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub const fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.app, PathBuf::from("index.html"));
        assert_eq!(config.ready_marker, "app");
        assert_eq!(config.ready_timeout(), Duration::from_secs(10));
        assert_eq!(config.settle_delay(), Duration::from_secs(2));
        assert_eq!(config.num_games, 14);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = HarnessConfig::parse("app: dist/index.html\nsettle_secs: 3\n").unwrap();
        assert_eq!(config.app, PathBuf::from("dist/index.html"));
        assert_eq!(config.settle_secs, 3);
        assert_eq!(config.num_games, DEFAULT_NUM_GAMES);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = HarnessConfig::parse("num_gmaes: 10\n").unwrap_err();
        assert!(matches!(err, HarnessError::Config(_)));
    }

    #[test]
    fn test_zero_games_rejected() {
        assert!(HarnessConfig::parse("num_games: 0\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ready_marker: root\nready_timeout_secs: 30").unwrap();
        let config = HarnessConfig::load(file.path()).unwrap();
        assert_eq!(config.ready_marker, "root");
        assert_eq!(config.ready_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = HarnessConfig::load(Path::new("/nonexistent/harness.yaml")).unwrap_err();
        assert!(err.to_string().starts_with("invalid config: /nonexistent/harness.yaml"));
    }
}
