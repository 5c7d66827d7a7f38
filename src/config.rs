//! Engine configuration: compiled-in defaults, optionally overridden by a
//! YAML file, then by UCI `setoption`.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::types::MAX_PLY;

pub const DEFAULT_MAX_DEPTH: u8 = 6;
pub const DEFAULT_TIME_MS: u64 = 1000;
pub const DEFAULT_TT_MB: usize = 128;
pub const MAX_TT_MB: usize = 4096;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file `{path}`: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("config value out of range: {0}")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Maximum iterative-deepening depth in plies.
    pub max_depth: u8,
    /// Fixed per-move budget when no clock is reported.
    pub time_ms: u64,
    /// Transposition table size in megabytes.
    pub tt_mb: usize,
    /// Extend leaf nodes with the captures-only search.
    pub quiescence: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            time_ms: DEFAULT_TIME_MS,
            tt_mb: DEFAULT_TT_MB,
            quiescence: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log budget and search summaries on the error channel.
    pub emit_depth_log: bool,
    /// Include the principal variation in `info` lines.
    pub emit_pv: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            emit_depth_log: true,
            emit_pv: true,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.search.max_depth < 1 || self.search.max_depth as usize > MAX_PLY {
            return Err(ConfigError::OutOfRange(format!(
                "search.max_depth must be in 1..={}, got {}",
                MAX_PLY, self.search.max_depth
            )));
        }
        if self.search.tt_mb < 1 || self.search.tt_mb > MAX_TT_MB {
            return Err(ConfigError::OutOfRange(format!(
                "search.tt_mb must be in 1..={}, got {}",
                MAX_TT_MB, self.search.tt_mb
            )));
        }
        if self.search.time_ms < 1 {
            return Err(ConfigError::OutOfRange(format!(
                "search.time_ms must be at least 1, got {}",
                self.search.time_ms
            )));
        }
        Ok(())
    }
}

/// Load configuration from a YAML file. A missing file is not an error —
/// the compiled-in defaults apply; a malformed or out-of-range file is.
pub fn load(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let config: EngineConfig = serde_yaml::from_str(&text)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search.max_depth, 6);
        assert_eq!(config.search.time_ms, 1000);
        assert_eq!(config.search.tt_mb, 128);
        assert!(config.search.quiescence);
        assert!(config.logging.emit_depth_log);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let yaml = "
search:
  max_depth: 8
  time_ms: 2500
  tt_mb: 64
  quiescence: false
logging:
  emit_depth_log: false
  emit_pv: true
";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.search.max_depth, 8);
        assert_eq!(config.search.time_ms, 2500);
        assert_eq!(config.search.tt_mb, 64);
        assert!(!config.search.quiescence);
        assert!(!config.logging.emit_depth_log);
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let yaml = "search:\n  max_depth: 3\n";
        let config: EngineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.search.max_depth, 3);
        assert_eq!(config.search.tt_mb, DEFAULT_TT_MB);
        assert!(config.logging.emit_pv);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let yaml = "search:\n  null_move: true\n";
        assert!(serde_yaml::from_str::<EngineConfig>(yaml).is_err());
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut config = EngineConfig::default();
        config.search.max_depth = 0;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.search.max_depth = 99;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.search.tt_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_defaults() {
        let config = load(Path::new("/nonexistent/basalt-config.yaml")).unwrap();
        assert_eq!(config.search.max_depth, DEFAULT_MAX_DEPTH);
    }
}
