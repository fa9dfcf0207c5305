//! Run configuration, loadable from YAML or JSON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::batch::{ProcessOptions, DEFAULT_MAX_RETRIES};
use crate::error::BatchError;
use crate::policy::RetryConfig;

/// The `log:` section of a run configuration.
///
/// ```yaml
/// log:
///   level: info
///   json: false
///   components:
///     chainbatch-core: debug
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Level for every target without its own entry in `components`.
    #[serde(default = "LogConfig::default_level")]
    pub level: String,
    /// Crate name (`chainbatch-core` or `chainbatch_core`) to level.
    #[serde(default)]
    pub components: BTreeMap<String, String>,
    /// One JSON object per event on stderr instead of plain text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
            components: BTreeMap::new(),
            json: false,
        }
    }
}

impl LogConfig {
    fn default_level() -> String {
        "info".into()
    }

    /// `EnvFilter` directives, e.g. `"info,chainbatch_core=debug"`.
    pub fn directives(&self) -> String {
        std::iter::once(self.level.clone())
            .chain(
                self.components
                    .iter()
                    .map(|(target, level)| format!("{}={level}", target.replace('-', "_"))),
            )
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Top-level batch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Attempts per operation, counting the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed pause between operations (ms); unset uses per-family defaults.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inter_op_delay_ms: Option<u64>,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

fn default_max_retries() -> u32 { DEFAULT_MAX_RETRIES }

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            inter_op_delay_ms: None,
            retry: RetryConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl BatchConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, BatchError> {
        serde_yaml::from_str(yaml).map_err(|e| BatchError::Config(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, BatchError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from a file; `.json` is parsed as JSON, anything else as YAML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BatchError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            Self::from_json(&content)
        } else {
            Self::from_yaml(&content)
        }
    }

    /// Options for a run (without a cancellation token).
    pub fn process_options(&self) -> ProcessOptions {
        ProcessOptions {
            max_retries: self.max_retries,
            inter_op_delay: self.inter_op_delay_ms.map(Duration::from_millis),
            retry: self.retry.clone(),
            cancel: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_with_defaults() {
        let cfg = BatchConfig::from_yaml("max_retries: 5\n").unwrap();
        assert_eq!(cfg.max_retries, 5);
        assert_eq!(cfg.inter_op_delay_ms, None);
        assert_eq!(cfg.retry, RetryConfig::default());
        assert_eq!(cfg.log.level, "info");
    }

    #[test]
    fn yaml_full() {
        let yaml = r#"
max_retries: 4
inter_op_delay_ms: 250
retry:
  base_delay_ms: 500
  max_delay_ms: 8000
log:
  level: debug
  json: true
  components:
    chainbatch-core: trace
"#;
        let cfg = BatchConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.retry.base_delay_ms, 500);
        assert_eq!(cfg.retry.max_delay_ms, 8_000);
        assert_eq!(cfg.retry.network_multiplier, 2);
        assert!(cfg.log.json);
        assert_eq!(cfg.log.directives(), "debug,chainbatch_core=trace");

        let opts = cfg.process_options();
        assert_eq!(opts.max_retries, 4);
        assert_eq!(opts.inter_op_delay, Some(Duration::from_millis(250)));
        assert_eq!(opts.retry, cfg.retry);
    }

    #[test]
    fn json_config() {
        let cfg = BatchConfig::from_json(r#"{ "max_retries": 2 }"#).unwrap();
        assert_eq!(cfg.max_retries, 2);
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = BatchConfig::from_yaml("max_retries: [").unwrap_err();
        assert!(matches!(err, BatchError::Config(_)));
    }
}
