//! Assembly configuration.

use crate::error::Result;
use deck_core::ClassifierConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::Path;
use std::time::Duration;

/// Tunables for plan generation and execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Match provider queries in flight at once.
    pub max_concurrent_queries: usize,
    /// Upper bound on a single match provider call. Milliseconds in JSON.
    #[serde(rename = "match_timeout_ms", with = "millis")]
    pub match_timeout: Duration,
    /// Layout candidates kept per template.
    pub multi_match_limit: usize,
    pub classifier: ClassifierConfig,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            max_concurrent_queries: 4,
            match_timeout: Duration::from_secs(30),
            multi_match_limit: 3,
            classifier: ClassifierConfig::default(),
        }
    }
}

impl AssemblyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_concurrent_queries(mut self, limit: usize) -> Self {
        self.max_concurrent_queries = limit.max(1);
        self
    }

    pub fn with_match_timeout(mut self, timeout: Duration) -> Self {
        self.match_timeout = timeout;
        self
    }

    pub fn with_multi_match_limit(mut self, limit: usize) -> Self {
        self.multi_match_limit = limit.max(1);
        self
    }

    pub fn with_classifier(mut self, classifier: ClassifierConfig) -> Self {
        self.classifier = classifier;
        self
    }

    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        let (queries, matches) = (config.max_concurrent_queries, config.multi_match_limit);
        Ok(config
            .with_max_concurrent_queries(queries)
            .with_multi_match_limit(matches))
    }

    /// Read a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(deck_core::Error::from)?;
        Self::from_json(&json)
    }
}

mod millis {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssemblyConfig::default();
        assert_eq!(config.max_concurrent_queries, 4);
        assert_eq!(config.match_timeout, Duration::from_secs(30));
        assert_eq!(config.multi_match_limit, 3);
    }

    #[test]
    fn test_partial_json() {
        let config = AssemblyConfig::from_json(
            r#"{"match_timeout_ms": 1500, "classifier": {"title_band": 0.3}}"#,
        )
        .unwrap();
        assert_eq!(config.match_timeout, Duration::from_millis(1500));
        assert_eq!(config.max_concurrent_queries, 4);
        assert_eq!(config.classifier.title_band, 0.3);
        assert!(!config.classifier.markers.is_empty());
    }

    #[test]
    fn test_zero_limits_are_raised() {
        let config = AssemblyConfig::from_json(r#"{"max_concurrent_queries": 0, "multi_match_limit": 0}"#).unwrap();
        assert_eq!(config.max_concurrent_queries, 1);
        assert_eq!(config.multi_match_limit, 1);
    }

    #[test]
    fn test_builders() {
        let config = AssemblyConfig::new()
            .with_max_concurrent_queries(8)
            .with_match_timeout(Duration::from_millis(10));
        assert_eq!(config.max_concurrent_queries, 8);
        assert_eq!(config.match_timeout, Duration::from_millis(10));
    }
}
