use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Search configuration.
///
/// Precedence when loading: explicit file > `STAC_STATIC_CONFIG` > `./stac-static.toml`,
/// then environment overrides, then defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Raise when a filter names a property the table does not have; otherwise it resolves to null.
    pub strict_attributes: bool,
    /// Evaluations slower than this are logged at warn level.
    pub slow_search_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            strict_attributes: true,
            slow_search_ms: 500,
        }
    }
}

impl SearchConfig {
    /// # Errors
    /// Returns `SearchError::Config` when the TOML is malformed.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str::<Self>(s)?)
    }

    /// Loads the first config file found in precedence order and applies env overrides.
    ///
    /// # Errors
    /// Returns an error if an explicitly named file cannot be read or any found file is malformed.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::from_toml_str(&std::fs::read_to_string(p)?)?,
            None => {
                let found = Self::candidate_paths().into_iter().find(|p| p.exists());
                match found {
                    Some(p) => {
                        log::debug!("loading search config from {}", p.display());
                        Self::from_toml_str(&std::fs::read_to_string(&p)?)?
                    }
                    None => Self::default(),
                }
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Ok(p) = std::env::var("STAC_STATIC_CONFIG") {
            paths.push(PathBuf::from(p));
        }
        if let Ok(cur) = std::env::current_dir() {
            paths.push(cur.join("stac-static.toml"));
        }
        paths
    }

    fn apply_env(&mut self) {
        if let Ok(s) = std::env::var("STAC_STATIC_STRICT_ATTRIBUTES") {
            self.strict_attributes = !matches!(s.to_ascii_lowercase().as_str(), "0" | "false" | "no");
        }
        if let Some(ms) =
            std::env::var("STAC_STATIC_SLOW_SEARCH_MS").ok().and_then(|s| s.parse::<u64>().ok())
        {
            self.slow_search_ms = ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_strict() {
        let cfg = SearchConfig::default();
        assert!(cfg.strict_attributes);
        assert_eq!(cfg.slow_search_ms, 500);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = SearchConfig::from_toml_str("strict_attributes = false\n").unwrap();
        assert!(!cfg.strict_attributes);
        assert_eq!(cfg.slow_search_ms, 500);
    }

    #[test]
    fn malformed_toml_is_config_error() {
        let err = SearchConfig::from_toml_str("strict_attributes = [").unwrap_err();
        assert!(matches!(err, crate::errors::SearchError::Config(_)));
    }

    #[test]
    fn load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        std::fs::write(&path, "slow_search_ms = 42\n").unwrap();
        let cfg = SearchConfig::load(Some(&path)).unwrap();
        // env may override in CI; only assert when unset
        if std::env::var("STAC_STATIC_SLOW_SEARCH_MS").is_err() {
            assert_eq!(cfg.slow_search_ms, 42);
        }
    }
}
