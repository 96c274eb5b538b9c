//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - config.toml (default configuration)
//! - config.local.toml (git-ignored local overrides)
//! - Environment variables (IEGEN_* prefix)
//!
//! This only covers the *ambient* driver knobs: how big the dense
//! partial-ordering graphs are allowed to grow, how many constraints the
//! heuristic removal pass may drop by default, and logging. The JSON
//! driver schema described in the specification (`UFS[]`, `User Defined[]`,
//! `Relation`, `Expected`, ...) is a file-format parsing concern handled by
//! an external front-end and is not part of this crate.
//!
//! ## Example
//!
//! ```toml
//! # config.toml
//! [simplifier]
//! default_max_removals = 4
//! default_max_vertices = 256
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! IEGEN_SIMPLIFIER__DEFAULT_MAX_REMOVALS=8
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Top-level configuration for the simplifier driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub simplifier: SimplifierConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ambient knobs for the simplification pipeline (§4.11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifierConfig {
    /// Default `maxRemovals` budget for `RemoveExpensiveConsts` when the
    /// caller does not supply one explicitly.
    #[serde(default = "default_max_removals")]
    pub default_max_removals: usize,

    /// Default cap on the number of vertices a `PartOrdGraph` /
    /// `TermPartOrdGraph` is allocated for. The dense adjacency matrix is
    /// O(N^2); per the design notes N is expected to stay in the low
    /// hundreds for sparse-loop dependence problems.
    #[serde(default = "default_max_vertices")]
    pub default_max_vertices: usize,
}

fn default_max_removals() -> usize {
    4
}

fn default_max_vertices() -> usize {
    256
}

impl Default for SimplifierConfig {
    fn default() -> Self {
        SimplifierConfig {
            default_max_removals: default_max_removals(),
            default_max_vertices: default_max_vertices(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Merges in order:
    /// 1. config.toml (base configuration)
    /// 2. config.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (IEGEN_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("config.toml"))
            .merge(Toml::file("config.local.toml"))
            .merge(Env::prefixed("IEGEN_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("IEGEN_").split("__"))
            .extract()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            simplifier: SimplifierConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.simplifier.default_max_removals, 4);
        assert_eq!(config.simplifier.default_max_vertices, 256);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_serialization_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        assert!(toml_str.contains("[simplifier]"));
        assert!(toml_str.contains("[logging]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(
            parsed.simplifier.default_max_removals,
            config.simplifier.default_max_removals
        );
    }
}
