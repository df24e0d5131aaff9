//! Configuration management for containers-resolver
//!
//! Settings are loaded from environment variables with sensible defaults.
//!
//! # Environment Variables
//!
//! - `RESOLVER_LOG_LEVEL`: Logging level - default: "info"
//! - `RESOLVER_SETTINGS_SUFFIXES`: Comma separated file-name suffixes treated as
//!   settings files - default: ".env,.env_cxcontainers"
//! - `RESOLVER_HELM_BIN`: Helm executable used to render charts - default: "helm"
//! - `RESOLVER_SYFT_BIN`: Syft executable used to analyze images - default: "syft"
//! - `RESOLVER_PLATFORM`: Platform requested when analyzing images - default: "linux/amd64"
//! - `RESOLVER_MAX_ALIAS_DEPTH`: Longest build-stage alias chain followed - default: "32"
//!
//! # Example
//!
//! ```no_run
//! use containers_resolver::ResolverConfig;
//!
//! let config = ResolverConfig::default();
//! config.validate().expect("Invalid configuration");
//! ```

use std::env;
use std::fmt;
use thiserror::Error;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_SETTINGS_SUFFIXES: &[&str] = &[".env", ".env_cxcontainers"];
const DEFAULT_HELM_BIN: &str = "helm";
const DEFAULT_SYFT_BIN: &str = "syft";
const DEFAULT_PLATFORM: &str = "linux/amd64";
const DEFAULT_MAX_ALIAS_DEPTH: usize = 32;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Runtime settings for discovery, extraction and analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// File-name suffixes identifying `KEY=VALUE` settings files
    pub settings_suffixes: Vec<String>,

    /// Helm executable
    pub helm_bin: String,

    /// Syft executable
    pub syft_bin: String,

    /// Platform passed to the image analyzer
    pub platform: String,

    /// Maximum number of hops followed when resolving a build-stage alias
    pub max_alias_depth: usize,
}

impl Default for ResolverConfig {
    /// Loads configuration from `RESOLVER_*` environment variables, falling back to defaults
    fn default() -> Self {
        let builtin = Self::builtin();

        let log_level = env::var("RESOLVER_LOG_LEVEL")
            .map(|v| v.to_lowercase())
            .unwrap_or(builtin.log_level);

        let settings_suffixes = env::var("RESOLVER_SETTINGS_SUFFIXES")
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .unwrap_or(builtin.settings_suffixes);

        let helm_bin = env::var("RESOLVER_HELM_BIN").unwrap_or(builtin.helm_bin);
        let syft_bin = env::var("RESOLVER_SYFT_BIN").unwrap_or(builtin.syft_bin);
        let platform = env::var("RESOLVER_PLATFORM").unwrap_or(builtin.platform);

        let max_alias_depth = env::var("RESOLVER_MAX_ALIAS_DEPTH")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(builtin.max_alias_depth);

        Self {
            log_level,
            settings_suffixes,
            helm_bin,
            syft_bin,
            platform,
            max_alias_depth,
        }
    }
}

impl ResolverConfig {
    /// Built-in defaults, ignoring the environment
    pub fn builtin() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            settings_suffixes: DEFAULT_SETTINGS_SUFFIXES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            helm_bin: DEFAULT_HELM_BIN.to_string(),
            syft_bin: DEFAULT_SYFT_BIN.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
            max_alias_depth: DEFAULT_MAX_ALIAS_DEPTH,
        }
    }

    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any validation fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.settings_suffixes.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "At least one settings file suffix is required".to_string(),
            ));
        }

        if self.helm_bin.trim().is_empty() || self.syft_bin.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Helm and syft executables must not be empty".to_string(),
            ));
        }

        if self.max_alias_depth == 0 {
            return Err(ConfigError::ValidationFailed(
                "Max alias depth must be at least 1".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Returns true when `file_name` names a settings file
    pub fn is_settings_file(&self, file_name: &str) -> bool {
        self.settings_suffixes
            .iter()
            .any(|suffix| file_name.ends_with(suffix.as_str()))
    }
}

impl fmt::Display for ResolverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Resolver Configuration:")?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        writeln!(f, "  Settings Suffixes: {}", self.settings_suffixes.join(", "))?;
        writeln!(f, "  Helm: {}", self.helm_bin)?;
        writeln!(f, "  Syft: {}", self.syft_bin)?;
        writeln!(f, "  Platform: {}", self.platform)?;
        writeln!(f, "  Max Alias Depth: {}", self.max_alias_depth)?;
        Ok(())
    }
}
