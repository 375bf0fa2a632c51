//! Configuration loading via `ortho-config`.

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;

/// REST API version requested when none is configured.
pub const DEFAULT_API_VERSION: &str = "1.12";

/// Request timeout applied when none is configured.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Transport settings for the array client, merged from defaults,
/// configuration files, and environment variables.
#[derive(Clone, Debug, Deserialize, OrthoConfig, PartialEq, Eq)]
#[ortho_config(
    prefix = "FLASHCTL",
    discovery(
        app_name = "flashctl",
        env_var = "FLASHCTL_CONFIG_PATH",
        config_file_name = "flashctl.toml",
        dotfile_name = ".flashctl.toml",
        project_file_name = "flashctl.toml"
    )
)]
pub struct ArrayConfig {
    /// REST API version used in request paths (for example `1.12`).
    #[ortho_config(default = DEFAULT_API_VERSION.to_owned())]
    pub api_version: String,
    /// Whether to verify the array's TLS certificate. Arrays ship with
    /// self-signed certificates, so disabling this is common in labs; it must
    /// be turned off explicitly.
    #[ortho_config(default = true)]
    pub verify_tls: bool,
    /// Per-request timeout in seconds.
    #[ortho_config(default = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: u64,
}

impl ArrayConfig {
    /// Returns the built-in defaults without consulting any source.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            api_version: DEFAULT_API_VERSION.to_owned(),
            verify_tls: true,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }

    /// Loads configuration without attempting to parse CLI arguments. Values
    /// merge defaults, configuration files, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] when the merge fails.
    pub fn load_without_cli_args() -> Result<Self, ConfigError> {
        Self::load_from_iter([std::ffi::OsString::from("flashctl")])
            .map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Disables certificate verification when `insecure` is set.
    #[must_use]
    pub const fn with_insecure(mut self, insecure: bool) -> Self {
        if insecure {
            self.verify_tls = false;
        }
        self
    }

    /// Performs semantic validation. Error messages name the environment
    /// variable and configuration key that supply each value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when the API version is blank and
    /// [`ConfigError::Invalid`] when the timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version.trim().is_empty() {
            return Err(ConfigError::MissingField(String::from(
                "missing REST API version: set FLASHCTL_API_VERSION or add api_version to flashctl.toml",
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(String::from(
                "request_timeout_secs must be greater than zero (FLASHCTL_REQUEST_TIMEOUT_SECS)",
            )));
        }
        Ok(())
    }
}

/// Errors raised during configuration loading and validation.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum ConfigError {
    /// Indicates a required configuration field is empty or missing.
    #[error("missing configuration field: {0}")]
    MissingField(String),
    /// Indicates a configuration value is out of range.
    #[error("invalid configuration value: {0}")]
    Invalid(String),
    /// Surfaces errors from the `ortho-config` loader.
    #[error("configuration parsing failed: {0}")]
    Parse(String),
}
