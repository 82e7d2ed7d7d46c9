//! Configuration module for the contract-interaction proxy.
//!
//! Configuration is loaded from TOML files. Every field has a default so an
//! empty file (or no file at all) yields a working configuration; validation
//! rejects values the runtime cannot operate with.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the proxy.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
	/// Configuration for confirmation waiting.
	#[serde(default)]
	pub confirmation: ConfirmationConfig,
	/// Configuration for the submission queue.
	#[serde(default)]
	pub submission: SubmissionConfig,
}

/// Configuration for confirmation waiting.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfirmationConfig {
	/// Number of blocks to wait for inclusion before timing out.
	#[serde(default = "default_block_wait_limit")]
	pub block_wait_limit: u64,
	/// Interval in seconds for the receipt-polling fallback.
	#[serde(default = "default_poll_interval_secs")]
	pub poll_interval_secs: u64,
}

impl Default for ConfirmationConfig {
	fn default() -> Self {
		Self {
			block_wait_limit: default_block_wait_limit(),
			poll_interval_secs: default_poll_interval_secs(),
		}
	}
}

/// Configuration for the submission queue.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubmissionConfig {
	/// Maximum number of requests waiting for the submission worker.
	#[serde(default = "default_queue_capacity")]
	pub queue_capacity: usize,
}

impl Default for SubmissionConfig {
	fn default() -> Self {
		Self {
			queue_capacity: default_queue_capacity(),
		}
	}
}

fn default_block_wait_limit() -> u64 {
	16
}

fn default_poll_interval_secs() -> u64 {
	10
}

fn default_queue_capacity() -> usize {
	10_000
}

impl Config {
	/// Loads and validates a configuration file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		Self::from_toml_str(&content)
	}

	/// Parses and validates configuration from a TOML string.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.confirmation.block_wait_limit == 0 {
			return Err(ConfigError::Validation(
				"confirmation.block_wait_limit must be at least 1".to_string(),
			));
		}
		if self.confirmation.poll_interval_secs == 0 {
			return Err(ConfigError::Validation(
				"confirmation.poll_interval_secs must be at least 1".to_string(),
			));
		}
		if self.submission.queue_capacity == 0 {
			return Err(ConfigError::Validation(
				"submission.queue_capacity must be at least 1".to_string(),
			));
		}
		Ok(())
	}
}
