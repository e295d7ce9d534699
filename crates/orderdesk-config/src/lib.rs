//! Configuration for the OrderDesk service.
//!
//! Configuration is read from TOML. Every pluggable concern (storage,
//! customer notifications, refund gateway) has a section with a `primary`
//! implementation name and an `implementations` table holding the raw
//! settings of each implementation; the implementation validates its own
//! table when it is built.
//!
//! ## Modular Configuration Support
//!
//! Configurations can be split into multiple files:
//! - Use `include = ["file1.toml", "file2.toml"]` to include other config files
//! - Each top-level section must be unique across all files (no duplicates allowed)
//!
//! `${VAR}` and `${VAR:-default}` are substituted from the environment before
//! parsing.

mod loader;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	#[error("Configuration error: {0}")]
	Parse(String),
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Settings of this desk instance.
	pub desk: DeskConfig,
	/// Document store backend.
	pub storage: StorageConfig,
	/// Customer push notification transport.
	pub notification: NotificationConfig,
	/// Partial-refund gateway.
	pub payment: PaymentConfig,
	/// HTTP API server.
	pub api: Option<ApiConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeskConfig {
	/// Identifier used in logs.
	pub id: String,
	/// Width of the live order window, counted back from now.
	#[serde(default = "default_order_window_hours")]
	pub order_window_hours: u64,
	/// Name recorded as `servedByName` when no admin identity is known.
	#[serde(default = "default_fallback_admin_label")]
	pub fallback_admin_label: String,
	/// Capacity of the internal event bus.
	#[serde(default = "default_event_capacity")]
	pub event_capacity: usize,
}

fn default_order_window_hours() -> u64 {
	24
}

fn default_fallback_admin_label() -> String {
	"Admin".to_string()
}

fn default_event_capacity() -> usize {
	1024
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentConfig {
	pub primary: String,
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_api_host")]
	pub host: String,
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut replacements = Vec::new();
	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};
		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply in reverse so earlier offsets stay valid.
	let mut result = input.to_string();
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}
	Ok(result)
}

fn validate_section(
	section: &str,
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<(), ConfigError> {
	if implementations.is_empty() {
		return Err(ConfigError::Validation(format!(
			"At least one {} implementation must be configured",
			section
		)));
	}
	if primary.is_empty() {
		return Err(ConfigError::Validation(format!(
			"{} primary implementation cannot be empty",
			section
		)));
	}
	if !implementations.contains_key(primary) {
		return Err(ConfigError::Validation(format!(
			"Primary {} '{}' not found in implementations",
			section, primary
		)));
	}
	Ok(())
}

impl Config {
	/// Loads configuration from a file, following `include` directives.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let path_buf = Path::new(path);
		let base_dir = path_buf.parent().unwrap_or_else(|| Path::new("."));

		let mut loader = loader::ConfigLoader::new(base_dir);
		let file_name = path_buf
			.file_name()
			.ok_or_else(|| ConfigError::Validation(format!("Invalid path: {}", path)))?;
		loader.load_config(file_name).await
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.desk.id.is_empty() {
			return Err(ConfigError::Validation("Desk ID cannot be empty".into()));
		}
		if self.desk.order_window_hours == 0 {
			return Err(ConfigError::Validation(
				"order_window_hours must be greater than 0".into(),
			));
		}
		if self.desk.order_window_hours > 24 * 31 {
			return Err(ConfigError::Validation(
				"order_window_hours cannot exceed 744 (31 days)".into(),
			));
		}
		if self.desk.fallback_admin_label.trim().is_empty() {
			return Err(ConfigError::Validation(
				"fallback_admin_label cannot be empty".into(),
			));
		}
		if self.desk.event_capacity == 0 {
			return Err(ConfigError::Validation(
				"event_capacity must be greater than 0".into(),
			));
		}

		validate_section(
			"storage",
			&self.storage.primary,
			&self.storage.implementations,
		)?;
		validate_section(
			"notification",
			&self.notification.primary,
			&self.notification.implementations,
		)?;
		validate_section(
			"payment",
			&self.payment.primary,
			&self.payment.implementations,
		)?;

		if let Some(api) = &self.api {
			if api.enabled && api.port == 0 {
				return Err(ConfigError::Validation("API port cannot be 0".into()));
			}
		}

		Ok(())
	}
}

/// Parses and validates a configuration, resolving environment variables first.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
