//! Configuration module for the mealbridge marketplace.
//!
//! This module provides structures and utilities for managing the service
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required configuration values are
//! properly set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		let message = err.message().to_string();
		ConfigError::Parse(message)
	}
}

/// Main configuration structure for the marketplace service.
///
/// This structure contains all configuration sections required for the
/// service to operate: instance identity, storage backend, authentication
/// and the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this marketplace instance.
	pub marketplace: MarketplaceConfig,
	/// Configuration for the storage backend.
	pub storage: StorageConfig,
	/// Configuration for token issuance and verification.
	pub auth: AuthConfig,
	/// Configuration for the HTTP API server.
	#[serde(default)]
	pub api: ApiConfig,
}

/// Configuration specific to the marketplace instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketplaceConfig {
	/// Unique identifier for this instance, used in logs.
	pub id: String,
}

/// Configuration for the storage backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
	/// Which implementation to use as primary.
	pub primary: String,
	/// Map of storage implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
	/// Interval in seconds for cleaning up expired storage entries.
	#[serde(default = "default_cleanup_interval_seconds")]
	pub cleanup_interval_seconds: u64,
}

/// Returns the default cleanup interval in seconds.
fn default_cleanup_interval_seconds() -> u64 {
	300 // Sweep expired listings every five minutes
}

/// Configuration for token issuance and verification.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
	/// Secret the token signatures are keyed on.
	pub token_secret: String,
	/// Token lifetime in minutes. Defaults to 60 minutes.
	#[serde(default = "default_token_ttl_minutes")]
	pub token_ttl_minutes: u64,
}

/// Returns the default token lifetime in minutes.
fn default_token_ttl_minutes() -> u64 {
	60
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the HTTP server should be started.
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	/// Address to bind to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	8080
}

impl Default for ApiConfig {
	fn default() -> Self {
		Self {
			enabled: default_api_enabled(),
			host: default_api_host(),
			port: default_api_port(),
		}
	}
}

impl Config {
	/// Parses configuration from a TOML string and validates it.
	pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
		let config: Config = toml::from_str(raw)?;
		config.validate()?;
		Ok(config)
	}

	/// Loads configuration from a TOML file.
	pub fn from_file(path: &str) -> Result<Self, ConfigError> {
		let raw = std::fs::read_to_string(path)?;
		Self::from_toml_str(&raw)
	}

	/// Loads configuration from a TOML file without blocking the runtime.
	pub async fn from_file_async(path: &str) -> Result<Self, ConfigError> {
		let raw = tokio::fs::read_to_string(path).await?;
		Self::from_toml_str(&raw)
	}

	/// Validates the configuration beyond what deserialization checks.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.marketplace.id.trim().is_empty() {
			return Err(ConfigError::Validation(
				"marketplace.id must not be empty".to_string(),
			));
		}

		if !self
			.storage
			.implementations
			.contains_key(&self.storage.primary)
		{
			return Err(ConfigError::Validation(format!(
				"storage.primary '{}' has no matching entry under storage.implementations",
				self.storage.primary
			)));
		}

		if self.auth.token_secret.len() < 16 {
			return Err(ConfigError::Validation(
				"auth.token_secret must be at least 16 characters".to_string(),
			));
		}

		if self.auth.token_ttl_minutes == 0 {
			return Err(ConfigError::Validation(
				"auth.token_ttl_minutes must be greater than zero".to_string(),
			));
		}

		Ok(())
	}
}
