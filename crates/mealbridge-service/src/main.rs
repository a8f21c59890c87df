//! Main entry point for the mealbridge service.
//!
//! This binary wires the marketplace together: it loads configuration,
//! builds the storage backend and the engine, starts the periodic cleanup
//! of expired entries and serves the HTTP API until interrupted.

use clap::Parser;
use mealbridge_auth::AuthService;
use mealbridge_config::Config;
use mealbridge_core::Marketplace;
use mealbridge_storage::{StorageFactory, StorageService};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

mod apis;
mod server;

use mealbridge_storage::implementations::file::create_storage as create_file_storage;
use mealbridge_storage::implementations::memory::create_storage as create_memory_storage;
use server::AppState;

/// Command-line arguments for the marketplace service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the marketplace service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the marketplace engine and auth service
/// 5. Runs the API server and cleanup loop until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt().with_env_filter(env_filter).with_target(true).init();

	tracing::info!("Started mealbridge");

	// Load configuration
	let config = Config::from_file_async(args.config.to_str().unwrap_or("config.toml")).await?;
	tracing::info!("Loaded configuration [{}]", config.marketplace.id);

	let state = build_state(&config)?;

	// Periodically sweep expired entries (most notably aged-out listings)
	let cleanup_storage = Arc::clone(state.market.storage());
	let cleanup_interval = config.storage.cleanup_interval_seconds;
	tokio::spawn(async move {
		let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval));
		loop {
			interval.tick().await;
			match cleanup_storage.cleanup_expired().await {
				Ok(0) => {}
				Ok(removed) => tracing::info!(removed, "Removed expired storage entries"),
				Err(e) => tracing::warn!(error = %e, "Storage cleanup failed"),
			}
		}
	});

	if config.api.enabled {
		tokio::select! {
			result = server::start_server(config.api.clone(), state) => {
				tracing::info!("API server finished");
				result?;
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Shutdown signal received");
			}
		}
	} else {
		tracing::info!("API disabled, running storage maintenance only");
		tokio::signal::ctrl_c().await?;
	}

	tracing::info!("Stopped mealbridge");
	Ok(())
}

/// Returns the registry of available storage backends.
fn storage_factories() -> HashMap<&'static str, StorageFactory> {
	let mut factories: HashMap<&'static str, StorageFactory> = HashMap::new();
	factories.insert("memory", create_memory_storage);
	factories.insert("file", create_file_storage);
	factories
}

/// Builds the application state from configuration.
///
/// This resolves the configured storage backend through the factory
/// registry and wires the marketplace engine and auth service on top.
fn build_state(config: &Config) -> Result<AppState, Box<dyn std::error::Error>> {
	let factories = storage_factories();
	let factory = factories
		.get(config.storage.primary.as_str())
		.ok_or_else(|| format!("unknown storage backend '{}'", config.storage.primary))?;

	let backend_config = config
		.storage
		.implementations
		.get(&config.storage.primary)
		.cloned()
		.unwrap_or(toml::Value::Table(toml::map::Map::new()));

	let backend = factory(&backend_config).map_err(|e| {
		tracing::error!(
			component = "storage",
			implementation = %config.storage.primary,
			error = %e,
			"Failed to create storage backend"
		);
		format!(
			"failed to create storage backend '{}': {}",
			config.storage.primary, e
		)
	})?;
	let storage = Arc::new(StorageService::new(backend));
	tracing::info!(component = "storage", implementation = %config.storage.primary, "Loaded");

	let auth = Arc::new(AuthService::new(
		config.auth.token_secret.clone(),
		Duration::from_secs(config.auth.token_ttl_minutes * 60),
	));
	let market = Arc::new(Marketplace::new(storage));

	Ok(AppState { market, auth })
}
