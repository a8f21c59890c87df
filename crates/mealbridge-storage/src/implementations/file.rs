//! File-based storage backend for the marketplace.
//!
//! This module provides a file-backed implementation of the StorageInterface
//! trait, storing each document as a binary file with a fixed-size header
//! carrying TTL information for automatic expiration.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use mealbridge_types::StorageKey;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;

#[allow(clippy::doc_nested_refdefs)]
/// Fixed-size file header for TTL support.
///
/// Binary layout (64 bytes total):
/// - [0-3]: Magic bytes "MBST"
/// - [4-5]: Version (u16, little-endian)
/// - [6-13]: Expiration timestamp (u64, little-endian, Unix seconds, 0 = never)
/// - [14-63]: Reserved/padding for future use
#[derive(Debug, Clone)]
struct FileHeader {
	magic: [u8; 4],
	version: u16,
	expires_at: u64,
	padding: [u8; 50],
}

impl FileHeader {
	const MAGIC: &'static [u8; 4] = b"MBST";
	const VERSION: u16 = 1;
	const SIZE: usize = 64;

	/// Creates a new header with the given TTL.
	fn new(ttl: Duration) -> Self {
		let expires_at = if ttl.is_zero() {
			0 // Permanent storage
		} else {
			SystemTime::now()
				.duration_since(UNIX_EPOCH)
				.unwrap_or_default()
				.as_secs()
				.saturating_add(ttl.as_secs())
		};

		Self {
			magic: *Self::MAGIC,
			version: Self::VERSION,
			expires_at,
			padding: [0; 50],
		}
	}

	/// Serializes the header to bytes.
	fn serialize(&self) -> [u8; Self::SIZE] {
		let mut bytes = [0u8; Self::SIZE];
		bytes[0..4].copy_from_slice(&self.magic);
		bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
		bytes[6..14].copy_from_slice(&self.expires_at.to_le_bytes());
		bytes[14..64].copy_from_slice(&self.padding);
		bytes
	}

	/// Deserializes a header from bytes.
	fn deserialize(bytes: &[u8]) -> Result<Self, StorageError> {
		if bytes.len() < Self::SIZE {
			return Err(StorageError::Backend("File too small for header".into()));
		}

		let mut magic = [0u8; 4];
		magic.copy_from_slice(&bytes[0..4]);

		if magic != *Self::MAGIC {
			return Err(StorageError::Backend("Unrecognized file format".into()));
		}

		let version = u16::from_le_bytes([bytes[4], bytes[5]]);
		if version > Self::VERSION {
			return Err(StorageError::Backend(format!(
				"Unsupported file version: {}",
				version
			)));
		}

		let mut expires_bytes = [0u8; 8];
		expires_bytes.copy_from_slice(&bytes[6..14]);
		let expires_at = u64::from_le_bytes(expires_bytes);

		let mut padding = [0u8; 50];
		padding.copy_from_slice(&bytes[14..64]);

		Ok(Self {
			magic,
			version,
			expires_at,
			padding,
		})
	}

	/// Checks if the data has expired.
	fn is_expired(&self) -> bool {
		if self.expires_at == 0 {
			return false; // Permanent storage
		}

		let now = SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.unwrap_or_default()
			.as_secs();

		now >= self.expires_at
	}
}

/// TTL configuration for the different storage collections.
#[derive(Debug, Clone)]
pub struct TtlConfig {
	ttls: HashMap<StorageKey, Duration>,
}

impl TtlConfig {
	/// Creates TTL config from TOML configuration.
	fn from_config(config: &toml::Value) -> Self {
		let mut ttls = HashMap::new();

		if let Some(table) = config.as_table() {
			for storage_key in StorageKey::all() {
				let config_key = format!("ttl_{}", storage_key.as_str());
				if let Some(ttl_value) = table
					.get(&config_key)
					.and_then(|v| v.as_integer())
					.map(|v| v as u64)
				{
					ttls.insert(storage_key, Duration::from_secs(ttl_value));
				}
			}
		}

		Self { ttls }
	}

	/// Gets the TTL for a specific storage collection.
	fn get_ttl(&self, storage_key: StorageKey) -> Duration {
		self.ttls
			.get(&storage_key)
			.copied()
			.unwrap_or(Duration::ZERO)
	}
}

/// File-based storage implementation.
///
/// This implementation stores data as binary files on the filesystem,
/// providing simple persistence without requiring external dependencies.
/// Files include a header with TTL information for automatic expiration.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// TTL configuration for the different storage collections.
	ttl_config: TtlConfig,
}

impl FileStorage {
	/// Creates a new FileStorage instance with the specified base path and TTL config.
	pub fn new(base_path: PathBuf, ttl_config: TtlConfig) -> Self {
		Self {
			base_path,
			ttl_config,
		}
	}

	/// Converts a storage key to a filesystem-safe file path.
	///
	/// Sanitizes the key by replacing problematic characters and
	/// appending a .bin extension.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', ':'], "_");
		self.base_path.join(format!("{}.bin", safe_key))
	}

	/// Gets the TTL for a given key based on its namespace.
	fn get_ttl_for_key(&self, key: &str) -> Duration {
		// Parse namespace from key (e.g., "listings:123" -> "listings")
		let namespace = key.split(':').next().unwrap_or("");

		namespace
			.parse::<StorageKey>()
			.map(|sk| self.ttl_config.get_ttl(sk))
			.unwrap_or(Duration::ZERO)
	}

	/// Reads a file and returns its payload if it exists and has not expired.
	async fn read_live(&self, path: &PathBuf) -> Result<Option<Vec<u8>>, StorageError> {
		let data = match fs::read(path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let header = FileHeader::deserialize(&data)?;
		if header.is_expired() {
			return Ok(None);
		}

		if data.len() > FileHeader::SIZE {
			Ok(Some(data[FileHeader::SIZE..].to_vec()))
		} else {
			Ok(Some(Vec::new()))
		}
	}

	/// Removes all expired files from storage
	async fn cleanup_expired_files(&self) -> Result<usize, StorageError> {
		let mut removed = 0;
		let mut entries = fs::read_dir(&self.base_path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() == Some(std::ffi::OsStr::new("bin")) {
				match fs::read(&path).await {
					Ok(data) => {
						if data.len() >= FileHeader::SIZE {
							if let Ok(header) = FileHeader::deserialize(&data[..FileHeader::SIZE]) {
								if header.is_expired() {
									if let Err(e) = fs::remove_file(&path).await {
										tracing::warn!(
											"Failed to remove expired file {:?}: {}",
											path,
											e
										);
									} else {
										removed += 1;
									}
								}
							}
						} else {
							tracing::debug!(
								"Skipping file {:?}: too small ({} bytes, expected at least {})",
								path,
								data.len(),
								FileHeader::SIZE
							);
						}
					}
					Err(e) => {
						tracing::debug!("Skipping file {:?}: could not be read: {}", path, e);
					}
				}
			}
		}
		Ok(removed)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);
		match self.read_live(&path).await? {
			Some(data) => Ok(data),
			None => Err(StorageError::NotFound),
		}
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		// Create parent directory if it doesn't exist
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		// Determine TTL: use provided TTL, or get from config based on key
		let ttl = ttl.unwrap_or_else(|| self.get_ttl_for_key(key));

		let header = FileHeader::new(ttl);
		let header_bytes = header.serialize();

		let mut file_data = Vec::with_capacity(FileHeader::SIZE + value.len());
		file_data.extend_from_slice(&header_bytes);
		file_data.extend_from_slice(&value);

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, file_data)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.get_file_path(key);
		Ok(self.read_live(&path).await?.is_some())
	}

	async fn scan_bytes(&self, namespace: &str) -> Result<Vec<Vec<u8>>, StorageError> {
		let prefix = format!("{}_", namespace.replace(['/', ':'], "_"));
		let mut results = Vec::new();

		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			// A namespace nothing has written to yet is just empty
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(results),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			let is_match = path.extension() == Some(std::ffi::OsStr::new("bin"))
				&& path
					.file_stem()
					.and_then(|stem| stem.to_str())
					.is_some_and(|stem| stem.starts_with(&prefix));

			if is_match {
				if let Some(data) = self.read_live(&path).await? {
					results.push(data);
				}
			}
		}

		Ok(results)
	}

	async fn cleanup_expired(&self) -> Result<usize, StorageError> {
		self.cleanup_expired_files().await
	}
}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for file storage (default: "./data/storage")
/// - `ttl_users`: TTL in seconds for user accounts (default: 0, never expire)
/// - `ttl_listings`: TTL in seconds for listings (default: 0; per-listing expiry
///   windows still apply, this only sets a collection-wide fallback)
/// - `ttl_orders`: TTL in seconds for orders (default: 0)
/// - `ttl_messages`: TTL in seconds for chat messages (default: 0)
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = match config.get("storage_path") {
		Some(value) => value
			.as_str()
			.ok_or_else(|| {
				StorageError::Configuration("storage_path must be a string".to_string())
			})?
			.to_string(),
		None => "./data/storage".to_string(),
	};

	let ttl_config = TtlConfig::from_config(config);

	Ok(Box::new(FileStorage::new(
		PathBuf::from(storage_path),
		ttl_config,
	)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::tempdir;

	fn storage_in(dir: &tempfile::TempDir) -> FileStorage {
		FileStorage::new(
			dir.path().to_path_buf(),
			TtlConfig {
				ttls: HashMap::new(),
			},
		)
	}

	#[tokio::test]
	async fn test_roundtrip_and_delete() {
		let dir = tempdir().unwrap();
		let storage = storage_in(&dir);

		storage
			.set_bytes("orders:abc", b"payload".to_vec(), None)
			.await
			.unwrap();
		assert!(storage.exists("orders:abc").await.unwrap());
		assert_eq!(storage.get_bytes("orders:abc").await.unwrap(), b"payload");

		storage.delete("orders:abc").await.unwrap();
		assert!(matches!(
			storage.get_bytes("orders:abc").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_scan_respects_namespace_prefix() {
		let dir = tempdir().unwrap();
		let storage = storage_in(&dir);

		storage
			.set_bytes("listings:1", b"one".to_vec(), None)
			.await
			.unwrap();
		storage
			.set_bytes("listings:2", b"two".to_vec(), None)
			.await
			.unwrap();
		storage
			.set_bytes("users:1", b"someone".to_vec(), None)
			.await
			.unwrap();

		let mut scanned = storage.scan_bytes("listings").await.unwrap();
		scanned.sort();
		assert_eq!(scanned, vec![b"one".to_vec(), b"two".to_vec()]);

		// Scanning a namespace that was never written is empty, not an error
		assert!(storage.scan_bytes("messages").await.unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_expired_entries_are_invisible_and_cleaned() {
		let dir = tempdir().unwrap();
		let storage = storage_in(&dir);

		// Header granularity is whole seconds, so write an already-expired
		// header directly instead of sleeping through a TTL.
		let mut header = FileHeader::new(Duration::from_secs(60));
		header.expires_at = 1;
		let mut file_data = header.serialize().to_vec();
		file_data.extend_from_slice(b"stale");
		fs::write(dir.path().join("listings_old.bin"), file_data)
			.await
			.unwrap();

		storage
			.set_bytes("listings:fresh", b"fresh".to_vec(), None)
			.await
			.unwrap();

		assert!(matches!(
			storage.get_bytes("listings:old").await,
			Err(StorageError::NotFound)
		));
		assert_eq!(
			storage.scan_bytes("listings").await.unwrap(),
			vec![b"fresh".to_vec()]
		);

		assert_eq!(storage.cleanup_expired().await.unwrap(), 1);
		assert!(storage.get_bytes("listings:fresh").await.is_ok());
	}
}
