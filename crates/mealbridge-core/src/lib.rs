//! Core order lifecycle manager for the mealbridge marketplace.
//!
//! This module provides the main orchestration logic for the marketplace:
//! order creation with listing claims, the status-transition protocol with
//! dual-party confirmation, review attachment, per-order chat and the
//! read-side dashboard aggregation. Every entry point takes a verified
//! `Party` principal; nothing here inspects transport concerns.

use dashmap::DashMap;
use mealbridge_storage::{StorageError, StorageService};
use mealbridge_types::{ApiError, Order, Party, PartyRole, StorageKey};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;

pub mod analytics;
pub mod lifecycle;
pub mod listings;
pub mod messages;
pub mod orders;
pub mod reviews;
pub mod users;

/// Errors that can occur in the order lifecycle manager.
///
/// Missing or invalid caller identity is handled at the auth boundary;
/// by the time the core runs, the caller is a verified principal.
#[derive(Debug, Error)]
pub enum CoreError {
	/// Caller is authenticated but not permitted to perform the operation.
	#[error("Forbidden: {0}")]
	Forbidden(String),
	/// The referenced order, listing or user does not exist.
	#[error("Not found: {0}")]
	NotFound(String),
	/// The operation is not valid from the entity's current state.
	#[error("Invalid state: {0}")]
	InvalidState(String),
	/// The request payload is structurally valid but semantically wrong.
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	/// A uniqueness constraint was violated.
	#[error("Conflict: {0}")]
	Conflict(String),
	/// The storage backend failed.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StorageError> for CoreError {
	fn from(err: StorageError) -> Self {
		match err {
			StorageError::NotFound => CoreError::NotFound("entity not found".to_string()),
			other => CoreError::Storage(other.to_string()),
		}
	}
}

impl From<CoreError> for ApiError {
	fn from(err: CoreError) -> Self {
		match err {
			CoreError::Forbidden(message) => ApiError::forbidden(message),
			CoreError::NotFound(message) => ApiError::not_found(message),
			CoreError::InvalidState(message) => ApiError::bad_request(message),
			CoreError::InvalidArgument(message) => ApiError::bad_request(message),
			CoreError::Conflict(message) => ApiError::conflict(message),
			CoreError::Storage(message) => {
				tracing::error!("Storage failure surfaced to API: {}", message);
				ApiError::internal("storage failure".to_string())
			}
		}
	}
}

/// Returns the current unix time in seconds.
pub(crate) fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

/// Returns the current unix time in milliseconds.
pub(crate) fn now_millis() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_millis() as u64
}

/// The marketplace engine.
///
/// Holds the storage service and the locks that serialize the
/// check-then-act sections: one mutex per order for status mutations, and a
/// single creation lock so two concurrent orders cannot both claim the same
/// listing.
pub struct Marketplace {
	/// Storage service for persisting marketplace data.
	storage: Arc<StorageService>,
	/// Per-order mutexes serializing read-validate-write cycles.
	order_locks: DashMap<String, Arc<Mutex<()>>>,
	/// Serializes the listing-claim section of order creation.
	claim_lock: Mutex<()>,
}

impl Marketplace {
	/// Creates a new marketplace engine over the given storage service.
	pub fn new(storage: Arc<StorageService>) -> Self {
		Self {
			storage,
			order_locks: DashMap::new(),
			claim_lock: Mutex::new(()),
		}
	}

	/// Returns a reference to the storage service.
	pub fn storage(&self) -> &Arc<StorageService> {
		&self.storage
	}

	/// Returns the mutex guarding mutations of one order.
	pub(crate) fn order_lock(&self, order_id: &str) -> Arc<Mutex<()>> {
		self.order_locks
			.entry(order_id.to_string())
			.or_insert_with(|| Arc::new(Mutex::new(())))
			.value()
			.clone()
	}

	/// Loads an order by id.
	pub(crate) async fn load_order(&self, order_id: &str) -> Result<Order, CoreError> {
		self.storage
			.retrieve(StorageKey::Orders.as_str(), order_id)
			.await
			.map_err(|err| match err {
				StorageError::NotFound => CoreError::NotFound("order not found".to_string()),
				other => CoreError::Storage(other.to_string()),
			})
	}

	/// Matches the caller against the two parties of an order.
	///
	/// Both the id and the declared role must line up; a restaurant id
	/// presented with an NGO role matches neither side.
	pub(crate) fn party_sides(order: &Order, caller: &Party) -> (bool, bool) {
		let is_restaurant =
			order.restaurant_id == caller.id && caller.role == PartyRole::Restaurant;
		let is_ngo = order.ngo_id == caller.id && caller.role == PartyRole::Ngo;
		(is_restaurant, is_ngo)
	}

	/// Ensures the caller is one of the order's parties.
	pub(crate) fn require_party(order: &Order, caller: &Party) -> Result<(), CoreError> {
		let (is_restaurant, is_ngo) = Self::party_sides(order, caller);
		if !is_restaurant && !is_ngo {
			return Err(CoreError::Forbidden(
				"not authorized to access this order".to_string(),
			));
		}
		Ok(())
	}
}

#[cfg(test)]
pub(crate) mod testing {
	//! Shared helpers for core tests: a marketplace over memory storage and
	//! fixture parties/listings.

	use super::*;
	use mealbridge_storage::implementations::memory::MemoryStorage;
	use mealbridge_types::{Listing, ListingStatus, Measurement};

	pub fn marketplace() -> Marketplace {
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		Marketplace::new(storage)
	}

	pub fn restaurant() -> Party {
		Party::new("rest-1", PartyRole::Restaurant)
	}

	pub fn ngo() -> Party {
		Party::new("ngo-1", PartyRole::Ngo)
	}

	pub async fn seed_listing(market: &Marketplace, id: &str, restaurant_id: &str) -> Listing {
		let now = now_secs();
		let listing = Listing {
			id: id.to_string(),
			restaurant_id: restaurant_id.to_string(),
			name: format!("surplus {}", id),
			quantity: "2".to_string(),
			measurement: Measurement::Kg,
			expiry: 2,
			status: ListingStatus::Available,
			claimed_by: None,
			expires_at: now + 2 * 3600,
			created_at: now,
			updated_at: now,
		};
		market
			.storage()
			.store(StorageKey::Listings.as_str(), id, &listing)
			.await
			.unwrap();
		listing
	}

	pub async fn stored_listing(market: &Marketplace, id: &str) -> Listing {
		market
			.storage()
			.retrieve(StorageKey::Listings.as_str(), id)
			.await
			.unwrap()
	}
}
