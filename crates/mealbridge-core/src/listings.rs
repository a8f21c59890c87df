//! Listing management and the claim/release coordinator.
//!
//! Restaurants create, edit and delete their listings; NGOs browse what is
//! available. The order lifecycle drives claims (on creation) and releases
//! (on decline) as batch writes over the snapshot. Listings carry an expiry
//! window and age out of storage through the backend's TTL support.

use crate::{now_secs, CoreError, Marketplace};
use futures::future::join_all;
use mealbridge_storage::StorageError;
use mealbridge_types::{
	AvailableListing, CreateListingRequest, Listing, ListingStatus, Order, Party, PartyRole,
	StorageKey, UpdateListingRequest, MAX_EXPIRY_HOURS, MIN_EXPIRY_HOURS,
};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Remaining lifetime of a listing, if it has not already expired.
fn remaining_ttl(listing: &Listing, now: u64) -> Option<Duration> {
	let remaining = listing.expires_at.saturating_sub(now);
	(remaining > 0).then(|| Duration::from_secs(remaining))
}

impl Marketplace {
	/// Creates a new listing for the calling restaurant.
	///
	/// The listing is stored with a TTL matching its expiry window, so the
	/// offer disappears once the food is no longer good.
	pub async fn create_listing(
		&self,
		caller: &Party,
		request: CreateListingRequest,
	) -> Result<Listing, CoreError> {
		if caller.role != PartyRole::Restaurant {
			return Err(CoreError::Forbidden(
				"only restaurants can create listings".to_string(),
			));
		}
		if !(MIN_EXPIRY_HOURS..=MAX_EXPIRY_HOURS).contains(&request.expiry) {
			return Err(CoreError::InvalidArgument(format!(
				"expiry must be between {} and {} hours",
				MIN_EXPIRY_HOURS, MAX_EXPIRY_HOURS
			)));
		}

		let now = now_secs();
		let ttl = Duration::from_secs(u64::from(request.expiry) * 3600);
		let listing = Listing {
			id: Uuid::new_v4().to_string(),
			restaurant_id: caller.id.clone(),
			name: request.name,
			quantity: request.quantity,
			measurement: request.measurement,
			expiry: request.expiry,
			status: ListingStatus::Available,
			claimed_by: None,
			expires_at: now + ttl.as_secs(),
			created_at: now,
			updated_at: now,
		};

		self.storage
			.store_with_ttl(StorageKey::Listings.as_str(), &listing.id, &listing, Some(ttl))
			.await?;

		tracing::info!(listing_id = %listing.id, restaurant_id = %caller.id, "Listing created");
		Ok(listing)
	}

	/// Returns all available listings, each annotated with the owning
	/// restaurant's average star rating across its orders.
	pub async fn available_listings(&self) -> Result<Vec<AvailableListing>, CoreError> {
		let mut listings: Vec<Listing> = self.storage.query(StorageKey::Listings.as_str()).await?;
		listings.retain(|listing| listing.status == ListingStatus::Available);
		listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));

		let orders: Vec<Order> = self.storage.query(StorageKey::Orders.as_str()).await?;
		let mut stars_by_restaurant: HashMap<&str, (u64, u64)> = HashMap::new();
		for order in &orders {
			if let Some(stars) = order.rest_stars {
				let entry = stars_by_restaurant
					.entry(order.restaurant_id.as_str())
					.or_insert((0, 0));
				entry.0 += u64::from(stars);
				entry.1 += 1;
			}
		}

		Ok(listings
			.into_iter()
			.map(|listing| {
				let avg_restaurant_stars = stars_by_restaurant
					.get(listing.restaurant_id.as_str())
					.map(|(sum, count)| *sum as f64 / *count as f64);
				AvailableListing {
					listing,
					avg_restaurant_stars,
				}
			})
			.collect())
	}

	/// Returns the calling restaurant's own listings, newest first.
	pub async fn listings_for_restaurant(&self, caller: &Party) -> Result<Vec<Listing>, CoreError> {
		if caller.role != PartyRole::Restaurant {
			return Err(CoreError::Forbidden(
				"only restaurants can list their own listings".to_string(),
			));
		}
		let mut listings: Vec<Listing> = self.storage.query(StorageKey::Listings.as_str()).await?;
		listings.retain(|listing| listing.restaurant_id == caller.id);
		listings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(listings)
	}

	/// Replaces the mutable fields of one of the caller's listings.
	///
	/// A listing that does not exist, or belongs to another restaurant, is
	/// reported as not found rather than leaking ownership information.
	pub async fn update_listing(
		&self,
		caller: &Party,
		listing_id: &str,
		request: UpdateListingRequest,
	) -> Result<Listing, CoreError> {
		if caller.role != PartyRole::Restaurant {
			return Err(CoreError::Forbidden(
				"only restaurants can update listings".to_string(),
			));
		}

		let mut listing = self.load_owned_listing(caller, listing_id).await?;
		if !(MIN_EXPIRY_HOURS..=MAX_EXPIRY_HOURS).contains(&request.expiry) {
			return Err(CoreError::InvalidArgument(format!(
				"expiry must be between {} and {} hours",
				MIN_EXPIRY_HOURS, MAX_EXPIRY_HOURS
			)));
		}

		let now = now_secs();
		listing.name = request.name;
		listing.quantity = request.quantity;
		listing.measurement = request.measurement;
		listing.expiry = request.expiry;
		listing.updated_at = now;

		self.persist_listing(&listing, now).await?;
		Ok(listing)
	}

	/// Directly changes a listing's availability state.
	///
	/// NGOs may claim an available listing; the owning restaurant may mark
	/// a claimed listing completed after handover. These are the only
	/// direct changes; everything else flows through the order lifecycle.
	pub async fn patch_listing_status(
		&self,
		caller: &Party,
		listing_id: &str,
		status: ListingStatus,
	) -> Result<Listing, CoreError> {
		let mut listing: Listing = self
			.storage
			.retrieve(StorageKey::Listings.as_str(), listing_id)
			.await
			.map_err(|err| match err {
				StorageError::NotFound => CoreError::NotFound("listing not found".to_string()),
				other => CoreError::Storage(other.to_string()),
			})?;

		match status {
			ListingStatus::Claimed => {
				if caller.role != PartyRole::Ngo {
					return Err(CoreError::Forbidden(
						"only NGOs can claim a listing".to_string(),
					));
				}
				if listing.status != ListingStatus::Available {
					return Err(CoreError::InvalidState(
						"listing is not available".to_string(),
					));
				}
				listing.status = ListingStatus::Claimed;
				listing.claimed_by = Some(caller.id.clone());
			}
			ListingStatus::Completed => {
				if caller.role != PartyRole::Restaurant || listing.restaurant_id != caller.id {
					return Err(CoreError::Forbidden(
						"only the owning restaurant can mark a listing as completed".to_string(),
					));
				}
				if listing.status != ListingStatus::Claimed {
					return Err(CoreError::InvalidState(
						"listing must be claimed first".to_string(),
					));
				}
				listing.status = ListingStatus::Completed;
			}
			ListingStatus::Available => {
				return Err(CoreError::InvalidArgument(
					"invalid status update".to_string(),
				));
			}
		}

		let now = now_secs();
		listing.updated_at = now;
		self.persist_listing(&listing, now).await?;
		Ok(listing)
	}

	/// Deletes one of the caller's listings.
	pub async fn delete_listing(&self, caller: &Party, listing_id: &str) -> Result<(), CoreError> {
		if caller.role != PartyRole::Restaurant {
			return Err(CoreError::Forbidden(
				"only restaurants can delete listings".to_string(),
			));
		}

		// Ownership check before the delete; a foreign id reads as absent
		self.load_owned_listing(caller, listing_id).await?;
		self.storage
			.remove(StorageKey::Listings.as_str(), listing_id)
			.await?;
		Ok(())
	}

	/// Marks every listing in the slice claimed by the given NGO.
	pub(crate) async fn claim_listings(
		&self,
		listings: &[Listing],
		ngo_id: &str,
	) -> Result<(), CoreError> {
		let now = now_secs();
		let writes = listings.iter().map(|listing| {
			let mut claimed = listing.clone();
			claimed.status = ListingStatus::Claimed;
			claimed.claimed_by = Some(ngo_id.to_string());
			claimed.updated_at = now;
			async move { self.persist_listing(&claimed, now).await }
		});

		for result in join_all(writes).await {
			result?;
		}
		Ok(())
	}

	/// Releases every listing in an order's snapshot back to available.
	///
	/// Listings that aged out of storage in the meantime are skipped. A
	/// failed write does not roll back the writes that already happened;
	/// the error is surfaced after the whole batch was attempted.
	pub(crate) async fn release_listings(&self, order: &Order) -> Result<(), CoreError> {
		let now = now_secs();
		let writes = order.listings.iter().map(|snapshot| async move {
			let mut listing: Listing = match self
				.storage
				.retrieve(StorageKey::Listings.as_str(), &snapshot.id)
				.await
			{
				Ok(listing) => listing,
				Err(StorageError::NotFound) => return Ok(()),
				Err(err) => return Err(CoreError::Storage(err.to_string())),
			};

			listing.status = ListingStatus::Available;
			listing.claimed_by = None;
			listing.updated_at = now;
			self.persist_listing(&listing, now).await
		});

		let mut first_error = None;
		for result in join_all(writes).await {
			if let Err(err) = result {
				tracing::warn!(order_id = %order.id, error = %err, "Failed to release listing");
				first_error.get_or_insert(err);
			}
		}
		match first_error {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}

	/// Writes a listing back, preserving its remaining expiry window.
	async fn persist_listing(&self, listing: &Listing, now: u64) -> Result<(), CoreError> {
		let Some(ttl) = remaining_ttl(listing, now) else {
			return Err(CoreError::NotFound("listing has expired".to_string()));
		};
		self.storage
			.update_with_ttl(StorageKey::Listings.as_str(), &listing.id, listing, Some(ttl))
			.await
			.map_err(|err| match err {
				StorageError::NotFound => CoreError::NotFound("listing not found".to_string()),
				other => CoreError::Storage(other.to_string()),
			})
	}

	/// Loads a listing and checks it belongs to the caller.
	async fn load_owned_listing(
		&self,
		caller: &Party,
		listing_id: &str,
	) -> Result<Listing, CoreError> {
		let listing: Listing = self
			.storage
			.retrieve(StorageKey::Listings.as_str(), listing_id)
			.await
			.map_err(|err| match err {
				StorageError::NotFound => CoreError::NotFound(
					"listing not found or not owned by caller".to_string(),
				),
				other => CoreError::Storage(other.to_string()),
			})?;

		if listing.restaurant_id != caller.id {
			return Err(CoreError::NotFound(
				"listing not found or not owned by caller".to_string(),
			));
		}
		Ok(listing)
	}
}
