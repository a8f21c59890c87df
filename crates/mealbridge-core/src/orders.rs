//! Order creation and retrieval.
//!
//! Creation snapshots the chosen listings into the new order and claims
//! them atomically with respect to other creations: the claim section runs
//! under a single lock so two NGOs racing for the same listing cannot both
//! win it.

use crate::{now_secs, CoreError, Marketplace};
use mealbridge_storage::StorageError;
use mealbridge_types::{
	Listing, ListingSnapshot, ListingStatus, Order, OrderStatus, Party, PartyRole, StorageKey,
};
use uuid::Uuid;

impl Marketplace {
	/// Creates a new order over a set of listings.
	///
	/// Listings that no longer exist or are no longer available are dropped
	/// from the selection; an order is created over the remainder, which
	/// must all belong to one restaurant. Every snapshotted listing is
	/// marked claimed by the calling NGO.
	pub async fn create_order(
		&self,
		caller: &Party,
		listing_ids: &[String],
	) -> Result<Order, CoreError> {
		if caller.role != PartyRole::Ngo {
			return Err(CoreError::Forbidden(
				"only NGOs can create orders".to_string(),
			));
		}
		if listing_ids.is_empty() {
			return Err(CoreError::InvalidArgument("no listings provided".to_string()));
		}

		// Serialize claims: without this, two concurrent orders could both
		// observe the same listing as available and both claim it.
		let _guard = self.claim_lock.lock().await;

		let mut listings: Vec<Listing> = Vec::new();
		for id in listing_ids {
			match self
				.storage
				.retrieve::<Listing>(StorageKey::Listings.as_str(), id)
				.await
			{
				Ok(listing) if listing.status == ListingStatus::Available => {
					listings.push(listing)
				}
				Ok(_) => {}
				Err(StorageError::NotFound) => {}
				Err(err) => return Err(err.into()),
			}
		}

		if listings.is_empty() {
			return Err(CoreError::NotFound(
				"no available listings found with the provided ids".to_string(),
			));
		}

		let restaurant_id = listings[0].restaurant_id.clone();
		if listings
			.iter()
			.any(|listing| listing.restaurant_id != restaurant_id)
		{
			return Err(CoreError::InvalidArgument(
				"all listings must be from the same restaurant".to_string(),
			));
		}

		let now = now_secs();
		let order = Order {
			id: Uuid::new_v4().to_string(),
			restaurant_id,
			ngo_id: caller.id.clone(),
			listings: listings.iter().map(ListingSnapshot::from).collect(),
			status: OrderStatus::Requested,
			pending_status: None,
			rest_review: None,
			ngo_review: None,
			rest_stars: None,
			ngo_stars: None,
			created_at: now,
			updated_at: now,
		};

		self.claim_listings(&listings, &caller.id).await?;
		self.storage
			.store(StorageKey::Orders.as_str(), &order.id, &order)
			.await?;

		tracing::info!(
			order_id = %order.id,
			restaurant_id = %order.restaurant_id,
			ngo_id = %order.ngo_id,
			listings = order.listings.len(),
			"Order created"
		);

		Ok(order)
	}

	/// Returns the caller's orders, newest first.
	///
	/// Restaurants see the orders addressed to them, NGOs the orders they
	/// created.
	pub async fn orders_for_party(&self, caller: &Party) -> Result<Vec<Order>, CoreError> {
		let mut orders: Vec<Order> = self.storage.query(StorageKey::Orders.as_str()).await?;
		orders.retain(|order| match caller.role {
			PartyRole::Restaurant => order.restaurant_id == caller.id,
			PartyRole::Ngo => order.ngo_id == caller.id,
		});
		orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(orders)
	}

	/// Returns one order, to its parties only.
	pub async fn get_order(&self, caller: &Party, order_id: &str) -> Result<Order, CoreError> {
		let order = self.load_order(order_id).await?;
		Self::require_party(&order, caller)?;
		Ok(order)
	}
}
