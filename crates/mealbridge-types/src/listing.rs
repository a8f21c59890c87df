//! Surplus-food listing types.
//!
//! A listing is a restaurant's offer of surplus food with a quantity, a unit
//! of measurement and an expiry window in hours. Listings move between
//! availability states as orders claim and release them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Minimum expiry window for a listing, in hours.
pub const MIN_EXPIRY_HOURS: u8 = 1;
/// Maximum expiry window for a listing, in hours.
pub const MAX_EXPIRY_HOURS: u8 = 4;

/// Unit of measurement for a listed quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Measurement {
	Kg,
	G,
	Ml,
	L,
	Units,
	Custom,
}

/// Availability state of a listing.
///
/// `Available` listings can be ordered; order creation moves them to
/// `Claimed` and a declined order releases them back. `Completed` is only
/// ever set through the explicit listing status update, never by the order
/// lifecycle itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
	Available,
	Claimed,
	Completed,
}

impl fmt::Display for ListingStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ListingStatus::Available => write!(f, "available"),
			ListingStatus::Claimed => write!(f, "claimed"),
			ListingStatus::Completed => write!(f, "completed"),
		}
	}
}

/// A surplus-food listing as persisted in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
	/// Unique identifier for this listing.
	pub id: String,
	/// Account id of the restaurant that created the listing.
	pub restaurant_id: String,
	/// Short description of the food on offer.
	pub name: String,
	/// Free-form amount, e.g. "12" or "2 trays".
	pub quantity: String,
	/// Unit the quantity is expressed in.
	pub measurement: Measurement,
	/// Hours until the food expires (1-4).
	pub expiry: u8,
	/// Current availability state.
	pub status: ListingStatus,
	/// NGO that claimed this listing, while claimed.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub claimed_by: Option<String>,
	/// Timestamp when the food expires and the listing ages out of storage.
	pub expires_at: u64,
	/// Timestamp when this listing was created.
	pub created_at: u64,
	/// Timestamp when this listing was last updated.
	pub updated_at: u64,
}

/// Immutable snapshot of a listing captured into an order at creation time.
///
/// Decoupled from live listing mutations: later edits or deletion of the
/// listing do not affect orders already referencing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSnapshot {
	/// Id of the listing the snapshot was taken from.
	pub id: String,
	pub name: String,
	pub quantity: String,
	pub measurement: Measurement,
	pub expiry: u8,
	/// Creation time of the original listing.
	pub created_at: u64,
}

impl From<&Listing> for ListingSnapshot {
	fn from(listing: &Listing) -> Self {
		Self {
			id: listing.id.clone(),
			name: listing.name.clone(),
			quantity: listing.quantity.clone(),
			measurement: listing.measurement,
			expiry: listing.expiry,
			created_at: listing.created_at,
		}
	}
}
