//! Storage-related types for the marketplace.

use std::str::FromStr;

/// Storage keys for the different data collections.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
	/// Key for storing user accounts
	Users,
	/// Key for storing listings
	Listings,
	/// Key for storing orders
	Orders,
	/// Key for storing chat messages
	Messages,
}

impl StorageKey {
	/// Returns the string representation of the storage key.
	pub fn as_str(&self) -> &'static str {
		match self {
			StorageKey::Users => "users",
			StorageKey::Listings => "listings",
			StorageKey::Orders => "orders",
			StorageKey::Messages => "messages",
		}
	}

	/// Returns an iterator over all StorageKey variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Users, Self::Listings, Self::Orders, Self::Messages].into_iter()
	}
}

impl FromStr for StorageKey {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"users" => Ok(Self::Users),
			"listings" => Ok(Self::Listings),
			"orders" => Ok(Self::Orders),
			"messages" => Ok(Self::Messages),
			_ => Err(()),
		}
	}
}

impl From<StorageKey> for &'static str {
	fn from(key: StorageKey) -> Self {
		key.as_str()
	}
}
