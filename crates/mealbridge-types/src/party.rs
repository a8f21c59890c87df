//! Party, role and user types for the marketplace.
//!
//! A party is one side of an order: the restaurant donating surplus food or
//! the NGO receiving it. Users are the registered accounts behind parties.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of a marketplace account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyRole {
	/// A restaurant donating surplus food.
	Restaurant,
	/// An NGO or charity receiving donations.
	Ngo,
}

impl fmt::Display for PartyRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PartyRole::Restaurant => write!(f, "restaurant"),
			PartyRole::Ngo => write!(f, "ngo"),
		}
	}
}

impl std::str::FromStr for PartyRole {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"restaurant" => Ok(PartyRole::Restaurant),
			"ngo" => Ok(PartyRole::Ngo),
			_ => Err(()),
		}
	}
}

/// A verified authenticated principal.
///
/// Produced by token verification and threaded explicitly into every core
/// entry point, keeping transition logic free of transport concerns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
	/// Account id of the caller.
	pub id: String,
	/// Declared role of the caller, verified at the auth boundary.
	pub role: PartyRole,
}

impl Party {
	/// Creates a new verified principal.
	pub fn new(id: impl Into<String>, role: PartyRole) -> Self {
		Self {
			id: id.into(),
			role,
		}
	}
}

/// A registered marketplace account as persisted in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
	/// Unique identifier for this account.
	pub id: String,
	/// Display name, unique across accounts.
	pub username: String,
	/// Login email, unique across accounts.
	pub email: String,
	/// Salted password digest. Never exposed through the API.
	pub password_digest: String,
	/// Whether this account acts as a restaurant or an NGO.
	pub role: PartyRole,
	/// Timestamp when this account was created.
	pub created_at: u64,
	/// Timestamp when this account was last updated.
	pub updated_at: u64,
}

/// Public view of a user, safe to return from API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
	pub id: String,
	pub username: String,
	pub email: String,
	pub role: PartyRole,
}

impl From<&User> for UserProfile {
	fn from(user: &User) -> Self {
		Self {
			id: user.id.clone(),
			username: user.username.clone(),
			email: user.email.clone(),
			role: user.role,
		}
	}
}
