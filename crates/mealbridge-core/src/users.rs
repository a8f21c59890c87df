//! User account persistence.
//!
//! The core stores accounts and enforces uniqueness; credential hashing and
//! token issuance live behind the auth boundary, so this module only ever
//! sees finished password digests.

use crate::{now_secs, CoreError, Marketplace};
use mealbridge_types::{PartyRole, StorageKey, User};
use uuid::Uuid;

impl Marketplace {
	/// Registers a new account with an already-hashed credential.
	pub async fn register_user(
		&self,
		username: String,
		email: String,
		password_digest: String,
		role: PartyRole,
	) -> Result<User, CoreError> {
		let users: Vec<User> = self.storage.query(StorageKey::Users.as_str()).await?;
		if users.iter().any(|user| user.email == email) {
			return Err(CoreError::Conflict("email already in use".to_string()));
		}
		if users.iter().any(|user| user.username == username) {
			return Err(CoreError::Conflict("username already in use".to_string()));
		}

		let now = now_secs();
		let user = User {
			id: Uuid::new_v4().to_string(),
			username,
			email,
			password_digest,
			role,
			created_at: now,
			updated_at: now,
		};
		self.storage
			.store(StorageKey::Users.as_str(), &user.id, &user)
			.await?;

		tracing::info!(user_id = %user.id, role = %user.role, "User registered");
		Ok(user)
	}

	/// Looks an account up by login email.
	pub async fn user_by_email(&self, email: &str) -> Result<User, CoreError> {
		let users: Vec<User> = self.storage.query(StorageKey::Users.as_str()).await?;
		users
			.into_iter()
			.find(|user| user.email == email)
			.ok_or_else(|| CoreError::NotFound("email not registered".to_string()))
	}
}
