//! Authentication module for the mealbridge marketplace.
//!
//! This module provides credential hashing and bearer-token issuance and
//! verification. Tokens carry the account id, its role and an expiry
//! timestamp, authenticated by a keyed SHA3-256 digest over a configured
//! secret. Verification produces the `Party` principal that is threaded
//! into every core entry point.

use mealbridge_types::{Party, PartyRole};
use sha3::{Digest, Sha3_256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
	/// Error that occurs when a token is malformed or its signature is wrong.
	#[error("Invalid token")]
	InvalidToken,
	/// Error that occurs when a token is past its expiry timestamp.
	#[error("Token expired")]
	TokenExpired,
	/// Error that occurs when credentials do not match a stored digest.
	#[error("Invalid credentials")]
	InvalidCredentials,
}

impl From<AuthError> for mealbridge_types::ApiError {
	fn from(err: AuthError) -> Self {
		mealbridge_types::ApiError::unauthorized(err.to_string())
	}
}

/// Returns the current unix time in seconds.
fn now_secs() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.unwrap_or_default()
		.as_secs()
}

/// Compares two byte strings without short-circuiting on the first mismatch.
fn digests_match(a: &str, b: &str) -> bool {
	if a.len() != b.len() {
		return false;
	}
	a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Service that issues and verifies tokens and password digests.
///
/// This struct is the trust boundary between transport and core: a verified
/// token becomes a `Party`, and nothing past this point inspects headers.
pub struct AuthService {
	/// Secret the token signatures are keyed on.
	secret: String,
	/// Lifetime of issued tokens.
	token_ttl: Duration,
}

impl AuthService {
	/// Creates a new AuthService with the given secret and token lifetime.
	pub fn new(secret: impl Into<String>, token_ttl: Duration) -> Self {
		Self {
			secret: secret.into(),
			token_ttl,
		}
	}

	/// Hashes a password with a fresh random salt.
	///
	/// The digest is stored as `salt$hex(sha3_256(salt || password))`.
	pub fn hash_password(&self, password: &str) -> String {
		let salt = uuid::Uuid::new_v4().simple().to_string();
		let digest = Self::digest_password(&salt, password);
		format!("{}${}", salt, digest)
	}

	/// Verifies a password against a stored digest.
	pub fn verify_password(&self, password: &str, stored: &str) -> Result<(), AuthError> {
		let (salt, digest) = stored.split_once('$').ok_or(AuthError::InvalidCredentials)?;
		if digests_match(&Self::digest_password(salt, password), digest) {
			Ok(())
		} else {
			Err(AuthError::InvalidCredentials)
		}
	}

	fn digest_password(salt: &str, password: &str) -> String {
		let mut hasher = Sha3_256::new();
		hasher.update(salt.as_bytes());
		hasher.update(password.as_bytes());
		hex::encode(hasher.finalize())
	}

	/// Issues a signed bearer token for the given principal.
	///
	/// Token layout: `{id}:{role}:{expiry}.{signature}` where the signature
	/// is a keyed SHA3-256 digest over the payload.
	pub fn issue_token(&self, party: &Party) -> String {
		let expires_at = now_secs().saturating_add(self.token_ttl.as_secs());
		let payload = format!("{}:{}:{}", party.id, party.role, expires_at);
		let signature = self.sign(&payload);
		format!("{}.{}", payload, signature)
	}

	/// Verifies a bearer token and extracts the principal it names.
	pub fn verify_token(&self, token: &str) -> Result<Party, AuthError> {
		let (payload, signature) = token.rsplit_once('.').ok_or(AuthError::InvalidToken)?;

		if !digests_match(&self.sign(payload), signature) {
			return Err(AuthError::InvalidToken);
		}

		let mut parts = payload.splitn(3, ':');
		let id = parts.next().ok_or(AuthError::InvalidToken)?;
		let role: PartyRole = parts
			.next()
			.ok_or(AuthError::InvalidToken)?
			.parse()
			.map_err(|_| AuthError::InvalidToken)?;
		let expires_at: u64 = parts
			.next()
			.ok_or(AuthError::InvalidToken)?
			.parse()
			.map_err(|_| AuthError::InvalidToken)?;

		if now_secs() >= expires_at {
			return Err(AuthError::TokenExpired);
		}

		Ok(Party::new(id, role))
	}

	fn sign(&self, payload: &str) -> String {
		let mut hasher = Sha3_256::new();
		hasher.update(self.secret.as_bytes());
		hasher.update(b":");
		hasher.update(payload.as_bytes());
		hex::encode(hasher.finalize())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn service() -> AuthService {
		AuthService::new("unit-test-secret-value", Duration::from_secs(3600))
	}

	#[test]
	fn token_roundtrip() {
		let auth = service();
		let party = Party::new("ngo-1", PartyRole::Ngo);

		let token = auth.issue_token(&party);
		let verified = auth.verify_token(&token).unwrap();

		assert_eq!(verified, party);
	}

	#[test]
	fn tampered_token_is_rejected() {
		let auth = service();
		let token = auth.issue_token(&Party::new("ngo-1", PartyRole::Ngo));

		// Promote the role inside the payload without re-signing
		let forged = token.replace(":ngo:", ":restaurant:");
		assert!(matches!(
			auth.verify_token(&forged),
			Err(AuthError::InvalidToken)
		));
	}

	#[test]
	fn token_from_other_secret_is_rejected() {
		let auth = service();
		let other = AuthService::new("a-different-secret!!", Duration::from_secs(3600));
		let token = other.issue_token(&Party::new("rest-1", PartyRole::Restaurant));

		assert!(matches!(
			auth.verify_token(&token),
			Err(AuthError::InvalidToken)
		));
	}

	#[test]
	fn expired_token_is_rejected() {
		let auth = AuthService::new("unit-test-secret-value", Duration::ZERO);
		let token = auth.issue_token(&Party::new("ngo-1", PartyRole::Ngo));

		assert!(matches!(
			auth.verify_token(&token),
			Err(AuthError::TokenExpired)
		));
	}

	#[test]
	fn garbage_tokens_are_rejected() {
		let auth = service();
		assert!(auth.verify_token("").is_err());
		assert!(auth.verify_token("no-dot-here").is_err());
		assert!(auth.verify_token("a:b.c").is_err());
	}

	#[test]
	fn password_digest_roundtrip() {
		let auth = service();
		let stored = auth.hash_password("correct horse battery");

		assert!(auth.verify_password("correct horse battery", &stored).is_ok());
		assert!(matches!(
			auth.verify_password("wrong password", &stored),
			Err(AuthError::InvalidCredentials)
		));
	}

	#[test]
	fn password_salts_are_unique() {
		let auth = service();
		let first = auth.hash_password("same password");
		let second = auth.hash_password("same password");

		assert_ne!(first, second);
		assert!(auth.verify_password("same password", &first).is_ok());
		assert!(auth.verify_password("same password", &second).is_ok());
	}
}
