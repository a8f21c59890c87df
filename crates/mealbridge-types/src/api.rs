//! API types for the mealbridge HTTP API.
//!
//! This module defines the request and response types for the marketplace
//! endpoints, along with the structured API error type mapped onto HTTP
//! status codes.

use crate::{
	Confirmation, Listing, Measurement, OrderCommand, OrderStatus, PartyRole, ProposedStatus,
	UserProfile,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
	/// Missing or invalid caller identity (401)
	Unauthorized { message: String },
	/// Caller authenticated but not permitted to act (403)
	Forbidden { message: String },
	/// Requested entity does not exist (404)
	NotFound { message: String },
	/// Malformed payload or transition not valid from the current state (400)
	BadRequest { message: String },
	/// Uniqueness violation, e.g. an email already in use (409)
	Conflict { message: String },
	/// Internal server error (500)
	Internal { message: String },
}

impl ApiError {
	pub fn unauthorized(message: impl Into<String>) -> Self {
		ApiError::Unauthorized {
			message: message.into(),
		}
	}

	pub fn forbidden(message: impl Into<String>) -> Self {
		ApiError::Forbidden {
			message: message.into(),
		}
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		ApiError::NotFound {
			message: message.into(),
		}
	}

	pub fn bad_request(message: impl Into<String>) -> Self {
		ApiError::BadRequest {
			message: message.into(),
		}
	}

	pub fn conflict(message: impl Into<String>) -> Self {
		ApiError::Conflict {
			message: message.into(),
		}
	}

	pub fn internal(message: impl Into<String>) -> Self {
		ApiError::Internal {
			message: message.into(),
		}
	}

	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::Unauthorized { .. } => 401,
			ApiError::Forbidden { .. } => 403,
			ApiError::NotFound { .. } => 404,
			ApiError::BadRequest { .. } => 400,
			ApiError::Conflict { .. } => 409,
			ApiError::Internal { .. } => 500,
		}
	}

	/// Machine-meaningful error code for the response body.
	pub fn error_code(&self) -> &'static str {
		match self {
			ApiError::Unauthorized { .. } => "UNAUTHORIZED",
			ApiError::Forbidden { .. } => "FORBIDDEN",
			ApiError::NotFound { .. } => "NOT_FOUND",
			ApiError::BadRequest { .. } => "BAD_REQUEST",
			ApiError::Conflict { .. } => "CONFLICT",
			ApiError::Internal { .. } => "INTERNAL_ERROR",
		}
	}

	fn message(&self) -> &str {
		match self {
			ApiError::Unauthorized { message }
			| ApiError::Forbidden { message }
			| ApiError::NotFound { message }
			| ApiError::BadRequest { message }
			| ApiError::Conflict { message }
			| ApiError::Internal { message } => message,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		ErrorResponse {
			error: self.error_code().to_string(),
			message: self.message().to_string(),
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}: {}", self.error_code(), self.message())
	}
}

impl std::error::Error for ApiError {}

impl From<validator::ValidationErrors> for ApiError {
	fn from(errors: validator::ValidationErrors) -> Self {
		ApiError::bad_request(errors.to_string())
	}
}

impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
		(status, Json(self.to_error_response())).into_response()
	}
}

/// Request to register a new account.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
	#[validate(length(min = 3, max = 64))]
	pub username: String,
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 8, max = 128))]
	pub password: String,
	pub role: PartyRole,
}

/// Response to a successful registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
	pub user: UserProfile,
}

/// Request to log in.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 1))]
	pub password: String,
}

/// Response to a successful login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
	/// Signed bearer token for subsequent requests.
	pub token: String,
	pub user: UserProfile,
}

/// Request to create a new listing.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
	#[validate(length(min = 1, max = 128))]
	pub name: String,
	#[validate(length(min = 1, max = 64))]
	pub quantity: String,
	pub measurement: Measurement,
	#[validate(range(min = 1, max = 4))]
	pub expiry: u8,
}

/// Request to replace the mutable fields of a listing.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
	#[validate(length(min = 1, max = 128))]
	pub name: String,
	#[validate(length(min = 1, max = 64))]
	pub quantity: String,
	pub measurement: Measurement,
	#[validate(range(min = 1, max = 4))]
	pub expiry: u8,
}

/// Request to change a listing's availability state directly.
#[derive(Debug, Clone, Deserialize)]
pub struct PatchListingRequest {
	pub status: crate::ListingStatus,
}

/// An available listing annotated with its restaurant's average rating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailableListing {
	#[serde(flatten)]
	pub listing: Listing,
	/// Average stars received by the owning restaurant across its orders.
	#[serde(rename = "avgRestaurantStars", skip_serializing_if = "Option::is_none")]
	pub avg_restaurant_stars: Option<f64>,
}

/// Request to create an order over a set of listings.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
	#[validate(length(min = 1))]
	pub listing_ids: Vec<String>,
}

/// A status change requested through the order update endpoint.
///
/// `requested` is the creation-only state and is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusChange {
	Accepted,
	Declined,
	Fulfilled,
	Cancelled,
}

/// Patch payload for the single order update entry point.
///
/// Exactly one operation must be named: a status change, a confirmation of a
/// pending proposal, or a review with its star rating.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOrderRequest {
	pub status: Option<StatusChange>,
	pub confirm: Option<Confirmation>,
	#[validate(length(min = 1, max = 2000))]
	pub review: Option<String>,
	#[validate(range(min = 1, max = 5))]
	pub stars: Option<u8>,
}

impl UpdateOrderRequest {
	/// Converts the patch payload into a single order command.
	///
	/// Payloads naming no operation, or more than one, are rejected.
	pub fn into_command(self) -> Result<OrderCommand, ApiError> {
		let named = [
			self.status.is_some(),
			self.confirm.is_some(),
			self.review.is_some() || self.stars.is_some(),
		]
		.iter()
		.filter(|set| **set)
		.count();

		if named == 0 {
			return Err(ApiError::bad_request("no update operation provided"));
		}
		if named > 1 {
			return Err(ApiError::bad_request(
				"request must carry exactly one of status, confirm or review",
			));
		}

		if let Some(status) = self.status {
			return Ok(match status {
				StatusChange::Accepted => OrderCommand::Accept,
				StatusChange::Declined => OrderCommand::Decline,
				StatusChange::Fulfilled => OrderCommand::Propose(ProposedStatus::Fulfilled),
				StatusChange::Cancelled => OrderCommand::Propose(ProposedStatus::Cancelled),
			});
		}

		if let Some(confirm) = self.confirm {
			return Ok(OrderCommand::Confirm(confirm));
		}

		match (self.review, self.stars) {
			(Some(text), Some(stars)) => Ok(OrderCommand::Review { text, stars }),
			_ => Err(ApiError::bad_request(
				"a review requires both review text and stars",
			)),
		}
	}
}

/// Request to send a chat message on an order.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
	pub order_id: String,
	#[validate(length(min = 1, max = 4000))]
	pub text: String,
}

/// Response to a sent chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreated {
	pub id: String,
}

/// Query parameters for listing chat messages.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMessagesQuery {
	pub limit: Option<usize>,
}

/// Number of orders per status, for dashboards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusCount {
	pub status: OrderStatus,
	pub count: u64,
}

/// Review fields collected from a fulfilled order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewEntry {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rest_review: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ngo_review: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rest_stars: Option<u8>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ngo_stars: Option<u8>,
}

/// Fulfilled/cancelled tallies for one counterparty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterpartyStats {
	pub party_id: String,
	pub fulfilled_count: u64,
	pub cancelled_count: u64,
}

/// Dashboard aggregation over a party's orders.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
	/// Order counts per status.
	pub stats: Vec<StatusCount>,
	/// Reviews collected from this party's orders.
	pub reviews: Vec<ReviewEntry>,
	/// Average stars received by this party, if any rating exists.
	pub avg_stars: Option<f64>,
	/// Per-counterparty fulfilled/cancelled tallies.
	pub counterparties: Vec<CounterpartyStats>,
}
