//! Listing endpoints: browse, create, manage and status patches.

use crate::server::{authenticate, require_role, AppState};
use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use mealbridge_types::{
	ApiError, AvailableListing, CreateListingRequest, Listing, PartyRole, PatchListingRequest,
	UpdateListingRequest,
};
use validator::Validate;

/// Handles GET /api/listings requests.
///
/// Public: NGOs browse what is currently available, annotated with each
/// restaurant's average rating.
pub async fn browse(
	State(state): State<AppState>,
) -> Result<Json<Vec<AvailableListing>>, ApiError> {
	let listings = state.market.available_listings().await?;
	Ok(Json(listings))
}

/// Handles POST /api/listings requests.
pub async fn create(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<Listing>), ApiError> {
	let party = authenticate(&state, &headers)?;
	require_role(&party, PartyRole::Restaurant)?;
	request.validate()?;

	let listing = state.market.create_listing(&party, request).await?;
	Ok((StatusCode::CREATED, Json(listing)))
}

/// Handles GET /api/listings/restaurant requests.
pub async fn own(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<Listing>>, ApiError> {
	let party = authenticate(&state, &headers)?;
	require_role(&party, PartyRole::Restaurant)?;

	let listings = state.market.listings_for_restaurant(&party).await?;
	Ok(Json(listings))
}

/// Handles PUT /api/listings/{id} requests.
pub async fn update(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
	Json(request): Json<UpdateListingRequest>,
) -> Result<Json<Listing>, ApiError> {
	let party = authenticate(&state, &headers)?;
	require_role(&party, PartyRole::Restaurant)?;
	request.validate()?;

	let listing = state.market.update_listing(&party, &id, request).await?;
	Ok(Json(listing))
}

/// Handles PATCH /api/listings/{id} requests.
///
/// The one direct status entry point: an NGO claims an available listing,
/// or the owning restaurant marks a claimed one completed.
pub async fn patch_status(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
	Json(request): Json<PatchListingRequest>,
) -> Result<Json<Listing>, ApiError> {
	let party = authenticate(&state, &headers)?;

	let listing = state
		.market
		.patch_listing_status(&party, &id, request.status)
		.await?;
	Ok(Json(listing))
}

/// Handles DELETE /api/listings/{id} requests.
pub async fn delete(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
	let party = authenticate(&state, &headers)?;
	require_role(&party, PartyRole::Restaurant)?;

	state.market.delete_listing(&party, &id).await?;
	Ok(Json(serde_json::json!({
		"message": "Listing deleted successfully"
	})))
}
