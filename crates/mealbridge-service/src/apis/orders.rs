//! Order endpoints: creation, per-party listings and the single update
//! entry point driving the status-transition protocol.

use crate::server::{authenticate, require_role, AppState};
use axum::{
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::Json,
};
use mealbridge_types::{ApiError, CreateOrderRequest, Order, PartyRole, UpdateOrderRequest};
use validator::Validate;

/// Handles POST /api/orders requests.
pub async fn create(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
	let party = authenticate(&state, &headers)?;
	require_role(&party, PartyRole::Ngo)?;
	request.validate()?;

	let order = state
		.market
		.create_order(&party, &request.listing_ids)
		.await?;
	Ok((StatusCode::CREATED, Json(order)))
}

/// Handles GET /api/orders/restaurant requests.
pub async fn for_restaurant(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
	let party = authenticate(&state, &headers)?;
	require_role(&party, PartyRole::Restaurant)?;

	let orders = state.market.orders_for_party(&party).await?;
	Ok(Json(orders))
}

/// Handles GET /api/orders/ngo requests.
pub async fn for_ngo(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<Order>>, ApiError> {
	let party = authenticate(&state, &headers)?;
	require_role(&party, PartyRole::Ngo)?;

	let orders = state.market.orders_for_party(&party).await?;
	Ok(Json(orders))
}

/// Handles GET /api/orders/{id} requests.
pub async fn get_by_id(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
) -> Result<Json<Order>, ApiError> {
	let party = authenticate(&state, &headers)?;
	let order = state.market.get_order(&party, &id).await?;
	Ok(Json(order))
}

/// Handles PATCH /api/orders/{id} requests.
///
/// The patch payload converts into exactly one lifecycle command (status
/// change, confirmation or review) which the core dispatches against the
/// order's current state.
pub async fn update(
	State(state): State<AppState>,
	Path(id): Path<String>,
	headers: HeaderMap,
	Json(request): Json<UpdateOrderRequest>,
) -> Result<Json<Order>, ApiError> {
	let party = authenticate(&state, &headers)?;
	request.validate()?;
	let command = request.into_command()?;

	match state.market.update_order(&party, &id, command).await {
		Ok(order) => Ok(Json(order)),
		Err(err) => {
			tracing::warn!(order_id = %id, error = %err, "Order update rejected");
			Err(err.into())
		}
	}
}
