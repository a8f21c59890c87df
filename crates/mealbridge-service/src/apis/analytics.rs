//! Dashboard analytics endpoints.

use crate::server::{authenticate, require_role, AppState};
use axum::{extract::State, http::HeaderMap, response::Json};
use mealbridge_types::{AnalyticsReport, ApiError, PartyRole};

/// Handles GET /api/orders/analytics/restaurant requests.
pub async fn restaurant(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<AnalyticsReport>, ApiError> {
	let party = authenticate(&state, &headers)?;
	require_role(&party, PartyRole::Restaurant)?;

	let report = state.market.analytics_for(&party).await?;
	Ok(Json(report))
}

/// Handles GET /api/orders/analytics/ngo requests.
pub async fn ngo(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<AnalyticsReport>, ApiError> {
	let party = authenticate(&state, &headers)?;
	require_role(&party, PartyRole::Ngo)?;

	let report = state.market.analytics_for(&party).await?;
	Ok(Json(report))
}
