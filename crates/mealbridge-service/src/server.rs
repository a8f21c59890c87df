//! HTTP server for the mealbridge API.
//!
//! This module provides the HTTP server infrastructure: shared application
//! state, routing and the bearer-token authentication helper handlers use
//! to obtain the verified principal.

use crate::apis;
use axum::{
	http::{header, HeaderMap},
	routing::{get, post, put},
	Router,
};
use mealbridge_auth::AuthService;
use mealbridge_config::ApiConfig;
use mealbridge_core::Marketplace;
use mealbridge_types::{ApiError, Party, PartyRole};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// The marketplace engine handling all domain operations.
	pub market: Arc<Marketplace>,
	/// Token issuance and verification.
	pub auth: Arc<AuthService>,
}

/// Builds the application router over the given state.
pub fn router(state: AppState) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/auth/register", post(apis::auth::register))
				.route("/auth/login", post(apis::auth::login))
				.route(
					"/listings",
					get(apis::listings::browse).post(apis::listings::create),
				)
				.route("/listings/restaurant", get(apis::listings::own))
				.route(
					"/listings/{id}",
					put(apis::listings::update)
						.patch(apis::listings::patch_status)
						.delete(apis::listings::delete),
				)
				.route("/orders", post(apis::orders::create))
				.route("/orders/restaurant", get(apis::orders::for_restaurant))
				.route("/orders/ngo", get(apis::orders::for_ngo))
				.route(
					"/orders/analytics/restaurant",
					get(apis::analytics::restaurant),
				)
				.route("/orders/analytics/ngo", get(apis::analytics::ngo))
				.route(
					"/orders/{id}",
					get(apis::orders::get_by_id).patch(apis::orders::update),
				)
				.route("/chat/send", post(apis::chat::send))
				.route("/chat/{order_id}", get(apis::chat::list)),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(CorsLayer::permissive()),
		)
		.with_state(state)
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	state: AppState,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = router(state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("mealbridge API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Extracts and verifies the bearer token, yielding the caller's principal.
pub(crate) fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Party, ApiError> {
	let header = headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.ok_or_else(|| ApiError::unauthorized("no token, authorization denied"))?;

	let token = header
		.strip_prefix("Bearer ")
		.ok_or_else(|| ApiError::unauthorized("no token, authorization denied"))?;

	Ok(state.auth.verify_token(token)?)
}

/// Restricts an endpoint to one role.
pub(crate) fn require_role(party: &Party, role: PartyRole) -> Result<(), ApiError> {
	if party.role != role {
		return Err(ApiError::forbidden(format!(
			"this endpoint is only available to {} accounts",
			role
		)));
	}
	Ok(())
}
