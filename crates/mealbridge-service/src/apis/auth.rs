//! Registration and login endpoints.
//!
//! These are the only endpoints that see raw credentials; everything else
//! works from the bearer token issued here.

use crate::server::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use mealbridge_core::CoreError;
use mealbridge_types::{
	ApiError, LoginRequest, LoginResponse, Party, RegisterRequest, RegisterResponse, UserProfile,
};
use validator::Validate;

/// Handles POST /api/auth/register requests.
pub async fn register(
	State(state): State<AppState>,
	Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
	request.validate()?;

	let digest = state.auth.hash_password(&request.password);
	let user = state
		.market
		.register_user(request.username, request.email, digest, request.role)
		.await
		.map_err(ApiError::from)?;

	Ok((
		StatusCode::CREATED,
		Json(RegisterResponse {
			user: UserProfile::from(&user),
		}),
	))
}

/// Handles POST /api/auth/login requests.
///
/// Both an unknown email and a wrong password come back as 401; neither
/// reveals which of the two was wrong beyond what the original flow did.
pub async fn login(
	State(state): State<AppState>,
	Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
	request.validate()?;

	let user = state
		.market
		.user_by_email(&request.email)
		.await
		.map_err(|err| match err {
			CoreError::NotFound(_) => ApiError::unauthorized("email not registered"),
			other => other.into(),
		})?;

	state
		.auth
		.verify_password(&request.password, &user.password_digest)
		.map_err(|_| ApiError::unauthorized("invalid password"))?;

	let token = state.auth.issue_token(&Party::new(user.id.clone(), user.role));

	Ok(Json(LoginResponse {
		token,
		user: UserProfile::from(&user),
	}))
}
