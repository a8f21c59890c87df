//! Per-order chat endpoints.
//!
//! Plain request/response persistence; clients poll the thread.

use crate::server::{authenticate, AppState};
use axum::{
	extract::{Path, Query, State},
	http::HeaderMap,
	response::Json,
};
use mealbridge_types::{ApiError, ListMessagesQuery, Message, MessageCreated, SendMessageRequest};
use validator::Validate;

/// Handles POST /api/chat/send requests.
pub async fn send(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<SendMessageRequest>,
) -> Result<Json<MessageCreated>, ApiError> {
	let party = authenticate(&state, &headers)?;
	request.validate()?;

	let message = state
		.market
		.send_message(&party, &request.order_id, request.text)
		.await?;
	Ok(Json(MessageCreated { id: message.id }))
}

/// Handles GET /api/chat/{order_id} requests.
pub async fn list(
	State(state): State<AppState>,
	Path(order_id): Path<String>,
	Query(query): Query<ListMessagesQuery>,
	headers: HeaderMap,
) -> Result<Json<Vec<Message>>, ApiError> {
	let party = authenticate(&state, &headers)?;

	let messages = state
		.market
		.messages_for_order(&party, &order_id, query.limit)
		.await?;
	Ok(Json(messages))
}
