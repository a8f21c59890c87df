//! Per-order chat message types.

use serde::{Deserialize, Serialize};

/// A chat message exchanged between the two parties of an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
	/// Unique identifier for this message.
	pub id: String,
	/// Order this message belongs to.
	pub order_id: String,
	/// Party id of the sender.
	pub sender_id: String,
	/// Message body.
	pub text: String,
	/// Send time in unix milliseconds; defines chat ordering.
	pub sent_at: u64,
}
