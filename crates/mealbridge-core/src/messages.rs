//! Per-order chat message storage and retrieval.
//!
//! Plain request/response persistence: a party sends a message on one of
//! its orders, the counterparty polls the thread. Messages are keyed under
//! the order and ordered by send time.

use crate::{now_millis, CoreError, Marketplace};
use mealbridge_types::{Message, Party, StorageKey};
use uuid::Uuid;

impl Marketplace {
	/// Appends a chat message to an order's thread.
	///
	/// Only the two parties of the order may write to its thread.
	pub async fn send_message(
		&self,
		caller: &Party,
		order_id: &str,
		text: String,
	) -> Result<Message, CoreError> {
		let order = self.load_order(order_id).await?;
		Self::require_party(&order, caller)?;

		let message = Message {
			id: Uuid::new_v4().to_string(),
			order_id: order_id.to_string(),
			sender_id: caller.id.clone(),
			text,
			sent_at: now_millis(),
		};

		// Key includes the order id so one order's thread stays together
		let key = format!("{}:{}", order_id, message.id);
		self.storage
			.store(StorageKey::Messages.as_str(), &key, &message)
			.await?;

		Ok(message)
	}

	/// Returns an order's chat thread, oldest first.
	pub async fn messages_for_order(
		&self,
		caller: &Party,
		order_id: &str,
		limit: Option<usize>,
	) -> Result<Vec<Message>, CoreError> {
		let order = self.load_order(order_id).await?;
		Self::require_party(&order, caller)?;

		let mut messages: Vec<Message> = self.storage.query(StorageKey::Messages.as_str()).await?;
		messages.retain(|message| message.order_id == order_id);
		// Tie-break on id so same-millisecond messages order stably
		messages.sort_by(|a, b| a.sent_at.cmp(&b.sent_at).then_with(|| a.id.cmp(&b.id)));

		if let Some(limit) = limit {
			messages.truncate(limit);
		}
		Ok(messages)
	}
}
