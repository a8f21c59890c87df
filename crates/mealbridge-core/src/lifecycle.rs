//! Order state machine implementation.
//!
//! Manages order status transitions with validation. Direct transitions
//! (accept, decline) are restaurant-only and legal solely from `requested`.
//! Terminal transitions (fulfilled, cancelled) require a confirmation round:
//! either party proposes, the counterparty resolves, and nobody confirms
//! their own proposal. Each order's read-validate-write cycle runs under a
//! per-order mutex, so of two conflicting concurrent calls exactly one wins.

use crate::{now_secs, reviews, CoreError, Marketplace};
use mealbridge_types::{
	Confirmation, Order, OrderCommand, OrderStatus, Party, PendingStatus, StorageKey,
};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Static transition table - each state maps to allowed next states.
///
/// Entry into `fulfilled` or `cancelled` additionally requires the
/// confirmation round; this table only answers whether the edge exists.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Requested,
		HashSet::from([OrderStatus::Accepted, OrderStatus::Declined]),
	);
	m.insert(
		OrderStatus::Accepted,
		HashSet::from([OrderStatus::Fulfilled, OrderStatus::Cancelled]),
	);
	m.insert(OrderStatus::Declined, HashSet::new()); // terminal
	m.insert(OrderStatus::Fulfilled, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

/// Checks if a state transition is valid.
pub fn is_valid_transition(from: OrderStatus, to: OrderStatus) -> bool {
	TRANSITIONS.get(&from).is_some_and(|set| set.contains(&to))
}

impl Marketplace {
	/// Applies a single command to an order on behalf of a verified caller.
	///
	/// This is the one mutation entry point for existing orders. The caller
	/// must be a party to the order; each command further restricts which
	/// side may issue it and from which state. On success the updated order
	/// is persisted and returned.
	pub async fn update_order(
		&self,
		caller: &Party,
		order_id: &str,
		command: OrderCommand,
	) -> Result<Order, CoreError> {
		let lock = self.order_lock(order_id);
		let _guard = lock.lock().await;

		let mut order = self.load_order(order_id).await?;
		let (is_restaurant, is_ngo) = Self::party_sides(&order, caller);
		if !is_restaurant && !is_ngo {
			return Err(CoreError::Forbidden(
				"not authorized to modify this order".to_string(),
			));
		}

		match command {
			OrderCommand::Accept => {
				if !is_restaurant {
					return Err(CoreError::Forbidden(
						"only the restaurant can accept an order".to_string(),
					));
				}
				if !is_valid_transition(order.status, OrderStatus::Accepted) {
					return Err(CoreError::InvalidState(format!(
						"order cannot be accepted from the {} state",
						order.status
					)));
				}
				order.status = OrderStatus::Accepted;
			}
			OrderCommand::Decline => {
				if !is_restaurant {
					return Err(CoreError::Forbidden(
						"only the restaurant can decline an order".to_string(),
					));
				}
				if !is_valid_transition(order.status, OrderStatus::Declined) {
					return Err(CoreError::InvalidState(format!(
						"order cannot be declined from the {} state",
						order.status
					)));
				}
				order.status = OrderStatus::Declined;
				self.release_listings(&order).await?;
			}
			OrderCommand::Propose(proposed) => {
				if !is_valid_transition(order.status, proposed.into()) {
					return Err(CoreError::InvalidState(
						"order must be accepted before it can be fulfilled or cancelled"
							.to_string(),
					));
				}
				if order.pending_status.is_some() {
					return Err(CoreError::InvalidState(
						"a pending status change is already in progress".to_string(),
					));
				}
				order.pending_status = Some(PendingStatus {
					status: proposed,
					requested_by: caller.id.clone(),
				});
			}
			OrderCommand::Confirm(confirm) => {
				let Some(pending) = order.pending_status.clone() else {
					return Err(CoreError::InvalidState(
						"no pending status change to confirm".to_string(),
					));
				};
				if pending.requested_by == caller.id {
					return Err(CoreError::Forbidden(
						"cannot confirm your own request".to_string(),
					));
				}
				if confirm == Confirmation::Yes {
					order.status = pending.status.into();
				}
				order.pending_status = None;
			}
			OrderCommand::Review { text, stars } => {
				reviews::apply_review(&mut order, is_restaurant, text, stars)?;
			}
		}

		order.updated_at = now_secs();
		self.storage
			.update(StorageKey::Orders.as_str(), order_id, &order)
			.await?;

		tracing::info!(
			order_id = %order.id,
			status = %order.status,
			pending = order.pending_status.is_some(),
			"Order updated"
		);

		Ok(order)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{marketplace, ngo, restaurant, seed_listing, stored_listing};
	use mealbridge_types::{ListingStatus, PartyRole, ProposedStatus};
	use std::sync::Arc;

	async fn requested_order(market: &Marketplace) -> Order {
		seed_listing(market, "l1", "rest-1").await;
		seed_listing(market, "l2", "rest-1").await;
		market
			.create_order(&ngo(), &["l1".to_string(), "l2".to_string()])
			.await
			.unwrap()
	}

	async fn accepted_order(market: &Marketplace) -> Order {
		let order = requested_order(market).await;
		market
			.update_order(&restaurant(), &order.id, OrderCommand::Accept)
			.await
			.unwrap()
	}

	#[test]
	fn transition_table_shape() {
		assert!(is_valid_transition(OrderStatus::Requested, OrderStatus::Accepted));
		assert!(is_valid_transition(OrderStatus::Requested, OrderStatus::Declined));
		assert!(is_valid_transition(OrderStatus::Accepted, OrderStatus::Fulfilled));
		assert!(is_valid_transition(OrderStatus::Accepted, OrderStatus::Cancelled));

		assert!(!is_valid_transition(OrderStatus::Requested, OrderStatus::Fulfilled));
		assert!(!is_valid_transition(OrderStatus::Accepted, OrderStatus::Requested));
		for terminal in [
			OrderStatus::Declined,
			OrderStatus::Fulfilled,
			OrderStatus::Cancelled,
		] {
			for target in [
				OrderStatus::Requested,
				OrderStatus::Accepted,
				OrderStatus::Declined,
				OrderStatus::Fulfilled,
				OrderStatus::Cancelled,
			] {
				assert!(!is_valid_transition(terminal, target));
			}
		}
	}

	#[tokio::test]
	async fn restaurant_accepts_requested_order() {
		let market = marketplace();
		let order = requested_order(&market).await;

		let updated = market
			.update_order(&restaurant(), &order.id, OrderCommand::Accept)
			.await
			.unwrap();
		assert_eq!(updated.status, OrderStatus::Accepted);
		assert!(updated.pending_status.is_none());
	}

	#[tokio::test]
	async fn ngo_cannot_accept_or_decline() {
		let market = marketplace();
		let order = requested_order(&market).await;

		for command in [OrderCommand::Accept, OrderCommand::Decline] {
			let result = market.update_order(&ngo(), &order.id, command).await;
			assert!(matches!(result, Err(CoreError::Forbidden(_))));
		}
	}

	#[tokio::test]
	async fn outsider_is_rejected() {
		let market = marketplace();
		let order = requested_order(&market).await;

		let outsider = Party::new("rest-9", PartyRole::Restaurant);
		let result = market
			.update_order(&outsider, &order.id, OrderCommand::Accept)
			.await;
		assert!(matches!(result, Err(CoreError::Forbidden(_))));
	}

	#[tokio::test]
	async fn unknown_order_is_not_found() {
		let market = marketplace();
		let result = market
			.update_order(&restaurant(), "missing", OrderCommand::Accept)
			.await;
		assert!(matches!(result, Err(CoreError::NotFound(_))));
	}

	#[tokio::test]
	async fn decline_releases_every_claimed_listing() {
		let market = marketplace();
		let order = requested_order(&market).await;

		let updated = market
			.update_order(&restaurant(), &order.id, OrderCommand::Decline)
			.await
			.unwrap();
		assert_eq!(updated.status, OrderStatus::Declined);

		for id in ["l1", "l2"] {
			let listing = stored_listing(&market, id).await;
			assert_eq!(listing.status, ListingStatus::Available);
			assert!(listing.claimed_by.is_none());
		}
	}

	#[tokio::test]
	async fn accept_twice_is_invalid_state() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		let result = market
			.update_order(&restaurant(), &order.id, OrderCommand::Accept)
			.await;
		assert!(matches!(result, Err(CoreError::InvalidState(_))));
	}

	#[tokio::test]
	async fn decline_after_accept_is_invalid_state() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		let result = market
			.update_order(&restaurant(), &order.id, OrderCommand::Decline)
			.await;
		assert!(matches!(result, Err(CoreError::InvalidState(_))));
	}

	#[tokio::test]
	async fn proposal_records_pending_without_changing_status() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		let updated = market
			.update_order(&ngo(), &order.id, OrderCommand::Propose(ProposedStatus::Fulfilled))
			.await
			.unwrap();

		assert_eq!(updated.status, OrderStatus::Accepted);
		let pending = updated.pending_status.unwrap();
		assert_eq!(pending.status, ProposedStatus::Fulfilled);
		assert_eq!(pending.requested_by, "ngo-1");
	}

	#[tokio::test]
	async fn proposal_requires_accepted_state() {
		let market = marketplace();
		let order = requested_order(&market).await;

		let result = market
			.update_order(&ngo(), &order.id, OrderCommand::Propose(ProposedStatus::Cancelled))
			.await;
		assert!(matches!(result, Err(CoreError::InvalidState(_))));
	}

	#[tokio::test]
	async fn second_proposal_is_rejected_while_one_is_pending() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		market
			.update_order(&ngo(), &order.id, OrderCommand::Propose(ProposedStatus::Fulfilled))
			.await
			.unwrap();
		let result = market
			.update_order(
				&restaurant(),
				&order.id,
				OrderCommand::Propose(ProposedStatus::Cancelled),
			)
			.await;
		assert!(matches!(result, Err(CoreError::InvalidState(_))));
	}

	#[tokio::test]
	async fn confirm_yes_commits_the_proposed_status() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		market
			.update_order(&ngo(), &order.id, OrderCommand::Propose(ProposedStatus::Fulfilled))
			.await
			.unwrap();
		let updated = market
			.update_order(
				&restaurant(),
				&order.id,
				OrderCommand::Confirm(Confirmation::Yes),
			)
			.await
			.unwrap();

		assert_eq!(updated.status, OrderStatus::Fulfilled);
		assert!(updated.pending_status.is_none());
	}

	#[tokio::test]
	async fn confirm_no_clears_the_proposal_only() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		market
			.update_order(&ngo(), &order.id, OrderCommand::Propose(ProposedStatus::Fulfilled))
			.await
			.unwrap();
		let updated = market
			.update_order(
				&restaurant(),
				&order.id,
				OrderCommand::Confirm(Confirmation::No),
			)
			.await
			.unwrap();

		assert_eq!(updated.status, OrderStatus::Accepted);
		assert!(updated.pending_status.is_none());

		// The round can start over
		let reproposed = market
			.update_order(
				&restaurant(),
				&order.id,
				OrderCommand::Propose(ProposedStatus::Cancelled),
			)
			.await
			.unwrap();
		assert_eq!(
			reproposed.pending_status.unwrap().requested_by,
			"rest-1"
		);
	}

	#[tokio::test]
	async fn self_confirmation_is_forbidden_and_leaves_state_unchanged() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		market
			.update_order(&ngo(), &order.id, OrderCommand::Propose(ProposedStatus::Fulfilled))
			.await
			.unwrap();
		let result = market
			.update_order(&ngo(), &order.id, OrderCommand::Confirm(Confirmation::Yes))
			.await;
		assert!(matches!(result, Err(CoreError::Forbidden(_))));

		let order = market.get_order(&ngo(), &order.id).await.unwrap();
		assert_eq!(order.status, OrderStatus::Accepted);
		let pending = order.pending_status.unwrap();
		assert_eq!(pending.requested_by, "ngo-1");
	}

	#[tokio::test]
	async fn confirm_without_pending_is_invalid_state() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		let result = market
			.update_order(
				&restaurant(),
				&order.id,
				OrderCommand::Confirm(Confirmation::Yes),
			)
			.await;
		assert!(matches!(result, Err(CoreError::InvalidState(_))));
	}

	#[tokio::test]
	async fn cancellation_round_works_both_directions() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		market
			.update_order(
				&restaurant(),
				&order.id,
				OrderCommand::Propose(ProposedStatus::Cancelled),
			)
			.await
			.unwrap();
		let updated = market
			.update_order(&ngo(), &order.id, OrderCommand::Confirm(Confirmation::Yes))
			.await
			.unwrap();

		assert_eq!(updated.status, OrderStatus::Cancelled);
		assert!(updated.pending_status.is_none());
	}

	#[tokio::test]
	async fn concurrent_proposals_serialize_to_one_winner() {
		let market = Arc::new(marketplace());
		let order = accepted_order(&market).await;

		let ngo_side = {
			let market = market.clone();
			let order_id = order.id.clone();
			tokio::spawn(async move {
				market
					.update_order(
						&ngo(),
						&order_id,
						OrderCommand::Propose(ProposedStatus::Fulfilled),
					)
					.await
			})
		};
		let restaurant_side = {
			let market = market.clone();
			let order_id = order.id.clone();
			tokio::spawn(async move {
				market
					.update_order(
						&restaurant(),
						&order_id,
						OrderCommand::Propose(ProposedStatus::Cancelled),
					)
					.await
			})
		};

		let outcomes = [ngo_side.await.unwrap(), restaurant_side.await.unwrap()];
		let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
		let losers = outcomes
			.iter()
			.filter(|outcome| matches!(outcome, Err(CoreError::InvalidState(_))))
			.count();

		assert_eq!(winners, 1);
		assert_eq!(losers, 1);

		// The stored order holds exactly the winner's proposal
		let stored = market.get_order(&ngo(), &order.id).await.unwrap();
		assert_eq!(stored.status, OrderStatus::Accepted);
		assert!(stored.pending_status.is_some());
	}

	#[tokio::test]
	async fn pending_only_exists_while_accepted() {
		let market = marketplace();
		let order = accepted_order(&market).await;

		market
			.update_order(&ngo(), &order.id, OrderCommand::Propose(ProposedStatus::Fulfilled))
			.await
			.unwrap();
		let fulfilled = market
			.update_order(
				&restaurant(),
				&order.id,
				OrderCommand::Confirm(Confirmation::Yes),
			)
			.await
			.unwrap();

		// Once terminal, no further proposal can attach
		assert!(fulfilled.pending_status.is_none());
		let result = market
			.update_order(&ngo(), &order.id, OrderCommand::Propose(ProposedStatus::Cancelled))
			.await;
		assert!(matches!(result, Err(CoreError::InvalidState(_))));
	}
}
