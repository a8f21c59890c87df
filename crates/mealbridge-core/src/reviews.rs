//! Review attachment logic.
//!
//! Reviews are independent of the status machine: once an order is
//! fulfilled, each party may attach its one review and star rating, in any
//! order and at any later time. A second submission from the same party is
//! rejected rather than merged.

use crate::CoreError;
use mealbridge_types::{Order, OrderStatus};

/// Attaches a review to one side of an order.
///
/// `is_restaurant` selects which side's slot the review lands in; the
/// caller has already been authorized as a party to the order.
pub(crate) fn apply_review(
	order: &mut Order,
	is_restaurant: bool,
	text: String,
	stars: u8,
) -> Result<(), CoreError> {
	if !(1..=5).contains(&stars) {
		return Err(CoreError::InvalidArgument(
			"stars must be between 1 and 5".to_string(),
		));
	}
	if order.status != OrderStatus::Fulfilled {
		return Err(CoreError::InvalidState(
			"reviews can only be left on fulfilled orders".to_string(),
		));
	}

	if is_restaurant {
		if order.rest_review.is_some() {
			return Err(CoreError::InvalidState(
				"review already submitted".to_string(),
			));
		}
		order.rest_review = Some(text);
		order.rest_stars = Some(stars);
	} else {
		if order.ngo_review.is_some() {
			return Err(CoreError::InvalidState(
				"review already submitted".to_string(),
			));
		}
		order.ngo_review = Some(text);
		order.ngo_stars = Some(stars);
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{marketplace, ngo, restaurant, seed_listing};
	use mealbridge_types::{Confirmation, OrderCommand, ProposedStatus};

	async fn fulfilled_order(market: &crate::Marketplace) -> Order {
		seed_listing(market, "l1", "rest-1").await;
		let order = market
			.create_order(&ngo(), &["l1".to_string()])
			.await
			.unwrap();
		market
			.update_order(&restaurant(), &order.id, OrderCommand::Accept)
			.await
			.unwrap();
		market
			.update_order(&ngo(), &order.id, OrderCommand::Propose(ProposedStatus::Fulfilled))
			.await
			.unwrap();
		market
			.update_order(
				&restaurant(),
				&order.id,
				OrderCommand::Confirm(Confirmation::Yes),
			)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn both_parties_review_once_in_any_order() {
		let market = marketplace();
		let order = fulfilled_order(&market).await;

		let after_ngo = market
			.update_order(
				&ngo(),
				&order.id,
				OrderCommand::Review {
					text: "generous portions".to_string(),
					stars: 5,
				},
			)
			.await
			.unwrap();
		assert_eq!(after_ngo.ngo_review.as_deref(), Some("generous portions"));
		assert_eq!(after_ngo.ngo_stars, Some(5));
		assert!(after_ngo.rest_review.is_none());

		let after_rest = market
			.update_order(
				&restaurant(),
				&order.id,
				OrderCommand::Review {
					text: "punctual pickup".to_string(),
					stars: 4,
				},
			)
			.await
			.unwrap();
		assert_eq!(after_rest.rest_review.as_deref(), Some("punctual pickup"));
		assert_eq!(after_rest.rest_stars, Some(4));
		// The NGO's earlier review is untouched
		assert_eq!(after_rest.ngo_stars, Some(5));
	}

	#[tokio::test]
	async fn second_review_from_same_party_is_rejected() {
		let market = marketplace();
		let order = fulfilled_order(&market).await;

		market
			.update_order(
				&ngo(),
				&order.id,
				OrderCommand::Review {
					text: "first".to_string(),
					stars: 3,
				},
			)
			.await
			.unwrap();
		let result = market
			.update_order(
				&ngo(),
				&order.id,
				OrderCommand::Review {
					text: "second".to_string(),
					stars: 1,
				},
			)
			.await;
		assert!(matches!(result, Err(CoreError::InvalidState(_))));

		// The original text survives
		let stored = market.get_order(&ngo(), &order.id).await.unwrap();
		assert_eq!(stored.ngo_review.as_deref(), Some("first"));
		assert_eq!(stored.ngo_stars, Some(3));
	}

	#[tokio::test]
	async fn review_before_fulfillment_is_rejected() {
		let market = marketplace();
		seed_listing(&market, "l1", "rest-1").await;
		let order = market
			.create_order(&ngo(), &["l1".to_string()])
			.await
			.unwrap();

		let result = market
			.update_order(
				&ngo(),
				&order.id,
				OrderCommand::Review {
					text: "too early".to_string(),
					stars: 4,
				},
			)
			.await;
		assert!(matches!(result, Err(CoreError::InvalidState(_))));
	}

	#[tokio::test]
	async fn out_of_range_stars_are_rejected() {
		let market = marketplace();
		let order = fulfilled_order(&market).await;

		for stars in [0u8, 6] {
			let result = market
				.update_order(
					&ngo(),
					&order.id,
					OrderCommand::Review {
						text: "rating out of range".to_string(),
						stars,
					},
				)
				.await;
			assert!(matches!(result, Err(CoreError::InvalidArgument(_))));
		}
	}
}
