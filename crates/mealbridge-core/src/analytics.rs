//! Read-side dashboard aggregation.
//!
//! Pure aggregation over the order collection: status counts, collected
//! reviews, average stars and per-counterparty fulfilled/cancelled tallies.
//! No state-machine involvement.

use crate::{CoreError, Marketplace};
use mealbridge_types::{
	AnalyticsReport, CounterpartyStats, Order, OrderStatus, Party, PartyRole, ReviewEntry,
	StatusCount, StorageKey,
};
use std::collections::HashMap;

impl Marketplace {
	/// Builds the dashboard aggregation for the calling party.
	///
	/// Restaurants aggregate over the orders addressed to them and their
	/// own star ratings; NGOs mirror that over the orders they created.
	pub async fn analytics_for(&self, caller: &Party) -> Result<AnalyticsReport, CoreError> {
		let mut orders: Vec<Order> = self.storage.query(StorageKey::Orders.as_str()).await?;
		orders.retain(|order| match caller.role {
			PartyRole::Restaurant => order.restaurant_id == caller.id,
			PartyRole::Ngo => order.ngo_id == caller.id,
		});

		let mut counts: HashMap<OrderStatus, u64> = HashMap::new();
		let mut reviews = Vec::new();
		let mut stars_sum = 0u64;
		let mut stars_count = 0u64;
		let mut tallies: HashMap<&str, (u64, u64)> = HashMap::new();

		for order in &orders {
			*counts.entry(order.status).or_insert(0) += 1;

			if order.rest_review.is_some() || order.ngo_review.is_some() {
				reviews.push(ReviewEntry {
					rest_review: order.rest_review.clone(),
					ngo_review: order.ngo_review.clone(),
					rest_stars: order.rest_stars,
					ngo_stars: order.ngo_stars,
				});
			}

			let own_stars = match caller.role {
				PartyRole::Restaurant => order.rest_stars,
				PartyRole::Ngo => order.ngo_stars,
			};
			if let Some(stars) = own_stars {
				stars_sum += u64::from(stars);
				stars_count += 1;
			}

			let counterparty = match caller.role {
				PartyRole::Restaurant => order.ngo_id.as_str(),
				PartyRole::Ngo => order.restaurant_id.as_str(),
			};
			match order.status {
				OrderStatus::Fulfilled => tallies.entry(counterparty).or_insert((0, 0)).0 += 1,
				OrderStatus::Cancelled => tallies.entry(counterparty).or_insert((0, 0)).1 += 1,
				_ => {}
			}
		}

		let mut stats: Vec<StatusCount> = counts
			.into_iter()
			.map(|(status, count)| StatusCount { status, count })
			.collect();
		stats.sort_by_key(|entry| entry.status.to_string());

		let mut counterparties: Vec<CounterpartyStats> = tallies
			.into_iter()
			.map(|(party_id, (fulfilled, cancelled))| CounterpartyStats {
				party_id: party_id.to_string(),
				fulfilled_count: fulfilled,
				cancelled_count: cancelled,
			})
			.collect();
		counterparties.sort_by(|a, b| a.party_id.cmp(&b.party_id));

		let avg_stars = (stars_count > 0).then(|| stars_sum as f64 / stars_count as f64);

		Ok(AnalyticsReport {
			stats,
			reviews,
			avg_stars,
			counterparties,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{marketplace, restaurant, seed_listing};
	use mealbridge_types::{Confirmation, OrderCommand, ProposedStatus};

	async fn run_order_to(
		market: &Marketplace,
		listing: &str,
		ngo: &Party,
		end: ProposedStatus,
	) -> Order {
		seed_listing(market, listing, "rest-1").await;
		let order = market
			.create_order(ngo, &[listing.to_string()])
			.await
			.unwrap();
		market
			.update_order(&restaurant(), &order.id, OrderCommand::Accept)
			.await
			.unwrap();
		market
			.update_order(ngo, &order.id, OrderCommand::Propose(end))
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
	async fn aggregates_counts_reviews_and_tallies() {
		let market = marketplace();
		let ngo_a = Party::new("ngo-a", PartyRole::Ngo);
		let ngo_b = Party::new("ngo-b", PartyRole::Ngo);

		let fulfilled = run_order_to(&market, "l1", &ngo_a, ProposedStatus::Fulfilled).await;
		run_order_to(&market, "l2", &ngo_a, ProposedStatus::Cancelled).await;
		run_order_to(&market, "l3", &ngo_b, ProposedStatus::Fulfilled).await;

		// One requested order left open
		seed_listing(&market, "l4", "rest-1").await;
		market
			.create_order(&ngo_b, &["l4".to_string()])
			.await
			.unwrap();

		// The restaurant reviews its fulfilled order with ngo-a
		market
			.update_order(
				&restaurant(),
				&fulfilled.id,
				OrderCommand::Review {
					text: "went well".to_string(),
					stars: 4,
				},
			)
			.await
			.unwrap();

		let report = market.analytics_for(&restaurant()).await.unwrap();

		let count_of = |status: OrderStatus| {
			report
				.stats
				.iter()
				.find(|entry| entry.status == status)
				.map(|entry| entry.count)
				.unwrap_or(0)
		};
		assert_eq!(count_of(OrderStatus::Fulfilled), 2);
		assert_eq!(count_of(OrderStatus::Cancelled), 1);
		assert_eq!(count_of(OrderStatus::Requested), 1);
		assert_eq!(count_of(OrderStatus::Declined), 0);

		assert_eq!(report.reviews.len(), 1);
		assert_eq!(report.avg_stars, Some(4.0));

		assert_eq!(report.counterparties.len(), 2);
		let ngo_a_stats = report
			.counterparties
			.iter()
			.find(|stats| stats.party_id == "ngo-a")
			.unwrap();
		assert_eq!(ngo_a_stats.fulfilled_count, 1);
		assert_eq!(ngo_a_stats.cancelled_count, 1);
		let ngo_b_stats = report
			.counterparties
			.iter()
			.find(|stats| stats.party_id == "ngo-b")
			.unwrap();
		assert_eq!(ngo_b_stats.fulfilled_count, 1);
		assert_eq!(ngo_b_stats.cancelled_count, 0);
	}

	#[tokio::test]
	async fn ngo_report_counts_its_own_stars() {
		let market = marketplace();
		let ngo_a = Party::new("ngo-a", PartyRole::Ngo);

		let order = run_order_to(&market, "l1", &ngo_a, ProposedStatus::Fulfilled).await;
		market
			.update_order(
				&ngo_a,
				&order.id,
				OrderCommand::Review {
					text: "thank you".to_string(),
					stars: 5,
				},
			)
			.await
			.unwrap();

		let report = market.analytics_for(&ngo_a).await.unwrap();
		assert_eq!(report.avg_stars, Some(5.0));
		assert_eq!(report.counterparties.len(), 1);
		assert_eq!(report.counterparties[0].party_id, "rest-1");
	}

	#[tokio::test]
	async fn empty_history_yields_empty_report() {
		let market = marketplace();
		let report = market.analytics_for(&restaurant()).await.unwrap();

		assert!(report.stats.is_empty());
		assert!(report.reviews.is_empty());
		assert!(report.avg_stars.is_none());
		assert!(report.counterparties.is_empty());
	}
}
