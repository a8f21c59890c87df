//! Order types for the marketplace.
//!
//! An order is an NGO's request for one or more listings from a single
//! restaurant, carrying its own negotiated lifecycle status. Terminal
//! transitions (fulfilled, cancelled) go through a dual-party confirmation
//! round recorded as a pending proposal.

use crate::ListingSnapshot;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an order in the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Order has been created by an NGO and awaits the restaurant's answer.
	Requested,
	/// Restaurant accepted; fulfillment or cancellation can be proposed.
	Accepted,
	/// Restaurant declined. Terminal.
	Declined,
	/// Both parties confirmed the handover. Terminal.
	Fulfilled,
	/// Both parties agreed to cancel. Terminal.
	Cancelled,
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			OrderStatus::Requested => write!(f, "requested"),
			OrderStatus::Accepted => write!(f, "accepted"),
			OrderStatus::Declined => write!(f, "declined"),
			OrderStatus::Fulfilled => write!(f, "fulfilled"),
			OrderStatus::Cancelled => write!(f, "cancelled"),
		}
	}
}

/// Terminal statuses that require the counterparty's agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposedStatus {
	Fulfilled,
	Cancelled,
}

impl From<ProposedStatus> for OrderStatus {
	fn from(proposed: ProposedStatus) -> Self {
		match proposed {
			ProposedStatus::Fulfilled => OrderStatus::Fulfilled,
			ProposedStatus::Cancelled => OrderStatus::Cancelled,
		}
	}
}

impl fmt::Display for ProposedStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProposedStatus::Fulfilled => write!(f, "fulfilled"),
			ProposedStatus::Cancelled => write!(f, "cancelled"),
		}
	}
}

/// A proposed but unconfirmed status change awaiting the counterparty.
///
/// At most one proposal is in flight per order, and only while the order
/// is `accepted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingStatus {
	/// The status the proposer wants the order to move to.
	pub status: ProposedStatus,
	/// Party id of the proposer. The confirming party must differ.
	pub requested_by: String,
}

/// Answer to a pending status proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confirmation {
	/// Commit the proposed status.
	Yes,
	/// Reject the proposal; the order stays accepted.
	No,
}

/// An order as persisted in storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Restaurant party. Immutable once created.
	pub restaurant_id: String,
	/// NGO party. Immutable once created.
	pub ngo_id: String,
	/// Snapshot of the ordered listings, captured at creation time.
	pub listings: Vec<ListingSnapshot>,
	/// Current lifecycle status.
	pub status: OrderStatus,
	/// Proposal awaiting the counterparty's confirmation, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub pending_status: Option<PendingStatus>,
	/// Free-text review left by the restaurant after fulfillment.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rest_review: Option<String>,
	/// Free-text review left by the NGO after fulfillment.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ngo_review: Option<String>,
	/// Rating (1-5) paired with the restaurant's review.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub rest_stars: Option<u8>,
	/// Rating (1-5) paired with the NGO's review.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ngo_stars: Option<u8>,
	/// Timestamp when this order was created.
	pub created_at: u64,
	/// Timestamp when this order was last updated.
	pub updated_at: u64,
}

/// A single mutation of an order, dispatched through an explicit match.
///
/// The HTTP patch payload converts into exactly one command; payloads
/// naming several operations at once are rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderCommand {
	/// Restaurant accepts a requested order.
	Accept,
	/// Restaurant declines a requested order, releasing its listings.
	Decline,
	/// Either party proposes a terminal status, pending confirmation.
	Propose(ProposedStatus),
	/// The counterparty resolves a pending proposal.
	Confirm(Confirmation),
	/// Either party attaches its one review after fulfillment.
	Review { text: String, stars: u8 },
}
