//! HTTP handlers for the mealbridge API, grouped by resource.

pub mod analytics;
pub mod auth;
pub mod chat;
pub mod listings;
pub mod orders;
