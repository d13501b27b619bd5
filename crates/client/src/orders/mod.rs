//! Order Fulfillment Tracker.
//!
//! - [`OrderTracker`] - enriched order list and status transitions
//! - [`OrderBrowser`] - in-memory filter, search and paging

mod enrich;
mod tracker;
mod view;

pub use enrich::EnrichmentFailure;
pub use tracker::{AdvanceOutcome, OrderBook, OrderScope, OrderTracker};
pub use view::{OrderBrowser, OrderPage, StatusFilter};
