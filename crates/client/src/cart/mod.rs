//! Cart Synchronization Engine.
//!
//! - [`CartEngine`] - optimistic, reconciled cart mutations
//! - [`CartState`] - the observable view published to subscribers

mod engine;
mod state;

pub use engine::{CartEngine, QuantityChange};
pub use state::{CartAction, CartNotice, CartState};
