//! Maya client library.
//!
//! Client-side core of the Maya storefront: keeps the shopping cart consistent
//! between optimistic local state and the remote API, tracks orders through
//! the fulfillment state machine, encodes/decodes order QR symbols, and bridges
//! the hosted payment checkout.
//!
//! # Architecture
//!
//! - The remote API is the single source of truth for carts, orders, prices
//!   and stock. Nothing here is authoritative for money or status.
//! - [`cart::CartEngine`] and [`orders::OrderTracker`] talk to the API through
//!   the traits in [`gateway`]; [`api::ApiClient`] is the REST implementation.
//! - The current user comes from an explicit [`session::Session`] passed in at
//!   construction, never from ambient global state.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod error;
pub mod gateway;
pub mod orders;
pub mod qr;
pub mod session;

mod locks;

#[cfg(test)]
mod testing;

pub use error::{Result, StoreError};
