//! Maya Core - Shared domain types.
//!
//! This crate provides the types used across all Maya components:
//! - `client` - Cart synchronization, order tracking, QR codec, checkout bridge
//! - `cli` - Terminal front end over the client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async. Everything that talks to the remote API lives in
//! `maya-client`.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, quantities, order status, and the cart/order records

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
