//! Core types for Maya.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod id;
pub mod money;
pub mod order;
pub mod product;
pub mod quantity;
pub mod status;

pub use cart::{Cart, CartLine, LineSnapshot};
pub use id::*;
pub use money::{CurrencyCode, Money};
pub use order::{Buyer, Order, TrackedOrder};
pub use product::{MAX_PRODUCT_IMAGES, ProductSnapshot};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
