//! Status enums for orders.
//!
//! Order fulfillment is a forward-only state machine:
//!
//! ```text
//! pendiente ──▶ almacenado ──▶ completado
//! (placed)      (staged)        (picked up / delivered)
//! ```
//!
//! The next status is always computed from the current one; callers never
//! choose a target status, so out-of-order transitions cannot be expressed.

use serde::{Deserialize, Serialize};

/// Order fulfillment status.
///
/// Serialized with the remote API's Spanish status names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Placed at checkout, waiting to be staged.
    #[default]
    #[serde(rename = "pendiente")]
    Pending,
    /// Staged in the warehouse for pickup.
    #[serde(rename = "almacenado")]
    Stored,
    /// Picked up or delivered. Terminal.
    #[serde(rename = "completado")]
    Completed,
}

impl OrderStatus {
    /// All statuses in fulfillment order.
    pub const ALL: [Self; 3] = [Self::Pending, Self::Stored, Self::Completed];

    /// The status an explicit warehouse action moves this order to.
    ///
    /// `Pending` goes to `Stored`; `Stored` goes to `Completed`; `Completed`
    /// has no successor.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Stored),
            Self::Stored => Some(Self::Completed),
            Self::Completed => None,
        }
    }

    /// Whether no further transition exists.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Wire name (also the path segment of the transition endpoint).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pendiente",
            Self::Stored => "almacenado",
            Self::Completed => "completado",
        }
    }

    /// Label of the warehouse action that advances an order in this status.
    #[must_use]
    pub const fn action_label(self) -> Option<&'static str> {
        match self {
            Self::Pending => Some("Almacenar"),
            Self::Stored => Some("Completado o Entregado"),
            Self::Completed => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pendiente" => Ok(Self::Pending),
            "almacenado" => Ok(Self::Stored),
            "completado" => Ok(Self::Completed),
            _ => Err(format!("invalid order status: {s}")),
        }
    }
}
