//! Newtype IDs for type-safe entity references.
//!
//! The remote API identifies every record with an opaque string (a 24-digit
//! hexadecimal document id in practice). Use the `define_id!` macro to create
//! wrappers that prevent accidentally mixing IDs from different entity types.

/// Length of a remote document id in hexadecimal digits.
pub const OBJECT_ID_LEN: usize = 24;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Into<String>` implementations
///
/// # Example
///
/// ```rust
/// # use maya_core::define_id;
/// define_id!(UserId);
/// define_id!(OrderId);
///
/// let user_id = UserId::new("u-1");
/// let order_id = OrderId::new("o-1");
///
/// // These are different types, so this won't compile:
/// // let _: UserId = order_id;
/// # let _ = (user_id, order_id);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the ID and return the underlying string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl ::core::convert::AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

// Define standard entity IDs
define_id!(UserId);
define_id!(ProductId);
define_id!(OrderId);
define_id!(CartId);

/// Whether `candidate` has the shape of a remote document id.
///
/// Exactly [`OBJECT_ID_LEN`] ASCII hexadecimal digits, either case.
#[must_use]
pub fn is_object_id(candidate: &str) -> bool {
    candidate.len() == OBJECT_ID_LEN && candidate.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_display_and_conversions() {
        let id = OrderId::new("675a1f9c2b3e4d5f6a7b8c9d");
        assert_eq!(id.to_string(), "675a1f9c2b3e4d5f6a7b8c9d");
        assert_eq!(id.as_str(), "675a1f9c2b3e4d5f6a7b8c9d");

        let from_str: OrderId = "abc".into();
        let back: String = from_str.into();
        assert_eq!(back, "abc");
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = ProductId::new("p1");
        let json = serde_json::to_string(&id).unwrap_or_default();
        assert_eq!(json, "\"p1\"");
    }

    #[test]
    fn test_is_object_id() {
        assert!(is_object_id("675a1f9c2b3e4d5f6a7b8c9d"));
        assert!(is_object_id("675A1F9C2B3E4D5F6A7B8C9D"));
        assert!(!is_object_id("675a1f9c2b3e4d5f6a7b8c9")); // 23 chars
        assert!(!is_object_id("675a1f9c2b3e4d5f6a7b8c9g")); // non-hex
        assert!(!is_object_id(""));
        assert!(!is_object_id("https://example.com/promo"));
    }
}
