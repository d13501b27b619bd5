//! Product snapshots used to enrich cart lines and orders.

use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::money::Money;

/// Maximum number of images kept per product.
pub const MAX_PRODUCT_IMAGES: usize = 3;

/// Read-only, possibly stale view of a catalog product.
///
/// Never authoritative for pricing at checkout; the server recomputes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Image URLs in display order (at most [`MAX_PRODUCT_IMAGES`]).
    pub images: Vec<String>,
    /// Unit price at fetch time.
    pub price: Money,
    /// Units in stock at fetch time.
    pub stock: u32,
}

impl ProductSnapshot {
    /// Build a snapshot, dropping empty image slots and keeping at most
    /// [`MAX_PRODUCT_IMAGES`].
    #[must_use]
    pub fn new(
        id: ProductId,
        name: String,
        images: impl IntoIterator<Item = String>,
        price: Money,
        stock: u32,
    ) -> Self {
        let images = images
            .into_iter()
            .filter(|url| !url.trim().is_empty())
            .take(MAX_PRODUCT_IMAGES)
            .collect();
        Self {
            id,
            name,
            images,
            price,
            stock,
        }
    }

    /// First image, used as the thumbnail.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_drops_blank_and_caps_images() {
        let snapshot = ProductSnapshot::new(
            ProductId::new("p1"),
            "Huipil".to_string(),
            [
                String::new(),
                "a.jpg".to_string(),
                "  ".to_string(),
                "b.jpg".to_string(),
                "c.jpg".to_string(),
                "d.jpg".to_string(),
            ],
            Money::default(),
            4,
        );
        assert_eq!(snapshot.images, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(snapshot.primary_image(), Some("a.jpg"));
    }
}
