//! Catalog rows: products and categories.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sundry_core::{CategoryId, NewCartItem, ProductId};

/// A row of the `products` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub stock_quantity: i32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether any units are left.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock_quantity > 0
    }

    /// The cart line this product becomes when added.
    #[must_use]
    pub fn to_cart_item(&self) -> NewCartItem {
        NewCartItem {
            id: self.id,
            name: self.name.clone(),
            price: self.price,
            image: self.image_url.clone().unwrap_or_default(),
        }
    }
}

/// A row of the `categories` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_from_row() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 3,
            "name": "Linen Apron",
            "description": null,
            "price": 24.5,
            "image_url": "https://cdn.example.com/apron.jpg",
            "stock_quantity": 0,
            "created_at": "2026-03-01T12:00:00+00:00",
            "updated_at": "2026-03-02T12:00:00+00:00"
        }))
        .unwrap();

        assert_eq!(product.price, Decimal::new(245, 1));
        assert!(!product.in_stock());

        let item = product.to_cart_item();
        assert_eq!(item.id, ProductId::new(3));
        assert_eq!(item.image, "https://cdn.example.com/apron.jpg");
    }

    #[test]
    fn test_missing_image_becomes_empty_reference() {
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": 4,
            "name": "Bowl",
            "price": 12,
            "created_at": "2026-03-01T12:00:00Z"
        }))
        .unwrap();
        assert_eq!(product.to_cart_item().image, "");
    }
}
