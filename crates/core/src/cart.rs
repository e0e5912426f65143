//! Cart line items and the pure cart state machine.
//!
//! [`Cart`] owns an ordered list of [`CartItem`]s and upholds two invariants
//! through its whole API:
//!
//! - at most one item per [`ProductId`]
//! - every quantity is at least 1 (an item that would reach 0 is removed)
//!
//! Persistence and remote synchronization live in the storefront crate; this
//! module only knows how to mutate, aggregate, and [`merge`](Cart::merge) carts.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{ProductId, line_total};

/// A product as it is added to the cart, before it has a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCartItem {
    /// Product identifier.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price (non-negative).
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Image reference (URL or path).
    pub image: String,
}

impl NewCartItem {
    /// Attach a quantity, producing a cart line.
    #[must_use]
    pub fn with_quantity(self, quantity: u32) -> CartItem {
        CartItem {
            id: self.id,
            name: self.name,
            price: self.price,
            image: self.image,
            quantity,
        }
    }
}

/// One product entry in a cart.
///
/// Serialized as `{"id", "name", "price", "image", "quantity"}` with the price
/// as a JSON number; this is the format of the local cart mirror.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Product identifier, unique within a cart.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price (non-negative).
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// Image reference (URL or path).
    pub image: String,
    /// Number of units, always at least 1 inside a [`Cart`].
    pub quantity: u32,
}

impl CartItem {
    /// `price * quantity` for this line.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        line_total(self.price, self.quantity)
    }
}

/// An ordered collection of cart lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from untrusted items, restoring the invariants.
    ///
    /// Items with quantity 0 are dropped. A repeated identifier folds into its
    /// first occurrence, summing quantities.
    #[must_use]
    pub fn from_items(items: impl IntoIterator<Item = CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            if item.quantity == 0 {
                continue;
            }
            match cart.position(item.id) {
                Some(index) => {
                    if let Some(existing) = cart.items.get_mut(index) {
                        existing.quantity = existing.quantity.saturating_add(item.quantity);
                    }
                }
                None => cart.items.push(item),
            }
        }
        cart
    }

    /// The lines, in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Consume the cart, returning its lines.
    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    /// Look up a line by product.
    #[must_use]
    pub fn get(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of quantities across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of `price * quantity` across all lines.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Add one unit of `product`.
    ///
    /// An existing line for the same product is incremented by exactly one and
    /// keeps its descriptive fields; otherwise a new line with quantity 1 is
    /// appended.
    pub fn add(&mut self, product: NewCartItem) {
        match self.items.iter_mut().find(|item| item.id == product.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(1),
            None => self.items.push(product.with_quantity(1)),
        }
    }

    /// Remove the line for `id`. Returns whether a line was removed.
    pub fn remove(&mut self, id: ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Set the quantity of the line for `id`.
    ///
    /// A quantity of zero or less removes the line; anything else is stored
    /// exactly (saturating at `u32::MAX`). Returns whether the cart changed.
    /// An unknown `id` leaves the cart untouched.
    pub fn set_quantity(&mut self, id: ProductId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove(id);
        }
        let quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) if item.quantity != quantity => {
                item.quantity = quantity;
                true
            }
            _ => false,
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Merge a locally persisted cart with the remote one.
    ///
    /// For products present on both sides the local line wins on descriptive
    /// fields and the larger quantity is kept. Products present on one side
    /// only are taken unchanged. Local lines come first in local order,
    /// followed by remote-only lines in remote order.
    ///
    /// `merge(x, x) == x`, and merging a result again with either input
    /// changes nothing.
    #[must_use]
    pub fn merge(local: &Self, remote: &Self) -> Self {
        let remote_by_id: HashMap<ProductId, &CartItem> =
            remote.items.iter().map(|item| (item.id, item)).collect();

        let mut merged: Vec<CartItem> = local
            .items
            .iter()
            .map(|item| match remote_by_id.get(&item.id) {
                Some(theirs) => CartItem {
                    quantity: item.quantity.max(theirs.quantity),
                    ..item.clone()
                },
                None => item.clone(),
            })
            .collect();

        merged.extend(
            remote
                .items
                .iter()
                .filter(|item| local.get(item.id).is_none())
                .cloned(),
        );

        Self { items: merged }
    }

    fn position(&self, id: ProductId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }
}

impl<'de> Deserialize<'de> for Cart {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Vec::<CartItem>::deserialize(deserializer).map(Self::from_items)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn product(id: i64, price: i64) -> NewCartItem {
        NewCartItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::from(price),
            image: format!("/img/{id}.png"),
        }
    }

    fn line(id: i64, quantity: u32) -> CartItem {
        product(id, 1).with_quantity(quantity)
    }

    #[test]
    fn test_widget_scenario() {
        let widget = NewCartItem {
            id: ProductId::new(7),
            name: "Widget".to_string(),
            price: Decimal::from(10),
            image: "x".to_string(),
        };

        let mut cart = Cart::new();
        cart.add(widget.clone());
        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_price(), Decimal::from(10));

        cart.add(widget);
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_price(), Decimal::from(20));
        assert_eq!(cart.len(), 1);

        assert!(cart.set_quantity(ProductId::new(7), 0));
        assert_eq!(cart.len(), 0);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_existing_keeps_original_fields() {
        let mut cart = Cart::new();
        cart.add(product(1, 5));
        let mut renamed = product(1, 99);
        renamed.name = "Renamed".to_string();
        cart.add(renamed);

        let item = cart.get(ProductId::new(1)).unwrap();
        assert_eq!(item.quantity, 2);
        assert_eq!(item.name, "Product 1");
        assert_eq!(item.price, Decimal::from(5));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::from_items([line(1, 2)]);
        let before = cart.clone();
        assert!(!cart.remove(ProductId::new(9)));
        assert_eq!(cart, before);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = Cart::from_items([line(1, 2), line(2, 1)]);

        assert!(cart.set_quantity(ProductId::new(1), 5));
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity, 5);

        assert!(!cart.set_quantity(ProductId::new(1), 5));
        assert!(!cart.set_quantity(ProductId::new(3), 4));
        assert!(cart.get(ProductId::new(3)).is_none());

        assert!(cart.set_quantity(ProductId::new(2), -3));
        assert!(cart.get(ProductId::new(2)).is_none());
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut cart = Cart::from_items([line(1, 2), line(2, 3)]);
        cart.clear();
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.total_price(), Decimal::ZERO);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_from_items_restores_invariants() {
        let cart = Cart::from_items([line(1, 2), line(2, 0), line(1, 3), line(3, 1)]);
        let ids: Vec<i64> = cart.items().iter().map(|i| i.id.as_i64()).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(cart.get(ProductId::new(1)).unwrap().quantity, 5);
    }

    #[test]
    fn test_merge_takes_larger_quantity() {
        let local = Cart::from_items([line(1, 2)]);
        let remote = Cart::from_items([line(1, 5)]);
        let merged = Cart::merge(&local, &remote);
        assert_eq!(merged.items(), &[line(1, 5)]);
    }

    #[test]
    fn test_merge_keeps_one_sided_items() {
        let local = Cart::from_items([line(2, 1)]);
        let remote = Cart::from_items([line(4, 3)]);
        let merged = Cart::merge(&local, &remote);
        assert_eq!(merged.items(), &[line(2, 1), line(4, 3)]);
    }

    #[test]
    fn test_merge_prefers_local_descriptions() {
        let local = Cart::from_items([product(1, 10).with_quantity(1)]);
        let mut stale = product(1, 8).with_quantity(3);
        stale.name = "Old name".to_string();
        let merged = Cart::merge(&local, &Cart::from_items([stale]));

        let item = &merged.items()[0];
        assert_eq!(item.name, "Product 1");
        assert_eq!(item.price, Decimal::from(10));
        assert_eq!(item.quantity, 3);
    }

    #[test]
    fn test_merge_with_empty_sides() {
        let cart = Cart::from_items([line(1, 1), line(2, 2)]);
        assert_eq!(Cart::merge(&cart, &Cart::new()), cart);
        assert_eq!(Cart::merge(&Cart::new(), &cart), cart);
    }

    #[test]
    fn test_json_format() {
        let cart = Cart::from_items([NewCartItem {
            id: ProductId::new(7),
            name: "Widget".to_string(),
            price: Decimal::new(1050, 2),
            image: "x".to_string(),
        }
        .with_quantity(2)]);

        let json = serde_json::to_value(&cart).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"id": 7, "name": "Widget", "price": 10.5, "image": "x", "quantity": 2}
            ])
        );

        let parsed: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, cart);
    }

    #[test]
    fn test_json_rejects_negative_quantity() {
        let result = serde_json::from_str::<Cart>(
            r#"[{"id": 1, "name": "n", "price": 1, "image": "i", "quantity": -1}]"#,
        );
        assert!(result.is_err());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod proptests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    fn arb_product() -> impl Strategy<Value = NewCartItem> {
        (0i64..8, 0i64..10_000).prop_map(|(id, cents)| NewCartItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::new(cents, 2),
            image: String::new(),
        })
    }

    fn arb_cart() -> impl Strategy<Value = Cart> {
        prop::collection::vec((0i64..8, 1u32..20), 0..8).prop_map(|lines| {
            Cart::from_items(lines.into_iter().map(|(id, quantity)| CartItem {
                id: ProductId::new(id),
                name: format!("Product {id}"),
                price: Decimal::new(id * 100 + 99, 2),
                image: String::new(),
                quantity,
            }))
        })
    }

    fn assert_invariants(cart: &Cart) {
        let mut seen = HashSet::new();
        for item in cart.items() {
            assert!(item.quantity >= 1);
            assert!(seen.insert(item.id), "duplicate id {}", item.id);
        }
        let count: u64 = cart.items().iter().map(|i| u64::from(i.quantity)).sum();
        let total: Decimal = cart
            .items()
            .iter()
            .map(|i| i.price * Decimal::from(i.quantity))
            .sum();
        assert_eq!(cart.item_count(), count);
        assert_eq!(cart.total_price(), total);
    }

    proptest! {
        #[test]
        fn test_adds_count_every_call(products in prop::collection::vec(arb_product(), 0..40)) {
            let mut cart = Cart::new();
            for product in &products {
                cart.add(product.clone());
            }
            prop_assert_eq!(cart.item_count(), products.len() as u64);
            assert_invariants(&cart);
        }

        #[test]
        fn test_mutations_keep_invariants(
            start in arb_cart(),
            ops in prop::collection::vec((0u8..3, 0i64..8, -3i64..6), 0..30),
        ) {
            let mut cart = start;
            for (op, id, quantity) in ops {
                let id = ProductId::new(id);
                match op {
                    0 => cart.add(NewCartItem {
                        id,
                        name: String::new(),
                        price: Decimal::ONE,
                        image: String::new(),
                    }),
                    1 => { cart.remove(id); }
                    _ => {
                        let present = cart.get(id).is_some();
                        cart.set_quantity(id, quantity);
                        if present && quantity >= 1 {
                            prop_assert_eq!(cart.get(id).map(|i| i.quantity), Some(quantity as u32));
                        } else {
                            prop_assert!(cart.get(id).is_none() || !present);
                        }
                    }
                }
                assert_invariants(&cart);
            }
        }

        #[test]
        fn test_merge_is_idempotent(local in arb_cart(), remote in arb_cart()) {
            prop_assert_eq!(Cart::merge(&local, &local), local.clone());

            let merged = Cart::merge(&local, &remote);
            assert_invariants(&merged);
            prop_assert_eq!(Cart::merge(&merged, &merged), merged.clone());
            prop_assert_eq!(Cart::merge(&merged, &remote), merged.clone());
        }

        #[test]
        fn test_merge_quantities_are_maxima(local in arb_cart(), remote in arb_cart()) {
            let merged = Cart::merge(&local, &remote);
            for item in merged.items() {
                let l = local.get(item.id).map_or(0, |i| i.quantity);
                let r = remote.get(item.id).map_or(0, |i| i.quantity);
                prop_assert_eq!(item.quantity, l.max(r));
            }
            prop_assert_eq!(
                merged.len(),
                local.items().iter().map(|i| i.id)
                    .chain(remote.items().iter().map(|i| i.id))
                    .collect::<HashSet<_>>()
                    .len()
            );
        }
    }
}
