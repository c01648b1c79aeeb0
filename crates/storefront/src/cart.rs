//! In-memory shopping cart.
//!
//! [`CartStore`] owns the line items for one front end. Lines are unique per
//! product and always carry a quantity of at least one; dropping a quantity
//! to zero removes the line. A new process starts with an empty cart.

use shopfront_core::{Money, ProductId};

use crate::api::Product;

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Money,
    /// Always at least 1.
    pub quantity: u32,
    pub image_ref: Option<String>,
    pub description: String,
}

impl CartLine {
    /// Unit price times quantity, exact.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

impl From<&Product> for CartLine {
    fn from(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
            image_ref: product.image_url.clone(),
            description: product.description.clone(),
        }
    }
}

/// The cart. Lines keep insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartStore {
    lines: Vec<CartLine>,
}

impl CartStore {
    #[must_use]
    pub const fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Add one unit of `product`, merging with an existing line.
    pub fn add_item(&mut self, product: &Product) {
        if let Some(line) = self.line_mut(product.id) {
            line.quantity = line.quantity.saturating_add(1);
        } else {
            self.lines.push(CartLine::from(product));
        }
        tracing::debug!(product_id = %product.id, "Added item to cart");
    }

    /// Remove a product's line. No-op if absent.
    pub fn remove_item(&mut self, product_id: ProductId) {
        self.lines.retain(|line| line.product_id != product_id);
    }

    /// Set a line's quantity. `quantity <= 0` removes the line; an unknown
    /// product is ignored.
    pub fn set_quantity(&mut self, product_id: ProductId, quantity: i64) {
        if quantity <= 0 {
            self.remove_item(product_id);
            return;
        }
        if let Some(line) = self.line_mut(product_id) {
            line.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
    }

    /// Remove every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of unit price times quantity over all lines.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Total number of units (for a cart badge).
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.iter().map(|line| u64::from(line.quantity)).sum()
    }

    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| line.product_id == product_id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    fn line_mut(&mut self, product_id: ProductId) -> Option<&mut CartLine> {
        self.lines
            .iter_mut()
            .find(|line| line.product_id == product_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn product(id: i64, price: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            description: String::new(),
            price: Money::parse(price).unwrap(),
            stock: 10,
            image_url: None,
            category: Some("accessories".to_string()),
        }
    }

    #[test]
    fn test_add_item_merges_lines() {
        let mut cart = CartStore::new();
        let mouse = product(1, "20.00");
        cart.add_item(&mouse);
        cart.add_item(&mouse);

        assert_eq!(cart.lines().len(), 1);
        assert_eq!(cart.line(mouse.id).unwrap().quantity, 2);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = CartStore::new();
        let mouse = product(1, "20.00");
        cart.add_item(&mouse);

        cart.set_quantity(mouse.id, 5);
        assert_eq!(cart.line(mouse.id).unwrap().quantity, 5);

        cart.set_quantity(mouse.id, 0);
        assert!(cart.is_empty());

        cart.add_item(&mouse);
        cart.set_quantity(mouse.id, -3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_unknown_product_is_ignored() {
        let mut cart = CartStore::new();
        cart.set_quantity(ProductId::new(99), 3);
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_item_absent_is_noop() {
        let mut cart = CartStore::new();
        cart.add_item(&product(1, "1.00"));
        cart.remove_item(ProductId::new(2));
        assert_eq!(cart.lines().len(), 1);
    }

    #[test]
    fn test_subtotal() {
        let mut cart = CartStore::new();
        assert_eq!(cart.subtotal(), Money::ZERO);

        let mouse = product(1, "20.00");
        cart.add_item(&mouse);
        cart.add_item(&mouse);
        cart.add_item(&product(2, "5.50"));
        assert_eq!(cart.subtotal(), Money::parse("45.50").unwrap());

        cart.clear();
        assert_eq!(cart.subtotal(), Money::ZERO);
        assert_eq!(cart.item_count(), 0);
    }

    #[test]
    fn test_lines_keep_insertion_order() {
        let mut cart = CartStore::new();
        cart.add_item(&product(3, "1.00"));
        cart.add_item(&product(1, "1.00"));
        cart.add_item(&product(3, "1.00"));

        let ids: Vec<i64> = cart.lines().iter().map(|l| l.product_id.as_i64()).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn test_invariants_hold_under_mixed_operations() {
        let products: Vec<Product> = (1..=4).map(|id| product(id, "3.10")).collect();
        let mut cart = CartStore::new();

        // Small LCG so the sequence is deterministic.
        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            seed = seed
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            seed >> 33
        };

        for _ in 0..500 {
            let pick = &products[usize::try_from(next() % 4).unwrap()];
            match next() % 4 {
                0 | 1 => cart.add_item(pick),
                2 => cart.remove_item(pick.id),
                _ => cart.set_quantity(pick.id, i64::try_from(next() % 7).unwrap() - 2),
            }

            let ids: HashSet<ProductId> = cart.lines().iter().map(|l| l.product_id).collect();
            assert_eq!(ids.len(), cart.lines().len());
            assert!(cart.lines().iter().all(|l| l.quantity >= 1));

            let expected: u64 = cart.lines().iter().map(|l| u64::from(l.quantity)).sum();
            assert_eq!(cart.item_count(), expected);
        }
    }
}
