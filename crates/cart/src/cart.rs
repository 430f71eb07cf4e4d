//! Cart model: line items and the ordered collection that owns them.
//!
//! Everything here is synchronous and free of I/O. The [`CartStore`] task is
//! the only owner that mutates a [`Cart`]; consumers see it behind an `Arc`.
//!
//! [`CartStore`]: crate::CartStore

use std::collections::HashSet;

use marketplace_core::{Price, ProductId, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One product in the cart together with how many units were added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Catalog product ID, unique within a cart.
    pub id: ProductId,
    /// Product title as listed when first added.
    pub title: String,
    /// Product image URL as listed when first added.
    pub image_url: String,
    /// Unit price as listed when first added.
    pub price: Price,
    /// Units in the cart, never zero while the item is in a cart.
    pub quantity: Quantity,
}

impl LineItem {
    /// Price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.times(self.quantity)
    }
}

/// A product offered to [`Cart::add`], before it has a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
    pub id: ProductId,
    pub title: String,
    pub image_url: String,
    pub price: Price,
}

impl NewLineItem {
    fn into_line_item(self) -> LineItem {
        LineItem {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity: Quantity::ONE,
        }
    }
}

/// What [`Cart::add`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The product was new and was appended with quantity 1.
    Appended,
    /// The product was already present and its quantity went up by one.
    Incremented,
}

/// What [`Cart::decrement`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecrementOutcome {
    /// No line item has that ID.
    NotFound,
    /// The quantity went down and the item is still in the cart.
    Decremented,
    /// The quantity reached zero and the item was removed.
    Removed,
}

/// Ordered collection of line items, in the order they were first added.
///
/// Invariants:
/// - no two items share an `id`
/// - no item has a zero quantity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<LineItem>,
}

impl Cart {
    /// Build a cart from a previously stored sequence.
    ///
    /// Records written by older builds could hold zero-quantity entries, and a
    /// hand-edited record could repeat an ID. Both are dropped (the first
    /// occurrence of an ID wins). Returns the cart and the number of entries
    /// that were discarded.
    #[must_use]
    pub fn from_stored(stored: Vec<LineItem>) -> (Self, usize) {
        let total = stored.len();
        let mut seen = HashSet::with_capacity(total);
        let items: Vec<LineItem> = stored
            .into_iter()
            .filter(|item| !item.quantity.is_zero())
            .filter(|item| seen.insert(item.id.clone()))
            .collect();
        let discarded = total - items.len();
        (Self { items }, discarded)
    }

    /// Add a product.
    ///
    /// An already present product is incremented as-is; the title, image and
    /// price on `item` are ignored in that case.
    pub fn add(&mut self, item: NewLineItem) -> AddOutcome {
        if self.increment(&item.id) {
            AddOutcome::Incremented
        } else {
            self.items.push(item.into_line_item());
            AddOutcome::Appended
        }
    }

    /// Add one unit of `id`. Returns `false` if no line item has that ID.
    pub fn increment(&mut self, id: &ProductId) -> bool {
        match self.items.iter_mut().find(|item| &item.id == id) {
            Some(item) => {
                item.quantity = item.quantity.incremented();
                true
            }
            None => false,
        }
    }

    /// Remove one unit of `id`, dropping the line item when none are left.
    pub fn decrement(&mut self, id: &ProductId) -> DecrementOutcome {
        let Some(item) = self.items.iter_mut().find(|item| &item.id == id) else {
            return DecrementOutcome::NotFound;
        };
        item.quantity = item.quantity.decremented();
        if item.quantity.is_zero() {
            self.items.retain(|item| !item.quantity.is_zero());
            DecrementOutcome::Removed
        } else {
            DecrementOutcome::Decremented
        }
    }

    /// Look up a line item by product ID.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LineItem> {
        self.items.iter()
    }

    /// Number of distinct products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of all quantities.
    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.items
            .iter()
            .map(|item| u64::from(item.quantity.get()))
            .sum()
    }

    /// Sum of all line totals.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.line_total()))
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a LineItem;
    type IntoIter = std::slice::Iter<'a, LineItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
