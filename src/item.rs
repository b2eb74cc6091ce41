//! Item values stored in container slots.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Price;

/// Opaque item key.
pub type ItemId = String;

/// An item that can occupy a single slot.
///
/// Items are plain owned values: a slot owns the item it holds, so moving an
/// item between slots moves ownership and no container ever duplicates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    id: ItemId,
    price: Price,
    /// Discounted price, present only while the item is on sale.
    discount: Option<Price>,
}

impl Item {
    pub fn new(id: impl Into<ItemId>, price: Price) -> Self {
        Self {
            id: id.into(),
            price,
            discount: None,
        }
    }

    /// Mark the item as discounted to `price`.
    pub fn with_discount(mut self, price: Price) -> Self {
        self.discount = Some(price);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Base price, ignoring any discount.
    pub fn price(&self) -> Price {
        self.price
    }

    pub fn is_discounted(&self) -> bool {
        self.discount.is_some()
    }

    pub fn discounted_price(&self) -> Option<Price> {
        self.discount
    }

    /// Price used for purchase logic: the discounted price when discounted,
    /// otherwise the base price.
    pub fn effective_price(&self) -> Price {
        self.discount.unwrap_or(self.price)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
