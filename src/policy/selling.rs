use std::collections::HashSet;

use tracing::debug;

use super::{PaymentHook, Receipt, Route, TransferPolicy};
use crate::container::{Container, ContainerId};
use crate::{Item, Price};

/// Container that turns every received item into money.
pub type SellingContainer = Container<SellingSink>;

type PriceFn = Box<dyn Fn(&Item) -> Price>;
type SoldHook = Box<dyn FnMut(&Item)>;

/// Currency sink.
///
/// Accepts anything, pays for it through the add-money callback and discards
/// it before listeners are notified, so a sold item is never visible as
/// content. Nothing ever leaves a selling container.
#[derive(Default)]
pub struct SellingSink {
    price: Option<PriceFn>,
    add_money: Option<PaymentHook>,
    sold: Option<SoldHook>,
    watched: HashSet<ContainerId>,
}

impl SellingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the sale price. Defaults to the item's effective price.
    pub fn with_price(mut self, price: impl Fn(&Item) -> Price + 'static) -> Self {
        self.price = Some(Box::new(price));
        self
    }

    /// Callback credited with the sale price of every item received.
    pub fn on_add_money(mut self, add_money: impl FnMut(Price) + 'static) -> Self {
        self.add_money = Some(Box::new(add_money));
        self
    }

    /// Callback handed each sold item right before it is discarded.
    pub fn on_sold(mut self, sold: impl FnMut(&Item) + 'static) -> Self {
        self.sold = Some(Box::new(sold));
        self
    }

    /// Offer price previews for items held by `source`.
    pub fn watch(&mut self, source: ContainerId) {
        self.watched.insert(source);
    }

    pub fn unwatch(&mut self, source: ContainerId) {
        self.watched.remove(&source);
    }

    pub fn is_watching(&self, source: ContainerId) -> bool {
        self.watched.contains(&source)
    }

    /// Price this sink pays for `item`.
    pub fn price_of(&self, item: &Item) -> Price {
        match &self.price {
            Some(price) => price(item),
            None => item.effective_price(),
        }
    }

    /// Sale price preview for an item held by `source`, offered only for
    /// watched containers.
    pub fn quote(&self, source: ContainerId, item: &Item) -> Option<Price> {
        self.is_watching(source).then(|| self.price_of(item))
    }
}

impl TransferPolicy for SellingSink {
    fn can_send_item(&self, _item: &Item, _route: Route) -> bool {
        false
    }

    fn on_item_received(&mut self, item: &Item, index: usize, route: Route) -> Receipt {
        let price = self.price_of(item);
        debug!(item = item.id(), %price, index, seller = route.source, "item sold");

        if let Some(add_money) = self.add_money.as_mut() {
            add_money(price);
        }
        if let Some(sold) = self.sold.as_mut() {
            sold(item);
        }

        Receipt::Consume
    }
}

/// Price preview of a slot's content
impl SellingContainer {
    /// Sale price of the item in slot `index` of `source`, if `source` is
    /// watched and the slot occupied.
    pub fn quote_slot<Q: TransferPolicy>(&self, source: &Container<Q>, index: usize) -> Option<Price> {
        let item = source.get(index)?;
        self.policy().quote(source.id(), item)
    }
}
