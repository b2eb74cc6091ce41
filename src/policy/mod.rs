//! Transfer policies.
//!
//! A policy decides whether an item may leave or enter a container and reacts
//! after a cross-container transfer has been committed. The transfer engine
//! only ever talks to containers through [`TransferPolicy`]; concrete
//! behaviors (affordability checks, shops, selling) are policies chosen when
//! the container is built.

use crate::Item;
use crate::container::ContainerId;
use crate::price::Price;

mod affordability;
mod selling;
mod shop;

pub use affordability::AffordabilityGate;
pub use selling::{SellingContainer, SellingSink};
pub use shop::{ShopContainer, ShopPolicy};

/// Returns the funds currently available to the owner of a container.
pub type FundsQuery = Box<dyn Fn() -> Price>;

/// Receives an amount to spend, refund or credit.
pub type PaymentHook = Box<dyn FnMut(Price)>;

/// Logical direction of a transfer: which container the item leaves and
/// which one it enters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub source: ContainerId,
    pub destination: ContainerId,
}

impl Route {
    pub fn new(source: ContainerId, destination: ContainerId) -> Self {
        Self {
            source,
            destination,
        }
    }

    /// The item stays inside a single container.
    pub fn is_internal(&self) -> bool {
        self.source == self.destination
    }

    /// Route of the displaced item in a swap.
    pub fn reversed(self) -> Self {
        Self {
            source: self.destination,
            destination: self.source,
        }
    }
}

/// What the receiving container does with an item once it has landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Receipt {
    /// Item stays in the slot it was written to.
    #[default]
    Keep,
    /// Item is discarded; the engine clears the slot before notifying.
    Consume,
}

/// Hooks consulted by the transfer engine.
///
/// Every method has an accept-all / no-op default. The `can_*` gates run
/// before any slot is written; the `on_*` callbacks run only after a
/// cross-container transfer has been committed and before change
/// notifications fire.
pub trait TransferPolicy {
    /// Gate evaluated on the destination container.
    fn can_receive_item(&self, _item: &Item, _route: Route) -> bool {
        true
    }

    /// Gate evaluated on the source container.
    fn can_send_item(&self, _item: &Item, _route: Route) -> bool {
        true
    }

    /// Called on the container `item` left, `index` being the slot it
    /// occupied there.
    fn on_item_moved_away(&mut self, _item: &Item, _index: usize, _route: Route) {}

    /// Called on the container `item` entered, `index` being the slot it was
    /// written to.
    fn on_item_received(&mut self, _item: &Item, _index: usize, _route: Route) -> Receipt {
        Receipt::Keep
    }
}

/// Policy of a plain container: accepts and sends everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct Open;

impl TransferPolicy for Open {}

impl<P: TransferPolicy + ?Sized> TransferPolicy for Box<P> {
    fn can_receive_item(&self, item: &Item, route: Route) -> bool {
        (**self).can_receive_item(item, route)
    }

    fn can_send_item(&self, item: &Item, route: Route) -> bool {
        (**self).can_send_item(item, route)
    }

    fn on_item_moved_away(&mut self, item: &Item, index: usize, route: Route) {
        (**self).on_item_moved_away(item, index, route)
    }

    fn on_item_received(&mut self, item: &Item, index: usize, route: Route) -> Receipt {
        (**self).on_item_received(item, index, route)
    }
}
