use tracing::debug;

use super::{FundsQuery, PaymentHook, Receipt, Route, TransferPolicy};
use crate::container::{Container, SlotError};
use crate::{Item, Price};

/// Container whose items are bought and sold at their effective price.
pub type ShopContainer = Container<ShopPolicy>;

/// Shop shelves: items move only when the funds query covers their effective
/// (discount-aware) price. Sending within the shop itself skips the check;
/// receiving never does.
///
/// Selling an item to the buyer charges the spend callback, taking an item
/// back credits the refund callback. The policy also carries the shop's
/// per-slot lock flags, which are informational only and never consulted
/// by transfers.
pub struct ShopPolicy {
    funds: FundsQuery,
    spend: Option<PaymentHook>,
    refund: Option<PaymentHook>,
    locked: Vec<bool>,
}

impl ShopPolicy {
    pub fn new(funds: impl Fn() -> Price + 'static) -> Self {
        Self {
            funds: Box::new(funds),
            spend: None,
            refund: None,
            locked: Vec::new(),
        }
    }

    /// Callback charged when an item leaves the shop.
    pub fn on_spend(mut self, spend: impl FnMut(Price) + 'static) -> Self {
        self.spend = Some(Box::new(spend));
        self
    }

    /// Callback credited when an item is handed back to the shop.
    pub fn on_refund(mut self, refund: impl FnMut(Price) + 'static) -> Self {
        self.refund = Some(Box::new(refund));
        self
    }

    fn affords(&self, item: &Item) -> bool {
        (self.funds)() >= item.effective_price()
    }
}

impl TransferPolicy for ShopPolicy {
    fn can_receive_item(&self, item: &Item, _route: Route) -> bool {
        self.affords(item)
    }

    fn can_send_item(&self, item: &Item, route: Route) -> bool {
        route.is_internal() || self.affords(item)
    }

    fn on_item_moved_away(&mut self, item: &Item, _index: usize, route: Route) {
        if let Some(spend) = self.spend.as_mut() {
            debug!(item = item.id(), price = %item.effective_price(), buyer = route.destination, "item bought");
            spend(item.effective_price());
        }
    }

    fn on_item_received(&mut self, item: &Item, _index: usize, route: Route) -> Receipt {
        if let Some(refund) = self.refund.as_mut() {
            debug!(item = item.id(), price = %item.effective_price(), seller = route.source, "item returned");
            refund(item.effective_price());
        }
        Receipt::Keep
    }
}

/// Shop construction and slot locks
impl ShopContainer {
    /// Create a shop. Swapping with other containers is disabled so a
    /// vacated shelf is never refilled from the buyer's side.
    pub fn new_shop(capacity: usize, policy: ShopPolicy) -> Self {
        let mut shop = Container::with_policy(capacity, policy);
        shop.flags_mut().allow_external_swap = false;
        shop.policy_mut().locked = vec![false; capacity];
        shop
    }

    /// Lock or unlock slot `index` and notify listeners.
    pub fn set_locked(&mut self, index: usize, locked: bool) -> Result<(), SlotError> {
        if !self.is_index_valid(index) {
            return Err(SlotError::IndexOutOfRange {
                index,
                capacity: self.capacity(),
            });
        }

        let capacity = self.capacity();
        let flags = &mut self.policy_mut().locked;
        if flags.len() != capacity {
            flags.resize(capacity, false);
        }
        flags[index] = locked;

        debug!(container = self.id(), index, locked, "slot lock toggled");
        self.notify();
        Ok(())
    }

    pub fn is_locked(&self, index: usize) -> bool {
        self.policy().locked.get(index).copied().unwrap_or(false)
    }

    /// Indices of every locked slot, ascending.
    pub fn locked_indices(&self) -> Vec<usize> {
        self.policy()
            .locked
            .iter()
            .enumerate()
            .filter_map(|(index, locked)| locked.then_some(index))
            .collect()
    }
}
