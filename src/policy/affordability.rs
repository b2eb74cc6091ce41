use tracing::debug;

use super::{FundsQuery, PaymentHook, Receipt, Route, TransferPolicy};
use crate::{Item, Price};

/// Admits an item only while the funds query covers its base price.
///
/// An item leaving the container for another one is paid for through the
/// spend callback; an item arriving from another container is refunded
/// through the refund callback. Both use the base price. The funds belong to
/// an external wallet reached only through the injected callbacks; the
/// container keeps no balance of its own.
pub struct AffordabilityGate {
    funds: FundsQuery,
    spend: Option<PaymentHook>,
    refund: Option<PaymentHook>,
}

impl AffordabilityGate {
    pub fn new(funds: impl Fn() -> Price + 'static) -> Self {
        Self {
            funds: Box::new(funds),
            spend: None,
            refund: None,
        }
    }

    /// Callback charged when an item leaves for another container.
    pub fn on_spend(mut self, spend: impl FnMut(Price) + 'static) -> Self {
        self.spend = Some(Box::new(spend));
        self
    }

    /// Callback credited when an item arrives from another container.
    pub fn on_refund(mut self, refund: impl FnMut(Price) + 'static) -> Self {
        self.refund = Some(Box::new(refund));
        self
    }

    pub fn funds(&self) -> Price {
        (self.funds)()
    }
}

impl TransferPolicy for AffordabilityGate {
    fn can_receive_item(&self, item: &Item, _route: Route) -> bool {
        self.funds() >= item.price()
    }

    fn on_item_moved_away(&mut self, item: &Item, _index: usize, route: Route) {
        if let Some(spend) = self.spend.as_mut() {
            debug!(item = item.id(), price = %item.price(), destination = route.destination, "spend");
            spend(item.price());
        }
    }

    fn on_item_received(&mut self, item: &Item, _index: usize, route: Route) -> Receipt {
        if let Some(refund) = self.refund.as_mut() {
            debug!(item = item.id(), price = %item.price(), source = route.source, "refund");
            refund(item.price());
        }
        Receipt::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Container;
    use crate::container::tests::{item, notifications};
    use crate::container::{TransferError, TransferOp};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    // test utils

    type Payments = Rc<RefCell<Vec<(&'static str, Price)>>>;

    fn gated(capacity: usize, funds: u32, payments: &Payments) -> Container<AffordabilityGate> {
        let spent = Rc::clone(payments);
        let refunded = Rc::clone(payments);
        let policy = AffordabilityGate::new(move || Price::new(funds))
            .on_spend(move |price| spent.borrow_mut().push(("spend", price)))
            .on_refund(move |price| refunded.borrow_mut().push(("refund", price)));
        Container::with_policy(capacity, policy)
    }

    #[test]
    fn insufficient_funds_refuses_item_without_payments() {
        let payments = Payments::default();
        let mut bag = Container::from_items(vec![Some(item("armor", 15))]);
        let mut gate = gated(3, 10, &payments);
        let (calls, _sub) = notifications(&gate);

        assert_eq!(
            bag.move_item(&mut gate, 0, 0),
            Err(TransferError::ReceiveRejected(
                TransferOp::Move,
                gate.id(),
                "armor".to_string()
            ))
        );
        assert!(payments.borrow().is_empty());
        assert_eq!(bag.count(), 1);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn exact_funds_are_enough() {
        let payments = Payments::default();
        let mut bag = Container::from_items(vec![Some(item("armor", 15))]);
        let mut gate = gated(3, 15, &payments);

        assert_eq!(bag.move_to_first_empty_slot(&mut gate, 0), Ok(0));
        assert_eq!(*payments.borrow(), vec![("refund", Price::new(15))]);
    }

    #[test]
    fn item_leaving_spends_base_price() {
        let payments = Payments::default();
        let mut gate = gated(2, 0, &payments);
        gate.set(1, Some(item("ring", 40).with_discount(Price::new(5))))
            .unwrap();
        let mut bag = Container::new(2);

        gate.move_item(&mut bag, 1, 0).unwrap();

        assert_eq!(*payments.borrow(), vec![("spend", Price::new(40))]);
    }

    #[test]
    fn swap_spends_and_refunds_per_direction() {
        let payments = Payments::default();
        let mut gate = gated(1, 100, &payments);
        gate.set(0, Some(item("ring", 40))).unwrap();
        let mut bag = Container::from_items(vec![Some(item("axe", 25))]);

        bag.move_item(&mut gate, 0, 0).unwrap();

        assert_eq!(
            *payments.borrow(),
            vec![("refund", Price::new(25)), ("spend", Price::new(40))]
        );
        assert_eq!(bag.get(0), Some(&item("ring", 40)));
    }

    #[test]
    fn internal_moves_skip_payments() {
        let payments = Payments::default();
        let mut gate = gated(2, 100, &payments);
        gate.set(0, Some(item("ring", 40))).unwrap();

        gate.move_within(0, 1).unwrap();

        assert!(payments.borrow().is_empty());
    }

    #[test]
    fn funds_are_queried_on_every_check() {
        let funds = Rc::new(Cell::new(Price::new(5)));
        let policy = {
            let funds = Rc::clone(&funds);
            AffordabilityGate::new(move || funds.get())
        };
        let mut gate = Container::with_policy(2, policy);
        let mut bag = Container::from_items(vec![Some(item("axe", 25))]);

        assert!(bag.move_item(&mut gate, 0, 0).is_err());
        funds.set(Price::new(30));
        assert_eq!(gate.policy().funds(), Price::new(30));
        bag.move_item(&mut gate, 0, 0).unwrap();
    }

    #[test]
    fn missing_callbacks_are_skipped() {
        let mut gate = Container::with_policy(1, AffordabilityGate::new(|| Price::new(50)));
        let mut bag = Container::from_items(vec![Some(item("axe", 25))]);

        bag.move_item(&mut gate, 0, 0).unwrap();
        gate.move_item(&mut bag, 0, 0).unwrap();
        assert_eq!(bag.count(), 1);
    }
}
