//! Scripted play session.
//!
//! A session wires the core containers together the way a game screen does:
//! the player's bag, a shop and a sell box, all paying into one wallet. It
//! also owns the drag-and-drop composition that sits outside the transfer
//! engine: the dragged slot is explicit command data and a failed drop falls
//! back to the first empty slot.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_stream::{Stream, StreamExt};
use tracing::info;

use crate::container::{Container, SlotError, TransferError};
use crate::policy::{SellingContainer, SellingSink, ShopContainer, ShopPolicy};
use crate::{Item, Price};

/// Containers of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainerName {
    Bag,
    Shop,
    SellBox,
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ContainerName::Bag => "bag",
            ContainerName::Shop => "shop",
            ContainerName::SellBox => "sell_box",
        })
    }
}

/// A slot addressed by container name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
    pub container: ContainerName,
    pub index: usize,
}

impl SlotRef {
    pub fn new(container: ContainerName, index: usize) -> Self {
        Self { container, index }
    }
}

/// An action performed on a session.
#[derive(Debug, Clone)]
pub enum Command {
    /// Set the wallet balance.
    Fund { amount: Price },
    /// Put an item in the first empty slot of a container.
    Stock {
        container: ContainerName,
        item: Item,
    },
    /// Move or swap an item onto a specific slot.
    Move { from: SlotRef, to: SlotRef },
    /// Move an item into the first empty slot of a container.
    QuickMove { from: SlotRef, to: ContainerName },
    /// Drop a dragged item onto a slot; if that move is refused, retry into
    /// the first empty slot of the target container.
    Drop { dragged: SlotRef, target: SlotRef },
    /// Drop a dragged item onto a container's free area.
    DropOnContainer {
        dragged: SlotRef,
        target: ContainerName,
    },
    /// Lock or unlock a shop slot.
    Lock { slot: SlotRef, locked: bool },
    /// Discard the item in a slot.
    Remove { slot: SlotRef },
    /// Empty a container.
    Clear { container: ContainerName },
}

impl Command {
    fn kind(&self) -> &'static str {
        match self {
            Command::Fund { .. } => "fund",
            Command::Stock { .. } => "stock",
            Command::Move { .. } => "move",
            Command::QuickMove { .. } => "quick move",
            Command::Drop { .. } => "drop",
            Command::DropOnContainer { .. } => "drop on container",
            Command::Lock { .. } => "lock",
            Command::Remove { .. } => "remove",
            Command::Clear { .. } => "clear",
        }
    }
}

/// Error returned by [`Session::apply`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("{0}")]
    Slot(#[from] SlotError),

    #[error("{0}")]
    Transfer(#[from] TransferError),

    #[error("{0} has no slot locks")]
    NotLockable(ContainerName),
}

/// Capacities and starting balance of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub bag_capacity: usize,
    pub shop_capacity: usize,
    pub sell_box_capacity: usize,
    pub starting_funds: Price,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            bag_capacity: 8,
            shop_capacity: 5,
            sell_box_capacity: 1,
            starting_funds: Price::ZERO,
        }
    }
}

/// A slot holding an item, as reported by [`Session::occupied_slots`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotView<'a> {
    pub container: ContainerName,
    pub index: usize,
    pub item: &'a Item,
    pub locked: bool,
}

/// Run `$body` with `$c` bound to the named container.
macro_rules! with_container {
    ($session:expr, $name:expr, |$c:ident| $body:expr) => {
        match $name {
            ContainerName::Bag => {
                let $c = &mut $session.bag;
                $body
            }
            ContainerName::Shop => {
                let $c = &mut $session.shop;
                $body
            }
            ContainerName::SellBox => {
                let $c = &mut $session.sell_box;
                $body
            }
        }
    };
}

/// Run `$cross` with `$src`/`$dst` bound to two different containers, or
/// `$within` with `$c` bound to the single container when both names match.
macro_rules! with_pair {
    ($session:expr, $from:expr, $to:expr, |$src:ident, $dst:ident| $cross:expr, |$c:ident| $within:expr) => {{
        use ContainerName::{Bag, SellBox, Shop};
        let session = $session;
        match ($from, $to) {
            (Bag, Bag) => {
                let $c = &mut session.bag;
                $within
            }
            (Shop, Shop) => {
                let $c = &mut session.shop;
                $within
            }
            (SellBox, SellBox) => {
                let $c = &mut session.sell_box;
                $within
            }
            (Bag, Shop) => {
                let ($src, $dst) = (&mut session.bag, &mut session.shop);
                $cross
            }
            (Bag, SellBox) => {
                let ($src, $dst) = (&mut session.bag, &mut session.sell_box);
                $cross
            }
            (Shop, Bag) => {
                let ($src, $dst) = (&mut session.shop, &mut session.bag);
                $cross
            }
            (Shop, SellBox) => {
                let ($src, $dst) = (&mut session.shop, &mut session.sell_box);
                $cross
            }
            (SellBox, Bag) => {
                let ($src, $dst) = (&mut session.sell_box, &mut session.bag);
                $cross
            }
            (SellBox, Shop) => {
                let ($src, $dst) = (&mut session.sell_box, &mut session.shop);
                $cross
            }
        }
    }};
}

/// A bag, a shop and a sell box sharing one wallet.
///
/// Buying from the shop spends from the wallet, handing an item back to the
/// shop refunds it, and selling through the sell box credits it. The sell
/// box refuses items coming straight from the shop and quotes prices for
/// items in the bag.
pub struct Session {
    wallet: Rc<Cell<Price>>,
    bag: Container,
    shop: ShopContainer,
    sell_box: SellingContainer,
}

/// Public API
impl Session {
    pub fn new(config: SessionConfig) -> Self {
        let wallet = Rc::new(Cell::new(config.starting_funds));

        let shop_policy = {
            let funds = Rc::clone(&wallet);
            let spend = Rc::clone(&wallet);
            let refund = Rc::clone(&wallet);
            ShopPolicy::new(move || funds.get())
                .on_spend(move |price| spend.set(spend.get().saturating_sub(price)))
                .on_refund(move |price| refund.set(refund.get().saturating_add(price)))
        };
        let sell_policy = {
            let earnings = Rc::clone(&wallet);
            SellingSink::new()
                .on_add_money(move |price| earnings.set(earnings.get().saturating_add(price)))
        };

        let bag = Container::new(config.bag_capacity);
        let shop = ShopContainer::new_shop(config.shop_capacity, shop_policy);
        let mut sell_box = Container::with_policy(config.sell_box_capacity, sell_policy);
        sell_box.disallow_source(shop.id());
        sell_box.policy_mut().watch(bag.id());

        Self {
            wallet,
            bag,
            shop,
            sell_box,
        }
    }

    /// Run the session with the given command stream
    pub async fn run(&mut self, mut commands: impl Stream<Item = Command> + Unpin) {
        while let Some(command) = commands.next().await {
            // a refused command must not stop the session
            let _ = self.apply(command);
        }
    }

    /// Apply a single command on top of the current session state
    pub fn apply(&mut self, command: Command) -> Result<(), SessionError> {
        let kind = command.kind();
        let result = self.dispatch(command);
        match &result {
            Ok(()) => info!(funds = %self.funds(), "{kind} applied"),
            Err(e) => info!(funds = %self.funds(), reason = %e, "{kind} skipped"),
        }
        result
    }

    pub fn funds(&self) -> Price {
        self.wallet.get()
    }

    pub fn bag(&self) -> &Container {
        &self.bag
    }

    pub fn shop(&self) -> &ShopContainer {
        &self.shop
    }

    pub fn sell_box(&self) -> &SellingContainer {
        &self.sell_box
    }

    /// Price the sell box would pay for the item in `slot`.
    pub fn quote(&self, slot: SlotRef) -> Option<Price> {
        match slot.container {
            ContainerName::Bag => self.sell_box.quote_slot(&self.bag, slot.index),
            ContainerName::Shop => self.sell_box.quote_slot(&self.shop, slot.index),
            ContainerName::SellBox => self.sell_box.quote_slot(&self.sell_box, slot.index),
        }
    }

    /// Every occupied slot: bag first, then shop, then sell box.
    pub fn occupied_slots(&self) -> Vec<SlotView<'_>> {
        let bag = self.bag.slots().iter().enumerate().map(|(index, slot)| {
            (ContainerName::Bag, index, slot, false)
        });
        let shop = self.shop.slots().iter().enumerate().map(|(index, slot)| {
            (ContainerName::Shop, index, slot, self.shop.is_locked(index))
        });
        let sell_box = self.sell_box.slots().iter().enumerate().map(|(index, slot)| {
            (ContainerName::SellBox, index, slot, false)
        });

        bag.chain(shop)
            .chain(sell_box)
            .filter_map(|(container, index, slot, locked)| {
                slot.as_ref().map(|item| SlotView {
                    container,
                    index,
                    item,
                    locked,
                })
            })
            .collect()
    }
}

/// Private API
impl Session {
    fn dispatch(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Fund { amount } => {
                self.wallet.set(amount);
            }
            Command::Stock { container, item } => {
                with_container!(self, container, |c| c.add(item))?;
            }
            Command::Move { from, to } => self.apply_move(from, to)?,
            Command::QuickMove { from, to } => self.apply_quick_move(from, to)?,
            Command::Drop { dragged, target } => self.apply_drop(dragged, target)?,
            Command::DropOnContainer { dragged, target } => {
                self.apply_drop_on_container(dragged, target)?
            }
            Command::Lock { slot, locked } => match slot.container {
                ContainerName::Shop => self.shop.set_locked(slot.index, locked)?,
                other => return Err(SessionError::NotLockable(other)),
            },
            Command::Remove { slot } => {
                with_container!(self, slot.container, |c| c.remove_at(slot.index))?;
            }
            Command::Clear { container } => with_container!(self, container, |c| c.clear()),
        }
        Ok(())
    }

    fn apply_move(&mut self, from: SlotRef, to: SlotRef) -> Result<(), TransferError> {
        with_pair!(
            self,
            from.container,
            to.container,
            |src, dst| src.move_item(dst, from.index, to.index),
            |c| c.move_within(from.index, to.index)
        )
    }

    fn apply_quick_move(&mut self, from: SlotRef, to: ContainerName) -> Result<(), TransferError> {
        with_pair!(
            self,
            from.container,
            to,
            |src, dst| src.move_to_first_empty_slot(dst, from.index).map(|_| ()),
            |c| c.move_to_first_empty_slot_within(from.index).map(|_| ())
        )
    }

    /// Apply a `Command::Drop`:
    /// - Try to move (or swap) onto the target slot
    /// - If refused, move into the first empty slot of the target container
    fn apply_drop(&mut self, dragged: SlotRef, target: SlotRef) -> Result<(), TransferError> {
        with_pair!(
            self,
            dragged.container,
            target.container,
            |src, dst| src
                .move_item(dst, dragged.index, target.index)
                .or_else(|_| src.move_to_first_empty_slot(dst, dragged.index).map(|_| ())),
            |c| c
                .move_within(dragged.index, target.index)
                .or_else(|_| c.move_to_first_empty_slot_within(dragged.index).map(|_| ()))
        )
    }

    /// Apply a `Command::DropOnContainer`:
    /// - Another container: move into its first empty slot
    /// - Same container: move to the earliest empty slot, but only if it
    ///   comes before the dragged slot; otherwise leave the item in place
    fn apply_drop_on_container(
        &mut self,
        dragged: SlotRef,
        target: ContainerName,
    ) -> Result<(), TransferError> {
        with_pair!(
            self,
            dragged.container,
            target,
            |src, dst| src.move_to_first_empty_slot(dst, dragged.index).map(|_| ()),
            |c| match c.first_empty_slot() {
                Some(empty) if empty < dragged.index => c.move_within(dragged.index, empty),
                _ => Ok(()),
            }
        )
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::TransferOp;

    // test utils

    fn item(id: &str, price: u32) -> Item {
        Item::new(id, Price::new(price))
    }

    fn slot(container: ContainerName, index: usize) -> SlotRef {
        SlotRef::new(container, index)
    }

    fn stock(container: ContainerName, item: Item) -> Command {
        Command::Stock { container, item }
    }

    fn fund(amount: u32) -> Command {
        Command::Fund {
            amount: Price::new(amount),
        }
    }

    use ContainerName::{Bag, SellBox, Shop};

    #[test]
    fn new_session() {
        let session = Session::default();
        assert_eq!(session.funds(), Price::ZERO);
        assert_eq!(session.bag().capacity(), 8);
        assert_eq!(session.shop().capacity(), 5);
        assert_eq!(session.sell_box().capacity(), 1);
        assert!(session.occupied_slots().is_empty());
    }

    #[test]
    fn starting_funds_come_from_config() {
        let session = Session::new(SessionConfig {
            starting_funds: Price::new(42),
            ..SessionConfig::default()
        });
        assert_eq!(session.funds(), Price::new(42));
    }

    // Buying and selling

    #[test]
    fn buying_spends_from_wallet() {
        let mut session = Session::default();
        session.apply(fund(100)).unwrap();
        session.apply(stock(Shop, item("sword", 60))).unwrap();

        session
            .apply(Command::Move {
                from: slot(Shop, 0),
                to: slot(Bag, 4),
            })
            .unwrap();

        assert_eq!(session.funds(), Price::new(40));
        assert_eq!(session.bag().get(4), Some(&item("sword", 60)));
    }

    #[test]
    fn buying_beyond_funds_is_refused() {
        let mut session = Session::default();
        session.apply(fund(10)).unwrap();
        session.apply(stock(Shop, item("sword", 60))).unwrap();

        let result = session.apply(Command::QuickMove {
            from: slot(Shop, 0),
            to: Bag,
        });

        assert!(matches!(
            result,
            Err(SessionError::Transfer(TransferError::SendRejected(
                TransferOp::MoveToFirstEmpty,
                _,
                _
            )))
        ));
        assert_eq!(session.funds(), Price::new(10));
        assert_eq!(session.shop().count(), 1);
    }

    #[test]
    fn returning_to_shop_refunds() {
        let mut session = Session::default();
        session.apply(fund(100)).unwrap();
        session.apply(stock(Shop, item("dagger", 30))).unwrap();
        session
            .apply(Command::QuickMove {
                from: slot(Shop, 0),
                to: Bag,
            })
            .unwrap();

        session
            .apply(Command::QuickMove {
                from: slot(Bag, 0),
                to: Shop,
            })
            .unwrap();

        assert_eq!(session.funds(), Price::new(100));
        assert_eq!(session.shop().count(), 1);
    }

    #[test]
    fn selling_credits_wallet_and_discards_item() {
        let mut session = Session::default();
        session
            .apply(stock(Bag, item("gem", 30).with_discount(Price::new(20))))
            .unwrap();

        assert_eq!(session.quote(slot(Bag, 0)), Some(Price::new(20)));
        session
            .apply(Command::Move {
                from: slot(Bag, 0),
                to: slot(SellBox, 0),
            })
            .unwrap();

        assert_eq!(session.funds(), Price::new(20));
        assert!(session.bag().is_empty());
        assert!(session.sell_box().is_empty());
    }

    #[test]
    fn shop_items_cannot_be_sold_directly() {
        let mut session = Session::default();
        session.apply(fund(100)).unwrap();
        session.apply(stock(Shop, item("sword", 60))).unwrap();

        let result = session.apply(Command::Move {
            from: slot(Shop, 0),
            to: slot(SellBox, 0),
        });

        assert!(matches!(
            result,
            Err(SessionError::Transfer(TransferError::SourceDisallowed(..)))
        ));
        assert_eq!(session.funds(), Price::new(100));
        assert_eq!(session.quote(slot(Shop, 0)), None);
    }

    #[test]
    fn sale_at_max_balance_clamps_and_commits() {
        let mut session = Session::default();
        session
            .apply(Command::Fund {
                amount: Price::new(u32::MAX),
            })
            .unwrap();
        session.apply(stock(Bag, item("gem", 1))).unwrap();

        session
            .apply(Command::Move {
                from: slot(Bag, 0),
                to: slot(SellBox, 0),
            })
            .unwrap();

        assert_eq!(session.funds(), Price::new(u32::MAX));
        assert!(session.bag().is_empty());
        assert!(session.sell_box().is_empty());
    }

    #[test]
    fn refund_at_max_balance_clamps() {
        let mut session = Session::default();
        session.apply(fund(u32::MAX - 5)).unwrap();
        session.apply(stock(Bag, item("rope", 8))).unwrap();

        session
            .apply(Command::QuickMove {
                from: slot(Bag, 0),
                to: Shop,
            })
            .unwrap();

        assert_eq!(session.funds(), Price::new(u32::MAX));
        assert_eq!(session.shop().get(0), Some(&item("rope", 8)));
    }

    // Drops

    #[test]
    fn drop_on_occupied_slot_falls_back_to_first_empty() {
        let mut session = Session::default();
        session.apply(fund(100)).unwrap();
        session.apply(stock(Shop, item("sword", 60))).unwrap();
        session.apply(stock(Bag, item("boot", 4))).unwrap();

        // shop refuses to swap, so the sword lands in the first free bag slot
        session
            .apply(Command::Drop {
                dragged: slot(Shop, 0),
                target: slot(Bag, 0),
            })
            .unwrap();

        assert_eq!(session.bag().get(0), Some(&item("boot", 4)));
        assert_eq!(session.bag().get(1), Some(&item("sword", 60)));
        assert_eq!(session.funds(), Price::new(40));
    }

    #[test]
    fn drop_swaps_when_allowed() {
        let mut session = Session::default();
        session.apply(stock(Bag, item("a", 1))).unwrap();
        session.apply(stock(Bag, item("b", 1))).unwrap();

        session
            .apply(Command::Drop {
                dragged: slot(Bag, 0),
                target: slot(Bag, 1),
            })
            .unwrap();

        assert_eq!(session.bag().get(0), Some(&item("b", 1)));
        assert_eq!(session.bag().get(1), Some(&item("a", 1)));
    }

    #[test]
    fn drop_fails_when_fallback_fails() {
        let mut session = Session::default();
        session.apply(stock(Bag, item("gem", 5))).unwrap();

        let result = session.apply(Command::Drop {
            dragged: slot(SellBox, 0),
            target: slot(Bag, 0),
        });

        assert!(matches!(
            result,
            Err(SessionError::Transfer(TransferError::EmptySource(
                TransferOp::MoveToFirstEmpty,
                0
            )))
        ));
    }

    #[test]
    fn drop_on_own_container_moves_only_backwards() {
        let mut session = Session::default();
        session.apply(stock(Bag, item("a", 1))).unwrap();
        session.apply(stock(Bag, item("b", 1))).unwrap();
        session.apply(stock(Bag, item("c", 1))).unwrap();
        session.apply(Command::Remove { slot: slot(Bag, 0) }).unwrap();

        // first empty slot (0) precedes slot 2
        session
            .apply(Command::DropOnContainer {
                dragged: slot(Bag, 2),
                target: Bag,
            })
            .unwrap();
        assert_eq!(session.bag().get(0), Some(&item("c", 1)));

        // first empty slot (2) follows slot 1: nothing moves
        session
            .apply(Command::DropOnContainer {
                dragged: slot(Bag, 1),
                target: Bag,
            })
            .unwrap();
        assert_eq!(session.bag().get(1), Some(&item("b", 1)));
    }

    #[test]
    fn drop_on_other_container_uses_first_empty_slot() {
        let mut session = Session::default();
        session.apply(stock(Bag, item("gem", 5))).unwrap();

        session
            .apply(Command::DropOnContainer {
                dragged: slot(Bag, 0),
                target: SellBox,
            })
            .unwrap();

        assert_eq!(session.funds(), Price::new(5));
    }

    // Locks, removal, clearing

    #[test]
    fn lock_shop_slot() {
        let mut session = Session::default();
        session.apply(stock(Shop, item("sword", 60))).unwrap();

        session
            .apply(Command::Lock {
                slot: slot(Shop, 0),
                locked: true,
            })
            .unwrap();

        let slots = session.occupied_slots();
        assert_eq!(slots.len(), 1);
        assert!(slots[0].locked);
    }

    #[test]
    fn lock_outside_shop_fails() {
        let mut session = Session::default();
        assert_eq!(
            session.apply(Command::Lock {
                slot: slot(Bag, 0),
                locked: true,
            }),
            Err(SessionError::NotLockable(Bag))
        );
    }

    #[test]
    fn stock_full_container_fails() {
        let mut session = Session::new(SessionConfig {
            shop_capacity: 1,
            ..SessionConfig::default()
        });
        session.apply(stock(Shop, item("a", 1))).unwrap();

        assert_eq!(
            session.apply(stock(Shop, item("b", 1))),
            Err(SessionError::Slot(SlotError::Full))
        );
    }

    #[test]
    fn clear_and_remove() {
        let mut session = Session::default();
        session.apply(stock(Bag, item("a", 1))).unwrap();
        session.apply(stock(Shop, item("b", 1))).unwrap();

        session.apply(Command::Clear { container: Bag }).unwrap();
        session.apply(Command::Remove { slot: slot(Shop, 0) }).unwrap();

        assert!(session.occupied_slots().is_empty());
        assert_eq!(
            session.apply(Command::Remove { slot: slot(Shop, 0) }),
            Err(SessionError::Slot(SlotError::EmptySlot(0)))
        );
    }

    #[test]
    fn occupied_slots_are_ordered_by_container() {
        let mut session = Session::default();
        session.apply(stock(Shop, item("s", 1))).unwrap();
        session.apply(stock(Bag, item("b", 1))).unwrap();

        let names: Vec<_> = session
            .occupied_slots()
            .iter()
            .map(|view| (view.container, view.index, view.item.id().to_string()))
            .collect();
        assert_eq!(
            names,
            vec![(Bag, 0, "b".to_string()), (Shop, 0, "s".to_string())]
        );
    }

    // Async run()

    #[tokio::test]
    async fn run_processes_all_commands() {
        let mut session = Session::default();
        let commands = vec![
            fund(50),
            stock(Shop, item("bow", 30)),
            Command::QuickMove {
                from: slot(Shop, 0),
                to: Bag,
            },
        ];

        session.run(tokio_stream::iter(commands)).await;

        assert_eq!(session.funds(), Price::new(20));
        assert_eq!(session.bag().count(), 1);
    }

    #[tokio::test]
    async fn run_skips_refused_commands_and_continues() {
        let mut session = Session::default();
        let commands = vec![
            stock(Shop, item("bow", 30)),
            Command::QuickMove {
                from: slot(Shop, 0),
                to: Bag,
            }, // refused: no funds
            stock(Bag, item("stick", 1)),
        ];

        session.run(tokio_stream::iter(commands)).await;

        assert_eq!(session.shop().count(), 1);
        assert_eq!(session.bag().get(0), Some(&item("stick", 1)));
    }
}
