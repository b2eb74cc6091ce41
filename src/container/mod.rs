//! Fixed-capacity slot containers.
//!
//! A [`Container`] owns an array of slots, each empty or holding one
//! [`Item`]. It can be mutated only through its public operations, every
//! successful mutation notifies the container's listeners exactly once, and
//! failed operations leave it untouched. Moving items between containers is
//! implemented in [`transfer`](self::transfer) and gated by the container's
//! [`TransferPolicy`].

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::debug;

use crate::Item;
use crate::policy::{Open, TransferPolicy};

mod error;
pub use error::{SlotError, TransferError, TransferOp};

mod observers;
pub use observers::Subscription;
use observers::Observers;

mod transfer;

/// Process-unique container identifier.
pub type ContainerId = u32;

/// Capacity of a container built with [`Container::default`].
pub const DEFAULT_CAPACITY: usize = 5;

static NEXT_CONTAINER_ID: AtomicU32 = AtomicU32::new(1);

/// Which moves a container takes part in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferFlags {
    /// Items may be moved between two slots of this container.
    pub allow_internal_move: bool,
    /// This container may be the destination of a cross-container move.
    pub allow_external_move: bool,
    /// Items of this container may be swapped with an item coming from
    /// another container. Both sides of a swap must allow it.
    pub allow_external_swap: bool,
}

impl Default for TransferFlags {
    fn default() -> Self {
        Self {
            allow_internal_move: true,
            allow_external_move: true,
            allow_external_swap: true,
        }
    }
}

/// A fixed number of item slots governed by a transfer policy.
pub struct Container<P = Open> {
    id: ContainerId,
    slots: Vec<Option<Item>>,
    flags: TransferFlags,
    disallowed_sources: HashSet<ContainerId>,
    policy: P,
    observers: Observers<Container<P>>,
}

/// Construction of plain containers
impl Container {
    /// Create an empty container.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self::with_policy(capacity, Open)
    }

    /// Create a container holding `items`; its capacity is `items.len()`.
    ///
    /// # Panics
    ///
    /// Panics if `items` is empty.
    pub fn from_items(items: Vec<Option<Item>>) -> Self {
        Self::from_items_with_policy(items, Open)
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Public API
impl<P: TransferPolicy> Container<P> {
    /// Create an empty container governed by `policy`.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_policy(capacity: usize, policy: P) -> Self {
        assert!(capacity > 0, "container capacity must be greater than zero");
        Self::build(vec![None; capacity], policy)
    }

    /// Create a container holding `items`, governed by `policy`.
    ///
    /// # Panics
    ///
    /// Panics if `items` is empty.
    pub fn from_items_with_policy(items: Vec<Option<Item>>, policy: P) -> Self {
        assert!(
            !items.is_empty(),
            "container capacity must be greater than zero"
        );
        Self::build(items, policy)
    }

    pub fn id(&self) -> ContainerId {
        self.id
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Slot contents, `None` marking an empty slot.
    pub fn slots(&self) -> &[Option<Item>] {
        &self.slots
    }

    /// Item in slot `index`, if the index is valid and the slot occupied.
    pub fn get(&self, index: usize) -> Option<&Item> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.count() == self.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    pub fn is_index_valid(&self, index: usize) -> bool {
        index < self.capacity()
    }

    /// Lowest-indexed empty slot.
    pub fn first_empty_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    pub fn flags(&self) -> TransferFlags {
        self.flags
    }

    pub fn flags_mut(&mut self) -> &mut TransferFlags {
        &mut self.flags
    }

    /// Refuse every item moved in from container `source`.
    pub fn disallow_source(&mut self, source: ContainerId) {
        self.disallowed_sources.insert(source);
    }

    /// Accept items from container `source` again.
    pub fn allow_source(&mut self, source: ContainerId) {
        self.disallowed_sources.remove(&source);
    }

    pub fn is_source_disallowed(&self, source: ContainerId) -> bool {
        self.disallowed_sources.contains(&source)
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut P {
        &mut self.policy
    }

    /// Attach a change listener.
    ///
    /// The listener runs synchronously after every successful mutation and
    /// receives the container to re-read its state. It must not mutate the
    /// container it observes.
    pub fn subscribe(&self, listener: impl FnMut(&Self) + 'static) -> Subscription
    where
        P: 'static,
    {
        self.observers.subscribe(listener)
    }

    /// Number of attached change listeners.
    pub fn listener_count(&self) -> usize {
        self.observers.len()
    }

    /// Overwrite slot `index` unconditionally, returning its previous
    /// occupant. No policy is consulted.
    pub fn set(&mut self, index: usize, item: Option<Item>) -> Result<Option<Item>, SlotError> {
        self.check_index(index)?;

        debug!(
            container = self.id,
            index,
            item = item.as_ref().map(Item::id),
            "slot set"
        );
        let previous = std::mem::replace(&mut self.slots[index], item);
        self.notify();

        Ok(previous)
    }

    /// Place `item` in the lowest-indexed empty slot and return that index.
    pub fn add(&mut self, item: Item) -> Result<usize, SlotError> {
        let index = self.first_empty_slot().ok_or(SlotError::Full)?;
        self.set(index, Some(item))?;
        Ok(index)
    }

    /// Take the first item equal to `item` out of the container.
    pub fn remove(&mut self, item: &Item) -> Result<Item, SlotError> {
        let index = self
            .slots
            .iter()
            .position(|slot| slot.as_ref() == Some(item))
            .ok_or_else(|| SlotError::ItemNotFound(item.id().to_owned()))?;
        self.remove_at(index)
    }

    /// Take the item out of slot `index`.
    pub fn remove_at(&mut self, index: usize) -> Result<Item, SlotError> {
        self.check_index(index)?;

        let item = self.slots[index]
            .take()
            .ok_or(SlotError::EmptySlot(index))?;
        debug!(container = self.id, index, item = item.id(), "slot cleared");
        self.notify();

        Ok(item)
    }

    /// Empty every slot. Always notifies, even if nothing was stored.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        debug!(container = self.id, "container cleared");
        self.notify();
    }

    /// Replace every slot at once. `items` must have exactly `capacity`
    /// entries.
    pub fn set_items(&mut self, items: Vec<Option<Item>>) -> Result<(), SlotError> {
        if items.len() != self.capacity() {
            return Err(SlotError::LengthMismatch {
                expected: self.capacity(),
                actual: items.len(),
            });
        }

        self.slots = items;
        debug!(container = self.id, count = self.count(), "slots replaced");
        self.notify();

        Ok(())
    }
}

/// Private API
impl<P> Container<P> {
    fn build(slots: Vec<Option<Item>>, policy: P) -> Self {
        Self {
            id: NEXT_CONTAINER_ID.fetch_add(1, Ordering::Relaxed),
            slots,
            flags: TransferFlags::default(),
            disallowed_sources: HashSet::new(),
            policy,
            observers: Observers::new(),
        }
    }

    fn check_index(&self, index: usize) -> Result<(), SlotError> {
        if index < self.slots.len() {
            Ok(())
        } else {
            Err(SlotError::IndexOutOfRange {
                index,
                capacity: self.slots.len(),
            })
        }
    }

    /// Fire the change notification.
    pub(crate) fn notify(&self) {
        self.observers.notify(self);
    }
}

impl<P> fmt::Debug for Container<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("slots", &self.slots)
            .field("flags", &self.flags)
            .field("disallowed_sources", &self.disallowed_sources)
            .finish_non_exhaustive()
    }
}
