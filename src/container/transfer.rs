//! Moving items between slots.
//!
//! Every transfer runs the same sequence: validate, write slots, run the
//! policy hooks, notify. Validation failures return before the first slot
//! write, so a refused transfer runs no hook and fires no notification.
//!
//! Validation order:
//! 1. indices valid for both containers
//! 2. internal move allowed (same container) or external move allowed and
//!    source not disallowed (different containers)
//! 3. source slot occupied
//! 4. cross-container swap allowed on both sides (only when the destination
//!    slot is occupied)
//! 5. source policy's `can_send_item`
//! 6. destination policy's `can_receive_item`

use tracing::info;

use super::{Container, ContainerId, TransferError, TransferOp};
use crate::Item;
use crate::policy::{Receipt, Route, TransferPolicy};

impl<P: TransferPolicy> Container<P> {
    /// Move the item in slot `from` into slot `to` of `destination`.
    ///
    /// If the destination slot is occupied the two items are swapped, which
    /// requires both containers to allow external swaps. Hooks run per
    /// logical direction: the moved item leaves `self` and enters
    /// `destination`, then the displaced item (if any) leaves `destination`
    /// and enters `self`. Both containers notify once.
    pub fn move_item<Q: TransferPolicy>(
        &mut self,
        destination: &mut Container<Q>,
        from: usize,
        to: usize,
    ) -> Result<(), TransferError> {
        let result = self.exchange(destination, from, to);
        log_transfer(
            TransferOp::Move,
            Route::new(self.id, destination.id),
            from,
            Some(to),
            &result,
        );
        result
    }

    /// Move the item in slot `from` to slot `to` of this same container,
    /// swapping with any occupant. No transfer hooks run; the container
    /// notifies once.
    pub fn move_within(&mut self, from: usize, to: usize) -> Result<(), TransferError> {
        let result = self.rearrange(from, to);
        log_transfer(
            TransferOp::Move,
            Route::new(self.id, self.id),
            from,
            Some(to),
            &result,
        );
        result
    }

    /// Move the item in slot `from` to the lowest-indexed empty slot of
    /// `destination` and return that slot.
    pub fn move_to_first_empty_slot<Q: TransferPolicy>(
        &mut self,
        destination: &mut Container<Q>,
        from: usize,
    ) -> Result<usize, TransferError> {
        let result = self.relocate(destination, from);
        log_transfer(
            TransferOp::MoveToFirstEmpty,
            Route::new(self.id, destination.id),
            from,
            result.as_ref().ok().copied(),
            &result,
        );
        result
    }

    /// Move the item in slot `from` to the lowest-indexed empty slot of this
    /// same container and return that slot.
    pub fn move_to_first_empty_slot_within(&mut self, from: usize) -> Result<usize, TransferError> {
        let result = self.compact(from);
        log_transfer(
            TransferOp::MoveToFirstEmpty,
            Route::new(self.id, self.id),
            from,
            result.as_ref().ok().copied(),
            &result,
        );
        result
    }
}

/// Private API
impl<P: TransferPolicy> Container<P> {
    /// Apply a cross-container move:
    /// - Validate indices, admission, occupancy, swap flags and both gates
    /// - Exchange the two slots
    /// - Run hooks for the moved item, then for the displaced item
    /// - Notify source, then destination
    fn exchange<Q: TransferPolicy>(
        &mut self,
        destination: &mut Container<Q>,
        from: usize,
        to: usize,
    ) -> Result<(), TransferError> {
        use TransferOp::Move;

        let route = Route::new(self.id, destination.id);

        if !self.is_index_valid(from) {
            return Err(TransferError::SourceIndex(Move, from));
        }
        if !destination.is_index_valid(to) {
            return Err(TransferError::DestinationIndex(Move, to));
        }
        destination.admits(Move, self.id)?;

        let item = self.slots[from]
            .as_ref()
            .ok_or(TransferError::EmptySource(Move, from))?;

        if destination.slots[to].is_some()
            && !(self.flags.allow_external_swap && destination.flags.allow_external_swap)
        {
            return Err(TransferError::SwapDisabled(Move, self.id, destination.id));
        }

        check_gates(Move, self, destination, item, route)?;

        std::mem::swap(&mut self.slots[from], &mut destination.slots[to]);

        let receipt = match destination.slots[to].as_ref() {
            Some(moved) => {
                self.policy.on_item_moved_away(moved, from, route);
                destination.policy.on_item_received(moved, to, route)
            }
            None => Receipt::Keep,
        };
        if receipt == Receipt::Consume {
            destination.slots[to] = None;
        }

        let receipt = match self.slots[from].as_ref() {
            Some(displaced) => {
                destination
                    .policy
                    .on_item_moved_away(displaced, to, route.reversed());
                self.policy
                    .on_item_received(displaced, from, route.reversed())
            }
            None => Receipt::Keep,
        };
        if receipt == Receipt::Consume {
            self.slots[from] = None;
        }

        self.notify();
        destination.notify();

        Ok(())
    }

    /// Apply a move between two slots of this container.
    fn rearrange(&mut self, from: usize, to: usize) -> Result<(), TransferError> {
        use TransferOp::Move;

        let route = Route::new(self.id, self.id);

        if !self.is_index_valid(from) {
            return Err(TransferError::SourceIndex(Move, from));
        }
        if !self.is_index_valid(to) {
            return Err(TransferError::DestinationIndex(Move, to));
        }
        if !self.flags.allow_internal_move {
            return Err(TransferError::InternalMoveDisabled(Move, self.id));
        }

        let item = self.slots[from]
            .as_ref()
            .ok_or(TransferError::EmptySource(Move, from))?;

        // same-container swaps need no swap permission
        check_gates(Move, self, self, item, route)?;

        self.slots.swap(from, to);
        self.notify();

        Ok(())
    }

    /// Apply a cross-container move into the first empty destination slot.
    fn relocate<Q: TransferPolicy>(
        &mut self,
        destination: &mut Container<Q>,
        from: usize,
    ) -> Result<usize, TransferError> {
        use TransferOp::MoveToFirstEmpty;

        let route = Route::new(self.id, destination.id);

        if !self.is_index_valid(from) {
            return Err(TransferError::SourceIndex(MoveToFirstEmpty, from));
        }
        destination.admits(MoveToFirstEmpty, self.id)?;

        let item = self.slots[from]
            .as_ref()
            .ok_or(TransferError::EmptySource(MoveToFirstEmpty, from))?;

        check_gates(MoveToFirstEmpty, self, destination, item, route)?;

        let to = destination
            .first_empty_slot()
            .ok_or(TransferError::DestinationFull(MoveToFirstEmpty, destination.id))?;

        destination.slots[to] = self.slots[from].take();

        let receipt = match destination.slots[to].as_ref() {
            Some(moved) => {
                self.policy.on_item_moved_away(moved, from, route);
                destination.policy.on_item_received(moved, to, route)
            }
            None => Receipt::Keep,
        };
        if receipt == Receipt::Consume {
            destination.slots[to] = None;
        }

        self.notify();
        destination.notify();

        Ok(to)
    }

    /// Apply a move into the first empty slot of this container.
    fn compact(&mut self, from: usize) -> Result<usize, TransferError> {
        use TransferOp::MoveToFirstEmpty;

        let route = Route::new(self.id, self.id);

        if !self.is_index_valid(from) {
            return Err(TransferError::SourceIndex(MoveToFirstEmpty, from));
        }
        if !self.flags.allow_internal_move {
            return Err(TransferError::InternalMoveDisabled(
                MoveToFirstEmpty,
                self.id,
            ));
        }

        let item = self.slots[from]
            .as_ref()
            .ok_or(TransferError::EmptySource(MoveToFirstEmpty, from))?;

        check_gates(MoveToFirstEmpty, self, self, item, route)?;

        let to = self
            .first_empty_slot()
            .ok_or(TransferError::DestinationFull(MoveToFirstEmpty, self.id))?;

        self.slots.swap(from, to);
        self.notify();

        Ok(to)
    }
}

impl<P> Container<P> {
    /// Ensure this container accepts a cross-container move from `source`.
    fn admits(&self, op: TransferOp, source: ContainerId) -> Result<(), TransferError> {
        if !self.flags.allow_external_move {
            return Err(TransferError::ExternalMoveDisabled(op, self.id));
        }
        if self.disallowed_sources.contains(&source) {
            return Err(TransferError::SourceDisallowed(op, self.id, source));
        }
        Ok(())
    }
}

/// Ask the source whether it sends `item`, then the destination whether it
/// receives it.
fn check_gates<P: TransferPolicy, Q: TransferPolicy>(
    op: TransferOp,
    source: &Container<P>,
    destination: &Container<Q>,
    item: &Item,
    route: Route,
) -> Result<(), TransferError> {
    if !source.policy.can_send_item(item, route) {
        return Err(TransferError::SendRejected(
            op,
            source.id,
            item.id().to_owned(),
        ));
    }
    if !destination.policy.can_receive_item(item, route) {
        return Err(TransferError::ReceiveRejected(
            op,
            destination.id,
            item.id().to_owned(),
        ));
    }
    Ok(())
}

/// Small helper to log transfer results
fn log_transfer<T>(
    op: TransferOp,
    route: Route,
    from: usize,
    to: Option<usize>,
    result: &Result<T, TransferError>,
) {
    match result {
        Ok(_) => {
            info!(
                source = route.source,
                destination = route.destination,
                from,
                to,
                "{op} applied"
            );
        }
        Err(e) => {
            info!(
                source = route.source,
                destination = route.destination,
                from,
                to,
                reason = %e,
                "{op} skipped"
            );
        }
    }
}
