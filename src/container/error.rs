//! Error types for container operations.

use std::fmt;

use thiserror::Error;

use super::ContainerId;
use crate::ItemId;

/// Failure of a slot primitive (`set`, `add`, `remove`, ...).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot {index} is out of range for capacity {capacity}")]
    IndexOutOfRange { index: usize, capacity: usize },

    #[error("slot {0} is empty")]
    EmptySlot(usize),

    #[error("container is full")]
    Full,

    #[error("item {0} not found")]
    ItemNotFound(ItemId),

    #[error("expected {expected} slots, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// The kind of transfer being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOp {
    Move,
    MoveToFirstEmpty,
}

impl fmt::Display for TransferOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferOp::Move => f.write_str("move"),
            TransferOp::MoveToFirstEmpty => f.write_str("move to first empty slot"),
        }
    }
}

/// Reason a transfer was refused. A refused transfer never mutates a slot,
/// never runs a hook and never notifies.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransferError {
    #[error("{0}: source slot {1} is out of range")]
    SourceIndex(TransferOp, usize),

    #[error("{0}: destination slot {1} is out of range")]
    DestinationIndex(TransferOp, usize),

    #[error("{0}: container {1} does not allow internal moves")]
    InternalMoveDisabled(TransferOp, ContainerId),

    #[error("{0}: container {1} does not accept items from other containers")]
    ExternalMoveDisabled(TransferOp, ContainerId),

    #[error("{0}: container {1} refuses items from container {2}")]
    SourceDisallowed(TransferOp, ContainerId, ContainerId),

    #[error("{0}: source slot {1} is empty")]
    EmptySource(TransferOp, usize),

    #[error("{0}: swapping between containers {1} and {2} is disabled")]
    SwapDisabled(TransferOp, ContainerId, ContainerId),

    #[error("{0}: container {1} refused to send {2}")]
    SendRejected(TransferOp, ContainerId, ItemId),

    #[error("{0}: container {1} refused to receive {2}")]
    ReceiveRejected(TransferOp, ContainerId, ItemId),

    #[error("{0}: container {1} has no empty slot")]
    DestinationFull(TransferOp, ContainerId),
}
