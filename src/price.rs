use std::fmt;

use serde::{Deserialize, Serialize};

/// Whole-unit amount of in-game currency.
///
/// Used both for item prices and for the funds reported by a wallet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u32);

impl Price {
    pub const ZERO: Price = Price(0);

    pub const fn new(value: u32) -> Self {
        Price(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add, clamping at the largest representable amount.
    pub fn saturating_add(self, rhs: Self) -> Self {
        Price(self.0.saturating_add(rhs.0))
    }

    /// Subtract, clamping at zero.
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Price(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
