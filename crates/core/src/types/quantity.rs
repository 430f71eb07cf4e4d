//! Line-item quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Number of units of one product in a cart.
///
/// Arithmetic saturates: incrementing at `u32::MAX` and decrementing at zero
/// both leave the value where it is.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// No units.
    pub const ZERO: Self = Self(0);
    /// A single unit, the quantity of a freshly added line item.
    pub const ONE: Self = Self(1);

    /// Create a quantity.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Get the underlying count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Whether no units remain.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// One more unit.
    #[must_use]
    pub const fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// One fewer unit.
    #[must_use]
    pub const fn decremented(self) -> Self {
        Self(self.0.saturating_sub(1))
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl From<u32> for Quantity {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}
