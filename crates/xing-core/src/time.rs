//! Simulation time model.
//!
//! Time is a monotonically increasing `Tick` counter advanced by the
//! controller's update task; the wall-clock pacing between ticks lives in
//! [`ControlConfig`](crate::ControlConfig), not here.  Using an integer tick
//! as the canonical unit keeps all scheduling arithmetic exact — entry/exit
//! windows are half-open `[entry, exit)` tick ranges compared with plain
//! integer ordering.

use std::fmt;

/// An absolute simulation tick counter.
///
/// Stored as `u64`: at the default 10 ticks/s a u64 lasts ~58 billion years,
/// so overflow on `offset`/`Add` is not a practical concern.  Differences are
/// another matter — scheduling code subtracts ticks that are only ordered
/// when queue invariants hold, so [`saturating_since`](Tick::saturating_since)
/// exists for paths that must stay total under a violated invariant.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`.
    ///
    /// # Panics
    /// Panics in debug mode if `earlier > self`.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0 - earlier.0
    }

    /// Ticks elapsed from `earlier` to `self`, clamped to zero if `earlier`
    /// is in the future.  Used wherever the operands' ordering is an
    /// invariant rather than a local guarantee.
    #[inline]
    pub fn saturating_since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::AddAssign<u64> for Tick {
    #[inline]
    fn add_assign(&mut self, rhs: u64) {
        self.0 += rhs;
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}
