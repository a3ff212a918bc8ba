//! Strongly typed, zero-cost identifier wrappers.
//!
//! Every entity the engine tracks (nodes, lanes, vehicles) is addressed by a
//! small integer id.  Wrapping the integers in distinct newtypes keeps a
//! `NodeId` from ever being handed to a lane lookup; all IDs are
//! `Copy + Ord + Hash` so they work as map keys and queue elements without
//! ceremony.  The inner integer is `pub` for direct indexing into the
//! topology's `Vec`s, but callers should prefer `.index()` for clarity.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of an approach node in its intersection's node table.
    pub struct NodeId(u32);
}

typed_id! {
    /// Index of a directed lane in its intersection's lane table.
    pub struct LaneId(u32);
}

typed_id! {
    /// Identity of a vehicle, assigned by the spawner.  `u64` so an external
    /// generator can hand out ids for the lifetime of a process without reuse.
    pub struct VehicleId(u64);
}
