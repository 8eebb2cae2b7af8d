//! Strongly typed, zero-cost identifier wrappers.
//!
//! Registry-assigned IDs (`AgentId`, `SemaphoreId`, `ClientId`) are 64-bit,
//! monotonically increasing, and never reused — they double as stable wire
//! handles.  `ItemTypeId` is an index into the fixed item-type catalogue.

use std::fmt;

use crate::codec::{Decode, Encode};

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[derive(serde::Serialize, serde::Deserialize)]
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

        impl Encode for $name {
            fn encode<W: std::io::Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
                self.0.encode(out)
            }
        }

        impl Decode for $name {
            fn decode<R: std::io::Read + ?Sized>(input: &mut R) -> std::io::Result<Self> {
                Ok($name(<$inner>::decode(input)?))
            }
        }
    };
}

typed_id! {
    /// Server-assigned agent identifier.  Allocated by the agent registry in
    /// insertion order, starting at 0, never reused.
    pub struct AgentId(u64);
}

typed_id! {
    /// Identifier of a turn-barrier semaphore.
    pub struct SemaphoreId(u64);
}

typed_id! {
    /// Persistent identifier of a remote client, assigned at first handshake.
    /// A reconnecting client presents the same value to reclaim its agents.
    pub struct ClientId(u64);
}

typed_id! {
    /// Index of an item type in the catalogue.  The catalogue size is fixed at
    /// construction, so `u32` is plenty.
    pub struct ItemTypeId(u32);
}
