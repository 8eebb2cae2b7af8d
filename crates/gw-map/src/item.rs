//! Placed items.

use std::io::{Read, Write};

use gw_core::{Decode, Encode, ItemTypeId, Position, SimTime};

/// An item placed on the lattice.
///
/// `creation_time == 0` means the item existed from world birth (it was
/// realized by sampling, not dropped during simulation).  `deletion_time ==
/// 0` means the item is currently alive; a nonzero deletion time marks a
/// tombstone that keeps fading scent until it is physically removed.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Item {
    pub item_type:     ItemTypeId,
    pub position:      Position,
    pub creation_time: SimTime,
    pub deletion_time: SimTime,
}

impl Item {
    /// A sampled item: exists from world birth, alive.
    pub fn sampled(item_type: ItemTypeId, position: Position) -> Item {
        Item {
            item_type,
            position,
            creation_time: SimTime::ZERO,
            deletion_time: SimTime::ZERO,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.deletion_time == SimTime::ZERO
    }

    /// `true` once a tombstone is old enough to be physically removed.
    #[inline]
    pub fn expired(&self, now: SimTime, deleted_item_lifetime: u64) -> bool {
        !self.is_alive() && now.since(self.deletion_time) >= deleted_item_lifetime
    }
}

impl Encode for Item {
    fn encode<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        self.item_type.encode(out)?;
        self.position.encode(out)?;
        self.creation_time.encode(out)?;
        self.deletion_time.encode(out)
    }
}

impl Decode for Item {
    fn decode<R: Read + ?Sized>(input: &mut R) -> std::io::Result<Self> {
        Ok(Item {
            item_type:     ItemTypeId::decode(input)?,
            position:      Position::decode(input)?,
            creation_time: SimTime::decode(input)?,
            deletion_time: SimTime::decode(input)?,
        })
    }
}
