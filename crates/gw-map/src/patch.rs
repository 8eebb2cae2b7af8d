//! Patch records.

use std::io::{Read, Write};

use gw_core::codec::{read_f32_grid, write_f32_grid};
use gw_core::{Decode, Encode, Position, SimTime};
use gw_energy::ItemType;

use crate::item::Item;

/// One `n × n` region of the lattice: the unit of generation, storage, and
/// scent update.
///
/// Invariants:
/// - Positions of currently alive items are unique within a patch.
/// - Once `fixed` is true, item positions and creation times are never
///   revised by sampling (simulation-time collection/decay still applies).
#[derive(Clone, Debug)]
pub struct Patch {
    /// Items in this patch, live and tombstoned, in insertion order.
    pub items: Vec<Item>,

    /// Committed to its realized configuration; sampling may no longer
    /// touch this patch.
    pub fixed: bool,

    /// Dense per-cell scent, row-major `[y][x][channel]`,
    /// length `n · n · scent_dim`.  Maintained by the diffusion pass.
    pub scent: Vec<f32>,

    /// Dense per-cell item color raster, row-major `[y][x][channel]`,
    /// length `n · n · color_dim`.  Rebuilt whenever the item set changes;
    /// agent markers are composited at observation time, not here.
    pub vision: Vec<f32>,
}

impl Patch {
    /// A fresh, empty, unfixed patch with zeroed grids.
    pub fn empty(n: u32, scent_dim: u32, color_dim: u32) -> Patch {
        let cells = (n * n) as usize;
        Patch {
            items:  Vec::new(),
            fixed:  false,
            scent:  vec![0.0; cells * scent_dim as usize],
            vision: vec![0.0; cells * color_dim as usize],
        }
    }

    /// Seed a new unfixed patch by copying `source` items translated by
    /// `offset` (world cells), with creation/deletion times reset.
    pub fn seeded_from(
        source: &[Item],
        offset: Position,
        n: u32,
        scent_dim: u32,
        color_dim: u32,
    ) -> Patch {
        let mut patch = Patch::empty(n, scent_dim, color_dim);
        patch.items = source
            .iter()
            .map(|item| Item::sampled(item.item_type, item.position + offset))
            .collect();
        patch
    }

    /// Number of items, live and tombstoned.
    #[inline]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// The live item at a world position, if any.
    pub fn live_item_at(&self, position: Position) -> Option<&Item> {
        self.items
            .iter()
            .find(|item| item.is_alive() && item.position == position)
    }

    /// Index of the live item at a world position, if any.
    pub fn live_item_index_at(&self, position: Position) -> Option<usize> {
        self.items
            .iter()
            .position(|item| item.is_alive() && item.position == position)
    }

    /// `true` if any record (live or tombstone) remains — tombstones still
    /// emit fading scent, so such a patch participates in diffusion.
    #[inline]
    pub fn has_item_records(&self) -> bool {
        !self.items.is_empty()
    }

    /// Drop tombstones old enough to be physically removed.
    pub fn purge_expired(&mut self, now: SimTime, deleted_item_lifetime: u64) -> usize {
        let before = self.items.len();
        self.items
            .retain(|item| !item.expired(now, deleted_item_lifetime));
        before - self.items.len()
    }

    /// Re-rasterize live item colors into the vision grid.
    ///
    /// `origin` is the world position of this patch's bottom-left cell.
    pub fn rebuild_vision(&mut self, catalogue: &[ItemType], origin: Position, n: u32, color_dim: u32) {
        self.vision.fill(0.0);
        let dim = color_dim as usize;
        for item in &self.items {
            if !item.is_alive() {
                continue;
            }
            let offset = item.position - origin;
            debug_assert!(offset.x >= 0 && offset.x < n as i64);
            debug_assert!(offset.y >= 0 && offset.y < n as i64);
            let cell = (offset.y as usize * n as usize + offset.x as usize) * dim;
            let color = &catalogue[item.item_type.index()].color;
            self.vision[cell..cell + dim].copy_from_slice(color);
        }
    }

    /// Scent channels of the cell at `offset` within the patch.
    #[inline]
    pub fn scent_at(&self, offset: Position, n: u32, scent_dim: u32) -> &[f32] {
        let cell = (offset.y as usize * n as usize + offset.x as usize) * scent_dim as usize;
        &self.scent[cell..cell + scent_dim as usize]
    }

    /// Color channels of the cell at `offset` within the patch.
    #[inline]
    pub fn vision_at(&self, offset: Position, n: u32, color_dim: u32) -> &[f32] {
        let cell = (offset.y as usize * n as usize + offset.x as usize) * color_dim as usize;
        &self.vision[cell..cell + color_dim as usize]
    }
}

// Grid lengths are derived from configuration, so the stream stores only the
// flag, the items, and the raw scent grid (vision is a pure function of the
// items and is rebuilt on load).

/// Encode a patch for persistence.
pub fn write_patch<W: Write + ?Sized>(patch: &Patch, out: &mut W) -> std::io::Result<()> {
    patch.fixed.encode(out)?;
    patch.items.encode(out)?;
    write_f32_grid(out, &patch.scent)
}

/// Decode a patch persisted by [`write_patch`].
pub fn read_patch<R: Read + ?Sized>(
    input: &mut R,
    n: u32,
    scent_dim: u32,
    color_dim: u32,
) -> std::io::Result<Patch> {
    let fixed = bool::decode(input)?;
    let items = Vec::<Item>::decode(input)?;
    let cells = (n * n) as usize;
    let scent = read_f32_grid(input, cells * scent_dim as usize)?;
    Ok(Patch {
        items,
        fixed,
        scent,
        vision: vec![0.0; cells * color_dim as usize],
    })
}
