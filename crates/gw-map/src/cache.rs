//! Tabulated energy kernels for the sampler's inner loop.
//!
//! Every proposal evaluation touches the interaction kernel dozens of times,
//! so stationary kernels (value depends only on the displacement) are
//! precomputed into dense `4n × 4n` displacement tables: two cells that both
//! lie in a 3×3 patch neighborhood are never more than `4n` apart on either
//! axis, so the table indexed by `diff + (2n, 2n)` covers every pair the
//! sampler can form.  Constant-zero kernels are skipped outright, and
//! non-stationary kernels fall back to direct evaluation.

use gw_core::{ItemTypeId, Position};
use gw_energy::ItemType;

/// Precomputed kernel values for one item-type catalogue and patch size.
pub struct EnergyCache {
    catalogue: Vec<ItemType>,
    /// Stationary intensity values, indexed by item type; `None` for
    /// position-dependent intensities.
    intensities: Vec<Option<f32>>,
    /// Displacement tables for stationary non-zero interactions, indexed by
    /// `first_type · type_count + second_type`; `None` entries are either
    /// constant-zero (skip) or non-stationary (evaluate).
    tables: Vec<Option<Vec<f32>>>,
    two_n:  i64,
    four_n: i64,
}

impl EnergyCache {
    pub fn new(catalogue: &[ItemType], n: u32) -> EnergyCache {
        let two_n = (2 * n) as i64;
        let four_n = (4 * n) as i64;
        let type_count = catalogue.len();

        let intensities = catalogue
            .iter()
            .map(|item| {
                item.intensity
                    .is_stationary()
                    .then(|| item.intensity.value_at(Position::ORIGIN))
            })
            .collect();

        let mut tables = Vec::with_capacity(type_count * type_count);
        for first in catalogue {
            for interaction in &first.interactions {
                if interaction.is_zero() || !interaction.is_stationary() {
                    tables.push(None);
                    continue;
                }
                // Tabulate over the displacement grid: entry (x, y) holds the
                // kernel at displacement (x − 2n, y − 2n); the origin is 0 so
                // an item never interacts with itself.
                let mut table = vec![0.0f32; (four_n * four_n) as usize];
                for x in 0..four_n {
                    for y in 0..four_n {
                        if x == two_n && y == two_n {
                            continue;
                        }
                        let anchor = Position::new(two_n, two_n);
                        table[(x * four_n + y) as usize] =
                            interaction.value_between(anchor, Position::new(x, y));
                    }
                }
                tables.push(Some(table));
            }
        }

        EnergyCache {
            catalogue: catalogue.to_vec(),
            intensities,
            tables,
            two_n,
            four_n,
        }
    }

    /// Number of item types in the catalogue.
    #[inline]
    pub fn type_count(&self) -> usize {
        self.catalogue.len()
    }

    #[inline]
    pub fn catalogue(&self) -> &[ItemType] {
        &self.catalogue
    }

    /// Intensity log-density of `item_type` at `pos`.
    #[inline]
    pub fn intensity(&self, pos: Position, item_type: ItemTypeId) -> f32 {
        match self.intensities[item_type.index()] {
            Some(value) => value,
            None => self.catalogue[item_type.index()].intensity.value_at(pos),
        }
    }

    /// Directional interaction log-density between an item of `first_type`
    /// at `first_pos` and an item of `second_type` at `second_pos`.
    ///
    /// The self-pair (identical positions) contributes 0.
    #[inline]
    pub fn interaction(
        &self,
        first_pos: Position,
        second_pos: Position,
        first_type: ItemTypeId,
        second_type: ItemTypeId,
    ) -> f32 {
        if first_pos == second_pos {
            return 0.0;
        }
        let slot = first_type.index() * self.catalogue.len() + second_type.index();
        match &self.tables[slot] {
            Some(table) => {
                let diff = first_pos - second_pos + Position::new(self.two_n, self.two_n);
                debug_assert!(
                    diff.x >= 0 && diff.x < self.four_n && diff.y >= 0 && diff.y < self.four_n,
                    "displacement {diff} outside the cached 4n grid"
                );
                if diff.x < 0 || diff.x >= self.four_n || diff.y < 0 || diff.y >= self.four_n {
                    return 0.0;
                }
                table[(diff.x * self.four_n + diff.y) as usize]
            }
            None => {
                let kernel =
                    &self.catalogue[first_type.index()].interactions[second_type.index()];
                if kernel.is_zero() {
                    0.0
                } else {
                    kernel.value_between(first_pos, second_pos)
                }
            }
        }
    }
}
