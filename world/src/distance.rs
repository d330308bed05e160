//! Incremental bookkeeping of block-to-nearest-free-target distances.

use std::collections::{BTreeMap, BTreeSet};

use pushbox_core::CellCoord;

/// Distance of every off-target block to its nearest unoccupied target.
///
/// The cache is rebuilt from scratch only when a puzzle is created. Every
/// later change arrives as one of the narrow notifications below, and each
/// touches only the entries it can affect.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct DistanceCache {
    distances: BTreeMap<CellCoord, u32>,
    free_targets: BTreeSet<CellCoord>,
    total: u64,
}

impl DistanceCache {
    /// Builds the cache for a freshly installed arrangement.
    pub(crate) fn build(blocks: &BTreeSet<CellCoord>, targets: &BTreeSet<CellCoord>) -> Self {
        let free_targets: BTreeSet<CellCoord> = targets.difference(blocks).copied().collect();
        let mut cache = Self {
            distances: BTreeMap::new(),
            free_targets,
            total: 0,
        };
        for &block in blocks.difference(targets) {
            cache.insert_block(block);
        }
        cache
    }

    pub(crate) fn distance(&self, block: CellCoord) -> Option<u32> {
        self.distances.get(&block).copied()
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    pub(crate) fn free_target_count(&self) -> usize {
        self.free_targets.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (CellCoord, u32)> + '_ {
        self.distances.iter().map(|(cell, distance)| (*cell, *distance))
    }

    /// An off-target block slid onto another non-target cell.
    pub(crate) fn block_moved(&mut self, from: CellCoord, to: CellCoord) {
        self.remove_block(from);
        self.insert_block(to);
    }

    /// A block now rests off-target at `cell`.
    pub(crate) fn insert_block(&mut self, cell: CellCoord) {
        let distance = nearest(cell, &self.free_targets);
        self.set(cell, distance);
    }

    /// The off-target block at `cell` left it.
    pub(crate) fn remove_block(&mut self, cell: CellCoord) {
        if let Some(previous) = self.distances.remove(&cell) {
            self.total -= u64::from(previous);
        }
    }

    /// `target` is covered and no longer a valid destination.
    ///
    /// Only blocks whose cached distance was realised by `target` can change;
    /// all others already had an equally close or closer free target.
    pub(crate) fn target_occupied(&mut self, target: CellCoord) {
        if !self.free_targets.remove(&target) {
            return;
        }
        let affected: Vec<CellCoord> = self
            .distances
            .iter()
            .filter(|(block, distance)| block.manhattan_distance(target) == **distance)
            .map(|(block, _)| *block)
            .collect();
        for block in affected {
            let distance = nearest(block, &self.free_targets);
            self.set(block, distance);
        }
    }

    /// `target` is free again; every block may now be closer to a target.
    pub(crate) fn target_vacated(&mut self, target: CellCoord) {
        if !self.free_targets.insert(target) {
            return;
        }
        let mut total = 0;
        for (block, distance) in self.distances.iter_mut() {
            *distance = (*distance).min(block.manhattan_distance(target));
            total += u64::from(*distance);
        }
        self.total = total;
    }

    fn set(&mut self, block: CellCoord, distance: u32) {
        if let Some(previous) = self.distances.insert(block, distance) {
            self.total -= u64::from(previous);
        }
        self.total += u64::from(distance);
    }
}

// Block and target counts match, so an off-target block always has a free
// target; the zero fallback is unreachable for validated layouts.
fn nearest(block: CellCoord, free_targets: &BTreeSet<CellCoord>) -> u32 {
    free_targets
        .iter()
        .map(|target| block.manhattan_distance(*target))
        .min()
        .unwrap_or(0)
}
