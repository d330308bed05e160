#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative puzzle state management for Pushbox.
//!
//! [`PuzzleState`] owns the player, block and target positions together with
//! the derived occupancy and distance bookkeeping. The only mutator is
//! [`apply`], which resolves a move request, relocates at most one block and
//! reports what changed. Everything else reads through [`query`].

mod distance;
mod placement;

use std::collections::BTreeSet;

use pushbox_core::{
    CellCoord, Command, Direction, Event, GridSize, Layout, LayoutError, MoveRejection,
    MoveReport,
};
use rand::Rng;

use crate::distance::DistanceCache;

/// Represents the authoritative state of a single puzzle episode.
#[derive(Clone, Debug)]
pub struct PuzzleState {
    grid: GridSize,
    player: CellCoord,
    blocks: BTreeSet<CellCoord>,
    targets: BTreeSet<CellCoord>,
    occupied_targets: BTreeSet<CellCoord>,
    distances: DistanceCache,
    moves_made: u32,
}

impl PuzzleState {
    /// Installs the provided arrangement, crediting any block that already
    /// rests on a target.
    pub fn from_layout(layout: &Layout) -> Result<Self, LayoutError> {
        layout.validate()?;

        let blocks: BTreeSet<CellCoord> = layout.blocks.iter().copied().collect();
        let targets: BTreeSet<CellCoord> = layout.targets.iter().copied().collect();
        let occupied_targets: BTreeSet<CellCoord> =
            blocks.intersection(&targets).copied().collect();
        let distances = DistanceCache::build(&blocks, &targets);

        Ok(Self {
            grid: layout.grid,
            player: layout.player,
            blocks,
            targets,
            occupied_targets,
            distances,
            moves_made: 0,
        })
    }

    /// Draws a random non-overlapping arrangement and installs it.
    pub fn random<R>(grid: GridSize, block_count: usize, rng: &mut R) -> Result<Self, LayoutError>
    where
        R: Rng + ?Sized,
    {
        let layout = placement::random_layout(grid, block_count, rng)?;
        Self::from_layout(&layout)
    }

    fn push_block(&mut self, from: CellCoord, to: CellCoord, out_events: &mut Vec<Event>) {
        let _ = self.blocks.remove(&from);
        let _ = self.blocks.insert(to);
        out_events.push(Event::BlockPushed { from, to });

        let left_target = self.occupied_targets.remove(&from);
        let reached_target = self.targets.contains(&to);
        if left_target {
            out_events.push(Event::TargetVacated { cell: from });
        }
        if reached_target {
            let _ = self.occupied_targets.insert(to);
            out_events.push(Event::TargetOccupied { cell: to });
        }

        match (left_target, reached_target) {
            (false, false) => self.distances.block_moved(from, to),
            (false, true) => {
                self.distances.remove_block(from);
                self.distances.target_occupied(to);
            }
            (true, false) => {
                self.distances.target_vacated(from);
                self.distances.insert_block(to);
            }
            (true, true) => {
                self.distances.target_vacated(from);
                self.distances.target_occupied(to);
            }
        }
    }
}

/// Outcome of the legality rule for a single requested step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Resolution {
    Step { to: CellCoord },
    Push { to: CellCoord, block_to: CellCoord },
    Rejected(MoveRejection),
}

fn resolve(state: &PuzzleState, direction: Direction) -> Resolution {
    let Some(next) = state.player.step(direction, state.grid) else {
        return Resolution::Rejected(MoveRejection::OutOfBounds);
    };
    if !state.blocks.contains(&next) {
        return Resolution::Step { to: next };
    }
    let Some(beyond) = next.step(direction, state.grid) else {
        return Resolution::Rejected(MoveRejection::BlockAgainstEdge);
    };
    if state.blocks.contains(&beyond) {
        return Resolution::Rejected(MoveRejection::BlockAgainstBlock);
    }
    Resolution::Push {
        to: next,
        block_to: beyond,
    }
}

/// Applies the provided command to the puzzle, mutating state deterministically.
///
/// Every move request counts against the move budget, including illegal
/// ones, which leave the player and blocks untouched.
pub fn apply(state: &mut PuzzleState, command: Command, out_events: &mut Vec<Event>) -> MoveReport {
    match command {
        Command::MovePlayer { direction } => {
            state.moves_made = state.moves_made.saturating_add(1);
            let from = state.player;
            match resolve(state, direction) {
                Resolution::Rejected(reason) => {
                    out_events.push(Event::MoveRejected { direction, reason });
                    MoveReport::rejected()
                }
                Resolution::Step { to } => {
                    state.player = to;
                    out_events.push(Event::PlayerMoved { from, to });
                    MoveReport::moved()
                }
                Resolution::Push { to, block_to } => {
                    state.push_block(to, block_to, out_events);
                    state.player = to;
                    out_events.push(Event::PlayerMoved { from, to });
                    MoveReport::pushed(to, block_to)
                }
            }
        }
    }
}

/// Query functions that provide read-only access to the puzzle state.
pub mod query {
    use std::collections::BTreeSet;

    use pushbox_core::{CellCoord, Direction, GridSize, Layout};

    use super::{resolve, PuzzleState, Resolution};

    /// Provides the dimensions of the playing field.
    #[must_use]
    pub fn grid(state: &PuzzleState) -> GridSize {
        state.grid
    }

    /// Cell currently occupied by the player.
    #[must_use]
    pub fn player(state: &PuzzleState) -> CellCoord {
        state.player
    }

    /// Cells occupied by blocks in deterministic order.
    #[must_use]
    pub fn blocks(state: &PuzzleState) -> &BTreeSet<CellCoord> {
        &state.blocks
    }

    /// Target cells in deterministic order.
    #[must_use]
    pub fn targets(state: &PuzzleState) -> &BTreeSet<CellCoord> {
        &state.targets
    }

    /// Targets currently covered by a block.
    #[must_use]
    pub fn occupied_targets(state: &PuzzleState) -> &BTreeSet<CellCoord> {
        &state.occupied_targets
    }

    /// Reports whether a block occupies the cell.
    #[must_use]
    pub fn is_block(state: &PuzzleState, cell: CellCoord) -> bool {
        state.blocks.contains(&cell)
    }

    /// Reports whether the cell is a target.
    #[must_use]
    pub fn is_target(state: &PuzzleState, cell: CellCoord) -> bool {
        state.targets.contains(&cell)
    }

    /// Reports whether the player may step in `direction`.
    ///
    /// Uses the same legality rule as [`super::apply`].
    #[must_use]
    pub fn can_move(state: &PuzzleState, direction: Direction) -> bool {
        !matches!(resolve(state, direction), Resolution::Rejected(_))
    }

    /// Move legality for every direction in [`Direction::ALL`] order.
    #[must_use]
    pub fn move_legality(state: &PuzzleState) -> [bool; 4] {
        Direction::ALL.map(|direction| can_move(state, direction))
    }

    /// Number of move requests processed since the arrangement was installed.
    #[must_use]
    pub fn moves_made(state: &PuzzleState) -> u32 {
        state.moves_made
    }

    /// Cached distance from an off-target block to its nearest free target.
    #[must_use]
    pub fn block_distance(state: &PuzzleState, block: CellCoord) -> Option<u32> {
        state.distances.distance(block)
    }

    /// Every cached block distance in deterministic order.
    pub fn block_distances(state: &PuzzleState) -> impl Iterator<Item = (CellCoord, u32)> + '_ {
        state.distances.iter()
    }

    /// Sum of all cached block distances.
    #[must_use]
    pub fn total_distance(state: &PuzzleState) -> u64 {
        state.distances.total()
    }

    /// Number of targets no block currently covers.
    #[must_use]
    pub fn free_target_count(state: &PuzzleState) -> usize {
        state.distances.free_target_count()
    }

    /// Reports whether every target is covered.
    #[must_use]
    pub fn is_solved(state: &PuzzleState) -> bool {
        state.occupied_targets.len() == state.targets.len()
    }

    /// Captures the figures reward shaping compares across a step.
    #[must_use]
    pub fn distance_snapshot(state: &PuzzleState) -> DistanceSnapshot {
        DistanceSnapshot {
            total_distance: state.distances.total(),
            occupied_targets: state.occupied_targets.len(),
        }
    }

    /// Snapshot of the current arrangement.
    #[must_use]
    pub fn layout(state: &PuzzleState) -> Layout {
        Layout {
            grid: state.grid,
            player: state.player,
            blocks: state.blocks.iter().copied().collect(),
            targets: state.targets.iter().copied().collect(),
        }
    }

    /// Distance bookkeeping figures captured at a single point in time.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct DistanceSnapshot {
        /// Sum of every off-target block's distance to its nearest free target.
        pub total_distance: u64,
        /// Number of targets covered by a block.
        pub occupied_targets: usize,
    }
}
