//! Read-only view of the puzzle handed to the decision-making agent.

use pushbox_core::CellCoord;
use pushbox_world::{query, PuzzleState};
use serde::{Deserialize, Serialize};

/// Everything an agent may observe about the current puzzle.
///
/// Blocks and targets are listed in the puzzle's deterministic cell order,
/// and each offset list is aligned with its coordinate list. Blocks carry no
/// identity: a slot holds whichever block sorts there, so a push can move a
/// block to a different slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    /// Cell occupied by the player.
    pub player: CellCoord,
    /// Move legality in `Up, Down, Left, Right` order.
    pub can_move: [bool; 4],
    /// Block cells.
    pub blocks: Vec<CellCoord>,
    /// Target cells.
    pub targets: Vec<CellCoord>,
    /// Offset of every block relative to the player as `(columns, rows)`.
    pub block_offsets: Vec<(i64, i64)>,
    /// Offset of every target relative to the player as `(columns, rows)`.
    pub target_offsets: Vec<(i64, i64)>,
}

impl Observation {
    /// Captures the observation for the provided puzzle.
    #[must_use]
    pub fn capture(state: &PuzzleState) -> Self {
        let player = query::player(state);
        let blocks: Vec<CellCoord> = query::blocks(state).iter().copied().collect();
        let targets: Vec<CellCoord> = query::targets(state).iter().copied().collect();
        let block_offsets = blocks.iter().map(|block| block.offset_from(player)).collect();
        let target_offsets = targets
            .iter()
            .map(|target| target.offset_from(player))
            .collect();

        Self {
            player,
            can_move: query::move_legality(state),
            blocks,
            targets,
            block_offsets,
            target_offsets,
        }
    }

    /// Flattens the observation into a numeric input vector.
    ///
    /// Layout: player column and row, four legality flags, then the block
    /// offsets followed by the target offsets, each as a column/row pair.
    /// Block slots follow cell order, not a fixed block.
    #[must_use]
    pub fn feature_vector(&self) -> Vec<f32> {
        let mut features =
            Vec::with_capacity(6 + 2 * (self.block_offsets.len() + self.target_offsets.len()));
        features.push(self.player.column() as f32);
        features.push(self.player.row() as f32);
        features.extend(
            self.can_move
                .iter()
                .map(|legal| if *legal { 1.0 } else { 0.0 }),
        );
        for (columns, rows) in self.block_offsets.iter().chain(&self.target_offsets) {
            features.push(*columns as f32);
            features.push(*rows as f32);
        }
        features
    }
}
