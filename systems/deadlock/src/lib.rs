#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that decides whether a puzzle can no longer be solved.
//!
//! The detector is conservative: every rule it applies identifies a block
//! that can never reach a target, so a verdict of "deadlocked" is always
//! correct, while some unsolvable boards slip through undetected.

use pushbox_core::{Border, CellCoord, GridSize};
use pushbox_world::{query, PuzzleState};

/// Specific rule that proved the puzzle unsolvable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deadlock {
    /// An off-target block sits in a grid corner and can never be pushed out.
    CornerBlock {
        /// Corner occupied by the block.
        cell: CellCoord,
    },
    /// A border holds more off-target blocks than it has free targets.
    ///
    /// Blocks touching a border can slide along it but never leave it.
    BorderOverflow {
        /// Border that overflowed.
        border: Border,
        /// Off-target blocks touching the border.
        blocks: usize,
        /// Unoccupied targets on the border.
        free_targets: usize,
    },
    /// Two neighbouring blocks along a border, at least one off target,
    /// pin each other in place.
    FrozenBorderPair {
        /// Block closer to the grid origin.
        first: CellCoord,
        /// Block further from the grid origin.
        second: CellCoord,
    },
    /// Four blocks forming a 2×2 square, at least one off target; no block of
    /// the square can ever be pushed.
    FrozenSquare {
        /// Upper-left block of the square.
        origin: CellCoord,
    },
}

/// Conservative unsolvability check run once per step over the full board.
#[derive(Clone, Copy, Debug, Default)]
pub struct DeadlockDetector;

impl DeadlockDetector {
    /// Creates a new detector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Reports whether the puzzle has become unsolvable.
    #[must_use]
    pub fn is_deadlocked(&self, state: &PuzzleState) -> bool {
        self.diagnose(state).is_some()
    }

    /// Names the first rule that proves the puzzle unsolvable, if any.
    #[must_use]
    pub fn diagnose(&self, state: &PuzzleState) -> Option<Deadlock> {
        corner_block(state)
            .or_else(|| border_overflow(state))
            .or_else(|| frozen_border_pair(state))
            .or_else(|| frozen_square(state))
    }
}

fn off_target_blocks(state: &PuzzleState) -> impl Iterator<Item = CellCoord> + '_ {
    query::blocks(state)
        .iter()
        .copied()
        .filter(move |block| !query::is_target(state, *block))
}

fn corner_block(state: &PuzzleState) -> Option<Deadlock> {
    let grid = query::grid(state);
    off_target_blocks(state)
        .find(|block| grid.is_corner(*block))
        .map(|cell| Deadlock::CornerBlock { cell })
}

fn border_overflow(state: &PuzzleState) -> Option<Deadlock> {
    let grid = query::grid(state);
    let occupied = query::occupied_targets(state);
    Border::ALL.into_iter().find_map(|border| {
        let blocks = off_target_blocks(state)
            .filter(|block| grid.touches(*block, border))
            .count();
        if blocks == 0 {
            return None;
        }
        let free_targets = query::targets(state)
            .iter()
            .filter(|target| grid.touches(**target, border) && !occupied.contains(*target))
            .count();
        (blocks > free_targets).then_some(Deadlock::BorderOverflow {
            border,
            blocks,
            free_targets,
        })
    })
}

fn frozen_border_pair(state: &PuzzleState) -> Option<Deadlock> {
    let grid = query::grid(state);
    for block in query::blocks(state).iter().copied() {
        for border in grid.borders_touching(block) {
            let Some(neighbour) = along_border(block, border, grid) else {
                continue;
            };
            if !query::is_block(state, neighbour) {
                continue;
            }
            let settled = query::is_target(state, block) && query::is_target(state, neighbour);
            if !settled {
                return Some(Deadlock::FrozenBorderPair {
                    first: block,
                    second: neighbour,
                });
            }
        }
    }
    None
}

// Next cell along the border, moving away from the grid origin.
fn along_border(cell: CellCoord, border: Border, grid: GridSize) -> Option<CellCoord> {
    let next = match border {
        Border::Top | Border::Bottom => CellCoord::new(cell.column() + 1, cell.row()),
        Border::Left | Border::Right => CellCoord::new(cell.column(), cell.row() + 1),
    };
    grid.contains(next).then_some(next)
}

fn frozen_square(state: &PuzzleState) -> Option<Deadlock> {
    query::blocks(state).iter().copied().find_map(|origin| {
        let square = [
            origin,
            CellCoord::new(origin.column() + 1, origin.row()),
            CellCoord::new(origin.column(), origin.row() + 1),
            CellCoord::new(origin.column() + 1, origin.row() + 1),
        ];
        let all_blocks = square.iter().all(|cell| query::is_block(state, *cell));
        let settled = square.iter().all(|cell| query::is_target(state, *cell));
        (all_blocks && !settled).then_some(Deadlock::FrozenSquare { origin })
    })
}

#[cfg(test)]
mod tests {
    use pushbox_core::{Border, CellCoord, GridSize, Layout};
    use pushbox_world::PuzzleState;

    use super::{Deadlock, DeadlockDetector};

    fn state(
        grid: (u32, u32),
        player: (u32, u32),
        blocks: &[(u32, u32)],
        targets: &[(u32, u32)],
    ) -> PuzzleState {
        let cell = |(column, row): (u32, u32)| CellCoord::new(column, row);
        PuzzleState::from_layout(&Layout {
            grid: GridSize::new(grid.0, grid.1),
            player: cell(player),
            blocks: blocks.iter().copied().map(cell).collect(),
            targets: targets.iter().copied().map(cell).collect(),
        })
        .expect("valid layout")
    }

    #[test]
    fn corner_block_off_target_is_dead() {
        let puzzle = state((9, 9), (4, 4), &[(8, 0)], &[(3, 3)]);
        assert_eq!(
            DeadlockDetector::new().diagnose(&puzzle),
            Some(Deadlock::CornerBlock {
                cell: CellCoord::new(8, 0)
            })
        );
    }

    #[test]
    fn corner_block_on_target_is_alive() {
        let puzzle = state((9, 9), (4, 4), &[(0, 0), (3, 3)], &[(0, 0), (5, 5)]);
        assert!(!DeadlockDetector::new().is_deadlocked(&puzzle));
    }

    #[test]
    fn border_block_with_matching_target_is_alive() {
        let puzzle = state((9, 9), (4, 4), &[(3, 0)], &[(6, 0)]);
        assert!(!DeadlockDetector::new().is_deadlocked(&puzzle));
    }

    #[test]
    fn border_block_without_target_on_border_is_dead() {
        let puzzle = state((9, 9), (4, 4), &[(0, 4)], &[(3, 3)]);
        assert_eq!(
            DeadlockDetector::new().diagnose(&puzzle),
            Some(Deadlock::BorderOverflow {
                border: Border::Left,
                blocks: 1,
                free_targets: 0,
            })
        );
    }

    #[test]
    fn occupied_border_target_does_not_count_as_free() {
        let puzzle = state((9, 9), (4, 4), &[(2, 8), (5, 8)], &[(2, 8), (4, 4)]);
        assert_eq!(
            DeadlockDetector::new().diagnose(&puzzle),
            Some(Deadlock::BorderOverflow {
                border: Border::Bottom,
                blocks: 1,
                free_targets: 0,
            })
        );
    }

    #[test]
    fn adjacent_blocks_along_border_are_frozen() {
        let puzzle = state((9, 9), (4, 4), &[(3, 0), (4, 0)], &[(3, 0), (7, 0)]);
        assert_eq!(
            DeadlockDetector::new().diagnose(&puzzle),
            Some(Deadlock::FrozenBorderPair {
                first: CellCoord::new(3, 0),
                second: CellCoord::new(4, 0),
            })
        );
    }

    #[test]
    fn perpendicular_pair_at_border_is_alive() {
        let puzzle = state((9, 9), (4, 4), &[(3, 0), (3, 1)], &[(5, 0), (6, 6)]);
        assert!(!DeadlockDetector::new().is_deadlocked(&puzzle));
    }

    #[test]
    fn square_of_blocks_is_frozen() {
        let puzzle = state(
            (9, 9),
            (0, 0),
            &[(3, 3), (4, 3), (3, 4), (4, 4)],
            &[(3, 3), (4, 3), (1, 6), (6, 6)],
        );
        assert_eq!(
            DeadlockDetector::new().diagnose(&puzzle),
            Some(Deadlock::FrozenSquare {
                origin: CellCoord::new(3, 3)
            })
        );
    }

    #[test]
    fn settled_square_is_not_a_deadlock() {
        let squares = [(3, 3), (4, 3), (3, 4), (4, 4)];
        let puzzle = state((9, 9), (0, 0), &squares, &squares);
        assert!(!DeadlockDetector::new().is_deadlocked(&puzzle));
    }
}
