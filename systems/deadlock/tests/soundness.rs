use std::collections::BTreeSet;

use proptest::prelude::*;
use pushbox_core::{CellCoord, Command, Direction, GridSize, Layout};
use pushbox_system_deadlock::DeadlockDetector;
use pushbox_world::{apply, query, PuzzleState};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Up),
        Just(Direction::Down),
        Just(Direction::Left),
        Just(Direction::Right),
    ]
}

/// Walks backwards from a solved board by pulling blocks.
///
/// Every pull can be undone by a push, so each board produced this way is
/// solvable.
fn pull(
    grid: GridSize,
    player: &mut CellCoord,
    blocks: &mut BTreeSet<CellCoord>,
    direction: Direction,
) {
    let Some(next) = player.step(direction, grid) else {
        return;
    };
    if blocks.contains(&next) {
        return;
    }
    let behind = player.step(direction.opposite(), grid);
    if let Some(behind) = behind.filter(|cell| blocks.contains(cell)) {
        let _ = blocks.remove(&behind);
        let _ = blocks.insert(*player);
    }
    *player = next;
}

proptest! {
    #[test]
    fn boards_reached_by_pulling_are_never_flagged(
        seed in any::<u64>(),
        pulls in prop::collection::vec(direction_strategy(), 0..150),
    ) {
        let grid = GridSize::new(7, 7);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let start = PuzzleState::random(grid, 3, &mut rng).expect("layout");
        let targets: Vec<CellCoord> = query::targets(&start).iter().copied().collect();

        let mut player = query::player(&start);
        let mut blocks: BTreeSet<CellCoord> = targets.iter().copied().collect();
        let detector = DeadlockDetector::new();

        for direction in pulls {
            pull(grid, &mut player, &mut blocks, direction);
            let state = PuzzleState::from_layout(&Layout {
                grid,
                player,
                blocks: blocks.iter().copied().collect(),
                targets: targets.clone(),
            })
            .expect("pulled layout stays valid");
            prop_assert_eq!(detector.diagnose(&state), None);
        }
    }

    #[test]
    fn off_target_corner_blocks_never_move(
        columns in 3u32..8,
        rows in 3u32..8,
        moves in prop::collection::vec(direction_strategy(), 0..200),
    ) {
        let grid = GridSize::new(columns, rows);
        let corners = [
            CellCoord::new(0, 0),
            CellCoord::new(columns - 1, 0),
            CellCoord::new(0, rows - 1),
            CellCoord::new(columns - 1, rows - 1),
        ];
        let mut state = PuzzleState::from_layout(&Layout {
            grid,
            player: CellCoord::new(1, 1),
            blocks: corners.to_vec(),
            targets: vec![
                CellCoord::new(1, 0),
                CellCoord::new(0, 1),
                CellCoord::new(columns - 1, 1),
                CellCoord::new(1, rows - 1),
            ],
        })
        .expect("corner layout");
        prop_assert!(DeadlockDetector::new().is_deadlocked(&state));

        let mut events = Vec::new();
        for direction in moves {
            let _ = apply(&mut state, Command::MovePlayer { direction }, &mut events);
            for corner in corners {
                prop_assert!(query::blocks(&state).contains(&corner));
            }
        }
    }

    #[test]
    fn random_layouts_start_live(
        seed in any::<u64>(),
        block_count in 1usize..=8,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let state = PuzzleState::random(GridSize::new(7, 7), block_count, &mut rng)
            .expect("layout");
        prop_assert_eq!(DeadlockDetector::new().diagnose(&state), None);
    }
}
