use proptest::prelude::*;
use pushbox_core::{Border, CellCoord, Direction, EpisodeOutcome, GridSize, Layout};
use pushbox_system_deadlock::Deadlock;
use pushbox_system_episode::{Episode, EpisodeConfig, EpisodeError};
use pushbox_system_reward::PushClass;
use pushbox_world::query;

fn layout(player: (u32, u32), blocks: &[(u32, u32)], targets: &[(u32, u32)]) -> Layout {
    let cell = |(column, row): (u32, u32)| CellCoord::new(column, row);
    Layout {
        grid: GridSize::new(9, 9),
        player: cell(player),
        blocks: blocks.iter().copied().map(cell).collect(),
        targets: targets.iter().copied().map(cell).collect(),
    }
}

fn fixed(layout: Layout, move_budget: u32) -> Episode {
    let config = EpisodeConfig {
        move_budget,
        ..EpisodeConfig::default()
    };
    Episode::from_layout(config, layout).expect("episode")
}

#[test]
fn pushing_block_home_wins_on_that_step() {
    let mut episode = fixed(layout((0, 1), &[(1, 1)], &[(3, 1)]), 350);

    let first = episode.step(Direction::Right).expect("step");
    assert!(!first.done);
    assert_eq!(first.class, PushClass::Floor { distance_delta: 1 });
    assert_eq!(first.reward, 1.0);

    let second = episode.step(Direction::Right).expect("step");
    assert!(second.done);
    assert!(second.won);
    assert_eq!(second.class, PushClass::Placed);
    assert_eq!(second.reward, 59.0);
    assert!(second.reward > first.reward);
    assert_eq!(episode.total_reward(), 60.0);
}

#[test]
fn illegal_push_leaves_board_untouched() {
    let mut episode = fixed(layout((1, 1), &[(0, 1)], &[(0, 4)]), 350);
    let before = episode.observation();

    let result = episode.step(Direction::Left).expect("step");

    assert!(result.report.is_rejected());
    assert!(!result.done);
    assert_eq!(result.reward, -6.0);
    let after = episode.observation();
    assert_eq!(after.player, before.player);
    assert_eq!(after.blocks, before.blocks);
    assert_eq!(query::moves_made(episode.state()), 1);
}

#[test]
fn block_starting_on_target_wins_on_first_step() {
    let mut episode = fixed(layout((5, 5), &[(2, 2)], &[(2, 2)]), 350);
    assert!(query::is_solved(episode.state()));

    let result = episode.step(Direction::Left).expect("step");

    assert!(result.won);
    assert_eq!(result.reward, 49.0);
    assert!(query::is_solved(episode.state()));
    assert_eq!(
        episode.step(Direction::Right),
        Err(EpisodeError::EpisodeFinished {
            outcome: EpisodeOutcome::Won
        })
    );
}

#[test]
fn pushing_block_onto_empty_border_is_deadlock() {
    let mut episode = fixed(layout((2, 2), &[(1, 2)], &[(5, 5)]), 350);

    let result = episode.step(Direction::Left).expect("step");

    assert!(result.done);
    assert!(!result.won);
    assert_eq!(result.outcome, EpisodeOutcome::Deadlocked);
    assert_eq!(
        result.deadlock,
        Some(Deadlock::BorderOverflow {
            border: Border::Left,
            blocks: 1,
            free_targets: 0,
        })
    );
    assert_eq!(result.reward, -18.0);
}

#[test]
fn budget_runs_out_after_last_allowed_move() {
    let mut episode = fixed(layout((0, 0), &[(4, 4)], &[(6, 6)]), 3);

    for _ in 0..2 {
        let result = episode.step(Direction::Up).expect("step");
        assert!(!result.done);
    }
    let last = episode.step(Direction::Up).expect("step");

    assert_eq!(last.outcome, EpisodeOutcome::BudgetExhausted);
    assert!(last.done);
    assert_eq!(last.reward, -16.0);
    assert!(matches!(
        episode.step(Direction::Down),
        Err(EpisodeError::EpisodeFinished { .. })
    ));
}

#[test]
fn win_takes_precedence_over_budget() {
    let mut episode = fixed(layout((0, 1), &[(1, 1)], &[(3, 1)]), 2);
    let _ = episode.step(Direction::Right).expect("step");
    let result = episode.step(Direction::Right).expect("step");
    assert_eq!(result.outcome, EpisodeOutcome::Won);
}

#[test]
fn reset_restores_fixed_layout() {
    let start = layout((0, 1), &[(1, 1)], &[(3, 1)]);
    let mut episode = fixed(start.clone(), 350);
    let _ = episode.step(Direction::Right).expect("step");
    let _ = episode.step(Direction::Right).expect("step");

    let observation = episode.reset().expect("reset");

    assert_eq!(query::layout(episode.state()), start);
    assert_eq!(observation.player, CellCoord::new(0, 1));
    assert_eq!(episode.outcome(), EpisodeOutcome::InProgress);
    assert_eq!(episode.total_reward(), 0.0);
    assert_eq!(query::moves_made(episode.state()), 0);
}

#[test]
fn identical_seeds_replay_identical_layouts() {
    let config = EpisodeConfig {
        seed: 42,
        ..EpisodeConfig::default()
    };
    let mut first = Episode::new(config.clone()).expect("episode");
    let mut second = Episode::new(config).expect("episode");

    for _ in 0..5 {
        assert_eq!(
            first.reset().expect("reset"),
            second.reset().expect("reset")
        );
    }
}

#[test]
fn episodes_can_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<Episode>();
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![
        Just(Direction::Up),
        Just(Direction::Down),
        Just(Direction::Left),
        Just(Direction::Right),
    ]
}

proptest! {
    #[test]
    fn random_rollouts_terminate_within_budget(
        seed in any::<u64>(),
        directions in prop::collection::vec(direction_strategy(), 40..80),
    ) {
        let config = EpisodeConfig {
            seed,
            move_budget: 40,
            grid: GridSize::new(7, 7),
            ..EpisodeConfig::default()
        };
        let mut episode = Episode::new(config).expect("episode");
        let _ = episode.reset().expect("reset");

        let mut returned = 0.0;
        let mut finished = false;
        for direction in directions {
            if finished {
                prop_assert!(episode.step(direction).is_err());
                continue;
            }
            let result = episode.step(direction).expect("step");
            returned += result.reward;
            prop_assert_eq!(result.done, result.outcome.is_terminal());
            prop_assert_eq!(result.won, query::is_solved(episode.state()));
            prop_assert_eq!(result.deadlock.is_some(), result.outcome == EpisodeOutcome::Deadlocked);
            prop_assert!(query::moves_made(episode.state()) <= 40);
            finished = result.done;
        }

        prop_assert!(finished);
        prop_assert!((returned - episode.total_reward()).abs() < 1e-9);
    }
}
