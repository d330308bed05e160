//! Random-policy rollouts standing in for a learning agent.

use anyhow::Result;
use pushbox_core::{Direction, EpisodeOutcome};
use pushbox_rendering::{GridPresentation, RenderingBackend, Scene};
use pushbox_system_episode::Episode;
use pushbox_world::query;
use rand::Rng;

/// Cell size used when capturing scenes for text output.
const CELL_LENGTH: f32 = 1.0;

/// Result of a single episode played to completion.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct EpisodeSummary {
    /// How the episode ended.
    pub(crate) outcome: EpisodeOutcome,
    /// Move requests issued.
    pub(crate) moves: u32,
    /// Undiscounted return.
    pub(crate) total_reward: f64,
}

/// Aggregate over several episodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct RolloutSummary {
    /// Episodes played.
    pub(crate) episodes: u32,
    /// Episodes won.
    pub(crate) wins: u32,
    /// Episodes lost to a deadlock.
    pub(crate) deadlocks: u32,
    /// Episodes cut short by the move budget.
    pub(crate) timeouts: u32,
    /// Sum of every episode's return.
    pub(crate) total_reward: f64,
}

impl RolloutSummary {
    /// Folds a finished episode into the aggregate.
    pub(crate) fn record(&mut self, episode: &EpisodeSummary) {
        self.episodes += 1;
        self.total_reward += episode.total_reward;
        match episode.outcome {
            EpisodeOutcome::Won => self.wins += 1,
            EpisodeOutcome::Deadlocked => self.deadlocks += 1,
            EpisodeOutcome::BudgetExhausted => self.timeouts += 1,
            EpisodeOutcome::InProgress => {}
        }
    }

    /// Mean return per episode.
    pub(crate) fn mean_reward(&self) -> f64 {
        if self.episodes == 0 {
            return 0.0;
        }
        self.total_reward / f64::from(self.episodes)
    }
}

/// Plays the episode's current puzzle to completion with uniformly random moves.
///
/// When a backend is supplied the board is presented before the first move
/// and after every step.
pub(crate) fn play<R>(
    episode: &mut Episode,
    policy: &mut R,
    mut backend: Option<&mut dyn RenderingBackend>,
) -> Result<EpisodeSummary>
where
    R: Rng + ?Sized,
{
    let grid = GridPresentation::new(query::grid(episode.state()), CELL_LENGTH)?;
    if let Some(backend) = backend.as_deref_mut() {
        backend.present(&Scene::capture(episode.state(), grid))?;
    }

    loop {
        let direction = Direction::ALL[policy.gen_range(0..Direction::ALL.len())];
        let result = episode.step(direction)?;
        if let Some(backend) = backend.as_deref_mut() {
            backend.present(&Scene::capture(episode.state(), grid))?;
        }
        if result.done {
            return Ok(EpisodeSummary {
                outcome: result.outcome,
                moves: query::moves_made(episode.state()),
                total_reward: episode.total_reward(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use pushbox_core::{CellCoord, EpisodeOutcome, GridSize, Layout};
    use pushbox_rendering::TextBackend;
    use pushbox_system_episode::{Episode, EpisodeConfig};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::{play, EpisodeSummary, RolloutSummary};

    #[test]
    fn random_policy_always_finishes_within_budget() {
        let config = EpisodeConfig {
            move_budget: 25,
            ..EpisodeConfig::default()
        };
        let mut episode = Episode::new(config).expect("episode");
        let mut policy = ChaCha8Rng::seed_from_u64(9);

        let summary = play(&mut episode, &mut policy, None).expect("rollout");

        assert!(summary.outcome.is_terminal());
        assert!(summary.moves <= 25);
    }

    #[test]
    fn rendering_presents_initial_board_and_every_step() {
        let layout = Layout {
            grid: GridSize::new(3, 3),
            player: CellCoord::new(1, 1),
            blocks: vec![CellCoord::new(0, 1)],
            targets: vec![CellCoord::new(2, 2)],
        };
        let config = EpisodeConfig {
            move_budget: 1,
            ..EpisodeConfig::default()
        };
        let mut episode = Episode::from_layout(config, layout).expect("episode");
        let mut backend = TextBackend::new(Vec::new());
        let mut policy = ChaCha8Rng::seed_from_u64(1);

        let _ = play(&mut episode, &mut policy, Some(&mut backend)).expect("rollout");

        let text = String::from_utf8(backend.into_inner()).expect("utf8");
        assert_eq!(text.matches("\n\n").count(), 2);
    }

    #[test]
    fn summary_tallies_outcomes() {
        let mut summary = RolloutSummary::default();
        for (outcome, total_reward) in [
            (EpisodeOutcome::Won, 40.0),
            (EpisodeOutcome::Deadlocked, -20.0),
            (EpisodeOutcome::BudgetExhausted, -5.0),
        ] {
            summary.record(&EpisodeSummary {
                outcome,
                moves: 10,
                total_reward,
            });
        }

        assert_eq!(summary.episodes, 3);
        assert_eq!(summary.wins, 1);
        assert_eq!(summary.deadlocks, 1);
        assert_eq!(summary.timeouts, 1);
        assert_eq!(summary.mean_reward(), 5.0);
    }
}
