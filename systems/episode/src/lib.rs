#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Episode orchestration for the Pushbox environment.
//!
//! An [`Episode`] owns one puzzle, its random source and the pure systems
//! that judge it. Each [`Episode::step`] resolves the move, checks for a
//! deadlock, shapes the reward and decides whether the episode is over.
//! Episodes share nothing, so parallel rollouts simply create one each.

mod observation;

use pushbox_core::{
    Command, Direction, EpisodeOutcome, Event, GridSize, Layout, LayoutError, MoveReport,
    MIN_GRID_DIMENSION,
};
use pushbox_system_deadlock::{Deadlock, DeadlockDetector};
use pushbox_system_reward::{PushClass, RewardConfig, RewardConfigError, RewardShaper};
use pushbox_world::{self as world, query, PuzzleState};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

pub use observation::Observation;

/// Settings shared by every episode an [`Episode`] runs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EpisodeConfig {
    /// Dimensions of the playing field.
    pub grid: GridSize,
    /// Number of blocks, and therefore targets, in random layouts.
    ///
    /// Placement avoids 2x2 squares of blocks while the interior has room.
    /// When the count nearly fills the interior a square can still be drawn,
    /// and such an episode is reported deadlocked on its first step.
    pub block_count: usize,
    /// Move requests allowed before the episode is cut short.
    pub move_budget: u32,
    /// Seed for the episode's random layouts.
    pub seed: u64,
    /// Reward magnitudes.
    pub reward: RewardConfig,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            grid: GridSize::default(),
            block_count: 3,
            move_budget: 350,
            seed: 0,
            reward: RewardConfig::default(),
        }
    }
}

impl EpisodeConfig {
    /// Checks that every random layout the configuration asks for can be drawn.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let columns = self.grid.columns();
        let rows = self.grid.rows();
        if columns < MIN_GRID_DIMENSION || rows < MIN_GRID_DIMENSION {
            return Err(ConfigError::GridTooSmall { columns, rows });
        }
        if self.block_count == 0 {
            return Err(ConfigError::NoBlocks);
        }
        if self.move_budget == 0 {
            return Err(ConfigError::ZeroMoveBudget);
        }

        // The player may stand inside the interior, which then loses a cell.
        let interior = usize::try_from(u64::from(columns - 2) * u64::from(rows - 2))
            .unwrap_or(usize::MAX);
        let remaining = self.grid.cell_count().saturating_sub(1 + self.block_count);
        if interior <= self.block_count || remaining < self.block_count {
            return Err(ConfigError::TooManyBlocks {
                block_count: self.block_count,
                columns,
                rows,
            });
        }

        self.reward.validate()?;
        Ok(())
    }
}

/// Reasons an episode configuration may be refused.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The grid cannot host a puzzle.
    #[error("grid {columns}x{rows} is too small")]
    GridTooSmall {
        /// Columns requested.
        columns: u32,
        /// Rows requested.
        rows: u32,
    },
    /// Episodes need at least one block.
    #[error("block_count must be at least 1")]
    NoBlocks,
    /// Episodes need at least one move.
    #[error("move_budget must be at least 1")]
    ZeroMoveBudget,
    /// Random placement could run out of cells.
    #[error("{block_count} blocks do not fit inside a {columns}x{rows} grid")]
    TooManyBlocks {
        /// Blocks requested.
        block_count: usize,
        /// Columns requested.
        columns: u32,
        /// Rows requested.
        rows: u32,
    },
    /// Reward magnitudes are inconsistent.
    #[error(transparent)]
    Reward(#[from] RewardConfigError),
}

/// Failures surfaced by [`Episode`].
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum EpisodeError {
    /// The configuration was refused.
    #[error("invalid episode configuration: {0}")]
    Config(#[from] ConfigError),
    /// The layout could not be installed.
    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),
    /// A move was requested after the episode ended.
    #[error("episode already finished ({outcome})")]
    EpisodeFinished {
        /// How the episode ended.
        outcome: EpisodeOutcome,
    },
}

/// Everything the caller learns from a single step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepResult {
    /// Shaping reward plus any terminal reward.
    pub reward: f64,
    /// Whether the episode ended with this step.
    pub done: bool,
    /// Whether the episode ended in a win.
    pub won: bool,
    /// Lifecycle stage after the step.
    pub outcome: EpisodeOutcome,
    /// Change record produced by the move.
    pub report: MoveReport,
    /// Branch of the shaping law that applied.
    pub class: PushClass,
    /// Rule that proved the puzzle unsolvable, when one fired.
    pub deadlock: Option<Deadlock>,
}

/// A single environment instance driving one puzzle at a time.
#[derive(Debug)]
pub struct Episode {
    config: EpisodeConfig,
    fixed_layout: Option<Layout>,
    rng: ChaCha8Rng,
    state: PuzzleState,
    shaper: RewardShaper,
    detector: DeadlockDetector,
    outcome: EpisodeOutcome,
    total_reward: f64,
    events: Vec<Event>,
}

impl Episode {
    /// Creates an episode that draws a fresh random layout on every reset.
    pub fn new(config: EpisodeConfig) -> Result<Self, EpisodeError> {
        config.validate()?;
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let state = PuzzleState::random(config.grid, config.block_count, &mut rng)?;
        Ok(Self::assemble(config, None, rng, state))
    }

    /// Creates an episode that replays `layout` on every reset.
    ///
    /// The layout's own grid and block count take precedence over the
    /// configured ones.
    pub fn from_layout(config: EpisodeConfig, layout: Layout) -> Result<Self, EpisodeError> {
        if config.move_budget == 0 {
            return Err(ConfigError::ZeroMoveBudget.into());
        }
        config.reward.validate().map_err(ConfigError::from)?;
        let state = PuzzleState::from_layout(&layout)?;
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Ok(Self::assemble(config, Some(layout), rng, state))
    }

    fn assemble(
        config: EpisodeConfig,
        fixed_layout: Option<Layout>,
        rng: ChaCha8Rng,
        state: PuzzleState,
    ) -> Self {
        let shaper = RewardShaper::new(config.reward.clone());
        Self {
            config,
            fixed_layout,
            rng,
            state,
            shaper,
            detector: DeadlockDetector::new(),
            outcome: EpisodeOutcome::InProgress,
            total_reward: 0.0,
            events: Vec::new(),
        }
    }

    /// Installs a new arrangement and returns the initial observation.
    pub fn reset(&mut self) -> Result<Observation, EpisodeError> {
        self.state = match &self.fixed_layout {
            Some(layout) => PuzzleState::from_layout(layout)?,
            None => {
                PuzzleState::random(self.config.grid, self.config.block_count, &mut self.rng)?
            }
        };
        self.outcome = EpisodeOutcome::InProgress;
        self.total_reward = 0.0;
        self.events.clear();
        tracing::debug!(
            player = %query::player(&self.state),
            blocks = query::blocks(&self.state).len(),
            total_distance = query::total_distance(&self.state),
            "episode reset"
        );
        Ok(self.observation())
    }

    /// Moves the player one cell and scores the result.
    pub fn step(&mut self, direction: Direction) -> Result<StepResult, EpisodeError> {
        if self.outcome.is_terminal() {
            return Err(EpisodeError::EpisodeFinished {
                outcome: self.outcome,
            });
        }

        let before = query::distance_snapshot(&self.state);
        self.events.clear();
        let report = world::apply(
            &mut self.state,
            Command::MovePlayer { direction },
            &mut self.events,
        );
        let shaping = self.shaper.shape(&report, &before, &self.state);

        let mut deadlock = None;
        self.outcome = if query::is_solved(&self.state) {
            EpisodeOutcome::Won
        } else if let Some(rule) = self.detector.diagnose(&self.state) {
            deadlock = Some(rule);
            EpisodeOutcome::Deadlocked
        } else if query::moves_made(&self.state) >= self.config.move_budget {
            EpisodeOutcome::BudgetExhausted
        } else {
            EpisodeOutcome::InProgress
        };

        let reward = shaping.reward + self.shaper.terminal(&self.outcome);
        self.total_reward += reward;

        tracing::trace!(
            ?direction,
            legal = report.player_moved,
            class = ?shaping.class,
            reward,
            "step resolved"
        );
        if self.outcome.is_terminal() {
            tracing::info!(
                outcome = %self.outcome,
                moves = query::moves_made(&self.state),
                total_reward = self.total_reward,
                deadlock = ?deadlock,
                "episode finished"
            );
        }

        Ok(StepResult {
            reward,
            done: self.outcome.is_terminal(),
            won: self.outcome.is_won(),
            outcome: self.outcome,
            report,
            class: shaping.class,
            deadlock,
        })
    }

    /// Observation of the current puzzle.
    #[must_use]
    pub fn observation(&self) -> Observation {
        Observation::capture(&self.state)
    }

    /// Read-only access to the puzzle for rendering and other collaborators.
    #[must_use]
    pub fn state(&self) -> &PuzzleState {
        &self.state
    }

    /// Lifecycle stage after the latest step.
    #[must_use]
    pub fn outcome(&self) -> EpisodeOutcome {
        self.outcome
    }

    /// Sum of every reward handed out since the last reset.
    #[must_use]
    pub fn total_reward(&self) -> f64 {
        self.total_reward
    }

    /// Events emitted by the latest step.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Configuration the episode runs with.
    #[must_use]
    pub fn config(&self) -> &EpisodeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use pushbox_core::GridSize;

    use super::{ConfigError, EpisodeConfig};

    #[test]
    fn default_config_is_valid() {
        assert_eq!(EpisodeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn crowded_grid_is_refused() {
        let config = EpisodeConfig {
            grid: GridSize::new(4, 4),
            block_count: 4,
            ..EpisodeConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::TooManyBlocks {
                block_count: 4,
                columns: 4,
                rows: 4,
            })
        );
    }

    #[test]
    fn zero_budget_is_refused() {
        let config = EpisodeConfig {
            move_budget: 0,
            ..EpisodeConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMoveBudget));
    }

    #[test]
    fn toml_overrides_merge_with_defaults() {
        let config: EpisodeConfig = toml::from_str(
            r#"
            block_count = 2
            seed = 7

            [grid]
            columns = 7
            rows = 6

            [reward]
            win_bonus = 75.0
            "#,
        )
        .expect("parse");

        assert_eq!(config.grid, GridSize::new(7, 6));
        assert_eq!(config.block_count, 2);
        assert_eq!(config.move_budget, 350);
        assert_eq!(config.reward.win_bonus, 75.0);
        assert_eq!(config.reward.time_cost, 1.0);
        assert_eq!(config.validate(), Ok(()));
    }
}
