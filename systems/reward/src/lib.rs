#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure reward shaping system that scores each step of a Pushbox episode.
//!
//! The shaper never scans the board. It classifies the step from the
//! [`MoveReport`] change record and, for ordinary floor pushes, compares the
//! running distance totals captured before and after the move.

use pushbox_core::{EpisodeOutcome, MoveReport};
use pushbox_world::{
    query::{self, DistanceSnapshot},
    PuzzleState,
};
use serde::{Deserialize, Serialize};

/// Tuning knobs controlling every reward the shaper can emit.
///
/// Magnitudes are ordered so that the win bonus outweighs any single shaping
/// reward, which in turn outweighs the per-step time cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Charged on every step, legal or not.
    pub time_cost: f64,
    /// Extra charge for a move the resolver rejected.
    pub illegal_move_penalty: f64,
    /// Reward per cell of total block distance removed by a floor push.
    pub distance_weight: f64,
    /// Reward for pushing a block onto a free target.
    pub placement_reward: f64,
    /// Charge for pushing a block off a target onto the floor.
    pub displacement_penalty: f64,
    /// Reward for sliding a block from one target straight onto another.
    pub target_slide_reward: f64,
    /// Terminal bonus once every target is covered.
    pub win_bonus: f64,
    /// Terminal charge when the puzzle becomes unsolvable.
    pub deadlock_penalty: f64,
    /// Terminal charge when the move budget runs out.
    pub timeout_penalty: f64,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            time_cost: 1.0,
            illegal_move_penalty: 5.0,
            distance_weight: 2.0,
            placement_reward: 10.0,
            displacement_penalty: 10.0,
            target_slide_reward: 0.5,
            win_bonus: 50.0,
            deadlock_penalty: 15.0,
            timeout_penalty: 10.0,
        }
    }
}

impl RewardConfig {
    /// Checks that the reward magnitudes keep their required ordering.
    pub fn validate(&self) -> Result<(), RewardConfigError> {
        let all = [
            ("time_cost", self.time_cost),
            ("illegal_move_penalty", self.illegal_move_penalty),
            ("distance_weight", self.distance_weight),
            ("placement_reward", self.placement_reward),
            ("displacement_penalty", self.displacement_penalty),
            ("target_slide_reward", self.target_slide_reward),
            ("win_bonus", self.win_bonus),
            ("deadlock_penalty", self.deadlock_penalty),
            ("timeout_penalty", self.timeout_penalty),
        ];
        if let Some((name, value)) = all.into_iter().find(|(_, value)| !value.is_finite()) {
            return Err(RewardConfigError::NotFinite { name, value });
        }
        if self.time_cost <= 0.0 {
            return Err(RewardConfigError::NonPositiveTimeCost {
                value: self.time_cost,
            });
        }

        let penalties = [
            ("illegal_move_penalty", self.illegal_move_penalty),
            ("displacement_penalty", self.displacement_penalty),
            ("deadlock_penalty", self.deadlock_penalty),
            ("timeout_penalty", self.timeout_penalty),
        ];
        if let Some((name, value)) = penalties.into_iter().find(|(_, value)| *value < 0.0) {
            return Err(RewardConfigError::NegativePenalty { name, value });
        }

        let rewards = [
            ("placement_reward", self.placement_reward),
            ("target_slide_reward", self.target_slide_reward),
        ];
        if let Some((name, value)) = rewards.into_iter().find(|(_, value)| *value <= 0.0) {
            return Err(RewardConfigError::NonPositiveReward { name, value });
        }

        // A single cell of progress or a placement must outweigh the step it took.
        let progress = [
            ("distance_weight", self.distance_weight),
            ("placement_reward", self.placement_reward),
        ];
        if let Some((name, value)) = progress
            .into_iter()
            .find(|(_, value)| *value <= self.time_cost)
        {
            return Err(RewardConfigError::BelowTimeCost {
                name,
                value,
                time_cost: self.time_cost,
            });
        }

        let largest_shaping = [
            self.distance_weight,
            self.placement_reward,
            self.target_slide_reward,
        ]
        .into_iter()
        .fold(f64::MIN, f64::max);
        if self.win_bonus <= largest_shaping {
            return Err(RewardConfigError::WinBonusTooSmall {
                win_bonus: self.win_bonus,
                largest_shaping,
            });
        }
        Ok(())
    }
}

/// Reasons a reward configuration may be refused.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RewardConfigError {
    /// A magnitude is NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NotFinite {
        /// Offending field.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The per-step time cost must be strictly positive.
    #[error("time_cost must be positive, got {value}")]
    NonPositiveTimeCost {
        /// Rejected value.
        value: f64,
    },
    /// Penalties are magnitudes and must not be negative.
    #[error("{name} must not be negative, got {value}")]
    NegativePenalty {
        /// Offending field.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A shaping reward that must be positive is zero or negative.
    #[error("{name} must be positive, got {value}")]
    NonPositiveReward {
        /// Offending field.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// A progress reward does not exceed the per-step time cost.
    #[error("{name} ({value}) must exceed time_cost ({time_cost})")]
    BelowTimeCost {
        /// Offending field.
        name: &'static str,
        /// Rejected value.
        value: f64,
        /// Configured time cost.
        time_cost: f64,
    },
    /// The win bonus does not dominate every shaping reward.
    #[error("win_bonus ({win_bonus}) must exceed every shaping reward ({largest_shaping})")]
    WinBonusTooSmall {
        /// Configured win bonus.
        win_bonus: f64,
        /// Largest shaping reward.
        largest_shaping: f64,
    },
}

/// Classification of what the step did to the blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushClass {
    /// A block moved from the floor onto a target.
    Placed,
    /// A block moved from a target onto the floor.
    Displaced,
    /// A block moved from one target directly onto another.
    TargetSlide,
    /// A block moved between two floor cells.
    Floor {
        /// Decrease in total block distance; negative when the push lost ground.
        distance_delta: i64,
    },
    /// No block moved.
    NoPush,
}

/// Non-terminal reward produced for a single step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Shaping {
    /// Scalar reward including the time cost.
    pub reward: f64,
    /// Branch of the shaping law that applied.
    pub class: PushClass,
}

/// Pure system mapping change records to rewards.
#[derive(Clone, Debug, Default)]
pub struct RewardShaper {
    config: RewardConfig,
}

impl RewardShaper {
    /// Creates a new shaper with the provided tuning surface.
    #[must_use]
    pub fn new(config: RewardConfig) -> Self {
        Self { config }
    }

    /// Tuning currently in effect.
    #[must_use]
    pub fn config(&self) -> &RewardConfig {
        &self.config
    }

    /// Scores a resolved step.
    ///
    /// `before` must be captured immediately before the move was applied and
    /// `after` is the state the move produced.
    #[must_use]
    pub fn shape(
        &self,
        report: &MoveReport,
        before: &DistanceSnapshot,
        after: &PuzzleState,
    ) -> Shaping {
        let class = classify(report, before, after);
        let mut reward = -self.config.time_cost;
        if report.is_rejected() {
            reward -= self.config.illegal_move_penalty;
        }
        reward += match class {
            PushClass::Placed => self.config.placement_reward,
            PushClass::Displaced => -self.config.displacement_penalty,
            PushClass::TargetSlide => self.config.target_slide_reward,
            PushClass::Floor { distance_delta } => {
                self.config.distance_weight * distance_delta as f64
            }
            PushClass::NoPush => 0.0,
        };
        Shaping { reward, class }
    }

    /// Terminal reward for an episode that just ended with `outcome`.
    #[must_use]
    pub fn terminal(&self, outcome: &EpisodeOutcome) -> f64 {
        match outcome {
            EpisodeOutcome::InProgress => 0.0,
            EpisodeOutcome::Won => self.config.win_bonus,
            EpisodeOutcome::Deadlocked => -self.config.deadlock_penalty,
            EpisodeOutcome::BudgetExhausted => -self.config.timeout_penalty,
        }
    }
}

fn classify(report: &MoveReport, before: &DistanceSnapshot, after: &PuzzleState) -> PushClass {
    let Some(push) = report.pushed_block else {
        return PushClass::NoPush;
    };
    // Targets never move, so the current target set answers for both ends.
    let left_target = query::is_target(after, push.from);
    let reached_target = query::is_target(after, push.to);
    match (left_target, reached_target) {
        (false, true) => {
            debug_assert_eq!(
                query::occupied_targets(after).len(),
                before.occupied_targets + 1
            );
            PushClass::Placed
        }
        (true, false) => PushClass::Displaced,
        (true, true) => PushClass::TargetSlide,
        (false, false) => {
            let after_total = query::total_distance(after);
            let distance_delta = i64::try_from(before.total_distance).unwrap_or(i64::MAX)
                - i64::try_from(after_total).unwrap_or(i64::MAX);
            PushClass::Floor { distance_delta }
        }
    }
}
