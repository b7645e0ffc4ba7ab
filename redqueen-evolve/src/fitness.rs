use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};

use redcode::RelaxedWarrior;
use redqueen_core::{Battle, BehaviorMetrics, MarsConfig};
use serde::Serialize;

/// Scoring parameters for fitness evaluation
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct FitnessConfig {
    /// Core size used for evaluation battles
    pub core_size: u32,
    /// Cycle cap per round
    pub max_cycles: u64,
    /// Rounds played against each opponent
    pub battles_per_opponent: u32,
    /// Points for winning a match
    pub win_score: f64,
    /// Points for drawing a match
    pub draw_score: f64,
    /// Points for losing a match
    pub loss_score: f64,
}

impl Default for FitnessConfig {
    fn default() -> Self {
        Self {
            core_size: 8000,
            max_cycles: 80_000,
            battles_per_opponent: 5,
            win_score: 3.0,
            draw_score: 1.0,
            loss_score: 0.0,
        }
    }
}

/// How a challenger fares against a held-out test set
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Generality {
    /// `(wins + draws / 2) / |test set|`
    pub generality: f64,
    /// Fraction of matches won
    pub win_rate: f64,
    /// Fraction of matches drawn
    pub draw_rate: f64,
    /// Fraction of matches lost
    pub loss_rate: f64,
    /// Matches won
    pub wins: u32,
    /// Matches drawn
    pub draws: u32,
    /// Matches lost
    pub losses: u32,
}

/// Aggregate outcome of a head-to-head match
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum MatchWinner {
    /// The first warrior took the match
    Challenger,
    /// The second warrior took the match
    Opponent,
    /// Neither did
    Draw,
}

/// A head-to-head result with win rates projected from the aggregate
#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct HeadToHead {
    /// Who won the aggregate
    pub winner: MatchWinner,
    /// 1.0 / 0.0 / 0.5 for win / loss / draw
    pub challenger_win_rate: f64,
    /// The complementary rate for the opponent
    pub opponent_win_rate: f64,
}

/// Scores challengers by battling them against opponent sets.
///
/// Evaluation is read-only (the counter is atomic), so batches of
/// evaluations run in parallel against one evaluator.
pub struct FitnessEvaluator {
    /// Scoring parameters
    config: FitnessConfig,
    /// Number of [`FitnessEvaluator::evaluate`] calls
    total_evaluations: AtomicU64,
    /// Checked between battles; set by the controller on shutdown
    cancel: Option<Arc<AtomicBool>>,
}

impl FitnessEvaluator {
    /// An evaluator with no cancellation hook
    #[must_use]
    pub const fn new(config: FitnessConfig) -> Self {
        Self {
            config,
            total_evaluations: AtomicU64::new(0),
            cancel: None,
        }
    }

    /// An evaluator that stops scheduling new battles once `cancel` is set
    #[must_use]
    pub const fn with_cancel(
        config: FitnessConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            config,
            total_evaluations: AtomicU64::new(0),
            cancel: Some(cancel),
        }
    }

    /// The scoring parameters in use
    #[must_use]
    pub const fn config(&self) -> &FitnessConfig {
        &self.config
    }

    /// Number of evaluations performed so far
    #[must_use]
    pub fn total_evaluations(&self) -> u64 {
        self.total_evaluations.load(Ordering::Relaxed)
    }

    /// A battle runner configured for evaluation matches
    fn battle(&self, rounds: u32) -> Battle {
        let config = MarsConfig {
            core_size: self.config.core_size,
            max_cycles: self.config.max_cycles,
            ..MarsConfig::default()
        };
        Battle::new(config, rounds)
    }

    /// True once cancellation has been requested
    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Score a challenger against a set of opponents.
    ///
    /// One match per opponent, `battles_per_opponent` rounds each, scored
    /// 3/1/0 and normalized by the maximum attainable score, so the result
    /// is in `[0, 1]`.  The returned measurements are the challenger's,
    /// averaged over all matches.  An empty opponent set scores zero, and a
    /// match that fails internally contributes nothing while still counting
    /// in the denominator.
    pub fn evaluate(
        &self,
        challenger: &RelaxedWarrior,
        opponents: &[RelaxedWarrior],
    ) -> (f64, BehaviorMetrics) {
        if opponents.is_empty() {
            return (0.0, BehaviorMetrics::default());
        }
        self.total_evaluations.fetch_add(1, Ordering::Relaxed);

        let battle = self.battle(self.config.battles_per_opponent);
        let mut total = 0.0;
        let mut samples = Vec::with_capacity(opponents.len());

        for opponent in opponents {
            if self.cancelled() {
                break;
            }
            let pair = [challenger.clone(), opponent.clone()];
            match battle.run(&pair) {
                Ok(result) => {
                    total += match result.winner {
                        Some(0) => self.config.win_score,
                        None => self.config.draw_score,
                        Some(_) => self.config.loss_score,
                    };
                    samples.push(result.metrics[0]);
                }
                Err(err) => {
                    log::warn!(
                        "match against {} failed and scores nothing: {err}",
                        opponent.name
                    );
                }
            }
        }

        let max_score = self.config.win_score * opponents.len() as f64;
        let fitness = if max_score > 0.0 { total / max_score } else { 0.0 };
        (fitness, BehaviorMetrics::mean(&samples))
    }

    /// Measure a champion against a held-out test set it never evolved
    /// against
    pub fn evaluate_generality(
        &self,
        challenger: &RelaxedWarrior,
        test_set: &[RelaxedWarrior],
    ) -> Generality {
        if test_set.is_empty() {
            return Generality::default();
        }

        let battle = self.battle(self.config.battles_per_opponent);
        let mut wins = 0_u32;
        let mut draws = 0_u32;
        let mut losses = 0_u32;

        for opponent in test_set {
            if self.cancelled() {
                break;
            }
            let pair = [challenger.clone(), opponent.clone()];
            match battle.run(&pair) {
                Ok(result) => match result.winner {
                    Some(0) => wins += 1,
                    None => draws += 1,
                    Some(_) => losses += 1,
                },
                Err(err) => {
                    log::warn!(
                        "generality match against {} failed: {err}",
                        opponent.name
                    );
                }
            }
        }

        let total = test_set.len() as f64;
        Generality {
            generality: (f64::from(wins) + 0.5 * f64::from(draws)) / total,
            win_rate: f64::from(wins) / total,
            draw_rate: f64::from(draws) / total,
            loss_rate: f64::from(losses) / total,
            wins,
            draws,
            losses,
        }
    }

    /// A single aggregate match between two warriors, projected to win
    /// rates
    pub fn head_to_head(
        &self,
        challenger: &RelaxedWarrior,
        opponent: &RelaxedWarrior,
        rounds: u32,
    ) -> HeadToHead {
        let battle = self.battle(rounds);
        let pair = [challenger.clone(), opponent.clone()];
        let outcome = match battle.run(&pair) {
            Ok(result) => result.winner,
            Err(err) => {
                log::warn!(
                    "head-to-head between {} and {} failed: {err}",
                    challenger.name,
                    opponent.name
                );
                None
            }
        };
        match outcome {
            Some(0) => HeadToHead {
                winner: MatchWinner::Challenger,
                challenger_win_rate: 1.0,
                opponent_win_rate: 0.0,
            },
            Some(_) => HeadToHead {
                winner: MatchWinner::Opponent,
                challenger_win_rate: 0.0,
                opponent_win_rate: 1.0,
            },
            None => HeadToHead {
                winner: MatchWinner::Draw,
                challenger_win_rate: 0.5,
                opponent_win_rate: 0.5,
            },
        }
    }
}
