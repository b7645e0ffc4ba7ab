use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use redcode::RelaxedWarrior;
use redqueen_core::BehaviorMetrics;
use serde::Serialize;
use thiserror::Error;

use crate::{
    checkpoint,
    descriptor::BehaviorDescriptor,
    fitness::{FitnessConfig, FitnessEvaluator},
    map_elites::MapElites,
    templates, Variation, VariationStats,
};

/// Failures the controller can surface.  Evolution itself never fails; only
/// persisting results can.
#[derive(Debug, Error)]
pub enum EvolveError {
    /// Writing a checkpoint or summary failed
    #[error("checkpoint i/o failed: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding a checkpoint or summary failed
    #[error("checkpoint serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Tunables for the self-play run
#[derive(Clone, Debug, Serialize)]
pub struct RedQueenConfig {
    /// Number of self-play rounds
    pub rounds: usize,
    /// Archive generations within each round
    pub generations_per_round: usize,
    /// Random warriors seeding each round's archive
    pub initial_population: usize,
    /// Offspring per generation
    pub batch_size: usize,
    /// How much champion history each round battles: negative for all of
    /// it, zero for the most recent champion only, `k > 0` for the last `k`
    pub history_length: i64,
    /// Battle scoring parameters
    pub fitness: FitnessConfig,
    /// Memory-coverage axis resolution
    pub coverage_bins: usize,
    /// Threads-spawned axis resolution
    pub thread_bins: usize,
    /// Upper bound of the threads-spawned axis
    pub max_threads_expected: f64,
    /// Rounds per post-round head-to-head match
    pub head_to_head_rounds: u32,
    /// Where rounds and the run summary are written; `None` disables
    /// persistence
    pub output_dir: Option<PathBuf>,
}

impl Default for RedQueenConfig {
    fn default() -> Self {
        Self {
            rounds: 10,
            generations_per_round: 50,
            initial_population: 50,
            batch_size: 10,
            history_length: -1,
            fitness: FitnessConfig::default(),
            coverage_bins: 10,
            thread_bins: 10,
            max_threads_expected: 100.0,
            head_to_head_rounds: 10,
            output_dir: None,
        }
    }
}

/// Everything recorded about one self-play round
#[derive(Clone, Debug)]
pub struct RoundRecord {
    /// Zero-based round index
    pub round: usize,
    /// The round's champion, renamed with a `_R<round>` suffix
    pub champion: RelaxedWarrior,
    /// The champion's fitness against this round's opponents
    pub fitness: f64,
    /// The champion's averaged behavioral measurements
    pub metrics: BehaviorMetrics,
    /// Occupied archive cells at round end
    pub archive_size: usize,
    /// Admission attempts over the round
    pub total_evaluations: u64,
    /// Best archive fitness after initialization and after each generation
    pub fitness_curve: Vec<f64>,
    /// Champion win rate against each opponent, keyed `vs_<name>`
    pub vs_history: BTreeMap<String, f64>,
}

/// The self-play controller.
///
/// Each round evolves a fresh archive against the accumulated champion
/// history and appends the round's best warrior to that history, so every
/// later round faces a strictly harder curriculum.
pub struct RedQueen<V> {
    /// Run tunables
    config: RedQueenConfig,
    /// The variation operator producing and perturbing warriors
    variation: V,
    /// Battle-backed scoring, shared across rounds
    evaluator: FitnessEvaluator,
    /// Seed warriors plus one champion per completed round
    champions: Vec<RelaxedWarrior>,
    /// How many of `champions` are seeds rather than evolved
    seed_count: usize,
    /// One record per completed round
    records: Vec<RoundRecord>,
    /// Observed between battles, generations, and rounds
    cancel: Arc<AtomicBool>,
}

impl<V: Variation> RedQueen<V> {
    /// A run seeded with the classic imp and dwarf
    pub fn new(config: RedQueenConfig, variation: V) -> Self {
        Self::with_seeds(config, variation, Vec::new())
    }

    /// A run seeded with explicit starting champions.  An empty seed list
    /// falls back to the classics: the history must never start empty.
    pub fn with_seeds(
        config: RedQueenConfig,
        variation: V,
        seeds: Vec<RelaxedWarrior>,
    ) -> Self {
        let champions = if seeds.is_empty() {
            vec![templates::imp(), templates::dwarf()]
        } else {
            seeds
        };
        let cancel = Arc::new(AtomicBool::new(false));
        let evaluator =
            FitnessEvaluator::with_cancel(config.fitness, Arc::clone(&cancel));
        Self {
            config,
            variation,
            evaluator,
            seed_count: champions.len(),
            champions,
            records: Vec::new(),
            cancel,
        }
    }

    /// A handle that stops the run at the next battle, generation, or
    /// round boundary when set
    #[must_use]
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// The run's tunables
    #[must_use]
    pub const fn config(&self) -> &RedQueenConfig {
        &self.config
    }

    /// Seeds plus evolved champions, in order
    #[must_use]
    pub fn champions(&self) -> &[RelaxedWarrior] {
        &self.champions
    }

    /// Records of completed rounds
    #[must_use]
    pub fn records(&self) -> &[RoundRecord] {
        &self.records
    }

    /// The variation operator's counters
    pub fn variation_stats(&self) -> VariationStats {
        self.variation.stats()
    }

    /// The opponent set for the next round, per `history_length`
    fn opponents(&self) -> Vec<RelaxedWarrior> {
        if self.config.history_length < 0 {
            return self.champions.clone();
        }
        if self.config.history_length == 0 {
            return self.champions.last().cloned().into_iter().collect();
        }
        let keep = usize::try_from(self.config.history_length)
            .unwrap_or(usize::MAX);
        let from = self.champions.len().saturating_sub(keep);
        self.champions[from..].to_vec()
    }

    /// Run every round, checkpointing as configured.  Returns the evolved
    /// champions (seeds excluded).
    ///
    /// # Errors
    ///
    /// Returns an [`EvolveError`] when persistence fails; evolution state
    /// up to that point is retained on `self`.
    pub fn run(&mut self) -> Result<Vec<RelaxedWarrior>, EvolveError> {
        log::info!(
            "self-play: {} rounds x {} generations, {} seed champions",
            self.config.rounds,
            self.config.generations_per_round,
            self.seed_count,
        );

        for round in 0..self.config.rounds {
            if self.cancel.load(Ordering::Relaxed) {
                log::info!("run cancelled before round {round}");
                break;
            }
            let record = self.run_round(round);
            self.champions.push(record.champion.clone());
            if let Some(dir) = self.config.output_dir.clone() {
                checkpoint::save_round(&dir, &record)?;
            }
            self.records.push(record);
        }

        if let Some(dir) = self.config.output_dir.clone() {
            checkpoint::save_summary(
                &dir,
                &self.config,
                &self.records,
                self.variation.stats(),
                &self.champions,
            )?;
        }
        Ok(self.champions[self.seed_count..].to_vec())
    }

    /// One round: fresh archive, initialize, evolve, crown a champion,
    /// and score it against the round's opponents.
    fn run_round(&mut self, round: usize) -> RoundRecord {
        let opponents = self.opponents();
        log::info!(
            "round {}/{}: {} opponents in history",
            round + 1,
            self.config.rounds,
            opponents.len()
        );

        let descriptor = BehaviorDescriptor::two_axis(
            self.config.coverage_bins,
            self.config.thread_bins,
            self.config.max_threads_expected,
        );
        let mut elites = MapElites::new(
            descriptor,
            self.config.initial_population,
            self.config.batch_size,
        );

        let evaluator = &self.evaluator;
        let opponent_set = &opponents[..];
        let evaluate = move |warrior: &RelaxedWarrior| {
            evaluator.evaluate(warrior, opponent_set)
        };

        elites.initialize(&mut self.variation, &evaluate);
        let mut curve = Vec::new();
        if let Some(best) = elites.best() {
            curve.push(best.fitness);
        }

        for generation in 0..self.config.generations_per_round {
            if self.cancel.load(Ordering::Relaxed) {
                log::info!("round {round} cancelled at generation {generation}");
                break;
            }
            let updates = elites.step(&mut self.variation, &evaluate);
            let best_fitness =
                elites.best().map(|cell| cell.fitness).unwrap_or_default();
            curve.push(best_fitness);
            if (generation + 1) % 10 == 0 {
                log::info!(
                    "  gen {}: archive={}, updates={updates}, best={:.4}",
                    generation + 1,
                    elites.len(),
                    best_fitness,
                );
            }
        }

        let (champion, fitness, metrics) = elites.best().map_or_else(
            || {
                log::warn!(
                    "archive empty at the end of round {round}; \
                     substituting the classic fallback champion"
                );
                let mut fallback = templates::dwarf();
                fallback.name = format!("Fallback_Round{round}");
                (fallback, 0.0, BehaviorMetrics::default())
            },
            |cell| {
                let mut champion = cell.solution.clone();
                champion.name = format!("{}_R{round}", champion.name);
                (champion, cell.fitness, cell.metrics)
            },
        );

        let mut vs_history = BTreeMap::new();
        for opponent in &opponents {
            let outcome = self.evaluator.head_to_head(
                &champion,
                opponent,
                self.config.head_to_head_rounds,
            );
            vs_history.insert(
                format!("vs_{}", opponent.name),
                outcome.challenger_win_rate,
            );
        }

        log::info!(
            "round {} complete: champion {} at fitness {:.4}, {} cells",
            round + 1,
            champion.name,
            fitness,
            elites.len(),
        );

        RoundRecord {
            round,
            champion,
            fitness,
            metrics,
            archive_size: elites.len(),
            total_evaluations: elites.stats().total_evaluations,
            fitness_curve: curve,
            vs_history,
        }
    }
}
