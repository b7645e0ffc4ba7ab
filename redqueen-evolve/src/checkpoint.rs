use std::{collections::BTreeMap, fs, path::Path};

use redcode::RelaxedWarrior;
use redqueen_core::BehaviorMetrics;
use serde::Serialize;

use crate::{
    controller::{EvolveError, RedQueenConfig, RoundRecord},
    VariationStats,
};

/// The JSON sidecar written next to each round's champion source
#[derive(Serialize)]
struct RoundSidecar<'a> {
    /// Zero-based round index
    round: usize,
    /// Champion name, also recoverable from the `.red` file
    champion_name: &'a str,
    /// Champion fitness against the round's opponents
    fitness: f64,
    /// Champion behavioral measurements
    metrics: &'a BehaviorMetrics,
    /// Occupied archive cells at round end
    archive_size: usize,
    /// Admission attempts over the round
    total_evaluations: u64,
    /// Best fitness after initialization and each generation
    fitness_curve: &'a [f64],
    /// Champion win rate against each opponent
    vs_history: &'a BTreeMap<String, f64>,
}

/// One line of the run scoreboard
#[derive(Serialize)]
struct RoundScore<'a> {
    /// Zero-based round index
    round: usize,
    /// The round champion's name
    champion: &'a str,
    /// Its fitness
    fitness: f64,
    /// Occupied archive cells at round end
    archive_size: usize,
}

/// The run-level summary document
#[derive(Serialize)]
struct Summary<'a> {
    /// Echo of the run configuration
    config: &'a RedQueenConfig,
    /// Per-round scoreboard
    rounds: Vec<RoundScore<'a>>,
    /// Variation-operator counters over the whole run
    generator_stats: VariationStats,
}

/// Persist one round: `round_NNN/champion.red` plus its metrics sidecar
pub fn save_round(
    dir: &Path,
    record: &RoundRecord,
) -> Result<(), EvolveError> {
    let round_dir = dir.join(format!("round_{:03}", record.round));
    fs::create_dir_all(&round_dir)?;

    fs::write(
        round_dir.join("champion.red"),
        record.champion.to_string(),
    )?;

    let sidecar = RoundSidecar {
        round: record.round,
        champion_name: &record.champion.name,
        fitness: record.fitness,
        metrics: &record.metrics,
        archive_size: record.archive_size,
        total_evaluations: record.total_evaluations,
        fitness_curve: &record.fitness_curve,
        vs_history: &record.vs_history,
    };
    fs::write(
        round_dir.join("metrics.json"),
        serde_json::to_string_pretty(&sidecar)?,
    )?;
    Ok(())
}

/// Persist the run summary and the full champion lineage (seeds included)
pub fn save_summary(
    dir: &Path,
    config: &RedQueenConfig,
    records: &[RoundRecord],
    stats: VariationStats,
    champions: &[RelaxedWarrior],
) -> Result<(), EvolveError> {
    let champions_dir = dir.join("champions");
    fs::create_dir_all(&champions_dir)?;
    for (idx, champion) in champions.iter().enumerate() {
        fs::write(
            champions_dir.join(format!("champion_{idx:03}.red")),
            champion.to_string(),
        )?;
    }

    let summary = Summary {
        config,
        rounds: records
            .iter()
            .map(|record| RoundScore {
                round: record.round,
                champion: &record.champion.name,
                fitness: record.fitness,
                archive_size: record.archive_size,
            })
            .collect(),
        generator_stats: stats,
    };
    fs::write(
        dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;
    Ok(())
}
