use itertools::Itertools;
use rand::Rng;
use redcode::RelaxedWarrior;

use crate::{
    BehaviorMetrics, CoreAddr, Mars, MarsConfig, MarsError, MarsResult,
    WarriorId,
};

/// Give up on random placement after this many samples and fall back to
/// equal spacing
const MAX_PLACEMENT_ATTEMPTS: u32 = 1000;

/// The outcome of a multi-round battle
#[derive(Clone, Debug, PartialEq)]
pub struct BattleResult {
    /// Aggregate winner across all rounds, `None` for a draw
    pub winner: Option<WarriorId>,
    /// Round wins per warrior, indexed like the input slice
    pub wins: Vec<u32>,
    /// Rounds with no single survivor
    pub draws: u32,
    /// Per-warrior behavioral measurements, averaged across rounds
    pub metrics: Vec<BehaviorMetrics>,
    /// Mean executed cycles per round
    pub cycles: u64,
}

/// One warrior's tournament record
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Standing {
    /// Matches won
    pub wins: u32,
    /// Matches lost
    pub losses: u32,
    /// Matches drawn
    pub draws: u32,
    /// 3 per win, 1 per draw
    pub points: f64,
}

/// Runs multi-round battles: every round gets a fresh machine and fresh
/// random placement, and the results are aggregated across rounds.
pub struct Battle {
    /// Machine settings shared by every round
    config: MarsConfig,
    /// Rounds per battle
    rounds: u32,
}

impl Battle {
    /// A battle runner playing `rounds` rounds per match (at least one)
    #[must_use]
    pub fn new(config: MarsConfig, rounds: u32) -> Self {
        Self {
            config,
            rounds: rounds.max(1),
        }
    }

    /// The machine settings used for each round
    #[must_use]
    pub const fn config(&self) -> &MarsConfig {
        &self.config
    }

    /// Run a battle with a caller-independent source of randomness.
    ///
    /// # Errors
    ///
    /// Returns a [`MarsError::InvalidParam`] when fewer than two warriors
    /// are given, when the configuration is unusable, or when a warrior
    /// cannot be loaded (empty or over the length budget).
    pub fn run(
        &self,
        warriors: &[RelaxedWarrior],
    ) -> MarsResult<BattleResult> {
        self.run_with_rng(&mut rand::thread_rng(), warriors)
    }

    /// Run a battle using the provided RNG for placement, for callers that
    /// need reproducible rounds.
    ///
    /// # Errors
    ///
    /// As [`Battle::run`].
    pub fn run_with_rng<R: Rng>(
        &self,
        rng: &mut R,
        warriors: &[RelaxedWarrior],
    ) -> MarsResult<BattleResult> {
        if warriors.len() < 2 {
            return Err(MarsError::InvalidParam(
                "a battle needs at least two warriors",
            ));
        }

        let normalized: Vec<_> = warriors
            .iter()
            .map(|w| w.normalize(self.config.core_size))
            .collect();
        let lengths: Vec<usize> =
            normalized.iter().map(|w| w.code.len()).collect();

        let mut wins = vec![0_u32; warriors.len()];
        let mut draws = 0_u32;
        let mut samples: Vec<Vec<BehaviorMetrics>> =
            vec![Vec::new(); warriors.len()];
        let mut total_cycles = 0_u64;

        for _ in 0..self.rounds {
            let mut mars = Mars::new(self.config)?;
            let positions = sample_positions(rng, &self.config, &lengths);
            for (warrior, position) in normalized.iter().zip(&positions) {
                mars.load(warrior, *position)?;
            }

            match mars.run() {
                Some(winner) => wins[winner] += 1,
                None => draws += 1,
            }
            total_cycles += mars.cycle();

            for (id, sample) in samples.iter_mut().enumerate() {
                if let Some(metrics) = mars.metrics(id) {
                    sample.push(metrics);
                }
            }
        }

        // The aggregate winner must lead the win table outright and beat
        // the draw count; anything else is a draw
        let max_wins = wins.iter().copied().max().unwrap_or_default();
        let leaders = wins.iter().filter(|&&w| w == max_wins).count();
        let winner = (leaders == 1 && max_wins > draws)
            .then(|| wins.iter().position(|&w| w == max_wins))
            .flatten();

        Ok(BattleResult {
            winner,
            wins,
            draws,
            metrics: samples
                .iter()
                .map(|sample| BehaviorMetrics::mean(sample))
                .collect(),
            cycles: total_cycles / u64::from(self.rounds),
        })
    }

    /// Round-robin tournament over every pair, 3/1/0 points per match.
    ///
    /// # Errors
    ///
    /// As [`Battle::run`]; the first failing match aborts the tournament.
    pub fn tournament(
        &self,
        warriors: &[RelaxedWarrior],
    ) -> MarsResult<Vec<Standing>> {
        let mut standings = vec![Standing::default(); warriors.len()];
        for (i, j) in (0..warriors.len()).tuple_combinations() {
            let pair = [warriors[i].clone(), warriors[j].clone()];
            let result = self.run(&pair)?;
            match result.winner {
                Some(0) => {
                    standings[i].wins += 1;
                    standings[i].points += 3.0;
                    standings[j].losses += 1;
                }
                Some(_) => {
                    standings[j].wins += 1;
                    standings[j].points += 3.0;
                    standings[i].losses += 1;
                }
                None => {
                    standings[i].draws += 1;
                    standings[i].points += 1.0;
                    standings[j].draws += 1;
                    standings[j].points += 1.0;
                }
            }
        }
        Ok(standings)
    }
}

/// Sample non-overlapping starting positions.
///
/// Candidates are uniform over the core; one is accepted when its minimum
/// circular distance to every placed warrior covers the longer of the two
/// programs plus `min_distance`.  After [`MAX_PLACEMENT_ATTEMPTS`] samples
/// the remaining warriors are placed by equal spacing instead; placement
/// never fails.
pub fn sample_positions<R: Rng>(
    rng: &mut R,
    config: &MarsConfig,
    lengths: &[usize],
) -> Vec<CoreAddr> {
    let count = lengths.len();
    let mut positions: Vec<CoreAddr> = Vec::with_capacity(count);
    let mut attempts = 0;

    while positions.len() < count && attempts < MAX_PLACEMENT_ATTEMPTS {
        attempts += 1;
        let candidate = rng.gen_range(0..config.core_size);
        let candidate_len = lengths[positions.len()];

        let accepted = positions.iter().zip(lengths).all(|(&other, &len)| {
            let direct = if candidate > other {
                candidate - other
            } else {
                other - candidate
            };
            let circular = direct.min(config.core_size - direct);
            let required = CoreAddr::try_from(len.max(candidate_len))
                .unwrap_or(CoreAddr::MAX)
                .saturating_add(config.min_distance);
            circular >= required
        });
        if accepted {
            positions.push(candidate);
        }
    }

    if positions.len() < count {
        log::debug!(
            "random placement exhausted {MAX_PLACEMENT_ATTEMPTS} attempts \
             for {count} warriors, using equal spacing"
        );
        let spacing =
            config.core_size / CoreAddr::try_from(count).unwrap_or(1).max(1);
        positions = (0..count)
            .map(|i| CoreAddr::try_from(i).unwrap_or_default() * spacing)
            .collect();
    }

    positions
}
