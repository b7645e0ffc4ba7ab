use std::{cmp::Ordering, collections::HashMap};

use rand::Rng;
use rayon::prelude::*;
use redcode::RelaxedWarrior;
use redqueen_core::BehaviorMetrics;
use serde::Serialize;

use crate::{
    descriptor::{BehaviorDescriptor, CellKey},
    Variation,
};

/// A single occupied cell of the archive
#[derive(Clone, Debug, PartialEq)]
pub struct EliteCell {
    /// The warrior holding the cell
    pub solution: RelaxedWarrior,
    /// Its score in `[0, 1]`
    pub fitness: f64,
    /// The averaged measurements that placed it in this cell
    pub metrics: BehaviorMetrics,
    /// Generation counter at admission
    pub generation: u64,
}

/// Counters maintained across the archive's lifetime
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize)]
pub struct ArchiveStats {
    /// Admission attempts, successful or not
    pub total_evaluations: u64,
    /// Cells filled or replaced
    pub archive_updates: u64,
    /// Highest fitness ever admitted; never decreases
    pub best_fitness: f64,
}

/// The quality-diversity archive: at most one elite per behavior cell,
/// replaced only by a strictly fitter candidate and never removed.
pub struct MapElites {
    /// Projection from measurements to cells
    descriptor: BehaviorDescriptor,
    /// Random warriors evaluated by [`MapElites::initialize`]
    initial_population: usize,
    /// Offspring per [`MapElites::step`]
    batch_size: usize,
    /// The elites, keyed by their behavior cell
    archive: HashMap<CellKey, EliteCell>,
    /// Step counter, stamped onto admitted cells
    generation: u64,
    /// Lifetime counters
    stats: ArchiveStats,
}

impl MapElites {
    /// An empty archive over the given behavior space
    #[must_use]
    pub fn new(
        descriptor: BehaviorDescriptor,
        initial_population: usize,
        batch_size: usize,
    ) -> Self {
        Self {
            descriptor,
            initial_population,
            batch_size,
            archive: HashMap::new(),
            generation: 0,
            stats: ArchiveStats::default(),
        }
    }

    /// Offer a candidate to the archive.  It is admitted when its cell is
    /// empty or its fitness strictly beats the incumbent's.  Returns
    /// whether the archive changed.
    pub fn try_add(
        &mut self,
        solution: RelaxedWarrior,
        fitness: f64,
        metrics: BehaviorMetrics,
    ) -> bool {
        let key = self.descriptor.cell_key(&metrics);
        self.stats.total_evaluations += 1;

        let admitted = match self.archive.get(&key) {
            Some(incumbent) if fitness <= incumbent.fitness => false,
            _ => {
                self.archive.insert(
                    key,
                    EliteCell {
                        solution,
                        fitness,
                        metrics,
                        generation: self.generation,
                    },
                );
                true
            }
        };

        if admitted {
            self.stats.archive_updates += 1;
            if fitness > self.stats.best_fitness {
                self.stats.best_fitness = fitness;
            }
        }
        admitted
    }

    /// A uniformly random elite, or `None` while the archive is empty
    pub fn sample_elite<R: Rng>(&self, rng: &mut R) -> Option<&EliteCell> {
        if self.archive.is_empty() {
            return None;
        }
        let pick = rng.gen_range(0..self.archive.len());
        self.archive.values().nth(pick)
    }

    /// The elite of maximal fitness.  Ties break deterministically on the
    /// cell key so repeated calls agree regardless of map iteration order.
    #[must_use]
    pub fn best(&self) -> Option<&EliteCell> {
        self.archive
            .iter()
            .max_by(|(key_a, cell_a), (key_b, cell_b)| {
                cell_a
                    .fitness
                    .partial_cmp(&cell_b.fitness)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| key_a.cmp(key_b))
            })
            .map(|(_, cell)| cell)
    }

    /// Fill the archive from scratch: `initial_population` random warriors,
    /// evaluated in parallel, admitted sequentially.
    pub fn initialize<V, F>(&mut self, variation: &mut V, evaluate: &F)
    where
        V: Variation + ?Sized,
        F: Fn(&RelaxedWarrior) -> (f64, BehaviorMetrics) + Sync,
    {
        let candidates: Vec<RelaxedWarrior> = (0..self.initial_population)
            .map(|_| variation.generate_random())
            .collect();
        self.admit_batch(candidates, evaluate);
    }

    /// One generation: sample a parent per offspring, mutate, evaluate the
    /// batch in parallel, admit sequentially.  Returns the number of
    /// admissions.
    pub fn step<V, F>(&mut self, variation: &mut V, evaluate: &F) -> usize
    where
        V: Variation + ?Sized,
        F: Fn(&RelaxedWarrior) -> (f64, BehaviorMetrics) + Sync,
    {
        self.generation += 1;
        let mut rng = rand::thread_rng();
        let mut offspring = Vec::with_capacity(self.batch_size);
        for _ in 0..self.batch_size {
            let Some(parent) = self.sample_elite(&mut rng) else {
                break;
            };
            let parent = parent.solution.clone();
            offspring.push(variation.mutate(&parent));
        }
        self.admit_batch(offspring, evaluate)
    }

    /// Evaluate candidates in parallel, then apply admissions one at a
    /// time.  Battles are pure, so only the admission step serializes.
    fn admit_batch<F>(
        &mut self,
        candidates: Vec<RelaxedWarrior>,
        evaluate: &F,
    ) -> usize
    where
        F: Fn(&RelaxedWarrior) -> (f64, BehaviorMetrics) + Sync,
    {
        let evaluated: Vec<(RelaxedWarrior, f64, BehaviorMetrics)> =
            candidates
                .into_par_iter()
                .map(|candidate| {
                    let (fitness, metrics) = evaluate(&candidate);
                    (candidate, fitness, metrics)
                })
                .collect();

        let mut admitted = 0;
        for (candidate, fitness, metrics) in evaluated {
            if self.try_add(candidate, fitness, metrics) {
                admitted += 1;
            }
        }
        admitted
    }

    /// Number of occupied cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    /// True while no cell is occupied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.archive.is_empty()
    }

    /// Lifetime counters
    #[must_use]
    pub const fn stats(&self) -> ArchiveStats {
        self.stats
    }

    /// Current generation counter
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Every occupied cell with its key
    pub fn cells(&self) -> impl Iterator<Item = (&CellKey, &EliteCell)> {
        self.archive.iter()
    }
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;
    use redcode::RelaxedWarrior;
    use redqueen_core::BehaviorMetrics;

    use super::MapElites;
    use crate::descriptor::BehaviorDescriptor;

    /// A measurement record landing in a predictable cell
    fn metrics(coverage: f64, threads: f64) -> BehaviorMetrics {
        BehaviorMetrics {
            memory_coverage: coverage,
            threads_spawned: threads,
            ..BehaviorMetrics::default()
        }
    }

    fn named(name: &str) -> RelaxedWarrior {
        RelaxedWarrior {
            name: name.into(),
            ..RelaxedWarrior::default()
        }
    }

    #[test]
    fn admission_fills_empty_cells() {
        let mut elites = MapElites::new(BehaviorDescriptor::default(), 0, 0);
        assert!(elites.try_add(named("a"), 0.5, metrics(0.1, 0.0)));
        assert_eq!(elites.len(), 1);
        assert!(elites.try_add(named("b"), 0.1, metrics(0.9, 0.0)));
        assert_eq!(elites.len(), 2);
    }

    #[test]
    fn weaker_candidates_do_not_displace_incumbents() {
        let mut elites = MapElites::new(BehaviorDescriptor::default(), 0, 0);
        assert!(elites.try_add(named("strong"), 0.8, metrics(0.1, 0.0)));
        assert!(!elites.try_add(named("weak"), 0.3, metrics(0.1, 0.0)));
        assert!(!elites.try_add(named("equal"), 0.8, metrics(0.1, 0.0)));
        assert_eq!(elites.len(), 1);
        assert_eq!(elites.best().unwrap().solution.name, "strong");
        assert_eq!(elites.stats().total_evaluations, 3);
        assert_eq!(elites.stats().archive_updates, 1);
    }

    #[test]
    fn repeated_admission_changes_archive_at_most_once() {
        let mut elites = MapElites::new(BehaviorDescriptor::default(), 0, 0);
        let first = elites.try_add(named("same"), 0.5, metrics(0.2, 1.0));
        let second = elites.try_add(named("same"), 0.5, metrics(0.2, 1.0));
        assert!(first);
        assert!(!second);
        assert_eq!(elites.stats().archive_updates, 1);
    }

    #[test]
    fn stored_cells_map_back_to_their_key() {
        let mut elites = MapElites::new(BehaviorDescriptor::default(), 0, 0);
        elites.try_add(named("a"), 0.4, metrics(0.05, 3.0));
        elites.try_add(named("b"), 0.6, metrics(0.95, 55.0));
        let descriptor = BehaviorDescriptor::default();
        for (key, cell) in elites.cells() {
            assert_eq!(key, &descriptor.cell_key(&cell.metrics));
        }
    }

    #[test]
    fn best_fitness_never_decreases() {
        let mut elites = MapElites::new(BehaviorDescriptor::default(), 0, 0);
        elites.try_add(named("a"), 0.7, metrics(0.1, 0.0));
        let high_water = elites.stats().best_fitness;
        elites.try_add(named("b"), 0.2, metrics(0.5, 5.0));
        elites.try_add(named("c"), 0.05, metrics(0.9, 90.0));
        assert!(elites.stats().best_fitness >= high_water);
        assert!((elites.stats().best_fitness - 0.7).abs() < f64::EPSILON);
    }

    #[test]
    fn sampling_empty_archive_yields_none() {
        let elites = MapElites::new(BehaviorDescriptor::default(), 0, 0);
        assert!(elites.sample_elite(&mut rand::thread_rng()).is_none());
        assert!(elites.best().is_none());
    }
}
