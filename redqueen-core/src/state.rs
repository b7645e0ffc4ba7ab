use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::{CoreAddr, WarriorId};

/// Runtime state for one warrior in a battle: its process queue plus the
/// behavioral counters the evolution layer projects into descriptor space.
pub struct WarriorState {
    /// Registration index of this warrior
    pub id: WarriorId,
    /// Display name, carried from the loaded program
    pub name: String,
    /// FIFO queue of program counters.  The front is the next process to
    /// execute.
    pub queue: VecDeque<CoreAddr>,
    /// Queue size beyond which [`WarriorState::push_pc`] refuses new values
    max_processes: usize,
    /// True while the queue is non-empty.  Re-derived after every executed
    /// instruction.
    pub alive: bool,
    /// Every address this warrior has executed or written
    pub memory_accessed: HashSet<CoreAddr>,
    /// Successful SPL splits
    pub threads_spawned: u64,
    /// Number of program counters dequeued and executed
    pub instructions_executed: u64,
    /// Number of tracked core writes, including addressing-mode side effects
    pub memory_writes: u64,
}

impl WarriorState {
    /// Fresh state with an empty queue.  The loader enqueues the entry
    /// point separately.
    #[must_use]
    pub fn new(id: WarriorId, name: &str, max_processes: usize) -> Self {
        Self {
            id,
            name: name.to_owned(),
            queue: VecDeque::new(),
            max_processes,
            alive: true,
            memory_accessed: HashSet::new(),
            threads_spawned: 0,
            instructions_executed: 0,
            memory_writes: 0,
        }
    }

    /// Queue a program counter, refusing silently once the queue holds
    /// `max_processes` values.  Returns whether the value landed.
    pub fn push_pc(&mut self, pc: CoreAddr) -> bool {
        if self.queue.len() < self.max_processes {
            self.queue.push_back(pc);
            true
        } else {
            false
        }
    }

    /// Queue a split target.  A split is admitted only while the pre-push
    /// queue total leaves room under the cap for the unconditional
    /// next-instruction push that follows it.  Returns whether the value
    /// landed.
    pub fn push_split(&mut self, pc: CoreAddr) -> bool {
        if self.queue.len() + 1 < self.max_processes {
            self.queue.push_back(pc);
            true
        } else {
            false
        }
    }

    /// Record a tracked core write at an address
    pub fn note_write(&mut self, addr: CoreAddr) {
        self.memory_writes += 1;
        self.memory_accessed.insert(addr);
    }

    /// Project the raw counters into the published metric record
    #[must_use]
    pub fn metrics(&self, core_size: CoreAddr) -> BehaviorMetrics {
        let coverage = if core_size == 0 {
            0.0
        } else {
            self.memory_accessed.len() as f64 / f64::from(core_size)
        };
        BehaviorMetrics {
            memory_coverage: coverage,
            threads_spawned: self.threads_spawned as f64,
            instructions_executed: self.instructions_executed as f64,
            memory_writes: self.memory_writes as f64,
        }
    }
}

/// The behavioral measurements a battle publishes per warrior.
///
/// Values are f64 because battles average them across rounds before they
/// reach the descriptor.
#[derive(
    Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize,
)]
pub struct BehaviorMetrics {
    /// Fraction of core addresses executed or written, in `[0, 1]`
    pub memory_coverage: f64,
    /// Successful SPL splits
    pub threads_spawned: f64,
    /// Executed instructions
    pub instructions_executed: f64,
    /// Tracked core writes
    pub memory_writes: f64,
}

impl BehaviorMetrics {
    /// Arithmetic mean of a set of measurements; all zeros when empty
    #[must_use]
    pub fn mean(samples: &[Self]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let n = samples.len() as f64;
        let mut sum = Self::default();
        for sample in samples {
            sum.memory_coverage += sample.memory_coverage;
            sum.threads_spawned += sample.threads_spawned;
            sum.instructions_executed += sample.instructions_executed;
            sum.memory_writes += sample.memory_writes;
        }
        Self {
            memory_coverage: sum.memory_coverage / n,
            threads_spawned: sum.threads_spawned / n,
            instructions_executed: sum.instructions_executed / n,
            memory_writes: sum.memory_writes / n,
        }
    }
}
