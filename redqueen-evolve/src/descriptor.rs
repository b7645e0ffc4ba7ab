use redqueen_core::BehaviorMetrics;
use serde::{Deserialize, Serialize};

/// A cell address in the archive: one bin index per descriptor axis
pub type CellKey = Vec<usize>;

/// Which field of [`BehaviorMetrics`] an axis discretizes
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum MetricKind {
    /// Fraction of the core executed or written
    MemoryCoverage,
    /// Successful SPL splits
    ThreadsSpawned,
    /// Executed instructions
    InstructionsExecuted,
    /// Tracked core writes
    MemoryWrites,
}

impl MetricKind {
    /// Pull this metric out of a measurement record
    #[must_use]
    pub const fn select(self, metrics: &BehaviorMetrics) -> f64 {
        match self {
            Self::MemoryCoverage => metrics.memory_coverage,
            Self::ThreadsSpawned => metrics.threads_spawned,
            Self::InstructionsExecuted => metrics.instructions_executed,
            Self::MemoryWrites => metrics.memory_writes,
        }
    }
}

/// One behavioral axis: a metric, its expected range, and a bin count
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    /// The measurement this axis discretizes
    pub metric: MetricKind,
    /// Lower bound of the expected range; values below clamp here
    pub min: f64,
    /// Upper bound of the expected range; values above clamp here
    pub max: f64,
    /// Number of bins the range divides into
    pub bins: usize,
}

impl Axis {
    /// Project a raw value into a bin index in `[0, bins)`
    #[must_use]
    pub fn bin(&self, value: f64) -> usize {
        if self.bins == 0 {
            return 0;
        }
        let clamped = value.clamp(self.min, self.max);
        if self.max <= self.min {
            return 0;
        }
        let normalized = (clamped - self.min) / (self.max - self.min);
        let idx = (normalized * (self.bins - 1) as f64) as usize;
        idx.min(self.bins - 1)
    }
}

/// An ordered list of axes describing the behavior space.
///
/// The projection from a measurement record to a [`CellKey`] is a
/// fixed-length tuple of per-axis bin indices.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BehaviorDescriptor {
    /// The axes, in key order
    axes: Vec<Axis>,
}

impl Default for BehaviorDescriptor {
    /// The standard two-axis space: memory coverage in `[0, 1]` over ten
    /// bins, and threads spawned in `[0, 100]` over ten bins
    fn default() -> Self {
        Self::two_axis(10, 10, 100.0)
    }
}

impl BehaviorDescriptor {
    /// A descriptor over explicit axes
    #[must_use]
    pub fn new(axes: Vec<Axis>) -> Self {
        Self { axes }
    }

    /// The standard coverage x threads space with configurable resolution
    #[must_use]
    pub fn two_axis(
        coverage_bins: usize,
        thread_bins: usize,
        max_threads: f64,
    ) -> Self {
        Self {
            axes: vec![
                Axis {
                    metric: MetricKind::MemoryCoverage,
                    min: 0.0,
                    max: 1.0,
                    bins: coverage_bins,
                },
                Axis {
                    metric: MetricKind::ThreadsSpawned,
                    min: 0.0,
                    max: max_threads,
                    bins: thread_bins,
                },
            ],
        }
    }

    /// Project a measurement record to its archive cell
    #[must_use]
    pub fn cell_key(&self, metrics: &BehaviorMetrics) -> CellKey {
        self.axes
            .iter()
            .map(|axis| axis.bin(axis.metric.select(metrics)))
            .collect()
    }

    /// Bin counts per axis
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|axis| axis.bins).collect()
    }
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;
    use redqueen_core::BehaviorMetrics;

    use super::{Axis, BehaviorDescriptor, MetricKind};

    #[test]
    fn binning_clamps_and_spreads() {
        let axis = Axis {
            metric: MetricKind::MemoryCoverage,
            min: 0.0,
            max: 1.0,
            bins: 10,
        };
        assert_eq!(axis.bin(-0.5), 0);
        assert_eq!(axis.bin(0.0), 0);
        assert_eq!(axis.bin(0.5), 4);
        assert_eq!(axis.bin(1.0), 9);
        assert_eq!(axis.bin(7.0), 9);
    }

    #[test]
    fn degenerate_ranges_collapse_to_bin_zero() {
        let axis = Axis {
            metric: MetricKind::MemoryWrites,
            min: 5.0,
            max: 5.0,
            bins: 10,
        };
        assert_eq!(axis.bin(4.0), 0);
        assert_eq!(axis.bin(6.0), 0);
    }

    #[test]
    fn cell_key_follows_axis_order() {
        let descriptor = BehaviorDescriptor::default();
        let metrics = BehaviorMetrics {
            memory_coverage: 0.45,
            threads_spawned: 100.0,
            instructions_executed: 0.0,
            memory_writes: 0.0,
        };
        assert_eq!(descriptor.cell_key(&metrics), vec![4, 9]);
        assert_eq!(descriptor.shape(), vec![10, 10]);
    }

    #[test]
    fn identical_metrics_share_a_cell() {
        let descriptor = BehaviorDescriptor::default();
        let metrics = BehaviorMetrics {
            memory_coverage: 0.31,
            threads_spawned: 12.0,
            ..BehaviorMetrics::default()
        };
        assert_eq!(
            descriptor.cell_key(&metrics),
            descriptor.cell_key(&metrics)
        );
    }
}
