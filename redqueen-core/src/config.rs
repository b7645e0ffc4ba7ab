use crate::CoreAddr;

/// Settings applied to a battle machine.
///
/// These are fixed for the lifetime of a [`crate::Mars`] and shared by every
/// round of a [`crate::Battle`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct MarsConfig {
    /// Number of addresses in the core.  All fields are modulo `core_size`
    pub core_size: CoreAddr,

    /// Number of executed instructions before a battle is called a draw.
    /// Each warrior's instruction counts individually: with two warriors
    /// alive, one sweep of the schedule consumes two cycles.
    pub max_cycles: u64,

    /// Maximum size of the process queue for each warrior.
    ///
    /// Once a queue reaches this size, SPL only queues the next
    /// instruction, not the split target.
    /// <https://corewar.co.uk/standards/icws94.htm#5.5.14>
    pub max_processes: usize,

    /// Maximum number of instructions a loadable warrior may have
    pub max_length: usize,

    /// Minimum circular gap between two placed warriors, beyond the longer
    /// of the two programs
    pub min_distance: CoreAddr,
}

impl Default for MarsConfig {
    /// The community-standard '94 parameters
    fn default() -> Self {
        Self {
            core_size: 8000,
            max_cycles: 80_000,
            max_processes: 8000,
            max_length: 100,
            min_distance: 100,
        }
    }
}

impl MarsConfig {
    /// Validates that the settings describe a runnable machine.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::MarsError::InvalidParam`] naming the first
    /// offending field.
    pub const fn validate(&self) -> crate::MarsResult<()> {
        if self.core_size == 0 {
            return Err(crate::MarsError::InvalidParam(
                "core_size must be non-zero",
            ));
        }
        if self.max_processes == 0 {
            return Err(crate::MarsError::InvalidParam(
                "max_processes must be non-zero",
            ));
        }
        if self.max_length == 0 {
            return Err(crate::MarsError::InvalidParam(
                "max_length must be non-zero",
            ));
        }
        Ok(())
    }
}
