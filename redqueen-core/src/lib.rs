//! # redqueen-core
//!
//! The battle virtual machine for CoreWar redcode programs: a circular core
//! of instructions, per-warrior process queues, a cycle-accurate executor
//! for the ICWS '94 instruction set, and a battle runner that places
//! warriors at random positions and aggregates multi-round matches.
//!
//! ## Usage
//!
//! [`Mars`] is the single-battle machine: construct one from a
//! [`MarsConfig`], load normalized warriors, and either [`Mars::run`] it to
//! termination or drive it one [`Mars::step`] at a time.  [`Battle`] wraps
//! the machine for multi-round matches with random placement and publishes
//! the per-warrior [`BehaviorMetrics`] the evolution layer consumes.
//!
//! ```rust
//! use redqueen_core::{Battle, MarsConfig};
//!
//! let imp = redcode_parser::parse_warrior(";name Imp\nMOV.I $0, $1");
//! let dwarf = redcode_parser::parse_warrior(
//!     ";name Dwarf\nADD.AB #4, 3\nMOV.I 2, @2\nJMP -2\nDAT #0, #0",
//! );
//!
//! let battle = Battle::new(MarsConfig::default(), 3);
//! let result = battle.run(&[imp, dwarf]).unwrap();
//! assert_eq!(result.metrics.len(), 2);
//! ```
//!
//! Execution is strictly cooperative: warriors take turns in registration
//! order, one instruction per turn, and a cycle is one executed
//! instruction.  Nothing in a battle is shared between battles, so battles
//! parallelize from the outside without coordination.

// Make clippy as annoying as possible
#![deny(
    // All typically enabled warnings are converted into errors
    // includes correctness, suspicious, style, complexity, and perf
    clippy::all,
    // Error on cargo lints
    clippy::cargo,
)]
#![warn(
    // Warn on pedantic and in-development nursery lints
    clippy::pedantic,
    clippy::nursery,
    // Lints from "restriction" group - enforce a consistent if arbitrary style
    clippy::alloc_instead_of_core,
    clippy::dbg_macro,
    clippy::expect_used,
    clippy::missing_docs_in_private_items,
    clippy::panic,
    clippy::print_stderr,
    clippy::print_stdout,
    clippy::str_to_string,
    clippy::todo,
    clippy::unimplemented,
    clippy::unreachable,
    clippy::unwrap_used,
    clippy::use_debug,
)]

use core::fmt;

/// An offset into a core, valid from 0 to `core_size - 1` inclusive.
pub type CoreAddr = redcode::FieldValue;

/// Identifies a loaded warrior by its registration order.
pub type WarriorId = usize;

/// Result type shared by the machine's fallible setup operations
pub type MarsResult<T> = core::result::Result<T, MarsError>;

/// Error kinds for battle setup.  Execution itself cannot fail: every
/// address is normalized before use and every arithmetic path is total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarsError {
    /// Out of range or otherwise illegal inputs
    InvalidParam(&'static str),
}

impl fmt::Display for MarsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::InvalidParam(msg) => {
                write!(f, "invalid battle parameter: {msg}")
            }
        }
    }
}

impl std::error::Error for MarsError {}

/// Battle machine configuration
mod config;
pub use config::MarsConfig;

/// The circular instruction memory with per-cell ownership tags
mod core_memory;
pub use core_memory::{offset, Core};

/// Per-warrior runtime state and behavioral counters
mod state;
pub use state::{BehaviorMetrics, WarriorState};

/// Operand evaluation including predecrement and postincrement side effects
mod operands;

/// Logic for executing decoded instructions against the core
mod ops;

/// The fetch-decode-execute loop and warrior scheduling
mod mars;
pub use mars::Mars;

/// Random placement, multi-round battles, and tournaments
mod battle;
pub use battle::{sample_positions, Battle, BattleResult, Standing};
