//! # redqueen-evolve
//!
//! The evolution layer: a MAP-Elites archive over behavioral descriptors, a
//! fitness evaluator backed by the battle runner, a variation-operator port
//! for text-generation services (with a purely local stand-in), and the
//! outer self-play controller in which each round's champion must hold its
//! own against the champions that came before it.
//!
//! The crate is organized around three seams:
//!
//! * [`Variation`] — how new warriors come to exist.  [`LlmVariation`]
//!   drives any [`TextGenerator`]; [`LocalVariation`] is the same fallback
//!   machinery as a standalone operator so the whole loop runs offline.
//! * [`FitnessEvaluator`] — how warriors are scored, by battling a set of
//!   opponents and averaging behavioral measurements.
//! * [`MapElites`] — where candidates accumulate, one elite per cell of the
//!   discretized behavior space.
//!
//! [`RedQueen`] wires the three together and checkpoints each round to
//! disk.

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

/// Behavioral axes and the projection from measurements to archive cells
mod descriptor;
pub use descriptor::{Axis, BehaviorDescriptor, CellKey, MetricKind};

/// The elite archive and the quality-diversity loop over it
mod map_elites;
pub use map_elites::{ArchiveStats, EliteCell, MapElites};

/// Battle-backed fitness scoring
mod fitness;
pub use fitness::{
    FitnessConfig, FitnessEvaluator, Generality, HeadToHead, MatchWinner,
};

/// The variation-operator port: trait, text-generation backend, local
/// fallback, and response extraction
mod variation;
pub use variation::{
    CompletionRequest, LlmVariation, LocalVariation, PromptConfig,
    TextGenerator, TransportError, Variation, VariationStats,
};

/// Classic warrior programs used as seeds and fallbacks
pub mod templates;

/// The self-play controller
mod controller;
pub use controller::{EvolveError, RedQueen, RedQueenConfig, RoundRecord};

/// Round and run persistence
mod checkpoint;
