//! Representations for the redcode assembly language used in CoreWar
//!
//! Supports the instruction set executed by the battle virtual machine in
//! this workspace: the ICWS '94 opcodes, modifiers, and addressing modes,
//! without the pMARS P-space extensions.
//!
//! Warriors exist in two forms.  [`RelaxedWarrior`] is what parsing and
//! program generation produce: field values are signed and unbounded because
//! the core size is not known yet.  [`Warrior`] is the normalized form with
//! every field folded into `[0, core_size)`, ready to be loaded into a core.
//!
//! See also the ['94 ICWS draft](https://corewar.co.uk/standards/icws94.txt)

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
    clippy::std_instead_of_alloc,
    clippy::std_instead_of_core,
    clippy::str_to_string,
    clippy::todo,
    clippy::unimplemented,
    clippy::unreachable,
    clippy::unwrap_used,
    clippy::use_debug,
)]

// used to convert redcode enums to numerical values
#[macro_use]
extern crate num_derive;

/// Standard representations for redcode types
mod redcode;
pub use crate::redcode::*;

/// Redcode equivalent types with looser constraints.
///
/// These types are similar to their redcode equivalents, but allow negative
/// values for fields.  This is a convenience to simplify operations like
/// redcode parsing where the `core_size` needed to fix-up addresses may not
/// be available to the code parsing instructions
mod relaxed_redcode;
pub use relaxed_redcode::*;
