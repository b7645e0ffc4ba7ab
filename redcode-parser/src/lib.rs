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

//! Parsing functions for CoreWar's redcode syntax.
//!
//! The warrior parser is deliberately lenient: program sources arrive from
//! files, from hand-written classics, and from text-generation services, so
//! [`parse_warrior`] extracts every line it can interpret and skips the
//! rest.  It never fails; callers must check for an empty result.  The
//! strict entry point [`parse_instruction`] parses exactly one instruction
//! line and reports errors.
//!
//! Supported grammar, line oriented and case insensitive:
//!
//! * `;name <text>` and `;author <text>` metadata directives; any other
//!   `;`-prefixed line is a comment
//! * `ORG <int>` and `END [<int>]` pseudo-instructions; `END` terminates
//!   parsing
//! * `OPCODE[.MODIFIER] <operand>[, <operand>]` where an operand is an
//!   optional addressing-mode character (`#$*@{<}>`, `$` when omitted)
//!   followed by a signed integer, with the modifier defaulted by the
//!   ICWS '94 rules when omitted, and a missing B-operand read as `$0`
//! * trailing `;` comments after an instruction

/// Lenient warrior parsing and the strict single-instruction parser
mod warrior_parser;
pub use warrior_parser::{parse_instruction, parse_warrior};

/// Internal functions which evaluate the content of a single line, without
/// consuming any newline characters
mod line_parser;

/// Internal functions which parse well defined primitives from the redcode
/// grammar.
mod loadfile_primitives;
