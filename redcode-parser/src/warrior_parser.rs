use nom::{error::VerboseError, Err};
use redcode::{RelaxedCompleteInstruction, RelaxedWarrior};

use crate::line_parser::{end_line, instr_line, org_line};

/// Parse a warrior from loadfile-style source text.
///
/// This parser never fails.  Metadata directives set the warrior's name and
/// author, `ORG` and `END` set the start offset, instruction lines are
/// assembled, and anything else — prose, labels, malformed instructions — is
/// skipped.  Generated sources routinely interleave valid redcode with
/// junk, and the downstream validation is "at least one instruction", not
/// "every line parsed".
///
/// An `ORG` whose target is not an integer (a label reference) is rejected
/// explicitly: the line is skipped with a warning and the start offset is
/// left unchanged.
#[must_use]
pub fn parse_warrior(source: &str) -> RelaxedWarrior {
    let mut warrior = RelaxedWarrior {
        code: vec![],
        ..RelaxedWarrior::default()
    };

    for raw_line in source.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(name) = strip_prefix_ci(line, ";name") {
            let name = name.trim();
            if !name.is_empty() {
                warrior.name = name.to_owned();
            }
            continue;
        }
        if let Some(author) = strip_prefix_ci(line, ";author") {
            let author = author.trim();
            if !author.is_empty() {
                warrior.author = author.to_owned();
            }
            continue;
        }
        if line.starts_with(';') {
            continue;
        }
        if starts_with_keyword(line, "ORG") {
            match org_line(line) {
                Ok((_, start)) => warrior.start = start,
                Err(_) => {
                    log::warn!("ignoring ORG with non-integer target: {line}");
                }
            }
            continue;
        }
        if starts_with_keyword(line, "END") {
            if let Ok((_, Some(start))) = end_line(line) {
                warrior.start = start;
            }
            break;
        }
        match instr_line(line) {
            Ok((leftover, insn)) if is_line_tail(leftover) => {
                warrior.code.push(insn);
            }
            _ => log::debug!("skipping unparseable line: {line}"),
        }
    }

    warrior
}

/// Parse exactly one instruction from the input.
///
/// Unlike [`parse_warrior`] this is strict: the input must contain a single
/// valid instruction, optionally followed by whitespace or a trailing
/// comment.
///
/// # Errors
///
/// Returns the underlying parse error when the input does not contain a
/// valid instruction, or a `must consume` error when non-comment content
/// follows it.
pub fn parse_instruction(
    input: &str,
) -> Result<RelaxedCompleteInstruction, Err<VerboseError<&str>>> {
    let (leftover, insn) = instr_line(input)?;
    if is_line_tail(leftover.trim_start_matches(['\r', '\n'])) {
        Ok(insn)
    } else {
        Err(Err::Error(VerboseError {
            errors: vec![(
                leftover,
                nom::error::VerboseErrorKind::Context(
                    "Expected end of input after instruction",
                ),
            )],
        }))
    }
}

/// True when the remainder of an instruction line carries no further
/// content: whitespace or a trailing comment
fn is_line_tail(leftover: &str) -> bool {
    let trimmed = leftover.trim();
    trimmed.is_empty() || trimmed.starts_with(';')
}

/// Case-insensitive prefix strip
fn strip_prefix_ci<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    line.get(..prefix.len()).and_then(|head| {
        head.eq_ignore_ascii_case(prefix)
            .then(|| line.get(prefix.len()..).unwrap_or(""))
    })
}

/// True when the line begins with the keyword followed by whitespace or
/// end of line.  Prevents reading an `ORGAN`-style label as a pseudo-op.
fn starts_with_keyword(line: &str, keyword: &str) -> bool {
    strip_prefix_ci(line, keyword).is_some_and(|rest| {
        rest.is_empty() || rest.starts_with(char::is_whitespace)
    })
}
