use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case},
    character::complete::space0,
    combinator::{map, opt},
    error::VerboseError,
    sequence::{pair, preceded, tuple},
    IResult,
};
use redcode::{
    default_modifiers, AddrMode, Instruction, RelaxedCompleteInstruction,
};

use crate::loadfile_primitives::{addr_mode, modifier, number, opcode};

/// One parsed operand: an optional addressing mode prefix and a value
type Operand = (Option<AddrMode>, i64);

/// Parses an operand.  The addressing mode defaults to `$` when omitted.
fn operand(input: &str) -> IResult<&str, Operand, VerboseError<&str>> {
    preceded(space0, pair(opt(addr_mode), number))(input)
}

/// Parses the content of an instruction line without consuming the line
/// ending or any trailing comment.
///
/// The modifier is optional and resolved with the ICWS '94 default rules
/// from the opcode and the operand modes.  The B-operand is optional and
/// reads as `$0` when missing.
pub fn instr_line(
    input: &str,
) -> IResult<&str, RelaxedCompleteInstruction, VerboseError<&str>> {
    let (leftover, (_, op, explicit_modifier, a_op, b_op)) = tuple((
        space0,
        opcode,
        opt(preceded(tag("."), modifier)),
        operand,
        opt(preceded(pair(space0, tag(",")), operand)),
    ))(input)?;

    let (a_mode, a_field) = a_op;
    let (b_mode, b_field) = b_op.unwrap_or((Some(AddrMode::Direct), 0));
    let a_addr_mode = a_mode.unwrap_or(AddrMode::Direct);
    let b_addr_mode = b_mode.unwrap_or(AddrMode::Direct);
    let modifier = explicit_modifier
        .unwrap_or_else(|| default_modifiers(op, a_addr_mode, b_addr_mode));

    Ok((
        leftover,
        RelaxedCompleteInstruction {
            instr: Instruction {
                opcode: op,
                modifier,
                a_addr_mode,
                b_addr_mode,
            },
            a_field,
            b_field,
        },
    ))
}

/// Parses the content of an `ORG` line.  Fails for symbolic targets.
pub fn org_line(input: &str) -> IResult<&str, i64, VerboseError<&str>> {
    let prefix = preceded(space0, tag_no_case("ORG"));
    preceded(prefix, number)(input)
}

/// Parses the content of an `END` line, with its optional start offset
pub fn end_line(input: &str) -> IResult<&str, Option<i64>, VerboseError<&str>> {
    let prefix = preceded(space0, tag_no_case("END"));
    let maybe_num = alt((map(number, Some), map(space0, |_| None)));
    preceded(prefix, maybe_num)(input)
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;
    use redcode::{Modifier, Opcode};

    use super::*;

    #[test]
    fn full_form_instruction() {
        let (rest, insn) = instr_line("MOV.I $0, $1").unwrap();
        assert!(rest.is_empty());
        assert_eq!(insn.instr.opcode, Opcode::Mov);
        assert_eq!(insn.instr.modifier, Modifier::I);
        assert_eq!(insn.a_field, 0);
        assert_eq!(insn.b_field, 1);
    }

    #[test]
    fn modifier_defaults_applied() {
        let (_, insn) = instr_line("ADD #4, 3").unwrap();
        assert_eq!(insn.instr.modifier, Modifier::AB);
        assert_eq!(insn.instr.a_addr_mode, AddrMode::Immediate);
        assert_eq!(insn.instr.b_addr_mode, AddrMode::Direct);

        let (_, insn) = instr_line("MOV 0, 1").unwrap();
        assert_eq!(insn.instr.modifier, Modifier::I);
    }

    #[test]
    fn missing_b_operand_reads_as_direct_zero() {
        let (_, insn) = instr_line("JMP -2").unwrap();
        assert_eq!(insn.instr.opcode, Opcode::Jmp);
        assert_eq!(insn.instr.b_addr_mode, AddrMode::Direct);
        assert_eq!(insn.a_field, -2);
        assert_eq!(insn.b_field, 0);
    }

    #[test]
    fn trailing_comment_left_unconsumed() {
        let (rest, _) = instr_line("SPL 0, 0 ; spawn thread").unwrap();
        assert_eq!(rest, "; spawn thread");
    }

    #[test]
    fn org_and_end_lines() {
        assert_eq!(org_line("ORG 1"), Ok(("", 1)));
        assert_eq!(org_line("  org -4"), Ok(("", -4)));
        assert!(org_line("ORG start").is_err());
        assert_eq!(end_line("END"), Ok(("", None)));
        assert_eq!(end_line("end 2"), Ok(("", Some(2))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(instr_line("MOVE 1, 2").is_err());
        assert!(instr_line("once upon a time").is_err());
        assert!(instr_line("").is_err());
    }
}
