use core::fmt;

use crate::{CompleteInstruction, FieldValue, Instruction, Warrior};

/// A [`CompleteInstruction`] that allows field values less than zero or
/// greater than `core_size`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Default)]
pub struct RelaxedCompleteInstruction {
    /// The opcode, modifier, and modes used by this instruction
    pub instr: Instruction,
    /// The A-field stored in this instruction, interpreted modulo `core_size`
    pub a_field: i64,
    /// The B-field stored in this instruction, interpreted modulo `core_size`
    pub b_field: i64,
}

impl RelaxedCompleteInstruction {
    /// Convert into a [`CompleteInstruction`] by evaluating fields modulo
    /// `core_size`
    #[must_use]
    pub fn normalize(&self, core_size: FieldValue) -> CompleteInstruction {
        CompleteInstruction {
            instr: self.instr,
            a_field: normalize(self.a_field, core_size),
            b_field: normalize(self.b_field, core_size),
        }
    }
}

impl fmt::Display for RelaxedCompleteInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} {}{}, {}{}",
            self.instr.opcode,
            self.instr.modifier,
            self.instr.a_addr_mode,
            self.a_field,
            self.instr.b_addr_mode,
            self.b_field
        )
    }
}

/// A [`Warrior`] with [`RelaxedCompleteInstruction`]s that allow field values
/// less than zero or greater than `core_size`.
///
/// This is the form warriors take between generation (by a parser or by a
/// program generator) and loading, and it is the currency of the evolution
/// loop: archives and champion histories store relaxed warriors.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RelaxedWarrior {
    /// Name of the program, from the `;name` directive
    pub name: String,
    /// Author of the program, from the `;author` directive
    pub author: String,
    /// A sequence of redcode instructions
    pub code: Vec<RelaxedCompleteInstruction>,
    /// Offset from the start of a warrior where execution begins
    pub start: i64,
}

impl RelaxedWarrior {
    /// Convert into a [`Warrior`] consisting of [`CompleteInstruction`]s by
    /// evaluating fields modulo `core_size`
    #[must_use]
    pub fn normalize(&self, core_size: FieldValue) -> Warrior {
        let code = self
            .code
            .iter()
            .map(|insn| insn.normalize(core_size))
            .collect();
        Warrior {
            name: self.name.clone(),
            author: self.author.clone(),
            code,
            start: normalize(self.start, core_size),
        }
    }

    /// Number of instructions in this warrior
    #[must_use]
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// True for a warrior with no instructions.  Empty warriors are the
    /// signature of a failed generation and are rejected before loading.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl Default for RelaxedWarrior {
    fn default() -> Self {
        Self {
            name: "Unknown".into(),
            author: "Unknown".into(),
            code: vec![RelaxedCompleteInstruction::default()],
            start: 0,
        }
    }
}

impl fmt::Display for RelaxedWarrior {
    /// Formats the warrior as a complete loadfile that the parser accepts
    /// back: metadata directives, one instruction per line, and a trailing
    /// `ORG` when execution does not begin at the first instruction.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, ";redcode-94")?;
        writeln!(f, ";name {}", self.name)?;
        writeln!(f, ";author {}", self.author)?;
        for insn in &self.code {
            writeln!(f, "{insn}")?;
        }
        if self.start != 0 {
            writeln!(f, "ORG {}", self.start)?;
        }
        Ok(())
    }
}

/// Evaluate a value as if it is a core offset, wrapping around at
/// `core_size`.  A zero `core_size` never occurs for a validated
/// configuration and folds everything to zero.
#[must_use]
pub fn normalize(value: i64, core_size: FieldValue) -> FieldValue {
    if core_size == 0 {
        return 0;
    }
    let normalized = value.rem_euclid(i64::from(core_size));
    FieldValue::try_from(normalized).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;

    use super::{normalize, RelaxedCompleteInstruction, RelaxedWarrior};
    use crate::Instruction;

    #[test]
    fn verify_positive_and_negative_conversions() {
        let i = RelaxedCompleteInstruction {
            instr: Instruction::default(),
            a_field: -10,
            b_field: 20,
        };
        let normalized = i.normalize(15);
        assert_eq!(normalized.a_field, 5);
        assert_eq!(normalized.b_field, 5);
    }

    #[test]
    fn normalize_folds_extremes() {
        assert_eq!(normalize(-1, 8000), 7999);
        assert_eq!(normalize(8000, 8000), 0);
        assert_eq!(normalize(16001, 8000), 1);
        assert_eq!(normalize(0, 8000), 0);
    }

    #[test]
    fn warrior_normalize_wraps_start() {
        let war = RelaxedWarrior {
            code: vec![RelaxedCompleteInstruction {
                instr: Instruction::default(),
                a_field: -1,
                b_field: 1,
            }],
            start: -3,
            ..Default::default()
        };
        let normalized = war.normalize(10);
        assert_eq!(normalized.start, 7);
        assert_eq!(normalized.code[0].a_field, 9);
    }

    #[test]
    fn loadfile_display_has_metadata_and_org() {
        let war = RelaxedWarrior {
            name: "Imp".into(),
            author: "A.K. Dewdney".into(),
            start: 1,
            ..Default::default()
        };
        let text = war.to_string();
        assert!(text.contains(";name Imp"));
        assert!(text.contains(";author A.K. Dewdney"));
        assert!(text.ends_with("ORG 1\n"));
    }
}
