use core::fmt;

use serde::{Deserialize, Serialize};

/// Fields hold values that are positive offsets from their own core address.
/// They are stored and used modulo `core_size`.
pub type FieldValue = u32;

/// The operand portion of an instruction.
///
/// Supports the '94 ICWS standard opcodes.  The pMARS P-space extensions
/// (LDP/STP) are not part of this instruction set: battles here never carry
/// state from one round to the next.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    FromPrimitive,
    ToPrimitive,
    Serialize,
    Deserialize,
)]
pub enum Opcode {
    /// Remove the current task from a warrior's task queue
    Dat,

    /// Replace the B-target with the A-value and queue the next instruction
    Mov,

    /// Replace the B-target with the sum of the A/B values, and queue the next
    /// instruction
    Add,

    /// Replace the B-target with the B-value minus the A-value, and queue the
    /// next instruction
    Sub,

    /// Replace the B-target with the A-value times the B-value, and queue the
    /// next instruction
    Mul,

    /// Replace the B-target with the B-value divided by the A-value.  If any
    /// selected part of the A-value is zero, nothing is written and the
    /// current task dies.
    Div,

    /// Replace the B-target with the remainder from the B-value divided by
    /// the A-value.  If any selected part of the A-value is zero, nothing is
    /// written and the current task dies.
    Mod,

    /// Queues the A-pointer
    Jmp,

    /// Queues the A-pointer if the B-value is zero, and otherwise queues the
    /// next instruction.
    Jmz,

    /// Queues the A-pointer if any part of the B-value is not zero, and
    /// otherwise queues the next instruction.
    Jmn,

    /// Decrements the B-value and B-target, and then queues the A-pointer if
    /// the decremented B-value is not zero, and otherwise queues the next
    /// instruction.
    Djn,

    /// Queues the A-pointer as a new task while the queue has room under
    /// the process cap, and then queues the next instruction.  At the cap,
    /// only the next instruction is queued.
    Spl,

    /// Compares the A-value to the B-value.  If every part of the A-value is
    /// less than the corresponding part of the B-value, the instruction after
    /// next is queued, and otherwise the next instruction is queued.
    Slt,

    /// Compares the A-value to the B-value.  If every part is equal, the
    /// instruction after next is queued, and otherwise the next instruction
    /// is queued.  An alias for [`Opcode::Seq`].
    Cmp,

    /// Compares the A-value to the B-value.  If every part is equal, the
    /// instruction after next is queued, and otherwise the next instruction
    /// is queued.
    Seq,

    /// Compares the A-value to the B-value.  If any part of the A-value is
    /// not equal to the corresponding part of the B-value, the instruction
    /// after next is queued, and otherwise the next instruction is queued.
    Sne,

    /// Queues the next instruction and does nothing else.
    Nop,
}

#[allow(clippy::use_debug)]
impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Use Debug formatter to get the identifier of this variant
        write!(f, "{self:?}")
    }
}

/// The opcode modifier portion of a redcode instruction
///
/// Selects which fields of the source and destination instructions an
/// operation reads and writes.
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    FromPrimitive,
    ToPrimitive,
    Serialize,
    Deserialize,
)]
pub enum Modifier {
    /// A-number of the source to the A-number of the destination
    A,

    /// B-number of the source to the B-number of the destination
    B,

    /// A-number of the source to the B-number of the destination
    AB,

    /// B-number of the source to the A-number of the destination
    BA,

    /// Both numbers of the source to the corresponding numbers of the
    /// destination
    F,

    /// Both numbers of the source to the opposite numbers of the destination
    X,

    /// The entire source instruction to the destination.  Only MOV and the
    /// equality comparisons distinguish I from F.
    I,
}

#[allow(clippy::use_debug)]
impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Use Debug formatter to get the identifier of this variant
        write!(f, "{self:?}")
    }
}

/// The addressing mode applied to the field of an instruction
#[derive(
    Copy,
    Clone,
    Debug,
    Eq,
    PartialEq,
    Hash,
    FromPrimitive,
    ToPrimitive,
    Serialize,
    Deserialize,
)]
pub enum AddrMode {
    /// Represented by `#`.  The operand merely stores data: the pointer is
    /// the current instruction and the value is the field itself.
    Immediate,

    /// Represented by `$`.  The field is an offset from the program counter.
    Direct,

    /// Represented by `*`.  The field points at an instruction whose
    /// A-number supplies a secondary offset from that instruction.
    IndirectA,

    /// Represented by `@`.  The field points at an instruction whose
    /// B-number supplies a secondary offset from that instruction.
    IndirectB,

    /// Represented by `{`.  As [`AddrMode::IndirectA`], but the A-number of
    /// the pointed-to instruction is decremented (and written back) before
    /// the pointer is derived.
    PredecA,

    /// Represented by `<`.  As [`AddrMode::IndirectB`], but the B-number of
    /// the pointed-to instruction is decremented (and written back) before
    /// the pointer is derived.
    PredecB,

    /// Represented by `}`.  As [`AddrMode::IndirectA`], but the A-number of
    /// the pointed-to instruction is incremented (and written back) after
    /// the pointer and value are derived.
    PostincA,

    /// Represented by `>`.  As [`AddrMode::IndirectB`], but the B-number of
    /// the pointed-to instruction is incremented (and written back) after
    /// the pointer and value are derived.
    PostincB,
}

impl fmt::Display for AddrMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::Immediate => write!(f, "#"),
            Self::Direct => write!(f, "$"),
            Self::IndirectA => write!(f, "*"),
            Self::IndirectB => write!(f, "@"),
            // "{{" is escaped form of "{"
            Self::PredecA => write!(f, "{{"),
            Self::PredecB => write!(f, "<"),
            // "}}" is escaped form of "}"
            Self::PostincA => write!(f, "}}"),
            Self::PostincB => write!(f, ">"),
        }
    }
}

/// A Redcode assembly instruction including modifiers and addressing modes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Instruction {
    /// The opcode portion of a redcode instruction e.g. `DAT` or `JMP`
    pub opcode: Opcode,
    /// The modifier portion of a redcode instruction e.g. `.BA` or `.X`
    pub modifier: Modifier,
    /// The addressing mode used by the A field e.g. `>` or `$`
    pub a_addr_mode: AddrMode,
    /// The addressing mode used by the B field e.g. `>` or `$`
    pub b_addr_mode: AddrMode,
}

/// A Redcode instruction (opcode, modifier, modes) along with field values.
#[derive(
    Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize,
)]
pub struct CompleteInstruction {
    /// The opcode, modifier, and modes used by this instruction
    pub instr: Instruction,
    /// The A-field stored in this instruction
    pub a_field: FieldValue,
    /// The B-field stored in this instruction
    pub b_field: FieldValue,
}

impl fmt::Display for CompleteInstruction {
    /// Formats an instruction as a '94 loadfile syntax instruction.
    ///
    /// ```
    /// # use redcode::*;
    /// let a = CompleteInstruction {
    ///     instr: Instruction {
    ///         opcode: Opcode::Add,
    ///         modifier: Modifier::AB,
    ///         a_addr_mode: AddrMode::Immediate,
    ///         b_addr_mode: AddrMode::Direct,
    ///     },
    ///     a_field: 16,
    ///     b_field: 32,
    /// };
    ///
    /// assert_eq!(a.to_string(), "Add.AB #16, $32");
    /// ```
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

impl Default for Instruction {
    /// The default core cell is `DAT.F $0, $0`: executing an untouched cell
    /// kills the process.
    fn default() -> Self {
        Self {
            opcode: Opcode::Dat,
            modifier: Modifier::F,
            a_addr_mode: AddrMode::Direct,
            b_addr_mode: AddrMode::Direct,
        }
    }
}

/// An assembled redcode program with fields normalized to a core size
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Warrior {
    /// Name of the program, from the `;name` directive
    pub name: String,
    /// Author of the program, from the `;author` directive
    pub author: String,
    /// A sequence of complete compiled redcode instructions
    pub code: Vec<CompleteInstruction>,
    /// Offset *into the warrior* where execution begins
    pub start: FieldValue,
}

impl Default for Warrior {
    fn default() -> Self {
        Self {
            name: "Unknown".into(),
            author: "Unknown".into(),
            code: vec![CompleteInstruction::default()],
            start: 0,
        }
    }
}

#[must_use]
/// Determine the modifier an instruction gets when its source text omits one.
///
/// These are the ICWS '94 rules, and community warriors written without
/// modifiers only assemble identically if this table is reproduced exactly.
pub const fn default_modifiers(
    op: Opcode,
    a_mode: AddrMode,
    b_mode: AddrMode,
) -> Modifier {
    #[allow(clippy::match_same_arms)]
    match (op, a_mode, b_mode) {
        // Dat and Nop always default to .F
        (Opcode::Nop | Opcode::Dat, ..) => Modifier::F,
        // Mov, Seq, Sne, and Cmp
        // 1) .AB if A-mode is immediate
        // 2) .B if B-Mode is immediate and A-Mode isn't
        // 3) .I if neither A or B mode are immediate
        (
            Opcode::Mov | Opcode::Seq | Opcode::Sne | Opcode::Cmp,
            AddrMode::Immediate,
            _,
        ) => Modifier::AB,
        (
            Opcode::Mov | Opcode::Seq | Opcode::Sne | Opcode::Cmp,
            _,
            AddrMode::Immediate,
        ) => Modifier::B,
        (Opcode::Mov | Opcode::Seq | Opcode::Sne | Opcode::Cmp, ..) => {
            Modifier::I
        }
        // Add, Sub, Mul, Div, and Mod
        // 1) .AB if A-mode is immediate
        // 2) .B if B-Mode is immediate and A-Mode isn't
        // 3) .F if neither A or B mode are immediate
        (
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod,
            AddrMode::Immediate,
            _,
        ) => Modifier::AB,
        (
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod,
            _,
            AddrMode::Immediate,
        ) => Modifier::B,
        (
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod,
            ..,
        ) => Modifier::F,
        // Slt
        // 1) .AB if A-mode is immediate
        // 2) .B in all other cases
        (Opcode::Slt, AddrMode::Immediate, _) => Modifier::AB,
        (Opcode::Slt, ..) => Modifier::B,
        // Jmp, Jmz, Jmn, Djn, Spl are always .B
        (
            Opcode::Jmp | Opcode::Jmz | Opcode::Jmn | Opcode::Djn | Opcode::Spl,
            ..,
        ) => Modifier::B,
    }
}

/// Utilities for enumerating and iterating over all valid redcode instructions
pub mod test_utils {
    use super::*;

    /// All valid opcodes for this instruction set
    pub const OPCODES: [Opcode; 17] = [
        Opcode::Dat,
        Opcode::Mov,
        Opcode::Add,
        Opcode::Sub,
        Opcode::Mul,
        Opcode::Div,
        Opcode::Mod,
        Opcode::Jmp,
        Opcode::Jmz,
        Opcode::Jmn,
        Opcode::Djn,
        Opcode::Spl,
        Opcode::Slt,
        Opcode::Cmp,
        Opcode::Seq,
        Opcode::Sne,
        Opcode::Nop,
    ];

    /// All valid modifiers
    pub const MODIFIERS: [Modifier; 7] = [
        Modifier::A,
        Modifier::B,
        Modifier::AB,
        Modifier::BA,
        Modifier::F,
        Modifier::X,
        Modifier::I,
    ];

    /// All valid addressing modes
    pub const ADDR_MODES: [AddrMode; 8] = [
        AddrMode::Immediate,
        AddrMode::Direct,
        AddrMode::IndirectA,
        AddrMode::IndirectB,
        AddrMode::PredecA,
        AddrMode::PredecB,
        AddrMode::PostincA,
        AddrMode::PostincB,
    ];

    /// iterate over every valid redcode instruction
    pub fn all_instructions() -> impl Iterator<Item = Instruction> {
        itertools::iproduct!(
            OPCODES.iter(),
            MODIFIERS.iter(),
            ADDR_MODES.iter(),
            ADDR_MODES.iter()
        )
        .map(|(o, m, a, b)| Instruction {
            opcode: *o,
            modifier: *m,
            a_addr_mode: *a,
            b_addr_mode: *b,
        })
    }
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;
    use itertools::Itertools;

    use super::*;
    use crate::test_utils::all_instructions;

    #[test]
    fn test_instr_default_equ() {
        let default: Instruction = Default::default();
        let manual = Instruction {
            opcode: Opcode::Dat,
            modifier: Modifier::F,
            a_addr_mode: AddrMode::Direct,
            b_addr_mode: AddrMode::Direct,
        };
        assert_eq!(default, manual);
    }

    #[test]
    fn test_default_warrior() {
        let default: Warrior = Default::default();
        assert_eq!(default.code, vec![CompleteInstruction::default()]);
        assert_eq!(default.start, 0);
        assert_eq!(default.name, "Unknown");
    }

    #[test]
    fn enumerate_instructions_are_unique() {
        let instructions: Vec<Instruction> =
            test_utils::all_instructions().collect();
        let unique_instructions: Vec<Instruction> =
            test_utils::all_instructions().unique().collect();

        assert_eq!(instructions.len(), unique_instructions.len());
    }

    #[test]
    fn enumerate_instructions_right_number() {
        let expected_number = test_utils::OPCODES.len()
            * test_utils::MODIFIERS.len()
            * test_utils::ADDR_MODES.len()
            * test_utils::ADDR_MODES.len();
        assert_eq!(all_instructions().count(), expected_number);
    }

    #[test]
    fn all_instructions_have_unique_display() {
        let a_field = 123;
        let b_field = 456;
        let instructions_displayed: Vec<String> =
            test_utils::all_instructions()
                .map(|instr| CompleteInstruction {
                    instr,
                    a_field,
                    b_field,
                })
                .map(|x| x.to_string())
                .collect();

        let unique_display_reprs =
            instructions_displayed.iter().unique().count();
        assert_eq!(unique_display_reprs, instructions_displayed.len());
    }

    #[test]
    fn default_modifier_table() {
        use AddrMode::{Direct, Immediate};
        let cases = [
            (Opcode::Dat, Immediate, Immediate, Modifier::F),
            (Opcode::Nop, Direct, Direct, Modifier::F),
            (Opcode::Mov, Immediate, Direct, Modifier::AB),
            (Opcode::Mov, Direct, Immediate, Modifier::B),
            (Opcode::Mov, Direct, Direct, Modifier::I),
            (Opcode::Seq, Direct, Direct, Modifier::I),
            (Opcode::Sne, Immediate, Immediate, Modifier::AB),
            (Opcode::Add, Immediate, Direct, Modifier::AB),
            (Opcode::Add, Direct, Immediate, Modifier::B),
            (Opcode::Add, Direct, Direct, Modifier::F),
            (Opcode::Div, Direct, Direct, Modifier::F),
            (Opcode::Slt, Immediate, Direct, Modifier::AB),
            (Opcode::Slt, Direct, Immediate, Modifier::B),
            (Opcode::Jmp, Immediate, Immediate, Modifier::B),
            (Opcode::Spl, Direct, Direct, Modifier::B),
            (Opcode::Djn, Direct, Direct, Modifier::B),
        ];
        for (op, a, b, expected) in cases {
            assert_eq!(
                default_modifiers(op, a, b),
                expected,
                "wrong default for {op} {a} {b}"
            );
        }
    }

    #[test]
    fn all_values_support_to_u8() {
        use num_traits::cast::ToPrimitive;
        // num_traits specifies that if the number of variants is within the
        // range of the specified type, then ToPrimitive should always return
        // Some.  Test that this remains true, or that more variants haven't
        // been added which break the assumptions that all types can fit within
        // a u8

        for op in test_utils::OPCODES {
            assert!(op.to_u8().is_some());
        }
        for modifier in test_utils::MODIFIERS {
            assert!(modifier.to_u8().is_some());
        }
        for mode in test_utils::ADDR_MODES {
            assert!(mode.to_u8().is_some());
        }
    }
}
