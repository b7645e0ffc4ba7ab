use redcode::{CompleteInstruction, Modifier, Opcode};

use crate::{core_memory::offset, Core, CoreAddr, WarriorState};

/// Values latched for one instruction: the program counter, the resolved
/// operand pointers, and the source/destination snapshots read after both
/// operands were evaluated.  Later core writes do not touch these.
pub struct Registers {
    /// Address of the executing instruction
    pub pc: CoreAddr,
    /// `(pc + 1) mod core_size`
    pub next_pc: CoreAddr,
    /// The executing instruction itself
    pub instr: CompleteInstruction,
    /// Resolved A-operand pointer
    pub a_ptr: CoreAddr,
    /// Resolved B-operand pointer; writes land here
    pub b_ptr: CoreAddr,
    /// Snapshot of the cell at `a_ptr`
    pub src: CompleteInstruction,
    /// Snapshot of the cell at `b_ptr`
    pub dst: CompleteInstruction,
}

/// Everything an opcode implementation may touch
pub struct OpInputs<'a> {
    /// The core, for the write half of each operation
    pub core: &'a mut Core,
    /// The executing warrior: queue and counters
    pub state: &'a mut WarriorState,
    /// Latched operand values
    pub regs: &'a Registers,
}

/// Execute the already-resolved instruction in `inputs.regs`.
///
/// Queueing is part of each opcode: an opcode that queues nothing kills the
/// current process.
pub fn execute(inputs: OpInputs) {
    match inputs.regs.instr.instr.opcode {
        // DAT does nothing past operand evaluation and queues no further
        // values, removing the current process
        Opcode::Dat => {}
        Opcode::Mov => mov_op(inputs),
        Opcode::Add
        | Opcode::Sub
        | Opcode::Mul
        | Opcode::Div
        | Opcode::Mod => arithmetic_op(inputs),
        Opcode::Jmp => jmp_op(inputs),
        Opcode::Jmz => jmz_op(inputs),
        Opcode::Jmn => jmn_op(inputs),
        Opcode::Djn => djn_op(inputs),
        Opcode::Spl => spl_op(inputs),
        Opcode::Slt => slt_op(inputs),
        Opcode::Cmp | Opcode::Seq => seq_op(inputs),
        Opcode::Sne => sne_op(inputs),
        Opcode::Nop => nop_op(inputs),
    }
}

/// Implementation of the [`Opcode::Mov`] instruction
fn mov_op(inputs: OpInputs) {
    let src = inputs.regs.src;
    let mut new_dst = inputs.regs.dst;
    match inputs.regs.instr.instr.modifier {
        Modifier::A => new_dst.a_field = src.a_field,
        Modifier::B => new_dst.b_field = src.b_field,
        Modifier::AB => new_dst.b_field = src.a_field,
        Modifier::BA => new_dst.a_field = src.b_field,
        Modifier::F => {
            new_dst.a_field = src.a_field;
            new_dst.b_field = src.b_field;
        }
        Modifier::X => {
            new_dst.a_field = src.b_field;
            new_dst.b_field = src.a_field;
        }
        // MOV.I replaces the entire destination instruction
        Modifier::I => new_dst = src,
    }
    inputs.core.write(inputs.regs.b_ptr, new_dst, inputs.state);
    inputs.state.push_pc(inputs.regs.next_pc);
}

/// One field-level arithmetic step, modulo core size.  Returns `None` when
/// the operation divides or reduces by a zero field.
fn arith(
    op: Opcode,
    lhs: CoreAddr,
    rhs: CoreAddr,
    size: CoreAddr,
) -> Option<CoreAddr> {
    match op {
        Opcode::Add => Some(offset(lhs, i64::from(rhs), size)),
        Opcode::Sub => Some(offset(lhs, -i64::from(rhs), size)),
        Opcode::Mul => {
            let product = u64::from(lhs) * u64::from(rhs);
            let reduced = if size == 0 { 0 } else { product % u64::from(size) };
            Some(CoreAddr::try_from(reduced).unwrap_or_default())
        }
        Opcode::Div => (rhs != 0).then(|| lhs / rhs),
        Opcode::Mod => (rhs != 0).then(|| lhs % rhs),
        _ => None,
    }
}

/// Implementation of the [`Opcode::Add`], [`Opcode::Sub`], [`Opcode::Mul`],
/// [`Opcode::Div`], and [`Opcode::Mod`] instructions.
///
/// Division or modulo where any selected source field is zero kills the
/// process: nothing is written (not even the other field) and the next
/// instruction is not queued.
fn arithmetic_op(inputs: OpInputs) {
    let op = inputs.regs.instr.instr.opcode;
    let size = inputs.core.size();
    let src = inputs.regs.src;
    let mut new_dst = inputs.regs.dst;

    let survived = match inputs.regs.instr.instr.modifier {
        Modifier::A => arith(op, new_dst.a_field, src.a_field, size)
            .map(|val| new_dst.a_field = val),
        Modifier::B => arith(op, new_dst.b_field, src.b_field, size)
            .map(|val| new_dst.b_field = val),
        Modifier::AB => arith(op, new_dst.b_field, src.a_field, size)
            .map(|val| new_dst.b_field = val),
        Modifier::BA => arith(op, new_dst.a_field, src.b_field, size)
            .map(|val| new_dst.a_field = val),
        // Arithmetic .I behaves as .F
        Modifier::F | Modifier::I => {
            arith(op, new_dst.a_field, src.a_field, size)
                .zip(arith(op, new_dst.b_field, src.b_field, size))
                .map(|(a_val, b_val)| {
                    new_dst.a_field = a_val;
                    new_dst.b_field = b_val;
                })
        }
        Modifier::X => arith(op, new_dst.a_field, src.b_field, size)
            .zip(arith(op, new_dst.b_field, src.a_field, size))
            .map(|(a_val, b_val)| {
                new_dst.a_field = a_val;
                new_dst.b_field = b_val;
            }),
    };

    if survived.is_some() {
        inputs.core.write(inputs.regs.b_ptr, new_dst, inputs.state);
        inputs.state.push_pc(inputs.regs.next_pc);
    }
}

/// Implementation of the [`Opcode::Jmp`] instruction
fn jmp_op(inputs: OpInputs) {
    // jmp unconditionally queues the A-pointer
    inputs.state.push_pc(inputs.regs.a_ptr);
}

/// True when the fields of `instr` selected by the modifier are all zero.
/// JMZ, JMN, and DJN test their destination through this projection; the
/// multi-field modifiers F, X, and I all mean "both fields".
const fn projected_zero(modifier: Modifier, instr: CompleteInstruction) -> bool {
    match modifier {
        Modifier::A | Modifier::BA => instr.a_field == 0,
        Modifier::B | Modifier::AB => instr.b_field == 0,
        Modifier::F | Modifier::X | Modifier::I => {
            instr.a_field == 0 && instr.b_field == 0
        }
    }
}

/// Implementation of the [`Opcode::Jmz`] instruction
fn jmz_op(inputs: OpInputs) {
    if projected_zero(inputs.regs.instr.instr.modifier, inputs.regs.dst) {
        inputs.state.push_pc(inputs.regs.a_ptr);
    } else {
        inputs.state.push_pc(inputs.regs.next_pc);
    }
}

/// Implementation of the [`Opcode::Jmn`] instruction: jumps when any
/// projected field is non-zero
fn jmn_op(inputs: OpInputs) {
    if projected_zero(inputs.regs.instr.instr.modifier, inputs.regs.dst) {
        inputs.state.push_pc(inputs.regs.next_pc);
    } else {
        inputs.state.push_pc(inputs.regs.a_ptr);
    }
}

/// Implementation of the [`Opcode::Djn`] instruction: decrement the
/// destination's projected fields, write back, then jump unless the
/// decremented projection is all zero
fn djn_op(inputs: OpInputs) {
    let size = inputs.core.size();
    let modifier = inputs.regs.instr.instr.modifier;
    let mut new_dst = inputs.regs.dst;
    match modifier {
        Modifier::A | Modifier::BA => {
            new_dst.a_field = offset(new_dst.a_field, -1, size);
        }
        Modifier::B | Modifier::AB => {
            new_dst.b_field = offset(new_dst.b_field, -1, size);
        }
        Modifier::F | Modifier::X | Modifier::I => {
            new_dst.a_field = offset(new_dst.a_field, -1, size);
            new_dst.b_field = offset(new_dst.b_field, -1, size);
        }
    }
    inputs.core.write(inputs.regs.b_ptr, new_dst, inputs.state);

    if projected_zero(modifier, new_dst) {
        inputs.state.push_pc(inputs.regs.next_pc);
    } else {
        inputs.state.push_pc(inputs.regs.a_ptr);
    }
}

/// Implementation of the [`Opcode::Spl`] instruction.
///
/// The split target is queued first, admitted only while the queue leaves
/// room under the process cap; the next instruction is always queued after
/// it.  The split counts as a spawned thread only when it landed.
fn spl_op(inputs: OpInputs) {
    if inputs.state.push_split(inputs.regs.a_ptr) {
        inputs.state.threads_spawned += 1;
    }
    inputs.state.push_pc(inputs.regs.next_pc);
}

/// Implementation of the [`Opcode::Slt`] instruction.  SLT.I and SLT.X
/// behave as SLT.F: field-wise less-than on both fields.
fn slt_op(inputs: OpInputs) {
    let src = inputs.regs.src;
    let dst = inputs.regs.dst;
    let is_less_than = match inputs.regs.instr.instr.modifier {
        Modifier::A => src.a_field < dst.a_field,
        Modifier::B => src.b_field < dst.b_field,
        Modifier::AB => src.a_field < dst.b_field,
        Modifier::BA => src.b_field < dst.a_field,
        Modifier::F | Modifier::X | Modifier::I => {
            src.a_field < dst.a_field && src.b_field < dst.b_field
        }
    };
    push_skip(inputs, is_less_than);
}

/// True when source and destination compare equal under the modifier.
/// Equality under .I requires the opcode, modifier, both modes, and both
/// fields to match.
fn compare_equal(
    modifier: Modifier,
    src: CompleteInstruction,
    dst: CompleteInstruction,
) -> bool {
    match modifier {
        Modifier::A => src.a_field == dst.a_field,
        Modifier::B => src.b_field == dst.b_field,
        Modifier::AB => src.a_field == dst.b_field,
        Modifier::BA => src.b_field == dst.a_field,
        Modifier::F => {
            src.a_field == dst.a_field && src.b_field == dst.b_field
        }
        Modifier::X => {
            src.a_field == dst.b_field && src.b_field == dst.a_field
        }
        Modifier::I => src == dst,
    }
}

/// Implementation of the [`Opcode::Seq`] and [`Opcode::Cmp`] instructions
fn seq_op(inputs: OpInputs) {
    let equal = compare_equal(
        inputs.regs.instr.instr.modifier,
        inputs.regs.src,
        inputs.regs.dst,
    );
    push_skip(inputs, equal);
}

/// Implementation of the [`Opcode::Sne`] instruction
fn sne_op(inputs: OpInputs) {
    let equal = compare_equal(
        inputs.regs.instr.instr.modifier,
        inputs.regs.src,
        inputs.regs.dst,
    );
    push_skip(inputs, !equal);
}

/// Implementation of the [`Opcode::Nop`] instruction
fn nop_op(inputs: OpInputs) {
    inputs.state.push_pc(inputs.regs.next_pc);
}

/// Queue `pc + 2` when the skip condition held, `pc + 1` otherwise
fn push_skip(inputs: OpInputs, skip: bool) {
    let amount = if skip { 2 } else { 1 };
    let target = offset(inputs.regs.pc, amount, inputs.core.size());
    inputs.state.push_pc(target);
}
