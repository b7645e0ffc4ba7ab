use redcode::AddrMode;

use crate::{core_memory::offset, Core, CoreAddr, WarriorState};

/// The outcome of evaluating one operand: where a write aimed at this
/// operand lands, and the scalar the operation uses when it needs a
/// magnitude rather than a cell (chiefly immediate operands).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Resolved {
    /// Core index a write through this operand targets
    pub ptr: CoreAddr,
    /// Scalar value of the operand
    pub value: CoreAddr,
}

/// Evaluate one operand of the instruction at `pc`.
///
/// Predecrement modes decrement the pointed-to field and write it back
/// before the pointer is derived; postincrement modes derive the pointer
/// and value first, then increment and write back.  Both write-backs go
/// through the tracked write path, so they show up in ownership tags and in
/// the executing warrior's counters.  Because of those side effects, source
/// and destination cells must be re-read after *both* operands have been
/// evaluated.
pub fn resolve(
    core: &mut Core,
    writer: &mut WarriorState,
    pc: CoreAddr,
    mode: AddrMode,
    field: CoreAddr,
) -> Resolved {
    let size = core.size();
    // Index reached by following the field from pc: the direct target, and
    // the site of any indirection or side effect
    let primary = offset(pc, i64::from(field), size);

    match mode {
        AddrMode::Immediate => Resolved {
            ptr: pc,
            value: field,
        },
        AddrMode::Direct => Resolved {
            ptr: primary,
            value: field,
        },
        AddrMode::IndirectA => {
            let target = core.read(primary);
            Resolved {
                ptr: offset(primary, i64::from(target.a_field), size),
                value: target.a_field,
            }
        }
        AddrMode::IndirectB => {
            let target = core.read(primary);
            Resolved {
                ptr: offset(primary, i64::from(target.b_field), size),
                value: target.b_field,
            }
        }
        AddrMode::PredecA => {
            let mut target = core.read(primary);
            target.a_field = offset(target.a_field, -1, size);
            core.write(primary, target, writer);
            Resolved {
                ptr: offset(primary, i64::from(target.a_field), size),
                value: target.a_field,
            }
        }
        AddrMode::PredecB => {
            let mut target = core.read(primary);
            target.b_field = offset(target.b_field, -1, size);
            core.write(primary, target, writer);
            Resolved {
                ptr: offset(primary, i64::from(target.b_field), size),
                value: target.b_field,
            }
        }
        AddrMode::PostincA => {
            let mut target = core.read(primary);
            let resolved = Resolved {
                ptr: offset(primary, i64::from(target.a_field), size),
                value: target.a_field,
            };
            target.a_field = offset(target.a_field, 1, size);
            core.write(primary, target, writer);
            resolved
        }
        AddrMode::PostincB => {
            let mut target = core.read(primary);
            let resolved = Resolved {
                ptr: offset(primary, i64::from(target.b_field), size),
                value: target.b_field,
            };
            target.b_field = offset(target.b_field, 1, size);
            core.write(primary, target, writer);
            resolved
        }
    }
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;
    use redcode::{AddrMode, CompleteInstruction, Instruction};

    use super::resolve;
    use crate::{Core, WarriorState};

    /// A DAT cell with the given fields
    fn dat(a_field: u32, b_field: u32) -> CompleteInstruction {
        CompleteInstruction {
            instr: Instruction::default(),
            a_field,
            b_field,
        }
    }

    #[test]
    fn immediate_points_at_pc() {
        let mut core = Core::new(8);
        let mut state = WarriorState::new(0, "w", 8);
        let r = resolve(&mut core, &mut state, 3, AddrMode::Immediate, 5);
        assert_eq!(r.ptr, 3);
        assert_eq!(r.value, 5);
        assert_eq!(state.memory_writes, 0);
    }

    #[test]
    fn direct_offsets_from_pc() {
        let mut core = Core::new(8);
        let mut state = WarriorState::new(0, "w", 8);
        let r = resolve(&mut core, &mut state, 6, AddrMode::Direct, 5);
        assert_eq!(r.ptr, 3);
        assert_eq!(r.value, 5);
    }

    #[test]
    fn b_indirect_follows_target_field() {
        let mut core = Core::new(8);
        let mut state = WarriorState::new(0, "w", 8);
        core.place(2, dat(0, 3), 0);
        let r = resolve(&mut core, &mut state, 0, AddrMode::IndirectB, 2);
        assert_eq!(r.ptr, 5);
        assert_eq!(r.value, 3);
    }

    #[test]
    fn predecrement_writes_before_deriving_pointer() {
        let mut core = Core::new(8);
        let mut state = WarriorState::new(0, "w", 8);
        core.place(2, dat(0, 3), 0);
        let r = resolve(&mut core, &mut state, 0, AddrMode::PredecB, 2);
        // field decremented to 2 before the pointer is derived
        assert_eq!(core.read(2).b_field, 2);
        assert_eq!(r.ptr, 4);
        assert_eq!(r.value, 2);
        assert_eq!(state.memory_writes, 1);
        assert_eq!(core.owner(2), Some(0));
    }

    #[test]
    fn predecrement_wraps_zero_to_core_size_minus_one() {
        let mut core = Core::new(8);
        let mut state = WarriorState::new(0, "w", 8);
        let r = resolve(&mut core, &mut state, 0, AddrMode::PredecA, 1);
        assert_eq!(core.read(1).a_field, 7);
        assert_eq!(r.value, 7);
        assert_eq!(r.ptr, 0);
    }

    #[test]
    fn postincrement_snapshots_before_writing() {
        let mut core = Core::new(8);
        let mut state = WarriorState::new(0, "w", 8);
        core.place(1, dat(0, 0), 0);
        let r = resolve(&mut core, &mut state, 0, AddrMode::PostincA, 1);
        // pointer and value use the pre-increment field
        assert_eq!(r.ptr, 1);
        assert_eq!(r.value, 0);
        // the increment is visible in the core afterwards
        assert_eq!(core.read(1).a_field, 1);
        assert_eq!(state.memory_writes, 1);
    }
}
