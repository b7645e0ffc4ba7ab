use redcode::CompleteInstruction;

use crate::{CoreAddr, WarriorId, WarriorState};

/// Evaluate `base + delta` with the modulo-coresize arithmetic every core
/// address goes through.  Works for negative deltas.
#[must_use]
pub fn offset(base: CoreAddr, delta: i64, size: CoreAddr) -> CoreAddr {
    if size == 0 {
        return 0;
    }
    let sum = i64::from(base).wrapping_add(delta);
    let normalized = sum.rem_euclid(i64::from(size));
    CoreAddr::try_from(normalized).unwrap_or_default()
}

/// The circular instruction memory.
///
/// Every cell additionally carries an ownership tag recording the last
/// warrior to write it, which is how battle visualizations and the coverage
/// scenarios observe who controls which region of the core.
pub struct Core {
    /// Number of cells.  All reads and writes are normalized to this.
    size: CoreAddr,
    /// Instruction and field values currently stored in the core
    cells: Vec<CompleteInstruction>,
    /// Last writer per cell, `None` for untouched cells
    owner: Vec<Option<WarriorId>>,
}

impl Core {
    /// A core of `size` default cells (`DAT.F $0, $0`), all unowned
    #[must_use]
    pub fn new(size: CoreAddr) -> Self {
        let len = usize::try_from(size).unwrap_or_default();
        Self {
            size,
            cells: vec![CompleteInstruction::default(); len],
            owner: vec![None; len],
        }
    }

    /// Number of cells in the core
    #[must_use]
    pub const fn size(&self) -> CoreAddr {
        self.size
    }

    /// Fold an address into `[0, size)`
    #[must_use]
    pub fn normalize(&self, addr: CoreAddr) -> CoreAddr {
        if addr < self.size {
            addr
        } else {
            offset(addr, 0, self.size)
        }
    }

    /// Read the instruction at an address, normalizing first
    #[must_use]
    pub fn read(&self, addr: CoreAddr) -> CompleteInstruction {
        let idx = usize::try_from(self.normalize(addr)).unwrap_or_default();
        self.cells.get(idx).copied().unwrap_or_default()
    }

    /// The last warrior to write an address, if any
    #[must_use]
    pub fn owner(&self, addr: CoreAddr) -> Option<WarriorId> {
        let idx = usize::try_from(self.normalize(addr)).unwrap_or_default();
        self.owner.get(idx).copied().flatten()
    }

    /// Replace the cell at an address on behalf of an executing warrior.
    ///
    /// Updates the ownership tag and the writer's behavioral counters.  The
    /// intrinsic writes of predecrement and postincrement operand modes come
    /// through here too, so they are observable exactly like opcode writes.
    pub fn write(
        &mut self,
        addr: CoreAddr,
        instr: CompleteInstruction,
        writer: &mut WarriorState,
    ) {
        let normalized = self.normalize(addr);
        self.place(normalized, instr, writer.id);
        writer.note_write(normalized);
    }

    /// Replace the cell at an address without touching behavioral counters.
    /// Used by the loader, which tags ownership but does not count loads as
    /// battle writes.
    pub fn place(
        &mut self,
        addr: CoreAddr,
        instr: CompleteInstruction,
        owner: WarriorId,
    ) {
        let idx = usize::try_from(self.normalize(addr)).unwrap_or_default();
        if let Some(cell) = self.cells.get_mut(idx) {
            *cell = instr;
        }
        if let Some(tag) = self.owner.get_mut(idx) {
            *tag = Some(owner);
        }
    }
}
