use redcode::Warrior;

use crate::{
    core_memory::offset,
    operands,
    ops::{self, OpInputs, Registers},
    BehaviorMetrics, Core, CoreAddr, MarsConfig, MarsError, MarsResult,
    WarriorId, WarriorState,
};

/// The battle machine for a single round: one core, the loaded warriors'
/// runtime state, and the cooperative scheduler.
///
/// Warriors execute in registration order, one instruction per turn; a dead
/// warrior keeps its slot and is skipped.  A cycle is one executed
/// instruction.
pub struct Mars {
    /// Active settings applied to this machine
    config: MarsConfig,
    /// Instruction and ownership state
    core: Core,
    /// Runtime state per warrior, indexed by [`WarriorId`]
    warriors: Vec<WarriorState>,
    /// Index of the warrior whose turn is next
    next_turn: usize,
    /// Executed instruction count
    cycle: u64,
}

impl Mars {
    /// Construct an empty machine.
    ///
    /// # Errors
    ///
    /// Returns a [`MarsError::InvalidParam`] for an unusable configuration.
    pub fn new(config: MarsConfig) -> MarsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            core: Core::new(config.core_size),
            warriors: Vec::new(),
            next_turn: 0,
            cycle: 0,
        })
    }

    /// Place a warrior's code contiguously at `position` and queue its
    /// entry point.
    ///
    /// # Errors
    ///
    /// Returns a [`MarsError::InvalidParam`] for an empty warrior or one
    /// longer than the configured `max_length`.
    pub fn load(
        &mut self,
        warrior: &Warrior,
        position: CoreAddr,
    ) -> MarsResult<WarriorId> {
        if warrior.code.is_empty() {
            return Err(MarsError::InvalidParam(
                "cannot load a warrior with no instructions",
            ));
        }
        if warrior.code.len() > self.config.max_length {
            return Err(MarsError::InvalidParam(
                "warrior is longer than the configured max_length",
            ));
        }

        let id = self.warriors.len();
        let size = self.config.core_size;
        for (idx, insn) in warrior.code.iter().enumerate() {
            let addr = offset(position, idx as i64, size);
            self.core.place(addr, *insn, id);
        }

        let mut state =
            WarriorState::new(id, &warrior.name, self.config.max_processes);
        state.push_pc(offset(position, i64::from(warrior.start), size));
        self.warriors.push(state);
        Ok(id)
    }

    /// Execute one instruction for the next living warrior.
    ///
    /// Returns false, executing nothing, once the battle has terminated:
    /// the cycle cap was reached, a battle of two or more warriors is down
    /// to one survivor, or a lone warrior has no processes left.
    pub fn step(&mut self) -> bool {
        if self.cycle >= self.config.max_cycles {
            return false;
        }
        // With a single loaded warrior the machine runs until its queue
        // empties; with several, a sole survivor ends the battle
        let survivor_threshold = usize::from(self.warriors.len() > 1);
        if self.alive_count() <= survivor_threshold {
            return false;
        }

        while !self.warriors[self.next_turn].alive {
            self.next_turn = (self.next_turn + 1) % self.warriors.len();
        }
        let id = self.next_turn;
        self.execute_one(id);
        self.next_turn = (self.next_turn + 1) % self.warriors.len();
        self.cycle += 1;
        true
    }

    /// Run to termination.  Returns the winner when a battle between two or
    /// more warriors ends with exactly one survivor, and `None` for a draw
    /// or a single-warrior run.
    pub fn run(&mut self) -> Option<WarriorId> {
        while self.step() {}
        let mut alive = self.warriors.iter().filter(|w| w.alive);
        match (alive.next(), alive.next()) {
            (Some(survivor), None) if self.warriors.len() > 1 => {
                Some(survivor.id)
            }
            _ => None,
        }
    }

    /// Fetch, resolve both operands (side effects included), snapshot, and
    /// dispatch one instruction for a warrior.
    fn execute_one(&mut self, id: WarriorId) {
        let size = self.config.core_size;
        let core = &mut self.core;
        let Some(state) = self.warriors.get_mut(id) else {
            return;
        };
        let Some(pc) = state.queue.pop_front() else {
            state.alive = false;
            return;
        };

        state.instructions_executed += 1;
        state.memory_accessed.insert(pc);

        let instr = core.read(pc);
        let next_pc = offset(pc, 1, size);

        // A before B; both may write to the core before the opcode runs
        let a = operands::resolve(
            core,
            state,
            pc,
            instr.instr.a_addr_mode,
            instr.a_field,
        );
        let b = operands::resolve(
            core,
            state,
            pc,
            instr.instr.b_addr_mode,
            instr.b_field,
        );

        // Snapshots are taken after both resolutions so the opcode sees the
        // post-side-effect memory state
        let regs = Registers {
            pc,
            next_pc,
            instr,
            a_ptr: a.ptr,
            b_ptr: b.ptr,
            src: core.read(a.ptr),
            dst: core.read(b.ptr),
        };
        ops::execute(OpInputs {
            core: &mut *core,
            state: &mut *state,
            regs: &regs,
        });

        state.alive = !state.queue.is_empty();
    }

    /// Number of warriors with live processes
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.warriors.iter().filter(|w| w.alive).count()
    }

    /// Executed instruction count so far
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// The machine's configuration
    #[must_use]
    pub const fn config(&self) -> &MarsConfig {
        &self.config
    }

    /// Read access to the core for inspection
    #[must_use]
    pub const fn core(&self) -> &Core {
        &self.core
    }

    /// A loaded warrior's runtime state
    #[must_use]
    pub fn warrior(&self, id: WarriorId) -> Option<&WarriorState> {
        self.warriors.get(id)
    }

    /// A loaded warrior's behavioral measurements
    #[must_use]
    pub fn metrics(&self, id: WarriorId) -> Option<BehaviorMetrics> {
        self.warriors
            .get(id)
            .map(|w| w.metrics(self.config.core_size))
    }
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;
    use redcode_parser::parse_warrior;

    use super::Mars;
    use crate::{MarsConfig, MarsError};

    /// A small test machine: 8 cells, generous everything else
    fn tiny_config() -> MarsConfig {
        MarsConfig {
            core_size: 8,
            max_cycles: 64,
            max_processes: 8,
            max_length: 8,
            min_distance: 1,
        }
    }

    #[test]
    fn load_rejects_empty_and_oversized_warriors() {
        let mut mars = Mars::new(tiny_config()).unwrap();
        let empty = parse_warrior("; nothing").normalize(8);
        assert!(matches!(
            mars.load(&empty, 0),
            Err(MarsError::InvalidParam(_))
        ));

        let long = parse_warrior(
            "NOP 0\nNOP 0\nNOP 0\nNOP 0\nNOP 0\nNOP 0\nNOP 0\nNOP 0\nNOP 0",
        )
        .normalize(8);
        assert!(matches!(
            mars.load(&long, 0),
            Err(MarsError::InvalidParam(_))
        ));
    }

    #[test]
    fn load_tags_ownership_and_queues_entry_point() {
        let mut mars = Mars::new(tiny_config()).unwrap();
        let warrior =
            parse_warrior("ORG 1\nDAT #0, #0\nNOP 0, 0").normalize(8);
        let id = mars.load(&warrior, 6).unwrap();
        assert_eq!(id, 0);
        assert_eq!(mars.core().owner(6), Some(0));
        assert_eq!(mars.core().owner(7), Some(0));
        assert_eq!(mars.core().owner(0), None);
        // entry point is position + start, wrapped
        assert_eq!(mars.warrior(0).unwrap().queue.front(), Some(&7));
    }

    #[test]
    fn dead_warrior_keeps_slot_and_is_skipped() {
        let mut mars = Mars::new(tiny_config()).unwrap();
        let suicide = parse_warrior("DAT #0, #0").normalize(8);
        let survivor = parse_warrior("JMP $0, $0").normalize(8);
        let bystander = parse_warrior("NOP $0, $0").normalize(8);
        mars.load(&suicide, 0).unwrap();
        mars.load(&survivor, 3).unwrap();
        mars.load(&bystander, 6).unwrap();

        // First sweep: warrior 0 dies, 1 and 2 execute
        assert!(mars.step());
        assert!(!mars.warrior(0).unwrap().alive);
        assert!(mars.step());
        assert!(mars.step());
        // Second sweep skips the dead slot: warrior 1 executes again
        assert!(mars.step());
        assert_eq!(mars.warrior(1).unwrap().instructions_executed, 2);
        assert_eq!(mars.warrior(0).unwrap().instructions_executed, 1);
    }

    #[test]
    fn lone_warrior_runs_until_queue_empties() {
        let mut mars = Mars::new(tiny_config()).unwrap();
        // NOP twice into the default DAT field
        let warrior = parse_warrior("NOP 0, 0\nNOP 0, 0").normalize(8);
        mars.load(&warrior, 0).unwrap();
        assert_eq!(mars.run(), None);
        // two NOPs then a DAT at cell 2
        assert_eq!(mars.cycle(), 3);
        assert!(!mars.warrior(0).unwrap().alive);
    }

    #[test]
    fn cycle_cap_produces_draw() {
        let config = MarsConfig {
            max_cycles: 10,
            ..tiny_config()
        };
        let mut mars = Mars::new(config).unwrap();
        let spinner = parse_warrior("JMP $0, $0").normalize(8);
        mars.load(&spinner, 0).unwrap();
        mars.load(&spinner, 4).unwrap();
        assert_eq!(mars.run(), None);
        assert_eq!(mars.cycle(), 10);
    }

    #[test]
    fn executed_count_matches_dequeues() {
        let mut mars = Mars::new(tiny_config()).unwrap();
        let warrior = parse_warrior("NOP 0, 0\nNOP 0, 0").normalize(8);
        mars.load(&warrior, 0).unwrap();
        while mars.step() {}
        let state = mars.warrior(0).unwrap();
        assert!(!state.alive);
        assert_eq!(state.instructions_executed, mars.cycle());
    }
}
