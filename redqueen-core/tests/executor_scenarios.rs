//! End-to-end executor scenarios on small cores: the classic behaviors
//! every CoreWar machine must reproduce exactly.

use redcode::Opcode;
use redcode_parser::parse_warrior;
use redqueen_core::{Mars, MarsConfig};

/// An 8-cell core with a generous cycle budget
fn tiny_config() -> MarsConfig {
    MarsConfig {
        core_size: 8,
        max_cycles: 64,
        max_processes: 8000,
        max_length: 8,
        min_distance: 1,
    }
}

#[test]
fn imp_marches_through_an_empty_core() {
    let mut mars = Mars::new(tiny_config()).unwrap();
    let imp = parse_warrior(";name Imp\nMOV.I $0, $1").normalize(8);
    mars.load(&imp, 0).unwrap();

    for _ in 0..10 {
        assert!(mars.step());
    }

    // After at least eight cycles the imp has rolled over the whole core
    for addr in 0..8 {
        assert_eq!(
            mars.core().owner(addr),
            Some(0),
            "cell {addr} should belong to the imp"
        );
        assert_eq!(mars.core().read(addr).instr.opcode, Opcode::Mov);
    }
    let state = mars.warrior(0).unwrap();
    assert!(state.memory_writes >= 8);
    assert_eq!(state.instructions_executed, 10);
    assert!(state.alive);
}

#[test]
fn dat_kills_the_process_on_its_first_cycle() {
    let mut mars = Mars::new(tiny_config()).unwrap();
    let suicide = parse_warrior("DAT.F #0, #0").normalize(8);
    mars.load(&suicide, 0).unwrap();

    assert!(mars.step());
    let state = mars.warrior(0).unwrap();
    assert!(!state.alive);
    assert!(state.queue.is_empty());
    assert_eq!(state.instructions_executed, 1);
    assert!(!mars.step());
}

#[test]
fn div_by_zero_kills_without_writing() {
    let mut mars = Mars::new(tiny_config()).unwrap();
    let warrior =
        parse_warrior("DIV.AB #0, $1\nDAT.F #0, #0").normalize(8);
    mars.load(&warrior, 0).unwrap();
    let untouched = mars.core().read(1);

    assert!(mars.step());
    let state = mars.warrior(0).unwrap();
    assert!(!state.alive);
    // the destination cell was not modified, not even partially
    assert_eq!(mars.core().read(1), untouched);
    assert_eq!(state.memory_writes, 0);
}

#[test]
fn mod_by_zero_in_one_field_kills_without_writing() {
    // MOD.F reads both source fields; a single zero divisor is fatal
    let mut mars = Mars::new(tiny_config()).unwrap();
    let warrior =
        parse_warrior("MOD.F $1, $2\nDAT #3, #0\nDAT #5, #7").normalize(8);
    mars.load(&warrior, 0).unwrap();
    let untouched = mars.core().read(2);

    assert!(mars.step());
    assert!(!mars.warrior(0).unwrap().alive);
    assert_eq!(mars.core().read(2), untouched);
}

#[test]
fn spl_at_the_cap_refuses_the_second_split() {
    let config = MarsConfig {
        max_processes: 2,
        ..tiny_config()
    };
    let mut mars = Mars::new(config).unwrap();
    let splitter = parse_warrior("SPL $0, $0").normalize(8);
    mars.load(&splitter, 0).unwrap();

    // first cycle: the split target lands, then the next instruction
    assert!(mars.step());
    let state = mars.warrior(0).unwrap();
    assert_eq!(state.queue, [0, 1]);
    assert_eq!(state.threads_spawned, 1);

    // second cycle re-executes the SPL at the front of the queue; at the
    // cap only the next instruction is queued, not the split target
    assert!(mars.step());
    let state = mars.warrior(0).unwrap();
    assert_eq!(state.queue.len(), 2);
    assert_eq!(state.queue, [1, 1]);
    assert_eq!(state.threads_spawned, 1);
    assert!(state.alive);
}

#[test]
fn spl_queues_the_split_target_before_the_next_instruction() {
    let mut mars = Mars::new(tiny_config()).unwrap();
    let splitter =
        parse_warrior("SPL $2, $0\nDAT #0, #0\nJMP $0, $0").normalize(8);
    mars.load(&splitter, 0).unwrap();

    assert!(mars.step());
    let state = mars.warrior(0).unwrap();
    assert_eq!(state.queue, [2, 1]);
    assert_eq!(state.threads_spawned, 1);

    // the split target sits at the front, so it executes on the second
    // cycle: the JMP at cell 2 re-queues itself behind the other process
    assert!(mars.step());
    let state = mars.warrior(0).unwrap();
    assert_eq!(state.queue, [1, 2]);
    assert_eq!(state.threads_spawned, 1);
}

#[test]
fn process_count_never_exceeds_the_cap() {
    let config = MarsConfig {
        max_processes: 5,
        ..tiny_config()
    };
    let mut mars = Mars::new(config).unwrap();
    // a pure SPL loop grows the queue as fast as anything can
    let storm =
        parse_warrior("SPL $0, $0\nJMP $-1, $0").normalize(8);
    mars.load(&storm, 0).unwrap();

    for _ in 0..40 {
        if !mars.step() {
            break;
        }
        assert!(mars.warrior(0).unwrap().queue.len() <= 5);
    }
}

#[test]
fn postincrement_is_observable_in_memory_and_metrics() {
    let mut mars = Mars::new(tiny_config()).unwrap();
    let warrior = parse_warrior("MOV.I }1, $2\nDAT.F #0, #0").normalize(8);
    mars.load(&warrior, 0).unwrap();

    assert!(mars.step());

    // the pointer cell's A-field was incremented and the write is tracked
    let pointer_cell = mars.core().read(1);
    assert_eq!(pointer_cell.a_field, 1);
    assert_eq!(pointer_cell.b_field, 0);
    assert_eq!(mars.core().owner(1), Some(0));
    let state = mars.warrior(0).unwrap();
    // one write from the increment, one from the MOV itself
    assert_eq!(state.memory_writes, 2);

    // the source snapshot is read after operand evaluation, so the copy at
    // the destination carries the incremented field
    assert_eq!(mars.core().read(2).a_field, 1);
    assert_eq!(mars.core().read(2).instr.opcode, Opcode::Dat);
}

#[test]
fn predecrement_bombs_backwards() {
    // MOV.I $0, <2 writes a copy through a decremented pointer and the
    // decrement itself lands in the pointer cell
    let mut mars = Mars::new(tiny_config()).unwrap();
    let warrior = parse_warrior("MOV.I $0, <2\nDAT #0, #0\nDAT #0, #0")
        .normalize(8);
    mars.load(&warrior, 0).unwrap();

    assert!(mars.step());
    // pointer cell at 2: B-field decremented from 0 to 7
    assert_eq!(mars.core().read(2).b_field, 7);
    // destination is (2 + 7) mod 8 = 1: a copy of the MOV itself
    assert_eq!(mars.core().read(1).instr.opcode, Opcode::Mov);
}

#[test]
fn skip_instructions_jump_over_one_cell() {
    let mut mars = Mars::new(tiny_config()).unwrap();
    // SEQ comparing two equal DATs skips the suicide cell
    let warrior = parse_warrior(
        "SEQ.I $2, $3\nDAT #0, #0\nNOP $0, $0\nNOP $0, $0\nJMP $0, $0",
    )
    .normalize(8);
    mars.load(&warrior, 0).unwrap();

    assert!(mars.step());
    let state = mars.warrior(0).unwrap();
    assert_eq!(state.queue, [2]);
    assert!(state.alive);
}

#[test]
fn djn_decrements_then_jumps_until_zero() {
    let mut mars = Mars::new(tiny_config()).unwrap();
    // count down the B-field at cell 2 from 2
    let warrior =
        parse_warrior("DJN $0, $2\nDAT #0, #0\nDAT #0, #2").normalize(8);
    mars.load(&warrior, 0).unwrap();

    // first execution: counter 2 -> 1, jump back to self
    assert!(mars.step());
    assert_eq!(mars.core().read(2).b_field, 1);
    assert_eq!(mars.warrior(0).unwrap().queue, [0]);

    // second execution: counter 1 -> 0, fall through to the DAT
    assert!(mars.step());
    assert_eq!(mars.core().read(2).b_field, 0);
    assert_eq!(mars.warrior(0).unwrap().queue, [1]);
}
