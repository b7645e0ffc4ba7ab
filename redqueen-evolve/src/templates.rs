//! The classic warriors every CoreWar treatment starts from.  They seed the
//! champion history and stand in whenever generation fails.

use rand::{seq::SliceRandom, Rng};
use redcode::RelaxedWarrior;
use redcode_parser::parse_warrior;

/// The simplest possible warrior: copies itself one cell forward, forever
pub const IMP: &str = ";redcode-94
;name Imp
;author A.K. Dewdney
;strategy The simplest warrior - copies itself forward

MOV.I 0, 1
";

/// Dewdney's bomber: drops a DAT on every fourth cell
pub const DWARF: &str = ";redcode-94
;name Dwarf
;author A.K. Dewdney
;strategy Bombs memory at regular intervals

ADD.AB #4, 3
MOV.I  2, @2
JMP    -2
DAT    #0, #0
";

/// Chip Wendell's self-replicating bomber
pub const MICE: &str = ";redcode-94
;name Mice
;author Chip Wendell
;strategy Self-replicating bomber

SPL    0, 0        ; spawn thread
MOV.I  12, <15     ; copy backwards
DJN    -1, -3      ; loop
SPL    @14, 0      ; spawn at target
ADD.AB #653, 13    ; next target
JMZ    -5, -7      ; check if done
MOV.I  10, <11     ; clear behind
DJN    -1, -3      ; loop
SPL    2, 0        ; new generation
JMP    -9, 0       ; restart
DAT    #0, #833    ; bomb
DAT    #0, #0      ; pointer
DAT    #0, #0      ; counter
DAT    #0, #0      ; target
DAT    #0, #0      ; scratch
";

/// A label-free scan-then-bomb loop
pub const SCANNER: &str = ";redcode-94
;name Scanner
;author Unknown
;strategy Scans for enemies then bombs them

ADD.AB 9, 10       ; advance the scan pointer
MOV.I  @9, 10      ; sample the probed cell
SNE.I  9, 10       ; anything there?
JMP    -3          ; no, keep scanning
SUB.AB #5, 6       ; back the pointer up
MOV.I  4, @5       ; bomb
ADD.AB #1, 4       ; walk forward
DJN    -2, 6       ; a few times
JMP    -8          ; resume scanning
DAT    #0, #0      ; bomb
DAT    #0, #15     ; pointer
DAT    #0, #0      ; sample
DAT    #0, #0      ; emptiness reference
DAT    #0, #5      ; bombing run counter
";

/// Every template source, in a stable order
pub const ALL: [&str; 4] = [IMP, DWARF, MICE, SCANNER];

/// The parsed imp
#[must_use]
pub fn imp() -> RelaxedWarrior {
    parse_warrior(IMP)
}

/// The parsed dwarf
#[must_use]
pub fn dwarf() -> RelaxedWarrior {
    parse_warrior(DWARF)
}

/// All templates, parsed
#[must_use]
pub fn classics() -> Vec<RelaxedWarrior> {
    ALL.iter().map(|source| parse_warrior(source)).collect()
}

/// One template, parsed, chosen uniformly
pub fn random_classic<R: Rng>(rng: &mut R) -> RelaxedWarrior {
    let source = ALL.choose(rng).copied().unwrap_or(IMP);
    parse_warrior(source)
}

#[cfg(test)]
mod tests {
    use coverage_helper::test;

    use super::{classics, dwarf, imp};

    #[test]
    fn every_template_parses_completely() {
        let parsed = classics();
        assert_eq!(parsed.len(), 4);
        let lengths: Vec<usize> = parsed.iter().map(|w| w.len()).collect();
        assert_eq!(lengths, vec![1, 4, 15, 14]);
    }

    #[test]
    fn seed_warriors_have_names() {
        assert_eq!(imp().name, "Imp");
        assert_eq!(dwarf().name, "Dwarf");
        assert_eq!(imp().len(), 1);
    }
}
