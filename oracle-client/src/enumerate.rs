//! Exhaustive victim/aggressor enumeration.
//!
//! The device only ever reports one square per query. Every result is masked
//! off immediately after it is reported, so the next query yields a new one,
//! until the exhausted sentinel comes back:
//!
//! ```text
//! mask EnableAll, NoChange
//! loop:
//!     state FindVictim; status          -> victim, or done
//!     loop:
//!         first = victim
//!         state FindAggressor; status   -> aggressor, or break
//!         yield (victim, aggressor)
//!         first = aggressor
//!         mask DisableAggressor, NoChange
//!     mask DisableVictim
//! ```
use std::iter::FusedIterator;

use oracle_protocol::{Link, MaskMode, NUM_SQUARES, Square, StateMode, Status};

use crate::{
    error::{Error, Loop, Result},
    registers::Registers,
};

/// Upper bound on victims per run and aggressors per victim.
pub const DEFAULT_LIMIT: u32 = NUM_SQUARES as u32;

/// One attack reported by the device.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Attack {
    pub victim: Square,
    pub aggressor: Square,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Phase {
    Arm,
    FindVictim,
    FindAggressor { victim: Square, found: u32 },
    Done,
}

/// Lazily walks every attack the device currently reports.
///
/// The iterator is finite and cannot be restarted; create a new one for a new
/// run. It yields `Err` at most once and is fused afterwards.
pub struct Enumerator<'a, L> {
    registers: &'a mut Registers<L>,
    phase: Phase,
    victims: u32,
    limit: u32,
}

impl<'a, L: Link> Enumerator<'a, L> {
    pub fn new(registers: &'a mut Registers<L>) -> Enumerator<'a, L> {
        Enumerator::with_limit(registers, DEFAULT_LIMIT)
    }

    pub fn with_limit(registers: &'a mut Registers<L>, limit: u32) -> Enumerator<'a, L> {
        Enumerator {
            registers,
            phase: Phase::Arm,
            victims: 0,
            limit,
        }
    }

    /// Victims discovered so far in this run.
    pub fn victims(&self) -> u32 {
        self.victims
    }

    /// Collects the victim of every attack, one entry per aggressor.
    pub fn victim_squares(self) -> Result<Vec<Square>> {
        self.map(|attack| attack.map(|attack| attack.victim)).collect()
    }

    fn arm(&mut self) -> Result<()> {
        self.registers.set_mask_mode(MaskMode::EnableAll)?;
        self.registers.set_mask_mode(MaskMode::NoChange)
    }

    fn query(&mut self, mode: StateMode) -> Result<Option<Square>> {
        self.registers.set_state_mode(mode)?;
        match self.registers.status()? {
            Status::Found(square) => Ok(Some(square)),
            Status::Exhausted => Ok(None),
            Status::Fault(status) => {
                log::error!("device fault during {:?}: status {:#04x}", mode, status);
                Err(Error::DeviceFault { status })
            }
        }
    }

    fn retire_aggressor(&mut self, aggressor: Square) -> Result<()> {
        self.registers.set_first_square(aggressor)?;
        self.registers.set_mask_mode(MaskMode::DisableAggressor)?;
        self.registers.set_mask_mode(MaskMode::NoChange)
    }

    /// Advances the state machine until an attack is found or the run ends.
    fn step(&mut self) -> Result<Option<Attack>> {
        loop {
            match self.phase {
                Phase::Arm => {
                    self.arm()?;
                    self.phase = Phase::FindVictim;
                }
                Phase::FindVictim => {
                    let Some(victim) = self.query(StateMode::FindVictim)? else {
                        log::debug!("no victims left after {}", self.victims);
                        self.phase = Phase::Done;
                        return Ok(None);
                    };
                    self.victims += 1;
                    if self.victims > self.limit {
                        return Err(Error::Overrun {
                            which: Loop::Victims,
                            limit: self.limit,
                        });
                    }
                    log::debug!("victim {}", victim);
                    self.phase = Phase::FindAggressor { victim, found: 0 };
                }
                Phase::FindAggressor { victim, found } => {
                    self.registers.set_first_square(victim)?;
                    let Some(aggressor) = self.query(StateMode::FindAggressor)? else {
                        // First selector still holds the victim.
                        self.registers.set_mask_mode(MaskMode::DisableVictim)?;
                        self.phase = Phase::FindVictim;
                        continue;
                    };
                    if found + 1 > self.limit {
                        return Err(Error::Overrun {
                            which: Loop::Aggressors,
                            limit: self.limit,
                        });
                    }
                    log::debug!("  aggressor {}", aggressor);
                    self.retire_aggressor(aggressor)?;
                    self.phase = Phase::FindAggressor {
                        victim,
                        found: found + 1,
                    };
                    return Ok(Some(Attack { victim, aggressor }));
                }
                Phase::Done => return Ok(None),
            }
        }
    }
}

impl<L: Link> Iterator for Enumerator<'_, L> {
    type Item = Result<Attack>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.step() {
            Ok(attack) => attack.map(Ok),
            Err(e) => {
                self.phase = Phase::Done;
                Some(Err(e))
            }
        }
    }
}

impl<L: Link> FusedIterator for Enumerator<'_, L> {}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;
    use crate::tap::Tap;
    use oracle_protocol::{Colour, Command, Piece, PieceKind, codec::Scan};
    use oracle_sim::SimLink;

    fn square(name: &str) -> Square {
        name.parse().unwrap()
    }

    fn registers() -> Registers<SimLink> {
        let mut registers = Registers::new(Tap::new(SimLink::new()));
        registers.bring_up_default().unwrap();
        registers
    }

    #[test]
    fn empty_board_has_no_attacks() {
        let mut registers = registers();
        let attacks: Vec<_> = Enumerator::new(&mut registers).collect();
        assert!(attacks.is_empty());
    }

    #[test]
    fn king_in_centre() {
        let mut registers = registers();
        let king = Piece::new(PieceKind::King, Colour::White);
        registers.set_piece(square("d4"), Some(king)).unwrap();
        registers.set_side_to_move(Colour::White).unwrap();

        let mut victims = Enumerator::new(&mut registers).victim_squares().unwrap();
        victims.sort();
        let mut expected: Vec<Square> = ["c3", "d3", "e3", "c4", "e4", "c5", "d5", "e5"]
            .into_iter()
            .map(square)
            .collect();
        expected.sort();
        assert_eq!(victims, expected);
    }

    #[test]
    fn shared_victim_is_reported_once_per_aggressor() {
        let mut registers = registers();
        registers
            .set_piece(square("a1"), Some("R".parse().unwrap()))
            .unwrap();
        registers
            .set_piece(square("h8"), Some("R".parse().unwrap()))
            .unwrap();
        registers
            .set_piece(square("a8"), Some("q".parse().unwrap()))
            .unwrap();
        registers.set_side_to_move(Colour::White).unwrap();

        let attacks: Vec<Attack> = Enumerator::new(&mut registers)
            .collect::<Result<_>>()
            .unwrap();
        let on_queen: HashSet<Square> = attacks
            .iter()
            .filter(|attack| attack.victim == square("a8"))
            .map(|attack| attack.aggressor)
            .collect();
        assert_eq!(on_queen, HashSet::from([square("a1"), square("h8")]));

        let unique: HashSet<Attack> = attacks.iter().copied().collect();
        assert_eq!(unique.len(), attacks.len());
        // The queen is the most valuable victim and comes first.
        assert_eq!(attacks[0].victim, square("a8"));
    }

    #[test]
    fn side_to_move_selects_aggressors() {
        let mut registers = registers();
        registers
            .set_piece(square("a1"), Some("N".parse().unwrap()))
            .unwrap();
        registers
            .set_piece(square("h8"), Some("n".parse().unwrap()))
            .unwrap();
        registers.set_side_to_move(Colour::Black).unwrap();
        let attacks: Vec<Attack> = Enumerator::new(&mut registers)
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(attacks.len(), 2);
        assert!(attacks.iter().all(|attack| attack.aggressor == square("h8")));
    }

    #[test]
    fn fault_bit_aborts_the_run() {
        let mut registers = registers();
        registers
            .set_piece(square("e4"), Some("Q".parse().unwrap()))
            .unwrap();
        registers
            .tap()
            .link_mut()
            .device_mut()
            .force_status(StateMode::FindAggressor, Some(0x80));

        let mut enumerator = Enumerator::new(&mut registers);
        match enumerator.next() {
            Some(Err(Error::DeviceFault { status })) => assert_eq!(status, 0x80),
            other => panic!("expected DeviceFault, got {:?}", other),
        }
        assert!(enumerator.next().is_none());
    }

    /// Passes scans through to the model, but blanks the data written after
    /// every first-selector instruction, leaving the selector invalid.
    struct LosesSelection {
        sim: SimLink,
        blank_next: bool,
    }

    impl Link for LosesSelection {
        fn pulse(&mut self, tms: bool, tdi: bool) -> std::io::Result<bool> {
            self.sim.pulse(tms, tdi)
        }

        fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> std::io::Result<Box<[u8]>> {
            let select = Scan::instruction(Command::SetFirstSquare.opcode());
            let selects = num_bits == select.num_bits() && tdi == select.tdi();
            let blank = std::mem::replace(&mut self.blank_next, selects);
            if blank {
                return self.sim.shift(num_bits, tms, &vec![0; tdi.len()]);
            }
            self.sim.shift(num_bits, tms, tdi)
        }
    }

    #[test]
    fn find_aggressor_without_selection_aborts_the_run() {
        let mut setup = registers();
        setup.set_piece(square("d4"), Some("K".parse().unwrap())).unwrap();
        let sim = setup.into_inner().into_inner();

        let mut registers = Registers::new(Tap::new(LosesSelection {
            sim,
            blank_next: false,
        }));

        let mut enumerator = Enumerator::new(&mut registers);
        match enumerator.next() {
            Some(Err(Error::DeviceFault { status })) => assert_eq!(status, Status::FAULT),
            other => panic!("expected DeviceFault, got {:?}", other),
        }
        assert!(enumerator.next().is_none());
    }

    #[test]
    fn fault_wins_over_exhausted() {
        let mut registers = registers();
        registers
            .tap()
            .link_mut()
            .device_mut()
            .force_status(StateMode::FindVictim, Some(0xC0));
        let result: Result<Vec<Attack>> = Enumerator::new(&mut registers).collect();
        assert!(matches!(result, Err(Error::DeviceFault { status: 0xC0 })));
    }

    #[test]
    fn aggressor_that_never_retires_overruns() {
        let mut registers = registers();
        registers
            .set_piece(square("a1"), Some("N".parse().unwrap()))
            .unwrap();
        registers
            .tap()
            .link_mut()
            .device_mut()
            .force_status(StateMode::FindAggressor, Some(5));

        let attacks: Vec<Result<Attack>> = Enumerator::new(&mut registers).collect();
        assert_eq!(attacks.len(), DEFAULT_LIMIT as usize + 1);
        assert!(attacks[..DEFAULT_LIMIT as usize].iter().all(|a| a.is_ok()));
        assert!(matches!(
            attacks.last(),
            Some(Err(Error::Overrun {
                which: Loop::Aggressors,
                limit: DEFAULT_LIMIT,
            }))
        ));
    }

    #[test]
    fn victim_that_never_retires_overruns() {
        let mut registers = registers();
        let device = registers.tap().link_mut().device_mut();
        device.force_status(StateMode::FindVictim, Some(9));
        device.force_status(StateMode::FindAggressor, Some(0x40));

        let mut enumerator = Enumerator::with_limit(&mut registers, 3);
        match enumerator.next() {
            Some(Err(Error::Overrun { which, limit })) => {
                assert_eq!(which, Loop::Victims);
                assert_eq!(limit, 3);
            }
            other => panic!("expected Overrun, got {:?}", other),
        }
        assert_eq!(enumerator.victims(), 4);
    }
}
