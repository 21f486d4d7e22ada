use oracle_protocol::{Colour, IDCODE, Link, Piece, Square};

use crate::{
    enumerate::{Attack, DEFAULT_LIMIT, Enumerator},
    error::Result,
    registers::Registers,
    tap::Tap,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// IDCODE the device must report after reset.
    pub expected_idcode: u32,
    /// Most victims per run, and most aggressors per victim, before a run is
    /// declared overrun.
    pub limit: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            expected_idcode: IDCODE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Builder to open a [Session] with modified configuration options
///
/// # Example
///
/// ```ignore
/// use oracle_client::session::Builder;
///
/// let session = Builder::new()
///     .limit(16)
///     .open(link)?;
/// ```
#[derive(Default)]
pub struct Builder {
    config: Config,
}

impl Builder {
    pub fn new() -> Builder {
        Builder::default()
    }

    /// Accept a different device build.
    pub fn expected_idcode(mut self, idcode: u32) -> Self {
        self.config.expected_idcode = idcode;
        self
    }

    /// Set the enumeration bound.
    pub fn limit(mut self, limit: u32) -> Self {
        self.config.limit = limit;
        self
    }

    /// Bring up the device and return the session
    pub fn open<L: Link>(self, link: L) -> Result<Session<L>> {
        Session::open(link, self.config)
    }
}

/// An identified device, ready for queries.
///
/// The session owns its link, so only one enumeration can run against a
/// device at a time.
pub struct Session<L> {
    registers: Registers<L>,
    config: Config,
}

impl<L: Link> Session<L> {
    /// Resets the TAP and checks the IDCODE. A mismatch is returned as
    /// [`crate::Error::IdMismatch`] and no session is created.
    pub fn open(link: L, config: Config) -> Result<Session<L>> {
        let mut registers = Registers::new(Tap::new(link));
        registers.bring_up(config.expected_idcode)?;
        Ok(Session { registers, config })
    }

    /// Re-synchronises with the device after a fault or an abandoned scan.
    pub fn reset(&mut self) -> Result<()> {
        log::info!("resetting session");
        self.registers.bring_up(self.config.expected_idcode)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registers(&mut self) -> &mut Registers<L> {
        &mut self.registers
    }

    pub fn link(&mut self) -> &mut L {
        self.registers.tap().link_mut()
    }

    pub fn into_link(self) -> L {
        self.registers.into_inner().into_inner()
    }

    pub fn set_piece(&mut self, square: Square, piece: Option<Piece>) -> Result<()> {
        self.registers.set_piece(square, piece)
    }

    pub fn set_side_to_move(&mut self, colour: Colour) -> Result<()> {
        self.registers.set_side_to_move(colour)
    }

    /// A lazy run over every attack the device reports right now.
    pub fn attacks(&mut self) -> Enumerator<'_, L> {
        Enumerator::with_limit(&mut self.registers, self.config.limit)
    }

    /// Runs a full enumeration and returns the victim of every attack,
    /// repeated once per aggressor.
    pub fn enumerate(&mut self) -> Result<Vec<Square>> {
        let victims = self.attacks().victim_squares()?;
        log::info!("enumerated {} attacks", victims.len());
        Ok(victims)
    }

    /// Runs a full enumeration and returns every attack.
    pub fn attack_list(&mut self) -> Result<Vec<Attack>> {
        self.attacks().collect()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Error;
    use oracle_protocol::PieceKind;
    use oracle_sim::SimLink;

    #[test]
    fn reset_is_idempotent() {
        let mut session = Session::open(SimLink::new(), Config::default()).unwrap();
        session.registers().tap().reset_to_idle().unwrap();
        session.registers().tap().reset_to_idle().unwrap();
        assert_eq!(session.registers().idcode().unwrap(), IDCODE);
        session.reset().unwrap();
        assert_eq!(session.registers().idcode().unwrap(), IDCODE);
    }

    #[test]
    fn builder_rejects_other_builds() {
        match Builder::new().expected_idcode(0x1234_5678).open(SimLink::new()) {
            Err(Error::IdMismatch { got, .. }) => assert_eq!(got, IDCODE),
            Err(other) => panic!("expected IdMismatch, got {}", other),
            Ok(_) => panic!("session opened against the wrong IDCODE"),
        }
    }

    #[test]
    fn enumerate_then_recover() {
        let mut session = Builder::new().limit(64).open(SimLink::new()).unwrap();
        let bishop = Piece::new(PieceKind::Bishop, Colour::Black);
        let h8: Square = "h8".parse().unwrap();
        session.set_piece(h8, Some(bishop)).unwrap();
        session.set_side_to_move(Colour::Black).unwrap();
        assert_eq!(session.enumerate().unwrap().len(), 7);

        // Enumeration leaves the board intact, so a second run agrees.
        let attacks = session.attack_list().unwrap();
        assert_eq!(attacks.len(), 7);
        assert!(attacks.iter().all(|attack| attack.aggressor == h8));
        assert!(session.link().cycles() > 0);
    }
}
