use std::{fmt::Debug, io};

use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin, PinState},
};
use oracle_protocol::Link;

/// Bit-banged TAP on four GPIO lines.
///
/// TMS and TDI change while TCK is low and TDO is sampled while TCK is
/// high. The clock idles low between pulses.
pub struct PinLink<Clk, Tms, Tdi, Tdo, Delay> {
    half_period: u32,
    delay: Delay,
    clock: Clk,
    tms: Tms,
    tdi: Tdi,
    tdo: Tdo,
}

fn pin_error(err: impl Debug) -> io::Error {
    io::Error::other(format!("GPIO error: {:?}", err))
}

impl<Clk, Tms, Tdi, Tdo, Delay> PinLink<Clk, Tms, Tdi, Tdo, Delay>
where
    Clk: OutputPin,
    Tms: OutputPin,
    Tdi: OutputPin,
    Tdo: InputPin,
    Delay: DelayNs,
{
    /// `freq_khz` is the TCK frequency and must be non-zero.
    pub fn new(
        freq_khz: u32,
        clock: Clk,
        tms: Tms,
        tdi: Tdi,
        tdo: Tdo,
        delay: Delay,
    ) -> io::Result<PinLink<Clk, Tms, Tdi, Tdo, Delay>> {
        if freq_khz == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "TCK frequency must be non-zero",
            ));
        }
        let mut link = PinLink {
            half_period: 1_000_000 / freq_khz / 2,
            delay,
            clock,
            tms,
            tdi,
            tdo,
        };
        link.clock.set_low().map_err(pin_error)?;
        Ok(link)
    }

    pub fn half_period_ns(&self) -> u32 {
        self.half_period
    }
}

impl<Clk, Tms, Tdi, Tdo, Delay> Link for PinLink<Clk, Tms, Tdi, Tdo, Delay>
where
    Clk: OutputPin,
    Tms: OutputPin,
    Tdi: OutputPin,
    Tdo: InputPin,
    Delay: DelayNs,
{
    fn pulse(&mut self, tms: bool, tdi: bool) -> io::Result<bool> {
        self.tms.set_state(PinState::from(tms)).map_err(pin_error)?;
        self.tdi.set_state(PinState::from(tdi)).map_err(pin_error)?;
        self.delay.delay_ns(self.half_period);
        self.clock.set_high().map_err(pin_error)?;
        let tdo = self.tdo.is_high().map_err(pin_error)?;
        self.delay.delay_ns(self.half_period);
        self.clock.set_low().map_err(pin_error)?;
        Ok(tdo)
    }

    fn set_tck(&mut self, period_ns: u32) -> io::Result<u32> {
        self.half_period = (period_ns / 2).max(1);
        Ok(self.half_period * 2)
    }
}

#[cfg(test)]
mod test {
    use std::{cell::Cell, convert::Infallible, rc::Rc};

    use embedded_hal::digital::{self, ErrorType};

    use super::*;

    /// One wire shared between a driver and a reader.
    #[derive(Clone, Default)]
    struct Wire(Rc<Cell<bool>>);

    /// Drives a wire and counts rising edges.
    #[derive(Clone, Default)]
    struct Out {
        wire: Wire,
        edges: Rc<Cell<u32>>,
    }

    impl ErrorType for Out {
        type Error = Infallible;
    }

    impl OutputPin for Out {
        fn set_low(&mut self) -> Result<(), Infallible> {
            self.wire.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            if !self.wire.0.get() {
                self.edges.set(self.edges.get() + 1);
            }
            self.wire.0.set(true);
            Ok(())
        }
    }

    struct In(Wire);

    impl ErrorType for In {
        type Error = Infallible;
    }

    impl InputPin for In {
        fn is_high(&mut self) -> Result<bool, Infallible> {
            Ok(self.0.0.get())
        }

        fn is_low(&mut self) -> Result<bool, Infallible> {
            Ok(!self.0.0.get())
        }
    }

    struct Broken;

    impl ErrorType for Broken {
        type Error = digital::ErrorKind;
    }

    impl OutputPin for Broken {
        fn set_low(&mut self) -> Result<(), digital::ErrorKind> {
            Err(digital::ErrorKind::Other)
        }

        fn set_high(&mut self) -> Result<(), digital::ErrorKind> {
            Err(digital::ErrorKind::Other)
        }
    }

    #[derive(Clone, Default)]
    struct Clock(Rc<Cell<u64>>);

    impl DelayNs for Clock {
        fn delay_ns(&mut self, ns: u32) {
            self.0.set(self.0.get() + u64::from(ns));
        }
    }

    #[test]
    fn loopback_returns_tdi() {
        let tdi = Out::default();
        let clock = Out::default();
        let elapsed = Clock::default();
        let mut link = PinLink::new(
            1000,
            clock.clone(),
            Out::default(),
            tdi.clone(),
            In(tdi.wire.clone()),
            elapsed.clone(),
        )
        .unwrap();
        assert_eq!(link.half_period_ns(), 500);

        let tdo = link.shift(12, &[0, 0], &[0xA5, 0x0C]).unwrap();
        assert_eq!(&tdo[..], &[0xA5, 0x0C]);
        assert_eq!(clock.edges.get(), 12);
        assert_eq!(elapsed.0.get(), 12 * 1000);
        assert!(!clock.wire.0.get());
    }

    #[test]
    fn tck_period_is_adjustable() {
        let mut link = PinLink::new(
            100,
            Out::default(),
            Out::default(),
            Out::default(),
            In(Wire::default()),
            Clock::default(),
        )
        .unwrap();
        assert_eq!(link.set_tck(101).unwrap(), 100);
        assert_eq!(link.half_period_ns(), 50);
    }

    #[test]
    fn pin_failures_become_link_errors() {
        let zero = PinLink::new(
            0,
            Out::default(),
            Out::default(),
            Out::default(),
            In(Wire::default()),
            Clock::default(),
        );
        assert!(zero.is_err());

        let broken = PinLink::new(
            1000,
            Broken,
            Out::default(),
            Out::default(),
            In(Wire::default()),
            Clock::default(),
        );
        match broken {
            Err(err) => assert_eq!(err.kind(), io::ErrorKind::Other),
            Ok(_) => panic!("broken clock pin was accepted"),
        }
    }
}
