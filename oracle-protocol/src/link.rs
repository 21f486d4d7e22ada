use std::io;

use crate::codec::{bit, set_bit, vector_len};

/// The four-wire connection to a TAP.
///
/// A link drives TCK through one low-high-low cycle per [`Link::pulse`],
/// holding TMS and TDI stable for the whole cycle, and returns the TDO value
/// sampled while the clock is high. Every pulse takes two half periods of
/// wall-clock or simulated time.
///
/// Links report transport failures only. A device that answers with the
/// wrong bits is not an error at this layer.
pub trait Link {
    /// Clock a single TMS/TDI pair and return the sampled TDO bit.
    fn pulse(&mut self, tms: bool, tdi: bool) -> io::Result<bool>;

    /// Clock `num_bits` packed TMS/TDI pairs and return the packed TDO bits.
    ///
    /// `tms` and `tdi` hold `⌈num_bits / 8⌉` bytes, LSB first. Transports
    /// that can send a whole vector at once should override this.
    fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> io::Result<Box<[u8]>> {
        let mut tdo = vec![0u8; vector_len(num_bits)];
        for index in 0..num_bits {
            let sampled = self.pulse(bit(tms, index), bit(tdi, index))?;
            set_bit(&mut tdo, index, sampled);
        }
        Ok(tdo.into_boxed_slice())
    }

    /// Request a TCK period and return the period actually applied.
    ///
    /// Links without a configurable clock keep their period and report the
    /// request back unchanged.
    fn set_tck(&mut self, period_ns: u32) -> io::Result<u32> {
        Ok(period_ns)
    }
}

impl<L: Link + ?Sized> Link for &mut L {
    fn pulse(&mut self, tms: bool, tdi: bool) -> io::Result<bool> {
        (**self).pulse(tms, tdi)
    }

    fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> io::Result<Box<[u8]>> {
        (**self).shift(num_bits, tms, tdi)
    }

    fn set_tck(&mut self, period_ns: u32) -> io::Result<u32> {
        (**self).set_tck(period_ns)
    }
}

impl<L: Link + ?Sized> Link for Box<L> {
    fn pulse(&mut self, tms: bool, tdi: bool) -> io::Result<bool> {
        (**self).pulse(tms, tdi)
    }

    fn shift(&mut self, num_bits: u32, tms: &[u8], tdi: &[u8]) -> io::Result<Box<[u8]>> {
        (**self).shift(num_bits, tms, tdi)
    }

    fn set_tck(&mut self, period_ns: u32) -> io::Result<u32> {
        (**self).set_tck(period_ns)
    }
}
