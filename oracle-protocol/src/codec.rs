//! TAP walks and the packing of complete TAP operations into TMS/TDI vectors.
//!
//! Vectors are packed the same way XVC shift vectors are: bit `n` of the
//! stream lives in byte `n / 8` at position `n % 8`.
use crate::error::DecodeError;

/// Five TMS-high clocks reach Test-Logic-Reset from any state, the final low
/// clock enters Run-Test/Idle.
pub const RESET_WALK: [bool; 6] = [true, true, true, true, true, false];

/// Run-Test/Idle, Select-DR-Scan, Select-IR-Scan, Capture-IR, Shift-IR.
pub const IR_PREAMBLE: [bool; 5] = [false, true, true, false, false];

/// Run-Test/Idle, Select-DR-Scan, Capture-DR, Shift-DR.
pub const DR_PREAMBLE: [bool; 4] = [false, true, false, false];

/// Exit1 to Update, Update to Run-Test/Idle.
pub const POSTAMBLE: [bool; 2] = [true, false];

pub const IR_WIDTH: u8 = 8;
pub const MAX_DR_WIDTH: u8 = 32;

/// Reads bit `index` of a packed vector. Bits past the end read as zero.
pub fn bit(vector: &[u8], index: u32) -> bool {
    vector
        .get((index / 8) as usize)
        .is_some_and(|byte| (byte >> (index % 8)) & 1 == 1)
}

/// Sets bit `index` of a packed vector.
pub fn set_bit(vector: &mut [u8], index: u32, value: bool) {
    let byte = &mut vector[(index / 8) as usize];
    let mask = 1 << (index % 8);
    if value {
        *byte |= mask;
    } else {
        *byte &= !mask;
    }
}

/// Number of bytes needed to hold `num_bits` packed bits.
pub fn vector_len(num_bits: u32) -> usize {
    num_bits.div_ceil(8) as usize
}

#[derive(Default)]
struct VectorBuilder {
    num_bits: u32,
    tms: Vec<u8>,
    tdi: Vec<u8>,
}

impl VectorBuilder {
    fn push(&mut self, tms: bool, tdi: bool) {
        if self.num_bits % 8 == 0 {
            self.tms.push(0);
            self.tdi.push(0);
        }
        set_bit(&mut self.tms, self.num_bits, tms);
        set_bit(&mut self.tdi, self.num_bits, tdi);
        self.num_bits += 1;
    }

    fn walk(&mut self, tms: &[bool]) {
        for &bit in tms {
            self.push(bit, false);
        }
    }
}

/// One complete TAP operation, starting and ending in Run-Test/Idle.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Scan {
    num_bits: u32,
    tms: Box<[u8]>,
    tdi: Box<[u8]>,
    /// First clock of the shift phase and the number of shifted bits.
    capture: Option<(u32, u8)>,
}

impl Scan {
    /// Walks the TAP to Test-Logic-Reset and parks it in Run-Test/Idle.
    pub fn reset() -> Scan {
        let mut builder = VectorBuilder::default();
        builder.walk(&RESET_WALK);
        Scan::finish(builder, None)
    }

    /// Shifts `opcode` into the instruction register.
    pub fn instruction(opcode: u8) -> Scan {
        Scan::shift(&IR_PREAMBLE, u32::from(opcode), IR_WIDTH)
    }

    /// Shifts the low `width` bits of `value` into the selected data register.
    pub fn data(value: u32, width: u8) -> Result<Scan, DecodeError> {
        if width == 0 || width > MAX_DR_WIDTH {
            return Err(DecodeError::InvalidWidth(width));
        }
        Ok(Scan::shift(&DR_PREAMBLE, value, width))
    }

    fn shift(preamble: &[bool], value: u32, width: u8) -> Scan {
        let mut builder = VectorBuilder::default();
        builder.walk(preamble);
        let offset = builder.num_bits;
        for index in 0..width {
            // TMS goes high together with the last data bit (Shift -> Exit1).
            builder.push(index + 1 == width, (value >> index) & 1 == 1);
        }
        builder.walk(&POSTAMBLE);
        Scan::finish(builder, Some((offset, width)))
    }

    fn finish(builder: VectorBuilder, capture: Option<(u32, u8)>) -> Scan {
        Scan {
            num_bits: builder.num_bits,
            tms: builder.tms.into_boxed_slice(),
            tdi: builder.tdi.into_boxed_slice(),
            capture,
        }
    }

    /// Number of TCK clocks in this scan.
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    pub fn tms(&self) -> &[u8] {
        &self.tms
    }

    pub fn tdi(&self) -> &[u8] {
        &self.tdi
    }

    /// Number of bits shifted through the register, zero for a reset walk.
    pub fn width(&self) -> u8 {
        self.capture.map_or(0, |(_, width)| width)
    }

    /// Reassembles the register contents shifted out on TDO, LSB first.
    pub fn capture(&self, tdo: &[u8]) -> u32 {
        let Some((offset, width)) = self.capture else {
            return 0;
        };
        (0..u32::from(width)).fold(0, |value, index| {
            value | (u32::from(bit(tdo, offset + index)) << index)
        })
    }
}
