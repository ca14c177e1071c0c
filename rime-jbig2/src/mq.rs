//! The MQ arithmetic decoder of T.88 Annex E.
//!
//! The code register is kept in the inverted form of the software
//! conventions in Annex G, where `C` holds the complement of the data bits.

/// The adaptive probability state of one context.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Context {
    index: u8,
    mps: u8,
}

/// Qe, next index after an MPS, next index after an LPS, and whether to
/// switch the sense of the MPS. Table E.1.
#[rustfmt::skip]
const QE: [(u32, u8, u8, bool); 47] = [
    (0x5601, 1, 1, true), (0x3401, 2, 6, false), (0x1801, 3, 9, false),
    (0x0AC1, 4, 12, false), (0x0521, 5, 29, false), (0x0221, 38, 33, false),
    (0x5601, 7, 6, true), (0x5401, 8, 14, false), (0x4801, 9, 14, false),
    (0x3801, 10, 14, false), (0x3001, 11, 17, false), (0x2401, 12, 18, false),
    (0x1C01, 13, 20, false), (0x1601, 29, 21, false), (0x5601, 15, 14, true),
    (0x5401, 16, 14, false), (0x5101, 17, 15, false), (0x4801, 18, 16, false),
    (0x3801, 19, 17, false), (0x3401, 20, 18, false), (0x3001, 21, 19, false),
    (0x2801, 22, 19, false), (0x2401, 23, 20, false), (0x2201, 24, 21, false),
    (0x1C01, 25, 22, false), (0x1801, 26, 23, false), (0x1601, 27, 24, false),
    (0x1401, 28, 25, false), (0x1201, 29, 26, false), (0x1101, 30, 27, false),
    (0x0AC1, 31, 28, false), (0x09C1, 32, 29, false), (0x08A1, 33, 30, false),
    (0x0521, 34, 31, false), (0x0441, 35, 32, false), (0x02A1, 36, 33, false),
    (0x0221, 37, 34, false), (0x0141, 38, 35, false), (0x0111, 39, 36, false),
    (0x0085, 40, 37, false), (0x0049, 41, 38, false), (0x0025, 42, 39, false),
    (0x0015, 43, 40, false), (0x0009, 44, 41, false), (0x0005, 45, 42, false),
    (0x0001, 45, 43, false), (0x5601, 46, 46, false),
];

pub(crate) struct MqDecoder<'a> {
    data: &'a [u8],
    position: usize,
    c: u32,
    a: u32,
    /// Bits left in the low half of `c` before the next byte is needed.
    ct: u32,
}

impl<'a> MqDecoder<'a> {
    /// INITDEC.
    pub(crate) fn new(data: &'a [u8]) -> Self {
        let mut decoder = Self {
            data,
            position: 0,
            c: 0,
            a: 0,
            ct: 0,
        };

        decoder.c = ((decoder.byte(0) ^ 0xFF) as u32) << 16;
        decoder.byte_in();
        decoder.c <<= 7;
        decoder.ct -= 7;
        decoder.a = 0x8000;

        decoder
    }

    /// Past the end of the data, the decoder reads `0xFF` bytes.
    fn byte(&self, offset: usize) -> u8 {
        self.data.get(self.position + offset).copied().unwrap_or(0xFF)
    }

    /// BYTEIN.
    fn byte_in(&mut self) {
        if self.byte(0) == 0xFF {
            if self.byte(1) > 0x8F {
                // A marker, feed ones from now on.
                self.ct = 8;
            } else {
                self.position += 1;
                self.c = self
                    .c
                    .wrapping_add(0xFE00)
                    .wrapping_sub((self.byte(0) as u32) << 9);
                self.ct = 7;
            }
        } else {
            self.position += 1;
            self.c = self
                .c
                .wrapping_add(0xFF00)
                .wrapping_sub((self.byte(0) as u32) << 8);
            self.ct = 8;
        }
    }

    /// RENORMD.
    fn renormalize(&mut self) {
        loop {
            if self.ct == 0 {
                self.byte_in();
            }

            self.a <<= 1;
            self.c <<= 1;
            self.ct -= 1;

            if self.a & 0x8000 != 0 {
                break;
            }
        }
    }

    /// Decode a single bit in the given context.
    pub(crate) fn decode(&mut self, cx: &mut Context) -> u8 {
        let (qe, nmps, nlps, switch) = QE[cx.index as usize];
        self.a -= qe;

        // Whether the less probable symbol was coded, and whether the
        // interval roles are exchanged.
        let lps = if (self.c >> 16) < self.a {
            if self.a & 0x8000 != 0 {
                return cx.mps;
            }

            self.a < qe
        } else {
            self.c -= self.a << 16;
            let exchanged = self.a < qe;
            self.a = qe;

            !exchanged
        };

        let bit = if lps {
            let bit = 1 - cx.mps;

            if switch {
                cx.mps = 1 - cx.mps;
            }

            cx.index = nlps;
            bit
        } else {
            cx.index = nmps;
            cx.mps
        };

        self.renormalize();

        bit
    }
}
