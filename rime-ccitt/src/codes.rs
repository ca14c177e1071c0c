//! The code tables of ITU-T T.4 and T.6, turned into binary prefix trees at
//! compile time.

use crate::bit_reader::BitReader;
use crate::{DecodeError, Result};

/// A two-dimensional coding mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Pass,
    Horizontal,
    /// The offset of `a1` relative to `b1`.
    Vertical(i8),
}

#[derive(Clone, Copy)]
struct Code {
    bits: &'static str,
    value: u16,
}

const fn c(bits: &'static str, value: u16) -> Code {
    Code { bits, value }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Invalid,
    Node(u8),
    Leaf(u16),
}

const TREE_SIZE: usize = 128;

/// Node 0 is the root. Each node has an edge for a 0 bit and one for a 1 bit.
type Tree = [[Edge; 2]; TREE_SIZE];

const fn build(tables: &[&[Code]]) -> Tree {
    let mut tree = [[Edge::Invalid; 2]; TREE_SIZE];
    let mut len = 1;

    let mut t = 0;
    while t < tables.len() {
        let mut i = 0;

        while i < tables[t].len() {
            let code = tables[t][i];
            let bits = code.bits.as_bytes();
            let mut node = 0;

            let mut j = 0;
            while j < bits.len() {
                let bit = (bits[j] - b'0') as usize;

                if j == bits.len() - 1 {
                    tree[node][bit] = Edge::Leaf(code.value);
                } else if let Edge::Node(next) = tree[node][bit] {
                    node = next as usize;
                } else {
                    tree[node][bit] = Edge::Node(len as u8);
                    node = len;
                    len += 1;
                }

                j += 1;
            }

            i += 1;
        }

        t += 1;
    }

    tree
}

/// White runs of 0 to 63 pixels.
const WHITE_TERMINATING: &[Code] = &[
    c("00110101", 0),
    c("000111", 1),
    c("0111", 2),
    c("1000", 3),
    c("1011", 4),
    c("1100", 5),
    c("1110", 6),
    c("1111", 7),
    c("10011", 8),
    c("10100", 9),
    c("00111", 10),
    c("01000", 11),
    c("001000", 12),
    c("000011", 13),
    c("110100", 14),
    c("110101", 15),
    c("101010", 16),
    c("101011", 17),
    c("0100111", 18),
    c("0001100", 19),
    c("0001000", 20),
    c("0010111", 21),
    c("0000011", 22),
    c("0000100", 23),
    c("0101000", 24),
    c("0101011", 25),
    c("0010011", 26),
    c("0100100", 27),
    c("0011000", 28),
    c("00000010", 29),
    c("00000011", 30),
    c("00011010", 31),
    c("00011011", 32),
    c("00010010", 33),
    c("00010011", 34),
    c("00010100", 35),
    c("00010101", 36),
    c("00010110", 37),
    c("00010111", 38),
    c("00101000", 39),
    c("00101001", 40),
    c("00101010", 41),
    c("00101011", 42),
    c("00101100", 43),
    c("00101101", 44),
    c("00000100", 45),
    c("00000101", 46),
    c("00001010", 47),
    c("00001011", 48),
    c("01010010", 49),
    c("01010011", 50),
    c("01010100", 51),
    c("01010101", 52),
    c("00100100", 53),
    c("00100101", 54),
    c("01011000", 55),
    c("01011001", 56),
    c("01011010", 57),
    c("01011011", 58),
    c("01001010", 59),
    c("01001011", 60),
    c("00110010", 61),
    c("00110011", 62),
    c("00110100", 63),
];

/// White runs that are a multiple of 64.
const WHITE_MAKE_UP: &[Code] = &[
    c("11011", 64),
    c("10010", 128),
    c("010111", 192),
    c("0110111", 256),
    c("00110110", 320),
    c("00110111", 384),
    c("01100100", 448),
    c("01100101", 512),
    c("01101000", 576),
    c("01100111", 640),
    c("011001100", 704),
    c("011001101", 768),
    c("011010010", 832),
    c("011010011", 896),
    c("011010100", 960),
    c("011010101", 1024),
    c("011010110", 1088),
    c("011010111", 1152),
    c("011011000", 1216),
    c("011011001", 1280),
    c("011011010", 1344),
    c("011011011", 1408),
    c("010011000", 1472),
    c("010011001", 1536),
    c("010011010", 1600),
    c("011000", 1664),
    c("010011011", 1728),
];

/// Black runs of 0 to 63 pixels.
const BLACK_TERMINATING: &[Code] = &[
    c("0000110111", 0),
    c("010", 1),
    c("11", 2),
    c("10", 3),
    c("011", 4),
    c("0011", 5),
    c("0010", 6),
    c("00011", 7),
    c("000101", 8),
    c("000100", 9),
    c("0000100", 10),
    c("0000101", 11),
    c("0000111", 12),
    c("00000100", 13),
    c("00000111", 14),
    c("000011000", 15),
    c("0000010111", 16),
    c("0000011000", 17),
    c("0000001000", 18),
    c("00001100111", 19),
    c("00001101000", 20),
    c("00001101100", 21),
    c("00000110111", 22),
    c("00000101000", 23),
    c("00000010111", 24),
    c("00000011000", 25),
    c("000011001010", 26),
    c("000011001011", 27),
    c("000011001100", 28),
    c("000011001101", 29),
    c("000001101000", 30),
    c("000001101001", 31),
    c("000001101010", 32),
    c("000001101011", 33),
    c("000011010010", 34),
    c("000011010011", 35),
    c("000011010100", 36),
    c("000011010101", 37),
    c("000011010110", 38),
    c("000011010111", 39),
    c("000001101100", 40),
    c("000001101101", 41),
    c("000011011010", 42),
    c("000011011011", 43),
    c("000001010100", 44),
    c("000001010101", 45),
    c("000001010110", 46),
    c("000001010111", 47),
    c("000001100100", 48),
    c("000001100101", 49),
    c("000001010010", 50),
    c("000001010011", 51),
    c("000000100100", 52),
    c("000000110111", 53),
    c("000000111000", 54),
    c("000000100111", 55),
    c("000000101000", 56),
    c("000001011000", 57),
    c("000001011001", 58),
    c("000000101011", 59),
    c("000000101100", 60),
    c("000001011010", 61),
    c("000001100110", 62),
    c("000001100111", 63),
];

/// Black runs that are a multiple of 64.
const BLACK_MAKE_UP: &[Code] = &[
    c("0000001111", 64),
    c("000011001000", 128),
    c("000011001001", 192),
    c("000001011011", 256),
    c("000000110011", 320),
    c("000000110100", 384),
    c("000000110101", 448),
    c("0000001101100", 512),
    c("0000001101101", 576),
    c("0000001001010", 640),
    c("0000001001011", 704),
    c("0000001001100", 768),
    c("0000001001101", 832),
    c("0000001110010", 896),
    c("0000001110011", 960),
    c("0000001110100", 1024),
    c("0000001110101", 1088),
    c("0000001110110", 1152),
    c("0000001110111", 1216),
    c("0000001010010", 1280),
    c("0000001010011", 1344),
    c("0000001010100", 1408),
    c("0000001010101", 1472),
    c("0000001011010", 1536),
    c("0000001011011", 1600),
    c("0000001100100", 1664),
    c("0000001100101", 1728),
];

/// Long runs, shared by both colors.
const COMMON_MAKE_UP: &[Code] = &[
    c("00000001000", 1792),
    c("00000001100", 1856),
    c("00000001101", 1920),
    c("000000010010", 1984),
    c("000000010011", 2048),
    c("000000010100", 2112),
    c("000000010101", 2176),
    c("000000010110", 2240),
    c("000000010111", 2304),
    c("000000011100", 2368),
    c("000000011101", 2432),
    c("000000011110", 2496),
    c("000000011111", 2560),
];

/// Table 4/T.4, the value is an index into `MODES`.
const MODE_CODES: &[Code] = &[
    c("0001", 0),
    c("001", 1),
    c("1", 2),
    c("011", 3),
    c("000011", 4),
    c("0000011", 5),
    c("010", 6),
    c("000010", 7),
    c("0000010", 8),
];

const MODES: [Mode; 9] = [
    Mode::Pass,
    Mode::Horizontal,
    Mode::Vertical(0),
    Mode::Vertical(1),
    Mode::Vertical(2),
    Mode::Vertical(3),
    Mode::Vertical(-1),
    Mode::Vertical(-2),
    Mode::Vertical(-3),
];

static WHITE: Tree = build(&[WHITE_TERMINATING, WHITE_MAKE_UP, COMMON_MAKE_UP]);
static BLACK: Tree = build(&[BLACK_TERMINATING, BLACK_MAKE_UP, COMMON_MAKE_UP]);
static MODE: Tree = build(&[MODE_CODES]);

impl BitReader<'_> {
    fn lookup(&mut self, tree: &Tree) -> Result<u16> {
        let mut node = 0;

        loop {
            match tree[node][self.read_bit()? as usize] {
                Edge::Invalid => return Err(DecodeError::InvalidCode),
                Edge::Node(next) => node = next as usize,
                Edge::Leaf(value) => return Ok(value),
            }
        }
    }

    /// Read the make-up codes and the terminating code of a single run.
    pub(crate) fn read_run(&mut self, white: bool) -> Result<usize> {
        let tree = if white { &WHITE } else { &BLACK };
        let mut run = 0;

        loop {
            let length = self.lookup(tree)? as usize;
            run += length;

            if length < 64 {
                return Ok(run);
            }
        }
    }

    pub(crate) fn read_mode(&mut self) -> Result<Mode> {
        let index = self.lookup(&MODE)? as usize;

        MODES.get(index).copied().ok_or(DecodeError::InvalidCode)
    }
}
