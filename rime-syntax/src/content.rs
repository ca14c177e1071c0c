//! Tokenizing content streams.
//!
//! Content streams are a sequence of operands followed by an operator. The
//! [`Tokenizer`] exposes them in a raw manner, it does not check whether the
//! operands fit the operator.

use crate::object::dict::keys::{
    BITS_PER_COMPONENT, COLOR_SPACE, DECODE, DECODE_PARMS, DEVICE_CMYK, DEVICE_GRAY, DEVICE_RGB,
    FILTER, HEIGHT, IMAGE_MASK, INDEXED, INTERPOLATE, LENGTH, WIDTH,
};
use crate::object::{Array, Dict, Name, Object, Stream};
use crate::parse::Parser;
use crate::reader::is_white_space_character;
use crate::xref::XRef;
use log::{debug, warn};
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::ops::Deref;

// 6 operands are used for example for `cm` or cubic curves,
// anything above should be pretty rare.
const OPERANDS_THRESHOLD: usize = 6;

/// The operands of an instruction.
pub type Operands = SmallVec<[Object; OPERANDS_THRESHOLD]>;

/// A content stream operator.
#[derive(Clone, PartialEq, Eq)]
pub struct Operator(Name);

impl Operator {
    /// Create a new operator.
    pub fn new(name: &[u8]) -> Self {
        Self(Name::new(name))
    }
}

impl Deref for Operator {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Debug for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.as_str())
    }
}

/// An operator together with its operands.
///
/// For `BI`, the only operand is a [`Stream`] holding the inline image with
/// its abbreviated dictionary entries expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// The operands, in the order they appeared.
    pub operands: Operands,
    /// The operator.
    pub operator: Operator,
}

impl Instruction {
    /// Get the operand at the given index as a specific type.
    pub fn operand<T: crate::object::FromObject>(&self, index: usize) -> Option<T> {
        self.operands.get(index)?.cast::<T>()
    }

    /// All operands as numbers, if they are numbers.
    pub fn numbers(&self) -> Option<SmallVec<[f32; OPERANDS_THRESHOLD]>> {
        self.operands.iter().map(|o| o.cast::<f32>()).collect()
    }
}

/// An iterator over the instructions of a content stream.
pub struct Tokenizer<'a> {
    parser: Parser<'a>,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer.
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            parser: Parser::new(data, true),
        }
    }

    fn read_inline_image(&mut self) -> Option<Stream> {
        let mut dict = Dict::new();

        loop {
            self.parser.r.skip_white_spaces_and_comments();

            if self.parser.peek_keyword() == Some(b"ID") {
                self.parser.r.read_bytes(2)?;
                break;
            }

            let Some(Object::Name(key)) = self.parser.read_object() else {
                warn!("invalid key in inline image dictionary");

                return None;
            };
            let value = self.parser.read_object()?;

            dict.insert(expand_key(&key), expand_value(&key, value));
        }

        // A single white space separates `ID` from the data.
        self.parser.r.forward_if(is_white_space_character);
        let start = self.parser.r.offset();

        if let Some(length) = dict.get::<usize>(LENGTH)
            && let Some(data) = self.parser.r.read_bytes(length)
        {
            self.parser.r.skip_white_spaces_and_comments();

            if self.parser.r.forward_tag(b"EI").is_some() {
                return Some(Stream::new(dict, data));
            }

            debug!("inline image length is wrong, searching for EI");
            self.parser.r.jump(start);
        }

        let xref = XRef::new();

        while !self.parser.r.at_end() {
            let offset = self.parser.r.offset();

            if self.parser.r.peek_tag(b"EI").is_some() && is_end_marker(&self.parser, start, offset)
            {
                let mut data = self.parser.r.range(start..offset)?;

                if let Some((last, rest)) = data.split_last()
                    && is_white_space_character(*last)
                {
                    data = rest;
                }

                let stream = Stream::new(dict.clone(), data);

                // The image data might contain `EI` itself, in which case the
                // filters usually fail on the truncated data.
                if stream.decode(&xref).is_ok() {
                    self.parser.r.read_bytes(2)?;

                    return Some(stream);
                }
            }

            self.parser.r.forward();
        }

        warn!("inline image without EI");

        None
    }
}

fn is_end_marker(parser: &Parser<'_>, start: usize, offset: usize) -> bool {
    let preceded = offset == start
        || parser
            .r
            .range(offset - 1..offset)
            .is_some_and(|b| is_white_space_character(b[0]));
    let followed = parser
        .r
        .range(offset + 2..offset + 3)
        .is_none_or(|b| is_white_space_character(b[0]));

    preceded && followed
}

fn expand_key(key: &Name) -> Name {
    let expanded: &[u8] = match key.deref() {
        b"BPC" => BITS_PER_COMPONENT,
        b"CS" => COLOR_SPACE,
        b"D" => DECODE,
        b"DP" => DECODE_PARMS,
        b"F" => FILTER,
        b"H" => HEIGHT,
        b"IM" => IMAGE_MASK,
        b"I" => INTERPOLATE,
        b"L" => LENGTH,
        b"W" => WIDTH,
        _ => return key.clone(),
    };

    Name::new(expanded)
}

fn expand_value(key: &Name, value: Object) -> Object {
    let expand = |name: &Name| -> Name {
        let expanded: &[u8] = match name.deref() {
            b"G" => DEVICE_GRAY,
            b"RGB" => DEVICE_RGB,
            b"CMYK" => DEVICE_CMYK,
            b"I" => INDEXED,
            _ => return name.clone(),
        };

        Name::new(expanded)
    };

    match (key.deref(), value) {
        (b"CS" | b"ColorSpace", Object::Name(n)) => Object::Name(expand(&n)),
        // `[/I /RGB 1 <...>]`
        (b"CS" | b"ColorSpace", Object::Array(a)) => Object::Array(
            a.iter()
                .map(|o| match o {
                    Object::Name(n) => Object::Name(expand(n)),
                    other => other.clone(),
                })
                .collect::<Array>(),
        ),
        (_, value) => value,
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Instruction;

    fn next(&mut self) -> Option<Self::Item> {
        let mut operands = Operands::new();

        loop {
            self.parser.r.skip_white_spaces_and_comments();

            let byte = self.parser.r.peek_byte()?;

            if matches!(
                byte,
                b'/' | b'.' | b'+' | b'-' | b'0'..=b'9' | b'[' | b'<' | b'('
            ) {
                match self.parser.read_object() {
                    Some(object) => operands.push(object),
                    None => {
                        warn!("failed to read operand in content stream");
                        self.parser.r.forward();
                    }
                }

                continue;
            }

            let Some(keyword) = self.parser.peek_keyword() else {
                debug!("skipping stray byte {byte:#04x} in content stream");
                self.parser.r.forward();

                continue;
            };

            if matches!(keyword, b"true" | b"false" | b"null") {
                operands.extend(self.parser.read_object());

                continue;
            }

            self.parser.r.read_bytes(keyword.len())?;

            if keyword == b"BI" {
                operands.clear();

                match self.read_inline_image() {
                    Some(stream) => operands.push(Object::Stream(stream)),
                    None => return None,
                }
            }

            return Some(Instruction {
                operands,
                operator: Operator::new(keyword),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Number;

    fn operators(data: &[u8]) -> Vec<String> {
        Tokenizer::new(data)
            .map(|i| format!("{:?}", i.operator))
            .collect()
    }

    #[test]
    fn simple_path() {
        let mut iter = Tokenizer::new(b"q 1 0 0 1 10.5 -3 cm 0 0 m 10 10 l S Q");

        assert_eq!(&*iter.next().unwrap().operator, b"q");

        let cm = iter.next().unwrap();
        assert_eq!(&*cm.operator, b"cm");
        assert_eq!(
            cm.numbers().unwrap().as_slice(),
            &[1.0, 0.0, 0.0, 1.0, 10.5, -3.0]
        );

        assert_eq!(
            iter.map(|i| format!("{:?}", i.operator)).collect::<Vec<_>>(),
            ["m", "l", "S", "Q"]
        );
    }

    #[test]
    fn names_and_comments() {
        let mut iter = Tokenizer::new(b"% a comment\n/OC /MC0 BDC\n/Im1 Do EMC");

        let bdc = iter.next().unwrap();
        assert_eq!(&*bdc.operator, b"BDC");
        assert_eq!(bdc.operand::<Name>(1), Some(Name::new(b"MC0")));

        let x_object = iter.next().unwrap();
        assert_eq!(x_object.operand::<Name>(0), Some(Name::new(b"Im1")));
        assert_eq!(&*iter.next().unwrap().operator, b"EMC");
        assert!(iter.next().is_none());
    }

    #[test]
    fn references_are_not_operands() {
        let ops = Tokenizer::new(b"1 0 R").next().unwrap();

        assert_eq!(&*ops.operator, b"R");
        assert_eq!(
            ops.operands.as_slice(),
            &[Object::Number(Number::Integer(1)), Object::Number(Number::Integer(0))]
        );
    }

    #[test]
    fn stray_bytes_are_skipped() {
        assert_eq!(operators(b"q ) } Q"), ["q", "Q"]);
    }

    #[test]
    fn inline_image() {
        let data = b"q BI /W 2 /H 2 /BPC 8 /CS /G ID \x00\xFF\xFF\x00 EI Q";
        let ops = Tokenizer::new(data).collect::<Vec<_>>();

        assert_eq!(ops.len(), 3);
        assert_eq!(&*ops[1].operator, b"BI");

        let stream = ops[1].operand::<Stream>(0).unwrap();
        assert_eq!(stream.dict().get::<u32>(WIDTH), Some(2));
        assert_eq!(stream.dict().get::<u32>(BITS_PER_COMPONENT), Some(8));
        assert_eq!(
            stream.dict().get::<Name>(COLOR_SPACE),
            Some(Name::new(DEVICE_GRAY))
        );
        assert_eq!(stream.raw_data(), b"\x00\xFF\xFF\x00");
        assert_eq!(&*ops[2].operator, b"Q");
    }

    #[test]
    fn inline_image_containing_ei() {
        let data = b"BI /W 5 /H 1 /CS /RGB /BPC 8 /L 5 ID EI EI EI\nQ";
        let ops = Tokenizer::new(data).collect::<Vec<_>>();

        assert_eq!(ops[0].operand::<Stream>(0).unwrap().raw_data(), b"EI EI");
        assert_eq!(&*ops[1].operator, b"Q");
    }

    #[test]
    fn inline_image_with_filter() {
        let data = b"BI /W 1 /H 1 /CS [/I /RGB 0 <FF0000>] /F /AHx ID 00> EI";
        let ops = Tokenizer::new(data).collect::<Vec<_>>();
        let stream = ops[0].operand::<Stream>(0).unwrap();

        assert_eq!(stream.raw_data(), b"00>");
        assert_eq!(
            stream.dict().get::<Array>(COLOR_SPACE).unwrap().get::<Name>(0),
            Some(Name::new(INDEXED))
        );
        assert_eq!(stream.decoded(&XRef::new()).unwrap(), [0]);
    }
}
