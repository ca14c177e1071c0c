//! Parsing of PDF object syntax.

use crate::object::dict::keys::LENGTH;
use crate::object::{
    Array, Dict, HexString, LiteralString, Name, Number, ObjRef, Object, PdfString, Stream,
};
use crate::reader::{Reader, is_regular_character, is_white_space_character};
use log::warn;

const MAX_DEPTH: usize = 256;

/// Parse a single direct object.
pub fn parse_object(data: &[u8]) -> Option<Object> {
    Parser::new(data, false).read_object()
}

/// Parse an indirect object definition (`12 0 obj ... endobj`).
///
/// Strings and streams inside the object remember the object they belong to.
pub fn parse_indirect(data: &[u8]) -> Option<(ObjRef, Object)> {
    Parser::new(data, false).read_indirect()
}

pub(crate) struct Parser<'a> {
    pub(crate) r: Reader<'a>,
    owner: Option<ObjRef>,
    in_content_stream: bool,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(data: &'a [u8], in_content_stream: bool) -> Self {
        Self {
            r: Reader::new(data),
            owner: None,
            in_content_stream,
            depth: 0,
        }
    }

    pub(crate) fn read_indirect(&mut self) -> Option<(ObjRef, Object)> {
        let start = self.r.offset();
        let result = self.read_indirect_inner();

        if result.is_none() {
            self.r.jump(start);
        }

        result
    }

    fn read_indirect_inner(&mut self) -> Option<(ObjRef, Object)> {
        self.r.skip_white_spaces_and_comments();
        let obj_num = self.read_integer()?;
        self.r.skip_white_spaces_and_comments();
        let gen_num = self.read_integer()?;
        self.r.skip_white_spaces_and_comments();
        self.r.forward_tag(b"obj")?;

        let reference = ObjRef::new(obj_num.try_into().ok()?, gen_num.try_into().ok()?);
        self.owner = Some(reference);
        let object = self.read_object();
        self.owner = None;

        let object = object?;
        self.r.skip_white_spaces_and_comments();

        if self.r.forward_tag(b"endobj").is_none() {
            warn!("missing endobj for object {reference}");
        }

        Some((reference, object))
    }

    pub(crate) fn read_object(&mut self) -> Option<Object> {
        let start = self.r.offset();
        let result = self.read_object_inner();

        if result.is_none() {
            self.r.jump(start);
        }

        result
    }

    fn read_object_inner(&mut self) -> Option<Object> {
        if self.depth > MAX_DEPTH {
            warn!("object nesting is too deep");

            return None;
        }

        self.r.skip_white_spaces_and_comments();

        match self.r.peek_byte()? {
            b'/' => self.read_name().map(Object::Name),
            b'(' => self.read_literal().map(Object::String),
            b'[' => self.nested(Self::read_array),
            b'<' => {
                if self.r.peek_tag(b"<<").is_some() {
                    let dict = self.nested(Self::read_dict)?;

                    match dict {
                        Object::Dict(d) if !self.in_content_stream => self.maybe_stream(d),
                        other => Some(other),
                    }
                } else {
                    self.read_hex().map(Object::String)
                }
            }
            b'+' | b'-' | b'.' | b'0'..=b'9' => {
                if !self.in_content_stream
                    && let Some(reference) = self.try_read_reference()
                {
                    return Some(Object::Reference(reference));
                }

                self.read_number().map(Object::Number)
            }
            _ => {
                let keyword = self.peek_keyword()?;

                let object = match keyword {
                    b"true" => Object::Boolean(true),
                    b"false" => Object::Boolean(false),
                    b"null" => Object::Null,
                    _ => return None,
                };

                self.r.read_bytes(keyword.len())?;

                Some(object)
            }
        }
    }

    fn nested(&mut self, f: impl FnOnce(&mut Self) -> Option<Object>) -> Option<Object> {
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;

        result
    }

    /// The regular characters at the current position.
    pub(crate) fn peek_keyword(&self) -> Option<&'a [u8]> {
        let mut cloned = self.r.clone();
        let start = cloned.offset();
        cloned.forward_while_1(is_regular_character)?;

        self.r.range(start..cloned.offset())
    }

    fn read_integer(&mut self) -> Option<i64> {
        match self.read_number()? {
            Number::Integer(i) => Some(i),
            Number::Real(_) => None,
        }
    }

    fn try_read_reference(&mut self) -> Option<ObjRef> {
        let start = self.r.offset();

        let reference = (|| {
            let obj_num = self.read_integer()?;
            self.r.forward_while_1(is_white_space_character)?;
            let gen_num = self.read_integer()?;
            self.r.forward_while_1(is_white_space_character)?;
            self.r.forward_tag(b"R")?;

            if self.r.peek_byte().is_some_and(is_regular_character) {
                return None;
            }

            Some(ObjRef::new(obj_num.try_into().ok()?, gen_num.try_into().ok()?))
        })();

        if reference.is_none() {
            self.r.jump(start);
        }

        reference
    }

    fn read_number(&mut self) -> Option<Number> {
        let start = self.r.offset();
        let _ = self.r.forward_if(|b| b == b'+' || b == b'-');

        let mut has_digits = false;
        let mut is_real = false;

        while let Some(b) = self.r.peek_byte() {
            match b {
                b'0'..=b'9' => has_digits = true,
                b'.' if !is_real => is_real = true,
                _ => break,
            }

            self.r.forward();
        }

        if !has_digits {
            self.r.jump(start);

            return None;
        }

        let text = core::str::from_utf8(self.r.range(start..self.r.offset())?).ok()?;

        if !is_real && let Ok(i) = text.parse::<i64>() {
            return Some(Number::Integer(i));
        }

        // Writers sometimes emit `-.5` or `4.`, which Rust also accepts.
        text.parse::<f64>().ok().map(Number::Real)
    }

    fn read_name(&mut self) -> Option<Name> {
        self.r.forward_tag(b"/")?;
        let start = self.r.offset();
        self.r.forward_while(is_regular_character);

        Some(Name::from_escaped(self.r.range(start..self.r.offset())?))
    }

    fn read_literal(&mut self) -> Option<PdfString> {
        self.r.forward_tag(b"(")?;
        let start = self.r.offset();
        let mut depth = 1;

        while depth > 0 {
            match self.r.read_byte()? {
                b'\\' => {
                    self.r.read_byte()?;
                }
                b'(' => depth += 1,
                b')' => depth -= 1,
                _ => {}
            }
        }

        let raw = self.r.range(start..self.r.offset() - 1)?;

        Some(self.owned(LiteralString::from_escaped(raw).into()))
    }

    fn read_hex(&mut self) -> Option<PdfString> {
        self.r.forward_tag(b"<")?;
        let start = self.r.offset();
        self.r
            .forward_while(|b| b.is_ascii_hexdigit() || is_white_space_character(b));
        let raw = self.r.range(start..self.r.offset())?;
        self.r.forward_tag(b">")?;

        Some(self.owned(HexString::new(raw).into()))
    }

    fn owned(&self, string: PdfString) -> PdfString {
        match self.owner {
            Some(owner) => string.with_owner(owner),
            None => string,
        }
    }

    fn read_array(&mut self) -> Option<Object> {
        self.r.forward_tag(b"[")?;
        let mut items = vec![];

        loop {
            self.r.skip_white_spaces_and_comments();

            if self.r.forward_tag(b"]").is_some() {
                return Some(Object::Array(Array::new(items)));
            }

            items.push(self.read_object()?);
        }
    }

    fn read_dict(&mut self) -> Option<Object> {
        self.r.forward_tag(b"<<")?;
        let mut dict = Dict::new();

        loop {
            self.r.skip_white_spaces_and_comments();

            if self.r.forward_tag(b">>").is_some() {
                return Some(Object::Dict(dict));
            }

            let key = self.read_name()?;
            let value = self.read_object()?;

            // A null value is equivalent to an absent entry.
            if !value.is_null() {
                dict.insert(key, value);
            }
        }
    }

    fn maybe_stream(&mut self, dict: Dict) -> Option<Object> {
        let before = self.r.offset();
        self.r.skip_white_spaces_and_comments();

        if self.r.forward_tag(b"stream").is_none() {
            self.r.jump(before);

            return Some(Object::Dict(dict));
        }

        self.r.skip_eol();
        let start = self.r.offset();
        let data = self.stream_data(&dict, start)?;

        let stream = Stream::new(dict, data);

        Some(Object::Stream(match self.owner {
            Some(owner) => stream.with_reference(owner),
            None => stream,
        }))
    }

    fn stream_data(&mut self, dict: &Dict, start: usize) -> Option<&'a [u8]> {
        if let Some(length) = dict.get::<usize>(LENGTH)
            && let Some(end) = start.checked_add(length)
            && let Some(data) = self.r.range(start..end)
        {
            let mut after = Reader::new_with(self.r.range(0..self.r.len())?, end);
            after.skip_white_spaces_and_comments();

            if after.forward_tag(b"endstream").is_some() {
                self.r.jump(after.offset());

                return Some(data);
            }
        }

        // The length is indirect or wrong, search for the end instead.
        let tail = self.r.tail()?;
        let pos = tail.windows(9).position(|w| w == b"endstream")?;
        let mut data = &tail[..pos];

        if let Some(stripped) = data.strip_suffix(b"\r\n") {
            data = stripped;
        } else if let Some(stripped) = data.strip_suffix(b"\n").or_else(|| data.strip_suffix(b"\r")) {
            data = stripped;
        }

        self.r.jump(start + pos + 9);

        Some(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::dict::keys::{FILTER, TYPE};

    #[test]
    fn primitives() {
        assert_eq!(parse_object(b"true"), Some(Object::Boolean(true)));
        assert_eq!(parse_object(b"null"), Some(Object::Null));
        assert_eq!(parse_object(b"  -12 "), Some(Object::from(-12_i64)));
        assert_eq!(parse_object(b".5"), Some(Object::from(0.5_f64)));
        assert_eq!(parse_object(b"/A#42"), Some(Object::Name(Name::new(b"AB"))));
        assert_eq!(parse_object(b"trueish"), None);
    }

    #[test]
    fn references_and_numbers_in_arrays() {
        let obj = parse_object(b"[1 0 R 2 3 4.5 (a(b)c) <4142>]").unwrap();
        let arr = obj.as_array().unwrap();

        assert_eq!(arr.get::<ObjRef>(0), Some(ObjRef::new(1, 0)));
        assert_eq!(arr.get::<i32>(1), Some(2));
        assert_eq!(arr.get::<i32>(2), Some(3));
        assert_eq!(arr.get::<f32>(3), Some(4.5));
        assert_eq!(arr.get::<PdfString>(4).unwrap().literal_string(), "a(b)c");
        assert_eq!(arr.get::<PdfString>(5).unwrap().bytes(), b"AB");
    }

    #[test]
    fn nested_dict() {
        let obj = parse_object(b"<< /Type /Catalog /Names << /Dests 5 0 R >> /Skip null >>").unwrap();
        let dict = obj.as_dict().unwrap();

        assert_eq!(dict.get::<Name>(TYPE), Some(Name::new(b"Catalog")));
        assert!(!dict.contains_key(b"Skip"));
        assert_eq!(
            dict.get::<Dict>(b"Names").unwrap().get_ref(b"Dests"),
            Some(ObjRef::new(5, 0))
        );
    }

    #[test]
    fn indirect_strings_know_their_owner() {
        let (reference, obj) = parse_indirect(b"7 0 obj\n[(kiwi) <6B>]\nendobj").unwrap();
        assert_eq!(reference, ObjRef::new(7, 0));

        let arr = obj.as_array().unwrap();
        assert_eq!(arr.get::<PdfString>(0).unwrap().owner(), Some(reference));
        assert_eq!(arr.get::<PdfString>(1).unwrap().owner(), Some(reference));
        assert_eq!(parse_object(b"(kiwi)").unwrap().as_string().unwrap().owner(), None);
    }

    #[test]
    fn stream_with_length() {
        let data = b"3 0 obj\n<< /Length 5 /Filter /AHx >>\nstream\n41>\r\nendstream\nendobj";
        let (_, obj) = parse_indirect(data).unwrap();
        let Object::Stream(stream) = obj else {
            panic!("expected stream");
        };

        assert_eq!(stream.raw_data(), b"41>\r\n");
        assert_eq!(stream.reference(), Some(ObjRef::new(3, 0)));
        assert_eq!(stream.dict().get::<Name>(FILTER), Some(Name::new(b"AHx")));
    }

    #[test]
    fn stream_with_wrong_length() {
        let data = b"3 0 obj << /Length 99 >> stream\r\nq Q\r\nendstream endobj";
        let (_, obj) = parse_indirect(data).unwrap();
        let Object::Stream(stream) = obj else {
            panic!("expected stream");
        };

        assert_eq!(stream.raw_data(), b"q Q");
    }

    #[test]
    fn deep_nesting_fails() {
        let data = "[".repeat(1000);
        assert_eq!(parse_object(data.as_bytes()), None);
    }
}
