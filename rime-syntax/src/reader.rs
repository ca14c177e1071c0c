//! Byte-level scanning of PDF data.

use core::ops::Range;

/// A cursor over PDF bytes.
///
/// All reading methods return `None` instead of panicking once the data is
/// exhausted, leaving the position untouched.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Start reading at the beginning of `data`.
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self::new_with(data, 0)
    }

    /// Start reading `data` at `offset`.
    #[inline]
    pub fn new_with(data: &'a [u8], offset: usize) -> Self {
        Self { data, offset }
    }

    /// Whether there is nothing left to read.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// Set the position.
    #[inline]
    pub fn jump(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// The unread part of the data.
    #[inline]
    pub fn tail(&self) -> Option<&'a [u8]> {
        self.data.get(self.offset..)
    }

    /// The length of the whole data, independent of the position.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the whole data is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// An arbitrary slice of the whole data.
    #[inline]
    pub fn range(&self, range: Range<usize>) -> Option<&'a [u8]> {
        self.data.get(range)
    }

    /// The current position.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Consume `len` bytes.
    #[inline]
    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        let bytes = self.peek_bytes(len)?;
        self.offset += bytes.len();

        Some(bytes)
    }

    /// Consume one byte.
    #[inline]
    pub fn read_byte(&mut self) -> Option<u8> {
        self.read_bytes(1).map(|b| b[0])
    }

    /// Look at the next `len` bytes without consuming them.
    #[inline]
    pub fn peek_bytes(&self, len: usize) -> Option<&'a [u8]> {
        let end = self.offset.checked_add(len)?;

        self.data.get(self.offset..end)
    }

    /// Look at the next byte without consuming it.
    #[inline]
    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Skip one byte.
    #[inline]
    pub fn forward(&mut self) {
        self.offset += 1;
    }

    /// Skip the next byte if it matches `f`.
    #[inline]
    pub fn forward_if(&mut self, f: impl Fn(u8) -> bool) -> Option<()> {
        let b = self.peek_byte()?;
        f(b).then(|| self.forward())
    }

    /// Skip all bytes matching `f`, failing if not even one does.
    #[inline]
    pub fn forward_while_1(&mut self, f: impl Fn(u8) -> bool) -> Option<()> {
        let start = self.offset;
        self.forward_while(f);

        (self.offset > start).then_some(())
    }

    /// Skip `tag` if the data continues with it.
    #[inline]
    pub fn forward_tag(&mut self, tag: &[u8]) -> Option<()> {
        self.peek_tag(tag)?;
        self.offset += tag.len();

        Some(())
    }

    /// Skip all bytes matching `f`.
    #[inline]
    pub fn forward_while(&mut self, f: impl Fn(u8) -> bool) {
        let skipped = self
            .tail()
            .map(|tail| tail.iter().take_while(|b| f(**b)).count())
            .unwrap_or(0);

        self.offset += skipped;
    }

    /// Whether the data continues with `tag`.
    #[inline]
    pub fn peek_tag(&self, tag: &[u8]) -> Option<()> {
        self.peek_bytes(tag.len())
            .filter(|bytes| *bytes == tag)
            .map(|_| ())
    }

    /// Skip white space and `%` comments.
    pub fn skip_white_spaces_and_comments(&mut self) {
        loop {
            match self.peek_byte() {
                Some(b) if is_white_space_character(b) => self.forward(),
                Some(b'%') => self.forward_while(|b| !is_eol_character(b)),
                _ => break,
            }
        }
    }

    /// Skip one end-of-line marker, which is `\r\n`, `\r` or `\n`.
    pub fn skip_eol(&mut self) {
        if self.forward_tag(b"\r\n").is_none() {
            let _ = self.forward_if(is_eol_character);
        }
    }
}

/// Whether the byte is PDF white space.
#[inline(always)]
pub fn is_white_space_character(char: u8) -> bool {
    matches!(char, b'\0' | b'\t' | b'\n' | b'\x0c' | b'\r' | b' ')
}

/// Whether the byte is a delimiter.
#[inline(always)]
pub fn is_delimiter_character(char: u8) -> bool {
    matches!(
        char,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Whether the byte is neither white space nor a delimiter.
#[inline(always)]
pub fn is_regular_character(char: u8) -> bool {
    !is_white_space_character(char) && !is_delimiter_character(char)
}

/// Whether the byte is `\r` or `\n`.
#[inline(always)]
pub fn is_eol_character(char: u8) -> bool {
    matches!(char, b'\n' | b'\r')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_and_predicates() {
        let mut r = Reader::new(b"obj  % comment\n 12");
        assert!(r.forward_tag(b"obj").is_some());
        r.skip_white_spaces_and_comments();
        assert_eq!(r.peek_byte(), Some(b'1'));
        assert!(r.forward_while_1(|b| b.is_ascii_alphabetic()).is_none());
        assert!(r.forward_while_1(|b| b.is_ascii_digit()).is_some());
        assert!(r.at_end());
        assert_eq!(r.read_byte(), None);
    }

    #[test]
    fn line_endings() {
        let mut r = Reader::new(b"\r\n\rx");
        r.skip_eol();
        assert_eq!(r.offset(), 2);
        r.skip_eol();
        assert_eq!(r.peek_byte(), Some(b'x'));
        r.skip_eol();
        assert_eq!(r.offset(), 3);
    }

    #[test]
    fn peek_past_end() {
        let r = Reader::new_with(b"ab", 1);
        assert_eq!(r.peek_bytes(usize::MAX), None);
        assert_eq!(r.peek_tag(b"bc"), None);
        assert_eq!(r.tail(), Some(&b"b"[..]));
    }

    #[test]
    fn character_classes() {
        assert!(is_regular_character(b'a'));
        assert!(!is_regular_character(b'/'));
        assert!(!is_regular_character(b'\x0c'));
        assert!(is_delimiter_character(b'%'));
    }
}
