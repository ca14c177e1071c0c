use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// A PDF name, without the leading slash and with `#xx` escapes resolved.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Name(Arc<[u8]>);

impl Name {
    /// Create a new name from unescaped bytes.
    pub fn new(data: &[u8]) -> Self {
        Self(data.into())
    }

    /// Create a name from the raw bytes of a name token, resolving `#xx` escapes.
    pub fn from_escaped(data: &[u8]) -> Self {
        if !data.contains(&b'#') {
            return Self::new(data);
        }

        let mut cleaned = Vec::with_capacity(data.len());
        let mut i = 0;

        while i < data.len() {
            let b = data[i];

            if b == b'#'
                && let Some(hex) = data.get(i + 1..i + 3)
                && let (Some(hi), Some(lo)) = (hex_value(hex[0]), hex_value(hex[1]))
            {
                cleaned.push(hi << 4 | lo);
                i += 3;
            } else {
                cleaned.push(b);
                i += 1;
            }
        }

        Self(cleaned.into())
    }

    /// Returns the name as a string, replacing invalid UTF-8.
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'0'..=b'9' => Some(c - b'0'),
        _ => None,
    }
}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl Deref for Name {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Borrow<[u8]> for Name {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq<[u8]> for Name {
    fn eq(&self, other: &[u8]) -> bool {
        *self.0 == *other
    }
}

impl PartialEq<&[u8]> for Name {
    fn eq(&self, other: &&[u8]) -> bool {
        *self.0 == **other
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.as_str())
    }
}
