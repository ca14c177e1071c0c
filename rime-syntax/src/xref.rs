//! The object store.

use crate::crypto::SecurityManager;
use crate::error::{Error, Result, bail};
use crate::object::{Array, Dict, FromObject, ObjRef, Object, Stream};
use crate::parse::Parser;
use log::{debug, warn};
use rustc_hash::FxHashMap;

const MAX_REFERENCE_CHAIN: usize = 32;

/// A store of indirect objects, keyed by their object reference.
///
/// The store owns the optional security manager of the document, which is used
/// to decrypt streams when they are decoded.
#[derive(Debug, Default, Clone)]
pub struct XRef {
    objects: FxHashMap<ObjRef, Object>,
    security: Option<SecurityManager>,
}

impl XRef {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a sequence of consecutive indirect object definitions.
    ///
    /// Bytes that do not form an indirect object (for example a header or an
    /// `xref` table) are skipped.
    pub fn from_body(data: &[u8]) -> Result<Self> {
        let mut xref = Self::new();
        let mut parser = Parser::new(data, false);

        loop {
            parser.r.skip_white_spaces_and_comments();

            if parser.r.at_end() {
                break;
            }

            match parser.read_indirect() {
                Some((reference, object)) => {
                    // Later definitions override earlier ones, as in incremental updates.
                    xref.objects.insert(reference, object);
                }
                None => {
                    parser.r.forward();
                }
            }
        }

        if xref.objects.is_empty() && !data.is_empty() {
            bail!(Error::MalformedStructure("no indirect objects found"));
        }

        debug!("parsed {} indirect objects", xref.objects.len());

        Ok(xref)
    }

    /// Attach a security manager.
    pub fn with_security(mut self, security: SecurityManager) -> Self {
        self.security = Some(security);

        self
    }

    /// The security manager of the document, if it is encrypted.
    pub fn security(&self) -> Option<&SecurityManager> {
        self.security.as_ref()
    }

    /// Insert an indirect object.
    ///
    /// Strings and streams inside the object are attributed to `reference`
    /// unless they already know their owner.
    pub fn insert(&mut self, reference: ObjRef, object: impl Into<Object>) {
        self.objects.insert(reference, adopt(object.into(), reference));
    }

    /// The number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Get an indirect object without following further references.
    pub fn get_object(&self, reference: ObjRef) -> Option<&Object> {
        self.objects.get(&reference)
    }

    /// Resolve an object, following references until a direct object is found.
    pub fn resolve(&self, object: &Object) -> Option<Object> {
        let mut current = object;

        for _ in 0..MAX_REFERENCE_CHAIN {
            match current {
                Object::Reference(r) => match self.objects.get(r) {
                    Some(next) => current = next,
                    None => {
                        warn!("failed to resolve reference {r}");

                        return None;
                    }
                },
                other => return Some(other.clone()),
            }
        }

        warn!("reference chain is too long");

        None
    }

    /// Resolve a reference.
    pub fn resolve_ref(&self, reference: ObjRef) -> Option<Object> {
        self.resolve(&Object::Reference(reference))
    }

    /// Resolve an object and convert it to `T`.
    pub fn resolve_as<T: FromObject>(&self, object: &Object) -> Option<T> {
        T::from_object(&self.resolve(object)?)
    }

    /// Get a dictionary entry, following references, converted to `T`.
    pub fn get<T: FromObject>(&self, dict: &Dict, key: &[u8]) -> Option<T> {
        self.resolve_as(dict.get_raw(key)?)
    }

    /// Get a dictionary entry as a dictionary, also accepting the dictionary of a
    /// stream.
    pub fn get_dict(&self, dict: &Dict, key: &[u8]) -> Option<Dict> {
        self.resolve(dict.get_raw(key)?)?.as_dict().cloned()
    }

    /// Get an array element, following references, converted to `T`.
    pub fn get_item<T: FromObject>(&self, array: &Array, index: usize) -> Option<T> {
        self.resolve_as(array.get_raw(index)?)
    }

    /// Decrypt and fully decode a stream.
    pub fn decode_stream(&self, stream: &Stream) -> Result<Vec<u8>> {
        stream.decoded(self)
    }
}

fn adopt(object: Object, owner: ObjRef) -> Object {
    match object {
        Object::String(s) if s.owner().is_none() => Object::String(s.with_owner(owner)),
        Object::Array(a) => Object::Array(a.iter().cloned().map(|o| adopt(o, owner)).collect()),
        Object::Dict(d) => Object::Dict(
            d.entries()
                .map(|(k, v)| (k.clone(), adopt(v.clone(), owner)))
                .collect(),
        ),
        Object::Stream(s) if s.reference().is_none() => Object::Stream(s.with_reference(owner)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Name, PdfString};

    #[test]
    fn resolves_chains() {
        let mut xref = XRef::new();
        xref.insert(ObjRef::new(1, 0), Object::Reference(ObjRef::new(2, 0)));
        xref.insert(ObjRef::new(2, 0), 42);

        assert_eq!(xref.resolve_ref(ObjRef::new(1, 0)), Some(Object::from(42)));
        assert_eq!(xref.resolve_ref(ObjRef::new(3, 0)), None);
    }

    #[test]
    fn cycles_do_not_hang() {
        let mut xref = XRef::new();
        xref.insert(ObjRef::new(1, 0), Object::Reference(ObjRef::new(2, 0)));
        xref.insert(ObjRef::new(2, 0), Object::Reference(ObjRef::new(1, 0)));

        assert_eq!(xref.resolve_ref(ObjRef::new(1, 0)), None);
    }

    #[test]
    fn insert_assigns_owners() {
        let mut xref = XRef::new();
        let dict = Dict::from_iter([(b"T".as_slice(), Object::String(PdfString::from("x")))]);
        xref.insert(ObjRef::new(9, 0), dict);

        let stored = xref.get_object(ObjRef::new(9, 0)).unwrap().as_dict().unwrap();
        assert_eq!(
            stored.get::<PdfString>(b"T").unwrap().owner(),
            Some(ObjRef::new(9, 0))
        );
    }

    #[test]
    fn body_parsing() {
        let body = b"%PDF-1.7\n1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n\
                     2 0 obj << /Type /Pages /Kids [] /Count 0 >> endobj\n\
                     xref\n0 1\ntrailer << /Root 1 0 R >>";
        let xref = XRef::from_body(body).unwrap();

        assert_eq!(xref.len(), 2);
        let catalog = xref.resolve_ref(ObjRef::new(1, 0)).unwrap();
        let pages = xref.get::<Dict>(catalog.as_dict().unwrap(), b"Pages").unwrap();
        assert_eq!(pages.get::<Name>(b"Type"), Some(Name::new(b"Pages")));
    }

    #[test]
    fn empty_body_is_malformed() {
        assert!(XRef::from_body(b"garbage").is_err());
    }
}
