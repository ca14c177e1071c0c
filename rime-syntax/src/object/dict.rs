//! Dictionaries.

use crate::object::{FromObject, Name, Object, ObjRef};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// A PDF dictionary.
///
/// Dictionaries are immutable once shared. [`Dict::insert`] copies the
/// underlying map if it is referenced from more than one place.
#[derive(Clone, Default, PartialEq)]
pub struct Dict(Arc<FxHashMap<Name, Object>>);

impl Dict {
    /// Create a new, empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry.
    pub fn insert(&mut self, key: impl Into<Name>, value: impl Into<Object>) {
        Arc::make_mut(&mut self.0).insert(key.into(), value.into());
    }

    /// Returns the raw object stored under the key, without resolving references.
    pub fn get_raw(&self, key: &[u8]) -> Option<&Object> {
        self.0.get(key)
    }

    /// Returns the entry under the key converted to `T`.
    ///
    /// References are not followed. Use [`crate::XRef::get`] for entries that may
    /// be indirect.
    pub fn get<T: FromObject>(&self, key: &[u8]) -> Option<T> {
        T::from_object(self.0.get(key)?)
    }

    /// Returns the object reference stored under the key, if the entry is indirect.
    pub fn get_ref(&self, key: &[u8]) -> Option<ObjRef> {
        match self.0.get(key)? {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Whether the dictionary contains the key.
    pub fn contains_key(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    /// Returns an iterator over all keys in the dictionary.
    pub fn keys(&self) -> impl Iterator<Item = &Name> {
        self.0.keys()
    }

    /// Returns an iterator over all entries in the dictionary, sorted by key.
    pub fn entries(&self) -> impl Iterator<Item = (&Name, &Object)> {
        let mut entries = self.0.iter().collect::<Vec<_>>();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        entries.into_iter()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&[u8]> for Name {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl<const N: usize> From<&[u8; N]> for Name {
    fn from(value: &[u8; N]) -> Self {
        Self::new(value)
    }
}

impl<K: Into<Name>, V: Into<Object>> FromIterator<(K, V)> for Dict {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(Arc::new(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        ))
    }
}

impl fmt::Debug for Dict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries()).finish()
    }
}

/// A collection of possible keys in a PDF dictionary.
#[allow(missing_docs)]
pub mod keys {
    macro_rules! key {
        ($i:ident, $e:expr) => {
            pub const $i: &'static [u8] = $e;
        };
    }

    // A
    key!(AESV2, b"AESV2");
    key!(AIS, b"AIS");
    key!(ALL, b"All");
    key!(ALL_OFF, b"AllOff");
    key!(ALL_ON, b"AllOn");
    key!(ALTERNATE, b"Alternate");
    key!(ANY_OFF, b"AnyOff");
    key!(ANY_ON, b"AnyOn");
    key!(AP, b"AP");

    // B
    key!(BASE_STATE, b"BaseState");
    key!(BBOX, b"BBox");
    key!(BITS_PER_COMPONENT, b"BitsPerComponent");
    key!(BITS_PER_SAMPLE, b"BitsPerSample");
    key!(BLACK_IS_1, b"BlackIs1");
    key!(BLACK_POINT, b"BlackPoint");
    key!(BOUNDS, b"Bounds");
    key!(BYTE_RANGE, b"ByteRange");

    // C
    key!(C0, b"C0");
    key!(C1, b"C1");
    key!(CA, b"CA");
    key!(CAL_GRAY, b"CalGray");
    key!(CAL_RGB, b"CalRGB");
    key!(CA_NS, b"ca");
    key!(CCF, b"CCF");
    key!(CCITTFAX_DECODE, b"CCITTFaxDecode");
    key!(CF, b"CF");
    key!(CFM, b"CFM");
    key!(COLORS, b"Colors");
    key!(COLOR_SPACE, b"ColorSpace");
    key!(COLOR_TRANSFORM, b"ColorTransform");
    key!(COLUMNS, b"Columns");
    key!(CONTACT_INFO, b"ContactInfo");
    key!(CONTENTS, b"Contents");

    // D
    key!(D, b"D");
    key!(DCT, b"DCT");
    key!(DCT_DECODE, b"DCTDecode");
    key!(DECODE, b"Decode");
    key!(DECODE_PARMS, b"DecodeParms");
    key!(DESTS, b"Dests");
    key!(DEVICE_CMYK, b"DeviceCMYK");
    key!(DEVICE_GRAY, b"DeviceGray");
    key!(DEVICE_N, b"DeviceN");
    key!(DEVICE_RGB, b"DeviceRGB");
    key!(DOMAIN, b"Domain");
    key!(DP, b"DP");

    // E
    key!(EARLY_CHANGE, b"EarlyChange");
    key!(EMBEDDED_FILES, b"EmbeddedFiles");
    key!(ENCODE, b"Encode");
    key!(ENCODED_BYTE_ALIGN, b"EncodedByteAlign");
    key!(ENCRYPT_META_DATA, b"EncryptMetadata");
    key!(EXT_G_STATE, b"ExtGState");

    // F
    key!(F, b"F");
    key!(FILTER, b"Filter");
    key!(FORM, b"Form");
    key!(FUNCTION, b"Function");
    key!(FUNCTIONS, b"Functions");
    key!(FUNCTION_TYPE, b"FunctionType");

    // G
    key!(G, b"G");
    key!(GAMMA, b"Gamma");

    // H
    key!(H, b"H");
    key!(HEIGHT, b"Height");

    // I
    key!(I, b"I");
    key!(ICC_BASED, b"ICCBased");
    key!(IDENTITY, b"Identity");
    key!(IM, b"IM");
    key!(IMAGE, b"Image");
    key!(IMAGE_MASK, b"ImageMask");
    key!(INDEXED, b"Indexed");
    key!(INTERPOLATE, b"Interpolate");

    // J
    key!(JAVA_SCRIPT, b"JavaScript");
    key!(JBIG2_DECODE, b"JBIG2Decode");
    key!(JBIG2_GLOBALS, b"JBIG2Globals");
    key!(JPX_DECODE, b"JPXDecode");

    // K
    key!(K, b"K");
    key!(KIDS, b"Kids");

    // L
    key!(LAB, b"Lab");
    key!(LC, b"LC");
    key!(LENGTH, b"Length");
    key!(LIMITS, b"Limits");
    key!(LJ, b"LJ");
    key!(LOCATION, b"Location");
    key!(LW, b"LW");

    // M
    key!(M, b"M");
    key!(MASK, b"Mask");
    key!(MATRIX, b"Matrix");
    key!(ML, b"ML");

    // N
    key!(N, b"N");
    key!(NAME, b"Name");
    key!(NAMES, b"Names");
    key!(NONE, b"None");

    // O
    key!(O, b"O");
    key!(OC, b"OC");
    key!(OCG, b"OCG");
    key!(OCGS, b"OCGs");
    key!(OCMD, b"OCMD");
    key!(OC_PROPERTIES, b"OCProperties");
    key!(OFF, b"OFF");
    key!(ON, b"ON");

    // P
    key!(P, b"P");
    key!(PATTERN, b"Pattern");
    key!(PREDICTOR, b"Predictor");
    key!(PROPERTIES, b"Properties");

    // R
    key!(R, b"R");
    key!(RANGE, b"Range");
    key!(REASON, b"Reason");
    key!(RESOURCES, b"Resources");
    key!(ROWS, b"Rows");

    // S
    key!(SEPARATION, b"Separation");
    key!(SIZE, b"Size");
    key!(SMASK, b"SMask");
    key!(SMASK_IN_DATA, b"SMaskInData");
    key!(STANDARD, b"Standard");
    key!(STD_CF, b"StdCF");
    key!(STM_F, b"StmF");
    key!(STR_F, b"StrF");
    key!(SUBTYPE, b"Subtype");
    key!(SUB_FILTER, b"SubFilter");

    // T
    key!(TYPE, b"Type");

    // U
    key!(U, b"U");

    // V
    key!(V, b"V");
    key!(V2, b"V2");

    // W
    key!(W, b"W");
    key!(WHITE_POINT, b"WhitePoint");
    key!(WIDTH, b"Width");

    // X
    key!(XOBJECT, b"XObject");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Number;

    #[test]
    fn insert_does_not_affect_clones() {
        let mut a = Dict::from_iter([(keys::WIDTH, Object::from(10))]);
        let b = a.clone();
        a.insert(keys::HEIGHT, 20);

        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
        assert_eq!(b.get::<u32>(keys::WIDTH), Some(10));
    }

    #[test]
    fn get_ref_only_for_references() {
        let dict = Dict::from_iter([
            (keys::KIDS, Object::Reference(ObjRef::new(4, 0))),
            (keys::N, Object::Number(Number::Integer(3))),
        ]);

        assert_eq!(dict.get_ref(keys::KIDS), Some(ObjRef::new(4, 0)));
        assert_eq!(dict.get_ref(keys::N), None);
    }
}
