//! Streams.

use crate::error::{Error, Result, bail};
use crate::filter::Filter;
use crate::object::dict::keys::{DECODE_PARMS, FILTER, TYPE};
use crate::object::{Dict, Name, ObjRef, Object};
use crate::xref::XRef;
use log::warn;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

/// A PDF stream: a dictionary plus raw, possibly encoded and encrypted, data.
#[derive(Clone, PartialEq)]
pub struct Stream {
    dict: Dict,
    data: Arc<[u8]>,
    reference: Option<ObjRef>,
}

/// The result of decoding the general-purpose filters of a stream.
#[derive(Debug, Clone)]
pub struct DecodedStream {
    /// The decoded data.
    pub data: Vec<u8>,
    /// The image filter that still needs to be applied, with its parameters.
    pub image_filter: Option<(Filter, Option<Dict>)>,
}

impl Stream {
    /// Create a new stream from its dictionary and raw data.
    pub fn new(dict: Dict, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            dict,
            data: data.into(),
            reference: None,
        }
    }

    /// The stream dictionary.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    /// The raw data of the stream, before decryption and decoding.
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    /// The indirect object the stream is stored in, if known.
    pub fn reference(&self) -> Option<ObjRef> {
        self.reference
    }

    /// Returns the same stream, attributed to the given indirect object.
    pub fn with_reference(mut self, reference: ObjRef) -> Self {
        self.reference = Some(reference);

        self
    }

    /// The filters of the stream, paired with their decode parameters.
    pub fn filters(&self, xref: &XRef) -> Result<SmallVec<[(Filter, Option<Dict>); 2]>> {
        let names = match self.dict.get_raw(FILTER) {
            None => return Ok(SmallVec::new()),
            Some(obj) => match xref.resolve(obj) {
                Some(Object::Name(n)) => vec![n],
                Some(Object::Array(a)) => a
                    .iter()
                    .filter_map(|o| xref.resolve_as::<Name>(o))
                    .collect(),
                _ => bail!(Error::MalformedStructure("invalid /Filter entry")),
            },
        };

        let params = self
            .dict
            .get_raw(DECODE_PARMS)
            .and_then(|o| xref.resolve(o));

        let param = |index: usize| -> Option<Dict> {
            match &params {
                Some(Object::Dict(d)) if index == 0 => Some(d.clone()),
                Some(Object::Array(a)) => a.get_raw(index).and_then(|o| xref.resolve_as::<Dict>(o)),
                _ => None,
            }
        };

        names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                Filter::from_name(name)
                    .map(|f| (f, param(i)))
                    .ok_or(Error::UnsupportedVariant("unknown stream filter"))
            })
            .collect()
    }

    /// Decrypt the stream and apply all general-purpose filters.
    ///
    /// Decoding stops at the first image filter, which is returned alongside the
    /// data.
    pub fn decode(&self, xref: &XRef) -> Result<DecodedStream> {
        let mut data = self.decrypted(xref)?;

        for (filter, params) in self.filters(xref)? {
            if filter.is_image_filter() {
                return Ok(DecodedStream {
                    data,
                    image_filter: Some((filter, params)),
                });
            }

            data = filter
                .apply(&data, params.as_ref())
                .ok_or(Error::CodecFailure("failed to apply stream filter"))?;
        }

        Ok(DecodedStream {
            data,
            image_filter: None,
        })
    }

    /// Decrypt and fully decode the stream.
    ///
    /// Fails if the stream uses an image filter.
    pub fn decoded(&self, xref: &XRef) -> Result<Vec<u8>> {
        let decoded = self.decode(xref)?;

        if let Some((filter, _)) = decoded.image_filter {
            warn!("stream uses image filter {filter:?}");

            bail!(Error::UnsupportedVariant("stream uses an image filter"));
        }

        Ok(decoded.data)
    }

    fn decrypted(&self, xref: &XRef) -> Result<Vec<u8>> {
        // Cross-reference streams are never encrypted.
        let is_xref_stream = self.dict.get::<Name>(TYPE).is_some_and(|t| &*t == b"XRef");

        match (xref.security(), self.reference) {
            (Some(security), Some(reference)) if !is_xref_stream => {
                security.decrypt_stream(reference, &self.data)
            }
            _ => Ok(self.data.to_vec()),
        }
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stream")
            .field("dict", &self.dict)
            .field("len", &self.data.len())
            .field("reference", &self.reference)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Array;
    use crate::object::dict::keys::LENGTH;

    #[test]
    fn filter_chain_stops_at_image_filter() {
        let dict = Dict::from_iter([
            (
                FILTER,
                Object::Array(Array::from(vec![
                    Name::new(b"AHx"),
                    Name::new(b"DCTDecode"),
                ])),
            ),
            (LENGTH, Object::from(7)),
        ]);
        let stream = Stream::new(dict, b"FFD8FF>".to_vec());

        let decoded = stream.decode(&XRef::new()).unwrap();
        assert_eq!(decoded.data, vec![0xFF, 0xD8, 0xFF]);
        assert_eq!(decoded.image_filter.map(|f| f.0), Some(Filter::DctDecode));
        assert!(stream.decoded(&XRef::new()).is_err());
    }

    #[test]
    fn unfiltered() {
        let stream = Stream::new(Dict::new(), b"0 0 m".to_vec());
        assert_eq!(stream.decoded(&XRef::new()).unwrap(), b"0 0 m");
    }

    #[test]
    fn unknown_filter() {
        let dict = Dict::from_iter([(FILTER, Name::new(b"Foo"))]);
        let stream = Stream::new(dict, b"".to_vec());

        assert!(matches!(
            stream.decoded(&XRef::new()),
            Err(Error::UnsupportedVariant(_))
        ));
    }
}
