//! PDF functions, as used by the tint transforms of Separation and DeviceN
//! color spaces.
//!
//! Sampled (type 0), exponential (type 2) and stitching (type 3) functions are
//! supported. PostScript calculator functions (type 4) are not.

use crate::bit_reader::BitReader;
use crate::util::interpolate;
use log::warn;
use rime_syntax::XRef;
use rime_syntax::object::dict::keys::{
    BITS_PER_SAMPLE, BOUNDS, C0, C1, DECODE, DOMAIN, ENCODE, FUNCTION_TYPE, FUNCTIONS, N, RANGE,
    SIZE,
};
use rime_syntax::object::{Array, Dict, Object};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

/// The input or output values of a function.
pub(crate) type Values = SmallVec<[f32; 4]>;
type TupleVec = SmallVec<[(f32, f32); 4]>;

const MAX_SAMPLED_INPUTS: usize = 8;
const MAX_DEPTH: u8 = 8;

/// A PDF function.
#[derive(Debug, Clone)]
pub(crate) struct Function(Arc<FunctionType>);

#[derive(Debug)]
enum FunctionType {
    Sampled(Sampled),
    Exponential(Exponential),
    Stitching(Stitching),
}

impl Function {
    /// Create a new function from a dictionary or stream object.
    pub(crate) fn new(object: &Object, xref: &XRef) -> Option<Self> {
        Self::new_inner(object, xref, 0)
    }

    fn new_inner(object: &Object, xref: &XRef, depth: u8) -> Option<Self> {
        if depth > MAX_DEPTH {
            warn!("function nesting is too deep");

            return None;
        }

        let object = xref.resolve(object)?;
        let dict = object.as_dict()?;

        let function = match dict.get::<u8>(FUNCTION_TYPE)? {
            0 => {
                let Object::Stream(stream) = &object else {
                    warn!("sampled function is not a stream");

                    return None;
                };

                let data = stream.decoded(xref).ok()?;

                FunctionType::Sampled(Sampled::new(dict, &data)?)
            }
            2 => FunctionType::Exponential(Exponential::new(dict)?),
            3 => FunctionType::Stitching(Stitching::new(dict, xref, depth)?),
            4 => {
                warn!("PostScript calculator functions are not supported");

                return None;
            }
            t => {
                warn!("unknown function type {t}");

                return None;
            }
        };

        Some(Self(Arc::new(function)))
    }

    /// Evaluate the function.
    pub(crate) fn eval(&self, input: &[f32]) -> Option<Values> {
        match self.0.as_ref() {
            FunctionType::Sampled(s) => s.eval(input),
            FunctionType::Exponential(e) => e.eval(input),
            FunctionType::Stitching(s) => s.eval(input),
        }
    }
}

fn tuples(array: &Array) -> TupleVec {
    let values = array.iter_as::<f32>().collect::<SmallVec<[f32; 8]>>();

    values.chunks_exact(2).map(|c| (c[0], c[1])).collect()
}

#[derive(Debug)]
struct Clamper {
    domain: TupleVec,
    range: Option<TupleVec>,
}

impl Clamper {
    fn new(dict: &Dict) -> Option<Self> {
        let domain = tuples(&dict.get::<Array>(DOMAIN)?);
        let range = dict.get::<Array>(RANGE).map(|r| tuples(&r));

        Some(Self { domain, range })
    }

    fn clamp_input(&self, input: &mut [f32]) {
        for (x, (min, max)) in input.iter_mut().zip(self.domain.iter()) {
            *x = x.clamp(*min, max.max(*min));
        }
    }

    fn clamp_output(&self, output: &mut [f32]) {
        if let Some(range) = &self.range {
            for (x, (min, max)) in output.iter_mut().zip(range.iter()) {
                *x = x.clamp(*min, max.max(*min));
            }
        }
    }
}

/// A type 0 function.
#[derive(Debug)]
struct Sampled {
    clamper: Clamper,
    range: TupleVec,
    sizes: SmallVec<[u32; 4]>,
    encode: TupleVec,
    decode: TupleVec,
    max_sample: f32,
    samples: Vec<u32>,
}

impl Sampled {
    fn new(dict: &Dict, data: &[u8]) -> Option<Self> {
        let bits_per_sample = dict.get::<u8>(BITS_PER_SAMPLE)?;

        if !matches!(bits_per_sample, 1 | 2 | 4 | 8 | 12 | 16 | 24 | 32) {
            warn!("invalid bits per sample {bits_per_sample} in sampled function");

            return None;
        }

        let clamper = Clamper::new(dict)?;
        let range = clamper.range.clone()?;
        let sizes = dict
            .get::<Array>(SIZE)?
            .iter_as::<u32>()
            .collect::<SmallVec<[u32; 4]>>();

        if sizes.is_empty()
            || sizes.len() > MAX_SAMPLED_INPUTS
            || sizes.len() != clamper.domain.len()
            || range.is_empty()
            || sizes.contains(&0)
        {
            warn!("invalid sampled function");

            return None;
        }

        let encode = dict
            .get::<Array>(ENCODE)
            .map(|a| tuples(&a))
            .unwrap_or_else(|| sizes.iter().map(|s| (0.0, (*s - 1) as f32)).collect());
        let decode = dict
            .get::<Array>(DECODE)
            .map(|a| tuples(&a))
            .unwrap_or_else(|| range.clone());

        let expected = sizes
            .iter()
            .try_fold(range.len(), |acc, s| acc.checked_mul(*s as usize))?;
        let mut reader = BitReader::new(data);
        let mut samples = Vec::with_capacity(expected.min(data.len() * 8));

        while samples.len() < expected
            && let Some(sample) = reader.read(bits_per_sample)
        {
            samples.push(sample);
        }

        if samples.len() != expected {
            warn!("sampled function is missing {} samples", expected - samples.len());
            samples.resize(expected, 0);
        }

        Some(Self {
            clamper,
            range,
            sizes,
            encode,
            decode,
            max_sample: ((1_u64 << bits_per_sample) - 1) as f32,
            samples,
        })
    }

    fn eval(&self, input: &[f32]) -> Option<Values> {
        if input.len() != self.sizes.len() {
            warn!("wrong number of arguments for sampled function");

            return None;
        }

        let mut input = Values::from_slice(input);
        self.clamper.clamp_input(&mut input);

        let num_outputs = self.range.len();
        let mut floors = SmallVec::<[usize; 4]>::new();
        let mut fractions = SmallVec::<[f32; 4]>::new();
        let mut strides = SmallVec::<[usize; 4]>::new();
        let mut stride = num_outputs;

        for (i, x) in input.iter().enumerate() {
            let (d0, d1) = self.clamper.domain[i];
            let (e0, e1) = self.encode.get(i).copied().unwrap_or((0.0, 0.0));
            let size = self.sizes[i];
            let e = interpolate(*x, d0, d1, e0, e1).clamp(0.0, (size - 1) as f32);
            let floor = e.floor();

            floors.push(floor as usize);
            fractions.push(e - floor);
            strides.push(stride);
            stride *= size as usize;
        }

        let mut out = smallvec![0.0; num_outputs];

        // Multilinear interpolation over the corners of the enclosing cell.
        for corner in 0..(1_usize << input.len()) {
            let mut weight = 1.0;
            let mut index = 0;

            for i in 0..input.len() {
                let upper = corner & (1 << i) != 0;
                let max_index = self.sizes[i] as usize - 1;

                if upper {
                    weight *= fractions[i];
                    index += (floors[i] + 1).min(max_index) * strides[i];
                } else {
                    weight *= 1.0 - fractions[i];
                    index += floors[i] * strides[i];
                }
            }

            if weight == 0.0 {
                continue;
            }

            for (j, out) in out.iter_mut().enumerate() {
                *out += weight * *self.samples.get(index + j)? as f32;
            }
        }

        for (j, out) in out.iter_mut().enumerate() {
            let (d0, d1) = self.decode.get(j).copied().unwrap_or(self.range[j]);
            *out = interpolate(*out, 0.0, self.max_sample, d0, d1);
        }

        self.clamper.clamp_output(&mut out);

        Some(out)
    }
}

/// A type 2 function.
#[derive(Debug)]
struct Exponential {
    clamper: Clamper,
    c0: Values,
    c1: Values,
    n: f32,
}

impl Exponential {
    fn new(dict: &Dict) -> Option<Self> {
        let clamper = Clamper::new(dict)?;
        let c0 = dict
            .get::<Array>(C0)
            .map(|a| a.iter_as::<f32>().collect())
            .unwrap_or_else(|| smallvec![0.0]);
        let c1 = dict
            .get::<Array>(C1)
            .map(|a| a.iter_as::<f32>().collect())
            .unwrap_or_else(|| smallvec![1.0]);
        let n = dict.get::<f32>(N)?;

        if c0.len() != c1.len() {
            warn!("C0 and C1 of exponential function have different lengths");

            return None;
        }

        Some(Self { clamper, c0, c1, n })
    }

    fn eval(&self, input: &[f32]) -> Option<Values> {
        let mut x = [*input.first()?];
        self.clamper.clamp_input(&mut x);
        let x = x[0].powf(self.n);

        let mut out = self
            .c0
            .iter()
            .zip(self.c1.iter())
            .map(|(c0, c1)| c0 + x * (c1 - c0))
            .collect::<Values>();
        self.clamper.clamp_output(&mut out);

        Some(out)
    }
}

/// A type 3 function.
#[derive(Debug)]
struct Stitching {
    clamper: Clamper,
    functions: Vec<Function>,
    bounds: Vec<f32>,
    encode: TupleVec,
}

impl Stitching {
    fn new(dict: &Dict, xref: &XRef, depth: u8) -> Option<Self> {
        let clamper = Clamper::new(dict)?;
        let functions = xref
            .get::<Array>(dict, FUNCTIONS)?
            .iter()
            .map(|f| Function::new_inner(f, xref, depth + 1))
            .collect::<Option<Vec<_>>>()?;
        let bounds = xref
            .get::<Array>(dict, BOUNDS)?
            .iter_as::<f32>()
            .collect::<Vec<_>>();
        let encode = tuples(&xref.get::<Array>(dict, ENCODE)?);

        if functions.is_empty()
            || bounds.len() + 1 != functions.len()
            || encode.len() != functions.len()
            || clamper.domain.is_empty()
        {
            warn!("invalid stitching function");

            return None;
        }

        Some(Self {
            clamper,
            functions,
            bounds,
            encode,
        })
    }

    fn eval(&self, input: &[f32]) -> Option<Values> {
        let mut x = [*input.first()?];
        self.clamper.clamp_input(&mut x);
        let x = x[0];
        let (d0, d1) = self.clamper.domain[0];

        let index = self
            .bounds
            .iter()
            .position(|b| x < *b)
            .unwrap_or(self.bounds.len());
        let low = if index == 0 { d0 } else { self.bounds[index - 1] };
        let high = self.bounds.get(index).copied().unwrap_or(d1);
        let (e0, e1) = self.encode[index];

        let mut out = self.functions[index].eval(&[interpolate(x, low, high, e0, e1)])?;
        self.clamper.clamp_output(&mut out);

        Some(out)
    }
}
