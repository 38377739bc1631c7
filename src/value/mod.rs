//! Structured snapshot values.
//!
//! Watched locals are converted into a [`Value`] at every traced line. A value
//! owns all of its data, so a snapshot is a deep copy of whatever the traced
//! function held at that point and later mutation cannot leak into history.
//!
//! The model keeps two representations of the same data:
//! - the canonical repr (see `repr.rs`), used for change detection
//! - the JSON encoding (see `json.rs`), used by the record sink

pub mod convert;
pub mod json;
pub mod repr;

pub use convert::ToValue;

use std::collections::BTreeMap;

/// A map key. Maps may be keyed by integers or by strings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Str(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Str(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Map(BTreeMap<Key, Value>),
    /// A user-defined record with named fields.
    Object {
        class: String,
        fields: BTreeMap<String, Value>,
    },
    Array(NdArray),
}

impl Value {
    /// Build an object value from `(field, value)` pairs.
    pub fn object<I, S>(class: &str, fields: I) -> Value
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        Value::Object {
            class: class.to_string(),
            fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "map",
            Value::Object { .. } => "object",
            Value::Array(_) => "array",
        }
    }
}

/// Element type of a numeric array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Int,
    Float,
}

/// Which numeric container produced the array. Only affects the repr; both
/// flavors encode to the same plain nested lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    NdArray,
    Tensor,
}

/// A dense, row-major numeric array.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<f64>,
    dtype: DType,
    flavor: Flavor,
}

impl NdArray {
    /// Build an array from flat row-major data. Returns `None` when the data
    /// length does not match the shape.
    pub fn from_shape_vec(shape: Vec<usize>, data: Vec<f64>) -> Option<Self> {
        if shape.iter().product::<usize>() != data.len() {
            return None;
        }
        Some(Self {
            shape,
            data,
            dtype: DType::Float,
            flavor: Flavor::NdArray,
        })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; len],
            dtype: DType::Float,
            flavor: Flavor::NdArray,
        }
    }

    pub fn from_ints(values: &[i64]) -> Self {
        Self {
            shape: vec![values.len()],
            data: values.iter().map(|v| *v as f64).collect(),
            dtype: DType::Int,
            flavor: Flavor::NdArray,
        }
    }

    pub fn as_tensor(mut self) -> Self {
        self.flavor = Flavor::Tensor;
        self
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn len(&self) -> usize {
        self.shape.first().copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Mutable access to the element at a flat row-major offset.
    pub fn get_mut(&mut self, offset: usize) -> Option<&mut f64> {
        self.data.get_mut(offset)
    }

    /// Concatenate two 1-d arrays. The result keeps the flavor of `self` and
    /// widens to float when either side is float.
    pub fn concat(&self, other: &NdArray) -> Option<NdArray> {
        if self.shape.len() != 1 || other.shape.len() != 1 {
            return None;
        }
        let mut data = self.data.clone();
        data.extend_from_slice(&other.data);
        let dtype = if self.dtype == DType::Int && other.dtype == DType::Int {
            DType::Int
        } else {
            DType::Float
        };
        Some(NdArray {
            shape: vec![data.len()],
            data,
            dtype,
            flavor: self.flavor,
        })
    }

    /// Select along the first axis. A 1-d array yields a scalar, higher ranks
    /// yield a sub-array.
    pub fn index(&self, idx: usize) -> Option<Value> {
        let (&first, rest) = self.shape.split_first()?;
        if idx >= first {
            return None;
        }
        if rest.is_empty() {
            let v = self.data[idx];
            return Some(match self.dtype {
                DType::Int => Value::Int(v as i64),
                DType::Float => Value::Float(v),
            });
        }
        let stride: usize = rest.iter().product();
        let start = idx * stride;
        Some(Value::Array(NdArray {
            shape: rest.to_vec(),
            data: self.data[start..start + stride].to_vec(),
            dtype: self.dtype,
            flavor: self.flavor,
        }))
    }
}
