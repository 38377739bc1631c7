//! JSON encoding of snapshot values.
//!
//! Numeric arrays of either flavor encode to plain nested lists; maps encode
//! to objects with stringified keys; user objects encode to their fields.

use super::{DType, Key, NdArray, Value};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::None => serializer.serialize_unit(),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::Int(v) => serializer.serialize_i64(*v),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Str(s) => serializer.serialize_str(s),
            Value::List(items) | Value::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    match k {
                        Key::Int(i) => map.serialize_entry(&i.to_string(), v)?,
                        Key::Str(s) => map.serialize_entry(s, v)?,
                    }
                }
                map.end()
            }
            Value::Object { fields, .. } => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (name, v) in fields {
                    map.serialize_entry(name, v)?;
                }
                map.end()
            }
            Value::Array(arr) => NestedSlice::of(arr).serialize(serializer),
        }
    }
}

/// A view over one axis of a row-major array.
struct NestedSlice<'a> {
    shape: &'a [usize],
    data: &'a [f64],
    dtype: DType,
}

impl<'a> NestedSlice<'a> {
    fn of(arr: &'a NdArray) -> Self {
        Self {
            shape: arr.shape(),
            data: arr.data(),
            dtype: arr.dtype(),
        }
    }
}

impl Serialize for NestedSlice<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let Some((&n, rest)) = self.shape.split_first() else {
            return match (self.dtype, self.data.first()) {
                (DType::Int, Some(v)) => serializer.serialize_i64(*v as i64),
                (DType::Float, Some(v)) => serializer.serialize_f64(*v),
                (_, None) => serializer.serialize_unit(),
            };
        };
        let stride: usize = rest.iter().product();
        let mut seq = serializer.serialize_seq(Some(n))?;
        for i in 0..n {
            seq.serialize_element(&NestedSlice {
                shape: rest,
                data: &self.data[i * stride..(i + 1) * stride],
                dtype: self.dtype,
            })?;
        }
        seq.end()
    }
}
