//! Canonical string representation.
//!
//! Two snapshots are considered equal by the change detector when their reprs
//! match, so the repr must be fully structural: no addresses, no hash-order
//! dependence. Scalars print as `None`, `True`, `'text'`; objects as
//! `Cls(a=1)`; arrays as `array([...])` or `tensor([...])`.

use super::{DType, Flavor, Key, NdArray, Value};
use std::fmt::{self, Display, Write};

impl Value {
    pub fn repr(&self) -> String {
        self.to_string()
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write_float(f, *v),
            Value::Str(s) => write_quoted(f, s),
            Value::List(items) => {
                f.write_char('[')?;
                write_items(f, items)?;
                f.write_char(']')
            }
            Value::Tuple(items) => {
                f.write_char('(')?;
                write_items(f, items)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Value::Map(entries) => {
                f.write_char('{')?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_char('}')
            }
            Value::Object { class, fields } => {
                write!(f, "{}(", class)?;
                for (i, (name, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", name, v)?;
                }
                f.write_char(')')
            }
            Value::Array(arr) => arr.fmt(f),
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{}", v),
            Key::Str(s) => write_quoted(f, s),
        }
    }
}

impl Display for NdArray {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.flavor() {
            Flavor::NdArray => "array",
            Flavor::Tensor => "tensor",
        };
        write!(f, "{}(", name)?;
        write_nested(f, self.shape(), self.data(), self.dtype())?;
        f.write_char(')')
    }
}

fn write_items(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", v)?;
    }
    Ok(())
}

fn write_float(f: &mut fmt::Formatter<'_>, v: f64) -> fmt::Result {
    if v.is_nan() {
        f.write_str("nan")
    } else if v.is_infinite() {
        f.write_str(if v > 0.0 { "inf" } else { "-inf" })
    } else {
        write!(f, "{:?}", v)
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\'' => f.write_str("\\'")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            _ => f.write_char(c)?,
        }
    }
    f.write_char('\'')
}

fn write_nested(
    f: &mut fmt::Formatter<'_>,
    shape: &[usize],
    data: &[f64],
    dtype: DType,
) -> fmt::Result {
    let Some((&n, rest)) = shape.split_first() else {
        // 0-d array: a single scalar
        return match (dtype, data.first()) {
            (DType::Int, Some(v)) => write!(f, "{}", *v as i64),
            (DType::Float, Some(v)) => write_float(f, *v),
            (_, None) => Ok(()),
        };
    };
    let stride: usize = rest.iter().product();
    f.write_char('[')?;
    for i in 0..n {
        if i > 0 {
            f.write_str(", ")?;
        }
        if rest.is_empty() {
            match dtype {
                DType::Int => write!(f, "{}", data[i] as i64)?,
                DType::Float => write_float(f, data[i])?,
            }
        } else {
            write_nested(f, rest, &data[i * stride..(i + 1) * stride], dtype)?;
        }
    }
    f.write_char(']')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;

    #[test]
    fn scalars() {
        assert_eq!(Value::None.repr(), "None");
        assert_eq!(Value::Bool(true).repr(), "True");
        assert_eq!(Value::Int(-3).repr(), "-3");
        assert_eq!(Value::Float(2.0).repr(), "2.0");
        assert_eq!(Value::Float(f64::NAN).repr(), "nan");
        assert_eq!(Value::Str("it's".into()).repr(), r"'it\'s'");
    }

    #[test]
    fn containers() {
        let mut map = BTreeMap::new();
        map.insert(Key::from("a"), Value::List(vec![Value::Int(1), Value::None]));
        map.insert(Key::Int(2), Value::Tuple(vec![Value::Int(7)]));
        assert_eq!(Value::Map(map).repr(), "{2: (7,), 'a': [1, None]}");

        let obj = Value::object("Cls", [("a", Value::Int(1)), ("b", Value::Str("x".into()))]);
        assert_eq!(obj.repr(), "Cls(a=1, b='x')");
    }

    #[test]
    fn arrays() {
        let arr = NdArray::from_shape_vec(vec![2, 2], vec![0.0, 1.0, 2.0, 3.5]).unwrap();
        assert_eq!(Value::Array(arr.clone()).repr(), "array([[0.0, 1.0], [2.0, 3.5]])");
        assert_eq!(
            Value::Array(NdArray::from_ints(&[1, 2]).as_tensor()).repr(),
            "tensor([1, 2])"
        );
    }
}
