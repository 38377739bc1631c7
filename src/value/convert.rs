//! Conversion of Rust data into snapshot values.

use super::{Key, NdArray, Value};
use std::collections::{BTreeMap, HashMap};

/// Produce an owned snapshot of `self`.
///
/// Implement this for your own types to make them watchable; records usually
/// map to [`Value::object`]:
///
/// ```
/// use ztrace::{ToValue, Value};
///
/// struct Point { x: i64, y: i64 }
///
/// impl ToValue for Point {
///     fn to_value(&self) -> Value {
///         Value::object("Point", [("x", self.x.to_value()), ("y", self.y.to_value())])
///     }
/// }
///
/// assert_eq!(Point { x: 1, y: 2 }.to_value().repr(), "Point(x=1, y=2)");
/// ```
pub trait ToValue {
    fn to_value(&self) -> Value;
}

impl ToValue for Value {
    fn to_value(&self) -> Value {
        self.clone()
    }
}

impl ToValue for NdArray {
    fn to_value(&self) -> Value {
        Value::Array(self.clone())
    }
}

impl ToValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }
}

macro_rules! int_to_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    Value::Int(*self as i64)
                }
            }
        )*
    };
}

int_to_value!(i8, i16, i32, i64, isize, u8, u16, u32);

// Unsigned values above i64::MAX lose their exact value but keep their sign
// and magnitude.
macro_rules! wide_to_value {
    ($($t:ty),*) => {
        $(
            impl ToValue for $t {
                fn to_value(&self) -> Value {
                    match i64::try_from(*self) {
                        Ok(v) => Value::Int(v),
                        Err(_) => Value::Float(*self as f64),
                    }
                }
            }
        )*
    };
}

wide_to_value!(u64, usize);

impl ToValue for f32 {
    fn to_value(&self) -> Value {
        Value::Float(*self as f64)
    }
}

impl ToValue for f64 {
    fn to_value(&self) -> Value {
        Value::Float(*self)
    }
}

impl ToValue for str {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl ToValue for String {
    fn to_value(&self) -> Value {
        Value::Str(self.clone())
    }
}

impl ToValue for char {
    fn to_value(&self) -> Value {
        Value::Str(self.to_string())
    }
}

impl<T: ToValue + ?Sized> ToValue for &T {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue + ?Sized> ToValue for Box<T> {
    fn to_value(&self) -> Value {
        (**self).to_value()
    }
}

impl<T: ToValue> ToValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::None,
        }
    }
}

impl<T: ToValue> ToValue for [T] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(ToValue::to_value).collect())
    }
}

impl<T: ToValue, const N: usize> ToValue for [T; N] {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

impl<T: ToValue> ToValue for Vec<T> {
    fn to_value(&self) -> Value {
        self.as_slice().to_value()
    }
}

/// Keys that can index a snapshot map.
pub trait ToKey {
    fn to_key(&self) -> Key;
}

impl ToKey for String {
    fn to_key(&self) -> Key {
        Key::Str(self.clone())
    }
}

impl ToKey for &str {
    fn to_key(&self) -> Key {
        Key::Str(self.to_string())
    }
}

macro_rules! int_to_key {
    ($($t:ty),*) => {
        $(
            impl ToKey for $t {
                fn to_key(&self) -> Key {
                    Key::Int(*self as i64)
                }
            }
        )*
    };
}

int_to_key!(i8, i16, i32, i64, isize, u8, u16, u32);

// keys above i64::MAX keep their exact digits as text
macro_rules! wide_to_key {
    ($($t:ty),*) => {
        $(
            impl ToKey for $t {
                fn to_key(&self) -> Key {
                    match i64::try_from(*self) {
                        Ok(v) => Key::Int(v),
                        Err(_) => Key::Str(self.to_string()),
                    }
                }
            }
        )*
    };
}

wide_to_key!(u64, usize);

impl<K: ToKey, V: ToValue> ToValue for BTreeMap<K, V> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_key(), v.to_value())).collect())
    }
}

// Entries land in a BTreeMap, so the repr does not depend on hash order.
impl<K: ToKey, V: ToValue, S> ToValue for HashMap<K, V, S> {
    fn to_value(&self) -> Value {
        Value::Map(self.iter().map(|(k, v)| (k.to_key(), v.to_value())).collect())
    }
}

macro_rules! tuple_to_value {
    ($($name:ident)+) => {
        impl<$($name: ToValue),+> ToValue for ($($name,)+) {
            #[allow(non_snake_case)]
            fn to_value(&self) -> Value {
                let ($($name,)+) = self;
                Value::Tuple(vec![$($name.to_value()),+])
            }
        }
    };
}

tuple_to_value!(A);
tuple_to_value!(A B);
tuple_to_value!(A B C);
tuple_to_value!(A B C D);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn hash_map_is_ordered() {
        let mut m = HashMap::new();
        m.insert("b".to_string(), 2);
        m.insert("a".to_string(), 1);
        assert_eq!(m.to_value().repr(), "{'a': 1, 'b': 2}");
    }

    #[test]
    fn nested_options_and_tuples() {
        let v: Vec<Option<(i32, &str)>> = vec![None, Some((1, "x"))];
        assert_eq!(v.to_value().repr(), "[None, (1, 'x')]");
    }

    #[test]
    fn large_unsigned_values_keep_their_sign() {
        assert!(!matches!(usize::MAX.to_value(), Value::Int(v) if v < 0));
        assert_eq!(u64::MAX.to_value(), Value::Float(u64::MAX as f64));
        assert_eq!(7usize.to_value(), Value::Int(7));

        assert_eq!(u64::MAX.to_key(), Key::Str("18446744073709551615".into()));
        assert_eq!(3usize.to_key(), Key::Int(3));
        assert!(!matches!(usize::MAX.to_key(), Key::Int(v) if v < 0));
    }
}
