use std::collections::{btree_map, BTreeMap};

use serde::ser::{Error as _, Serialize, Serializer};

use crate::Error;

// Largest magnitude up to which every whole number is exactly representable as an `f64`.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// A single dimension value.
///
/// Values can be nested arbitrarily deep through [`Value::Sequence`] and [`Value::Map`].
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// Absent value, encoded as `null`.
    Null,

    /// Boolean.
    Bool(bool),

    /// Signed integer.
    Integer(i64),

    /// Unsigned integer that may not fit into an `i64`.
    UnsignedInteger(u64),

    /// Floating-point number.
    ///
    /// Only finite values can be encoded. Whole numbers are written without a fractional part, so `2.0` is encoded
    /// as `2`.
    Float(f64),

    /// String.
    String(String),

    /// Ordered sequence of values.
    Sequence(Vec<Value>),

    /// Nested dimensions.
    Map(Dimensions),
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(value) => serializer.serialize_bool(*value),
            Value::Integer(value) => serializer.serialize_i64(*value),
            Value::UnsignedInteger(value) => serializer.serialize_u64(*value),
            Value::Float(value) if value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER => {
                serializer.serialize_i64(*value as i64)
            }
            Value::Float(value) if value.is_finite() => serializer.serialize_f64(*value),
            Value::Float(value) => Err(S::Error::custom(format_args!("unsupported value: {value}"))),
            Value::String(value) => serializer.serialize_str(value),
            Value::Sequence(values) => serializer.collect_seq(values),
            Value::Map(dimensions) => dimensions.serialize(serializer),
        }
    }
}

macro_rules! impl_from_integer {
    ($($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Integer(i64::from(value))
                }
            }
        )+
    };
}

impl_from_integer!(i8, i16, i32, u8, u16, u32);

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::UnsignedInteger(value)
    }
}

impl From<isize> for Value {
    fn from(value: isize) -> Self {
        // `isize` is at most 64 bits wide on every supported target.
        Value::Integer(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::UnsignedInteger(value as u64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<Dimensions> for Value {
    fn from(value: Dimensions) -> Self {
        Value::Map(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Value::Sequence(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Clone + Into<Value>> From<&[T]> for Value {
    fn from(values: &[T]) -> Self {
        Value::Sequence(values.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(values: [T; N]) -> Self {
        Value::Sequence(values.into_iter().map(Into::into).collect())
    }
}

/// Key/value context attached to a single measure.
///
/// Keys are kept sorted, which makes the JSON encoding canonical: objects are always written with their keys in
/// lexicographic order, at every nesting level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dimensions {
    inner: BTreeMap<String, Value>,
}

impl Dimensions {
    /// Creates an empty set of dimensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a dimension, returning the previous value for the key, if any.
    pub fn insert<K, V>(&mut self, key: K, value: V) -> Option<Value>
    where
        K: Into<String>,
        V: Into<Value>,
    {
        self.inner.insert(key.into(), value.into())
    }

    /// Gets the value of a dimension.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.inner.get(key)
    }

    /// Removes a dimension, returning its value, if any.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.inner.remove(key)
    }

    /// Returns the number of dimensions.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if there are no dimensions.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterates over the dimensions in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.inner.iter()
    }

    /// Encodes the dimensions as a compact JSON object with sorted keys.
    ///
    /// # Errors
    ///
    /// If any value, at any depth, is a non-finite floating-point number, an error is returned.
    pub fn to_json(&self) -> Result<Vec<u8>, Error> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for Dimensions {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(&self.inner)
    }
}

impl<K, V> FromIterator<(K, V)> for Dimensions
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut dimensions = Dimensions::new();
        dimensions.extend(iter);
        dimensions
    }
}

impl<K, V> Extend<(K, V)> for Dimensions
where
    K: Into<String>,
    V: Into<Value>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a> IntoIterator for &'a Dimensions {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for Dimensions {
    type Item = (String, Value);
    type IntoIter = btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

/// Builds [`Dimensions`] from `key => value` pairs.
///
/// ```
/// # use measures::dimensions;
/// let sizes = dimensions! { "XL" => 20, "L" => 10, "M" => 5 };
/// assert_eq!(sizes.to_json().unwrap(), br#"{"L":10,"M":5,"XL":20}"#);
/// ```
#[macro_export]
macro_rules! dimensions {
    () => {
        $crate::Dimensions::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut dimensions = $crate::Dimensions::new();
        $(
            dimensions.insert($key, $value);
        )+
        dimensions
    }};
}

#[cfg(test)]
mod tests {
    use proptest::{collection::btree_map as arb_btree_map, prelude::*, proptest};

    use super::{Dimensions, Value};
    use crate::Error;

    fn encode(dimensions: &Dimensions) -> String {
        String::from_utf8(dimensions.to_json().expect("should encode")).expect("should be UTF-8")
    }

    #[test]
    fn keys_are_sorted() {
        let sizes = dimensions! { "XL" => 20, "L" => 10, "M" => 5 };
        assert_eq!(encode(&sizes), r#"{"L":10,"M":5,"XL":20}"#);
    }

    #[test]
    fn nested_keys_are_sorted_and_sequences_keep_order() {
        let book = dimensions! {
            "title" => dimensions! { "title" => "Blood Meridian", "subtitle" => "The Evening Redness in the west" },
            "author" => dimensions! { "first" => "Cormac", "last" => "McCarthy" },
            "characters" => vec!["The Kid", "The Judge"],
        };

        assert_eq!(
            encode(&book),
            r#"{"author":{"first":"Cormac","last":"McCarthy"},"characters":["The Kid","The Judge"],"title":{"subtitle":"The Evening Redness in the west","title":"Blood Meridian"}}"#
        );
    }

    #[test]
    fn scalar_values() {
        let cases = [
            (Value::Null, "null"),
            (Value::from(None::<i32>), "null"),
            (Value::from(Some(7u8)), "7"),
            (Value::from(true), "true"),
            (Value::from(-42i32), "-42"),
            (Value::from(u64::MAX), "18446744073709551615"),
            (Value::from(4.19), "4.19"),
            (Value::from(0.5f32), "0.5"),
            (Value::from(2.0), "2"),
            (Value::from(-3.0f32), "-3"),
            (Value::from(1e300), "1e300"),
            (Value::from("quote \" and \\ slash"), r#""quote \" and \\ slash""#),
            (Value::from([1, 2, 3]), "[1,2,3]"),
            (Value::Sequence(Vec::new()), "[]"),
            (Value::from(Dimensions::new()), "{}"),
        ];

        for (value, expected) in cases {
            let actual = serde_json::to_string(&value).expect("should encode");
            assert_eq!(actual, expected, "encoding {value:?}");
        }
    }

    #[test]
    fn non_finite_floats_fail() {
        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let nested = dimensions! { "outer" => dimensions! { "inner" => vec![value] } };
            let result = nested.to_json();
            assert!(matches!(result, Err(Error::Serialization(_))), "got {result:?}");
        }
    }

    #[test]
    fn insert_overwrites() {
        let mut dimensions = dimensions! { "metric" => "spoofed" };
        let previous = dimensions.insert("metric", "real");
        assert_eq!(previous, Some(Value::from("spoofed")));
        assert_eq!(dimensions.get("metric"), Some(&Value::from("real")));
        assert_eq!(dimensions.len(), 1);
    }

    #[test]
    fn remove_drops_key() {
        let mut dimensions = dimensions! { "stars" => 2.0, "title" => "Blood Meridian" };
        assert_eq!(encode(&dimensions), r#"{"stars":2,"title":"Blood Meridian"}"#);

        assert_eq!(dimensions.remove("title"), Some(Value::from("Blood Meridian")));
        assert_eq!(dimensions.remove("title"), None);
        assert_eq!(encode(&dimensions), r#"{"stars":2}"#);
    }

    #[test]
    fn collect_from_pairs() {
        let dimensions: Dimensions = [("b", 2), ("a", 1)].into_iter().collect();
        assert_eq!(encode(&dimensions), r#"{"a":1,"b":2}"#);
        assert!(!dimensions.is_empty());
        assert!(dimensions!().is_empty());
    }

    proptest! {
        #[test]
        fn flat_encoding_is_sorted_by_key(map in arb_btree_map("[a-zA-Z_]{1,12}", any::<i64>(), 0..16)) {
            let dimensions: Dimensions = map.iter().map(|(k, v)| (k.clone(), *v)).collect();

            let mut expected = String::from("{");
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    expected.push(',');
                }
                expected.push_str(&format!("\"{key}\":{}", map[*key]));
            }
            expected.push('}');

            prop_assert_eq!(encode(&dimensions), expected);
        }
    }
}
