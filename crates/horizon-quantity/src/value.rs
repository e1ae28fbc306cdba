//! The dynamic value model.
//!
//! Every quantity stores a [`Value`] whose variant is fixed by the quantity's
//! declared [`DType`] (or an [`NdArray`] of that dtype for array quantities).
//! Inputs of any variant are converted with [`DType::coerce`] or
//! [`NdArray::coerce`]; conversion either succeeds with a value of the
//! declared type or fails with [`Error::TypeCoercion`].

use std::fmt;

use serde_json::Value as Json;

use crate::error::{Error, Result};

/// The element type of a quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    /// Signed 64-bit integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Str,
}

impl DType {
    /// Short name of the type.
    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "str",
        }
    }

    /// Whether values of this type carry a numeric magnitude.
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }

    /// The value a new quantity of this type starts from.
    pub fn zero(self) -> Value {
        match self {
            Self::Int => Value::Int(0),
            Self::Float => Value::Float(0.0),
            Self::Bool => Value::Bool(false),
            Self::Str => Value::Str(String::new()),
        }
    }

    /// Convert a scalar to this type.
    ///
    /// Arrays are never accepted. See the crate documentation for the
    /// conversion table.
    pub fn coerce(self, input: &Value) -> Result<Value> {
        match (self, input) {
            (_, Value::Array(_)) => Err(Error::coercion(self, input, "arrays are not scalars")),

            (Self::Int, Value::Int(i)) => Ok(Value::Int(*i)),
            (Self::Int, Value::Float(x)) => float_to_int(*x)
                .map(Value::Int)
                .ok_or_else(|| Error::coercion(self, input, "not a finite integer-sized number")),
            (Self::Int, Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
            (Self::Int, Value::Str(s)) => parse_int(s)
                .map(Value::Int)
                .ok_or_else(|| Error::coercion(self, input, "not an integer literal")),

            (Self::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
            (Self::Float, Value::Float(x)) => Ok(Value::Float(*x)),
            (Self::Float, Value::Bool(b)) => Ok(Value::Float(if *b { 1.0 } else { 0.0 })),
            (Self::Float, Value::Str(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|err| Error::coercion(self, input, err.to_string())),

            (Self::Bool, Value::Bool(b)) => Ok(Value::Bool(*b)),
            (Self::Bool, Value::Int(i)) => Ok(Value::Bool(*i != 0)),
            (Self::Bool, Value::Float(x)) => Ok(Value::Bool(*x != 0.0)),
            (Self::Bool, Value::Str(s)) => parse_bool(s)
                .map(Value::Bool)
                .ok_or_else(|| Error::coercion(self, input, "not a boolean word")),

            (Self::Str, Value::Str(s)) => Ok(Value::Str(s.clone())),
            (Self::Str, other) => Ok(Value::Str(other.to_settings_string())),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn float_to_int(x: f64) -> Option<i64> {
    let truncated = x.trunc();
    if truncated.is_finite() && truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
        Some(truncated as i64)
    } else {
        None
    }
}

/// Integers, plus float literals with no fractional part ("1e3", "5.0").
fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(i) = s.parse::<i64>() {
        return Some(i);
    }
    let x = s.parse::<f64>().ok()?;
    if x.fract() == 0.0 { float_to_int(x) } else { None }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// A dynamically typed quantity value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Array(NdArray),
}

impl Value {
    /// The scalar type of this value, `None` for arrays.
    pub fn dtype(&self) -> Option<DType> {
        match self {
            Self::Int(_) => Some(DType::Int),
            Self::Float(_) => Some(DType::Float),
            Self::Bool(_) => Some(DType::Bool),
            Self::Str(_) => Some(DType::Str),
            Self::Array(_) => None,
        }
    }

    /// Numeric view of an int, float or bool.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Integer view of an int, float (truncated) or bool.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Float(x) => float_to_int(*x),
            Self::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Truth value of an int, float or bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Int(i) => Some(*i != 0),
            Self::Float(x) => Some(*x != 0.0),
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Borrow a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow an array value.
    pub fn as_array(&self) -> Option<&NdArray> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Full-precision text form, parseable back by coercion.
    ///
    /// Floats use the shortest representation that round-trips exactly;
    /// arrays use a JSON nested list.
    pub fn to_settings_string(&self) -> String {
        match self {
            Self::Int(i) => i.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Str(s) => s.clone(),
            Self::Array(a) => a.to_json_string(),
        }
    }

    fn to_json(&self) -> Json {
        match self {
            Self::Int(i) => Json::from(*i),
            Self::Float(x) => Json::from(*x),
            Self::Bool(b) => Json::from(*b),
            Self::Str(s) => Json::from(s.as_str()),
            Self::Array(a) => a.to_json(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_settings_string())
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<NdArray> for Value {
    fn from(v: NdArray) -> Self {
        Self::Array(v)
    }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self {
        Self::Array(NdArray::from_vec(v.into_iter().map(Value::Float).collect()))
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Self::Array(NdArray::from_vec(v.into_iter().map(Value::Int).collect()))
    }
}

/// A dense, row-major, n-dimensional array of scalars.
///
/// Equality is shape first, then element-wise: `[1, 2]` and `[1, 2, 0]` are
/// different, and so are a 1x2 and a 2x1 array with the same elements.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<Value>,
}

impl NdArray {
    /// Build an array from a shape and row-major data.
    pub fn new(shape: Vec<usize>, data: Vec<Value>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(Error::coercion(
                "array",
                &shape,
                format!("shape holds {expected} elements but {} were given", data.len()),
            ));
        }
        if let Some(nested) = data.iter().find(|v| matches!(v, Value::Array(_))) {
            return Err(Error::coercion("array", nested, "elements must be scalars"));
        }
        Ok(Self { shape, data })
    }

    /// A one-dimensional array.
    pub fn from_vec(data: Vec<Value>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// An empty one-dimensional array.
    pub fn empty() -> Self {
        Self::from_vec(Vec::new())
    }

    /// The extent along each axis.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Elements in row-major order.
    pub fn data(&self) -> &[Value] {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Elements as floats, if they are all numeric.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        self.data.iter().map(Value::as_f64).collect()
    }

    /// Convert an arbitrary input into an array of `dtype` elements.
    ///
    /// Text is parsed as a JSON literal first. A bare scalar becomes a
    /// zero-dimensional array.
    pub fn coerce(dtype: DType, input: &Value) -> Result<Self> {
        match input {
            Value::Array(array) => array.cast(dtype),
            Value::Str(text) => Self::parse(dtype, text),
            scalar => Ok(Self {
                shape: Vec::new(),
                data: vec![dtype.coerce(scalar)?],
            }),
        }
    }

    /// Parse a JSON nested list into an array of `dtype` elements.
    pub fn parse(dtype: DType, text: &str) -> Result<Self> {
        let json: Json = serde_json::from_str(text.trim())
            .map_err(|err| Error::coercion(format!("{dtype} array"), text, err.to_string()))?;
        let mut shape = Vec::new();
        let mut data = Vec::new();
        collect_json(&json, 0, &mut shape, &mut data)
            .map_err(|reason| Error::coercion(format!("{dtype} array"), text, reason))?;
        Self { shape, data }.cast(dtype)
    }

    /// Convert every element to `dtype`, keeping the shape.
    pub fn cast(&self, dtype: DType) -> Result<Self> {
        let data = self
            .data
            .iter()
            .map(|v| dtype.coerce(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            shape: self.shape.clone(),
            data,
        })
    }

    /// Serialize as a JSON nested list.
    pub fn to_json_string(&self) -> String {
        self.to_json().to_string()
    }

    fn to_json(&self) -> Json {
        if self.shape.is_empty() {
            return self.data.first().map(Value::to_json).unwrap_or(Json::Null);
        }
        nest(&self.shape, &self.data)
    }
}

fn nest(shape: &[usize], data: &[Value]) -> Json {
    match shape {
        [] => Json::Null,
        [_] => Json::Array(data.iter().map(Value::to_json).collect()),
        [outer, rest @ ..] => {
            let stride: usize = rest.iter().product();
            Json::Array(
                (0..*outer)
                    .map(|i| nest(rest, &data[i * stride..(i + 1) * stride]))
                    .collect(),
            )
        }
    }
}

/// Walk a JSON literal, recording the shape on first visit to each depth and
/// rejecting ragged or mixed nesting.
fn collect_json(
    json: &Json,
    depth: usize,
    shape: &mut Vec<usize>,
    data: &mut Vec<Value>,
) -> std::result::Result<(), String> {
    match json {
        Json::Array(items) => {
            if depth == shape.len() {
                if !data.is_empty() {
                    return Err("ragged nesting".to_owned());
                }
                shape.push(items.len());
            } else if depth > shape.len() || shape[depth] != items.len() {
                return Err(format!("ragged list at depth {depth}"));
            }
            for item in items {
                collect_json(item, depth + 1, shape, data)?;
            }
            Ok(())
        }
        scalar => {
            if depth != shape.len() {
                return Err(format!("scalar found at depth {depth}, expected a list"));
            }
            data.push(json_scalar(scalar)?);
            Ok(())
        }
    }
}

fn json_scalar(json: &Json) -> std::result::Result<Value, String> {
    match json {
        Json::Bool(b) => Ok(Value::Bool(*b)),
        Json::Number(n) => n
            .as_i64()
            .map(Value::Int)
            .or_else(|| n.as_f64().map(Value::Float))
            .ok_or_else(|| format!("unsupported number {n}")),
        Json::String(s) => Ok(Value::Str(s.clone())),
        Json::Null => Err("null is not a value".to_owned()),
        Json::Array(_) | Json::Object(_) => Err("objects are not supported".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_coercion() {
        assert_eq!(DType::Int.coerce(&Value::Float(3.9)).unwrap(), Value::Int(3));
        assert_eq!(DType::Int.coerce(&Value::Float(-3.9)).unwrap(), Value::Int(-3));
        assert_eq!(DType::Int.coerce(&Value::Bool(true)).unwrap(), Value::Int(1));
        assert_eq!(DType::Int.coerce(&" 42 ".into()).unwrap(), Value::Int(42));
        assert_eq!(DType::Int.coerce(&"1e3".into()).unwrap(), Value::Int(1000));
        assert!(DType::Int.coerce(&"3.5".into()).unwrap_err().is_coercion());
        assert!(DType::Int.coerce(&Value::Float(f64::NAN)).is_err());
    }

    #[test]
    fn test_float_coercion() {
        assert_eq!(DType::Float.coerce(&Value::Int(5)).unwrap(), Value::Float(5.0));
        assert_eq!(DType::Float.coerce(&"2.5e-3".into()).unwrap(), Value::Float(0.0025));
        let err = DType::Float.coerce(&"abc".into()).unwrap_err();
        assert!(err.is_coercion());
        assert!(err.to_string().contains("float"));
    }

    #[test]
    fn test_bool_coercion() {
        assert_eq!(DType::Bool.coerce(&"False".into()).unwrap(), Value::Bool(false));
        assert_eq!(DType::Bool.coerce(&"on".into()).unwrap(), Value::Bool(true));
        assert_eq!(DType::Bool.coerce(&Value::Float(0.0)).unwrap(), Value::Bool(false));
        assert!(DType::Bool.coerce(&"maybe".into()).is_err());
    }

    #[test]
    fn test_str_coercion() {
        assert_eq!(DType::Str.coerce(&Value::Int(7)).unwrap(), Value::Str("7".into()));
        assert_eq!(DType::Str.coerce(&Value::Bool(true)).unwrap(), Value::Str("true".into()));
    }

    #[test]
    fn test_scalar_rejects_array() {
        let array: Value = vec![1.0, 2.0].into();
        assert!(DType::Float.coerce(&array).is_err());
    }

    #[test]
    fn test_array_parse_nested() {
        let a = NdArray::parse(DType::Float, "[[1, 2, 3], [4, 5, 6]]").unwrap();
        assert_eq!(a.shape(), &[2, 3]);
        assert_eq!(a.data()[4], Value::Float(5.0));
        assert_eq!(a.to_json_string(), "[[1.0,2.0,3.0],[4.0,5.0,6.0]]");
    }

    #[test]
    fn test_array_parse_rejects_ragged() {
        assert!(NdArray::parse(DType::Int, "[[1, 2], [3]]").is_err());
        assert!(NdArray::parse(DType::Int, "[[1, 2], 3]").is_err());
        assert!(NdArray::parse(DType::Int, "[1, [2, 3]]").is_err());
        assert!(NdArray::parse(DType::Int, "[1, null]").is_err());
    }

    #[test]
    fn test_array_equality_is_shape_sensitive() {
        let short = NdArray::parse(DType::Int, "[1, 2]").unwrap();
        let long = NdArray::parse(DType::Int, "[1, 2, 0]").unwrap();
        assert_ne!(short, long);

        let row = NdArray::parse(DType::Int, "[[1, 2]]").unwrap();
        let column = NdArray::parse(DType::Int, "[[1], [2]]").unwrap();
        assert_ne!(row, column);
        assert_eq!(row.data(), column.data());
    }

    #[test]
    fn test_array_new_checks_length() {
        assert!(NdArray::new(vec![2, 2], vec![Value::Int(1); 3]).is_err());
        assert!(NdArray::new(vec![2, 2], vec![Value::Int(1); 4]).is_ok());
    }

    #[test]
    fn test_zero_dimensional_array() {
        let a = NdArray::coerce(DType::Float, &Value::Int(3)).unwrap();
        assert!(a.shape().is_empty());
        assert_eq!(a.to_json_string(), "3.0");
        assert_eq!(NdArray::parse(DType::Float, "3.0").unwrap(), a);
    }

    #[test]
    fn test_empty_array_json() {
        assert_eq!(NdArray::empty().to_json_string(), "[]");
        assert_eq!(NdArray::parse(DType::Int, "[]").unwrap(), NdArray::empty());
    }
}
