//! Runtime values read from records and literals carried by expression trees.
//!
//! [`Value`] is borrowed from the record (or constant) it was read from and is
//! what lowered expressions evaluate to. [`Literal`] is the owned counterpart
//! stored inside constant nodes and synthesized record slots.

use std::cmp::Ordering;
use std::fmt;

use crate::error::{Result, SculptError};
use crate::traits::Reflect;
use crate::types::DataType;

/// Runtime value, borrowed from the source record or constant.
///
/// Optional members do not have a separate representation: a present value
/// of an `Option<T>` member reads as the inner value, an absent one as
/// [`Value::Null`].
///
/// # Example
///
/// ```
/// use sculpt::{Value, Number};
///
/// let v = Value::Number(Number::I64(3));
/// assert!(v.is_equal(&Value::Number(Number::I64(3))));
/// assert!(Value::Null.is_equal(&Value::Null));
/// ```
#[derive(Clone, Copy)]
pub enum Value<'a> {
    /// Absent value of an optional member.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(Number),
    /// String value (borrowed).
    String(&'a str),
    /// Timestamp value (milliseconds since Unix epoch).
    Timestamp(Timestamp),
    /// Enum discriminant value.
    Enum(u32),
    /// Nested record, accessed through its reflection capability.
    Record(&'a dyn Reflect),
}

impl<'a> Value<'a> {
    /// Returns `true` if this is a `Null` value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` if this is a `Record` value.
    pub fn is_record(&self) -> bool {
        matches!(self, Value::Record(_))
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the number value, if present.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Extracts the boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extracts the nested record, if present.
    pub fn as_record(&self) -> Option<&'a dyn Reflect> {
        match self {
            Value::Record(r) => Some(*r),
            _ => None,
        }
    }

    /// Lifted equality: `null == null` holds, `null == x` does not.
    pub fn is_equal(&self, other: &Value<'_>) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a.compare(*b) == Some(Ordering::Equal),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            (Value::Enum(a), Value::Enum(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => same_record(*a, *b),
            _ => false,
        }
    }

    /// Copies this value into an owned literal.
    ///
    /// Returns `None` for records, which have no literal representation.
    pub fn to_literal(&self) -> Option<Literal> {
        Some(match self {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => Literal::Number(*n),
            Value::String(s) => Literal::String((*s).to_string()),
            Value::Timestamp(t) => Literal::Timestamp(*t),
            Value::Enum(d) => Literal::Enum(*d),
            Value::Record(_) => return None,
        })
    }

    /// Short name of the runtime kind, used in error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Timestamp(_) => "timestamp",
            Value::Enum(_) => "enum",
            Value::Record(_) => "record",
        }
    }
}

fn same_record(a: &dyn Reflect, b: &dyn Reflect) -> bool {
    std::ptr::eq(
        a as *const dyn Reflect as *const (),
        b as *const dyn Reflect as *const (),
    )
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.is_equal(other),
        }
    }
}

impl fmt::Debug for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Number(n) => f.debug_tuple("Number").field(n).finish(),
            Value::String(s) => f.debug_tuple("String").field(s).finish(),
            Value::Timestamp(t) => f.debug_tuple("Timestamp").field(t).finish(),
            Value::Enum(d) => f.debug_tuple("Enum").field(d).finish(),
            Value::Record(r) => f
                .debug_tuple("Record")
                .field(&r.record_type().name())
                .finish(),
        }
    }
}

/// Numeric value supporting all common numeric types.
///
/// Numbers are stored in one of three variants to preserve precision:
/// - `I64` for signed integers
/// - `U64` for unsigned integers
/// - `F64` for floating point
///
/// Comparisons between different numeric variants convert to `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Signed 64-bit integer.
    I64(i64),
    /// Unsigned 64-bit integer.
    U64(u64),
    /// 64-bit floating point.
    F64(f64),
}

impl Number {
    /// Converts the number to f64 for comparison.
    pub fn to_f64(self) -> f64 {
        match self {
            Number::I64(n) => n as f64,
            Number::U64(n) => n as f64,
            Number::F64(n) => n,
        }
    }

    /// Compares two numbers, handling mixed types.
    pub fn compare(self, other: Number) -> Option<Ordering> {
        match (self, other) {
            (Number::I64(a), Number::I64(b)) => Some(a.cmp(&b)),
            (Number::U64(a), Number::U64(b)) => Some(a.cmp(&b)),
            (Number::F64(a), Number::F64(b)) => a.partial_cmp(&b),
            _ => self.to_f64().partial_cmp(&other.to_f64()),
        }
    }

    /// The data type a literal of this variant has on its own.
    pub fn data_type(self) -> DataType {
        match self {
            Number::I64(_) => DataType::Int,
            Number::U64(_) => DataType::UInt,
            Number::F64(_) => DataType::Float,
        }
    }

    fn to_int(self) -> Option<i64> {
        match self {
            Number::I64(n) => Some(n),
            Number::U64(n) => i64::try_from(n).ok(),
            Number::F64(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
                Some(f as i64)
            }
            Number::F64(_) => None,
        }
    }

    fn to_uint(self) -> Option<u64> {
        match self {
            Number::I64(n) => u64::try_from(n).ok(),
            Number::U64(n) => Some(n),
            Number::F64(f) if f.fract() == 0.0 && f >= 0.0 && f <= u64::MAX as f64 => Some(f as u64),
            Number::F64(_) => None,
        }
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.compare(*other)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::I64(n) => write!(f, "{}", n),
            Number::U64(n) => write!(f, "{}", n),
            Number::F64(n) => write!(f, "{}", n),
        }
    }
}

macro_rules! number_from {
    ($variant:ident, $target:ty: $($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(n: $t) -> Self {
                    Number::$variant(n as $target)
                }
            }
        )*
    };
}

number_from!(I64, i64: i8, i16, i32, i64, isize);
number_from!(U64, u64: u8, u16, u32, u64, usize);
number_from!(F64, f64: f32, f64);

/// Timestamp value represented as milliseconds since Unix epoch.
///
/// ```
/// use sculpt::Timestamp;
///
/// assert!(Timestamp(1000) < Timestamp(2000));
/// assert_eq!(Timestamp::from_secs(2).as_millis(), 2000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Creates a new timestamp from milliseconds since Unix epoch.
    pub fn from_millis(millis: i64) -> Self {
        Timestamp(millis)
    }

    /// Creates a new timestamp from seconds since Unix epoch.
    pub fn from_secs(secs: i64) -> Self {
        Timestamp(secs * 1000)
    }

    /// Returns the timestamp as milliseconds since Unix epoch.
    pub fn as_millis(self) -> i64 {
        self.0
    }

    /// Returns the timestamp as seconds since Unix epoch.
    pub fn as_secs(self) -> i64 {
        self.0 / 1000
    }
}

/// Owned literal, stored in constant nodes and synthesized record slots.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// The null value of an optional type.
    Null,
    /// Boolean literal.
    Bool(bool),
    /// Numeric literal.
    Number(Number),
    /// String literal.
    String(String),
    /// Timestamp literal.
    Timestamp(Timestamp),
    /// Enum discriminant literal.
    Enum(u32),
}

impl Literal {
    /// Borrows this literal as a runtime value.
    pub fn as_value(&self) -> Value<'_> {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Number(n) => Value::Number(*n),
            Literal::String(s) => Value::String(s),
            Literal::Timestamp(t) => Value::Timestamp(*t),
            Literal::Enum(d) => Value::Enum(*d),
        }
    }

    /// Returns `true` for [`Literal::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    /// The type this literal has on its own; `None` for null.
    pub fn natural_type(&self) -> Option<DataType> {
        match self {
            Literal::Null => None,
            Literal::Bool(_) => Some(DataType::Bool),
            Literal::Number(n) => Some(n.data_type()),
            Literal::String(_) => Some(DataType::String),
            Literal::Timestamp(_) => Some(DataType::Timestamp),
            Literal::Enum(_) => Some(DataType::Enum),
        }
    }

    /// Adapts this literal to `target`.
    ///
    /// Null fits any optional type. Numbers convert between `Int`, `UInt`
    /// and `Float` when no information is lost. Anything else must already
    /// have the target type.
    pub fn coerce_to(self, target: &DataType) -> Result<Literal> {
        let mismatch = |lit: &Literal| {
            SculptError::mismatch(
                "literal conversion",
                target,
                lit.natural_type()
                    .map_or_else(|| "null".to_string(), |t| t.to_string()),
            )
        };

        if let DataType::Optional(inner) = target {
            return match self {
                Literal::Null => Ok(Literal::Null),
                other => other.coerce_to(inner),
            };
        }

        match (self, target) {
            (lit @ Literal::Bool(_), DataType::Bool)
            | (lit @ Literal::String(_), DataType::String)
            | (lit @ Literal::Timestamp(_), DataType::Timestamp)
            | (lit @ Literal::Enum(_), DataType::Enum) => Ok(lit),
            (Literal::Number(n), DataType::Int) => n
                .to_int()
                .map(|v| Literal::Number(Number::I64(v)))
                .ok_or_else(|| mismatch(&Literal::Number(n))),
            (Literal::Number(n), DataType::UInt) => n
                .to_uint()
                .map(|v| Literal::Number(Number::U64(v)))
                .ok_or_else(|| mismatch(&Literal::Number(n))),
            (Literal::Number(n), DataType::Float) => Ok(Literal::Number(Number::F64(n.to_f64()))),
            (lit, _) => Err(mismatch(&lit)),
        }
    }

    /// Default slot value for `ty`: null for optional types, zero values otherwise.
    pub fn default_for(ty: &DataType) -> Option<Literal> {
        Some(match ty {
            DataType::Optional(_) => Literal::Null,
            DataType::Bool => Literal::Bool(false),
            DataType::Int => Literal::Number(Number::I64(0)),
            DataType::UInt => Literal::Number(Number::U64(0)),
            DataType::Float => Literal::Number(Number::F64(0.0)),
            DataType::String => Literal::String(String::new()),
            DataType::Timestamp => Literal::Timestamp(Timestamp::default()),
            DataType::Enum => Literal::Enum(0),
            DataType::Record(_) | DataType::Sequence(_) => return None,
        })
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write!(f, "{:?}", s),
            Literal::Timestamp(t) => write!(f, "@{}", t.0),
            Literal::Enum(d) => write!(f, "#{}", d),
        }
    }
}

macro_rules! literal_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Literal {
                fn from(n: $t) -> Self {
                    Literal::Number(Number::from(n))
                }
            }
        )*
    };
}

literal_from_number!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Bool(b)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<Timestamp> for Literal {
    fn from(t: Timestamp) -> Self {
        Literal::Timestamp(t)
    }
}

impl From<Number> for Literal {
    fn from(n: Number) -> Self {
        Literal::Number(n)
    }
}

impl<T: Into<Literal>> From<Option<T>> for Literal {
    fn from(value: Option<T>) -> Self {
        value.map_or(Literal::Null, Into::into)
    }
}
