//! Ordering of runtime values.
//!
//! Provides [`Dir`] for sort direction and the comparison helpers the
//! reference engine sorts with. Nulls sort after every other value in both
//! directions, and NaN floats sort just before the nulls.

use std::cmp::Ordering;

use crate::value::{Literal, Number, Value};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dir {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl Dir {
    /// Direction of an `apply_order` call.
    pub fn from_descending(descending: bool) -> Self {
        if descending {
            Dir::Desc
        } else {
            Dir::Asc
        }
    }

    /// Applies this direction to an ordering.
    ///
    /// For `Asc`, returns the ordering unchanged.
    /// For `Desc`, reverses the ordering.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Dir::Asc => ordering,
            Dir::Desc => ordering.reverse(),
        }
    }

    /// Returns the display name of this direction.
    pub fn as_str(self) -> &'static str {
        match self {
            Dir::Asc => "asc",
            Dir::Desc => "desc",
        }
    }
}

impl std::fmt::Display for Dir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Compares two values of the same type.
///
/// Returns `None` if the types don't match or comparison is not possible (NaN
/// or records).
pub fn compare_values(a: &Value<'_>, b: &Value<'_>) -> Option<Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.compare(*b),
        (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
        (Value::Enum(a), Value::Enum(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),

        // Null values sort last
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Greater),
        (_, Value::Null) => Some(Ordering::Less),

        _ => None,
    }
}

/// Compares two sort keys in direction `dir`, keeping NaN and nulls last.
pub fn compare_directed(a: &Value<'_>, b: &Value<'_>, dir: Dir) -> Option<Ordering> {
    match (trailing_rank(a), trailing_rank(b)) {
        (0, 0) => compare_values(a, b).map(|o| dir.apply(o)),
        (ra, rb) => Some(ra.cmp(&rb)),
    }
}

// Values that sort after every ordinary value, regardless of direction.
fn trailing_rank(value: &Value<'_>) -> u8 {
    match value {
        Value::Null => 2,
        Value::Number(Number::F64(f)) if f.is_nan() => 1,
        _ => 0,
    }
}

/// Compares two rows' precomputed keys, one direction per key.
///
/// Uses the first key as the primary sort key, the second to break ties, etc.
/// Keys that cannot be compared count as equal.
pub fn compare_keys(a: &[Literal], b: &[Literal], dirs: &[Dir]) -> Ordering {
    for ((ka, kb), dir) in a.iter().zip(b).zip(dirs) {
        if let Some(ordering) = compare_directed(&ka.as_value(), &kb.as_value(), *dir) {
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
    }
    Ordering::Equal
}
