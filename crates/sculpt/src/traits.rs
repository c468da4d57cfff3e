//! The reflection capability.
//!
//! [`Reflect`] is the narrow interface every other component uses to read and
//! write record members by name; [`Entity`] adds the static descriptor of a
//! concrete Rust type. Both are normally derived with `#[derive(Reflect)]`.
//! [`Typed`], [`AsValue`] and [`FromLiteral`] describe member types and are
//! implemented here for the supported primitives.

use crate::error::{Result, SculptError};
use crate::types::{DataType, RecordType};
use crate::value::{Literal, Number, Timestamp, Value};

/// Runtime access to the members of a record.
///
/// # Derive Usage
///
/// ```
/// use sculpt::{Entity, Reflect, Value};
///
/// #[derive(Reflect)]
/// struct Task {
///     name: String,
///     priority: u8,
///     #[reflect(skip)]
///     cache: Vec<u8>,
/// }
///
/// let task = Task { name: "Write docs".into(), priority: 3, cache: vec![] };
/// assert_eq!(task.get("name"), Some(Value::String("Write docs")));
/// assert_eq!(Task::type_info().members().len(), 2);
/// assert_eq!(Task::PRIORITY, "priority");
/// ```
///
/// # Manual Implementation
///
/// ```
/// use sculpt::{DataType, Literal, Reflect, RecordType, Result, SculptError, TypeInfo, Value};
/// use sculpt::{AsValue, FromLiteral};
///
/// struct Tag {
///     label: String,
/// }
///
/// impl Reflect for Tag {
///     fn record_type(&self) -> RecordType {
///         TypeInfo::builder("Tag").property("label", DataType::String).build()
///     }
///
///     fn get(&self, member: &str) -> Option<Value<'_>> {
///         match member {
///             "label" => Some(self.label.as_value()),
///             _ => None,
///         }
///     }
///
///     fn set(&mut self, member: &str, value: Literal) -> Result<()> {
///         match member {
///             "label" => {
///                 self.label = FromLiteral::from_literal(value)?;
///                 Ok(())
///             }
///             other => Err(SculptError::MemberNotFound {
///                 type_name: "Tag".into(),
///                 member: other.into(),
///             }),
///         }
///     }
/// }
/// ```
pub trait Reflect {
    /// Descriptor of this record's type.
    fn record_type(&self) -> RecordType;

    /// Reads a member. Returns `None` if the member does not exist.
    fn get(&self, member: &str) -> Option<Value<'_>>;

    /// Writes a member, converting the literal to the member's type.
    fn set(&mut self, member: &str, value: Literal) -> Result<()>;
}

impl std::fmt::Debug for dyn Reflect + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Reflect")
            .field(&self.record_type().name())
            .finish()
    }
}

/// A record type whose descriptor is known statically.
pub trait Entity: Reflect + Sized {
    /// The descriptor shared by every instance of this type.
    fn type_info() -> RecordType;
}

/// Types that can appear as record members.
pub trait Typed {
    /// The member type this Rust type maps to.
    fn data_type() -> DataType;
}

/// Borrows a member as a runtime [`Value`].
pub trait AsValue {
    /// Returns the runtime value of `self`.
    fn as_value(&self) -> Value<'_>;
}

/// Builds a member value from an owned [`Literal`].
pub trait FromLiteral: Sized {
    /// Converts `literal`, failing with `TypeMismatch` if it does not fit.
    fn from_literal(literal: Literal) -> Result<Self>;
}

/// Unit enums usable as members, compared by discriminant.
///
/// Normally derived with `#[derive(ReflectEnum)]`, which also implements
/// [`Typed`], [`AsValue`] and [`FromLiteral`] for the enum.
pub trait ReflectEnum: Sized + Copy {
    /// Stable discriminant of this variant.
    fn discriminant(&self) -> u32;

    /// The variant with the given discriminant, if any.
    fn from_discriminant(discriminant: u32) -> Option<Self>;
}

/// Reads the value at `path` starting from `source`.
///
/// Intermediate segments must yield records; a null intermediate yields null
/// for the whole path.
pub fn read_path<'a, S: AsRef<str>>(source: &'a dyn Reflect, path: &[S]) -> Result<Value<'a>> {
    let Some((first, rest)) = path.split_first() else {
        return Err(SculptError::invalid("path", "path must have at least one segment"));
    };

    let mut current = read_member(source, first.as_ref())?;
    for segment in rest {
        current = match current {
            Value::Record(record) => read_member(record, segment.as_ref())?,
            Value::Null => return Ok(Value::Null),
            other => {
                return Err(SculptError::MemberNotFound {
                    type_name: other.kind_name().to_string(),
                    member: segment.as_ref().to_string(),
                })
            }
        };
    }
    Ok(current)
}

fn read_member<'a>(record: &'a dyn Reflect, member: &str) -> Result<Value<'a>> {
    record
        .get(member)
        .ok_or_else(|| SculptError::MemberNotFound {
            type_name: record.record_type().name().to_string(),
            member: member.to_string(),
        })
}

macro_rules! numeric_member {
    ($data_type:ident, $canonical:ident, $($t:ty),*) => {
        $(
            impl Typed for $t {
                fn data_type() -> DataType {
                    DataType::$data_type
                }
            }

            impl AsValue for $t {
                fn as_value(&self) -> Value<'_> {
                    Value::Number(Number::from(*self))
                }
            }

            impl FromLiteral for $t {
                fn from_literal(literal: Literal) -> Result<Self> {
                    match literal.coerce_to(&DataType::$data_type)? {
                        Literal::Number(Number::$canonical(n)) => <$t>::try_from(n).map_err(|_| {
                            SculptError::mismatch("member assignment", stringify!($t), n)
                        }),
                        other => Err(SculptError::mismatch(
                            "member assignment",
                            stringify!($t),
                            other,
                        )),
                    }
                }
            }
        )*
    };
}

numeric_member!(Int, I64, i8, i16, i32, i64, isize);
numeric_member!(UInt, U64, u8, u16, u32, u64, usize);

macro_rules! float_member {
    ($($t:ty),*) => {
        $(
            impl Typed for $t {
                fn data_type() -> DataType {
                    DataType::Float
                }
            }

            impl AsValue for $t {
                fn as_value(&self) -> Value<'_> {
                    Value::Number(Number::from(*self))
                }
            }

            impl FromLiteral for $t {
                fn from_literal(literal: Literal) -> Result<Self> {
                    match literal.coerce_to(&DataType::Float)? {
                        Literal::Number(n) => Ok(n.to_f64() as $t),
                        other => Err(SculptError::mismatch("member assignment", "float", other)),
                    }
                }
            }
        )*
    };
}

float_member!(f32, f64);

impl Typed for bool {
    fn data_type() -> DataType {
        DataType::Bool
    }
}

impl AsValue for bool {
    fn as_value(&self) -> Value<'_> {
        Value::Bool(*self)
    }
}

impl FromLiteral for bool {
    fn from_literal(literal: Literal) -> Result<Self> {
        match literal {
            Literal::Bool(b) => Ok(b),
            other => Err(SculptError::mismatch("member assignment", "bool", other)),
        }
    }
}

impl Typed for String {
    fn data_type() -> DataType {
        DataType::String
    }
}

impl Typed for &str {
    fn data_type() -> DataType {
        DataType::String
    }
}

impl AsValue for String {
    fn as_value(&self) -> Value<'_> {
        Value::String(self)
    }
}

impl FromLiteral for String {
    fn from_literal(literal: Literal) -> Result<Self> {
        match literal {
            Literal::String(s) => Ok(s),
            other => Err(SculptError::mismatch("member assignment", "string", other)),
        }
    }
}

impl Typed for Timestamp {
    fn data_type() -> DataType {
        DataType::Timestamp
    }
}

impl AsValue for Timestamp {
    fn as_value(&self) -> Value<'_> {
        Value::Timestamp(*self)
    }
}

impl FromLiteral for Timestamp {
    fn from_literal(literal: Literal) -> Result<Self> {
        match literal {
            Literal::Timestamp(t) => Ok(t),
            other => Err(SculptError::mismatch(
                "member assignment",
                "timestamp",
                other,
            )),
        }
    }
}

impl<T: Typed> Typed for Option<T> {
    fn data_type() -> DataType {
        DataType::optional(T::data_type())
    }
}

impl<T: AsValue> AsValue for Option<T> {
    fn as_value(&self) -> Value<'_> {
        self.as_ref().map_or(Value::Null, AsValue::as_value)
    }
}

impl<T: FromLiteral> FromLiteral for Option<T> {
    fn from_literal(literal: Literal) -> Result<Self> {
        match literal {
            Literal::Null => Ok(None),
            other => T::from_literal(other).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInfo;

    struct City {
        name: String,
    }

    impl Reflect for City {
        fn record_type(&self) -> RecordType {
            TypeInfo::builder("City")
                .property("name", DataType::String)
                .build()
        }

        fn get(&self, member: &str) -> Option<Value<'_>> {
            match member {
                "name" => Some(self.name.as_value()),
                _ => None,
            }
        }

        fn set(&mut self, member: &str, value: Literal) -> Result<()> {
            match member {
                "name" => {
                    self.name = FromLiteral::from_literal(value)?;
                    Ok(())
                }
                other => Err(SculptError::MemberNotFound {
                    type_name: "City".into(),
                    member: other.into(),
                }),
            }
        }
    }

    struct Home {
        city: Option<City>,
    }

    impl Reflect for Home {
        fn record_type(&self) -> RecordType {
            TypeInfo::builder("Home").build()
        }

        fn get(&self, member: &str) -> Option<Value<'_>> {
            match member {
                "city" => Some(
                    self.city
                        .as_ref()
                        .map_or(Value::Null, |c| Value::Record(c as &dyn Reflect)),
                ),
                _ => None,
            }
        }

        fn set(&mut self, member: &str, _value: Literal) -> Result<()> {
            Err(SculptError::invalid("member", format!("`{}` is read-only", member)))
        }
    }

    #[test]
    fn read_path_walks_nested_records() {
        let home = Home {
            city: Some(City {
                name: "Lisbon".into(),
            }),
        };
        assert_eq!(
            read_path(&home, &["city", "name"]).unwrap(),
            Value::String("Lisbon")
        );
    }

    #[test]
    fn read_path_lifts_null_intermediates() {
        let home = Home { city: None };
        assert_eq!(read_path(&home, &["city", "name"]).unwrap(), Value::Null);
    }

    #[test]
    fn read_path_reports_missing_members() {
        let home = Home { city: None };
        let err = read_path(&home, &["street"]).unwrap_err();
        assert_eq!(
            err,
            SculptError::MemberNotFound {
                type_name: "Home".into(),
                member: "street".into(),
            }
        );
        assert!(read_path::<&str>(&home, &[]).is_err());
    }

    #[test]
    fn set_converts_literals() {
        let mut city = City {
            name: String::new(),
        };
        city.set("name", Literal::from("Porto")).unwrap();
        assert_eq!(city.name, "Porto");
        assert!(city.set("name", Literal::from(3)).is_err());
    }

    #[test]
    fn numeric_members_check_range() {
        assert_eq!(u8::from_literal(Literal::from(200i64)).unwrap(), 200);
        assert!(u8::from_literal(Literal::from(300i64)).is_err());
        assert_eq!(i32::from_literal(Literal::from(7u64)).unwrap(), 7);
        assert_eq!(f32::from_literal(Literal::from(2i32)).unwrap(), 2.0);
        assert_eq!(
            Option::<i16>::from_literal(Literal::Null).unwrap(),
            None
        );
    }

    #[test]
    fn primitive_type_mapping() {
        assert_eq!(<u16 as Typed>::data_type(), DataType::UInt);
        assert_eq!(<i8 as Typed>::data_type(), DataType::Int);
        assert_eq!(
            <Option<String> as Typed>::data_type(),
            DataType::optional(DataType::String)
        );
        assert_eq!(Some(5i32).as_value(), Value::Number(Number::I64(5)));
        assert_eq!(None::<i32>.as_value(), Value::Null);
    }
}
