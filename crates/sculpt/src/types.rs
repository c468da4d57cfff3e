//! Type descriptors: the metadata half of the reflection capability.
//!
//! A [`RecordType`] is a shared handle to a [`TypeInfo`] listing the members
//! of a record type. Handles compare by identity, so two descriptors with the
//! same members are still different types unless they are the same
//! allocation. Derived entity types hand out a single descriptor per type, and
//! the shape registry hands out a single descriptor per projection shape.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

/// Static type of an expression node or record member.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean.
    Bool,
    /// Signed integer of any width.
    Int,
    /// Unsigned integer of any width.
    UInt,
    /// Floating point.
    Float,
    /// UTF-8 string.
    String,
    /// Milliseconds since Unix epoch.
    Timestamp,
    /// Unit enum, compared by discriminant.
    Enum,
    /// Nested record.
    Record(RecordType),
    /// Nullable wrapper over a non-optional type.
    Optional(Box<DataType>),
    /// Sequence of elements; the type of a query.
    Sequence(Box<DataType>),
}

impl DataType {
    /// Wraps `inner` as optional. Already-optional types are returned unchanged.
    pub fn optional(inner: DataType) -> DataType {
        match inner {
            DataType::Optional(_) => inner,
            other => DataType::Optional(Box::new(other)),
        }
    }

    /// Returns `true` for `Optional(_)`.
    pub fn is_optional(&self) -> bool {
        matches!(self, DataType::Optional(_))
    }

    /// The type under an optional wrapper, or `self` when not optional.
    pub fn underlying(&self) -> &DataType {
        match self {
            DataType::Optional(inner) => inner,
            other => other,
        }
    }

    /// The record descriptor of a record or optional record type.
    pub fn as_record(&self) -> Option<&RecordType> {
        match self.underlying() {
            DataType::Record(record) => Some(record),
            _ => None,
        }
    }

    /// Returns `true` for types with a literal representation, optional or not.
    pub fn is_scalar(&self) -> bool {
        !matches!(
            self.underlying(),
            DataType::Record(_) | DataType::Sequence(_)
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "bool"),
            DataType::Int => write!(f, "int"),
            DataType::UInt => write!(f, "uint"),
            DataType::Float => write!(f, "float"),
            DataType::String => write!(f, "string"),
            DataType::Timestamp => write!(f, "timestamp"),
            DataType::Enum => write!(f, "enum"),
            DataType::Record(record) => write!(f, "{}", record.name()),
            DataType::Optional(inner) => write!(f, "{}?", inner),
            DataType::Sequence(inner) => write!(f, "seq<{}>", inner),
        }
    }
}

/// Whether a member is a property-like accessor or a plain field.
///
/// Only properties take part in path resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MemberKind {
    /// Property-like accessor.
    #[default]
    Property,
    /// Plain field, visible in metadata but not resolvable by path.
    Field,
}

/// Descriptor of a single record member.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberInfo {
    name: String,
    kind: MemberKind,
    ty: DataType,
    writable: bool,
}

impl MemberInfo {
    /// Creates a writable property.
    pub fn property(name: impl Into<String>, ty: DataType) -> Self {
        MemberInfo {
            name: name.into(),
            kind: MemberKind::Property,
            ty,
            writable: true,
        }
    }

    /// Creates a writable plain field.
    pub fn field(name: impl Into<String>, ty: DataType) -> Self {
        MemberInfo {
            name: name.into(),
            kind: MemberKind::Field,
            ty,
            writable: true,
        }
    }

    /// Marks the member as read-only.
    pub fn read_only(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Member name as used in paths.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Property or field.
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    /// Declared type of the member.
    pub fn data_type(&self) -> &DataType {
        &self.ty
    }

    /// Returns `true` if the member accepts writes through [`Reflect::set`].
    ///
    /// [`Reflect::set`]: crate::Reflect::set
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Returns `true` for property-like members.
    pub fn is_property(&self) -> bool {
        self.kind == MemberKind::Property
    }
}

/// Member listing of a record type.
#[derive(Debug)]
pub struct TypeInfo {
    name: String,
    members: Vec<MemberInfo>,
    synthesized: bool,
}

impl TypeInfo {
    /// Starts a descriptor for a record type named `name`.
    pub fn builder(name: impl Into<String>) -> TypeInfoBuilder {
        TypeInfoBuilder {
            name: name.into(),
            members: Vec::new(),
            synthesized: false,
        }
    }

    /// Type name, used in messages and rendering.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Members in declaration order.
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// Looks up a member by name.
    pub fn member(&self, name: &str) -> Option<&MemberInfo> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Position of a member in declaration order.
    pub fn member_index(&self, name: &str) -> Option<usize> {
        self.members.iter().position(|m| m.name == name)
    }

    /// Returns `true` for descriptors created by the shape registry.
    pub fn is_synthesized(&self) -> bool {
        self.synthesized
    }
}

/// Builder for [`TypeInfo`], used by `#[derive(Reflect)]` and the shape registry.
#[derive(Debug)]
pub struct TypeInfoBuilder {
    name: String,
    members: Vec<MemberInfo>,
    synthesized: bool,
}

impl TypeInfoBuilder {
    /// Adds a member. A member whose name is already present replaces it.
    pub fn member(mut self, member: MemberInfo) -> Self {
        match self.members.iter_mut().find(|m| m.name == member.name) {
            Some(existing) => *existing = member,
            None => self.members.push(member),
        }
        self
    }

    /// Adds a writable property.
    pub fn property(self, name: impl Into<String>, ty: DataType) -> Self {
        self.member(MemberInfo::property(name, ty))
    }

    /// Adds a writable plain field.
    pub fn field(self, name: impl Into<String>, ty: DataType) -> Self {
        self.member(MemberInfo::field(name, ty))
    }

    pub(crate) fn synthesized(mut self) -> Self {
        self.synthesized = true;
        self
    }

    /// Finishes the descriptor.
    pub fn build(self) -> RecordType {
        RecordType(Arc::new(TypeInfo {
            name: self.name,
            members: self.members,
            synthesized: self.synthesized,
        }))
    }
}

/// Shared, identity-compared handle to a [`TypeInfo`].
#[derive(Clone)]
pub struct RecordType(Arc<TypeInfo>);

impl RecordType {
    /// Returns `true` if both handles point at the same descriptor.
    pub fn ptr_eq(a: &RecordType, b: &RecordType) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// The record type as a [`DataType`].
    pub fn data_type(&self) -> DataType {
        DataType::Record(self.clone())
    }
}

impl Deref for RecordType {
    type Target = TypeInfo;

    fn deref(&self) -> &TypeInfo {
        &self.0
    }
}

impl PartialEq for RecordType {
    fn eq(&self, other: &Self) -> bool {
        RecordType::ptr_eq(self, other)
    }
}

impl Eq for RecordType {}

impl Hash for RecordType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordType").field(&self.0.name).finish()
    }
}
