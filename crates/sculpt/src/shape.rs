//! Synthesized projection types.
//!
//! A [`ProjectionSpec`] is a set of `(name, type)` pairs. The
//! [`ShapeRegistry`] turns each distinct set into exactly one
//! [`SynthesizedType`]: asking twice for the same pairs, in any order,
//! returns the same `Arc`. Instances of a synthesized type are
//! [`DynamicRecord`]s, which implement [`Reflect`] so queries can keep
//! operating on projected rows.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use tracing::{debug, trace};

use crate::error::{Result, SculptError};
use crate::traits::Reflect;
use crate::types::{DataType, RecordType, TypeInfo};
use crate::value::{Literal, Value};

static IDENTIFIER: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok());

/// Returns `true` if `name` can be used as a member or parameter name.
pub fn is_identifier(name: &str) -> bool {
    IDENTIFIER.as_ref().is_some_and(|re| re.is_match(name))
}

/// The set of members a projection exposes.
///
/// Order of insertion does not matter; members are kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionSpec {
    members: BTreeMap<String, DataType>,
}

impl ProjectionSpec {
    pub fn new() -> Self {
        ProjectionSpec::default()
    }

    /// Adds a member.
    ///
    /// Adding the same pair twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`SculptError::UnsupportedShape`] if `name` is already present with a
    /// different type.
    pub fn insert(&mut self, name: impl Into<String>, ty: DataType) -> Result<()> {
        let name = name.into();
        match self.members.get(&name) {
            Some(existing) if existing != &ty => Err(SculptError::unsupported(format!(
                "member `{}` is requested as both {} and {}",
                name, existing, ty
            ))),
            Some(_) => Ok(()),
            None => {
                self.members.insert(name, ty);
                Ok(())
            }
        }
    }

    /// Builder form of [`ProjectionSpec::insert`].
    pub fn with(mut self, name: impl Into<String>, ty: DataType) -> Result<Self> {
        self.insert(name, ty)?;
        Ok(self)
    }

    /// Builds a spec from pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, DataType)>,
        S: Into<String>,
    {
        pairs
            .into_iter()
            .try_fold(ProjectionSpec::new(), |spec, (name, ty)| spec.with(name, ty))
    }

    /// Members sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataType)> {
        self.members.iter().map(|(n, t)| (n.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Canonical key of this spec.
    pub fn signature(&self) -> ShapeSignature {
        let parts: Vec<String> = self
            .members
            .iter()
            .map(|(name, ty)| format!("{}:{}", name, ty))
            .collect();
        ShapeSignature(parts.join(";"))
    }

    fn validate(&self) -> Result<()> {
        if self.members.is_empty() {
            return Err(SculptError::unsupported("a projection needs at least one member"));
        }
        for (name, ty) in &self.members {
            if !is_identifier(name) {
                return Err(SculptError::unsupported(format!(
                    "`{}` is not a valid member name",
                    name
                )));
            }
            if !ty.is_scalar() {
                return Err(SculptError::unsupported(format!(
                    "member `{}` has type {}, which cannot be stored in a projection",
                    name, ty
                )));
            }
        }
        Ok(())
    }
}

/// Canonical, order-independent key of a [`ProjectionSpec`], e.g.
/// `age:int?;name:string`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShapeSignature(String);

impl ShapeSignature {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShapeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record type created at runtime for one projection shape.
#[derive(Debug)]
pub struct SynthesizedType {
    signature: ShapeSignature,
    record: RecordType,
    defaults: Vec<Literal>,
}

impl SynthesizedType {
    fn build(name: String, spec: &ProjectionSpec) -> Result<Self> {
        let mut builder = TypeInfo::builder(name).synthesized();
        let mut defaults = Vec::with_capacity(spec.len());
        for (member, ty) in spec.iter() {
            defaults.push(default_slot(member, ty)?);
            builder = builder.property(member, ty.clone());
        }
        Ok(SynthesizedType {
            signature: spec.signature(),
            record: builder.build(),
            defaults,
        })
    }

    pub fn signature(&self) -> &ShapeSignature {
        &self.signature
    }

    /// The type's descriptor. Members are sorted by name.
    pub fn record_type(&self) -> &RecordType {
        &self.record
    }

    pub fn name(&self) -> &str {
        self.record.name()
    }

    pub fn data_type(&self) -> DataType {
        self.record.data_type()
    }

    /// A new instance with every slot at its type's default.
    pub fn instantiate(&self) -> DynamicRecord {
        DynamicRecord {
            ty: self.record.clone(),
            slots: self.defaults.clone(),
        }
    }
}

fn default_slot(member: &str, ty: &DataType) -> Result<Literal> {
    Literal::default_for(ty).ok_or_else(|| {
        SculptError::unsupported(format!(
            "member `{}` has type {}, which has no default value",
            member, ty
        ))
    })
}

/// Instance of a synthesized type.
///
/// ```
/// use sculpt::{DataType, Literal, ProjectionSpec, Reflect, ShapeRegistry, Value};
///
/// let registry = ShapeRegistry::new();
/// let spec = ProjectionSpec::new().with("name", DataType::String)?;
/// let shape = registry.get_or_create(&spec)?;
///
/// let mut row = shape.instantiate();
/// assert_eq!(row.get("name"), Some(Value::String("")));
/// row.set("name", Literal::from("Ada"))?;
/// assert_eq!(row.get("name"), Some(Value::String("Ada")));
/// # Ok::<(), sculpt::SculptError>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    ty: RecordType,
    slots: Vec<Literal>,
}

impl DynamicRecord {
    /// A record of type `ty` with every slot at its default.
    ///
    /// # Errors
    ///
    /// [`SculptError::UnsupportedShape`] if a member of `ty` is not scalar.
    pub fn new(ty: RecordType) -> Result<Self> {
        let slots = ty
            .members()
            .iter()
            .map(|m| default_slot(m.name(), m.data_type()))
            .collect::<Result<Vec<_>>>()?;
        Ok(DynamicRecord { ty, slots })
    }

    /// The owned value of a member.
    pub fn literal(&self, member: &str) -> Option<&Literal> {
        self.ty.member_index(member).map(|i| &self.slots[i])
    }
}

impl Reflect for DynamicRecord {
    fn record_type(&self) -> RecordType {
        self.ty.clone()
    }

    fn get(&self, member: &str) -> Option<Value<'_>> {
        self.literal(member).map(Literal::as_value)
    }

    fn set(&mut self, member: &str, value: Literal) -> Result<()> {
        let index = self
            .ty
            .member_index(member)
            .ok_or_else(|| SculptError::MemberNotFound {
                type_name: self.ty.name().to_string(),
                member: member.to_string(),
            })?;
        let ty = self.ty.members()[index].data_type();
        self.slots[index] = value.coerce_to(ty)?;
        Ok(())
    }
}

/// Cache of synthesized types, keyed by shape signature.
///
/// The registry is safe to share between threads. Lookups take a read lock;
/// a miss takes the write lock, checks again, and only then builds the type,
/// so concurrent requests for one shape all observe the same `Arc`.
#[derive(Debug, Default)]
pub struct ShapeRegistry {
    shapes: RwLock<HashMap<ShapeSignature, Arc<SynthesizedType>>>,
}

impl ShapeRegistry {
    pub fn new() -> Self {
        ShapeRegistry::default()
    }

    /// Returns the synthesized type for `spec`, creating it on first request.
    ///
    /// # Errors
    ///
    /// [`SculptError::UnsupportedShape`] if the spec is empty, a name is not
    /// an identifier, or a member type cannot be stored in a projection.
    pub fn get_or_create(&self, spec: &ProjectionSpec) -> Result<Arc<SynthesizedType>> {
        spec.validate()?;
        let signature = spec.signature();

        if let Some(existing) = self.shapes.read().get(&signature) {
            trace!(%signature, "shape cache hit");
            return Ok(Arc::clone(existing));
        }

        let mut shapes = self.shapes.write();
        if let Some(existing) = shapes.get(&signature) {
            trace!(%signature, "shape cache hit after lock upgrade");
            return Ok(Arc::clone(existing));
        }

        let name = format!("Shape_{}", shapes.len());
        let synthesized = Arc::new(SynthesizedType::build(name, spec)?);
        debug!(%signature, name = synthesized.name(), "synthesized projection type");
        shapes.insert(signature, Arc::clone(&synthesized));
        Ok(synthesized)
    }

    /// The cached type for `spec`, if it was already created.
    pub fn get(&self, spec: &ProjectionSpec) -> Option<Arc<SynthesizedType>> {
        self.shapes.read().get(&spec.signature()).cloned()
    }

    /// Number of distinct shapes created so far.
    pub fn len(&self) -> usize {
        self.shapes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.read().is_empty()
    }
}
