//! Equality predicates.
//!
//! [`build_equality`] produces `m.path == constant` for one resolved member
//! path. When exactly one side is optional, the other side is lifted with a
//! `Convert` node so both operands share the optional type; when both or
//! neither side is optional they are compared as they are.
//!
//! [`PredicateBuilder`] wraps that for the common case of a caller-supplied
//! list of field names and values against one record type.

use tracing::trace;

use crate::combine::combine_and;
use crate::config::Options;
use crate::error::{Result, SculptError};
use crate::expr::{Constant, Expr, Lambda, Parameter};
use crate::resolve::{resolve, MemberPath, PropertyPath};
use crate::traits::{read_path, Entity, Reflect};
use crate::types::{DataType, RecordType};
use crate::value::Literal;

/// Builds `free_var.path == constant`.
///
/// # Errors
///
/// [`SculptError::TypeMismatch`] if `free_var` is not of the path's root
/// type, if the member is not a scalar, or if the two sides have different
/// underlying types.
pub fn build_equality(
    free_var: &Parameter,
    path: &MemberPath,
    constant: impl Into<Constant>,
) -> Result<Expr> {
    let access = path.access(free_var.to_expr())?;
    let constant = constant.into();
    let member_type = access.data_type();
    let constant_type = constant.data_type().clone();

    if !member_type.is_scalar() {
        return Err(SculptError::mismatch("equality", "scalar member", &member_type));
    }

    let value = Expr::constant(constant);
    let node = if member_type == constant_type {
        Expr::equal(access, value)?
    } else if member_type == DataType::optional(constant_type.clone()) && !constant_type.is_optional() {
        Expr::equal(access, Expr::convert(value, member_type)?)?
    } else if constant_type == DataType::optional(member_type.clone()) && !member_type.is_optional() {
        Expr::equal(Expr::convert(access, constant_type)?, value)?
    } else {
        return Err(SculptError::mismatch("equality", &member_type, &constant_type));
    };

    trace!(predicate = %node, "built equality");
    Ok(node)
}

/// Builds `free_var.path == v` where `v` is read from `source` along `path`.
///
/// The constant is typed with the member's declared type. A null read from
/// a non-optional member (through a null intermediate record) is typed as
/// the optional form of that member type.
pub fn build_equality_from_source(
    free_var: &Parameter,
    path: &MemberPath,
    source: &dyn Reflect,
) -> Result<Expr> {
    let value = read_path(source, &path.names())?;
    let literal = value
        .to_literal()
        .ok_or_else(|| SculptError::mismatch("equality", "scalar member", value.kind_name()))?;
    let ty = if literal.is_null() {
        DataType::optional(path.data_type().clone())
    } else {
        path.data_type().clone()
    };
    build_equality(free_var, path, Constant::new(literal, ty)?)
}

/// Field/value pairs supplied at runtime, matched with equality.
///
/// ```
/// use sculpt::Criteria;
///
/// let criteria = Criteria::new().with("name", "Ada").with("address.city", "London");
/// assert_eq!(criteria.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pairs: Vec<(String, Literal)>,
}

impl Criteria {
    pub fn new() -> Self {
        Criteria::default()
    }

    /// Adds a pair, keeping insertion order.
    pub fn with(mut self, path: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.push(path, value);
        self
    }

    pub fn push(&mut self, path: impl Into<String>, value: impl Into<Literal>) {
        self.pairs.push((path.into(), value.into()));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.pairs.iter().map(|(p, v)| (p.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<P: Into<String>, V: Into<Literal>> FromIterator<(P, V)> for Criteria {
    fn from_iter<I: IntoIterator<Item = (P, V)>>(iter: I) -> Self {
        let mut criteria = Criteria::new();
        for (path, value) in iter {
            criteria.push(path, value);
        }
        criteria
    }
}

/// Builds equality predicates over one record type and one shared parameter.
///
/// Every node a builder returns references the builder's parameter, so the
/// nodes can be combined directly and wrapped with [`PredicateBuilder::lambda`].
///
/// ```
/// use sculpt::{Criteria, DataType, PredicateBuilder, TypeInfo};
///
/// let person = TypeInfo::builder("Person")
///     .property("name", DataType::String)
///     .property("age", DataType::optional(DataType::Int))
///     .build();
///
/// let builder = PredicateBuilder::for_type(person);
/// let lambda = builder.criteria(&Criteria::new().with("name", "Ada").with("age", 36))?;
/// assert_eq!(
///     lambda.to_string(),
///     r#"m => ((m.name == "Ada") AndAlso (m.age == Convert(36, int?)))"#
/// );
/// # Ok::<(), sculpt::SculptError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PredicateBuilder {
    ty: RecordType,
    parameter: Parameter,
    options: Options,
}

impl PredicateBuilder {
    /// Creates a builder with the default options.
    pub fn for_type(ty: RecordType) -> Self {
        PredicateBuilder::new(ty, Options::default())
    }

    /// Creates a builder for a derived entity type.
    pub fn for_entity<T: Entity>() -> Self {
        PredicateBuilder::for_type(T::type_info())
    }

    /// Creates a builder with explicit options.
    pub fn new(ty: RecordType, options: Options) -> Self {
        let parameter = Parameter::new(options.parameter_name(), ty.data_type());
        PredicateBuilder {
            ty,
            parameter,
            options,
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.ty
    }

    /// The parameter every built node refers to.
    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }

    /// Resolves a path string against the builder's type.
    pub fn resolve(&self, path: &str) -> Result<MemberPath> {
        resolve(&self.ty, &PropertyPath::parse_with(path, &self.options)?)
    }

    /// `m.path == value`.
    ///
    /// A numeric value is adapted to the member's numeric type when that
    /// loses nothing, keeping the value's own optionality.
    pub fn equal(&self, path: &str, value: impl Into<Constant>) -> Result<Expr> {
        let resolved = self.resolve(path)?;
        let constant = adapt_numeric(value.into(), resolved.data_type())?;
        build_equality(&self.parameter, &resolved, constant)
    }

    /// `m.path == literal`, with the literal converted to the member's type.
    ///
    /// A non-null literal takes the member's underlying type and is lifted
    /// with `Convert` when the member is optional. Null is only accepted for
    /// optional members.
    pub fn equal_literal(&self, path: &str, literal: Literal) -> Result<Expr> {
        let resolved = self.resolve(path)?;
        let member_type = resolved.data_type();
        let ty = if literal.is_null() {
            member_type.clone()
        } else {
            member_type.underlying().clone()
        };
        build_equality(&self.parameter, &resolved, Constant::new(literal, ty)?)
    }

    /// `m.path == source.path`.
    pub fn equal_from_source(&self, path: &str, source: &dyn Reflect) -> Result<Expr> {
        let resolved = self.resolve(path)?;
        build_equality_from_source(&self.parameter, &resolved, source)
    }

    /// One equality per name, each reading its value from `source`.
    pub fn equalities_from_source<S: AsRef<str>>(
        &self,
        source: &dyn Reflect,
        names: &[S],
    ) -> Result<Vec<Expr>> {
        names
            .iter()
            .map(|name| self.equal_from_source(name.as_ref(), source))
            .collect()
    }

    /// The conjunction of one equality per criteria pair, as a lambda.
    ///
    /// # Errors
    ///
    /// [`SculptError::EmptyInput`] when `criteria` is empty.
    pub fn criteria(&self, criteria: &Criteria) -> Result<Lambda> {
        let nodes = criteria
            .iter()
            .map(|(path, value)| self.equal_literal(path, value.clone()))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.lambda(combine_and(nodes)?))
    }

    /// Wraps a body built by this builder as a lambda over its parameter.
    pub fn lambda(&self, body: Expr) -> Lambda {
        Lambda::unary(self.parameter.clone(), body)
    }
}

fn adapt_numeric(constant: Constant, member_type: &DataType) -> Result<Constant> {
    let target = member_type.underlying();
    let own = constant.data_type().underlying();
    let numeric = |t: &DataType| matches!(t, DataType::Int | DataType::UInt | DataType::Float);
    if own == target || !numeric(own) || !numeric(target) {
        return Ok(constant);
    }
    let ty = if constant.data_type().is_optional() {
        DataType::optional(target.clone())
    } else {
        target.clone()
    };
    Constant::new(constant.value().clone(), ty)
}
