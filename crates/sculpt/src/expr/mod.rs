//! Expression trees.
//!
//! An [`Expr`] is an immutable, reference-counted node. Cloning an `Expr` is
//! cheap and preserves identity: two clones of one node are [`Expr::ptr_eq`].
//! Node factories check operand types and return [`Result`], so every tree
//! that exists is well typed.
//!
//! Parameters carry an explicit [`ParamId`] allocated from a process-wide
//! counter. Two parameters with the same name and type are still different
//! variables unless they share an id.

mod display;

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use crate::error::{Result, SculptError};
use crate::traits::Typed;
use crate::types::{DataType, MemberInfo, RecordType};
use crate::value::Literal;

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a lambda parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParamId(u64);

impl ParamId {
    fn next() -> Self {
        ParamId(NEXT_PARAM_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }

    /// Raw id, as shown in error messages.
    pub fn get(self) -> u64 {
        self.0
    }
}

/// A typed lambda parameter.
///
/// Equality and hashing use the parameter's id only.
#[derive(Clone)]
pub struct Parameter {
    id: ParamId,
    name: Arc<str>,
    ty: DataType,
}

impl Parameter {
    /// Allocates a fresh parameter. Every call returns a distinct variable.
    pub fn new(name: impl Into<Arc<str>>, ty: DataType) -> Self {
        Parameter {
            id: ParamId::next(),
            name: name.into(),
            ty,
        }
    }

    /// Allocates a fresh parameter with the same name and type as `self`.
    pub fn fresh(&self) -> Self {
        Parameter::new(self.name.clone(), self.ty.clone())
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.ty
    }

    /// A parameter node referencing this variable.
    pub fn to_expr(&self) -> Expr {
        Expr::parameter(self)
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Parameter {}

impl std::hash::Hash for Parameter {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}: {}", self.name, self.id.0, self.ty)
    }
}

/// A literal together with its static type.
///
/// The literal always fits the type; a null literal is only ever paired with
/// an optional type.
#[derive(Debug, Clone, PartialEq)]
pub struct Constant {
    value: Literal,
    ty: DataType,
}

impl Constant {
    /// Creates a constant of type `ty`, adapting `value` to it.
    pub fn new(value: Literal, ty: DataType) -> Result<Self> {
        if !ty.is_scalar() {
            return Err(SculptError::mismatch("constant", "scalar type", &ty));
        }
        let value = value.coerce_to(&ty)?;
        Ok(Constant { value, ty })
    }

    /// Types a literal by its own shape. Null literals need an explicit type.
    pub fn natural(value: Literal) -> Result<Self> {
        match value.natural_type() {
            Some(ty) => Ok(Constant { value, ty }),
            None => Err(SculptError::invalid(
                "constant",
                "a null literal needs an explicit optional type",
            )),
        }
    }

    pub fn value(&self) -> &Literal {
        &self.value
    }

    pub fn data_type(&self) -> &DataType {
        &self.ty
    }
}

impl<T: Typed + Into<Literal>> From<T> for Constant {
    fn from(value: T) -> Self {
        Constant {
            value: value.into(),
            ty: T::data_type(),
        }
    }
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Equal. Null equals null.
    Eq,
    /// Not equal.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Short-circuiting conjunction.
    AndAlso,
    /// Short-circuiting disjunction.
    OrElse,
}

impl BinaryOp {
    /// Returns `true` for `AndAlso` and `OrElse`.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::AndAlso | BinaryOp::OrElse)
    }

    /// Evaluates a comparison given an ordering result.
    ///
    /// Logical operators never hold for an ordering.
    pub fn eval_ordering(self, ordering: Ordering) -> bool {
        match self {
            BinaryOp::Eq => ordering == Ordering::Equal,
            BinaryOp::Ne => ordering != Ordering::Equal,
            BinaryOp::Gt => ordering == Ordering::Greater,
            BinaryOp::Ge => ordering != Ordering::Less,
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::Le => ordering != Ordering::Greater,
            BinaryOp::AndAlso | BinaryOp::OrElse => false,
        }
    }

    /// Returns the display form of this operator.
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::AndAlso => "AndAlso",
            BinaryOp::OrElse => "OrElse",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Query operators that can appear in a [`ExprKind::Call`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Where,
    OrderBy,
    OrderByDescending,
    ThenBy,
    ThenByDescending,
    Select,
}

impl Method {
    /// Returns `true` for the four ordering operators.
    pub fn is_ordering(self) -> bool {
        matches!(
            self,
            Method::OrderBy | Method::OrderByDescending | Method::ThenBy | Method::ThenByDescending
        )
    }

    /// Returns `true` for secondary ordering operators.
    pub fn is_then(self) -> bool {
        matches!(self, Method::ThenBy | Method::ThenByDescending)
    }

    /// Returns `true` for descending ordering operators.
    pub fn is_descending(self) -> bool {
        matches!(self, Method::OrderByDescending | Method::ThenByDescending)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Where => "Where",
            Method::OrderBy => "OrderBy",
            Method::OrderByDescending => "OrderByDescending",
            Method::ThenBy => "ThenBy",
            Method::ThenByDescending => "ThenByDescending",
            Method::Select => "Select",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A function literal: parameters plus a body.
#[derive(Debug, Clone)]
pub struct Lambda {
    parameters: Vec<Parameter>,
    body: Expr,
}

impl Lambda {
    /// Creates a lambda. Parameter ids must be distinct.
    pub fn new(parameters: Vec<Parameter>, body: Expr) -> Result<Self> {
        for (i, p) in parameters.iter().enumerate() {
            if parameters[..i].contains(p) {
                return Err(SculptError::invalid(
                    "parameters",
                    format!("parameter `{}` is declared twice", p.name()),
                ));
            }
        }
        Ok(Lambda { parameters, body })
    }

    /// Creates a single-parameter lambda.
    pub fn unary(parameter: Parameter, body: Expr) -> Self {
        Lambda {
            parameters: vec![parameter],
            body,
        }
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// The only parameter of a single-parameter lambda.
    pub fn parameter(&self) -> Option<&Parameter> {
        match self.parameters.as_slice() {
            [p] => Some(p),
            _ => None,
        }
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    /// Result type of the body.
    pub fn return_type(&self) -> DataType {
        self.body.data_type()
    }

    /// Wraps this lambda as an expression node.
    pub fn into_expr(self) -> Expr {
        Expr::new(ExprKind::Lambda(self))
    }
}

/// One `member = value` assignment of a [`ExprKind::MemberInit`] node.
#[derive(Debug, Clone)]
pub struct Binding {
    member: MemberInfo,
    value: Expr,
}

impl Binding {
    pub fn member(&self) -> &MemberInfo {
        &self.member
    }

    pub fn value(&self) -> &Expr {
        &self.value
    }
}

/// Node variants.
#[derive(Debug)]
pub enum ExprKind {
    /// Reference to a lambda parameter.
    Parameter(Parameter),
    /// Typed literal.
    Constant(Constant),
    /// Member read on a record-typed target.
    Member { target: Expr, member: MemberInfo },
    /// Static conversion between an underlying type and its optional form.
    Convert { operand: Expr, ty: DataType },
    /// Binary comparison or logical operator.
    Binary { op: BinaryOp, left: Expr, right: Expr },
    /// Logical negation.
    Not(Expr),
    /// Function literal.
    Lambda(Lambda),
    /// Query operator applied to a sequence.
    Call {
        method: Method,
        source: Expr,
        argument: Lambda,
    },
    /// Root of a query: a named sequence of records.
    Source { name: Arc<str>, element: RecordType },
    /// Construction of a record with member assignments.
    MemberInit {
        ty: RecordType,
        bindings: Vec<Binding>,
    },
}

/// Shared, immutable expression node.
#[derive(Clone)]
pub struct Expr(Arc<ExprKind>);

impl Expr {
    fn new(kind: ExprKind) -> Self {
        Expr(Arc::new(kind))
    }

    /// The node's variant.
    pub fn kind(&self) -> &ExprKind {
        &self.0
    }

    /// Returns `true` if both handles point at the same node.
    pub fn ptr_eq(a: &Expr, b: &Expr) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Static type of the node. A lambda node has its body's type.
    pub fn data_type(&self) -> DataType {
        match self.kind() {
            ExprKind::Parameter(p) => p.ty.clone(),
            ExprKind::Constant(c) => c.ty.clone(),
            ExprKind::Member { member, .. } => member.data_type().clone(),
            ExprKind::Convert { ty, .. } => ty.clone(),
            ExprKind::Binary { .. } | ExprKind::Not(_) => DataType::Bool,
            ExprKind::Lambda(lambda) => lambda.return_type(),
            ExprKind::Call {
                method,
                source,
                argument,
            } => match method {
                Method::Select => DataType::Sequence(Box::new(argument.return_type())),
                _ => source.data_type(),
            },
            ExprKind::Source { element, .. } => {
                DataType::Sequence(Box::new(element.data_type()))
            }
            ExprKind::MemberInit { ty, .. } => ty.data_type(),
        }
    }

    /// The parameter of a parameter node.
    pub fn as_parameter(&self) -> Option<&Parameter> {
        match self.kind() {
            ExprKind::Parameter(p) => Some(p),
            _ => None,
        }
    }

    /// The lambda of a lambda node.
    pub fn as_lambda(&self) -> Option<&Lambda> {
        match self.kind() {
            ExprKind::Lambda(lambda) => Some(lambda),
            _ => None,
        }
    }

    // ========================================================================
    // Factories
    // ========================================================================

    /// Parameter reference.
    pub fn parameter(parameter: &Parameter) -> Expr {
        Expr::new(ExprKind::Parameter(parameter.clone()))
    }

    /// Typed literal.
    pub fn constant(constant: impl Into<Constant>) -> Expr {
        Expr::new(ExprKind::Constant(constant.into()))
    }

    /// Reads `name` from a record-typed (or optional record) target.
    pub fn member(target: Expr, name: &str) -> Result<Expr> {
        let target_type = target.data_type();
        let record = target_type.as_record().ok_or_else(|| SculptError::MemberNotFound {
            type_name: target_type.to_string(),
            member: name.to_string(),
        })?;
        let member = record
            .member(name)
            .cloned()
            .ok_or_else(|| SculptError::MemberNotFound {
                type_name: record.name().to_string(),
                member: name.to_string(),
            })?;
        Ok(Expr::new(ExprKind::Member { target, member }))
    }

    /// Converts between a type and its optional form.
    pub fn convert(operand: Expr, ty: DataType) -> Result<Expr> {
        let from = operand.data_type();
        if from.underlying() != ty.underlying() {
            return Err(SculptError::mismatch("conversion", &ty, &from));
        }
        Ok(Expr::new(ExprKind::Convert { operand, ty }))
    }

    /// Binary node. Comparisons need two scalar operands of the same type;
    /// logical operators need two booleans.
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Result<Expr> {
        let (lt, rt) = (left.data_type(), right.data_type());
        if op.is_logical() {
            if lt != DataType::Bool {
                return Err(SculptError::mismatch(op.as_str(), DataType::Bool, &lt));
            }
            if rt != DataType::Bool {
                return Err(SculptError::mismatch(op.as_str(), DataType::Bool, &rt));
            }
        } else {
            if !lt.is_scalar() {
                return Err(SculptError::mismatch(op.as_str(), "scalar type", &lt));
            }
            if lt != rt {
                return Err(SculptError::mismatch(op.as_str(), &lt, &rt));
            }
        }
        Ok(Expr::new(ExprKind::Binary { op, left, right }))
    }

    /// `left == right`.
    pub fn equal(left: Expr, right: Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::Eq, left, right)
    }

    /// `left AndAlso right`.
    pub fn and_also(left: Expr, right: Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::AndAlso, left, right)
    }

    /// `left OrElse right`.
    pub fn or_else(left: Expr, right: Expr) -> Result<Expr> {
        Expr::binary(BinaryOp::OrElse, left, right)
    }

    /// Logical negation of a boolean operand.
    pub fn negate(operand: Expr) -> Result<Expr> {
        let ty = operand.data_type();
        if ty != DataType::Bool {
            return Err(SculptError::mismatch("Not", DataType::Bool, &ty));
        }
        Ok(Expr::new(ExprKind::Not(operand)))
    }

    /// Root sequence of a query.
    pub fn source(name: impl Into<Arc<str>>, element: RecordType) -> Expr {
        Expr::new(ExprKind::Source {
            name: name.into(),
            element,
        })
    }

    /// Applies a query operator to a sequence.
    ///
    /// The argument must take exactly one parameter of the sequence's element
    /// type. `Where` needs a boolean body, ordering operators a scalar body and
    /// `Select` a record body.
    pub fn call(method: Method, source: Expr, argument: Lambda) -> Result<Expr> {
        let source_type = source.data_type();
        let element = match &source_type {
            DataType::Sequence(element) => element.as_ref().clone(),
            other => return Err(SculptError::mismatch(method.as_str(), "sequence", other)),
        };
        let parameter = argument.parameter().ok_or_else(|| {
            SculptError::invalid(
                "argument",
                format!(
                    "{} takes a single-parameter lambda, got {} parameters",
                    method,
                    argument.parameters().len()
                ),
            )
        })?;
        if parameter.data_type() != &element {
            return Err(SculptError::mismatch(
                method.as_str(),
                &element,
                parameter.data_type(),
            ));
        }

        let body = argument.return_type();
        let body_ok = match method {
            Method::Where => body == DataType::Bool,
            Method::Select => matches!(body, DataType::Record(_)),
            _ => body.is_scalar(),
        };
        if !body_ok {
            let expected = match method {
                Method::Where => "bool",
                Method::Select => "record",
                _ => "scalar type",
            };
            return Err(SculptError::mismatch(method.as_str(), expected, &body));
        }

        Ok(Expr::new(ExprKind::Call {
            method,
            source,
            argument,
        }))
    }

    /// Constructs a record of type `ty`, assigning each named member.
    ///
    /// Every name must be a writable member of `ty`, listed at most once, and
    /// its value must have the member's type.
    pub fn member_init<S, I>(ty: RecordType, bindings: I) -> Result<Expr>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = (S, Expr)>,
    {
        let mut built: Vec<Binding> = Vec::new();
        for (name, value) in bindings {
            let name = name.as_ref();
            let member = ty
                .member(name)
                .cloned()
                .ok_or_else(|| SculptError::MemberNotFound {
                    type_name: ty.name().to_string(),
                    member: name.to_string(),
                })?;
            if !member.is_writable() {
                return Err(SculptError::invalid(
                    "bindings",
                    format!("member `{}` of `{}` is read-only", name, ty.name()),
                ));
            }
            if built.iter().any(|b| b.member.name() == name) {
                return Err(SculptError::invalid(
                    "bindings",
                    format!("member `{}` is bound twice", name),
                ));
            }
            let value_type = value.data_type();
            if &value_type != member.data_type() {
                return Err(SculptError::mismatch(
                    "member binding",
                    member.data_type(),
                    &value_type,
                ));
            }
            built.push(Binding { member, value });
        }
        Ok(Expr::new(ExprKind::MemberInit {
            ty,
            bindings: built,
        }))
    }
}

impl From<Lambda> for Expr {
    fn from(lambda: Lambda) -> Self {
        lambda.into_expr()
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.kind(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInfo;

    fn person() -> RecordType {
        let address = TypeInfo::builder("Address")
            .property("city", DataType::String)
            .build();
        TypeInfo::builder("Person")
            .property("name", DataType::String)
            .property("age", DataType::optional(DataType::Int))
            .property("address", DataType::optional(address.data_type()))
            .build()
    }

    #[test]
    fn parameters_compare_by_id() {
        let a = Parameter::new("m", DataType::Int);
        let b = Parameter::new("m", DataType::Int);
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_ne!(a, a.fresh());
        assert_eq!(a.fresh().name(), "m");
    }

    #[test]
    fn constants_take_their_rust_type() {
        assert_eq!(Constant::from(3i32).data_type(), &DataType::Int);
        assert_eq!(Constant::from(3u8).data_type(), &DataType::UInt);
        let none = Constant::from(None::<String>);
        assert_eq!(none.data_type(), &DataType::optional(DataType::String));
        assert!(none.value().is_null());
        assert!(Constant::natural(Literal::Null).is_err());
        assert!(Constant::new(Literal::Null, DataType::Int).is_err());
    }

    #[test]
    fn member_access_walks_optional_records() {
        let m = Parameter::new("m", person().data_type());
        let address = Expr::member(m.to_expr(), "address").unwrap();
        let city = Expr::member(address, "city").unwrap();
        assert_eq!(city.data_type(), DataType::String);

        let err = Expr::member(m.to_expr(), "street").unwrap_err();
        assert!(matches!(err, SculptError::MemberNotFound { .. }));

        let name = Expr::member(m.to_expr(), "name").unwrap();
        assert!(Expr::member(name, "len").is_err());
    }

    #[test]
    fn comparisons_need_identical_types() {
        let m = Parameter::new("m", person().data_type());
        let age = Expr::member(m.to_expr(), "age").unwrap();
        let err = Expr::equal(age.clone(), Expr::constant(3i64)).unwrap_err();
        assert!(matches!(err, SculptError::TypeMismatch { .. }));

        let lifted = Expr::convert(Expr::constant(3i64), DataType::optional(DataType::Int)).unwrap();
        let eq = Expr::equal(age, lifted).unwrap();
        assert_eq!(eq.data_type(), DataType::Bool);

        assert!(Expr::convert(Expr::constant("x"), DataType::Int).is_err());
        assert!(Expr::and_also(eq.clone(), Expr::constant(1i32)).is_err());
        assert!(Expr::negate(eq).is_ok());
    }

    #[test]
    fn binary_op_ordering() {
        assert!(BinaryOp::Le.eval_ordering(Ordering::Equal));
        assert!(!BinaryOp::Lt.eval_ordering(Ordering::Equal));
        assert!(BinaryOp::Ne.eval_ordering(Ordering::Greater));
        assert!(!BinaryOp::AndAlso.eval_ordering(Ordering::Equal));
    }

    #[test]
    fn calls_check_their_argument() {
        let ty = person();
        let source = Expr::source("people", ty.clone());
        let m = Parameter::new("m", ty.data_type());

        let key = Lambda::unary(m.clone(), Expr::member(m.to_expr(), "name").unwrap());
        let ordered = Expr::call(Method::OrderBy, source.clone(), key.clone()).unwrap();
        assert_eq!(ordered.data_type(), source.data_type());

        let err = Expr::call(Method::Where, source.clone(), key).unwrap_err();
        assert!(matches!(err, SculptError::TypeMismatch { .. }));

        let other = Parameter::new("x", DataType::String);
        let wrong = Lambda::unary(other.clone(), Expr::equal(other.to_expr(), Expr::constant("a")).unwrap());
        assert!(Expr::call(Method::Where, source, wrong).is_err());
    }

    #[test]
    fn member_init_checks_bindings() {
        let target = TypeInfo::builder("Shape")
            .property("name", DataType::String)
            .build();
        let m = Parameter::new("m", person().data_type());
        let name = Expr::member(m.to_expr(), "name").unwrap();

        let init = Expr::member_init(target.clone(), [("name", name.clone())]).unwrap();
        assert_eq!(init.data_type(), target.data_type());

        let twice = Expr::member_init(target.clone(), [("name", name.clone()), ("name", name)]);
        assert!(matches!(twice, Err(SculptError::InvalidArgument { .. })));

        let wrong = Expr::member_init(target, [("name", Expr::constant(1i32))]);
        assert!(matches!(wrong, Err(SculptError::TypeMismatch { .. })));
    }

    #[test]
    fn lambdas_reject_duplicate_parameters() {
        let p = Parameter::new("m", DataType::Bool);
        assert!(Lambda::new(vec![p.clone(), p.clone()], p.to_expr()).is_err());
        let lambda = Lambda::new(vec![p.clone()], p.to_expr()).unwrap();
        assert_eq!(lambda.parameter(), Some(&p));
        assert_eq!(lambda.return_type(), DataType::Bool);
    }
}
