//! Lowering lambdas to evaluators over reflected records.
//!
//! [`evaluate`] interprets an expression in a [`Scope`] binding parameters to
//! runtime values. The compiled wrappers validate a lambda once and then
//! apply it to many records:
//!
//! - [`CompiledPredicate`] for `Where` arguments
//! - [`CompiledKey`] for ordering keys
//! - [`CompiledProjection`] for `Select` arguments, producing [`DynamicRecord`]s
//!
//! Null handling is lifted: `null == null` holds, `null == x` does not, an
//! ordered comparison involving null is false, and reading a member of null
//! yields null.

use crate::error::{Result, SculptError};
use crate::expr::{BinaryOp, Expr, ExprKind, Lambda, ParamId, Parameter};
use crate::ordering::compare_values;
use crate::rewrite::free_parameters;
use crate::shape::DynamicRecord;
use crate::traits::Reflect;
use crate::types::{DataType, RecordType};
use crate::value::Value;

/// Parameter bindings for [`evaluate`].
#[derive(Debug, Default, Clone)]
pub struct Scope<'a> {
    bindings: Vec<(ParamId, Value<'a>)>,
}

impl<'a> Scope<'a> {
    pub fn new() -> Self {
        Scope::default()
    }

    /// Binds `parameter` to `value`, shadowing earlier bindings of it.
    pub fn bind(&mut self, parameter: &Parameter, value: Value<'a>) {
        self.bindings.push((parameter.id(), value));
    }

    /// Builder form of [`Scope::bind`].
    pub fn with(mut self, parameter: &Parameter, value: Value<'a>) -> Self {
        self.bind(parameter, value);
        self
    }

    pub fn lookup(&self, parameter: &Parameter) -> Option<Value<'a>> {
        self.bindings
            .iter()
            .rev()
            .find(|(id, _)| *id == parameter.id())
            .map(|(_, value)| *value)
    }
}

/// Evaluates `expr` to a runtime value.
///
/// # Errors
///
/// [`SculptError::UnboundParameter`] for parameters missing from `scope`,
/// and [`SculptError::InvalidArgument`] for nodes that do not produce a
/// single value (lambdas, queries, record initializers).
pub fn evaluate<'a>(expr: &'a Expr, scope: &Scope<'a>) -> Result<Value<'a>> {
    match expr.kind() {
        ExprKind::Parameter(p) => scope.lookup(p).ok_or_else(|| SculptError::UnboundParameter {
            name: p.name().to_string(),
            id: p.id().get(),
        }),
        ExprKind::Constant(c) => Ok(c.value().as_value()),
        ExprKind::Member { target, member } => match evaluate(target, scope)? {
            Value::Null => Ok(Value::Null),
            Value::Record(record) => {
                record
                    .get(member.name())
                    .ok_or_else(|| SculptError::MemberNotFound {
                        type_name: record.record_type().name().to_string(),
                        member: member.name().to_string(),
                    })
            }
            other => Err(SculptError::mismatch(
                "member access",
                "record",
                other.kind_name(),
            )),
        },
        // Optional values share the representation of their underlying type.
        ExprKind::Convert { operand, .. } => evaluate(operand, scope),
        ExprKind::Binary { op, left, right } => evaluate_binary(*op, left, right, scope),
        ExprKind::Not(operand) => Ok(Value::Bool(!truth(evaluate(operand, scope)?)?)),
        ExprKind::Lambda(_)
        | ExprKind::Call { .. }
        | ExprKind::Source { .. }
        | ExprKind::MemberInit { .. } => Err(SculptError::invalid(
            "expression",
            format!("`{}` does not evaluate to a single value", expr),
        )),
    }
}

fn evaluate_binary<'a>(
    op: BinaryOp,
    left: &'a Expr,
    right: &'a Expr,
    scope: &Scope<'a>,
) -> Result<Value<'a>> {
    let result = match op {
        BinaryOp::AndAlso => truth(evaluate(left, scope)?)? && truth(evaluate(right, scope)?)?,
        BinaryOp::OrElse => truth(evaluate(left, scope)?)? || truth(evaluate(right, scope)?)?,
        BinaryOp::Eq => evaluate(left, scope)?.is_equal(&evaluate(right, scope)?),
        BinaryOp::Ne => !evaluate(left, scope)?.is_equal(&evaluate(right, scope)?),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let (l, r) = (evaluate(left, scope)?, evaluate(right, scope)?);
            if l.is_null() || r.is_null() {
                false
            } else {
                compare_values(&l, &r).is_some_and(|o| op.eval_ordering(o))
            }
        }
    };
    Ok(Value::Bool(result))
}

fn truth(value: Value<'_>) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| SculptError::mismatch("condition", "bool", value.kind_name()))
}

/// Checks that `lambda` takes one parameter of a record type and mentions no
/// other free parameter. Returns the parameter and its record type.
fn validate(lambda: &Lambda) -> Result<(Parameter, RecordType)> {
    let parameter = lambda.parameter().cloned().ok_or_else(|| {
        SculptError::invalid(
            "lambda",
            format!(
                "expected a single-parameter lambda, got {} parameters",
                lambda.parameters().len()
            ),
        )
    })?;
    let record = parameter
        .data_type()
        .as_record()
        .filter(|_| !parameter.data_type().is_optional())
        .cloned()
        .ok_or_else(|| SculptError::mismatch("lambda parameter", "record", parameter.data_type()))?;

    if let Some(foreign) = free_parameters(lambda.body())
        .into_iter()
        .find(|p| *p != parameter)
    {
        return Err(SculptError::UnboundParameter {
            name: foreign.name().to_string(),
            id: foreign.id().get(),
        });
    }
    Ok((parameter, record))
}

fn bind<'a>(parameter: &Parameter, ty: &RecordType, record: &'a dyn Reflect) -> Result<Scope<'a>> {
    let actual = record.record_type();
    if &actual != ty {
        return Err(SculptError::mismatch("lambda argument", ty.name(), actual.name()));
    }
    Ok(Scope::new().with(parameter, Value::Record(record)))
}

/// A validated boolean lambda over one record type.
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    lambda: Lambda,
    parameter: Parameter,
    ty: RecordType,
}

impl CompiledPredicate {
    pub fn new(lambda: Lambda) -> Result<Self> {
        let (parameter, ty) = validate(&lambda)?;
        let body = lambda.return_type();
        if body != DataType::Bool {
            return Err(SculptError::mismatch("predicate", DataType::Bool, body));
        }
        Ok(CompiledPredicate {
            lambda,
            parameter,
            ty,
        })
    }

    /// Evaluates the predicate for `record`.
    pub fn matches(&self, record: &dyn Reflect) -> Result<bool> {
        let scope = bind(&self.parameter, &self.ty, record)?;
        truth(evaluate(self.lambda.body(), &scope)?)
    }
}

/// A validated scalar-valued lambda over one record type.
#[derive(Debug, Clone)]
pub struct CompiledKey {
    lambda: Lambda,
    parameter: Parameter,
    ty: RecordType,
}

impl CompiledKey {
    pub fn new(lambda: Lambda) -> Result<Self> {
        let (parameter, ty) = validate(&lambda)?;
        let body = lambda.return_type();
        if !body.is_scalar() {
            return Err(SculptError::mismatch("ordering key", "scalar type", body));
        }
        Ok(CompiledKey {
            lambda,
            parameter,
            ty,
        })
    }

    /// Evaluates the key for `record`.
    pub fn key<'a>(&'a self, record: &'a dyn Reflect) -> Result<Value<'a>> {
        let scope = bind(&self.parameter, &self.ty, record)?;
        evaluate(self.lambda.body(), &scope)
    }
}

/// A validated record-initializer lambda.
#[derive(Debug, Clone)]
pub struct CompiledProjection {
    lambda: Lambda,
    parameter: Parameter,
    ty: RecordType,
    target: RecordType,
}

impl CompiledProjection {
    /// # Errors
    ///
    /// [`SculptError::InvalidArgument`] if the body is not a record
    /// initializer, and [`SculptError::UnsupportedShape`] if the constructed
    /// type has members without a literal representation.
    pub fn new(lambda: Lambda) -> Result<Self> {
        let (parameter, ty) = validate(&lambda)?;
        let target = match lambda.body().kind() {
            ExprKind::MemberInit { ty, .. } => ty.clone(),
            _ => {
                return Err(SculptError::invalid(
                    "projection",
                    format!("`{}` does not construct a record", lambda),
                ))
            }
        };
        DynamicRecord::new(target.clone())?;
        Ok(CompiledProjection {
            lambda,
            parameter,
            ty,
            target,
        })
    }

    /// The type of the records this projection builds.
    pub fn target(&self) -> &RecordType {
        &self.target
    }

    /// Builds the projected record for `record`.
    pub fn project(&self, record: &dyn Reflect) -> Result<DynamicRecord> {
        let scope = bind(&self.parameter, &self.ty, record)?;
        let mut out = DynamicRecord::new(self.target.clone())?;
        if let ExprKind::MemberInit { bindings, .. } = self.lambda.body().kind() {
            for binding in bindings {
                let value = evaluate(binding.value(), &scope)?;
                let literal = value.to_literal().ok_or_else(|| {
                    SculptError::unsupported(format!(
                        "member `{}` holds a record",
                        binding.member().name()
                    ))
                })?;
                out.set(binding.member().name(), literal)?;
            }
        }
        Ok(out)
    }
}
