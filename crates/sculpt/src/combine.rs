//! Combining predicates.
//!
//! Predicates built independently each carry their own parameter. Before they
//! can be joined into one lambda, every body is retargeted onto a single
//! fresh parameter with [`unify`].

use tracing::debug;

use crate::error::{Result, SculptError};
use crate::expr::{BinaryOp, Expr, Lambda, Parameter};
use crate::rewrite::unify;
use crate::types::DataType;

/// Joins boolean nodes with `AndAlso`, folding left to right.
///
/// `[a, b, c]` becomes `((a AndAlso b) AndAlso c)`. A single node is returned
/// unchanged.
///
/// # Errors
///
/// [`SculptError::EmptyInput`] when `nodes` is empty, and
/// [`SculptError::TypeMismatch`] when a node is not boolean.
pub fn combine_and<I>(nodes: I) -> Result<Expr>
where
    I: IntoIterator<Item = Expr>,
{
    fold(BinaryOp::AndAlso, nodes)
}

/// Joins boolean nodes with `OrElse`, folding left to right.
pub fn combine_or<I>(nodes: I) -> Result<Expr>
where
    I: IntoIterator<Item = Expr>,
{
    fold(BinaryOp::OrElse, nodes)
}

fn fold<I>(op: BinaryOp, nodes: I) -> Result<Expr>
where
    I: IntoIterator<Item = Expr>,
{
    let mut nodes = nodes.into_iter();
    let first = nodes.next().ok_or(SculptError::EmptyInput)?;
    let ty = first.data_type();
    if ty != DataType::Bool {
        return Err(SculptError::mismatch(op.as_str(), DataType::Bool, ty));
    }
    nodes.try_fold(first, |acc, node| Expr::binary(op, acc, node))
}

/// Merges single-parameter predicates into one lambda whose body is the
/// conjunction of theirs.
///
/// The result declares one fresh parameter, named and typed like the first
/// lambda's; no input parameter survives in the result. The result holds for
/// a value exactly when every input holds for it.
///
/// ```
/// use sculpt::{combine_lambdas, DataType, Expr, Lambda, Parameter};
///
/// let a = Parameter::new("x", DataType::Int);
/// let b = Parameter::new("y", DataType::Int);
/// let positive = Lambda::unary(a.clone(), Expr::binary(sculpt::BinaryOp::Gt, a.to_expr(), Expr::constant(0i64))?);
/// let small = Lambda::unary(b.clone(), Expr::binary(sculpt::BinaryOp::Lt, b.to_expr(), Expr::constant(10i64))?);
///
/// let both = combine_lambdas(&[positive, small])?;
/// assert_eq!(both.to_string(), "x => ((x > 0) AndAlso (x < 10))");
/// # Ok::<(), sculpt::SculptError>(())
/// ```
pub fn combine_lambdas(lambdas: &[Lambda]) -> Result<Lambda> {
    merge(BinaryOp::AndAlso, lambdas)
}

/// Like [`combine_lambdas`], joining the bodies with `OrElse`.
pub fn combine_lambdas_or(lambdas: &[Lambda]) -> Result<Lambda> {
    merge(BinaryOp::OrElse, lambdas)
}

fn merge(op: BinaryOp, lambdas: &[Lambda]) -> Result<Lambda> {
    let first = lambdas.first().ok_or(SculptError::EmptyInput)?;
    let template = single_parameter(first)?;
    let shared = template.fresh();

    let mut bodies = Vec::with_capacity(lambdas.len());
    for lambda in lambdas {
        let parameter = single_parameter(lambda)?;
        if parameter.data_type() != shared.data_type() {
            return Err(SculptError::mismatch(
                "lambda merge",
                shared.data_type(),
                parameter.data_type(),
            ));
        }
        bodies.push(unify(lambda, &shared)?.body().clone());
    }

    let body = fold(op, bodies)?;
    debug!(
        count = lambdas.len(),
        op = op.as_str(),
        parameter = shared.name(),
        "merged lambdas"
    );
    Ok(Lambda::unary(shared, body))
}

fn single_parameter(lambda: &Lambda) -> Result<&Parameter> {
    lambda.parameter().ok_or_else(|| {
        SculptError::invalid(
            "lambdas",
            format!(
                "every lambda must take exactly one parameter, got {}",
                lambda.parameters().len()
            ),
        )
    })
}
