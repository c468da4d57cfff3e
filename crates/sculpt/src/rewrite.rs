//! Tree rewriting and parameter unification.
//!
//! [`Rewriter`] is a post-order rewriting visitor: [`walk`] rewrites every
//! child of a node and rebuilds the node only if some child changed, so
//! untouched subtrees keep their identity. [`ParameterReplacer`] is the
//! rewriter that substitutes one node for another, matching by identity and
//! never by structure.

use std::collections::HashSet;

use tracing::trace;

use crate::error::{Result, SculptError};
use crate::expr::{Expr, ExprKind, Lambda, ParamId, Parameter};

/// A tree-to-tree transformation.
///
/// Implementors override [`Rewriter::rewrite`] to intercept nodes and call
/// [`walk`] to continue into the children of nodes they leave alone.
pub trait Rewriter {
    /// Rewrites `expr`. The default rewrites the children only.
    fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
        walk(self, expr)
    }
}

/// Rewrites the children of `expr` and rebuilds it from the results.
///
/// Returns `expr` itself when every child comes back unchanged.
pub fn walk<R: Rewriter + ?Sized>(rewriter: &mut R, expr: &Expr) -> Result<Expr> {
    match expr.kind() {
        ExprKind::Parameter(_) | ExprKind::Constant(_) | ExprKind::Source { .. } => Ok(expr.clone()),
        ExprKind::Member { target, member } => {
            let new_target = rewriter.rewrite(target)?;
            if Expr::ptr_eq(&new_target, target) {
                return Ok(expr.clone());
            }
            Expr::member(new_target, member.name())
        }
        ExprKind::Convert { operand, ty } => {
            let new_operand = rewriter.rewrite(operand)?;
            if Expr::ptr_eq(&new_operand, operand) {
                return Ok(expr.clone());
            }
            Expr::convert(new_operand, ty.clone())
        }
        ExprKind::Binary { op, left, right } => {
            let new_left = rewriter.rewrite(left)?;
            let new_right = rewriter.rewrite(right)?;
            if Expr::ptr_eq(&new_left, left) && Expr::ptr_eq(&new_right, right) {
                return Ok(expr.clone());
            }
            Expr::binary(*op, new_left, new_right)
        }
        ExprKind::Not(operand) => {
            let new_operand = rewriter.rewrite(operand)?;
            if Expr::ptr_eq(&new_operand, operand) {
                return Ok(expr.clone());
            }
            Expr::negate(new_operand)
        }
        ExprKind::Lambda(lambda) => match walk_lambda(rewriter, lambda)? {
            Some(rebuilt) => Ok(rebuilt.into_expr()),
            None => Ok(expr.clone()),
        },
        ExprKind::Call {
            method,
            source,
            argument,
        } => {
            let new_source = rewriter.rewrite(source)?;
            let new_argument = walk_lambda(rewriter, argument)?;
            if Expr::ptr_eq(&new_source, source) && new_argument.is_none() {
                return Ok(expr.clone());
            }
            let argument = new_argument.unwrap_or_else(|| argument.clone());
            Expr::call(*method, new_source, argument)
        }
        ExprKind::MemberInit { ty, bindings } => {
            let mut changed = false;
            let mut rebuilt = Vec::with_capacity(bindings.len());
            for binding in bindings {
                let value = rewriter.rewrite(binding.value())?;
                changed |= !Expr::ptr_eq(&value, binding.value());
                rebuilt.push((binding.member().name(), value));
            }
            if !changed {
                return Ok(expr.clone());
            }
            Expr::member_init(ty.clone(), rebuilt)
        }
    }
}

/// Rewrites a lambda's parameter list and body.
///
/// Returns `None` when nothing changed. A parameter may only be rewritten
/// into another parameter.
fn walk_lambda<R: Rewriter + ?Sized>(rewriter: &mut R, lambda: &Lambda) -> Result<Option<Lambda>> {
    let mut changed = false;
    let mut parameters = Vec::with_capacity(lambda.parameters().len());
    for parameter in lambda.parameters() {
        let rewritten = rewriter.rewrite(&parameter.to_expr())?;
        let new_parameter = rewritten.as_parameter().cloned().ok_or_else(|| {
            SculptError::invalid(
                "rewrite",
                format!(
                    "lambda parameter `{}` can only be replaced by a parameter, got `{}`",
                    parameter.name(),
                    rewritten
                ),
            )
        })?;
        changed |= new_parameter != *parameter;
        parameters.push(new_parameter);
    }

    let body = rewriter.rewrite(lambda.body())?;
    changed |= !Expr::ptr_eq(&body, lambda.body());

    if !changed {
        return Ok(None);
    }
    Lambda::new(parameters, body).map(Some)
}

/// Substitutes `new` for every occurrence of `old`.
///
/// A node matches when it is the same allocation as `old`, or when both are
/// parameter nodes of the same variable. Matched nodes are replaced without
/// visiting their children.
#[derive(Debug, Clone)]
pub struct ParameterReplacer {
    old: Expr,
    new: Expr,
}

impl ParameterReplacer {
    /// Creates a replacer. Both nodes must have the same static type.
    pub fn new(old: Expr, new: Expr) -> Result<Self> {
        let (old_type, new_type) = (old.data_type(), new.data_type());
        if old_type != new_type {
            return Err(SculptError::mismatch("substitution", &old_type, &new_type));
        }
        Ok(ParameterReplacer { old, new })
    }

    /// Creates a replacer that retargets references to `old` onto `new`.
    pub fn for_parameters(old: &Parameter, new: &Parameter) -> Result<Self> {
        ParameterReplacer::new(old.to_expr(), new.to_expr())
    }

    fn matches(&self, expr: &Expr) -> bool {
        if Expr::ptr_eq(expr, &self.old) {
            return true;
        }
        match (expr.as_parameter(), self.old.as_parameter()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Applies the substitution to `expr`.
    pub fn apply(&mut self, expr: &Expr) -> Result<Expr> {
        self.rewrite(expr)
    }
}

impl Rewriter for ParameterReplacer {
    fn rewrite(&mut self, expr: &Expr) -> Result<Expr> {
        if self.matches(expr) {
            return Ok(self.new.clone());
        }
        walk(self, expr)
    }
}

/// Replaces every occurrence of `old` in `expr` with `new`.
pub fn replace(expr: &Expr, old: &Expr, new: &Expr) -> Result<Expr> {
    ParameterReplacer::new(old.clone(), new.clone())?.apply(expr)
}

/// Retargets a single-parameter lambda onto `onto`.
///
/// The result has `onto` as its only parameter and a body in which every
/// reference to the lambda's own parameter now references `onto`.
pub fn unify(lambda: &Lambda, onto: &Parameter) -> Result<Lambda> {
    let own = lambda.parameter().ok_or_else(|| {
        SculptError::invalid(
            "lambda",
            format!(
                "expected a single-parameter lambda, got {} parameters",
                lambda.parameters().len()
            ),
        )
    })?;
    let mut replacer = ParameterReplacer::for_parameters(own, onto)?;
    let body = replacer.apply(lambda.body())?;
    trace!(from = own.id().get(), onto = onto.id().get(), "unified lambda parameter");
    Ok(Lambda::unary(onto.clone(), body))
}

/// Parameters referenced in `expr` that no enclosing lambda declares.
///
/// Each variable is listed once, in order of first occurrence.
pub fn free_parameters(expr: &Expr) -> Vec<Parameter> {
    let mut bound = Vec::new();
    let mut seen = HashSet::new();
    let mut free = Vec::new();
    collect_free(expr, &mut bound, &mut seen, &mut free);
    free
}

fn collect_free(
    expr: &Expr,
    bound: &mut Vec<ParamId>,
    seen: &mut HashSet<ParamId>,
    free: &mut Vec<Parameter>,
) {
    match expr.kind() {
        ExprKind::Parameter(p) => {
            if !bound.contains(&p.id()) && seen.insert(p.id()) {
                free.push(p.clone());
            }
        }
        ExprKind::Constant(_) | ExprKind::Source { .. } => {}
        ExprKind::Member { target, .. } => collect_free(target, bound, seen, free),
        ExprKind::Convert { operand, .. } | ExprKind::Not(operand) => {
            collect_free(operand, bound, seen, free)
        }
        ExprKind::Binary { left, right, .. } => {
            collect_free(left, bound, seen, free);
            collect_free(right, bound, seen, free);
        }
        ExprKind::Lambda(lambda) => collect_free_lambda(lambda, bound, seen, free),
        ExprKind::Call {
            source, argument, ..
        } => {
            collect_free(source, bound, seen, free);
            collect_free_lambda(argument, bound, seen, free);
        }
        ExprKind::MemberInit { bindings, .. } => {
            for binding in bindings {
                collect_free(binding.value(), bound, seen, free);
            }
        }
    }
}

fn collect_free_lambda(
    lambda: &Lambda,
    bound: &mut Vec<ParamId>,
    seen: &mut HashSet<ParamId>,
    free: &mut Vec<Parameter>,
) {
    let depth = bound.len();
    bound.extend(lambda.parameters().iter().map(Parameter::id));
    collect_free(lambda.body(), bound, seen, free);
    bound.truncate(depth);
}
