//! Text rendering of expression trees.
//!
//! The format mirrors the usual lambda notation:
//!
//! ```text
//! m => ((m.name == "Ada") AndAlso (m.age == Convert(36, int?)))
//! people.Where(m => (m.active == true)).OrderByDescending(m => m.age)
//! ```

use std::fmt;

use super::{Expr, ExprKind, Lambda};

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            ExprKind::Parameter(p) => write!(f, "{}", p.name()),
            ExprKind::Constant(c) => write!(f, "{}", c.value()),
            ExprKind::Member { target, member } => write!(f, "{}.{}", target, member.name()),
            ExprKind::Convert { operand, ty } => write!(f, "Convert({}, {})", operand, ty),
            ExprKind::Binary { op, left, right } => write!(f, "({} {} {})", left, op, right),
            ExprKind::Not(operand) => write!(f, "Not({})", operand),
            ExprKind::Lambda(lambda) => write!(f, "{}", lambda),
            ExprKind::Call {
                method,
                source,
                argument,
            } => write!(f, "{}.{}({})", source, method, argument),
            ExprKind::Source { name, .. } => write!(f, "{}", name),
            ExprKind::MemberInit { ty, bindings } => {
                write!(f, "new {} {{ ", ty.name())?;
                for (i, binding) in bindings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", binding.member().name(), binding.value())?;
                }
                write!(f, " }}")
            }
        }
    }
}

impl fmt::Display for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.parameters() {
            [p] => write!(f, "{} => {}", p.name(), self.body()),
            params => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p.name())?;
                }
                write!(f, ") => {}", self.body())
            }
        }
    }
}
