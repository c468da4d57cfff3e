//! Error types for the sculpt crate.

use thiserror::Error;

/// Errors raised while resolving members, building expressions, synthesizing
/// projection shapes or evaluating lowered lambdas.
///
/// Every error is reported by the call that first detects the violated
/// precondition. All operations are pure over their inputs, so retrying a
/// failed call without changing its input fails the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SculptError {
    /// A required input was empty or malformed.
    #[error("invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// A path segment does not name a member of the current type.
    #[error("member `{member}` not found on type `{type_name}`")]
    MemberNotFound { type_name: String, member: String },

    /// The member exists but is a plain field rather than a property.
    #[error("member `{member}` on type `{type_name}` refers to a field, not a property")]
    NotAProperty { type_name: String, member: String },

    /// A combinator was invoked with zero expressions.
    #[error("there must be at least one expression to combine")]
    EmptyInput,

    /// The requested projection cannot be represented as a synthesized type.
    #[error("unsupported projection shape: {reason}")]
    UnsupportedShape { reason: String },

    /// Operand types do not fit the node being constructed.
    #[error("type mismatch in {context}: expected {expected}, got {actual}")]
    TypeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },

    /// A lowered lambda references a parameter that is not in scope.
    #[error("parameter `{name}` (#{id}) is not bound in this scope")]
    UnboundParameter { name: String, id: u64 },
}

impl SculptError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SculptError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(
        context: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        SculptError::TypeMismatch {
            context,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn unsupported(reason: impl Into<String>) -> Self {
        SculptError::UnsupportedShape {
            reason: reason.into(),
        }
    }
}

/// Result type for sculpt operations.
pub type Result<T> = std::result::Result<T, SculptError>;
