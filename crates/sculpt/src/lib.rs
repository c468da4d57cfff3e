//! Sculpt - runtime expression trees and query shaping for typed records.
//!
//! Sculpt builds filter, ordering and projection logic at runtime, from
//! criteria that are only known during execution (a list of field names and
//! values supplied by a caller, a sort key picked in a UI), against
//! strongly-typed records. It provides:
//!
//! - Member resolution of dotted property paths (`address.city`)
//! - Equality predicates with nullable-aware coercion
//! - Combination of independently built predicates over one shared parameter
//! - Synthesized result types for partial-field projections, cached per shape
//! - A rewriter that adds ordering, projection and filter steps to a query
//!
//! The trees are handed to a query engine for execution. A small in-memory
//! [`MemoryEngine`] is included to run them over slices.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use sculpt::{Criteria, MemoryEngine, Query, QueryRewriter, Reflect, ShapeRegistry, Value};
//!
//! #[derive(Reflect)]
//! struct Address {
//!     city: String,
//! }
//!
//! #[derive(Reflect)]
//! struct Person {
//!     name: String,
//!     age: Option<i32>,
//!     address: Address,
//! }
//!
//! let people = vec![
//!     Person { name: "Ada".into(), age: Some(36), address: Address { city: "London".into() } },
//!     Person { name: "Grace".into(), age: None, address: Address { city: "Arlington".into() } },
//!     Person { name: "Alan".into(), age: Some(41), address: Address { city: "London".into() } },
//! ];
//!
//! let rewriter = QueryRewriter::new(Arc::new(ShapeRegistry::new()));
//! let query = Query::of::<Person>();
//! let query = rewriter.apply_filter(&query, &Criteria::new().with("address.city", "London"))?;
//! let query = rewriter.apply_order(&query, "age", true)?;
//! let query = rewriter.apply_projection(&query, &["name"])?;
//!
//! let rows = MemoryEngine::new(&people).run(&query)?;
//! let names: Vec<_> = rows.iter().filter_map(|r| r.get("name")).collect();
//! assert_eq!(names, [Value::String("Alan"), Value::String("Ada")]);
//! # Ok::<(), sculpt::SculptError>(())
//! ```
//!
//! # Expression Trees
//!
//! An [`Expr`] is an immutable, `Arc`-shared node. Factories type-check their
//! operands, so a tree that exists is well typed. Parameters are identified by
//! an explicit id: two parameters named `m` are different variables unless
//! they are the same [`Parameter`].
//!
//! # Nullable Coercion
//!
//! Comparing an `Option<T>` member with a plain `T` value (or the reverse)
//! lifts the plain side with a `Convert` node:
//!
//! ```text
//! m => (m.age == Convert(36, int?))
//! ```
//!
//! Comparisons are lifted: `null == null` holds, `null == 36` does not.
//!
//! # Shapes
//!
//! Projections are typed by a [`SynthesizedType`] obtained from a
//! [`ShapeRegistry`]. The same set of `(name, type)` pairs always maps to the
//! same type, whatever order the names were given in.

// Lets the derive macros refer to `::sculpt` from inside this crate's tests.
extern crate self as sculpt;

mod combine;
mod config;
mod engine;
mod error;
mod eval;
mod expr;
mod ordering;
mod predicate;
mod query;
mod resolve;
mod rewrite;
mod shape;
mod traits;
mod types;
mod value;

// Re-export public API
pub use combine::{combine_and, combine_lambdas, combine_lambdas_or, combine_or};
pub use config::Options;
pub use engine::{MemoryEngine, Row};
pub use error::{Result, SculptError};
pub use eval::{evaluate, CompiledKey, CompiledPredicate, CompiledProjection, Scope};
pub use expr::{
    BinaryOp, Binding, Constant, Expr, ExprKind, Lambda, Method, ParamId, Parameter,
};
pub use ordering::{compare_values, Dir};
pub use predicate::{build_equality, build_equality_from_source, Criteria, PredicateBuilder};
pub use query::{Query, QueryRewriter, Step};
pub use resolve::{member_access_lambda, members_of, resolve, resolve_member, MemberPath, PropertyPath};
pub use rewrite::{free_parameters, replace, unify, walk, ParameterReplacer, Rewriter};
pub use shape::{
    is_identifier, DynamicRecord, ProjectionSpec, ShapeRegistry, ShapeSignature, SynthesizedType,
};
pub use traits::{read_path, AsValue, Entity, FromLiteral, Reflect, ReflectEnum, Typed};
pub use types::{DataType, MemberInfo, MemberKind, RecordType, TypeInfo, TypeInfoBuilder};
pub use value::{Literal, Number, Timestamp, Value};

// Derive macros
pub use sculpt_macros::{Reflect, ReflectEnum};

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::OnceCell;
}
