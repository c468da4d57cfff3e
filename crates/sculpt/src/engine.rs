//! In-memory reference engine.
//!
//! [`MemoryEngine`] runs a [`Query`] over a slice of entities by lowering
//! each step with [`CompiledPredicate`], [`CompiledKey`] and
//! [`CompiledProjection`]. It exists so the
//! trees the rewriter builds can be checked end to end; it does no planning.

use tracing::{debug, trace};

use crate::error::{Result, SculptError};
use crate::eval::{CompiledKey, CompiledPredicate, CompiledProjection};
use crate::expr::Method;
use crate::ordering::{compare_keys, Dir};
use crate::query::Query;
use crate::shape::DynamicRecord;
use crate::traits::{Entity, Reflect};
use crate::types::RecordType;
use crate::value::{Literal, Value};

/// A result row: either a borrowed source entity or a projected record.
#[derive(Debug)]
pub enum Row<'a> {
    Source(&'a dyn Reflect),
    Projected(DynamicRecord),
}

impl<'a> Row<'a> {
    /// The source entity, for rows that were not projected.
    pub fn as_source(&self) -> Option<&'a dyn Reflect> {
        match self {
            Row::Source(record) => Some(*record),
            Row::Projected(_) => None,
        }
    }

    /// The projected record, for rows produced by a `Select` step.
    pub fn as_projected(&self) -> Option<&DynamicRecord> {
        match self {
            Row::Projected(record) => Some(record),
            Row::Source(_) => None,
        }
    }
}

impl Reflect for Row<'_> {
    fn record_type(&self) -> RecordType {
        match self {
            Row::Source(record) => record.record_type(),
            Row::Projected(record) => record.record_type(),
        }
    }

    fn get(&self, member: &str) -> Option<Value<'_>> {
        match self {
            Row::Source(record) => record.get(member),
            Row::Projected(record) => record.get(member),
        }
    }

    fn set(&mut self, member: &str, value: Literal) -> Result<()> {
        match self {
            Row::Source(_) => Err(SculptError::invalid(
                "row",
                format!("source rows are read-only, cannot set `{}`", member),
            )),
            Row::Projected(record) => record.set(member, value),
        }
    }
}

/// Executes queries over a borrowed slice.
///
/// ```
/// use std::sync::Arc;
/// use sculpt::{MemoryEngine, Query, QueryRewriter, Reflect, ShapeRegistry, Value};
///
/// #[derive(Reflect)]
/// struct City {
///     name: String,
///     population: u32,
/// }
///
/// let cities = vec![
///     City { name: "Porto".into(), population: 230_000 },
///     City { name: "Lisbon".into(), population: 545_000 },
/// ];
///
/// let rewriter = QueryRewriter::new(Arc::new(ShapeRegistry::new()));
/// let query = rewriter.apply_order(&Query::of::<City>(), "population", true)?;
/// let query = rewriter.apply_projection(&query, &["name"])?;
///
/// let rows = MemoryEngine::new(&cities).run(&query)?;
/// assert_eq!(rows[0].get("name"), Some(Value::String("Lisbon")));
/// assert_eq!(rows[1].get("population"), None);
/// # Ok::<(), sculpt::SculptError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MemoryEngine<'a, T> {
    items: &'a [T],
}

impl<'a, T: Entity> MemoryEngine<'a, T> {
    pub fn new(items: &'a [T]) -> Self {
        MemoryEngine { items }
    }

    /// Runs every step of `query`, in order.
    ///
    /// Orderings are stable: rows with equal keys keep their relative order.
    /// A primary ordering followed by secondary orderings is applied as one
    /// multi-key sort.
    ///
    /// # Errors
    ///
    /// [`SculptError::TypeMismatch`] if the query does not read from `T`,
    /// plus any error from lowering or evaluating a step.
    pub fn run(&self, query: &Query) -> Result<Vec<Row<'a>>> {
        let expected = T::type_info();
        let source = query.source_type();
        if source != expected {
            return Err(SculptError::mismatch(
                "query source",
                expected.name(),
                source.name(),
            ));
        }

        let mut rows: Vec<Row<'a>> = self
            .items
            .iter()
            .map(|item| Row::Source(item as &dyn Reflect))
            .collect();
        let mut keys: Vec<(CompiledKey, Dir)> = Vec::new();

        for step in query.steps() {
            if step.method.is_then() {
                keys.push((CompiledKey::new(step.argument)?, direction(step.method)));
                continue;
            }
            rows = sort(rows, &keys)?;
            keys.clear();

            match step.method {
                Method::Where => {
                    let predicate = CompiledPredicate::new(step.argument)?;
                    let before = rows.len();
                    rows = filter(rows, &predicate)?;
                    trace!(before, after = rows.len(), "applied filter");
                }
                Method::Select => {
                    let projection = CompiledProjection::new(step.argument)?;
                    rows = rows
                        .iter()
                        .map(|row| projection.project(row).map(Row::Projected))
                        .collect::<Result<Vec<_>>>()?;
                    trace!(shape = projection.target().name(), "applied projection");
                }
                method => {
                    keys.push((CompiledKey::new(step.argument)?, direction(method)));
                }
            }
        }
        let rows = sort(rows, &keys)?;

        debug!(source = expected.name(), rows = rows.len(), "query executed");
        Ok(rows)
    }
}

fn direction(method: Method) -> Dir {
    Dir::from_descending(method.is_descending())
}

fn filter<'a>(rows: Vec<Row<'a>>, predicate: &CompiledPredicate) -> Result<Vec<Row<'a>>> {
    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        if predicate.matches(&row)? {
            kept.push(row);
        }
    }
    Ok(kept)
}

fn sort<'a>(rows: Vec<Row<'a>>, keys: &[(CompiledKey, Dir)]) -> Result<Vec<Row<'a>>> {
    if keys.is_empty() {
        return Ok(rows);
    }

    let dirs: Vec<Dir> = keys.iter().map(|(_, dir)| *dir).collect();
    let mut keyed = rows
        .into_iter()
        .map(|row| {
            let row_keys = keys
                .iter()
                .map(|(key, _)| key_literal(key, &row))
                .collect::<Result<Vec<_>>>()?;
            Ok((row_keys, row))
        })
        .collect::<Result<Vec<_>>>()?;

    // sort_by is stable.
    keyed.sort_by(|(a, _), (b, _)| compare_keys(a, b, &dirs));
    Ok(keyed.into_iter().map(|(_, row)| row).collect())
}

fn key_literal(key: &CompiledKey, row: &Row<'_>) -> Result<Literal> {
    let value = key.key(row)?;
    value
        .to_literal()
        .ok_or_else(|| SculptError::mismatch("ordering key", "scalar value", value.kind_name()))
}
