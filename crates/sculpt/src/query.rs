//! Composable queries and the query rewriter.
//!
//! A [`Query`] is an immutable expression: a chain of `Call` nodes rooted at
//! a `Source` node. Every operator returns a new query and leaves the
//! original untouched. [`QueryRewriter`] adds steps from runtime input
//! (property paths, field name lists, criteria), resolving names against the
//! current element type.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::config::Options;
use crate::error::{Result, SculptError};
use crate::expr::{Expr, ExprKind, Lambda, Method, Parameter};
use crate::ordering::Dir;
use crate::predicate::{Criteria, PredicateBuilder};
use crate::resolve::{member_access_lambda, resolve, PropertyPath};
use crate::shape::{ProjectionSpec, ShapeRegistry};
use crate::traits::Entity;
use crate::types::{DataType, RecordType};

/// One operator application of a query, in execution order.
#[derive(Debug, Clone)]
pub struct Step {
    pub method: Method,
    pub argument: Lambda,
}

/// An immutable query over a sequence of records.
///
/// ```
/// use sculpt::{member_access_lambda, DataType, Dir, PropertyPath, Query, TypeInfo};
///
/// let person = TypeInfo::builder("Person").property("name", DataType::String).build();
/// let key = member_access_lambda(&person, &PropertyPath::parse("name")?, "m")?;
///
/// let query = Query::from_type(person);
/// let ordered = query.order_by(key, Dir::Desc)?;
/// assert_eq!(query.steps().len(), 0);
/// assert_eq!(ordered.to_string(), "Person.OrderByDescending(m => m.name)");
/// # Ok::<(), sculpt::SculptError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Query {
    expression: Expr,
    element: RecordType,
}

impl Query {
    /// A query over all records of `ty`.
    pub fn from_type(ty: RecordType) -> Self {
        let expression = Expr::source(ty.name(), ty.clone());
        Query {
            expression,
            element: ty,
        }
    }

    /// A query over all records of a derived entity type.
    pub fn of<T: Entity>() -> Self {
        Query::from_type(T::type_info())
    }

    /// The query's expression tree.
    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    /// Type of the records the query currently yields.
    pub fn element_type(&self) -> &RecordType {
        &self.element
    }

    /// Type of the records the query reads from.
    pub fn source_type(&self) -> RecordType {
        let mut current = &self.expression;
        loop {
            match current.kind() {
                ExprKind::Call { source, .. } => current = source,
                ExprKind::Source { element, .. } => return element.clone(),
                // Queries are only built from Source and Call nodes.
                _ => return self.element.clone(),
            }
        }
    }

    /// The operators applied so far, first to last.
    pub fn steps(&self) -> Vec<Step> {
        let mut steps = Vec::new();
        let mut current = &self.expression;
        while let ExprKind::Call {
            method,
            source,
            argument,
        } = current.kind()
        {
            steps.push(Step {
                method: *method,
                argument: argument.clone(),
            });
            current = source;
        }
        steps.reverse();
        steps
    }

    fn last_method(&self) -> Option<Method> {
        match self.expression.kind() {
            ExprKind::Call { method, .. } => Some(*method),
            _ => None,
        }
    }

    fn push(&self, method: Method, argument: Lambda, element: RecordType) -> Result<Query> {
        let expression = Expr::call(method, self.expression.clone(), argument)?;
        Ok(Query {
            expression,
            element,
        })
    }

    /// Keeps the records for which `predicate` holds.
    pub fn filter(&self, predicate: Lambda) -> Result<Query> {
        self.push(Method::Where, predicate, self.element.clone())
    }

    /// Sorts by `key`, replacing any earlier ordering.
    pub fn order_by(&self, key: Lambda, dir: Dir) -> Result<Query> {
        let method = match dir {
            Dir::Asc => Method::OrderBy,
            Dir::Desc => Method::OrderByDescending,
        };
        self.push(method, key, self.element.clone())
    }

    /// Breaks ties of the preceding ordering by `key`.
    ///
    /// # Errors
    ///
    /// [`SculptError::InvalidArgument`] unless the last step is an ordering.
    pub fn then_by(&self, key: Lambda, dir: Dir) -> Result<Query> {
        if !self.last_method().is_some_and(Method::is_ordering) {
            return Err(SculptError::invalid(
                "query",
                "a secondary ordering must follow an ordering",
            ));
        }
        let method = match dir {
            Dir::Asc => Method::ThenBy,
            Dir::Desc => Method::ThenByDescending,
        };
        self.push(method, key, self.element.clone())
    }

    /// Maps each record through `projection`, whose body builds a record.
    pub fn select(&self, projection: Lambda) -> Result<Query> {
        let element = match projection.return_type() {
            DataType::Record(record) => record,
            other => return Err(SculptError::mismatch("Select", "record", other)),
        };
        self.push(Method::Select, projection, element)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.expression)
    }
}

/// Adds ordering, projection and filter steps to queries from runtime input.
///
/// ```
/// use std::sync::Arc;
/// use sculpt::{DataType, Query, QueryRewriter, ShapeRegistry, TypeInfo};
///
/// let address = TypeInfo::builder("Address").property("city", DataType::String).build();
/// let person = TypeInfo::builder("Person")
///     .property("name", DataType::String)
///     .property("age", DataType::Int)
///     .property("address", address.data_type())
///     .build();
///
/// let rewriter = QueryRewriter::new(Arc::new(ShapeRegistry::new()));
/// let query = Query::from_type(person);
/// let query = rewriter.apply_order(&query, "address.city", true)?;
/// let query = rewriter.apply_projection(&query, &["name", "age"])?;
///
/// assert_eq!(
///     query.to_string(),
///     "Person.OrderByDescending(m => m.address.city).Select(m => new Shape_0 { name = m.name, age = m.age })"
/// );
/// # Ok::<(), sculpt::SculptError>(())
/// ```
#[derive(Debug, Clone)]
pub struct QueryRewriter {
    registry: Arc<ShapeRegistry>,
    options: Options,
}

impl QueryRewriter {
    /// Creates a rewriter with the default options.
    pub fn new(registry: Arc<ShapeRegistry>) -> Self {
        QueryRewriter::with_options(registry, Options::default())
    }

    pub fn with_options(registry: Arc<ShapeRegistry>, options: Options) -> Self {
        QueryRewriter { registry, options }
    }

    /// The registry projections are synthesized in.
    pub fn registry(&self) -> &Arc<ShapeRegistry> {
        &self.registry
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    fn key(&self, query: &Query, path: &str) -> Result<Lambda> {
        let path = PropertyPath::parse_with(path, &self.options)?;
        member_access_lambda(query.element_type(), &path, self.options.parameter_name())
    }

    /// Orders `query` by the member at `path`.
    pub fn apply_order(&self, query: &Query, path: &str, descending: bool) -> Result<Query> {
        let key = self.key(query, path)?;
        let dir = Dir::from_descending(descending);
        debug!(path, %dir, "applying order");
        query.order_by(key, dir)
    }

    /// Adds a secondary ordering by the member at `path`.
    pub fn apply_then_order(&self, query: &Query, path: &str, descending: bool) -> Result<Query> {
        let key = self.key(query, path)?;
        let dir = Dir::from_descending(descending);
        debug!(path, %dir, "applying secondary order");
        query.then_by(key, dir)
    }

    /// Projects `query` onto the named members.
    ///
    /// Each name is resolved against the element type; the synthesized
    /// result type has one member per name, with the resolved type.
    ///
    /// # Errors
    ///
    /// [`SculptError::InvalidArgument`] if `field_names` is empty or names a
    /// member twice, resolution errors for unknown names, and
    /// [`SculptError::UnsupportedShape`] when
    /// the names do not form a valid shape (nested paths, record members).
    pub fn apply_projection<S: AsRef<str>>(&self, query: &Query, field_names: &[S]) -> Result<Query> {
        if field_names.is_empty() {
            return Err(SculptError::invalid(
                "field_names",
                "at least one field is required",
            ));
        }

        let element = query.element_type();
        let mut spec = ProjectionSpec::new();
        let mut resolved = Vec::with_capacity(field_names.len());
        for (i, name) in field_names.iter().enumerate() {
            let name = name.as_ref();
            if field_names[..i].iter().any(|seen| seen.as_ref() == name) {
                return Err(SculptError::invalid(
                    "field_names",
                    format!("`{}` is listed more than once", name),
                ));
            }
            let path = resolve(element, &PropertyPath::parse_with(name, &self.options)?)?;
            spec.insert(name, path.data_type().clone())?;
            resolved.push((name, path));
        }

        let shape = self.registry.get_or_create(&spec)?;
        let parameter = Parameter::new(self.options.parameter_name(), element.data_type());
        let bindings = resolved
            .iter()
            .map(|(name, path)| Ok((*name, path.access(parameter.to_expr())?)))
            .collect::<Result<Vec<_>>>()?;
        let init = Expr::member_init(shape.record_type().clone(), bindings)?;

        debug!(shape = shape.name(), signature = %shape.signature(), "applying projection");
        query.select(Lambda::unary(parameter, init))
    }

    /// Filters `query` to records matching every criteria pair.
    pub fn apply_filter(&self, query: &Query, criteria: &Criteria) -> Result<Query> {
        let builder = PredicateBuilder::new(query.element_type().clone(), self.options.clone());
        let predicate = builder.criteria(criteria)?;
        debug!(criteria = criteria.len(), "applying filter");
        query.filter(predicate)
    }

    /// Filters `query` with a prebuilt predicate.
    pub fn apply_predicate(&self, query: &Query, predicate: Lambda) -> Result<Query> {
        query.filter(predicate)
    }
}
