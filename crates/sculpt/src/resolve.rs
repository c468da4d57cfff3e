//! Member resolution.
//!
//! Turns a dotted property path such as `address.city` into the chain of
//! member descriptors it names, starting from a record type. Each segment is
//! looked up on the value type of the previous one; optional records are
//! looked through.

use std::fmt;

use crate::config::Options;
use crate::error::{Result, SculptError};
use crate::expr::{Expr, ExprKind, Lambda, Parameter};
use crate::types::{DataType, MemberInfo, MemberKind, RecordType};

/// An ordered, non-empty list of member names.
///
/// A path displays with the separator it was parsed with. Two paths with the
/// same segments are equal whatever their separators.
#[derive(Debug, Clone)]
pub struct PropertyPath {
    segments: Vec<String>,
    separator: char,
}

impl PropertyPath {
    /// Parses a path with the default options.
    pub fn parse(path: &str) -> Result<Self> {
        PropertyPath::parse_with(path, &Options::default())
    }

    /// Parses a path using the separator and depth limit from `options`.
    pub fn parse_with(path: &str, options: &Options) -> Result<Self> {
        if path.is_empty() {
            return Err(SculptError::invalid("path", "path is empty"));
        }
        let segments: Vec<String> = path
            .split(options.path_separator())
            .map(str::to_string)
            .collect();
        PropertyPath::from_segments(segments, options)
    }

    /// Builds a path from already-split segments.
    pub fn from_segments<I, S>(segments: I, options: &Options) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        let separator = options.path_separator();
        if segments.is_empty() {
            return Err(SculptError::invalid("path", "path is empty"));
        }
        if let Some(i) = segments.iter().position(|s| s.is_empty()) {
            return Err(SculptError::invalid(
                "path",
                format!(
                    "segment {} of `{}` is empty",
                    i + 1,
                    join(&segments, separator)
                ),
            ));
        }
        if segments.len() > options.max_path_depth() {
            return Err(SculptError::invalid(
                "path",
                format!(
                    "path has {} segments, the limit is {}",
                    segments.len(),
                    options.max_path_depth()
                ),
            ));
        }
        Ok(PropertyPath {
            segments,
            separator,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Always `false`; paths have at least one segment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl PartialEq for PropertyPath {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for PropertyPath {}

impl std::hash::Hash for PropertyPath {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.segments.hash(state);
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&join(&self.segments, self.separator))
    }
}

fn join(segments: &[String], separator: char) -> String {
    let mut buf = [0u8; 4];
    segments.join(separator.encode_utf8(&mut buf))
}

/// The resolved members of a [`PropertyPath`], one per segment.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberPath {
    root: RecordType,
    members: Vec<MemberInfo>,
}

impl MemberPath {
    /// The record type the path starts from.
    pub fn root(&self) -> &RecordType {
        &self.root
    }

    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// The last member of the path.
    pub fn leaf(&self) -> &MemberInfo {
        // Resolution never produces an empty path.
        &self.members[self.members.len() - 1]
    }

    /// Declared type of the last member.
    pub fn data_type(&self) -> &DataType {
        self.leaf().data_type()
    }

    /// Member names in order, e.g. `["address", "city"]`.
    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(MemberInfo::name).collect()
    }

    /// Builds the member-access chain `target.a.b` over `target`.
    pub fn access(&self, target: Expr) -> Result<Expr> {
        let target_type = target.data_type();
        if target_type.as_record() != Some(&self.root) {
            return Err(SculptError::mismatch(
                "member access",
                self.root.name(),
                &target_type,
            ));
        }
        self.members
            .iter()
            .try_fold(target, |acc, member| Expr::member(acc, member.name()))
    }
}

/// Renders as member access on the root type, `Person.address.city`. Member
/// access always uses `.`, like expression rendering, whatever separator the
/// path was parsed with.
impl fmt::Display for MemberPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.root.name(), self.names().join("."))
    }
}

/// Looks up one property of `ty`.
///
/// # Errors
///
/// [`SculptError::MemberNotFound`] if `ty` has no member called `name`, and
/// [`SculptError::NotAProperty`] if it has one but it is a plain field.
pub fn resolve_member(ty: &RecordType, name: &str) -> Result<MemberInfo> {
    let member = ty.member(name).ok_or_else(|| SculptError::MemberNotFound {
        type_name: ty.name().to_string(),
        member: name.to_string(),
    })?;
    match member.kind() {
        MemberKind::Property => Ok(member.clone()),
        MemberKind::Field => Err(SculptError::NotAProperty {
            type_name: ty.name().to_string(),
            member: name.to_string(),
        }),
    }
}

/// Resolves every segment of `path`, starting from `ty`.
///
/// ```
/// use sculpt::{resolve, DataType, PropertyPath, TypeInfo};
///
/// let address = TypeInfo::builder("Address").property("city", DataType::String).build();
/// let person = TypeInfo::builder("Person")
///     .property("address", DataType::optional(address.data_type()))
///     .build();
///
/// let path = resolve(&person, &PropertyPath::parse("address.city")?)?;
/// assert_eq!(path.names(), ["address", "city"]);
/// assert_eq!(path.data_type(), &DataType::String);
/// # Ok::<(), sculpt::SculptError>(())
/// ```
pub fn resolve(ty: &RecordType, path: &PropertyPath) -> Result<MemberPath> {
    let mut members: Vec<MemberInfo> = Vec::with_capacity(path.len());
    let mut current = ty.clone();

    for (i, segment) in path.segments().iter().enumerate() {
        if i > 0 {
            let previous = &members[i - 1];
            current = match previous.data_type().as_record() {
                Some(record) => record.clone(),
                None => {
                    return Err(SculptError::MemberNotFound {
                        type_name: previous.data_type().to_string(),
                        member: segment.clone(),
                    })
                }
            };
        }
        members.push(resolve_member(&current, segment)?);
    }

    Ok(MemberPath {
        root: ty.clone(),
        members,
    })
}

/// Builds `m => m.a.b` for a path on `ty`, naming the parameter `parameter_name`.
pub fn member_access_lambda(
    ty: &RecordType,
    path: &PropertyPath,
    parameter_name: &str,
) -> Result<Lambda> {
    let resolved = resolve(ty, path)?;
    let parameter = Parameter::new(parameter_name, ty.data_type());
    let body = resolved.access(parameter.to_expr())?;
    Ok(Lambda::unary(parameter, body))
}

/// The members a single-parameter lambda reads.
///
/// A member-access body (`m => m.address.city`) yields its last member; a
/// record-initializer body (`m => new T { a = m.a, b = m.b }`) yields the
/// member read by each binding.
///
/// # Errors
///
/// [`SculptError::InvalidArgument`] for any other body, including bodies that
/// compute a value rather than read one.
pub fn members_of(lambda: &Lambda) -> Result<Vec<MemberInfo>> {
    let parameter = lambda.parameter().ok_or_else(|| {
        SculptError::invalid("lambda", "expected a single-parameter lambda")
    })?;

    match lambda.body().kind() {
        ExprKind::MemberInit { bindings, .. } => bindings
            .iter()
            .map(|binding| read_member(binding.value(), parameter, lambda))
            .collect(),
        _ => Ok(vec![read_member(lambda.body(), parameter, lambda)?]),
    }
}

fn read_member(expr: &Expr, parameter: &Parameter, lambda: &Lambda) -> Result<MemberInfo> {
    let refers_to_method = || {
        SculptError::invalid(
            "lambda",
            format!("expression `{}` refers to a method, not a property", lambda),
        )
    };

    let mut current = expr;
    let mut leaf = None;
    loop {
        match current.kind() {
            ExprKind::Member { target, member } => {
                leaf.get_or_insert_with(|| member.clone());
                current = target;
            }
            ExprKind::Convert { operand, .. } if leaf.is_none() => current = operand,
            ExprKind::Parameter(p) if p == parameter => {
                return leaf.ok_or_else(refers_to_method);
            }
            _ => return Err(refers_to_method()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeInfo;

    fn person() -> RecordType {
        let address = TypeInfo::builder("Address")
            .property("city", DataType::String)
            .field("zip", DataType::String)
            .build();
        TypeInfo::builder("Person")
            .property("name", DataType::String)
            .property("age", DataType::optional(DataType::Int))
            .property("address", DataType::optional(address.data_type()))
            .field("secret", DataType::String)
            .build()
    }

    fn path(s: &str) -> PropertyPath {
        PropertyPath::parse(s).unwrap()
    }

    #[test]
    fn parses_paths() {
        assert_eq!(path("address.city").segments(), ["address", "city"]);
        assert_eq!(path("name").len(), 1);

        for bad in ["", ".", "a..b", "a.", ".a"] {
            let err = PropertyPath::parse(bad).unwrap_err();
            assert!(
                matches!(err, SculptError::InvalidArgument { name: "path", .. }),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn depth_and_separator_come_from_options() {
        let options = Options::default()
            .with_path_separator('/')
            .unwrap()
            .with_max_path_depth(2)
            .unwrap();
        assert_eq!(
            PropertyPath::parse_with("address/city", &options)
                .unwrap()
                .segments(),
            ["address", "city"]
        );
        assert!(PropertyPath::parse_with("a/b/c", &options).is_err());
        assert_eq!(
            PropertyPath::parse_with("a.b", &options).unwrap().segments(),
            ["a.b"]
        );
    }

    #[test]
    fn paths_display_with_their_separator() {
        let options = Options::default().with_path_separator('/').unwrap();
        let slashed = PropertyPath::parse_with("address/city", &options).unwrap();
        assert_eq!(slashed.to_string(), "address/city");
        assert_eq!(path("address.city").to_string(), "address.city");
        assert_eq!(slashed, path("address.city"));

        let err = PropertyPath::parse_with("address//city", &options).unwrap_err();
        assert!(err.to_string().contains("`address//city`"), "{err}");

        let resolved = resolve(&person(), &slashed).unwrap();
        assert_eq!(resolved.to_string(), "Person.address.city");
    }

    #[test]
    fn resolves_nested_members() {
        let ty = person();
        let resolved = resolve(&ty, &path("address.city")).unwrap();
        assert_eq!(resolved.names(), ["address", "city"]);
        assert_eq!(resolved.data_type(), &DataType::String);
        assert_eq!(resolved.to_string(), "Person.address.city");
        assert!(RecordType::ptr_eq(resolved.root(), &ty));
    }

    #[test]
    fn missing_members() {
        let ty = person();
        let err = resolve(&ty, &path("address.street")).unwrap_err();
        assert_eq!(
            err,
            SculptError::MemberNotFound {
                type_name: "Address".into(),
                member: "street".into()
            }
        );

        let err = resolve(&ty, &path("name.length")).unwrap_err();
        assert!(matches!(err, SculptError::MemberNotFound { .. }));
    }

    #[test]
    fn fields_are_not_properties() {
        let ty = person();
        let err = resolve(&ty, &path("secret")).unwrap_err();
        assert_eq!(
            err,
            SculptError::NotAProperty {
                type_name: "Person".into(),
                member: "secret".into()
            }
        );
        assert!(matches!(
            resolve(&ty, &path("address.zip")),
            Err(SculptError::NotAProperty { .. })
        ));
    }

    #[test]
    fn builds_member_access_lambdas() {
        let lambda = member_access_lambda(&person(), &path("address.city"), "p").unwrap();
        assert_eq!(lambda.to_string(), "p => p.address.city");
        assert_eq!(lambda.return_type(), DataType::String);
    }

    #[test]
    fn members_of_lambda_bodies() {
        let ty = person();
        let lambda = member_access_lambda(&ty, &path("address.city"), "m").unwrap();
        let members = members_of(&lambda).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name(), "city");

        let m = Parameter::new("m", ty.data_type());
        let computed = Lambda::unary(
            m.clone(),
            Expr::equal(
                Expr::member(m.to_expr(), "name").unwrap(),
                Expr::constant("x"),
            )
            .unwrap(),
        );
        let err = members_of(&computed).unwrap_err();
        assert!(err.to_string().contains("refers to a method"));

        let identity = Lambda::unary(m.clone(), m.to_expr());
        assert!(members_of(&identity).is_err());
    }

    #[test]
    fn members_of_record_initializer() {
        let ty = person();
        let shape = TypeInfo::builder("Pair")
            .property("name", DataType::String)
            .property("age", DataType::optional(DataType::Int))
            .build();
        let m = Parameter::new("m", ty.data_type());
        let body = Expr::member_init(
            shape,
            [
                ("name", Expr::member(m.to_expr(), "name").unwrap()),
                ("age", Expr::member(m.to_expr(), "age").unwrap()),
            ],
        )
        .unwrap();
        let members = members_of(&Lambda::unary(m, body)).unwrap();
        let names: Vec<&str> = members.iter().map(MemberInfo::name).collect();
        assert_eq!(names, ["name", "age"]);
    }
}
