//! Builder options.
//!
//! [`Options`] can be built in code or loaded from JSON or YAML. Missing keys
//! take their defaults:
//!
//! ```yaml
//! parameter_name: m
//! path_separator: "."
//! max_path_depth: 8
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Result, SculptError};
use crate::shape::is_identifier;

/// Options shared by the resolver, the predicate builder and the query rewriter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "OptionsRaw", into = "OptionsRaw")]
pub struct Options {
    parameter_name: String,
    path_separator: char,
    max_path_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            parameter_name: "m".to_string(),
            path_separator: '.',
            max_path_depth: 8,
        }
    }
}

impl Options {
    /// Name given to the parameter of generated lambdas.
    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    /// Separator between segments of a property path.
    pub fn path_separator(&self) -> char {
        self.path_separator
    }

    /// Longest accepted property path, in segments.
    pub fn max_path_depth(&self) -> usize {
        self.max_path_depth
    }

    /// Sets the generated parameter name. Must be an identifier.
    pub fn with_parameter_name(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_identifier(&name) {
            return Err(SculptError::invalid(
                "parameter_name",
                format!("`{}` is not an identifier", name),
            ));
        }
        self.parameter_name = name;
        Ok(self)
    }

    /// Sets the path separator. Must not be alphanumeric or `_`.
    pub fn with_path_separator(mut self, separator: char) -> Result<Self> {
        if separator.is_alphanumeric() || separator == '_' {
            return Err(SculptError::invalid(
                "path_separator",
                format!("`{}` can appear inside member names", separator),
            ));
        }
        self.path_separator = separator;
        Ok(self)
    }

    /// Sets the maximum path depth. Must be at least 1.
    pub fn with_max_path_depth(mut self, depth: usize) -> Result<Self> {
        if depth == 0 {
            return Err(SculptError::invalid(
                "max_path_depth",
                "paths need at least one segment",
            ));
        }
        self.max_path_depth = depth;
        Ok(self)
    }

    /// Parses options from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| SculptError::invalid("options", e.to_string()))
    }

    /// Parses options from YAML.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| SculptError::invalid("options", e.to_string()))
    }
}

#[derive(Serialize, Deserialize)]
#[serde(default)]
struct OptionsRaw {
    parameter_name: String,
    path_separator: char,
    max_path_depth: usize,
}

impl Default for OptionsRaw {
    fn default() -> Self {
        Options::default().into()
    }
}

impl From<Options> for OptionsRaw {
    fn from(options: Options) -> Self {
        OptionsRaw {
            parameter_name: options.parameter_name,
            path_separator: options.path_separator,
            max_path_depth: options.max_path_depth,
        }
    }
}

impl TryFrom<OptionsRaw> for Options {
    type Error = SculptError;

    fn try_from(raw: OptionsRaw) -> Result<Self> {
        Options::default()
            .with_parameter_name(raw.parameter_name)?
            .with_path_separator(raw.path_separator)?
            .with_max_path_depth(raw.max_path_depth)
    }
}
