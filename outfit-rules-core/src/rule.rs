//! Rule data model and rule file loading.
//!
//! A [`Rule`] is an opaque JSON object. The only keys the uploader looks at
//! are `min_temp` and `max_temp`, which are rendered in the progress line;
//! everything else is passed through to the document store untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

pub const MIN_TEMP_KEY: &str = "min_temp";
pub const MAX_TEMP_KEY: &str = "max_temp";

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("failed to read rule file {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rule file as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("rule file must hold a JSON array of rule objects, found {found}")]
    NotAnArray { found: &'static str },

    #[error("rule at index {index} is not a JSON object (found {found})")]
    NotAnObject { index: usize, found: &'static str },

    #[error("rule is missing required key '{key}'")]
    MissingKey { key: &'static str },
}

/// A single outfit recommendation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rule {
    fields: Map<String, Value>,
}

impl Rule {
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Rule { fields }
    }

    /// All fields of the rule, in file order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Looks up `min_temp` and `max_temp`. Only presence is checked.
    pub fn temp_range(&self) -> Result<TempRange, RuleError> {
        let min = self
            .fields
            .get(MIN_TEMP_KEY)
            .ok_or(RuleError::MissingKey { key: MIN_TEMP_KEY })?;
        let max = self
            .fields
            .get(MAX_TEMP_KEY)
            .ok_or(RuleError::MissingKey { key: MAX_TEMP_KEY })?;
        Ok(TempRange {
            min: min.clone(),
            max: max.clone(),
        })
    }
}

impl TryFrom<Value> for Rule {
    type Error = &'static str;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Rule { fields }),
            other => Err(kind_of(&other)),
        }
    }
}

/// The temperature bounds of a rule, as they appeared in the file.
#[derive(Debug, Clone, PartialEq)]
pub struct TempRange {
    pub min: Value,
    pub max: Value,
}

impl fmt::Display for TempRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", render(&self.min), render(&self.max))
    }
}

// Strings print bare; everything else prints as JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parses rule file contents. The top level must be an array and every
/// element must be an object.
pub fn parse_rules(content: &str) -> Result<Vec<Rule>, RuleError> {
    let value: Value = serde_json::from_str(content)?;
    let elements = match value {
        Value::Array(elements) => elements,
        other => {
            return Err(RuleError::NotAnArray {
                found: kind_of(&other),
            })
        }
    };

    elements
        .into_iter()
        .enumerate()
        .map(|(index, element)| {
            Rule::try_from(element).map_err(|found| RuleError::NotAnObject { index, found })
        })
        .collect()
}

/// Reads and parses a UTF-8 rule file.
pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<Vec<Rule>, RuleError> {
    let path_ref = path.as_ref();
    info!(rules_path = ?path_ref, "Loading rules from file");

    let content = fs::read_to_string(path_ref).map_err(|e| {
        error!(error = ?e, rules_path = ?path_ref, "Failed to read rule file");
        RuleError::Io {
            path: path_ref.to_path_buf(),
            source: e,
        }
    })?;

    match parse_rules(&content) {
        Ok(rules) => {
            info!(rules_path = ?path_ref, count = rules.len(), "Parsed rule file");
            debug!(?rules, "Rules loaded (full debug)");
            Ok(rules)
        }
        Err(e) => {
            error!(error = %e, rules_path = ?path_ref, "Failed to parse rule file");
            Err(e)
        }
    }
}
