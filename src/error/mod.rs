//! Error model for validation diagnostics and resolver failures

use serde::Serialize;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::fmt;

#[cfg(test)]
mod tests;

/// One step in an instance path or schema path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// An object property name or schema keyword name
    Key(String),

    /// An array index
    Index(usize),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, "{}", key),
            PathSegment::Index(index) => write!(f, "{}", index),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// A single constraint violation with location context.
///
/// Constructed positionally at the failure site with a message and the
/// offending instance; the engine stamps keyword, keyword value, schema,
/// and paths afterwards without overwriting anything a keyword rule
/// already set. Combinator keywords attach the diagnostics of their
/// subschemas as `context`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationError {
    /// Human-readable description of the violation
    pub message: String,

    /// Name of the violated keyword
    pub keyword: Option<String>,

    /// The keyword's configured value in the schema
    pub keyword_value: Option<Value>,

    /// The offending instance (sub)value
    pub instance: Option<Value>,

    /// The (sub)schema that was consulted
    pub schema: Option<Value>,

    /// Path from the root instance to the offending value
    pub path: VecDeque<PathSegment>,

    /// Path from the root schema to the violated keyword
    pub schema_path: VecDeque<PathSegment>,

    /// Nested diagnostics from combinator subschemas
    pub context: Vec<ValidationError>,
}

impl ValidationError {
    /// Create an error with only a message; remaining fields are stamped
    /// by the engine.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            keyword: None,
            keyword_value: None,
            instance: None,
            schema: None,
            path: VecDeque::new(),
            schema_path: VecDeque::new(),
            context: Vec::new(),
        }
    }

    /// Set the offending instance value
    pub fn instance(mut self, instance: Value) -> Self {
        self.instance = Some(instance);
        self
    }

    /// Set the violated keyword name
    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Set the keyword's configured value
    pub fn keyword_value(mut self, value: Value) -> Self {
        self.keyword_value = Some(value);
        self
    }

    /// Set the consulted (sub)schema
    pub fn schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Attach nested diagnostics from combinator subschemas
    pub fn context(mut self, context: Vec<ValidationError>) -> Self {
        self.context = context;
        self
    }

    /// Fill in the fields the engine knows about, keeping anything the
    /// keyword rule already set.
    pub(crate) fn fill_details(
        &mut self,
        keyword: &str,
        keyword_value: &Value,
        instance: &Value,
        schema: &Value,
    ) {
        if self.keyword.is_none() {
            self.keyword = Some(keyword.to_string());
        }
        if self.keyword_value.is_none() {
            self.keyword_value = Some(keyword_value.clone());
        }
        if self.instance.is_none() {
            self.instance = Some(instance.clone());
        }
        if self.schema.is_none() {
            self.schema = Some(schema.clone());
        }
    }

    /// Render the instance path as a JSONPath-style string, e.g.
    /// `$.items[3].name`.
    pub fn json_path(&self) -> String {
        let mut out = String::from("$");
        for segment in &self.path {
            match segment {
                PathSegment::Key(key) => {
                    out.push('.');
                    out.push_str(key);
                }
                PathSegment::Index(index) => {
                    out.push_str(&format!("[{}]", index));
                }
            }
        }
        out
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{} (at {})", self.message, self.json_path())
        }
    }
}

impl std::error::Error for ValidationError {}

/// A schema that failed validation against its own meta-schema.
///
/// Same shape as [`ValidationError`], distinct kind so callers can tell
/// bad input from bad configuration.
#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid schema: {0}")]
pub struct SchemaError(pub ValidationError);

impl From<ValidationError> for SchemaError {
    fn from(error: ValidationError) -> Self {
        SchemaError(error)
    }
}

/// A reference that could not be dereferenced, or misuse of the scope
/// stack.
#[derive(Debug, thiserror::Error)]
pub enum RefResolutionError {
    /// A JSON-pointer fragment pointed at nothing
    #[error("unresolvable JSON pointer: {0:?}")]
    UnresolvablePointer(String),

    /// A remote fetch failed
    #[error("failed to fetch {uri}: {source}")]
    Fetch {
        /// The URI being fetched
        uri: String,
        /// The underlying fetch failure
        #[source]
        source: anyhow::Error,
    },

    /// No fetch handler is registered for the URI's scheme
    #[error("no fetch handler registered for scheme {scheme:?} of {uri}")]
    UnsupportedScheme {
        /// The URI being fetched
        uri: String,
        /// Its scheme
        scheme: String,
    },

    /// `pop_scope` was called more times than `push_scope`; a contract
    /// violation, not a data-dependent failure
    #[error("scope stack underflow: pop_scope called on an empty stack")]
    ScopeUnderflow,
}

/// Umbrella error type for every failure the crate surfaces.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An instance failed a constraint
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A schema failed its own meta-schema
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A reference could not be dereferenced
    #[error(transparent)]
    Resolution(#[from] RefResolutionError),

    /// A type check named a type the active type checker does not define
    #[error("unknown type {name:?} for instance {instance}")]
    UnknownType {
        /// The unrecognized type name
        name: String,
        /// The instance that was being checked
        instance: Value,
    },
}

/// Keywords whose diagnostics say little on their own; combinator
/// wrappers lose to anything more specific.
const WEAK_KEYWORDS: [&str; 2] = ["anyOf", "oneOf"];

fn relevance(error: &ValidationError) -> (usize, bool) {
    let strong = match &error.keyword {
        Some(keyword) => !WEAK_KEYWORDS.contains(&keyword.as_str()),
        None => false,
    };
    (error.schema_path.len(), strong)
}

/// Select the single most relevant diagnostic from a set of siblings.
///
/// Prefers the diagnostic with the deepest schema path, tie-broken
/// against combinator wrappers, then descends into the winner's nested
/// context so the surfaced error points at the real failure.
pub fn best_match<I>(errors: I) -> Option<ValidationError>
where
    I: IntoIterator<Item = ValidationError>,
{
    let mut best = errors.into_iter().max_by_key(relevance)?;
    while !best.context.is_empty() {
        match best_match(std::mem::take(&mut best.context)) {
            Some(next) => best = next,
            None => break,
        }
    }
    Some(best)
}

/// Re-indexes a flat collection of diagnostics by the instance element
/// each concerns.
#[derive(Debug, Default, Serialize)]
pub struct ErrorTree {
    /// Diagnostics for the element at this node, keyed by keyword
    pub errors: HashMap<String, ValidationError>,

    children: HashMap<PathSegment, ErrorTree>,
}

impl ErrorTree {
    /// Build a tree from a collection of diagnostics.
    pub fn from_errors<I>(errors: I) -> Self
    where
        I: IntoIterator<Item = ValidationError>,
    {
        let mut root = ErrorTree::default();
        for error in errors {
            let mut node = &mut root;
            for segment in &error.path {
                node = node.children.entry(segment.clone()).or_default();
            }
            if let Some(keyword) = error.keyword.clone() {
                node.errors.insert(keyword, error);
            }
        }
        root
    }

    /// The subtree for one path segment, if any diagnostic touched it.
    pub fn child(&self, segment: &PathSegment) -> Option<&ErrorTree> {
        self.children.get(segment)
    }

    /// Total number of diagnostics in this subtree.
    pub fn total_errors(&self) -> usize {
        self.errors.len()
            + self
                .children
                .values()
                .map(ErrorTree::total_errors)
                .sum::<usize>()
    }
}
