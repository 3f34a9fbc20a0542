//! The validation engine
//!
//! A [`Validator`] binds a schema, a resolver, and a draft
//! configuration; construction performs no validation. Diagnostics are
//! produced by [`Validator::iter_errors`], a lazy iterator that invokes
//! keyword rules on demand so consumers like [`Validator::is_valid`]
//! can stop at the first one.

use serde_json::Value;
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use crate::draft::DraftConfig;
use crate::error::{Error, PathSegment, ValidationError};
use crate::format::FormatChecker;
use crate::resolver::{RefResolver, ScopeGuard};

/// A keyword rule: pure function from (engine, keyword value, instance,
/// full schema) to the diagnostics it found.
///
/// This is the extension point by which draft versions differ. Rules
/// never handle resolution errors themselves; an `Err` aborts the
/// current validation pass.
pub type KeywordRule =
    fn(&Validator<'_>, &Value, &Value, &Value) -> Result<Vec<ValidationError>, Error>;

/// Keywords whose diagnostics keep the subschema's own path rather than
/// getting the keyword prepended.
const UNDECORATED_KEYWORDS: [&str; 2] = ["$ref", "if"];

/// A validation engine bound to one schema.
///
/// Cheap to construct; resolvers are typically shared across many
/// engines revalidating the same document.
///
/// Recursion depth tracks schema/instance nesting; there is no built-in
/// cycle detection, so schemas with cyclic non-terminating `$ref`
/// graphs exhaust the stack. Callers own recursion limits.
pub struct Validator<'s> {
    config: Arc<DraftConfig>,
    schema: &'s Value,
    resolver: Rc<RefResolver>,
    format_checker: Option<Arc<FormatChecker>>,
}

impl<'s> Validator<'s> {
    /// Bind a schema, creating a fresh resolver rooted at the schema's
    /// own id.
    pub fn new(config: Arc<DraftConfig>, schema: &'s Value) -> Self {
        let resolver = Rc::new(RefResolver::from_schema_with(schema, config.id_extractor()));
        Self::with_resolver(config, schema, resolver)
    }

    /// Bind a schema to an existing (shared) resolver.
    pub fn with_resolver(
        config: Arc<DraftConfig>,
        schema: &'s Value,
        resolver: Rc<RefResolver>,
    ) -> Self {
        Self {
            config,
            schema,
            resolver,
            format_checker: None,
        }
    }

    /// Attach a format checker consulted by the `format` keyword.
    pub fn with_format_checker(mut self, format_checker: FormatChecker) -> Self {
        self.format_checker = Some(Arc::new(format_checker));
        self
    }

    /// The draft configuration this engine runs with.
    pub fn config(&self) -> &Arc<DraftConfig> {
        &self.config
    }

    /// The bound root schema.
    pub fn schema(&self) -> &Value {
        self.schema
    }

    /// The bound resolver.
    pub fn resolver(&self) -> &RefResolver {
        &self.resolver
    }

    /// The attached format checker, if any.
    pub fn format_checker(&self) -> Option<&FormatChecker> {
        self.format_checker.as_deref()
    }

    /// Produce diagnostics for `instance` against the bound root schema.
    pub fn iter_errors<'v>(&'v self, instance: &'v Value) -> ErrorIter<'v> {
        self.iter_errors_at(instance, self.schema)
    }

    /// Produce diagnostics for `instance` against an arbitrary
    /// (sub)schema.
    ///
    /// If the subschema carries its own id, the resolver scope is
    /// entered for exactly as long as the returned iterator lives.
    pub fn iter_errors_at<'v>(&'v self, instance: &'v Value, schema: &'v Value) -> ErrorIter<'v> {
        ErrorIter::new(self, instance, schema)
    }

    /// Re-run validation on a sub-instance/sub-schema, prefixing every
    /// diagnostic's paths with the given segments.
    pub fn descend(
        &self,
        instance: &Value,
        schema: &Value,
        path: Option<PathSegment>,
        schema_path: Option<PathSegment>,
    ) -> Result<Vec<ValidationError>, Error> {
        let mut errors = Vec::new();
        for result in self.iter_errors_at(instance, schema) {
            let mut error = result?;
            if let Some(segment) = &path {
                error.path.push_front(segment.clone());
            }
            if let Some(segment) = &schema_path {
                error.schema_path.push_front(segment.clone());
            }
            errors.push(error);
        }
        Ok(errors)
    }

    /// Strict, single-error API: fail with the first diagnostic.
    pub fn validate(&self, instance: &Value) -> Result<(), Error> {
        match self.iter_errors(instance).next() {
            Some(Ok(error)) => Err(Error::Validation(error)),
            Some(Err(error)) => Err(error),
            None => Ok(()),
        }
    }

    /// Whether `instance` satisfies the bound schema.
    ///
    /// Stops at the first diagnostic; resolution failures propagate as
    /// errors rather than counting as invalid.
    pub fn is_valid(&self, instance: &Value) -> Result<bool, Error> {
        match self.iter_errors(instance).next() {
            Some(Ok(_)) => Ok(false),
            Some(Err(error)) => Err(error),
            None => Ok(true),
        }
    }

    /// Whether `instance` is of the named type per the variant's type
    /// checker. An unrecognized type name is an error, not `false`.
    pub fn is_type(&self, instance: &Value, type_name: &str) -> Result<bool, Error> {
        self.config.type_checker().is_type(instance, type_name)
    }
}

/// Lazy diagnostic sequence for one (instance, schema) pair.
///
/// Keyword rules run on demand, in the order the variant's
/// applicable-rules function yields them; the iterator fuses after a
/// resolution error.
pub struct ErrorIter<'v> {
    validator: &'v Validator<'v>,
    instance: &'v Value,
    schema: &'v Value,
    applicable: std::vec::IntoIter<(&'v str, &'v Value)>,
    buffered: VecDeque<ValidationError>,
    done: bool,
    // Popped when the iterator drops, keeping scope depth balanced on
    // every exit path.
    scope: Option<ScopeGuard<'v>>,
}

impl<'v> ErrorIter<'v> {
    fn new(validator: &'v Validator<'v>, instance: &'v Value, schema: &'v Value) -> Self {
        let mut buffered = VecDeque::new();
        let mut applicable = Vec::new();
        let mut scope = None;

        match schema {
            Value::Bool(true) => {}
            Value::Bool(false) => {
                buffered.push_back(
                    ValidationError::new(format!("false schema does not allow {}", instance))
                        .instance(instance.clone())
                        .schema(schema.clone()),
                );
            }
            Value::Object(map) => {
                if let Some(id) = validator.config.id_of(schema) {
                    scope = Some(validator.resolver.in_scope(id));
                }
                applicable = validator.config().applicable_rules(map);
            }
            // Anything else is not a schema; nothing to check.
            _ => {}
        }

        Self {
            validator,
            instance,
            schema,
            applicable: applicable.into_iter(),
            buffered,
            done: false,
            scope,
        }
    }
}

impl Iterator for ErrorIter<'_> {
    type Item = Result<ValidationError, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(error) = self.buffered.pop_front() {
                return Some(Ok(error));
            }
            if self.done {
                return None;
            }

            let (keyword, value) = match self.applicable.next() {
                Some(pair) => pair,
                None => {
                    self.done = true;
                    self.scope = None;
                    return None;
                }
            };
            let rule = match self.validator.config().rule(keyword) {
                Some(rule) => rule,
                None => continue,
            };

            match rule(self.validator, value, self.instance, self.schema) {
                Ok(errors) => {
                    for mut error in errors {
                        error.fill_details(keyword, value, self.instance, self.schema);
                        if !UNDECORATED_KEYWORDS.contains(&keyword) {
                            error.schema_path.push_front(PathSegment::from(keyword));
                        }
                        self.buffered.push_back(error);
                    }
                }
                Err(error) => {
                    self.done = true;
                    self.scope = None;
                    return Some(Err(error));
                }
            }
        }
    }
}
