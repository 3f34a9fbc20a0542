//! JSON Schema validation
//!
//! A validation engine covering drafts 4, 6, 7, and 2020-12, with
//! first-class reference resolution. The three entry points, roughly in
//! order of increasing control:
//!
//! - [`validate`] / [`is_valid`]: one-shot checks that pick the draft
//!   from the schema's `$schema` and verify the schema itself first.
//! - [`Validator`]: a reusable engine bound to one schema, producing
//!   lazy diagnostics through [`Validator::iter_errors`].
//! - [`draft::create`] / [`draft::extend`]: construct custom validator
//!   variants with their own keyword tables and type checkers.
//!
//! ```no_run
//! use serde_json::json;
//!
//! let schema = json!({"type": "integer", "minimum": 0});
//! assert!(jsonvet::is_valid(&json!(12), &schema)?);
//!
//! if let Err(error) = jsonvet::validate(&json!(-3), &schema) {
//!     eprintln!("{error}");
//! }
//! # Ok::<(), jsonvet::Error>(())
//! ```

pub mod draft;
pub mod error;
pub mod format;
pub mod keywords;
pub mod resolver;
pub mod types;
pub mod validator;

pub use draft::{by_version, create, extend, validator_for, DraftConfig, DraftSpec};
pub use error::{
    best_match, Error, ErrorTree, PathSegment, RefResolutionError, SchemaError, ValidationError,
};
pub use format::FormatChecker;
pub use resolver::RefResolver;
pub use types::TypeChecker;
pub use validator::Validator;

use serde_json::Value;

/// Validate `instance` against `schema`, failing with the single most
/// relevant diagnostic.
///
/// The schema is checked against its own meta-schema first; a broken
/// schema surfaces as [`Error::Schema`] rather than as an instance
/// diagnostic.
pub fn validate(instance: &Value, schema: &Value) -> Result<(), Error> {
    let config = validator_for(schema);
    config.check_schema(schema)?;

    let validator = Validator::new(config, schema);
    let errors: Vec<ValidationError> = validator
        .iter_errors(instance)
        .collect::<Result<_, _>>()?;
    match best_match(errors) {
        Some(error) => Err(Error::Validation(error)),
        None => Ok(()),
    }
}

/// Whether `instance` satisfies `schema`.
///
/// The schema itself is not vetted; a nonsensical schema simply matches
/// the way its keywords say it does. Use [`validate`] when the schema is
/// untrusted.
pub fn is_valid(instance: &Value, schema: &Value) -> Result<bool, Error> {
    let config = validator_for(schema);
    Validator::new(config, schema).is_valid(instance)
}
