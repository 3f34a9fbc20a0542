//! Draft registry and validator variant construction
//!
//! A variant ([`DraftConfig`]) is an immutable bundle: keyword-rule
//! table, meta-schema, vocabulary schemas, type checker, id extraction,
//! and applicable-rules selection. Constructing a variant with a version
//! identifier registers it process-wide, keyed by version and by
//! meta-schema URI, so `$schema`-based selection and remote-fetch
//! short-circuiting both work.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::error::{Error, SchemaError};
use crate::keywords::{self, legacy};
use crate::resolver::{urldefrag, IdOf};
use crate::types::{
    draft202012_type_checker, draft4_type_checker, draft6_type_checker, draft7_type_checker,
    TypeChecker,
};
use crate::validator::{KeywordRule, Validator};


/// Selects the applicable (keyword, value) pairs for a schema object
pub type ApplicableRules = for<'a> fn(&'a Map<String, Value>) -> Vec<(&'a str, &'a Value)>;

/// Default id extraction: the `$id` keyword.
pub fn id_of(schema: &Value) -> Option<&str> {
    schema
        .get("$id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Draft 4 id extraction: the `id` keyword.
pub fn id_of_draft4(schema: &Value) -> Option<&str> {
    schema
        .get("id")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Default applicable-rules selection: every key present in the schema.
pub fn all_rules(schema: &Map<String, Value>) -> Vec<(&str, &Value)> {
    schema.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

static REGISTRY: Lazy<RwLock<HashMap<String, Arc<DraftConfig>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static META_SCHEMAS: Lazy<RwLock<HashMap<String, Arc<DraftConfig>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static VOCABULARIES: Lazy<RwLock<HashMap<String, Arc<Value>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// A validator variant: one specification version's fixed configuration.
pub struct DraftConfig {
    version: Option<String>,
    meta_schema: Arc<Value>,
    vocabulary_schemas: Vec<Arc<Value>>,
    rules: HashMap<String, KeywordRule>,
    type_checker: TypeChecker,
    id_of: IdOf,
    applicable_rules: ApplicableRules,
}

impl std::fmt::Debug for DraftConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DraftConfig")
            .field("version", &self.version)
            .field("keywords", &self.rules.len())
            .finish()
    }
}

impl DraftConfig {
    /// The version identifier this variant was registered under, if any.
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// This variant's meta-schema document.
    pub fn meta_schema(&self) -> &Arc<Value> {
        &self.meta_schema
    }

    /// This variant's vocabulary documents.
    pub fn vocabulary_schemas(&self) -> &[Arc<Value>] {
        &self.vocabulary_schemas
    }

    /// The rule registered for a keyword, if any.
    pub fn rule(&self, keyword: &str) -> Option<KeywordRule> {
        self.rules.get(keyword).copied()
    }

    /// The registered keyword names and rules.
    pub fn rules(&self) -> impl Iterator<Item = (&str, KeywordRule)> {
        self.rules.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// This variant's type checker.
    pub fn type_checker(&self) -> &TypeChecker {
        &self.type_checker
    }

    /// Extract a schema's own id per this variant's rules.
    pub fn id_of<'s>(&self, schema: &'s Value) -> Option<&'s str> {
        (self.id_of)(schema)
    }

    /// The raw id extraction function, for seeding resolvers.
    pub fn id_extractor(&self) -> IdOf {
        self.id_of
    }

    /// The applicable (keyword, value) pairs for a schema object.
    pub(crate) fn applicable_rules<'s>(
        &self,
        schema: &'s Map<String, Value>,
    ) -> Vec<(&'s str, &'s Value)> {
        (self.applicable_rules)(schema)
    }

    /// Validate a candidate schema against this variant's meta-schema.
    ///
    /// Any diagnostic is surfaced as a [`SchemaError`], never as an
    /// instance-validation diagnostic.
    pub fn check_schema(self: &Arc<Self>, schema: &Value) -> Result<(), Error> {
        let meta_schema = Arc::clone(&self.meta_schema);
        let validator = Validator::new(Arc::clone(self), &meta_schema);
        // The iterator must be dropped (releasing its scope guard)
        // before the validator it borrows goes out of scope.
        let mut errors = validator.iter_errors(schema);
        let first = errors.next();
        drop(errors);
        match first {
            Some(Ok(error)) => Err(Error::Schema(SchemaError(error))),
            Some(Err(error)) => Err(error),
            None => Ok(()),
        }
    }
}

/// Everything needed to construct a new variant.
///
/// Defaults mirror the most recent draft: `$id` extraction, every
/// present keyword applicable, the Draft 2020-12 type checker, and an
/// always-valid meta-schema.
pub struct DraftSpec {
    /// The meta-schema for the new variant
    pub meta_schema: Value,

    /// Vocabulary documents referenced by the meta-schema
    pub vocabulary_schemas: Vec<Value>,

    /// The keyword-rule table
    pub rules: Vec<(&'static str, KeywordRule)>,

    /// Version identifier; registers the variant when present
    pub version: Option<String>,

    /// Type checker used by the `type` keyword
    pub type_checker: TypeChecker,

    /// Id extraction function
    pub id_of: IdOf,

    /// Applicable-rules selection function
    pub applicable_rules: ApplicableRules,
}

impl Default for DraftSpec {
    fn default() -> Self {
        Self {
            meta_schema: Value::Bool(true),
            vocabulary_schemas: Vec::new(),
            rules: Vec::new(),
            version: None,
            type_checker: draft202012_type_checker(),
            id_of,
            applicable_rules: all_rules,
        }
    }
}

/// Construct a new validator variant.
///
/// Registration is a side effect: a variant carrying a version
/// identifier is recorded process-wide under that identifier and under
/// its meta-schema URI (plus any vocabulary URIs).
pub fn create(spec: DraftSpec) -> Arc<DraftConfig> {
    let config = Arc::new(DraftConfig {
        version: spec.version,
        meta_schema: Arc::new(spec.meta_schema),
        vocabulary_schemas: spec.vocabulary_schemas.into_iter().map(Arc::new).collect(),
        rules: spec
            .rules
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
        type_checker: spec.type_checker,
        id_of: spec.id_of,
        applicable_rules: spec.applicable_rules,
    });

    if config.version.is_some() {
        register(&config);
    }
    config
}

/// Record a versioned variant in the process-wide registries.
fn register(config: &Arc<DraftConfig>) {
    let version = match config.version.clone() {
        Some(version) => version,
        None => return,
    };
    REGISTRY.write().insert(version, Arc::clone(config));
    if let Some(meta_uri) = config.id_of(&config.meta_schema) {
        META_SCHEMAS
            .write()
            .insert(urldefrag(meta_uri).0.to_string(), Arc::clone(config));
    }
    let mut vocabularies = VOCABULARIES.write();
    for vocabulary in &config.vocabulary_schemas {
        if let Some(vocab_uri) = config.id_of(vocabulary) {
            vocabularies.insert(urldefrag(vocab_uri).0.to_string(), Arc::clone(vocabulary));
        }
    }
}

/// Derive a new variant from an existing one.
///
/// Rule entries in `rules` fully replace same-named entries of the base
/// table; the meta-schema is inherited, and the type checker is
/// inherited unless overridden.
pub fn extend(
    base: &DraftConfig,
    rules: Vec<(&'static str, KeywordRule)>,
    version: Option<String>,
    type_checker: Option<TypeChecker>,
) -> Arc<DraftConfig> {
    let mut table: HashMap<String, KeywordRule> = base.rules.clone();
    for (keyword, rule) in rules {
        table.insert(keyword.to_string(), rule);
    }

    let config = Arc::new(DraftConfig {
        version,
        meta_schema: Arc::clone(&base.meta_schema),
        vocabulary_schemas: base.vocabulary_schemas.clone(),
        rules: table,
        type_checker: type_checker.unwrap_or_else(|| base.type_checker.clone()),
        id_of: base.id_of,
        applicable_rules: base.applicable_rules,
    });

    if config.version.is_some() {
        register(&config);
    }
    config
}

/// Look up a registered variant by its version identifier.
pub fn by_version(version: &str) -> Option<Arc<DraftConfig>> {
    bootstrap();
    REGISTRY.read().get(version).cloned()
}

/// The variant appropriate for validating the given schema.
///
/// Uses the schema's `$schema` URI when it names a registered
/// meta-schema; an unrecognized URI degrades to the default (the newest
/// supported draft) with a warning, never an error.
pub fn validator_for(schema: &Value) -> Arc<DraftConfig> {
    bootstrap();
    let default = Arc::clone(&DRAFT202012);

    let declared = match schema.get("$schema").and_then(Value::as_str) {
        Some(uri) => uri,
        None => return default,
    };
    match META_SCHEMAS.read().get(urldefrag(declared).0) {
        Some(config) => Arc::clone(config),
        None => {
            warn!(
                schema_uri = declared,
                "the meta-schema specified by $schema is not registered; \
                 falling back to the latest supported draft"
            );
            default
        }
    }
}

/// Every registered meta-schema and vocabulary document, keyed by its
/// bare URI. Used to pre-seed resolver document stores.
pub(crate) fn registered_documents() -> Vec<(String, Arc<Value>)> {
    bootstrap();
    let mut documents: Vec<(String, Arc<Value>)> = META_SCHEMAS
        .read()
        .iter()
        .map(|(uri, config)| (uri.clone(), Arc::clone(&config.meta_schema)))
        .collect();
    documents.extend(
        VOCABULARIES
            .read()
            .iter()
            .map(|(uri, document)| (uri.clone(), Arc::clone(document))),
    );
    documents
}

/// Force construction (and thus registration) of the built-in variants.
pub(crate) fn bootstrap() {
    Lazy::force(&DRAFT4);
    Lazy::force(&DRAFT6);
    Lazy::force(&DRAFT7);
    Lazy::force(&DRAFT202012);
}

fn embedded(raw: &str) -> Value {
    serde_json::from_str(raw).expect("embedded meta-schema is valid JSON")
}

/// The Draft 4 validator variant.
pub static DRAFT4: Lazy<Arc<DraftConfig>> = Lazy::new(|| {
    create(DraftSpec {
        meta_schema: embedded(include_str!("metaschemas/draft4.json")),
        rules: vec![
            ("$ref", keywords::ref_ as KeywordRule),
            ("additionalItems", legacy::additional_items),
            ("additionalProperties", keywords::additional_properties),
            ("allOf", keywords::all_of),
            ("anyOf", keywords::any_of),
            ("dependencies", legacy::dependencies),
            ("enum", keywords::enum_),
            ("format", keywords::format),
            ("items", legacy::items),
            ("maxItems", keywords::max_items),
            ("maxLength", keywords::max_length),
            ("maxProperties", keywords::max_properties),
            ("maximum", legacy::maximum_draft4),
            ("minItems", keywords::min_items),
            ("minLength", keywords::min_length),
            ("minProperties", keywords::min_properties),
            ("minimum", legacy::minimum_draft4),
            ("multipleOf", keywords::multiple_of),
            ("not", keywords::not_),
            ("oneOf", keywords::one_of),
            ("pattern", keywords::pattern),
            ("patternProperties", keywords::pattern_properties),
            ("properties", keywords::properties),
            ("required", keywords::required),
            ("type", keywords::type_),
            ("uniqueItems", keywords::unique_items),
        ],
        version: Some("draft4".to_string()),
        type_checker: draft4_type_checker(),
        id_of: id_of_draft4,
        applicable_rules: legacy::ignore_ref_siblings,
        ..Default::default()
    })
});

/// The Draft 6 validator variant.
pub static DRAFT6: Lazy<Arc<DraftConfig>> = Lazy::new(|| {
    create(DraftSpec {
        meta_schema: embedded(include_str!("metaschemas/draft6.json")),
        rules: vec![
            ("$ref", keywords::ref_ as KeywordRule),
            ("additionalItems", legacy::additional_items),
            ("additionalProperties", keywords::additional_properties),
            ("allOf", keywords::all_of),
            ("anyOf", keywords::any_of),
            ("const", keywords::const_),
            ("contains", legacy::contains),
            ("dependencies", legacy::dependencies),
            ("enum", keywords::enum_),
            ("exclusiveMaximum", keywords::exclusive_maximum),
            ("exclusiveMinimum", keywords::exclusive_minimum),
            ("format", keywords::format),
            ("items", legacy::items),
            ("maxItems", keywords::max_items),
            ("maxLength", keywords::max_length),
            ("maxProperties", keywords::max_properties),
            ("maximum", keywords::maximum),
            ("minItems", keywords::min_items),
            ("minLength", keywords::min_length),
            ("minProperties", keywords::min_properties),
            ("minimum", keywords::minimum),
            ("multipleOf", keywords::multiple_of),
            ("not", keywords::not_),
            ("oneOf", keywords::one_of),
            ("pattern", keywords::pattern),
            ("patternProperties", keywords::pattern_properties),
            ("properties", keywords::properties),
            ("propertyNames", keywords::property_names),
            ("required", keywords::required),
            ("type", keywords::type_),
            ("uniqueItems", keywords::unique_items),
        ],
        version: Some("draft6".to_string()),
        type_checker: draft6_type_checker(),
        applicable_rules: legacy::ignore_ref_siblings,
        ..Default::default()
    })
});

/// The Draft 7 validator variant.
pub static DRAFT7: Lazy<Arc<DraftConfig>> = Lazy::new(|| {
    create(DraftSpec {
        meta_schema: embedded(include_str!("metaschemas/draft7.json")),
        rules: vec![
            ("$ref", keywords::ref_ as KeywordRule),
            ("additionalItems", legacy::additional_items),
            ("additionalProperties", keywords::additional_properties),
            ("allOf", keywords::all_of),
            ("anyOf", keywords::any_of),
            ("const", keywords::const_),
            ("contains", legacy::contains),
            ("dependencies", legacy::dependencies),
            ("enum", keywords::enum_),
            ("exclusiveMaximum", keywords::exclusive_maximum),
            ("exclusiveMinimum", keywords::exclusive_minimum),
            ("format", keywords::format),
            ("if", keywords::if_),
            ("items", legacy::items),
            ("maxItems", keywords::max_items),
            ("maxLength", keywords::max_length),
            ("maxProperties", keywords::max_properties),
            ("maximum", keywords::maximum),
            ("minItems", keywords::min_items),
            ("minLength", keywords::min_length),
            ("minProperties", keywords::min_properties),
            ("minimum", keywords::minimum),
            ("multipleOf", keywords::multiple_of),
            ("not", keywords::not_),
            ("oneOf", keywords::one_of),
            ("pattern", keywords::pattern),
            ("patternProperties", keywords::pattern_properties),
            ("properties", keywords::properties),
            ("propertyNames", keywords::property_names),
            ("required", keywords::required),
            ("type", keywords::type_),
            ("uniqueItems", keywords::unique_items),
        ],
        version: Some("draft7".to_string()),
        type_checker: draft7_type_checker(),
        applicable_rules: legacy::ignore_ref_siblings,
        ..Default::default()
    })
});

/// The Draft 2020-12 validator variant, the default for schemas that do
/// not declare a `$schema`.
pub static DRAFT202012: Lazy<Arc<DraftConfig>> = Lazy::new(|| {
    create(DraftSpec {
        meta_schema: embedded(include_str!("metaschemas/draft2020-12.json")),
        vocabulary_schemas: vec![
            embedded(include_str!("metaschemas/draft2020-12/meta_core.json")),
            embedded(include_str!("metaschemas/draft2020-12/meta_applicator.json")),
            embedded(include_str!("metaschemas/draft2020-12/meta_validation.json")),
            embedded(include_str!("metaschemas/draft2020-12/meta_metadata.json")),
            embedded(include_str!(
                "metaschemas/draft2020-12/meta_format_annotation.json"
            )),
            embedded(include_str!("metaschemas/draft2020-12/meta_content.json")),
            embedded(include_str!("metaschemas/draft2020-12/meta_unevaluated.json")),
        ],
        rules: vec![
            ("$ref", keywords::ref_ as KeywordRule),
            ("additionalProperties", keywords::additional_properties),
            ("allOf", keywords::all_of),
            ("anyOf", keywords::any_of),
            ("const", keywords::const_),
            ("contains", keywords::contains),
            ("dependentRequired", keywords::dependent_required),
            ("dependentSchemas", keywords::dependent_schemas),
            ("enum", keywords::enum_),
            ("exclusiveMaximum", keywords::exclusive_maximum),
            ("exclusiveMinimum", keywords::exclusive_minimum),
            ("format", keywords::format),
            ("if", keywords::if_),
            ("items", keywords::items),
            ("maxItems", keywords::max_items),
            ("maxLength", keywords::max_length),
            ("maxProperties", keywords::max_properties),
            ("maximum", keywords::maximum),
            ("minItems", keywords::min_items),
            ("minLength", keywords::min_length),
            ("minProperties", keywords::min_properties),
            ("minimum", keywords::minimum),
            ("multipleOf", keywords::multiple_of),
            ("not", keywords::not_),
            ("oneOf", keywords::one_of),
            ("pattern", keywords::pattern),
            ("patternProperties", keywords::pattern_properties),
            ("prefixItems", keywords::prefix_items),
            ("properties", keywords::properties),
            ("propertyNames", keywords::property_names),
            ("required", keywords::required),
            ("type", keywords::type_),
            ("uniqueItems", keywords::unique_items),
        ],
        version: Some("draft2020-12".to_string()),
        type_checker: draft202012_type_checker(),
        ..Default::default()
    })
});
