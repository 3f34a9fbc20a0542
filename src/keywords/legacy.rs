//! Keyword rules retained for drafts 4 through 7
//!
//! These cover syntax later drafts replaced: schema-or-array `items`
//! with `additionalItems`, combined `dependencies`, boolean
//! `exclusiveMinimum`/`exclusiveMaximum` riders on `minimum`/`maximum`,
//! and the pre-2019 rule that `$ref` erases its siblings.

use serde_json::{Map, Value};

use crate::error::{Error, PathSegment, ValidationError};
use crate::validator::Validator;

/// Applicable-rules selection for drafts where `$ref` erases its
/// siblings: when present, `$ref` is the only keyword that applies.
pub fn ignore_ref_siblings(schema: &Map<String, Value>) -> Vec<(&str, &Value)> {
    if let Some(reference) = schema.get("$ref") {
        return vec![("$ref", reference)];
    }
    schema.iter().map(|(k, v)| (k.as_str(), v)).collect()
}

/// `items` (drafts 4-7): a single schema applies to every element, an
/// array of schemas applies positionally.
pub fn items(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let elements = match instance.as_array() {
        Some(elements) => elements,
        None => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    match value {
        Value::Array(subschemas) => {
            for (index, (item, subschema)) in elements.iter().zip(subschemas).enumerate() {
                errors.extend(validator.descend(
                    item,
                    subschema,
                    Some(PathSegment::Index(index)),
                    Some(PathSegment::Index(index)),
                )?);
            }
        }
        _ => {
            for (index, item) in elements.iter().enumerate() {
                errors.extend(validator.descend(
                    item,
                    value,
                    Some(PathSegment::Index(index)),
                    None,
                )?);
            }
        }
    }
    Ok(errors)
}

/// `additionalItems`: applies only when `items` is positional.
pub fn additional_items(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let elements = match instance.as_array() {
        Some(elements) => elements,
        None => return Ok(Vec::new()),
    };
    let prefix_len = match schema.get("items").and_then(Value::as_array) {
        Some(subschemas) => subschemas.len(),
        None => return Ok(Vec::new()),
    };
    if elements.len() <= prefix_len {
        return Ok(Vec::new());
    }

    if value == &Value::Bool(false) {
        return Ok(vec![ValidationError::new(format!(
            "Additional items are not allowed ({} unexpected)",
            elements[prefix_len..]
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        ))]);
    }

    let mut errors = Vec::new();
    for (index, item) in elements.iter().enumerate().skip(prefix_len) {
        errors.extend(validator.descend(item, value, Some(PathSegment::Index(index)), None)?);
    }
    Ok(errors)
}

/// `dependencies`: array values are required-name lists, anything else
/// is a schema the whole instance must satisfy.
pub fn dependencies(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (object, deps) = match (instance.as_object(), value.as_object()) {
        (Some(object), Some(deps)) => (object, deps),
        _ => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    for (property, dependency) in deps {
        if !object.contains_key(property) {
            continue;
        }
        match dependency {
            Value::Array(names) => {
                for name in names.iter().filter_map(Value::as_str) {
                    if !object.contains_key(name) {
                        errors.push(ValidationError::new(format!(
                            "{:?} is a dependency of {:?}",
                            name, property
                        )));
                    }
                }
            }
            subschema => {
                errors.extend(validator.descend(
                    instance,
                    subschema,
                    None,
                    Some(PathSegment::from(property.as_str())),
                )?);
            }
        }
    }
    Ok(errors)
}

/// `contains` (drafts 6-7): at least one element matches, no
/// `minContains`/`maxContains`.
pub fn contains(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let elements = match instance.as_array() {
        Some(elements) => elements,
        None => return Ok(Vec::new()),
    };
    for item in elements {
        if validator.descend(item, value, None, None)?.is_empty() {
            return Ok(Vec::new());
        }
    }
    Ok(vec![ValidationError::new(format!(
        "None of {} are valid under the given schema",
        instance
    ))])
}

/// Draft 4 `minimum` with its boolean `exclusiveMinimum` rider.
pub fn minimum_draft4(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (instance_n, bound) = match (instance.as_f64(), value.as_f64()) {
        (Some(i), Some(b)) => (i, b),
        _ => return Ok(Vec::new()),
    };
    let exclusive = schema
        .get("exclusiveMinimum")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let failed = if exclusive {
        instance_n <= bound
    } else {
        instance_n < bound
    };
    if failed {
        let comparison = if exclusive {
            "less than or equal to"
        } else {
            "less than"
        };
        return Ok(vec![ValidationError::new(format!(
            "{} is {} the minimum of {}",
            instance, comparison, value
        ))]);
    }
    Ok(Vec::new())
}

/// Draft 4 `maximum` with its boolean `exclusiveMaximum` rider.
pub fn maximum_draft4(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (instance_n, bound) = match (instance.as_f64(), value.as_f64()) {
        (Some(i), Some(b)) => (i, b),
        _ => return Ok(Vec::new()),
    };
    let exclusive = schema
        .get("exclusiveMaximum")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let failed = if exclusive {
        instance_n >= bound
    } else {
        instance_n > bound
    };
    if failed {
        let comparison = if exclusive {
            "greater than or equal to"
        } else {
            "greater than"
        };
        return Ok(vec![ValidationError::new(format!(
            "{} is {} the maximum of {}",
            instance, comparison, value
        ))]);
    }
    Ok(Vec::new())
}
