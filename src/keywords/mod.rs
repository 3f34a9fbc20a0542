//! Keyword rules shared by every modern draft
//!
//! Each rule is a pure function over (engine, keyword value, instance,
//! full schema). Rules only report violations of their own keyword;
//! mis-typed instances and malformed keyword values are someone else's
//! problem (`type` and the meta-schema respectively), so rules fall
//! through silently rather than erroring on shape mismatches.
//!
//! Draft-specific behavior that later drafts dropped lives in
//! [`legacy`].

use serde_json::{Map, Value};

use crate::error::{Error, PathSegment, ValidationError};
use crate::validator::Validator;

pub mod legacy;


fn number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Quote-and-join property names for messages.
fn quoted_list<'a, I: IntoIterator<Item = &'a str>>(names: I) -> String {
    names
        .into_iter()
        .map(|name| format!("{:?}", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Instance object keys covered by neither `properties` nor any
/// `patternProperties` pattern. Invalid patterns match nothing here;
/// the `pattern`/`patternProperties` rules report them.
fn additional_keys<'a>(instance: &'a Map<String, Value>, schema: &Value) -> Vec<&'a str> {
    let properties = schema.get("properties").and_then(Value::as_object);
    let patterns: Vec<regex::Regex> = schema
        .get("patternProperties")
        .and_then(Value::as_object)
        .map(|object| {
            object
                .keys()
                .filter_map(|pattern| regex::Regex::new(pattern).ok())
                .collect()
        })
        .unwrap_or_default();

    instance
        .keys()
        .filter(|key| {
            let named = properties.map(|p| p.contains_key(*key)).unwrap_or(false);
            !named && !patterns.iter().any(|re| re.is_match(key))
        })
        .map(String::as_str)
        .collect()
}

/// `$ref`: resolve and validate against the target, holding the target's
/// scope for the duration of the descent.
pub fn ref_(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let reference = match value.as_str() {
        Some(reference) => reference,
        None => return Ok(Vec::new()),
    };
    let (_scope, resolved) = validator.resolver().resolving(reference)?;
    validator.descend(instance, &resolved, None, None)
}

pub fn type_(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let candidates: Vec<&str> = match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(names) => names.iter().filter_map(Value::as_str).collect(),
        _ => return Ok(Vec::new()),
    };
    for name in &candidates {
        if validator.is_type(instance, name)? {
            return Ok(Vec::new());
        }
    }
    Ok(vec![ValidationError::new(format!(
        "{} is not of type {}",
        instance,
        quoted_list(candidates)
    ))])
}

pub fn enum_(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let options = match value.as_array() {
        Some(options) => options,
        None => return Ok(Vec::new()),
    };
    if options.contains(instance) {
        return Ok(Vec::new());
    }
    Ok(vec![ValidationError::new(format!(
        "{} is not one of {}",
        instance, value
    ))])
}

pub fn const_(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if instance == value {
        return Ok(Vec::new());
    }
    Ok(vec![ValidationError::new(format!(
        "{} was expected",
        value
    ))])
}

pub fn minimum(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(instance_n), Some(bound)) = (number(instance), number(value)) {
        if instance_n < bound {
            return Ok(vec![ValidationError::new(format!(
                "{} is less than the minimum of {}",
                instance, value
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn maximum(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(instance_n), Some(bound)) = (number(instance), number(value)) {
        if instance_n > bound {
            return Ok(vec![ValidationError::new(format!(
                "{} is greater than the maximum of {}",
                instance, value
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn exclusive_minimum(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(instance_n), Some(bound)) = (number(instance), number(value)) {
        if instance_n <= bound {
            return Ok(vec![ValidationError::new(format!(
                "{} is less than or equal to the exclusive minimum of {}",
                instance, value
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn exclusive_maximum(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(instance_n), Some(bound)) = (number(instance), number(value)) {
        if instance_n >= bound {
            return Ok(vec![ValidationError::new(format!(
                "{} is greater than or equal to the exclusive maximum of {}",
                instance, value
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn multiple_of(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (instance_n, divisor) = match (number(instance), number(value)) {
        (Some(i), Some(d)) if d != 0.0 => (i, d),
        _ => return Ok(Vec::new()),
    };
    // Quotient-based check; a remainder test misfires on small decimal
    // divisors like 0.0001.
    let quotient = instance_n / divisor;
    if (quotient - quotient.round()).abs() > f64::EPSILON * quotient.abs().max(1.0) {
        return Ok(vec![ValidationError::new(format!(
            "{} is not a multiple of {}",
            instance, value
        ))]);
    }
    Ok(Vec::new())
}

pub fn min_length(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(text), Some(bound)) = (instance.as_str(), value.as_u64()) {
        // Length in characters, not bytes.
        if (text.chars().count() as u64) < bound {
            return Ok(vec![ValidationError::new(format!(
                "{} is too short",
                instance
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn max_length(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(text), Some(bound)) = (instance.as_str(), value.as_u64()) {
        if (text.chars().count() as u64) > bound {
            return Ok(vec![ValidationError::new(format!(
                "{} is too long",
                instance
            ))]);
        }
    }
    Ok(Vec::new())
}

/// `pattern`: an unanchored regex match. A pattern the engine cannot
/// compile is reported as a diagnostic rather than silently passing.
pub fn pattern(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (text, pattern) = match (instance.as_str(), value.as_str()) {
        (Some(text), Some(pattern)) => (text, pattern),
        _ => return Ok(Vec::new()),
    };
    match regex::Regex::new(pattern) {
        Ok(re) if re.is_match(text) => Ok(Vec::new()),
        Ok(_) => Ok(vec![ValidationError::new(format!(
            "{} does not match {:?}",
            instance, pattern
        ))]),
        Err(_) => Ok(vec![ValidationError::new(format!(
            "{:?} is not a valid regular expression",
            pattern
        ))]),
    }
}

pub fn format(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    // Annotation-only unless the caller attached a checker.
    let checker = match validator.format_checker() {
        Some(checker) => checker,
        None => return Ok(Vec::new()),
    };
    let format = match value.as_str() {
        Some(format) => format,
        None => return Ok(Vec::new()),
    };
    if checker.is_valid(format, instance) {
        return Ok(Vec::new());
    }
    Ok(vec![ValidationError::new(format!(
        "{} is not a {:?}",
        instance, format
    ))])
}

pub fn required(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (object, names) = match (instance.as_object(), value.as_array()) {
        (Some(object), Some(names)) => (object, names),
        _ => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    for name in names.iter().filter_map(Value::as_str) {
        if !object.contains_key(name) {
            errors.push(ValidationError::new(format!(
                "{:?} is a required property",
                name
            )));
        }
    }
    Ok(errors)
}

pub fn min_properties(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(object), Some(bound)) = (instance.as_object(), value.as_u64()) {
        if (object.len() as u64) < bound {
            return Ok(vec![ValidationError::new(format!(
                "{} does not have enough properties",
                instance
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn max_properties(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(object), Some(bound)) = (instance.as_object(), value.as_u64()) {
        if (object.len() as u64) > bound {
            return Ok(vec![ValidationError::new(format!(
                "{} has too many properties",
                instance
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn min_items(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(items), Some(bound)) = (instance.as_array(), value.as_u64()) {
        if (items.len() as u64) < bound {
            return Ok(vec![ValidationError::new(format!(
                "{} is too short",
                instance
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn max_items(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if let (Some(items), Some(bound)) = (instance.as_array(), value.as_u64()) {
        if (items.len() as u64) > bound {
            return Ok(vec![ValidationError::new(format!(
                "{} is too long",
                instance
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn unique_items(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if value.as_bool() != Some(true) {
        return Ok(Vec::new());
    }
    let items = match instance.as_array() {
        Some(items) => items,
        None => return Ok(Vec::new()),
    };
    for (index, item) in items.iter().enumerate() {
        if items[..index].contains(item) {
            return Ok(vec![ValidationError::new(format!(
                "{} has non-unique elements",
                instance
            ))]);
        }
    }
    Ok(Vec::new())
}

pub fn properties(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (object, subschemas) = match (instance.as_object(), value.as_object()) {
        (Some(object), Some(subschemas)) => (object, subschemas),
        _ => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    for (property, subschema) in subschemas {
        if let Some(sub_instance) = object.get(property) {
            errors.extend(validator.descend(
                sub_instance,
                subschema,
                Some(PathSegment::from(property.as_str())),
                Some(PathSegment::from(property.as_str())),
            )?);
        }
    }
    Ok(errors)
}

pub fn pattern_properties(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (object, subschemas) = match (instance.as_object(), value.as_object()) {
        (Some(object), Some(subschemas)) => (object, subschemas),
        _ => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    for (pattern, subschema) in subschemas {
        let re = match regex::Regex::new(pattern) {
            Ok(re) => re,
            Err(_) => {
                errors.push(ValidationError::new(format!(
                    "{:?} is not a valid regular expression",
                    pattern
                )));
                continue;
            }
        };
        for (key, sub_instance) in object {
            if re.is_match(key) {
                errors.extend(validator.descend(
                    sub_instance,
                    subschema,
                    Some(PathSegment::from(key.as_str())),
                    Some(PathSegment::from(pattern.as_str())),
                )?);
            }
        }
    }
    Ok(errors)
}

pub fn additional_properties(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let object = match instance.as_object() {
        Some(object) => object,
        None => return Ok(Vec::new()),
    };
    let extras = additional_keys(object, schema);
    if extras.is_empty() {
        return Ok(Vec::new());
    }

    if value == &Value::Bool(false) {
        return Ok(vec![ValidationError::new(format!(
            "Additional properties are not allowed ({} unexpected)",
            quoted_list(extras)
        ))]);
    }

    let mut errors = Vec::new();
    for key in extras {
        errors.extend(validator.descend(
            &object[key],
            value,
            Some(PathSegment::from(key)),
            None,
        )?);
    }
    Ok(errors)
}

pub fn property_names(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let object = match instance.as_object() {
        Some(object) => object,
        None => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    for key in object.keys() {
        let name = Value::String(key.clone());
        errors.extend(validator.descend(&name, value, Some(PathSegment::from(key.as_str())), None)?);
    }
    Ok(errors)
}

pub fn dependent_required(
    _validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (object, dependencies) = match (instance.as_object(), value.as_object()) {
        (Some(object), Some(dependencies)) => (object, dependencies),
        _ => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    for (property, names) in dependencies {
        if !object.contains_key(property) {
            continue;
        }
        let names = match names.as_array() {
            Some(names) => names,
            None => continue,
        };
        for name in names.iter().filter_map(Value::as_str) {
            if !object.contains_key(name) {
                errors.push(ValidationError::new(format!(
                    "{:?} is a dependency of {:?}",
                    name, property
                )));
            }
        }
    }
    Ok(errors)
}

pub fn dependent_schemas(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (object, dependencies) = match (instance.as_object(), value.as_object()) {
        (Some(object), Some(dependencies)) => (object, dependencies),
        _ => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    for (property, subschema) in dependencies {
        if object.contains_key(property) {
            errors.extend(validator.descend(
                instance,
                subschema,
                None,
                Some(PathSegment::from(property.as_str())),
            )?);
        }
    }
    Ok(errors)
}

/// `prefixItems`: positional subschemas for the head of the array.
pub fn prefix_items(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let (items, subschemas) = match (instance.as_array(), value.as_array()) {
        (Some(items), Some(subschemas)) => (items, subschemas),
        _ => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    for (index, (item, subschema)) in items.iter().zip(subschemas).enumerate() {
        errors.extend(validator.descend(
            item,
            subschema,
            Some(PathSegment::Index(index)),
            Some(PathSegment::Index(index)),
        )?);
    }
    Ok(errors)
}

/// `items` (2020-12): one subschema for every element past the
/// `prefixItems` head.
pub fn items(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let elements = match instance.as_array() {
        Some(elements) => elements,
        None => return Ok(Vec::new()),
    };
    let offset = schema
        .get("prefixItems")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);

    let mut errors = Vec::new();
    for (index, item) in elements.iter().enumerate().skip(offset) {
        errors.extend(validator.descend(item, value, Some(PathSegment::Index(index)), None)?);
    }
    Ok(errors)
}

/// `contains` honoring `minContains`/`maxContains` (2020-12 semantics).
pub fn contains(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let elements = match instance.as_array() {
        Some(elements) => elements,
        None => return Ok(Vec::new()),
    };
    let min_contains = schema
        .get("minContains")
        .and_then(Value::as_u64)
        .unwrap_or(1);
    let max_contains = schema.get("maxContains").and_then(Value::as_u64);

    let mut matches: u64 = 0;
    for item in elements {
        if validator.descend(item, value, None, None)?.is_empty() {
            matches += 1;
        }
    }

    let mut errors = Vec::new();
    if matches < min_contains {
        let message = if min_contains == 1 {
            format!(
                "{} does not contain items matching the given schema",
                instance
            )
        } else {
            format!(
                "{} contains fewer than {} items matching the given schema",
                instance, min_contains
            )
        };
        errors.push(ValidationError::new(message));
    }
    if let Some(max_contains) = max_contains {
        if matches > max_contains {
            errors.push(ValidationError::new(format!(
                "{} contains more than {} items matching the given schema",
                instance, max_contains
            )));
        }
    }
    Ok(errors)
}

pub fn all_of(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let subschemas = match value.as_array() {
        Some(subschemas) => subschemas,
        None => return Ok(Vec::new()),
    };
    let mut errors = Vec::new();
    for (index, subschema) in subschemas.iter().enumerate() {
        errors.extend(validator.descend(instance, subschema, None, Some(PathSegment::Index(index)))?);
    }
    Ok(errors)
}

pub fn any_of(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let subschemas = match value.as_array() {
        Some(subschemas) => subschemas,
        None => return Ok(Vec::new()),
    };
    let mut all_errors = Vec::new();
    for (index, subschema) in subschemas.iter().enumerate() {
        let errors =
            validator.descend(instance, subschema, None, Some(PathSegment::Index(index)))?;
        if errors.is_empty() {
            return Ok(Vec::new());
        }
        all_errors.extend(errors);
    }
    Ok(vec![ValidationError::new(format!(
        "{} is not valid under any of the given schemas",
        instance
    ))
    .context(all_errors)])
}

pub fn one_of(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    let subschemas = match value.as_array() {
        Some(subschemas) => subschemas,
        None => return Ok(Vec::new()),
    };
    let mut all_errors = Vec::new();
    let mut matched = Vec::new();
    for (index, subschema) in subschemas.iter().enumerate() {
        let errors =
            validator.descend(instance, subschema, None, Some(PathSegment::Index(index)))?;
        if errors.is_empty() {
            matched.push(subschema);
        } else {
            all_errors.extend(errors);
        }
    }

    if matched.is_empty() {
        return Ok(vec![ValidationError::new(format!(
            "{} is not valid under any of the given schemas",
            instance
        ))
        .context(all_errors)]);
    }
    if matched.len() > 1 {
        let reprs = matched
            .iter()
            .map(|schema| schema.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return Ok(vec![ValidationError::new(format!(
            "{} is valid under each of {}",
            instance, reprs
        ))]);
    }
    Ok(Vec::new())
}

pub fn not_(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    _schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if validator.descend(instance, value, None, None)?.is_empty() {
        return Ok(vec![ValidationError::new(format!(
            "{} should not be valid under {}",
            instance, value
        ))]);
    }
    Ok(Vec::new())
}

/// `if`/`then`/`else`: the condition's own diagnostics are discarded;
/// only the selected branch reports.
pub fn if_(
    validator: &Validator<'_>,
    value: &Value,
    instance: &Value,
    schema: &Value,
) -> Result<Vec<ValidationError>, Error> {
    if validator.descend(instance, value, None, None)?.is_empty() {
        if let Some(then) = schema.get("then") {
            return validator.descend(instance, then, None, Some(PathSegment::from("then")));
        }
    } else if let Some(els) = schema.get("else") {
        return validator.descend(instance, els, None, Some(PathSegment::from("else")));
    }
    Ok(Vec::new())
}
