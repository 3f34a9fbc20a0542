//! Format checking for the `format` keyword
//!
//! Formats are opt-in: the engine treats `format` as an annotation
//! unless a [`FormatChecker`] is attached. Unknown format names and
//! non-string instances always pass, matching JSON Schema's best-effort
//! contract for `format`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use url::Url;

/// A named format predicate over string instances.
pub type FormatCheckFn = fn(&str) -> bool;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+$").unwrap());

static HOSTNAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .unwrap()
});

static UUID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap());

static TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([01]\d|2[0-3]):[0-5]\d:([0-5]\d|60)(\.\d+)?([Zz]|[+-]([01]\d|2[0-3]):[0-5]\d)$")
        .unwrap()
});

static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\d{4}-\d{2}-\d{2}[Tt]([01]\d|2[0-3]):[0-5]\d:([0-5]\d|60)(\.\d+)?([Zz]|[+-]([01]\d|2[0-3]):[0-5]\d)$",
    )
    .unwrap()
});

static JSON_POINTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(/([^/~]|~[01])*)*$").unwrap());

fn check_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

fn check_ipv4(value: &str) -> bool {
    value.parse::<Ipv4Addr>().is_ok()
}

fn check_ipv6(value: &str) -> bool {
    value.parse::<Ipv6Addr>().is_ok()
}

fn check_hostname(value: &str) -> bool {
    value.len() <= 253 && HOSTNAME_RE.is_match(value)
}

fn check_uri(value: &str) -> bool {
    Url::parse(value).is_ok()
}

fn check_uuid(value: &str) -> bool {
    UUID_RE.is_match(value)
}

fn check_date(value: &str) -> bool {
    let captures = match DATE_RE.captures(value) {
        Some(captures) => captures,
        None => return false,
    };
    // Rough calendar bounds; leap years are not modeled.
    let month: u32 = captures[2].parse().unwrap_or(0);
    let day: u32 = captures[3].parse().unwrap_or(0);
    (1..=12).contains(&month) && (1..=31).contains(&day)
}

fn check_time(value: &str) -> bool {
    TIME_RE.is_match(value)
}

fn check_date_time(value: &str) -> bool {
    DATE_TIME_RE.is_match(value)
}

fn check_regex(value: &str) -> bool {
    Regex::new(value).is_ok()
}

fn check_json_pointer(value: &str) -> bool {
    JSON_POINTER_RE.is_match(value)
}

/// A registry of format predicates, consulted by the `format` keyword.
///
/// [`FormatChecker::default`] carries the built-in formats; additional
/// ones can be registered with [`FormatChecker::add`].
pub struct FormatChecker {
    checkers: HashMap<String, FormatCheckFn>,
}

impl Default for FormatChecker {
    fn default() -> Self {
        let mut checker = Self {
            checkers: HashMap::new(),
        };
        checker.add("email", check_email);
        checker.add("ipv4", check_ipv4);
        checker.add("ipv6", check_ipv6);
        checker.add("hostname", check_hostname);
        checker.add("uri", check_uri);
        checker.add("uuid", check_uuid);
        checker.add("date", check_date);
        checker.add("time", check_time);
        checker.add("date-time", check_date_time);
        checker.add("regex", check_regex);
        checker.add("json-pointer", check_json_pointer);
        checker
    }
}

impl FormatChecker {
    /// An empty registry with no formats at all.
    pub fn empty() -> Self {
        Self {
            checkers: HashMap::new(),
        }
    }

    /// Register (or replace) a format predicate.
    pub fn add(&mut self, name: impl Into<String>, check: FormatCheckFn) {
        self.checkers.insert(name.into(), check);
    }

    /// The registered format names.
    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.checkers.keys().map(String::as_str)
    }

    /// Whether `instance` conforms to the named format.
    ///
    /// Unregistered formats and non-string instances conform trivially.
    pub fn is_valid(&self, format: &str, instance: &Value) -> bool {
        let check = match self.checkers.get(format) {
            Some(check) => check,
            None => return true,
        };
        match instance.as_str() {
            Some(text) => check(text),
            None => true,
        }
    }
}
