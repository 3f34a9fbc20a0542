//! Reference resolution for `$ref` and `$id` scoping

use percent_encoding::percent_decode_str;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::error::{Error, RefResolutionError};

#[cfg(test)]
mod tests;

/// Retrieves the document behind a URI for one scheme.
///
/// Supplied by the embedding application for non-HTTP schemes or custom
/// transport; failures are wrapped into [`RefResolutionError::Fetch`].
pub type FetchHandler = Box<dyn Fn(&str) -> anyhow::Result<Value>>;

/// Extracts a schema's own id, if it declares one
pub type IdOf = for<'a> fn(&'a Value) -> Option<&'a str>;

/// Bound on the urljoin and remote caches
const CACHE_CAPACITY: usize = 1024;

/// A bounded memo cache evicting its oldest entry once full.
struct BoundedCache<K, V> {
    map: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
    fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::new(),
            order: VecDeque::new(),
            capacity,
        }
    }

    fn get(&self, key: &K) -> Option<V> {
        self.map.get(key).cloned()
    }

    fn insert(&mut self, key: K, value: V) {
        if !self.map.contains_key(&key) {
            if self.map.len() >= self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.map.remove(&oldest);
                }
            }
            self.order.push_back(key.clone());
        }
        self.map.insert(key, value);
    }
}

/// Resolves references against a referring document.
///
/// Owns the scope stack and the caches for that document's validation
/// lifetime; one resolver is typically shared across many engine
/// instances revalidating the same document. Not designed for concurrent
/// use; give each concurrent validation its own resolver.
pub struct RefResolver {
    referrer: Arc<Value>,
    cache_remote: bool,
    handlers: HashMap<String, FetchHandler>,
    scopes: RefCell<Vec<String>>,
    store: RefCell<HashMap<String, Arc<Value>>>,
    urljoin_cache: RefCell<BoundedCache<(String, String), String>>,
    remote_cache: RefCell<BoundedCache<String, Arc<Value>>>,
}

impl RefResolver {
    /// Create a resolver for `referrer` with the given base URI.
    ///
    /// The document store starts out seeded with every registered
    /// meta-schema and vocabulary document, plus the referrer itself
    /// under its base URI.
    pub fn new(base_uri: impl Into<String>, referrer: Value) -> Self {
        let base_uri = base_uri.into();
        let referrer = Arc::new(referrer);

        let mut store: HashMap<String, Arc<Value>> =
            crate::draft::registered_documents().into_iter().collect();
        store.insert(urldefrag(&base_uri).0.to_string(), Arc::clone(&referrer));

        Self {
            referrer,
            cache_remote: true,
            handlers: HashMap::new(),
            scopes: RefCell::new(vec![base_uri]),
            store: RefCell::new(store),
            urljoin_cache: RefCell::new(BoundedCache::new(CACHE_CAPACITY)),
            remote_cache: RefCell::new(BoundedCache::new(CACHE_CAPACITY)),
        }
    }

    /// Create a resolver whose base URI is the schema's own id.
    pub fn from_schema(schema: &Value) -> Self {
        Self::from_schema_with(schema, crate::draft::id_of)
    }

    /// Like [`RefResolver::from_schema`] with a draft-specific id
    /// extraction function.
    pub fn from_schema_with(schema: &Value, id_of: IdOf) -> Self {
        Self::new(id_of(schema).unwrap_or(""), schema.clone())
    }

    /// Pre-populate the store with additional documents.
    pub fn with_store<I, S>(self, documents: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        {
            let mut store = self.store.borrow_mut();
            for (uri, document) in documents {
                let uri = uri.into();
                store.insert(urldefrag(&uri).0.to_string(), Arc::new(document));
            }
        }
        self
    }

    /// Register a fetch handler for one URI scheme.
    pub fn with_handler(mut self, scheme: impl Into<String>, handler: FetchHandler) -> Self {
        self.handlers.insert(scheme.into(), handler);
        self
    }

    /// Control whether successful remote fetches populate the store.
    pub fn cache_remote(mut self, cache: bool) -> Self {
        self.cache_remote = cache;
        self
    }

    /// The referring document.
    pub fn referrer(&self) -> &Arc<Value> {
        &self.referrer
    }

    /// The innermost resolution scope currently in effect.
    pub fn resolution_scope(&self) -> String {
        self.scopes.borrow().last().cloned().unwrap_or_default()
    }

    /// The current base URI, without any fragment.
    pub fn base_uri(&self) -> String {
        urldefrag(&self.resolution_scope()).0.to_string()
    }

    /// Current depth of the scope stack.
    pub fn scope_depth(&self) -> usize {
        self.scopes.borrow().len()
    }

    /// Enter a sub-scope: the given URI is joined against the current
    /// top of stack and pushed.
    pub fn push_scope(&self, scope: &str) {
        let joined = self.urljoin(&self.resolution_scope(), scope);
        self.scopes.borrow_mut().push(joined);
    }

    /// Exit the most recently entered scope.
    ///
    /// Calling this more times than [`RefResolver::push_scope`] is a
    /// programming error, reported as
    /// [`RefResolutionError::ScopeUnderflow`].
    pub fn pop_scope(&self) -> Result<(), Error> {
        match self.scopes.borrow_mut().pop() {
            Some(_) => Ok(()),
            None => Err(RefResolutionError::ScopeUnderflow.into()),
        }
    }

    /// Enter a sub-scope for as long as the returned guard lives.
    pub fn in_scope(&self, scope: &str) -> ScopeGuard<'_> {
        self.push_scope(scope);
        ScopeGuard { resolver: self }
    }

    /// Resolve `reference` and enter its resolution scope.
    ///
    /// The scope is exited when the returned guard drops, on every exit
    /// path; this is what keeps `$ref` recursion scope-balanced.
    pub fn resolving(&self, reference: &str) -> Result<(ScopeGuard<'_>, Arc<Value>), Error> {
        let (url, resolved) = self.resolve(reference)?;
        self.push_scope(&url);
        Ok((ScopeGuard { resolver: self }, resolved))
    }

    /// Resolve a reference to its absolute URI and the document
    /// fragment it points at.
    ///
    /// Local resolution (matching `$id`s inside the referrer) is tried
    /// before the store and the network.
    pub fn resolve(&self, reference: &str) -> Result<(String, Arc<Value>), Error> {
        let url = self.urljoin(&self.resolution_scope(), reference);
        let url = url.trim_end_matches('/').to_string();

        if let Some(local) = self.resolve_local(&url)? {
            return Ok((url, local));
        }
        let resolved = self.resolve_from_url(&url)?;
        Ok((url, resolved))
    }

    /// Resolve the reference within the referrer document itself, by
    /// searching for a subschema whose own `$id` names the target URI.
    fn resolve_local(&self, url: &str) -> Result<Option<Arc<Value>>, Error> {
        let (uri, fragment) = urldefrag(url);
        let referrer = Arc::clone(&self.referrer);

        for subschema in find_with_key(&referrer, "$id") {
            let id = match subschema.get("$id").and_then(Value::as_str) {
                Some(id) => id,
                None => continue,
            };
            let target = self.urljoin(&self.resolution_scope(), id);
            // Ids published with an empty trailing fragment still name
            // the bare document.
            let target = urldefrag(&target).0;
            if target.trim_end_matches('/') == uri.trim_end_matches('/') {
                let resolved = if fragment.is_empty() {
                    subschema.clone()
                } else {
                    self.resolve_fragment(subschema, fragment)?
                };
                return Ok(Some(Arc::new(resolved)));
            }
        }
        Ok(None)
    }

    /// Resolve an absolute URL (with optional fragment) against the
    /// store, fetching remotely on a miss. Results are memoized for the
    /// lifetime of the resolver.
    pub fn resolve_from_url(&self, url: &str) -> Result<Arc<Value>, Error> {
        if let Some(hit) = self.remote_cache.borrow().get(&url.to_string()) {
            return Ok(hit);
        }

        let (uri, fragment) = urldefrag(url);
        let stored = self.store.borrow().get(uri).cloned();
        let document = match stored {
            Some(document) => document,
            None => self.resolve_remote(uri)?,
        };

        let resolved = if fragment.is_empty() {
            document
        } else {
            Arc::new(self.resolve_fragment(&document, fragment)?)
        };
        self.remote_cache
            .borrow_mut()
            .insert(url.to_string(), Arc::clone(&resolved));
        Ok(resolved)
    }

    /// Resolve a fragment within a document.
    ///
    /// A fragment matching a registered anchor (`$anchor` or
    /// `$dynamicAnchor`) anywhere in the document wins; otherwise the
    /// fragment is walked as a JSON pointer, unescaping `~1` and `~0`
    /// and coercing segments to indices on arrays.
    pub fn resolve_fragment(&self, document: &Value, fragment: &str) -> Result<Value, Error> {
        let fragment = fragment.trim_start_matches('/');

        if !fragment.is_empty() {
            for keyword in ["$anchor", "$dynamicAnchor"] {
                for subschema in find_with_key(document, keyword) {
                    if subschema.get(keyword).and_then(Value::as_str) == Some(fragment) {
                        return Ok(subschema.clone());
                    }
                }
            }
        }

        let decoded = percent_decode_str(fragment).decode_utf8_lossy();
        let mut current = document;
        if !decoded.is_empty() {
            for part in decoded.split('/') {
                let part = part.replace("~1", "/").replace("~0", "~");
                let next = match current {
                    Value::Array(items) => {
                        part.parse::<usize>().ok().and_then(|index| items.get(index))
                    }
                    Value::Object(map) => map.get(part.as_str()),
                    _ => None,
                };
                current = next.ok_or_else(|| {
                    Error::from(RefResolutionError::UnresolvablePointer(fragment.to_string()))
                })?;
            }
        }
        Ok(current.clone())
    }

    /// Fetch a remote URI via its scheme handler or, for `http(s)`, the
    /// built-in client (feature `http`).
    ///
    /// Does not consult the store; on success the document is stored
    /// under its bare URI when remote caching is enabled, so sibling
    /// fragments of the same document reuse one fetch.
    pub fn resolve_remote(&self, uri: &str) -> Result<Arc<Value>, Error> {
        let scheme = scheme_of(uri);
        debug!(uri, scheme, "fetching remote reference");

        let fetched = if let Some(handler) = self.handlers.get(scheme) {
            handler(uri).map_err(|source| RefResolutionError::Fetch {
                uri: uri.to_string(),
                source,
            })?
        } else if scheme == "http" || scheme == "https" {
            fetch_http(uri)?
        } else {
            return Err(RefResolutionError::UnsupportedScheme {
                uri: uri.to_string(),
                scheme: scheme.to_string(),
            }
            .into());
        };

        let document = Arc::new(fetched);
        if self.cache_remote {
            self.store
                .borrow_mut()
                .insert(urldefrag(uri).0.to_string(), Arc::clone(&document));
        }
        Ok(document)
    }

    /// Join a reference against a base, memoized.
    fn urljoin(&self, base: &str, reference: &str) -> String {
        let key = (base.to_string(), reference.to_string());
        if let Some(hit) = self.urljoin_cache.borrow().get(&key) {
            return hit;
        }
        let joined = join_uri(base, reference);
        self.urljoin_cache.borrow_mut().insert(key, joined.clone());
        joined
    }
}

/// Pops one resolution scope when dropped.
pub struct ScopeGuard<'r> {
    resolver: &'r RefResolver,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        // The guard holds exactly one push, so the stack is non-empty.
        let _ = self.resolver.pop_scope();
    }
}

#[cfg(feature = "http")]
fn fetch_http(uri: &str) -> Result<Value, Error> {
    let wrap = |source: reqwest::Error| RefResolutionError::Fetch {
        uri: uri.to_string(),
        source: source.into(),
    };
    let response = reqwest::blocking::get(uri)
        .and_then(|response| response.error_for_status())
        .map_err(wrap)?;
    Ok(response.json().map_err(wrap)?)
}

#[cfg(not(feature = "http"))]
fn fetch_http(uri: &str) -> Result<Value, Error> {
    Err(RefResolutionError::UnsupportedScheme {
        uri: uri.to_string(),
        scheme: scheme_of(uri).to_string(),
    }
    .into())
}

/// Split a URI into its defragmented part and its fragment.
pub(crate) fn urldefrag(uri: &str) -> (&str, &str) {
    match uri.split_once('#') {
        Some((head, fragment)) => (head, fragment),
        None => (uri, ""),
    }
}

/// The scheme of a URI, or `""` when it has none.
fn scheme_of(uri: &str) -> &str {
    match uri.split_once(':') {
        Some((scheme, _))
            if scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            scheme
        }
        _ => "",
    }
}

/// Join a reference against a base URI: absolute references replace the
/// base, relative references merge into it.
fn join_uri(base: &str, reference: &str) -> String {
    if reference.is_empty() {
        return base.to_string();
    }
    if let Ok(absolute) = Url::parse(reference) {
        return absolute.to_string();
    }
    if let Ok(base_url) = Url::parse(base) {
        if let Ok(joined) = base_url.join(reference) {
            return joined.to_string();
        }
    }
    reference.to_string()
}

/// Every object in `value`'s tree carrying the given key.
fn find_with_key<'v>(value: &'v Value, key: &str) -> Vec<&'v Value> {
    let mut found = Vec::new();
    let mut pending = vec![value];
    while let Some(current) = pending.pop() {
        match current {
            Value::Object(map) => {
                if map.contains_key(key) {
                    found.push(current);
                }
                pending.extend(map.values());
            }
            Value::Array(items) => pending.extend(items.iter()),
            _ => {}
        }
    }
    found
}
