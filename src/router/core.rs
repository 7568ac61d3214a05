//! Route table: registration and request matching.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use anyhow::Context;
use http::Method;
use serde_json::Value;
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::args::{Arg, Args};
use super::route::{HandlerRef, Route, ROUTABLE_METHODS};
use crate::cache::RouteStore;
use crate::error::ConfigError;
use crate::meta::{ControllerMeta, FormalParam};

/// Cache key under which the route table is stored
pub const ROUTE_CACHE_KEY: &str = "urlMap";

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Captured path parameters, names shared with the route
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Result of matching a request to a route
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    /// Placeholder captures in pattern order (percent-decoded)
    pub path_params: ParamVec,
    /// Positional handler arguments
    pub args: Args,
}

impl RouteMatch {
    /// Get a captured parameter by placeholder name
    ///
    /// Uses "last write wins" semantics when a name appears twice.
    #[inline]
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn handler(&self) -> &HandlerRef {
        &self.route.handler
    }
}

/// Routes grouped by HTTP method, each group in registration order.
///
/// Matching walks the group of the request method and returns the first
/// route that matches:
///
/// - literal patterns compare equal to the normalized request path
/// - parameterized patterns are matched against the percent-decoded path
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<Method, Vec<Arc<Route>>>,
}

impl RouteTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty table, ready for [`register`](Self::register)
    #[must_use]
    pub fn build() -> Self {
        Self::new()
    }

    /// Add the routes declared by a controller.
    ///
    /// Every `url` declaration becomes one route whose pattern is
    /// `root + base_path + declared pattern`. Returns the number of routes
    /// added.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed declaration or uncompilable pattern. The
    /// table is left untouched in that case.
    pub fn register(
        &mut self,
        root: &str,
        base_path: &str,
        controller: &ControllerMeta,
    ) -> Result<usize, ConfigError> {
        let prefix = format!("{}{}", normalize_root(root), normalize_base_path(base_path));
        let mut compiled = Vec::new();

        for method in &controller.methods {
            for decl in method.url_declarations()? {
                let joined = format!("{}{}", prefix, decl.pattern).replace('\\', "/");
                let pattern = joined.strip_prefix('/').unwrap_or(&joined);
                let pattern = pattern.strip_suffix('/').unwrap_or(pattern);
                compiled.push(Route::new(
                    decl.method,
                    pattern,
                    HandlerRef::new(controller.name.as_str(), method.name.as_str()),
                    method.params.clone(),
                    method.annotations.clone(),
                )?);
            }
        }

        let added = compiled.len();
        for route in compiled {
            debug!(route = %route, "Route registered");
            self.insert(route);
        }

        info!(
            controller = %controller.name,
            routes_added = added,
            routes_count = self.len(),
            prefix = %prefix,
            "Controller routes registered"
        );
        Ok(added)
    }

    /// Insert a compiled route. A route with the same method and pattern is
    /// replaced in place.
    pub fn insert(&mut self, route: Route) {
        let group = self.routes.entry(route.method.clone()).or_default();
        match group.iter_mut().find(|existing| existing.same_key(&route)) {
            Some(existing) => *existing = Arc::new(route),
            None => group.push(Arc::new(route)),
        }
    }

    /// Match a request.
    ///
    /// `path` is the normalized request path (see
    /// [`normalize_path`](crate::server::normalize_path)); `body` is the
    /// parsed request body if the method carries one.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str, body: Option<&Value>) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, "Route match attempt");

        let decoded = decode_path(path);
        let found = self
            .routes
            .get(method)
            .into_iter()
            .flatten()
            .find_map(|route| bind(route, path, &decoded, body));

        match &found {
            Some(m) => info!(
                method = %method,
                path = %path,
                handler = %m.route.handler,
                route_pattern = %m.route.pattern,
                path_params = ?m.path_params,
                "Route matched"
            ),
            None => warn!(method = %method, path = %path, "No route matched"),
        }
        found
    }

    /// Methods that have at least one route matching `path`, in
    /// [`ROUTABLE_METHODS`] order.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        let decoded = decode_path(path);
        ROUTABLE_METHODS
            .iter()
            .filter(|method| {
                self.routes
                    .get(*method)
                    .is_some_and(|group| group.iter().any(|r| matches(r, path, &decoded)))
            })
            .cloned()
            .collect()
    }

    /// Find a route by method and full pattern
    #[must_use]
    pub fn find(&self, method: &Method, pattern: &str) -> Option<&Arc<Route>> {
        self.routes
            .get(method)?
            .iter()
            .find(|r| r.pattern == pattern)
    }

    /// All routes in [`ROUTABLE_METHODS`] order, then registration order
    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        ROUTABLE_METHODS
            .iter()
            .filter_map(|m| self.routes.get(m))
            .flatten()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Print all registered routes to stdout
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.len());
        for route in self.routes() {
            println!("[route] {route}");
        }
    }

    /// Serialize the table as `{ "GET": [route, ...], ... }`
    ///
    /// # Errors
    ///
    /// Propagates serializer failures.
    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        let snapshot: BTreeMap<&str, Vec<&Route>> = ROUTABLE_METHODS
            .iter()
            .filter_map(|m| {
                self.routes
                    .get(m)
                    .map(|group| (m.as_str(), group.iter().map(|r| &**r).collect()))
            })
            .collect();
        serde_json::to_vec(&snapshot)
    }

    /// Rebuild a table written by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Fails on malformed data or a pattern that no longer compiles.
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let snapshot: BTreeMap<String, Vec<Route>> =
            serde_json::from_slice(bytes).context("route table cache is not valid JSON")?;

        let mut table = Self::new();
        for route in snapshot.into_values().flatten() {
            table.insert(route.compiled()?);
        }
        Ok(table)
    }

    /// Load a table from a store. `Ok(None)` when nothing is stored.
    ///
    /// # Errors
    ///
    /// Store failures and unreadable entries.
    pub fn load_from_cache(store: &dyn RouteStore) -> anyhow::Result<Option<Self>> {
        match store.get(ROUTE_CACHE_KEY)? {
            Some(bytes) => {
                let table = Self::from_bytes(&bytes)?;
                info!(routes_count = table.len(), "Route table loaded from cache");
                Ok(Some(table))
            }
            None => Ok(None),
        }
    }

    /// Write the table to a store
    ///
    /// # Errors
    ///
    /// Serialization and store failures.
    pub fn persist(&self, store: &dyn RouteStore) -> anyhow::Result<()> {
        let bytes = self.to_bytes().context("failed to serialize route table")?;
        store.set(ROUTE_CACHE_KEY, &bytes)?;
        info!(routes_count = self.len(), "Route table written to cache");
        Ok(())
    }

    /// Remove a stored table
    ///
    /// # Errors
    ///
    /// Store failures.
    pub fn discard_cache(store: &dyn RouteStore) -> anyhow::Result<()> {
        store.delete(ROUTE_CACHE_KEY)?;
        debug!("Route table cache discarded");
        Ok(())
    }
}

/// `api/` for `/api/`, empty for an empty root
#[must_use]
pub fn normalize_root(root: &str) -> String {
    let trimmed = root.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

/// `users/` for `/users`, empty for an empty base path
#[must_use]
pub fn normalize_base_path(base_path: &str) -> String {
    let trimmed = base_path.trim_start_matches('/');
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    }
}

/// Percent-decode a path, treating `+` as a space. Undecodable input is
/// returned unchanged.
fn decode_path(path: &str) -> String {
    let spaced = path.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

fn matches(route: &Route, path: &str, decoded: &str) -> bool {
    match &route.binding.matcher {
        Some(re) => re.is_match(decoded),
        None => route.pattern == path,
    }
}

fn bind(route: &Arc<Route>, path: &str, decoded: &str, body: Option<&Value>) -> Option<RouteMatch> {
    let binding = &route.binding;
    let mut args: Args = route.params.iter().map(FormalParam::default_value).collect();
    let mut path_params = ParamVec::new();

    match &binding.matcher {
        None => {
            if route.pattern != path {
                return None;
            }
            if let Some(slot) = binding.data_slot {
                for i in 0..slot {
                    args.set(i, Arg::Value(Value::Null));
                }
                args.set(slot, Arg::Value(body.cloned().unwrap_or(Value::Null)));
            }
        }
        Some(re) => {
            let caps = re.captures(decoded)?;
            for (i, name) in binding.capture_names.iter().enumerate() {
                let Some(capture) = caps.get(i + 1) else {
                    continue;
                };
                let value = capture.as_str().to_string();
                if let Some(Some(pos)) = binding.capture_slots.get(i) {
                    args.set(*pos, Arg::Value(Value::String(value.clone())));
                }
                path_params.push((Arc::from(name.as_str()), value));
            }
            if let (Some(slot), Some(body)) = (binding.data_slot, body) {
                if !body.is_null() {
                    args.set(slot, Arg::Value(body.clone()));
                }
            }
        }
    }

    Some(RouteMatch {
        route: Arc::clone(route),
        path_params,
        args,
    })
}
