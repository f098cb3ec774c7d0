use crate::config::RouteDef;
use http::Method;
use regex::Regex;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A compiled path template: literal segments, `:name` parameters, and an
/// optional trailing `*name` wildcard capturing the rest of the path
/// (including nothing).
#[derive(Debug, Clone)]
pub struct PathTemplate {
    regex: Regex,
    param_names: Vec<String>,
}

impl PathTemplate {
    /// Compile a path template into an anchored regex.
    ///
    /// Segments are processed in order: `:name` becomes a single-segment
    /// capture, a segment starting with `*` becomes a trailing multi-segment
    /// capture (named `wildcard` when bare), and everything else is matched
    /// literally. Templates are validated configuration, so compilation
    /// failures abort construction.
    pub fn compile(path: &str) -> Self {
        let mut pattern = String::with_capacity(path.len() + 8);
        pattern.push('^');
        let mut param_names = Vec::new();

        for segment in path.split('/') {
            if segment.is_empty() {
                continue;
            }
            if let Some(name) = segment.strip_prefix(':') {
                param_names.push(name.to_string());
                pattern.push_str("/([^/]+)");
            } else if let Some(name) = segment.strip_prefix('*') {
                let name = if name.is_empty() { "wildcard" } else { name };
                param_names.push(name.to_string());
                pattern.push_str("(?:/(.*))?");
                break;
            } else {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }

        if pattern == "^" {
            pattern.push('/');
        }
        pattern.push('$');

        let regex = Regex::new(&pattern).expect("failed to compile path template");
        PathTemplate { regex, param_names }
    }

    /// Match a concrete request path, returning URL-decoded captures.
    pub fn capture(&self, path: &str) -> Option<BTreeMap<String, String>> {
        let caps = self.regex.captures(path)?;
        let mut params = BTreeMap::new();
        for (idx, name) in self.param_names.iter().enumerate() {
            if let Some(m) = caps.get(idx + 1) {
                let decoded = urlencoding::decode(m.as_str())
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| m.as_str().to_string());
                params.insert(name.clone(), decoded);
            }
        }
        Some(params)
    }
}

/// Result of matching a request against a route table.
#[derive(Debug, Clone)]
pub struct RouteHit {
    /// Position of the matched route in the table's definition order.
    pub index: usize,
    pub route: Arc<RouteDef>,
    /// Captured params with the route's static `params` overlaid on top.
    pub params: BTreeMap<String, String>,
}

/// An ordered, immutable table of compiled routes. First match wins.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: Vec<(Arc<RouteDef>, PathTemplate)>,
}

impl RouteTable {
    pub fn compile(routes: impl IntoIterator<Item = RouteDef>) -> Self {
        let entries: Vec<_> = routes
            .into_iter()
            .map(|def| {
                let template = PathTemplate::compile(&def.path);
                (Arc::new(def), template)
            })
            .collect();

        info!(routes_count = entries.len(), "route table compiled");
        RouteTable { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Scan the table in order; the first route whose method selector accepts
    /// the request and whose pattern matches the path wins. Returns `None`
    /// when nothing matches (the caller falls through).
    pub fn match_route(&self, method: &Method, path: &str) -> Option<RouteHit> {
        debug!(method = %method, path = %path, "route match attempt");

        for (index, (def, template)) in self.entries.iter().enumerate() {
            if !def.method.accepts(method) {
                continue;
            }
            let Some(captured) = template.capture(path) else {
                continue;
            };

            // Static route params overlay captured ones; static values win.
            let mut params = captured;
            for (key, value) in &def.params {
                params.insert(key.clone(), value.clone());
            }

            debug!(
                method = %method,
                path = %path,
                pattern = %def.path,
                params = ?params,
                "route matched"
            );
            return Some(RouteHit {
                index,
                route: Arc::clone(def),
                params,
            });
        }

        debug!(method = %method, path = %path, "no route matched");
        None
    }
}
