//! REST resource router.
//!
//! Exposes a space's data assets under a fixed two-route contract
//! (`<base>/:asset` and `<base>/:asset/:id`, any method) and maps each
//! `(asset, method)` pair onto a backend action address through the
//! configured mapping table. Keys are dotted `"<asset|ε>.<method|ε>"`
//! selectors where an empty segment is a wildcard; rules are normalized and
//! sorted most-specific-first at compilation (`asset.method`, then `asset.`,
//! then `.method`, then `.`), so insertion order never matters.
//!
//! When an `auth` service is configured and the asset exists in the space,
//! its `gate` action is invoked before the mapped action with the same call
//! args plus an `agent` descriptor and the asset's `perms`; a gate error
//! aborts the dispatch and propagates.

use crate::config::{ApiConfig, RouteDef, Space};
use crate::dispatcher::ActionClient;
use crate::error::CallError;
use crate::response::{materialize, HttpResponse};
use crate::router::RouteTable;
use http::Method;
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Clone)]
struct MappingRule {
    /// Lowercased asset selector; `None` matches any asset.
    asset: Option<String>,
    /// Lowercased method selector; `None` matches any method.
    method: Option<String>,
    address: String,
}

impl MappingRule {
    fn specificity(&self) -> u8 {
        (self.asset.is_some() as u8) << 1 | self.method.is_some() as u8
    }
}

/// Compiled REST resource router.
pub struct RestResource {
    table: RouteTable,
    rules: Vec<MappingRule>,
    auth: Option<String>,
}

impl RestResource {
    pub fn compile(config: &ApiConfig) -> Self {
        let base = config.base.trim_end_matches('/');
        let table = RouteTable::compile(vec![
            RouteDef::any(format!("{base}/:asset")),
            RouteDef::any(format!("{base}/:asset/:id")),
        ]);

        let mut rules: Vec<MappingRule> = config
            .mappings
            .iter()
            .filter_map(|(key, address)| {
                // A selector is exactly "<asset>.<method>"; anything else is
                // not a rule.
                let (asset, method) = key.split_once('.')?;
                if method.contains('.') {
                    return None;
                }
                let normalize = |s: &str| {
                    let s = s.trim().to_lowercase();
                    (!s.is_empty()).then_some(s)
                };
                Some(MappingRule {
                    asset: normalize(asset),
                    method: normalize(method),
                    address: address.clone(),
                })
            })
            .collect();
        rules.sort_by_key(|r| std::cmp::Reverse(r.specificity()));

        RestResource {
            table,
            rules,
            auth: config.auth.clone(),
        }
    }

    fn resolve_address(&self, asset: &str, method: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| {
                rule.asset.as_deref().map_or(true, |a| a == asset)
                    && rule.method.as_deref().map_or(true, |m| m == method)
            })
            .map(|rule| rule.address.as_str())
    }

    /// Handle one request. `args` is the request-args object (`form`,
    /// `query`, `headers` are projected into the action call). Returns
    /// `Ok(None)` to fall through; gate and action errors propagate.
    pub fn handle(
        &self,
        space: &Space,
        method: &Method,
        path: &str,
        args: &Value,
        client: &dyn ActionClient,
    ) -> Result<Option<HttpResponse>, CallError> {
        let Some(hit) = self.table.match_route(method, path) else {
            return Ok(None);
        };
        let Some(asset_name) = hit.params.get("asset").cloned() else {
            return Ok(None);
        };
        let id = hit.params.get("id").cloned();
        let asset_key = asset_name.to_lowercase();
        let method_key = method.as_str().to_lowercase();

        let Some(address) = self.resolve_address(&asset_key, &method_key) else {
            debug!(asset = %asset_name, method = %method_key, "no mapping rule matched");
            return Ok(None);
        };

        let call_args = json!({
            "id": id,
            "data": args.get("form").cloned().unwrap_or(Value::Null),
            "cond": args.get("query").cloned().unwrap_or(Value::Null),
            "meta": args.get("headers").cloned().unwrap_or(Value::Null),
        });

        let asset = space.asset(&asset_name);
        let schema = asset.map(|a| a.schema());

        if let (Some(auth), Some(asset)) = (&self.auth, asset) {
            let mut gate_args = call_args.clone();
            if let Value::Object(map) = &mut gate_args {
                map.insert(
                    "agent".to_string(),
                    json!({
                        "space": space.id,
                        "asset": asset_name,
                        "id": id,
                        "action": method_key,
                    }),
                );
                map.insert(
                    "perms".to_string(),
                    asset.perms.clone().unwrap_or(Value::Null),
                );
            }
            client.call(&format!("{auth}.gate"), gate_args, None)?;
        }

        debug!(asset = %asset_name, address = %address, "dispatching mapped action");
        let meta = schema.map(|s| json!({ "schema": s }));
        let result = client.call(address, call_args, meta)?;

        Ok(materialize(&json!({ "body": result })))
    }
}
