//! Configuration structures: route definitions, spaces, assets, and the REST
//! mapping table.
//!
//! Everything here is plain data handed in at startup (or on reload). Route
//! tables, spaces and mappings deserialize from YAML or JSON documents; after
//! construction the configuration is immutable: the [`crate::app::App`]
//! swaps whole snapshots, never mutates in place.

use crate::template::Template;
use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Route method selector. `all` and `use` match any request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RouteMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Patch,
    All,
    Use,
}

impl RouteMethod {
    /// Case-insensitive acceptance of a concrete request method.
    pub fn accepts(self, method: &Method) -> bool {
        let name = match self {
            RouteMethod::All | RouteMethod::Use => return true,
            RouteMethod::Get => "GET",
            RouteMethod::Post => "POST",
            RouteMethod::Put => "PUT",
            RouteMethod::Delete => "DELETE",
            RouteMethod::Patch => "PATCH",
        };
        method.as_str().eq_ignore_ascii_case(name)
    }
}

/// One handler step in a route's chain: a handler name (a registered local
/// handler or a backend action address) plus optional projection templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerSpec {
    pub name: String,
    #[serde(default)]
    pub input: Option<Template>,
    #[serde(default)]
    pub output: Option<Template>,
}

/// A route definition. `handlers` is the chain; a route carrying only the
/// legacy `handler`/`input`/`output` fields is sugar for a one-step chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteDef {
    #[serde(default)]
    pub method: RouteMethod,
    pub path: String,
    /// Static params overlaid on captured ones (static values win).
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub handlers: Vec<HandlerSpec>,
    #[serde(default)]
    pub handler: Option<String>,
    #[serde(default)]
    pub input: Option<Template>,
    #[serde(default)]
    pub output: Option<Template>,
}

impl RouteDef {
    pub fn new(method: RouteMethod, path: impl Into<String>, handler: impl Into<String>) -> Self {
        RouteDef {
            method,
            path: path.into(),
            params: BTreeMap::new(),
            handlers: Vec::new(),
            handler: Some(handler.into()),
            input: None,
            output: None,
        }
    }

    /// A handler-less route matching any method, used for synthesized tables
    /// (view routes, REST resource routes).
    pub fn any(path: impl Into<String>) -> Self {
        RouteDef {
            method: RouteMethod::All,
            path: path.into(),
            params: BTreeMap::new(),
            handlers: Vec::new(),
            handler: None,
            input: None,
            output: None,
        }
    }

    /// The effective handler chain (explicit list, or the legacy sugar).
    pub fn handler_specs(&self) -> Vec<HandlerSpec> {
        if !self.handlers.is_empty() {
            return self.handlers.clone();
        }
        match &self.handler {
            Some(name) => vec![HandlerSpec {
                name: name.clone(),
                input: self.input.clone(),
                output: self.output.clone(),
            }],
            None => Vec::new(),
        }
    }
}

/// Asset kind. Only `static` and `view` participate in resource resolution;
/// `db` assets exist for the REST resource router's schema lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Static,
    View,
    Db,
}

/// A named, typed resource mounted (optionally) at a URL prefix. Its storage
/// location relative to the space's storage root is its name. Any extra
/// fields form the asset's schema, exposed to backend actions with the
/// internal-only fields stripped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AssetType,
    #[serde(default)]
    pub mount: Option<String>,
    #[serde(default)]
    pub perms: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Asset {
    /// Schema as seen by backend actions: name plus the free-form fields,
    /// without `type`, `mount` or `perms`.
    pub fn schema(&self) -> Value {
        let mut schema = self.extra.clone();
        schema.insert("name".to_string(), Value::String(self.name.clone()));
        Value::Object(schema)
    }
}

/// A tenant/application context: its mounted assets, its own routes, and the
/// storage root its static/view assets resolve under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub storage: PathBuf,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub routes: Vec<RouteDef>,
}

impl Space {
    pub fn asset(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name == name)
    }
}

/// REST resource router configuration: mapping keys are dotted
/// `"<asset|ε>.<method|ε>"` selectors (empty segment = wildcard), values are
/// backend action addresses. `auth` is the service whose `gate` action is
/// invoked before every mapped dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base")]
    pub base: String,
    #[serde(default)]
    pub mappings: BTreeMap<String, String>,
    #[serde(default)]
    pub auth: Option<String>,
}

fn default_base() -> String {
    "/".to_string()
}

/// The whole startup configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Statically configured routes, searched before the space's own routes.
    #[serde(default)]
    pub routes: Vec<RouteDef>,
    pub space: Space,
    #[serde(default)]
    pub api: Option<ApiConfig>,
}

/// Load a configuration document, YAML or JSON by file extension.
pub fn load_config(file_path: &str) -> anyhow::Result<AppConfig> {
    let content = std::fs::read_to_string(file_path)?;
    let config: AppConfig = if file_path.ends_with(".yaml") || file_path.ends_with(".yml") {
        serde_yaml::from_str(&content)?
    } else {
        serde_json::from_str(&content)?
    };
    Ok(config)
}
