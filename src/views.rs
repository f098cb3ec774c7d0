//! View-engine seam.
//!
//! Rendering itself is a collaborator concern: the asset resolver hands an
//! engine the matched entry file, the full scanned file set (so templates can
//! include/extend each other), and the request locals. The crate ships a
//! MiniJinja-backed default and a remote engine that forwards the same
//! contract to a backend action.

use crate::dispatcher::ActionClient;
use crate::error::CallError;
use minijinja::Environment;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

pub trait ViewEngine: Send + Sync {
    /// Template file extension this engine consumes (with leading dot).
    fn extension(&self) -> &str;

    /// Render `entry` with the scanned `files` (keyed by asset-relative path)
    /// and the request `locals`.
    fn render(
        &self,
        entry: &str,
        files: &BTreeMap<String, String>,
        locals: &Value,
    ) -> Result<String, CallError>;
}

/// Default in-process engine backed by MiniJinja.
pub struct MiniJinjaEngine {
    extension: String,
}

impl MiniJinjaEngine {
    pub fn new() -> Self {
        MiniJinjaEngine {
            extension: ".html".to_string(),
        }
    }

    pub fn with_extension(extension: impl Into<String>) -> Self {
        MiniJinjaEngine {
            extension: extension.into(),
        }
    }
}

impl Default for MiniJinjaEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewEngine for MiniJinjaEngine {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn render(
        &self,
        entry: &str,
        files: &BTreeMap<String, String>,
        locals: &Value,
    ) -> Result<String, CallError> {
        let mut env = Environment::new();
        for (name, source) in files {
            env.add_template(name, source)
                .map_err(|e| CallError::internal(format!("template '{name}': {e}")))?;
        }
        let template = env
            .get_template(entry)
            .map_err(|e| CallError::internal(format!("view entry '{entry}': {e}")))?;
        template
            .render(locals)
            .map_err(|e| CallError::internal(format!("render '{entry}': {e}")))
    }
}

/// Engine addressed by name and reached through the action backend, for
/// renderers that live behind the RPC boundary.
pub struct RemoteViewEngine {
    address: String,
    extension: String,
    client: Arc<dyn ActionClient>,
}

impl RemoteViewEngine {
    pub fn new(
        address: impl Into<String>,
        extension: impl Into<String>,
        client: Arc<dyn ActionClient>,
    ) -> Self {
        RemoteViewEngine {
            address: address.into(),
            extension: extension.into(),
            client,
        }
    }
}

impl ViewEngine for RemoteViewEngine {
    fn extension(&self) -> &str {
        &self.extension
    }

    fn render(
        &self,
        entry: &str,
        files: &BTreeMap<String, String>,
        locals: &Value,
    ) -> Result<String, CallError> {
        let result = self.client.call(
            &self.address,
            json!({ "entry": entry, "files": files, "locals": locals }),
            None,
        )?;
        match result {
            Value::String(rendered) => Ok(rendered),
            other => Err(CallError::internal(format!(
                "view engine '{}' returned a non-string result: {other}",
                self.address
            ))),
        }
    }
}
