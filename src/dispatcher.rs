//! Handler chain execution over the action backend.
//!
//! Handler names are resolved once, at table compilation: a name registered
//! as a local handler becomes `HandlerTarget::Local`, anything else is a
//! remote action address dispatched through the [`ActionClient`]. Per
//! request, the chain threads templated outputs into the next step's args
//! until a step produces a terminal response.

use crate::config::RouteDef;
use crate::error::CallError;
use crate::response::{materialize, HttpResponse};
use crate::router::RouteTable;
use crate::template::{merge_left, project, Template};
use http::Method;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// The sole seam to backend logic: an opaque, addressable action call.
/// Implementations may block; the chain awaits each call's completion before
/// projecting its output.
pub trait ActionClient: Send + Sync {
    fn call(&self, address: &str, args: Value, meta: Option<Value>) -> Result<Value, CallError>;
}

/// A locally registered handler function.
pub type LocalHandler = Arc<dyn Fn(Value) -> Result<Value, CallError> + Send + Sync>;

#[derive(Clone)]
enum HandlerTarget {
    Local(LocalHandler),
    Remote(String),
}

#[derive(Clone)]
struct ChainStep {
    name: String,
    target: HandlerTarget,
    input: Option<Template>,
    output: Option<Template>,
}

/// Compiled route table plus the resolved handler chain per route.
#[derive(Clone)]
pub struct Dispatcher {
    table: RouteTable,
    chains: Vec<Vec<ChainStep>>,
    client: Arc<dyn ActionClient>,
}

impl Dispatcher {
    /// Compile routes and resolve every handler name against the registered
    /// local handlers. Unknown names are remote action addresses.
    pub fn compile(
        routes: Vec<RouteDef>,
        locals: &HashMap<String, LocalHandler>,
        client: Arc<dyn ActionClient>,
    ) -> Self {
        let chains: Vec<Vec<ChainStep>> = routes
            .iter()
            .map(|route| {
                route
                    .handler_specs()
                    .into_iter()
                    .map(|spec| {
                        let target = match locals.get(&spec.name) {
                            Some(f) => HandlerTarget::Local(Arc::clone(f)),
                            None => HandlerTarget::Remote(spec.name.clone()),
                        };
                        ChainStep {
                            name: spec.name,
                            target,
                            input: spec.input,
                            output: spec.output,
                        }
                    })
                    .collect()
            })
            .collect();

        Dispatcher {
            table: RouteTable::compile(routes),
            chains,
            client,
        }
    }

    pub fn route_count(&self) -> usize {
        self.table.len()
    }

    /// Match and run the handler chain for one request.
    ///
    /// Returns `Ok(None)` when no route matched or the chain completed
    /// without any step producing a terminal response (the caller falls
    /// through). Errors from handler invocations propagate untouched.
    pub fn dispatch(
        &self,
        method: &Method,
        path: &str,
        args: &Value,
    ) -> Result<Option<HttpResponse>, CallError> {
        let Some(hit) = self.table.match_route(method, path) else {
            return Ok(None);
        };
        let chain = &self.chains[hit.index];
        if chain.is_empty() {
            return Ok(None);
        }

        // Per-request args: the request-args object plus matched params.
        let mut args = args.clone();
        if let Value::Object(map) = &mut args {
            map.insert(
                "params".to_string(),
                serde_json::to_value(&hit.params).unwrap_or(Value::Null),
            );
        }

        for step in chain {
            let call_args = match &step.input {
                Some(template) => project(template, &args),
                None => args.clone(),
            };

            debug!(handler = %step.name, "invoking handler");
            let result = match &step.target {
                HandlerTarget::Local(f) => f(call_args)?,
                HandlerTarget::Remote(address) => self.client.call(address, call_args, None)?,
            };

            let candidate = match &step.output {
                Some(template) => project(template, &result),
                None => result,
            };

            if let Some(response) = materialize(&candidate) {
                debug!(handler = %step.name, status = response.status, "chain terminated");
                return Ok(Some(response));
            }

            // Not terminal: fold into the args for the next step; existing
            // args keys win.
            args = merge_left(args, candidate);
        }

        debug!("handler chain exhausted without a terminal response");
        Ok(None)
    }
}
