//! Pipeline composition and the per-request error boundary.
//!
//! The [`App`] owns the compiled engine snapshot (route table, REST resource
//! router, configuration) behind an `ArcSwap`: request handling loads the
//! current snapshot lock-free, and [`App::reload`] swaps in a freshly
//! compiled one without disturbing in-flight requests.
//!
//! Stages run in a fixed order behind one error boundary:
//! explicit routes (static table, then the space's routes) → REST resource
//! router → static assets → view assets → 404 fallthrough. Errors carrying a
//! status surface as that status with the serialized error as body; anything
//! else is logged and surfaces as a bare 500. One structured log record is
//! emitted per request.

use crate::api::RestResource;
use crate::assets::{resolve_static, resolve_view};
use crate::config::AppConfig;
use crate::dispatcher::{ActionClient, Dispatcher, LocalHandler};
use crate::error::CallError;
use crate::response::{status_phrase, Body, HttpResponse};
use crate::views::{MiniJinjaEngine, ViewEngine};
use arc_swap::ArcSwap;
use http::Method;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// A transport-parsed request description. Body/query/cookie parsing happens
/// upstream; this layer only consumes the results.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    pub form: Value,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Request {
            method,
            path: path.into(),
            query: BTreeMap::new(),
            headers: BTreeMap::new(),
            cookies: BTreeMap::new(),
            form: Value::Null,
        }
    }

    pub fn form(mut self, form: Value) -> Self {
        self.form = form;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// The request-args object threaded through every stage.
    fn args(&self, space: &crate::config::Space) -> Value {
        json!({
            "method": self.method.as_str(),
            "path": self.path,
            "query": self.query,
            "headers": self.headers,
            "cookies": self.cookies,
            "form": self.form,
            "space": serde_json::to_value(space).unwrap_or(Value::Null),
        })
    }
}

/// One compiled configuration snapshot. Immutable once built; replaced
/// wholesale on reload.
struct Engine {
    config: AppConfig,
    dispatcher: Dispatcher,
    rest: Option<RestResource>,
}

impl Engine {
    fn build(
        config: AppConfig,
        locals: &HashMap<String, LocalHandler>,
        client: Arc<dyn ActionClient>,
    ) -> Self {
        // Static routes are searched before the space's own routes.
        let mut routes = config.routes.clone();
        routes.extend(config.space.routes.clone());
        let dispatcher = Dispatcher::compile(routes, locals, client);
        let rest = config.api.as_ref().map(RestResource::compile);
        Engine {
            config,
            dispatcher,
            rest,
        }
    }
}

pub struct AppBuilder {
    config: AppConfig,
    client: Arc<dyn ActionClient>,
    locals: HashMap<String, LocalHandler>,
    view_engine: Option<Arc<dyn ViewEngine>>,
}

impl AppBuilder {
    /// Register a local handler; route handler names resolve against these
    /// before falling back to remote action addresses.
    pub fn local<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Value) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.locals.insert(name.into(), Arc::new(handler));
        self
    }

    pub fn view_engine(mut self, engine: Arc<dyn ViewEngine>) -> Self {
        self.view_engine = Some(engine);
        self
    }

    pub fn build(self) -> App {
        let engine = Engine::build(self.config, &self.locals, Arc::clone(&self.client));
        App {
            engine: ArcSwap::from_pointee(engine),
            locals: self.locals,
            client: self.client,
            view_engine: self
                .view_engine
                .unwrap_or_else(|| Arc::new(MiniJinjaEngine::new())),
        }
    }
}

/// The request-dispatch pipeline.
pub struct App {
    engine: ArcSwap<Engine>,
    locals: HashMap<String, LocalHandler>,
    client: Arc<dyn ActionClient>,
    view_engine: Arc<dyn ViewEngine>,
}

impl App {
    pub fn builder(config: AppConfig, client: Arc<dyn ActionClient>) -> AppBuilder {
        AppBuilder {
            config,
            client,
            locals: HashMap::new(),
            view_engine: None,
        }
    }

    /// Swap in a new configuration. In-flight requests keep the snapshot
    /// they loaded; subsequent requests see the new one.
    pub fn reload(&self, config: AppConfig) {
        let engine = Engine::build(config, &self.locals, Arc::clone(&self.client));
        self.engine.store(Arc::new(engine));
    }

    /// Run one request through the pipeline. Always produces a response:
    /// fallthrough becomes 404, errors are converted at this boundary.
    pub fn handle(&self, request: &Request) -> HttpResponse {
        let engine = self.engine.load();
        let start = Instant::now();

        let response = match self.run(&engine, request) {
            Ok(Some(response)) => response,
            Ok(None) => HttpResponse::not_found(),
            Err(err) => error_response(err),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        let redirect = response.header("location");
        info!(
            method = %request.method,
            status = response.status,
            path = %request.path,
            elapsed_ms,
            redirect = redirect.unwrap_or(""),
            "request handled"
        );
        response
    }

    fn run(&self, engine: &Engine, request: &Request) -> Result<Option<HttpResponse>, CallError> {
        let space = &engine.config.space;
        let args = request.args(space);

        if let Some(response) = engine
            .dispatcher
            .dispatch(&request.method, &request.path, &args)?
        {
            return Ok(Some(response));
        }

        if let Some(rest) = &engine.rest {
            if let Some(response) = rest.handle(
                space,
                &request.method,
                &request.path,
                &args,
                self.client.as_ref(),
            )? {
                return Ok(Some(response));
            }
        }

        if let Some(response) = resolve_static(space, &request.path) {
            return Ok(Some(response));
        }

        if let Some(response) = resolve_view(
            space,
            &request.method,
            &request.path,
            self.view_engine.as_ref(),
            &args,
        )? {
            return Ok(Some(response));
        }

        Ok(None)
    }
}

/// Convert a dispatch error at the boundary. Status-annotated errors carry
/// their serialized detail; unannotated ones are logged and never leaked.
fn error_response(err: CallError) -> HttpResponse {
    match err.status {
        Some(status) => {
            let mut response = HttpResponse::new(status, Body::Json(err.to_body()));
            response.headers.push((
                "Content-Type".to_string(),
                "application/json".to_string(),
            ));
            response
        }
        None => {
            error!(error = %err, "unhandled dispatch error");
            HttpResponse::new(500, Body::Text(status_phrase(500)))
        }
    }
}
