//! # Switchboard
//!
//! **Switchboard** is a declarative request-dispatch layer that sits between an
//! HTTP transport and a set of named backend *actions* (remote-callable
//! operations addressed as `"service.method"`).
//!
//! ## Overview
//!
//! A request flows through four stages:
//!
//! 1. **Routing**: the request method/path is matched against an ordered
//!    route table of path templates (`/pets/:id`, trailing wildcards). First
//!    match wins.
//! 2. **Dispatch**: the matched route's handler chain runs. Each handler's
//!    `input` template projects the current request args into call arguments,
//!    the handler is invoked (a registered local function or a remote action
//!    through [`dispatcher::ActionClient`]), and its `output` template projects
//!    the result. A result that classifies as a terminal HTTP response stops
//!    the chain; anything else is merged forward into the next handler's args.
//! 3. **Resource resolution**: when no explicit route terminates, the current
//!    [`config::Space`]'s mounted assets are consulted: `static` assets serve
//!    files (traversal-safe), `view` assets match convention-derived routes
//!    against scanned template files and render through a [`views::ViewEngine`].
//!    A REST resource router can expose the space's data assets as
//!    `/:asset` / `/:asset/:id` mapped onto backend actions.
//! 4. **Response**: the [`response`] module interprets whatever an action
//!    returned (`status`, `body`, `headers`, `cookies`) into an
//!    [`response::HttpResponse`] description for the transport to write.
//!
//! The HTTP server itself, body/query/cookie parsing, and the action RPC
//! transport are deliberately out of scope: the transport hands in a parsed
//! [`app::Request`] and receives an [`response::HttpResponse`] back.
//!
//! ## Modules
//!
//! - [`router`] - path-template matching and route tables
//! - [`template`] - dotted-path projection between args and results
//! - [`response`] - terminal-response classification and materialization
//! - [`dispatcher`] - handler chain execution over the action backend
//! - [`assets`] - static file and view template resolution per space
//! - [`views`] - view-engine seam with a MiniJinja default
//! - [`api`] - REST resource router over the action mapping table
//! - [`config`] - route/space/mapping configuration structures
//! - [`app`] - pipeline composition, error boundary, hot reload
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use switchboard::{App, AppConfig};
//!
//! let config: AppConfig = serde_yaml::from_str(CONFIG_YAML)?;
//! let app = App::builder(config, client).build();
//! let response = app.handle(&request);
//! ```

pub mod api;
pub mod app;
pub mod assets;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fs_path;
pub mod response;
pub mod router;
pub mod template;
pub mod views;

pub use app::{App, AppBuilder, Request};
pub use config::{AppConfig, Asset, AssetType, HandlerSpec, RouteDef, Space};
pub use dispatcher::{ActionClient, Dispatcher};
pub use error::CallError;
pub use response::{classify, materialize, Body, CookieSpec, HttpResponse};
pub use router::{RouteHit, RouteTable};
pub use template::{merge_left, project, Template};
