//! # Router Module
//!
//! Path-template matching and route tables.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Compiling route definitions (`/pets/:id`, trailing `*rest` wildcards)
//!   into anchored regex matchers at table construction
//! - Matching incoming method/path pairs against the table in order
//!   (first match wins; ordering is caller-controlled and significant)
//! - Extracting and URL-decoding path parameters, overlaying the route's
//!   static `params` on top (static values win)
//!
//! ## Two phases
//!
//! 1. **Compilation**: at startup, each `RouteDef` path template is converted
//!    into a regex and an ordered parameter-name list.
//! 2. **Matching**: per request, the table is scanned in definition order;
//!    a route is skipped when its method selector rejects the request method
//!    or its pattern does not match the path.

mod core;

pub use self::core::{PathTemplate, RouteHit, RouteTable};
