//! Static and view resource resolution over a space's mounted assets.
//!
//! Both modes share the same mount-prefix matching and traversal guard and
//! walk `space.assets` in array order; the first usable asset wins. A path
//! that would escape an asset's root is treated as "not found", never as an
//! error, so probing requests learn nothing about the filesystem.
//!
//! Static mode maps the mount-relative path straight onto the asset's
//! directory (directories fall back to their `index.html`) and answers with a
//! streamed file body. View mode scans the asset root for template files,
//! derives a synthetic route per file by naming convention (`index` maps to
//! its directory, `_seg` becomes a `:seg` parameter, dot- and
//! double-underscore-prefixed names are excluded), matches the request
//! against that table, and delegates rendering to the configured
//! [`ViewEngine`].

use crate::config::{AssetType, RouteDef, Space};
use crate::error::CallError;
use crate::fs_path::secure_join;
use crate::response::{Body, HttpResponse};
use crate::router::RouteTable;
use crate::views::ViewEngine;
use http::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Content type derived from the resolved file extension.
fn content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
        .as_str()
    {
        "html" => "text/html",
        "css" => "text/css",
        "js" => "application/javascript",
        "json" => "application/json",
        "txt" => "text/plain",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "pdf" => "application/pdf",
        _ => "application/octet-stream",
    }
}

/// Whether a mount-relative path starts by climbing out of the mount.
/// Such requests skip the asset entirely instead of being clamped back in.
fn escapes_mount(relative: &str) -> bool {
    relative.split('/').next() == Some("..")
}

/// Request path relative to a mount prefix, at segment granularity.
/// `None` means the request is outside the mount (would need `..` to reach).
fn mount_relative<'a>(mount: &str, path: &'a str) -> Option<&'a str> {
    let mount = mount.trim_end_matches('/');
    if mount.is_empty() {
        return Some(path.trim_start_matches('/'));
    }
    let rest = path.strip_prefix(mount)?;
    match rest.as_bytes().first() {
        None => Some(""),
        Some(b'/') => Some(&rest[1..]),
        Some(_) => None,
    }
}

/// Resolve a request path against the space's `static` assets.
///
/// Returns a streamed-file response description, or `None` to fall through.
pub fn resolve_static(space: &Space, path: &str) -> Option<HttpResponse> {
    for asset in &space.assets {
        if asset.kind != AssetType::Static {
            continue;
        }
        let Some(mount) = asset.mount.as_deref() else {
            continue;
        };
        let Some(relative) = mount_relative(mount, path) else {
            continue;
        };
        if escapes_mount(relative) {
            continue;
        }

        let mut entry = secure_join(&space.storage, &[&asset.name, relative]);
        let Ok(meta) = fs::metadata(&entry) else {
            continue;
        };
        if meta.is_dir() {
            entry.push("index.html");
            if !entry.is_file() {
                continue;
            }
        }

        debug!(asset = %asset.name, entry = %entry.display(), "static asset resolved");
        let mut response = HttpResponse::new(200, Body::File(entry.clone()));
        response
            .headers
            .push(("Content-Type".to_string(), content_type(&entry).to_string()));
        return Some(response);
    }
    None
}

/// Recursively enumerate files under `root`, returning `/`-joined paths
/// relative to it. Unreadable directories are skipped.
fn deep_scan(root: &Path) -> Vec<String> {
    let mut files = Vec::new();
    let mut stack = vec![PathBuf::new()];
    while let Some(dir) = stack.pop() {
        let Ok(entries) = fs::read_dir(root.join(&dir)) else {
            warn!(dir = %root.join(&dir).display(), "unreadable directory during view scan");
            continue;
        };
        let mut entries: Vec<_> = entries.flatten().collect();
        entries.sort_by_key(|e| e.file_name());
        for entry in entries {
            let rel = dir.join(entry.file_name());
            match entry.file_type() {
                Ok(t) if t.is_dir() => stack.push(rel),
                Ok(t) if t.is_file() => {
                    if let Some(s) = rel.to_str() {
                        files.push(s.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    files.sort();
    files
}

/// Whether any path segment (file stem for the last one) is hidden from
/// route synthesis: names starting with `.` or `__`.
fn is_excluded(relative: &str) -> bool {
    let mut segments = relative.split('/').peekable();
    while let Some(segment) = segments.next() {
        let name = if segments.peek().is_none() {
            segment.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(segment)
        } else {
            segment
        };
        if name.starts_with('.') || name.starts_with("__") {
            return true;
        }
    }
    false
}

/// Derive the synthetic route path for a scanned template file.
/// `dir/index.ext` → `/dir`; `dir/page.ext` → `/dir/page`; a segment
/// starting with `_` becomes a `:` route parameter.
fn view_route_path(relative: &str) -> String {
    let (dir, file) = match relative.rsplit_once('/') {
        Some((dir, file)) => (dir, file),
        None => ("", relative),
    };
    let stem = file.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(file);

    let mut route = String::from("/");
    let segments = dir
        .split('/')
        .filter(|s| !s.is_empty())
        .chain((stem != "index").then_some(stem));
    for segment in segments {
        if route.len() > 1 {
            route.push('/');
        }
        match segment.strip_prefix('_') {
            Some(param) => {
                route.push(':');
                route.push_str(param);
            }
            None => route.push_str(segment),
        }
    }
    route
}

/// Resolve a request against the space's `view` assets, rendering the matched
/// template through `engine`. `args` become the render locals, with the
/// matched route params overlaid under `params`.
///
/// Engine failures propagate as call errors; no match returns `Ok(None)`.
pub fn resolve_view(
    space: &Space,
    method: &Method,
    path: &str,
    engine: &dyn ViewEngine,
    args: &Value,
) -> Result<Option<HttpResponse>, CallError> {
    for asset in &space.assets {
        if asset.kind != AssetType::View {
            continue;
        }
        let Some(mount) = asset.mount.as_deref() else {
            continue;
        };
        let Some(relative) = mount_relative(mount, path) else {
            continue;
        };
        if escapes_mount(relative) {
            continue;
        }

        let root = secure_join(&space.storage, &[&asset.name]);
        if !root.is_dir() {
            continue;
        }

        let scanned: Vec<String> = deep_scan(&root)
            .into_iter()
            .filter(|f| f.ends_with(engine.extension()))
            .collect();

        let mut routes = Vec::new();
        let mut entries = Vec::new();
        for file in &scanned {
            if is_excluded(file) {
                continue;
            }
            routes.push(RouteDef::any(view_route_path(file)));
            entries.push(file.clone());
        }

        let table = RouteTable::compile(routes);
        let Some(hit) = table.match_route(method, &format!("/{relative}")) else {
            continue;
        };
        let entry = &entries[hit.index];

        // The engine receives every scanned file (partials included), keyed
        // by asset-relative path.
        let mut files = BTreeMap::new();
        for file in &scanned {
            let content = fs::read_to_string(root.join(file))
                .map_err(|e| CallError::internal(format!("read view '{file}': {e}")))?;
            files.insert(file.clone(), content);
        }

        let mut locals = args.clone();
        if let Value::Object(map) = &mut locals {
            map.insert(
                "params".to_string(),
                serde_json::to_value(&hit.params).unwrap_or(Value::Null),
            );
        }

        debug!(asset = %asset.name, entry = %entry, "view asset resolved");
        let rendered = engine.render(entry, &files, &locals)?;

        let mut response = HttpResponse::new(200, Body::Text(rendered));
        response
            .headers
            .push(("Content-Type".to_string(), "text/html".to_string()));
        return Ok(Some(response));
    }
    Ok(None)
}
