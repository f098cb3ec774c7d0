//! Terminal-response classification and materialization.
//!
//! An action result is an opaque JSON object. [`classify`] decides whether it
//! is a *terminal* HTTP response (and with which status), while
//! [`materialize`] turns a terminal result into an [`HttpResponse`]
//! description for the transport to write. A non-terminal result returns
//! `None` with no side effect: the caller continues the handler chain or
//! falls through.
//!
//! Classification precedence:
//! 1. a `location` header entry → `status` or 307
//! 2. a body with no `status` → 200
//! 3. otherwise `status` itself (absent → not a response)

use serde_json::{Map, Value};
use std::path::PathBuf;

/// Response body description. `File` bodies are streamed by the transport,
/// never serialized here.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Empty,
    Text(String),
    Json(Value),
    File(PathBuf),
}

impl Body {
    /// Test/inspection helper: the body as text, JSON rendered compactly.
    pub fn as_text(&self) -> String {
        match self {
            Body::Empty => String::new(),
            Body::Text(s) => s.clone(),
            Body::Json(v) => v.to_string(),
            Body::File(p) => p.display().to_string(),
        }
    }
}

/// Cookie value: a bare string, or a value with set-options
/// (`signed`, `expires`, ...).
#[derive(Debug, Clone, PartialEq)]
pub enum CookieSpec {
    Plain(String),
    WithOptions {
        value: String,
        options: Map<String, Value>,
    },
}

/// The outbound response description consumed by the transport layer.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Body,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, CookieSpec)>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Body) -> Self {
        HttpResponse {
            status,
            body,
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    /// The default fallthrough response.
    pub fn not_found() -> Self {
        HttpResponse::new(404, Body::Text(status_phrase(404)))
    }

    /// Case-insensitive header lookup (first entry wins).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Human-readable phrase for a status code, used as the default body.
pub fn status_phrase(code: u16) -> String {
    http::StatusCode::from_u16(code)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("")
        .to_string()
}

/// Loose presence check mirroring the truthiness the templates produce:
/// absent, `null`, `false`, `0` and `""` all count as missing.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(_) => true,
    }
}

fn status_of(result: &Value) -> Option<u16> {
    let status = result.get("status")?.as_u64()?;
    u16::try_from(status).ok().filter(|s| *s != 0)
}

/// Collect header entries from either an ordered `[key, value]` list or a map.
fn header_entries(headers: Option<&Value>) -> Vec<(String, String)> {
    let mut entries = Vec::new();
    match headers {
        Some(Value::Array(items)) => {
            for item in items {
                if let Some([key, value]) = item.as_array().map(|p| &p[..]) {
                    if let Some(key) = key.as_str() {
                        entries.push((key.to_string(), text_of(value)));
                    }
                }
            }
        }
        Some(Value::Object(map)) => {
            for (key, value) in map {
                entries.push((key.clone(), text_of(value)));
            }
        }
        _ => {}
    }
    entries
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn location_header(result: &Value) -> Option<String> {
    header_entries(result.get("headers"))
        .into_iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("location"))
        .map(|(_, v)| v)
}

/// Decide whether `result` is a terminal HTTP response; returns its status.
pub fn classify(result: &Value) -> Option<u16> {
    if location_header(result).is_some() {
        return Some(status_of(result).unwrap_or(307));
    }
    if is_present(result.get("body")) && status_of(result).is_none() {
        return Some(200);
    }
    status_of(result)
}

/// Recognize the file-handle convention for streamed bodies.
fn file_body(body: &Value) -> Option<PathBuf> {
    let path = body.as_object()?.get("$file")?.as_str()?;
    Some(PathBuf::from(path))
}

/// Materialize a terminal result into a response description. Returns `None`
/// (no side effect) when the result does not classify as a response.
pub fn materialize(result: &Value) -> Option<HttpResponse> {
    let status = classify(result)?;

    // Falsy bodies fall back to the status phrase, same truthiness as
    // classification.
    let body = match result.get("body") {
        Some(body) if is_present(Some(body)) => match file_body(body) {
            Some(path) => Body::File(path),
            None => match body {
                Value::String(s) => Body::Text(s.clone()),
                other => Body::Json(other.clone()),
            },
        },
        _ => {
            let phrase = status_phrase(status);
            if phrase.is_empty() {
                Body::Empty
            } else {
                Body::Text(phrase)
            }
        }
    };

    let mut cookies = Vec::new();
    if let Some(Value::Object(map)) = result.get("cookies") {
        for (name, value) in map {
            let spec = match value {
                Value::String(s) => CookieSpec::Plain(s.clone()),
                Value::Object(obj) if obj.contains_key("value") => {
                    let mut options = obj.clone();
                    let value = options.remove("value").map(|v| text_of(&v));
                    match value {
                        Some(value) => CookieSpec::WithOptions { value, options },
                        None => continue,
                    }
                }
                _ => continue,
            };
            cookies.push((name.clone(), spec));
        }
    }

    Some(HttpResponse {
        status,
        body,
        headers: header_entries(result.get("headers")),
        cookies,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classify_body_without_status() {
        assert_eq!(classify(&json!({ "body": "x" })), Some(200));
    }

    #[test]
    fn test_classify_status_only() {
        assert_eq!(classify(&json!({ "status": 400 })), Some(400));
    }

    #[test]
    fn test_classify_location_defaults_to_307() {
        assert_eq!(classify(&json!({ "headers": { "location": "/y" } })), Some(307));
        assert_eq!(
            classify(&json!({ "status": 301, "headers": { "location": "/y" } })),
            Some(301)
        );
    }

    #[test]
    fn test_classify_empty_is_not_a_response() {
        assert_eq!(classify(&json!({})), None);
        assert_eq!(classify(&json!({ "data": 1 })), None);
    }

    #[test]
    fn test_materialize_default_phrase_body() {
        let resp = materialize(&json!({ "status": 404 })).unwrap();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, Body::Text("Not Found".to_string()));
    }

    #[test]
    fn test_materialize_falsy_body_falls_back_to_phrase() {
        let resp = materialize(&json!({ "status": 200, "body": "" })).unwrap();
        assert_eq!(resp.body, Body::Text("OK".to_string()));

        let resp = materialize(&json!({ "status": 403, "body": false })).unwrap();
        assert_eq!(resp.body, Body::Text("Forbidden".to_string()));

        let resp = materialize(&json!({ "status": 404, "body": 0 })).unwrap();
        assert_eq!(resp.body, Body::Text("Not Found".to_string()));
    }

    #[test]
    fn test_materialize_headers_list_and_map() {
        let resp = materialize(&json!({
            "body": "ok",
            "headers": [["Content-Type", "text/plain"]]
        }))
        .unwrap();
        assert_eq!(resp.header("content-type"), Some("text/plain"));

        let resp = materialize(&json!({
            "body": "ok",
            "headers": { "X-One": "1" }
        }))
        .unwrap();
        assert_eq!(resp.header("x-one"), Some("1"));
    }

    #[test]
    fn test_materialize_cookies() {
        let resp = materialize(&json!({
            "body": "ok",
            "cookies": {
                "plain": "v1",
                "signed": { "value": "v2", "signed": true }
            }
        }))
        .unwrap();

        let get = |name: &str| {
            resp.cookies
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap()
        };
        assert_eq!(get("plain"), CookieSpec::Plain("v1".to_string()));
        match get("signed") {
            CookieSpec::WithOptions { value, options } => {
                assert_eq!(value, "v2");
                assert_eq!(options.get("signed"), Some(&json!(true)));
                assert!(!options.contains_key("value"));
            }
            other => panic!("expected options cookie, got {other:?}"),
        }
    }

    #[test]
    fn test_materialize_file_body() {
        let resp = materialize(&json!({ "body": { "$file": "/tmp/x.txt" } })).unwrap();
        assert_eq!(resp.body, Body::File(PathBuf::from("/tmp/x.txt")));
    }

    #[test]
    fn test_materialize_non_response_has_no_effect() {
        assert!(materialize(&json!({ "auth": { "user": "u" } })).is_none());
    }
}
