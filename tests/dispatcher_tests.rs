//! Handler chain executor tests: routing + dispatch + chain threading.

mod common;

use common::MockClient;
use http::Method;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use switchboard::config::{HandlerSpec, RouteDef, RouteMethod};
use switchboard::dispatcher::{Dispatcher, LocalHandler};
use switchboard::{Body, CallError};

fn template(value: Value) -> switchboard::Template {
    value.as_object().unwrap().clone()
}

fn compile(routes: Vec<RouteDef>, client: MockClient) -> (Dispatcher, Arc<MockClient>) {
    let client = Arc::new(client);
    let dispatcher = Dispatcher::compile(routes, &HashMap::new(), client.clone());
    (dispatcher, client)
}

#[test]
fn test_remote_handler_terminal_response() {
    let client = MockClient::new().action("demo.home", |_, _| {
        Ok(json!({
            "status": 200,
            "body": "ok",
            "headers": [["Content-Type", "text/plain"]]
        }))
    });
    let (dispatcher, _) = compile(
        vec![RouteDef::new(RouteMethod::Get, "/", "demo.home")],
        client,
    );

    let response = dispatcher
        .dispatch(&Method::GET, "/", &json!({}))
        .unwrap()
        .expect("terminal response");
    assert_eq!(response.status, 200);
    assert_eq!(response.body, Body::Text("ok".to_string()));
    assert_eq!(response.header("content-type"), Some("text/plain"));
}

#[test]
fn test_no_route_means_fallthrough_without_invocation() {
    let client = MockClient::new();
    let (dispatcher, client) = compile(
        vec![RouteDef::new(RouteMethod::Get, "/known", "demo.known")],
        client,
    );

    let outcome = dispatcher
        .dispatch(&Method::GET, "/unknown", &json!({}))
        .unwrap();
    assert!(outcome.is_none());
    assert!(client.calls().is_empty());
}

#[test]
fn test_matched_params_reach_the_handler() {
    let client = MockClient::new().action("pets.get", |args, _| {
        let id = args["params"]["id"].as_str().unwrap_or("").to_string();
        Ok(json!({ "body": id }))
    });
    let (dispatcher, _) = compile(
        vec![RouteDef::new(RouteMethod::Get, "/pets/:id", "pets.get")],
        client,
    );

    let response = dispatcher
        .dispatch(&Method::GET, "/pets/42", &json!({ "form": {} }))
        .unwrap()
        .unwrap();
    assert_eq!(response.body, Body::Text("42".to_string()));
}

#[test]
fn test_chained_handlers_thread_output_into_input() {
    // Handler 1 projects its result under `auth`; handler 2 consumes `_.auth`
    // and terminates.
    let client = MockClient::new()
        .action("auth.check", |_, _| Ok(json!({ "user": "alice" })))
        .action("demo.profile", |args, _| {
            Ok(json!({ "status": 200, "body": args["who"]["user"] }))
        });

    let mut route = RouteDef::any("/me");
    route.handlers = vec![
        HandlerSpec {
            name: "auth.check".to_string(),
            input: None,
            output: Some(template(json!({ "auth": "_" }))),
        },
        HandlerSpec {
            name: "demo.profile".to_string(),
            input: Some(template(json!({ "who": "_.auth" }))),
            output: None,
        },
    ];

    let (dispatcher, client) = compile(vec![route], client);
    let response = dispatcher
        .dispatch(&Method::GET, "/me", &json!({}))
        .unwrap()
        .unwrap();
    assert_eq!(response.body, Body::Text("alice".to_string()));

    let calls = client.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].1, json!({ "who": { "user": "alice" } }));
}

#[test]
fn test_terminal_response_stops_the_chain() {
    let client = MockClient::new().action("first.stop", |_, _| {
        Ok(json!({ "status": 204 }))
    });

    let mut route = RouteDef::any("/stop");
    route.handlers = vec![
        HandlerSpec {
            name: "first.stop".to_string(),
            input: None,
            output: None,
        },
        HandlerSpec {
            name: "never.called".to_string(),
            input: None,
            output: None,
        },
    ];

    let (dispatcher, client) = compile(vec![route], client);
    let response = dispatcher
        .dispatch(&Method::GET, "/stop", &json!({}))
        .unwrap()
        .unwrap();
    assert_eq!(response.status, 204);
    assert_eq!(client.addresses_called(), vec!["first.stop".to_string()]);
}

#[test]
fn test_merge_forward_keeps_existing_args() {
    // A non-terminal output must not clobber request args on conflict.
    let client = MockClient::new()
        .action("enrich", |_, _| Ok(json!({ "form": { "x": "clobbered" }, "extra": 1 })))
        .action("echo.form", |args, _| {
            Ok(json!({ "status": 200, "body": args }))
        });

    let mut route = RouteDef::any("/submit");
    route.handlers = vec![
        HandlerSpec {
            name: "enrich".to_string(),
            input: None,
            output: None,
        },
        HandlerSpec {
            name: "echo.form".to_string(),
            input: Some(template(json!({ "form": "_.form", "extra": "_.extra" }))),
            output: None,
        },
    ];

    let (dispatcher, _) = compile(vec![route], client);
    let response = dispatcher
        .dispatch(
            &Method::POST,
            "/submit",
            &json!({ "form": { "x": "original" } }),
        )
        .unwrap()
        .unwrap();
    match response.body {
        Body::Json(body) => {
            assert_eq!(body["form"], json!({ "x": "original" }));
            assert_eq!(body["extra"], json!(1));
        }
        other => panic!("expected json body, got {other:?}"),
    }
}

#[test]
fn test_exhausted_chain_falls_through() {
    let client = MockClient::new().action("noop", |_, _| Ok(json!({ "note": "nothing" })));
    let (dispatcher, _) = compile(
        vec![RouteDef::new(RouteMethod::Get, "/noop", "noop")],
        client,
    );
    let outcome = dispatcher
        .dispatch(&Method::GET, "/noop", &json!({}))
        .unwrap();
    assert!(outcome.is_none());
}

#[test]
fn test_call_errors_propagate_and_abort() {
    let client = MockClient::new().action("boom", |_, _| {
        Err(CallError::with_status(400, "bad input"))
    });

    let mut route = RouteDef::any("/boom");
    route.handlers = vec![
        HandlerSpec {
            name: "boom".to_string(),
            input: None,
            output: None,
        },
        HandlerSpec {
            name: "never.called".to_string(),
            input: None,
            output: None,
        },
    ];

    let (dispatcher, client) = compile(vec![route], client);
    let err = dispatcher
        .dispatch(&Method::GET, "/boom", &json!({}))
        .unwrap_err();
    assert_eq!(err.status, Some(400));
    assert_eq!(client.addresses_called(), vec!["boom".to_string()]);
}

#[test]
fn test_local_handlers_resolve_before_remote() {
    let mut locals: HashMap<String, LocalHandler> = HashMap::new();
    locals.insert(
        "local.hello".to_string(),
        Arc::new(|_| Ok(json!({ "status": 200, "body": "local" }))),
    );
    let client = Arc::new(MockClient::new());
    let dispatcher = Dispatcher::compile(
        vec![RouteDef::new(RouteMethod::Get, "/hello", "local.hello")],
        &locals,
        client.clone(),
    );

    let response = dispatcher
        .dispatch(&Method::GET, "/hello", &json!({}))
        .unwrap()
        .unwrap();
    assert_eq!(response.body, Body::Text("local".to_string()));
    assert!(client.calls().is_empty());
}
