//! Shared test doubles for the action backend.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use switchboard::{ActionClient, CallError};

type ActionFn = Arc<dyn Fn(Value, Option<Value>) -> Result<Value, CallError> + Send + Sync>;

/// Records every call and answers from a fixed set of action functions.
#[derive(Default)]
pub struct MockClient {
    actions: HashMap<String, ActionFn>,
    calls: Mutex<Vec<(String, Value, Option<Value>)>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn action<F>(mut self, address: &str, f: F) -> Self
    where
        F: Fn(Value, Option<Value>) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        self.actions.insert(address.to_string(), Arc::new(f));
        self
    }

    pub fn calls(&self) -> Vec<(String, Value, Option<Value>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn addresses_called(&self) -> Vec<String> {
        self.calls().into_iter().map(|(a, _, _)| a).collect()
    }
}

impl ActionClient for MockClient {
    fn call(&self, address: &str, args: Value, meta: Option<Value>) -> Result<Value, CallError> {
        self.calls
            .lock()
            .unwrap()
            .push((address.to_string(), args.clone(), meta.clone()));
        match self.actions.get(address) {
            Some(f) => f(args, meta),
            None => Err(CallError::internal(format!("unknown action '{address}'"))),
        }
    }
}
