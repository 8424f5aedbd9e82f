#![allow(dead_code)]

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Method;
use serde_json::Value;
use sha2::Sha256;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use unifex::core::auth::AuthenticatedPayload;
use unifex::core::kernel::RestClient;
use unifex::ExchangeError;

pub const API_KEY: &str = "test-api-key";
pub const SECRET_KEY: &str = "test-secret-key";

/// One request as it reached the transport.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub base_url: String,
    pub path: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub wire: String,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

enum Reply {
    Json(Value),
    Transport(String),
}

#[derive(Default)]
struct Script {
    replies: HashMap<String, VecDeque<Reply>>,
    calls: Vec<Call>,
}

/// In-memory transport: answers from per-path scripts and records every call.
/// Unscripted paths fail with a transport error.
#[derive(Clone, Default)]
pub struct RecordingRest {
    script: Arc<Mutex<Script>>,
}

impl RecordingRest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, path: &str, body: Value) -> &Self {
        self.push(path, Reply::Json(body));
        self
    }

    pub fn fail(&self, path: &str, message: &str) -> &Self {
        self.push(path, Reply::Transport(message.to_string()));
        self
    }

    fn push(&self, path: &str, reply: Reply) {
        self.script
            .lock()
            .unwrap()
            .replies
            .entry(path.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.script.lock().unwrap().calls.clone()
    }

    pub fn calls_to(&self, path: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.path == path).collect()
    }
}

#[async_trait]
impl RestClient for RecordingRest {
    async fn send(
        &self,
        method: Method,
        base_url: &str,
        path: &str,
        payload: &AuthenticatedPayload,
    ) -> Result<Value, ExchangeError> {
        let mut script = self.script.lock().unwrap();
        script.calls.push(Call {
            method,
            base_url: base_url.to_string(),
            path: path.to_string(),
            params: payload
                .params()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            headers: payload.headers().to_vec(),
            wire: payload.wire().to_string(),
        });
        match script.replies.get_mut(path).and_then(VecDeque::pop_front) {
            Some(Reply::Json(body)) => Ok(body),
            Some(Reply::Transport(message)) => Err(ExchangeError::TransportError(message)),
            None => Err(ExchangeError::TransportError(format!(
                "connection refused: {}",
                path
            ))),
        }
    }
}

pub fn hmac_hex(message: &str) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SECRET_KEY.as_bytes()).unwrap();
    mac.update(message.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}
