//! In-memory transport for exercising discovery without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;

use super::Transport;
use crate::error::TransportError;

type Reply = Result<String, StatusCode>;

/// Serves fixed bodies per URL. Unknown URLs answer 404. Scripted replies
/// are consumed first, one per attempt.
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, Reply>,
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, body: &str) -> Self {
        self.routes.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn fail(mut self, url: &str, status: StatusCode) -> Self {
        self.routes.insert(url.to_string(), Err(status));
        self
    }

    pub fn script(self, url: &str, replies: Vec<Result<&str, StatusCode>>) -> Self {
        let replies = replies
            .into_iter()
            .map(|r| r.map(str::to_string))
            .collect();
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn attempts(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == url).count()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> Result<String, TransportError> {
        self.calls.lock().unwrap().push(url.to_string());

        let scripted = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(VecDeque::pop_front);

        let reply = scripted
            .or_else(|| self.routes.get(url).cloned())
            .unwrap_or(Err(StatusCode::NOT_FOUND));

        reply.map_err(TransportError::Status)
    }
}
