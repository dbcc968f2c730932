#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::StatusCode;
use serpapi_client::{HttpRequest, HttpResponse, Params, Transport, TransportError};
use serpapi_common::observability::{LogSettings, init_logging};
use tokio_util::sync::CancellationToken;

/// Debug-level events to stderr and a temp-dir log file. `RUST_LOG` still wins.
pub fn init_test_tracing() {
    let settings = LogSettings {
        filter: "debug".into(),
        stderr: true,
        dir: Some(std::env::temp_dir().join("serpapi-tests").display().to_string()),
        ..LogSettings::default()
    };
    let _ = init_logging("serpapi-tests", &settings);
}

/// Scripted transport: replays queued outcomes and records every request.
#[derive(Default)]
pub struct FakeTransport {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    seen: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, status: u16, body: &str) -> Self {
        let status = StatusCode::from_u16(status).unwrap();
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body.to_string())));
        self
    }

    pub fn fail(self, err: TransportError) -> Self {
        self.replies.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn execute(
        &self,
        request: HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, TransportError> {
        self.seen.lock().unwrap().push(request);
        if cancel.is_cancelled() {
            return Err(TransportError::Cancelled);
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("no scripted reply".into())))
    }
}

pub fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn query_of(req: &HttpRequest) -> Params {
    req.url.query_pairs().into_owned().collect()
}
