use std::sync::Mutex;
use std::time::Duration;

use tracing::debug;

use crate::{AcknowledgedResponse, ActionRequest, ActionResponse, AdminClient, ClientError, ClientResult};

/// How a `MockClient` answers each call.
#[derive(Debug, Clone)]
pub enum Reply {
    Ack(bool),
    Fail(ClientError),
}

/// In-memory client for tests and simulations: records every request and
/// answers with the configured reply, optionally after a delay so the
/// answer lands on a later task. Malformed requests are rejected with
/// `ClientError::Validation` before the reply is consulted.
pub struct MockClient {
    reply: Mutex<Reply>,
    delay: Option<Duration>,
    requests: Mutex<Vec<ActionRequest>>,
}

impl MockClient {
    pub fn acknowledging() -> Self { Self::replying(Reply::Ack(true)) }

    pub fn replying(reply: Reply) -> Self {
        Self { reply: Mutex::new(reply), delay: None, requests: Mutex::new(Vec::new()) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_reply(&self, reply: Reply) {
        *self.reply.lock().unwrap_or_else(|e| e.into_inner()) = reply;
    }

    /// Requests received so far, in arrival order.
    pub fn requests(&self) -> Vec<ActionRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Default for MockClient {
    fn default() -> Self { Self::acknowledging() }
}

#[async_trait::async_trait]
impl AdminClient for MockClient {
    async fn execute(&self, request: ActionRequest) -> ClientResult<ActionResponse> {
        debug!(action = request.action_name(), "mock client received request");
        let checked = request.validate();
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).push(request);
        checked?;
        if let Some(d) = self.delay {
            tokio::time::sleep(d).await;
        }
        let reply = self.reply.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match reply {
            Reply::Ack(ack) => Ok(ActionResponse::Acknowledged(AcknowledgedResponse::of(ack))),
            Reply::Fail(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RollupActionConfig, RollupRequest};

    fn req(src: &str) -> ActionRequest {
        ActionRequest::Rollup(RollupRequest::new(src, format!("rollup-{}", src), RollupActionConfig::fixed("@timestamp", "1h")))
    }

    #[tokio::test]
    async fn records_requests_and_acknowledges() {
        let c = MockClient::acknowledging();
        let resp = c.execute(req("idx1")).await.unwrap();
        assert!(resp.is_acknowledged());
        assert_eq!(c.requests(), vec![req("idx1")]);
    }

    #[tokio::test]
    async fn fails_with_configured_error() {
        let c = MockClient::acknowledging();
        let err = ClientError::Transport("connection reset".into());
        c.set_reply(Reply::Fail(err.clone()));
        assert_eq!(c.execute(req("idx1")).await.unwrap_err(), err);
        assert_eq!(c.call_count(), 1);
    }

    #[tokio::test]
    async fn rejects_malformed_request_before_replying() {
        let c = MockClient::acknowledging();
        let same = ActionRequest::Rollup(RollupRequest::new("idx1", "idx1", RollupActionConfig::fixed("@timestamp", "1h")));
        assert!(matches!(c.execute(same).await, Err(ClientError::Validation(_))));

        let bad_metric = RollupActionConfig::fixed("@timestamp", "1h").with_metric("bytes", &["median"]);
        let err = c.execute(ActionRequest::Rollup(RollupRequest::new("idx1", "rollup-idx1", bad_metric))).await.unwrap_err();
        assert_eq!(err, ClientError::Validation("unsupported metric [median] on field [bytes]".into()));
        assert_eq!(c.call_count(), 2);
    }

    #[tokio::test]
    async fn concurrent_calls_are_all_recorded() {
        let c = MockClient::acknowledging().with_delay(Duration::from_millis(5));
        let calls = (0..8).map(|i| c.execute(req(&format!("idx{}", i))));
        let results = futures::future::join_all(calls).await;
        assert!(results.iter().all(|r| r.as_ref().map(|r| r.is_acknowledged()).unwrap_or(false)));
        assert_eq!(c.call_count(), 8);
    }
}
