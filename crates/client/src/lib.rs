//! ILM client: administrative actions dispatched against the cluster.
//!
//! Transport is out of scope here; this crate fixes the contract a step
//! dispatches through (`AdminClient`) plus the rollup action payloads.

#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

mod mock;
mod rollup;

pub use mock::{MockClient, Reply};
pub use rollup::{
    DateHistogramGroup, HistogramGroup, MetricConfig, RollupAction, RollupActionConfig, RollupGroups, RollupRequest,
    TermsGroup,
};

/// Errors surfaced by an administrative call. Steps hand these to their
/// listener unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ClientError {
    #[error("[{action}] rejected: {reason}")]
    Rejected { action: String, reason: String },
    #[error("transport: {0}")]
    Transport(String),
    #[error("unsupported action: {0}")]
    Unsupported(String),
    #[error("validation: {0}")]
    Validation(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

/// Plain acknowledgement returned by master-level administrative actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcknowledgedResponse {
    pub acknowledged: bool,
}

impl AcknowledgedResponse {
    pub fn of(acknowledged: bool) -> Self { Self { acknowledged } }
}

/// Requests an `AdminClient` knows how to execute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ActionRequest {
    Rollup(RollupRequest),
}

impl ActionRequest {
    pub fn action_name(&self) -> &'static str {
        match self {
            ActionRequest::Rollup(_) => RollupAction::NAME,
        }
    }

    pub fn validate(&self) -> ClientResult<()> {
        match self {
            ActionRequest::Rollup(r) => r.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionResponse {
    Acknowledged(AcknowledgedResponse),
}

impl ActionResponse {
    pub fn is_acknowledged(&self) -> bool {
        match self {
            ActionResponse::Acknowledged(r) => r.acknowledged,
        }
    }
}

/// Shared, thread-safe dispatch handle. One call per request; callers may
/// run many calls concurrently.
#[async_trait::async_trait]
pub trait AdminClient: Send + Sync {
    async fn execute(&self, request: ActionRequest) -> ClientResult<ActionResponse>;
}
