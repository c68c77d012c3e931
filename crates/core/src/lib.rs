//! ILM core types: step keys, index metadata and cluster state snapshots.
//!
//! Everything here is an immutable value object. Snapshots are built once,
//! wrapped in `Arc` by the publisher and read concurrently by steps.

#![forbid(unsafe_code)]

mod cluster_state;
mod data_stream;
mod execution_state;
mod index;
mod step_key;

pub use cluster_state::{ClusterState, ClusterStateBuilder, Metadata};
pub use data_stream::DataStream;
pub use execution_state::LifecycleExecutionState;
pub use index::{Index, IndexMetadata, IndexMetadataBuilder};
pub use step_key::StepKey;

/// Setting holding the name of the lifecycle policy attached to an index.
pub const LIFECYCLE_NAME_SETTING: &str = "index.lifecycle.name";

/// Custom metadata key under which the per-index execution state lives.
pub const ILM_CUSTOM_METADATA_KEY: &str = "ilm";

/// Execution-state key for the generated rollup target index name.
pub const ROLLUP_INDEX_NAME_KEY: &str = "rollup_index_name";

/// Errors raised while constructing core value objects.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("step key {field} must be a non-empty string")]
    InvalidStepKey { field: &'static str },
    #[error("invalid index metadata: {0}")]
    InvalidIndex(String),
    #[error("invalid data stream [{name}]: {reason}")]
    InvalidDataStream { name: String, reason: String },
}

pub type CoreResult<T> = Result<T, CoreError>;

pub mod prelude {
    pub use super::{
        ClusterState, CoreError, CoreResult, DataStream, Index, IndexMetadata, LifecycleExecutionState, Metadata, StepKey,
    };
}
