use ilm_core::{ClusterState, IndexMetadata, StepKey};
use ilm_store::ClusterStateObserver;
use tracing::{debug, info};

use crate::{AsyncActionStep, StepError, StepListener};

/// Where an index's lifecycle stands after one step execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepTransition {
    /// The step completed; move to its next key.
    Advance(StepKey),
    /// The step reported it is not complete yet; stay put.
    Stay(StepKey),
}

/// Run one asynchronous step to completion and map the outcome to a transition.
///
/// Failures are returned as-is; whether to halt, retry or surface them is
/// the caller's decision.
pub async fn run_async_step(
    step: &dyn AsyncActionStep,
    index_metadata: &IndexMetadata,
    cluster_state: &ClusterState,
    observer: Option<&ClusterStateObserver>,
) -> Result<StepTransition, StepError> {
    let (listener, rx) = StepListener::channel();
    step.perform_action(index_metadata, cluster_state, observer, listener);
    match rx.await {
        Ok(Ok(true)) => {
            info!(index = %index_metadata.name(), from = %step.key(), to = %step.next_key(), "step complete");
            Ok(StepTransition::Advance(step.next_key().clone()))
        }
        Ok(Ok(false)) => {
            debug!(index = %index_metadata.name(), step = %step.key(), "step not complete yet");
            Ok(StepTransition::Stay(step.key().clone()))
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(StepError::ListenerDropped),
    }
}
