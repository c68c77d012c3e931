use std::fmt;

use ilm_core::{ClusterState, IndexMetadata, StepKey};
use ilm_store::ClusterStateObserver;

use crate::StepListener;

/// A position in a lifecycle policy and where it leads.
pub trait Step: Send + Sync + fmt::Debug {
    fn key(&self) -> &StepKey;
    fn next_key(&self) -> &StepKey;
}

/// A step that performs one non-blocking administrative action.
pub trait AsyncActionStep: Step {
    /// Trigger at most one action for `index_metadata` and complete
    /// `listener` exactly once, either before returning or later from a
    /// runtime task. Expected failures go to `listener.on_failure`; this
    /// method does not panic for them.
    ///
    /// The snapshots are only borrowed for the duration of the call.
    fn perform_action(
        &self,
        index_metadata: &IndexMetadata,
        cluster_state: &ClusterState,
        observer: Option<&ClusterStateObserver>,
        listener: StepListener,
    );

    /// Whether the driver may re-run this step after the cluster state
    /// changed while it was in flight.
    fn is_certain(&self) -> bool {
        false
    }
}
