use std::fmt;
use std::sync::Arc;

use ilm_client::{ActionRequest, AdminClient, RollupAction, RollupActionConfig, RollupRequest};
use ilm_core::{ClusterState, IndexMetadata, StepKey};
use ilm_store::ClusterStateObserver;
use metrics::counter;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::{AsyncActionStep, Step, StepError, StepListener};

/// Rolls an index up into the target index recorded in its execution state.
#[derive(Clone)]
pub struct RollupStep {
    key: StepKey,
    next_key: StepKey,
    client: Arc<dyn AdminClient>,
    config: RollupActionConfig,
}

impl RollupStep {
    pub const NAME: &'static str = "rollup";

    pub fn new(key: StepKey, next_key: StepKey, client: Arc<dyn AdminClient>, config: RollupActionConfig) -> Self {
        Self { key, next_key, client, config }
    }

    pub fn client(&self) -> &Arc<dyn AdminClient> { &self.client }
    pub fn config(&self) -> &RollupActionConfig { &self.config }
}

/// The concrete index is always the rollup source, data stream or not.
fn source_index_name<'a>(index_metadata: &'a IndexMetadata, cluster_state: &ClusterState) -> &'a str {
    let index = index_metadata.index();
    if let Some(ds) = cluster_state.metadata().data_stream_for_write_index(index) {
        debug!(index = %index.name(), data_stream = %ds.name(), "index is the write index of a data stream");
    }
    index.name()
}

impl Step for RollupStep {
    fn key(&self) -> &StepKey { &self.key }
    fn next_key(&self) -> &StepKey { &self.next_key }
}

impl AsyncActionStep for RollupStep {
    fn perform_action(
        &self,
        index_metadata: &IndexMetadata,
        cluster_state: &ClusterState,
        _observer: Option<&ClusterStateObserver>,
        listener: StepListener,
    ) {
        let index_name = index_metadata.name();
        let policy_name = index_metadata.lifecycle_policy_name();
        let source_index = source_index_name(index_metadata, cluster_state);

        let execution_state = index_metadata.lifecycle_execution_state();
        let Some(rollup_index) = execution_state.rollup_index_name() else {
            counter!("ilm_rollup_failed", 1u64);
            listener.on_failure(StepError::IllegalState(format!(
                "rollup index name was not generated for policy [{}] and index [{}]",
                policy_name, index_name
            )));
            return;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            listener.on_failure(StepError::NoRuntime(RollupAction::NAME));
            return;
        };

        let request = RollupRequest::new(source_index, rollup_index, self.config.clone());
        let client = Arc::clone(&self.client);
        let span = info_span!("rollup", policy = %policy_name, source = %source_index, rollup = %rollup_index);
        info!(parent: &span, step = %self.key, "dispatching rollup");
        counter!("ilm_rollup_dispatched", 1u64);

        runtime.spawn(
            async move {
                match client.execute(ActionRequest::Rollup(request)).await {
                    Ok(resp) => {
                        if !resp.is_acknowledged() {
                            warn!("rollup response was not acknowledged; completing step anyway");
                        }
                        info!("rollup complete");
                        counter!("ilm_rollup_completed", 1u64);
                        listener.on_response(true);
                    }
                    Err(e) => {
                        warn!(error = %e, "rollup failed");
                        counter!("ilm_rollup_failed", 1u64);
                        listener.on_failure(StepError::Remote(e));
                    }
                }
            }
            .instrument(span),
        );
    }
}

impl PartialEq for RollupStep {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.next_key == other.next_key && self.config == other.config
    }
}

impl fmt::Debug for RollupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollupStep")
            .field("key", &self.key)
            .field("next_key", &self.next_key)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ilm_client::MockClient;
    use ilm_core::{DataStream, ILM_CUSTOM_METADATA_KEY, LIFECYCLE_NAME_SETTING, ROLLUP_INDEX_NAME_KEY};
    use std::collections::BTreeMap;

    fn index_with_target(name: &str) -> IndexMetadata {
        IndexMetadata::builder(name)
            .setting(LIFECYCLE_NAME_SETTING, "p1")
            .put_custom(ILM_CUSTOM_METADATA_KEY, BTreeMap::from([(ROLLUP_INDEX_NAME_KEY.to_string(), "rollup-x".to_string())]))
            .build()
            .unwrap()
    }

    #[test]
    fn source_is_backing_index_not_stream_name() {
        let backing = DataStream::default_backing_index_name("metrics", 3);
        let im = index_with_target(&backing);
        let state = ClusterState::builder()
            .put_data_stream(DataStream::new("metrics", "@timestamp", vec![im.index().clone()]).unwrap())
            .put_index(im.clone())
            .build();
        assert_eq!(source_index_name(&im, &state), backing);
        assert_eq!(source_index_name(&im, &ClusterState::empty()), backing);
    }

    #[test]
    fn fails_without_runtime_and_dispatches_nothing() {
        let client = Arc::new(MockClient::acknowledging());
        let key = StepKey::new("warm", "rollup", RollupStep::NAME).unwrap();
        let next = key.with_name("complete").unwrap();
        let step = RollupStep::new(key, next, client.clone(), RollupActionConfig::fixed("@timestamp", "1h"));

        let outcome = Arc::new(std::sync::Mutex::new(None));
        let sink = Arc::clone(&outcome);
        step.perform_action(
            &index_with_target("idx1"),
            &ClusterState::empty(),
            None,
            StepListener::from_fn(move |r| *sink.lock().unwrap() = Some(r)),
        );
        assert_eq!(*outcome.lock().unwrap(), Some(Err(StepError::NoRuntime(RollupAction::NAME))));
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn debug_omits_client() {
        let key = StepKey::new("warm", "rollup", RollupStep::NAME).unwrap();
        let step = RollupStep::new(key.clone(), key, Arc::new(MockClient::acknowledging()), RollupActionConfig::fixed("@timestamp", "1h"));
        let s = format!("{:?}", step);
        assert!(s.starts_with("RollupStep"));
        assert!(!s.contains("client"));
    }
}
