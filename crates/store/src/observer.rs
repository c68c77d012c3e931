use std::sync::Arc;
use std::time::Duration;

use ilm_core::ClusterState;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::StateHandle;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ObserverError {
    #[error("timed out after {0:?} waiting for a cluster state change")]
    TimedOut(Duration),
    #[error("cluster state publisher closed")]
    Closed,
}

/// Master-timeout bookkeeping handle threaded through step execution.
///
/// The clock starts at construction. Steps receive it for the driver's
/// benefit; nothing cancels an action already dispatched.
pub struct ClusterStateObserver {
    handle: StateHandle,
    rx: watch::Receiver<u64>,
    timeout: Duration,
    started: Instant,
    observed_version: u64,
}

impl ClusterStateObserver {
    pub fn new(handle: &StateHandle, timeout: Duration) -> Self {
        let mut rx = handle.subscribe_version();
        let observed_version = *rx.borrow_and_update();
        Self { handle: handle.clone(), rx, timeout, started: Instant::now(), observed_version }
    }

    /// Observer using `ILM_MASTER_TIMEOUT_SECS` (default 30s).
    pub fn with_default_timeout(handle: &StateHandle) -> Self {
        Self::new(handle, crate::master_timeout())
    }

    pub fn timeout(&self) -> Duration { self.timeout }
    pub fn observed_version(&self) -> u64 { self.observed_version }
    pub fn is_timed_out(&self) -> bool { self.started.elapsed() >= self.timeout }

    pub fn observed_state(&self) -> Arc<ClusterState> { self.handle.current() }

    /// Wait for a version newer than the last one observed, within the remaining timeout.
    pub async fn wait_for_next_change(&mut self) -> Result<Arc<ClusterState>, ObserverError> {
        let remaining = self
            .timeout
            .checked_sub(self.started.elapsed())
            .filter(|d| !d.is_zero())
            .ok_or(ObserverError::TimedOut(self.timeout))?;
        match tokio::time::timeout(remaining, self.rx.changed()).await {
            Err(_) => Err(ObserverError::TimedOut(self.timeout)),
            Ok(Err(_)) => Err(ObserverError::Closed),
            Ok(Ok(())) => {
                self.observed_version = *self.rx.borrow_and_update();
                Ok(self.handle.current())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{spawn_applier, MetadataUpdate};
    use ilm_core::IndexMetadata;

    #[tokio::test]
    async fn sees_next_published_version() {
        let (tx, handle) = spawn_applier(16);
        let mut obs = ClusterStateObserver::new(&handle, Duration::from_secs(5));
        assert_eq!(obs.observed_version(), 0);

        tx.send(MetadataUpdate::PutIndex(IndexMetadata::builder("idx1").build().unwrap())).await.unwrap();
        let state = obs.wait_for_next_change().await.expect("change");
        assert_eq!(obs.observed_version(), 1);
        assert!(state.metadata().index("idx1").is_some());
        assert!(!obs.is_timed_out());
    }

    #[tokio::test]
    async fn times_out_without_changes() {
        let (_tx, handle) = spawn_applier(16);
        let mut obs = ClusterStateObserver::new(&handle, Duration::from_millis(30));
        let err = obs.wait_for_next_change().await.unwrap_err();
        assert_eq!(err, ObserverError::TimedOut(Duration::from_millis(30)));
        assert!(obs.is_timed_out());
    }

    #[tokio::test]
    async fn reports_closed_publisher() {
        let (tx, handle) = spawn_applier(16);
        let mut obs = ClusterStateObserver::new(&handle, Duration::from_secs(5));
        drop(tx);
        let err = obs.wait_for_next_change().await.unwrap_err();
        assert_eq!(err, ObserverError::Closed);
    }
}
