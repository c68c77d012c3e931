//! ILM store: applies metadata updates and publishes cluster-state snapshots.
//!
//! Readers get an `Arc<ClusterState>` that never changes under them; each
//! applied batch swaps in a new snapshot and bumps the version.

#![forbid(unsafe_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use ilm_core::{ClusterState, DataStream, IndexMetadata};
use metrics::counter;
use rustc_hash::FxHashMap;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info};

mod observer;

pub use observer::{ClusterStateObserver, ObserverError};

/// Capacity of the update channel feeding the applier loop.
pub fn applier_queue_cap() -> usize {
    std::env::var("ILM_APPLIER_QUEUE_CAP")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1024)
}

/// Default master timeout handed to observers.
pub fn master_timeout() -> Duration {
    let secs = std::env::var("ILM_MASTER_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(secs)
}

/// A single change to cluster metadata.
#[derive(Debug, Clone)]
pub enum MetadataUpdate {
    PutIndex(IndexMetadata),
    RemoveIndex(String),
    PutDataStream(DataStream),
    RemoveDataStream(String),
}

/// What an update touches; updates with the same target coalesce.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UpdateTarget {
    Index(String),
    DataStream(String),
}

impl MetadataUpdate {
    pub fn target(&self) -> UpdateTarget {
        match self {
            MetadataUpdate::PutIndex(im) => UpdateTarget::Index(im.name().to_string()),
            MetadataUpdate::RemoveIndex(name) => UpdateTarget::Index(name.clone()),
            MetadataUpdate::PutDataStream(ds) => UpdateTarget::DataStream(ds.name().to_string()),
            MetadataUpdate::RemoveDataStream(name) => UpdateTarget::DataStream(name.clone()),
        }
    }
}

/// Coalescing queue keyed by update target, FIFO by first arrival.
/// A newer update for a queued target replaces it in place.
#[derive(Default)]
pub struct Coalescer {
    map: FxHashMap<UpdateTarget, MetadataUpdate>,
    order: VecDeque<UpdateTarget>,
}

impl Coalescer {
    pub fn new() -> Self { Self::default() }

    pub fn len(&self) -> usize { self.map.len() }
    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn push(&mut self, u: MetadataUpdate) {
        let target = u.target();
        if !self.map.contains_key(&target) {
            self.order.push_back(target.clone());
        }
        self.map.insert(target, u);
    }

    pub fn drain_ready(&mut self) -> Vec<MetadataUpdate> {
        let mut out = Vec::with_capacity(self.order.len());
        while let Some(target) = self.order.pop_front() {
            if let Some(u) = self.map.remove(&target) {
                out.push(u);
            }
        }
        out
    }
}

/// Builds successive cluster-state snapshots from update batches.
#[derive(Default)]
pub struct StateBuilder {
    state: ClusterState,
}

impl StateBuilder {
    pub fn new() -> Self { Self::default() }

    pub fn from_state(state: ClusterState) -> Self { Self { state } }

    pub fn version(&self) -> u64 { self.state.version }

    /// Apply a batch; a non-empty batch produces exactly one new version.
    pub fn apply(&mut self, batch: Vec<MetadataUpdate>) {
        if batch.is_empty() {
            return;
        }
        let n = batch.len() as u64;
        let md = &mut self.state.metadata;
        for u in batch {
            match u {
                MetadataUpdate::PutIndex(im) => md.put_index(im),
                MetadataUpdate::RemoveIndex(name) => { md.remove_index(&name); }
                MetadataUpdate::PutDataStream(ds) => md.put_data_stream(ds),
                MetadataUpdate::RemoveDataStream(name) => { md.remove_data_stream(&name); }
            }
        }
        self.state.version = self.state.version.saturating_add(1);
        counter!("ilm_state_updates_applied", n);
    }

    pub fn freeze(&self) -> Arc<ClusterState> {
        Arc::new(self.state.clone())
    }
}

/// Read side of the published cluster state.
#[derive(Clone)]
pub struct StateHandle {
    snap: Arc<ArcSwap<ClusterState>>,
    version_rx: watch::Receiver<u64>,
}

impl StateHandle {
    pub fn current(&self) -> Arc<ClusterState> { self.snap.load_full() }
    pub fn subscribe_version(&self) -> watch::Receiver<u64> { self.version_rx.clone() }
}

/// Spawn the applier loop on an empty state. Returns the update sender and a read handle.
pub fn spawn_applier(cap: usize) -> (mpsc::Sender<MetadataUpdate>, StateHandle) {
    spawn_applier_from(ClusterState::empty(), cap)
}

/// Spawn the applier loop seeded with `initial`.
pub fn spawn_applier_from(initial: ClusterState, cap: usize) -> (mpsc::Sender<MetadataUpdate>, StateHandle) {
    let (tx, mut rx) = mpsc::channel::<MetadataUpdate>(cap.max(1));
    let initial_version = initial.version;
    let snap = Arc::new(ArcSwap::from_pointee(initial.clone()));
    let (version_tx, version_rx) = watch::channel(initial_version);
    let snap_clone = Arc::clone(&snap);

    tokio::spawn(async move {
        let mut coalescer = Coalescer::new();
        let mut builder = StateBuilder::from_state(initial);
        let mut ticker = tokio::time::interval(Duration::from_millis(8));
        let publish = |coalescer: &mut Coalescer, builder: &mut StateBuilder| {
            let batch = coalescer.drain_ready();
            if !batch.is_empty() {
                builder.apply(batch);
                let next = builder.freeze();
                let version = next.version;
                snap_clone.store(next);
                let _ = version_tx.send(version);
            }
        };
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    match maybe {
                        Some(u) => coalescer.push(u),
                        None => {
                            debug!("update channel closed; draining and exiting applier loop");
                            publish(&mut coalescer, &mut builder);
                            break;
                        }
                    }
                }
                _ = ticker.tick() => publish(&mut coalescer, &mut builder),
            }
        }
        info!(version = builder.version(), "applier loop stopped");
    });

    (tx, StateHandle { snap, version_rx })
}
