use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::{DataStream, Index, IndexMetadata};

/// Index and data-stream metadata of a cluster at one version.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    indices: FxHashMap<String, IndexMetadata>,
    #[serde(default)]
    data_streams: BTreeMap<String, DataStream>,
}

impl Metadata {
    pub fn index(&self, name: &str) -> Option<&IndexMetadata> { self.indices.get(name) }
    pub fn indices(&self) -> impl Iterator<Item = &IndexMetadata> { self.indices.values() }
    pub fn index_count(&self) -> usize { self.indices.len() }
    pub fn data_stream(&self, name: &str) -> Option<&DataStream> { self.data_streams.get(name) }
    pub fn data_streams(&self) -> impl Iterator<Item = &DataStream> { self.data_streams.values() }

    /// Data stream whose current write index is `index`, matched by identity.
    pub fn data_stream_for_write_index(&self, index: &Index) -> Option<&DataStream> {
        self.data_streams.values().find(|ds| ds.is_write_index(index))
    }

    pub fn put_index(&mut self, im: IndexMetadata) {
        self.indices.insert(im.name().to_string(), im);
    }

    pub fn remove_index(&mut self, name: &str) -> Option<IndexMetadata> {
        self.indices.remove(name)
    }

    pub fn put_data_stream(&mut self, ds: DataStream) {
        self.data_streams.insert(ds.name().to_string(), ds);
    }

    pub fn remove_data_stream(&mut self, name: &str) -> Option<DataStream> {
        self.data_streams.remove(name)
    }
}

/// Immutable cluster snapshot handed to steps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterState {
    #[serde(default)]
    pub version: u64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl ClusterState {
    pub fn empty() -> Self { Self::default() }

    pub fn builder() -> ClusterStateBuilder { ClusterStateBuilder::default() }

    pub fn metadata(&self) -> &Metadata { &self.metadata }
}

#[derive(Debug, Default)]
pub struct ClusterStateBuilder {
    version: u64,
    metadata: Metadata,
}

impl ClusterStateBuilder {
    pub fn version(mut self, version: u64) -> Self { self.version = version; self }

    pub fn put_index(mut self, im: IndexMetadata) -> Self {
        self.metadata.put_index(im);
        self
    }

    pub fn put_data_stream(mut self, ds: DataStream) -> Self {
        self.metadata.put_data_stream(ds);
        self
    }

    pub fn build(self) -> ClusterState {
        ClusterState { version: self.version, metadata: self.metadata }
    }
}
