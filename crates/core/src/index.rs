use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult, LifecycleExecutionState, ILM_CUSTOM_METADATA_KEY, LIFECYCLE_NAME_SETTING};

/// Identifier of a concrete index. Two indices with the same name but a
/// different uuid are different indices (e.g. delete + recreate).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    name: String,
    uuid: String,
}

impl Index {
    pub fn new(name: impl Into<String>, uuid: impl Into<String>) -> Self {
        Self { name: name.into(), uuid: uuid.into() }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn uuid(&self) -> &str { &self.uuid }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}]", self.name, self.uuid)
    }
}

/// Snapshot of one index's settings and custom metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    index: Index,
    #[serde(default)]
    settings: BTreeMap<String, String>,
    number_of_shards: u32,
    #[serde(default)]
    number_of_replicas: u32,
    #[serde(default)]
    custom: BTreeMap<String, BTreeMap<String, String>>,
}

impl IndexMetadata {
    pub fn builder(name: impl Into<String>) -> IndexMetadataBuilder {
        IndexMetadataBuilder::new(name)
    }

    pub fn index(&self) -> &Index { &self.index }
    pub fn name(&self) -> &str { &self.index.name }
    pub fn settings(&self) -> &BTreeMap<String, String> { &self.settings }
    pub fn setting(&self, key: &str) -> Option<&str> { self.settings.get(key).map(String::as_str) }
    pub fn number_of_shards(&self) -> u32 { self.number_of_shards }
    pub fn number_of_replicas(&self) -> u32 { self.number_of_replicas }
    pub fn custom(&self, key: &str) -> Option<&BTreeMap<String, String>> { self.custom.get(key) }

    /// Name of the attached lifecycle policy, empty when none is set.
    pub fn lifecycle_policy_name(&self) -> &str {
        self.setting(LIFECYCLE_NAME_SETTING).unwrap_or("")
    }

    /// Execution state recorded under the `ilm` custom key; empty when absent.
    pub fn lifecycle_execution_state(&self) -> LifecycleExecutionState {
        self.custom(ILM_CUSTOM_METADATA_KEY)
            .map(LifecycleExecutionState::from_custom)
            .unwrap_or_default()
    }

    /// Builder seeded from this snapshot, for producing an updated copy.
    pub fn to_builder(&self) -> IndexMetadataBuilder {
        IndexMetadataBuilder {
            name: self.index.name.clone(),
            uuid: Some(self.index.uuid.clone()),
            settings: self.settings.clone(),
            number_of_shards: self.number_of_shards,
            number_of_replicas: self.number_of_replicas,
            custom: self.custom.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndexMetadataBuilder {
    name: String,
    uuid: Option<String>,
    settings: BTreeMap<String, String>,
    number_of_shards: u32,
    number_of_replicas: u32,
    custom: BTreeMap<String, BTreeMap<String, String>>,
}

impl IndexMetadataBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            uuid: None,
            settings: BTreeMap::new(),
            number_of_shards: 1,
            number_of_replicas: 0,
            custom: BTreeMap::new(),
        }
    }

    pub fn uuid(mut self, uuid: impl Into<String>) -> Self { self.uuid = Some(uuid.into()); self }

    pub fn setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    pub fn settings<I, K, V>(mut self, settings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.settings.extend(settings.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn number_of_shards(mut self, n: u32) -> Self { self.number_of_shards = n; self }
    pub fn number_of_replicas(mut self, n: u32) -> Self { self.number_of_replicas = n; self }

    pub fn put_custom(mut self, key: impl Into<String>, value: BTreeMap<String, String>) -> Self {
        self.custom.insert(key.into(), value);
        self
    }

    pub fn build(self) -> CoreResult<IndexMetadata> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidIndex("index name must not be empty".into()));
        }
        if self.number_of_shards == 0 {
            return Err(CoreError::InvalidIndex(format!("index [{}] must have at least one shard", self.name)));
        }
        let uuid = self.uuid.unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        Ok(IndexMetadata {
            index: Index { name: self.name, uuid },
            settings: self.settings,
            number_of_shards: self.number_of_shards,
            number_of_replicas: self.number_of_replicas,
            custom: self.custom,
        })
    }
}
