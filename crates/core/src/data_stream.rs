use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::{CoreError, CoreResult, Index};

/// A logical data stream and its backing indices, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataStream {
    name: String,
    timestamp_field: String,
    indices: SmallVec<[Index; 4]>,
    generation: u64,
}

impl DataStream {
    pub fn new(name: impl Into<String>, timestamp_field: impl Into<String>, indices: Vec<Index>) -> CoreResult<Self> {
        let name = name.into();
        if indices.is_empty() {
            return Err(CoreError::InvalidDataStream { name, reason: "must have at least one backing index".into() });
        }
        let generation = indices.len() as u64;
        Ok(Self { name, timestamp_field: timestamp_field.into(), indices: SmallVec::from_vec(indices), generation })
    }

    /// `.ds-<stream>-<generation>` with the generation zero-padded to six digits.
    pub fn default_backing_index_name(data_stream: &str, generation: u64) -> String {
        format!(".ds-{}-{:06}", data_stream, generation)
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn timestamp_field(&self) -> &str { &self.timestamp_field }
    pub fn indices(&self) -> &[Index] { &self.indices }
    pub fn generation(&self) -> u64 { self.generation }

    /// Current write index (most recent backing index).
    pub fn write_index(&self) -> Option<&Index> { self.indices.last() }

    pub fn is_write_index(&self, index: &Index) -> bool {
        self.write_index() == Some(index)
    }
}
