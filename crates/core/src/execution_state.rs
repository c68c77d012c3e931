use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{StepKey, ROLLUP_INDEX_NAME_KEY};

const PHASE: &str = "phase";
const ACTION: &str = "action";
const STEP: &str = "step";
const FAILED_STEP: &str = "failed_step";
const STEP_INFO: &str = "step_info";
const SNAPSHOT_NAME: &str = "snapshot_name";

/// Typed view over the `ilm` custom map persisted on each index.
///
/// Steps read it and may produce an updated copy; persisting that copy is
/// the driver's job. Keys written by other steps are carried in `extra`
/// and rendered back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleExecutionState {
    pub phase: Option<String>,
    pub action: Option<String>,
    pub step: Option<String>,
    pub failed_step: Option<String>,
    pub step_info: Option<String>,
    pub snapshot_name: Option<String>,
    pub rollup_index_name: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

const KNOWN_KEYS: [&str; 7] = [PHASE, ACTION, STEP, FAILED_STEP, STEP_INFO, SNAPSHOT_NAME, ROLLUP_INDEX_NAME_KEY];

impl LifecycleExecutionState {
    pub fn from_custom(map: &BTreeMap<String, String>) -> Self {
        let get = |k: &str| map.get(k).cloned();
        Self {
            phase: get(PHASE),
            action: get(ACTION),
            step: get(STEP),
            failed_step: get(FAILED_STEP),
            step_info: get(STEP_INFO),
            snapshot_name: get(SNAPSHOT_NAME),
            rollup_index_name: get(ROLLUP_INDEX_NAME_KEY),
            extra: map
                .iter()
                .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }

    pub fn to_custom_map(&self) -> BTreeMap<String, String> {
        let mut out = self.extra.clone();
        let fields = [
            (PHASE, &self.phase),
            (ACTION, &self.action),
            (STEP, &self.step),
            (FAILED_STEP, &self.failed_step),
            (STEP_INFO, &self.step_info),
            (SNAPSHOT_NAME, &self.snapshot_name),
            (ROLLUP_INDEX_NAME_KEY, &self.rollup_index_name),
        ];
        for (k, v) in fields {
            if let Some(v) = v { out.insert(k.to_string(), v.clone()); }
        }
        out
    }

    /// Generated rollup target; a blank value counts as not generated.
    pub fn rollup_index_name(&self) -> Option<&str> {
        self.rollup_index_name.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// The step this index is currently on, if fully recorded.
    pub fn current_step_key(&self) -> Option<StepKey> {
        match (&self.phase, &self.action, &self.step) {
            (Some(p), Some(a), Some(s)) => StepKey::new(p.clone(), a.clone(), s.clone()).ok(),
            _ => None,
        }
    }

    /// Copy positioned on `key`, with any previous failure cleared.
    pub fn moved_to(&self, key: &StepKey) -> Self {
        Self {
            phase: Some(key.phase().to_string()),
            action: Some(key.action().to_string()),
            step: Some(key.name().to_string()),
            failed_step: None,
            step_info: None,
            ..self.clone()
        }
    }
}
