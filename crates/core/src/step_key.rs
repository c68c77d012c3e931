use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Position of a step inside a lifecycle policy: `(phase, action, name)`.
///
/// Equality and hashing are structural. Keys are created when a policy is
/// compiled and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawStepKey")]
pub struct StepKey {
    phase: String,
    action: String,
    name: String,
}

#[derive(Deserialize)]
struct RawStepKey {
    phase: String,
    action: String,
    name: String,
}

impl TryFrom<RawStepKey> for StepKey {
    type Error = CoreError;

    fn try_from(raw: RawStepKey) -> CoreResult<Self> {
        StepKey::new(raw.phase, raw.action, raw.name)
    }
}

fn require(field: &'static str, value: String) -> CoreResult<String> {
    if value.trim().is_empty() {
        return Err(CoreError::InvalidStepKey { field });
    }
    Ok(value)
}

impl StepKey {
    pub fn new(phase: impl Into<String>, action: impl Into<String>, name: impl Into<String>) -> CoreResult<Self> {
        Ok(Self {
            phase: require("phase", phase.into())?,
            action: require("action", action.into())?,
            name: require("name", name.into())?,
        })
    }

    pub fn phase(&self) -> &str { &self.phase }
    pub fn action(&self) -> &str { &self.action }
    pub fn name(&self) -> &str { &self.name }

    /// Same phase and action, different step name.
    pub fn with_name(&self, name: impl Into<String>) -> CoreResult<Self> {
        Self::new(self.phase.clone(), self.action.clone(), name)
    }
}

impl fmt::Display for StepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{\"phase\":\"{}\",\"action\":\"{}\",\"name\":\"{}\"}}", self.phase, self.action, self.name)
    }
}
