//! A single timed mutation step on a timeline.

use serde::{Deserialize, Serialize};

/// One step: mutate `target` towards `vars` over `duration` seconds.
///
/// `position` is the start time on the owning timeline. `None` appends the
/// step at the current end of the sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Canonical target path (e.g., "hero/opacity").
    pub target: String,
    /// Duration in seconds.
    pub duration: f32,
    #[serde(default)]
    pub position: Option<f32>,
    /// Properties to animate; opaque to the pool.
    #[serde(default)]
    pub vars: serde_json::Map<String, serde_json::Value>,
}

impl Step {
    pub fn new(target: impl Into<String>, duration: f32) -> Self {
        Self {
            target: target.into(),
            duration: duration.max(0.0),
            position: None,
            vars: serde_json::Map::new(),
        }
    }

    /// Pin the step to an absolute start time.
    pub fn at(mut self, position: f32) -> Self {
        self.position = Some(position.max(0.0));
        self
    }

    pub fn with(mut self, prop: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.vars.insert(prop.into(), value.into());
        self
    }
}
