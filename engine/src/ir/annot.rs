use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::ir::program::Identifier;

/// Externally loaded taint annotations
///
/// Call targets marked as sources force their return value to tainted,
/// sanitizers force it to clean, and sink-marked formal parameters must
/// never receive tainted data.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct TaintSpec {
    #[serde(default)]
    sources: BTreeSet<String>,
    #[serde(default)]
    sanitizers: BTreeSet<String>,
    /// sink-marked formal parameters, by target name and parameter index
    #[serde(default)]
    sinks: BTreeMap<String, BTreeSet<usize>>,
}

impl TaintSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> EngineResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("cannot read taint annotations: {}", e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            EngineError::ConfigError(format!("malformed taint annotations: {}", e))
        })
    }

    pub fn mark_source(&mut self, target: impl Into<String>) {
        self.sources.insert(target.into());
    }

    pub fn mark_sanitizer(&mut self, target: impl Into<String>) {
        self.sanitizers.insert(target.into());
    }

    pub fn mark_sink(&mut self, target: impl Into<String>, param: usize) {
        self.sinks.entry(target.into()).or_default().insert(param);
    }

    pub fn is_source(&self, target: &Identifier) -> bool {
        self.sources.contains(target.as_str())
    }

    pub fn is_sanitizer(&self, target: &Identifier) -> bool {
        self.sanitizers.contains(target.as_str())
    }

    pub fn sink_params(&self, target: &Identifier) -> Option<&BTreeSet<usize>> {
        self.sinks.get(target.as_str())
    }
}
