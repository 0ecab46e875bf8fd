use std::fs;
use std::path::Path;

pub use error::{EngineError, EngineResult};

use crate::flow::context::ContextPolicy;
use crate::flow::{Analysis, AnalysisReport, Workflow};
use crate::ir::adapter;
use crate::ir::annot::TaintSpec;
use crate::ir::program::Program;

pub mod analysis;
pub mod checkers;
pub mod error;
pub mod flow;
pub mod ir;

/// Main entrypoint: load a serialized program and run the requested
/// analyses over it
pub fn analyze(
    input: &Path,
    annotations: Option<&Path>,
    depth: Option<usize>,
    analyses: &[Analysis],
) -> EngineResult<Vec<AnalysisReport>> {
    let content = fs::read_to_string(input)
        .map_err(|e| EngineError::ConfigError(format!("cannot read program: {}", e)))?;
    let adapted: adapter::Program = serde_json::from_str(&content)
        .map_err(|e| EngineError::InvalidProgram(format!("malformed program: {}", e)))?;
    let program = Program::convert(&adapted)?;

    let spec = match annotations {
        None => None,
        Some(path) => Some(TaintSpec::load(path)?),
    };

    let mut workflow = Workflow::new(&program).with_policy(ContextPolicy { depth });
    if let Some(spec) = spec.as_ref() {
        workflow = workflow.with_taint(spec);
    }
    analyses
        .iter()
        .map(|analysis| workflow.execute(analysis))
        .collect()
}
