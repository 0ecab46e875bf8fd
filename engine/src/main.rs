use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use log::info;
use structopt::StructOpt;

use lyra_engine::checkers::size::NumericalSize;
use lyra_engine::flow::Analysis;
use lyra_shared::config::PATH_STUDIO;
use lyra_shared::logging;

#[derive(StructOpt)]
#[structopt(
    name = "lyra-engine",
    about = "The abstract interpretation engine for LYRA",
    rename_all = "kebab-case"
)]
struct Args {
    /// Studio directory
    #[structopt(short, long)]
    studio: Option<PathBuf>,

    /// Verbosity
    #[structopt(short, long, parse(from_occurrences))]
    verbose: usize,

    /// Actions
    #[structopt(short, long)]
    actions: Vec<Action>,

    /// Numeric width assumed by the overflow and division checkers
    #[structopt(long, default_value = "int32")]
    size: NumericalSize,

    /// Taint annotations (sources, sanitizers, sinks)
    #[structopt(long)]
    annotations: Option<PathBuf>,

    /// Limit the depth of call-string contexts
    #[structopt(short, long)]
    depth: Option<usize>,

    /// Serialized program
    #[structopt(required = true)]
    input: PathBuf,
}

#[derive(StructOpt)]
enum Action {
    /// Run the interval analysis with the overflow and division checkers
    Intervals,
    /// Run the two-level taint analysis with the sink checker
    Taint,
    /// Run the three-level taint analysis with the sink checker
    Taint3,
    /// Run the parity analysis
    Parity,
    /// Run the reaching-definitions dataflow analysis
    Reaching,
    /// Run the available-expressions dataflow analysis
    Available,
}

impl FromStr for Action {
    type Err = &'static str;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let action = match s {
            "intervals" => Self::Intervals,
            "taint" => Self::Taint,
            "taint3" => Self::Taint3,
            "parity" => Self::Parity,
            "reaching" => Self::Reaching,
            "available" => Self::Available,
            _ => return Err("invalid action"),
        };
        Ok(action)
    }
}

impl Action {
    fn to_analysis(&self, size: NumericalSize) -> Analysis {
        match self {
            Self::Intervals => Analysis::Intervals { size },
            Self::Taint => Analysis::Taint { two_levels: true },
            Self::Taint3 => Analysis::Taint { two_levels: false },
            Self::Parity => Analysis::Parity,
            Self::Reaching => Analysis::ReachingDefinitions,
            Self::Available => Analysis::AvailableExpressions,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::from_args();
    let Args {
        studio,
        verbose,
        actions,
        size,
        annotations,
        depth,
        input,
    } = args;

    // setup logging
    logging::setup(verbose)?;
    if actions.is_empty() {
        bail!("expecting at least one analysis action");
    }

    // run the workflow
    let analyses: Vec<_> = actions.iter().map(|a| a.to_analysis(size)).collect();
    let reports = lyra_engine::analyze(&input, annotations.as_deref(), depth, &analyses)?;
    for report in &reports {
        let coverage = if report.converged { "" } else { " (incomplete)" };
        info!(
            "{}: {} findings{}",
            report.analysis,
            report.diagnostics.len(),
            coverage
        );
        for diagnostic in &report.diagnostics {
            info!("  {}", diagnostic);
        }
    }

    // persist the reports
    let output = studio.as_ref().unwrap_or(&PATH_STUDIO).join("lyra");
    fs::create_dir_all(&output)?;
    let path = output.join("warnings.json");
    fs::write(&path, serde_json::to_string_pretty(&reports)?)?;
    info!("reports saved at {}", path.to_string_lossy());

    // done with everything
    Ok(())
}
