use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::{trace, SetLoggerError};
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use crate::config::PARALLEL;

/// Nesting level of the active trace scopes
static SCOPE_DEPTH: AtomicUsize = AtomicUsize::new(0);

/// A scoped trace span around one phase of a run
///
/// Entry, intermediate events, and timed exit are logged at trace level,
/// indented by nesting depth. The depth counter only makes sense on a
/// single thread, so tracing is disabled under parallel execution.
pub struct Tracer {
    title: String,
    start: Instant,
    depth: Option<usize>,
}

impl Tracer {
    pub fn new(title: String) -> Self {
        let depth = (!*PARALLEL).then(|| SCOPE_DEPTH.fetch_add(1, Ordering::SeqCst));
        if let Some(level) = depth {
            trace!("{}[{}]", "  ".repeat(level), title);
        }
        Self {
            title,
            start: Instant::now(),
            depth,
        }
    }

    /// Record an event within this span
    pub fn log(&self, event: &str) {
        if let Some(level) = self.depth {
            trace!("{}  {}", "  ".repeat(level), event);
        }
    }
}

impl Drop for Tracer {
    fn drop(&mut self) {
        if let Some(level) = self.depth {
            trace!(
                "{}[{}] done in {:.2?}",
                "  ".repeat(level),
                self.title,
                self.start.elapsed()
            );
            SCOPE_DEPTH.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

/// Setup the logging globally
pub fn setup(verbose: usize) -> Result<(), SetLoggerError> {
    let verbosity = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        verbosity,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
}
