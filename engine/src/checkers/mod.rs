use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::ir::program::Location;

pub mod divzero;
pub mod overflow;
pub mod size;
pub mod taint;

/// How certain a checker is about a finding
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Definite,
    Possible,
    Info,
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definite => write!(f, "DEFINITE"),
            Self::Possible => write!(f, "POSSIBLE"),
            Self::Info => write!(f, "INFO"),
        }
    }
}

/// The kind of property a finding is about
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Overflow,
    DivisionByZero,
    Taint,
    /// analysis coverage was incomplete (e.g. the fixpoint hit its cap)
    Coverage,
}

/// One finding emitted by a checker; never mutated after creation
#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub struct Diagnostic {
    pub location: Location,
    pub severity: Severity,
    pub category: Category,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        location: Location,
        severity: Severity,
        category: Category,
        message: String,
    ) -> Self {
        Self {
            location,
            severity,
            category,
            message,
        }
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] at {}: {}",
            self.severity, self.location, self.message
        )
    }
}

/// English ordinal of a 1-based parameter position
pub(crate) fn ordinal(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (1, 11) | (2, 12) | (3, 13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", n, suffix)
}
