//! CLI command implementations for Evotape.

pub(crate) mod run;
pub(crate) mod strategies;

use clap::ValueEnum;
use evotape::Configuration;
use evotape::error::EvoError;
use std::error::Error;
use std::fmt;

/// Built-in configuration templates for the `run` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Recipe {
    /// Every default strategy of every role.
    Default,
    /// Plain comparison scoring with top-40% ranking selection.
    Elitism,
    /// Plain comparison scoring with pooling selection.
    Best,
}

impl Recipe {
    /// The configuration this recipe stands for.
    pub(crate) fn configuration(self) -> Configuration {
        match self {
            Recipe::Default => Configuration::default(),
            Recipe::Elitism => Configuration::showing_elitism(),
            Recipe::Best => Configuration::best_solution_so_far(),
        }
    }
}

/// CLI error type.
#[derive(Debug)]
pub(crate) struct CliError {
    message: String,
}

impl CliError {
    /// Create a new CLI error.
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self::new(e.to_string())
    }
}

impl From<EvoError> for CliError {
    fn from(e: EvoError) -> Self {
        Self::new(e.to_string())
    }
}
