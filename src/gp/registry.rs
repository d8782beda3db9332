//! Strategy roles and their code lookup tables.
//!
//! Every strategy of every role is a plain enum value addressable by a short
//! alphabetic code. The table for a role is built once from
//! [`Strategy::named`] and never resolved by reflection.

use crate::error::{EvoError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A role in the evolutionary loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Initial population creation.
    Create,
    /// Fitness scoring.
    Score,
    /// Parent selection.
    Select,
    /// Parent recombination.
    Crossover,
    /// Child mutation.
    Mutate,
    /// Next-generation assembly.
    Reproduce,
    /// Per-generation stepping.
    Step,
}

impl Role {
    /// Every role, in specialization identifier order.
    pub const ALL: [Role; 7] = [
        Role::Create,
        Role::Score,
        Role::Select,
        Role::Crossover,
        Role::Mutate,
        Role::Reproduce,
        Role::Step,
    ];

    /// Name used in configuration strings.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Role::Create => "create",
            Role::Score => "score",
            Role::Select => "select",
            Role::Crossover => "crossover",
            Role::Mutate => "mutate",
            Role::Reproduce => "reproduce",
            Role::Step => "step",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Role {
    type Err = EvoError;

    fn from_str(s: &str) -> Result<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.name() == s)
            .ok_or_else(|| EvoError::UnknownRole(s.to_string()))
    }
}

/// A strategy enum for one role.
pub trait Strategy: Clone + fmt::Debug + Sized {
    /// The role this strategy fills.
    const ROLE: Role;

    /// Every registered strategy with its code.
    ///
    /// Codes are unique within a role. Several codes may map to equal
    /// strategies (for example a "default" alias).
    fn named() -> Vec<(String, Self)>;

    /// Strategies used when a configuration does not name any.
    fn defaults() -> Vec<Self>;

    /// Code of this strategy.
    ///
    /// Parametrized strategies outside [`Strategy::named`] get a code that
    /// [`Strategy::parse_code`] reads back.
    fn code(&self) -> String;

    /// Read a parametrized code that is not in the registry.
    fn parse_code(_code: &str) -> Option<Self> {
        None
    }
}

/// Code lookup table for one role.
#[derive(Debug, Clone)]
pub struct Registry<S: Strategy> {
    table: BTreeMap<String, S>,
}

impl<S: Strategy> Registry<S> {
    /// Build the table from [`Strategy::named`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: S::named().into_iter().collect(),
        }
    }

    /// Look a strategy up by code, falling back to
    /// [`Strategy::parse_code`].
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::UnknownStrategy`] if the code is neither
    /// registered nor parametrized.
    pub fn get(&self, code: &str) -> Result<S> {
        self.table
            .get(code)
            .cloned()
            .or_else(|| S::parse_code(code))
            .ok_or_else(|| EvoError::UnknownStrategy {
                role: S::ROLE,
                code: code.to_string(),
            })
    }

    /// Every registered code, sorted.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    /// Number of registered codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// True if the role has no registered strategy.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl<S: Strategy> Default for Registry<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Look a strategy up by code in a freshly built table.
///
/// # Errors
///
/// Returns [`EvoError::UnknownStrategy`] if the code is unknown.
pub fn lookup<S: Strategy>(code: &str) -> Result<S> {
    Registry::<S>::new().get(code)
}
