//! Strategies command implementation.

use super::CliError;
use evotape::gp::{
    CreationStrategy, CrossoverStrategy, MutationStrategy, Registry, ReproductionStrategy, Role, ScoringStrategy,
    SelectionStrategy, SteppingStrategy, Strategy,
};

fn describe<S: Strategy>() -> String {
    let registry = Registry::<S>::new();
    let codes: Vec<&str> = registry.codes().collect();
    let defaults: Vec<String> = S::defaults().iter().map(Strategy::code).collect();
    format!(
        "{}:\n  codes:    {}\n  defaults: {}",
        S::ROLE,
        codes.join(" "),
        defaults.join(" ")
    )
}

fn describe_role(role: Role) -> String {
    match role {
        Role::Create => describe::<CreationStrategy>(),
        Role::Score => describe::<ScoringStrategy>(),
        Role::Select => describe::<SelectionStrategy>(),
        Role::Crossover => describe::<CrossoverStrategy>(),
        Role::Mutate => describe::<MutationStrategy>(),
        Role::Reproduce => describe::<ReproductionStrategy>(),
        Role::Step => describe::<SteppingStrategy>(),
    }
}

/// Execute the strategies command.
///
/// # Errors
///
/// Returns an error if `role` is not a known role name.
pub(crate) fn execute(role: Option<&str>) -> Result<(), CliError> {
    let roles = match role {
        Some(name) => vec![name.parse::<Role>()?],
        None => Role::ALL.to_vec(),
    };
    for role in roles {
        println!("{}", describe_role(role));
    }
    Ok(())
}
