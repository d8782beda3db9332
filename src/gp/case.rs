//! Test cases: a standard input paired with the expected standard output.

use rand::RngCore;
use std::fmt;
use std::sync::Arc;

/// Placeholder replaced by the resolved stdin in a template expectation.
pub const STDIN_PLACEHOLDER: &str = "{stdin}";

/// Produces a fresh stdin for each generation.
pub type InputGenerator = Arc<dyn Fn(&mut dyn RngCore) -> String + Send + Sync>;

/// Computes the expected output from the resolved stdin.
pub type OutputFunction = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Standard input of a case.
#[derive(Clone)]
pub enum Input {
    /// The same stdin every generation.
    Fixed(String),
    /// A stdin drawn anew each generation.
    Generated(InputGenerator),
}

/// Expected standard output of a case.
#[derive(Clone)]
pub enum Expected {
    /// A string in which every `{stdin}` is replaced by the resolved stdin.
    Template(String),
    /// A function of the resolved stdin.
    Derived(OutputFunction),
}

/// An input and the output a genome should produce for it.
#[derive(Clone)]
pub struct Case {
    input: Input,
    expected: Expected,
}

/// A concrete `(stdin, expected)` pair, shared by every genome scored in one
/// generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCase {
    /// Standard input given to the executor.
    pub stdin: String,
    /// Output the genome should produce.
    pub expected: String,
}

impl Case {
    /// A case with fixed input and a fixed (or templated) expectation.
    #[must_use]
    pub fn new(stdin: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: Input::Fixed(stdin.into()),
            expected: Expected::Template(expected.into()),
        }
    }

    /// A case built from explicit input and expectation kinds.
    #[must_use]
    pub fn from_parts(input: Input, expected: Expected) -> Self {
        Self { input, expected }
    }

    /// A case whose stdin is generated each generation.
    #[must_use]
    pub fn generated<G>(generator: G, expected: Expected) -> Self
    where
        G: Fn(&mut dyn RngCore) -> String + Send + Sync + 'static,
    {
        Self {
            input: Input::Generated(Arc::new(generator)),
            expected,
        }
    }

    /// True if the stdin changes from one generation to the next.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        matches!(self.input, Input::Generated(_))
    }

    /// Resolve the case to a concrete pair.
    ///
    /// With a fixed input the result is the same on every call.
    #[must_use]
    pub fn resolve<R: RngCore + ?Sized>(&self, rng: &mut R) -> ResolvedCase {
        let stdin = match &self.input {
            Input::Fixed(stdin) => stdin.clone(),
            Input::Generated(generate) => {
                let mut rng = rng;
                generate(&mut rng)
            }
        };
        let expected = match &self.expected {
            Expected::Template(template) => template.replace(STDIN_PLACEHOLDER, &stdin),
            Expected::Derived(derive) => derive(&stdin),
        };
        ResolvedCase { stdin, expected }
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(stdin) => f.debug_tuple("Fixed").field(stdin).finish(),
            Self::Generated(_) => f.write_str("Generated(<generator>)"),
        }
    }
}

impl fmt::Debug for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template(template) => f.debug_tuple("Template").field(template).finish(),
            Self::Derived(_) => f.write_str("Derived(<function>)"),
        }
    }
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("input", &self.input)
            .field("expected", &self.expected)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use rand::Rng;

    fn random_id(rng: &mut dyn RngCore) -> String {
        (0..10)
            .map(|_| char::from(b'a' + rng.gen_range(0..26u8)))
            .collect()
    }

    #[test]
    fn test_fixed_case_is_idempotent() {
        let mut rng = SmallRng::seed_from_u64(1);
        let case = Case::new("", "hi !");
        assert!(!case.is_generated());

        let first = case.resolve(&mut rng);
        let second = case.resolve(&mut rng);
        assert_eq!(first, second);
        assert_eq!(first.stdin, "");
        assert_eq!(first.expected, "hi !");
    }

    #[test]
    fn test_template_expectation() {
        let mut rng = SmallRng::seed_from_u64(2);
        let case = Case::generated(random_id, Expected::Template("hello {stdin} !".into()));
        assert!(case.is_generated());

        let resolved = case.resolve(&mut rng);
        assert_eq!(resolved.stdin.len(), 10);
        assert_eq!(resolved.expected, format!("hello {} !", resolved.stdin));
    }

    #[test]
    fn test_derived_expectation() {
        let mut rng = SmallRng::seed_from_u64(3);
        let reverse: OutputFunction =
            Arc::new(|stdin: &str| format!("hello {} !", stdin.chars().rev().collect::<String>()));
        let case = Case::generated(random_id, Expected::Derived(reverse));

        let resolved = case.resolve(&mut rng);
        let inner = &resolved.expected["hello ".len()..resolved.expected.len() - 2];
        assert_eq!(inner.chars().rev().collect::<String>(), resolved.stdin);
    }

    #[test]
    fn test_debug_hides_closures() {
        let case = Case::generated(random_id, Expected::Template("{stdin}".into()));
        assert_eq!(
            format!("{case:?}"),
            r#"Case { input: Generated(<generator>), expected: Template("{stdin}") }"#
        );
        assert_eq!(format!("{:?}", Input::Fixed("a".into())), r#"Fixed("a")"#);
        let derived = Expected::Derived(Arc::new(|stdin: &str| stdin.to_string()));
        assert_eq!(format!("{derived:?}"), "Derived(<function>)");
    }

    #[test]
    fn test_generated_input_varies() {
        let mut rng = SmallRng::seed_from_u64(4);
        let case = Case::generated(random_id, Expected::Template("{stdin}".into()));
        let first = case.resolve(&mut rng);
        let second = case.resolve(&mut rng);
        assert_ne!(first.stdin, second.stdin);
    }
}
