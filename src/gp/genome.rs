//! Genome representation for genetic programming.
//!
//! A genome is a program for the tape machine: a non-empty sequence of
//! tokens plus the chromosome size used by block-structured crossover.

use crate::error::{EvoError, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default chromosome size for genomes built from plain source text.
pub const DEFAULT_CHROMOSOME_SIZE: usize = 8;

/// A single instruction of the tape language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Token {
    /// Move the head one cell left (`<`).
    Left,
    /// Move the head one cell right (`>`).
    Right,
    /// Increment the current cell (`+`).
    Increment,
    /// Decrement the current cell (`-`).
    Decrement,
    /// Jump past the matching close if the cell is zero (`[`).
    LoopOpen,
    /// Jump back to the matching open if the cell is non-zero (`]`).
    LoopClose,
    /// Read one input byte into the current cell (`,`).
    Read,
    /// Write the current cell to the output (`.`).
    Write,
}

impl Token {
    /// Every token of the alphabet, in source order `<>+-[],.`.
    pub const ALL: [Token; 8] = [
        Token::Left,
        Token::Right,
        Token::Increment,
        Token::Decrement,
        Token::LoopOpen,
        Token::LoopClose,
        Token::Read,
        Token::Write,
    ];

    /// Source character of this token.
    #[must_use]
    pub fn as_char(self) -> char {
        match self {
            Token::Left => '<',
            Token::Right => '>',
            Token::Increment => '+',
            Token::Decrement => '-',
            Token::LoopOpen => '[',
            Token::LoopClose => ']',
            Token::Read => ',',
            Token::Write => '.',
        }
    }

    /// Parse a source character, `None` for characters outside the alphabet.
    #[must_use]
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '<' => Some(Token::Left),
            '>' => Some(Token::Right),
            '+' => Some(Token::Increment),
            '-' => Some(Token::Decrement),
            '[' => Some(Token::LoopOpen),
            ']' => Some(Token::LoopClose),
            ',' => Some(Token::Read),
            '.' => Some(Token::Write),
            _ => None,
        }
    }

    /// The token of opposite polarity.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Token::Left => Token::Right,
            Token::Right => Token::Left,
            Token::Increment => Token::Decrement,
            Token::Decrement => Token::Increment,
            Token::LoopOpen => Token::LoopClose,
            Token::LoopClose => Token::LoopOpen,
            Token::Read => Token::Write,
            Token::Write => Token::Read,
        }
    }

    /// Draw a token uniformly from the alphabet.
    #[must_use]
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Token::ALL[rng.gen_range(0..Token::ALL.len())]
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Parse every alphabet character of `source`, skipping the rest.
#[must_use]
pub fn tokenize(source: &str) -> Vec<Token> {
    source.chars().filter_map(Token::from_char).collect()
}

/// Render tokens back to source text.
#[must_use]
pub fn render(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.as_char()).collect()
}

/// A candidate program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Genome {
    tokens: Vec<Token>,
    chromosome_size: usize,
}

impl Genome {
    /// Probability that a mutation call applies at least one operator.
    pub const MUTATION_RATE: f64 = 0.05;

    /// Probability of each further operator application.
    pub const ADDITIONAL_MUTATION_RATE: f64 = 0.1;

    /// Build a genome.
    ///
    /// # Errors
    ///
    /// Returns an error if `tokens` is empty or `chromosome_size` is zero.
    pub fn new(tokens: Vec<Token>, chromosome_size: usize) -> Result<Self> {
        if tokens.is_empty() {
            return Err(EvoError::EmptyGenome);
        }
        if chromosome_size == 0 {
            return Err(EvoError::InvalidChromosomeSize);
        }
        Ok(Self {
            tokens,
            chromosome_size,
        })
    }

    /// Build a genome from source text with the default chromosome size.
    ///
    /// # Errors
    ///
    /// Returns an error if `source` holds no alphabet character.
    pub fn parse(source: &str) -> Result<Self> {
        Self::new(tokenize(source), DEFAULT_CHROMOSOME_SIZE)
    }

    /// Build a random genome whose tokens are drawn from `alphabet`.
    ///
    /// Repeating a token in `alphabet` weights the draw toward it. An empty
    /// alphabet falls back to the uniform alphabet.
    ///
    /// # Errors
    ///
    /// Returns an error if `length` or `chromosome_size` is zero.
    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        length: usize,
        chromosome_size: usize,
        alphabet: &[Token],
    ) -> Result<Self> {
        let alphabet = if alphabet.is_empty() {
            &Token::ALL[..]
        } else {
            alphabet
        };
        let tokens = (0..length)
            .filter_map(|_| alphabet.choose(rng).copied())
            .collect();
        Self::new(tokens, chromosome_size)
    }

    /// The token sequence.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Block size used by chromosome crossover.
    #[must_use]
    pub fn chromosome_size(&self) -> usize {
        self.chromosome_size
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false for a constructed genome.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Source text of the program.
    #[must_use]
    pub fn source(&self) -> String {
        render(&self.tokens)
    }

    /// Chromosomes: consecutive blocks of `chromosome_size` tokens, the last
    /// one possibly shorter.
    pub fn chromosomes(&self) -> impl Iterator<Item = &[Token]> {
        self.tokens.chunks(self.chromosome_size)
    }

    /// Replace the tokens, keeping the chromosome size.
    ///
    /// Used by mutation, whose operators never produce an empty sequence.
    pub(crate) fn with_tokens(&self, tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            chromosome_size: self.chromosome_size,
        }
    }
}

impl fmt::Display for Genome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "{token}")?;
        }
        Ok(())
    }
}
