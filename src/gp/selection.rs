//! Selection operators for genetic programming.
//!
//! Selection reduces a scored population to the parents of the next
//! generation. Every strategy returns distinct indices into the scored
//! population, at least two of them, and never touches its input.

// Selection sizes and percentiles mix counts and ratios
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]

use crate::error::{EvoError, Result};
use crate::gp::genome::Token;
use crate::gp::registry::{Role, Strategy};
use crate::gp::scoring::Scored;
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Minimum number of parents a selection yields.
pub const MIN_SELECTED: usize = 2;

/// Default pool size of the pooling strategy.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Default fraction of the population kept by size-driven strategies.
pub const DEFAULT_SELECTION_SIZE: SelectionSize = SelectionSize::Fraction(0.4);

/// How many members a strategy should keep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SelectionSize {
    /// An absolute number of members.
    Count(usize),
    /// A fraction of the population in [0, 1], rounded, at least 1.
    Fraction(f64),
}

impl SelectionSize {
    /// Number of members to keep out of `population`.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero count, a fraction outside [0, 1], or a
    /// count larger than the population.
    pub fn resolve(self, population: usize) -> Result<usize> {
        let count = match self {
            SelectionSize::Count(count) => count,
            SelectionSize::Fraction(fraction) => {
                if !(0.0..=1.0).contains(&fraction) {
                    return Err(EvoError::InvalidSelectionSize(format!(
                        "fraction {fraction} is outside [0, 1]"
                    )));
                }
                ((fraction * population as f64).round() as usize).max(1)
            }
        };
        if count == 0 {
            return Err(EvoError::InvalidSelectionSize("count is zero".into()));
        }
        if count > population {
            return Err(EvoError::SelectionTooLarge {
                requested: count,
                available: population,
            });
        }
        Ok(count)
    }
}

/// A percentile band `[start, stop]` of the ranking, as fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    start: f64,
    stop: f64,
}

impl Band {
    /// Build a band.
    ///
    /// Bounds above 1 are read as percentages and divided by 10 until they
    /// fall in [0, 1], so `(0, 40)` and `(0, 0.4)` are the same band.
    ///
    /// # Errors
    ///
    /// Returns [`EvoError::InvalidBand`] for negative or non-finite bounds,
    /// or when `start > stop` once normalized.
    pub fn new(start: f64, stop: f64) -> Result<Self> {
        let invalid = || EvoError::InvalidBand { start, stop };
        let normalize = |mut bound: f64| {
            if !bound.is_finite() || bound < 0.0 {
                return Err(invalid());
            }
            while bound > 1.0 {
                bound /= 10.0;
            }
            Ok(bound)
        };
        let band = Self {
            start: normalize(start)?,
            stop: normalize(stop)?,
        };
        if band.start > band.stop {
            return Err(invalid());
        }
        Ok(band)
    }

    /// Lower bound, in [0, 1].
    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Upper bound, in [0, 1].
    #[must_use]
    pub fn stop(&self) -> f64 {
        self.stop
    }

    /// True if `percentile` lies in the band, bounds included.
    #[must_use]
    pub fn contains(&self, percentile: f64) -> bool {
        self.start <= percentile && percentile <= self.stop
    }

    pub(crate) fn fixed(start: f64, stop: f64) -> Self {
        Self { start, stop }
    }
}

/// Selection strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectionStrategy {
    /// Keep members whose ranking percentile falls in any band.
    RankingSlices {
        /// Percentile bands to keep.
        bands: Vec<Band>,
    },
    /// Take members tier by tier, from the best score down.
    Pooling {
        /// Members taken from each score tier.
        pool_size: usize,
        /// Total number of members to take.
        selection_size: SelectionSize,
        /// Take at most one member per distinct source in each tier.
        unique: bool,
    },
    /// Repeated Bernoulli trials weighted by score or rank.
    Likelihood {
        /// Total number of members to take.
        selection_size: SelectionSize,
        /// Weight by rank instead of raw score.
        by_rank: bool,
    },
}

impl SelectionStrategy {
    /// Select parents from `scored`.
    ///
    /// Returns distinct indices into `scored`, at least [`MIN_SELECTED`].
    ///
    /// # Errors
    ///
    /// Returns an error if `scored` has fewer than two members or the
    /// strategy's parameters do not fit the population.
    pub fn select<R: Rng + ?Sized>(&self, scored: &[Scored], rng: &mut R) -> Result<Vec<usize>> {
        if scored.len() < MIN_SELECTED {
            return Err(EvoError::PopulationTooSmall(scored.len()));
        }
        let mut selected = match self {
            Self::RankingSlices { bands } => ranking_slices(scored, bands),
            Self::Pooling {
                pool_size,
                selection_size,
                unique,
            } => pooling(scored, *pool_size, *selection_size, *unique, rng)?,
            Self::Likelihood {
                selection_size,
                by_rank,
            } => likelihood(scored, *selection_size, *by_rank, rng)?,
        };
        top_up(&mut selected, scored.len(), rng);
        Ok(selected)
    }
}

/// Add random members not yet selected until [`MIN_SELECTED`] is reached.
fn top_up<R: Rng + ?Sized>(selected: &mut Vec<usize>, population: usize, rng: &mut R) {
    if selected.len() >= MIN_SELECTED {
        return;
    }
    let taken: HashSet<usize> = selected.iter().copied().collect();
    let mut rest: Vec<usize> = (0..population).filter(|i| !taken.contains(i)).collect();
    rest.shuffle(rng);
    let missing = MIN_SELECTED - selected.len();
    selected.extend(rest.into_iter().take(missing));
}

/// Indices of `scored` ordered from best to worst score (stable).
fn ranked(scored: &[Scored]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scored.len()).collect();
    order.sort_by(|&a, &b| scored[b].score().total_cmp(&scored[a].score()));
    order
}

/// Members whose percentile `rank / total` falls in any band.
///
/// Rank starts at 1, so the best member has the smallest non-zero
/// percentile. The result is ordered from best to worst.
#[must_use]
pub fn ranking_slices(scored: &[Scored], bands: &[Band]) -> Vec<usize> {
    let total = scored.len() as f64;
    ranked(scored)
        .into_iter()
        .enumerate()
        .filter(|&(rank, _)| {
            let percentile = (rank + 1) as f64 / total;
            bands.iter().any(|band| band.contains(percentile))
        })
        .map(|(_, idx)| idx)
        .collect()
}

/// Take members by score tier, best tier first.
///
/// Each tier is shuffled, then up to `pool_size` of its members are taken
/// (in `unique` mode, one member per distinct source instead). Exactly
/// `selection_size` members are returned; if one pass over the tiers falls
/// short, the remaining members are pooled again without `unique`.
///
/// # Errors
///
/// Returns an error if `selection_size` is invalid or exceeds the
/// population.
pub fn pooling<R: Rng + ?Sized>(
    scored: &[Scored],
    pool_size: usize,
    selection_size: SelectionSize,
    unique: bool,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let target = selection_size.resolve(scored.len())?;
    let candidates: Vec<usize> = (0..scored.len()).collect();
    Ok(pool_from(scored, &candidates, pool_size.max(1), target, unique, rng))
}

fn pool_from<R: Rng + ?Sized>(
    scored: &[Scored],
    candidates: &[usize],
    pool_size: usize,
    target: usize,
    unique: bool,
    rng: &mut R,
) -> Vec<usize> {
    let mut order = candidates.to_vec();
    order.sort_by(|&a, &b| scored[b].score().total_cmp(&scored[a].score()));

    let mut selected = Vec::with_capacity(target);
    for tier in order.chunk_by(|&a, &b| scored[a].score().total_cmp(&scored[b].score()).is_eq()) {
        let mut tier = tier.to_vec();
        // Equal scores do not mean equal genomes
        tier.shuffle(rng);

        let taken: Vec<usize> = if unique {
            let mut seen: HashSet<&[Token]> = HashSet::new();
            tier.into_iter()
                .filter(|&idx| seen.insert(scored[idx].genome.tokens()))
                .collect()
        } else {
            tier.into_iter().take(pool_size).collect()
        };

        for idx in taken {
            selected.push(idx);
            if selected.len() >= target {
                return selected;
            }
        }
    }

    let taken: HashSet<usize> = selected.iter().copied().collect();
    let remaining: Vec<usize> = candidates
        .iter()
        .copied()
        .filter(|idx| !taken.contains(idx))
        .collect();
    let missing = target - selected.len();
    selected.extend(pool_from(scored, &remaining, pool_size, missing, false, rng));
    selected
}

/// Probability of keeping a member of value `x` when values span
/// `[min, max]`.
///
/// Strictly positive at `min` and strictly below one at `max`, so every
/// member can be both kept and discarded.
#[must_use]
pub fn selection_probability(x: f64, min: f64, max: f64) -> f64 {
    (x - (min - 1.0)) / ((max - (min - 1.0)) + 1.0)
}

/// Bernoulli passes over the members not yet selected until
/// `selection_size` members are kept.
///
/// With `by_rank`, the value of a member is its inverted rank
/// (`total - rank + 1`, the best member has the highest value) instead of
/// its score.
///
/// # Errors
///
/// Returns an error if `selection_size` is invalid or exceeds the
/// population.
pub fn likelihood<R: Rng + ?Sized>(
    scored: &[Scored],
    selection_size: SelectionSize,
    by_rank: bool,
    rng: &mut R,
) -> Result<Vec<usize>> {
    let target = selection_size.resolve(scored.len())?;
    let total = scored.len();

    let values: Vec<f64> = if by_rank {
        let mut values = vec![0.0; total];
        for (rank, idx) in ranked(scored).into_iter().enumerate() {
            values[idx] = (total - rank) as f64;
        }
        values
    } else {
        scored.iter().map(Scored::score).collect()
    };
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut kept = vec![false; total];
    let mut selected = Vec::with_capacity(target);
    while selected.len() < target {
        for idx in 0..total {
            if kept[idx] {
                continue;
            }
            if rng.r#gen::<f64>() < selection_probability(values[idx], min, max) {
                kept[idx] = true;
                selected.push(idx);
                if selected.len() >= target {
                    break;
                }
            }
        }
    }
    Ok(selected)
}

const POOL_SIZES: [(char, usize); 4] = [('S', 2), ('M', 10), ('L', 20), ('D', DEFAULT_POOL_SIZE)];
const SELECTION_FRACTIONS: [(char, f64); 3] = [('1', 0.1), ('D', 0.4), ('6', 0.6)];

fn same_fraction(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn size_code(size: SelectionSize) -> String {
    match size {
        SelectionSize::Fraction(fraction) => SELECTION_FRACTIONS
            .iter()
            .find(|(_, f)| same_fraction(*f, fraction))
            .map_or_else(|| format!("F{fraction}"), |(c, _)| c.to_string()),
        SelectionSize::Count(count) => format!("N{count}"),
    }
}

fn parse_size(code: &str) -> Option<SelectionSize> {
    if let Some(fraction) = code.strip_prefix('F') {
        return fraction.parse().ok().map(SelectionSize::Fraction);
    }
    if let Some(count) = code.strip_prefix('N') {
        return count.parse().ok().map(SelectionSize::Count);
    }
    let mut chars = code.chars();
    let letter = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    SELECTION_FRACTIONS
        .iter()
        .find(|(c, _)| *c == letter)
        .map(|&(_, fraction)| SelectionSize::Fraction(fraction))
}

/// `RS` followed by `start-stop` bands joined by `+`, e.g. `RS0-0.25+0.5-0.6`.
fn bands_code(bands: &[Band]) -> String {
    let bands: Vec<String> = bands.iter().map(|b| format!("{}-{}", b.start, b.stop)).collect();
    format!("RS{}", bands.join("+"))
}

fn parse_bands(code: &str) -> Option<Vec<Band>> {
    code.split('+')
        .filter(|band| !band.is_empty())
        .map(|band| {
            let (start, stop) = band.split_once('-')?;
            Band::new(start.parse().ok()?, stop.parse().ok()?).ok()
        })
        .collect()
}

/// `PL` then a pool letter or `P<n>_`, a size code, and an optional `U`.
fn parse_pooling(code: &str) -> Option<SelectionStrategy> {
    let (code, unique) = code.strip_suffix('U').map_or((code, false), |rest| (rest, true));
    let (pool_size, size) = if let Some(rest) = code.strip_prefix('P') {
        let (pool_size, size) = rest.split_once('_')?;
        (pool_size.parse().ok()?, size)
    } else {
        let letter = code.chars().next()?;
        let pool_size = POOL_SIZES.iter().find(|(c, _)| *c == letter)?.1;
        (pool_size, &code[letter.len_utf8()..])
    };
    Some(SelectionStrategy::Pooling {
        pool_size,
        selection_size: parse_size(size)?,
        unique,
    })
}

/// `PF`, an optional size code, and an optional `R`.
fn parse_likelihood(code: &str) -> Option<SelectionStrategy> {
    let (code, by_rank) = code.strip_suffix('R').map_or((code, false), |rest| (rest, true));
    let selection_size = if code.is_empty() {
        DEFAULT_SELECTION_SIZE
    } else {
        parse_size(code)?
    };
    Some(SelectionStrategy::Likelihood {
        selection_size,
        by_rank,
    })
}

fn ranking_patterns() -> Vec<(&'static str, Vec<Band>)> {
    vec![
        ("D", vec![Band::fixed(0.0, 0.4)]),
        ("2", vec![Band::fixed(0.0, 0.3), Band::fixed(0.45, 0.55)]),
        ("B1", vec![Band::fixed(0.0, 0.5)]),
    ]
}

impl Strategy for SelectionStrategy {
    const ROLE: Role = Role::Select;

    fn named() -> Vec<(String, Self)> {
        let mut named = Vec::new();
        for (suffix, bands) in ranking_patterns() {
            named.push((format!("RS{suffix}"), Self::RankingSlices { bands }));
        }
        for (pool_code, pool_size) in POOL_SIZES {
            for (size_code, fraction) in SELECTION_FRACTIONS {
                for unique in [false, true] {
                    let code = format!("PL{pool_code}{size_code}{}", if unique { "U" } else { "" });
                    named.push((
                        code,
                        Self::Pooling {
                            pool_size,
                            selection_size: SelectionSize::Fraction(fraction),
                            unique,
                        },
                    ));
                }
            }
        }
        for by_rank in [false, true] {
            let strategy = Self::Likelihood {
                selection_size: DEFAULT_SELECTION_SIZE,
                by_rank,
            };
            named.push((strategy.code(), strategy));
        }
        named
    }

    fn defaults() -> Vec<Self> {
        // Aliases ("PLD..") would double the weight of their canonical code
        Self::named()
            .into_iter()
            .filter(|(code, strategy)| *code == strategy.code())
            .map(|(_, strategy)| strategy)
            .collect()
    }

    fn code(&self) -> String {
        match self {
            Self::RankingSlices { bands } => ranking_patterns()
                .into_iter()
                .find(|(_, pattern)| pattern == bands)
                .map_or_else(|| bands_code(bands), |(suffix, _)| format!("RS{suffix}")),
            Self::Pooling {
                pool_size,
                selection_size,
                unique,
            } => {
                let pool = POOL_SIZES
                    .iter()
                    .find(|(_, size)| size == pool_size)
                    .map_or_else(|| format!("P{pool_size}_"), |(c, _)| c.to_string());
                format!(
                    "PL{pool}{}{}",
                    size_code(*selection_size),
                    if *unique { "U" } else { "" }
                )
            }
            Self::Likelihood {
                selection_size,
                by_rank,
            } => {
                let size = if *selection_size == DEFAULT_SELECTION_SIZE {
                    String::new()
                } else {
                    size_code(*selection_size)
                };
                format!("PF{size}{}", if *by_rank { "R" } else { "" })
            }
        }
    }

    fn parse_code(code: &str) -> Option<Self> {
        if let Some(rest) = code.strip_prefix("RS") {
            return parse_bands(rest).map(|bands| Self::RankingSlices { bands });
        }
        if let Some(rest) = code.strip_prefix("PL") {
            return parse_pooling(rest);
        }
        code.strip_prefix("PF").and_then(parse_likelihood)
    }
}
