//! Parent selection over partially ordered populations.
//!
//! Selection determines which individuals are chosen as parents. Since the
//! population is only partially ordered, "better" means "in an earlier
//! front".
//!
//! # References
//!
//! - Blickle & Thiele (1996), "A Comparison of Selection Schemes used in
//!   Evolutionary Algorithms"

use crate::order::PartialOrderSet;
use rand::{Rng, RngCore};

/// Selection strategy for choosing parents.
///
/// # Examples
///
/// ```
/// use u_popsearch::selection::Selection;
///
/// // Tournament with size 3 (moderate selection pressure)
/// let sel = Selection::Tournament(3);
///
/// // Uniformly among the non-dominated
/// let sel = Selection::Firsts;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Selection {
    /// Tournament selection: pick `k` individuals at random (with
    /// replacement), keep the one in the earliest front. Ties go to the
    /// first drawn.
    ///
    /// Higher `k` = stronger selection pressure.
    Tournament(usize),

    /// Uniformly at random among all individuals.
    Uniform,

    /// Uniformly at random among the non-dominated individuals.
    Firsts,

    /// Uniformly at random among the most dominated individuals.
    Lasts,
}

impl Default for Selection {
    fn default() -> Self {
        Selection::Tournament(3)
    }
}

impl Selection {
    /// Selects one element of `set`, or `None` when `set` is empty.
    pub fn select<'a, T>(&self, set: &'a PartialOrderSet<T>, rng: &mut dyn RngCore) -> Option<&'a T> {
        if set.is_empty() {
            return None;
        }

        match self {
            Selection::Tournament(k) => tournament(set, *k, rng),
            Selection::Uniform => pick_uniform(&set.all(), rng),
            Selection::Firsts => pick_uniform(&set.firsts(), rng),
            Selection::Lasts => pick_uniform(&set.lasts(), rng),
        }
    }
}

fn pick_uniform<'a, T>(candidates: &[&'a T], rng: &mut dyn RngCore) -> Option<&'a T> {
    if candidates.is_empty() {
        return None;
    }
    Some(candidates[rng.random_range(0..candidates.len())])
}

/// Tournament selection: pick k random members, return the best-ranked.
fn tournament<'a, T>(set: &'a PartialOrderSet<T>, k: usize, rng: &mut dyn RngCore) -> Option<&'a T> {
    let k = k.max(1);
    let ranked: Vec<(usize, &T)> = set
        .fronts()
        .into_iter()
        .enumerate()
        .flat_map(|(rank, front)| front.into_iter().map(move |t| (rank, t)))
        .collect();
    let n = ranked.len();

    let mut best = rng.random_range(0..n);
    for _ in 1..k {
        let idx = rng.random_range(0..n);
        if ranked[idx].0 < ranked[best].0 {
            best = idx;
        }
    }
    Some(ranked[best].1)
}
