//! Partial comparison outcomes and stock comparators.

use crate::error::{SolverError, SolverResult};
use std::cmp::Ordering;

/// Result of comparing two values under a partial order.
///
/// `Before` means the left value precedes (is better than, dominates) the
/// right one. Comparators must be antisymmetric: `compare(a, b) == Before`
/// implies `compare(b, a) == After`. Transitivity is not required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PartialComparatorOutcome {
    /// Left precedes right.
    Before,
    /// Right precedes left.
    After,
    /// Equivalent under the order.
    Same,
    /// Neither precedes the other.
    NotComparable,
}

impl PartialComparatorOutcome {
    /// The outcome of the same comparison with operands swapped.
    pub fn reverse(self) -> Self {
        match self {
            Self::Before => Self::After,
            Self::After => Self::Before,
            other => other,
        }
    }

    /// Maps a total-order result (lower is better) to an outcome.
    pub fn from_ordering(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Self::Before,
            Ordering::Greater => Self::After,
            Ordering::Equal => Self::Same,
        }
    }
}

/// Compares two values under their natural order, lower first.
///
/// Values without a defined order (e.g. `NaN`) are `NotComparable`.
pub fn natural_order<T: PartialOrd + ?Sized>(a: &T, b: &T) -> PartialComparatorOutcome {
    a.partial_cmp(b)
        .map(PartialComparatorOutcome::from_ordering)
        .unwrap_or(PartialComparatorOutcome::NotComparable)
}

/// Pareto dominance between two objective vectors (all minimized).
///
/// `a` is `Before` `b` when it is no worse in every objective and strictly
/// better in at least one. Identical vectors are `Same`.
///
/// # Errors
///
/// [`SolverError::InvalidInput`] when the vectors differ in length.
pub fn pareto_dominance(a: &[f64], b: &[f64]) -> SolverResult<PartialComparatorOutcome> {
    if a.len() != b.len() {
        return Err(SolverError::input(format!(
            "objective vectors differ in length: {} vs {}",
            a.len(),
            b.len()
        )));
    }

    let mut a_better_in_some = false;
    let mut b_better_in_some = false;

    for (&va, &vb) in a.iter().zip(b.iter()) {
        if va < vb {
            a_better_in_some = true;
        } else if vb < va {
            b_better_in_some = true;
        } else if va.is_nan() || vb.is_nan() {
            return Ok(PartialComparatorOutcome::NotComparable);
        }
    }

    Ok(match (a_better_in_some, b_better_in_some) {
        (true, false) => PartialComparatorOutcome::Before,
        (false, true) => PartialComparatorOutcome::After,
        (false, false) => PartialComparatorOutcome::Same,
        (true, true) => PartialComparatorOutcome::NotComparable,
    })
}
