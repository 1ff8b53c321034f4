//! Batch non-dominated sorting over objective vectors.
//!
//! Independent of [`PartialOrderSet`](super::PartialOrderSet): works on
//! indices and assigns a rank to every vector in one pass.
//!
//! # References
//!
//! - Deb et al. (2002), "A Fast and Elitist Multiobjective Genetic Algorithm: NSGA-II"
//! - IEEE Transactions on Evolutionary Computation, 6(2), 182-197

use super::comparator::{pareto_dominance, PartialComparatorOutcome};
use crate::error::SolverResult;

/// Result of non-dominated sorting.
///
/// Each element of `ranks` corresponds to the Pareto rank of the solution
/// at the same index. Rank 0 is the Pareto front (non-dominated solutions).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NondominatedSortResult {
    /// Pareto rank for each solution (0 = front).
    pub ranks: Vec<usize>,

    /// Indices grouped by front: `fronts[0]` contains rank-0 indices, etc.
    pub fronts: Vec<Vec<usize>>,
}

/// Fast non-dominated sorting.
///
/// All objectives are **minimized**. Identical vectors share a rank.
///
/// # Complexity
///
/// O(m * n²) where m = number of objectives, n = number of solutions
///
/// # Errors
///
/// [`SolverError::InvalidInput`](crate::SolverError::InvalidInput) when two
/// vectors differ in length.
///
/// # Example
///
/// ```
/// use u_popsearch::order::non_dominated_sort;
///
/// let objectives = vec![
///     vec![1.0, 5.0],
///     vec![3.0, 3.0],
///     vec![5.0, 1.0],
///     vec![4.0, 4.0], // dominated by (3, 3)
/// ];
///
/// let result = non_dominated_sort(&objectives).unwrap();
/// assert_eq!(result.ranks, vec![0, 0, 0, 1]);
/// ```
pub fn non_dominated_sort(objectives: &[Vec<f64>]) -> SolverResult<NondominatedSortResult> {
    let n = objectives.len();
    if n == 0 {
        return Ok(NondominatedSortResult {
            ranks: Vec::new(),
            fronts: Vec::new(),
        });
    }

    let mut domination_count = vec![0usize; n];
    let mut dominates: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut ranks = vec![0usize; n];

    for i in 0..n {
        for j in (i + 1)..n {
            match pareto_dominance(&objectives[i], &objectives[j])? {
                PartialComparatorOutcome::Before => {
                    dominates[i].push(j);
                    domination_count[j] += 1;
                }
                PartialComparatorOutcome::After => {
                    dominates[j].push(i);
                    domination_count[i] += 1;
                }
                _ => {}
            }
        }
    }

    let mut current: Vec<usize> = (0..n).filter(|&i| domination_count[i] == 0).collect();
    let mut fronts = Vec::new();

    while !current.is_empty() {
        let mut next = Vec::new();
        for &i in &current {
            for &j in &dominates[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    ranks[j] = fronts.len() + 1;
                    next.push(j);
                }
            }
        }
        fronts.push(current);
        current = next;
    }

    Ok(NondominatedSortResult { ranks, fronts })
}
