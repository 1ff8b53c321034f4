//! Genetic operators and weighted operator sets.
//!
//! An operator turns a fixed number of parent genotypes into one or more
//! child genotypes. Solvers draw the operator to apply from an
//! [`OperatorSet`] with probability proportional to its weight.
//!
//! # Built-in Operators
//!
//! - [`GaussianMutation`]: additive normal noise on real vectors (arity 1)
//! - [`UniformCrossover`]: biased per-gene inheritance (arity 2), as in
//!   BRKGA (Goncalves & Resende, 2011)
//! - [`FnOperator`]: any closure with a declared arity

use crate::error::{SolverError, SolverResult};
use rand::{Rng, RngCore};
use rand_distr::{Distribution, StandardNormal};
use std::fmt;
use std::sync::Arc;

/// Produces child genotypes from exactly [`arity`](Self::arity) parents.
pub trait GeneticOperator<G>: Send + Sync {
    /// Number of parents consumed per application. Must be positive.
    fn arity(&self) -> usize;

    /// Applies the operator. `parents.len()` equals [`arity`](Self::arity).
    fn apply(&self, parents: &[G], rng: &mut dyn RngCore) -> Vec<G>;
}

type OperatorFn<G> = dyn Fn(&[G], &mut dyn RngCore) -> Vec<G> + Send + Sync;

/// A closure-backed operator.
///
/// ```
/// use u_popsearch::operator::{FnOperator, GeneticOperator};
///
/// let average = FnOperator::new(2, |p: &[Vec<f64>], _rng| {
///     vec![p[0].iter().zip(&p[1]).map(|(a, b)| (a + b) / 2.0).collect()]
/// });
/// assert_eq!(average.arity(), 2);
/// ```
pub struct FnOperator<G> {
    arity: usize,
    f: Arc<OperatorFn<G>>,
}

impl<G> FnOperator<G> {
    pub fn new<F>(arity: usize, f: F) -> Self
    where
        F: Fn(&[G], &mut dyn RngCore) -> Vec<G> + Send + Sync + 'static,
    {
        Self {
            arity,
            f: Arc::new(f),
        }
    }
}

impl<G> GeneticOperator<G> for FnOperator<G> {
    fn arity(&self) -> usize {
        self.arity
    }

    fn apply(&self, parents: &[G], rng: &mut dyn RngCore) -> Vec<G> {
        (self.f)(parents, rng)
    }
}

/// Adds `N(0, sigma²)` noise to every gene of a real vector.
#[derive(Debug, Clone, Copy)]
pub struct GaussianMutation {
    pub sigma: f64,
}

impl GeneticOperator<Vec<f64>> for GaussianMutation {
    fn arity(&self) -> usize {
        1
    }

    fn apply(&self, parents: &[Vec<f64>], rng: &mut dyn RngCore) -> Vec<Vec<f64>> {
        let child = parents[0]
            .iter()
            .map(|&x| {
                let z: f64 = StandardNormal.sample(rng);
                x + self.sigma * z
            })
            .collect();
        vec![child]
    }
}

/// Per-gene inheritance: each gene comes from the first parent with
/// probability `bias`, otherwise from the second.
///
/// `bias = 0.5` is plain uniform crossover. Parents of differing length
/// yield no child, which solvers report as
/// [`SolverError::InvalidInput`].
#[derive(Debug, Clone, Copy)]
pub struct UniformCrossover {
    pub bias: f64,
}

impl Default for UniformCrossover {
    fn default() -> Self {
        Self { bias: 0.5 }
    }
}

impl<T: Clone + Send + Sync> GeneticOperator<Vec<T>> for UniformCrossover {
    fn arity(&self) -> usize {
        2
    }

    fn apply(&self, parents: &[Vec<T>], rng: &mut dyn RngCore) -> Vec<Vec<T>> {
        if parents[0].len() != parents[1].len() {
            return Vec::new();
        }
        let child = parents[0]
            .iter()
            .zip(parents[1].iter())
            .map(|(a, b)| {
                if rng.random_range(0.0..1.0) < self.bias {
                    a.clone()
                } else {
                    b.clone()
                }
            })
            .collect();
        vec![child]
    }
}

/// A weighted collection of operators.
///
/// # Example
///
/// ```
/// use u_popsearch::operator::{GaussianMutation, OperatorSet, UniformCrossover};
///
/// let ops = OperatorSet::new()
///     .with(GaussianMutation { sigma: 0.1 }, 0.2)
///     .with(UniformCrossover::default(), 0.8);
/// assert!(ops.validate().is_ok());
/// ```
pub struct OperatorSet<G> {
    entries: Vec<(Arc<dyn GeneticOperator<G>>, f64)>,
}

impl<G> OperatorSet<G> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds `operator` with selection weight `weight`.
    pub fn with<O>(mut self, operator: O, weight: f64) -> Self
    where
        O: GeneticOperator<G> + 'static,
    {
        self.entries.push((Arc::new(operator), weight));
        self
    }

    /// Adds an already shared operator.
    pub fn with_shared(mut self, operator: Arc<dyn GeneticOperator<G>>, weight: f64) -> Self {
        self.entries.push((operator, weight));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Largest arity among the operators (0 when empty).
    pub fn max_arity(&self) -> usize {
        self.entries.iter().map(|(op, _)| op.arity()).max().unwrap_or(0)
    }

    /// Rejects empty sets, zero-arity operators and non-positive weights.
    pub fn validate(&self) -> SolverResult<()> {
        if self.entries.is_empty() {
            return Err(SolverError::config("operator set must not be empty"));
        }
        for (i, (op, weight)) in self.entries.iter().enumerate() {
            if op.arity() == 0 {
                return Err(SolverError::config(format!("operator {i} has arity 0")));
            }
            if !(weight.is_finite() && *weight > 0.0) {
                return Err(SolverError::config(format!(
                    "operator {i} weight must be positive and finite, got {weight}"
                )));
            }
        }
        Ok(())
    }

    /// Draws an operator with probability proportional to its weight.
    ///
    /// # Panics
    /// Panics if the set is empty (sets are validated at solver construction).
    pub fn pick(&self, rng: &mut dyn RngCore) -> &dyn GeneticOperator<G> {
        assert!(!self.entries.is_empty(), "cannot pick from empty operator set");

        let total: f64 = self.entries.iter().map(|(_, w)| w).sum();
        let threshold = rng.random_range(0.0..total);
        let mut cumulative = 0.0;
        for (op, w) in &self.entries {
            cumulative += w;
            if cumulative > threshold {
                return op.as_ref();
            }
        }

        // floating-point fallback
        self.entries[self.entries.len() - 1].0.as_ref()
    }
}

impl<G> Default for OperatorSet<G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<G> Clone for OperatorSet<G> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<G> fmt::Debug for OperatorSet<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(op, w)| (op.arity(), w)))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::create_rng;

    #[test]
    fn test_gaussian_mutation_perturbs() {
        let mut rng = create_rng(42);
        let op = GaussianMutation { sigma: 0.1 };
        let child = &op.apply(&[vec![1.0, 2.0, 3.0]], &mut rng)[0];
        assert_eq!(child.len(), 3);
        assert!(child.iter().zip([1.0, 2.0, 3.0]).any(|(a, b)| (a - b).abs() > 0.0));
        assert!(child.iter().zip([1.0, 2.0, 3.0]).all(|(a, b)| (a - b).abs() < 1.0));
    }

    #[test]
    fn test_gaussian_zero_sigma_is_identity() {
        let mut rng = create_rng(1);
        let op = GaussianMutation { sigma: 0.0 };
        assert_eq!(op.apply(&[vec![1.5, -2.0]], &mut rng), vec![vec![1.5, -2.0]]);
    }

    #[test]
    fn test_uniform_crossover_takes_from_parents() {
        let mut rng = create_rng(42);
        let op = UniformCrossover::default();
        let a = vec![0u8; 32];
        let b = vec![1u8; 32];
        let child = &op.apply(&[a, b], &mut rng)[0];
        assert_eq!(child.len(), 32);
        assert!(child.contains(&0) && child.contains(&1));
    }

    #[test]
    fn test_full_bias_copies_first_parent() {
        let mut rng = create_rng(3);
        let op = UniformCrossover { bias: 1.0 };
        let child = &op.apply(&[vec![1, 2, 3], vec![4, 5, 6]], &mut rng)[0];
        assert_eq!(child, &vec![1, 2, 3]);
    }

    #[test]
    fn test_uniform_crossover_rejects_mismatched_parents() {
        let mut rng = create_rng(3);
        let op = UniformCrossover::default();
        assert!(op.apply(&[vec![1, 2, 3], vec![4, 5]], &mut rng).is_empty());
    }

    #[test]
    fn test_validate() {
        assert!(OperatorSet::<Vec<f64>>::new().validate().is_err());

        let zero_arity = OperatorSet::new().with(FnOperator::new(0, |_: &[u8], _| vec![]), 1.0);
        assert!(zero_arity.validate().is_err());

        let bad_weight = OperatorSet::new().with(GaussianMutation { sigma: 1.0 }, 0.0);
        assert!(bad_weight.validate().is_err());

        let ok = OperatorSet::new().with(GaussianMutation { sigma: 1.0 }, 2.0);
        assert!(ok.validate().is_ok());
        assert_eq!(ok.max_arity(), 1);
    }

    #[test]
    fn test_pick_follows_weights() {
        let mut rng = create_rng(42);
        let ops: OperatorSet<Vec<f64>> = OperatorSet::new()
            .with(GaussianMutation { sigma: 1.0 }, 1.0)
            .with(UniformCrossover::default(), 9.0);

        let n = 10_000;
        let crossovers = (0..n).filter(|_| ops.pick(&mut rng).arity() == 2).count();
        assert!(
            crossovers > 8_500 && crossovers < 9_500,
            "expected ~90% crossovers, got {crossovers}/{n}"
        );
    }
}
