//! Problem definitions: quality functions and their orderings.
//!
//! A problem maps a solution to a quality and knows how to compare
//! qualities. Solvers that rank candidates on a single scale (CMA-ES,
//! particle swarm, speciation) additionally need a [`TotalOrderProblem`].

use crate::error::{SolverError, SolverResult};
use crate::order::{natural_order, pareto_dominance, PartialComparatorOutcome};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type QualityFn<S, Q> = Arc<dyn Fn(&S) -> SolverResult<Q> + Send + Sync>;

/// An optimization problem over solutions of type [`Solution`](Self::Solution).
///
/// # Thread Safety
///
/// Problems are shared across the evaluation pool, hence `Send + Sync`.
pub trait Problem: Send + Sync + 'static {
    /// The phenotype being evaluated.
    type Solution: Clone + Send + Sync + 'static;

    /// The fitness or cost of a solution.
    type Quality: Clone + Send + Sync + fmt::Debug + 'static;

    /// Computes the quality of `solution`.
    ///
    /// Called concurrently from the evaluation pool. An error aborts the
    /// whole generation.
    fn quality(&self, solution: &Self::Solution) -> SolverResult<Self::Quality>;

    /// Compares two qualities; `Before` means `a` is better.
    fn compare(
        &self,
        a: &Self::Quality,
        b: &Self::Quality,
    ) -> SolverResult<PartialComparatorOutcome>;

    /// Quality on held-out data, when the problem has any.
    ///
    /// The default returns `None`.
    fn validation_quality(&self, _solution: &Self::Solution) -> Option<SolverResult<Self::Quality>> {
        None
    }
}

/// A problem whose qualities are totally ordered, lower first.
pub trait TotalOrderProblem: Problem {
    fn total_order(&self, a: &Self::Quality, b: &Self::Quality) -> Ordering;
}

/// Single-objective minimization over any `PartialOrd` quality.
///
/// Incomparable qualities (e.g. `NaN`) are `NotComparable` under
/// [`compare`](Problem::compare). Under
/// [`total_order`](TotalOrderProblem::total_order), a quality that is not
/// comparable to itself sorts after every other one.
///
/// # Example
///
/// ```
/// use u_popsearch::problem::{MinimizeProblem, Problem};
///
/// let sphere = MinimizeProblem::new(|x: &Vec<f64>| x.iter().map(|v| v * v).sum::<f64>());
/// assert_eq!(sphere.quality(&vec![1.0, 2.0]).unwrap(), 5.0);
/// ```
pub struct MinimizeProblem<S, Q> {
    quality: QualityFn<S, Q>,
    validation: Option<QualityFn<S, Q>>,
}

impl<S, Q> MinimizeProblem<S, Q>
where
    S: Clone + Send + Sync + 'static,
    Q: PartialOrd + Clone + Send + Sync + fmt::Debug + 'static,
{
    /// Builds a problem from an infallible quality function.
    pub fn new<F>(quality: F) -> Self
    where
        F: Fn(&S) -> Q + Send + Sync + 'static,
    {
        Self::try_new(move |s| Ok(quality(s)))
    }

    /// Builds a problem from a quality function that may fail.
    pub fn try_new<F>(quality: F) -> Self
    where
        F: Fn(&S) -> SolverResult<Q> + Send + Sync + 'static,
    {
        Self {
            quality: Arc::new(quality),
            validation: None,
        }
    }

    /// Attaches a validation quality function.
    pub fn with_validation<F>(mut self, validation: F) -> Self
    where
        F: Fn(&S) -> Q + Send + Sync + 'static,
    {
        self.validation = Some(Arc::new(move |s: &S| Ok::<Q, SolverError>(validation(s))));
        self
    }
}

impl<S, Q> Problem for MinimizeProblem<S, Q>
where
    S: Clone + Send + Sync + 'static,
    Q: PartialOrd + Clone + Send + Sync + fmt::Debug + 'static,
{
    type Solution = S;
    type Quality = Q;

    fn quality(&self, solution: &S) -> SolverResult<Q> {
        (self.quality)(solution)
    }

    fn compare(&self, a: &Q, b: &Q) -> SolverResult<PartialComparatorOutcome> {
        Ok(natural_order(a, b))
    }

    fn validation_quality(&self, solution: &S) -> Option<SolverResult<Q>> {
        self.validation.as_ref().map(|f| f(solution))
    }
}

impl<S, Q> TotalOrderProblem for MinimizeProblem<S, Q>
where
    S: Clone + Send + Sync + 'static,
    Q: PartialOrd + Clone + Send + Sync + fmt::Debug + 'static,
{
    fn total_order(&self, a: &Q, b: &Q) -> Ordering {
        let ordered = |q: &Q| q.partial_cmp(q).is_some();
        match (ordered(a), ordered(b)) {
            (true, true) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => Ordering::Equal,
        }
    }
}

/// Multi-objective minimization under Pareto dominance.
///
/// Objective vectors of differing length fail at comparison time.
pub struct ParetoProblem<S> {
    objectives: Arc<dyn Fn(&S) -> Vec<f64> + Send + Sync>,
}

impl<S> ParetoProblem<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new<F>(objectives: F) -> Self
    where
        F: Fn(&S) -> Vec<f64> + Send + Sync + 'static,
    {
        Self {
            objectives: Arc::new(objectives),
        }
    }
}

impl<S> Problem for ParetoProblem<S>
where
    S: Clone + Send + Sync + 'static,
{
    type Solution = S;
    type Quality = Vec<f64>;

    fn quality(&self, solution: &S) -> SolverResult<Vec<f64>> {
        Ok((self.objectives)(solution))
    }

    fn compare(&self, a: &Vec<f64>, b: &Vec<f64>) -> SolverResult<PartialComparatorOutcome> {
        pareto_dominance(a, b)
    }
}
