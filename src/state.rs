//! Immutable per-iteration run state and stop conditions.
//!
//! A [`RunState`] is a snapshot: solvers never mutate one, they build its
//! successor with [`RunState::advance`]. Listeners and stop conditions only
//! ever see shared references.

use crate::error::SolverResult;
use crate::individual::Individual;
use crate::order::PartialOrderSet;
use crate::problem::Problem;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The individual type produced for problem `P` from genotypes `G`.
pub type IndividualOf<P, G> = Individual<G, <P as Problem>::Solution, <P as Problem>::Quality>;

/// A population ordered by the problem's quality comparator.
pub type Population<P, G> = PartialOrderSet<IndividualOf<P, G>>;

/// Builds a population ordered by `problem`'s quality comparator.
pub fn population_set<P, G, I>(problem: &Arc<P>, individuals: I) -> SolverResult<Population<P, G>>
where
    P: Problem,
    G: Send + Sync + 'static,
    I: IntoIterator<Item = IndividualOf<P, G>>,
{
    let problem = Arc::clone(problem);
    let mut set = PartialOrderSet::new(move |a: &IndividualOf<P, G>, b: &IndividualOf<P, G>| {
        problem.compare(a.quality(), b.quality())
    });
    set.add_all(individuals)?;
    Ok(set)
}

type StopPredicate<P, G> = Arc<dyn Fn(&RunState<P, G>) -> bool + Send + Sync>;

/// A composable predicate deciding when a run terminates.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use u_popsearch::problem::MinimizeProblem;
/// use u_popsearch::state::StopCondition;
///
/// type P = MinimizeProblem<Vec<f64>, f64>;
/// let stop = StopCondition::<P, Vec<f64>>::iterations(100)
///     .or(StopCondition::elapsed(Duration::from_secs(5)))
///     .or(StopCondition::target_quality(|q: &f64| *q < 1e-9));
/// # let _ = stop;
/// ```
pub struct StopCondition<P: Problem, G> {
    predicate: StopPredicate<P, G>,
}

impl<P: Problem, G: Send + Sync + 'static> StopCondition<P, G> {
    /// Wraps an arbitrary predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&RunState<P, G>) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }

    /// Never stops on its own; combine with another condition.
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    /// Stops once `n` iterations have completed.
    pub fn iterations(n: u64) -> Self {
        Self::new(move |s| s.iterations() >= n)
    }

    /// Stops once `n` individuals have been born.
    pub fn births(n: u64) -> Self {
        Self::new(move |s| s.births() >= n)
    }

    /// Stops once `n` quality evaluations have been performed.
    pub fn quality_evaluations(n: u64) -> Self {
        Self::new(move |s| s.quality_evaluations() >= n)
    }

    /// Stops once the run has lasted at least `limit`.
    pub fn elapsed(limit: Duration) -> Self {
        Self::new(move |s| s.elapsed() >= limit)
    }

    /// Stops once any non-dominated individual satisfies `target`.
    pub fn target_quality<F>(target: F) -> Self
    where
        F: Fn(&P::Quality) -> bool + Send + Sync + 'static,
    {
        Self::new(move |s| s.population().firsts().iter().any(|i| target(i.quality())))
    }

    /// Stops when both conditions hold.
    pub fn and(self, other: Self) -> Self {
        let (a, b) = (self.predicate, other.predicate);
        Self::new(move |s| a(s) && b(s))
    }

    /// Stops when either condition holds.
    pub fn or(self, other: Self) -> Self {
        let (a, b) = (self.predicate, other.predicate);
        Self::new(move |s| a(s) || b(s))
    }

    /// Negation.
    pub fn not(self) -> Self {
        let a = self.predicate;
        Self::new(move |s| !a(s))
    }
}

impl<P: Problem, G> StopCondition<P, G> {
    pub fn test(&self, state: &RunState<P, G>) -> bool {
        (self.predicate)(state)
    }
}

impl<P: Problem, G> Clone for StopCondition<P, G> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<P: Problem, G> fmt::Debug for StopCondition<P, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StopCondition")
    }
}

/// Snapshot of a run after some number of iterations.
pub struct RunState<P: Problem, G> {
    started_at: Instant,
    elapsed: Duration,
    iterations: u64,
    births: u64,
    quality_evaluations: u64,
    problem: Arc<P>,
    stop_condition: StopCondition<P, G>,
    population: Population<P, G>,
}

impl<P: Problem, G> RunState<P, G> {
    /// The state right after initialization. Every member of `population`
    /// counts as one birth and one quality evaluation.
    pub fn new(
        problem: Arc<P>,
        stop_condition: StopCondition<P, G>,
        population: Population<P, G>,
    ) -> Self {
        let n = population.len() as u64;
        Self {
            started_at: Instant::now(),
            elapsed: Duration::ZERO,
            iterations: 0,
            births: n,
            quality_evaluations: n,
            problem,
            stop_condition,
            population,
        }
    }

    /// The successor state after one more iteration.
    pub fn advance(
        &self,
        population: Population<P, G>,
        new_births: u64,
        new_quality_evaluations: u64,
    ) -> Self {
        Self {
            started_at: self.started_at,
            elapsed: self.started_at.elapsed(),
            iterations: self.iterations + 1,
            births: self.births + new_births,
            quality_evaluations: self.quality_evaluations + new_quality_evaluations,
            problem: Arc::clone(&self.problem),
            stop_condition: self.stop_condition.clone(),
            population,
        }
    }

    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Wall-clock time between the start of the run and this snapshot.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn births(&self) -> u64 {
        self.births
    }

    pub fn quality_evaluations(&self) -> u64 {
        self.quality_evaluations
    }

    pub fn problem(&self) -> &Arc<P> {
        &self.problem
    }

    pub fn stop_condition(&self) -> &StopCondition<P, G> {
        &self.stop_condition
    }

    pub fn population(&self) -> &Population<P, G> {
        &self.population
    }

    /// Whether the stop condition holds for this snapshot.
    pub fn should_stop(&self) -> bool {
        self.stop_condition.test(self)
    }
}

impl<P: Problem, G> fmt::Debug for RunState<P, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunState")
            .field("elapsed", &self.elapsed)
            .field("iterations", &self.iterations)
            .field("births", &self.births)
            .field("quality_evaluations", &self.quality_evaluations)
            .field("population", &self.population.len())
            .finish()
    }
}

/// Any solver state; exposes the shared run bookkeeping.
pub trait SolverState {
    type Problem: Problem;
    type Genotype;

    fn run(&self) -> &RunState<Self::Problem, Self::Genotype>;
}

impl<P: Problem, G> SolverState for RunState<P, G> {
    type Problem = P;
    type Genotype = G;

    fn run(&self) -> &RunState<P, G> {
        self
    }
}
