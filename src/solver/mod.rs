//! Generic iterative solver loop.
//!
//! Every solver in this crate follows the same lifecycle:
//!
//! 1. [`init`](IterativeSolver::init) builds the initial population through a
//!    [`Breeder`] and wraps it in the first state.
//! 2. [`update`](IterativeSolver::update) builds the successor state; the
//!    previous one is never mutated.
//! 3. The loop ends once [`terminate`](IterativeSolver::terminate) holds,
//!    by default when the run's [`StopCondition`](crate::state::StopCondition)
//!    is met.
//!
//! All randomness flows from the single generator handed to
//! [`solve`](IterativeSolver::solve). Parallel work draws its sub-seeds from
//! it sequentially before dispatch (see [`fan_out`]), so results do not
//! depend on the size of the thread pool.

mod evaluation;

pub use evaluation::{fan_out, Breeder, GenotypeUnit};

use crate::error::SolverResult;
use crate::problem::Problem;
use crate::state::{IndividualOf, SolverState};
use rand::Rng;
use rayon::ThreadPool;
use std::sync::Arc;

/// A population-based solver for problems of type `P`.
pub trait IterativeSolver<P: Problem> {
    /// Encoded representation the solver searches over.
    type Genotype: Clone + Send + Sync + 'static;

    /// Per-iteration snapshot.
    type State: SolverState<Problem = P, Genotype = Self::Genotype>;

    /// Builds the initial state.
    fn init<R: Rng>(
        &self,
        problem: Arc<P>,
        rng: &mut R,
        pool: &ThreadPool,
    ) -> SolverResult<Self::State>;

    /// Builds the state following `state`.
    fn update<R: Rng>(
        &self,
        rng: &mut R,
        pool: &ThreadPool,
        state: &Self::State,
    ) -> SolverResult<Self::State>;

    /// Whether the run is over.
    fn terminate(&self, state: &Self::State) -> bool {
        state.run().should_stop()
    }

    /// Solutions of the non-dominated individuals of `state`.
    fn extract_solutions(&self, state: &Self::State) -> Vec<P::Solution> {
        state
            .run()
            .population()
            .firsts()
            .into_iter()
            .map(|ind| ind.solution().clone())
            .collect()
    }

    /// Runs until termination and returns the final non-dominated solutions.
    fn solve<R: Rng>(
        &self,
        problem: Arc<P>,
        rng: &mut R,
        pool: &ThreadPool,
    ) -> SolverResult<Vec<P::Solution>> {
        self.solve_with_listener(problem, rng, pool, |_| {})
    }

    /// Like [`solve`](Self::solve), calling `listener` with every state,
    /// the initial one included.
    fn solve_with_listener<R, L>(
        &self,
        problem: Arc<P>,
        rng: &mut R,
        pool: &ThreadPool,
        mut listener: L,
    ) -> SolverResult<Vec<P::Solution>>
    where
        R: Rng,
        L: FnMut(&Self::State),
    {
        let mut state = self.init(problem, rng, pool)?;
        listener(&state);

        while !self.terminate(&state) {
            state = self.update(rng, pool, &state)?;
            listener(&state);
        }

        let run = state.run();
        log::info!(
            "run finished: {} iterations, {} births, {} evaluations in {:?}",
            run.iterations(),
            run.births(),
            run.quality_evaluations(),
            run.elapsed()
        );
        Ok(self.extract_solutions(&state))
    }

    /// The non-dominated individuals of `state`, re-scored with the
    /// problem's validation quality where it defines one.
    fn validate_solutions(
        &self,
        state: &Self::State,
    ) -> SolverResult<Vec<IndividualOf<P, Self::Genotype>>> {
        let run = state.run();
        let problem = run.problem();
        run.population()
            .firsts()
            .into_iter()
            .map(|ind| match problem.validation_quality(ind.solution()) {
                Some(quality) => Ok(ind.remap(quality?, run.iterations())),
                None => Ok(ind.clone()),
            })
            .collect()
    }
}
