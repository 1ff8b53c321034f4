//! Shared fixtures for solver tests.

use crate::problem::MinimizeProblem;
use crate::solver::Breeder;
use crate::state::SolverState;
use rand::{Rng, RngCore};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::Arc;

pub(crate) type Sphere = MinimizeProblem<Vec<f64>, f64>;

pub(crate) fn sphere() -> Arc<Sphere> {
    Arc::new(Sphere::new(|x: &Vec<f64>| x.iter().map(|v| v * v).sum()))
}

pub(crate) fn pool(threads: usize) -> ThreadPool {
    ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .expect("thread pool")
}

/// Real vectors of length `dim`, uniform in `[lo, hi)`.
pub(crate) fn uniform_breeder(dim: usize, lo: f64, hi: f64) -> Breeder<Sphere, Vec<f64>> {
    Breeder::identity(move |n, rng: &mut dyn RngCore| {
        (0..n)
            .map(|_| (0..dim).map(|_| rng.random_range(lo..hi)).collect())
            .collect()
    })
}

/// Best quality in the population of `state`.
pub(crate) fn best_quality<S>(state: &S) -> f64
where
    S: SolverState<Problem = Sphere, Genotype = Vec<f64>>,
{
    state
        .run()
        .population()
        .iter()
        .map(|ind| *ind.quality())
        .fold(f64::INFINITY, f64::min)
}

/// `(id, genotype, quality)` of every individual, sorted by id.
pub(crate) fn fingerprint<S>(state: &S) -> Vec<(u64, Vec<f64>, f64)>
where
    S: SolverState<Problem = Sphere, Genotype = Vec<f64>>,
{
    let mut out: Vec<_> = state
        .run()
        .population()
        .iter()
        .map(|ind| (ind.id(), ind.genotype().clone(), *ind.quality()))
        .collect();
    out.sort_by_key(|(id, _, _)| *id);
    out
}
