//! Deterministic parallel evaluation of genotypes.

use crate::error::{SolverError, SolverResult};
use crate::individual::Individual;
use crate::problem::Problem;
use crate::random::{create_rng, spawn_seeds};
use crate::state::IndividualOf;
use rand::rngs::StdRng;
use rand::{Rng, RngCore};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fmt;
use std::sync::Arc;

/// Runs `task` once per input on `pool`, each with a private generator.
///
/// One sub-seed per input is drawn from `rng` on the calling thread, in
/// input order, before anything is dispatched. Outputs come back in input
/// order. The first failing task aborts the batch; nothing is retried.
pub fn fan_out<R, I, O, F>(
    rng: &mut R,
    pool: &ThreadPool,
    inputs: Vec<I>,
    task: F,
) -> SolverResult<Vec<O>>
where
    R: Rng + ?Sized,
    I: Send,
    O: Send,
    F: Fn(I, &mut StdRng) -> SolverResult<O> + Send + Sync,
{
    let seeds = spawn_seeds(rng, inputs.len());
    pool.install(|| {
        inputs
            .into_par_iter()
            .zip(seeds)
            .map(|(input, seed)| {
                let mut task_rng = create_rng(seed);
                task(input, &mut task_rng)
            })
            .collect()
    })
}

/// One unit of evaluation work: a genotype with its assigned id and lineage.
#[derive(Debug, Clone, PartialEq)]
pub struct GenotypeUnit<G> {
    pub id: u64,
    pub genotype: G,
    pub parent_ids: Vec<u64>,
}

impl<G> GenotypeUnit<G> {
    pub fn new(id: u64, genotype: G, parent_ids: Vec<u64>) -> Self {
        Self {
            id,
            genotype,
            parent_ids,
        }
    }

    /// Numbers `items` consecutively starting at `first_id`.
    pub fn sequence<I>(first_id: u64, items: I) -> Vec<Self>
    where
        I: IntoIterator<Item = (G, Vec<u64>)>,
    {
        items
            .into_iter()
            .zip(first_id..)
            .map(|((genotype, parent_ids), id)| Self::new(id, genotype, parent_ids))
            .collect()
    }
}

type FactoryFn<G> = dyn Fn(usize, &mut dyn RngCore) -> Vec<G> + Send + Sync;
type MapperFn<G, S> = dyn Fn(&G) -> S + Send + Sync;

/// Creates genotypes and turns them into evaluated individuals.
///
/// Holds the two pure collaborators every solver needs: a genotype factory
/// for the initial population and the genotype-to-solution mapper.
pub struct Breeder<P: Problem, G> {
    factory: Arc<FactoryFn<G>>,
    mapper: Arc<MapperFn<G, P::Solution>>,
}

impl<P: Problem, G: Clone + Send + Sync + 'static> Breeder<P, G> {
    pub fn new<F, M>(factory: F, mapper: M) -> Self
    where
        F: Fn(usize, &mut dyn RngCore) -> Vec<G> + Send + Sync + 'static,
        M: Fn(&G) -> P::Solution + Send + Sync + 'static,
    {
        Self {
            factory: Arc::new(factory),
            mapper: Arc::new(mapper),
        }
    }

    /// A breeder whose solutions are the genotypes themselves.
    pub fn identity<F>(factory: F) -> Self
    where
        P: Problem<Solution = G>,
        F: Fn(usize, &mut dyn RngCore) -> Vec<G> + Send + Sync + 'static,
    {
        Self::new(factory, |g: &G| g.clone())
    }

    /// Builds `n` initial genotypes.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidInput`] when the factory returns a different
    /// number of genotypes.
    pub fn initial_genotypes<R: Rng>(&self, n: usize, rng: &mut R) -> SolverResult<Vec<G>> {
        let rng: &mut dyn RngCore = rng;
        let genotypes = (self.factory)(n, rng);
        if genotypes.len() != n {
            return Err(SolverError::input(format!(
                "genotype factory built {} genotypes, {n} requested",
                genotypes.len()
            )));
        }
        Ok(genotypes)
    }

    /// Maps `genotype` to its solution.
    pub fn solution_of(&self, genotype: &G) -> P::Solution {
        (self.mapper)(genotype)
    }

    /// Maps and evaluates a single unit.
    pub fn express(
        &self,
        problem: &P,
        unit: GenotypeUnit<G>,
        iteration: u64,
    ) -> SolverResult<IndividualOf<P, G>> {
        let solution = (self.mapper)(&unit.genotype);
        let quality = problem.quality(&solution)?;
        Ok(Individual::new(
            unit.id,
            unit.genotype,
            solution,
            quality,
            iteration,
            unit.parent_ids,
        ))
    }

    /// Maps and evaluates every unit on `pool`; see [`fan_out`].
    pub fn evaluate<R: Rng>(
        &self,
        problem: &P,
        units: Vec<GenotypeUnit<G>>,
        iteration: u64,
        rng: &mut R,
        pool: &ThreadPool,
    ) -> SolverResult<Vec<IndividualOf<P, G>>> {
        fan_out(rng, pool, units, |unit, _| self.express(problem, unit, iteration))
    }
}

impl<P: Problem, G> Clone for Breeder<P, G> {
    fn clone(&self) -> Self {
        Self {
            factory: Arc::clone(&self.factory),
            mapper: Arc::clone(&self.mapper),
        }
    }
}

impl<P: Problem, G> fmt::Debug for Breeder<P, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Breeder")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::MinimizeProblem;
    use rayon::ThreadPoolBuilder;

    type Sphere = MinimizeProblem<Vec<f64>, f64>;

    fn pool(threads: usize) -> ThreadPool {
        ThreadPoolBuilder::new().num_threads(threads).build().unwrap()
    }

    fn breeder() -> Breeder<Sphere, Vec<f64>> {
        Breeder::identity(|n, rng: &mut dyn RngCore| {
            (0..n)
                .map(|_| (0..3).map(|_| rng.random_range(-1.0..1.0)).collect())
                .collect()
        })
    }

    #[test]
    fn test_fan_out_independent_of_pool_size() {
        let inputs: Vec<u64> = (0..64).collect();
        let task = |x: u64, rng: &mut StdRng| Ok(x + rng.random_range(0..1_000u64));

        let a = fan_out(&mut create_rng(9), &pool(1), inputs.clone(), task).unwrap();
        let b = fan_out(&mut create_rng(9), &pool(4), inputs, task).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_fan_out_preserves_order() {
        let inputs: Vec<usize> = (0..100).collect();
        let out = fan_out(&mut create_rng(1), &pool(4), inputs, |x, _| Ok(x * 2)).unwrap();
        assert_eq!(out, (0..100).map(|x| x * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_fan_out_failure_aborts() {
        let inputs: Vec<u32> = (0..10).collect();
        let result = fan_out(&mut create_rng(1), &pool(2), inputs, |x, _| {
            if x == 7 {
                Err(SolverError::evaluation("unit 7 failed"))
            } else {
                Ok(x)
            }
        });
        assert_eq!(result, Err(SolverError::evaluation("unit 7 failed")));
    }

    #[test]
    fn test_evaluate_builds_individuals() {
        let problem = Sphere::new(|x: &Vec<f64>| x.iter().map(|v| v * v).sum());
        let breeder = breeder();
        let mut rng = create_rng(5);
        let genotypes = breeder.initial_genotypes(4, &mut rng).unwrap();
        let units = GenotypeUnit::sequence(10, genotypes.into_iter().map(|g| (g, vec![1, 2])));

        let individuals = breeder
            .evaluate(&problem, units, 3, &mut rng, &pool(2))
            .unwrap();

        assert_eq!(individuals.len(), 4);
        for (i, ind) in individuals.iter().enumerate() {
            assert_eq!(ind.id(), 10 + i as u64);
            assert_eq!(ind.parent_ids(), &[1, 2]);
            assert_eq!(ind.genotype_birth_iteration(), 3);
            let expected: f64 = ind.genotype().iter().map(|v| v * v).sum();
            assert!((ind.quality() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_factory_size_mismatch() {
        let breeder: Breeder<Sphere, Vec<f64>> =
            Breeder::identity(|_, _: &mut dyn RngCore| vec![vec![0.0]]);
        let err = breeder.initial_genotypes(3, &mut create_rng(0)).unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput(_)));
    }
}
