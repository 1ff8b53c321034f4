//! Population-based metaheuristic core.
//!
//! Provides the shared machinery population-based optimizers are built
//! from, together with a few solvers built on it:
//!
//! - **Partial orders**: [`order::PartialOrderSet`] keeps a population as a
//!   DAG of dominance fronts, so multi-objective and single-objective
//!   problems share one representation.
//! - **Solver loop**: [`solver::IterativeSolver`] drives `init`/`update`
//!   over immutable [`state::RunState`] snapshots with composable
//!   [`state::StopCondition`]s.
//! - **Deterministic parallelism**: evaluation and breeding fan out over a
//!   rayon pool with per-task generators seeded in a fixed order, so a run
//!   is reproducible from its seed whatever the pool size.
//! - **CMA-ES**: covariance matrix adaptation for real-valued problems.
//! - **Particle Swarm Optimization (PSO)**: inertia-weighted swarm.
//! - **Speciated evolver**: rank-based reproduction across species of
//!   similar genotypes.
//! - **Cellular evolver**: neighbourhood-restricted mating on a 2-D grid.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use rand::{Rng, RngCore};
//! use rayon::ThreadPoolBuilder;
//! use u_popsearch::cmaes::{CmaEs, CmaEsConfig};
//! use u_popsearch::problem::MinimizeProblem;
//! use u_popsearch::random::create_rng;
//! use u_popsearch::solver::{Breeder, IterativeSolver};
//! use u_popsearch::state::StopCondition;
//!
//! type Sphere = MinimizeProblem<Vec<f64>, f64>;
//!
//! let problem = Arc::new(Sphere::new(|x: &Vec<f64>| x.iter().map(|v| v * v).sum()));
//! let breeder: Breeder<Sphere, Vec<f64>> = Breeder::identity(|n, rng: &mut dyn RngCore| {
//!     (0..n)
//!         .map(|_| (0..3).map(|_| rng.random_range(-2.0..2.0)).collect())
//!         .collect()
//! });
//! let solver = CmaEs::new(CmaEsConfig::default(), breeder, StopCondition::iterations(100)).unwrap();
//! let pool = ThreadPoolBuilder::new().num_threads(2).build().unwrap();
//!
//! let best = solver.solve(problem, &mut create_rng(42), &pool).unwrap();
//! assert!(best[0].iter().all(|v| v.abs() < 0.1));
//! ```

pub mod cellular;
pub mod cmaes;
pub mod error;
pub mod individual;
pub mod operator;
pub mod order;
pub mod problem;
pub mod pso;
pub mod random;
pub mod selection;
pub mod solver;
pub mod speciated;
pub mod state;

#[cfg(test)]
mod testing;

pub use error::{SolverError, SolverResult};
