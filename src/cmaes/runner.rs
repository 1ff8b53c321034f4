//! CMA-ES generation loop.

use super::config::{CmaEsConfig, CmaParameters};
use crate::error::{SolverError, SolverResult};
use crate::problem::{Problem, TotalOrderProblem};
use crate::solver::{Breeder, GenotypeUnit, IterativeSolver};
use crate::state::{population_set, IndividualOf, RunState, SolverState, StopCondition};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use rand_distr::StandardNormal;
use rayon::ThreadPool;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type Point = Vec<f64>;

/// Eigen-decomposition `C = B·D²·Bᵗ` of a covariance matrix.
///
/// Returns `(B, D)`. `C` is symmetrized first. Negative eigenvalues, which
/// only arise from rounding, are clamped to zero.
///
/// # Errors
///
/// [`SolverError::Numerical`] if `C` holds non-finite entries.
pub fn decompose(covariance: &DMatrix<f64>) -> SolverResult<(DMatrix<f64>, DVector<f64>)> {
    let symmetric = (covariance + covariance.transpose()) * 0.5;
    if symmetric.iter().any(|v| !v.is_finite()) {
        return Err(SolverError::numerical("covariance matrix has non-finite entries"));
    }

    let eigen = SymmetricEigen::new(symmetric);
    let mut clamped = 0;
    let scales = eigen.eigenvalues.map(|ev| {
        if ev < 0.0 {
            clamped += 1;
            0.0
        } else {
            ev.sqrt()
        }
    });
    if clamped > 0 {
        log::warn!("clamped {clamped} negative covariance eigenvalue(s) to zero");
    }
    Ok((eigen.eigenvectors, scales))
}

/// Draws `lambda` points `m + σ·B·(D∘z)` with `z ~ N(0, I)`.
fn sample_points<R: Rng>(
    rng: &mut R,
    lambda: usize,
    mean: &DVector<f64>,
    sigma: f64,
    basis: &DMatrix<f64>,
    scales: &DVector<f64>,
) -> Vec<Point> {
    let n = mean.len();
    (0..lambda)
        .map(|_| {
            let z: DVector<f64> = DVector::from_fn(n, |_, _| rng.sample(StandardNormal));
            let y = basis * scales.component_mul(&z);
            (mean + y * sigma).iter().copied().collect()
        })
        .collect()
}

/// State of a CMA-ES run.
pub struct CmaEsState<P: Problem> {
    run: RunState<P, Point>,
    params: CmaParameters,
    mean: DVector<f64>,
    sigma: f64,
    p_sigma: DVector<f64>,
    p_c: DVector<f64>,
    covariance: DMatrix<f64>,
    basis: DMatrix<f64>,
    scales: DVector<f64>,
    eigen_iteration: u64,
    best: IndividualOf<P, Point>,
}

impl<P: Problem> CmaEsState<P> {
    pub fn params(&self) -> &CmaParameters {
        &self.params
    }

    /// Mean of the search distribution.
    pub fn mean(&self) -> &DVector<f64> {
        &self.mean
    }

    /// Global step size σ.
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Evolution path of σ.
    pub fn p_sigma(&self) -> &DVector<f64> {
        &self.p_sigma
    }

    /// Evolution path of C.
    pub fn p_c(&self) -> &DVector<f64> {
        &self.p_c
    }

    pub fn covariance(&self) -> &DMatrix<f64> {
        &self.covariance
    }

    /// Eigenvectors B of C, as of the last refresh.
    pub fn basis(&self) -> &DMatrix<f64> {
        &self.basis
    }

    /// Square roots D of the eigenvalues of C, as of the last refresh.
    pub fn scales(&self) -> &DVector<f64> {
        &self.scales
    }

    /// Iteration at which B and D were last recomputed.
    pub fn eigen_iteration(&self) -> u64 {
        self.eigen_iteration
    }

    /// Best individual sampled so far.
    pub fn best(&self) -> &IndividualOf<P, Point> {
        &self.best
    }
}

impl<P: Problem> SolverState for CmaEsState<P> {
    type Problem = P;
    type Genotype = Point;

    fn run(&self) -> &RunState<P, Point> {
        &self.run
    }
}

impl<P: Problem> fmt::Debug for CmaEsState<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmaEsState")
            .field("run", &self.run)
            .field("sigma", &self.sigma)
            .field("mean", &self.mean.as_slice())
            .field("best", self.best.quality())
            .finish()
    }
}

/// Covariance Matrix Adaptation Evolution Strategy.
///
/// The genotype factory is asked for a single point, which becomes the
/// initial mean; its length fixes the dimension.
///
/// # References
///
/// - Hansen & Ostermeier (2001), "Completely Derandomized Self-Adaptation in
///   Evolution Strategies"
/// - Hansen (2016), "The CMA Evolution Strategy: A Tutorial"
pub struct CmaEs<P: Problem> {
    config: CmaEsConfig,
    breeder: Breeder<P, Point>,
    stop_condition: StopCondition<P, Point>,
}

impl<P: TotalOrderProblem> CmaEs<P> {
    pub fn new(
        config: CmaEsConfig,
        breeder: Breeder<P, Point>,
        stop_condition: StopCondition<P, Point>,
    ) -> SolverResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            breeder,
            stop_condition,
        })
    }

    pub fn config(&self) -> &CmaEsConfig {
        &self.config
    }
}

/// Indices of `samples`, best first. Ties keep sampling order.
fn ranking<P: TotalOrderProblem>(problem: &P, samples: &[IndividualOf<P, Point>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..samples.len()).collect();
    order.sort_by(|&a, &b| problem.total_order(samples[a].quality(), samples[b].quality()));
    order
}

impl<P: TotalOrderProblem> IterativeSolver<P> for CmaEs<P> {
    type Genotype = Point;
    type State = CmaEsState<P>;

    fn init<R: Rng>(
        &self,
        problem: Arc<P>,
        rng: &mut R,
        pool: &ThreadPool,
    ) -> SolverResult<Self::State> {
        let start = self
            .breeder
            .initial_genotypes(1, rng)?
            .pop()
            .ok_or_else(|| SolverError::input("genotype factory built no initial mean"))?;
        let params = CmaParameters::new(start.len(), self.config.population_size)?;
        let n = params.dimension;

        let mean = DVector::from_vec(start);
        let sigma = self.config.initial_sigma;
        let basis = DMatrix::identity(n, n);
        let scales = DVector::from_element(n, 1.0);

        let points = sample_points(rng, params.lambda, &mean, sigma, &basis, &scales);
        let units = GenotypeUnit::sequence(0, points.into_iter().map(|x| (x, Vec::new())));
        let samples = self.breeder.evaluate(&problem, units, 0, rng, pool)?;
        let best = samples[ranking(&*problem, &samples)[0]].clone();
        let population = population_set(&problem, samples)?;

        Ok(CmaEsState {
            run: RunState::new(problem, self.stop_condition.clone(), population),
            params,
            mean,
            sigma,
            p_sigma: DVector::zeros(n),
            p_c: DVector::zeros(n),
            covariance: DMatrix::identity(n, n),
            basis,
            scales,
            eigen_iteration: 0,
            best,
        })
    }

    fn update<R: Rng>(
        &self,
        rng: &mut R,
        pool: &ThreadPool,
        state: &Self::State,
    ) -> SolverResult<Self::State> {
        let run = &state.run;
        let problem: &P = run.problem();
        let params = &state.params;
        let n = params.dimension;
        let nf = n as f64;
        let generation = run.iterations() + 1;
        let (c_sigma, d_sigma, c_c) = (params.c_sigma, params.d_sigma, params.c_c);
        let (c1, c_mu, mu_eff) = (params.c1, params.c_mu, params.mu_eff);

        let points = sample_points(
            rng,
            params.lambda,
            &state.mean,
            state.sigma,
            &state.basis,
            &state.scales,
        );
        let units = GenotypeUnit::sequence(run.births(), points.into_iter().map(|x| (x, Vec::new())));
        let samples = self.breeder.evaluate(problem, units, generation, rng, pool)?;
        let order = ranking(problem, &samples);

        // Steps of the μ best, in units of σ.
        let steps: Vec<DVector<f64>> = order[..params.mu]
            .iter()
            .map(|&i| (DVector::from_column_slice(samples[i].genotype()) - &state.mean) / state.sigma)
            .collect();
        let y_w = steps
            .iter()
            .zip(&params.weights)
            .fold(DVector::<f64>::zeros(n), |acc, (y, w)| acc + y * *w);
        let mean = &state.mean + &y_w * state.sigma;

        // C^(-1/2) from the current factors; zero scales contribute nothing.
        let inverse_scales = state.scales.map(|d| if d > 0.0 { 1.0 / d } else { 0.0 });
        let inv_sqrt_c =
            &state.basis * DMatrix::from_diagonal(&inverse_scales) * state.basis.transpose();

        let p_sigma = &state.p_sigma * (1.0 - c_sigma)
            + (&inv_sqrt_c * &y_w) * (c_sigma * (2.0 - c_sigma) * mu_eff).sqrt();
        let p_sigma_norm = p_sigma.norm();

        let h_sigma = p_sigma_norm
            / (1.0 - (1.0 - c_sigma).powf(2.0 * generation as f64)).sqrt()
            / params.chi_n
            < 1.4 + 2.0 / (nf + 1.0);
        let h = if h_sigma { 1.0 } else { 0.0 };

        let p_c = &state.p_c * (1.0 - c_c) + &y_w * (h * (c_c * (2.0 - c_c) * mu_eff).sqrt());
        let delta_h = (1.0 - h) * c_c * (2.0 - c_c);

        let rank_mu = steps
            .iter()
            .zip(&params.weights)
            .fold(DMatrix::<f64>::zeros(n, n), |acc, (y, w)| acc + (y * y.transpose()) * *w);
        let covariance = &state.covariance * (1.0 - c1 - c_mu)
            + (&p_c * p_c.transpose() + &state.covariance * delta_h) * c1
            + rank_mu * c_mu;

        let mut sigma = state.sigma * ((c_sigma / d_sigma) * (p_sigma_norm / params.chi_n - 1.0)).exp();

        let leader = &samples[order[0]];
        let ties = samples
            .iter()
            .filter(|s| problem.total_order(s.quality(), leader.quality()) == Ordering::Equal)
            .count();
        if ties as f64 > self.config.flat_fitness_fraction * params.lambda as f64 {
            sigma *= (0.2 + c_sigma / d_sigma).exp();
            log::warn!(
                "flat fitness at iteration {generation}: {ties} of {} samples tie for best, sigma inflated to {sigma:.3e}",
                params.lambda
            );
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(SolverError::numerical(format!(
                "step size degenerated to {sigma} at iteration {generation}"
            )));
        }

        let (basis, scales, eigen_iteration) =
            if (generation - state.eigen_iteration) as f64 > params.eigen_interval {
                let (basis, scales) = decompose(&covariance)?;
                (basis, scales, generation)
            } else {
                (state.basis.clone(), state.scales.clone(), state.eigen_iteration)
            };

        let best = if problem.total_order(leader.quality(), state.best.quality()) == Ordering::Less {
            leader.clone()
        } else {
            state.best.clone()
        };

        log::debug!(
            "cma-es iteration {}: sigma {:.3e}, best {:?}",
            generation,
            sigma,
            best.quality()
        );

        let sampled = samples.len() as u64;
        let carried = (!samples.iter().any(|s| s.id() == best.id())).then(|| best.clone());
        let population = population_set(run.problem(), samples.into_iter().chain(carried))?;

        Ok(CmaEsState {
            run: run.advance(population, sampled, sampled),
            params: params.clone(),
            mean,
            sigma,
            p_sigma,
            p_c,
            covariance,
            basis,
            scales,
            eigen_iteration,
            best,
        })
    }
}

impl<P: Problem> fmt::Debug for CmaEs<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmaEs").field("config", &self.config).finish()
    }
}
