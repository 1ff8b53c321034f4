//! Particle swarm loop.

use super::config::PsoConfig;
use crate::error::{SolverError, SolverResult};
use crate::problem::{Problem, TotalOrderProblem};
use crate::solver::{fan_out, Breeder, GenotypeUnit, IterativeSolver};
use crate::state::{population_set, IndividualOf, RunState, SolverState, StopCondition};
use rand::Rng;
use rayon::ThreadPool;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

type Position = Vec<f64>;

/// One member of the swarm.
pub struct Particle<P: Problem> {
    current: IndividualOf<P, Position>,
    velocity: Vec<f64>,
    best: IndividualOf<P, Position>,
}

impl<P: Problem> Particle<P> {
    /// The individual at the particle's current position.
    pub fn current(&self) -> &IndividualOf<P, Position> {
        &self.current
    }

    pub fn position(&self) -> &[f64] {
        self.current.genotype()
    }

    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }

    /// Best individual this particle has visited.
    pub fn best(&self) -> &IndividualOf<P, Position> {
        &self.best
    }
}

impl<P: Problem> Clone for Particle<P> {
    fn clone(&self) -> Self {
        Self {
            current: self.current.clone(),
            velocity: self.velocity.clone(),
            best: self.best.clone(),
        }
    }
}

impl<P: Problem> fmt::Debug for Particle<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Particle")
            .field("position", &self.current.genotype())
            .field("velocity", &self.velocity)
            .field("best", &self.best.quality())
            .finish()
    }
}

/// State of a swarm run.
pub struct PsoState<P: Problem> {
    run: RunState<P, Position>,
    particles: Vec<Particle<P>>,
    global_best: IndividualOf<P, Position>,
}

impl<P: Problem> PsoState<P> {
    pub fn particles(&self) -> &[Particle<P>] {
        &self.particles
    }

    /// Best individual found by the swarm so far.
    pub fn global_best(&self) -> &IndividualOf<P, Position> {
        &self.global_best
    }
}

impl<P: Problem> SolverState for PsoState<P> {
    type Problem = P;
    type Genotype = Position;

    fn run(&self) -> &RunState<P, Position> {
        &self.run
    }
}

impl<P: Problem> fmt::Debug for PsoState<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PsoState")
            .field("run", &self.run)
            .field("global_best", &self.global_best.quality())
            .finish()
    }
}

/// Particle swarm optimizer over real vectors.
///
/// Each iteration every particle moves independently:
///
/// ```text
/// v' = w·v + r₁·φ_p·(p − x) + r₂·φ_g·(g − x)
/// x' = x + v'
/// ```
///
/// where `p` is the particle's best position, `g` the swarm's best position
/// as of the start of the iteration, and `r₁`, `r₂` are fresh uniform draws
/// per particle and dimension. The swarm's best is only refreshed once all
/// particles have moved.
///
/// # References
///
/// - Kennedy & Eberhart (1995), "Particle Swarm Optimization"
/// - Clerc & Kennedy (2002), "The particle swarm: explosion, stability, and
///   convergence in a multidimensional complex space"
pub struct ParticleSwarm<P: Problem> {
    config: PsoConfig,
    breeder: Breeder<P, Position>,
    stop_condition: StopCondition<P, Position>,
}

impl<P: TotalOrderProblem> ParticleSwarm<P> {
    pub fn new(
        config: PsoConfig,
        breeder: Breeder<P, Position>,
        stop_condition: StopCondition<P, Position>,
    ) -> SolverResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            breeder,
            stop_condition,
        })
    }

    pub fn config(&self) -> &PsoConfig {
        &self.config
    }

    /// Moves one particle and evaluates its new position.
    fn step(
        &self,
        problem: &P,
        particle: &Particle<P>,
        global_best: &[f64],
        id: u64,
        iteration: u64,
        rng: &mut impl Rng,
    ) -> SolverResult<Particle<P>> {
        let x = particle.current.genotype();
        let p = particle.best.genotype();
        if x.len() != global_best.len() || p.len() != x.len() || particle.velocity.len() != x.len()
        {
            return Err(SolverError::input(format!(
                "particle {} has dimension {}, swarm has {}",
                particle.current.id(),
                x.len(),
                global_best.len()
            )));
        }

        let mut velocity = Vec::with_capacity(x.len());
        let mut position = Vec::with_capacity(x.len());
        for d in 0..x.len() {
            let r1: f64 = rng.random();
            let r2: f64 = rng.random();
            let v = self.config.inertia * particle.velocity[d]
                + r1 * self.config.phi_particle * (p[d] - x[d])
                + r2 * self.config.phi_global * (global_best[d] - x[d]);
            velocity.push(v);
            position.push(x[d] + v);
        }

        let unit = GenotypeUnit::new(id, position, vec![particle.current.id()]);
        let current = self.breeder.express(problem, unit, iteration)?;
        let best = if problem.total_order(current.quality(), particle.best.quality())
            == Ordering::Less
        {
            current.clone()
        } else {
            particle.best.clone()
        };

        Ok(Particle {
            current,
            velocity,
            best,
        })
    }
}

/// First individual of minimal quality.
fn best_of<'a, P, I>(problem: &P, candidates: I) -> Option<&'a IndividualOf<P, Position>>
where
    P: TotalOrderProblem,
    I: IntoIterator<Item = &'a IndividualOf<P, Position>>,
{
    candidates.into_iter().fold(None, |best, candidate| match best {
        Some(b) if problem.total_order(candidate.quality(), b.quality()) != Ordering::Less => {
            Some(b)
        }
        _ => Some(candidate),
    })
}

impl<P: TotalOrderProblem> IterativeSolver<P> for ParticleSwarm<P> {
    type Genotype = Position;
    type State = PsoState<P>;

    fn init<R: Rng>(
        &self,
        problem: Arc<P>,
        rng: &mut R,
        pool: &ThreadPool,
    ) -> SolverResult<Self::State> {
        let positions = self
            .breeder
            .initial_genotypes(self.config.population_size, rng)?;
        let dim = positions.first().map_or(0, Vec::len);
        if let Some(bad) = positions.iter().find(|x| x.len() != dim) {
            return Err(SolverError::input(format!(
                "initial positions differ in length: {} vs {dim}",
                bad.len()
            )));
        }

        let spread: Vec<f64> = (0..dim)
            .map(|d| {
                let (lo, hi) = positions
                    .iter()
                    .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
                        (lo.min(x[d]), hi.max(x[d]))
                    });
                hi - lo
            })
            .collect();

        let units = GenotypeUnit::sequence(0, positions.into_iter().map(|x| (x, Vec::new())));
        let individuals = self.breeder.evaluate(&problem, units, 0, rng, pool)?;

        let particles: Vec<Particle<P>> = individuals
            .into_iter()
            .map(|current| {
                let velocity = spread
                    .iter()
                    .map(|&s| if s > 0.0 { rng.random_range(-s..=s) } else { 0.0 })
                    .collect();
                Particle {
                    best: current.clone(),
                    current,
                    velocity,
                }
            })
            .collect();

        let global_best = best_of(&*problem, particles.iter().map(|p| &p.best))
            .cloned()
            .ok_or_else(|| SolverError::config("swarm is empty"))?;
        let population = population_set(&problem, particles.iter().map(|p| p.current.clone()))?;

        Ok(PsoState {
            run: RunState::new(problem, self.stop_condition.clone(), population),
            particles,
            global_best,
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
        let iteration = run.iterations() + 1;
        let first_id = run.births();
        let global_best = state.global_best.genotype().as_slice();

        let inputs: Vec<(u64, &Particle<P>)> = (first_id..).zip(&state.particles).collect();
        let particles = fan_out(rng, pool, inputs, |(id, particle), task_rng| {
            self.step(problem, particle, global_best, id, iteration, task_rng)
        })?;

        let global_best = best_of(
            problem,
            std::iter::once(&state.global_best).chain(particles.iter().map(|p| &p.best)),
        )
        .cloned()
        .unwrap_or_else(|| state.global_best.clone());

        let moved = particles.len() as u64;
        let population = population_set(run.problem(), particles.iter().map(|p| p.current.clone()))?;

        log::debug!(
            "pso iteration {}: global best {:?}",
            iteration,
            global_best.quality()
        );

        Ok(PsoState {
            run: run.advance(population, moved, moved),
            particles,
            global_best,
        })
    }
}

impl<P: Problem> fmt::Debug for ParticleSwarm<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParticleSwarm")
            .field("config", &self.config)
            .finish()
    }
}
