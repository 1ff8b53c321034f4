//! Speciated reproduction loop.

use super::config::SpeciatedConfig;
use super::speciator::{Species, Speciator};
use crate::error::{SolverError, SolverResult};
use crate::operator::OperatorSet;
use crate::problem::{Problem, TotalOrderProblem};
use crate::solver::{Breeder, GenotypeUnit, IterativeSolver};
use crate::state::{population_set, IndividualOf, RunState, SolverState, StopCondition};
use rand::{Rng, RngCore};
use rayon::ThreadPool;
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// How the next generation is filled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReproductionPlan {
    /// Population indices surviving unchanged, overall best first.
    pub elites: Vec<usize>,
    /// Offspring count per species, in partition order.
    pub quotas: Vec<usize>,
    /// Members of each species, best first.
    pub ranked_members: Vec<Vec<usize>>,
}

impl ReproductionPlan {
    /// Total number of offspring to breed.
    pub fn offspring(&self) -> usize {
        self.quotas.iter().sum()
    }
}

/// Splits `budget` offspring across species ranked `0..ranks`.
///
/// Rank `r` receives `floor(budget · base^r / Σ base^k)`; whatever rounding
/// leaves over goes to rank 0.
pub fn rank_quotas(budget: usize, ranks: usize, rank_base: f64) -> Vec<usize> {
    if ranks == 0 {
        return Vec::new();
    }
    let weights: Vec<f64> = (0..ranks).map(|r| rank_base.powi(r as i32)).collect();
    let total: f64 = weights.iter().sum();

    let mut quotas: Vec<usize> = weights
        .iter()
        .map(|w| {
            let share = budget as f64 * w / total;
            if share.is_finite() {
                share.floor() as usize
            } else {
                0
            }
        })
        .collect();

    let assigned: usize = quotas.iter().sum();
    if assigned <= budget {
        quotas[0] += budget - assigned;
    } else {
        // Cannot happen with exact arithmetic; trim from the bottom ranks.
        let mut excess = assigned - budget;
        for q in quotas.iter_mut().rev() {
            let cut = excess.min(*q);
            *q -= cut;
            excess -= cut;
        }
    }
    quotas
}

/// Computes elites and offspring quotas for one generation.
///
/// `order` ranks qualities, lower first. Ties keep population order.
pub fn plan_reproduction<Q, F>(
    qualities: &[Q],
    species: &[Species],
    config: &SpeciatedConfig,
    order: F,
) -> ReproductionPlan
where
    F: Fn(&Q, &Q) -> Ordering,
{
    let ranked_members: Vec<Vec<usize>> = species
        .iter()
        .map(|sp| {
            let mut members = sp.members.clone();
            members.sort_by(|&a, &b| order(&qualities[a], &qualities[b]));
            members
        })
        .collect();

    let mut elites = Vec::new();
    if let Some(best) = (0..qualities.len()).min_by(|&a, &b| order(&qualities[a], &qualities[b])) {
        elites.push(best);
    }
    for members in &ranked_members {
        if members.len() >= config.min_species_size_for_elitism {
            if let Some(&best) = members.first() {
                if !elites.contains(&best) {
                    elites.push(best);
                }
            }
        }
    }
    elites.truncate(config.population_size);

    let mut by_rank: Vec<usize> = (0..species.len()).collect();
    by_rank.sort_by(|&a, &b| {
        order(
            &qualities[species[a].representative],
            &qualities[species[b].representative],
        )
    });

    let budget = config.population_size - elites.len();
    let rank_shares = rank_quotas(budget, species.len(), config.rank_base);
    let mut quotas = vec![0; species.len()];
    for (rank, &s) in by_rank.iter().enumerate() {
        quotas[s] = rank_shares[rank];
    }

    ReproductionPlan {
        elites,
        quotas,
        ranked_members,
    }
}

/// Checks that `species` partitions the indices `0..n`.
fn check_partition(species: &[Species], n: usize) -> SolverResult<()> {
    if species.is_empty() {
        return Err(SolverError::config("speciator produced no species"));
    }
    let mut assigned = vec![false; n];
    for (s, sp) in species.iter().enumerate() {
        if sp.is_empty() {
            return Err(SolverError::config(format!("species {s} is empty")));
        }
        if !sp.members.contains(&sp.representative) {
            return Err(SolverError::config(format!(
                "species {s} representative {} is not a member",
                sp.representative
            )));
        }
        for &i in &sp.members {
            match assigned.get_mut(i) {
                None => {
                    return Err(SolverError::config(format!(
                        "species {s} lists member {i}, population has {n}"
                    )))
                }
                Some(true) => {
                    return Err(SolverError::config(format!(
                        "member {i} is assigned to more than one species"
                    )))
                }
                Some(slot) => *slot = true,
            }
        }
    }
    if let Some(i) = assigned.iter().position(|&a| !a) {
        return Err(SolverError::config(format!(
            "member {i} is not assigned to any species"
        )));
    }
    Ok(())
}

/// State of a speciated run.
pub struct SpeciatedState<P: Problem, G> {
    run: RunState<P, G>,
    species: Vec<Vec<u64>>,
}

impl<P: Problem, G> SpeciatedState<P, G> {
    /// Member ids of each species used to breed this generation, best
    /// first. Empty for the initial state.
    pub fn species(&self) -> &[Vec<u64>] {
        &self.species
    }
}

impl<P: Problem, G> SolverState for SpeciatedState<P, G> {
    type Problem = P;
    type Genotype = G;

    fn run(&self) -> &RunState<P, G> {
        &self.run
    }
}

impl<P: Problem, G> fmt::Debug for SpeciatedState<P, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeciatedState")
            .field("run", &self.run)
            .field("species", &self.species.len())
            .finish()
    }
}

/// Diversity-preserving evolutionary solver.
///
/// Each generation the population is split into species. The overall best
/// individual and the best of every large enough species survive; the rest
/// of the population is bred species by species, with top-ranked species
/// receiving larger shares.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use rand::{Rng, RngCore};
/// use u_popsearch::operator::{GaussianMutation, OperatorSet};
/// use u_popsearch::problem::MinimizeProblem;
/// use u_popsearch::random::create_rng;
/// use u_popsearch::solver::{Breeder, IterativeSolver};
/// use u_popsearch::speciated::{euclidean_distance, LazySpeciator, SpeciatedConfig, SpeciatedEvolver};
/// use u_popsearch::state::StopCondition;
///
/// type Sphere = MinimizeProblem<Vec<f64>, f64>;
///
/// let problem = Arc::new(Sphere::new(|x: &Vec<f64>| x.iter().map(|v| v * v).sum()));
/// let breeder: Breeder<Sphere, Vec<f64>> = Breeder::identity(|n, rng: &mut dyn RngCore| {
///     (0..n).map(|_| vec![rng.random_range(-5.0..5.0), rng.random_range(-5.0..5.0)]).collect()
/// });
/// let solver = SpeciatedEvolver::new(
///     SpeciatedConfig::default().with_population_size(20),
///     breeder,
///     OperatorSet::new().with(GaussianMutation { sigma: 0.3 }, 1.0),
///     LazySpeciator::new(1.0, |a: &Vec<f64>, b: &Vec<f64>| euclidean_distance(a, b)),
///     StopCondition::iterations(10),
/// )
/// .unwrap();
///
/// let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();
/// let best = solver.solve(problem, &mut create_rng(42), &pool).unwrap();
/// assert!(!best.is_empty());
/// ```
pub struct SpeciatedEvolver<P: Problem, G> {
    config: SpeciatedConfig,
    breeder: Breeder<P, G>,
    operators: OperatorSet<G>,
    speciator: Arc<dyn Speciator<G>>,
    stop_condition: StopCondition<P, G>,
}

impl<P, G> SpeciatedEvolver<P, G>
where
    P: TotalOrderProblem,
    G: Clone + Send + Sync + 'static,
{
    /// Builds the solver, validating `config` and `operators`.
    pub fn new<S>(
        config: SpeciatedConfig,
        breeder: Breeder<P, G>,
        operators: OperatorSet<G>,
        speciator: S,
        stop_condition: StopCondition<P, G>,
    ) -> SolverResult<Self>
    where
        S: Speciator<G> + 'static,
    {
        config.validate()?;
        operators.validate()?;
        Ok(Self {
            config,
            breeder,
            operators,
            speciator: Arc::new(speciator),
            stop_condition,
        })
    }

    pub fn config(&self) -> &SpeciatedConfig {
        &self.config
    }

    /// Breeds `quota` children per species, drawing parents cyclically from
    /// its ranked members.
    fn breed(
        &self,
        members: &[&IndividualOf<P, G>],
        plan: &ReproductionPlan,
        rng: &mut dyn RngCore,
    ) -> SolverResult<Vec<(G, Vec<u64>)>> {
        let mut offspring = Vec::with_capacity(plan.offspring());

        for (ranked, &quota) in plan.ranked_members.iter().zip(&plan.quotas) {
            let mut produced = 0;
            let mut cursor = 0;
            while produced < quota {
                let op = self.operators.pick(rng);
                let parents: Vec<&IndividualOf<P, G>> = (0..op.arity())
                    .map(|k| members[ranked[(cursor + k) % ranked.len()]])
                    .collect();
                cursor += op.arity();

                let genotypes: Vec<G> = parents.iter().map(|p| p.genotype().clone()).collect();
                let parent_ids: Vec<u64> = parents.iter().map(|p| p.id()).collect();
                let children = op.apply(&genotypes, rng);
                if children.is_empty() {
                    return Err(SolverError::input("genetic operator produced no offspring"));
                }
                for child in children.into_iter().take(quota - produced) {
                    offspring.push((child, parent_ids.clone()));
                    produced += 1;
                }
            }
        }

        Ok(offspring)
    }
}

impl<P, G> IterativeSolver<P> for SpeciatedEvolver<P, G>
where
    P: TotalOrderProblem,
    G: Clone + Send + Sync + 'static,
{
    type Genotype = G;
    type State = SpeciatedState<P, G>;

    fn init<R: Rng>(
        &self,
        problem: Arc<P>,
        rng: &mut R,
        pool: &ThreadPool,
    ) -> SolverResult<Self::State> {
        let genotypes = self
            .breeder
            .initial_genotypes(self.config.population_size, rng)?;
        let units = GenotypeUnit::sequence(0, genotypes.into_iter().map(|g| (g, Vec::new())));
        let individuals = self.breeder.evaluate(&problem, units, 0, rng, pool)?;
        let population = population_set(&problem, individuals)?;

        Ok(SpeciatedState {
            run: RunState::new(problem, self.stop_condition.clone(), population),
            species: Vec::new(),
        })
    }

    fn update<R: Rng>(
        &self,
        rng: &mut R,
        pool: &ThreadPool,
        state: &Self::State,
    ) -> SolverResult<Self::State> {
        let run = &state.run;
        let problem = run.problem();
        let members = run.population().all();

        let genotypes: Vec<&G> = members.iter().map(|ind| ind.genotype()).collect();
        let species = self.speciator.speciate(&genotypes);
        check_partition(&species, members.len())?;

        let qualities: Vec<&P::Quality> = members.iter().map(|ind| ind.quality()).collect();
        let plan = plan_reproduction(&qualities, &species, &self.config, |a, b| {
            problem.total_order(a, b)
        });

        let offspring = self.breed(&members, &plan, rng)?;
        let born = offspring.len() as u64;
        let iteration = run.iterations() + 1;
        let units = GenotypeUnit::sequence(run.births(), offspring);
        let children = self.breeder.evaluate(problem, units, iteration, rng, pool)?;

        let elites = plan.elites.iter().map(|&i| members[i].clone());
        let population = population_set(problem, elites.chain(children))?;

        log::debug!(
            "speciated iteration {}: {} species, {} elites, {} offspring",
            iteration,
            species.len(),
            plan.elites.len(),
            born
        );

        let species_ids = plan
            .ranked_members
            .iter()
            .map(|ranked| ranked.iter().map(|&i| members[i].id()).collect())
            .collect();

        Ok(SpeciatedState {
            run: run.advance(population, born, born),
            species: species_ids,
        })
    }
}

impl<P: Problem, G> fmt::Debug for SpeciatedEvolver<P, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeciatedEvolver")
            .field("config", &self.config)
            .field("operators", &self.operators)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::{FnOperator, GaussianMutation, UniformCrossover};
    use crate::random::create_rng;
    use crate::speciated::{euclidean_distance, LazySpeciator};
    use crate::testing::{best_quality, fingerprint, pool, sphere, uniform_breeder, Sphere};
    use proptest::prelude::*;

    fn evolver(
        config: SpeciatedConfig,
        threshold: f64,
        iterations: u64,
    ) -> SpeciatedEvolver<Sphere, Vec<f64>> {
        SpeciatedEvolver::new(
            config,
            uniform_breeder(3, -5.0, 5.0),
            OperatorSet::new()
                .with(GaussianMutation { sigma: 0.2 }, 0.6)
                .with(UniformCrossover::default(), 0.4),
            LazySpeciator::new(threshold, |a: &Vec<f64>, b: &Vec<f64>| {
                euclidean_distance(a, b)
            }),
            StopCondition::iterations(iterations),
        )
        .unwrap()
    }

    #[test]
    fn test_rank_quotas_remainder_to_top() {
        let quotas = rank_quotas(10, 3, 1.0);
        assert_eq!(quotas, vec![4, 3, 3]);
        let quotas = rank_quotas(10, 3, 0.5);
        // 10·(4/7, 2/7, 1/7) = 5.71, 2.86, 1.43
        assert_eq!(quotas, vec![7, 2, 1]);
        assert!(rank_quotas(10, 0, 0.5).is_empty());
    }

    #[test]
    fn test_plan_elites() {
        // Species 0: {0, 1, 2}, species 1: {3, 4}.
        let qualities = [3.0, 1.0, 2.0, 0.5, 4.0];
        let species = vec![
            Species {
                representative: 0,
                members: vec![0, 1, 2],
            },
            Species {
                representative: 3,
                members: vec![3, 4],
            },
        ];
        let config = SpeciatedConfig::default()
            .with_population_size(10)
            .with_min_species_size_for_elitism(3);
        let plan = plan_reproduction(&qualities, &species, &config, |a: &f64, b: &f64| {
            a.total_cmp(b)
        });

        // Global best (3) first, then species 0's best (1); species 1 is too small.
        assert_eq!(plan.elites, vec![3, 1]);
        assert_eq!(plan.ranked_members, vec![vec![1, 2, 0], vec![3, 4]]);
        assert_eq!(plan.offspring(), 8);
        // Species 1's representative (0.5) outranks species 0's (3.0).
        assert!(plan.quotas[1] >= plan.quotas[0]);
    }

    #[test]
    fn test_population_size_preserved() {
        let config = SpeciatedConfig::default()
            .with_population_size(24)
            .with_min_species_size_for_elitism(2);
        let solver = evolver(config, 2.0, 5);
        let problem = sphere();
        let pool = pool(2);
        let mut rng = create_rng(42);

        let mut state = solver.init(problem, &mut rng, &pool).unwrap();
        for _ in 0..5 {
            state = solver.update(&mut rng, &pool, &state).unwrap();
            assert_eq!(state.run().population().len(), 24);
            let covered: usize = state.species().iter().map(Vec::len).sum();
            assert_eq!(covered, 24);
        }
    }

    #[test]
    fn test_best_never_lost() {
        let solver = evolver(SpeciatedConfig::default().with_population_size(30), 1.5, 20);
        let problem = sphere();
        let pool = pool(2);
        let mut rng = create_rng(7);

        let mut state = solver.init(problem, &mut rng, &pool).unwrap();
        let mut best = best_quality(&state);
        for _ in 0..20 {
            state = solver.update(&mut rng, &pool, &state).unwrap();
            let now = best_quality(&state);
            assert!(now <= best, "best quality regressed from {best} to {now}");
            best = now;
        }
    }

    #[test]
    fn test_deterministic_across_pool_sizes() {
        let solver = evolver(SpeciatedConfig::default().with_population_size(16), 2.0, 4);
        let run = |threads: usize| {
            let pool = pool(threads);
            let mut rng = create_rng(99);
            let mut state = solver.init(sphere(), &mut rng, &pool).unwrap();
            let mut trace = vec![fingerprint(&state)];
            while !solver.terminate(&state) {
                state = solver.update(&mut rng, &pool, &state).unwrap();
                trace.push(fingerprint(&state));
            }
            trace
        };
        assert_eq!(run(1), run(4));
    }

    #[test]
    fn test_rejects_empty_partition() {
        struct Nothing;
        impl Speciator<Vec<f64>> for Nothing {
            fn speciate(&self, _: &[&Vec<f64>]) -> Vec<Species> {
                Vec::new()
            }
        }

        let solver = SpeciatedEvolver::new(
            SpeciatedConfig::default().with_population_size(8),
            uniform_breeder(2, -1.0, 1.0),
            OperatorSet::new().with(GaussianMutation { sigma: 0.1 }, 1.0),
            Nothing,
            StopCondition::iterations(1),
        )
        .unwrap();
        let pool = pool(1);
        let mut rng = create_rng(1);
        let state = solver.init(sphere(), &mut rng, &pool).unwrap();
        let err = solver.update(&mut rng, &pool, &state).unwrap_err();
        assert!(matches!(err, SolverError::InvalidConfig(_)));
    }

    /// Speciator returning a fixed partition whatever the population.
    struct Fixed(Vec<Species>);

    impl Speciator<Vec<f64>> for Fixed {
        fn speciate(&self, _: &[&Vec<f64>]) -> Vec<Species> {
            self.0.clone()
        }
    }

    fn update_with(partition: Vec<Species>) -> SolverResult<SpeciatedState<Sphere, Vec<f64>>> {
        let solver = SpeciatedEvolver::new(
            SpeciatedConfig::default().with_population_size(4),
            uniform_breeder(2, -1.0, 1.0),
            OperatorSet::new().with(GaussianMutation { sigma: 0.1 }, 1.0),
            Fixed(partition),
            StopCondition::iterations(1),
        )
        .unwrap();
        let pool = pool(1);
        let mut rng = create_rng(1);
        let state = solver.init(sphere(), &mut rng, &pool).unwrap();
        solver.update(&mut rng, &pool, &state)
    }

    #[test]
    fn test_rejects_malformed_partitions() {
        let species = |representative: usize, members: Vec<usize>| Species {
            representative,
            members,
        };

        // Member 1 listed twice.
        let duplicated = update_with(vec![species(0, vec![0, 1]), species(1, vec![1, 2, 3])]);
        assert!(matches!(duplicated, Err(SolverError::InvalidConfig(_))));

        // Member 3 missing.
        let omitted = update_with(vec![species(0, vec![0, 1, 2])]);
        assert!(matches!(omitted, Err(SolverError::InvalidConfig(_))));

        // Out of range.
        let outside = update_with(vec![species(0, vec![0, 1, 2, 3, 4])]);
        assert!(matches!(outside, Err(SolverError::InvalidConfig(_))));

        // Representative outside its species.
        let stray = update_with(vec![species(2, vec![0, 1]), species(3, vec![2, 3])]);
        assert!(matches!(stray, Err(SolverError::InvalidConfig(_))));

        let valid = update_with(vec![species(0, vec![0, 1]), species(3, vec![2, 3])]);
        assert_eq!(valid.unwrap().run().population().len(), 4);
    }

    #[test]
    fn test_plan_tolerates_nan_qualities() {
        let problem = sphere();
        let qualities: Vec<f64> = (0..48)
            .map(|i| if i % 4 == 1 { f64::NAN } else { i as f64 })
            .collect();
        let species = vec![
            Species {
                representative: 1,
                members: (0..24).collect(),
            },
            Species {
                representative: 24,
                members: (24..48).collect(),
            },
        ];
        let config = SpeciatedConfig::default().with_population_size(48);
        let plan = plan_reproduction(&qualities, &species, &config, |a, b| {
            problem.total_order(a, b)
        });

        assert_eq!(plan.elites[0], 0);
        for ranked in &plan.ranked_members {
            let finite = ranked.iter().take_while(|&&i| !qualities[i].is_nan()).count();
            assert_eq!(finite, 18);
        }
        // The NaN representative ranks below the finite one.
        assert!(plan.quotas[1] > plan.quotas[0]);
        assert_eq!(plan.elites.len() + plan.offspring(), 48);
    }

    #[test]
    fn test_rejects_invalid_operators() {
        let result = SpeciatedEvolver::new(
            SpeciatedConfig::default(),
            uniform_breeder(2, -1.0, 1.0),
            OperatorSet::new().with(FnOperator::new(0, |_: &[Vec<f64>], _| vec![]), 1.0),
            LazySpeciator::new(1.0, |a: &Vec<f64>, b: &Vec<f64>| euclidean_distance(a, b)),
            StopCondition::iterations(1),
        );
        assert!(matches!(result, Err(SolverError::InvalidConfig(_))));
    }

    #[test]
    fn test_solve_returns_front() {
        let solver = evolver(SpeciatedConfig::default().with_population_size(20), 1.0, 15);
        let mut seen = 0;
        let best = solver
            .solve_with_listener(sphere(), &mut create_rng(3), &pool(2), |_| seen += 1)
            .unwrap();
        assert!(!best.is_empty());
        // Initial state plus one per iteration.
        assert_eq!(seen, 16);
    }

    fn species_strategy() -> impl Strategy<Value = (Vec<f64>, Vec<Species>)> {
        prop::collection::vec(1usize..8, 1..10).prop_flat_map(|sizes| {
            let n: usize = sizes.iter().sum();
            prop::collection::vec(0.0f64..100.0, n).prop_map(move |qualities| {
                let mut next = 0;
                let species = sizes
                    .iter()
                    .map(|&size| {
                        let members: Vec<usize> = (next..next + size).collect();
                        next += size;
                        Species {
                            representative: members[0],
                            members,
                        }
                    })
                    .collect();
                (qualities, species)
            })
        })
    }

    proptest! {
        #[test]
        fn prop_elites_plus_offspring_fill_population(
            (qualities, species) in species_strategy(),
            population_size in 1usize..80,
            min_size in 0usize..6,
            rank_base in 0.01f64..4.0,
        ) {
            let config = SpeciatedConfig::default()
                .with_population_size(population_size)
                .with_min_species_size_for_elitism(min_size)
                .with_rank_base(rank_base);
            let plan = plan_reproduction(&qualities, &species, &config, |a: &f64, b: &f64| {
                a.total_cmp(b)
            });
            prop_assert_eq!(plan.elites.len() + plan.offspring(), population_size);
            prop_assert_eq!(plan.quotas.len(), species.len());
        }
    }
}
