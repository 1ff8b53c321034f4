//! Cellular reproduction loop.

use super::config::CellularConfig;
use super::grid::Grid;
use super::neighborhood::Neighborhood;
use crate::error::{SolverError, SolverResult};
use crate::operator::OperatorSet;
use crate::order::PartialComparatorOutcome;
use crate::problem::Problem;
use crate::solver::{fan_out, Breeder, GenotypeUnit, IterativeSolver};
use crate::state::{population_set, IndividualOf, RunState, SolverState, StopCondition};
use rand::rngs::StdRng;
use rand::Rng;
use rayon::ThreadPool;
use std::fmt;
use std::sync::Arc;

/// What happened to one cell during an iteration.
enum CellOutcome<I> {
    /// Skipped reproduction.
    Kept,
    /// Bred a child that did not beat the incumbent.
    Rejected,
    /// Bred a child that replaced the incumbent.
    Replaced(I),
}

/// State of a cellular run.
pub struct CellularState<P: Problem, G> {
    run: RunState<P, G>,
    grid: Grid<Option<IndividualOf<P, G>>>,
    substrate: Arc<Grid<bool>>,
    next_id: u64,
}

impl<P: Problem, G> CellularState<P, G> {
    /// Occupants of every cell; inactive cells are `None`.
    pub fn grid(&self) -> &Grid<Option<IndividualOf<P, G>>> {
        &self.grid
    }

    /// Which cells take part in the run.
    pub fn substrate(&self) -> &Grid<bool> {
        &self.substrate
    }
}

impl<P: Problem, G> SolverState for CellularState<P, G> {
    type Problem = P;
    type Genotype = G;

    fn run(&self) -> &RunState<P, G> {
        &self.run
    }
}

impl<P: Problem, G> fmt::Debug for CellularState<P, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellularState")
            .field("run", &self.run)
            .field("width", &self.grid.width())
            .field("height", &self.grid.height())
            .finish()
    }
}

/// Cellular evolutionary solver.
///
/// Individuals live on the active cells of a 2-D grid and only mate with
/// their neighbours. Each iteration every active cell, independently:
///
/// 1. keeps its occupant with probability `keep_probability`;
/// 2. otherwise picks an operator, takes its occupant as first parent and
///    selects the others from a partial order over its occupied neighbours
///    (falling back to the occupant when it has none);
/// 3. replaces its occupant with the first child only if the child is
///    strictly better.
///
/// Cells see the grid as it was at the start of the iteration.
///
/// # References
///
/// - Alba & Dorronsoro (2008), *Cellular Genetic Algorithms*
pub struct CellularSolver<P: Problem, G> {
    config: CellularConfig,
    breeder: Breeder<P, G>,
    operators: OperatorSet<G>,
    neighborhood: Arc<dyn Neighborhood>,
    substrate: Arc<Grid<bool>>,
    stop_condition: StopCondition<P, G>,
}

impl<P, G> CellularSolver<P, G>
where
    P: Problem,
    G: Clone + Send + Sync + 'static,
{
    /// Builds the solver.
    ///
    /// # Errors
    ///
    /// [`SolverError::InvalidConfig`] for an invalid `config` or
    /// `operators`, or a `substrate` without active cells.
    pub fn new<N>(
        config: CellularConfig,
        breeder: Breeder<P, G>,
        operators: OperatorSet<G>,
        neighborhood: N,
        substrate: Grid<bool>,
        stop_condition: StopCondition<P, G>,
    ) -> SolverResult<Self>
    where
        N: Neighborhood + 'static,
    {
        config.validate()?;
        operators.validate()?;
        if !substrate.cells().iter().any(|&active| active) {
            return Err(SolverError::config("substrate has no active cell"));
        }
        Ok(Self {
            config,
            breeder,
            operators,
            neighborhood: Arc::new(neighborhood),
            substrate: Arc::new(substrate),
            stop_condition,
        })
    }

    pub fn config(&self) -> &CellularConfig {
        &self.config
    }

    /// Runs one cell's reproduction step.
    fn reproduce(
        &self,
        problem: &Arc<P>,
        grid: &Grid<Option<IndividualOf<P, G>>>,
        index: usize,
        id: u64,
        iteration: u64,
        rng: &mut StdRng,
    ) -> SolverResult<CellOutcome<IndividualOf<P, G>>> {
        if rng.random::<f64>() < self.config.keep_probability {
            return Ok(CellOutcome::Kept);
        }
        let Some(incumbent) = grid.cells()[index].as_ref() else {
            return Ok(CellOutcome::Kept);
        };

        let (x, y) = grid.coordinates(index);
        let neighbors = self
            .neighborhood
            .neighbors(x, y, grid.width(), grid.height())
            .into_iter()
            .filter_map(|(nx, ny)| grid.get(nx, ny).and_then(Option::as_ref).cloned());
        let local = population_set(problem, neighbors)?;

        let op = self.operators.pick(rng);
        let mut parents = vec![incumbent];
        for _ in 1..op.arity() {
            parents.push(self.config.selection.select(&local, rng).unwrap_or(incumbent));
        }

        let genotypes: Vec<G> = parents.iter().map(|p| p.genotype().clone()).collect();
        let parent_ids = parents.iter().map(|p| p.id()).collect();
        let child = op
            .apply(&genotypes, rng)
            .into_iter()
            .next()
            .ok_or_else(|| SolverError::input("genetic operator produced no offspring"))?;
        let child = self
            .breeder
            .express(problem, GenotypeUnit::new(id, child, parent_ids), iteration)?;

        match problem.compare(child.quality(), incumbent.quality())? {
            PartialComparatorOutcome::Before => Ok(CellOutcome::Replaced(child)),
            _ => Ok(CellOutcome::Rejected),
        }
    }
}

impl<P, G> IterativeSolver<P> for CellularSolver<P, G>
where
    P: Problem,
    G: Clone + Send + Sync + 'static,
{
    type Genotype = G;
    type State = CellularState<P, G>;

    fn init<R: Rng>(
        &self,
        problem: Arc<P>,
        rng: &mut R,
        pool: &ThreadPool,
    ) -> SolverResult<Self::State> {
        let active: Vec<usize> = self
            .substrate
            .iter()
            .filter(|&(_, _, &on)| on)
            .map(|(x, y, _)| self.substrate.index(x, y))
            .collect();

        let genotypes = self.breeder.initial_genotypes(active.len(), rng)?;
        let units = GenotypeUnit::sequence(0, genotypes.into_iter().map(|g| (g, Vec::new())));
        let individuals = self.breeder.evaluate(&problem, units, 0, rng, pool)?;

        let mut grid = Grid::from_fn(self.substrate.width(), self.substrate.height(), |_, _| None);
        for (&index, individual) in active.iter().zip(individuals) {
            grid.cells_mut()[index] = Some(individual);
        }
        let population = population_set(&problem, grid.cells().iter().flatten().cloned())?;

        Ok(CellularState {
            run: RunState::new(problem, self.stop_condition.clone(), population),
            grid,
            substrate: Arc::clone(&self.substrate),
            next_id: active.len() as u64,
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
        let iteration = run.iterations() + 1;

        let cells: Vec<usize> = state
            .substrate
            .cells()
            .iter()
            .enumerate()
            .filter(|&(i, &on)| on && state.grid.cells()[i].is_some())
            .map(|(i, _)| i)
            .collect();
        let tasks = cells.len() as u64;
        let inputs: Vec<(u64, usize)> = (state.next_id..).zip(cells).collect();

        let outcomes = fan_out(rng, pool, inputs, |(id, index), task_rng| {
            self.reproduce(problem, &state.grid, index, id, iteration, task_rng)
                .map(|outcome| (index, outcome))
        })?;

        let mut grid = state.grid.clone();
        let mut born = 0u64;
        let mut replaced = 0usize;
        for (index, outcome) in outcomes {
            match outcome {
                CellOutcome::Kept => {}
                CellOutcome::Rejected => born += 1,
                CellOutcome::Replaced(child) => {
                    born += 1;
                    replaced += 1;
                    grid.cells_mut()[index] = Some(child);
                }
            }
        }
        let population = population_set(problem, grid.cells().iter().flatten().cloned())?;

        log::debug!(
            "cellular iteration {}: {} children, {} replacements",
            iteration,
            born,
            replaced
        );

        Ok(CellularState {
            run: run.advance(population, born, born),
            grid,
            substrate: Arc::clone(&state.substrate),
            next_id: state.next_id + tasks,
        })
    }
}

impl<P: Problem, G> fmt::Debug for CellularSolver<P, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CellularSolver")
            .field("config", &self.config)
            .field("operators", &self.operators)
            .field("width", &self.substrate.width())
            .field("height", &self.substrate.height())
            .finish()
    }
}
