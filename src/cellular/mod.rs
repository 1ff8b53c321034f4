//! Cellular evolutionary algorithm.
//!
//! Individuals occupy the active cells of a 2-D grid (the *substrate*) and
//! breed only within a local [`Neighborhood`]. Restricting mating this way
//! slows the spread of good genes and keeps the population diverse.
//!
//! A cell's occupant is replaced only by a strictly better child, so the
//! quality of every cell is monotone over the run.

mod config;
mod grid;
mod neighborhood;
mod runner;

pub use config::CellularConfig;
pub use grid::Grid;
pub use neighborhood::{MooreNeighborhood, Neighborhood, VonNeumannNeighborhood};
pub use runner::{CellularSolver, CellularState};
