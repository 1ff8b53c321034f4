//! Cellular solver configuration.

use crate::error::{SolverError, SolverResult};
use crate::selection::Selection;

/// Configuration for the cellular solver.
///
/// # Examples
///
/// ```
/// use u_popsearch::cellular::CellularConfig;
/// use u_popsearch::selection::Selection;
///
/// let config = CellularConfig::default()
///     .with_keep_probability(0.3)
///     .with_selection(Selection::Firsts);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellularConfig {
    /// Probability that a cell skips reproduction in a given iteration.
    pub keep_probability: f64,

    /// How mates are chosen among a cell's occupied neighbours.
    pub selection: Selection,
}

impl Default for CellularConfig {
    fn default() -> Self {
        Self {
            keep_probability: 0.2,
            selection: Selection::Tournament(2),
        }
    }
}

impl CellularConfig {
    /// Sets the keep probability.
    pub fn with_keep_probability(mut self, p: f64) -> Self {
        self.keep_probability = p;
        self
    }

    /// Sets the mate selection strategy.
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SolverResult<()> {
        if !(0.0..=1.0).contains(&self.keep_probability) {
            return Err(SolverError::config(format!(
                "keep_probability must be in [0, 1], got {}",
                self.keep_probability
            )));
        }
        if let Selection::Tournament(0) = self.selection {
            return Err(SolverError::config("tournament size must be at least 1"));
        }
        Ok(())
    }
}
