//! Speciated evolver configuration.

use crate::error::{SolverError, SolverResult};

/// Configuration for the speciated evolver.
///
/// # Examples
///
/// ```
/// use u_popsearch::speciated::SpeciatedConfig;
///
/// let config = SpeciatedConfig::default()
///     .with_population_size(60)
///     .with_min_species_size_for_elitism(3)
///     .with_rank_base(0.8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeciatedConfig {
    /// Number of individuals kept each generation.
    pub population_size: usize,

    /// A species' best member survives unchanged only if the species has at
    /// least this many members. The overall best always survives.
    pub min_species_size_for_elitism: usize,

    /// Offspring share of the species ranked `r` is proportional to
    /// `rank_base^r`.
    ///
    /// Below 1.0 favours top-ranked species; 1.0 splits evenly.
    pub rank_base: f64,
}

impl Default for SpeciatedConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            min_species_size_for_elitism: 5,
            rank_base: 0.9,
        }
    }
}

impl SpeciatedConfig {
    /// Sets the population size.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the minimum species size for per-species elitism.
    pub fn with_min_species_size_for_elitism(mut self, n: usize) -> Self {
        self.min_species_size_for_elitism = n;
        self
    }

    /// Sets the rank base.
    pub fn with_rank_base(mut self, base: f64) -> Self {
        self.rank_base = base;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SolverResult<()> {
        if self.population_size == 0 {
            return Err(SolverError::config("population_size must be at least 1"));
        }
        if !(self.rank_base.is_finite() && self.rank_base > 0.0) {
            return Err(SolverError::config(format!(
                "rank_base must be positive and finite, got {}",
                self.rank_base
            )));
        }
        Ok(())
    }
}
