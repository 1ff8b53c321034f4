//! CMA-ES configuration and strategy parameters.

use crate::error::{SolverError, SolverResult};

/// User-facing CMA-ES configuration.
///
/// # Examples
///
/// ```
/// use u_popsearch::cmaes::CmaEsConfig;
///
/// let config = CmaEsConfig::default()
///     .with_initial_sigma(2.0)
///     .with_population_size(16);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CmaEsConfig {
    /// Samples per generation (λ). `None` uses `4 + ⌊3 ln n⌋`.
    pub population_size: Option<usize>,

    /// Initial global step size σ₀.
    ///
    /// Roughly a third of the expected distance to the optimum works well.
    pub initial_sigma: f64,

    /// If more than this fraction of a generation ties for best, σ is
    /// inflated (flat fitness).
    pub flat_fitness_fraction: f64,
}

impl Default for CmaEsConfig {
    fn default() -> Self {
        Self {
            population_size: None,
            initial_sigma: 0.5,
            flat_fitness_fraction: 0.7,
        }
    }
}

impl CmaEsConfig {
    /// Overrides λ.
    pub fn with_population_size(mut self, lambda: usize) -> Self {
        self.population_size = Some(lambda);
        self
    }

    /// Sets σ₀.
    pub fn with_initial_sigma(mut self, sigma: f64) -> Self {
        self.initial_sigma = sigma;
        self
    }

    /// Sets the flat-fitness fraction.
    pub fn with_flat_fitness_fraction(mut self, fraction: f64) -> Self {
        self.flat_fitness_fraction = fraction;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SolverResult<()> {
        if let Some(lambda) = self.population_size {
            if lambda < 2 {
                return Err(SolverError::config("population_size must be at least 2"));
            }
        }
        if !(self.initial_sigma.is_finite() && self.initial_sigma > 0.0) {
            return Err(SolverError::config(format!(
                "initial_sigma must be positive and finite, got {}",
                self.initial_sigma
            )));
        }
        if !(self.flat_fitness_fraction > 0.0 && self.flat_fitness_fraction <= 1.0) {
            return Err(SolverError::config(format!(
                "flat_fitness_fraction must be in (0, 1], got {}",
                self.flat_fitness_fraction
            )));
        }
        Ok(())
    }
}

/// Strategy parameters derived from the problem dimension.
///
/// Default settings from Hansen (2016), "The CMA Evolution Strategy: A
/// Tutorial", Table 1.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CmaParameters {
    /// Search-space dimension `n`.
    pub dimension: usize,
    /// Samples per generation λ.
    pub lambda: usize,
    /// Parents per generation μ.
    pub mu: usize,
    /// Recombination weights, decreasing, summing to 1.
    pub weights: Vec<f64>,
    /// Variance-effective selection mass `1 / Σ wᵢ²`.
    pub mu_eff: f64,
    pub c_sigma: f64,
    pub d_sigma: f64,
    pub c_c: f64,
    pub c1: f64,
    pub c_mu: f64,
    /// `E‖N(0, I)‖`.
    pub chi_n: f64,
    /// Generations between eigen-decompositions of C.
    pub eigen_interval: f64,
}

impl CmaParameters {
    /// Derives the parameters for dimension `n`, optionally overriding λ.
    pub fn new(n: usize, population_size: Option<usize>) -> SolverResult<Self> {
        if n == 0 {
            return Err(SolverError::input("search space must have at least one dimension"));
        }
        let nf = n as f64;
        let lambda = population_size.unwrap_or(4 + (3.0 * nf.ln()).floor() as usize);
        if lambda < 2 {
            return Err(SolverError::config("population_size must be at least 2"));
        }
        let mu = lambda / 2;

        let raw: Vec<f64> = (1..=mu)
            .map(|i| ((lambda as f64 + 1.0) / 2.0).ln() - (i as f64).ln())
            .collect();
        let total: f64 = raw.iter().sum();
        let weights: Vec<f64> = raw.iter().map(|w| w / total).collect();
        let mu_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let c_sigma = (mu_eff + 2.0) / (nf + mu_eff + 5.0);
        let d_sigma =
            1.0 + 2.0 * (((mu_eff - 1.0) / (nf + 1.0)).sqrt() - 1.0).max(0.0) + c_sigma;
        let c_c = (4.0 + mu_eff / nf) / (nf + 4.0 + 2.0 * mu_eff / nf);
        let c1 = 2.0 / ((nf + 1.3).powi(2) + mu_eff);
        let c_mu = (1.0 - c1)
            .min(2.0 * (mu_eff - 2.0 + 1.0 / mu_eff) / ((nf + 2.0).powi(2) + mu_eff));
        let chi_n = nf.sqrt() * (1.0 - 1.0 / (4.0 * nf) + 1.0 / (21.0 * nf * nf));
        let eigen_interval = 1.0 / (c1 + c_mu) / nf / 10.0;

        Ok(Self {
            dimension: n,
            lambda,
            mu,
            weights,
            mu_eff,
            c_sigma,
            d_sigma,
            c_c,
            c1,
            c_mu,
            chi_n,
            eigen_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validate() {
        assert!(CmaEsConfig::default().validate().is_ok());
        assert!(CmaEsConfig::default().with_population_size(1).validate().is_err());
        assert!(CmaEsConfig::default().with_initial_sigma(0.0).validate().is_err());
        assert!(CmaEsConfig::default()
            .with_flat_fitness_fraction(1.5)
            .validate()
            .is_err());
    }

    #[test]
    fn test_default_parameters_5d() {
        let p = CmaParameters::new(5, None).unwrap();
        assert_eq!(p.lambda, 8);
        assert_eq!(p.mu, 4);
        assert!((p.weights.iter().sum::<f64>() - 1.0).abs() < 1e-12);
        assert!(p.weights.windows(2).all(|w| w[0] > w[1]));
        assert!(p.mu_eff > 1.0 && p.mu_eff < p.mu as f64);
        assert!(p.c1 + p.c_mu <= 1.0);
        assert!(p.c_sigma > 0.0 && p.c_sigma < 1.0);
        assert!(p.d_sigma >= 1.0);
        assert!((p.chi_n - 2.13).abs() < 0.01);
    }

    #[test]
    fn test_population_override() {
        let p = CmaParameters::new(3, Some(20)).unwrap();
        assert_eq!(p.lambda, 20);
        assert_eq!(p.mu, 10);
        assert_eq!(p.weights.len(), 10);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(matches!(
            CmaParameters::new(0, None),
            Err(SolverError::InvalidInput(_))
        ));
    }
}
