//! Particle swarm configuration.

use crate::error::{SolverError, SolverResult};

/// Configuration for the particle swarm optimizer.
///
/// The defaults are the constriction coefficients of Clerc & Kennedy (2002).
///
/// # Examples
///
/// ```
/// use u_popsearch::pso::PsoConfig;
///
/// let config = PsoConfig::default()
///     .with_population_size(40)
///     .with_inertia(0.6);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PsoConfig {
    /// Number of particles.
    pub population_size: usize,

    /// Weight `w` of the previous velocity.
    pub inertia: f64,

    /// Attraction `φ_p` towards the particle's own best position.
    pub phi_particle: f64,

    /// Attraction `φ_g` towards the swarm's best position.
    pub phi_global: f64,
}

impl Default for PsoConfig {
    fn default() -> Self {
        Self {
            population_size: 30,
            inertia: 0.7298,
            phi_particle: 1.49618,
            phi_global: 1.49618,
        }
    }
}

impl PsoConfig {
    /// Sets the number of particles.
    pub fn with_population_size(mut self, n: usize) -> Self {
        self.population_size = n;
        self
    }

    /// Sets the inertia weight.
    pub fn with_inertia(mut self, w: f64) -> Self {
        self.inertia = w;
        self
    }

    /// Sets the personal-best attraction.
    pub fn with_phi_particle(mut self, phi: f64) -> Self {
        self.phi_particle = phi;
        self
    }

    /// Sets the global-best attraction.
    pub fn with_phi_global(mut self, phi: f64) -> Self {
        self.phi_global = phi;
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SolverResult<()> {
        if self.population_size == 0 {
            return Err(SolverError::config("population_size must be at least 1"));
        }
        if !self.inertia.is_finite() {
            return Err(SolverError::config("inertia must be finite"));
        }
        for (name, phi) in [
            ("phi_particle", self.phi_particle),
            ("phi_global", self.phi_global),
        ] {
            if !(phi.is_finite() && phi >= 0.0) {
                return Err(SolverError::config(format!(
                    "{name} must be non-negative and finite, got {phi}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(PsoConfig::default().validate().is_ok());
        assert!(PsoConfig::default().with_population_size(0).validate().is_err());
        assert!(PsoConfig::default().with_phi_global(-1.0).validate().is_err());
        assert!(PsoConfig::default()
            .with_inertia(f64::INFINITY)
            .validate()
            .is_err());
    }
}
