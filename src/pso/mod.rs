//! Particle Swarm Optimization (PSO).
//!
//! A swarm of particles moves through a real-valued search space, each
//! pulled towards its own best position and the swarm's best position.
//!
//! # Key Types
//!
//! - [`PsoConfig`]: inertia and attraction coefficients
//! - [`ParticleSwarm`]: the solver
//! - [`PsoState`]: run state plus particles and the swarm's best

mod config;
mod runner;

pub use config::PsoConfig;
pub use runner::{Particle, ParticleSwarm, PsoState};
