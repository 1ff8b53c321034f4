//! Speciated evolver.
//!
//! An evolutionary solver that protects population diversity by breeding
//! within species of similar genotypes.
//!
//! # Algorithm
//!
//! 1. Partition the population with a [`Speciator`]
//! 2. Keep the overall best and the best of each species with at least
//!    [`min_species_size_for_elitism`](SpeciatedConfig::min_species_size_for_elitism)
//!    members
//! 3. Rank species by their representative's quality; the species at rank
//!    `r` breeds a share proportional to `rank_base^r` of the remaining slots
//! 4. Within a species, parents are taken cyclically from its members in
//!    quality order and operators are drawn by weight
//!
//! # References
//!
//! - Stanley & Miikkulainen (2002), "Evolving Neural Networks through
//!   Augmenting Topologies"
//! - Goldberg & Richardson (1987), "Genetic algorithms with sharing for
//!   multimodal function optimization"

mod config;
mod runner;
mod speciator;

pub use config::SpeciatedConfig;
pub use runner::{plan_reproduction, rank_quotas, ReproductionPlan, SpeciatedEvolver, SpeciatedState};
pub use speciator::{euclidean_distance, LazySpeciator, Speciator, Species};
