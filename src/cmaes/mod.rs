//! Covariance Matrix Adaptation Evolution Strategy (CMA-ES).
//!
//! Samples candidates from a multivariate normal distribution and adapts its
//! mean, global step size σ and covariance matrix `C = B·D²·Bᵗ` from the
//! best samples of each generation.
//!
//! # Algorithm
//!
//! 1. Sample λ points `x = m + σ·B·(D∘z)`, `z ~ N(0, I)`, and evaluate them
//! 2. Move the mean to the weighted average of the μ best
//! 3. Update the evolution paths, then `C` (rank-one + rank-μ) and σ
//!    (cumulative step-size adaptation)
//! 4. Every few generations, re-factor `C` into `B` and `D`
//!
//! Negative eigenvalues from rounding are clamped to zero and a generation
//! where most samples tie for best inflates σ; both are logged as warnings.

mod config;
mod runner;

pub use config::{CmaEsConfig, CmaParameters};
pub use runner::{decompose, CmaEs, CmaEsState};
