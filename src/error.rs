//! Crate-wide error type.

/// Errors raised while configuring or running a solver.
///
/// Configuration problems are reported eagerly, when a solver is built.
/// Run-time failures abort the current generation and are returned from
/// [`solve`](crate::solver::IterativeSolver::solve) unchanged.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolverError {
    /// A parameter or collaborator was rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two values of incompatible shape were compared or combined.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A user-supplied quality function failed.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// A numerical procedure produced values that cannot be recovered.
    #[error("numerical failure: {0}")]
    Numerical(String),
}

impl SolverError {
    /// Shorthand for [`SolverError::InvalidConfig`].
    pub fn config(msg: impl Into<String>) -> Self {
        SolverError::InvalidConfig(msg.into())
    }

    /// Shorthand for [`SolverError::InvalidInput`].
    pub fn input(msg: impl Into<String>) -> Self {
        SolverError::InvalidInput(msg.into())
    }

    /// Shorthand for [`SolverError::Evaluation`].
    pub fn evaluation(msg: impl Into<String>) -> Self {
        SolverError::Evaluation(msg.into())
    }

    /// Shorthand for [`SolverError::Numerical`].
    pub fn numerical(msg: impl Into<String>) -> Self {
        SolverError::Numerical(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type SolverResult<T> = Result<T, SolverError>;
