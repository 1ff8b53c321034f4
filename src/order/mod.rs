//! Partial-order machinery for ranking populations.
//!
//! Dominance is usually not a total order: two candidates may each be better
//! on a different objective. [`PartialOrderSet`] keeps such a population as a
//! DAG of equivalence buckets and exposes the non-dominated elements, the
//! most dominated ones and the full layering into fronts.
//!
//! - [`PartialComparatorOutcome`]: four-valued comparison result
//! - [`pareto_dominance`], [`natural_order`]: stock comparators
//! - [`PartialOrderSet`]: the DAG collection
//! - [`non_dominated_sort`]: batch sorting by index (NSGA-II style)

mod comparator;
mod pareto;
mod set;

pub use comparator::{natural_order, pareto_dominance, PartialComparatorOutcome};
pub use pareto::{non_dominated_sort, NondominatedSortResult};
pub use set::{Comparator, PartialOrderSet};
