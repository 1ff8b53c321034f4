//! DAG-backed partially ordered collection.

use super::comparator::PartialComparatorOutcome;
use crate::error::SolverResult;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// Shared partial comparator over `T`.
pub type Comparator<T> =
    Arc<dyn Fn(&T, &T) -> SolverResult<PartialComparatorOutcome> + Send + Sync>;

/// A bucket of mutually `Same` elements plus its edges.
///
/// `before` holds the nodes preceding this one, `after` the nodes it
/// precedes. A node never references itself and is never empty.
#[derive(Clone)]
struct Node<T> {
    members: Vec<T>,
    before: BTreeSet<u64>,
    after: BTreeSet<u64>,
}

/// A collection grouped by a pluggable partial comparator.
///
/// Elements that compare `Same` share a bucket; buckets form a DAG whose
/// edges follow `Before`/`After` outcomes. Buckets with no incoming edge are
/// the non-dominated elements ([`firsts`](Self::firsts)), buckets with no
/// outgoing edge the most dominated ones ([`lasts`](Self::lasts)).
///
/// Insertion is O(n) comparisons. Iteration follows bucket creation order,
/// so every view is deterministic.
///
/// # Example
///
/// ```
/// use u_popsearch::order::{pareto_dominance, PartialOrderSet};
///
/// let mut set = PartialOrderSet::new(|a: &Vec<f64>, b: &Vec<f64>| pareto_dominance(a, b));
/// set.add(vec![1.0, 5.0]).unwrap();
/// set.add(vec![5.0, 1.0]).unwrap();
/// set.add(vec![6.0, 6.0]).unwrap();
///
/// assert_eq!(set.firsts().len(), 2);
/// assert_eq!(set.lasts(), vec![&vec![6.0, 6.0]]);
/// ```
pub struct PartialOrderSet<T> {
    nodes: BTreeMap<u64, Node<T>>,
    next_node: u64,
    size: usize,
    comparator: Comparator<T>,
}

impl<T> PartialOrderSet<T> {
    /// Creates an empty set ordered by `comparator`.
    pub fn new<F>(comparator: F) -> Self
    where
        F: Fn(&T, &T) -> SolverResult<PartialComparatorOutcome> + Send + Sync + 'static,
    {
        Self::with_comparator(Arc::new(comparator))
    }

    /// Creates an empty set sharing an existing comparator.
    pub fn with_comparator(comparator: Comparator<T>) -> Self {
        Self {
            nodes: BTreeMap::new(),
            next_node: 0,
            size: 0,
            comparator,
        }
    }

    /// An empty set with the same comparator as `self`.
    pub fn empty_like(&self) -> Self {
        Self::with_comparator(Arc::clone(&self.comparator))
    }

    /// The comparator ordering this set.
    pub fn comparator(&self) -> &Comparator<T> {
        &self.comparator
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the set holds no element.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Inserts `item`.
    ///
    /// `item` is compared against one representative per bucket. It joins
    /// the first bucket reporting `Same`; otherwise it gets a new bucket
    /// linked to every comparable one.
    ///
    /// # Errors
    ///
    /// Propagates comparator errors. The set is left untouched on error.
    pub fn add(&mut self, item: T) -> SolverResult<()> {
        let mut links = Vec::with_capacity(self.nodes.len());
        let mut join = None;

        for (&id, node) in &self.nodes {
            match (self.comparator)(&item, &node.members[0])? {
                PartialComparatorOutcome::Same => {
                    join = Some(id);
                    break;
                }
                PartialComparatorOutcome::NotComparable => {}
                outcome => links.push((id, outcome)),
            }
        }

        self.size += 1;

        if let Some(id) = join {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.members.push(item);
            }
            return Ok(());
        }

        let new_id = self.next_node;
        self.next_node += 1;

        let mut node = Node {
            members: vec![item],
            before: BTreeSet::new(),
            after: BTreeSet::new(),
        };
        for (id, outcome) in links {
            let Some(other) = self.nodes.get_mut(&id) else {
                continue;
            };
            match outcome {
                PartialComparatorOutcome::Before => {
                    node.after.insert(id);
                    other.before.insert(new_id);
                }
                PartialComparatorOutcome::After => {
                    node.before.insert(id);
                    other.after.insert(new_id);
                }
                _ => {}
            }
        }
        self.nodes.insert(new_id, node);
        Ok(())
    }

    /// Inserts every element of `items`, stopping at the first error.
    pub fn add_all<I: IntoIterator<Item = T>>(&mut self, items: I) -> SolverResult<()> {
        for item in items {
            self.add(item)?;
        }
        Ok(())
    }

    /// Iterates over all elements, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.nodes.values().flat_map(|n| n.members.iter())
    }

    /// All elements, bucket by bucket.
    pub fn all(&self) -> Vec<&T> {
        self.iter().collect()
    }

    /// Elements of buckets with no predecessor (the non-dominated ones).
    pub fn firsts(&self) -> Vec<&T> {
        self.nodes
            .values()
            .filter(|n| n.before.is_empty())
            .flat_map(|n| n.members.iter())
            .collect()
    }

    /// Elements of buckets with no successor (the most dominated ones).
    pub fn lasts(&self) -> Vec<&T> {
        self.nodes
            .values()
            .filter(|n| n.after.is_empty())
            .flat_map(|n| n.members.iter())
            .collect()
    }

    /// Layered partition: front 0 is [`firsts`](Self::firsts), each next
    /// front is the firsts of what remains once earlier fronts are removed.
    ///
    /// A non-transitive comparator may leave a residue in which every bucket
    /// has a predecessor (a cycle); that residue is returned as the last
    /// front.
    pub fn fronts(&self) -> Vec<Vec<&T>> {
        let mut residual: BTreeSet<u64> = self.nodes.keys().copied().collect();
        let mut fronts = Vec::new();

        while !residual.is_empty() {
            let layer: Vec<u64> = residual
                .iter()
                .copied()
                .filter(|id| {
                    self.nodes[id]
                        .before
                        .iter()
                        .all(|pred| !residual.contains(pred))
                })
                .collect();

            let layer = if layer.is_empty() {
                residual.iter().copied().collect()
            } else {
                layer
            };

            for id in &layer {
                residual.remove(id);
            }
            fronts.push(
                layer
                    .iter()
                    .flat_map(|id| self.nodes[id].members.iter())
                    .collect(),
            );
        }

        fronts
    }
}

impl<T: PartialEq> PartialOrderSet<T> {
    /// Whether an element equal to `item` is present.
    pub fn contains(&self, item: &T) -> bool {
        self.iter().any(|t| t == item)
    }

    /// Removes one element equal to `item`. Returns whether one was found.
    ///
    /// A bucket left empty is excised together with every edge touching it;
    /// its former neighbours are not re-linked to each other.
    pub fn remove(&mut self, item: &T) -> bool {
        let found = self.nodes.iter().find_map(|(&id, node)| {
            node.members
                .iter()
                .position(|t| t == item)
                .map(|pos| (id, pos))
        });

        let Some((id, pos)) = found else {
            return false;
        };

        self.size -= 1;
        let emptied = match self.nodes.get_mut(&id) {
            Some(node) => {
                node.members.remove(pos);
                node.members.is_empty()
            }
            None => false,
        };

        if emptied {
            self.nodes.remove(&id);
            for node in self.nodes.values_mut() {
                node.before.remove(&id);
                node.after.remove(&id);
            }
        }
        true
    }
}

impl<T: Clone> Clone for PartialOrderSet<T> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes.clone(),
            next_node: self.next_node,
            size: self.size,
            comparator: Arc::clone(&self.comparator),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PartialOrderSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartialOrderSet")
            .field("size", &self.size)
            .field("buckets", &self.nodes.len())
            .field("firsts", &self.firsts())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SolverError;
    use crate::order::{natural_order, non_dominated_sort, pareto_dominance};
    use proptest::prelude::*;

    fn pareto_set() -> PartialOrderSet<Vec<f64>> {
        PartialOrderSet::new(|a: &Vec<f64>, b: &Vec<f64>| pareto_dominance(a, b))
    }

    fn sorted(mut v: Vec<Vec<f64>>) -> Vec<Vec<f64>> {
        v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        v
    }

    fn owned(v: Vec<&Vec<f64>>) -> Vec<Vec<f64>> {
        sorted(v.into_iter().cloned().collect())
    }

    #[test]
    fn test_empty() {
        let set = pareto_set();
        assert!(set.is_empty());
        assert!(set.firsts().is_empty());
        assert!(set.lasts().is_empty());
        assert!(set.fronts().is_empty());
    }

    #[test]
    fn test_firsts_and_lasts() {
        let mut set = pareto_set();
        set.add_all(vec![
            vec![1.0, 5.0],
            vec![3.0, 3.0],
            vec![5.0, 1.0],
            vec![4.0, 4.0],
            vec![6.0, 6.0],
        ])
        .unwrap();

        assert_eq!(set.len(), 5);
        assert_eq!(
            owned(set.firsts()),
            vec![vec![1.0, 5.0], vec![3.0, 3.0], vec![5.0, 1.0]]
        );
        // (1,5) and (5,1) dominate nothing but (6,6); (6,6) is dominated by all.
        assert_eq!(owned(set.lasts()), vec![vec![6.0, 6.0]]);
    }

    #[test]
    fn test_same_joins_first_bucket() {
        let mut set = pareto_set();
        set.add(vec![2.0, 2.0]).unwrap();
        set.add(vec![2.0, 2.0]).unwrap();
        set.add(vec![3.0, 3.0]).unwrap();

        let fronts = set.fronts();
        assert_eq!(fronts.len(), 2);
        assert_eq!(fronts[0].len(), 2);
        assert_eq!(set.nodes.len(), 2);
    }

    #[test]
    fn test_fronts_layers() {
        let mut set = pareto_set();
        set.add_all(vec![
            vec![1.0, 5.0],
            vec![3.0, 3.0],
            vec![5.0, 1.0],
            vec![4.0, 4.0],
            vec![6.0, 6.0],
        ])
        .unwrap();

        let fronts = set.fronts();
        assert_eq!(fronts.len(), 3);
        assert_eq!(fronts[0].len(), 3);
        assert_eq!(owned(fronts[1].clone()), vec![vec![4.0, 4.0]]);
        assert_eq!(owned(fronts[2].clone()), vec![vec![6.0, 6.0]]);
    }

    #[test]
    fn test_remove_excises_bucket_without_relinking() {
        let mut set = PartialOrderSet::new(|a: &i32, b: &i32| Ok(natural_order(a, b)));
        set.add_all(vec![1, 2, 3]).unwrap();
        assert!(set.remove(&2));
        assert_eq!(set.len(), 2);
        // 1 -> 3 was linked directly at insertion, so it survives.
        assert_eq!(set.firsts(), vec![&1]);
        assert_eq!(set.lasts(), vec![&3]);
        assert!(!set.remove(&42));
    }

    #[test]
    fn test_remove_keeps_bucket_with_members() {
        let mut set = PartialOrderSet::new(|a: &(i32, char), b: &(i32, char)| {
            Ok(natural_order(&a.0, &b.0))
        });
        set.add_all(vec![(1, 'a'), (1, 'b'), (2, 'c')]).unwrap();
        assert!(set.remove(&(1, 'a')));
        assert_eq!(set.firsts(), vec![&(1, 'b')]);
        assert_eq!(set.lasts(), vec![&(2, 'c')]);
    }

    #[test]
    fn test_non_transitive_cycle_terminates() {
        // rock(0) beats scissors(2), scissors beats paper(1), paper beats rock
        let beats = |a: &u8, b: &u8| -> SolverResult<PartialComparatorOutcome> {
            Ok(match (a, b) {
                (x, y) if x == y => PartialComparatorOutcome::Same,
                (0, 2) | (2, 1) | (1, 0) => PartialComparatorOutcome::Before,
                _ => PartialComparatorOutcome::After,
            })
        };
        let mut set = PartialOrderSet::new(beats);
        set.add_all(vec![0, 1, 2]).unwrap();
        assert!(set.firsts().is_empty());
        let fronts = set.fronts();
        assert_eq!(fronts.len(), 1);
        assert_eq!(fronts[0].len(), 3);
    }

    #[test]
    fn test_mismatched_shape_fails_at_comparison() {
        let mut set = pareto_set();
        set.add(vec![1.0, 2.0]).unwrap();
        let err = set.add(vec![1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, SolverError::InvalidInput(_)));
        // Untouched on error.
        assert_eq!(set.len(), 1);
        assert_eq!(set.nodes.len(), 1);
    }

    #[test]
    fn test_fronts_match_batch_sort() {
        let points = vec![
            vec![1.0, 5.0],
            vec![3.0, 3.0],
            vec![5.0, 1.0],
            vec![4.0, 4.0],
            vec![6.0, 6.0],
            vec![2.0, 7.0],
        ];
        let mut set = pareto_set();
        set.add_all(points.clone()).unwrap();
        let batch = non_dominated_sort(&points).unwrap();

        let fronts = set.fronts();
        assert_eq!(fronts.len(), batch.fronts.len());
        for (layer, indices) in fronts.iter().zip(batch.fronts.iter()) {
            let expected = sorted(indices.iter().map(|&i| points[i].clone()).collect());
            assert_eq!(owned(layer.clone()), expected);
        }
    }

    fn points_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
        prop::collection::vec(prop::collection::vec(0u8..6, 2), 1..24).prop_map(|pts| {
            pts.into_iter()
                .map(|p| p.into_iter().map(f64::from).collect())
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_fronts_partition_all(points in points_strategy()) {
            let mut set = pareto_set();
            set.add_all(points.clone()).unwrap();
            let fronts = set.fronts();

            let flattened: Vec<&Vec<f64>> = fronts.iter().flatten().copied().collect();
            prop_assert_eq!(owned(flattened), owned(set.all()));
            prop_assert_eq!(owned(fronts[0].clone()), owned(set.firsts()));

            // Nothing in an earlier front is dominated by anything later.
            for i in 0..fronts.len() {
                for j in (i + 1)..fronts.len() {
                    for a in &fronts[i] {
                        for b in &fronts[j] {
                            prop_assert_ne!(
                                pareto_dominance(b, a).unwrap(),
                                PartialComparatorOutcome::Before
                            );
                        }
                    }
                }
            }
        }

        #[test]
        fn prop_remove_then_add_round_trip(points in points_strategy(), pick in 0usize..64) {
            let mut set = pareto_set();
            set.add_all(points.clone()).unwrap();
            let firsts = owned(set.firsts());
            let lasts = owned(set.lasts());

            let victim = points[pick % points.len()].clone();
            prop_assert!(set.remove(&victim));
            set.add(victim).unwrap();

            prop_assert_eq!(owned(set.firsts()), firsts);
            prop_assert_eq!(owned(set.lasts()), lasts);
        }
    }
}
