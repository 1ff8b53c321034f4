//! Partitioning a population into species.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

/// A group of similar individuals, as indices into the speciated slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Species {
    /// Index of the member standing for the whole species.
    pub representative: usize,
    /// Indices of all members, the representative included.
    pub members: Vec<usize>,
}

impl Species {
    /// A species with a single member that is also its representative.
    pub fn founded_by(index: usize) -> Self {
        Self {
            representative: index,
            members: vec![index],
        }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Splits a population of genotypes into species.
pub trait Speciator<G>: Send + Sync {
    /// Partitions `genotypes`. Every index must appear in exactly one
    /// species.
    fn speciate(&self, genotypes: &[&G]) -> Vec<Species>;
}

type DistanceFn<G> = dyn Fn(&G, &G) -> f64 + Send + Sync;

/// Single-pass threshold clustering.
///
/// Genotypes are visited in order. Each joins the species whose
/// representative is nearest, provided that distance is below `threshold`;
/// otherwise it founds a new species and becomes its representative. The
/// result depends on visiting order.
pub struct LazySpeciator<G> {
    distance: Arc<DistanceFn<G>>,
    threshold: f64,
}

impl<G> LazySpeciator<G> {
    pub fn new<F>(threshold: f64, distance: F) -> Self
    where
        F: Fn(&G, &G) -> f64 + Send + Sync + 'static,
    {
        Self {
            distance: Arc::new(distance),
            threshold,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl<G> Speciator<G> for LazySpeciator<G> {
    fn speciate(&self, genotypes: &[&G]) -> Vec<Species> {
        let mut species: Vec<Species> = Vec::new();

        for (i, genotype) in genotypes.iter().enumerate() {
            let nearest = species
                .iter()
                .enumerate()
                .map(|(s, sp)| (s, (self.distance)(*genotype, genotypes[sp.representative])))
                .filter(|&(_, d)| d < self.threshold)
                .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

            match nearest {
                Some((s, _)) => species[s].members.push(i),
                None => species.push(Species::founded_by(i)),
            }
        }

        species
    }
}

impl<G> Clone for LazySpeciator<G> {
    fn clone(&self) -> Self {
        Self {
            distance: Arc::clone(&self.distance),
            threshold: self.threshold,
        }
    }
}

impl<G> fmt::Debug for LazySpeciator<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySpeciator")
            .field("threshold", &self.threshold)
            .finish()
    }
}

/// Euclidean distance between two real vectors.
///
/// Vectors of differing length are infinitely far apart, so they never
/// share a species.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speciator(threshold: f64) -> LazySpeciator<f64> {
        LazySpeciator::new(threshold, |a: &f64, b: &f64| (a - b).abs())
    }

    #[test]
    fn test_groups_by_threshold() {
        let values = [0.0, 0.5, 10.0, 10.4, 0.2];
        let refs: Vec<&f64> = values.iter().collect();
        let species = speciator(1.0).speciate(&refs);

        assert_eq!(species.len(), 2);
        assert_eq!(species[0].representative, 0);
        assert_eq!(species[0].members, vec![0, 1, 4]);
        assert_eq!(species[1].representative, 2);
        assert_eq!(species[1].members, vec![2, 3]);
    }

    #[test]
    fn test_joins_nearest_representative() {
        // 1.0 is within reach of both founders but nearer to 1.5.
        let values = [0.0, 1.5, 1.0];
        let refs: Vec<&f64> = values.iter().collect();
        let species = speciator(1.2).speciate(&refs);
        assert_eq!(species[1].members, vec![1, 2]);
    }

    #[test]
    fn test_order_dependent() {
        let forward = [0.0, 0.8, 1.6];
        let backward = [0.8, 0.0, 1.6];

        let a = speciator(1.0).speciate(&forward.iter().collect::<Vec<_>>());
        let b = speciator(1.0).speciate(&backward.iter().collect::<Vec<_>>());
        // Founder 0.0 cannot reach 1.6; founder 0.8 reaches both.
        assert_eq!(a.len(), 2);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_zero_threshold_isolates_everyone() {
        let values = [1.0, 1.0, 1.0];
        let refs: Vec<&f64> = values.iter().collect();
        assert_eq!(speciator(0.0).speciate(&refs).len(), 3);
    }

    #[test]
    fn test_euclidean_distance() {
        assert!((euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]) - 5.0).abs() < 1e-12);
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[0.0]), f64::INFINITY);
    }

    #[test]
    fn test_mismatched_lengths_split_species() {
        let a = vec![0.0, 0.0];
        let b = vec![0.0];
        let speciator = LazySpeciator::new(f64::MAX, |x: &Vec<f64>, y: &Vec<f64>| {
            euclidean_distance(x, y)
        });
        let species = speciator.speciate(&[&a, &b, &a]);
        assert_eq!(species.len(), 2);
        assert_eq!(species[0].members, vec![0, 2]);
    }
}
