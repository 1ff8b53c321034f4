//! Evaluated candidate solutions.

/// An evaluated candidate: genotype, mapped solution, quality and lineage.
///
/// Individuals are immutable. [`remap`](Self::remap) produces a copy with a
/// new quality; identity (the `id`) is kept, so equality compares ids only.
#[derive(Debug, Clone)]
pub struct Individual<G, S, Q> {
    id: u64,
    genotype: G,
    solution: S,
    quality: Q,
    genotype_birth_iteration: u64,
    quality_mapping_iteration: u64,
    parent_ids: Vec<u64>,
}

impl<G, S, Q> Individual<G, S, Q> {
    /// Builds an individual born and evaluated at `iteration`.
    pub fn new(
        id: u64,
        genotype: G,
        solution: S,
        quality: Q,
        iteration: u64,
        parent_ids: Vec<u64>,
    ) -> Self {
        Self {
            id,
            genotype,
            solution,
            quality,
            genotype_birth_iteration: iteration,
            quality_mapping_iteration: iteration,
            parent_ids,
        }
    }

    /// Unique, monotonically assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn genotype(&self) -> &G {
        &self.genotype
    }

    pub fn solution(&self) -> &S {
        &self.solution
    }

    pub fn quality(&self) -> &Q {
        &self.quality
    }

    /// Iteration at which the genotype was created.
    pub fn genotype_birth_iteration(&self) -> u64 {
        self.genotype_birth_iteration
    }

    /// Iteration at which the current quality was computed.
    pub fn quality_mapping_iteration(&self) -> u64 {
        self.quality_mapping_iteration
    }

    /// Ids of the individuals this one was bred from (empty when sampled).
    pub fn parent_ids(&self) -> &[u64] {
        &self.parent_ids
    }

    /// A copy carrying `quality`, computed at `iteration`.
    pub fn remap(&self, quality: Q, iteration: u64) -> Self
    where
        G: Clone,
        S: Clone,
    {
        Self {
            id: self.id,
            genotype: self.genotype.clone(),
            solution: self.solution.clone(),
            quality,
            genotype_birth_iteration: self.genotype_birth_iteration,
            quality_mapping_iteration: iteration,
            parent_ids: self.parent_ids.clone(),
        }
    }
}

impl<G, S, Q> PartialEq for Individual<G, S, Q> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<G, S, Q> Eq for Individual<G, S, Q> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_keeps_identity() {
        let ind = Individual::new(7, vec![1.0, 2.0], 3.0, 9.0, 2, vec![1, 4]);
        let remapped = ind.remap(4.5, 5);

        assert_eq!(remapped.id(), 7);
        assert_eq!(remapped.genotype(), &vec![1.0, 2.0]);
        assert_eq!(remapped.parent_ids(), &[1, 4]);
        assert_eq!(remapped.genotype_birth_iteration(), 2);
        assert_eq!(remapped.quality_mapping_iteration(), 5);
        assert!((*remapped.quality() - 4.5_f64).abs() < 1e-15);
        // Original untouched.
        assert!((*ind.quality() - 9.0_f64).abs() < 1e-15);
        assert_eq!(ind, remapped);
    }

    #[test]
    fn test_equality_is_identity() {
        let a = Individual::new(1, 0u8, 0u8, 1.0, 0, vec![]);
        let b = Individual::new(2, 0u8, 0u8, 1.0, 0, vec![]);
        assert_ne!(a, b);
    }
}
