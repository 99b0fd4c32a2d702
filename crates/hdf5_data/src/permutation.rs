use rand::seq::SliceRandom;
use rand::Rng;

/// An index permutation of `0..len`.
///
/// The layer keeps two of these: one over the files of the manifest and one
/// over the rows of the file currently in memory. Both start as the identity
/// and are only ever reordered in place, so every index stays present exactly
/// once.
///
/// # Example
/// ```ignore
/// let mut rng = StdRng::seed_from_u64(42);
/// let mut rows = Permutation::identity(5);
/// rows.reshuffle(&mut rng);
/// let first_row = rows.get(0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Permutation {
    indices: Vec<usize>,
}

impl Permutation {
    /// `[0, 1, ..., len - 1]`
    pub fn identity(len: usize) -> Self {
        Self {
            indices: (0..len).collect(),
        }
    }

    /// Uniformly reorders the indices in place (Fisher-Yates).
    pub fn reshuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.indices.shuffle(rng);
    }

    /// The index at `position`.
    ///
    /// # Panics
    /// If `position >= len()`.
    #[inline]
    pub fn get(&self, position: usize) -> usize {
        self.indices[position]
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_identity() {
        let perm = Permutation::identity(4);
        assert_eq!(perm.as_slice(), &[0, 1, 2, 3]);
        assert!(Permutation::identity(0).is_empty());
    }

    #[test]
    fn test_reshuffle_is_a_bijection() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut perm = Permutation::identity(100);
        perm.reshuffle(&mut rng);

        assert_eq!(perm.len(), 100);
        let mut sorted = perm.as_slice().to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..100).collect::<Vec<_>>());
        assert_ne!(perm, Permutation::identity(100));
    }

    #[test]
    fn test_reshuffle_is_deterministic_per_seed() {
        let mut a = Permutation::identity(50);
        let mut b = Permutation::identity(50);
        a.reshuffle(&mut StdRng::seed_from_u64(3));
        b.reshuffle(&mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
