//! Fixed-length bit sets used as the state representation for dataflow
//! analyses (see [`crate::dataflow`]).
use std::collections::BTreeSet;

use mirai_annotations::{checked_precondition, checked_verify};

/// A fixed-length set of indices `{ i : 0 <= i < len(), bit i is set }`.
///
/// Mutating operations return `&mut Self` so callers can chain them, e.g.
/// `BitVector::new(8).set_bit(1).set_bit(3)`.
#[derive(Debug, Clone)]
pub struct BitVector {
    bits: Vec<bool>,
}

impl BitVector {
    /// Allocates a vector of `len` bits, all initially clear.
    pub fn new(len: usize) -> Self {
        Self::with_init(len, false)
    }

    /// Allocates a vector of `len` bits, all initialized to `init`.
    pub fn with_init(len: usize, init: bool) -> Self {
        BitVector {
            bits: vec![init; len],
        }
    }

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Sets bit `i`. `i` must be in range; this is a programming error
    /// otherwise, not a recoverable failure.
    pub fn set_bit(&mut self, i: usize) -> &mut Self {
        checked_precondition!(i < self.bits.len());
        self.bits[i] = true;
        self
    }

    /// Clears bit `i`. Out-of-range `i` is a no-op, matching the decompiler
    /// this type is modeled on, which tolerates clearing one past the end.
    pub fn clear_bit(&mut self, i: usize) -> &mut Self {
        if let Some(bit) = self.bits.get_mut(i) {
            *bit = false;
        }
        self
    }

    /// Sets every bit to `b`.
    pub fn set_all(&mut self, b: bool) -> &mut Self {
        self.bits.iter_mut().for_each(|bit| *bit = b);
        self
    }

    pub fn is_set(&self, i: usize) -> bool {
        self.bits.get(i).copied().unwrap_or(false)
    }

    /// The set of indices whose bit is set.
    pub fn bits_set(&self) -> BTreeSet<usize> {
        self.bits
            .iter()
            .enumerate()
            .filter_map(|(i, &b)| b.then_some(i))
            .collect()
    }

    /// In-place union. `other` must have the same length.
    pub fn or_vector(&mut self, other: &BitVector) -> &mut Self {
        checked_precondition!(self.bits.len() == other.bits.len());
        for (mine, theirs) in self.bits.iter_mut().zip(other.bits.iter()) {
            *mine = *mine || *theirs;
        }
        checked_verify!(self.bits.len() == other.bits.len());
        self
    }

    /// In-place intersection. `other` must have the same length.
    pub fn and_vector(&mut self, other: &BitVector) -> &mut Self {
        checked_precondition!(self.bits.len() == other.bits.len());
        for (mine, theirs) in self.bits.iter_mut().zip(other.bits.iter()) {
            *mine = *mine && *theirs;
        }
        self
    }
}

impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        self.bits.len() == other.bits.len() && self.bits == other.bits
    }
}

impl Eq for BitVector {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple() {
        let mut bv = BitVector::new(5);

        assert_eq!(bv.len(), 5);
        assert_eq!(bv.bits_set(), BTreeSet::new());

        bv.set_bit(2);
        assert_eq!(bv.len(), 5);
        assert_eq!(bv.bits_set(), BTreeSet::from([2]));

        bv.set_bit(2);
        bv.set_bit(3);
        assert_eq!(bv.len(), 5);
        assert_eq!(bv.bits_set(), BTreeSet::from([2, 3]));

        bv.clear_bit(2);
        bv.clear_bit(1);
        assert_eq!(bv.len(), 5);
        assert_eq!(bv.bits_set(), BTreeSet::from([3]));

        bv.set_all(true);
        assert_eq!(bv.len(), 5);
        assert_eq!(bv.bits_set(), BTreeSet::from([0, 1, 2, 3, 4]));

        bv.set_all(false);
        assert_eq!(bv.len(), 5);
        assert_eq!(bv.bits_set(), BTreeSet::new());
    }

    #[test]
    fn test_clear_bit_out_of_range_is_noop() {
        let mut bv = BitVector::new(5);
        bv.clear_bit(5);
        bv.clear_bit(100);
        assert_eq!(bv.bits_set(), BTreeSet::new());
    }

    #[test]
    fn test_equality() {
        let bv1 = BitVector::with_init(5, true);
        let mut bv2 = BitVector::with_init(5, false);

        assert_ne!(bv1, bv2);

        bv2.set_all(true);

        assert_eq!(bv1, bv2);
    }

    #[test]
    fn test_clone() {
        let mut bv = BitVector::new(5);
        bv.set_bit(2);
        let mut bvclone = bv.clone();

        assert_eq!(bv, bvclone);

        bv.set_bit(3);
        bvclone.set_bit(4);
        assert_eq!(bv.bits_set(), BTreeSet::from([2, 3]));
        assert_eq!(bvclone.bits_set(), BTreeSet::from([2, 4]));
    }

    #[test]
    fn test_boolean_logic() {
        let mut bv1 = BitVector::new(5);
        bv1.set_bit(2).set_bit(3);
        let mut bv2 = BitVector::new(5);
        bv2.set_bit(1).set_bit(2);

        let mut clone = bv1.clone();
        clone.or_vector(&bv2);
        assert_eq!(clone.bits_set(), BTreeSet::from([1, 2, 3]));

        let mut clone = bv1.clone();
        clone.and_vector(&bv2);
        assert_eq!(clone.bits_set(), BTreeSet::from([2]));
    }

    proptest::proptest! {
        #[test]
        fn prop_new_has_requested_length(n in 0usize..64) {
            proptest::prop_assert_eq!(BitVector::new(n).len(), n);
        }

        #[test]
        fn prop_init_true_sets_every_bit(n in 0usize..64) {
            let bv = BitVector::with_init(n, true);
            proptest::prop_assert_eq!(bv.bits_set(), (0..n).collect());
        }

        #[test]
        fn prop_init_false_sets_no_bit(n in 0usize..64) {
            let bv = BitVector::with_init(n, false);
            proptest::prop_assert!(bv.bits_set().is_empty());
        }

        #[test]
        fn prop_set_bit_is_idempotent(n in 1usize..64, i in 0usize..63) {
            let i = i % n;
            let mut bv = BitVector::new(n);
            bv.set_bit(i);
            bv.set_bit(i);
            proptest::prop_assert!(bv.is_set(i));
        }

        #[test]
        fn prop_or_is_union(n in 1usize..32, a in proptest::collection::vec(0usize..32, 0..16), b in proptest::collection::vec(0usize..32, 0..16)) {
            let a: std::collections::BTreeSet<_> = a.into_iter().filter(|x| *x < n).collect();
            let b: std::collections::BTreeSet<_> = b.into_iter().filter(|x| *x < n).collect();
            let mut bv_a = BitVector::new(n);
            for i in &a { bv_a.set_bit(*i); }
            let mut bv_b = BitVector::new(n);
            for i in &b { bv_b.set_bit(*i); }
            bv_a.or_vector(&bv_b);
            let expected: std::collections::BTreeSet<_> = a.union(&b).copied().collect();
            proptest::prop_assert_eq!(bv_a.bits_set(), expected);
        }

        #[test]
        fn prop_and_is_intersection(n in 1usize..32, a in proptest::collection::vec(0usize..32, 0..16), b in proptest::collection::vec(0usize..32, 0..16)) {
            let a: std::collections::BTreeSet<_> = a.into_iter().filter(|x| *x < n).collect();
            let b: std::collections::BTreeSet<_> = b.into_iter().filter(|x| *x < n).collect();
            let mut bv_a = BitVector::new(n);
            for i in &a { bv_a.set_bit(*i); }
            let mut bv_b = BitVector::new(n);
            for i in &b { bv_b.set_bit(*i); }
            bv_a.and_vector(&bv_b);
            let expected: std::collections::BTreeSet<_> = a.intersection(&b).copied().collect();
            proptest::prop_assert_eq!(bv_a.bits_set(), expected);
        }
    }
}
