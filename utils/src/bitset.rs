//! Set of small non-negative integers backed by a bit-vector.
//!
//! A [Bitset] stores membership of index `i` in bit `i % 64` of block `i / 64`. Sets whose members
//! are all below 128 are kept inline (no allocation), which covers the expected use of sets over a
//! few dozen candidates. Larger members spill the storage onto the heap.
//!
//! The representation is canonical: trailing empty blocks are trimmed and a set that fits inline is
//! always stored inline, so derived equality and hashing agree with set equality.

use core::{
    fmt::{self, Formatter},
    ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign},
};

/// Type alias for the underlying block type.
type Block = u64;

/// Number of bits in a [Block].
const BITS_PER_BLOCK: usize = Block::BITS as usize;

/// Number of blocks stored without allocating.
const INLINE_BLOCKS: usize = 2;

/// Empty block of bits (all bits set to 0).
const EMPTY_BLOCK: Block = 0;

/// Full block of bits (all bits set to 1).
const FULL_BLOCK: Block = Block::MAX;

#[derive(Clone, PartialEq, Eq, Hash)]
enum Storage {
    Inline([Block; INLINE_BLOCKS]),
    Heap(Vec<Block>),
}

/// Represents a set of indices.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Bitset {
    storage: Storage,
}

impl Bitset {
    /// Creates a new, empty `Bitset`.
    #[inline]
    pub const fn new() -> Self {
        Self {
            storage: Storage::Inline([EMPTY_BLOCK; INLINE_BLOCKS]),
        }
    }

    /// Creates a `Bitset` containing every index in `0..n`.
    pub fn full(n: usize) -> Self {
        let mut blocks = vec![FULL_BLOCK; n / BITS_PER_BLOCK];
        let rest = n % BITS_PER_BLOCK;
        if rest > 0 {
            blocks.push(FULL_BLOCK >> (BITS_PER_BLOCK - rest));
        }
        Self::from_blocks(blocks)
    }

    /// Creates a `Bitset` containing only `index`.
    pub fn singleton(index: usize) -> Self {
        let mut set = Self::new();
        set.insert(index);
        set
    }

    /// Returns the number of indices in the set.
    #[inline]
    pub fn count(&self) -> usize {
        self.blocks()
            .iter()
            .map(|block| block.count_ones() as usize)
            .sum()
    }

    /// Returns true if the set has no members.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.blocks().iter().all(|block| *block == EMPTY_BLOCK)
    }

    /// Returns true if `index` is a member.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        self.blocks()
            .get(Self::block_index(index))
            .is_some_and(|block| block & Self::mask(index) != 0)
    }

    /// Adds `index` to the set.
    pub fn insert(&mut self, index: usize) {
        let block_index = Self::block_index(index);
        if block_index >= INLINE_BLOCKS {
            self.spill(block_index + 1);
        }
        match &mut self.storage {
            Storage::Inline(blocks) => blocks[block_index] |= Self::mask(index),
            Storage::Heap(blocks) => blocks[block_index] |= Self::mask(index),
        }
    }

    /// Removes `index` from the set.
    pub fn remove(&mut self, index: usize) {
        let block_index = Self::block_index(index);
        let block = match &mut self.storage {
            Storage::Inline(blocks) => blocks.get_mut(block_index),
            Storage::Heap(blocks) => blocks.get_mut(block_index),
        };
        if let Some(block) = block {
            *block &= !Self::mask(index);
        }
        self.normalize();
    }

    /// Returns true if every member of `self` is a member of `other`.
    pub fn is_subset(&self, other: &Bitset) -> bool {
        let theirs = other.blocks();
        self.blocks().iter().enumerate().all(|(i, block)| {
            let other = theirs.get(i).copied().unwrap_or(EMPTY_BLOCK);
            block & !other == EMPTY_BLOCK
        })
    }

    /// Returns the smallest member, if any.
    pub fn first(&self) -> Option<usize> {
        self.iter().next()
    }

    /// Iterates over the members in ascending order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            blocks: self.blocks(),
            block_index: 0,
            current: self.blocks().first().copied().unwrap_or(EMPTY_BLOCK),
        }
    }

    // ---------- Helper Functions ----------

    #[inline(always)]
    fn block_index(index: usize) -> usize {
        index / BITS_PER_BLOCK
    }

    #[inline(always)]
    fn mask(index: usize) -> Block {
        1 << (index % BITS_PER_BLOCK)
    }

    #[inline]
    fn blocks(&self) -> &[Block] {
        match &self.storage {
            Storage::Inline(blocks) => &blocks[..],
            Storage::Heap(blocks) => &blocks[..],
        }
    }

    /// Moves the storage to the heap with room for at least `num_blocks` blocks.
    fn spill(&mut self, num_blocks: usize) {
        match &mut self.storage {
            Storage::Inline(blocks) => {
                let mut heap = blocks.to_vec();
                heap.resize(num_blocks, EMPTY_BLOCK);
                self.storage = Storage::Heap(heap);
            }
            Storage::Heap(blocks) => {
                if blocks.len() < num_blocks {
                    blocks.resize(num_blocks, EMPTY_BLOCK);
                }
            }
        }
    }

    fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut set = Self {
            storage: Storage::Heap(blocks),
        };
        set.normalize();
        set
    }

    /// Restores the canonical representation.
    fn normalize(&mut self) {
        let Storage::Heap(blocks) = &mut self.storage else {
            return;
        };
        while blocks.last() == Some(&EMPTY_BLOCK) {
            blocks.pop();
        }
        if blocks.len() <= INLINE_BLOCKS {
            let mut inline = [EMPTY_BLOCK; INLINE_BLOCKS];
            inline[..blocks.len()].copy_from_slice(blocks);
            self.storage = Storage::Inline(inline);
        }
    }

    /// Helper for binary operations (AND, OR, XOR, AND NOT). `op(0, 0)` must be 0.
    #[inline]
    fn binary_op<F: Fn(Block, Block) -> Block>(&self, other: &Bitset, op: F) -> Bitset {
        if let (Storage::Inline(a), Storage::Inline(b)) = (&self.storage, &other.storage) {
            return Self {
                storage: Storage::Inline([op(a[0], b[0]), op(a[1], b[1])]),
            };
        }
        let (a, b) = (self.blocks(), other.blocks());
        let len = a.len().max(b.len());
        let blocks = (0..len)
            .map(|i| {
                op(
                    a.get(i).copied().unwrap_or(EMPTY_BLOCK),
                    b.get(i).copied().unwrap_or(EMPTY_BLOCK),
                )
            })
            .collect();
        Self::from_blocks(blocks)
    }
}

// ---------- Constructors ----------

impl Default for Bitset {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<usize> for Bitset {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for index in iter {
            set.insert(index);
        }
        set
    }
}

impl<const N: usize> From<[usize; N]> for Bitset {
    fn from(indices: [usize; N]) -> Self {
        indices.into_iter().collect()
    }
}

// ---------- Converters ----------

impl From<&Bitset> for Vec<usize> {
    fn from(set: &Bitset) -> Self {
        set.iter().collect()
    }
}

// ---------- Debug ----------

impl fmt::Debug for Bitset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Bitset")?;
        f.debug_set().entries(self.iter()).finish()
    }
}

// ---------- Operations ----------

impl BitAnd for &Bitset {
    type Output = Bitset;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.binary_op(rhs, |a, b| a & b)
    }
}

impl BitOr for &Bitset {
    type Output = Bitset;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.binary_op(rhs, |a, b| a | b)
    }
}

impl BitXor for &Bitset {
    type Output = Bitset;

    fn bitxor(self, rhs: Self) -> Self::Output {
        self.binary_op(rhs, |a, b| a ^ b)
    }
}

impl Sub for &Bitset {
    type Output = Bitset;

    /// Set difference.
    fn sub(self, rhs: Self) -> Self::Output {
        self.binary_op(rhs, |a, b| a & !b)
    }
}

impl BitAndAssign<&Bitset> for Bitset {
    fn bitand_assign(&mut self, rhs: &Bitset) {
        *self = &*self & rhs;
    }
}

impl BitOrAssign<&Bitset> for Bitset {
    fn bitor_assign(&mut self, rhs: &Bitset) {
        *self = &*self | rhs;
    }
}

impl BitXorAssign<&Bitset> for Bitset {
    fn bitxor_assign(&mut self, rhs: &Bitset) {
        *self = &*self ^ rhs;
    }
}

impl SubAssign<&Bitset> for Bitset {
    fn sub_assign(&mut self, rhs: &Bitset) {
        *self = &*self - rhs;
    }
}

// ---------- Iterator ----------

/// Iterator over the members of a [Bitset] in ascending order.
pub struct Iter<'a> {
    blocks: &'a [Block],
    block_index: usize,
    current: Block,
}

impl Iterator for Iter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != EMPTY_BLOCK {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.block_index * BITS_PER_BLOCK + bit);
            }
            self.block_index += 1;
            self.current = *self.blocks.get(self.block_index)?;
        }
    }
}

impl<'a> IntoIterator for &'a Bitset {
    type Item = usize;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use std::collections::BTreeSet;

    #[test]
    fn test_constructors() {
        let set = Bitset::new();
        assert!(set.is_empty());
        assert_eq!(set.count(), 0);
        assert_eq!(set.first(), None);

        let set = Bitset::full(5);
        assert_eq!(set.count(), 5);
        assert_eq!(Vec::from(&set), vec![0, 1, 2, 3, 4]);

        let set = Bitset::full(64);
        assert_eq!(set.count(), 64);
        assert!(set.contains(63));
        assert!(!set.contains(64));

        let set = Bitset::full(200);
        assert_eq!(set.count(), 200);
        assert!(set.contains(199));
        assert!(!set.contains(200));

        let set = Bitset::full(0);
        assert!(set.is_empty());
        assert_eq!(set, Bitset::new());

        let set = Bitset::from([3, 1, 3]);
        assert_eq!(set.count(), 2);
        assert_eq!(set.first(), Some(1));
    }

    #[test]
    fn test_insert_remove() {
        let mut set = Bitset::new();
        set.insert(0);
        set.insert(63);
        set.insert(64);
        set.insert(127);
        assert_eq!(Vec::from(&set), vec![0, 63, 64, 127]);
        assert!(matches!(set.storage, Storage::Inline(_)));

        // Spill onto the heap
        set.insert(300);
        assert!(matches!(set.storage, Storage::Heap(_)));
        assert!(set.contains(300));
        assert_eq!(set.count(), 5);

        // Removing the large member returns to inline storage
        set.remove(300);
        assert!(matches!(set.storage, Storage::Inline(_)));
        assert_eq!(set, Bitset::from([0, 63, 64, 127]));

        // Removing absent members is a no-op
        set.remove(1000);
        set.remove(5);
        assert_eq!(set.count(), 4);
    }

    #[test]
    fn test_bitwise_operations() {
        let a = Bitset::from([0, 2, 4]);
        let b = Bitset::from([0, 1, 4]);

        assert_eq!(&a & &b, Bitset::from([0, 4]));
        assert_eq!(&a | &b, Bitset::from([0, 1, 2, 4]));
        assert_eq!(&a ^ &b, Bitset::from([1, 2]));
        assert_eq!(&a - &b, Bitset::from([2]));

        let mut c = a.clone();
        c &= &b;
        assert_eq!(c, Bitset::from([0, 4]));
        c |= &Bitset::from([9]);
        assert_eq!(c, Bitset::from([0, 4, 9]));
        c ^= &Bitset::from([4, 5]);
        assert_eq!(c, Bitset::from([0, 5, 9]));
        c -= &Bitset::from([0]);
        assert_eq!(c, Bitset::from([5, 9]));

        // Mixed inline and heap operands
        let big = Bitset::from([1, 500]);
        assert_eq!(&a & &big, Bitset::new());
        assert_eq!(&big - &Bitset::from([500]), Bitset::from([1]));
        assert!(matches!((&big - &Bitset::from([500])).storage, Storage::Inline(_)));
    }

    #[test]
    fn test_subset() {
        let a = Bitset::from([1, 2]);
        let b = Bitset::from([1, 2, 3]);
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert!(Bitset::new().is_subset(&a));
        assert!(a.is_subset(&a));
        assert!(!Bitset::from([1, 200]).is_subset(&b));
        assert!(b.is_subset(&Bitset::from([1, 2, 3, 200])));
    }

    #[test]
    fn test_matches_btreeset() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            let lhs: BTreeSet<usize> = (0..rng.gen_range(0..40))
                .map(|_| rng.gen_range(0..256))
                .collect();
            let rhs: BTreeSet<usize> = (0..rng.gen_range(0..40))
                .map(|_| rng.gen_range(0..256))
                .collect();
            let a: Bitset = lhs.iter().copied().collect();
            let b: Bitset = rhs.iter().copied().collect();

            assert_eq!(a.count(), lhs.len());
            assert_eq!(Vec::from(&(&a & &b)), lhs.intersection(&rhs).copied().collect::<Vec<_>>());
            assert_eq!(Vec::from(&(&a | &b)), lhs.union(&rhs).copied().collect::<Vec<_>>());
            assert_eq!(Vec::from(&(&a - &b)), lhs.difference(&rhs).copied().collect::<Vec<_>>());
            assert_eq!(
                Vec::from(&(&a ^ &b)),
                lhs.symmetric_difference(&rhs).copied().collect::<Vec<_>>()
            );
            assert_eq!(a.is_subset(&b), lhs.is_subset(&rhs));
        }
    }

    #[test]
    fn test_debug() {
        assert_eq!(format!("{:?}", Bitset::from([0, 3])), "Bitset{0, 3}");
        assert_eq!(format!("{:?}", Bitset::new()), "Bitset{}");
    }
}
