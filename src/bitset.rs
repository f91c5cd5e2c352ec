//! Fixed-size bit set used as a batch evaluation result.
//!
//! Bit `i` is set iff item `i` of the evaluated dataset matches. Sets of the same
//! size combine with `&=`, `|=` and `!`, which is how composite predicates are
//! evaluated level by level instead of item by item.

use std::ops::{BitAndAssign, BitOrAssign, Not};

/// A bit set over `0..size`, backed by a vector of u64 words.
///
/// Bits beyond `size` in the last word are always clear.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct BitSet {
    /// Storage: each u64 holds 64 bits
    words: Vec<u64>,
    /// Number of addressable bits
    size: usize,
}

impl BitSet {
    /// Number of bits per word.
    pub const BITS_PER_WORD: usize = 64;

    /// Creates a bit set over `0..size` with no bits set.
    pub fn new(size: usize) -> Self {
        Self {
            words: vec![0; Self::num_words(size)],
            size,
        }
    }

    /// Creates a bit set over `0..size` with all bits set.
    pub fn full(size: usize) -> Self {
        let mut set = Self {
            words: vec![u64::MAX; Self::num_words(size)],
            size,
        };
        set.clear_tail();
        set
    }

    /// Builds a bit set from raw words, one word per 64 consecutive indices.
    ///
    /// # Panics
    ///
    /// Panics if the number of words does not match `size`.
    pub fn from_words(words: Vec<u64>, size: usize) -> Self {
        assert_eq!(words.len(), Self::num_words(size), "word count does not match size {}", size);
        let mut set = Self { words, size };
        set.clear_tail();
        set
    }

    fn num_words(size: usize) -> usize {
        size.div_ceil(Self::BITS_PER_WORD)
    }

    fn clear_tail(&mut self) {
        let rem = self.size % Self::BITS_PER_WORD;
        if rem != 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << rem) - 1;
            }
        }
    }

    /// Gets the word index and bit position for a given bit index.
    #[inline]
    fn word_and_bit(index: usize) -> (usize, usize) {
        (index / Self::BITS_PER_WORD, index % Self::BITS_PER_WORD)
    }

    /// Returns the number of addressable bits.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns the number of set bits.
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Returns true if no bits are set.
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns true if the bit at the given index is set.
    #[inline]
    pub fn contains(&self, index: usize) -> bool {
        if index >= self.size {
            return false;
        }
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        (self.words[word_idx] >> bit_idx) & 1 != 0
    }

    /// Sets the bit at the given index. Returns true if the bit was not previously set.
    ///
    /// # Panics
    ///
    /// Panics if `index >= size`.
    #[inline]
    pub fn insert(&mut self, index: usize) -> bool {
        assert!(index < self.size, "index {} out of range 0..{}", index, self.size);
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        let mask = 1u64 << bit_idx;
        let was_clear = self.words[word_idx] & mask == 0;
        self.words[word_idx] |= mask;
        was_clear
    }

    /// Clears the bit at the given index. Returns true if the bit was previously set.
    #[inline]
    pub fn remove(&mut self, index: usize) -> bool {
        if index >= self.size {
            return false;
        }
        let (word_idx, bit_idx) = Self::word_and_bit(index);
        let mask = 1u64 << bit_idx;
        let was_set = self.words[word_idx] & mask != 0;
        self.words[word_idx] &= !mask;
        was_set
    }

    /// Returns an iterator over all set bit indices, in increasing order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            bitset: self,
            word_idx: 0,
            current_word: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl BitAndAssign<&BitSet> for BitSet {
    fn bitand_assign(&mut self, rhs: &BitSet) {
        assert_eq!(self.size, rhs.size, "bit set sizes differ");
        for (a, b) in self.words.iter_mut().zip(&rhs.words) {
            *a &= b;
        }
    }
}

impl BitOrAssign<&BitSet> for BitSet {
    fn bitor_assign(&mut self, rhs: &BitSet) {
        assert_eq!(self.size, rhs.size, "bit set sizes differ");
        for (a, b) in self.words.iter_mut().zip(&rhs.words) {
            *a |= b;
        }
    }
}

impl Not for &BitSet {
    type Output = BitSet;

    /// Complement within `0..size`.
    fn not(self) -> Self::Output {
        let mut set = BitSet {
            words: self.words.iter().map(|w| !w).collect(),
            size: self.size,
        };
        set.clear_tail();
        set
    }
}

impl FromIterator<bool> for BitSet {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        let mut words = Vec::new();
        let mut size = 0;
        for bit in iter {
            let (word_idx, bit_idx) = Self::word_and_bit(size);
            if bit_idx == 0 {
                words.push(0);
            }
            if bit {
                words[word_idx] |= 1u64 << bit_idx;
            }
            size += 1;
        }
        Self { words, size }
    }
}

/// Iterator over set bits in a BitSet.
pub struct BitSetIter<'a> {
    bitset: &'a BitSet,
    word_idx: usize,
    current_word: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current_word != 0 {
                let bit_idx = self.current_word.trailing_zeros() as usize;
                self.current_word &= self.current_word - 1; // Clear lowest set bit
                return Some(self.word_idx * BitSet::BITS_PER_WORD + bit_idx);
            }

            self.word_idx += 1;
            if self.word_idx >= self.bitset.words.len() {
                return None;
            }
            self.current_word = self.bitset.words[self.word_idx];
        }
    }
}
