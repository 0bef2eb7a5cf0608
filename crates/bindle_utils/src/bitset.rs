/// Fixed-width bit set used to track which entry/boundary roots reach a
/// module during chunk assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BitSet {
  words: Vec<u64>,
}

impl BitSet {
  pub fn new(bit_count: u32) -> Self {
    Self { words: vec![0; (bit_count as usize).div_ceil(64)] }
  }

  pub fn set_bit(&mut self, bit: u32) {
    self.words[(bit / 64) as usize] |= 1 << (bit % 64);
  }

  pub fn has_bit(&self, bit: u32) -> bool {
    self.words[(bit / 64) as usize] & (1 << (bit % 64)) != 0
  }

  /// `self |= other`; returns whether any new bit was added. The splitter
  /// uses the return value to decide whether to revisit dependencies.
  pub fn union(&mut self, other: &BitSet) -> bool {
    let mut changed = false;
    for (word, other_word) in self.words.iter_mut().zip(&other.words) {
      let merged = *word | other_word;
      changed |= merged != *word;
      *word = merged;
    }
    changed
  }

  pub fn count_ones(&self) -> u32 {
    self.words.iter().map(|word| word.count_ones()).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.words.iter().all(|word| *word == 0)
  }

  /// Index of the lowest set bit, if any.
  pub fn first_bit(&self) -> Option<u32> {
    let mut base = 0u32;
    for word in &self.words {
      if *word != 0 {
        return Some(base + word.trailing_zeros());
      }
      base += 64;
    }
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn union_reports_change() {
    let mut left = BitSet::new(130);
    let mut right = BitSet::new(130);
    right.set_bit(0);
    right.set_bit(129);

    assert!(left.union(&right));
    assert!(!left.union(&right));
    assert!(left.has_bit(129));
    assert_eq!(left.count_ones(), 2);
    assert_eq!(left.first_bit(), Some(0));
  }

  #[test]
  fn empty_set() {
    let bits = BitSet::new(3);
    assert!(bits.is_empty());
    assert_eq!(bits.first_bit(), None);
  }
}
