//! Variable → factor lookup.

use std::collections::BTreeMap;

use crate::core::Key;

/// For every key, the indices of the factors (in graph order) that touch it.
///
/// Built once from a graph and read-only afterward.
#[derive(Debug, Clone, Default)]
pub struct VariableIndex {
    index: BTreeMap<Key, Vec<usize>>,
    num_factors: usize,
}

impl VariableIndex {
    /// Build from the key lists of a sequence of factors.
    pub fn new<'a, I>(factor_keys: I) -> Self
    where
        I: IntoIterator<Item = &'a [Key]>,
    {
        let mut index: BTreeMap<Key, Vec<usize>> = BTreeMap::new();
        let mut num_factors = 0;
        for (factor_ix, keys) in factor_keys.into_iter().enumerate() {
            for key in keys {
                let entry = index.entry(*key).or_default();
                // a factor listing a key twice is indexed once
                if entry.last() != Some(&factor_ix) {
                    entry.push(factor_ix);
                }
            }
            num_factors = factor_ix + 1;
        }
        Self { index, num_factors }
    }

    /// Factor indices touching `key`; empty when the key is unknown.
    pub fn factors(&self, key: Key) -> &[usize] {
        self.index.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, key: Key) -> bool {
        self.index.contains_key(&key)
    }

    pub fn keys(&self) -> impl Iterator<Item = Key> + '_ {
        self.index.keys().copied()
    }

    pub fn num_variables(&self) -> usize {
        self.index.len()
    }

    pub fn num_factors(&self) -> usize {
        self.num_factors
    }
}
