//! Bounded direct-mapped memo table.
//!
//! Each key hashes to exactly one of `2^bits` slots and a colliding insert
//! evicts the previous occupant, so memory stays fixed no matter how many
//! distinct queries go through. Keys are stored in full and compared on
//! lookup: a hash collision is a miss, never a wrong answer.
//!
//! Used both as the computed table of the decision-diagram manager and as
//! the memo of the satisfiability oracle.

use crate::utils::MyHash;

pub struct Cache<K, V> {
    entries: Vec<Option<(K, V)>>,
    bitmask: u64,
    hits: usize,
    misses: usize,
    faults: usize,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new(14)
    }
}

impl<K, V> Cache<K, V> {
    /// Creates a new cache with `2^bits` slots.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Cache bits must be in range 0..=31, got {}", bits);

        let size = 1usize << bits;
        let bitmask = (size - 1) as u64;

        Self {
            entries: (0..size).map(|_| None).collect(),
            bitmask,
            hits: 0,
            misses: 0,
            faults: 0,
        }
    }

    /// Returns the number of slots in the cache.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    /// Returns the number of misses caused by a different key in the slot.
    pub fn faults(&self) -> usize {
        self.faults
    }

    pub fn clear(&mut self) {
        self.entries.fill_with(|| None);
    }
}

impl<K, V> Cache<K, V>
where
    K: MyHash + Eq,
{
    fn index(&self, key: &K) -> usize {
        (key.hash() & self.bitmask) as usize
    }

    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = self.index(key);
        match &self.entries[idx] {
            Some((k, v)) if k == key => {
                self.hits += 1;
                Some(v)
            }
            Some(_) => {
                self.faults += 1;
                self.misses += 1;
                None
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Inserts a key-value pair, evicting whatever occupied the slot.
    pub fn insert(&mut self, key: K, value: V) {
        let idx = self.index(&key);
        self.entries[idx] = Some((key, value));
    }
}
