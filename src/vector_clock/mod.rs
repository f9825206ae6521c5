//! Per-replica logical clocks: a `HashMap` from replica id to counter, with
//! `increment`/`merge`/`compare` folding over the union of keys and
//! defaulting missing entries to zero.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::vector_clock::ClockComparison::{After, Before, Concurrent, Equal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockComparison {
    Equal,
    Before,
    After,
    Concurrent,
}

impl ClockComparison {
    /// True for `Equal`, `Before`, or `Concurrent` — i.e. not strictly after.
    /// The "ready to process" predicate for causal gating.
    pub fn is_not_after(&self) -> bool {
        !matches!(self, After)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorClock<T>
where
    T: Eq + Hash,
{
    entries: HashMap<T, u64>,
}

impl<T> VectorClock<T>
where
    T: Eq + Hash + Copy,
{
    pub fn new() -> Self {
        VectorClock { entries: HashMap::new() }
    }

    /// A missing entry is semantically zero.
    pub fn get(&self, id: T) -> u64 {
        self.entries.get(&id).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, id: T) {
        *self.entries.entry(id).or_insert(0) += 1;
    }

    /// Elementwise max over `keys(self) ∪ keys(other)`.
    pub fn merge(&mut self, other: &VectorClock<T>) {
        for id in self.ids().chain(other.ids()).unique() {
            let merged = self.get(id).max(other.get(id));
            self.entries.insert(id, merged);
        }
    }

    pub fn merged(mut self, other: &VectorClock<T>) -> Self {
        self.merge(other);
        self
    }

    pub fn compare(&self, other: &VectorClock<T>) -> ClockComparison {
        self.ids()
            .chain(other.ids())
            .unique()
            .fold(Equal, |prev, id| {
                let a = self.get(id);
                let b = other.get(id);
                match prev {
                    Equal if a < b => Before,
                    Equal if a > b => After,
                    Before if a > b => Concurrent,
                    After if a < b => Concurrent,
                    other => other,
                }
            })
    }

    fn ids(&self) -> impl Iterator<Item = T> + '_ {
        self.entries.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for VectorClock<T>
where
    T: Eq + Hash + Copy,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Display for VectorClock<T>
where
    T: Eq + Hash + Copy + fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        let mut first = true;
        for (id, counter) in &self.entries {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "({}:{})", id, counter)?;
            first = false;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::ClockComparison::*;
    use super::VectorClock;

    #[test]
    fn increment_sets_entry() {
        let mut clock = VectorClock::new();
        clock.increment(0usize);
        assert_eq!(clock.get(0), 1);
        assert_eq!(clock.get(1), 0);
    }

    #[test]
    fn merge_takes_elementwise_max() {
        let mut a = VectorClock::new();
        a.increment(0usize);
        let mut b = VectorClock::new();
        b.increment(1usize);
        b.increment(1usize);

        a.merge(&b);
        assert_eq!(a.get(0), 1);
        assert_eq!(a.get(1), 2);
    }

    #[test]
    fn compare_empty_clocks_are_equal() {
        let a: VectorClock<usize> = VectorClock::new();
        let b: VectorClock<usize> = VectorClock::new();
        assert_eq!(a.compare(&b), Equal);
    }

    #[test]
    fn compare_empty_is_before_nonempty() {
        let a: VectorClock<usize> = VectorClock::new();
        let mut b: VectorClock<usize> = VectorClock::new();
        b.increment(0);
        assert_eq!(a.compare(&b), Before);
        assert_eq!(b.compare(&a), After);
    }

    #[test]
    fn compare_detects_concurrency() {
        let mut a = VectorClock::new();
        a.increment(0usize);
        let mut b = VectorClock::new();
        b.increment(1usize);
        assert_eq!(a.compare(&b), Concurrent);
    }

    #[test]
    fn before_is_strict() {
        let mut a = VectorClock::new();
        a.increment(0usize);
        let mut b = a.clone();
        b.increment(0usize);
        assert_eq!(a.compare(&b), Before);
        assert_ne!(a, b);
    }
}
