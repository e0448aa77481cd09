//! Implementation of `Filter` for certain non-probabilistic data structures. This can be helpful
//! for debugging, as an exact reference in tests and for performance comparisons.
use std::collections::HashSet;
use std::convert::Infallible;
use std::hash::{BuildHasher, Hash};

use crate::filters::Filter;
use crate::hash_utils::Hashable;

impl<T, S> Filter<T> for HashSet<T, S>
where
    T: Clone + Eq + Hash + Hashable,
    S: BuildHasher,
{
    type InsertErr = Infallible;

    fn insert(&mut self, obj: &T) -> Result<bool, Self::InsertErr> {
        Ok(self.insert(obj.clone()))
    }

    fn is_empty(&self) -> bool {
        self.is_empty()
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn query(&self, obj: &T) -> bool {
        self.contains(obj)
    }
}
