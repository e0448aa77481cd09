//! CountMinSketch implementation.
use std::cmp;
use std::fmt;
use std::mem;

use num_traits::ops::saturating::SaturatingAdd;
use num_traits::{Bounded, One, Zero};

use crate::error::{invalid_configuration, Result};
use crate::hash_utils::{DerivedHashIter, HashFunction, Hashable, Murmur3};

/// Abstract counter, used for the cells of the internal table.
///
/// Implemented for all types that provide the required `num_traits` operations, e.g. all
/// unsigned integers. Additions saturate at `max_value()`.
pub trait Counter: Copy + fmt::Debug + Ord + Bounded + One + SaturatingAdd + Zero {}

impl<C> Counter for C where C: Copy + fmt::Debug + Ord + Bounded + One + SaturatingAdd + Zero {}

/// Simple implementation of a
/// [Count-min sketch](https://en.wikipedia.org/wiki/Count%E2%80%93min_sketch)
///
/// The type parameter `C` sets the type of the counter in the internal table and can be used to
/// reduce memory consumption when low counts are expected.
///
/// # Examples
/// ```
/// use probably::countminsketch::CountMinSketch;
///
/// let mut cms = CountMinSketch::with_params(100, 5).unwrap();
/// cms.increment("apple");
/// cms.increment("apple");
/// cms.add("banana", 3);
///
/// assert!(cms.count("apple") >= 2);
/// assert!(cms.count("banana") >= 3);
/// ```
///
/// # How It Works
/// The sketch consists of a table with `depth` rows and `width` columns. Row `i` (`i` from `0` to
/// `depth - 1`) has its own hash function `h_i = derive(i + 1)` that maps an element to a column.
///
/// Adding `n` to an element adds `n` to the cell `h_i(x)` in every row. The count of an element is
/// the minimum of its cells. Other elements can only increase these cells (hash collisions), so
/// the count never underestimates the real count. Taking the minimum over independently hashed
/// rows keeps the overestimation small.
///
/// Counters saturate at `C::max_value()` instead of wrapping around.
///
/// # Concurrency
/// `add` takes `&mut self` and there is no internal locking. Callers that share a sketch between
/// threads have to serialize access themselves.
///
/// # References
/// - ["An Improved Data Stream Summary: The Count-Min Sketch and its Applications", Graham
///   Cormode, S. Muthukrishnan, 2003](http://dimacs.rutgers.edu/~graham/pubs/papers/cm-latin.pdf)
#[derive(Clone)]
pub struct CountMinSketch<C = u64, H = Murmur3>
where
    C: Counter,
    H: HashFunction,
{
    table: Vec<C>,
    width: usize,
    depth: usize,
    hash: H,
}

impl CountMinSketch {
    /// Create new CountMinSketch based on table size.
    ///
    /// - `width` sets the number of columns, must be `> 0`
    /// - `depth` sets the number of rows (hash functions), must be `> 0`
    pub fn with_params(width: usize, depth: usize) -> Result<Self> {
        Self::with_params_and_hash(width, depth, Murmur3)
    }

    /// Create new CountMinSketch with the following properties for a point query:
    ///
    /// - `a` is the real count of observed objects
    /// - `a'` is the guessed count of observed objects
    /// - `N` is the total count in the internal table
    /// - `a <= a'` always holds
    /// - `a' <= a + epsilon * N` holds with `p > 1 - delta`
    ///
    /// The following conditions must hold:
    ///
    /// - `epsilon > 0`
    /// - `delta > 0` and `delta < 1`
    pub fn with_point_query_properties(epsilon: f64, delta: f64) -> Result<Self> {
        Self::with_point_query_properties_and_hash(epsilon, delta, Murmur3)
    }
}

impl<C, H> CountMinSketch<C, H>
where
    C: Counter,
    H: HashFunction,
{
    /// Same as `with_params` but with a specific counter type and base hash function.
    pub fn with_params_and_hash(width: usize, depth: usize, hash: H) -> Result<Self> {
        if width == 0 {
            return invalid_configuration("width must be greater than 0".to_owned());
        }
        if depth == 0 {
            return invalid_configuration("depth must be greater than 0".to_owned());
        }
        // the table must stay addressable in bytes
        let Some(size) = width.checked_mul(depth).filter(|&size| {
            size.checked_mul(mem::size_of::<C>())
                .is_some_and(|bytes| bytes <= isize::MAX as usize)
        }) else {
            return invalid_configuration(format!(
                "table size too large (width={}, depth={})",
                width, depth
            ));
        };

        tracing::debug!(width, depth, "created CountMinSketch");
        Ok(Self {
            table: vec![C::zero(); size],
            width,
            depth,
            hash,
        })
    }

    /// Same as `with_point_query_properties` but with a specific counter type and base hash
    /// function.
    pub fn with_point_query_properties_and_hash(epsilon: f64, delta: f64, hash: H) -> Result<Self> {
        if !(epsilon > 0.) {
            return invalid_configuration(format!("epsilon ({}) must be greater than 0", epsilon));
        }
        if !((delta > 0.) & (delta < 1.)) {
            return invalid_configuration(format!(
                "delta ({}) must be greater than 0 and smaller than 1",
                delta
            ));
        }

        let width = (std::f64::consts::E / epsilon).ceil();
        if !(width < usize::MAX as f64) {
            return invalid_configuration(format!("epsilon ({:e}) is too small", epsilon));
        }
        let width = width as usize;
        let depth = (1. / delta).ln().ceil() as usize;
        Self::with_params_and_hash(width, depth.max(1), hash)
    }

    /// Get number of columns of internal counter table.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get number of rows of internal counter table.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Get base hash function.
    pub fn hash_function(&self) -> &H {
        &self.hash
    }

    /// Check whether the CountMinSketch is empty (i.e. no elements seen yet).
    pub fn is_empty(&self) -> bool {
        self.table.iter().all(|x| x.is_zero())
    }

    /// Add one to the counter of the given element.
    pub fn increment<T>(&mut self, obj: &T)
    where
        T: Hashable + ?Sized,
    {
        self.add(obj, C::one())
    }

    /// Add `n` to the counter of the given element.
    pub fn add<T>(&mut self, obj: &T, n: C)
    where
        T: Hashable + ?Sized,
    {
        let h = self.hash.hash(obj);
        for (i, pos) in DerivedHashIter::new(self.width, self.depth, h).enumerate() {
            let x = i * self.width + pos;
            self.table[x] = self.table[x].saturating_add(&n);
        }
    }

    /// Runs a point query, i.e. a query for the count of a single object.
    ///
    /// The result is never smaller than the real count.
    pub fn count<T>(&self, obj: &T) -> C
    where
        T: Hashable + ?Sized,
    {
        let h = self.hash.hash(obj);
        DerivedHashIter::new(self.width, self.depth, h)
            .enumerate()
            .map(|(i, pos)| self.table[i * self.width + pos])
            .fold(C::max_value(), cmp::min)
    }
}

impl<C, H> fmt::Debug for CountMinSketch<C, H>
where
    C: Counter,
    H: HashFunction,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CountMinSketch {{ width: {}, depth: {} }}",
            self.width, self.depth
        )
    }
}

impl<T, C, H> Extend<T> for CountMinSketch<C, H>
where
    T: Hashable,
    C: Counter,
    H: HashFunction,
{
    fn extend<S: IntoIterator<Item = T>>(&mut self, iter: S) {
        for elem in iter {
            self.increment(&elem);
        }
    }
}
