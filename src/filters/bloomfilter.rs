//! BloomFilter implementation.
use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::slice;

use fixedbitset::FixedBitSet;

use crate::error::{invalid_configuration, Result};
use crate::filters::Filter;
use crate::hash_utils::{DoubleHashIter, HashFunction, Hashable, Murmur3};

/// A BloomFilter is a set-like data structure, that keeps track of elements it has seen without
/// the need to store them. Looking up values has a certain false positive rate, but a false
/// negative rate of 0%.
///
/// # Examples
/// ```
/// use probably::filters::bloomfilter::BloomFilter;
///
/// // set up filter
/// let false_positive_rate = 0.02;  // = 2%
/// let expected_elements = 1000;
/// let mut filter = BloomFilter::with_properties(expected_elements, false_positive_rate).unwrap();
///
/// // add some data
/// filter.add("my super long string");
///
/// // later
/// assert!(filter.has("my super long string"));
/// assert!(!filter.has("another super long string"));
/// ```
///
/// # Applications
/// - when a lot of data should be added to the set and a moderate false positive rate is
///   acceptable, was used for spell checking
/// - as a pre-filter for more expensive lookups, e.g. in combination with a real set, map or
///   database, so the final false positive rate is 0%
///
/// # How It Works
/// The filter is represented by a bit vector of size `m`. Also given are `k` hash functions
/// `h_i(x), for i in 1..=k`, every one mapping an input value `x` to an integer `>= 0` and `< m`.
/// Initially, all bits are set to `False`.
///
/// During insertion of value `x`, the `k` bits addressed by `h_i(x)` are set to `True`. Bits
/// are never reset, there is no way to remove an element.
///
/// During lookup, it is checked if all these bits are set. If so, the value might be in the
/// filter. If only a single bit is not set, it is clear that the value was never added to the
/// filter.
///
/// There are two ways to get the `k` hash functions:
///
/// - **double hashing** (`with_params`, `with_params_and_hash`): a single 64-bit hash `h` is
///   computed and split into `lo = h mod 2^32` and `hi = h div 2^32`. Position `i` is
///   `(lo + i * hi) mod m`. The input is only hashed once per operation.
/// - **explicit hash functions** (`with_hashes`): every given hash function produces one position
///   `h_i(x) mod m`.
///
/// # Concurrency
/// `add` takes `&mut self` and there is no internal locking. Callers that share a filter between
/// threads have to serialize access themselves, e.g. with a `Mutex`.
///
/// # See Also
/// - `std::collections::HashSet`: has a false positive rate of 0%, but also needs to store all
///   elements
///
/// # References
/// - ["Space/Time Trade-offs in Hash Coding with Allowable Errors", Burton H. Bloom, 1970](http://dmod.eu/deca/ft_gateway.cfm.pdf)
/// - ["Less Hashing, Same Performance: Building a Better Bloom Filter", Adam Kirsch, Michael
///   Mitzenmacher, 2006](https://www.eecs.harvard.edu/~michaelm/postscripts/rsa2008.pdf)
/// - [Wikipedia: Bloom filter](https://en.wikipedia.org/wiki/Bloom_filter)
#[derive(Clone)]
pub struct BloomFilter<H = Murmur3>
where
    H: HashFunction,
{
    bs: FixedBitSet,
    k: usize,
    hashing: Hashing<H>,
}

#[derive(Clone)]
enum Hashing<H> {
    Double(H),
    Multi(Vec<H>),
}

impl<H> Hashing<H>
where
    H: HashFunction,
{
    fn positions<'a, 'b, T>(&'a self, m: usize, k: usize, obj: &'b T) -> Positions<'a, 'b, H>
    where
        T: Hashable + ?Sized,
    {
        match self {
            Self::Double(hash) => Positions::Double(DoubleHashIter::new(m, k, hash.hash(obj))),
            Self::Multi(hashes) => Positions::Multi {
                hashes: hashes.iter(),
                bytes: obj.bytes(),
                m: m as u64,
            },
        }
    }
}

enum Positions<'a, 'b, H> {
    Double(DoubleHashIter),
    Multi {
        hashes: slice::Iter<'a, H>,
        bytes: Cow<'b, [u8]>,
        m: u64,
    },
}

impl<H> Iterator for Positions<'_, '_, H>
where
    H: HashFunction,
{
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        match self {
            Self::Double(iter) => iter.next(),
            Self::Multi { hashes, bytes, m } => hashes
                .next()
                .map(|hash| (hash.hash_bytes(&**bytes) % *m) as usize),
        }
    }
}

impl BloomFilter {
    /// Create new, empty BloomFilter with internal parameters, using double hashing on top of
    /// [`Murmur3`].
    ///
    /// - `m` is the number of bits used to store state, must be `> 0`
    /// - `k` is the number of hash functions, must be `> 0`
    pub fn with_params(m: usize, k: usize) -> Result<Self> {
        Self::with_params_and_hash(m, k, Murmur3)
    }

    /// Create new, empty BloomFilter with given properties.
    ///
    /// - `n` number of unique elements the BloomFilter is expected to hold, must be `> 0`
    /// - `p` false positive rate when querying the BloomFilter after adding `n` unique
    ///   elements, must be `> 0` and `< 1`
    pub fn with_properties(n: usize, p: f64) -> Result<Self> {
        Self::with_properties_and_hash(n, p, Murmur3)
    }
}

impl<H> BloomFilter<H>
where
    H: HashFunction,
{
    /// Same as `with_params` but with specific base hash function.
    pub fn with_params_and_hash(m: usize, k: usize, hash: H) -> Result<Self> {
        if m == 0 {
            return invalid_configuration("m must be greater than 0".to_owned());
        }
        if k == 0 {
            return invalid_configuration("k must be greater than 0".to_owned());
        }

        tracing::debug!(m, k, "created double hashing BloomFilter");
        Ok(Self {
            bs: FixedBitSet::with_capacity(m),
            k,
            hashing: Hashing::Double(hash),
        })
    }

    /// Create new, empty BloomFilter that uses one bit position per given hash function.
    ///
    /// - `m` is the number of bits used to store state, must be `> 0`
    /// - `hashes` are the hash functions, at least one is required
    pub fn with_hashes(m: usize, hashes: Vec<H>) -> Result<Self> {
        if hashes.is_empty() {
            return invalid_configuration("at least one hash function is required".to_owned());
        }
        if m == 0 {
            return invalid_configuration("m must be greater than 0".to_owned());
        }

        let k = hashes.len();
        tracing::debug!(m, k, "created BloomFilter with explicit hash functions");
        Ok(Self {
            bs: FixedBitSet::with_capacity(m),
            k,
            hashing: Hashing::Multi(hashes),
        })
    }

    /// Same as `with_properties` but with specific base hash function.
    pub fn with_properties_and_hash(n: usize, p: f64, hash: H) -> Result<Self> {
        if n == 0 {
            return invalid_configuration("n must be greater than 0".to_owned());
        }
        if !((p > 0.) & (p < 1.)) {
            return invalid_configuration(format!(
                "p ({}) must be greater than 0 and smaller than 1",
                p
            ));
        }

        let k = ((-p.log2()) as usize).max(1);
        let ln2 = (2f64).ln();
        let m = -((n as f64) * p.ln()) / (ln2 * ln2);
        if !(m <= isize::MAX as f64) {
            return invalid_configuration(format!(
                "n ({}) and p ({:e}) require too many bits",
                n, p
            ));
        }

        Self::with_params_and_hash((m as usize).max(1), k, hash)
    }

    /// Get `k` (number of hash functions).
    pub fn k(&self) -> usize {
        self.k
    }

    /// Get `m` (number of stored bits).
    pub fn m(&self) -> usize {
        self.bs.len()
    }

    /// Get hash functions. In double hashing mode, this is the single base hash function.
    pub fn hash_functions(&self) -> &[H] {
        match &self.hashing {
            Hashing::Double(hash) => slice::from_ref(hash),
            Hashing::Multi(hashes) => hashes.as_slice(),
        }
    }

    /// Add new element to the BloomFilter.
    ///
    /// If the same element is added multiple times or if an element results in the same hash
    /// signature, this method does not have any effect.
    pub fn add<T>(&mut self, obj: &T)
    where
        T: Hashable + ?Sized,
    {
        self.set_bits(obj);
    }

    /// Guess if the given element was added to the BloomFilter.
    ///
    /// `false` is always correct, `true` may be a false positive.
    pub fn has<T>(&self, obj: &T) -> bool
    where
        T: Hashable + ?Sized,
    {
        self.hashing
            .positions(self.bs.len(), self.k, obj)
            .all(|pos| self.bs[pos])
    }

    /// Check whether the BloomFilter is empty.
    pub fn is_empty(&self) -> bool {
        self.bs.ones().next().is_none()
    }

    /// Guess the number of unique elements added to the BloomFilter.
    ///
    /// Saturates at `usize::MAX` once all bits are set.
    pub fn guess_n(&self) -> usize {
        let m = self.bs.len() as f64;
        let k = self.k as f64;
        let x = self.bs.ones().count() as f64;

        (-m / k * (1. - x / m).ln()) as usize
    }

    /// Probability that `has` reports an element that was never added, given the current state.
    pub fn false_positive_rate(&self) -> f64 {
        let m = self.bs.len() as f64;
        let x = self.bs.ones().count() as f64;

        (x / m).powi(self.k as i32)
    }

    /// Set all bits of `obj`, returns `true` if at least one of them was not set before.
    fn set_bits<T>(&mut self, obj: &T) -> bool
    where
        T: Hashable + ?Sized,
    {
        let mut changed = false;
        for pos in self.hashing.positions(self.bs.len(), self.k, obj) {
            changed |= !self.bs.put(pos);
        }
        changed
    }
}

impl<H> fmt::Debug for BloomFilter<H>
where
    H: HashFunction,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BloomFilter {{ m: {}, k: {} }}", self.bs.len(), self.k)
    }
}

impl<T, H> Extend<T> for BloomFilter<H>
where
    T: Hashable,
    H: HashFunction,
{
    fn extend<S: IntoIterator<Item = T>>(&mut self, iter: S) {
        for elem in iter {
            self.add(&elem);
        }
    }
}

impl<T, H> Filter<T> for BloomFilter<H>
where
    T: Hashable + ?Sized,
    H: HashFunction,
{
    type InsertErr = Infallible;

    fn insert(&mut self, obj: &T) -> std::result::Result<bool, Self::InsertErr> {
        Ok(self.set_bits(obj))
    }

    fn is_empty(&self) -> bool {
        self.is_empty()
    }

    fn len(&self) -> usize {
        self.guess_n()
    }

    fn query(&self, obj: &T) -> bool {
        self.has(obj)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::BloomFilter;
    use crate::error::Error;
    use crate::filters::Filter;
    use crate::hash_utils::{derive, HashFunction, Murmur3};
    use crate::test_util::{random_word, rng};

    #[test]
    fn getter() {
        let bf = BloomFilter::with_params(100, 2).unwrap();
        assert_eq!(bf.k(), 2);
        assert_eq!(bf.m(), 100);
        assert_eq!(bf.hash_functions(), &[Murmur3]);
    }

    #[test]
    fn empty() {
        let bf = BloomFilter::with_params(100, 2).unwrap();
        assert!(!bf.has(&1));
    }

    #[test]
    fn add() {
        let mut bf = BloomFilter::with_params(100, 2).unwrap();

        bf.add(&1);
        assert!(bf.has(&1));
        assert!(!bf.has(&2));
        assert!(!bf.has(&3));
    }

    #[test]
    fn add_unsized() {
        let mut bf = BloomFilter::with_params(1000, 3).unwrap();

        bf.add("my super long string");
        assert!(bf.has("my super long string"));
        assert!(bf.has(&String::from("my super long string")));
        assert!(!bf.has("another super long string"));
    }

    #[test]
    fn add_is_idempotent() {
        let mut bf = BloomFilter::with_params(100, 7).unwrap();

        bf.add("foo");
        let bits = bf.bs.clone();
        for _ in 0..10 {
            bf.add("foo");
            assert_eq!(bf.bs, bits);
        }
    }

    #[test]
    fn is_empty() {
        let mut bf = BloomFilter::with_params(100, 2).unwrap();
        assert!(bf.is_empty());

        bf.add(&1);
        assert!(!bf.is_empty());
    }

    #[test]
    fn clone() {
        let mut bf1 = BloomFilter::with_params(100, 2).unwrap();
        bf1.add(&1);

        let bf2 = bf1.clone();
        bf1.add(&2);
        assert!(bf2.has(&1));
        assert!(!bf2.has(&2));
    }

    #[test]
    fn with_params_errors() {
        assert_eq!(
            BloomFilter::with_params(0, 2).unwrap_err(),
            Error::InvalidConfiguration("m must be greater than 0".to_owned())
        );
        assert_eq!(
            BloomFilter::with_params(100, 0).unwrap_err(),
            Error::InvalidConfiguration("k must be greater than 0".to_owned())
        );
    }

    #[test]
    fn with_hashes() {
        let mut bf = BloomFilter::with_hashes(1000, vec![derive(1), derive(2), derive(3)]).unwrap();
        assert_eq!(bf.k(), 3);
        assert_eq!(bf.m(), 1000);
        assert_eq!(bf.hash_functions().len(), 3);

        bf.add(&1);
        assert!(bf.has(&1));
        assert!(!bf.has(&2));
        assert!(!bf.has(&3));
        assert!(!bf.has(&4));
    }

    #[test]
    fn with_hashes_bit_positions() {
        let hashes = vec![derive(1), derive(2), derive(3)];
        let mut bf = BloomFilter::with_hashes(1000, hashes.clone()).unwrap();
        bf.add(&42u64);

        let expected: HashSet<usize> = hashes
            .iter()
            .map(|h| (h.hash(&42u64) % 1000) as usize)
            .collect();
        let actual: HashSet<usize> = bf.bs.ones().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn with_hashes_boxed() {
        let hashes: Vec<Box<dyn HashFunction>> = vec![Box::new(Murmur3), Box::new(derive(7))];
        let mut bf = BloomFilter::with_hashes(1000, hashes).unwrap();
        assert_eq!(bf.k(), 2);

        bf.add(&1);
        assert!(bf.has(&1));
        assert!(!bf.has(&2));
        assert!(!bf.has(&5));
    }

    #[test]
    fn with_hashes_empty() {
        let err = BloomFilter::<Murmur3>::with_hashes(100, vec![]).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidConfiguration("at least one hash function is required".to_owned())
        );

        let err = BloomFilter::with_hashes(0, vec![Murmur3]).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidConfiguration("m must be greater than 0".to_owned())
        );
    }

    #[test]
    fn with_properties() {
        let bf = BloomFilter::with_properties(1000, 0.1).unwrap();
        assert_eq!(bf.k(), 3);
        assert_eq!(bf.m(), 4792);

        // k is never 0, even for very high false positive rates
        let bf = BloomFilter::with_properties(1, 0.9).unwrap();
        assert_eq!(bf.k(), 1);
        assert_eq!(bf.m(), 1);
    }

    #[test]
    fn with_properties_errors() {
        assert_eq!(
            BloomFilter::with_properties(0, 0.1).unwrap_err(),
            Error::InvalidConfiguration("n must be greater than 0".to_owned())
        );
        assert_eq!(
            BloomFilter::with_properties(1000, 0.).unwrap_err(),
            Error::InvalidConfiguration(
                "p (0) must be greater than 0 and smaller than 1".to_owned()
            )
        );
        assert_eq!(
            BloomFilter::with_properties(1000, 1.).unwrap_err(),
            Error::InvalidConfiguration(
                "p (1) must be greater than 0 and smaller than 1".to_owned()
            )
        );
        assert!(BloomFilter::with_properties(1000, f64::NAN).is_err());
        assert_eq!(
            BloomFilter::with_properties(usize::MAX, 1e-300).unwrap_err(),
            Error::InvalidConfiguration(format!(
                "n ({}) and p (1e-300) require too many bits",
                usize::MAX
            ))
        );
    }

    #[test]
    fn guess_n() {
        let mut bf = BloomFilter::with_params(100, 2).unwrap();
        assert_eq!(bf.guess_n(), 0);

        bf.add(&1);
        assert_eq!(bf.guess_n(), 1);

        bf.add(&1);
        assert_eq!(bf.guess_n(), 1);

        bf.add(&2);
        assert_eq!(bf.guess_n(), 2);
    }

    #[test]
    fn false_positive_rate() {
        let mut bf = BloomFilter::with_params(100, 2).unwrap();
        assert_eq!(bf.false_positive_rate(), 0.);

        bf.add(&1);
        bf.add(&2);
        assert!((bf.false_positive_rate() - 0.0016).abs() < 1e-12);
    }

    #[test]
    fn debug() {
        let bf = BloomFilter::with_params(100, 2).unwrap();
        assert_eq!(format!("{:?}", bf), "BloomFilter { m: 100, k: 2 }");
    }

    #[test]
    fn extend() {
        let mut bf = BloomFilter::with_params(100, 2).unwrap();

        bf.extend(vec![1, 2]);
        assert!(bf.has(&1));
        assert!(bf.has(&2));
        assert!(!bf.has(&3));
    }

    #[test]
    fn filter_insert() {
        let mut bf = BloomFilter::with_params(100, 2).unwrap();
        assert!(<BloomFilter as Filter<i32>>::is_empty(&bf));

        assert!(<BloomFilter as Filter<i32>>::insert(&mut bf, &1).unwrap());
        assert!(!<BloomFilter as Filter<i32>>::insert(&mut bf, &1).unwrap());
        assert!(<BloomFilter as Filter<i32>>::query(&bf, &1));
        assert_eq!(<BloomFilter as Filter<i32>>::len(&bf), 1);
        assert!(!<BloomFilter as Filter<i32>>::is_empty(&bf));
    }

    #[test]
    fn stream_no_false_negatives() {
        // tiny and heavily overloaded filter, so that false positives are common
        let mut bf = BloomFilter::with_params(100, 7).unwrap();
        let mut set: HashSet<String> = HashSet::new();
        let mut rng = rng();

        for _ in 0..100_000 {
            let word = random_word(&mut rng, 5);
            if Filter::<String>::query(&set, &word) {
                assert!(bf.has(&word), "could not find word '{}'", word);
            }
            Filter::<String>::insert(&mut set, &word).unwrap();
            bf.add(&word);
        }
    }
}
