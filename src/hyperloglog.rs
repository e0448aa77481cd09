//! HyperLogLog implementation.
use std::cmp;
use std::fmt;

use crate::error::{invalid_configuration, Result};
use crate::hash_utils::{HashFunction, Hashable, Murmur3};

/// Maximum number of bits used for register selection.
pub const MAX_B: usize = 32;

/// A HyperLogLog is a data structure to count unique elements on a data stream.
///
/// # Examples
/// ```
/// use probably::hyperloglog::HyperLogLog;
///
/// // set up filter
/// let address_bits = 8;  // so we store 2^8 = 256 registers in total
/// let mut hll = HyperLogLog::new(address_bits).unwrap();
///
/// // add some data
/// hll.add("my super long string");
/// hll.add("another super long string");
/// hll.add("my super long string");  // again
///
/// // later
/// assert_eq!(hll.cardinality(), 2);
/// ```
///
/// # Applications
/// - an approximative `COUNT(DISTINCT x)` in SQL
/// - count distinct elements in a data stream that does not fit into memory
///
/// # How It Works
/// The HyperLogLog consists of `m = 2^b` registers, all initialized with `0`.
///
/// During insertion, the element is hashed to a 64-bit value `x`. The top `b` bits of `x` select
/// the register `j`. The remaining `64 - b` bits are the observation window, the rank of `x` is
/// one plus the number of leading zeros within that window. Register `j` stores the maximum rank
/// seen so far, so registers never decrease.
///
/// The cardinality estimate is `E = alpha / sum(2^-register[i])`, with a bias correction constant
/// `alpha` that only depends on `b`. If `E < 2.5 m` and some registers are still `0`, linear
/// counting is used instead: `m * ln(m / zeros)`. There is no correction for estimates close to
/// `2^32`, so the accuracy drops for very large cardinalities.
///
/// The relative error is around `1.04 / sqrt(m)`.
///
/// # Concurrency
/// `add` takes `&mut self` and there is no internal locking. Callers that share a HyperLogLog
/// between threads have to serialize access themselves.
///
/// # See Also
/// - `std::collections::HashSet`: can be used to get the exact count but requires you to store
///   each and every element
///
/// # References
/// - ["HyperLogLog: the analysis of a near-optimal cardinality estimation algorithm", Philippe
///   Flajolet, Éric Fusy, Olivier Gandouet, Frédéric Meunier, 2007](http://algo.inria.fr/flajolet/Publications/FlFuGaMe07.pdf)
/// - [Wikipedia: HyperLogLog](https://en.wikipedia.org/wiki/HyperLogLog)
#[derive(Clone)]
pub struct HyperLogLog<H = Murmur3>
where
    H: HashFunction,
{
    registers: Vec<u8>,
    b: usize,
    alpha: f64,
    hash: H,
}

impl HyperLogLog {
    /// Creates a new, empty HyperLogLog that uses [`Murmur3`].
    ///
    /// - `b` number of bits used for register selection, number of registers within the
    ///   HyperLogLog will be `2^b`. `b` must be `<= 32`.
    pub fn new(b: usize) -> Result<Self> {
        Self::with_hash(b, Murmur3)
    }
}

impl<H> HyperLogLog<H>
where
    H: HashFunction,
{
    /// Same as `new` but with a specific hash function.
    pub fn with_hash(b: usize, hash: H) -> Result<Self> {
        if b > MAX_B {
            return invalid_configuration(format!(
                "b ({}) must be smaller than or equal to {}",
                b, MAX_B
            ));
        }
        let Some(m) = 1usize.checked_shl(b as u32) else {
            return invalid_configuration(format!(
                "2^{} registers cannot be addressed on this platform",
                b
            ));
        };

        tracing::debug!(b, m, "created HyperLogLog");
        Ok(Self {
            registers: vec![0; m],
            b,
            alpha: alpha(b, m),
            hash,
        })
    }

    /// Get number of bits used for register selection.
    pub fn b(&self) -> usize {
        self.b
    }

    /// Get number of registers.
    pub fn m(&self) -> usize {
        self.registers.len()
    }

    /// Get hash function.
    pub fn hash_function(&self) -> &H {
        &self.hash
    }

    /// Expected relative error of the estimate (standard error `1.04 / sqrt(m)`).
    pub fn relative_error(&self) -> f64 {
        1.04 / (self.registers.len() as f64).sqrt()
    }

    /// Adds an element to the HyperLogLog.
    pub fn add<T>(&mut self, obj: &T)
    where
        T: Hashable + ?Sized,
    {
        let x = self.hash.hash(obj);
        let b = self.b as u32;

        // a shift by 64 (b = 0) selects the only register
        let j = x.checked_shr(64 - b).unwrap_or(0) as usize;
        let w = x & (u64::MAX >> b);
        // the top b bits of w are always zero
        let p = (w.leading_zeros() - b + 1) as u8;

        self.registers[j] = cmp::max(self.registers[j], p);
    }

    /// Guess the number of unique elements seen by the HyperLogLog.
    pub fn cardinality(&self) -> u64 {
        let m = self.registers.len() as f64;

        let sum = self
            .registers
            .iter()
            .map(|&x| 2f64.powi(-i32::from(x)))
            .sum::<f64>();
        let e = self.alpha / sum;

        if e < 5. / 2. * m {
            // small range correction
            let v = bytecount::count(&self.registers, 0);
            if v != 0 {
                return (m * (m / (v as f64)).ln()).round() as u64;
            }
        }

        e.round() as u64
    }

    /// Checks whether the HyperLogLog has never seen an element.
    pub fn is_empty(&self) -> bool {
        self.registers.iter().all(|&x| x == 0)
    }
}

/// Bias correction `alpha_m * m^2`.
fn alpha(b: usize, m: usize) -> f64 {
    let m = m as f64;
    let am = match b {
        4 => 0.673,
        5 => 0.697,
        6 => 0.709,
        _ => 0.7213 / (1. + 1.079 / m),
    };
    am * m * m
}

impl<H> fmt::Debug for HyperLogLog<H>
where
    H: HashFunction,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HyperLogLog {{ b: {} }}", self.b)
    }
}

impl<T, H> Extend<T> for HyperLogLog<H>
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
