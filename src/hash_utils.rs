//! Hash-related utils.
//!
//! All data structures of this crate work on values that implement [`Hashable`], i.e. values
//! that can produce a deterministic byte representation of themselves. These bytes are fed into a
//! [`HashFunction`], by default [`Murmur3`].
//!
//! Some data structures require more than one hash function. Instead of hashing the input bytes
//! multiple times, a single 64-bit base hash `h` is split into its upper half `hi` and its lower
//! half `lo`, which are then linearly recombined (see [`combine`], [`Derived`],
//! [`DoubleHashIter`] and [`DerivedHashIter`]). The outputs are assumed to be independent enough
//! for the error bounds of the data structures to hold. This assumption is inherited from the
//! literature and is not a cryptographic guarantee.
use std::borrow::Cow;

/// A value that can be hashed by the data structures of this crate.
///
/// Two values that produce the same bytes are considered to be identical.
///
/// # Examples
/// ```
/// use std::borrow::Cow;
///
/// use probably::hash_utils::{hash, Hashable};
///
/// struct Point {
///     x: i32,
///     y: i32,
/// }
///
/// impl Hashable for Point {
///     fn bytes(&self) -> Cow<'_, [u8]> {
///         let mut buf = Vec::with_capacity(8);
///         buf.extend_from_slice(&self.x.to_be_bytes());
///         buf.extend_from_slice(&self.y.to_be_bytes());
///         Cow::Owned(buf)
///     }
/// }
///
/// assert_eq!(hash(&Point { x: 1, y: 2 }), hash(&Point { x: 1, y: 2 }));
/// assert_ne!(hash(&Point { x: 1, y: 2 }), hash(&Point { x: 2, y: 1 }));
/// ```
pub trait Hashable {
    /// Byte representation of the value.
    fn bytes(&self) -> Cow<'_, [u8]>;
}

impl Hashable for str {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl Hashable for String {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_bytes())
    }
}

impl Hashable for [u8] {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self)
    }
}

impl Hashable for Vec<u8> {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.as_slice())
    }
}

impl<const N: usize> Hashable for [u8; N] {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self[..])
    }
}

impl Hashable for bool {
    fn bytes(&self) -> Cow<'_, [u8]> {
        Cow::Owned(vec![u8::from(*self)])
    }
}

impl Hashable for char {
    fn bytes(&self) -> Cow<'_, [u8]> {
        let mut buf = [0; 4];
        Cow::Owned(self.encode_utf8(&mut buf).as_bytes().to_vec())
    }
}

// integers are hashed as fixed-width big-endian bytes
macro_rules! impl_hashable_int {
    ($($t:ty),*) => {
        $(
            impl Hashable for $t {
                #[inline]
                fn bytes(&self) -> Cow<'_, [u8]> {
                    Cow::Owned(self.to_be_bytes().to_vec())
                }
            }
        )*
    };
}

impl_hashable_int!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);

impl<T> Hashable for &T
where
    T: Hashable + ?Sized,
{
    fn bytes(&self) -> Cow<'_, [u8]> {
        (**self).bytes()
    }
}

impl<T> Hashable for Box<T>
where
    T: Hashable + ?Sized,
{
    fn bytes(&self) -> Cow<'_, [u8]> {
        (**self).bytes()
    }
}

/// Deterministic, total mapping from bytes to a 64-bit integer.
pub trait HashFunction {
    /// Hash raw bytes.
    fn hash_bytes(&self, bytes: &[u8]) -> u64;

    /// Hash the byte representation of `obj`.
    fn hash<T>(&self, obj: &T) -> u64
    where
        T: Hashable + ?Sized,
        Self: Sized,
    {
        self.hash_bytes(&obj.bytes())
    }
}

impl<H> HashFunction for &H
where
    H: HashFunction + ?Sized,
{
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        (**self).hash_bytes(bytes)
    }
}

impl<H> HashFunction for Box<H>
where
    H: HashFunction + ?Sized,
{
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        (**self).hash_bytes(bytes)
    }
}

/// MurmurHash3 (x64, 128 bit variant, seed 0), truncated to the first 64-bit half.
///
/// This is the default base hash of all data structures in this crate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Murmur3;

impl HashFunction for Murmur3 {
    fn hash_bytes(&self, mut bytes: &[u8]) -> u64 {
        let h = murmur3::murmur3_x64_128(&mut bytes, 0)
            .expect("reading from a byte slice cannot fail");
        h as u64
    }
}

/// Hash `obj` using [`Murmur3`].
pub fn hash<T>(obj: &T) -> u64
where
    T: Hashable + ?Sized,
{
    Murmur3.hash(obj)
}

/// Recombine the two 32-bit halves of the base hash `h` using `seed`: `hi(h) + lo(h) * seed`.
#[inline]
pub fn combine(h: u64, seed: u64) -> u64 {
    let hi = h >> 32;
    let lo = h & 0xffff_ffff;
    hi.wrapping_add(lo.wrapping_mul(seed))
}

/// Hash function derived from a base hash function and a multiplicative seed.
///
/// The base hash is computed once and its halves are recombined via [`combine`]. Different seeds
/// give different members of a hash function family without hashing the input bytes again.
///
/// The outputs are meant to be reduced modulo a table size. Their upper bits are not uniformly
/// distributed (`hi(h) + lo(h) * seed` stays far below `2^64` for small seeds), so they must not
/// be used where leading bits matter, e.g. for a [`HyperLogLog`](crate::hyperloglog::HyperLogLog).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Derived<H = Murmur3> {
    base: H,
    seed: u64,
}

impl<H> Derived<H> {
    /// Derive a new hash function from `base` and `seed`.
    pub fn new(base: H, seed: u64) -> Self {
        Self { base, seed }
    }

    /// Get base hash function.
    pub fn base(&self) -> &H {
        &self.base
    }

    /// Get seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl<H> HashFunction for Derived<H>
where
    H: HashFunction,
{
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        combine(self.base.hash_bytes(bytes), self.seed)
    }
}

/// Derive a hash function from [`Murmur3`] using `seed`.
pub fn derive(seed: u64) -> Derived {
    Derived::new(Murmur3, seed)
}

/// `Iterator` that creates `k` positions in `[0, m)` out of a single base hash `h` via double
/// hashing.
///
/// The `i`-th position (`i` from `1` to `k`) is `(lo(h) + i * hi(h)) mod m`.
#[derive(Clone, Copy, Debug)]
pub struct DoubleHashIter {
    m: u64,
    k: u64,
    i: u64,
    lo: u64,
    hi: u64,
}

impl DoubleHashIter {
    /// Create new `DoubleHashIter` with the following parameters:
    ///
    /// - `m`: upper bound (exclusive) of the positions, must be `> 0`
    /// - `k`: number of positions to generate
    /// - `h`: base hash of the object
    pub fn new(m: usize, k: usize, h: u64) -> Self {
        Self {
            m: m as u64,
            k: k as u64,
            i: 0,
            lo: h & 0xffff_ffff,
            hi: h >> 32,
        }
    }
}

impl Iterator for DoubleHashIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.i < self.k {
            self.i += 1;
            let x = self.lo.wrapping_add(self.i.wrapping_mul(self.hi)) % self.m;
            Some(x as usize)
        } else {
            None
        }
    }
}

/// `Iterator` that creates `h_i(x) mod m` for the derived hash functions `h_i = derive(i + 1)`,
/// `i` from `0` to `k - 1`, out of a single base hash `h`.
#[derive(Clone, Copy, Debug)]
pub struct DerivedHashIter {
    m: u64,
    k: u64,
    i: u64,
    h: u64,
}

impl DerivedHashIter {
    /// Create new `DerivedHashIter` with the following parameters:
    ///
    /// - `m`: upper bound (exclusive) of the results, must be `> 0`
    /// - `k`: number of hash functions
    /// - `h`: base hash of the object
    pub fn new(m: usize, k: usize, h: u64) -> Self {
        Self {
            m: m as u64,
            k: k as u64,
            i: 0,
            h,
        }
    }
}

impl Iterator for DerivedHashIter {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.i < self.k {
            self.i += 1;
            Some((combine(self.h, self.i) % self.m) as usize)
        } else {
            None
        }
    }
}
