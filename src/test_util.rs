use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Deterministic RNG so that test traces are reproducible.
pub(crate) fn rng() -> ChaCha20Rng {
    ChaCha20Rng::seed_from_u64(1337)
}

/// Random word of `len` lowercase ASCII letters.
pub(crate) fn random_word<R>(rng: &mut R, len: usize) -> String
where
    R: Rng,
{
    (0..len)
        .map(|_| char::from(rng.random_range(b'a'..=b'z')))
        .collect()
}
