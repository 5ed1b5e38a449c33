// The sampling core consumes randomness only through `rand::Rng`, which is
// exactly the abstract uniform-bit-stream contract the design calls for.
// `Pcg64` is the concrete default: a 64-bit, seedable, streamable member of
// the permuted-congruential family, matching the `pcg64` generator the
// original system hard-codes as its `RandomNumberGenerator` typedef.

pub use rand_pcg::Pcg64;
use rand::SeedableRng;

/// Convenience constructor so call sites don't need to import `rand_pcg`
/// directly just to seed a chain.
pub fn seeded(seed: u64) -> Pcg64 {
    Pcg64::seed_from_u64(seed)
}
