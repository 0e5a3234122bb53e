//! Fuzz input acquisition: seeded generation or a saved buffer.

use std::fs;
use std::path::Path;

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};

/// Returns `seed`, or draws a fresh one from the operating system.
pub fn resolve_seed(seed: Option<u64>) -> u64 {
    seed.unwrap_or_else(|| OsRng.next_u64())
}

/// Fills `len` bytes from `rng`.
pub fn generate_input(rng: &mut impl RngCore, len: usize) -> Vec<u8> {
    let mut input = vec![0u8; len];
    rng.fill_bytes(&mut input);
    input
}

/// Deterministic input for `seed`.
pub fn seeded_input(seed: u64, len: usize) -> Vec<u8> {
    generate_input(&mut StdRng::seed_from_u64(seed), len)
}

/// Reads a saved input buffer.
pub fn read_input(path: &Path) -> Result<Vec<u8>, String> {
    fs::read(path).map_err(|error| format!("failed to read input '{}': {error}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{resolve_seed, seeded_input};

    #[test]
    fn same_seed_same_bytes() {
        assert_eq!(seeded_input(7, 64), seeded_input(7, 64));
        assert_ne!(seeded_input(7, 64), seeded_input(8, 64));
        assert_eq!(seeded_input(7, 4096).len(), 4096);
    }

    #[test]
    fn explicit_seed_is_kept() {
        assert_eq!(resolve_seed(Some(42)), 42);
    }
}
