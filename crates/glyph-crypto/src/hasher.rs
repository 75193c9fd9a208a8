use glyph_types::{CanonicalKey, Slug};
use sha3::{Digest, Keccak256};

/// Raw keccak-256 (the pre-NIST padding variant, not SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// Derives canonical keys from slugs.
///
/// The derivation is a wire contract: `key = keccak256(utf8(slug))`, with no
/// domain tag, normalization, or trimming. Every client that already
/// published data computed keys this way, and a mismatch shows up as silent
/// lookup misses rather than errors.
pub struct KeyHasher;

impl KeyHasher {
    /// Canonical key for a validated slug.
    pub fn derive(slug: &Slug) -> CanonicalKey {
        CanonicalKey::from_hash(keccak256(slug.as_bytes()))
    }

    /// Canonical key for an arbitrary string, bypassing slug validation.
    pub fn derive_str(slug: &str) -> CanonicalKey {
        CanonicalKey::from_hash(keccak256(slug.as_bytes()))
    }

    /// Check that `slug` hashes to `expected`.
    pub fn verify(slug: &str, expected: &CanonicalKey) -> bool {
        Self::derive_str(slug) == *expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_matches_known_vector() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn hello_matches_known_vector() {
        assert_eq!(
            hex::encode(keccak256(b"hello")),
            "1c8aff950685c2ed4bc3174f3472287b56d9517b9c948127319a09a7a36deac8"
        );
    }

    #[test]
    fn derive_is_deterministic() {
        let slug = Slug::new("protocols/uniswap").unwrap();
        assert_eq!(KeyHasher::derive(&slug), KeyHasher::derive(&slug));
        assert_eq!(KeyHasher::derive(&slug), KeyHasher::derive_str("protocols/uniswap"));
    }

    #[test]
    fn derivation_is_case_sensitive() {
        assert_ne!(
            KeyHasher::derive_str("tokens/usdc"),
            KeyHasher::derive_str("tokens/USDC")
        );
    }

    #[test]
    fn no_trimming_is_applied() {
        assert_ne!(
            KeyHasher::derive_str("tokens/usdc"),
            KeyHasher::derive_str("tokens/usdc ")
        );
    }

    #[test]
    fn verify_accepts_matching_slug() {
        let key = KeyHasher::derive_str("chains/ethereum");
        assert!(KeyHasher::verify("chains/ethereum", &key));
        assert!(!KeyHasher::verify("chains/polygon", &key));
    }
}
