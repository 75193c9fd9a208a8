//! Cryptographic primitives for the Glyph Registry.
//!
//! Provides the compatibility-critical slug → [`CanonicalKey`] derivation
//! (keccak-256) and BLAKE3 content digests used by storage backends to
//! detect corrupted blobs.
//!
//! All crypto operations wrap established libraries -- no custom cryptography.
//!
//! [`CanonicalKey`]: glyph_types::CanonicalKey

pub mod digest;
pub mod hasher;

pub use digest::ContentDigest;
pub use hasher::{keccak256, KeyHasher};
