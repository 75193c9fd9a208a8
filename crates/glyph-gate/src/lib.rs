//! Mutation gate for the Glyph Registry.
//!
//! Every write must pass through the gate before it touches storage. The
//! gate runs two checks, in this order:
//!
//! 1. [`AccessGuard`] -- the caller must be the registry owner.
//! 2. [`FormatValidator`] -- the payload must be non-empty, match its
//!    declared format's signature, and fit that format's size ceiling.
//!
//! Both checks are side-effect free, so a rejected write leaves no state
//! behind.
//!
//! # Quick Start
//!
//! ```rust
//! use glyph_gate::{AccessGuard, FormatValidator, GateConfig};
//! use glyph_types::{Address, FormatTag};
//!
//! let owner = Address::from_raw([7u8; 20]);
//! let guard = AccessGuard::new(owner);
//! guard.authorize(&owner).unwrap();
//!
//! let validator = FormatValidator::new(GateConfig::default());
//! validator
//!     .validate(FormatTag::Svg, br#"<svg xmlns="http://www.w3.org/2000/svg"/>"#)
//!     .unwrap();
//! ```

pub mod config;
pub mod error;
pub mod format;
pub mod guard;

pub use config::GateConfig;
pub use error::{GateError, GateResult};
pub use format::{FormatValidator, PNG_SIGNATURE};
pub use guard::AccessGuard;
