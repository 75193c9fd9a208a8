use glyph_types::Address;
use tracing::warn;

use crate::error::{GateError, GateResult};

/// Single-owner authorization check for mutation entry points.
///
/// Queries never consult the guard. Transferring ownership is outside the
/// registry; a new owner means a new guard.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessGuard {
    owner: Address,
}

impl AccessGuard {
    pub fn new(owner: Address) -> Self {
        Self { owner }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Succeeds only when `caller` is the owner.
    pub fn authorize(&self, caller: &Address) -> GateResult<()> {
        if *caller == self.owner {
            Ok(())
        } else {
            warn!(%caller, "rejected mutation from non-owner");
            Err(GateError::Unauthorized { caller: *caller })
        }
    }
}
