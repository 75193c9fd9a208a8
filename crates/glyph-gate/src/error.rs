use glyph_types::{Address, FormatTag};

/// Errors produced by the mutation gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The caller is not the registry owner.
    #[error("unauthorized caller {caller}")]
    Unauthorized { caller: Address },

    /// The payload does not match its declared format.
    #[error("invalid {format} content: {reason}")]
    InvalidFormat { format: FormatTag, reason: String },

    /// The payload is unusable regardless of format (e.g. empty).
    #[error("invalid data: {reason}")]
    InvalidData { reason: String },
}

pub type GateResult<T> = Result<T, GateError>;
