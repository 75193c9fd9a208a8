//! Format-tag content sniffing.
//!
//! The checks are deliberately shallow: they reject the wrong file *type*,
//! not malformed or malicious content inside a valid type. In particular
//! the SVG check only looks for `<svg` near the start of the payload, which
//! matches how already-published content was accepted.

use glyph_types::FormatTag;

use crate::config::GateConfig;
use crate::error::{GateError, GateResult};

/// The fixed 8-byte PNG file signature.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

const SVG_MARKER: &[u8] = b"<svg";

/// Validates payloads against their declared [`FormatTag`].
#[derive(Clone, Debug, Default)]
pub struct FormatValidator {
    config: GateConfig,
}

impl FormatValidator {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// Check `data` against `format`.
    ///
    /// Empty input is `InvalidData` for every format; everything else that
    /// fails is `InvalidFormat`.
    pub fn validate(&self, format: FormatTag, data: &[u8]) -> GateResult<()> {
        if data.is_empty() {
            return Err(GateError::InvalidData {
                reason: "payload is empty".into(),
            });
        }
        self.check_size(format, data.len())?;
        if self.matches_signature(format, data) {
            Ok(())
        } else {
            Err(GateError::InvalidFormat {
                format,
                reason: match format {
                    FormatTag::Png => "missing PNG signature".into(),
                    FormatTag::Svg => format!(
                        "no <svg tag in the first {} bytes",
                        self.config.svg_scan_window
                    ),
                    FormatTag::Webp => "missing RIFF/WEBP header".into(),
                },
            })
        }
    }

    /// The first format whose signature `data` carries, ignoring size
    /// ceilings. Used to label content whose format was not recorded.
    pub fn detect(&self, data: &[u8]) -> Option<FormatTag> {
        FormatTag::ALL
            .into_iter()
            .find(|format| self.matches_signature(*format, data))
    }

    /// The size ceiling for `format`.
    pub fn max_size(&self, format: FormatTag) -> usize {
        match format {
            FormatTag::Png => self.config.max_png_size,
            FormatTag::Svg => self.config.max_svg_size,
            FormatTag::Webp => self.config.max_webp_size,
        }
    }

    fn check_size(&self, format: FormatTag, len: usize) -> GateResult<()> {
        let limit = self.max_size(format);
        if len > limit {
            return Err(GateError::InvalidFormat {
                format,
                reason: format!("{len} bytes exceeds the {limit} byte limit"),
            });
        }
        Ok(())
    }

    fn matches_signature(&self, format: FormatTag, data: &[u8]) -> bool {
        match format {
            FormatTag::Png => data.starts_with(&PNG_SIGNATURE),
            FormatTag::Svg => self.has_svg_marker(data),
            FormatTag::Webp => {
                data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP"
            }
        }
    }

    fn has_svg_marker(&self, data: &[u8]) -> bool {
        let window = &data[..data.len().min(self.config.svg_scan_window)];
        window
            .windows(SVG_MARKER.len())
            .any(|candidate| candidate.eq_ignore_ascii_case(SVG_MARKER))
    }
}
