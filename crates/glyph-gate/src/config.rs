use serde::{Deserialize, Serialize};

/// Limits enforced by the mutation gate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Largest accepted PNG payload, in bytes.
    pub max_png_size: usize,
    /// Largest accepted SVG payload, in bytes.
    pub max_svg_size: usize,
    /// Largest accepted WEBP payload, in bytes.
    pub max_webp_size: usize,
    /// How many leading bytes of an SVG are scanned for `<svg`.
    pub svg_scan_window: usize,
    /// Most items accepted in one batched write.
    pub max_batch_len: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_png_size: 256 * 1024,
            max_svg_size: 32 * 1024,
            max_webp_size: 256 * 1024,
            svg_scan_window: 1024,
            max_batch_len: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = GateConfig::default();
        assert_eq!(config.max_svg_size, 32 * 1024);
        assert_eq!(config.svg_scan_window, 1024);
        assert_eq!(config.max_batch_len, 64);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: GateConfig = toml::from_str("max_png_size = 1024").unwrap();
        assert_eq!(config.max_png_size, 1024);
        assert_eq!(config.max_svg_size, 32 * 1024);
    }
}
