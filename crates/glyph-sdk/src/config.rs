use std::fs;
use std::path::{Path, PathBuf};

use glyph_gate::GateConfig;
use glyph_types::Address;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RegistryError, RegistryResult};

const BLOB_DIR: &str = "blobs";
const SNAPSHOT_FILE: &str = "registry.snapshot";

/// Settings for a persistent registry, usually read from `glyph.toml`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Root of the blob store and snapshot file.
    pub data_dir: PathBuf,
    /// The only address allowed to mutate.
    pub owner: Address,
    /// Caller presented by the CLI. Defaults to `owner`.
    pub signer: Option<Address>,
    pub gate: GateConfig,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".glyph"),
            owner: Address::zero(),
            signer: None,
            gate: GateConfig::default(),
        }
    }
}

impl RegistryConfig {
    /// Read a TOML config file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> RegistryResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| RegistryError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
            .map_err(|e| RegistryError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn effective_signer(&self) -> Address {
        self.signer.unwrap_or(self.owner)
    }

    pub fn blob_dir(&self) -> PathBuf {
        self.data_dir.join(BLOB_DIR)
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(SNAPSHOT_FILE)
    }
}
