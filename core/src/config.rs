use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// What the phrase bonuses are matched against when scoring a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BonusTarget {
    /// The chunk identifier string `"{document_id}_{ordinal}"`. Realistic identifiers
    /// almost never contain query phrases, so the bonus rarely fires.
    #[default]
    Identifier,
    /// The lowercased chunk text.
    Content,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Target chunk length in characters.
    pub chunk_size: usize,
    /// Tokens carried from the end of one chunk into the next.
    pub chunk_overlap: usize,
    pub cache_max_entries: usize,
    pub cache_ttl_secs: u64,
    pub bonus_target: BonusTarget,
    /// Number of served queries kept in the history ring.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            cache_max_entries: 1000,
            cache_ttl_secs: 3600,
            bonus_target: BonusTarget::Identifier,
            history_limit: 100,
        }
    }
}

impl EngineConfig {
    /// Read a JSON config file. Missing fields fall back to their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: EngineConfig = serde_json::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.as_ref().display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(EngineError::Config("chunk_size must be positive".into()));
        }
        if self.cache_max_entries == 0 {
            return Err(EngineError::Config("cache_max_entries must be positive".into()));
        }
        Ok(())
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}
