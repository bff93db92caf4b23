//! Chunk reader configuration.

use serde::{Deserialize, Serialize};
use tsblock_common::{Result, error::Error, verify_arg};

/// Tuning knobs of the chunk read path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkReaderConfig {
    /// Upper bound assumed for an encoded chunk when its real length is not yet
    /// known. Chunks that turn out to be longer are fetched again on their own.
    pub estimated_max_chunk_size: usize,
    /// Largest gap, in bytes, between two chunk ranges that still lets them be
    /// fetched with a single range read.
    pub max_gap_size: u64,
    /// Worker threads used for range fetches. The default shares the global
    /// fetch pool; any other value gives the block a dedicated pool.
    pub fetch_threads: usize,
}

impl ChunkReaderConfig {
    pub const DEFAULT_ESTIMATED_MAX_CHUNK_SIZE: usize = 16000;
    pub const DEFAULT_MAX_GAP_SIZE: u64 = 512 * 1024;
    pub const DEFAULT_FETCH_THREADS: usize = 16;

    pub fn validate(&self) -> Result<()> {
        verify_arg!(estimated_max_chunk_size, self.estimated_max_chunk_size > 0);
        verify_arg!(fetch_threads, self.fetch_threads > 0);
        Ok(())
    }

    /// Parses and validates a JSON configuration. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<ChunkReaderConfig> {
        let config: ChunkReaderConfig = serde_json::from_str(json)
            .map_err(|e| Error::invalid_arg("config", e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

impl Default for ChunkReaderConfig {
    fn default() -> Self {
        ChunkReaderConfig {
            estimated_max_chunk_size: Self::DEFAULT_ESTIMATED_MAX_CHUNK_SIZE,
            max_gap_size: Self::DEFAULT_MAX_GAP_SIZE,
            fetch_threads: Self::DEFAULT_FETCH_THREADS,
        }
    }
}
