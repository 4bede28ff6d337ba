use crate::config::Config;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize)]
pub struct CacheEntry {
    pub hash: String,
    pub output: String,
}

/// On-disk cache of transform output, one JSON entry per source file. An entry
/// is only reused while both the source text and the options hash the same.
pub struct TransformCache {
    cache_dir: PathBuf,
}

impl TransformCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir).ok();
        }
        Self { cache_dir }
    }

    pub fn compute_hash(source: &str, config: &Config) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_bytes());
        // Options change the output as much as the source does.
        if let Ok(options) = serde_json::to_vec(config) {
            hasher.update(&options);
        }
        format!("{:x}", hasher.finalize())
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    fn get_cache_path(&self, file_path: &str) -> PathBuf {
        let safe_name = file_path.replace(['/', '\\', ':'], "_");
        self.cache_dir.join(format!("{}.json", safe_name))
    }

    pub fn get(&self, file_path: &str, source: &str, config: &Config) -> Option<String> {
        let cache_path = self.get_cache_path(file_path);
        let data = fs::read_to_string(&cache_path).ok()?;

        let entry: CacheEntry = match serde_json::from_str(&data) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(file = file_path, error = %e, "dropping corrupt cache entry");
                fs::remove_file(cache_path).ok();
                return None;
            }
        };

        if entry.hash == Self::compute_hash(source, config) {
            Some(entry.output)
        } else {
            None
        }
    }

    pub fn set(&self, file_path: &str, source: &str, config: &Config, output: &str) {
        let entry = CacheEntry {
            hash: Self::compute_hash(source, config),
            output: output.to_string(),
        };
        if let Ok(data) = serde_json::to_string(&entry) {
            fs::write(self.get_cache_path(file_path), data).ok();
        }
    }

    /// Cached output for `file_path`, transforming and storing it on a miss.
    /// Failed transforms are not cached.
    pub fn get_or_transform(&self, file_path: &str, source: &str, config: &Config) -> Result<String> {
        if let Some(output) = self.get(file_path, source, config) {
            tracing::trace!(file = file_path, "cache hit");
            return Ok(output);
        }
        let output = crate::assemble::transform(source, config)?;
        self.set(file_path, source, config, &output);
        Ok(output)
    }
}
