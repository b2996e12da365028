use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Language variants with a `memes_<variant>.json` file.
pub const MEME_VARIANTS: &[&str] = &["ru", "it"];

#[derive(Debug, thiserror::Error)]
pub enum MemeError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct MemeFile {
    #[serde(default)]
    urls: Vec<String>,
}

/// URL lists per variant, read from disk the first time each variant is picked.
pub struct MemeCache {
    dir: PathBuf,
    entries: Mutex<HashMap<String, Arc<Vec<String>>>>,
}

impl MemeCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn file_for(&self, variant: &str) -> PathBuf {
        self.dir.join(format!("memes_{}.json", variant))
    }

    /// Pick a random variant, then a random URL from it.
    ///
    /// `Ok(None)` means the chosen variant's list is empty.
    pub async fn random_meme(&self) -> Result<Option<String>, MemeError> {
        let variant = MEME_VARIANTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or("ru");
        self.random_from(variant).await
    }

    pub async fn random_from(&self, variant: &str) -> Result<Option<String>, MemeError> {
        let urls = self.urls(variant).await?;
        Ok(urls.choose(&mut rand::thread_rng()).cloned())
    }

    /// Cached list for a variant. A failed load is not cached.
    pub async fn urls(&self, variant: &str) -> Result<Arc<Vec<String>>, MemeError> {
        if let Some(urls) = self.cached(variant) {
            return Ok(urls);
        }

        let path = self.file_for(variant);
        let urls = Arc::new(load_urls(&path).await?);
        info!("Loaded {} meme urls for variant '{}'", urls.len(), variant);

        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // Another task may have loaded it meanwhile; keep the first.
        let urls = entries
            .entry(variant.to_string())
            .or_insert(urls)
            .clone();
        Ok(urls)
    }

    fn cached(&self, variant: &str) -> Option<Arc<Vec<String>>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(variant).cloned()
    }
}

async fn load_urls(path: &Path) -> Result<Vec<String>, MemeError> {
    debug!("Reading meme file {:?}", path);
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| MemeError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let file: MemeFile = serde_json::from_str(&raw).map_err(|source| MemeError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.urls)
}
