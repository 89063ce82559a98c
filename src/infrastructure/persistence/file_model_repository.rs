//! File-backed model persistence.
//!
//! One JSON artifact per ticker at `<dir>/<TICKER>.json`. Writes go to a
//! uniquely named temp file in the same directory and are renamed into place,
//! so a concurrent reader sees either the previous artifact or the new one,
//! never a partial file.

use crate::domain::ml::model::TrainedModel;
use crate::domain::ports::ModelRepository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;
use uuid::Uuid;

const ARTIFACT_EXTENSION: &str = "json";

#[derive(Debug, Clone)]
pub struct FileModelRepository {
    dir: PathBuf,
}

impl FileModelRepository {
    /// Creates the repository, creating `dir` if it doesn't exist.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create model directory {:?}", dir))?;

        Ok(Self { dir })
    }

    /// Path of the artifact for `ticker`.
    pub fn model_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", ticker, ARTIFACT_EXTENSION))
    }
}

#[async_trait]
impl ModelRepository for FileModelRepository {
    async fn save(&self, model: &TrainedModel) -> Result<()> {
        let path = self.model_path(model.ticker());
        let content = serde_json::to_vec(model).context("Failed to serialize model")?;

        // Atomic write: write to temp file then rename
        let temp_path = self
            .dir
            .join(format!(".{}.{}.tmp", model.ticker(), Uuid::new_v4()));
        if let Err(e) = fs::write(&temp_path, &content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e).context("Failed to write temp model file");
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(e).context("Failed to rename model file");
        }

        info!("Saved model for {} to {:?}", model.ticker(), path);
        Ok(())
    }

    async fn load(&self, ticker: &str) -> Result<Option<TrainedModel>> {
        let path = self.model_path(ticker);

        let content = match fs::read(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read model file {:?}", path));
            }
        };

        let model: TrainedModel = serde_json::from_slice(&content)
            .with_context(|| format!("Failed to parse model file {:?}", path))?;

        info!("Loaded model for {} from {:?}", ticker, path);
        Ok(Some(model))
    }

    async fn list(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.dir)
            .await
            .context("Failed to read model directory")?;

        let mut tickers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some(ARTIFACT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                tickers.push(stem.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
