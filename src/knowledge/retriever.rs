//! Query interface over the persisted knowledge index.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::chunker::TextSplitter;
use super::corpus::corpus_checksum;
use super::index::{BuildOptions, VectorIndex};
use crate::config::Config;
use crate::embeddings::EmbeddingBackend;
use crate::error::{EdaError, Result};
use crate::models::Document;

/// Where the index lives and how to build it when it is missing.
#[derive(Debug, Clone)]
pub struct RetrieverSettings {
    pub knowledge_base: PathBuf,
    pub index_path: PathBuf,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub batch_size: usize,
    /// Delete and rebuild an existing index.
    pub rebuild: bool,
    pub show_progress: bool,
}

impl RetrieverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            knowledge_base: PathBuf::from(&config.retrieval.knowledge_base),
            index_path: PathBuf::from(&config.retrieval.index_path),
            chunk_size: config.retrieval.chunk_size,
            chunk_overlap: config.retrieval.chunk_overlap,
            top_k: config.retrieval.top_k,
            batch_size: config.embedding.batch_size,
            rebuild: false,
            show_progress: false,
        }
    }
}

/// Top-k document retrieval backed by a [`VectorIndex`].
pub struct Retriever {
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingBackend>,
    top_k: usize,
    built: bool,
}

impl Retriever {
    /// Open the index at `settings.index_path`, building it first if the path
    /// does not exist. An existing index is never rebuilt unless
    /// `settings.rebuild` is set.
    pub async fn ensure_ready(
        settings: &RetrieverSettings,
        embedder: Arc<dyn EmbeddingBackend>,
    ) -> Result<Self> {
        let dir = &settings.index_path;

        if settings.rebuild && dir.exists() {
            info!("Removing knowledge index at {} for rebuild", dir.display());
            std::fs::remove_dir_all(dir).map_err(|e| EdaError::index(dir, e.to_string()))?;
        }

        let (index, built) = if dir.exists() {
            let index = VectorIndex::open(dir)?;
            check_index(&index, settings, embedder.as_ref())?;
            (index, false)
        } else {
            let splitter = TextSplitter::new(settings.chunk_size, settings.chunk_overlap)?;
            let options = BuildOptions {
                batch_size: settings.batch_size,
                show_progress: settings.show_progress,
            };
            let index = VectorIndex::build(
                dir,
                &settings.knowledge_base,
                &splitter,
                embedder.as_ref(),
                &options,
            )
            .await?;
            (index, true)
        };

        Ok(Self {
            index,
            embedder,
            top_k: settings.top_k,
            built,
        })
    }

    /// Whether this call built the index (as opposed to opening it).
    pub fn was_built(&self) -> bool {
        self.built
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// The configured top-k documents for `text`, most relevant first.
    pub async fn query(&self, text: &str) -> Result<Vec<Document>> {
        self.query_top(text, self.top_k).await
    }

    /// The `k` documents most relevant to `text`, most relevant first.
    ///
    /// A corpus row split into several chunks counts once: only its best
    /// chunk is returned, so at most `min(rows, k)` documents come back.
    pub async fn query_top(&self, text: &str, k: usize) -> Result<Vec<Document>> {
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query = self.embedder.embed(text).await?;
        let mut seen_rows = HashSet::new();
        let hits: Vec<_> = self
            .index
            .search(&query, self.index.len())
            .into_iter()
            .filter(|hit| seen_rows.insert(hit.document.source_row))
            .take(k)
            .collect();
        debug!(
            "Retrieved {} documents (best score {:.3})",
            hits.len(),
            hits.first().map(|h| h.score).unwrap_or(0.0)
        );
        Ok(hits.into_iter().map(|hit| hit.document).collect())
    }
}

/// Reject indexes built with another embedding model; warn on a changed corpus.
fn check_index(
    index: &VectorIndex,
    settings: &RetrieverSettings,
    embedder: &dyn EmbeddingBackend,
) -> Result<()> {
    let manifest = index.manifest();

    if manifest.embedding_model != embedder.model_name() {
        return Err(EdaError::index(
            index.dir(),
            format!(
                "built with embedding model '{}' but '{}' is configured; rerun with --rebuild-index",
                manifest.embedding_model,
                embedder.model_name()
            ),
        ));
    }

    match corpus_checksum(&settings.knowledge_base) {
        Ok(checksum) if checksum != manifest.corpus_sha256 => warn!(
            "Knowledge base {} changed since the index was built on {}; \
             results may be stale (use --rebuild-index to refresh)",
            settings.knowledge_base.display(),
            manifest.built_at.format("%Y-%m-%d %H:%M")
        ),
        Ok(_) => {}
        Err(e) => debug!("Skipping corpus freshness check: {}", e),
    }

    Ok(())
}
