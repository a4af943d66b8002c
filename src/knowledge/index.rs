//! Persisted vector index.
//!
//! The index lives in a directory holding a single `index.json`: a manifest
//! describing how it was built, followed by every chunk with its embedding.
//! Search is an exhaustive cosine-similarity scan, which is plenty for a
//! corpus of a few hundred chunks.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::chunker::{chunk_documents, TextSplitter};
use super::corpus::{corpus_checksum, load_corpus};
use crate::embeddings::{cosine_similarity, EmbeddingBackend};
use crate::error::{EdaError, Result};
use crate::models::Document;

/// File name of the index inside the index directory.
pub const INDEX_FILE: &str = "index.json";

const FORMAT_VERSION: u32 = 1;

/// How an index was built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub format_version: u32,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub corpus_path: String,
    pub corpus_sha256: String,
    pub chunk_count: usize,
    pub built_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    document: Document,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexFile {
    manifest: IndexManifest,
    chunks: Vec<IndexedChunk>,
}

/// A document with its similarity to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f64,
}

/// Options for building an index.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Chunks per embedding request.
    pub batch_size: usize,
    /// Draw a progress bar while embedding.
    pub show_progress: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            batch_size: 32,
            show_progress: false,
        }
    }
}

/// Embedded chunks of the knowledge corpus, loaded in memory.
#[derive(Debug)]
pub struct VectorIndex {
    dir: PathBuf,
    manifest: IndexManifest,
    chunks: Vec<IndexedChunk>,
}

impl VectorIndex {
    /// Whether an index file exists under `dir`.
    pub fn exists(dir: &Path) -> bool {
        dir.join(INDEX_FILE).is_file()
    }

    /// Load, chunk and embed `corpus`, then persist the index under `dir`.
    pub async fn build(
        dir: &Path,
        corpus: &Path,
        splitter: &TextSplitter,
        embedder: &dyn EmbeddingBackend,
        options: &BuildOptions,
    ) -> Result<Self> {
        let documents = load_corpus(corpus)?;
        let corpus_sha256 = corpus_checksum(corpus)?;
        let pieces = chunk_documents(&documents, splitter);

        info!(
            "Building knowledge index: {} rows, {} chunks, model {}",
            documents.len(),
            pieces.len(),
            embedder.model_name()
        );

        let progress = options.show_progress.then(|| {
            let pb = ProgressBar::new(pieces.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} Embedding [{bar:40.cyan/blue}] {pos}/{len} chunks")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        });

        let mut chunks = Vec::with_capacity(pieces.len());
        for batch in pieces.chunks(options.batch_size.max(1)) {
            let texts: Vec<String> = batch.iter().map(|d| d.content.clone()).collect();
            let embeddings = embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(EdaError::Embedding(format!(
                    "Expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                )));
            }
            chunks.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(embeddings)
                    .map(|(document, embedding)| IndexedChunk {
                        document,
                        embedding,
                    }),
            );
            if let Some(ref pb) = progress {
                pb.inc(batch.len() as u64);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let dimensions = chunks.first().map(|c| c.embedding.len()).unwrap_or(0);
        if chunks.iter().any(|c| c.embedding.len() != dimensions) {
            return Err(EdaError::Embedding(
                "Embedding backend returned vectors of different lengths".to_string(),
            ));
        }

        let index = Self {
            dir: dir.to_path_buf(),
            manifest: IndexManifest {
                format_version: FORMAT_VERSION,
                embedding_model: embedder.model_name().to_string(),
                dimensions,
                chunk_size: splitter.chunk_size(),
                chunk_overlap: splitter.chunk_overlap(),
                corpus_path: corpus.display().to_string(),
                corpus_sha256,
                chunk_count: chunks.len(),
                built_at: Utc::now(),
            },
            chunks,
        };
        index.persist()?;
        Ok(index)
    }

    /// Open an existing index without rebuilding it.
    pub fn open(dir: &Path) -> Result<Self> {
        let file = dir.join(INDEX_FILE);
        if !file.is_file() {
            return Err(EdaError::index(
                dir,
                format!(
                    "no {} found; remove the directory or rebuild the index",
                    INDEX_FILE
                ),
            ));
        }

        let content =
            std::fs::read_to_string(&file).map_err(|e| EdaError::index(&file, e.to_string()))?;
        let parsed: IndexFile = serde_json::from_str(&content)
            .map_err(|e| EdaError::index(&file, format!("invalid index file: {}", e)))?;

        if parsed.manifest.format_version != FORMAT_VERSION {
            return Err(EdaError::index(
                &file,
                format!(
                    "unsupported format version {}; rebuild the index",
                    parsed.manifest.format_version
                ),
            ));
        }

        debug!(
            "Opened knowledge index at {} ({} chunks)",
            dir.display(),
            parsed.chunks.len()
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            manifest: parsed.manifest,
            chunks: parsed.chunks,
        })
    }

    /// Write the index atomically: a temp file in the same directory is
    /// renamed over `index.json`.
    fn persist(&self) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| EdaError::index(&self.dir, e.to_string()))?;

        let file = IndexFile {
            manifest: self.manifest.clone(),
            chunks: self.chunks.clone(),
        };
        let json = serde_json::to_vec(&file)
            .map_err(|e| EdaError::index(&self.dir, format!("failed to serialize index: {}", e)))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| EdaError::index(&self.dir, e.to_string()))?;
        tmp.write_all(&json)
            .map_err(|e| EdaError::index(&self.dir, e.to_string()))?;
        tmp.persist(self.dir.join(INDEX_FILE))
            .map_err(|e| EdaError::index(&self.dir, e.error.to_string()))?;

        info!(
            "Saved knowledge index ({} chunks) to {}",
            self.chunks.len(),
            self.dir.display()
        );
        Ok(())
    }

    pub fn manifest(&self) -> &IndexManifest {
        &self.manifest
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// The `k` chunks most similar to `query`, best first. Ties keep
    /// corpus order.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<ScoredDocument> {
        let mut scored: Vec<(usize, f64)> = self
            .chunks
            .iter()
            .enumerate()
            .map(|(ordinal, chunk)| {
                let score = cosine_similarity(query, &chunk.embedding).unwrap_or(0.0);
                (ordinal, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        scored
            .into_iter()
            .take(k)
            .map(|(ordinal, score)| ScoredDocument {
                document: self.chunks[ordinal].document.clone(),
                score,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbedder;
    use crate::error::ErrorKind;

    fn write_corpus(dir: &Path) -> PathBuf {
        let path = dir.join("corpus.csv");
        std::fs::write(
            &path,
            "technique,use\n\
             Correlation heatmap,Compare numerical features pairwise\n\
             Bar chart,Count category frequencies\n\
             Box plot,Spot outliers in a numerical column\n",
        )
        .unwrap();
        path
    }

    #[tokio::test]
    async fn test_build_persist_and_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let corpus = write_corpus(tmp.path());
        let dir = tmp.path().join("index");
        let embedder = HashingEmbedder::new(256);
        let splitter = TextSplitter::new(500, 50).unwrap();

        assert!(!VectorIndex::exists(&dir));
        let built = VectorIndex::build(&dir, &corpus, &splitter, &embedder, &BuildOptions::default())
            .await
            .unwrap();
        assert!(VectorIndex::exists(&dir));
        assert_eq!(built.len(), 3);
        assert_eq!(built.manifest().embedding_model, "hashing-256");
        assert_eq!(built.manifest().dimensions, 256);

        let reopened = VectorIndex::open(&dir).unwrap();
        assert_eq!(reopened.manifest(), built.manifest());

        let query = embedder.embed_text("category frequencies");
        let hits = reopened.search(&query, 5);
        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].document.source_row, 1);
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn test_search_is_deterministic_with_ties() {
        let tmp = tempfile::tempdir().unwrap();
        let corpus = tmp.path().join("corpus.csv");
        std::fs::write(&corpus, "text\nsame words\nsame words\nsame words\n").unwrap();
        let embedder = HashingEmbedder::new(32);
        let splitter = TextSplitter::new(500, 50).unwrap();
        let index = VectorIndex::build(
            &tmp.path().join("index"),
            &corpus,
            &splitter,
            &embedder,
            &BuildOptions::default(),
        )
        .await
        .unwrap();

        let query = embedder.embed_text("same words");
        let rows: Vec<usize> = index
            .search(&query, 2)
            .into_iter()
            .map(|hit| hit.document.source_row)
            .collect();
        assert_eq!(rows, vec![0, 1]);
    }

    #[test]
    fn test_open_without_index_file() {
        let tmp = tempfile::tempdir().unwrap();
        let err = VectorIndex::open(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
        assert!(err.to_string().contains("index.json"));
    }

    #[test]
    fn test_open_corrupt_index() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(INDEX_FILE), "{not json").unwrap();
        assert!(matches!(
            VectorIndex::open(tmp.path()).unwrap_err(),
            EdaError::Index { .. }
        ));
    }
}
