//! Knowledge store: the corpus of analysis techniques, its persisted vector
//! index, and the retriever the insight step queries.

mod chunker;
mod corpus;
mod index;
mod retriever;

pub use chunker::{chunk_documents, TextSplitter};
pub use corpus::{corpus_checksum, load_corpus};
pub use index::{BuildOptions, IndexManifest, ScoredDocument, VectorIndex, INDEX_FILE};
pub use retriever::{Retriever, RetrieverSettings};
