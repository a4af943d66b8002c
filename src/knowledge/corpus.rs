//! Knowledge-base corpus loading.

use std::fs::File;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{EdaError, Result};
use crate::models::Document;

/// Load a CSV corpus. Each row becomes one document made of
/// `"<header>: <value>"` lines, tagged with its 0-based row index.
pub fn load_corpus(path: &Path) -> Result<Vec<Document>> {
    let file = File::open(path).map_err(|e| EdaError::data_load(path, e.to_string()))?;

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let csv_error = |source: csv::Error| EdaError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    if headers.is_empty() {
        return Err(EdaError::data_load(path, "corpus has no header row"));
    }

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let content = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| format!("{}: {}", header, value))
            .collect::<Vec<_>>()
            .join("\n");
        documents.push(Document {
            content,
            source_row: row,
        });
    }

    debug!("Loaded {} corpus rows from {}", documents.len(), path.display());
    Ok(documents)
}

/// SHA-256 of the corpus file, hex encoded.
pub fn corpus_checksum(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| EdaError::data_load(path, e.to_string()))?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::io::Write;

    #[test]
    fn test_rows_become_documents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "technique,description").unwrap();
        writeln!(file, "Histogram,Shows the distribution of a numerical column").unwrap();
        writeln!(file, "Bar chart, Counts categories ").unwrap();

        let docs = load_corpus(file.path()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(
            docs[0].content,
            "technique: Histogram\ndescription: Shows the distribution of a numerical column"
        );
        assert_eq!(docs[1].content, "technique: Bar chart\ndescription: Counts categories");
        assert_eq!(docs[1].source_row, 1);
    }

    #[test]
    fn test_missing_corpus_is_data_load_error() {
        let err = load_corpus(Path::new("/nonexistent/corpus.csv")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
    }

    #[test]
    fn test_ragged_corpus_is_data_load_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "a,b").unwrap();
        writeln!(file, "1,2,3").unwrap();

        let err = load_corpus(file.path()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DataLoad);
    }

    #[test]
    fn test_checksum_tracks_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "technique\nHistogram").unwrap();
        let first = corpus_checksum(file.path()).unwrap();
        assert_eq!(first.len(), 64);

        writeln!(file, "Box plot").unwrap();
        assert_ne!(corpus_checksum(file.path()).unwrap(), first);
    }
}
