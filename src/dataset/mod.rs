//! Tabular dataset loading.
//!
//! Reads a CSV file with a header row into typed columns. Storage types are
//! inferred per column: numeric when every present cell parses as a number,
//! boolean when every present cell is `true`/`false`, text otherwise.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{EdaError, Result};
use crate::models::DatasetSummary;

/// Cell values treated as missing.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

/// Typed storage for one column. `None` marks a missing cell.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Boolean(Vec<Option<bool>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    /// Estimated in-memory size of the column's cells.
    fn memory_bytes(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len() * std::mem::size_of::<f64>(),
            ColumnData::Boolean(v) => v.len(),
            ColumnData::Text(v) => v
                .iter()
                .map(|cell| {
                    std::mem::size_of::<String>() + cell.as_ref().map(|s| s.len()).unwrap_or(0)
                })
                .sum(),
        }
    }
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn is_numeric(&self) -> bool {
        matches!(self.data, ColumnData::Numeric(_))
    }

    pub fn numeric_values(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            _ => None,
        }
    }

    /// Cells rendered as strings, for frequency counting. Missing cells are `None`.
    pub fn display_values(&self) -> Vec<Option<String>> {
        match &self.data {
            ColumnData::Numeric(v) => v.iter().map(|c| c.map(|x| x.to_string())).collect(),
            ColumnData::Boolean(v) => v
                .iter()
                .map(|c| c.map(|b| if b { "True" } else { "False" }.to_string()))
                .collect(),
            ColumnData::Text(v) => v.clone(),
        }
    }
}

/// A loaded tabular dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    path: PathBuf,
    columns: Vec<Column>,
    row_count: usize,
}

/// Load a CSV dataset from disk.
pub fn load(path: &Path) -> Result<Dataset> {
    let file = File::open(path).map_err(|e| EdaError::data_load(path, e.to_string()))?;
    Dataset::from_reader(file, path)
}

impl Dataset {
    /// Parse CSV content from any reader. `path` is only used for messages.
    pub fn from_reader<R: Read>(reader: R, path: &Path) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(reader);

        let csv_err = |source: csv::Error| EdaError::Csv {
            path: path.to_path_buf(),
            source,
        };

        let headers = dedupe_headers(csv_reader.headers().map_err(csv_err)?.iter());
        let mut raw: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
        let mut row_count = 0;

        for record in csv_reader.records() {
            let record = record.map_err(csv_err)?;
            for (idx, cell) in record.iter().enumerate() {
                raw[idx].push(cell.to_string());
            }
            row_count += 1;
        }

        let columns: Vec<Column> = headers
            .into_iter()
            .zip(raw)
            .map(|(name, cells)| Column {
                name,
                data: infer_column(cells),
            })
            .collect();

        debug!(
            "Loaded {} rows x {} columns from {}",
            row_count,
            columns.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            columns,
            row_count,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Row count, column count and estimated memory footprint.
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            row_count: self.row_count,
            column_count: self.columns.len(),
            memory_bytes: self.columns.iter().map(|c| c.data.memory_bytes()).sum(),
        }
    }
}

/// Make header names unique by suffixing repeats with `.1`, `.2`, ...
fn dedupe_headers<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    headers
        .map(|h| {
            let count = seen.entry(h.to_string()).or_insert(0);
            let name = if *count == 0 {
                h.to_string()
            } else {
                format!("{}.{}", h, count)
            };
            *count += 1;
            name
        })
        .collect()
}

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell.trim())
}

fn parse_bool(cell: &str) -> Option<bool> {
    match cell.trim().to_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Pick the storage type for a column of raw cells.
fn infer_column(cells: Vec<String>) -> ColumnData {
    let present = || cells.iter().filter(|c| !is_missing(c));

    if present().all(|c| c.trim().parse::<f64>().is_ok()) {
        return ColumnData::Numeric(
            cells
                .iter()
                .map(|c| {
                    if is_missing(c) {
                        None
                    } else {
                        c.trim().parse::<f64>().ok()
                    }
                })
                .collect(),
        );
    }

    if present().all(|c| parse_bool(c).is_some()) {
        return ColumnData::Boolean(
            cells
                .iter()
                .map(|c| if is_missing(c) { None } else { parse_bool(c) })
                .collect(),
        );
    }

    ColumnData::Text(
        cells
            .into_iter()
            .map(|c| if is_missing(&c) { None } else { Some(c) })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(content: &str) -> Dataset {
        Dataset::from_reader(content.as_bytes(), Path::new("test.csv")).unwrap()
    }

    #[test]
    fn test_infers_column_types() {
        let ds = parse("age,city,active,score\n31,Paris,true,1.5\n45,Rome,False,\n,Oslo,TRUE,2\n");

        assert_eq!(ds.row_count(), 3);
        assert_eq!(ds.column_count(), 4);
        assert_eq!(
            ds.column("age").unwrap().data,
            ColumnData::Numeric(vec![Some(31.0), Some(45.0), None])
        );
        assert!(matches!(ds.column("city").unwrap().data, ColumnData::Text(_)));
        assert_eq!(
            ds.column("active").unwrap().data,
            ColumnData::Boolean(vec![Some(true), Some(false), Some(true)])
        );
        assert_eq!(
            ds.column("score").unwrap().numeric_values().unwrap(),
            &[Some(1.5), None, Some(2.0)]
        );
    }

    #[test]
    fn test_all_missing_column_is_numeric() {
        let ds = parse("a,b\n1,\n2,NA\n");
        assert!(ds.column("b").unwrap().is_numeric());
    }

    #[test]
    fn test_empty_file() {
        let ds = parse("");
        assert_eq!(ds.row_count(), 0);
        assert_eq!(ds.column_count(), 0);
        assert_eq!(ds.summary().memory_bytes, 0);
    }

    #[test]
    fn test_header_only_file() {
        let ds = parse("a,b,c\n");
        assert_eq!(ds.row_count(), 0);
        assert_eq!(ds.column_count(), 3);
    }

    #[test]
    fn test_duplicate_headers_are_renamed() {
        let ds = parse("x,x,y\n1,2,3\n");
        let names: Vec<_> = ds.columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["x", "x.1", "y"]);
    }

    #[test]
    fn test_ragged_rows_fail_with_data_load() {
        let err = Dataset::from_reader("a,b\n1,2\n3\n".as_bytes(), Path::new("bad.csv"))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataLoad);
    }

    #[test]
    fn test_missing_file_fails_with_data_load() {
        let err = load(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::DataLoad);
    }

    #[test]
    fn test_load_from_disk_and_summary() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "n,label\n1,ab\n2,cde\n").unwrap();

        let ds = load(file.path()).unwrap();
        let summary = ds.summary();
        let string_header = std::mem::size_of::<String>();

        assert_eq!(summary.row_count, 2);
        assert_eq!(summary.column_count, 2);
        assert_eq!(summary.memory_bytes, 2 * 8 + 2 * string_header + 5);
    }

    #[test]
    fn test_display_values() {
        let ds = parse("flag,n\ntrue,1\n,2.5\n");
        assert_eq!(
            ds.column("flag").unwrap().display_values(),
            vec![Some("True".to_string()), None]
        );
        assert_eq!(
            ds.column("n").unwrap().display_values(),
            vec![Some("1".to_string()), Some("2.5".to_string())]
        );
    }
}
