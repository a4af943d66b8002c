//! Column profiling.
//!
//! Splits the columns of a dataset into numerical, categorical and datetime
//! partitions. Text columns whose every present value parses as a timestamp
//! are datetime; other text and boolean columns are categorical; numeric
//! columns are numerical.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::dataset::{ColumnData, Dataset};
use crate::models::ColumnProfile;

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y", "%d %b %Y", "%b %d, %Y",
];

/// Classify every column of `dataset`. Each column lands in exactly one list,
/// in dataset order.
pub fn profile(dataset: &Dataset) -> ColumnProfile {
    let mut profile = ColumnProfile::default();

    for column in dataset.columns() {
        match &column.data {
            ColumnData::Numeric(_) => profile.numerical.push(column.name.clone()),
            ColumnData::Boolean(_) => profile.categorical.push(column.name.clone()),
            ColumnData::Text(values) => {
                if is_datetime_column(values) {
                    profile.datetime.push(column.name.clone());
                } else {
                    profile.categorical.push(column.name.clone());
                }
            }
        }
    }

    debug!(
        "Profiled columns: {} numerical, {} categorical, {} datetime",
        profile.numerical.len(),
        profile.categorical.len(),
        profile.datetime.len()
    );

    profile
}

/// A text column is datetime when it has at least one value and every
/// present value parses.
fn is_datetime_column(values: &[Option<String>]) -> bool {
    let mut present = values.iter().flatten().peekable();
    if present.peek().is_none() {
        return false;
    }
    present.all(|v| parses_as_datetime(v))
}

/// Whether `value` parses as a timestamp in one of the supported layouts.
pub fn parses_as_datetime(value: &str) -> bool {
    let value = value.trim();
    if value.is_empty() {
        return false;
    }

    if DateTime::parse_from_rfc3339(value).is_ok() {
        return true;
    }

    DATETIME_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        || DATE_FORMATS
            .iter()
            .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
}
