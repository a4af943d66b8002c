//! Markdown report generation.
//!
//! Turns a finished [`Report`] into a Markdown document: run metadata, the
//! dataset summary, the column profile, the retrieved insights and every
//! captioned plot.

use crate::models::{ColumnProfile, DatasetSummary, Report, ReportMetadata, VisualizationRecord};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report) -> String {
    let mut output = String::new();

    output.push_str("# EDA Report\n\n");

    output.push_str(&generate_metadata_section(
        &report.metadata,
        report.result.target_column.as_deref(),
    ));

    output.push_str(&generate_table_of_contents(report));

    output.push_str(&generate_summary_section(&report.result.summary));

    output.push_str(&generate_columns_section(&report.result.columns));

    output.push_str(&generate_insights_section(&report.result.insights));

    output.push_str(&generate_visualizations_section(
        &report.result.visualizations,
    ));

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata, target: Option<&str>) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** `{}`\n", metadata.dataset));
    if let Some(target) = target {
        section.push_str(&format!("- **Target Column:** `{}`\n", target));
    }
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    match metadata.embedding_model {
        Some(ref model) => {
            section.push_str(&format!("- **Embedding Model:** `{}`\n", model));
        }
        None => section.push_str("- **Retrieval:** disabled\n"),
    }
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Dataset Summary](#dataset-summary)\n");
    toc.push_str("- [Column Profile](#column-profile)\n");
    toc.push_str("- [Insights](#insights)\n");
    toc.push_str("- [Visualizations](#visualizations)\n");

    for record in &report.result.visualizations {
        toc.push_str(&format!("  - [{}](#{})\n", record.title, anchor(&record.title)));
    }

    toc.push('\n');

    toc
}

/// GitHub-style heading anchor.
fn anchor(heading: &str) -> String {
    heading
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('-'),
            c if c.is_alphanumeric() || c == '-' || c == '_' => Some(c.to_ascii_lowercase()),
            _ => None,
        })
        .collect()
}

/// Generate the dataset summary section.
fn generate_summary_section(summary: &DatasetSummary) -> String {
    let mut section = String::new();

    section.push_str("## Dataset Summary\n\n");
    section.push_str("| Rows | Columns | Memory |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} |\n\n",
        summary.row_count,
        summary.column_count,
        summary.memory_footprint()
    ));

    section
}

/// Generate the column profile section.
fn generate_columns_section(columns: &ColumnProfile) -> String {
    let mut section = String::new();

    section.push_str("## Column Profile\n\n");

    if columns.is_empty() {
        section.push_str("The dataset has no columns.\n\n");
        return section;
    }

    section.push_str("| Column | Type |\n");
    section.push_str("|:---|:---|\n");

    let groups = [
        ("Numerical", &columns.numerical),
        ("Categorical", &columns.categorical),
        ("Datetime", &columns.datetime),
    ];
    for (kind, names) in groups {
        for name in names {
            section.push_str(&format!("| `{}` | {} |\n", name, kind));
        }
    }
    section.push('\n');

    section
}

/// Generate the insights section.
fn generate_insights_section(insights: &[String]) -> String {
    let mut section = String::new();

    section.push_str("## Insights\n\n");

    if insights.is_empty() {
        section.push_str("No insights were produced.\n\n");
        return section;
    }

    for insight in insights {
        section.push_str(insight.trim());
        section.push_str("\n\n");
    }

    section
}

/// Generate the visualizations section.
fn generate_visualizations_section(records: &[VisualizationRecord]) -> String {
    let mut section = String::new();

    section.push_str("## Visualizations\n\n");

    if records.is_empty() {
        section.push_str("No plots were generated for this dataset.\n\n");
        return section;
    }

    for record in records {
        section.push_str(&generate_visualization_block(record));
    }

    section
}

/// Generate a single captioned plot block.
fn generate_visualization_block(record: &VisualizationRecord) -> String {
    let mut block = String::new();

    block.push_str(&format!("### {}\n\n", record.title));
    block.push_str(&format!(
        "*{}* | [`{}`]({})\n\n",
        record.plot_kind, record.artifact_path, record.artifact_path
    ));
    block.push_str(&format!("> 💡 {}\n\n", record.caption));
    block.push_str("---\n\n");

    block
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by edaflow*\n");

    footer
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, PlotKind};
    use chrono::Utc;

    fn create_test_metadata() -> ReportMetadata {
        ReportMetadata {
            dataset: "data/customers.csv".to_string(),
            analysis_date: Utc::now(),
            model_used: "groq/llama-3.1-8b-instant".to_string(),
            embedding_model: Some("nomic-embed-text".to_string()),
            duration_seconds: 12.5,
        }
    }

    fn create_test_report() -> Report {
        Report {
            metadata: create_test_metadata(),
            result: AnalysisResult {
                dataset_path: "data/customers.csv".to_string(),
                target_column: Some("churn".to_string()),
                summary: DatasetSummary {
                    row_count: 120,
                    column_count: 3,
                    memory_bytes: 4096,
                },
                columns: ColumnProfile {
                    numerical: vec!["age".to_string()],
                    categorical: vec!["city".to_string()],
                    datetime: vec!["signup_date".to_string()],
                },
                insights: vec!["Check age for outliers.".to_string()],
                visualizations: vec![VisualizationRecord {
                    title: "Distribution of age".to_string(),
                    artifact_path: "hist_box_age.vl.json".to_string(),
                    plot_kind: PlotKind::HistogramBox,
                    caption: "Ages skew young.".to_string(),
                }],
            },
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report);

        assert!(markdown.contains("# EDA Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Dataset Summary"));
        assert!(markdown.contains("| 120 | 3 | 4.00 KB |"));
        assert!(markdown.contains("| `signup_date` | Datetime |"));
        assert!(markdown.contains("Check age for outliers."));
        assert!(markdown.contains("### Distribution of age"));
        assert!(markdown.contains("> 💡 Ages skew young."));
        assert!(markdown.contains("[Distribution of age](#distribution-of-age)"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let section = generate_metadata_section(&create_test_metadata(), Some("churn"));

        assert!(section.contains("data/customers.csv"));
        assert!(section.contains("`churn`"));
        assert!(section.contains("groq/llama-3.1-8b-instant"));
        assert!(section.contains("nomic-embed-text"));
        assert!(section.contains("12.5s"));

        let mut metadata = create_test_metadata();
        metadata.embedding_model = None;
        let section = generate_metadata_section(&metadata, None);
        assert!(section.contains("**Retrieval:** disabled"));
        assert!(!section.contains("Target Column"));
    }

    #[test]
    fn test_empty_sections_have_placeholders() {
        assert!(generate_visualizations_section(&[]).contains("No plots were generated"));
        assert!(generate_insights_section(&[]).contains("No insights were produced."));
        assert!(generate_columns_section(&ColumnProfile::default()).contains("no columns"));
    }

    #[test]
    fn test_anchor() {
        assert_eq!(anchor("Frequency of city"), "frequency-of-city");
        assert_eq!(anchor("Correlation Matrix (Heatmap)"), "correlation-matrix-heatmap");
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"visualizations\""));
        assert!(json.contains("\"histogram_box\""));
        // result fields are flattened next to the metadata
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["row_count"], 120);
    }
}
