//! Vega-Lite v5 chart specifications.

use std::path::Path;

use serde_json::{json, Value};
use tracing::debug;

use super::{PlotSpec, Renderer};
use crate::error::{EdaError, Result};

const SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";
const EXTENSION: &str = "vl.json";

/// Writes one `<stem>.vl.json` file per chart.
#[derive(Debug, Clone, Default)]
pub struct VegaLiteRenderer;

impl VegaLiteRenderer {
    pub fn new() -> Self {
        Self
    }

    /// The chart specification for `spec`.
    pub fn chart(&self, spec: &PlotSpec) -> Value {
        let title = spec.title();
        match spec {
            PlotSpec::HistogramBox { column, values } => {
                let data: Vec<Value> = values.iter().map(|v| json!({ "value": v })).collect();
                json!({
                    "$schema": SCHEMA,
                    "title": title,
                    "data": { "values": data },
                    "vconcat": [
                        {
                            "width": 480,
                            "height": 240,
                            "mark": "bar",
                            "encoding": {
                                "x": {
                                    "field": "value",
                                    "type": "quantitative",
                                    "bin": { "maxbins": 30 },
                                    "title": column
                                },
                                "y": { "aggregate": "count", "title": "Count" }
                            }
                        },
                        {
                            "width": 480,
                            "height": 60,
                            "mark": { "type": "boxplot", "extent": 1.5 },
                            "encoding": {
                                "x": { "field": "value", "type": "quantitative", "title": column }
                            }
                        }
                    ]
                })
            }
            PlotSpec::Frequency { column, counts } => {
                let data: Vec<Value> = counts
                    .iter()
                    .map(|(category, count)| json!({ "category": category, "count": count }))
                    .collect();
                json!({
                    "$schema": SCHEMA,
                    "title": title,
                    "width": 480,
                    "data": { "values": data },
                    "mark": "bar",
                    "encoding": {
                        "y": {
                            "field": "category",
                            "type": "nominal",
                            "sort": "-x",
                            "title": column
                        },
                        "x": { "field": "count", "type": "quantitative", "title": "Count" }
                    }
                })
            }
            PlotSpec::CorrelationHeatmap { columns, matrix } => {
                let mut data = Vec::with_capacity(columns.len() * columns.len());
                for (i, row) in columns.iter().enumerate() {
                    for (j, col) in columns.iter().enumerate() {
                        let r = matrix.get(i).and_then(|m| m.get(j)).copied().flatten();
                        data.push(json!({ "x": col, "y": row, "r": r }));
                    }
                }
                json!({
                    "$schema": SCHEMA,
                    "title": title,
                    "data": { "values": data },
                    "encoding": {
                        "x": { "field": "x", "type": "nominal", "sort": columns, "title": null },
                        "y": { "field": "y", "type": "nominal", "sort": columns, "title": null }
                    },
                    "layer": [
                        {
                            "mark": "rect",
                            "encoding": {
                                "color": {
                                    "field": "r",
                                    "type": "quantitative",
                                    "scale": { "scheme": "redblue", "domain": [-1, 1], "reverse": true },
                                    "title": "Pearson r"
                                }
                            }
                        },
                        {
                            "mark": "text",
                            "encoding": {
                                "text": { "field": "r", "type": "quantitative", "format": ".2f" }
                            }
                        }
                    ]
                })
            }
        }
    }
}

impl Renderer for VegaLiteRenderer {
    fn render(&self, spec: &PlotSpec, file_stem: &str, output_dir: &Path) -> Result<String> {
        let file_name = format!("{}.{}", file_stem, EXTENSION);
        let rendering_error = |reason: String| EdaError::Rendering {
            artifact: file_name.clone(),
            reason,
        };

        std::fs::create_dir_all(output_dir).map_err(|e| {
            rendering_error(format!(
                "cannot create output directory {}: {}",
                output_dir.display(),
                e
            ))
        })?;

        let content = serde_json::to_string_pretty(&self.chart(spec))
            .map_err(|e| rendering_error(e.to_string()))?;
        std::fs::write(output_dir.join(&file_name), content)
            .map_err(|e| rendering_error(e.to_string()))?;

        debug!("Rendered {}", file_name);
        Ok(file_name)
    }
}
