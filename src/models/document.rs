use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::chunk::Chunk;

/// Everything persisted for one protected document.
///
/// Field names on the wire follow the upstream session layout
/// (`pdf_text`, `pdf_chunks`, `file_hash`). The id is the vault key and is
/// never written inside the encrypted payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentBundle {
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "pdf_text")]
    pub full_text: String,
    #[serde(rename = "pdf_chunks")]
    pub chunks: Vec<Chunk>,
    #[serde(default)]
    pub tables: Vec<TableRecord>,
    #[serde(default)]
    pub charts: Vec<ChartRecord>,
    #[serde(rename = "file_hash")]
    pub content_hash: String,
}

/// A table lifted out of the PDF by the upstream extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableRecord {
    pub page: u32,
    pub table_id: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// A region the upstream extractor believes holds a chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChartRecord {
    pub page: u32,
    pub chart_id: String,
    /// Bounding box `[x0, y0, x1, y1]` in PDF points.
    pub area: [f64; 4],
    pub description: String,
}

/// Schema violations found in a bundle or one of its records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("chunk {index}: page must be >= 1")]
    ChunkPage { index: usize },

    #[error("chunk {index}: end offset precedes start offset")]
    ChunkOffsets { index: usize },

    #[error("chunk {index}: no sentences")]
    ChunkEmpty { index: usize },

    #[error("table {table_id}: page must be >= 1")]
    TablePage { table_id: String },

    #[error("table {table_id}: duplicate column name")]
    TableDuplicateColumn { table_id: String },

    #[error("table {table_id}: row {row} has {found} cells, expected {expected}")]
    TableRowWidth {
        table_id: String,
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("chart {chart_id}: page must be >= 1")]
    ChartPage { chart_id: String },

    #[error("chart {chart_id}: bounding box is not finite or is inverted")]
    ChartArea { chart_id: String },

    #[error("Invalid enum value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    /// Decoded payload did not match the bundle schema. Only the position
    /// is kept; the decoder's message can quote document content.
    #[error("payload does not match schema ({category} error at line {line}, column {column})")]
    Schema {
        category: &'static str,
        line: usize,
        column: usize,
    },
}

impl ValidationError {
    pub fn from_json(err: &serde_json::Error) -> Self {
        let category = match err.classify() {
            serde_json::error::Category::Io => "io",
            serde_json::error::Category::Syntax => "syntax",
            serde_json::error::Category::Data => "data",
            serde_json::error::Category::Eof => "eof",
        };
        Self::Schema {
            category,
            line: err.line(),
            column: err.column(),
        }
    }
}

impl DocumentBundle {
    /// Check every record against its schema. Stops at the first violation.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, chunk) in self.chunks.iter().enumerate() {
            if chunk.page == 0 {
                return Err(ValidationError::ChunkPage { index });
            }
            if chunk.end_char < chunk.start_char {
                return Err(ValidationError::ChunkOffsets { index });
            }
            if chunk.sentences.is_empty() {
                return Err(ValidationError::ChunkEmpty { index });
            }
        }
        for table in &self.tables {
            table.validate()?;
        }
        for chart in &self.charts {
            chart.validate()?;
        }
        Ok(())
    }
}

impl TableRecord {
    /// Rebuild a table from raw extracted rows.
    ///
    /// The first row becomes the header: blank cells are named `Col{j}` and
    /// repeated names get a `_{n}` suffix. When the first row is entirely
    /// missing every row is data and headers are generated. Short rows are
    /// padded with empty cells, long rows are cut to the header width.
    pub fn from_extracted_rows(page: u32, index: usize, raw: Vec<Vec<Option<String>>>) -> Self {
        let table_id = format!("page{page}_table{}", index + 1);
        let mut raw = raw.into_iter();

        let header_row = raw.next().unwrap_or_default();
        let has_header = header_row.iter().any(|c| c.is_some());

        let (columns, data): (Vec<String>, Vec<Vec<Option<String>>>) = if has_header {
            (unique_headers(&header_row), raw.collect())
        } else {
            let rest: Vec<_> = raw.collect();
            let width = rest.first().map(|r| r.len()).unwrap_or(header_row.len());
            ((0..width).map(|j| format!("Col{j}")).collect(), rest)
        };

        let width = columns.len();
        let rows = data
            .into_iter()
            .map(|row| {
                let mut cells: Vec<String> = row
                    .into_iter()
                    .take(width)
                    .map(|c| c.unwrap_or_default())
                    .collect();
                cells.resize(width, String::new());
                cells
            })
            .collect();

        Self {
            page,
            table_id,
            columns,
            rows,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::TablePage {
                table_id: self.table_id.clone(),
            });
        }
        let mut seen = std::collections::HashSet::new();
        if !self.columns.iter().all(|c| seen.insert(c.as_str())) {
            return Err(ValidationError::TableDuplicateColumn {
                table_id: self.table_id.clone(),
            });
        }
        for (row, cells) in self.rows.iter().enumerate() {
            if cells.len() != self.columns.len() {
                return Err(ValidationError::TableRowWidth {
                    table_id: self.table_id.clone(),
                    row,
                    found: cells.len(),
                    expected: self.columns.len(),
                });
            }
        }
        Ok(())
    }
}

fn unique_headers(row: &[Option<String>]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    row.iter()
        .enumerate()
        .map(|(j, cell)| {
            let base = match cell.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => format!("Col{j}"),
            };
            match seen.get_mut(&base) {
                Some(count) => {
                    *count += 1;
                    format!("{base}_{count}")
                }
                None => {
                    seen.insert(base.clone(), 0);
                    base
                }
            }
        })
        .collect()
}

impl ChartRecord {
    pub fn new(page: u32, index: usize, area: [f64; 4]) -> Self {
        Self {
            page,
            chart_id: format!("page{page}_chart{}", index + 1),
            area,
            description: format!("Chart found on page {page}"),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::ChartPage {
                chart_id: self.chart_id.clone(),
            });
        }
        let [x0, y0, x1, y1] = self.area;
        let finite = self.area.iter().all(|v| v.is_finite());
        if !finite || x1 < x0 || y1 < y0 {
            return Err(ValidationError::ChartArea {
                chart_id: self.chart_id.clone(),
            });
        }
        Ok(())
    }
}
