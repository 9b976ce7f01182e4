// ============================================================
// MERGE / EXPORT USE CASE
// ============================================================
// Re-key rows through the unified schema, combine files, render CSV

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::application::SharedWorkspace;
use crate::domain::error::{AppError, Result};
use crate::domain::schema::{MergeMode, UnifiedSchema};
use crate::domain::tabular::{Row, UploadedFile};
use crate::infrastructure::tabular::to_csv_string;

/// Provenance column added when `include_source` is set
pub const SOURCE_COLUMN: &str = "source_file";

/// Rows of every file under one column list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Name of the provenance column, when one was added
    pub source_column: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExportOptions {
    #[serde(default)]
    pub mode: MergeMode,
    #[serde(default)]
    pub include_source: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportedCsv {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub csv: String,
}

/// Rename a row's keys through `schema`. Headers are visited in file order
/// so when two originals map to one unified name the later value wins.
pub fn rekey_row(row: &Row, headers: &[String], file_name: &str, schema: &UnifiedSchema) -> Row {
    let mut out = Row::with_capacity(headers.len());
    for header in headers {
        if let Some(value) = row.get(header) {
            out.insert(
                schema.unified_name(file_name, header).to_string(),
                value.clone(),
            );
        }
    }
    out
}

/// Unified column names a file contributes, in file order
fn file_columns(file: &UploadedFile, schema: &UnifiedSchema) -> Vec<String> {
    let mut seen = HashSet::new();
    file.table
        .headers
        .iter()
        .map(|h| schema.unified_name(&file.name, h).to_string())
        .filter(|c| seen.insert(c.clone()))
        .collect()
}

/// Output columns: schema order first, then leftovers in first-seen order.
/// Intersection keeps only columns every file has.
pub fn merged_columns(files: &[UploadedFile], schema: &UnifiedSchema, mode: MergeMode) -> Vec<String> {
    let per_file: Vec<Vec<String>> = files.iter().map(|f| file_columns(f, schema)).collect();

    let mut ordered: Vec<String> = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let present: HashSet<&str> = per_file.iter().flatten().map(String::as_str).collect();

    for column in &schema.columns {
        if present.contains(column.as_str()) && seen.insert(column.as_str()) {
            ordered.push(column.clone());
        }
    }
    for column in per_file.iter().flatten() {
        if seen.insert(column.as_str()) {
            ordered.push(column.clone());
        }
    }

    match mode {
        MergeMode::Union => ordered,
        MergeMode::Intersection => {
            let sets: Vec<HashSet<&str>> = per_file
                .iter()
                .map(|cols| cols.iter().map(String::as_str).collect())
                .collect();
            ordered
                .into_iter()
                .filter(|c| sets.iter().all(|s| s.contains(c.as_str())))
                .collect()
        }
    }
}

/// Combine all files' rows. Row order follows upload order.
pub fn merge(
    files: &[UploadedFile],
    schema: &UnifiedSchema,
    mode: MergeMode,
    include_source: bool,
) -> MergedTable {
    let mut columns = merged_columns(files, schema, mode);
    let keep: HashSet<String> = columns.iter().cloned().collect();

    let source_column = include_source.then(|| unique_column(SOURCE_COLUMN, &keep));

    let mut rows = Vec::with_capacity(files.iter().map(|f| f.table.row_count()).sum());
    for file in files {
        for row in &file.table.rows {
            let mut out = rekey_row(row, &file.table.headers, &file.name, schema);
            out.retain(|k, _| keep.contains(k));
            if let Some(source) = &source_column {
                out.insert(source.clone(), file.name.clone());
            }
            rows.push(out);
        }
    }

    if let Some(source) = &source_column {
        columns.insert(0, source.clone());
    }

    MergedTable {
        columns,
        rows,
        source_column,
    }
}

fn unique_column(base: &str, taken: &HashSet<String>) -> String {
    let mut name = base.to_string();
    let mut n = 2;
    while taken.contains(&name) {
        name = format!("{}_{}", base, n);
        n += 1;
    }
    name
}

pub struct ExportUseCase {
    workspace: SharedWorkspace,
}

impl ExportUseCase {
    pub fn new(workspace: SharedWorkspace) -> Self {
        Self { workspace }
    }

    /// Merge with the effective schema and keep only selected columns
    pub fn merged(&self, options: ExportOptions) -> Result<MergedTable> {
        let workspace = self.workspace.lock()?;
        if workspace.is_empty() {
            return Err(AppError::ValidationError("No files uploaded".to_string()));
        }

        let schema = workspace.effective_schema();
        let merged = merge(workspace.files(), &schema, options.mode, options.include_source);

        let source_column = merged.source_column.clone();
        let mut selected: Vec<String> = workspace
            .selection()
            .selected_in_order(&merged.columns)
            .into_iter()
            .filter(|c| source_column.as_deref() != Some(c.as_str()))
            .collect();

        if selected.is_empty() {
            return Err(AppError::ValidationError(format!(
                "No selected columns to export in {} mode",
                options.mode
            )));
        }

        // Provenance is not a discovered column, so it bypasses the selection
        let columns = match source_column {
            Some(source) => {
                selected.insert(0, source);
                selected
            }
            None => selected,
        };

        Ok(MergedTable {
            columns,
            rows: merged.rows,
            source_column: merged.source_column,
        })
    }

    pub fn execute(&self, options: ExportOptions) -> Result<ExportedCsv> {
        let merged = self.merged(options)?;
        let csv = to_csv_string(&merged.columns, &merged.rows)?;

        tracing::info!(
            mode = %options.mode,
            columns = merged.columns.len(),
            rows = merged.rows.len(),
            "Exported merged CSV"
        );

        Ok(ExportedCsv {
            row_count: merged.rows.len(),
            columns: merged.columns,
            csv,
        })
    }
}
