use std::collections::HashSet;

use crate::domain::error::{AppError, Result};
use crate::domain::schema::UnifiedSchema;
use crate::domain::selection::ColumnSelection;
use crate::domain::tabular::{FileSummary, UploadedFile};

/// Everything the user has uploaded and chosen so far.
///
/// `generation` increases on every change to the file set so a schema
/// computed from an older snapshot can be recognised and refused.
#[derive(Debug, Default)]
pub struct Workspace {
    files: Vec<UploadedFile>,
    selection: ColumnSelection,
    schema: Option<UnifiedSchema>,
    generation: u64,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a validated batch. Names that collide with files already
    /// present get a ` (n)` suffix so per-file mappings stay unambiguous.
    pub fn add_files(&mut self, files: Vec<UploadedFile>) -> Vec<FileSummary> {
        let mut taken: HashSet<String> = self.files.iter().map(|f| f.name.clone()).collect();
        let mut added = Vec::with_capacity(files.len());

        for mut file in files {
            file.name = unique_name(&file.name, &taken);
            taken.insert(file.name.clone());
            added.push(file.summary());
            self.files.push(file);
        }

        self.schema = None;
        self.generation += 1;
        let columns = self.discovered_columns();
        self.selection.rebuild(&columns);

        added
    }

    pub fn reset(&mut self) {
        self.files.clear();
        self.selection.clear();
        self.schema = None;
        self.generation += 1;
    }

    pub fn files(&self) -> &[UploadedFile] {
        &self.files
    }

    pub fn summaries(&self) -> Vec<FileSummary> {
        self.files.iter().map(UploadedFile::summary).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Unified columns once a schema exists, otherwise raw headers in first-seen order
    pub fn discovered_columns(&self) -> Vec<String> {
        match &self.schema {
            Some(schema) => schema.columns.clone(),
            None => UnifiedSchema::identity(&self.files).columns,
        }
    }

    pub fn selection(&self) -> &ColumnSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut ColumnSelection {
        &mut self.selection
    }

    pub fn schema(&self) -> Option<&UnifiedSchema> {
        self.schema.as_ref()
    }

    /// Store a schema computed for `generation`. A stale generation means the
    /// file set changed while the schema was being computed.
    pub fn set_schema(&mut self, schema: UnifiedSchema, generation: u64) -> Result<()> {
        if generation != self.generation {
            return Err(AppError::ValidationError(
                "Files changed while the schema was being unified; run unification again"
                    .to_string(),
            ));
        }

        self.selection.rebuild(&schema.columns);
        self.schema = Some(schema);
        Ok(())
    }

    /// The unified schema, or an identity schema when none was computed
    pub fn effective_schema(&self) -> UnifiedSchema {
        self.schema
            .clone()
            .unwrap_or_else(|| UnifiedSchema::identity(&self.files))
    }
}

fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }

    let path = std::path::Path::new(name);
    let (stem, ext) = match (path.file_stem().and_then(|s| s.to_str()), path.extension()) {
        (Some(stem), Some(ext)) => (stem.to_string(), format!(".{}", ext.to_string_lossy())),
        _ => (name.to_string(), String::new()),
    };

    let mut n = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, n, ext);
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::ColumnMapping;
    use crate::domain::tabular::{SupportedFileType, Table};

    fn file(name: &str, headers: &[&str]) -> UploadedFile {
        let headers: Vec<String> = headers.iter().map(|s| s.to_string()).collect();
        UploadedFile::new(
            name.to_string(),
            SupportedFileType::Csv,
            Table::from_records(&headers, vec![vec!["x"; headers.len()]]),
        )
    }

    #[test]
    fn test_add_files_discovers_columns_and_selects_all() {
        let mut ws = Workspace::new();
        ws.add_files(vec![file("a.csv", &["id", "name"]), file("b.csv", &["id", "email"])]);

        assert_eq!(ws.discovered_columns(), vec!["id", "name", "email"]);
        assert!(ws.selection().is_selected("email"));
        assert_eq!(ws.selection().as_map().len(), 3);
    }

    #[test]
    fn test_duplicate_names_are_suffixed() {
        let mut ws = Workspace::new();
        ws.add_files(vec![file("people.csv", &["id"])]);
        let added = ws.add_files(vec![file("people.csv", &["id"]), file("people.csv", &["id"])]);

        assert_eq!(added[0].name, "people (2).csv");
        assert_eq!(added[1].name, "people (3).csv");
    }

    #[test]
    fn test_adding_files_discards_schema() {
        let mut ws = Workspace::new();
        ws.add_files(vec![file("a.csv", &["mail"])]);
        let schema = UnifiedSchema {
            columns: vec!["email".to_string()],
            mappings: [(
                "a.csv".to_string(),
                ColumnMapping::from([("mail".to_string(), "email".to_string())]),
            )]
            .into(),
        };
        ws.set_schema(schema, ws.generation()).unwrap();
        assert_eq!(ws.discovered_columns(), vec!["email"]);

        ws.add_files(vec![file("b.csv", &["phone"])]);
        assert!(ws.schema().is_none());
        assert_eq!(ws.discovered_columns(), vec!["mail", "phone"]);
    }

    #[test]
    fn test_stale_schema_rejected() {
        let mut ws = Workspace::new();
        ws.add_files(vec![file("a.csv", &["id"])]);
        let generation = ws.generation();
        ws.add_files(vec![file("b.csv", &["id"])]);

        let result = ws.set_schema(UnifiedSchema::identity(ws.files()), generation);
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ws = Workspace::new();
        ws.add_files(vec![file("a.csv", &["id"])]);
        ws.reset();

        assert!(ws.is_empty());
        assert!(ws.selection().is_empty());
        assert!(ws.schema().is_none());
        assert!(ws.discovered_columns().is_empty());
    }
}
