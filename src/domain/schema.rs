use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::tabular::UploadedFile;

/// Original column name -> unified column name, for one file
pub type ColumnMapping = HashMap<String, String>;

/// How column sets of several files are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeMode {
    /// Only columns present in every file
    Intersection,
    /// Every column of every file, blanks where a file lacks it
    #[default]
    Union,
}

impl std::str::FromStr for MergeMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intersection" | "strict" => Ok(MergeMode::Intersection),
            "union" | "maximal" => Ok(MergeMode::Union),
            other => Err(format!(
                "Unknown merge mode '{}', expected 'intersection' or 'union'",
                other
            )),
        }
    }
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeMode::Intersection => write!(f, "intersection"),
            MergeMode::Union => write!(f, "union"),
        }
    }
}

/// Unified column list plus the per-file rename mapping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedSchema {
    /// Unified column names in output order
    pub columns: Vec<String>,

    /// File name -> column mapping
    pub mappings: HashMap<String, ColumnMapping>,
}

impl UnifiedSchema {
    /// Schema that keeps every column name as-is
    pub fn identity(files: &[UploadedFile]) -> Self {
        let mut columns = Vec::new();
        let mut seen = HashSet::new();
        let mut mappings = HashMap::new();

        for file in files {
            let mut mapping = ColumnMapping::new();
            for header in &file.table.headers {
                if seen.insert(header.clone()) {
                    columns.push(header.clone());
                }
                mapping.insert(header.clone(), header.clone());
            }
            mappings.insert(file.name.clone(), mapping);
        }

        Self { columns, mappings }
    }

    pub fn mapping_for(&self, file_name: &str) -> Option<&ColumnMapping> {
        self.mappings.get(file_name)
    }

    /// Unified name of `original` in `file_name`; unmapped columns keep their name
    pub fn unified_name<'a>(&'a self, file_name: &str, original: &'a str) -> &'a str {
        self.mappings
            .get(file_name)
            .and_then(|m| m.get(original))
            .map(String::as_str)
            .unwrap_or(original)
    }
}
