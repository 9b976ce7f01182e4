use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{SupportedFileType, Table};

/// A file accepted at intake together with its parsed table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedFile {
    pub id: Uuid,
    pub name: String,
    pub kind: SupportedFileType,
    pub table: Table,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedFile {
    pub fn new(name: String, kind: SupportedFileType, table: Table) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            kind,
            table,
            uploaded_at: Utc::now(),
        }
    }

    pub fn summary(&self) -> FileSummary {
        FileSummary {
            id: self.id,
            name: self.name.clone(),
            media_type: self.kind.media_type().to_string(),
            rows: self.table.row_count(),
            columns: self.table.headers.clone(),
        }
    }
}

/// File list entry shown to the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileSummary {
    pub id: Uuid,
    pub name: String,
    pub media_type: String,
    pub rows: usize,
    pub columns: Vec<String>,
}

impl std::fmt::Display for FileSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, self.media_type)
    }
}
