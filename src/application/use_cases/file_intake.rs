use serde::{Deserialize, Serialize};

use crate::application::SharedWorkspace;
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::{FileSummary, SupportedFileType, UploadedFile};
use crate::infrastructure::tabular::parse_upload;

pub const UNSUPPORTED_FILE_MESSAGE: &str = "One of your files is not a supported data type";

/// A file as received from the browser or the command line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl IncomingFile {
    pub fn new(name: impl Into<String>, media_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }
}

pub struct FileIntakeUseCase {
    workspace: SharedWorkspace,
}

impl FileIntakeUseCase {
    pub fn new(workspace: SharedWorkspace) -> Self {
        Self { workspace }
    }

    /// Validate, parse and append a batch. Either every file is added or none.
    pub fn execute(&self, files: Vec<IncomingFile>) -> Result<Vec<FileSummary>> {
        let parsed = Self::parse_batch(files)?;
        let count = parsed.len();

        let mut workspace = self.workspace.lock()?;
        let added = workspace.add_files(parsed);

        tracing::info!(
            added = count,
            total = workspace.files().len(),
            columns = workspace.discovered_columns().len(),
            "Files added"
        );
        Ok(added)
    }

    pub fn list(&self) -> Result<Vec<FileSummary>> {
        Ok(self.workspace.lock()?.summaries())
    }

    pub fn reset(&self) -> Result<()> {
        self.workspace.lock()?.reset();
        tracing::info!("Workspace reset");
        Ok(())
    }

    fn parse_batch(files: Vec<IncomingFile>) -> Result<Vec<UploadedFile>> {
        if files.is_empty() {
            return Err(AppError::ValidationError("No files provided".to_string()));
        }

        // Type check the whole batch before parsing anything
        let mut kinds = Vec::with_capacity(files.len());
        for file in &files {
            match SupportedFileType::detect(&file.name, file.media_type.as_deref()) {
                Some(kind) => kinds.push(kind),
                None => {
                    tracing::warn!(
                        file = %file.name,
                        media_type = file.media_type.as_deref().unwrap_or(""),
                        "Rejected upload batch: unsupported file type"
                    );
                    return Err(AppError::UnsupportedFileType(
                        UNSUPPORTED_FILE_MESSAGE.to_string(),
                    ));
                }
            }
        }

        files
            .into_iter()
            .zip(kinds)
            .map(|(file, kind)| {
                let table = parse_upload(kind, &file.bytes).map_err(|e| {
                    AppError::ParseError(format!("Failed to parse {}: {}", file.name, e))
                })?;
                tracing::debug!(
                    file = %file.name,
                    kind = %kind,
                    rows = table.row_count(),
                    columns = table.column_count(),
                    "Parsed upload"
                );
                Ok(UploadedFile::new(file.name, kind, table))
            })
            .collect()
    }
}
