// ============================================================
// TABULAR DOMAIN LAYER
// ============================================================
// Uploaded files and the tables parsed out of them
// No I/O, no async

mod file_kind;
mod table;
mod uploaded_file;

pub use file_kind::SupportedFileType;
pub use table::{Row, Table};
pub use uploaded_file::{FileSummary, UploadedFile};
