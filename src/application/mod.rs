pub mod use_cases;

use std::sync::{Arc, Mutex};

use crate::domain::workspace::Workspace;

/// Workspace shared between use cases and request handlers.
/// Never hold the lock across an `.await`.
pub type SharedWorkspace = Arc<Mutex<Workspace>>;

pub use use_cases::column_selection::{ColumnSelectionUseCase, ColumnsView};
pub use use_cases::file_intake::{FileIntakeUseCase, IncomingFile};
pub use use_cases::merge::{ExportOptions, ExportUseCase, ExportedCsv};
pub use use_cases::schema_unification::SchemaUnificationUseCase;
