use serde::Deserialize;
use std::collections::HashMap;

/// Headers and a few sample rows of one file, captured under the workspace lock
#[derive(Debug, Clone)]
pub(crate) struct FileSnapshot {
    pub(crate) name: String,
    pub(crate) headers: Vec<String>,
    pub(crate) sample: Vec<Vec<String>>,
}

/// JSON shape the model is asked to return
#[derive(Debug, Default, Deserialize)]
pub(crate) struct UnificationOutput {
    #[serde(default, alias = "columns", alias = "unifiedColumns")]
    pub(crate) unified_columns: Vec<String>,
    #[serde(default, alias = "mapping", alias = "file_mappings")]
    pub(crate) mappings: HashMap<String, HashMap<String, String>>,
}
