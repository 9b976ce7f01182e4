use std::collections::BTreeMap;

use serde::Serialize;

use crate::application::SharedWorkspace;
use crate::domain::error::Result;

/// Discovered columns in display order with their selection flag
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnsView {
    pub columns: Vec<String>,
    pub selection: BTreeMap<String, bool>,
    pub unified: bool,
}

pub struct ColumnSelectionUseCase {
    workspace: SharedWorkspace,
}

impl ColumnSelectionUseCase {
    pub fn new(workspace: SharedWorkspace) -> Self {
        Self { workspace }
    }

    pub fn view(&self) -> Result<ColumnsView> {
        let workspace = self.workspace.lock()?;
        Ok(ColumnsView {
            columns: workspace.discovered_columns(),
            selection: workspace.selection().as_map().clone(),
            unified: workspace.schema().is_some(),
        })
    }

    pub fn update(&self, updates: &BTreeMap<String, bool>) -> Result<ColumnsView> {
        {
            let mut workspace = self.workspace.lock()?;
            workspace.selection_mut().apply(updates)?;
        }
        tracing::debug!(updated = updates.len(), "Column selection changed");
        self.view()
    }

    pub fn select_only(&self, columns: &[String]) -> Result<ColumnsView> {
        {
            let mut workspace = self.workspace.lock()?;
            workspace.selection_mut().select_only(columns)?;
        }
        self.view()
    }
}
