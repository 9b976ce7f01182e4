use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::domain::error::{AppError, Result};

/// Which discovered columns are kept on export.
/// Keys are always a subset of the discovered column names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnSelection(BTreeMap<String, bool>);

impl ColumnSelection {
    pub fn all_selected(columns: &[String]) -> Self {
        Self(columns.iter().map(|c| (c.clone(), true)).collect())
    }

    /// Re-key over a new column list. Surviving names keep their flag,
    /// new names start selected, vanished names are dropped.
    pub fn rebuild(&mut self, columns: &[String]) {
        let previous = std::mem::take(&mut self.0);
        self.0 = columns
            .iter()
            .map(|c| (c.clone(), previous.get(c).copied().unwrap_or(true)))
            .collect();
    }

    pub fn set(&mut self, column: &str, selected: bool) -> Result<()> {
        match self.0.get_mut(column) {
            Some(flag) => {
                *flag = selected;
                Ok(())
            }
            None => Err(AppError::ValidationError(format!(
                "Unknown column: {}",
                column
            ))),
        }
    }

    /// Bulk update; nothing changes if any column is unknown
    pub fn apply(&mut self, updates: &BTreeMap<String, bool>) -> Result<()> {
        let unknown: Vec<&str> = updates
            .keys()
            .filter(|k| !self.0.contains_key(*k))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            return Err(AppError::ValidationError(format!(
                "Unknown columns: {}",
                unknown.join(", ")
            )));
        }

        for (column, selected) in updates {
            self.0.insert(column.clone(), *selected);
        }
        Ok(())
    }

    /// Select exactly the given columns, deselecting everything else
    pub fn select_only(&mut self, columns: &[String]) -> Result<()> {
        let wanted: HashSet<&String> = columns.iter().collect();
        let updates: BTreeMap<String, bool> = self
            .0
            .keys()
            .map(|k| (k.clone(), wanted.contains(k)))
            .chain(columns.iter().map(|c| (c.clone(), true)))
            .collect();
        self.apply(&updates)
    }

    pub fn is_selected(&self, column: &str) -> bool {
        self.0.get(column).copied().unwrap_or(false)
    }

    /// Selected names filtered from `columns`, keeping that order
    pub fn selected_in_order(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .filter(|c| self.is_selected(c))
            .cloned()
            .collect()
    }

    pub fn as_map(&self) -> &BTreeMap<String, bool> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}
