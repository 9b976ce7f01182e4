use std::collections::{HashMap, HashSet};

use super::types::{FileSnapshot, UnificationOutput};
use crate::domain::schema::{ColumnMapping, UnifiedSchema};

/// Turn model output into a schema that covers exactly the uploaded columns.
///
/// - mappings for unknown files and entries for unknown columns are dropped
/// - every original column ends up mapped; unmapped ones keep their name
/// - mapped targets missing from `unified_columns` are appended
/// - unified columns no file maps onto are dropped
pub(crate) fn normalize_output(output: UnificationOutput, files: &[FileSnapshot]) -> UnifiedSchema {
    let known_files: HashSet<&str> = files.iter().map(|f| f.name.as_str()).collect();
    let mut raw_mappings: HashMap<String, HashMap<String, String>> = HashMap::new();

    for (file_name, mapping) in output.mappings {
        match resolve_key(&file_name, known_files.iter().copied()) {
            Some(known) => {
                raw_mappings.entry(known.to_string()).or_default().extend(mapping);
            }
            None => tracing::warn!(file = %file_name, "Model returned a mapping for an unknown file"),
        }
    }

    let mut mappings = HashMap::with_capacity(files.len());
    let mut targets_in_order: Vec<String> = Vec::new();
    let mut dropped = 0usize;

    for file in files {
        let raw = raw_mappings.remove(&file.name).unwrap_or_default();
        let mut resolved: HashMap<&str, String> = HashMap::new();

        for (original, target) in &raw {
            let target = target.trim();
            match resolve_key(original, file.headers.iter().map(String::as_str)) {
                Some(header) if !target.is_empty() => {
                    resolved.insert(header, target.to_string());
                }
                _ => dropped += 1,
            }
        }

        let mut mapping = ColumnMapping::with_capacity(file.headers.len());
        for header in &file.headers {
            let target = resolved
                .get(header.as_str())
                .cloned()
                .unwrap_or_else(|| header.clone());
            targets_in_order.push(target.clone());
            mapping.insert(header.clone(), target);
        }
        mappings.insert(file.name.clone(), mapping);
    }

    if dropped > 0 {
        tracing::debug!(dropped, "Ignored mapping entries for unknown or blank columns");
    }

    let mapped_targets: HashSet<&str> = targets_in_order.iter().map(String::as_str).collect();
    let mut seen: HashSet<String> = HashSet::new();
    let mut columns = Vec::new();

    for column in output.unified_columns.iter().map(|c| c.trim()) {
        if column.is_empty() || !mapped_targets.contains(column) {
            continue;
        }
        if seen.insert(column.to_string()) {
            columns.push(column.to_string());
        }
    }
    for target in &targets_in_order {
        if seen.insert(target.clone()) {
            columns.push(target.clone());
        }
    }

    UnifiedSchema { columns, mappings }
}

/// Exact match first, then a trimmed case-insensitive one
fn resolve_key<'a, I>(key: &str, candidates: I) -> Option<&'a str>
where
    I: Iterator<Item = &'a str> + Clone,
{
    if let Some(found) = candidates.clone().find(|c| *c == key) {
        return Some(found);
    }
    let wanted = key.trim().to_lowercase();
    candidates.into_iter().find(|c| c.trim().to_lowercase() == wanted)
}
