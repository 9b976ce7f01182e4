// ============================================================
// TABLE
// ============================================================
// Header-keyed rows parsed from one uploaded file

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A row keyed by column name
pub type Row = HashMap<String, String>;

/// Parsed content of one file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Column names in file order, unique
    pub headers: Vec<String>,

    /// Data rows
    pub rows: Vec<Row>,
}

impl Table {
    /// Build a table from raw header cells and positional records.
    /// Short records are padded with empty values, extra cells are dropped.
    pub fn from_records<I, R, S>(raw_headers: &[String], records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let headers = Self::normalize_headers(raw_headers);

        let rows = records
            .into_iter()
            .map(|record| {
                let mut values = record.into_iter().map(Into::<String>::into);
                headers
                    .iter()
                    .map(|h| (h.clone(), values.next().unwrap_or_default()))
                    .collect::<Row>()
            })
            .collect();

        Self { headers, rows }
    }

    /// Trim names, fill blanks with `column_<n>` and suffix duplicates with `_<k>`
    pub fn normalize_headers(raw: &[String]) -> Vec<String> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::with_capacity(raw.len());

        for (idx, header) in raw.iter().enumerate() {
            let trimmed = header.trim().trim_start_matches('\u{feff}').trim();
            let base = if trimmed.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                trimmed.to_string()
            };

            let mut name = base.clone();
            let mut k = 2;
            while seen.contains(&name) {
                name = format!("{}_{}", base, k);
                k += 1;
            }
            seen.insert(name.clone());
            out.push(name);
        }

        out
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// First `n` rows as positional values, for prompts and previews
    pub fn sample(&self, n: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .take(n)
            .map(|row| {
                self.headers
                    .iter()
                    .map(|h| row.get(h).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_headers() {
        let raw = headers(&[" id ", "", "name", "name", "\u{feff}email"]);
        assert_eq!(
            Table::normalize_headers(&raw),
            vec!["id", "column_2", "name", "name_2", "email"]
        );
    }

    #[test]
    fn test_from_records_pads_and_truncates() {
        let table = Table::from_records(
            &headers(&["a", "b"]),
            vec![vec!["1"], vec!["2", "3", "4"]],
        );

        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0]["a"], "1");
        assert_eq!(table.rows[0]["b"], "");
        assert_eq!(table.rows[1]["b"], "3");
        assert_eq!(table.rows[1].len(), 2);
    }

    #[test]
    fn test_sample_keeps_header_order() {
        let table = Table::from_records(
            &headers(&["x", "y"]),
            vec![vec!["1", "2"], vec!["3", "4"], vec!["5", "6"]],
        );
        assert_eq!(
            table.sample(2),
            vec![vec!["1".to_string(), "2".to_string()], vec!["3".to_string(), "4".to_string()]]
        );
    }
}
