// ============================================================
// CSV WRITER
// ============================================================
// Render header-keyed rows as CSV

use std::io::Write;

use csv::WriterBuilder;

use crate::domain::error::{AppError, Result};
use crate::domain::tabular::Row;

/// Write `headers` then one record per row; missing cells are empty
pub fn write_csv<W: Write>(headers: &[String], rows: &[Row], out: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(out);

    writer.write_record(headers)?;
    for row in rows {
        writer.write_record(
            headers
                .iter()
                .map(|h| row.get(h).map(String::as_str).unwrap_or("")),
        )?;
    }

    writer
        .flush()
        .map_err(|e| AppError::IoError(format!("Failed to flush CSV output: {}", e)))
}

pub fn to_csv_string(headers: &[String], rows: &[Row]) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(headers, rows, &mut buffer)?;
    String::from_utf8(buffer)
        .map_err(|e| AppError::Internal(format!("CSV output is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_csv_string_quotes_and_blanks() {
        let headers = vec!["id".to_string(), "note".to_string()];
        let rows = vec![
            Row::from([
                ("id".to_string(), "1".to_string()),
                ("note".to_string(), "a, b".to_string()),
            ]),
            Row::from([("id".to_string(), "2".to_string())]),
        ];

        let csv = to_csv_string(&headers, &rows).unwrap();
        assert_eq!(csv, "id,note\n1,\"a, b\"\n2,\n");
    }

    #[test]
    fn test_header_only_output() {
        let headers = vec!["id".to_string()];
        assert_eq!(to_csv_string(&headers, &[]).unwrap(), "id\n");
    }
}
