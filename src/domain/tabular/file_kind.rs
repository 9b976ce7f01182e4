// ============================================================
// SUPPORTED FILE TYPES
// ============================================================
// Media types accepted at intake

use serde::{Deserialize, Serialize};

/// File kinds the merger can read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupportedFileType {
    /// Comma (or other delimiter) separated values
    Csv,

    /// SQL dump made of CREATE TABLE / INSERT INTO statements
    Sql,
}

impl SupportedFileType {
    /// Resolve from a browser-reported media type.
    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();

        match essence.as_str() {
            "text/csv" => Some(SupportedFileType::Csv),
            "application/sql" => Some(SupportedFileType::Sql),
            _ => None,
        }
    }

    /// Resolve from the file extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        let ext = std::path::Path::new(name)
            .extension()?
            .to_str()?
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Some(SupportedFileType::Csv),
            "sql" => Some(SupportedFileType::Sql),
            _ => None,
        }
    }

    /// Resolve an upload. The extension is only consulted when no media type
    /// was reported at all; a reported but unsupported type is rejected.
    pub fn detect(name: &str, media_type: Option<&str>) -> Option<Self> {
        match media_type.map(str::trim) {
            Some(mt) if !mt.is_empty() => Self::from_media_type(mt),
            _ => Self::from_file_name(name),
        }
    }

    /// Canonical media type
    pub fn media_type(&self) -> &'static str {
        match self {
            SupportedFileType::Csv => "text/csv",
            SupportedFileType::Sql => "application/sql",
        }
    }
}

impl std::fmt::Display for SupportedFileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.media_type())
    }
}
