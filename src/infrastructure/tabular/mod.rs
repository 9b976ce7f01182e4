// ============================================================
// TABULAR INFRASTRUCTURE LAYER
// ============================================================
// CSV / SQL dump parsing, decoding, and CSV rendering

mod csv_parser;
mod csv_writer;
mod sql_dump_parser;

pub use csv_parser::{decode_text, CsvParser};
pub use csv_writer::{to_csv_string, write_csv};
pub use sql_dump_parser::SqlDumpParser;

use crate::domain::error::Result;
use crate::domain::tabular::{SupportedFileType, Table};

/// Parse uploaded bytes with the parser for `kind`
pub fn parse_upload(kind: SupportedFileType, bytes: &[u8]) -> Result<Table> {
    match kind {
        SupportedFileType::Csv => CsvParser::new().parse_bytes(bytes),
        SupportedFileType::Sql => SqlDumpParser::new().parse_bytes(bytes),
    }
}
