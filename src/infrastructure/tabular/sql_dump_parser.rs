// ============================================================
// SQL DUMP PARSER
// ============================================================
// Read the rows of INSERT statements out of a SQL dump

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::csv_parser::decode_text;
use crate::domain::error::{AppError, Result};
use crate::domain::tabular::{Row, Table};

static CREATE_TABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^create\s+(?:temporary\s+)?table\s+(?:if\s+not\s+exists\s+)?([`"\[]?[\w.$]+[`"\]]?(?:\.[`"\[]?[\w$]+[`"\]]?)?)\s*\((.*)\)"#,
    )
    .unwrap()
});

static INSERT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)^insert\s+(?:ignore\s+)?into\s+([`"\[]?[\w.$]+[`"\]]?(?:\.[`"\[]?[\w$]+[`"\]]?)?)\s*(?:\(([^)]*)\))?\s*values\s*(.*)$"#,
    )
    .unwrap()
});

/// Leading keywords of CREATE TABLE entries that are not columns
const CONSTRAINT_KEYWORDS: &[&str] = &[
    "primary",
    "key",
    "unique",
    "constraint",
    "foreign",
    "index",
    "check",
    "fulltext",
    "spatial",
];

#[derive(Debug, Default)]
struct DumpTable {
    /// Columns declared by CREATE TABLE
    declared: Option<Vec<String>>,
    /// Union of the column lists rows were inserted with, first-seen order
    headers: Vec<String>,
    rows: Vec<Row>,
}

impl DumpTable {
    /// Key each tuple by the column list of its own INSERT statement
    fn insert(&mut self, columns: &[String], tuples: Vec<Vec<String>>) {
        for column in columns {
            if !self.headers.contains(column) {
                self.headers.push(column.clone());
            }
        }
        for values in tuples {
            self.rows
                .push(columns.iter().cloned().zip(values).collect::<Row>());
        }
    }
}

/// Parser for MySQL / PostgreSQL / SQLite style dumps
#[derive(Debug, Default)]
pub struct SqlDumpParser;

impl SqlDumpParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<Table> {
        self.parse_content(&decode_text(bytes))
    }

    /// Parse a dump. When it holds several tables the first one with rows wins.
    pub fn parse_content(&self, content: &str) -> Result<Table> {
        let mut order: Vec<String> = Vec::new();
        let mut tables: HashMap<String, DumpTable> = HashMap::new();

        for statement in split_statements(content) {
            if let Some(caps) = CREATE_TABLE_PATTERN.captures(&statement) {
                let name = table_name(&caps[1]);
                let columns = parse_column_definitions(&caps[2]);
                let entry = tables.entry(name.clone()).or_insert_with(|| {
                    order.push(name.clone());
                    DumpTable::default()
                });
                entry.declared = Some(columns);
                continue;
            }

            if let Some(caps) = INSERT_PATTERN.captures(&statement) {
                let name = table_name(&caps[1]);
                let tuples = parse_value_tuples(&caps[3])?;

                let entry = tables.entry(name.clone()).or_insert_with(|| {
                    order.push(name.clone());
                    DumpTable::default()
                });

                let columns: Vec<String> = match (caps.get(2), &entry.declared) {
                    (Some(list), _) => list.as_str().split(',').map(unquote_identifier).collect(),
                    (None, Some(declared)) if !declared.is_empty() => declared.clone(),
                    (None, _) => {
                        let width = tuples.iter().map(Vec::len).max().unwrap_or(0);
                        (1..=width).map(|i| format!("column_{}", i)).collect()
                    }
                };
                entry.insert(&columns, tuples);
            }
        }

        let with_rows: Vec<&String> = order
            .iter()
            .filter(|name| tables.get(*name).is_some_and(|t| !t.rows.is_empty()))
            .collect();

        let Some(chosen) = with_rows.first() else {
            return Err(AppError::ParseError(
                "SQL dump contains no INSERT statements".to_string(),
            ));
        };

        if with_rows.len() > 1 {
            tracing::warn!(
                table = %chosen,
                skipped = with_rows.len() - 1,
                "SQL dump holds several tables; only the first is imported"
            );
        }

        let table = &tables[*chosen];
        let records = table.rows.iter().map(|row| {
            table
                .headers
                .iter()
                .map(|h| row.get(h).cloned().unwrap_or_default())
                .collect::<Vec<_>>()
        });

        Ok(Table::from_records(&table.headers, records))
    }
}

/// Split on `;` outside quotes, dropping `--`, `#` and `/* */` comments
fn split_statements(content: &str) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if let Some(q) = quote {
            current.push(c);
            if c == '\\' && q != '`' && i + 1 < chars.len() {
                current.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == q {
                // Doubled quote is an escaped quote
                if i + 1 < chars.len() && chars[i + 1] == q {
                    current.push(q);
                    i += 2;
                    continue;
                }
                quote = None;
            }
            i += 1;
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
                i += 1;
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i + 1 < chars.len() && !(chars[i] == '*' && chars[i + 1] == '/') {
                    i += 1;
                }
                i += 2;
            }
            ';' => {
                push_statement(&mut statements, &mut current);
                i += 1;
            }
            _ => {
                current.push(c);
                i += 1;
            }
        }
    }

    push_statement(&mut statements, &mut current);
    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        statements.push(trimmed.to_string());
    }
    current.clear();
}

fn unquote_identifier(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c| c == '`' || c == '"' || c == '[' || c == ']')
        .to_string()
}

/// Schema-qualified names keep only the table part
fn table_name(raw: &str) -> String {
    let unquoted: Vec<String> = raw.split('.').map(unquote_identifier).collect();
    unquoted.last().cloned().unwrap_or_default()
}

/// Split on commas that are not nested inside parentheses or quotes
fn split_top_level(body: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    for c in body.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
                current.push(c);
            }
            None => match c {
                '\'' | '"' | '`' => {
                    quote = Some(c);
                    current.push(c);
                }
                '(' => {
                    depth += 1;
                    current.push(c);
                }
                ')' => {
                    depth -= 1;
                    current.push(c);
                }
                ',' if depth == 0 => {
                    parts.push(std::mem::take(&mut current));
                }
                _ => current.push(c),
            },
        }
    }
    if !current.trim().is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_column_definitions(body: &str) -> Vec<String> {
    split_top_level(body)
        .iter()
        .filter_map(|def| {
            let first = def.split_whitespace().next()?;
            let lowered = first.to_ascii_lowercase();
            if CONSTRAINT_KEYWORDS.contains(&lowered.as_str()) {
                return None;
            }
            Some(unquote_identifier(first))
        })
        .collect()
}

/// Parse `(v1, v2), (v3, v4)` into rows
fn parse_value_tuples(values: &str) -> Result<Vec<Vec<String>>> {
    let chars: Vec<char> = values.chars().collect();
    let mut rows = Vec::new();
    let mut i = 0;

    loop {
        while i < chars.len() && (chars[i].is_whitespace() || chars[i] == ',') {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }
        if chars[i] != '(' {
            return Err(AppError::ParseError(format!(
                "Unexpected character '{}' in INSERT values",
                chars[i]
            )));
        }
        i += 1;

        let mut row = Vec::new();
        loop {
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            if i >= chars.len() {
                return Err(AppError::ParseError(
                    "Unterminated value tuple in INSERT statement".to_string(),
                ));
            }

            let (value, next) = match chars[i] {
                '\'' | '"' => read_quoted(&chars, i)?,
                _ => read_bare(&chars, i),
            };
            row.push(value);
            i = next;

            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            match chars.get(i) {
                Some(',') => i += 1,
                Some(')') => {
                    i += 1;
                    break;
                }
                _ => {
                    return Err(AppError::ParseError(
                        "Malformed value tuple in INSERT statement".to_string(),
                    ))
                }
            }
        }
        rows.push(row);
    }

    Ok(rows)
}

fn read_quoted(chars: &[char], start: usize) -> Result<(String, usize)> {
    let quote = chars[start];
    let mut value = String::new();
    let mut i = start + 1;

    while i < chars.len() {
        let c = chars[i];
        if c == '\\' && i + 1 < chars.len() {
            value.push(match chars[i + 1] {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                '0' => '\0',
                other => other,
            });
            i += 2;
            continue;
        }
        if c == quote {
            if chars.get(i + 1) == Some(&quote) {
                value.push(quote);
                i += 2;
                continue;
            }
            return Ok((value, i + 1));
        }
        value.push(c);
        i += 1;
    }

    Err(AppError::ParseError(
        "Unterminated string literal in INSERT statement".to_string(),
    ))
}

fn read_bare(chars: &[char], start: usize) -> (String, usize) {
    let mut i = start;
    let mut depth = 0i32;
    while i < chars.len() {
        match chars[i] {
            '(' => depth += 1,
            ')' if depth == 0 => break,
            ')' => depth -= 1,
            ',' if depth == 0 => break,
            _ => {}
        }
        i += 1;
    }

    let raw: String = chars[start..i].iter().collect();
    let raw = raw.trim();
    let value = if raw.eq_ignore_ascii_case("null") {
        String::new()
    } else {
        raw.to_string()
    };
    (value, i)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MYSQL_DUMP: &str = r#"
-- MySQL dump 10.13
/*!40101 SET NAMES utf8 */;
DROP TABLE IF EXISTS `customers`;
CREATE TABLE `customers` (
  `id` int(11) NOT NULL AUTO_INCREMENT,
  `full_name` varchar(255) DEFAULT NULL,
  `email` varchar(255) DEFAULT NULL,
  PRIMARY KEY (`id`),
  UNIQUE KEY `email_idx` (`email`)
) ENGINE=InnoDB DEFAULT CHARSET=utf8;

INSERT INTO `customers` VALUES (1,'Ana O''Neil','ana@example.com'),(2,'Bo; Smith',NULL);
"#;

    #[test]
    fn test_mysql_dump_uses_create_table_columns() {
        let table = SqlDumpParser::new().parse_content(MYSQL_DUMP).unwrap();

        assert_eq!(table.headers, vec!["id", "full_name", "email"]);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.rows[0]["full_name"], "Ana O'Neil");
        assert_eq!(table.rows[1]["full_name"], "Bo; Smith");
        assert_eq!(table.rows[1]["email"], "");
    }

    #[test]
    fn test_explicit_insert_columns() {
        let dump = "INSERT INTO public.orders (order_id, total) VALUES (10, 9.5);\n\
                    INSERT INTO public.orders (order_id, total) VALUES (11, 'n/a');";
        let table = SqlDumpParser::new().parse_content(dump).unwrap();

        assert_eq!(table.headers, vec!["order_id", "total"]);
        assert_eq!(table.rows[1]["total"], "n/a");
    }

    #[test]
    fn test_insert_without_columns_gets_positional_names() {
        let table = SqlDumpParser::new()
            .parse_content("INSERT INTO t VALUES ('a', 'b\\'c');")
            .unwrap();

        assert_eq!(table.headers, vec!["column_1", "column_2"]);
        assert_eq!(table.rows[0]["column_2"], "b'c");
    }

    #[test]
    fn test_first_table_with_rows_wins() {
        let dump = "CREATE TABLE empty (x int);\n\
                    INSERT INTO first (a) VALUES (1);\n\
                    INSERT INTO second (b) VALUES (2);";
        let table = SqlDumpParser::new().parse_content(dump).unwrap();
        assert_eq!(table.headers, vec!["a"]);
    }

    #[test]
    fn test_dump_without_inserts_is_error() {
        let err = SqlDumpParser::new()
            .parse_content("CREATE TABLE t (id int);")
            .unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = SqlDumpParser::new()
            .parse_content("INSERT INTO t VALUES ('oops)")
            .unwrap_err();
        assert!(matches!(err, AppError::ParseError(_)));
    }

    #[test]
    fn test_reordered_insert_columns_keep_values_in_place() {
        let table = SqlDumpParser::new()
            .parse_content(
                "INSERT INTO t (a, b) VALUES (1, 2);\n\
                 INSERT INTO t (b, a) VALUES (3, 4);",
            )
            .unwrap();

        assert_eq!(table.headers, vec!["a", "b"]);
        assert_eq!(table.rows[0]["a"], "1");
        assert_eq!(table.rows[0]["b"], "2");
        assert_eq!(table.rows[1]["a"], "4");
        assert_eq!(table.rows[1]["b"], "3");
    }

    #[test]
    fn test_insert_column_subsets_are_unioned() {
        let table = SqlDumpParser::new()
            .parse_content(
                "INSERT INTO t (a, c) VALUES (1, 3);\n\
                 INSERT INTO t (a, b, c) VALUES (4, 5, 6);",
            )
            .unwrap();

        assert_eq!(table.headers, vec!["a", "c", "b"]);
        assert_eq!(table.rows[0]["c"], "3");
        assert_eq!(table.rows[0]["b"], "");
        assert_eq!(table.rows[1]["b"], "5");
        assert_eq!(table.rows[1]["c"], "6");
    }

    #[test]
    fn test_escaped_double_quote_before_semicolon() {
        let table = SqlDumpParser::new()
            .parse_content(r#"INSERT INTO t (a, b) VALUES ("x\";y", 1);"#)
            .unwrap();

        assert_eq!(table.row_count(), 1);
        assert_eq!(table.rows[0]["a"], "x\";y");
        assert_eq!(table.rows[0]["b"], "1");
    }

    #[test]
    fn test_hash_comments_are_ignored() {
        let dump = "# exported by a tool; version 2\n\
                    INSERT INTO t (id) VALUES (1); # trailing note\n\
                    INSERT INTO t (id) VALUES (2);";
        let table = SqlDumpParser::new().parse_content(dump).unwrap();

        assert_eq!(table.headers, vec!["id"]);
        assert_eq!(table.row_count(), 2);
    }
}
