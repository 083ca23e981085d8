//! SQL identifier quoting and statement building
//!
//! The plain helpers use ANSI double quotes; the `_with` variants take the
//! quote character so MySQL can use backticks.

use std::path::Path;

/// Quote a SQL identifier, doubling embedded double quotes.
///
/// ```
/// use mg_db::sql_utils::quote_ident;
/// assert_eq!(quote_ident("users"), r#""users""#);
/// assert_eq!(quote_ident(r#"my"table"#), r#""my""table""#);
/// ```
pub fn quote_ident(ident: &str) -> String {
    quote_ident_with(ident, '"')
}

/// Quote a SQL identifier with `quote`, doubling any embedded occurrence.
///
/// ```
/// use mg_db::sql_utils::quote_ident_with;
/// assert_eq!(quote_ident_with("we`ird", '`'), "`we``ird`");
/// ```
pub fn quote_ident_with(ident: &str, quote: char) -> String {
    let escaped = ident.replace(quote, &format!("{quote}{quote}"));
    format!("{quote}{escaped}{quote}")
}

/// Quote a potentially schema-qualified name, one component at a time.
pub fn quote_qualified(name: &str) -> String {
    quote_qualified_with(name, '"')
}

pub fn quote_qualified_with(name: &str, quote: char) -> String {
    name.split('.')
        .map(|part| quote_ident_with(part, quote))
        .collect::<Vec<_>>()
        .join(".")
}

/// Quote a string literal, doubling embedded single quotes.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Location for a new database file named `name`, beside `main`.
///
/// In-memory connections get another in-memory database.
pub fn sibling_database(main: Option<&Path>, name: &str, default_extension: &str) -> String {
    match main {
        None => ":memory:".to_string(),
        Some(main) => {
            let extension = main
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or(default_extension);
            main.with_file_name(format!("{name}.{extension}"))
                .display()
                .to_string()
        }
    }
}

/// Split `schema.table` at the last dot, falling back to `default_schema`.
pub fn split_qualified_name<'a>(name: &'a str, default_schema: &'a str) -> (&'a str, &'a str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => (default_schema, name),
    }
}

/// Build `INSERT INTO table (c1, c2) VALUES (?, ?)` with one placeholder per column.
pub fn insert_statement(table: &str, columns: &[String]) -> String {
    insert_statement_with(table, columns, '"')
}

pub fn insert_statement_with(table: &str, columns: &[String], quote: char) -> String {
    let cols = columns
        .iter()
        .map(|c| quote_ident_with(c, quote))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_qualified_with(table, quote),
        cols,
        placeholders
    )
}
