//! SQL text for table creation, loading and streaming

use crate::domain::ids::BlobUri;
use crate::domain::table::{SchemaField, TableTarget};

/// Primary key column added to streaming tables
pub const ROW_ID_COLUMN: &str = "_row_id";

/// Quotes an identifier, doubling embedded quotes
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quotes a string literal, doubling embedded single quotes
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// `"dataset"."table_id"`
pub fn qualified_name(target: &TableTarget) -> String {
    format!(
        "{}.{}",
        quote_ident(&target.dataset),
        quote_ident(&target.table_id)
    )
}

fn column_defs(schema: &[SchemaField]) -> String {
    schema
        .iter()
        .map(|f| format!("{} {}", quote_ident(f.name), f.field_type.sql_type()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn column_list(schema: &[SchemaField]) -> String {
    schema
        .iter()
        .map(|f| quote_ident(f.name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Filesystem path of a blob under the mounted bucket root
pub fn external_path(root: &str, uri: &BlobUri) -> String {
    format!("{}/{}/{}", root.trim_end_matches('/'), uri.bucket, uri.name)
}

pub fn create_schema(dataset: &str) -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", quote_ident(dataset))
}

/// Extension and server backing external tables
pub fn ensure_foreign_server(server: &str) -> String {
    format!(
        "CREATE EXTENSION IF NOT EXISTS file_fdw; \
         CREATE SERVER IF NOT EXISTS {} FOREIGN DATA WRAPPER file_fdw",
        quote_ident(server)
    )
}

pub fn create_foreign_table(
    target: &TableTarget,
    schema: &[SchemaField],
    server: &str,
    path: &str,
    header: bool,
) -> String {
    format!(
        "CREATE FOREIGN TABLE {} ({}) SERVER {} OPTIONS (filename {}, format 'csv', header '{}')",
        qualified_name(target),
        column_defs(schema),
        quote_ident(server),
        quote_literal(path),
        header
    )
}

pub fn create_table(target: &TableTarget, schema: &[SchemaField]) -> String {
    format!(
        "CREATE TABLE {} ({})",
        qualified_name(target),
        column_defs(schema)
    )
}

pub fn copy_csv(target: &TableTarget, schema: &[SchemaField]) -> String {
    format!(
        "COPY {} ({}) FROM STDIN WITH (FORMAT csv)",
        qualified_name(target),
        column_list(schema)
    )
}

pub fn create_streaming_table(target: &TableTarget, schema: &[SchemaField]) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({} TEXT PRIMARY KEY, {})",
        qualified_name(target),
        quote_ident(ROW_ID_COLUMN),
        column_defs(schema)
    )
}

/// Inserts one JSON object as a row
///
/// `$1` is the row id, `$2` the object. Replays of a row id are dropped.
pub fn insert_json_row(target: &TableTarget, schema: &[SchemaField]) -> String {
    let columns = column_list(schema);
    let selected = schema
        .iter()
        .map(|f| format!("r.{}", quote_ident(f.name)))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "INSERT INTO {table} ({row_id}, {columns}) \
         SELECT $1, {selected} FROM json_to_record($2::json) AS r({defs}) \
         ON CONFLICT ({row_id}) DO NOTHING",
        table = qualified_name(target),
        row_id = quote_ident(ROW_ID_COLUMN),
        defs = column_defs(schema),
    )
}

/// Drops the first `rows` lines of a CSV payload
pub fn skip_leading_rows(data: &[u8], rows: u32) -> &[u8] {
    let mut rest = data;
    for _ in 0..rows {
        match rest.iter().position(|b| *b == b'\n') {
            Some(i) => rest = &rest[i + 1..],
            None => return &[],
        }
    }
    rest
}
