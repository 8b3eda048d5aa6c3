//! Reconstruction of [`TableSchema`] values from previously emitted SQL.
//!
//! The parser is regex-driven and deliberately narrow: it targets the exact
//! dialect this generator emits, plus reasonable human edits (comments,
//! whitespace, case variation). It is not a general SQL parser. A file that
//! cannot be parsed is logged and skipped; extraction never aborts a run.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::core::schema::{ColumnSchema, FkAction, ForeignKeySchema, IndexSchema, TableSchema};
use crate::error::{GeneratorError, Result};

/// Parses partition directories of emitted SQL files.
pub struct SqlExtractor;

impl SqlExtractor {
    /// Reconstruct the schema of `table` from the SQL files in `dir`.
    ///
    /// Returns `None` when no CREATE TABLE file exists for the table or when
    /// parsing fails (logged as a warning).
    pub fn load_table_schema(dir: &Path, table: &str) -> Option<TableSchema> {
        match Self::try_load(dir, table) {
            Ok(schema) => schema,
            Err(e) => {
                warn!("failed to parse prior schema for table '{}': {}", table, e);
                None
            }
        }
    }

    /// All table names referenced by any SQL file in `dir` (via CREATE TABLE,
    /// ALTER TABLE, or CREATE INDEX ... ON), lowercased.
    pub fn existing_tables(dir: &Path) -> BTreeSet<String> {
        let mut tables = BTreeSet::new();

        let create_re =
            Regex::new(r"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?(\w+)").unwrap();
        let alter_re = Regex::new(r"(?i)ALTER\s+TABLE\s+(\w+)").unwrap();
        let index_re =
            Regex::new(r"(?i)CREATE\s+(?:UNIQUE\s+)?INDEX\s+\w+\s+ON\s+(\w+)").unwrap();

        for (_, content) in sql_files(dir) {
            for re in [&create_re, &alter_re, &index_re] {
                for caps in re.captures_iter(&content) {
                    tables.insert(caps[1].to_lowercase());
                }
            }
        }

        tables
    }

    fn try_load(dir: &Path, table: &str) -> Result<Option<TableSchema>> {
        let files = sql_files(dir);

        let create_re = Regex::new(&format!(
            r"(?i)CREATE\s+TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?{}\s*\(",
            regex::escape(table)
        ))
        .expect("static create-table pattern");

        // Newest versioned file wins: lexicographically greatest filename.
        let newest = files
            .iter()
            .filter(|(_, content)| create_re.is_match(content))
            .max_by(|(a, _), (b, _)| file_name(a).cmp(&file_name(b)));

        let Some((path, content)) = newest else {
            return Ok(None);
        };
        debug!("loading prior schema of '{}' from {}", table, path.display());

        let open = create_re
            .find(content)
            .expect("matched above")
            .end()
            .checked_sub(1)
            .expect("pattern ends with the opening paren");
        let close = balanced_paren_end(content, open).ok_or_else(|| {
            GeneratorError::parse(format!(
                "unbalanced CREATE TABLE parentheses in {}",
                path.display()
            ))
        })?;
        let body = &content[open + 1..close];

        let mut columns = parse_columns(body);
        apply_table_primary_key(body, &mut columns);

        Ok(Some(TableSchema {
            name: table.to_string(),
            columns,
            indexes: parse_indexes(&files, table),
            foreign_keys: parse_foreign_keys(&files, table),
        }))
    }
}

/// Read every `*.sql` file in `dir`, sorted by filename. Unreadable files
/// are logged and skipped; a missing directory yields an empty list.
fn sql_files(dir: &Path) -> Vec<(PathBuf, String)> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut files: Vec<(PathBuf, String)> = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(content) => files.push((path, content)),
            Err(e) => warn!("skipping unreadable SQL file {}: {}", path.display(), e),
        }
    }

    files.sort_by(|(a, _), (b, _)| file_name(a).cmp(&file_name(b)));
    files
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Index of the `)` closing the paren at `open`, honoring single-quoted
/// literals (a default like `'a(b'` must not affect the depth).
fn balanced_paren_end(content: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_quote = false;
    let mut prev_backslash = false;

    for (i, c) in content[open..].char_indices() {
        if in_quote {
            if prev_backslash {
                prev_backslash = false;
            } else if c == '\\' {
                prev_backslash = true;
            } else if c == '\'' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '\'' => in_quote = true,
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }

    None
}

fn parse_columns(body: &str) -> Vec<ColumnSchema> {
    let mut columns = Vec::new();

    for raw_line in body.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with("--") {
            continue;
        }

        let upper = line.to_uppercase();
        if upper.starts_with("PRIMARY KEY")
            || upper.starts_with("FOREIGN KEY")
            || upper.starts_with("CONSTRAINT")
        {
            continue;
        }

        let line = line.strip_suffix(',').unwrap_or(line).trim_end();
        let Some((name, sql_type, tail)) = split_column_line(line) else {
            debug!("skipping unparseable column line {:?}", line);
            continue;
        };

        let tail_upper = tail.to_uppercase();
        let primary_key = tail_upper.contains("PRIMARY KEY");

        columns.push(ColumnSchema {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            nullable: !primary_key && !tail_upper.contains("NOT NULL"),
            unique: tail_upper.contains("UNIQUE"),
            primary_key,
            auto_increment: tail_upper.contains("AUTO_INCREMENT"),
            default_value: parse_default(tail),
        });
    }

    columns
}

/// Split a column definition line into (name, type, constraint tail).
fn split_column_line(line: &str) -> Option<(&str, &str, &str)> {
    let line = line.trim_start();
    let name_end = line.find(char::is_whitespace)?;
    let (name, rest) = line.split_at(name_end);
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }
    let type_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let (sql_type, tail) = rest.split_at(type_end);
    Some((name, sql_type, tail.trim_start()))
}

/// Extract the raw expression following `DEFAULT`, if any.
///
/// Accepted forms: a single-quoted literal (honoring `\'` escapes), a number,
/// an identifier with an optional balanced argument list, or a bare balanced
/// parenthesized expression. Anything else yields no default.
fn parse_default(tail: &str) -> Option<String> {
    let default_re = Regex::new(r"(?i)\bDEFAULT\b").unwrap();
    let m = default_re.find(tail)?;
    let expr = tail[m.end()..].trim_start();
    parse_default_expr(expr)
}

fn parse_default_expr(expr: &str) -> Option<String> {
    let first = expr.chars().next()?;

    if first == '\'' {
        let mut prev_backslash = false;
        for (i, c) in expr.char_indices().skip(1) {
            if prev_backslash {
                prev_backslash = false;
                continue;
            }
            match c {
                '\\' => prev_backslash = true,
                '\'' => return Some(expr[..=i].to_string()),
                _ => {}
            }
        }
        return None;
    }

    if first == '-' || first.is_ascii_digit() {
        let num_re = Regex::new(r"^-?\d+(\.\d+)?").unwrap();
        return num_re.find(expr).map(|m| m.as_str().to_string());
    }

    if first == '(' {
        let close = balanced_paren_end(expr, 0)?;
        return Some(expr[..=close].to_string());
    }

    if first.is_ascii_alphabetic() || first == '_' {
        let end = expr
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(expr.len());
        if expr[end..].starts_with('(') {
            let close = balanced_paren_end(expr, end)?;
            return Some(expr[..=close].to_string());
        }
        return Some(expr[..end].to_string());
    }

    None
}

/// Apply a table-level `PRIMARY KEY (...)` declaration: a single listed
/// column becomes the primary key; multiple columns mark none (compound PK).
fn apply_table_primary_key(body: &str, columns: &mut [ColumnSchema]) {
    let pk_re = Regex::new(r"(?i)PRIMARY\s+KEY\s*\(([^)]*)\)").unwrap();
    let Some(caps) = pk_re.captures(body) else {
        return;
    };

    let cols: Vec<&str> = caps[1]
        .split(',')
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();

    if cols.len() == 1 {
        if let Some(col) = columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(cols[0]))
        {
            col.primary_key = true;
            col.nullable = false;
        }
    }
}

fn parse_indexes(files: &[(PathBuf, String)], table: &str) -> Vec<IndexSchema> {
    let index_re = Regex::new(&format!(
        r"(?i)CREATE\s+(UNIQUE\s+)?INDEX\s+(\w+)\s+ON\s+{}\s*\(([^)]*)\)",
        regex::escape(table)
    ))
    .expect("static index pattern");

    // Keyed by index name; later files overwrite earlier declarations.
    let mut indexes: BTreeMap<String, IndexSchema> = BTreeMap::new();
    for (_, content) in files {
        for caps in index_re.captures_iter(content) {
            let name = caps[2].to_string();
            let columns: Vec<String> = caps[3]
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
            indexes.insert(
                name.clone(),
                IndexSchema {
                    name,
                    columns,
                    unique: caps.get(1).is_some(),
                },
            );
        }
    }

    indexes.into_values().collect()
}

fn parse_foreign_keys(files: &[(PathBuf, String)], table: &str) -> Vec<ForeignKeySchema> {
    let fk_re = Regex::new(&format!(
        r"(?i)ALTER\s+TABLE\s+{}\s+ADD\s+CONSTRAINT\s+\w+\s+FOREIGN\s+KEY\s*\(\s*(\w+)\s*\)\s*REFERENCES\s+(\w+)\s*\(\s*(\w+)\s*\)\s*ON\s+DELETE\s+(CASCADE|SET\s+NULL|RESTRICT|NO\s+ACTION)",
        regex::escape(table)
    ))
    .expect("static foreign-key pattern");

    // Keyed by constrained column; later files overwrite earlier ones.
    let mut fks: BTreeMap<String, ForeignKeySchema> = BTreeMap::new();
    for (_, content) in files {
        for caps in fk_re.captures_iter(content) {
            let action = caps[4].split_whitespace().collect::<Vec<_>>().join(" ");
            let on_delete = match action.parse::<FkAction>() {
                Ok(action) => action,
                Err(e) => {
                    warn!("skipping foreign key with {}", e);
                    continue;
                }
            };
            fks.insert(
                caps[1].to_string(),
                ForeignKeySchema {
                    column: caps[1].to_string(),
                    referenced_table: caps[2].to_string(),
                    referenced_column: caps[3].to_string(),
                    on_delete,
                    constraint_name: None,
                },
            );
        }
    }

    fks.into_values().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_simple_create_table() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V202401010000001000__create_users_table.sql",
            "-- HASH: abc\nCREATE TABLE users (\n    id BIGSERIAL PRIMARY KEY,\n    email VARCHAR(255) NOT NULL UNIQUE,\n    active BOOLEAN DEFAULT true\n);\n",
        );

        let schema = SqlExtractor::load_table_schema(tmp.path(), "users").unwrap();
        assert_eq!(schema.columns.len(), 3);

        let id = schema.column("id").unwrap();
        assert!(id.primary_key);
        assert!(!id.nullable);

        let email = schema.column("email").unwrap();
        assert!(email.unique);
        assert!(!email.nullable);
        assert!(!email.primary_key);

        let active = schema.column("active").unwrap();
        assert_eq!(active.default_value.as_deref(), Some("true"));
        assert!(active.nullable);
    }

    #[test]
    fn test_missing_table_returns_none() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "V1__x.sql", "CREATE TABLE others ( id INT );");
        assert!(SqlExtractor::load_table_schema(tmp.path(), "users").is_none());
    }

    #[test]
    fn test_table_name_prefix_does_not_match() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "V1__x.sql", "CREATE TABLE users_archive (\n id INT\n);");
        assert!(SqlExtractor::load_table_schema(tmp.path(), "users").is_none());
    }

    #[test]
    fn test_newest_create_file_wins() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V202401010000001000__create_users_table.sql",
            "CREATE TABLE users (\n id INT\n);",
        );
        write_file(
            tmp.path(),
            "V202402020000001000__create_users_table.sql",
            "CREATE TABLE users (\n id BIGINT\n);",
        );

        let schema = SqlExtractor::load_table_schema(tmp.path(), "users").unwrap();
        assert_eq!(schema.column("id").unwrap().sql_type, "BIGINT");
    }

    #[test]
    fn test_comments_and_blank_lines_ignored() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "-- create_users_table\n-- Entity: User\nCREATE TABLE users (\n\n    -- the key\n    id UUID PRIMARY KEY DEFAULT public.uuid_generate_v7(),\n    name VARCHAR(100)\n);",
        );

        let schema = SqlExtractor::load_table_schema(tmp.path(), "users").unwrap();
        assert_eq!(schema.columns.len(), 2);
        assert_eq!(
            schema.column("id").unwrap().default_value.as_deref(),
            Some("public.uuid_generate_v7()")
        );
    }

    #[test]
    fn test_trailing_comma_before_close() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "CREATE TABLE users (\n    id INT,\n    name VARCHAR(100),\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "users").unwrap();
        assert_eq!(schema.columns.len(), 2);
    }

    #[test]
    fn test_if_not_exists_and_case_variation() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "create table if not exists users (\n    id int primary key\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "users").unwrap();
        assert!(schema.column("id").unwrap().primary_key);
    }

    #[test]
    fn test_default_quoted_literal() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "CREATE TABLE jobs (\n    status VARCHAR(50) NOT NULL DEFAULT 'PENDING',\n    note VARCHAR(50) DEFAULT 'it\\'s fine'\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "jobs").unwrap();
        assert_eq!(
            schema.column("status").unwrap().default_value.as_deref(),
            Some("'PENDING'")
        );
        assert_eq!(
            schema.column("note").unwrap().default_value.as_deref(),
            Some("'it\\'s fine'")
        );
    }

    #[test]
    fn test_default_numbers() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "CREATE TABLE prices (\n    amount DECIMAL(19,2) DEFAULT 0.00,\n    offset_val INT DEFAULT -5\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "prices").unwrap();
        assert_eq!(
            schema.column("amount").unwrap().default_value.as_deref(),
            Some("0.00")
        );
        assert_eq!(
            schema.column("offset_val").unwrap().default_value.as_deref(),
            Some("-5")
        );
    }

    #[test]
    fn test_default_bare_parenthesized() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "CREATE TABLE users (\n    id CHAR(36) PRIMARY KEY DEFAULT (UUID())\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "users").unwrap();
        assert_eq!(
            schema.column("id").unwrap().default_value.as_deref(),
            Some("(UUID())")
        );
    }

    #[test]
    fn test_default_identifier_without_args() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "CREATE TABLE logs (\n    created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP NOT NULL\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "logs").unwrap();
        let col = schema.column("created_at").unwrap();
        assert_eq!(col.default_value.as_deref(), Some("CURRENT_TIMESTAMP"));
        assert!(!col.nullable);
    }

    #[test]
    fn test_default_unrecognized_yields_none() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "CREATE TABLE odd (\n    x INT DEFAULT @weird\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "odd").unwrap();
        assert!(schema.column("x").unwrap().default_value.is_none());
    }

    #[test]
    fn test_single_column_table_pk_constraint() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "CREATE TABLE users (\n    id BIGINT NOT NULL,\n    email VARCHAR(255),\n    PRIMARY KEY (id)\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "users").unwrap();
        let id = schema.column("id").unwrap();
        assert!(id.primary_key);
        assert!(!id.nullable);
    }

    #[test]
    fn test_compound_pk_marks_no_column() {
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "CREATE TABLE link (\n    a BIGINT NOT NULL,\n    b BIGINT NOT NULL,\n    PRIMARY KEY (a, b)\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "link").unwrap();
        assert!(schema.columns.iter().all(|c| !c.primary_key));
    }

    #[test]
    fn test_indexes_collected_across_files() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "V1__create.sql", "CREATE TABLE users (\n id INT\n);");
        write_file(
            tmp.path(),
            "V2__add_indexes.sql",
            "CREATE INDEX idx_users_email ON users (email);\nCREATE UNIQUE INDEX uq_users_name ON users (name, tenant);\nCREATE INDEX idx_other ON posts (author);",
        );

        let schema = SqlExtractor::load_table_schema(tmp.path(), "users").unwrap();
        assert_eq!(schema.indexes.len(), 2);
        let uq = schema.indexes.iter().find(|i| i.name == "uq_users_name").unwrap();
        assert!(uq.unique);
        assert_eq!(uq.columns, vec!["name".to_string(), "tenant".to_string()]);
    }

    #[test]
    fn test_index_deduplicated_by_name_last_file_wins() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "V1__create.sql", "CREATE TABLE users (\n id INT\n);");
        write_file(
            tmp.path(),
            "V2__add_indexes.sql",
            "CREATE INDEX idx_users_email ON users (email);",
        );
        write_file(
            tmp.path(),
            "V3__alter.sql",
            "CREATE UNIQUE INDEX idx_users_email ON users (email);",
        );

        let schema = SqlExtractor::load_table_schema(tmp.path(), "users").unwrap();
        assert_eq!(schema.indexes.len(), 1);
        assert!(schema.indexes[0].unique);
    }

    #[test]
    fn test_foreign_keys_collected() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "V1__create.sql", "CREATE TABLE orders (\n customer_id BIGINT\n);");
        write_file(
            tmp.path(),
            "V2__add_foreign_keys.sql",
            "ALTER TABLE orders ADD CONSTRAINT fk_orders_customer_id FOREIGN KEY (customer_id) REFERENCES customers(id) ON DELETE SET NULL;",
        );

        let schema = SqlExtractor::load_table_schema(tmp.path(), "orders").unwrap();
        assert_eq!(schema.foreign_keys.len(), 1);
        let fk = &schema.foreign_keys[0];
        assert_eq!(fk.column, "customer_id");
        assert_eq!(fk.referenced_table, "customers");
        assert_eq!(fk.referenced_column, "id");
        assert_eq!(fk.on_delete, FkAction::SetNull);
        assert!(fk.constraint_name.is_none());
    }

    #[test]
    fn test_unbalanced_parens_returns_none() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "V1__create.sql", "CREATE TABLE users (\n id INT");
        assert!(SqlExtractor::load_table_schema(tmp.path(), "users").is_none());
    }

    #[test]
    fn test_existing_tables_union() {
        let tmp = TempDir::new().unwrap();
        write_file(tmp.path(), "V1__create.sql", "CREATE TABLE Users (\n id INT\n);");
        write_file(
            tmp.path(),
            "V2__fk.sql",
            "ALTER TABLE orders ADD CONSTRAINT fk FOREIGN KEY (u) REFERENCES users(id) ON DELETE CASCADE;",
        );
        write_file(tmp.path(), "V3__idx.sql", "CREATE INDEX i ON audit_log (at);");
        write_file(tmp.path(), "notes.txt", "CREATE TABLE ignored (x INT);");

        let tables = SqlExtractor::existing_tables(tmp.path());
        assert_eq!(
            tables.into_iter().collect::<Vec<_>>(),
            vec!["audit_log", "orders", "users"]
        );
    }

    #[test]
    fn test_existing_tables_missing_dir_is_empty() {
        let tables = SqlExtractor::existing_tables(Path::new("/nonexistent/partition"));
        assert!(tables.is_empty());
    }

    #[test]
    fn test_default_parsing_of_quoted_with_paren() {
        // A quoted literal containing a paren must not break body balancing.
        let tmp = TempDir::new().unwrap();
        write_file(
            tmp.path(),
            "V1__create.sql",
            "CREATE TABLE notes (\n    tag VARCHAR(20) DEFAULT 'a(b'\n);",
        );
        let schema = SqlExtractor::load_table_schema(tmp.path(), "notes").unwrap();
        assert_eq!(schema.column("tag").unwrap().default_value.as_deref(), Some("'a(b'"));
    }
}
