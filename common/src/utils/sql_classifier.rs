//! SQL statement classifier.
//!
//! Looks at the leading keyword of a statement, skipping whitespace and
//! comments, and splits a script on top-level semicolons. Nothing here
//! parses SQL; the database does that.

/// Coarse statement category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// SELECT, WITH, VALUES, TABLE, PRAGMA, SHOW, EXPLAIN.
    Read,
    /// INSERT, UPDATE, DELETE, REPLACE, MERGE, UPSERT.
    Write,
    /// CREATE, DROP, ALTER, TRUNCATE, ...
    Definition,
    /// Anything else (BEGIN, SET, VACUUM, ...).
    Other,
}

/// Classifies SQL statements by their leading keyword.
pub struct SqlClassifier;

const READ_KEYWORDS: [&str; 7] = ["SELECT", "WITH", "VALUES", "TABLE", "PRAGMA", "SHOW", "EXPLAIN"];
const WRITE_KEYWORDS: [&str; 6] = ["INSERT", "UPDATE", "DELETE", "REPLACE", "MERGE", "UPSERT"];
const DEFINITION_KEYWORDS: [&str; 6] = ["CREATE", "DROP", "ALTER", "TRUNCATE", "COMMENT", "RENAME"];

impl SqlClassifier {
    /// Returns the leading keyword in upper case, or an empty string.
    pub fn leading_keyword(sql: &str) -> String {
        skip_comments(sql)
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect::<String>()
            .to_uppercase()
    }

    /// Classifies the statement by its leading keyword.
    pub fn kind(sql: &str) -> StatementKind {
        let keyword = Self::leading_keyword(sql);
        let keyword = keyword.as_str();
        if READ_KEYWORDS.contains(&keyword) {
            StatementKind::Read
        } else if WRITE_KEYWORDS.contains(&keyword) {
            StatementKind::Write
        } else if DEFINITION_KEYWORDS.contains(&keyword) {
            StatementKind::Definition
        } else {
            StatementKind::Other
        }
    }

    /// Whether the statement may produce a result set, even an empty one.
    pub fn returns_rows(sql: &str) -> bool {
        match Self::kind(sql) {
            StatementKind::Read => true,
            StatementKind::Write => sql.to_uppercase().contains("RETURNING"),
            _ => false,
        }
    }

    /// Whether the text holds nothing but whitespace and comments.
    pub fn is_blank(sql: &str) -> bool {
        skip_comments(sql).is_empty()
    }

    /// Splits a script into its statements, trimmed, dropping blank ones.
    ///
    /// Semicolons inside quotes, comments and `$tag$` bodies do not split.
    pub fn split_statements(sql: &str) -> Vec<&str> {
        let bytes = sql.as_bytes();
        let mut pieces = Vec::new();
        let mut start = 0;
        let mut i = 0;
        while i < bytes.len() {
            i = match bytes[i] {
                quote @ (b'\'' | b'"' | b'`') => find_from(bytes, i + 1, &[quote])
                    .map_or(bytes.len(), |end| end + 1),
                b'-' if bytes.get(i + 1) == Some(&b'-') => {
                    find_from(bytes, i + 2, b"\n").map_or(bytes.len(), |end| end + 1)
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    find_from(bytes, i + 2, b"*/").map_or(bytes.len(), |end| end + 2)
                }
                b'$' => match dollar_tag_end(bytes, i) {
                    Some(tag_end) => {
                        let tag = &bytes[i..=tag_end];
                        find_from(bytes, tag_end + 1, tag).map_or(bytes.len(), |end| end + tag.len())
                    }
                    None => i + 1,
                },
                b';' => {
                    pieces.push(&sql[start..i]);
                    start = i + 1;
                    i + 1
                }
                _ => i + 1,
            };
        }
        pieces.push(&sql[start..]);
        pieces
            .into_iter()
            .map(str::trim)
            .filter(|piece| !Self::is_blank(piece))
            .collect()
    }

    /// The last statement of a script, or an empty string.
    pub fn last_statement(sql: &str) -> &str {
        Self::split_statements(sql).last().copied().unwrap_or("")
    }
}

fn find_from(bytes: &[u8], from: usize, pattern: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(pattern.len())
        .position(|window| window == pattern)
        .map(|pos| pos + from)
}

/// Index of the closing `$` of a dollar-quote tag starting at `start`.
///
/// `$1` style parameters are not tags.
fn dollar_tag_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut end = start + 1;
    while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_') {
        end += 1;
    }
    let tag_starts_with_digit = end > start + 1 && bytes[start + 1].is_ascii_digit();
    (end < bytes.len() && bytes[end] == b'$' && !tag_starts_with_digit).then_some(end)
}

/// Strips leading whitespace, `-- line` comments and `/* block */` comments.
fn skip_comments(mut sql: &str) -> &str {
    loop {
        sql = sql.trim_start();
        if let Some(rest) = sql.strip_prefix("--") {
            sql = rest.split_once('\n').map(|(_, tail)| tail).unwrap_or("");
        } else if let Some(rest) = sql.strip_prefix("/*") {
            sql = rest.split_once("*/").map(|(_, tail)| tail).unwrap_or("");
        } else {
            return sql;
        }
    }
}
