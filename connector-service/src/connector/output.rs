//! Output of a statement run.

use serde_json::Value;

use common::errors::AppResult;
use common::models::{ColumnInfo, QueryResult};
use common::utils::SqlClassifier;

/// Columns, rows and affected-row count of the last statement run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StatementOutput {
    /// Column descriptions; `None` when the statement described no result set.
    pub columns: Option<Vec<ColumnInfo>>,
    /// Kept rows, at most the row limit.
    pub rows: Vec<Vec<Value>>,
    /// Rows the statement produced, including dropped ones.
    pub total_rows: usize,
    /// Rows changed by a statement without a result set.
    pub affected_rows: Option<u64>,
}

impl StatementOutput {
    /// Sets the headers recovered after the fact for an empty result set.
    pub fn describe(&mut self, columns: Vec<ColumnInfo>) {
        if self.columns.is_none() && !columns.is_empty() {
            self.columns = Some(columns);
            self.affected_rows = None;
        }
    }

    pub fn into_result(self, statement: String, execution_time_ms: u64) -> QueryResult {
        let has_result_set = self.columns.is_some();
        QueryResult {
            has_result_set,
            columns: self.columns.unwrap_or_default(),
            row_count: self.rows.len(),
            truncated: self.total_rows > self.rows.len(),
            rows: self.rows,
            affected_rows: self.affected_rows,
            execution_time_ms,
            statement,
        }
    }
}

/// Accumulates rows while a multi-statement stream is drained.
///
/// Only the last completed statement is kept.
pub(super) struct OutputCollector {
    max_rows: usize,
    current: StatementOutput,
    last: Option<StatementOutput>,
    statements: usize,
}

impl OutputCollector {
    pub(super) fn new(max_rows: usize) -> Self {
        Self {
            max_rows,
            current: StatementOutput::default(),
            last: None,
            statements: 0,
        }
    }

    /// Number of statements the driver reported as completed.
    pub(super) fn statements(&self) -> usize {
        self.statements
    }

    pub(super) fn push_row<C, V>(&mut self, columns: C, values: V) -> AppResult<()>
    where
        C: FnOnce() -> Vec<ColumnInfo>,
        V: FnOnce() -> AppResult<Vec<Value>>,
    {
        if self.current.columns.is_none() {
            self.current.columns = Some(columns());
        }
        self.current.total_rows += 1;
        if self.current.rows.len() < self.max_rows {
            self.current.rows.push(values()?);
        }
        Ok(())
    }

    pub(super) fn finish_statement(&mut self, rows_affected: u64) {
        let mut done = std::mem::take(&mut self.current);
        if done.columns.is_none() {
            done.affected_rows = Some(rows_affected);
        }
        self.last = Some(done);
        self.statements += 1;
    }

    pub(super) fn finish(self) -> StatementOutput {
        if self.current.columns.is_some() {
            return self.current;
        }
        self.last.unwrap_or_default()
    }
}

/// Renders binary data as an SQL hex literal, `x'..'`.
pub(super) fn hex_literal(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2 + 3);
    out.push_str("x'");
    for byte in bytes {
        out.push_str(&format!("{:02x}", byte));
    }
    out.push('\'');
    out
}

/// The statement to prepare for the headers of an empty result set.
///
/// That is the last statement of `query`, and only when the script split
/// into exactly as many statements as the driver completed. Otherwise the
/// prepared statement might not be the one whose output was kept.
pub(super) fn header_recovery_target<'q>(
    query: &'q str,
    completed: usize,
    output: &StatementOutput,
) -> Option<&'q str> {
    if output.columns.is_some() {
        return None;
    }
    let statements = SqlClassifier::split_statements(query);
    match statements.last() {
        Some(&last) if statements.len() == completed && SqlClassifier::returns_rows(last) => Some(last),
        _ => None,
    }
}

/// Converts a float to a JSON number; `None` for NaN and infinities.
pub(super) fn float_value(value: f64) -> Option<Value> {
    serde_json::Number::from_f64(value).map(Value::Number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn columns() -> Vec<ColumnInfo> {
        vec![ColumnInfo::new("n", "INTEGER")]
    }

    #[test]
    fn test_last_statement_wins() {
        let mut collector = OutputCollector::new(10);
        collector.finish_statement(0);
        collector.push_row(columns, || Ok(vec![json!(1)])).unwrap();
        collector.finish_statement(0);
        collector.finish_statement(4);

        let output = collector.finish();
        assert!(output.columns.is_none());
        assert_eq!(output.affected_rows, Some(4));
    }

    #[test]
    fn test_rows_past_limit_are_counted_not_kept() {
        let mut collector = OutputCollector::new(2);
        for n in 0..5 {
            collector.push_row(columns, || Ok(vec![json!(n)])).unwrap();
        }
        collector.finish_statement(0);

        let result = collector.finish().into_result("SELECT".into(), 3);
        assert!(result.has_result_set);
        assert_eq!(result.row_count, 2);
        assert!(result.truncated);
        assert_eq!(result.rows, vec![vec![json!(0)], vec![json!(1)]]);
        assert!(result.affected_rows.is_none());
    }

    #[test]
    fn test_describe_only_fills_missing_columns() {
        let mut output = StatementOutput {
            affected_rows: Some(0),
            ..Default::default()
        };
        output.describe(columns());
        assert_eq!(output.columns, Some(columns()));
        assert!(output.affected_rows.is_none());

        output.describe(vec![ColumnInfo::new("other", "TEXT")]);
        assert_eq!(output.columns, Some(columns()));
    }

    #[test]
    fn test_hex_and_float_rendering() {
        assert_eq!(hex_literal(&[0x00, 0xab, 0x10]), "x'00ab10'");
        assert_eq!(float_value(1.5), Some(json!(1.5)));
        assert_eq!(float_value(f64::NAN), None);
        assert_eq!(float_value(f64::NEG_INFINITY), None);
    }

    #[test]
    fn test_collector_counts_completed_statements() {
        let mut collector = OutputCollector::new(10);
        collector.finish_statement(0);
        collector.push_row(columns, || Ok(vec![json!(1)])).unwrap();
        collector.finish_statement(0);
        assert_eq!(collector.statements(), 2);
    }

    #[test]
    fn test_headers_are_recovered_for_the_last_statement_only() {
        let empty = StatementOutput {
            affected_rows: Some(0),
            ..Default::default()
        };
        let query = "CREATE TABLE t (a INTEGER); SELECT a FROM t;";
        assert_eq!(header_recovery_target(query, 2, &empty), Some("SELECT a FROM t"));

        // The kept output belongs to the DELETE, which has no result set.
        assert_eq!(header_recovery_target("SELECT 1 AS x; DELETE FROM t", 2, &empty), None);

        // A split that disagrees with the driver cannot be trusted.
        assert_eq!(header_recovery_target(query, 1, &empty), None);

        let described = StatementOutput {
            columns: Some(columns()),
            ..Default::default()
        };
        assert_eq!(header_recovery_target("SELECT n FROM t", 1, &described), None);
    }
}
