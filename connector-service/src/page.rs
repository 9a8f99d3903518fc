//! HTML page: the connection form, the result table and the message box.

use serde::Deserialize;
use serde_json::Value;

use common::models::{DbType, QueryResult, MEMORY_DATABASE};

const TITLE: &str = "SQL Connector";
pub const NO_RESULT_MESSAGE: &str = "There is no result for your query.";

const STYLE: &str = "
body { font-family: sans-serif; margin: 0; background: #f0f0f0; }
main { width: 700px; min-height: 500px; margin: 2em auto; padding: 20px; background: #fff;
       box-shadow: 0 1px 4px rgba(0,0,0,.2); box-sizing: border-box; }
form { display: grid; grid-template-columns: max-content 1fr max-content; gap: 20px; align-items: start; }
textarea { height: 8em; font-family: monospace; }
.launch { grid-column: 3; }
.result { margin-top: 20px; display: grid; grid-template-columns: max-content 1fr; gap: 20px; }
.grid { overflow: auto; max-height: 320px; border: 1px solid #ccc; }
table { border-collapse: collapse; width: 100%; }
th, td { border: 1px solid #ddd; padding: 2px 6px; text-align: left; white-space: nowrap; }
th { background: #eee; position: sticky; top: 0; }
td.null { color: #999; font-style: italic; }
.message { margin-top: 20px; padding: 12px; border: 1px solid #999; background: #fafafa; }
.message h2 { margin: 0 0 6px; font-size: 1em; }
.detail { font-family: monospace; font-size: .85em; color: #555; white-space: pre-wrap; }
.note { font-size: .85em; color: #555; }
";

/// Values submitted by the form.
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchForm {
    #[serde(default)]
    pub connection: String,
    #[serde(default)]
    pub db_type: String,
    #[serde(default)]
    pub query: String,
}

impl Default for LaunchForm {
    fn default() -> Self {
        Self {
            connection: MEMORY_DATABASE.to_string(),
            db_type: DbType::Sqlite3.to_string(),
            query: String::new(),
        }
    }
}

/// Text for the message box.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub detail: Option<String>,
}

impl Notice {
    pub fn new(message: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            message: message.into(),
            detail,
        }
    }
}

/// Renders the whole page.
pub fn render(form: &LaunchForm, result: Option<&QueryResult>, notice: Option<&Notice>) -> String {
    let mut body = render_form(form);
    if let Some(notice) = notice {
        body.push_str(&render_notice(notice));
    }
    if let Some(result) = result {
        body.push_str(&render_result(result));
    }

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{style}</style>\n</head>\n\
         <body>\n<main>\n<h1>{title}</h1>\n{body}</main>\n</body>\n</html>\n",
        title = TITLE,
        style = STYLE,
        body = body,
    )
}

fn render_form(form: &LaunchForm) -> String {
    let selected = form.db_type.parse::<DbType>().unwrap_or_default();
    let options: String = DbType::ALL
        .iter()
        .map(|db_type| {
            format!(
                "<option value=\"{value}\"{selected}>{value}</option>",
                value = db_type,
                selected = if *db_type == selected { " selected" } else { "" },
            )
        })
        .collect();

    format!(
        "<form method=\"post\" action=\"/\">\n\
         <label for=\"connection\">Connection</label>\n\
         <input id=\"connection\" name=\"connection\" type=\"text\" value=\"{connection}\">\n\
         <select name=\"db_type\" aria-label=\"Database type\">{options}</select>\n\
         <label for=\"query\">Query field</label>\n\
         <textarea id=\"query\" name=\"query\">{query}</textarea>\n\
         <span></span>\n\
         <button class=\"launch\" type=\"submit\">Launch</button>\n\
         </form>\n",
        connection = escape(&form.connection),
        options = options,
        query = escape(&form.query),
    )
}

fn render_notice(notice: &Notice) -> String {
    let detail = notice
        .detail
        .as_deref()
        .map(|d| format!("<div class=\"detail\">{}</div>", escape(d)))
        .unwrap_or_default();
    format!(
        "<div class=\"message\" role=\"alert\">\n<h2>Message</h2>\n<p>{}</p>\n{}</div>\n",
        escape(&notice.message),
        detail
    )
}

fn render_result(result: &QueryResult) -> String {
    let mut table = String::from("<table>\n");

    if let Some(headers) = result.headers() {
        table.push_str("<thead><tr>");
        for header in headers {
            table.push_str(&format!("<th>{}</th>", escape(header)));
        }
        table.push_str("</tr></thead>\n");
    }

    table.push_str("<tbody>\n");
    for row in &result.rows {
        table.push_str("<tr>");
        for value in row {
            table.push_str(&render_cell(value));
        }
        table.push_str("</tr>\n");
    }
    table.push_str("</tbody>\n</table>\n");

    let note = if result.truncated {
        format!(
            "<p class=\"note\">Showing the first {} rows.</p>\n",
            result.row_count
        )
    } else {
        String::new()
    };

    format!(
        "<section class=\"result\">\n<span>Result</span>\n<div>\n<div class=\"grid\">\n{}</div>\n{}\
         <p class=\"note\">{} ms</p>\n</div>\n</section>\n",
        table, note, result.execution_time_ms
    )
}

fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => "<td class=\"null\">NULL</td>".to_string(),
        Value::String(text) => format!("<td>{}</td>", escape(text)),
        other => format!("<td>{}</td>", escape(&other.to_string())),
    }
}

/// Escapes text for use in HTML content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::models::ColumnInfo;
    use serde_json::json;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_default_form() {
        let html = render(&LaunchForm::default(), None, None);
        assert!(html.contains("<title>SQL Connector</title>"));
        assert!(html.contains("value=\":memory:\""));
        assert!(html.contains("<option value=\"sqlite3\" selected>sqlite3</option>"));
        assert!(html.contains("<option value=\"postgres\">postgres</option>"));
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn test_form_keeps_submitted_values() {
        let form = LaunchForm {
            connection: "dbname=chinook".into(),
            db_type: "postgres".into(),
            query: "SELECT * FROM \"Artist\" WHERE 1 < 2".into(),
        };
        let html = render(&form, None, None);
        assert!(html.contains("value=\"dbname=chinook\""));
        assert!(html.contains("<option value=\"postgres\" selected>"));
        assert!(html.contains("SELECT * FROM &quot;Artist&quot; WHERE 1 &lt; 2"));
    }

    #[test]
    fn test_result_table() {
        let result = QueryResult {
            has_result_set: true,
            columns: vec![ColumnInfo::new("ArtistId", "INTEGER"), ColumnInfo::new("Name", "TEXT")],
            rows: vec![vec![json!(1), json!("AC/DC")], vec![json!(2), Value::Null]],
            row_count: 2,
            ..Default::default()
        };
        let html = render(&LaunchForm::default(), Some(&result), None);
        assert!(html.contains("<th>ArtistId</th><th>Name</th>"));
        assert!(html.contains("<tr><td>1</td><td>AC/DC</td></tr>"));
        assert!(html.contains("<td class=\"null\">NULL</td>"));
        assert!(!html.contains("Showing the first"));
    }

    #[test]
    fn test_notice_escapes_detail() {
        let notice = Notice::new("Error! Try to check your sql query.", Some("near \"<\"".into()));
        let html = render(&LaunchForm::default(), None, Some(&notice));
        assert!(html.contains("<h2>Message</h2>"));
        assert!(html.contains("Error! Try to check your sql query."));
        assert!(html.contains("near &quot;&lt;&quot;"));
    }
}
