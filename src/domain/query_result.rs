use serde::Serialize;

/// Rows returned by a single statement, in database order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<serde_json::Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Plain-text rendering used inside prompts: a header line followed by
    /// one tuple per row.
    pub fn render(&self) -> String {
        if self.is_empty() {
            return "(no rows)".to_string();
        }

        let mut out = String::new();
        if !self.columns.is_empty() {
            out.push_str(&format!("columns: ({})\n", self.columns.join(", ")));
        }
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(render_scalar).collect();
            out.push_str(&format!("({})\n", cells.join(", ")));
        }
        out.trim_end().to_string()
    }
}

fn render_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => "NULL".to_string(),
        serde_json::Value::String(s) => format!("'{}'", s),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_rows() {
        let result = QueryResult::new(
            vec!["model_name".to_string(), "mae".to_string()],
            vec![vec![json!("arima"), json!(0.25)], vec![json!(null), json!(3)]],
        );
        assert_eq!(
            result.render(),
            "columns: (model_name, mae)\n('arima', 0.25)\n(NULL, 3)"
        );
        assert_eq!(result.row_count(), 2);
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(QueryResult::default().render(), "(no rows)");
    }
}
