//! Lazy filter / sample / sort queries over one component parquet file.
//!
//! Nothing is read until [`ComponentQuery::count`] or
//! [`ComponentQuery::collect`] runs. Filter values are always bound
//! parameters; column names are quoted identifiers.

use std::path::{Path, PathBuf};

use duckdb::types::Value;
use duckdb::{Connection, params_from_iter};
use serde::Serialize;
use serde_json::{Map as JsonMap, Number, Value as JsonValue};

use crate::CubeError;

/// Query builder for a single component.
#[derive(Clone)]
pub struct ComponentQuery<'a> {
    conn: &'a Connection,
    path: PathBuf,
    columns: Vec<String>,
    filters: Vec<(String, String)>,
    sample: Option<usize>,
    sort_by: Option<String>,
}

impl<'a> ComponentQuery<'a> {
    pub(crate) fn new(conn: &'a Connection, path: PathBuf) -> Self {
        Self {
            conn,
            path,
            columns: Vec::new(),
            filters: Vec::new(),
            sample: None,
            sort_by: None,
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Restrict the output to `columns`, in this order.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Keep rows whose `column`, compared as text, equals `value`.
    #[must_use]
    pub fn filter_eq(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.push((column.into(), value.into()));
        self
    }

    /// Draw `n` rows uniformly at random from the filtered rows.
    #[must_use]
    pub const fn sample(mut self, n: usize) -> Self {
        self.sample = Some(n);
        self
    }

    /// Sort ascending by `column`, nulls last.
    #[must_use]
    pub fn sort_by(mut self, column: impl Into<String>) -> Self {
        self.sort_by = Some(column.into());
        self
    }

    /// Number of rows left after filtering (sampling is not applied).
    ///
    /// # Errors
    ///
    /// Returns [`CubeError::DuckDb`] if the parquet file cannot be scanned.
    pub fn count(&self) -> Result<usize, CubeError> {
        let sql = format!("SELECT count(*) FROM ({}) AS filtered", self.filtered_sql());
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(self.filter_values()), |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Column names of the component file.
    ///
    /// # Errors
    ///
    /// Returns [`CubeError::DuckDb`] if the parquet schema cannot be read.
    pub fn source_columns(&self) -> Result<Vec<String>, CubeError> {
        let sql = format!("DESCRIBE SELECT * FROM {}", self.scan_sql());
        let mut stmt = self.conn.prepare(&sql)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Run the query.
    ///
    /// # Errors
    ///
    /// Returns [`CubeError::SampleTooLarge`] when a sample of zero rows or of
    /// more rows than remain after filtering is requested, and
    /// [`CubeError::DuckDb`] for query failures.
    pub fn collect(&self) -> Result<Frame, CubeError> {
        let columns = if self.columns.is_empty() {
            self.source_columns()?
        } else {
            self.columns.clone()
        };

        let mut from = self.filtered_sql();
        if let Some(requested) = self.sample {
            let available = self.count()?;
            if requested == 0 || requested > available {
                return Err(CubeError::SampleTooLarge {
                    requested,
                    available,
                });
            }
            from = format!(
                "SELECT * FROM ({from}) AS filtered USING SAMPLE reservoir({requested} ROWS)"
            );
        }

        let select = columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ");
        let order = self
            .sort_by
            .as_deref()
            .map(|c| format!(" ORDER BY {} ASC NULLS LAST", quote_ident(c)))
            .unwrap_or_default();
        let sql = format!("SELECT {select} FROM ({from}) AS sampled{order}");
        tracing::debug!(%sql, "running component query");

        let width = columns.len();
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(self.filter_values()), |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i).map(to_json))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Frame { columns, rows })
    }

    fn scan_sql(&self) -> String {
        format!(
            "read_parquet('{}')",
            self.path.to_string_lossy().replace('\'', "''")
        )
    }

    fn filtered_sql(&self) -> String {
        let mut sql = format!("SELECT * FROM {}", self.scan_sql());
        for (i, (column, _)) in self.filters.iter().enumerate() {
            sql.push_str(if i == 0 { " WHERE " } else { " AND " });
            sql.push_str(&format!("CAST({} AS VARCHAR) = ?", quote_ident(column)));
        }
        sql
    }

    fn filter_values(&self) -> impl Iterator<Item = &str> {
        self.filters.iter().map(|(_, value)| value.as_str())
    }
}

/// Query result: named columns and row-major JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frame {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<JsonValue>>,
}

impl Frame {
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of one column, or `None` if the frame has no such column.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&JsonValue>> {
        let index = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|row| &row[index]).collect())
    }

    /// Rows as `{column: value}` objects.
    #[must_use]
    pub fn to_records(&self) -> Vec<JsonMap<String, JsonValue>> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_json(value: Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(b),
        Value::TinyInt(n) => n.into(),
        Value::SmallInt(n) => n.into(),
        Value::Int(n) => n.into(),
        Value::BigInt(n) => n.into(),
        Value::UTinyInt(n) => n.into(),
        Value::USmallInt(n) => n.into(),
        Value::UInt(n) => n.into(),
        Value::UBigInt(n) => n.into(),
        Value::HugeInt(n) => i64::try_from(n)
            .map_or_else(|_| JsonValue::String(n.to_string()), JsonValue::from),
        Value::Float(f) => float(f64::from(f)),
        Value::Double(f) => float(f),
        Value::Decimal(d) => d.to_string().parse().map_or(JsonValue::Null, float),
        Value::Text(s) => JsonValue::String(s),
        other => JsonValue::String(format!("{other:?}")),
    }
}

/// Non-finite floats have no JSON form.
fn float(f: f64) -> JsonValue {
    Number::from_f64(f).map_or(JsonValue::Null, JsonValue::Number)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("activity_drift"), "\"activity_drift\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }

    #[test]
    fn filters_become_bound_parameters() {
        let conn = Connection::open_in_memory().unwrap();
        let query = ComponentQuery::new(&conn, PathBuf::from("/cube/units.parquet"))
            .filter_eq("session_id", "S1")
            .filter_eq("structure", "MOp");

        assert_eq!(
            query.filtered_sql(),
            "SELECT * FROM read_parquet('/cube/units.parquet') \
             WHERE CAST(\"session_id\" AS VARCHAR) = ? AND CAST(\"structure\" AS VARCHAR) = ?"
        );
        assert_eq!(query.filter_values().collect::<Vec<_>>(), ["S1", "MOp"]);
    }

    #[test]
    fn path_quotes_are_escaped() {
        let conn = Connection::open_in_memory().unwrap();
        let query = ComponentQuery::new(&conn, PathBuf::from("/it's/units.parquet"));
        assert_eq!(query.scan_sql(), "read_parquet('/it''s/units.parquet')");
    }

    #[test]
    fn nan_becomes_null() {
        assert_eq!(to_json(Value::Double(f64::NAN)), JsonValue::Null);
        assert_eq!(to_json(Value::Double(0.25)), json!(0.25));
    }

    #[test]
    fn frame_records_and_columns() {
        let frame = Frame {
            columns: vec!["location".into(), "activity_drift".into()],
            rows: vec![vec![json!("A"), json!(0.1)], vec![json!("B"), json!(0.2)]],
        };

        assert_eq!(frame.len(), 2);
        assert_eq!(
            frame.column("activity_drift").unwrap(),
            vec![&json!(0.1), &json!(0.2)]
        );
        assert!(frame.column("missing").is_none());
        assert_eq!(
            frame.to_records()[1],
            json!({"location": "B", "activity_drift": 0.2})
                .as_object()
                .cloned()
                .unwrap()
        );
    }
}
