use tracing::debug;

use super::parser::SqlParser;
use super::planner::QueryPlanner;
use crate::error::QueryError;
use crate::rest::{Row, TableBackend};

/// Rows produced by one statement, always an array (possibly empty).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub rows: Vec<Row>,
}

/// Executes SQL statements against a table backend.
///
/// Each call is parse, plan, one backend round-trip. The executor holds no
/// state between calls, so concurrent queries share nothing but the
/// backend's own connection handling.
pub struct QueryExecutor<B: TableBackend> {
    backend: B,
    parser: SqlParser,
    planner: QueryPlanner,
}

impl<B: TableBackend> QueryExecutor<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            parser: SqlParser::new(),
            planner: QueryPlanner::new(),
        }
    }

    /// Run one parameterized statement and return its rows.
    ///
    /// Mutations without RETURNING still execute; their `rows` come back
    /// empty because the backend was asked for a minimal response.
    pub async fn query(
        &self,
        sql: &str,
        params: &[serde_json::Value],
    ) -> Result<QueryOutput, QueryError> {
        let statement = self.parser.parse(sql, params)?;
        debug!(kind = %statement.kind(), table = %statement.table(), "executing statement");

        let request = self.planner.plan(statement);
        let rows = self.backend.execute(request).await?;
        Ok(QueryOutput { rows })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::{Action, BackendError, FilterOp, TableRequest};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records every request and answers like the real backend: canned
    /// rows for selects and returning mutations, nothing otherwise.
    struct RecordingBackend {
        requests: Mutex<Vec<TableRequest>>,
        rows: Vec<Row>,
        error: Option<BackendError>,
    }

    impl RecordingBackend {
        fn with_rows(rows: Vec<Row>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                rows,
                error: None,
            }
        }

        fn failing(error: BackendError) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                rows: Vec::new(),
                error: Some(error),
            }
        }

        fn last_request(&self) -> TableRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl TableBackend for RecordingBackend {
        async fn execute(&self, request: TableRequest) -> Result<Vec<Row>, BackendError> {
            let respond = !request.is_mutation() || request.returning;
            self.requests.lock().unwrap().push(request);
            if let Some(error) = &self.error {
                return Err(error.clone());
            }
            if respond {
                Ok(self.rows.clone())
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_select_with_filter_and_order() {
        let rows = vec![row(&[("id", json!(1)), ("gender", json!("male"))])];
        let executor = QueryExecutor::new(RecordingBackend::with_rows(rows.clone()));

        let output = executor
            .query(
                "SELECT * FROM hair_styles WHERE gender = $1 ORDER BY sort_order ASC",
                &[json!("male")],
            )
            .await
            .unwrap();

        assert_eq!(output.rows, rows);

        let request = executor.backend.last_request();
        assert_eq!(request.table, "hair_styles");
        assert_eq!(request.action, Action::Select);
        assert_eq!(request.filters.len(), 1);
        assert_eq!(request.filters[0].column, "gender");
        assert_eq!(request.filters[0].op, FilterOp::Eq);
        assert_eq!(request.filters[0].value, json!("male"));
        assert!(request.order[0].ascending);
        assert_eq!(request.limit, None);
    }

    #[tokio::test]
    async fn test_insert_with_default_and_returning() {
        let inserted = vec![row(&[
            ("color_name", json!("Copper")),
            ("gender", json!("female")),
            ("sort_order", json!(12)),
        ])];
        let executor = QueryExecutor::new(RecordingBackend::with_rows(inserted.clone()));

        let output = executor
            .query(
                "INSERT INTO hair_colors (color_name, gender, sort_order) VALUES ($1, $2, DEFAULT) RETURNING *",
                &[json!("Copper"), json!("female")],
            )
            .await
            .unwrap();

        assert_eq!(output.rows, inserted);

        let request = executor.backend.last_request();
        match &request.action {
            Action::Insert(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].get("color_name"), Some(&json!("Copper")));
                assert_eq!(rows[0].get("gender"), Some(&json!("female")));
                assert!(!rows[0].contains_key("sort_order"));
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert!(request.returning);
    }

    #[tokio::test]
    async fn test_update_without_returning_yields_no_rows() {
        // The backend would have rows to give back, but without RETURNING
        // the mutation asks for a minimal response
        let executor = QueryExecutor::new(RecordingBackend::with_rows(vec![row(&[(
            "id",
            json!(5),
        )])]));

        let output = executor
            .query(
                "UPDATE hair_styles SET is_premium = $1 WHERE id = $2",
                &[json!(true), json!(5)],
            )
            .await
            .unwrap();

        assert_eq!(output.rows, Vec::<Row>::new());

        let request = executor.backend.last_request();
        match &request.action {
            Action::Update(patch) => {
                assert_eq!(patch.get("is_premium"), Some(&json!(true)));
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert_eq!(request.filters[0].column, "id");
        assert_eq!(request.filters[0].value, json!(5));
        assert!(!request.returning);
    }

    #[tokio::test]
    async fn test_delete_with_returning() {
        let deleted = vec![row(&[("id", json!("abc-123"))])];
        let executor = QueryExecutor::new(RecordingBackend::with_rows(deleted.clone()));

        let output = executor
            .query(
                "DELETE FROM face_analyses WHERE id = $1 RETURNING *",
                &[json!("abc-123")],
            )
            .await
            .unwrap();

        assert_eq!(output.rows, deleted);

        let request = executor.backend.last_request();
        assert_eq!(request.action, Action::Delete);
        assert_eq!(request.filters[0].value, json!("abc-123"));
        assert!(request.returning);
    }

    #[tokio::test]
    async fn test_aggregate_projection_degrades_to_star() {
        let executor = QueryExecutor::new(RecordingBackend::with_rows(Vec::new()));

        let output = executor
            .query("SELECT name, COUNT(*) as total FROM apps GROUP BY name", &[])
            .await
            .unwrap();

        assert!(output.rows.is_empty());

        let request = executor.backend.last_request();
        // Derived columns disable the projection rather than mis-projecting
        assert_eq!(request.columns, None);
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let executor = QueryExecutor::new(RecordingBackend::with_rows(Vec::new()));
        let output = executor
            .query("SELECT * FROM apps WHERE id = 999", &[])
            .await
            .unwrap();
        assert_eq!(output.rows, Vec::<Row>::new());
    }

    #[tokio::test]
    async fn test_backend_error_propagates_unchanged() {
        let executor = QueryExecutor::new(RecordingBackend::failing(BackendError::Api {
            status: 409,
            code: Some("23505".to_string()),
            message: "duplicate key value".to_string(),
            details: None,
            hint: None,
        }));

        let err = executor
            .query("DELETE FROM apps WHERE id = $1", &[json!(1)])
            .await
            .unwrap_err();

        match err {
            QueryError::Backend(BackendError::Api { code, message, .. }) => {
                assert_eq!(code.as_deref(), Some("23505"));
                assert_eq!(message, "duplicate key value");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_parse_errors_never_reach_the_backend() {
        let executor = QueryExecutor::new(RecordingBackend::with_rows(Vec::new()));
        let err = executor.query("DROP TABLE apps", &[]).await.unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedOperation(_)));
        assert!(executor.backend.requests.lock().unwrap().is_empty());
    }
}
