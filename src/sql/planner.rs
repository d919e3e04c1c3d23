// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Planner mapping parsed statements onto table requests.
//!
//! Each statement kind carries a fixed WHERE operator surface; a condition
//! outside that surface is dropped from the filter chain (with a warning)
//! rather than applied. The surfaces are kept in one table per kind.

use tracing::warn;

use super::ast::{Condition, Operator, Projection, Statement, StatementKind};
use crate::rest::{FilterOp, TableRequest};

/// WHERE operators a SELECT may push to the backend
const SELECT_WHERE_OPS: &[Operator] = &[
    Operator::Eq,
    Operator::Ne,
    Operator::Lt,
    Operator::Le,
    Operator::Gt,
    Operator::Ge,
    Operator::Like,
    Operator::In,
];

/// WHERE operators an UPDATE may push to the backend
const UPDATE_WHERE_OPS: &[Operator] = &[Operator::Eq, Operator::Ne];

/// WHERE operators a DELETE may push to the backend
const DELETE_WHERE_OPS: &[Operator] = &[Operator::Eq];

/// The WHERE operator surface for a statement kind
fn where_surface(kind: StatementKind) -> &'static [Operator] {
    match kind {
        StatementKind::Select => SELECT_WHERE_OPS,
        StatementKind::Update => UPDATE_WHERE_OPS,
        StatementKind::Delete => DELETE_WHERE_OPS,
        // INSERT has no WHERE clause
        StatementKind::Insert => &[],
    }
}

fn filter_op(operator: Operator) -> FilterOp {
    match operator {
        Operator::Eq => FilterOp::Eq,
        Operator::Ne => FilterOp::Neq,
        Operator::Lt => FilterOp::Lt,
        Operator::Le => FilterOp::Lte,
        Operator::Gt => FilterOp::Gt,
        Operator::Ge => FilterOp::Gte,
        Operator::Like => FilterOp::Like,
        Operator::In => FilterOp::In,
    }
}

pub struct QueryPlanner;

impl QueryPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Turn a parsed statement into the single table request that
    /// implements it.
    pub fn plan(&self, statement: Statement) -> TableRequest {
        let kind = statement.kind();
        match statement {
            Statement::Select(select) => {
                let mut request = TableRequest::select(select.table);
                if let Projection::Columns(columns) = select.projection {
                    request = request.columns(columns);
                }
                request = self.apply_conditions(request, kind, select.conditions);
                for term in select.order_by {
                    request = request.order(term.column, !term.descending);
                }
                if let Some(limit) = select.limit {
                    request = request.limit(limit);
                }
                request
            }
            Statement::Insert(insert) => {
                TableRequest::insert(insert.table, insert.rows).returning(insert.returning)
            }
            Statement::Update(update) => {
                let request = TableRequest::update(update.table, update.assignments)
                    .returning(update.returning);
                self.apply_conditions(request, kind, update.conditions)
            }
            Statement::Delete(delete) => {
                let request = TableRequest::delete(delete.table).returning(delete.returning);
                self.apply_conditions(request, kind, delete.conditions)
            }
        }
    }

    fn apply_conditions(
        &self,
        mut request: TableRequest,
        kind: StatementKind,
        conditions: Vec<Condition>,
    ) -> TableRequest {
        let surface = where_surface(kind);
        for condition in conditions {
            if !surface.contains(&condition.operator) {
                warn!(
                    statement = %kind,
                    column = %condition.column,
                    operator = %condition.operator,
                    "condition outside the {kind} WHERE surface, dropping"
                );
                continue;
            }
            request = request.filter(
                condition.column,
                filter_op(condition.operator),
                condition.value,
            );
        }
        request
    }
}

impl Default for QueryPlanner {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::Action;
    use crate::sql::SqlParser;
    use serde_json::json;

    fn plan(sql: &str, params: &[serde_json::Value]) -> TableRequest {
        let statement = SqlParser::new().parse(sql, params).unwrap();
        QueryPlanner::new().plan(statement)
    }

    #[test]
    fn test_select_keeps_all_operators() {
        let request = plan(
            "SELECT * FROM t WHERE a = 1 AND b != 2 AND c > 3 AND d < 4 AND e >= 5 AND f <= 6 AND g LIKE 'x%' AND h IN (1, 2)",
            &[],
        );
        let ops: Vec<FilterOp> = request.filters.iter().map(|f| f.op).collect();
        assert_eq!(
            ops,
            vec![
                FilterOp::Eq,
                FilterOp::Neq,
                FilterOp::Gt,
                FilterOp::Lt,
                FilterOp::Gte,
                FilterOp::Lte,
                FilterOp::Like,
                FilterOp::In
            ]
        );
    }

    #[test]
    fn test_update_where_narrows_to_eq_and_neq() {
        let request = plan(
            "UPDATE t SET a = 1 WHERE b = 2 AND c != 3 AND d > 4 AND e LIKE 'x%'",
            &[],
        );
        // The gt and like conditions must not reach the backend at all
        let pushed: Vec<(&str, FilterOp)> = request
            .filters
            .iter()
            .map(|f| (f.column.as_str(), f.op))
            .collect();
        assert_eq!(pushed, vec![("b", FilterOp::Eq), ("c", FilterOp::Neq)]);
    }

    #[test]
    fn test_delete_where_narrows_to_eq() {
        let request = plan("DELETE FROM t WHERE a = 1 AND b != 2 AND c > 3", &[]);
        let pushed: Vec<(&str, FilterOp)> = request
            .filters
            .iter()
            .map(|f| (f.column.as_str(), f.op))
            .collect();
        assert_eq!(pushed, vec![("a", FilterOp::Eq)]);
    }

    #[test]
    fn test_dropped_condition_still_consumed_its_parameter() {
        // $1 feeds the dropped gt condition, $2 the kept eq; consumption
        // order is source order regardless of the drop
        let request = plan(
            "UPDATE t SET a = 'x' WHERE b > $1 AND c = $2",
            &[json!(10), json!(20)],
        );
        assert_eq!(request.filters.len(), 1);
        assert_eq!(request.filters[0].column, "c");
        assert_eq!(request.filters[0].value, json!(20));
    }

    #[test]
    fn test_select_plan_shape() {
        let request = plan(
            "SELECT id, style_name FROM hair_styles WHERE gender = $1 ORDER BY sort_order DESC LIMIT 10",
            &[json!("female")],
        );
        assert_eq!(request.action, Action::Select);
        assert_eq!(
            request.columns,
            Some(vec!["id".to_string(), "style_name".to_string()])
        );
        assert_eq!(request.filters[0].value, json!("female"));
        assert!(!request.order[0].ascending);
        assert_eq!(request.limit, Some(10));
    }

    #[test]
    fn test_insert_plan_carries_rows_and_returning() {
        let request = plan(
            "INSERT INTO apps (name) VALUES ($1) RETURNING *",
            &[json!("Solver")],
        );
        match &request.action {
            Action::Insert(rows) => {
                assert_eq!(rows.len(), 1);
                assert_eq!(rows[0].get("name"), Some(&json!("Solver")));
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert!(request.returning);
        assert!(request.filters.is_empty());
    }

    #[test]
    fn test_update_plan_carries_patch() {
        let request = plan(
            "UPDATE hair_styles SET is_premium = $1 WHERE id = $2",
            &[json!(true), json!(5)],
        );
        match &request.action {
            Action::Update(patch) => {
                assert_eq!(patch.get("is_premium"), Some(&json!(true)));
            }
            other => panic!("unexpected action: {other:?}"),
        }
        assert!(!request.returning);
        assert_eq!(request.filters[0].value, json!(5));
    }
}
