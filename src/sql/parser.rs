use serde_json::Value as JsonValue;
use sqlparser::ast::{
    self, Assignment, AssignmentTarget, BinaryOperator, Delete, Expr, FromTable, GroupByExpr,
    Insert, ObjectName, OrderByKind, SelectItem, SetExpr, Statement as SqlStatement, TableFactor,
    TableObject, TableWithJoins, UnaryOperator, Value as SqlValue,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use tracing::debug;

use super::ast::*;
use crate::error::QueryError;
use crate::rest::Row;

/// Consumes positional parameters as `$n` placeholders are encountered.
///
/// Resolution is strictly by source order: the numeral in the placeholder
/// is not honored, each placeholder takes the next unconsumed parameter.
/// For UPDATE this means SET values consume before WHERE values.
struct ParamBinder<'a> {
    params: &'a [JsonValue],
    next: usize,
}

impl<'a> ParamBinder<'a> {
    fn new(params: &'a [JsonValue]) -> Self {
        Self { params, next: 0 }
    }

    fn take(&mut self, placeholder: &str) -> Result<JsonValue, QueryError> {
        let value = self.params.get(self.next).cloned().ok_or_else(|| {
            QueryError::MissingParameter {
                placeholder: placeholder.to_string(),
                supplied: self.params.len(),
            }
        })?;
        self.next += 1;
        Ok(value)
    }
}

pub struct SqlParser {
    dialect: PostgreSqlDialect,
}

impl SqlParser {
    pub fn new() -> Self {
        Self {
            dialect: PostgreSqlDialect {},
        }
    }

    /// Parse one SQL statement and resolve its placeholders against `params`.
    ///
    /// Parsing is a pure function of the two inputs; no I/O happens here.
    pub fn parse(&self, sql: &str, params: &[JsonValue]) -> Result<Statement, QueryError> {
        let sql_trimmed = sql.trim().trim_end_matches(';');

        // Classify by the leading keyword before running the full grammar,
        // so DDL and other verbs fail with the right error kind.
        let keyword = sql_trimmed
            .split_whitespace()
            .next()
            .ok_or_else(|| QueryError::MalformedStatement("empty statement".to_string()))?;
        let lowered = keyword.to_ascii_lowercase();
        if !matches!(lowered.as_str(), "select" | "insert" | "update" | "delete") {
            return Err(QueryError::UnsupportedOperation(keyword.to_string()));
        }

        let statements = Parser::parse_sql(&self.dialect, sql_trimmed)
            .map_err(|e| QueryError::MalformedStatement(e.to_string()))?;
        if statements.len() > 1 {
            return Err(QueryError::MalformedStatement(
                "only single statements are supported".to_string(),
            ));
        }
        let Some(statement) = statements.into_iter().next() else {
            return Err(QueryError::MalformedStatement(
                "empty statement".to_string(),
            ));
        };

        let mut binder = ParamBinder::new(params);
        match statement {
            SqlStatement::Query(query) => self.convert_select(&query, &mut binder),
            SqlStatement::Insert(insert) => self.convert_insert(&insert, &mut binder),
            SqlStatement::Update {
                table,
                assignments,
                from,
                selection,
                returning,
                ..
            } => self.convert_update(
                &table,
                &assignments,
                from.is_some(),
                selection.as_ref(),
                returning.is_some(),
                &mut binder,
            ),
            SqlStatement::Delete(delete) => self.convert_delete(&delete, &mut binder),
            _ => Err(QueryError::MalformedStatement(format!(
                "unsupported {} statement form",
                keyword.to_uppercase()
            ))),
        }
    }

    fn convert_select(
        &self,
        query: &ast::Query,
        binder: &mut ParamBinder<'_>,
    ) -> Result<Statement, QueryError> {
        if query.with.is_some() {
            return Err(QueryError::MalformedStatement(
                "CTEs are not supported".to_string(),
            ));
        }

        let select = match query.body.as_ref() {
            SetExpr::Select(select) => select,
            _ => {
                return Err(QueryError::MalformedStatement(
                    "only plain SELECT queries are supported".to_string(),
                ));
            }
        };

        let table = self.extract_table(&select.from)?;
        let projection = self.convert_projection(&select.projection);

        // GROUP BY / HAVING are not modeled; an aggregate projection has
        // already degraded to * above.
        if let GroupByExpr::Expressions(exprs, _) = &select.group_by
            && !exprs.is_empty()
        {
            debug!(table = %table, "ignoring GROUP BY clause");
        }

        let mut conditions = Vec::new();
        if let Some(selection) = &select.selection {
            self.extract_conditions(selection, binder, &mut conditions)?;
        }

        let order_by = if let Some(ref ob) = query.order_by {
            self.convert_order_by(ob)?
        } else {
            Vec::new()
        };

        let limit = self.extract_limit_from_query(query)?;

        Ok(Statement::Select(SelectStatement {
            table,
            projection,
            conditions,
            order_by,
            limit,
        }))
    }

    fn convert_insert(
        &self,
        insert: &Insert,
        binder: &mut ParamBinder<'_>,
    ) -> Result<Statement, QueryError> {
        if insert.on.is_some() {
            return Err(QueryError::MalformedStatement(
                "ON CONFLICT is not supported".to_string(),
            ));
        }
        if !insert.assignments.is_empty() {
            return Err(QueryError::MalformedStatement(
                "INSERT ... SET is not supported".to_string(),
            ));
        }

        let table = match &insert.table {
            TableObject::TableName(name) => self.object_name_leaf(name)?,
            _ => {
                return Err(QueryError::MalformedStatement(
                    "could not parse table name from INSERT".to_string(),
                ));
            }
        };

        if insert.columns.is_empty() {
            return Err(QueryError::MalformedStatement(
                "INSERT requires an explicit column list".to_string(),
            ));
        }

        let source = insert.source.as_ref().ok_or_else(|| {
            QueryError::MalformedStatement("could not find VALUES clause".to_string())
        })?;
        let values = match source.body.as_ref() {
            SetExpr::Values(values) => values,
            _ => {
                return Err(QueryError::MalformedStatement(
                    "INSERT ... SELECT is not supported".to_string(),
                ));
            }
        };
        if values.rows.is_empty() {
            return Err(QueryError::MalformedStatement(
                "VALUES must contain at least one row".to_string(),
            ));
        }

        let mut rows = Vec::with_capacity(values.rows.len());
        for exprs in &values.rows {
            if exprs.len() != insert.columns.len() {
                return Err(QueryError::MalformedStatement(format!(
                    "INSERT names {} columns but a VALUES row has {} values",
                    insert.columns.len(),
                    exprs.len()
                )));
            }
            let mut row = Row::new();
            for (ident, expr) in insert.columns.iter().zip(exprs) {
                if let Some(value) = self.resolve_insert_value(expr, binder)? {
                    row.insert(ident.value.clone(), value);
                }
            }
            rows.push(row);
        }

        Ok(Statement::Insert(InsertStatement {
            table,
            rows,
            returning: insert.returning.is_some(),
        }))
    }

    fn convert_update(
        &self,
        table: &TableWithJoins,
        assignments: &[Assignment],
        has_from: bool,
        selection: Option<&Expr>,
        returning: bool,
        binder: &mut ParamBinder<'_>,
    ) -> Result<Statement, QueryError> {
        if has_from {
            return Err(QueryError::MalformedStatement(
                "UPDATE ... FROM is not supported".to_string(),
            ));
        }

        let table_name = self.extract_table(std::slice::from_ref(table))?;

        if assignments.is_empty() {
            return Err(QueryError::MalformedStatement(
                "could not parse SET clause".to_string(),
            ));
        }

        // SET values resolve before the WHERE clause so placeholder
        // consumption follows source order across the whole statement.
        let mut patch = Row::new();
        for assignment in assignments {
            let AssignmentTarget::ColumnName(name) = &assignment.target else {
                return Err(QueryError::MalformedStatement(
                    "unsupported SET target".to_string(),
                ));
            };
            let column = self.object_name_leaf(name)?;
            if let Some(value) = self.resolve_update_value(&assignment.value, binder)? {
                patch.insert(column, value);
            }
        }

        let mut conditions = Vec::new();
        if let Some(expr) = selection {
            self.extract_conditions(expr, binder, &mut conditions)?;
        }

        Ok(Statement::Update(UpdateStatement {
            table: table_name,
            assignments: patch,
            conditions,
            returning,
        }))
    }

    fn convert_delete(
        &self,
        delete: &Delete,
        binder: &mut ParamBinder<'_>,
    ) -> Result<Statement, QueryError> {
        if !delete.tables.is_empty() {
            return Err(QueryError::MalformedStatement(
                "multi-table DELETE is not supported".to_string(),
            ));
        }
        if delete.using.is_some() {
            return Err(QueryError::MalformedStatement(
                "DELETE ... USING is not supported".to_string(),
            ));
        }
        if !delete.order_by.is_empty() || delete.limit.is_some() {
            return Err(QueryError::MalformedStatement(
                "ORDER BY and LIMIT are not supported on DELETE".to_string(),
            ));
        }

        let from = match &delete.from {
            FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
        };
        let table = self.extract_table(from)?;

        let mut conditions = Vec::new();
        if let Some(expr) = &delete.selection {
            self.extract_conditions(expr, binder, &mut conditions)?;
        }

        Ok(Statement::Delete(DeleteStatement {
            table,
            conditions,
            returning: delete.returning.is_some(),
        }))
    }

    /// Extract the single unqualified table name a statement targets
    fn extract_table(&self, from: &[TableWithJoins]) -> Result<String, QueryError> {
        if from.is_empty() {
            return Err(QueryError::MalformedStatement(
                "could not parse table name".to_string(),
            ));
        }
        if from.len() > 1 {
            return Err(QueryError::MalformedStatement(
                "multiple tables are not supported".to_string(),
            ));
        }
        let item = &from[0];
        if !item.joins.is_empty() {
            return Err(QueryError::MalformedStatement(
                "JOINs are not supported".to_string(),
            ));
        }
        match &item.relation {
            TableFactor::Table { name, .. } => self.object_name_leaf(name),
            _ => Err(QueryError::MalformedStatement(
                "complex table expressions are not supported".to_string(),
            )),
        }
    }

    /// Last identifier of a (possibly schema-qualified) object name
    fn object_name_leaf(&self, name: &ObjectName) -> Result<String, QueryError> {
        name.0
            .iter()
            .filter_map(|part| part.as_ident())
            .last()
            .map(|ident| ident.value.clone())
            .ok_or_else(|| QueryError::MalformedStatement("could not parse table name".to_string()))
    }

    /// Convert a projection list, degrading to `*` as a whole if any item
    /// is not a bare column name. Never a partial column list.
    fn convert_projection(&self, items: &[SelectItem]) -> Projection {
        let mut columns = Vec::new();
        for item in items {
            match item {
                SelectItem::Wildcard(_) => return Projection::All,
                SelectItem::UnnamedExpr(Expr::Identifier(ident)) => {
                    columns.push(ident.value.clone());
                }
                SelectItem::UnnamedExpr(Expr::CompoundIdentifier(idents)) => {
                    columns.push(
                        idents
                            .iter()
                            .map(|i| i.value.as_str())
                            .collect::<Vec<_>>()
                            .join("."),
                    );
                }
                _ => return Projection::All,
            }
        }
        if columns.is_empty() {
            Projection::All
        } else {
            Projection::Columns(columns)
        }
    }

    /// Flatten a WHERE tree into a conjunction of simple comparisons.
    ///
    /// Only AND is accepted as a connective; OR and other boolean
    /// structure are hard errors, never silently re-ANDed.
    fn extract_conditions(
        &self,
        expr: &Expr,
        binder: &mut ParamBinder<'_>,
        conditions: &mut Vec<Condition>,
    ) -> Result<(), QueryError> {
        match expr {
            Expr::BinaryOp { left, op, right } => match op {
                BinaryOperator::And => {
                    self.extract_conditions(left, binder, conditions)?;
                    self.extract_conditions(right, binder, conditions)?;
                }
                BinaryOperator::Or => {
                    return Err(QueryError::UnsupportedExpression(
                        "OR is not supported; WHERE must be a flat AND conjunction".to_string(),
                    ));
                }
                BinaryOperator::Eq
                | BinaryOperator::NotEq
                | BinaryOperator::Lt
                | BinaryOperator::LtEq
                | BinaryOperator::Gt
                | BinaryOperator::GtEq => {
                    let column = self.extract_column(left)?;
                    let operator = self.convert_operator(op)?;
                    let value = self.resolve_condition_value(right, binder)?;
                    conditions.push(Condition {
                        column,
                        operator,
                        value,
                    });
                }
                _ => {
                    return Err(QueryError::UnsupportedExpression(format!(
                        "unsupported operator: {op}"
                    )));
                }
            },
            Expr::Nested(inner) => self.extract_conditions(inner, binder, conditions)?,
            Expr::Like {
                negated,
                expr,
                pattern,
                ..
            } => {
                if *negated {
                    return Err(QueryError::UnsupportedExpression(
                        "NOT LIKE is not supported".to_string(),
                    ));
                }
                let column = self.extract_column(expr)?;
                let value = self.resolve_condition_value(pattern, binder)?;
                conditions.push(Condition {
                    column,
                    operator: Operator::Like,
                    value,
                });
            }
            Expr::InList {
                expr,
                list,
                negated,
            } => {
                if *negated {
                    return Err(QueryError::UnsupportedExpression(
                        "NOT IN is not supported".to_string(),
                    ));
                }
                let column = self.extract_column(expr)?;
                let mut values = list
                    .iter()
                    .map(|e| self.resolve_condition_value(e, binder))
                    .collect::<Result<Vec<_>, _>>()?;
                // `IN ($1)` with an array-shaped parameter uses that array
                let value = if values.len() == 1 && values[0].is_array() {
                    values.remove(0)
                } else {
                    JsonValue::Array(values)
                };
                conditions.push(Condition {
                    column,
                    operator: Operator::In,
                    value,
                });
            }
            Expr::InSubquery { .. } | Expr::Subquery(_) => {
                return Err(QueryError::MalformedStatement(
                    "sub-selects are not supported".to_string(),
                ));
            }
            Expr::UnaryOp {
                op: UnaryOperator::Not,
                ..
            } => {
                return Err(QueryError::UnsupportedExpression(
                    "NOT is not supported".to_string(),
                ));
            }
            Expr::IsNull(_) | Expr::IsNotNull(_) => {
                return Err(QueryError::UnsupportedExpression(
                    "IS NULL comparisons are not supported".to_string(),
                ));
            }
            Expr::Between { .. } => {
                return Err(QueryError::UnsupportedExpression(
                    "BETWEEN is not supported".to_string(),
                ));
            }
            _ => {
                return Err(QueryError::UnsupportedExpression(format!(
                    "unsupported WHERE expression: {expr}"
                )));
            }
        }
        Ok(())
    }

    fn extract_column(&self, expr: &Expr) -> Result<String, QueryError> {
        match expr {
            Expr::Identifier(ident) => Ok(ident.value.clone()),
            // The REST layer has no table qualification, so `hs.id`
            // addresses the bare column
            Expr::CompoundIdentifier(idents) => idents
                .last()
                .map(|ident| ident.value.clone())
                .ok_or_else(|| {
                    QueryError::MalformedStatement("expected column identifier".to_string())
                }),
            _ => Err(QueryError::UnsupportedExpression(format!(
                "expected a column name, got: {expr}"
            ))),
        }
    }

    /// Resolve a WHERE comparison value: a placeholder, or a literal with
    /// the standard coercions (NULL, booleans, numbers, quoted strings).
    fn resolve_condition_value(
        &self,
        expr: &Expr,
        binder: &mut ParamBinder<'_>,
    ) -> Result<JsonValue, QueryError> {
        match expr {
            Expr::Value(v) => self.resolve_sql_value(&v.value, binder),
            Expr::UnaryOp {
                op: UnaryOperator::Minus,
                expr: inner,
            } => match inner.as_ref() {
                Expr::Value(v) => match &v.value {
                    SqlValue::Number(n, _) => Ok(number_from_literal(&format!("-{n}"))),
                    _ => Err(QueryError::UnsupportedExpression(format!(
                        "expected a numeric literal, got: -{inner}"
                    ))),
                },
                _ => Err(QueryError::UnsupportedExpression(format!(
                    "expected a numeric literal, got: -{inner}"
                ))),
            },
            _ => Err(QueryError::UnsupportedExpression(format!(
                "expected a literal or placeholder, got: {expr}"
            ))),
        }
    }

    fn resolve_sql_value(
        &self,
        value: &SqlValue,
        binder: &mut ParamBinder<'_>,
    ) -> Result<JsonValue, QueryError> {
        match value {
            SqlValue::Placeholder(p) => binder.take(p),
            SqlValue::SingleQuotedString(s) | SqlValue::DoubleQuotedString(s) => {
                Ok(JsonValue::String(s.clone()))
            }
            SqlValue::Number(n, _) => Ok(number_from_literal(n)),
            SqlValue::Boolean(b) => Ok(JsonValue::Bool(*b)),
            SqlValue::Null => Ok(JsonValue::Null),
            other => Err(QueryError::UnsupportedExpression(format!(
                "unsupported value: {other}"
            ))),
        }
    }

    /// Resolve one INSERT value position.
    ///
    /// `None` means the column is omitted from the payload (DEFAULT and
    /// CURRENT_TIMESTAMP are left to the backend). Literals other than
    /// quoted strings are not coerced: they reach the backend as their raw
    /// SQL text, and only placeholders carry typed values.
    fn resolve_insert_value(
        &self,
        expr: &Expr,
        binder: &mut ParamBinder<'_>,
    ) -> Result<Option<JsonValue>, QueryError> {
        if is_default_marker(expr) {
            return Ok(None);
        }
        match expr {
            Expr::Value(v) => match &v.value {
                SqlValue::Placeholder(p) => binder.take(p).map(Some),
                SqlValue::SingleQuotedString(s) => Ok(Some(JsonValue::String(s.clone()))),
                other => Ok(Some(JsonValue::String(other.to_string()))),
            },
            other => Ok(Some(JsonValue::String(other.to_string()))),
        }
    }

    /// Resolve one UPDATE SET value. Same skip rules as INSERT, but
    /// literals coerce like WHERE values do.
    fn resolve_update_value(
        &self,
        expr: &Expr,
        binder: &mut ParamBinder<'_>,
    ) -> Result<Option<JsonValue>, QueryError> {
        if is_default_marker(expr) {
            return Ok(None);
        }
        match expr {
            Expr::Value(_) | Expr::UnaryOp { .. } => {
                self.resolve_condition_value(expr, binder).map(Some)
            }
            // Anything else keeps its SQL text; the backend may know what
            // to do with it
            other => Ok(Some(JsonValue::String(other.to_string()))),
        }
    }

    fn convert_operator(&self, op: &BinaryOperator) -> Result<Operator, QueryError> {
        match op {
            BinaryOperator::Eq => Ok(Operator::Eq),
            BinaryOperator::NotEq => Ok(Operator::Ne),
            BinaryOperator::Lt => Ok(Operator::Lt),
            BinaryOperator::LtEq => Ok(Operator::Le),
            BinaryOperator::Gt => Ok(Operator::Gt),
            BinaryOperator::GtEq => Ok(Operator::Ge),
            _ => Err(QueryError::UnsupportedExpression(format!(
                "unsupported operator: {op}"
            ))),
        }
    }

    fn convert_order_by(&self, order_by: &ast::OrderBy) -> Result<Vec<OrderByExpr>, QueryError> {
        let mut result = Vec::new();

        match &order_by.kind {
            OrderByKind::Expressions(exprs) => {
                for expr in exprs {
                    // extract_column strips any `alias.` qualifier
                    let column = self.extract_column(&expr.expr)?;
                    let descending = expr.options.asc.map(|asc| !asc).unwrap_or(false);
                    result.push(OrderByExpr { column, descending });
                }
            }
            OrderByKind::All(_) => {
                return Err(QueryError::MalformedStatement(
                    "ORDER BY ALL is not supported".to_string(),
                ));
            }
        }

        Ok(result)
    }

    fn extract_limit_from_query(&self, query: &ast::Query) -> Result<Option<u64>, QueryError> {
        if let Some(ref limit_clause) = query.limit_clause {
            match limit_clause {
                ast::LimitClause::LimitOffset { limit, .. } => {
                    if let Some(limit_expr) = limit {
                        return self.extract_limit_value(limit_expr).map(Some);
                    }
                }
                ast::LimitClause::OffsetCommaLimit { limit, .. } => {
                    return self.extract_limit_value(limit).map(Some);
                }
            }
        }
        Ok(None)
    }

    fn extract_limit_value(&self, expr: &Expr) -> Result<u64, QueryError> {
        match expr {
            Expr::Value(v) => match &v.value {
                SqlValue::Number(n, _) => n.parse::<u64>().map_err(|_| {
                    QueryError::MalformedStatement(
                        "LIMIT must be a nonnegative integer".to_string(),
                    )
                }),
                _ => Err(QueryError::MalformedStatement(
                    "LIMIT must be a nonnegative integer".to_string(),
                )),
            },
            _ => Err(QueryError::MalformedStatement(
                "LIMIT must be a nonnegative integer".to_string(),
            )),
        }
    }
}

impl Default for SqlParser {
    fn default() -> Self {
        Self::new()
    }
}

/// DEFAULT and CURRENT_TIMESTAMP leave the column to the backend
fn is_default_marker(expr: &Expr) -> bool {
    match expr {
        Expr::Identifier(ident) => {
            ident.value.eq_ignore_ascii_case("default")
                || ident.value.eq_ignore_ascii_case("current_timestamp")
        }
        Expr::Function(func) => func
            .name
            .0
            .iter()
            .filter_map(|part| part.as_ident())
            .last()
            .map(|ident| ident.value.eq_ignore_ascii_case("current_timestamp"))
            .unwrap_or(false),
        _ => false,
    }
}

/// Integer literals stay integers; everything else becomes a float
fn number_from_literal(raw: &str) -> JsonValue {
    if let Ok(i) = raw.parse::<i64>() {
        return JsonValue::from(i);
    }
    match raw.parse::<f64>() {
        Ok(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or_else(|| JsonValue::String(raw.to_string())),
        Err(_) => JsonValue::String(raw.to_string()),
    }
}
