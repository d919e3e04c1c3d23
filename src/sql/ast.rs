use serde_json::Value;

use crate::rest::Row;

/// A parsed SQL statement in our internal representation.
///
/// All positional parameters and literals are already resolved to JSON
/// values, so a `Statement` is a pure function of the SQL text and the
/// parameter list it was parsed with.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStatement),
    Insert(InsertStatement),
    Update(UpdateStatement),
    Delete(DeleteStatement),
}

impl Statement {
    pub fn kind(&self) -> StatementKind {
        match self {
            Statement::Select(_) => StatementKind::Select,
            Statement::Insert(_) => StatementKind::Insert,
            Statement::Update(_) => StatementKind::Update,
            Statement::Delete(_) => StatementKind::Delete,
        }
    }

    pub fn table(&self) -> &str {
        match self {
            Statement::Select(s) => &s.table,
            Statement::Insert(s) => &s.table,
            Statement::Update(s) => &s.table,
            Statement::Delete(s) => &s.table,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectStatement {
    pub table: String,
    pub projection: Projection,
    /// WHERE conditions, implicitly ANDed
    pub conditions: Vec<Condition>,
    pub order_by: Vec<OrderByExpr>,
    pub limit: Option<u64>,
}

/// Columns a SELECT projects.
///
/// A projection list containing anything other than plain column names
/// degrades to `All` as a whole; a partially parsed list must never
/// silently drop columns.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// Select all columns (`*`)
    All,
    /// Restrict to the named columns
    Columns(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    /// One payload object per VALUES row; columns whose value was DEFAULT
    /// or CURRENT_TIMESTAMP are absent and left to the backend.
    pub rows: Vec<Row>,
    pub returning: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStatement {
    pub table: String,
    /// The SET clause as a patch object
    pub assignments: Row,
    pub conditions: Vec<Condition>,
    pub returning: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStatement {
    pub table: String,
    pub conditions: Vec<Condition>,
    pub returning: bool,
}

/// A single `column op value` comparison extracted from a WHERE clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub column: String,
    pub operator: Operator,
    /// Resolved scalar, or an array for `IN`
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
        };
        f.write_str(symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByExpr {
    pub column: String,
    pub descending: bool,
}
