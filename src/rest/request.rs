use serde_json::Value;

/// A result row as returned by the backend.
pub type Row = serde_json::Map<String, Value>;

/// One table operation for the backend to execute.
///
/// Built through the chainable methods below, in the same shape the
/// upstream REST client builders use:
///
/// ```
/// use restsql::rest::TableRequest;
///
/// let req = TableRequest::select("hair_styles")
///     .eq("gender", "male".into())
///     .order("sort_order", true)
///     .limit(20);
/// assert_eq!(req.filters.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TableRequest {
    pub table: String,
    pub action: Action,
    /// Columns to project; `None` means all columns
    pub columns: Option<Vec<String>>,
    pub filters: Vec<Filter>,
    pub order: Vec<OrderTerm>,
    pub limit: Option<u64>,
    /// Whether a mutation should hand the affected rows back
    pub returning: bool,
}

/// What the request does to the table.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Select,
    /// Insert the given records (one or more, single call)
    Insert(Vec<Row>),
    /// Apply the given patch to all rows matching the filters
    Update(Row),
    Delete,
}

/// A single filter to apply server-side.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Filter kinds the backend can express.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
}

impl FilterOp {
    /// The PostgREST operator keyword
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Neq => "neq",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::Like => "like",
            FilterOp::In => "in",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub column: String,
    pub ascending: bool,
}

impl TableRequest {
    fn new(table: impl Into<String>, action: Action) -> Self {
        Self {
            table: table.into(),
            action,
            columns: None,
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            returning: false,
        }
    }

    pub fn select(table: impl Into<String>) -> Self {
        Self::new(table, Action::Select)
    }

    pub fn insert(table: impl Into<String>, rows: Vec<Row>) -> Self {
        Self::new(table, Action::Insert(rows))
    }

    pub fn update(table: impl Into<String>, patch: Row) -> Self {
        Self::new(table, Action::Update(patch))
    }

    pub fn delete(table: impl Into<String>) -> Self {
        Self::new(table, Action::Delete)
    }

    /// Restrict a select to the named columns
    pub fn columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn filter(mut self, column: impl Into<String>, op: FilterOp, value: Value) -> Self {
        self.filters.push(Filter {
            column: column.into(),
            op,
            value,
        });
        self
    }

    pub fn eq(self, column: impl Into<String>, value: Value) -> Self {
        self.filter(column, FilterOp::Eq, value)
    }

    pub fn neq(self, column: impl Into<String>, value: Value) -> Self {
        self.filter(column, FilterOp::Neq, value)
    }

    pub fn gt(self, column: impl Into<String>, value: Value) -> Self {
        self.filter(column, FilterOp::Gt, value)
    }

    pub fn gte(self, column: impl Into<String>, value: Value) -> Self {
        self.filter(column, FilterOp::Gte, value)
    }

    pub fn lt(self, column: impl Into<String>, value: Value) -> Self {
        self.filter(column, FilterOp::Lt, value)
    }

    pub fn lte(self, column: impl Into<String>, value: Value) -> Self {
        self.filter(column, FilterOp::Lte, value)
    }

    /// Pattern match; the pattern passes through verbatim
    pub fn like(self, column: impl Into<String>, pattern: Value) -> Self {
        self.filter(column, FilterOp::Like, pattern)
    }

    /// Membership test; `values` should be array-shaped
    pub fn in_list(self, column: impl Into<String>, values: Value) -> Self {
        self.filter(column, FilterOp::In, values)
    }

    pub fn order(mut self, column: impl Into<String>, ascending: bool) -> Self {
        self.order.push(OrderTerm {
            column: column.into(),
            ascending,
        });
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn returning(mut self, returning: bool) -> Self {
        self.returning = returning;
        self
    }

    /// True for INSERT/UPDATE/DELETE
    pub fn is_mutation(&self) -> bool {
        !matches!(self.action, Action::Select)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_chain() {
        let req = TableRequest::select("hair_styles")
            .columns(vec!["id".to_string(), "style_name".to_string()])
            .eq("gender", json!("male"))
            .gt("sort_order", json!(3))
            .order("sort_order", true)
            .limit(10);

        assert_eq!(req.table, "hair_styles");
        assert_eq!(req.action, Action::Select);
        assert_eq!(req.filters.len(), 2);
        assert_eq!(req.filters[0].op, FilterOp::Eq);
        assert_eq!(req.filters[1].op, FilterOp::Gt);
        assert_eq!(req.order.len(), 1);
        assert!(req.order[0].ascending);
        assert_eq!(req.limit, Some(10));
        assert!(!req.is_mutation());
    }

    #[test]
    fn test_mutations_default_to_no_returning() {
        let mut patch = Row::new();
        patch.insert("is_premium".to_string(), json!(true));
        let req = TableRequest::update("hair_styles", patch).eq("id", json!(5));

        assert!(req.is_mutation());
        assert!(!req.returning);
        assert!(req.returning(true).returning);
    }

    #[test]
    fn test_filter_order_is_preserved() {
        let req = TableRequest::delete("face_analyses")
            .eq("user_id", json!("u-1"))
            .eq("id", json!("abc-123"));
        let cols: Vec<&str> = req.filters.iter().map(|f| f.column.as_str()).collect();
        assert_eq!(cols, vec!["user_id", "id"]);
    }
}
