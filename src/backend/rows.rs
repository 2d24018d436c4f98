use serde_json::Value;

/// Column filter accepted by the backend's row endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `column = value`
    Eq(String, String),
    /// `column IN (values)`
    In(String, Vec<String>),
    /// Disjunction of equality tests, encoded as `or=(a.eq.x,b.eq.y)`.
    AnyOf(Vec<(String, String)>),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl ToString) -> Self {
        Filter::Eq(column.into(), value.to_string())
    }

    pub fn is_in<V: ToString>(
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Filter::In(
            column.into(),
            values.into_iter().map(|v| v.to_string()).collect(),
        )
    }

    pub fn any_of<C: Into<String>, V: ToString>(
        alternatives: impl IntoIterator<Item = (C, V)>,
    ) -> Self {
        Filter::AnyOf(
            alternatives
                .into_iter()
                .map(|(c, v)| (c.into(), v.to_string()))
                .collect(),
        )
    }

    /// Evaluate the filter against an already-materialized row, comparing
    /// scalars the way the wire protocol does (stringified).
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq(column, value) => {
                field_as_string(row, column).as_deref() == Some(value.as_str())
            }
            Filter::In(column, values) => field_as_string(row, column)
                .map(|s| values.iter().any(|v| *v == s))
                .unwrap_or(false),
            Filter::AnyOf(alternatives) => alternatives
                .iter()
                .any(|(c, v)| field_as_string(row, c).as_deref() == Some(v.as_str())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// Declarative description of a row select: projection, filters, ordering
/// and limit. Encodes itself for the wire and evaluates itself in-memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowQuery {
    pub columns: Option<String>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<u32>,
}

impl RowQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(mut self, columns: impl Into<String>) -> Self {
        self.columns = Some(columns.into());
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_asc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction: Direction::Asc,
        });
        self
    }

    pub fn order_desc(mut self, column: impl Into<String>) -> Self {
        self.order = Some(Order {
            column: column.into(),
            direction: Direction::Desc,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs for the backend's row endpoint.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![(
            "select".to_string(),
            self.columns.clone().unwrap_or_else(|| "*".to_string()),
        )];
        pairs.extend(filter_pairs(&self.filters));
        if let Some(order) = &self.order {
            let direction = match order.direction {
                Direction::Asc => "asc",
                Direction::Desc => "desc",
            };
            pairs.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        pairs
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.filters.iter().all(|f| f.matches(row))
    }
}

/// Filter-only pairs, used by update/delete/count requests that carry no
/// projection.
pub(crate) fn filter_pairs(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| match filter {
            Filter::Eq(column, value) => (column.clone(), format!("eq.{value}")),
            Filter::In(column, values) => {
                (column.clone(), format!("in.({})", values.join(",")))
            }
            Filter::AnyOf(alternatives) => {
                let body = alternatives
                    .iter()
                    .map(|(c, v)| format!("{c}.eq.{v}"))
                    .collect::<Vec<_>>()
                    .join(",");
                ("or".to_string(), format!("({body})"))
            }
        })
        .collect()
}

/// Stringify a scalar field the way the wire protocol compares it. `null`
/// and missing fields compare equal to nothing.
pub(crate) fn field_as_string(row: &Value, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
