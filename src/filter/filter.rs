use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::{json_total_cmp, lookup, FilterWhere};
use super::types::{Condition, FilterData, FilterOrderInfo, SortDirection, SqlParam, SqlResult};

/// Parsed, validated query over one collection.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    conditions: Vec<Condition>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<usize>,
    offset: usize,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: FilterData) -> Result<Self, FilterError> {
        let mut filter = Self::new();
        filter.assign(data)?;
        Ok(filter)
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause {
            self.where_clause(where_clause)?;
        }
        if let Some(order) = data.order {
            self.order(order)?;
        }
        if let Some(limit) = data.limit {
            self.limit(limit);
        }
        if let Some(offset) = data.offset {
            self.offset = offset;
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        self.conditions.extend(FilterWhere::parse(&conditions)?);
        Ok(self)
    }

    /// Add `field == value` to the conditions.
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        let path = field.split('.').map(str::to_string).collect();
        self.conditions.push(Condition::Field {
            path,
            op: super::types::FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn order_by(mut self, field: &str, sort: SortDirection) -> Self {
        self.order_data.push(FilterOrderInfo {
            path: field.split('.').map(str::to_string).collect(),
            sort,
        });
        self
    }

    pub fn limit(&mut self, limit: usize) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// Apply a default limit when none was requested, and cap at `max`.
    pub fn bounded(mut self, default_limit: usize, max: usize) -> Self {
        let requested = self.limit.unwrap_or(default_limit);
        if requested > max {
            tracing::debug!("Limit {} exceeds max {}, capping to max", requested, max);
        }
        self.limit = Some(requested.min(max));
        self
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset_value(&self) -> usize {
        self.offset
    }

    pub fn matches(&self, doc: &Map<String, Value>) -> bool {
        FilterWhere::matches_all(&self.conditions, doc)
    }

    /// Ordering for in-memory evaluation; ties fall back to `id`.
    pub fn compare(&self, a: (&str, &Map<String, Value>), b: (&str, &Map<String, Value>)) -> Ordering {
        for info in &self.order_data {
            let ord = json_total_cmp(lookup(a.1, &info.path), lookup(b.1, &info.path));
            let ord = match info.sort {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        a.0.cmp(b.0)
    }

    /// WHERE/ORDER/LIMIT tail for a query whose first `param_offset` placeholders are taken.
    pub fn to_sql(&self, param_offset: usize) -> SqlResult {
        let (where_sql, params) = FilterWhere::generate(&self.conditions, param_offset);
        let mut clause = format!("({}) {}", where_sql, FilterOrder::generate(&self.order_data));
        if let Some(limit) = self.limit {
            clause.push_str(&format!(" LIMIT {}", limit));
        }
        if self.offset > 0 {
            clause.push_str(&format!(" OFFSET {}", self.offset));
        }
        SqlResult { clause, params }
    }

    pub fn where_sql(&self, param_offset: usize) -> (String, Vec<SqlParam>) {
        FilterWhere::generate(&self.conditions, param_offset)
    }
}
