use std::cmp::Ordering;

use serde_json::{Map, Value};

use super::error::FilterError;
use super::types::{Condition, FieldPath, FilterOp, SqlParam};

/// Deepest dotted path accepted in a filter.
pub const MAX_PATH_DEPTH: usize = 5;

pub struct FilterWhere {
    params: Vec<SqlParam>,
    param_offset: usize,
}

impl FilterWhere {
    /// Parse a `where` object into an implicit AND of conditions.
    pub fn parse(where_data: &Value) -> Result<Vec<Condition>, FilterError> {
        match where_data {
            Value::Null => Ok(vec![]),
            Value::Object(obj) => {
                let mut out = Vec::new();
                for (key, value) in obj {
                    if key.starts_with('$') {
                        out.push(Self::parse_logical_operator(key, value)?);
                    } else {
                        out.extend(Self::parse_field_condition(key, value)?);
                    }
                }
                Ok(out)
            }
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_logical_operator(op: &str, value: &Value) -> Result<Condition, FilterError> {
        match op {
            "$and" | "$or" => {
                let arr = value
                    .as_array()
                    .ok_or_else(|| FilterError::InvalidOperatorData(format!("{} requires array", op)))?;
                let mut parts = Vec::new();
                for v in arr {
                    parts.push(Condition::And(Self::parse(v)?));
                }
                Ok(if op == "$and" { Condition::And(parts) } else { Condition::Or(parts) })
            }
            "$not" => Ok(Condition::Not(Box::new(Condition::And(Self::parse(value)?)))),
            _ => Err(FilterError::UnsupportedOperator(op.to_string())),
        }
    }

    fn parse_field_condition(field: &str, value: &Value) -> Result<Vec<Condition>, FilterError> {
        let path = parse_path(field)?;
        match value {
            Value::Object(obj) if obj.keys().all(|k| k.starts_with('$')) && !obj.is_empty() => {
                let mut out = Vec::new();
                for (op_key, op_val) in obj {
                    let op = Self::map_operator(op_key)?;
                    Self::check_operand(op, op_val)?;
                    out.push(Condition::Field { path: path.clone(), op, value: op_val.clone() });
                }
                Ok(out)
            }
            // Implicit equality: { field: value }
            _ => Ok(vec![Condition::Field { path, op: FilterOp::Eq, value: value.clone() }]),
        }
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" | "$neq" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$like" => FilterOp::Like,
            "$ilike" => FilterOp::ILike,
            "$in" => FilterOp::In,
            "$nin" => FilterOp::NIn,
            "$between" => FilterOp::Between,
            "$exists" => FilterOp::Exists,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn check_operand(op: FilterOp, value: &Value) -> Result<(), FilterError> {
        match op {
            FilterOp::In | FilterOp::NIn if !value.is_array() => {
                Err(FilterError::InvalidOperatorData("$in/$nin require an array".to_string()))
            }
            FilterOp::Between if value.as_array().map(|a| a.len()) != Some(2) => {
                Err(FilterError::InvalidOperatorData("$between requires exactly 2 values".to_string()))
            }
            FilterOp::Like | FilterOp::ILike if !value.is_string() => {
                Err(FilterError::InvalidOperatorData("$like/$ilike require a string".to_string()))
            }
            FilterOp::Exists if !value.is_boolean() => {
                Err(FilterError::InvalidOperatorData("$exists requires a boolean".to_string()))
            }
            _ => Ok(()),
        }
    }

    // ------------------------------------------------------------------
    // In-memory evaluation
    // ------------------------------------------------------------------

    pub fn matches_all(conditions: &[Condition], doc: &Map<String, Value>) -> bool {
        conditions.iter().all(|c| Self::matches(c, doc))
    }

    pub fn matches(condition: &Condition, doc: &Map<String, Value>) -> bool {
        match condition {
            Condition::And(parts) => parts.iter().all(|c| Self::matches(c, doc)),
            Condition::Or(parts) => parts.iter().any(|c| Self::matches(c, doc)),
            Condition::Not(inner) => !Self::matches(inner, doc),
            Condition::Field { path, op, value } => {
                let actual = lookup(doc, path);
                Self::matches_field(actual, *op, value)
            }
        }
    }

    fn matches_field(actual: Option<&Value>, op: FilterOp, expected: &Value) -> bool {
        match op {
            FilterOp::Eq => match actual {
                None => expected.is_null(),
                Some(v) => json_eq(v, expected),
            },
            FilterOp::Ne => match actual {
                None => !expected.is_null(),
                Some(v) => !json_eq(v, expected),
            },
            FilterOp::Gt => compare(actual, expected) == Some(Ordering::Greater),
            FilterOp::Gte => matches!(compare(actual, expected), Some(Ordering::Greater | Ordering::Equal)),
            FilterOp::Lt => compare(actual, expected) == Some(Ordering::Less),
            FilterOp::Lte => matches!(compare(actual, expected), Some(Ordering::Less | Ordering::Equal)),
            FilterOp::In => {
                let Some(v) = actual else { return false };
                expected.as_array().map_or(false, |arr| arr.iter().any(|e| json_eq(v, e)))
            }
            FilterOp::NIn => {
                let Some(v) = actual else { return true };
                expected.as_array().map_or(true, |arr| !arr.iter().any(|e| json_eq(v, e)))
            }
            FilterOp::Between => {
                let Some(bounds) = expected.as_array() else { return false };
                matches!(compare(actual, &bounds[0]), Some(Ordering::Greater | Ordering::Equal))
                    && matches!(compare(actual, &bounds[1]), Some(Ordering::Less | Ordering::Equal))
            }
            FilterOp::Exists => actual.is_some() == expected.as_bool().unwrap_or(true),
            FilterOp::Like | FilterOp::ILike => {
                let (Some(Value::String(s)), Some(pattern)) = (actual, expected.as_str()) else {
                    return false;
                };
                if op == FilterOp::ILike {
                    like_match(&s.to_lowercase(), &pattern.to_lowercase())
                } else {
                    like_match(s, pattern)
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // SQL generation against a JSONB `data` column
    // ------------------------------------------------------------------

    pub fn new(param_offset: usize) -> Self {
        Self { params: Vec::new(), param_offset }
    }

    /// Build a SQL predicate for `conditions`; placeholders start after `param_offset`.
    pub fn generate(conditions: &[Condition], param_offset: usize) -> (String, Vec<SqlParam>) {
        let mut builder = Self::new(param_offset);
        let clause = builder.build_all(conditions);
        (clause, builder.params)
    }

    fn build_all(&mut self, conditions: &[Condition]) -> String {
        if conditions.is_empty() {
            return "TRUE".to_string();
        }
        let parts: Vec<String> = conditions.iter().map(|c| self.build(c)).collect();
        parts.join(" AND ")
    }

    fn build(&mut self, condition: &Condition) -> String {
        match condition {
            Condition::And(parts) => format!("({})", self.build_all(parts)),
            Condition::Or(parts) => {
                if parts.is_empty() {
                    return "FALSE".to_string();
                }
                let sql: Vec<String> = parts.iter().map(|c| self.build(c)).collect();
                format!("({})", sql.join(" OR "))
            }
            Condition::Not(inner) => format!("NOT COALESCE({}, FALSE)", self.build(inner)),
            Condition::Field { path, op, value } => self.build_field(path, *op, value),
        }
    }

    fn build_field(&mut self, path: &FieldPath, op: FilterOp, value: &Value) -> String {
        let column = json_path_sql(path);
        match op {
            FilterOp::Eq if value.is_null() => format!("({col} IS NULL OR {col} = 'null'::jsonb)", col = column),
            FilterOp::Eq => format!("{} = {}", column, self.json_param(value)),
            FilterOp::Ne if value.is_null() => format!("({col} IS NOT NULL AND {col} <> 'null'::jsonb)", col = column),
            FilterOp::Ne => format!("{} IS DISTINCT FROM {}", column, self.json_param(value)),
            FilterOp::Gt | FilterOp::Gte | FilterOp::Lt | FilterOp::Lte => {
                let sql_op = match op {
                    FilterOp::Gt => ">",
                    FilterOp::Gte => ">=",
                    FilterOp::Lt => "<",
                    _ => "<=",
                };
                let p = self.json_param(value);
                format!("(jsonb_typeof({col}) = jsonb_typeof({p}) AND {col} {op} {p})", col = column, p = p, op = sql_op)
            }
            FilterOp::In | FilterOp::NIn => {
                let values = value.as_array().cloned().unwrap_or_default();
                if values.is_empty() {
                    return if op == FilterOp::In { "FALSE".to_string() } else { "TRUE".to_string() };
                }
                let placeholders: Vec<String> = values.iter().map(|v| self.json_param(v)).collect();
                if op == FilterOp::In {
                    format!("{} IN ({})", column, placeholders.join(", "))
                } else {
                    format!("({col} IS NULL OR {col} NOT IN ({list}))", col = column, list = placeholders.join(", "))
                }
            }
            FilterOp::Between => {
                let bounds = value.as_array().cloned().unwrap_or_default();
                let (lo, hi) = match bounds.as_slice() {
                    [lo, hi] => (lo.clone(), hi.clone()),
                    _ => return "FALSE".to_string(),
                };
                let lo_p = self.json_param(&lo);
                let hi_p = self.json_param(&hi);
                format!(
                    "(jsonb_typeof({col}) = jsonb_typeof({lo}) AND {col} >= {lo} AND {col} <= {hi})",
                    col = column,
                    lo = lo_p,
                    hi = hi_p
                )
            }
            FilterOp::Exists => {
                if value.as_bool().unwrap_or(true) {
                    format!("{} IS NOT NULL", column)
                } else {
                    format!("{} IS NULL", column)
                }
            }
            FilterOp::Like | FilterOp::ILike => {
                let text_column = json_text_path_sql(path);
                let keyword = if op == FilterOp::Like { "LIKE" } else { "ILIKE" };
                let p = self.text_param(value.as_str().unwrap_or_default());
                format!("(jsonb_typeof({}) = 'string' AND {} {} {})", column, text_column, keyword, p)
            }
        }
    }

    fn json_param(&mut self, value: &Value) -> String {
        self.params.push(SqlParam::Json(value.clone()));
        format!("${}", self.param_offset + self.params.len())
    }

    fn text_param(&mut self, value: &str) -> String {
        self.params.push(SqlParam::Text(value.to_string()));
        format!("${}", self.param_offset + self.params.len())
    }
}

/// Validate and split a dotted field name.
pub fn parse_path(field: &str) -> Result<FieldPath, FilterError> {
    let segments: Vec<String> = field.split('.').map(str::to_string).collect();
    if segments.len() > MAX_PATH_DEPTH {
        return Err(FilterError::InvalidField(format!("{} (nested too deep)", field)));
    }
    for segment in &segments {
        let valid = !segment.is_empty()
            && segment.len() <= 64
            && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(FilterError::InvalidField(field.to_string()));
        }
    }
    Ok(segments)
}

/// `data #> '{a,b}'`; segments are validated by `parse_path`, so inlining is safe.
pub fn json_path_sql(path: &FieldPath) -> String {
    format!("data #> '{{{}}}'", path.join(","))
}

fn json_text_path_sql(path: &FieldPath) -> String {
    format!("data #>> '{{{}}}'", path.join(","))
}

pub fn lookup<'a>(doc: &'a Map<String, Value>, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.split_first()?;
    let mut current = doc.get(first)?;
    for segment in rest {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    match (actual?, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Total order mirroring Postgres jsonb ordering; `None` (missing) sorts last.
pub fn json_total_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::String(_) => 1,
            Value::Number(_) => 2,
            Value::Bool(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => match rank(x).cmp(&rank(y)) {
            Ordering::Equal => compare(Some(x), y).unwrap_or(Ordering::Equal),
            other => other,
        },
    }
}

/// SQL LIKE semantics: `%` any run, `_` one character.
fn like_match(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '%' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn implicit_equality_and_nested_paths() {
        let conditions = FilterWhere::parse(&json!({"status": "paid", "customer.name": "ACME"})).unwrap();
        let d = doc(json!({"status": "paid", "customer": {"name": "ACME"}}));
        assert!(FilterWhere::matches_all(&conditions, &d));

        let other = doc(json!({"status": "paid", "customer": {"name": "Other"}}));
        assert!(!FilterWhere::matches_all(&conditions, &other));
    }

    #[test]
    fn comparison_operators_only_compare_same_types() {
        let conditions = FilterWhere::parse(&json!({"amount": {"$gte": 100, "$lt": 200}})).unwrap();
        assert!(FilterWhere::matches_all(&conditions, &doc(json!({"amount": 150}))));
        assert!(!FilterWhere::matches_all(&conditions, &doc(json!({"amount": 200}))));
        assert!(!FilterWhere::matches_all(&conditions, &doc(json!({"amount": "150"}))));
    }

    #[test]
    fn logical_operators() {
        let conditions = FilterWhere::parse(&json!({
            "$or": [{"status": "sent"}, {"status": "overdue"}],
            "$not": {"archived": true}
        }))
        .unwrap();
        assert!(FilterWhere::matches_all(&conditions, &doc(json!({"status": "overdue"}))));
        assert!(!FilterWhere::matches_all(&conditions, &doc(json!({"status": "overdue", "archived": true}))));
        assert!(!FilterWhere::matches_all(&conditions, &doc(json!({"status": "draft"}))));
    }

    #[test]
    fn in_nin_exists_and_like() {
        let d = doc(json!({"category": "billing", "subject": "Rechnung RE-0042"}));
        let check = |w: Value| FilterWhere::matches_all(&FilterWhere::parse(&w).unwrap(), &d);
        assert!(check(json!({"category": {"$in": ["billing", "tech"]}})));
        assert!(!check(json!({"category": {"$nin": ["billing"]}})));
        assert!(check(json!({"priority": {"$exists": false}})));
        assert!(check(json!({"subject": {"$like": "Rechnung%"}})));
        assert!(check(json!({"subject": {"$ilike": "%re-00__"}})));
        assert!(!check(json!({"subject": {"$like": "rechnung%"}})));
    }

    #[test]
    fn rejects_bad_fields_and_operators() {
        assert!(FilterWhere::parse(&json!({"data'; drop": 1})).is_err());
        assert!(FilterWhere::parse(&json!({"a": {"$regex": "x"}})).is_err());
        assert!(FilterWhere::parse(&json!({"a": {"$in": "x"}})).is_err());
        assert!(FilterWhere::parse(&json!({"a.b.c.d.e.f": 1})).is_err());
    }

    #[test]
    fn generates_parameterized_sql() {
        let conditions = FilterWhere::parse(&json!({"status": {"$in": ["sent", "overdue"]}, "total": {"$gt": 10}})).unwrap();
        let (sql, params) = FilterWhere::generate(&conditions, 1);
        assert!(sql.contains("data #> '{status}' IN ($2, $3)"));
        assert!(sql.contains("data #> '{total}' > $4"));
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn total_order_puts_missing_last() {
        let a = json!(1);
        let b = json!("x");
        assert_eq!(json_total_cmp(Some(&b), Some(&a)), Ordering::Less);
        assert_eq!(json_total_cmp(None, Some(&a)), Ordering::Greater);
    }
}
