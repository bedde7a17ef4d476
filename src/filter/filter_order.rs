use serde_json::Value;

use super::error::FilterError;
use super::filter_where::{json_path_sql, parse_path};
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        match order {
            Value::Null => Ok(vec![]),
            Value::String(s) => Self::parse_order_string(s),
            Value::Array(arr) => {
                // Expect array of strings like ["created_at desc", "name asc"]
                let mut out = Vec::new();
                for v in arr {
                    match v {
                        Value::String(s) => out.extend(Self::parse_order_string(s)?),
                        _ => return Err(FilterError::InvalidOperatorData("order entries must be strings".to_string())),
                    }
                }
                Ok(out)
            }
            Value::Object(obj) => {
                // { "created_at": "desc", "name": "asc" }
                let mut out = Vec::new();
                for (k, v) in obj {
                    let sort = match v.as_str().unwrap_or("asc").to_ascii_lowercase().as_str() {
                        "desc" => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    };
                    out.push(FilterOrderInfo { path: parse_path(k)?, sort });
                }
                Ok(out)
            }
            _ => Err(FilterError::InvalidOperatorData("order must be a string, array or object".to_string())),
        }
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        // split on commas, then each token into field and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() {
                continue;
            }
            let mut it = trimmed.split_whitespace();
            if let Some(field) = it.next() {
                let dir = it.next().unwrap_or("asc");
                let sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
                out.push(FilterOrderInfo { path: parse_path(field)?, sort });
            }
        }
        Ok(out)
    }

    /// ORDER BY over the JSONB column, always ending with `id` for a stable page order.
    pub fn generate(infos: &[FilterOrderInfo]) -> String {
        let mut parts: Vec<String> = infos
            .iter()
            .map(|i| {
                let nulls = match i.sort {
                    SortDirection::Asc => "NULLS LAST",
                    SortDirection::Desc => "NULLS FIRST",
                };
                format!("{} {} {}", json_path_sql(&i.path), i.sort.to_sql(), nulls)
            })
            .collect();
        parts.push("id ASC".to_string());
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_all_order_shapes() {
        let from_str = FilterOrder::validate_and_parse(&json!("created_at desc, number")).unwrap();
        assert_eq!(from_str.len(), 2);
        assert_eq!(from_str[0].sort, SortDirection::Desc);
        assert_eq!(from_str[1].path, vec!["number".to_string()]);

        let from_obj = FilterOrder::validate_and_parse(&json!({"customer.name": "asc"})).unwrap();
        assert_eq!(from_obj[0].path, vec!["customer".to_string(), "name".to_string()]);

        assert!(FilterOrder::validate_and_parse(&json!(["x; drop table"])).is_err());
    }

    #[test]
    fn generated_sql_has_stable_tiebreak() {
        let infos = FilterOrder::validate_and_parse(&json!("created_at desc")).unwrap();
        assert_eq!(
            FilterOrder::generate(&infos),
            "ORDER BY data #> '{created_at}' DESC NULLS FIRST, id ASC"
        );
    }
}
