use serde_json::Value;

use super::error::FilterError;
use super::types::{is_valid_identifier, FilterOp, FilterWhereInfo};

/// Renders a `{ "column": value | { "$op": value } }` document as an AND chain.
pub struct FilterWhere {
    param_values: Vec<Value>,
    param_index: usize,
}

impl FilterWhere {
    /// Render `where_data` with placeholders numbered after `starting_param_index`.
    pub fn generate(where_data: &Value, starting_param_index: usize) -> Result<(String, Vec<Value>), FilterError> {
        let conditions = Self::parse(where_data)?;
        let mut filter_where = Self {
            param_values: vec![],
            param_index: starting_param_index,
        };
        let sql: Vec<String> = conditions
            .into_iter()
            .map(|condition| filter_where.render(condition))
            .collect();
        Ok((sql.join(" AND "), filter_where.param_values))
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        Self::parse(where_data).map(|_| ())
    }

    fn parse(where_data: &Value) -> Result<Vec<FilterWhereInfo>, FilterError> {
        let obj = match where_data {
            Value::Null => return Ok(vec![]),
            Value::Object(obj) => obj,
            _ => return Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        };

        let mut conditions = Vec::new();
        for (column, value) in obj {
            if !is_valid_identifier(column) {
                return Err(FilterError::InvalidColumn(column.to_string()));
            }
            match value {
                Value::Object(ops) => {
                    for (op_key, data) in ops {
                        conditions.push(FilterWhereInfo {
                            column: column.clone(),
                            operator: Self::map_operator(op_key)?,
                            data: data.clone(),
                        });
                    }
                }
                // { column: value } is shorthand for $eq
                data => conditions.push(FilterWhereInfo {
                    column: column.clone(),
                    operator: FilterOp::Eq,
                    data: data.clone(),
                }),
            }
        }
        Ok(conditions)
    }

    fn map_operator(op_key: &str) -> Result<FilterOp, FilterError> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" => FilterOp::Neq,
            "$gte" => FilterOp::Gte,
            "$lte" => FilterOp::Lte,
            "$ilike" => FilterOp::ILike,
            other => return Err(FilterError::UnsupportedOperator(other.to_string())),
        })
    }

    fn render(&mut self, condition: FilterWhereInfo) -> String {
        let column = format!("\"{}\"", condition.column);
        match (condition.operator, condition.data) {
            (FilterOp::Eq, Value::Null) => format!("{} IS NULL", column),
            (FilterOp::Neq, Value::Null) => format!("{} IS NOT NULL", column),
            (operator, data) => format!("{} {} {}", column, operator.to_sql(), self.param(data)),
        }
    }

    fn param(&mut self, value: Value) -> String {
        self.param_values.push(value);
        self.param_index += 1;
        format!("${}", self.param_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn implicit_equality_and_null() {
        let (sql, params) = FilterWhere::generate(&json!({ "role": "admin", "photo_url": null }), 0).unwrap();
        assert_eq!(sql, "\"photo_url\" IS NULL AND \"role\" = $1");
        assert_eq!(params, vec![json!("admin")]);
    }

    #[test]
    fn range_and_search_number_params_in_order() {
        let where_data = json!({
            "price": { "$gte": 5, "$lte": 10 },
            "title": { "$ilike": "%soup%" }
        });
        let (sql, params) = FilterWhere::generate(&where_data, 2).unwrap();
        assert_eq!(sql, "\"price\" >= $3 AND \"price\" <= $4 AND \"title\" ILIKE $5");
        assert_eq!(params, vec![json!(5), json!(10), json!("%soup%")]);
    }

    #[test]
    fn rejects_unknown_operators_and_columns() {
        assert!(FilterWhere::generate(&json!({ "price": { "$regex": "x" } }), 0).is_err());
        assert!(FilterWhere::generate(&json!({ "bad column": 1 }), 0).is_err());
        assert!(FilterWhere::validate(&json!("raw sql")).is_err());
        assert!(FilterWhere::validate(&json!({ "price": { "$in": [1] } })).is_err());
    }
}
