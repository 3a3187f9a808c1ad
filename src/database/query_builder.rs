use serde_json::Value;
use sqlx::{self, postgres::PgArguments, FromRow, PgPool, Row};

use super::StoreError;
use crate::filter::{Filter, FilterData, SqlResult};

/// Typed SELECT over one table, driven by a [`FilterData`] document.
pub struct QueryBuilder<T> {
    table_name: String,
    filter: Option<Filter>,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> QueryBuilder<T>
where
    T: for<'r> FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
{
    pub fn new(table_name: impl Into<String>) -> Result<Self, StoreError> {
        let name = table_name.into();
        // Reuse Filter table name validation
        Filter::new(name.as_str())?;
        Ok(Self {
            table_name: name,
            filter: None,
            _phantom: std::marker::PhantomData,
        })
    }

    pub fn filter(mut self, filter_data: FilterData) -> Result<Self, StoreError> {
        let mut filter = Filter::new(self.table_name.as_str())?;
        filter.assign(filter_data)?;
        self.filter = Some(filter);
        Ok(self)
    }

    pub async fn select_all(self, pool: &PgPool) -> Result<Vec<T>, StoreError> {
        let sql_result = self.sql_result()?;
        let mut q = sqlx::query_as::<_, T>(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query_as(q, p);
        }
        Ok(q.fetch_all(pool).await?)
    }

    pub async fn count(self, pool: &PgPool) -> Result<i64, StoreError> {
        let sql_result = match self.filter {
            Some(filter) => filter.to_count_sql()?,
            None => SqlResult {
                query: format!("SELECT COUNT(*) as count FROM \"{}\"", self.table_name),
                params: vec![],
            },
        };

        let mut q = sqlx::query(&sql_result.query);
        for p in sql_result.params.iter() {
            q = bind_param_query(q, p);
        }
        let row = q.fetch_one(pool).await?;
        Ok(row.try_get("count")?)
    }

    fn sql_result(&self) -> Result<SqlResult, StoreError> {
        match &self.filter {
            Some(filter) => Ok(filter.to_sql()?),
            None => Ok(SqlResult {
                query: format!("SELECT * FROM \"{}\"", self.table_name),
                params: vec![],
            }),
        }
    }
}

fn bind_param_query<'q>(
    q: sqlx::query::Query<'q, sqlx::Postgres, PgArguments>,
    v: &'q Value,
) -> sqlx::query::Query<'q, sqlx::Postgres, PgArguments> {
    match v {
        Value::Null => q.bind(Option::<String>::None),
        Value::Bool(b) => q.bind(*b),
        // Floats stay floats so they compare against DOUBLE PRECISION columns
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => q.bind(i),
            (None, Some(f)) => q.bind(f),
            (None, None) => q.bind(n.to_string()),
        },
        Value::String(s) => q.bind(s.as_str()),
        // No operator takes an array operand
        Value::Array(_) => q,
        Value::Object(_) => q.bind(sqlx::types::Json(v)),
    }
}

fn bind_param_query_as<'q, O>(
    q: sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>,
    v: &'q Value,
) -> sqlx::query::QueryAs<'q, sqlx::Postgres, O, PgArguments>
where
    O: for<'r> FromRow<'r, sqlx::postgres::PgRow>,
{
    match v {
        Value::Null => q.bind(Option::<String>::None),
        Value::Bool(b) => q.bind(*b),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => q.bind(i),
            (None, Some(f)) => q.bind(f),
            (None, None) => q.bind(n.to_string()),
        },
        Value::String(s) => q.bind(s.as_str()),
        Value::Array(_) => q,
        Value::Object(_) => q.bind(sqlx::types::Json(v)),
    }
}
