//! Backend-neutral description of a single remote read.
//!
//! A [`Query`] is rendered either as a PostgREST request (`rest`) or as
//! parameterised SQL (`db`), and evaluated directly by the in-memory backend
//! used in tests.

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::error::RemoteError;

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    /// Wire representation, as PostgREST expects it in a query string.
    pub fn to_param(&self) -> String {
        match self {
            FilterValue::Uuid(id) => id.to_string(),
            FilterValue::Timestamp(at) => at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Gte,
}

impl Op {
    pub fn postgrest(self) -> &'static str {
        match self {
            Op::Eq => "eq",
            Op::Gte => "gte",
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Gte => ">=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: Op,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

/// One-to-one expansion: the row of `table` whose `id` equals the base row's
/// `foreign_key` is embedded under the key `table`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Embed {
    pub table: String,
    pub foreign_key: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub table: String,
    pub columns: Vec<String>,
    pub embeds: Vec<Embed>,
    pub filters: Vec<Filter>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn from(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            embeds: Vec::new(),
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn embed(mut self, table: &str, foreign_key: &str) -> Self {
        self.embeds.push(Embed {
            table: table.to_string(),
            foreign_key: foreign_key.to_string(),
        });
        self
    }

    pub fn eq(self, column: &str, value: FilterValue) -> Self {
        self.filter(column, Op::Eq, value)
    }

    pub fn gte(self, column: &str, value: FilterValue) -> Self {
        self.filter(column, Op::Gte, value)
    }

    fn filter(mut self, column: &str, op: Op, value: FilterValue) -> Self {
        self.filters.push(Filter {
            column: column.to_string(),
            op,
            value,
        });
        self
    }

    pub fn order(mut self, column: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            column: column.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs for a PostgREST `GET /rest/v1/<table>` request.
    pub fn to_postgrest_params(&self) -> Vec<(String, String)> {
        let mut select: Vec<String> = if self.columns.is_empty() {
            vec!["*".to_string()]
        } else {
            self.columns.clone()
        };
        select.extend(self.embeds.iter().map(|embed| format!("{}(*)", embed.table)));

        let mut params = vec![("select".to_string(), select.join(","))];
        for filter in &self.filters {
            params.push((
                filter.column.clone(),
                format!("{}.{}", filter.op.postgrest(), filter.value.to_param()),
            ));
        }
        if let Some(order) = &self.order {
            let direction = match order.direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Parameterised SQL returning one `jsonb` object per row, plus the
    /// values to bind in order.
    pub fn to_sql(&self) -> Result<(String, Vec<FilterValue>), RemoteError> {
        let table = identifier(&self.table)?;

        let mut projections = Vec::new();
        if self.columns.is_empty() {
            projections.push("base.*".to_string());
        } else {
            for column in &self.columns {
                projections.push(format!("base.{}", identifier(column)?));
            }
        }
        for embed in &self.embeds {
            let embedded = identifier(&embed.table)?;
            let foreign_key = identifier(&embed.foreign_key)?;
            projections.push(format!(
                "(SELECT to_jsonb(e) FROM {embedded} e WHERE e.id = base.{foreign_key}) AS {embedded}"
            ));
        }

        let mut sql = format!("SELECT {} FROM {table} base", projections.join(", "));
        let mut binds = Vec::new();
        for (index, filter) in self.filters.iter().enumerate() {
            let keyword = if index == 0 { "WHERE" } else { "AND" };
            sql.push_str(&format!(
                " {keyword} base.{} {} ${}",
                identifier(&filter.column)?,
                filter.op.sql(),
                index + 1
            ));
            binds.push(filter.value.clone());
        }
        if let Some(order) = &self.order {
            let direction = match order.direction {
                Direction::Ascending => "ASC",
                Direction::Descending => "DESC",
            };
            sql.push_str(&format!(" ORDER BY base.{} {direction}", identifier(&order.column)?));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        Ok((format!("SELECT to_jsonb(r) FROM ({sql}) r"), binds))
    }
}

fn identifier(name: &str) -> Result<&str, RemoteError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(RemoteError::InvalidQuery(format!("bad identifier {name:?}")))
    }
}
