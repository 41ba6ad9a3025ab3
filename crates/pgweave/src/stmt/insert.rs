//! INSERT and INSERT .. ON CONFLICT builders.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::GenericClient;
use crate::error::{WeaveError, WeaveResult};
use crate::fragment::Fragment;
use crate::ident::SqlIdent;
use crate::render::{render, Rendered};
use crate::stmt::values::Values;
use crate::stmt::{decode, push_returning, push_string_literal, RESULT_COLUMN};

/// Options accepted by [`insert`](crate::insert).
#[derive(Clone, Debug, Default)]
pub struct InsertOptions {
    pub(crate) returning: Option<Vec<String>>,
}

impl InsertOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return only the named columns of each inserted row.
    pub fn returning(mut self, columns: &[&str]) -> Self {
        self.returning = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }
}

/// A multi-row INSERT.
#[derive(Clone, Debug)]
pub struct Insert {
    pub(crate) table: SqlIdent,
    pub(crate) rows: Vec<Values>,
    pub(crate) opts: InsertOptions,
}

impl Insert {
    /// The first row fixes the column list; every later row must set exactly
    /// the same columns, in the same order. An empty row list never renders
    /// to a statement (`run` short-circuits before reaching this).
    fn validate(&self) -> WeaveResult<()> {
        let Some(first) = self.rows.first() else {
            return Err(WeaveError::structural(format!(
                "insert into {} has no rows; nothing to render",
                self.table.tail()
            )));
        };
        if first.is_empty() && self.rows.len() > 1 {
            return Err(WeaveError::structural(
                "multi-row insert cannot use DEFAULT VALUES rows",
            ));
        }
        let columns = first.columns();
        for row in &self.rows[1..] {
            if row.columns() != columns {
                return Err(WeaveError::structural(format!(
                    "insert rows into {} set differing column lists",
                    self.table.tail()
                )));
            }
        }
        Ok(())
    }

    /// An empty row list composes to an empty fragment; only an explicit
    /// empty [`Values`] row means `DEFAULT VALUES`.
    pub fn compose(&self) -> Fragment {
        let Some(first) = self.rows.first() else {
            return Fragment::new();
        };
        let mut fragment = Fragment::raw("INSERT INTO ");
        fragment.push_ident(self.table.clone());
        if first.is_empty() {
            fragment.push(" DEFAULT VALUES");
        } else {
            push_column_list(&mut fragment, &first.columns());
            fragment.push(" VALUES ");
            for (i, row) in self.rows.iter().enumerate() {
                if i > 0 {
                    fragment.push(", ");
                }
                fragment.push("(");
                row.append_value_list(&mut fragment);
                fragment.push(")");
            }
        }
        push_returning(&mut fragment, &self.table, self.opts.returning.as_deref());
        fragment
    }

    pub fn render(&self) -> WeaveResult<Rendered> {
        self.validate()?;
        render(&self.compose())
    }

    /// Execute and return the inserted rows.
    ///
    /// An empty row list is a no-op: nothing is sent to the database and an
    /// empty vec comes back.
    pub async fn run(&self, conn: &impl GenericClient) -> WeaveResult<Vec<Value>> {
        if self.rows.is_empty() {
            return Ok(Vec::new());
        }
        let rendered = self.render()?;
        let rows = conn.query(&rendered.sql, &rendered.params_ref()).await?;
        rows.iter().map(decode::json_result).collect()
    }

    pub async fn run_as<T: DeserializeOwned>(
        &self,
        conn: &impl GenericClient,
    ) -> WeaveResult<Vec<T>> {
        self.run(conn)
            .await?
            .into_iter()
            .map(|row| {
                serde_json::from_value(row)
                    .map_err(|e| WeaveError::decode(RESULT_COLUMN, e.to_string()))
            })
            .collect()
    }
}

/// An INSERT .. ON CONFLICT DO UPDATE that reports which path it took.
///
/// Each returned row carries a `"$action"` key set to `"INSERT"` or
/// `"UPDATE"`, derived from the row's `xmax` system column.
#[derive(Clone, Debug)]
pub struct Upsert {
    pub(crate) table: SqlIdent,
    pub(crate) row: Values,
    pub(crate) conflict: Vec<String>,
}

impl Upsert {
    fn validate(&self) -> WeaveResult<()> {
        if self.row.is_empty() {
            return Err(WeaveError::structural("upsert requires at least one value"));
        }
        if self.conflict.is_empty() {
            return Err(WeaveError::structural(
                "upsert requires at least one conflict target column",
            ));
        }
        Ok(())
    }

    pub fn compose(&self) -> Fragment {
        let mut fragment = Fragment::raw("INSERT INTO ");
        fragment.push_ident(self.table.clone());
        let columns = self.row.columns();
        push_column_list(&mut fragment, &columns);
        fragment.push(" VALUES (");
        self.row.append_value_list(&mut fragment);
        fragment.push(") ON CONFLICT");
        push_column_list(&mut fragment, &column_refs(&self.conflict));
        fragment.push(" DO UPDATE SET ");
        // Assign every non-conflict column from EXCLUDED; when the row sets
        // nothing else, reassign a conflict column so the statement still
        // returns the row.
        let updates: Vec<&str> = columns
            .iter()
            .copied()
            .filter(|c| !self.conflict.iter().any(|k| k == c))
            .collect();
        let updates = if updates.is_empty() {
            vec![self.conflict[0].as_str()]
        } else {
            updates
        };
        for (i, column) in updates.iter().enumerate() {
            if i > 0 {
                fragment.push(", ");
            }
            fragment.push_ident(SqlIdent::new(column));
            fragment.push(" = EXCLUDED.");
            fragment.push_ident(SqlIdent::new(column));
        }
        fragment.push(" RETURNING to_jsonb(");
        fragment.push_ident(self.table.clone());
        fragment.push(".*) || jsonb_build_object(");
        push_string_literal(&mut fragment, "$action");
        fragment.push(", CASE xmax WHEN 0 THEN 'INSERT' ELSE 'UPDATE' END)");
        fragment.push(&format!(" AS {RESULT_COLUMN}"));
        fragment
    }

    pub fn render(&self) -> WeaveResult<Rendered> {
        self.validate()?;
        render(&self.compose())
    }

    /// Execute and return the resulting row, `"$action"` included.
    pub async fn run(&self, conn: &impl GenericClient) -> WeaveResult<Value> {
        let rendered = self.render()?;
        let row = conn
            .query_opt(&rendered.sql, &rendered.params_ref())
            .await?
            .ok_or_else(|| WeaveError::decode(RESULT_COLUMN, "upsert returned no row"))?;
        decode::json_result(&row)
    }

    pub async fn run_as<T: DeserializeOwned>(&self, conn: &impl GenericClient) -> WeaveResult<T> {
        serde_json::from_value(self.run(conn).await?)
            .map_err(|e| WeaveError::decode(RESULT_COLUMN, e.to_string()))
    }
}

fn push_column_list(fragment: &mut Fragment, columns: &[&str]) {
    fragment.push(" (");
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            fragment.push(", ");
        }
        fragment.push_ident(SqlIdent::new(column));
    }
    fragment.push(")");
}

fn column_refs(columns: &[String]) -> Vec<&str> {
    columns.iter().map(String::as_str).collect()
}
