//! SELECT builders, including correlated lateral subqueries.
//!
//! Every select renders to a query whose rows are built server-side as
//! `jsonb` under a single `result` column. Plain selects project
//! `to_jsonb("table".*)`; a column list narrows that to a
//! `jsonb_build_object(...)`; lateral entries are merged in with `||` so a
//! whole tree of related rows comes back in one round trip.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::GenericClient;
use crate::condition::Where;
use crate::error::{WeaveError, WeaveResult};
use crate::fragment::Fragment;
use crate::ident::SqlIdent;
use crate::render::Rendered;
use crate::stmt::decode::{self, transform_result};
use crate::stmt::{push_string_literal, AGG_EMPTY_ARRAY, RESULT_COLUMN};

/// Sort direction for [`SelectOptions::order`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Clone, Debug)]
pub(crate) struct Order {
    pub(crate) by: SqlIdent,
    pub(crate) direction: Direction,
}

/// Aggregate projection of a scalar select.
#[derive(Clone, Debug)]
pub(crate) enum AggExpr {
    Count,
    Sum(SqlIdent),
    Max(SqlIdent),
}

/// How many rows a select produces and how they are shaped.
#[derive(Clone, Debug)]
pub(crate) enum SelectMode {
    /// A JSON array of all matching rows.
    Many,
    /// The first matching row, or SQL NULL when there is none.
    One,
    /// Exactly one row; any other count is an error at decode time.
    ExactlyOne,
    /// A single aggregate value.
    Scalar(AggExpr),
}

/// Nested subqueries attached to a select.
#[derive(Clone, Debug, Default)]
pub(crate) enum Lateral {
    #[default]
    None,
    /// Each entry becomes a key of the parent row's JSON object.
    Map(Vec<(String, Subquery)>),
    /// The subquery's result replaces the parent row entirely.
    Passthrough(Box<Subquery>),
}

/// Options accepted by the select family of builders.
#[derive(Clone, Debug, Default)]
pub struct SelectOptions {
    pub(crate) columns: Option<Vec<String>>,
    pub(crate) order: Option<Order>,
    pub(crate) limit: Option<i64>,
    pub(crate) offset: Option<i64>,
    pub(crate) lateral: Lateral,
}

impl SelectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project only the named columns instead of the whole row.
    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.columns = Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Sort by a column.
    pub fn order(mut self, by: &str, direction: Direction) -> Self {
        self.order = Some(Order {
            by: SqlIdent::new(by),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Attach a correlated subquery whose result becomes `key` in each row.
    ///
    /// Conditions inside the subquery may use [`parent`](crate::parent) to
    /// reference columns of the enclosing row. Repeated calls add further
    /// keys; a later [`passthrough`](Self::passthrough) replaces them all.
    pub fn lateral(mut self, key: &str, subquery: impl Into<Subquery>) -> Self {
        let entry = (key.to_string(), subquery.into());
        match &mut self.lateral {
            Lateral::Map(entries) => entries.push(entry),
            _ => self.lateral = Lateral::Map(vec![entry]),
        }
        self
    }

    /// Replace each parent row with the result of a correlated subquery.
    pub fn passthrough(mut self, subquery: impl Into<Subquery>) -> Self {
        self.lateral = Lateral::Passthrough(Box::new(subquery.into()));
        self
    }
}

/// The composable core shared by every select-shaped query.
///
/// Builders wrap this; it is also what travels into a lateral position of an
/// enclosing select.
#[derive(Clone, Debug)]
pub struct Subquery {
    pub(crate) table: SqlIdent,
    pub(crate) where_: Where,
    pub(crate) opts: SelectOptions,
    pub(crate) mode: SelectMode,
}

impl Subquery {
    pub(crate) fn new(
        table: impl Into<SqlIdent>,
        where_: Where,
        opts: SelectOptions,
        mode: SelectMode,
    ) -> Self {
        Self {
            table: table.into(),
            where_,
            opts,
            mode,
        }
    }

    /// Build the full query fragment, aggregate wrapper included.
    pub(crate) fn compose(&self) -> Fragment {
        self.compose_at(0)
    }

    /// `depth` is the lateral nesting level; every level below the top gets
    /// a unique table alias so a parent reference stays unambiguous even
    /// when the same table appears at two levels (self-joins).
    fn compose_at(&self, depth: usize) -> Fragment {
        let scope = self.scope_alias(depth);
        let mut inner = Fragment::raw("SELECT ");
        self.push_projection(&mut inner, &scope);
        inner.push(" FROM ");
        inner.push_ident(self.table.clone());
        if depth > 0 {
            inner.push(" AS ");
            inner.push_ident(scope.clone());
        }
        self.push_lateral_joins(&mut inner, depth);
        self.where_.append_to(&mut inner);
        self.push_trailer(&mut inner);

        // The inner select is the scope that parent references inside any
        // lateral subquery resolve against.
        let mut scoped = Fragment::new();
        scoped.push_scoped(scope, inner);

        match self.mode {
            SelectMode::Many | SelectMode::ExactlyOne => {
                let mut outer = Fragment::raw(format!(
                    "SELECT coalesce(jsonb_agg({RESULT_COLUMN}), '{AGG_EMPTY_ARRAY}') AS {RESULT_COLUMN} FROM ("
                ));
                outer.push_fragment(scoped);
                outer.push(") AS ");
                outer.push_ident(SqlIdent::segment(format!("sq_{}", self.table.tail())));
                outer
            }
            SelectMode::One | SelectMode::Scalar(_) => scoped,
        }
    }

    pub(crate) fn render(&self) -> WeaveResult<Rendered> {
        crate::render::render(&self.compose())
    }

    /// The alias that names this query's row at `depth`.
    ///
    /// The top level keeps the bare table name; aliased levels hide the
    /// table's own name inside the subquery, so an equally-named outer
    /// table stays visible to correlation predicates.
    fn scope_alias(&self, depth: usize) -> SqlIdent {
        if depth == 0 {
            self.table.clone()
        } else {
            SqlIdent::segment(format!("q{depth}_{}", self.table.tail()))
        }
    }

    fn push_projection(&self, fragment: &mut Fragment, scope: &SqlIdent) {
        match (&self.mode, &self.opts.lateral) {
            (SelectMode::Scalar(agg), _) => {
                fragment.push("to_jsonb(");
                match agg {
                    AggExpr::Count => {
                        fragment.push("count(*)");
                    }
                    AggExpr::Sum(column) => {
                        fragment.push("sum(");
                        fragment.push_ident(column.clone());
                        fragment.push(")");
                    }
                    AggExpr::Max(column) => {
                        fragment.push("max(");
                        fragment.push_ident(column.clone());
                        fragment.push(")");
                    }
                }
                fragment.push(")");
            }
            (_, Lateral::Passthrough(_)) => {
                fragment.push_ident(Self::passthrough_alias());
                fragment.push(&format!(".{RESULT_COLUMN}"));
            }
            (_, lateral) => {
                match &self.opts.columns {
                    Some(columns) => {
                        fragment.push("jsonb_build_object(");
                        for (i, column) in columns.iter().enumerate() {
                            if i > 0 {
                                fragment.push(", ");
                            }
                            push_string_literal(fragment, column);
                            fragment.push(", ");
                            fragment.push_ident(scope.clone());
                            fragment.push(".");
                            let mut quoted = String::new();
                            SqlIdent::new(column).write_sql(&mut quoted);
                            fragment.push(&quoted);
                        }
                        fragment.push(")");
                    }
                    None => {
                        fragment.push("to_jsonb(");
                        fragment.push_ident(scope.clone());
                        fragment.push(".*)");
                    }
                }
                if let Lateral::Map(entries) = lateral {
                    for (key, _) in entries {
                        fragment.push(" || jsonb_build_object(");
                        push_string_literal(fragment, key);
                        fragment.push(", ");
                        fragment.push_ident(Self::map_alias(key));
                        fragment.push(&format!(".{RESULT_COLUMN})"));
                    }
                }
            }
        }
        fragment.push(&format!(" AS {RESULT_COLUMN}"));
    }

    fn push_lateral_joins(&self, fragment: &mut Fragment, depth: usize) {
        match &self.opts.lateral {
            Lateral::None => {}
            Lateral::Map(entries) => {
                for (key, subquery) in entries {
                    Self::push_join(fragment, Self::map_alias(key), subquery, depth + 1);
                }
            }
            Lateral::Passthrough(subquery) => {
                Self::push_join(fragment, Self::passthrough_alias(), subquery, depth + 1);
            }
        }
    }

    fn push_join(fragment: &mut Fragment, alias: SqlIdent, subquery: &Subquery, depth: usize) {
        fragment.push(" LEFT JOIN LATERAL (");
        fragment.push_fragment(subquery.compose_at(depth));
        fragment.push(") AS ");
        fragment.push_ident(alias);
        fragment.push(" ON true");
    }

    fn push_trailer(&self, fragment: &mut Fragment) {
        if matches!(self.mode, SelectMode::Scalar(_)) {
            return;
        }
        if let Some(order) = &self.opts.order {
            fragment.push(" ORDER BY ");
            fragment.push_ident(order.by.clone());
            fragment.push(match order.direction {
                Direction::Asc => " ASC",
                Direction::Desc => " DESC",
            });
        }
        match self.mode {
            SelectMode::One => {
                fragment.push(" LIMIT 1");
            }
            _ => {
                if let Some(limit) = self.opts.limit {
                    fragment.push(" LIMIT ");
                    fragment.push_bind(limit);
                }
            }
        }
        if let Some(offset) = self.opts.offset {
            fragment.push(" OFFSET ");
            fragment.push_bind(offset);
        }
    }

    fn map_alias(key: &str) -> SqlIdent {
        SqlIdent::segment(format!("lat_{key}"))
    }

    fn passthrough_alias() -> SqlIdent {
        SqlIdent::segment("lat_through")
    }
}

/// A select returning every matching row.
#[derive(Clone, Debug)]
pub struct Select {
    pub(crate) core: Subquery,
}

/// A select returning the first matching row, if any.
#[derive(Clone, Debug)]
pub struct SelectOne {
    pub(crate) core: Subquery,
}

/// A select that insists on exactly one matching row.
#[derive(Clone, Debug)]
pub struct SelectExactlyOne {
    pub(crate) core: Subquery,
}

/// A scalar aggregate over matching rows.
#[derive(Clone, Debug)]
pub struct Aggregate {
    pub(crate) core: Subquery,
}

impl From<Select> for Subquery {
    fn from(q: Select) -> Subquery {
        q.core
    }
}

impl From<SelectOne> for Subquery {
    fn from(q: SelectOne) -> Subquery {
        q.core
    }
}

impl From<SelectExactlyOne> for Subquery {
    fn from(q: SelectExactlyOne) -> Subquery {
        q.core
    }
}

impl From<Aggregate> for Subquery {
    fn from(q: Aggregate) -> Subquery {
        q.core
    }
}

impl Select {
    /// The underlying SQL fragment, for embedding in larger statements.
    pub fn compose(&self) -> Fragment {
        self.core.compose()
    }

    pub fn render(&self) -> WeaveResult<Rendered> {
        self.core.render()
    }

    /// Execute and return the decoded rows.
    pub async fn run(&self, conn: &impl GenericClient) -> WeaveResult<Vec<Value>> {
        let rendered = self.render()?;
        let rows = conn.query(&rendered.sql, &rendered.params_ref()).await?;
        let raw = match rows.first() {
            Some(row) => decode::json_result(row)?,
            None => Value::Array(Vec::new()),
        };
        match transform_result(raw, &self.core)? {
            Value::Array(items) => Ok(items),
            other => Err(WeaveError::decode(
                RESULT_COLUMN,
                format!("expected a JSON array, got {other}"),
            )),
        }
    }

    /// Execute and deserialize each row into `T`.
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

impl SelectOne {
    pub fn compose(&self) -> Fragment {
        self.core.compose()
    }

    pub fn render(&self) -> WeaveResult<Rendered> {
        self.core.render()
    }

    /// Execute and return the first matching row, or `None`.
    pub async fn run(&self, conn: &impl GenericClient) -> WeaveResult<Option<Value>> {
        let rendered = self.render()?;
        let rows = conn.query(&rendered.sql, &rendered.params_ref()).await?;
        let raw = match rows.first() {
            Some(row) => decode::json_result(row)?,
            None => Value::Null,
        };
        match transform_result(raw, &self.core)? {
            Value::Null => Ok(None),
            row => Ok(Some(row)),
        }
    }

    pub async fn run_as<T: DeserializeOwned>(
        &self,
        conn: &impl GenericClient,
    ) -> WeaveResult<Option<T>> {
        match self.run(conn).await? {
            Some(row) => serde_json::from_value(row)
                .map(Some)
                .map_err(|e| WeaveError::decode(RESULT_COLUMN, e.to_string())),
            None => Ok(None),
        }
    }
}

impl SelectExactlyOne {
    pub fn compose(&self) -> Fragment {
        self.core.compose()
    }

    pub fn render(&self) -> WeaveResult<Rendered> {
        self.core.render()
    }

    /// Execute and return the single matching row.
    ///
    /// Zero or multiple matches produce [`WeaveError::NotExactlyOne`].
    pub async fn run(&self, conn: &impl GenericClient) -> WeaveResult<Value> {
        let rendered = self.render()?;
        let rows = conn.query(&rendered.sql, &rendered.params_ref()).await?;
        let raw = match rows.first() {
            Some(row) => decode::json_result(row)?,
            None => Value::Array(Vec::new()),
        };
        transform_result(raw, &self.core)
    }

    pub async fn run_as<T: DeserializeOwned>(&self, conn: &impl GenericClient) -> WeaveResult<T> {
        serde_json::from_value(self.run(conn).await?)
            .map_err(|e| WeaveError::decode(RESULT_COLUMN, e.to_string()))
    }
}

impl Aggregate {
    pub fn compose(&self) -> Fragment {
        self.core.compose()
    }

    pub fn render(&self) -> WeaveResult<Rendered> {
        self.core.render()
    }

    /// Execute and return the aggregate value.
    ///
    /// `sum` and `max` over no rows yield `Value::Null`; `count` yields `0`.
    pub async fn run(&self, conn: &impl GenericClient) -> WeaveResult<Value> {
        let rendered = self.render()?;
        let rows = conn.query(&rendered.sql, &rendered.params_ref()).await?;
        match rows.first() {
            Some(row) => decode::json_result(row),
            None => Ok(Value::Null),
        }
    }

    pub async fn run_as<T: DeserializeOwned>(&self, conn: &impl GenericClient) -> WeaveResult<T> {
        serde_json::from_value(self.run(conn).await?)
            .map_err(|e| WeaveError::decode(RESULT_COLUMN, e.to_string()))
    }
}
