//! Statement builders.
//!
//! Every builder is a free function taking the table name first, and yields
//! a value with `compose()` (the raw [`Fragment`]), `render()` (final SQL
//! plus parameters), and async `run`/`run_as` methods executing over any
//! [`GenericClient`](crate::GenericClient).

mod decode;
mod delete;
mod insert;
mod select;
mod update;
mod values;

pub use delete::Delete;
pub use insert::{Insert, InsertOptions, Upsert};
pub use select::{Aggregate, Direction, Select, SelectExactlyOne, SelectOne, SelectOptions, Subquery};
pub use update::Update;
pub use values::Values;

use crate::condition::Where;
use crate::fragment::Fragment;
use crate::ident::SqlIdent;
use select::{AggExpr, SelectMode};

/// The single column every statement returns its JSON payload under.
pub(crate) const RESULT_COLUMN: &str = "result";

/// What `jsonb_agg` over no rows is coalesced to.
pub(crate) const AGG_EMPTY_ARRAY: &str = "[]";

/// Select every matching row of `table`.
pub fn select(table: impl Into<SqlIdent>, where_: Where, opts: SelectOptions) -> Select {
    Select {
        core: Subquery::new(table, where_, opts, SelectMode::Many),
    }
}

/// Select the first matching row of `table`, if any.
pub fn select_one(table: impl Into<SqlIdent>, where_: Where, opts: SelectOptions) -> SelectOne {
    SelectOne {
        core: Subquery::new(table, where_, opts, SelectMode::One),
    }
}

/// Select the single matching row of `table`, erroring on any other count.
pub fn select_exactly_one(
    table: impl Into<SqlIdent>,
    where_: Where,
    opts: SelectOptions,
) -> SelectExactlyOne {
    SelectExactlyOne {
        core: Subquery::new(table, where_, opts, SelectMode::ExactlyOne),
    }
}

/// Count the rows of `table` matching `where_`.
pub fn count(table: impl Into<SqlIdent>, where_: Where) -> Aggregate {
    Aggregate {
        core: Subquery::new(
            table,
            where_,
            SelectOptions::new(),
            SelectMode::Scalar(AggExpr::Count),
        ),
    }
}

/// Sum `column` over the rows of `table` matching `where_`.
pub fn sum(table: impl Into<SqlIdent>, where_: Where, column: &str) -> Aggregate {
    Aggregate {
        core: Subquery::new(
            table,
            where_,
            SelectOptions::new(),
            SelectMode::Scalar(AggExpr::Sum(SqlIdent::new(column))),
        ),
    }
}

/// Take the maximum of `column` over the rows of `table` matching `where_`.
pub fn max(table: impl Into<SqlIdent>, where_: Where, column: &str) -> Aggregate {
    Aggregate {
        core: Subquery::new(
            table,
            where_,
            SelectOptions::new(),
            SelectMode::Scalar(AggExpr::Max(SqlIdent::new(column))),
        ),
    }
}

/// Insert `rows` into `table`.
pub fn insert(table: impl Into<SqlIdent>, rows: Vec<Values>, opts: InsertOptions) -> Insert {
    Insert {
        table: table.into(),
        rows,
        opts,
    }
}

/// Insert `row` into `table`, updating the existing row on a conflict over
/// `conflict` columns.
pub fn upsert(table: impl Into<SqlIdent>, row: Values, conflict: &[&str]) -> Upsert {
    Upsert {
        table: table.into(),
        row,
        conflict: conflict.iter().map(|c| c.to_string()).collect(),
    }
}

/// Update the rows of `table` matching `where_` with `changes`.
pub fn update(table: impl Into<SqlIdent>, changes: Values, where_: Where) -> Update {
    Update {
        table: table.into(),
        changes,
        where_,
    }
}

/// Delete the rows of `table` matching `where_`.
pub fn deletes(table: impl Into<SqlIdent>, where_: Where) -> Delete {
    Delete {
        table: table.into(),
        where_,
    }
}

/// Append a SQL string literal, doubling any embedded quote.
pub(crate) fn push_string_literal(fragment: &mut Fragment, s: &str) {
    fragment.push("'");
    if s.contains('\'') {
        fragment.push(&s.replace('\'', "''"));
    } else {
        fragment.push(s);
    }
    fragment.push("'");
}

/// Append the RETURNING clause shared by the write statements: the whole row
/// as `to_jsonb`, or a `jsonb_build_object` over `returning` columns.
pub(crate) fn push_returning(fragment: &mut Fragment, table: &SqlIdent, returning: Option<&[String]>) {
    fragment.push(" RETURNING ");
    match returning {
        Some(columns) => {
            fragment.push("jsonb_build_object(");
            for (i, column) in columns.iter().enumerate() {
                if i > 0 {
                    fragment.push(", ");
                }
                push_string_literal(fragment, column);
                fragment.push(", ");
                fragment.push_ident(SqlIdent::new(column));
            }
            fragment.push(")");
        }
        None => {
            fragment.push("to_jsonb(");
            fragment.push_ident(table.clone());
            fragment.push(".*)");
        }
    }
    fragment.push(&format!(" AS {RESULT_COLUMN}"));
}
