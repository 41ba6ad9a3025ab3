//! # pgweave
//!
//! A typed SQL composition layer for Postgres.
//!
//! ## Features
//!
//! - **Composable fragments**: build SQL from literal text, quoted
//!   identifiers, bound parameters, and nested fragments; placeholders are
//!   numbered once, at render time
//! - **Condition resolvers**: `eq`, `is_in`, `distinct_from`, range and
//!   boolean combinators, resolved against a column at render time
//! - **Whole-statement builders**: `select` and friends, `insert`, `update`,
//!   `deletes`, `upsert`, and scalar aggregates, all returning JSON-shaped
//!   rows
//! - **Lateral subqueries**: fetch related rows in a single round trip, with
//!   `parent(..)` conditions referencing the enclosing row
//! - **Transaction-friendly**: every `run` takes anything implementing
//!   [`GenericClient`]
//!
//! ## Example
//!
//! ```ignore
//! use pgweave::{all, count, eq, parent, select, SelectOptions, Where};
//!
//! let authors = select(
//!     "authors",
//!     Where::all().col("active", eq(true)),
//!     SelectOptions::new().lateral(
//!         "bookCount",
//!         count("books", Where::all().col("author_id", parent("id"))),
//!     ),
//! );
//! let rows = authors.run(&client).await?;
//! ```

pub mod client;
pub mod condition;
pub mod error;
pub mod fragment;
pub mod ident;
pub mod render;
pub mod stmt;

pub use client::GenericClient;
pub use condition::{
    all, and, distinct_from, eq, gt, gte, is_in, is_not_null, is_null, lt, lte, ne, not,
    not_distinct_from, not_in, or, parent, Condition, Where,
};
pub use error::{WeaveError, WeaveResult};
pub use fragment::{Fragment, Param, ParamList, Slot};
pub use ident::SqlIdent;
pub use render::{render, Rendered};
pub use stmt::{
    count, deletes, insert, max, select, select_exactly_one, select_one, sum, update, upsert,
    Aggregate, Delete, Direction, Insert, InsertOptions, Select, SelectExactlyOne, SelectOne,
    SelectOptions, Subquery, Update, Upsert, Values,
};

#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{create_pool, create_pool_with_config, create_pool_with_manager_config};
