//! Column-independent query conditions.
//!
//! A [`Condition`] describes a comparison without naming the column it
//! applies to; a [`Where`] map binds conditions to columns and combines them
//! with implicit AND. Conditions resolve into [`Fragment`]s, so placeholder
//! numbering is delegated entirely to the renderer.
//!
//! NULL handling: `eq`/`ne` bind their value as an ordinary parameter, so a
//! SQL NULL on either side compares to unknown and matches nothing (standard
//! SQL semantics). For NULL-safe comparison use [`distinct_from`] /
//! [`not_distinct_from`], or [`is_null`] / [`is_not_null`].

use crate::fragment::{Fragment, Param};
use crate::ident::SqlIdent;
use tokio_postgres::types::ToSql;

/// A comparison to be bound to a column inside a WHERE clause.
#[derive(Clone, Debug)]
pub enum Condition {
    /// column = value
    Eq(Param),
    /// column <> value
    Ne(Param),
    /// column > value
    Gt(Param),
    /// column >= value
    Gte(Param),
    /// column < value
    Lt(Param),
    /// column <= value
    Lte(Param),
    /// column IN (values...); empty list short-circuits to constant false
    In(Vec<Param>),
    /// column NOT IN (values...); empty list short-circuits to constant true
    NotIn(Vec<Param>),
    /// column IS DISTINCT FROM value (NULL-safe inequality)
    DistinctFrom(Param),
    /// column IS NOT DISTINCT FROM value (NULL-safe equality)
    NotDistinctFrom(Param),
    /// column IS NULL
    IsNull,
    /// column IS NOT NULL
    IsNotNull,
    /// column = the named column of the enclosing query's row.
    ///
    /// Only resolvable inside a lateral subquery; rendering fails with a
    /// structural error otherwise.
    ParentEq(String),
    /// All sub-conditions hold for the column
    And(Vec<Condition>),
    /// Any sub-condition holds for the column
    Or(Vec<Condition>),
    /// The sub-condition does not hold for the column
    Not(Box<Condition>),
}

/// column = value
pub fn eq<T: ToSql + Send + Sync + 'static>(value: T) -> Condition {
    Condition::Eq(Param::new(value))
}

/// column <> value
pub fn ne<T: ToSql + Send + Sync + 'static>(value: T) -> Condition {
    Condition::Ne(Param::new(value))
}

/// column > value
pub fn gt<T: ToSql + Send + Sync + 'static>(value: T) -> Condition {
    Condition::Gt(Param::new(value))
}

/// column >= value
pub fn gte<T: ToSql + Send + Sync + 'static>(value: T) -> Condition {
    Condition::Gte(Param::new(value))
}

/// column < value
pub fn lt<T: ToSql + Send + Sync + 'static>(value: T) -> Condition {
    Condition::Lt(Param::new(value))
}

/// column <= value
pub fn lte<T: ToSql + Send + Sync + 'static>(value: T) -> Condition {
    Condition::Lte(Param::new(value))
}

/// column IN (values...)
pub fn is_in<T: ToSql + Send + Sync + 'static>(values: Vec<T>) -> Condition {
    Condition::In(values.into_iter().map(Param::new).collect())
}

/// column NOT IN (values...)
pub fn not_in<T: ToSql + Send + Sync + 'static>(values: Vec<T>) -> Condition {
    Condition::NotIn(values.into_iter().map(Param::new).collect())
}

/// column IS DISTINCT FROM value
pub fn distinct_from<T: ToSql + Send + Sync + 'static>(value: T) -> Condition {
    Condition::DistinctFrom(Param::new(value))
}

/// column IS NOT DISTINCT FROM value
pub fn not_distinct_from<T: ToSql + Send + Sync + 'static>(value: T) -> Condition {
    Condition::NotDistinctFrom(Param::new(value))
}

/// column IS NULL
pub fn is_null() -> Condition {
    Condition::IsNull
}

/// column IS NOT NULL
pub fn is_not_null() -> Condition {
    Condition::IsNotNull
}

/// All conditions hold for the column.
pub fn and(conditions: Vec<Condition>) -> Condition {
    Condition::And(conditions)
}

/// Any condition holds for the column.
pub fn or(conditions: Vec<Condition>) -> Condition {
    Condition::Or(conditions)
}

/// The condition does not hold for the column.
pub fn not(condition: Condition) -> Condition {
    Condition::Not(Box::new(condition))
}

/// column = the enclosing query's row, column `column`.
///
/// Usable only inside the condition map of a nested (lateral) builder.
pub fn parent(column: &str) -> Condition {
    Condition::ParentEq(column.to_string())
}

impl Condition {
    /// Resolve this condition against a column, appending the SQL shape to
    /// `fragment`.
    pub(crate) fn append_to(&self, column: &SqlIdent, fragment: &mut Fragment) {
        match self {
            Condition::Eq(v) => binary(column, "=", v, fragment),
            Condition::Ne(v) => binary(column, "<>", v, fragment),
            Condition::Gt(v) => binary(column, ">", v, fragment),
            Condition::Gte(v) => binary(column, ">=", v, fragment),
            Condition::Lt(v) => binary(column, "<", v, fragment),
            Condition::Lte(v) => binary(column, "<=", v, fragment),
            Condition::DistinctFrom(v) => binary(column, "IS DISTINCT FROM", v, fragment),
            Condition::NotDistinctFrom(v) => binary(column, "IS NOT DISTINCT FROM", v, fragment),
            Condition::In(values) => in_list(column, "IN", values, "1=0", fragment),
            Condition::NotIn(values) => in_list(column, "NOT IN", values, "1=1", fragment),
            Condition::IsNull => {
                fragment.push_ident(column.clone());
                fragment.push(" IS NULL");
            }
            Condition::IsNotNull => {
                fragment.push_ident(column.clone());
                fragment.push(" IS NOT NULL");
            }
            Condition::ParentEq(parent_col) => {
                fragment.push_ident(column.clone());
                fragment.push(" = ");
                fragment.push_parent(parent_col);
            }
            Condition::And(conditions) => combine(column, "AND", conditions, fragment),
            Condition::Or(conditions) => combine(column, "OR", conditions, fragment),
            Condition::Not(inner) => {
                fragment.push("NOT (");
                inner.append_to(column, fragment);
                fragment.push(")");
            }
        }
    }
}

fn binary(column: &SqlIdent, operator: &str, value: &Param, fragment: &mut Fragment) {
    fragment.push_ident(column.clone());
    fragment.push(" ");
    fragment.push(operator);
    fragment.push(" ");
    fragment.push_param(value.clone());
}

fn in_list(
    column: &SqlIdent,
    operator: &str,
    values: &[Param],
    empty_constant: &str,
    fragment: &mut Fragment,
) {
    if values.is_empty() {
        fragment.push(empty_constant);
        return;
    }
    fragment.push_ident(column.clone());
    fragment.push(" ");
    fragment.push(operator);
    fragment.push(" (");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            fragment.push(", ");
        }
        fragment.push_param(value.clone());
    }
    fragment.push(")");
}

fn combine(column: &SqlIdent, joiner: &str, conditions: &[Condition], fragment: &mut Fragment) {
    if conditions.is_empty() {
        // Empty AND is vacuously true, empty OR matches nothing.
        fragment.push(if joiner == "AND" { "1=1" } else { "1=0" });
        return;
    }
    fragment.push("(");
    for (i, condition) in conditions.iter().enumerate() {
        if i > 0 {
            fragment.push(" ");
            fragment.push(joiner);
            fragment.push(" ");
        }
        condition.append_to(column, fragment);
    }
    fragment.push(")");
}

/// An ordered column-to-condition map, combined with implicit AND.
#[derive(Clone, Debug, Default)]
pub struct Where {
    entries: Vec<(SqlIdent, Condition)>,
}

/// The no-filter sentinel: matches every row.
pub fn all() -> Where {
    Where::default()
}

impl Where {
    /// A WHERE map with no entries (matches every row).
    pub fn all() -> Self {
        Self::default()
    }

    /// Bind a condition to a column.
    pub fn col(mut self, column: impl Into<SqlIdent>, condition: Condition) -> Self {
        self.entries.push((column.into(), condition));
        self
    }

    /// Whether this map constrains anything.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append ` WHERE ...` to the fragment; no-op when unconstrained.
    pub(crate) fn append_to(&self, fragment: &mut Fragment) {
        if self.entries.is_empty() {
            return;
        }
        fragment.push(" WHERE ");
        for (i, (column, condition)) in self.entries.iter().enumerate() {
            if i > 0 {
                fragment.push(" AND ");
            }
            condition.append_to(column, fragment);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;

    fn resolve(column: &str, condition: &Condition) -> (String, usize) {
        let mut fragment = Fragment::new();
        condition.append_to(&SqlIdent::new(column), &mut fragment);
        let rendered = render(&fragment).unwrap();
        (rendered.sql, rendered.params.len())
    }

    #[test]
    fn eq_renders_placeholder() {
        assert_eq!(resolve("id", &eq(42_i64)), ("id = $1".to_string(), 1));
    }

    #[test]
    fn ne_uses_standard_operator() {
        assert_eq!(resolve("id", &ne(42_i64)), ("id <> $1".to_string(), 1));
    }

    #[test]
    fn range_operators() {
        assert_eq!(resolve("age", &gt(18_i32)).0, "age > $1");
        assert_eq!(resolve("age", &gte(18_i32)).0, "age >= $1");
        assert_eq!(resolve("age", &lt(65_i32)).0, "age < $1");
        assert_eq!(resolve("age", &lte(65_i32)).0, "age <= $1");
    }

    #[test]
    fn in_list_numbers_each_value() {
        assert_eq!(
            resolve("id", &is_in(vec![1_i64, 2, 3])),
            ("id IN ($1, $2, $3)".to_string(), 3)
        );
        assert_eq!(
            resolve("id", &not_in(vec![1_i64, 2])),
            ("id NOT IN ($1, $2)".to_string(), 2)
        );
    }

    #[test]
    fn empty_in_is_constant_false() {
        assert_eq!(resolve("id", &is_in(Vec::<i64>::new())), ("1=0".to_string(), 0));
    }

    #[test]
    fn empty_not_in_is_constant_true() {
        assert_eq!(resolve("id", &not_in(Vec::<i64>::new())), ("1=1".to_string(), 0));
    }

    #[test]
    fn null_safe_comparisons() {
        assert_eq!(
            resolve("nick", &distinct_from(Option::<String>::None)).0,
            "nick IS DISTINCT FROM $1"
        );
        assert_eq!(
            resolve("nick", &not_distinct_from("x")).0,
            "nick IS NOT DISTINCT FROM $1"
        );
    }

    #[test]
    fn null_checks_take_no_params() {
        assert_eq!(resolve("deleted_at", &is_null()), ("deleted_at IS NULL".to_string(), 0));
        assert_eq!(
            resolve("deleted_at", &is_not_null()),
            ("deleted_at IS NOT NULL".to_string(), 0)
        );
    }

    #[test]
    fn combinators_apply_to_the_same_column() {
        assert_eq!(
            resolve("age", &and(vec![gte(18_i32), lt(65_i32)])),
            ("(age >= $1 AND age < $2)".to_string(), 2)
        );
        assert_eq!(
            resolve("status", &or(vec![eq("new"), eq("open")])).0,
            "(status = $1 OR status = $2)"
        );
        assert_eq!(
            resolve("status", &not(eq("closed"))).0,
            "NOT (status = $1)"
        );
    }

    #[test]
    fn quoted_column_in_condition() {
        assert_eq!(resolve("my col", &eq(1_i32)).0, r#""my col" = $1"#);
    }

    #[test]
    fn where_map_ands_entries_in_order() {
        let w = Where::all()
            .col("status", eq("active"))
            .col("age", gt(18_i32));
        let mut fragment = Fragment::raw("SELECT * FROM users");
        w.append_to(&mut fragment);
        let rendered = render(&fragment).unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT * FROM users WHERE status = $1 AND age > $2"
        );
        assert_eq!(rendered.params.len(), 2);
    }

    #[test]
    fn all_appends_nothing() {
        let mut fragment = Fragment::raw("SELECT * FROM users");
        all().append_to(&mut fragment);
        assert_eq!(render(&fragment).unwrap().sql, "SELECT * FROM users");
    }

    #[test]
    fn parent_condition_requires_scope() {
        let mut fragment = Fragment::new();
        parent("id").append_to(&SqlIdent::new("user_id"), &mut fragment);
        assert!(render(&fragment).unwrap_err().is_structural());
    }
}
