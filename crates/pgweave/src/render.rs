//! Fragment rendering: placeholder numbering and parent-reference resolution.
//!
//! Rendering walks a fragment tree depth-first, left to right, with a single
//! running placeholder counter shared across all nesting levels, so that
//! placeholder `$n` always corresponds to the nth parameter in the returned
//! list regardless of nesting depth.

use crate::error::{WeaveError, WeaveResult};
use crate::fragment::{Fragment, ParamList, Segment};
use crate::ident::SqlIdent;
use std::fmt::Write;

/// The output of rendering: final SQL text plus ordered parameter values.
#[derive(Clone, Debug)]
pub struct Rendered {
    pub sql: String,
    pub params: ParamList,
}

impl Rendered {
    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn tokio_postgres::types::ToSql + Sync)> {
        self.params.as_refs()
    }
}

/// Render a fragment into SQL text and an ordered parameter list.
///
/// Fails with [`WeaveError::Structural`] if the fragment contains a parent
/// column reference with no enclosing query scope to resolve it against.
pub fn render(fragment: &Fragment) -> WeaveResult<Rendered> {
    let mut sql = String::new();
    let mut params = ParamList::new();
    let mut scopes: Vec<&SqlIdent> = Vec::new();
    walk(fragment, &mut sql, &mut params, &mut scopes)?;
    Ok(Rendered { sql, params })
}

fn walk<'a>(
    fragment: &'a Fragment,
    sql: &mut String,
    params: &mut ParamList,
    scopes: &mut Vec<&'a SqlIdent>,
) -> WeaveResult<()> {
    for segment in &fragment.segments {
        match segment {
            Segment::Text(text) => sql.push_str(text),
            Segment::Ident(ident) => ident.write_sql(sql),
            Segment::Param(param) => {
                let idx = params.push_param(param.clone());
                let _ = write!(sql, "${idx}");
            }
            Segment::Nested(inner) => walk(inner, sql, params, scopes)?,
            Segment::Scoped(alias, inner) => {
                scopes.push(alias);
                let result = walk(inner, sql, params, scopes);
                scopes.pop();
                result?;
            }
            Segment::Parent(column) => {
                // The innermost scope is the current query's own table; its
                // direct parent sits one below it on the stack.
                if scopes.len() < 2 {
                    return Err(WeaveError::structural(format!(
                        "parent column reference '{column}' used outside a lateral subquery"
                    )));
                }
                let alias = scopes[scopes.len() - 2];
                alias.write_sql(sql);
                sql.push('.');
                SqlIdent::segment(column.as_str()).write_sql(sql);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_placeholders_in_order() {
        let mut f = Fragment::raw("SELECT * FROM users WHERE a = ");
        f.push_bind(1_i64).push(" AND b = ").push_bind("x");

        let r = render(&f).unwrap();
        assert_eq!(r.sql, "SELECT * FROM users WHERE a = $1 AND b = $2");
        assert_eq!(r.params.len(), 2);
    }

    #[test]
    fn nested_fragments_share_the_counter() {
        let mut inner = Fragment::new();
        inner.push("b = ").push_bind(2_i32).push(" AND c = ").push_bind(3_i32);

        let mut f = Fragment::raw("a = ");
        f.push_bind(1_i32).push(" AND (").push_fragment(inner).push(") AND d = ").push_bind(4_i32);

        let r = render(&f).unwrap();
        assert_eq!(r.sql, "a = $1 AND (b = $2 AND c = $3) AND d = $4");
        assert_eq!(r.params.len(), 4);
    }

    #[test]
    fn deeply_nested_numbering_stays_monotonic() {
        let mut level3 = Fragment::new();
        level3.push_bind(3_i32);
        let mut level2 = Fragment::new();
        level2.push_bind(2_i32).push(", ").push_fragment(level3);
        let mut level1 = Fragment::new();
        level1.push_bind(1_i32).push(", ").push_fragment(level2).push(", ").push_bind(4_i32);

        let r = render(&level1).unwrap();
        assert_eq!(r.sql, "$1, $2, $3, $4");
        assert_eq!(r.params.len(), 4);
    }

    #[test]
    fn zero_param_fragment_renders_empty_list() {
        let mut f = Fragment::raw("SELECT ");
        f.push_ident("users").push(".*");
        let r = render(&f).unwrap();
        assert_eq!(r.sql, "SELECT users.*");
        assert!(r.params.is_empty());
    }

    #[test]
    fn parent_reference_resolves_to_direct_enclosing_scope() {
        let mut child = Fragment::new();
        child.push("user_id = ").push_parent("id");

        let mut parent_body = Fragment::raw("SELECT 1 FROM posts WHERE ");
        parent_body.push_scoped(SqlIdent::new("posts"), child);

        let mut root = Fragment::new();
        root.push_scoped(SqlIdent::new("users"), parent_body);

        let r = render(&root).unwrap();
        assert_eq!(r.sql, "SELECT 1 FROM posts WHERE user_id = users.id");
    }

    #[test]
    fn double_nested_parent_skips_no_levels() {
        // grandparent -> parent -> child; the child's reference must bind to
        // the parent, not the grandparent.
        let mut child = Fragment::new();
        child.push_parent("pid");
        let mut mid = Fragment::new();
        mid.push_scoped(SqlIdent::new("mid_table"), child);
        let mut mid_scope = Fragment::new();
        mid_scope.push_scoped(SqlIdent::new("parent_table"), mid);
        let mut root = Fragment::new();
        root.push_scoped(SqlIdent::new("grandparent_table"), mid_scope);

        let r = render(&root).unwrap();
        assert_eq!(r.sql, "parent_table.pid");
    }

    #[test]
    fn parent_reference_without_scope_is_structural_error() {
        let mut f = Fragment::new();
        f.push_parent("id");
        let err = render(&f).unwrap_err();
        assert!(err.is_structural());

        // A single scope is the query's own table, still no parent.
        let mut body = Fragment::new();
        body.push_parent("id");
        let mut root = Fragment::new();
        root.push_scoped(SqlIdent::new("users"), body);
        assert!(render(&root).unwrap_err().is_structural());
    }
}
