//! Composable SQL fragments.
//!
//! A [`Fragment`] is an ordered sequence of segments: literal text, quoted
//! identifiers, bound parameters, references to the enclosing query's row,
//! and nested fragments. Fragments are assembled by the statement builders
//! and rendered once by [`crate::render::render`], which assigns `$1, $2, ...`
//! placeholders in left-to-right order across all nesting levels.
//!
//! Bound parameters are never textually substituted into the SQL; they travel
//! separately to the driver. Identifiers are never parameterized (Postgres
//! does not allow it) and are quoted by [`SqlIdent`] instead.

use crate::ident::SqlIdent;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// A clone-friendly bound parameter.
///
/// Wrapping in `Arc` lets fragments and builders be cloned without copying
/// parameter values. Structurally identical values bound twice stay two
/// distinct parameters; the renderer never dedupes.
#[derive(Clone)]
pub struct Param(pub(crate) Arc<dyn ToSql + Send + Sync>);

impl Param {
    /// Create a new parameter from any ToSql value.
    pub fn new<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Param(Arc::new(value))
    }

    /// Get a reference to the inner value as a ToSql trait object.
    pub fn as_ref(&self) -> &(dyn ToSql + Sync) {
        &*self.0 as &(dyn ToSql + Sync)
    }
}

impl std::fmt::Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Param").field(&"<dyn ToSql>").finish()
    }
}

/// An ordered parameter list produced by rendering.
#[derive(Clone, Debug, Default)]
pub struct ParamList {
    params: Vec<Param>,
}

impl ParamList {
    /// Create a new empty parameter list.
    pub fn new() -> Self {
        Self { params: Vec::new() }
    }

    /// Add a parameter and return its 1-based placeholder index.
    pub fn push_param(&mut self, param: Param) -> usize {
        self.params.push(param);
        self.params.len()
    }

    /// Get the current parameter count.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Get all parameters as references compatible with tokio-postgres.
    pub fn as_refs(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

/// One segment of a fragment.
#[derive(Clone, Debug)]
pub(crate) enum Segment {
    /// Literal SQL text.
    Text(String),
    /// A quoted identifier, spliced into the text with no parameter.
    Ident(SqlIdent),
    /// A bound parameter, emitted as the next `$n` placeholder.
    Param(Param),
    /// A nested fragment, rendered in place with the same running counter.
    Nested(Fragment),
    /// A nested fragment that opens a new query scope for the given alias.
    ///
    /// Parent references inside the subtree resolve against the scope chain
    /// this establishes.
    Scoped(SqlIdent, Fragment),
    /// A reference to the named column of the directly enclosing scope's row.
    ///
    /// Fails at render time if there is no enclosing scope.
    Parent(String),
}

/// A value interpolated between literal text pieces by
/// [`Fragment::interleave`].
///
/// The variant decides how the value lands in the SQL: a fragment is spliced
/// in (sharing the placeholder counter), an identifier is quoted into the
/// text, and anything bound becomes a `$n` parameter. There is no variant
/// that concatenates an untrusted string into the SQL text.
#[derive(Clone, Debug)]
pub enum Slot {
    Fragment(Fragment),
    Ident(SqlIdent),
    Value(Param),
}

impl Slot {
    /// Bind a value as a parameter slot.
    pub fn bind<T: ToSql + Send + Sync + 'static>(value: T) -> Self {
        Slot::Value(Param::new(value))
    }
}

impl From<Fragment> for Slot {
    fn from(fragment: Fragment) -> Self {
        Slot::Fragment(fragment)
    }
}

impl From<SqlIdent> for Slot {
    fn from(ident: SqlIdent) -> Self {
        Slot::Ident(ident)
    }
}

impl From<Param> for Slot {
    fn from(param: Param) -> Self {
        Slot::Value(param)
    }
}

/// A composable SQL template.
#[derive(Clone, Debug, Default)]
pub struct Fragment {
    pub(crate) segments: Vec<Segment>,
}

impl Fragment {
    /// Create an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fragment from an initial piece of literal SQL.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Text(sql.into())],
        }
    }

    /// Interleave literal text pieces with typed slots.
    ///
    /// `pieces[0]` comes first, then slots and pieces alternate; pieces
    /// beyond the last slot are appended verbatim, surplus slots are
    /// appended after the last piece.
    ///
    /// ```ignore
    /// let f = Fragment::interleave(
    ///     &["SELECT * FROM ", " WHERE id = "],
    ///     [Slot::from(SqlIdent::new("users")), Slot::bind(7_i64)],
    /// );
    /// ```
    pub fn interleave(pieces: &[&str], slots: impl IntoIterator<Item = Slot>) -> Self {
        let mut fragment = Fragment::new();
        let mut slots = slots.into_iter();
        for (i, piece) in pieces.iter().enumerate() {
            if i > 0 {
                if let Some(slot) = slots.next() {
                    fragment.push_slot(slot);
                }
            }
            fragment.push(piece);
        }
        for slot in slots {
            fragment.push_slot(slot);
        }
        fragment
    }

    fn push_slot(&mut self, slot: Slot) {
        match slot {
            Slot::Fragment(inner) => {
                self.push_fragment(inner);
            }
            Slot::Ident(ident) => {
                self.push_ident(ident);
            }
            Slot::Value(param) => {
                self.push_param(param);
            }
        }
    }

    /// Append literal SQL text.
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }
        match self.segments.last_mut() {
            Some(Segment::Text(last)) => last.push_str(sql),
            _ => self.segments.push(Segment::Text(sql.to_string())),
        }
        self
    }

    /// Append a quoted identifier.
    pub fn push_ident(&mut self, ident: impl Into<SqlIdent>) -> &mut Self {
        self.segments.push(Segment::Ident(ident.into()));
        self
    }

    /// Append a parameter placeholder bound to `value`.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: ToSql + Send + Sync + 'static,
    {
        self.push_param(Param::new(value))
    }

    /// Append a placeholder bound to an already-wrapped [`Param`].
    pub fn push_param(&mut self, param: Param) -> &mut Self {
        self.segments.push(Segment::Param(param));
        self
    }

    /// Splice in another fragment, consuming it.
    ///
    /// The nested fragment's placeholders are numbered with the same running
    /// counter as the outer fragment when rendered.
    pub fn push_fragment(&mut self, other: Fragment) -> &mut Self {
        self.segments.push(Segment::Nested(other));
        self
    }

    /// Splice in a fragment that opens a new query scope for `alias`.
    pub(crate) fn push_scoped(&mut self, alias: SqlIdent, inner: Fragment) -> &mut Self {
        self.segments.push(Segment::Scoped(alias, inner));
        self
    }

    /// Append a reference to the enclosing query's row, column `column`.
    pub fn push_parent(&mut self, column: &str) -> &mut Self {
        self.segments.push(Segment::Parent(column.to_string()));
        self
    }

    /// Count the bound parameters across all nesting levels.
    pub fn param_count(&self) -> usize {
        self.segments
            .iter()
            .map(|seg| match seg {
                Segment::Param(_) => 1,
                Segment::Nested(f) | Segment::Scoped(_, f) => f.param_count(),
                _ => 0,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_segments_merge() {
        let mut f = Fragment::raw("SELECT ");
        f.push("1").push(" + ").push("2");
        assert_eq!(f.segments.len(), 1);
    }

    #[test]
    fn push_empty_text_is_noop() {
        let mut f = Fragment::new();
        f.push("");
        assert!(f.segments.is_empty());
    }

    #[test]
    fn param_count_recurses() {
        let mut inner = Fragment::new();
        inner.push_bind(1_i32).push_bind(2_i32);

        let mut outer = Fragment::new();
        outer.push_bind("x").push_fragment(inner).push_bind(3_i64);
        assert_eq!(outer.param_count(), 4);
    }

    #[test]
    fn interleave_classifies_slots() {
        let filter = {
            let mut f = Fragment::raw("id = ");
            f.push_bind(7_i64);
            f
        };
        let fragment = Fragment::interleave(
            &["SELECT * FROM ", " WHERE ", " AND name = "],
            [
                Slot::from(SqlIdent::new("public.users")),
                Slot::from(filter),
                Slot::bind("alice"),
            ],
        );
        let rendered = crate::render::render(&fragment).unwrap();
        assert_eq!(
            rendered.sql,
            "SELECT * FROM public.users WHERE id = $1 AND name = $2"
        );
        assert_eq!(rendered.params.len(), 2);
    }
}
