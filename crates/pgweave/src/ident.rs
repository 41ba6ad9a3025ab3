//! SQL identifier quoting.
//!
//! [`SqlIdent`] represents a table, column, or schema name, optionally dotted
//! (`schema.table.column`). Each segment is rendered bare when it survives
//! Postgres case folding unchanged (`[a-z_][a-z0-9_]*`), and double-quoted
//! otherwise, with any embedded `"` doubled. Quoting is a rendering decision:
//! constructing an identifier never fails, and any string round-trips through
//! the quoted form.

/// A SQL identifier (column, table, or schema name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlIdent {
    segments: Vec<String>,
}

impl SqlIdent {
    /// Create an identifier from a possibly dotted name.
    ///
    /// `.` acts as a path separator: `"public.users"` renders as two
    /// segments. For a name that literally contains a dot, use
    /// [`SqlIdent::segment`].
    pub fn new(name: &str) -> Self {
        Self {
            segments: name.split('.').map(str::to_string).collect(),
        }
    }

    /// Create a single-segment identifier, taking the name verbatim.
    pub fn segment(name: impl Into<String>) -> Self {
        Self {
            segments: vec![name.into()],
        }
    }

    /// Create a dotted identifier from explicit segments.
    pub fn path(segments: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// The last segment of the path (the column for `table.column`).
    pub fn tail(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            if needs_quoting(seg) {
                out.push('"');
                for ch in seg.chars() {
                    if ch == '"' {
                        out.push('"');
                    }
                    out.push(ch);
                }
                out.push('"');
            } else {
                out.push_str(seg);
            }
        }
    }
}

impl From<&str> for SqlIdent {
    fn from(name: &str) -> Self {
        SqlIdent::new(name)
    }
}

impl From<String> for SqlIdent {
    fn from(name: String) -> Self {
        SqlIdent::new(&name)
    }
}

/// Whether a segment must be quoted to render faithfully.
///
/// Anything with an uppercase letter is quoted, since a bare identifier is
/// folded to lowercase by the server.
fn needs_quoting(seg: &str) -> bool {
    let mut chars = seg.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_lowercase() => {}
        _ => return true,
    }
    !chars.all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit())
}
