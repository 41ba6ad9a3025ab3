//! Ordered column/value maps for INSERT and UPDATE.

use crate::fragment::{Fragment, Param};
use tokio_postgres::types::ToSql;

/// One value destined for a column.
#[derive(Clone, Debug)]
pub(crate) enum ValueEntry {
    /// A bound parameter.
    Param(Param),
    /// The column's DEFAULT.
    Default,
}

/// An ordered column-to-value map for one row.
///
/// Column order is preserved and becomes the column order of the statement.
#[derive(Clone, Debug, Default)]
pub struct Values {
    pub(crate) entries: Vec<(String, ValueEntry)>,
}

impl Values {
    /// Create an empty row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a column value.
    pub fn set<T: ToSql + Send + Sync + 'static>(mut self, column: &str, value: T) -> Self {
        self.entries
            .push((column.to_string(), ValueEntry::Param(Param::new(value))));
        self
    }

    /// Use the column's DEFAULT explicitly.
    pub fn set_default(mut self, column: &str) -> Self {
        self.entries.push((column.to_string(), ValueEntry::Default));
        self
    }

    /// The columns of this row, in insertion order.
    pub(crate) fn columns(&self) -> Vec<&str> {
        self.entries.iter().map(|(c, _)| c.as_str()).collect()
    }

    /// Whether this row sets any column.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append this row's value list: `$1, DEFAULT, $2, ...`
    pub(crate) fn append_value_list(&self, fragment: &mut Fragment) {
        for (i, (_, entry)) in self.entries.iter().enumerate() {
            if i > 0 {
                fragment.push(", ");
            }
            match entry {
                ValueEntry::Param(p) => {
                    fragment.push_param(p.clone());
                }
                ValueEntry::Default => {
                    fragment.push("DEFAULT");
                }
            }
        }
    }
}
