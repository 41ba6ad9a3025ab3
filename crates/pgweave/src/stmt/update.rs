//! UPDATE builder.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::GenericClient;
use crate::condition::Where;
use crate::error::{WeaveError, WeaveResult};
use crate::fragment::Fragment;
use crate::ident::SqlIdent;
use crate::render::{render, Rendered};
use crate::stmt::values::{ValueEntry, Values};
use crate::stmt::{decode, push_returning, RESULT_COLUMN};

/// An UPDATE returning every changed row.
#[derive(Clone, Debug)]
pub struct Update {
    pub(crate) table: SqlIdent,
    pub(crate) changes: Values,
    pub(crate) where_: Where,
}

impl Update {
    fn validate(&self) -> WeaveResult<()> {
        if self.changes.is_empty() {
            return Err(WeaveError::structural(format!(
                "update of {} sets no columns",
                self.table.tail()
            )));
        }
        Ok(())
    }

    pub fn compose(&self) -> Fragment {
        let mut fragment = Fragment::raw("UPDATE ");
        fragment.push_ident(self.table.clone());
        fragment.push(" SET ");
        for (i, (column, entry)) in self.changes.entries.iter().enumerate() {
            if i > 0 {
                fragment.push(", ");
            }
            fragment.push_ident(SqlIdent::new(column));
            fragment.push(" = ");
            match entry {
                ValueEntry::Param(p) => {
                    fragment.push_param(p.clone());
                }
                ValueEntry::Default => {
                    fragment.push("DEFAULT");
                }
            }
        }
        self.where_.append_to(&mut fragment);
        push_returning(&mut fragment, &self.table, None);
        fragment
    }

    pub fn render(&self) -> WeaveResult<Rendered> {
        self.validate()?;
        render(&self.compose())
    }

    /// Execute and return the updated rows; no match yields an empty vec.
    pub async fn run(&self, conn: &impl GenericClient) -> WeaveResult<Vec<Value>> {
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
