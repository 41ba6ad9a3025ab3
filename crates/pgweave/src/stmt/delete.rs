//! DELETE builder.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::client::GenericClient;
use crate::condition::Where;
use crate::error::{WeaveError, WeaveResult};
use crate::fragment::Fragment;
use crate::ident::SqlIdent;
use crate::render::{render, Rendered};
use crate::stmt::{decode, push_returning, RESULT_COLUMN};

/// A DELETE returning every removed row.
///
/// An empty [`Where`] renders as no WHERE clause at all, deleting the whole
/// table.
#[derive(Clone, Debug)]
pub struct Delete {
    pub(crate) table: SqlIdent,
    pub(crate) where_: Where,
}

impl Delete {
    pub fn compose(&self) -> Fragment {
        let mut fragment = Fragment::raw("DELETE FROM ");
        fragment.push_ident(self.table.clone());
        self.where_.append_to(&mut fragment);
        push_returning(&mut fragment, &self.table, None);
        fragment
    }

    pub fn render(&self) -> WeaveResult<Rendered> {
        render(&self.compose())
    }

    /// Execute and return the deleted rows.
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
