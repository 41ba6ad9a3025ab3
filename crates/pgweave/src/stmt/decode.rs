//! Client-side post-processing of the `jsonb` payloads queries return.
//!
//! The SQL side produces one `result` column per statement. This module
//! unwraps it according to the shape of the query that produced it: arrays
//! for many-row selects, single objects for one-row selects, and recursive
//! transformation of every lateral subtree.

use serde_json::Value;
use tokio_postgres::Row;

use crate::error::{WeaveError, WeaveResult};
use crate::stmt::select::{Lateral, SelectMode, Subquery};
use crate::stmt::RESULT_COLUMN;

/// Pull the `result` column out of a row as JSON.
///
/// `to_jsonb` of an empty aggregate is SQL NULL, which arrives as a missing
/// value rather than JSON null, so the column is read as an `Option`.
pub(crate) fn json_result(row: &Row) -> WeaveResult<Value> {
    row.try_get::<_, Option<Value>>(RESULT_COLUMN)
        .map(|v| v.unwrap_or(Value::Null))
        .map_err(|e| WeaveError::decode(RESULT_COLUMN, e.to_string()))
}

/// Transform the raw payload of `core` into its final shape.
pub(crate) fn transform_result(value: Value, core: &Subquery) -> WeaveResult<Value> {
    match &core.mode {
        SelectMode::Many => match value {
            Value::Array(items) => items
                .into_iter()
                .map(|row| transform_row(row, core))
                .collect::<WeaveResult<Vec<_>>>()
                .map(Value::Array),
            other => Err(WeaveError::decode(
                RESULT_COLUMN,
                format!("expected a JSON array for {}, got {other}", core.table.tail()),
            )),
        },
        SelectMode::ExactlyOne => match value {
            Value::Array(mut items) => {
                if items.len() != 1 {
                    return Err(WeaveError::not_exactly_one(core.table.tail(), items.len()));
                }
                let row = items.pop().expect("length checked above");
                transform_row(row, core)
            }
            other => Err(WeaveError::decode(
                RESULT_COLUMN,
                format!("expected a JSON array for {}, got {other}", core.table.tail()),
            )),
        },
        SelectMode::One => {
            if value.is_null() {
                Ok(Value::Null)
            } else {
                transform_row(value, core)
            }
        }
        SelectMode::Scalar(_) => Ok(value),
    }
}

/// Transform one already-unwrapped row, recursing into lateral subtrees.
fn transform_row(row: Value, core: &Subquery) -> WeaveResult<Value> {
    match &core.opts.lateral {
        Lateral::None => Ok(row),
        Lateral::Passthrough(subquery) => transform_result(row, subquery),
        Lateral::Map(entries) => {
            let Value::Object(mut object) = row else {
                return Err(WeaveError::decode(
                    RESULT_COLUMN,
                    format!("expected a JSON object for {}, got {row}", core.table.tail()),
                ));
            };
            for (key, subquery) in entries {
                let nested = object.remove(key).unwrap_or(Value::Null);
                object.insert(key.clone(), transform_result(nested, subquery)?);
            }
            Ok(Value::Object(object))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{all, parent, Where};
    use crate::stmt::{count, select, select_exactly_one, select_one, SelectOptions};
    use serde_json::json;

    fn core(q: impl Into<Subquery>) -> Subquery {
        q.into()
    }

    #[test]
    fn exactly_one_lateral_unwraps_its_single_element() {
        let q = select(
            "authors",
            all(),
            SelectOptions::new().lateral(
                "publisher",
                select_exactly_one(
                    "publishers",
                    Where::all().col("id", parent("publisher_id")),
                    SelectOptions::new(),
                ),
            ),
        );
        let raw = json!([{"id": 1, "publisher": [{"id": 9, "name": "acme"}]}]);
        let out = transform_result(raw, &core(q)).unwrap();
        assert_eq!(out, json!([{"id": 1, "publisher": {"id": 9, "name": "acme"}}]));
    }

    #[test]
    fn exactly_one_lateral_with_no_match_errors() {
        let q = select(
            "authors",
            all(),
            SelectOptions::new().lateral(
                "publisher",
                select_exactly_one(
                    "publishers",
                    Where::all().col("id", parent("publisher_id")),
                    SelectOptions::new(),
                ),
            ),
        );
        let raw = json!([{"id": 1, "publisher": []}]);
        let err = transform_result(raw, &core(q)).unwrap_err();
        assert!(err.is_not_exactly_one());
    }

    #[test]
    fn top_level_exactly_one_rejects_zero_and_many() {
        let q = core(select_exactly_one("users", all(), SelectOptions::new()));
        assert!(transform_result(json!([]), &q).unwrap_err().is_not_exactly_one());
        assert!(transform_result(json!([{"id": 1}, {"id": 2}]), &q)
            .unwrap_err()
            .is_not_exactly_one());
        assert_eq!(transform_result(json!([{"id": 1}]), &q).unwrap(), json!({"id": 1}));
    }

    #[test]
    fn one_mode_keeps_null_for_no_match() {
        let q = select(
            "users",
            all(),
            SelectOptions::new().lateral(
                "latest_login",
                select_one(
                    "logins",
                    Where::all().col("user_id", parent("id")),
                    SelectOptions::new(),
                ),
            ),
        );
        let raw = json!([{"id": 1, "latest_login": null}]);
        let out = transform_result(raw, &core(q)).unwrap();
        assert_eq!(out, json!([{"id": 1, "latest_login": null}]));

        let q = core(select_one("users", all(), SelectOptions::new()));
        assert_eq!(transform_result(Value::Null, &q).unwrap(), Value::Null);
    }

    #[test]
    fn passthrough_transforms_each_replacement() {
        let q = select(
            "orders",
            all(),
            SelectOptions::new().passthrough(select_exactly_one(
                "customers",
                Where::all().col("id", parent("customer_id")),
                SelectOptions::new(),
            )),
        );
        let raw = json!([[{"id": 2}], [{"id": 5}]]);
        let out = transform_result(raw, &core(q)).unwrap();
        assert_eq!(out, json!([{"id": 2}, {"id": 5}]));
    }

    #[test]
    fn scalar_laterals_pass_through_unchanged() {
        let q = select(
            "authors",
            all(),
            SelectOptions::new().lateral(
                "bookCount",
                count("books", Where::all().col("author_id", parent("id"))),
            ),
        );
        let raw = json!([{"id": 1, "bookCount": 3}]);
        let out = transform_result(raw, &core(q)).unwrap();
        assert_eq!(out, json!([{"id": 1, "bookCount": 3}]));
    }
}
