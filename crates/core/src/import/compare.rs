//! Field-by-field comparison between a stored entity and an incoming payload.

use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::types::Payload;

/// One field on which the stored entity and the incoming payload disagree.
///
/// `None` on either side means the field is not populated there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldMismatch {
    pub field: String,
    pub stored: Option<Value>,
    pub incoming: Option<Value>,
}

/// List every populated field that differs between `stored` and `incoming`.
///
/// A field counts as populated when it is present with a non-null value, so
/// an explicit `null` and an absent key are the same thing. Fields present on
/// only one side are mismatches. Values compare with plain JSON equality:
/// `1` and `1.0` differ, as do `"1"` and `1`.
pub fn mismatched_fields(stored: &Payload, incoming: &Payload) -> Vec<FieldMismatch> {
    let fields: BTreeSet<&String> = populated(stored).chain(populated(incoming)).collect();

    fields
        .into_iter()
        .filter_map(|field| {
            let stored_value = stored.get(field).filter(|v| !v.is_null());
            let incoming_value = incoming.get(field).filter(|v| !v.is_null());
            if stored_value == incoming_value {
                None
            } else {
                Some(FieldMismatch {
                    field: field.clone(),
                    stored: stored_value.cloned(),
                    incoming: incoming_value.cloned(),
                })
            }
        })
        .collect()
}

fn populated(payload: &Payload) -> impl Iterator<Item = &String> {
    payload
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, _)| key)
}
