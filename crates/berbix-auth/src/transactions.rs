//! Request bodies for transaction updates

use std::collections::BTreeMap;

use serde::Serialize;

/// Body for `PATCH /v0/transactions`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateTransactionOptions {
    /// Review decision, e.g. `accept` or `reject`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Body for `PATCH /v0/transactions/override`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OverrideTransactionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_payload: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub override_fields: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_update_serializes_to_empty_object() {
        let body = serde_json::to_value(UpdateTransactionOptions::default()).unwrap();
        assert_eq!(body, json!({}));
    }

    #[test]
    fn override_serializes_set_fields() {
        let opts = OverrideTransactionOptions {
            response_payload: Some("us-dl".into()),
            flags: vec!["id_under_18".into()],
            override_fields: BTreeMap::from([("given_name".to_string(), "Ada".to_string())]),
        };
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({
                "response_payload": "us-dl",
                "flags": ["id_under_18"],
                "override_fields": {"given_name": "Ada"}
            })
        );
    }
}
