//! Contact lookup and creation.
//!
//! Mautic's contact endpoints return a few different body shapes for the
//! same logical result: a `contacts` mapping keyed by contact id for list
//! queries, and either a single `contact` object or a `contacts` mapping
//! keyed `"0"` for creation. The extraction helpers here handle all of them
//! and degrade to "nothing found" instead of failing the request.

use std::collections::HashMap;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use super::client::MauticClient;

/// Find contact ids matching an email address exactly.
///
/// Tries an advanced-filter list query first, then falls back to a free-text
/// search when the filter returns nothing. A non-200 response is treated as
/// "no contacts found" (logged, empty result); only transport failures
/// propagate.
pub async fn find_contact_ids_by_email(
    client: &MauticClient,
    email: &str,
) -> Result<Vec<u64>, reqwest::Error> {
    let params = [
        ("where[0][col]", "email"),
        ("where[0][expr]", "eq"),
        ("where[0][val]", email),
    ];

    let resp = client.get("/contacts", &params).await?;
    if resp.status() != StatusCode::OK {
        warn!(
            status = resp.status().as_u16(),
            email = %email,
            "mautic_list_contacts_failed"
        );
        return Ok(Vec::new());
    }

    let body: Value = resp.json().await?;
    let mut ids = extract_contact_ids(&body);

    // Fallback to search if the filter found nothing
    if ids.is_empty() {
        let search = format!("email:equals:{}", email);
        let resp = client.get("/contacts", &[("search", search.as_str())]).await?;
        if resp.status() == StatusCode::OK {
            let body: Value = resp.json().await?;
            ids = extract_contact_ids(&body);
        }
    }

    info!(email = %email, matched = ids.len(), "mautic_contacts_resolved");

    Ok(ids)
}

/// Create a contact with only the email field set.
///
/// Returns the new contact id on success. Unexpected statuses and
/// unparseable success bodies are logged and yield `None`; only transport
/// failures propagate.
pub async fn create_contact(
    client: &MauticClient,
    email: &str,
) -> Result<Option<u64>, reqwest::Error> {
    let resp = client.post("/contacts/new", &[("email", email)]).await?;
    let status = resp.status();

    if status != StatusCode::OK && status != StatusCode::CREATED {
        warn!(
            status = status.as_u16(),
            email = %email,
            "mautic_create_contact_failed"
        );
        return Ok(None);
    }

    match resp.json::<CreateContactBody>().await {
        Ok(body) => {
            let id = body.contact_id();
            if let Some(id) = id {
                info!(email = %email, contact_id = id, "mautic_contact_created");
            } else {
                warn!(email = %email, "mautic_create_contact_no_id");
            }
            Ok(id)
        }
        Err(e) => {
            warn!(error = %e, email = %email, "mautic_create_contact_parse_failed");
            Ok(None)
        }
    }
}

/// Extract contact ids from a list response's `contacts` mapping.
///
/// The mapping is keyed by contact id. Mautic serializes an empty result as
/// a JSON array, so anything that is not an object yields no ids.
fn extract_contact_ids(body: &Value) -> Vec<u64> {
    match body.get("contacts") {
        Some(Value::Object(map)) => map.keys().filter_map(|k| k.parse().ok()).collect(),
        _ => Vec::new(),
    }
}

/// Contact record as returned inside creation responses.
#[derive(Debug, Deserialize)]
struct ContactRecord {
    id: u64,
}

/// Creation response body, one of two shapes Mautic produces.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CreateContactBody {
    /// `{"contact": {"id": ...}}`
    Single { contact: ContactRecord },
    /// `{"contacts": {"0": {"id": ...}}}`
    Keyed { contacts: HashMap<String, ContactRecord> },
}

impl CreateContactBody {
    fn contact_id(&self) -> Option<u64> {
        match self {
            CreateContactBody::Single { contact } => Some(contact.id),
            CreateContactBody::Keyed { contacts } => contacts.get("0").map(|c| c.id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_contact_ids_keyed_mapping() {
        let body = json!({
            "total": 2,
            "contacts": {
                "12": {"id": 12, "fields": {}},
                "45": {"id": 45, "fields": {}}
            }
        });

        let mut ids = extract_contact_ids(&body);
        ids.sort_unstable();

        assert_eq!(ids, vec![12, 45]);
    }

    #[test]
    fn test_extract_contact_ids_empty_array() {
        // PHP serializes an empty result set as [] rather than {}
        let body = json!({"total": 0, "contacts": []});

        assert!(extract_contact_ids(&body).is_empty());
    }

    #[test]
    fn test_extract_contact_ids_missing_key() {
        let body = json!({"total": 0});

        assert!(extract_contact_ids(&body).is_empty());
    }

    #[test]
    fn test_extract_contact_ids_non_numeric_keys_skipped() {
        let body = json!({"contacts": {"12": {"id": 12}, "abc": {"id": 13}}});

        assert_eq!(extract_contact_ids(&body), vec![12]);
    }

    #[test]
    fn test_create_body_single_object() {
        let body: CreateContactBody =
            serde_json::from_value(json!({"contact": {"id": 7, "email": "a@x.com"}})).unwrap();

        assert_eq!(body.contact_id(), Some(7));
    }

    #[test]
    fn test_create_body_keyed_mapping() {
        let body: CreateContactBody =
            serde_json::from_value(json!({"contacts": {"0": {"id": 9}}})).unwrap();

        assert_eq!(body.contact_id(), Some(9));
    }

    #[test]
    fn test_create_body_keyed_mapping_without_first_entry() {
        let body: CreateContactBody =
            serde_json::from_value(json!({"contacts": {"1": {"id": 9}}})).unwrap();

        assert_eq!(body.contact_id(), None);
    }

    #[test]
    fn test_create_body_unrecognized_shape_fails() {
        let result: Result<CreateContactBody, _> =
            serde_json::from_value(json!({"errors": [{"message": "bad request"}]}));

        assert!(result.is_err());
    }
}
