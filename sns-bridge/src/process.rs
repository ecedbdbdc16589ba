//! Per-recipient suppression processing.
//!
//! Runs the lookup → create → suppress pipeline for each affected recipient
//! sequentially. Failures are isolated at the per-email boundary: one
//! recipient's transport error is recorded in its outcome and the loop moves
//! on to the next recipient.

use tracing::{info, warn};

use crate::config::Config;
use crate::mautic::{self, MauticClient};
use crate::sns::SuppressionOrder;

/// What happened while processing one recipient email.
#[derive(Debug)]
pub enum RecipientOutcome {
    /// The pipeline ran to completion for this email. `suppressed` counts
    /// contacts whose DNC update returned success; non-200 updates are
    /// counted in `matched` only.
    Completed { matched: usize, suppressed: usize },
    /// A transport failure interrupted this email's processing. Suppressions
    /// that succeeded before the failure are still counted.
    TransportError {
        suppressed: usize,
        error: reqwest::Error,
    },
}

/// Aggregated result of a suppression run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SuppressionSummary {
    /// Total successful DNC updates across all recipients
    pub processed: usize,
    /// Recipients whose processing hit a transport error
    pub failed_emails: usize,
}

/// Apply a suppression order to every recipient, in encounter order.
pub async fn apply_suppressions(
    client: &MauticClient,
    config: &Config,
    order: &SuppressionOrder,
) -> SuppressionSummary {
    let mut summary = SuppressionSummary::default();

    for email in &order.emails {
        match suppress_recipient(client, config, email, order).await {
            RecipientOutcome::Completed {
                matched,
                suppressed,
            } => {
                summary.processed += suppressed;
                info!(
                    email = %email,
                    matched = matched,
                    suppressed = suppressed,
                    "recipient_processed"
                );
            }
            RecipientOutcome::TransportError { suppressed, error } => {
                summary.processed += suppressed;
                summary.failed_emails += 1;
                warn!(
                    email = %email,
                    suppressed = suppressed,
                    error = %error,
                    "recipient_processing_failed"
                );
            }
        }
    }

    info!(
        recipients = order.emails.len(),
        processed = summary.processed,
        failed_emails = summary.failed_emails,
        "suppression_run_complete"
    );

    summary
}

/// Run the pipeline for a single email.
async fn suppress_recipient(
    client: &MauticClient,
    config: &Config,
    email: &str,
    order: &SuppressionOrder,
) -> RecipientOutcome {
    let mut contact_ids = match mautic::find_contact_ids_by_email(client, email).await {
        Ok(ids) => ids,
        Err(error) => {
            return RecipientOutcome::TransportError {
                suppressed: 0,
                error,
            }
        }
    };

    if contact_ids.is_empty() && config.create_contact_if_missing {
        match mautic::create_contact(client, email).await {
            Ok(Some(id)) => contact_ids = vec![id],
            Ok(None) => {}
            Err(error) => {
                return RecipientOutcome::TransportError {
                    suppressed: 0,
                    error,
                }
            }
        }
    }

    let matched = contact_ids.len();
    let mut suppressed = 0;

    for contact_id in contact_ids {
        match mautic::add_do_not_contact(
            client,
            contact_id,
            order.reason,
            &order.comments,
            order.channel_id.as_deref(),
        )
        .await
        {
            Ok(true) => suppressed += 1,
            Ok(false) => {}
            Err(error) => return RecipientOutcome::TransportError { suppressed, error },
        }
    }

    RecipientOutcome::Completed {
        matched,
        suppressed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mautic::DncReason;
    use serde_json::json;
    use wiremock::matchers::{body_string_contains, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: &str, create_if_missing: bool) -> Config {
        Config {
            mautic_base_url: base_url.to_string(),
            mautic_username: "api".to_string(),
            mautic_password: "secret".to_string(),
            create_contact_if_missing: create_if_missing,
            allowed_topic_arns: None,
            verify_signatures: false,
            request_timeout_ms: 5_000,
            port: 8080,
        }
    }

    fn bounce_order(emails: &[&str]) -> SuppressionOrder {
        SuppressionOrder {
            emails: emails.iter().map(|e| e.to_string()).collect(),
            reason: DncReason::Bounced,
            comments: "SES bounce: Permanent".to_string(),
            channel_id: Some("ses-msg-1".to_string()),
        }
    }

    /// Mount an exact-match contact query returning the given contacts body.
    async fn mount_contact_lookup(server: &MockServer, email: &str, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .and(query_param("where[0][val]", email))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    /// The search fallback fires when the filter query returns nothing.
    async fn mount_empty_search(server: &MockServer, email: &str) {
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .and(query_param("search", format!("email:equals:{}", email)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"contacts": []})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_no_match_without_create_suppresses_nothing() {
        let server = MockServer::start().await;
        mount_contact_lookup(&server, "a@x.com", json!({"contacts": []})).await;
        mount_empty_search(&server, "a@x.com").await;
        mount_contact_lookup(&server, "b@x.com", json!({"contacts": []})).await;
        mount_empty_search(&server, "b@x.com").await;

        // Any suppression call would be a bug here
        Mock::given(method("POST"))
            .and(path("/api/contacts/1/dnc/email/add"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), false);
        let client = MauticClient::new(&config).unwrap();

        let summary =
            apply_suppressions(&client, &config, &bounce_order(&["a@x.com", "b@x.com"])).await;

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failed_emails, 0);
    }

    #[tokio::test]
    async fn test_two_matches_one_dnc_failure_counts_one() {
        let server = MockServer::start().await;
        mount_contact_lookup(
            &server,
            "c@x.com",
            json!({"contacts": {"12": {"id": 12}, "45": {"id": 45}}}),
        )
        .await;

        Mock::given(method("POST"))
            .and(path("/api/contacts/12/dnc/email/add"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"recordFound": true})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/contacts/45/dnc/email/add"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), false);
        let client = MauticClient::new(&config).unwrap();

        let order = SuppressionOrder {
            emails: vec!["c@x.com".to_string()],
            reason: DncReason::Unsubscribed,
            comments: "SES complaint".to_string(),
            channel_id: None,
        };

        let summary = apply_suppressions(&client, &config, &order).await;

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed_emails, 0);
    }

    #[tokio::test]
    async fn test_create_if_missing_suppresses_new_contact() {
        let server = MockServer::start().await;
        mount_contact_lookup(&server, "new@x.com", json!({"contacts": []})).await;
        mount_empty_search(&server, "new@x.com").await;

        Mock::given(method("POST"))
            .and(path("/api/contacts/new"))
            .and(body_string_contains("email=new%40x.com"))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"contact": {"id": 99}})),
            )
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/contacts/99/dnc/email/add"))
            .and(body_string_contains("reason=2"))
            .and(body_string_contains("comments=SES+bounce%3A+Permanent"))
            .and(body_string_contains("channelId=ses-msg-1"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), true);
        let client = MauticClient::new(&config).unwrap();

        let summary = apply_suppressions(&client, &config, &bounce_order(&["new@x.com"])).await;

        assert_eq!(summary.processed, 1);
    }

    #[tokio::test]
    async fn test_lookup_non_200_degrades_to_no_match() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), false);
        let client = MauticClient::new(&config).unwrap();

        let summary = apply_suppressions(&client, &config, &bounce_order(&["d@x.com"])).await;

        // Degradation, not failure: the email completed with zero matches
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failed_emails, 0);
    }

    #[tokio::test]
    async fn test_transport_error_isolated_per_recipient() {
        let server = MockServer::start().await;

        mount_contact_lookup(
            &server,
            "ok@x.com",
            json!({"contacts": {"7": {"id": 7}}}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/api/contacts/7/dnc/email/add"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        // Unmatched lookups (bad@x.com) get a malformed JSON 200 body, which
        // surfaces as a decode error on the first recipient only.
        Mock::given(method("GET"))
            .and(path("/api/contacts"))
            .and(query_param("where[0][val]", "bad@x.com"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), false);
        let client = MauticClient::new(&config).unwrap();

        let summary =
            apply_suppressions(&client, &config, &bounce_order(&["bad@x.com", "ok@x.com"])).await;

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed_emails, 1);
    }
}
