//! SES delivery event parsing.
//!
//! The envelope's `Message` payload carries a JSON-encoded SES event. Only
//! bounces and complaints are actionable; everything else is reported back
//! as ignored without touching the CRM.

use serde::Deserialize;

use crate::mautic::DncReason;

/// SES event as carried in the envelope payload.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesEvent {
    notification_type: Option<String>,
    #[serde(default)]
    mail: Option<SesMail>,
    #[serde(default)]
    bounce: Option<SesBounce>,
    #[serde(default)]
    complaint: Option<SesComplaint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesMail {
    message_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesBounce {
    bounce_type: Option<String>,
    #[serde(default)]
    bounced_recipients: Vec<SesRecipient>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesComplaint {
    #[serde(default)]
    complained_recipients: Vec<SesRecipient>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SesRecipient {
    email_address: Option<String>,
}

/// Suppression work extracted from an actionable event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuppressionOrder {
    /// Affected recipients, in encounter order and not deduplicated
    pub emails: Vec<String>,
    pub reason: DncReason,
    pub comments: String,
    /// Originating SES message id, recorded as the DNC channel id
    pub channel_id: Option<String>,
}

/// Result of parsing the envelope payload.
#[derive(Debug)]
pub enum ParsedEvent {
    Actionable(SuppressionOrder),
    /// Event kind this bridge does not act on (Delivery, Send, ...)
    Ignored { kind: Option<String> },
}

/// Parse the envelope's `Message` payload into suppression work.
///
/// Malformed JSON is an error (request-fatal for the caller). A recognized
/// kind with no recipient entries still parses as actionable with an empty
/// email list.
pub fn parse_delivery_event(payload: &str) -> Result<ParsedEvent, serde_json::Error> {
    let event: SesEvent = serde_json::from_str(payload)?;
    let channel_id = event.mail.and_then(|m| m.message_id);

    match event.notification_type.as_deref() {
        Some("Bounce") => {
            let bounce = event.bounce.unwrap_or_default();
            let bounce_type = bounce.bounce_type.as_deref().unwrap_or("unknown");
            Ok(ParsedEvent::Actionable(SuppressionOrder {
                emails: collect_emails(&bounce.bounced_recipients),
                reason: DncReason::Bounced,
                comments: format!("SES bounce: {}", bounce_type),
                channel_id,
            }))
        }
        Some("Complaint") => {
            let complaint = event.complaint.unwrap_or_default();
            Ok(ParsedEvent::Actionable(SuppressionOrder {
                emails: collect_emails(&complaint.complained_recipients),
                reason: DncReason::Unsubscribed,
                comments: "SES complaint".to_string(),
                channel_id,
            }))
        }
        other => Ok(ParsedEvent::Ignored {
            kind: other.map(str::to_string),
        }),
    }
}

/// Recipient entries without an address are skipped.
fn collect_emails(recipients: &[SesRecipient]) -> Vec<String> {
    recipients
        .iter()
        .filter_map(|r| r.email_address.clone())
        .collect()
}
