//! SNS notification envelope.
//!
//! SNS delivers JSON with PascalCase field names and a text/plain content
//! type, so the body is parsed from raw text rather than through a JSON
//! extractor. All fields are optional at the model level; the handler and
//! the signature verifier decide which ones are required for a given
//! message type.

use serde::Deserialize;

/// Message type names SNS puts in the `Type` field.
pub const TYPE_SUBSCRIPTION_CONFIRMATION: &str = "SubscriptionConfirmation";
pub const TYPE_NOTIFICATION: &str = "Notification";
pub const TYPE_UNSUBSCRIBE_CONFIRMATION: &str = "UnsubscribeConfirmation";

/// Transport header carrying a redundant message-type hint.
pub const MESSAGE_TYPE_HEADER: &str = "x-amz-sns-message-type";

/// Outer pub/sub envelope as delivered by SNS.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(rename = "Type")]
    pub kind: Option<String>,
    #[serde(rename = "MessageId")]
    pub message_id: Option<String>,
    #[serde(rename = "TopicArn")]
    pub topic_arn: Option<String>,
    #[serde(rename = "Subject")]
    pub subject: Option<String>,
    /// Opaque payload; a JSON-encoded SES event for notifications
    #[serde(rename = "Message")]
    pub message: Option<String>,
    #[serde(rename = "Timestamp")]
    pub timestamp: Option<String>,
    #[serde(rename = "SignatureVersion")]
    pub signature_version: Option<String>,
    #[serde(rename = "Signature")]
    pub signature: Option<String>,
    #[serde(rename = "SigningCertURL")]
    pub signing_cert_url: Option<String>,
    #[serde(rename = "SubscribeURL")]
    pub subscribe_url: Option<String>,
    #[serde(rename = "Token")]
    pub token: Option<String>,
}

impl Envelope {
    /// Effective message type: the `Type` field, falling back to the
    /// transport header when the body omits it.
    pub fn effective_type<'a>(&'a self, header_hint: Option<&'a str>) -> Option<&'a str> {
        self.kind.as_deref().or(header_hint)
    }
}
