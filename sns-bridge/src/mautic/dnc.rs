//! Do-not-contact suppression updates.

use reqwest::StatusCode;
use tracing::{info, warn};

use super::client::MauticClient;

/// Mautic do-not-contact reason codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DncReason {
    /// Recipient opted out (complaints map here)
    Unsubscribed,
    /// Delivery bounced
    Bounced,
    /// Manually flagged in the CRM
    Manual,
}

impl DncReason {
    /// Integer code used by the Mautic API.
    pub fn code(self) -> u8 {
        match self {
            DncReason::Unsubscribed => 1,
            DncReason::Bounced => 2,
            DncReason::Manual => 3,
        }
    }
}

/// Mark a contact as do-not-contact on the email channel.
///
/// Returns true only on 200/201. A DNC entry that already exists still
/// comes back 200 from Mautic. Other statuses are logged and return false
/// so processing can continue with the remaining contacts.
pub async fn add_do_not_contact(
    client: &MauticClient,
    contact_id: u64,
    reason: DncReason,
    comments: &str,
    channel_id: Option<&str>,
) -> Result<bool, reqwest::Error> {
    let reason_code = reason.code().to_string();
    let mut form: Vec<(&str, &str)> = vec![("reason", &reason_code), ("comments", comments)];
    if let Some(channel) = channel_id {
        form.push(("channelId", channel));
    }

    let path = format!("/contacts/{}/dnc/email/add", contact_id);
    let resp = client.post(&path, &form).await?;
    let status = resp.status();

    if status == StatusCode::OK || status == StatusCode::CREATED {
        info!(
            contact_id = contact_id,
            reason = reason.code(),
            "mautic_dnc_added"
        );
        return Ok(true);
    }

    warn!(
        contact_id = contact_id,
        status = status.as_u16(),
        "mautic_dnc_add_failed"
    );

    Ok(false)
}
