//! SNS → Mautic do-not-contact bridge.
//!
//! Receives SES bounce and complaint notifications pushed over SNS HTTPS,
//! validates their authenticity, and marks matching Mautic contacts as
//! do-not-contact on the email channel.
//!
//! ## Pipeline
//!
//! ```text
//! POST /sns/notify → signature check → topic allow-list → parse SES event
//!                  → per recipient: lookup → (create) → suppress
//! ```

pub mod config;
pub mod mautic;
pub mod process;
pub mod sns;
pub mod web;

// Re-export commonly used types
pub use config::Config;
pub use mautic::{DncReason, MauticClient};
pub use process::{apply_suppressions, SuppressionSummary};
pub use sns::{Envelope, ParsedEvent, SignatureVerifier, SuppressionOrder};
pub use web::{router, AppState};
