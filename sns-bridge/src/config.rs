//! Configuration module for environment variable parsing.
//!
//! All configuration is read once at startup into an explicit struct that is
//! passed into the handlers; request-handling code never touches the process
//! environment.

use std::env;

use tracing::warn;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Mautic instance base URL (trailing slash trimmed)
    pub mautic_base_url: String,

    /// Basic-auth username for the Mautic API
    pub mautic_username: String,

    /// Basic-auth password for the Mautic API
    pub mautic_password: String,

    /// Create a contact when a bounced/complained email matches none
    pub create_contact_if_missing: bool,

    /// Optional allow-list of SNS topic ARNs; empty/unset allows all topics
    pub allowed_topic_arns: Option<Vec<String>>,

    /// Verify SNS message signatures (disable only for local testing)
    pub verify_signatures: bool,

    /// HTTP request timeout in milliseconds for all outbound calls
    pub request_timeout_ms: u64,

    /// Port for the web server to listen on
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Config {
            mautic_base_url: env::var("MAUTIC_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_default(),

            mautic_username: env::var("MAUTIC_API_USERNAME").unwrap_or_default(),

            mautic_password: env::var("MAUTIC_API_PASSWORD").unwrap_or_default(),

            create_contact_if_missing: parse_bool("CREATE_CONTACT_IF_MISSING", false),

            allowed_topic_arns: parse_csv("SNS_TOPIC_ARNS"),

            verify_signatures: parse_bool("SNS_VERIFY_SIGNATURES", true),

            request_timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10_000),

            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),
        }
    }

    /// Whether the given topic ARN passes the configured allow-list.
    ///
    /// An unset or empty allow-list admits every topic.
    pub fn is_topic_allowed(&self, topic_arn: Option<&str>) -> bool {
        match &self.allowed_topic_arns {
            Some(arns) if !arns.is_empty() => topic_arn
                .map(|t| arns.iter().any(|a| a == t))
                .unwrap_or(false),
            _ => true,
        }
    }
}

/// Parse a boolean flag accepting 1/true/yes (case-insensitive).
fn parse_bool(name: &str, default: bool) -> bool {
    match env::var(name) {
        Ok(raw) => {
            let v = raw.trim().to_ascii_lowercase();
            match v.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                _ => {
                    warn!(env_var = name, value = %raw, "Invalid boolean value, using default");
                    default
                }
            }
        }
        Err(_) => default,
    }
}

/// Parse a comma-separated list of strings.
fn parse_csv(name: &str) -> Option<Vec<String>> {
    env::var(name).ok().map(|raw| {
        raw.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    })
}
