//! Low-level Mautic API client.
//!
//! Thin wrapper around reqwest providing basic-auth GET/POST against
//! `{base_url}/api{path}`. Mautic accepts form-encoded POST bodies, so
//! `post` takes form pairs. No retries; callers inspect status codes.

use std::time::Duration;

use reqwest::{Client, Response};
use thiserror::Error;

use crate::config::Config;

/// Error raised when the client cannot be constructed from configuration.
#[derive(Debug, Error)]
pub enum MauticConfigError {
    #[error("MAUTIC_BASE_URL is not configured")]
    MissingBaseUrl,
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Authenticated Mautic API client.
///
/// Cheap to clone; the underlying reqwest client shares its connection pool.
#[derive(Clone)]
pub struct MauticClient {
    http: Client,
    base_url: String,
    username: String,
    password: String,
}

impl MauticClient {
    /// Build a client from configuration.
    ///
    /// Fails fast when the base URL is unset so a misconfigured deployment
    /// dies at startup instead of on the first notification.
    pub fn new(config: &Config) -> Result<Self, MauticConfigError> {
        if config.mautic_base_url.is_empty() {
            return Err(MauticConfigError::MissingBaseUrl);
        }

        let http = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()?;

        Ok(Self {
            http,
            base_url: config.mautic_base_url.trim_end_matches('/').to_string(),
            username: config.mautic_username.clone(),
            password: config.mautic_password.clone(),
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Perform an authenticated GET against an API path.
    pub async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Response, reqwest::Error> {
        self.http
            .get(self.api_url(path))
            .query(params)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
    }

    /// Perform an authenticated form-encoded POST against an API path.
    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> Result<Response, reqwest::Error> {
        self.http
            .post(self.api_url(path))
            .form(form)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_base(base: &str) -> Config {
        Config {
            mautic_base_url: base.to_string(),
            mautic_username: "api".to_string(),
            mautic_password: "secret".to_string(),
            create_contact_if_missing: false,
            allowed_topic_arns: None,
            verify_signatures: false,
            request_timeout_ms: 10_000,
            port: 8080,
        }
    }

    #[test]
    fn test_missing_base_url_fails() {
        let result = MauticClient::new(&config_with_base(""));
        assert!(matches!(result, Err(MauticConfigError::MissingBaseUrl)));
    }

    #[test]
    fn test_api_url_joins_path() {
        let client = MauticClient::new(&config_with_base("https://mautic.example.com")).unwrap();
        assert_eq!(
            client.api_url("/contacts/new"),
            "https://mautic.example.com/api/contacts/new"
        );
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = MauticClient::new(&config_with_base("https://mautic.example.com/")).unwrap();
        assert_eq!(
            client.api_url("/contacts"),
            "https://mautic.example.com/api/contacts"
        );
    }
}
