//! SNS message signature verification.
//!
//! SNS signs each delivered message with RSA over a canonical string built
//! from the message fields. The signing certificate is fetched from a URL
//! embedded in the message, which must point at an SNS endpoint before
//! anything is fetched from it.
//!
//! Reference: https://docs.aws.amazon.com/sns/latest/dg/sns-verify-signature-of-message.html

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use ring::signature;
use thiserror::Error;
use tracing::warn;
use url::Url;

use super::envelope::{
    Envelope, TYPE_NOTIFICATION, TYPE_SUBSCRIPTION_CONFIRMATION, TYPE_UNSUBSCRIBE_CONFIRMATION,
};

/// Why a message failed verification.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("missing required field {0}")]
    MissingField(&'static str),
    #[error("message type {0:?} cannot be verified")]
    UnsupportedType(String),
    #[error("unsupported signature version {0}")]
    UnsupportedVersion(String),
    #[error("signing certificate URL is invalid")]
    InvalidCertUrl,
    #[error("signing certificate host {0} is not an SNS endpoint")]
    UntrustedCertHost(String),
    #[error("failed to fetch signing certificate: {0}")]
    CertFetch(#[from] reqwest::Error),
    #[error("failed to parse signing certificate")]
    CertParse,
    #[error("signature is not valid base64")]
    SignatureEncoding,
    #[error("signature does not match message")]
    SignatureMismatch,
}

/// Verifies envelope signatures, fetching signing certificates on demand.
///
/// Certificates are not cached; SNS redelivers on failure and the fetch
/// shares the application's connection pool.
#[derive(Clone)]
pub struct SignatureVerifier {
    http: reqwest::Client,
}

impl SignatureVerifier {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Verify an envelope's signature for the given effective message type.
    pub async fn verify(&self, envelope: &Envelope, kind: &str) -> Result<(), VerifyError> {
        let canonical = canonical_string(envelope, kind)?;

        let signature_b64 = envelope
            .signature
            .as_deref()
            .ok_or(VerifyError::MissingField("Signature"))?;
        let signature_bytes = BASE64
            .decode(signature_b64)
            .map_err(|_| VerifyError::SignatureEncoding)?;

        let version = envelope.signature_version.as_deref().unwrap_or("1");
        let algorithm = version_algorithm(version)?;

        let cert_url = validate_signing_cert_url(
            envelope
                .signing_cert_url
                .as_deref()
                .ok_or(VerifyError::MissingField("SigningCertURL"))?,
        )?;

        let pem = self
            .http
            .get(cert_url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        let public_key = extract_public_key(&pem)?;

        signature::UnparsedPublicKey::new(algorithm, &public_key)
            .verify(canonical.as_bytes(), &signature_bytes)
            .map_err(|_| {
                warn!(
                    signature_version = version,
                    canonical_length = canonical.len(),
                    "sns_signature_mismatch"
                );
                VerifyError::SignatureMismatch
            })
    }
}

/// Map a SignatureVersion value to its RSA verification algorithm.
///
/// Version 1 signs with SHA1 (still what SNS sends by default), version 2
/// with SHA256.
fn version_algorithm(version: &str) -> Result<&'static dyn signature::VerificationAlgorithm, VerifyError> {
    match version {
        "1" => Ok(&signature::RSA_PKCS1_1024_8192_SHA1_FOR_LEGACY_USE_ONLY),
        "2" => Ok(&signature::RSA_PKCS1_2048_8192_SHA256),
        other => Err(VerifyError::UnsupportedVersion(other.to_string())),
    }
}

/// Build the canonical string signed by SNS.
///
/// Fields are laid out as `Name\nValue\n` pairs in a fixed order that
/// depends on the message type; `Subject` is included only when present.
fn canonical_string(envelope: &Envelope, kind: &str) -> Result<String, VerifyError> {
    let mut pairs: Vec<(&'static str, &str)> = Vec::new();

    match kind {
        TYPE_NOTIFICATION => {
            pairs.push(require("Message", &envelope.message)?);
            pairs.push(require("MessageId", &envelope.message_id)?);
            if let Some(subject) = envelope.subject.as_deref() {
                pairs.push(("Subject", subject));
            }
            pairs.push(require("Timestamp", &envelope.timestamp)?);
            pairs.push(require("TopicArn", &envelope.topic_arn)?);
            pairs.push(("Type", kind));
        }
        TYPE_SUBSCRIPTION_CONFIRMATION | TYPE_UNSUBSCRIBE_CONFIRMATION => {
            pairs.push(require("Message", &envelope.message)?);
            pairs.push(require("MessageId", &envelope.message_id)?);
            pairs.push(require("SubscribeURL", &envelope.subscribe_url)?);
            pairs.push(require("Timestamp", &envelope.timestamp)?);
            pairs.push(require("Token", &envelope.token)?);
            pairs.push(require("TopicArn", &envelope.topic_arn)?);
            pairs.push(("Type", kind));
        }
        other => return Err(VerifyError::UnsupportedType(other.to_string())),
    }

    let mut out = String::new();
    for (name, value) in pairs {
        out.push_str(name);
        out.push('\n');
        out.push_str(value);
        out.push('\n');
    }

    Ok(out)
}

fn require<'a>(
    name: &'static str,
    value: &'a Option<String>,
) -> Result<(&'static str, &'a str), VerifyError> {
    value
        .as_deref()
        .map(|v| (name, v))
        .ok_or(VerifyError::MissingField(name))
}

/// Validate that a signing-certificate URL points at an SNS endpoint.
///
/// Requires https, a `sns.<region>.amazonaws.com[.cn]` host, and a `.pem`
/// path. Anything else is rejected before a fetch is attempted.
fn validate_signing_cert_url(raw: &str) -> Result<Url, VerifyError> {
    let url = Url::parse(raw).map_err(|_| VerifyError::InvalidCertUrl)?;

    if url.scheme() != "https" {
        return Err(VerifyError::InvalidCertUrl);
    }

    let host = url.host_str().ok_or(VerifyError::InvalidCertUrl)?;
    if !is_sns_host(host) {
        return Err(VerifyError::UntrustedCertHost(host.to_string()));
    }

    if !url.path().ends_with(".pem") {
        return Err(VerifyError::InvalidCertUrl);
    }

    Ok(url)
}

/// Check for a `sns.<region>.amazonaws.com` or `.com.cn` host.
fn is_sns_host(host: &str) -> bool {
    let rest = match host.strip_prefix("sns.") {
        Some(r) => r,
        None => return false,
    };

    let region = rest
        .strip_suffix(".amazonaws.com.cn")
        .or_else(|| rest.strip_suffix(".amazonaws.com"));

    match region {
        Some(region) => {
            !region.is_empty()
                && region
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        }
        None => false,
    }
}

/// Extract the RSA public key (PKCS#1 DER) from a PEM-encoded certificate.
fn extract_public_key(pem: &[u8]) -> Result<Vec<u8>, VerifyError> {
    let (_, parsed) = x509_parser::pem::parse_x509_pem(pem).map_err(|_| VerifyError::CertParse)?;
    let cert = parsed.parse_x509().map_err(|_| VerifyError::CertParse)?;
    Ok(cert.public_key().subject_public_key.data.to_vec())
}
