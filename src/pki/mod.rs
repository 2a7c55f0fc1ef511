//! # PKI
//!
//! PEM and X.509 handling for CA bundles and the CSR signer.
//!
//! Certificates are compared by their raw DER bytes, never by subject or
//! serial. Encoding always goes back through the parsed DER so the rendered
//! bundle is stable across cycles regardless of how the input was formatted.

use chrono::{DateTime, Utc};
use pem::{EncodeConfig, LineEnding, Pem};
use rustls::crypto::ring::sign::any_supported_type;
use rustls::sign::SigningKey as _;
use rustls::pki_types::{
    PrivateKeyDer, PrivatePkcs1KeyDer, PrivatePkcs8KeyDer, PrivateSec1KeyDer,
};
use thiserror::Error;

/// PEM tag for certificates
const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// PKI errors
#[derive(Debug, Error)]
pub enum PkiError {
    /// PEM framing could not be decoded
    #[error("failed to parse PEM: {0}")]
    Pem(#[from] pem::PemError),

    /// A certificate block held invalid DER
    #[error("failed to parse certificate: {0}")]
    Certificate(String),

    /// Non-empty input did not contain a single certificate block
    #[error("data does not contain any valid certificates")]
    NoCertificates,

    /// Key material could not be decoded as a private key
    #[error("failed to parse private key: {0}")]
    PrivateKey(String),

    /// The private key does not belong to the certificate
    #[error("private key does not match certificate {subject}")]
    KeyMismatch { subject: String },

    /// Validity timestamp outside the representable range
    #[error("certificate validity out of range: {0}")]
    Validity(i64),
}

pub type Result<T> = std::result::Result<T, PkiError>;

/// A parsed certificate with the validity window the operator cares about
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    subject: String,
    /// DER SubjectPublicKeyInfo
    public_key: Vec<u8>,
}

impl Certificate {
    /// Parse from DER-encoded bytes
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| PkiError::Certificate(e.to_string()))?;

        let not_before = timestamp(cert.validity().not_before.timestamp())?;
        let not_after = timestamp(cert.validity().not_after.timestamp())?;

        Ok(Self {
            der: der.to_vec(),
            not_before,
            not_after,
            subject: cert.subject().to_string(),
            public_key: cert.public_key().raw.to_vec(),
        })
    }

    /// Raw DER bytes; the identity used for deduplication
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Expired once `now` is past `not_after`; a certificate expiring
    /// exactly at `now` is still live
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_after
    }

    /// DER SubjectPublicKeyInfo of the certified key
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

fn timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).ok_or(PkiError::Validity(secs))
}

/// Parse every `CERTIFICATE` block from PEM data.
///
/// Other block types are skipped. Empty (or whitespace-only) input yields an
/// empty list; non-empty input without any certificate is an error.
pub fn parse_certificates(data: &[u8]) -> Result<Vec<Certificate>> {
    if data.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let certs = pem::parse_many(data)?
        .iter()
        .filter(|block| block.tag() == CERTIFICATE_TAG)
        .map(|block| Certificate::from_der(block.contents()))
        .collect::<Result<Vec<_>>>()?;

    if certs.is_empty() {
        return Err(PkiError::NoCertificates);
    }
    Ok(certs)
}

/// Drop certificates that have expired at `now`, keeping order
pub fn filter_expired(certs: Vec<Certificate>, now: DateTime<Utc>) -> Vec<Certificate> {
    certs
        .into_iter()
        .filter(|cert| !cert.is_expired_at(now))
        .collect()
}

/// Remove byte-equal duplicates, keeping the first occurrence.
///
/// Quadratic, bundles hold a handful of entries.
pub fn dedup_by_der(certs: Vec<Certificate>) -> Vec<Certificate> {
    let mut unique: Vec<Certificate> = Vec::with_capacity(certs.len());
    for cert in certs {
        if !unique.iter().any(|seen| seen.der() == cert.der()) {
            unique.push(cert);
        }
    }
    unique
}

/// Encode certificates as a concatenated PEM bundle with LF line endings
pub fn encode_certificates(certs: &[Certificate]) -> String {
    let blocks: Vec<Pem> = certs
        .iter()
        .map(|cert| Pem::new(CERTIFICATE_TAG, cert.der().to_vec()))
        .collect();
    pem::encode_many_config(&blocks, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

/// Decode the first PEM private key (PKCS#8, PKCS#1 RSA or SEC1 EC) and
/// return the DER SubjectPublicKeyInfo of its public half
pub fn private_key_public_info(data: &[u8]) -> Result<Vec<u8>> {
    let block = pem::parse_many(data)?
        .into_iter()
        .find(|block| block.tag().ends_with("PRIVATE KEY"))
        .ok_or_else(|| PkiError::PrivateKey("no private key block".to_string()))?;

    let tag = block.tag().to_string();
    let contents = block.into_contents();
    let der: PrivateKeyDer<'static> = match tag.as_str() {
        "PRIVATE KEY" => PrivatePkcs8KeyDer::from(contents).into(),
        "RSA PRIVATE KEY" => PrivatePkcs1KeyDer::from(contents).into(),
        "EC PRIVATE KEY" => PrivateSec1KeyDer::from(contents).into(),
        other => return Err(PkiError::PrivateKey(format!("unsupported key type {other:?}"))),
    };

    let key = any_supported_type(&der).map_err(|e| PkiError::PrivateKey(e.to_string()))?;
    let spki = key
        .public_key()
        .ok_or_else(|| PkiError::PrivateKey("public key not derivable".to_string()))?;
    Ok(spki.as_ref().to_vec())
}

/// Check that `key_pem` decodes and is the private key of `cert`
pub fn check_key_pair(cert: &Certificate, key_pem: &[u8]) -> Result<()> {
    if private_key_public_info(key_pem)? == cert.public_key() {
        Ok(())
    } else {
        Err(PkiError::KeyMismatch {
            subject: cert.subject().to_string(),
        })
    }
}
