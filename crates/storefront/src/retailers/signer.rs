//! Retailer authentication material.
//!
//! Best Buy takes a plain API key as a query parameter. Walmart's affiliate
//! API wants every request signed: an RSA-SHA256 (PKCS#1 v1.5) signature over
//! `consumerId\ntimestamp\nkeyVersion\n`, sent base64-encoded in
//! `WM_SEC.AUTH_SIGNATURE` next to the consumer id, key version and
//! timestamp headers.
//!
//! Signing is pure: no I/O beyond reading the key file once.

use std::path::PathBuf;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rsa::pkcs1::{DecodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::DecodePrivateKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use super::RetailerError;
use crate::config::WalmartConfig;

/// Header names of the signed request.
pub const HEADER_KEY_VERSION: &str = "WM_SEC.KEY_VERSION";
pub const HEADER_AUTH_SIGNATURE: &str = "WM_SEC.AUTH_SIGNATURE";
pub const HEADER_CONSUMER_ID: &str = "WM_CONSUMER.ID";
pub const HEADER_TIMESTAMP: &str = "WM_CONSUMER.INTIMESTAMP";

/// The configured API key, or a configuration error.
///
/// # Errors
///
/// Returns [`RetailerError::Configuration`] when no key is set.
pub fn api_key<'a>(
    key: Option<&'a SecretString>,
    variable: &'static str,
) -> Result<&'a SecretString, RetailerError> {
    key.filter(|k| !k.expose_secret().trim().is_empty())
        .ok_or(RetailerError::Configuration(variable))
}

/// Where the signing key comes from.
#[derive(Clone)]
pub enum PrivateKeySource {
    /// PEM text, or bare base64 DER.
    Inline(SecretString),
    /// A PEM file on disk.
    File(PathBuf),
}

impl std::fmt::Debug for PrivateKeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inline(_) => f.write_str("Inline([REDACTED])"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

impl PrivateKeySource {
    /// Pick the key source from configuration; the file path wins.
    ///
    /// # Errors
    ///
    /// Returns [`RetailerError::Configuration`] when neither is set.
    pub fn from_config(config: &WalmartConfig) -> Result<Self, RetailerError> {
        if let Some(path) = &config.private_key_path {
            return Ok(Self::File(path.clone()));
        }
        config
            .private_key
            .as_ref()
            .filter(|k| !k.expose_secret().trim().is_empty())
            .map(|k| Self::Inline(k.clone()))
            .ok_or(RetailerError::Configuration(
                "WALMART_PRIVATE_KEY or WALMART_PRIVATE_KEY_PATH",
            ))
    }

    /// Read and parse the key.
    ///
    /// # Errors
    ///
    /// Returns [`RetailerError::Configuration`] if the file can't be read or
    /// the material is not an RSA private key. The key itself never appears
    /// in the error.
    pub async fn load(&self) -> Result<RsaPrivateKey, RetailerError> {
        match self {
            Self::Inline(material) => parse_private_key(material.expose_secret()),
            Self::File(path) => {
                let text = tokio::fs::read_to_string(path).await.map_err(|e| {
                    tracing::error!(path = %path.display(), error = %e, "failed to read private key file");
                    RetailerError::Configuration("WALMART_PRIVATE_KEY_PATH")
                })?;
                parse_private_key(&text)
            }
        }
    }
}

/// Parse PKCS#8 or PKCS#1 key material.
///
/// Text without a PEM header is taken as base64 DER. Literal `\n` escapes,
/// common when a PEM is pasted into a single env var, are expanded.
fn parse_private_key(material: &str) -> Result<RsaPrivateKey, RetailerError> {
    let material = material.trim().replace("\\n", "\n");

    let parsed = if material.contains("-----BEGIN") {
        RsaPrivateKey::from_pkcs8_pem(&material)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&material))
            .map_err(|e| e.to_string())
    } else {
        let compact: String = material.split_whitespace().collect();
        STANDARD
            .decode(compact)
            .map_err(|e| e.to_string())
            .and_then(|der| {
                RsaPrivateKey::from_pkcs8_der(&der)
                    .or_else(|_| RsaPrivateKey::from_pkcs1_der(&der))
                    .map_err(|e| e.to_string())
            })
    };

    parsed.map_err(|e| {
        tracing::error!(error = %e, "configured private key is not a usable RSA key");
        RetailerError::Configuration("WALMART_PRIVATE_KEY")
    })
}

/// Milliseconds since the epoch, the format Walmart expects.
#[must_use]
pub fn timestamp_now() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

/// Signs Walmart requests.
#[derive(Clone)]
pub struct SignatureSigner {
    consumer_id: String,
    key_version: String,
    key: RsaPrivateKey,
}

impl std::fmt::Debug for SignatureSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureSigner")
            .field("consumer_id", &self.consumer_id)
            .field("key_version", &self.key_version)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl SignatureSigner {
    #[must_use]
    pub fn new(consumer_id: impl Into<String>, key_version: impl Into<String>, key: RsaPrivateKey) -> Self {
        Self {
            consumer_id: consumer_id.into(),
            key_version: key_version.into(),
            key,
        }
    }

    /// Validate credentials and load the key.
    ///
    /// # Errors
    ///
    /// Returns [`RetailerError::Configuration`] when the consumer id or key
    /// material is missing or unusable.
    pub async fn from_config(config: &WalmartConfig) -> Result<Self, RetailerError> {
        let consumer_id = config
            .consumer_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(RetailerError::Configuration("WALMART_CONSUMER_ID"))?;
        let key = PrivateKeySource::from_config(config)?.load().await?;
        Ok(Self::new(consumer_id, config.key_version.clone(), key))
    }

    /// The string that gets signed.
    #[must_use]
    pub fn canonical_string(&self, timestamp: &str) -> String {
        format!("{}\n{timestamp}\n{}\n", self.consumer_id, self.key_version)
    }

    /// Base64 RSA-SHA256 signature of the canonical string.
    ///
    /// # Errors
    ///
    /// Returns [`RetailerError::Configuration`] if the key cannot sign (for
    /// example, a modulus too small for a SHA-256 digest).
    pub fn sign(&self, timestamp: &str) -> Result<String, RetailerError> {
        let digest = Sha256::digest(self.canonical_string(timestamp).as_bytes());
        let signature = self
            .key
            .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
            .map_err(|e| {
                tracing::error!(error = %e, "RSA signing failed");
                RetailerError::Configuration("WALMART_PRIVATE_KEY")
            })?;
        Ok(STANDARD.encode(signature))
    }

    /// Full header set for one request.
    ///
    /// # Errors
    ///
    /// See [`Self::sign`].
    pub fn signed_headers(&self, timestamp: &str) -> Result<Vec<(String, String)>, RetailerError> {
        let signature = self.sign(timestamp)?;
        Ok(vec![
            (HEADER_KEY_VERSION.to_string(), self.key_version.clone()),
            (HEADER_AUTH_SIGNATURE.to_string(), signature),
            (HEADER_CONSUMER_ID.to_string(), self.consumer_id.clone()),
            (HEADER_TIMESTAMP.to_string(), timestamp.to_string()),
            ("Content-Type".to_string(), "application/json".to_string()),
            ("Accept".to_string(), "application/json".to_string()),
        ])
    }

    /// PKCS#1 PEM of the public half, for registering with Walmart.
    ///
    /// # Errors
    ///
    /// Returns [`RetailerError::Configuration`] if encoding fails.
    pub fn public_key_pem(&self) -> Result<String, RetailerError> {
        RsaPublicKey::from(&self.key)
            .to_pkcs1_pem(rsa::pkcs8::LineEnding::LF)
            .map_err(|_| RetailerError::Configuration("WALMART_PRIVATE_KEY"))
    }
}
