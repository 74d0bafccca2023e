//! AWS Signature Version 4 (`AWS4-HMAC-SHA256`) request signing.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use amber_core::config::AwsConfig;
use amber_core::InvokeError;

type HmacSha256 = Hmac<Sha256>;

pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Static AWS credentials used to sign remote invocations.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token,
        }
    }

    /// Pick credentials out of the AWS config, naming whichever key is missing.
    pub fn from_config(aws: &AwsConfig) -> Result<Self, InvokeError> {
        let access_key_id = aws
            .access_key_id
            .clone()
            .ok_or_else(|| InvokeError::AuthConfig("AWS_ACCESS_KEY_ID not set".into()))?;
        let secret_access_key = aws
            .secret_access_key
            .clone()
            .ok_or_else(|| InvokeError::AuthConfig("AWS_SECRET_ACCESS_KEY not set".into()))?;
        Ok(Self::new(
            access_key_id,
            secret_access_key,
            aws.session_token.clone(),
        ))
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .field("session_token", &self.session_token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// The parts of an HTTP request covered by the signature.
#[derive(Debug, Clone)]
pub struct SigningRequest<'a> {
    pub method: &'a str,
    pub host: &'a str,
    /// Request path exactly as it appears on the request line.
    pub path: &'a str,
    /// Raw (unencoded) query parameters.
    pub query: &'a [(String, String)],
    /// Extra headers to sign and send; `host` is always added by the signer.
    pub headers: &'a [(String, String)],
    pub body: &'a [u8],
}

/// Headers to put on the wire, plus the intermediate values of the signature.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    /// Every header to send, lowercase names, including `authorization`.
    pub headers: Vec<(String, String)>,
    pub signature: String,
    pub payload_hash: String,
    pub credential_scope: String,
    pub canonical_request: String,
}

impl SignedHeaders {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether `body` is byte-for-byte the payload that was signed.
    pub fn covers_body(&self, body: &[u8]) -> bool {
        sha256_hex(body) == self.payload_hash
    }
}

/// Signs requests for one region/service pair.
#[derive(Debug, Clone)]
pub struct Signer {
    region: String,
    service: String,
}

impl Signer {
    pub fn new(region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            service: service.into(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    /// Sign `request` at `timestamp`. Callers pass the wall-clock time at the
    /// moment of sending; the signature is only valid for a short window.
    pub fn sign(
        &self,
        request: &SigningRequest<'_>,
        credentials: Option<&Credentials>,
        timestamp: DateTime<Utc>,
    ) -> Result<SignedHeaders, InvokeError> {
        let credentials = credentials.ok_or_else(|| {
            InvokeError::AuthConfig(
                "AWS_ACCESS_KEY_ID and AWS_SECRET_ACCESS_KEY must be set for remote invocations"
                    .into(),
            )
        })?;
        if credentials.access_key_id.is_empty() || credentials.secret_access_key.is_empty() {
            return Err(InvokeError::AuthConfig("empty AWS access key or secret".into()));
        }

        let amz_date = timestamp.format("%Y%m%dT%H%M%SZ").to_string();
        let date = timestamp.format("%Y%m%d").to_string();

        // Lowercase name -> trimmed value; the map keeps them sorted.
        let mut canonical: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in request.headers {
            let name = name.to_ascii_lowercase();
            if name == "host" || name == "authorization" {
                continue;
            }
            let value = normalize_header_value(value);
            canonical
                .entry(name)
                .and_modify(|existing| {
                    existing.push(',');
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        canonical.insert("host".into(), request.host.to_string());
        canonical.insert("x-amz-date".into(), amz_date.clone());
        if let Some(token) = &credentials.session_token {
            canonical.insert("x-amz-security-token".into(), token.clone());
        }

        let canonical_headers: String = canonical
            .iter()
            .map(|(k, v)| format!("{}:{}\n", k, v))
            .collect();
        let signed_headers = canonical.keys().cloned().collect::<Vec<_>>().join(";");
        let payload_hash = sha256_hex(request.body);

        let canonical_request = format!(
            "{}\n{}\n{}\n{}\n{}\n{}",
            request.method.to_ascii_uppercase(),
            canonical_uri(request.path),
            canonical_query(request.query),
            canonical_headers,
            signed_headers,
            payload_hash
        );

        let credential_scope = format!(
            "{}/{}/{}/aws4_request",
            date, self.region, self.service
        );
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            ALGORITHM,
            amz_date,
            credential_scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let signing_key = self.signing_key(&credentials.secret_access_key, &date)?;
        let signature = hex::encode(hmac_sha256(&signing_key, string_to_sign.as_bytes())?);

        let authorization = format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, credentials.access_key_id, credential_scope, signed_headers, signature
        );

        let mut headers: Vec<(String, String)> = canonical.into_iter().collect();
        headers.push(("authorization".into(), authorization));

        Ok(SignedHeaders {
            headers,
            signature,
            payload_hash,
            credential_scope,
            canonical_request,
        })
    }

    fn signing_key(&self, secret: &str, date: &str) -> Result<Vec<u8>, InvokeError> {
        let k_date = hmac_sha256(format!("AWS4{}", secret).as_bytes(), date.as_bytes())?;
        let k_region = hmac_sha256(&k_date, self.region.as_bytes())?;
        let k_service = hmac_sha256(&k_region, self.service.as_bytes())?;
        hmac_sha256(&k_service, b"aws4_request")
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, InvokeError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|err| InvokeError::AuthConfig(format!("invalid signing key: {err}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// RFC 3986-encode every path segment; an already-encoded path gets encoded
/// a second time, as SigV4 requires for every service except S3.
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".into();
    }
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Sorted, encoded `k=v&k=v` form used both on the request line and in the
/// canonical request.
pub fn canonical_query(params: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| {
            (
                urlencoding::encode(k).into_owned(),
                urlencoding::encode(v).into_owned(),
            )
        })
        .collect();
    encoded.sort();
    encoded
        .into_iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}
