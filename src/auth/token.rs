//! Token issuing and verification (HS256 JWT).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use crate::auth::claims::{Claims, Identity};

/// Token signing failures. Fatal when hit at startup.
#[derive(Debug, Error)]
pub enum SigningError {
    /// No signing secret was configured.
    #[error("JWT secret is not configured")]
    MissingSecret,

    /// The token could not be encoded.
    #[error("failed to sign token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    /// A freshly issued token did not verify with the same secret.
    #[error("issued token failed verification: {0}")]
    Probe(String),

    /// `iat + ttl` does not fit in a timestamp.
    #[error("token lifetime of {ttl_secs}s overflows the expiry timestamp")]
    ExpiryOverflow { ttl_secs: u64 },
}

/// Why a request was refused by the auth gate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No credential was offered.
    #[error("missing authorization header")]
    Unauthenticated,

    /// A credential was offered but did not verify.
    #[error("invalid token: {0}")]
    Forbidden(String),
}

impl AuthError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::Unauthenticated => "unauthenticated",
            AuthError::Forbidden(_) => "forbidden",
        }
    }
}

/// Take the credential out of an `Authorization` value.
///
/// Everything between the first and second single space is the token; a value
/// without a space yields the empty token.
pub fn extract_bearer(value: &str) -> &str {
    value.split(' ').nth(1).unwrap_or("")
}

/// Signs tokens for identities.
pub struct TokenIssuer {
    key: EncodingKey,
    ttl: Option<Duration>,
}

impl TokenIssuer {
    pub fn new(secret: &str, ttl: Option<Duration>) -> Result<Self, SigningError> {
        if secret.is_empty() {
            return Err(SigningError::MissingSecret);
        }
        Ok(Self {
            key: EncodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Issue a token for `identity`, stamped with the current time.
    pub fn issue(&self, identity: &Identity) -> Result<String, SigningError> {
        self.issue_at(identity, SystemTime::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(&self, identity: &Identity, now: SystemTime) -> Result<String, SigningError> {
        let iat = now
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        let exp = match self.ttl {
            Some(ttl) => Some(iat.checked_add(ttl.as_secs()).ok_or(
                SigningError::ExpiryOverflow {
                    ttl_secs: ttl.as_secs(),
                },
            )?),
            None => None,
        };

        let claims = Claims {
            id: identity.id,
            username: identity.username.clone(),
            iat,
            exp,
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.key)?)
    }
}

/// Verifies tokens against the shared secret.
pub struct TokenVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl TokenVerifier {
    pub fn new(secret: &str) -> Result<Self, SigningError> {
        if secret.is_empty() {
            return Err(SigningError::MissingSecret);
        }

        // exp/nbf are checked only when present; no clock leeway. Audience
        // and issuer are not part of the credential.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Ok(Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Verify the raw `Authorization` header value, if any.
    ///
    /// An absent or empty header is `Unauthenticated`; anything else that does
    /// not verify is `Forbidden`.
    pub fn verify_header(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        match header {
            None | Some("") => Err(AuthError::Unauthenticated),
            Some(value) => self.verify_token(extract_bearer(value)),
        }
    }

    /// Verify a bare token.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        if token.is_empty() {
            return Err(AuthError::Forbidden("token must be provided".to_string()));
        }

        decode::<Claims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| AuthError::Forbidden(e.to_string()))
    }
}
