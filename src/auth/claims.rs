//! Identity and token claims.

use serde::{Deserialize, Serialize};

/// The subject a token is issued for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub username: String,
}

impl Identity {
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
        }
    }

    /// The fixed identity the login endpoint issues tokens for.
    ///
    /// Credentials are not checked against any user store.
    pub fn demo() -> Self {
        Self::new(1, "admin")
    }
}

/// Decoded payload of a verified token.
///
/// Inserted into request extensions by the auth middleware and dropped with
/// the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub id: i64,
    pub username: String,
    /// Issued-at (seconds since epoch)
    #[serde(default)]
    pub iat: u64,
    /// Expiry (seconds since epoch), only present when a TTL is configured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity::new(self.id, self.username.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exp_omitted_when_absent() {
        let claims = Claims {
            id: 1,
            username: "admin".into(),
            iat: 1_700_000_000,
            exp: None,
        };
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 1, "username": "admin", "iat": 1_700_000_000u64 })
        );
        assert_eq!(claims.identity(), Identity::demo());
    }
}
