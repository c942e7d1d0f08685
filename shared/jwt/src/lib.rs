use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared_error::AppError;
use uuid::Uuid;

/// Minimum secret material, in bytes (256 bits).
pub const MIN_SECRET_BYTES: usize = 32;

/// Placeholder values that ship in sample configs and must never reach production.
/// A secret equal to any of these aborts startup.
const DEFAULT_SENTINELS: &[&str] = &[
    "changeme",
    "change-me",
    "secret",
    "jwt-secret",
    "dev-secret",
    "please-change-this-jwt-secret-value",
];

/// Token type discriminator carried in every token.
///
/// Application routes accept only `Access`; `Refresh` is valid solely on the
/// refresh handshake; `ServiceAccount` tokens are long-lived CI credentials
/// scoped to a narrow permission.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    #[serde(rename = "ACCESS")]
    Access,
    #[serde(rename = "REFRESH")]
    Refresh,
    #[serde(rename = "SERVICE_ACCOUNT")]
    ServiceAccount,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "ACCESS"),
            TokenType::Refresh => write!(f, "REFRESH"),
            TokenType::ServiceAccount => write!(f, "SERVICE_ACCOUNT"),
        }
    }
}

/// JWT claims for access, refresh and service-account tokens
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Subject: the username
    pub sub: String,

    /// Role name at issuance time
    pub role: String,

    /// Unique token identifier, the key used by the revocation ledger
    pub jti: Uuid,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Token type discriminator
    pub token_type: TokenType,
}

impl Claims {
    fn new(username: &str, role: &str, expiration: i64, token_type: TokenType) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: username.to_string(),
            role: role.to_string(),
            jti: Uuid::new_v4(),
            iat: now,
            exp: now + expiration,
            token_type,
        }
    }

    /// Create new access token claims with a fresh jti
    pub fn new_access(username: &str, role: &str, expiration: i64) -> Self {
        Self::new(username, role, expiration, TokenType::Access)
    }

    /// Create new refresh token claims with a fresh jti
    pub fn new_refresh(username: &str, role: &str, expiration: i64) -> Self {
        Self::new(username, role, expiration, TokenType::Refresh)
    }

    /// Create new service-account token claims with a fresh jti
    pub fn new_service_account(username: &str, role: &str, expiration: i64) -> Self {
        Self::new(username, role, expiration, TokenType::ServiceAccount)
    }

    /// The token's natural expiry as a timestamp
    pub fn expires_at(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(self.exp, 0).unwrap_or_else(chrono::Utc::now)
    }

    /// The issuance instant as a timestamp
    pub fn issued_at(&self) -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(self.iat, 0).unwrap_or_else(chrono::Utc::now)
    }
}

/// Validated signing secret.
///
/// Construction is the startup invariant: absent, short, or sentinel-valued
/// secrets are rejected and the process must refuse to start.
#[derive(Clone)]
pub struct JwtSecret(String);

impl JwtSecret {
    pub fn new(value: &str) -> Result<Self, AppError> {
        if value.is_empty() {
            return Err(AppError::Config("JWT signing secret is not set".to_string()));
        }
        if value.len() < MIN_SECRET_BYTES {
            return Err(AppError::Config(format!(
                "JWT signing secret must be at least {} bytes, got {}",
                MIN_SECRET_BYTES,
                value.len()
            )));
        }
        if DEFAULT_SENTINELS.contains(&value.to_lowercase().as_str()) {
            return Err(AppError::Config(
                "JWT signing secret is a known default placeholder".to_string(),
            ));
        }
        Ok(Self(value.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

// The secret must never end up in logs via {:?}
impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JwtSecret(****)")
    }
}

/// Encode claims into a signed compact token (HMAC over SHA-256)
pub fn encode_jwt(claims: &Claims, secret: &JwtSecret) -> Result<String, AppError> {
    let key = EncodingKey::from_secret(secret.expose().as_bytes());
    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| AppError::Internal(format!("Failed to encode JWT: {}", e)))
}

/// Decode and verify a token: signature first, then expiry.
///
/// Every failure collapses into `Unauthenticated`; the caller decides what,
/// if anything, to log.
pub fn decode_jwt(token: &str, secret: &JwtSecret) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret.expose().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthenticated("Invalid or expired token".to_string()))
}

/// Decode a token verifying the signature but tolerating an elapsed expiry.
///
/// Logout and administrative revocation need the jti of whatever token is
/// presented; revoking an already-expired token is then a harmless no-op.
pub fn decode_jwt_ignore_expiry(token: &str, secret: &JwtSecret) -> Result<Claims, AppError> {
    let key = DecodingKey::from_secret(secret.expose().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.validate_exp = false;

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthenticated("Invalid token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> JwtSecret {
        JwtSecret::new("0123456789abcdef0123456789abcdef-unit-test").unwrap()
    }

    #[test]
    fn test_jwt_encode_decode_round_trip() {
        let secret = test_secret();

        let claims = Claims::new_access("alice", "USER", 3600);
        let token = encode_jwt(&claims, &secret).unwrap();

        let decoded = decode_jwt(&token, &secret).unwrap();
        assert_eq!(decoded, claims);
        assert_eq!(decoded.sub, "alice");
        assert_eq!(decoded.token_type, TokenType::Access);
    }

    #[test]
    fn test_fresh_jti_per_token() {
        let a = Claims::new_access("alice", "USER", 3600);
        let b = Claims::new_access("alice", "USER", 3600);
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_expired_token_rejected() {
        let secret = test_secret();
        let mut claims = Claims::new_access("alice", "USER", 3600);
        claims.iat -= 7200;
        claims.exp = claims.iat + 3600;

        let token = encode_jwt(&claims, &secret).unwrap();
        let err = decode_jwt(&token, &secret).unwrap_err();
        assert_eq!(err.kind(), "UNAUTHENTICATED");
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let secret = test_secret();
        let other = JwtSecret::new("ffffffffffffffffffffffffffffffff-other").unwrap();

        let claims = Claims::new_refresh("bob", "ADMIN", 3600);
        let token = encode_jwt(&claims, &secret).unwrap();
        assert!(decode_jwt(&token, &other).is_err());
    }

    #[test]
    fn test_tampered_token_rejected() {
        let secret = test_secret();
        let claims = Claims::new_access("alice", "USER", 3600);
        let token = encode_jwt(&claims, &secret).unwrap();

        let mut tampered = token.clone();
        tampered.pop();
        tampered.push(if token.ends_with('a') { 'b' } else { 'a' });
        assert!(decode_jwt(&tampered, &secret).is_err());
    }

    #[test]
    fn test_decode_ignore_expiry_still_checks_signature() {
        let secret = test_secret();
        let other = JwtSecret::new("ffffffffffffffffffffffffffffffff-other").unwrap();

        let mut claims = Claims::new_access("alice", "USER", 3600);
        claims.iat -= 7200;
        claims.exp = claims.iat + 3600;
        let token = encode_jwt(&claims, &secret).unwrap();

        // Expired but well-signed: accepted
        let decoded = decode_jwt_ignore_expiry(&token, &secret).unwrap();
        assert_eq!(decoded.jti, claims.jti);
        // Wrong key: rejected regardless
        assert!(decode_jwt_ignore_expiry(&token, &other).is_err());
    }

    #[test]
    fn test_secret_policy() {
        assert!(JwtSecret::new("").is_err());
        assert!(JwtSecret::new("short").is_err());
        assert!(JwtSecret::new("secret").is_err());
        // Long enough but a known placeholder
        assert!(JwtSecret::new("please-change-this-jwt-secret-value").is_err());
        assert!(JwtSecret::new("0123456789abcdef0123456789abcdef").is_ok());
    }

    #[test]
    fn test_token_type_wire_format() {
        let json = serde_json::to_string(&TokenType::ServiceAccount).unwrap();
        assert_eq!(json, "\"SERVICE_ACCOUNT\"");
        let back: TokenType = serde_json::from_str("\"REFRESH\"").unwrap();
        assert_eq!(back, TokenType::Refresh);
    }
}
