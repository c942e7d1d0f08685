use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Standard error response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResp {
    /// Stable machine-readable kind
    #[schema(example = "UNAUTHENTICATED")]
    pub error: String,

    /// Human-readable message
    #[schema(example = "Invalid credentials")]
    pub message: String,
}

/// Health check response
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResp {
    /// Service status
    #[schema(example = "ok")]
    pub status: String,

    /// Service version
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Current timestamp
    pub timestamp: DateTime<Utc>,
}

/// Login request
#[derive(Serialize, Deserialize, ToSchema, Validate)]
pub struct LoginReq {
    /// Account username
    #[validate(length(min = 1))]
    #[schema(example = "alice")]
    pub username: String,

    /// Password
    #[validate(length(min = 1))]
    #[schema(example = "SecurePass123!")]
    pub password: String,
}

/// Authentication response with the freshly minted token pair
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResp {
    /// Access token (expires in 24 hours by default)
    pub access_token: String,

    /// Refresh token (expires in 7 days by default)
    pub refresh_token: String,

    /// Token type
    #[schema(example = "Bearer")]
    pub token_type: String,

    /// Access token lifetime in seconds
    #[schema(example = 86400)]
    pub expires_in: i64,

    /// Set when the account must change its password before continuing
    pub must_change_password: bool,
}

/// Refresh request
#[derive(Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RefreshReq {
    /// The refresh token from the previous pair
    #[validate(length(min = 1))]
    pub refresh_token: String,
}

/// Logout request
#[derive(Serialize, Deserialize, ToSchema, Validate)]
pub struct LogoutReq {
    /// The token to revoke (access or refresh)
    #[validate(length(min = 1))]
    pub token: String,
}

/// Authenticated password change request
#[derive(Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordReq {
    /// The current password, re-verified before any change
    #[validate(length(min = 1))]
    pub current_password: String,

    /// The candidate password, checked against the password policy
    #[validate(length(min = 1))]
    pub new_password: String,
}

/// Self-service profile update; identity and security state are not here.
/// Absent fields are left unchanged.
#[derive(Serialize, Deserialize, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileReq {
    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 100))]
    pub first_name: Option<String>,

    #[validate(length(max = 100))]
    pub last_name: Option<String>,

    #[validate(length(max = 100))]
    pub company: Option<String>,
}

/// User information returned by account and admin endpoints
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: i64,

    #[schema(example = "alice")]
    pub username: String,

    #[schema(example = "alice@example.com")]
    pub email: Option<String>,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    pub company: Option<String>,

    /// Role name
    #[schema(example = "USER")]
    pub role: String,

    pub enabled: bool,

    pub locked: bool,

    pub password_expires_at: DateTime<Utc>,

    pub force_password_change: bool,
}
