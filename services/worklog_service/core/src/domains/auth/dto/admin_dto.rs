use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Administrator request to create a user
#[derive(Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserReq {
    /// Unique username; immutable after creation
    #[validate(length(min = 1, max = 50))]
    #[schema(example = "dave")]
    pub username: String,

    /// Email address; required for the user to receive notifications
    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 100))]
    pub first_name: Option<String>,

    #[validate(length(max = 100))]
    pub last_name: Option<String>,

    #[validate(length(max = 100))]
    pub company: Option<String>,

    /// Role name; must exist in the seeded reference data
    #[validate(length(min = 1))]
    #[schema(example = "USER")]
    pub role: String,

    /// Initial password; the account is forced to change it on first use
    #[validate(length(min = 1))]
    pub password: String,
}

/// Request to mint a long-lived SERVICE_ACCOUNT token for CI
#[derive(Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTokenReq {
    /// The service-account username the token acts as
    #[validate(length(min = 1))]
    #[schema(example = "jenkins")]
    pub username: String,

    /// Optional lifetime override in seconds; defaults to the configured
    /// service-account lifetime (30 days)
    pub expires_in: Option<i64>,
}

/// Minted service token
#[derive(Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTokenResp {
    pub token: String,

    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Administrator request to revoke a presented token
#[derive(Serialize, Deserialize, ToSchema, Validate)]
pub struct RevokeTokenReq {
    #[validate(length(min = 1))]
    pub token: String,
}

/// CI build/deploy notification payload, forwarded to the dispatcher
#[derive(Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JenkinsNotifyReq {
    /// Job name
    #[validate(length(min = 1))]
    #[schema(example = "worklog-deploy")]
    pub job: String,

    /// Event family: "build" or "deploy"
    #[validate(length(min = 1))]
    #[schema(example = "build")]
    pub event: String,

    /// Outcome reported by CI
    #[validate(length(min = 1))]
    #[schema(example = "SUCCESS")]
    pub status: String,

    /// Optional link to the run
    pub url: Option<String>,
}
