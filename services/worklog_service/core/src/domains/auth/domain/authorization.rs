use async_trait::async_trait;
use shared_error::AppError;

/// Resource identifiers for permission codes
pub mod resources {
    pub const EXPENSE: &str = "EXPENSE";
    pub const TASK: &str = "TASK";
    pub const USER: &str = "USER";
    pub const JENKINS: &str = "JENKINS";
}

/// Action identifiers for permission codes
pub mod actions {
    pub const CREATE: &str = "CREATE";
    pub const READ: &str = "READ";
    pub const UPDATE: &str = "UPDATE";
    pub const DELETE: &str = "DELETE";
    pub const APPROVE: &str = "APPROVE";
    pub const NOTIFY: &str = "NOTIFY";
    pub const ADMIN: &str = "ADMIN";
}

/// A `RESOURCE:ACTION` pair, both uppercase identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermissionCode {
    pub resource: String,
    pub action: String,
}

impl PermissionCode {
    pub fn new(resource: &str, action: &str) -> Self {
        Self {
            resource: resource.to_string(),
            action: action.to_string(),
        }
    }

    /// Parse the canonical `RESOURCE:ACTION` form.
    pub fn parse(code: &str) -> Result<Self, AppError> {
        match code.split_once(':') {
            Some((resource, action)) if !resource.is_empty() && !action.is_empty() => {
                Ok(Self::new(resource, action))
            },
            _ => Err(AppError::Internal(format!("Malformed permission code: {}", code))),
        }
    }
}

impl std::fmt::Display for PermissionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource, self.action)
    }
}

/// The authenticated principal attached to every request by the gate.
///
/// Handlers receive it as an explicit parameter; there is no ambient
/// "current user" global anywhere in the workspace.
#[derive(Debug, Clone)]
pub struct Principal {
    pub user_id: i64,
    pub username: String,
    pub role_id: i64,
    pub role_name: String,
}

/// Permission evaluator over the role–permission join.
///
/// Assignments are reference data: results may be cached per
/// (role, permission) pair for the process lifetime, and any change to the
/// join requires a restart.
#[async_trait]
pub trait Authorizer: Send + Sync {
    async fn has_permission(
        &self,
        role_id: i64,
        permission: &PermissionCode,
    ) -> Result<bool, AppError>;

    /// Deny with FORBIDDEN unless the principal's role holds the permission.
    async fn require_permission(
        &self,
        principal: &Principal,
        permission: &PermissionCode,
    ) -> Result<(), AppError> {
        if self.has_permission(principal.role_id, permission).await? {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Missing required permission {}",
                permission
            )))
        }
    }
}

/// The uniform owner-or-admin predicate.
///
/// An actor may see or touch a record iff they own it or their role holds the
/// resource's ADMIN permission. Services must use this instead of reinventing
/// the rule; callers translate `false` into NOT_FOUND on reads to avoid
/// leaking existence.
pub async fn owner_or_admin(
    authorizer: &dyn Authorizer,
    principal: &Principal,
    owner_username: &str,
    resource: &str,
) -> Result<bool, AppError> {
    if principal.username == owner_username {
        return Ok(true);
    }
    authorizer
        .has_permission(principal.role_id, &PermissionCode::new(resource, actions::ADMIN))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticAuthorizer {
        granted: Vec<PermissionCode>,
    }

    #[async_trait]
    impl Authorizer for StaticAuthorizer {
        async fn has_permission(
            &self,
            _role_id: i64,
            permission: &PermissionCode,
        ) -> Result<bool, AppError> {
            Ok(self.granted.contains(permission))
        }
    }

    fn principal(username: &str) -> Principal {
        Principal {
            user_id: 7,
            username: username.to_string(),
            role_id: 2,
            role_name: "USER".to_string(),
        }
    }

    #[test]
    fn test_parse_permission_code() {
        let code = PermissionCode::parse("EXPENSE:APPROVE").unwrap();
        assert_eq!(code.resource, "EXPENSE");
        assert_eq!(code.action, "APPROVE");
        assert_eq!(code.to_string(), "EXPENSE:APPROVE");

        assert!(PermissionCode::parse("EXPENSE").is_err());
        assert!(PermissionCode::parse(":APPROVE").is_err());
        assert!(PermissionCode::parse("EXPENSE:").is_err());
    }

    #[tokio::test]
    async fn test_require_permission() {
        let authorizer = StaticAuthorizer {
            granted: vec![PermissionCode::new("EXPENSE", "READ")],
        };

        let p = principal("alice");
        assert!(authorizer
            .require_permission(&p, &PermissionCode::new("EXPENSE", "READ"))
            .await
            .is_ok());

        let err = authorizer
            .require_permission(&p, &PermissionCode::new("EXPENSE", "APPROVE"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_owner_or_admin() {
        let plain = StaticAuthorizer { granted: vec![] };
        let admin = StaticAuthorizer {
            granted: vec![PermissionCode::new("EXPENSE", "ADMIN")],
        };

        // Owner always passes
        assert!(owner_or_admin(&plain, &principal("alice"), "alice", "EXPENSE")
            .await
            .unwrap());
        // Non-owner without the admin permission does not
        assert!(!owner_or_admin(&plain, &principal("mallory"), "alice", "EXPENSE")
            .await
            .unwrap());
        // Non-owner holding RESOURCE:ADMIN passes
        assert!(owner_or_admin(&admin, &principal("root"), "alice", "EXPENSE")
            .await
            .unwrap());
    }
}
