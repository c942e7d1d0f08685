use async_trait::async_trait;
use chrono::Utc;
use shared_error::AppError;
use shared_jwt::{decode_jwt, decode_jwt_ignore_expiry, encode_jwt, Claims, JwtSecret, TokenType};
use worklog_service_core::domains::auth::{
    domain::{
        authorization::Principal,
        model::{roles, NewUser, User, PASSWORD_HISTORY_LIMIT},
        repository::{
            PasswordHistoryRepository, RevokedTokenRepository, RoleRepository, UserRepository,
        },
        service::{AdminService, AuthService},
    },
    dto::admin_dto::{CreateUserReq, ServiceTokenReq, ServiceTokenResp},
    dto::auth_dto::{AuthResp, ChangePasswordReq, LoginReq, RefreshReq, UserInfo},
    utils::password_policy,
};

/// Authentication service implementation
///
/// Composes the policy engine, credential store, token codec and revocation
/// ledger. Every public login failure is the same generic 401; the concrete
/// cause is recorded in the server log only.
pub struct AuthServiceImpl<UR, HR, RR, TR>
where
    UR: UserRepository,
    HR: PasswordHistoryRepository,
    RR: RoleRepository,
    TR: RevokedTokenRepository,
{
    user_repo: UR,
    history_repo: HR,
    role_repo: RR,
    revoked_repo: TR,
    jwt_secret: JwtSecret,
    access_expiration: i64,
    refresh_expiration: i64,
    service_expiration: i64,
}

impl<UR, HR, RR, TR> AuthServiceImpl<UR, HR, RR, TR>
where
    UR: UserRepository,
    HR: PasswordHistoryRepository,
    RR: RoleRepository,
    TR: RevokedTokenRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: UR,
        history_repo: HR,
        role_repo: RR,
        revoked_repo: TR,
        jwt_secret: JwtSecret,
        access_expiration: i64,
        refresh_expiration: i64,
        service_expiration: i64,
    ) -> Self {
        Self {
            user_repo,
            history_repo,
            role_repo,
            revoked_repo,
            jwt_secret,
            access_expiration,
            refresh_expiration,
            service_expiration,
        }
    }

    async fn role_name(&self, role_id: i64) -> Result<String, AppError> {
        self.role_repo
            .find_by_id(role_id)
            .await?
            .map(|r| r.name)
            .ok_or_else(|| AppError::Internal(format!("Unknown role id {}", role_id)))
    }

    fn mint_pair(
        &self,
        username: &str,
        role_name: &str,
        must_change_password: bool,
    ) -> Result<AuthResp, AppError> {
        let access_claims = Claims::new_access(username, role_name, self.access_expiration);
        let refresh_claims = Claims::new_refresh(username, role_name, self.refresh_expiration);

        Ok(AuthResp {
            access_token: encode_jwt(&access_claims, &self.jwt_secret)?,
            refresh_token: encode_jwt(&refresh_claims, &self.jwt_secret)?,
            token_type: "Bearer".to_string(),
            expires_in: self.access_expiration,
            must_change_password,
        })
    }

    fn user_info(user: &User, role_name: &str) -> UserInfo {
        UserInfo {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            company: user.company.clone(),
            role: role_name.to_string(),
            enabled: user.enabled,
            locked: user.locked,
            password_expires_at: user.password_expires_at,
            force_password_change: user.force_password_change,
        }
    }
}

#[async_trait]
impl<UR, HR, RR, TR> AuthService for AuthServiceImpl<UR, HR, RR, TR>
where
    UR: UserRepository + Send + Sync,
    HR: PasswordHistoryRepository + Send + Sync,
    RR: RoleRepository + Send + Sync,
    TR: RevokedTokenRepository + Send + Sync,
{
    async fn login(&self, req: LoginReq) -> Result<AuthResp, AppError> {
        let user = match self.user_repo.find_by_username(&req.username).await? {
            Some(user) => user,
            None => {
                tracing::info!(username = %req.username, "Login failed: unknown username");
                return Err(AppError::invalid_credentials());
            },
        };

        if !user.enabled {
            tracing::info!(username = %user.username, "Login failed: account disabled");
            return Err(AppError::invalid_credentials());
        }
        if user.locked {
            tracing::info!(username = %user.username, "Login failed: account locked");
            return Err(AppError::invalid_credentials());
        }

        let valid = bcrypt::verify(&req.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            let locked_now = self.user_repo.record_failed_login(user.id).await?;
            if locked_now {
                tracing::warn!(username = %user.username, "Account locked after repeated failed logins");
            } else {
                tracing::info!(username = %user.username, "Login failed: wrong password");
            }
            return Err(AppError::invalid_credentials());
        }

        let role_name = self.role_name(user.role_id).await?;
        let now = Utc::now();

        // GUEST accounts have no self-service password change; an expired
        // password blocks them outright, without touching the counter. This
        // is the one login failure with a specific public message.
        if role_name == roles::GUEST && user.password_expired(now) {
            tracing::info!(username = %user.username, "Login blocked: expired GUEST password");
            return Err(AppError::Unauthenticated(
                "Password expired. Please contact an administrator to reset it.".to_string(),
            ));
        }

        self.user_repo.reset_failed_login_count(user.id).await?;

        let must_change = user.force_password_change || user.password_expired(now);

        tracing::info!(username = %user.username, role = %role_name, "Login succeeded");
        self.mint_pair(&user.username, &role_name, must_change)
    }

    async fn refresh(&self, req: RefreshReq) -> Result<AuthResp, AppError> {
        let claims = decode_jwt(&req.refresh_token, &self.jwt_secret)?;

        if claims.token_type != TokenType::Refresh {
            tracing::info!(username = %claims.sub, "Refresh rejected: wrong token type");
            return Err(AppError::Unauthenticated("Invalid or expired token".to_string()));
        }

        if self.revoked_repo.is_revoked(claims.jti).await? {
            tracing::info!(username = %claims.sub, jti = %claims.jti, "Refresh rejected: revoked token");
            return Err(AppError::Unauthenticated("Invalid or expired token".to_string()));
        }

        let user = self
            .user_repo
            .find_by_username(&claims.sub)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        if !user.can_authenticate() {
            tracing::info!(username = %user.username, "Refresh rejected: account disabled or locked");
            return Err(AppError::invalid_credentials());
        }

        // A password change invalidates every token issued before it.
        if let Some(boundary) = user.tokens_invalid_before {
            if claims.issued_at() < boundary {
                tracing::info!(username = %user.username, "Refresh rejected: token predates password change");
                return Err(AppError::Unauthenticated("Invalid or expired token".to_string()));
            }
        }

        // Rotation: the incoming refresh token dies with the handshake.
        self.revoked_repo
            .revoke(claims.jti, &claims.sub, claims.expires_at())
            .await?;

        let role_name = self.role_name(user.role_id).await?;
        let must_change = user.force_password_change || user.password_expired(Utc::now());

        self.mint_pair(&user.username, &role_name, must_change)
    }

    async fn logout(&self, token: &str) -> Result<(), AppError> {
        // The signature must verify before the jti can be trusted, but an
        // elapsed expiry is fine: logging out an expired token is a no-op.
        let claims = decode_jwt_ignore_expiry(token, &self.jwt_secret)?;

        if claims.expires_at() <= Utc::now() {
            return Ok(());
        }

        self.revoked_repo
            .revoke(claims.jti, &claims.sub, claims.expires_at())
            .await?;

        tracing::info!(username = %claims.sub, jti = %claims.jti, "Token revoked at logout");
        Ok(())
    }

    async fn change_password(
        &self,
        principal: &Principal,
        req: ChangePasswordReq,
    ) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_by_username(&principal.username)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        if principal.role_name == roles::GUEST {
            return Err(AppError::Forbidden(
                "GUEST accounts cannot change their own password".to_string(),
            ));
        }

        let valid = bcrypt::verify(&req.current_password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            tracing::info!(username = %user.username, "Password change rejected: wrong current password");
            return Err(AppError::invalid_credentials());
        }

        let history = self
            .history_repo
            .recent_hashes(user.id, PASSWORD_HISTORY_LIMIT)
            .await?;

        password_policy::validate(&req.new_password, &user.username, &history)
            .map_err(|violations| {
                AppError::InvalidInput(password_policy::violation_summary(&violations))
            })?;

        let new_hash = bcrypt::hash(&req.new_password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        // The unit of work also stamps tokens_invalid_before, so every token
        // issued before this instant is dead on arrival at the gate.
        self.user_repo.change_password(user.id, &new_hash).await?;

        tracing::info!(username = %user.username, "Password changed; outstanding tokens invalidated");
        Ok(())
    }
}

#[async_trait]
impl<UR, HR, RR, TR> AdminService for AuthServiceImpl<UR, HR, RR, TR>
where
    UR: UserRepository + Send + Sync,
    HR: PasswordHistoryRepository + Send + Sync,
    RR: RoleRepository + Send + Sync,
    TR: RevokedTokenRepository + Send + Sync,
{
    async fn create_user(&self, req: CreateUserReq) -> Result<UserInfo, AppError> {
        let role = self
            .role_repo
            .find_by_name(&req.role)
            .await?
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown role: {}", req.role)))?;

        if self.user_repo.find_by_username(&req.username).await?.is_some() {
            return Err(AppError::InvalidInput(format!(
                "Username {} is already taken",
                req.username
            )));
        }

        let password_hash = bcrypt::hash(&req.password, bcrypt::DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

        let new_user = NewUser {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            company: req.company,
            password_hash,
            role_id: role.id,
            // Admin-assigned passwords are provisional
            force_password_change: true,
            password_expires_at: NewUser::expires_from(Utc::now()),
        };

        let created = self.user_repo.create(&new_user).await?;
        tracing::info!(username = %created.username, role = %role.name, "User created");

        Ok(Self::user_info(&created, &role.name))
    }

    async fn unlock_user(&self, username: &str) -> Result<(), AppError> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        self.user_repo.unlock(user.id).await?;
        tracing::info!(username = %username, "Account unlocked by administrator");
        Ok(())
    }

    async fn mint_service_token(&self, req: ServiceTokenReq) -> Result<ServiceTokenResp, AppError> {
        let user = self
            .user_repo
            .find_by_username(&req.username)
            .await?
            .ok_or_else(|| AppError::InvalidInput("Unknown service account".to_string()))?;

        let role_name = self.role_name(user.role_id).await?;
        let expires_in = req.expires_in.unwrap_or(self.service_expiration);
        if expires_in <= 0 {
            return Err(AppError::InvalidInput("Token lifetime must be positive".to_string()));
        }

        let claims = Claims::new_service_account(&user.username, &role_name, expires_in);
        let token = encode_jwt(&claims, &self.jwt_secret)?;

        tracing::info!(username = %user.username, expires_in, "Service-account token minted");
        Ok(ServiceTokenResp { token, expires_in })
    }

    async fn revoke_token(&self, token: &str) -> Result<(), AppError> {
        let claims = decode_jwt_ignore_expiry(token, &self.jwt_secret)?;

        if claims.expires_at() <= Utc::now() {
            return Ok(());
        }

        self.revoked_repo
            .revoke(claims.jti, &claims.sub, claims.expires_at())
            .await?;

        tracing::warn!(username = %claims.sub, jti = %claims.jti, "Token revoked by administrator");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};
    use mockall::mock;
    use mockall::predicate::eq;
    use uuid::Uuid;
    use worklog_service_core::domains::auth::domain::model::{ProfileUpdate, Role};

    mock! {
        pub UserRepo {}

        #[async_trait]
        impl UserRepository for UserRepo {
            async fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
            async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;
            async fn create(&self, user: &NewUser) -> Result<User, AppError>;
            async fn update_profile(&self, id: i64, update: &ProfileUpdate) -> Result<User, AppError>;
            async fn change_password(&self, id: i64, new_hash: &str) -> Result<User, AppError>;
            async fn record_failed_login(&self, id: i64) -> Result<bool, AppError>;
            async fn reset_failed_login_count(&self, id: i64) -> Result<(), AppError>;
            async fn unlock(&self, id: i64) -> Result<(), AppError>;
            async fn set_enabled(&self, id: i64, enabled: bool) -> Result<(), AppError>;
            async fn find_expiring_between(
                &self,
                from: DateTime<Utc>,
                to: DateTime<Utc>,
                exclude_role: &str,
            ) -> Result<Vec<User>, AppError>;
        }
    }

    mock! {
        pub HistoryRepo {}

        #[async_trait]
        impl PasswordHistoryRepository for HistoryRepo {
            async fn recent_hashes(&self, user_id: i64, limit: i64) -> Result<Vec<String>, AppError>;
        }
    }

    mock! {
        pub RoleRepo {}

        #[async_trait]
        impl RoleRepository for RoleRepo {
            async fn find_by_id(&self, id: i64) -> Result<Option<Role>, AppError>;
            async fn find_by_name(&self, name: &str) -> Result<Option<Role>, AppError>;
        }
    }

    mock! {
        pub RevokedRepo {}

        #[async_trait]
        impl RevokedTokenRepository for RevokedRepo {
            async fn revoke(&self, jti: Uuid, username: &str, expires_at: DateTime<Utc>) -> Result<(), AppError>;
            async fn is_revoked(&self, jti: Uuid) -> Result<bool, AppError>;
            async fn delete_expired(&self) -> Result<u64, AppError>;
        }
    }

    const TEST_PASSWORD: &str = "Password1!";

    fn secret() -> JwtSecret {
        JwtSecret::new("unit-test-secret-0123456789abcdef0123456789").unwrap()
    }

    fn test_user(role_id: i64) -> User {
        let now = Utc::now();
        User {
            id: 1,
            username: "alice".to_string(),
            email: Some("alice@example.com".to_string()),
            first_name: None,
            last_name: None,
            company: None,
            password_hash: bcrypt::hash(TEST_PASSWORD, 4).unwrap(),
            role_id,
            enabled: true,
            locked: false,
            failed_login_count: 0,
            password_last_changed: now,
            password_expires_at: now + Duration::days(30),
            force_password_change: false,
            tokens_invalid_before: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn user_role() -> Role {
        Role {
            id: 2,
            name: "USER".to_string(),
            description: None,
        }
    }

    fn guest_role() -> Role {
        Role {
            id: 1,
            name: "GUEST".to_string(),
            description: None,
        }
    }

    fn service(
        user_repo: MockUserRepo,
        history_repo: MockHistoryRepo,
        role_repo: MockRoleRepo,
        revoked_repo: MockRevokedRepo,
    ) -> AuthServiceImpl<MockUserRepo, MockHistoryRepo, MockRoleRepo, MockRevokedRepo> {
        AuthServiceImpl::new(
            user_repo,
            history_repo,
            role_repo,
            revoked_repo,
            secret(),
            3600,
            7200,
            86_400,
        )
    }

    fn principal() -> Principal {
        Principal {
            user_id: 1,
            username: "alice".to_string(),
            role_id: 2,
            role_name: "USER".to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_success_resets_counter_and_mints_pair() {
        let mut users = MockUserRepo::new();
        let user = test_user(2);
        let returned = user.clone();
        users
            .expect_find_by_username()
            .with(eq("alice"))
            .returning(move |_| Ok(Some(returned.clone())));
        users
            .expect_reset_failed_login_count()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(()));

        let mut roles_repo = MockRoleRepo::new();
        roles_repo
            .expect_find_by_id()
            .with(eq(2))
            .returning(|_| Ok(Some(user_role())));

        let svc = service(users, MockHistoryRepo::new(), roles_repo, MockRevokedRepo::new());
        let resp = svc
            .login(LoginReq {
                username: "alice".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .unwrap();

        assert_eq!(resp.token_type, "Bearer");
        assert!(!resp.must_change_password);

        let access = decode_jwt(&resp.access_token, &secret()).unwrap();
        assert_eq!(access.sub, "alice");
        assert_eq!(access.role, "USER");
        assert_eq!(access.token_type, TokenType::Access);

        let refresh = decode_jwt(&resp.refresh_token, &secret()).unwrap();
        assert_eq!(refresh.token_type, TokenType::Refresh);
        assert_ne!(access.jti, refresh.jti);
    }

    #[tokio::test]
    async fn test_login_unknown_user_is_generic() {
        let mut users = MockUserRepo::new();
        users.expect_find_by_username().returning(|_| Ok(None));

        let svc = service(users, MockHistoryRepo::new(), MockRoleRepo::new(), MockRevokedRepo::new());
        let err = svc
            .login(LoginReq {
                username: "nobody".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "UNAUTHENTICATED");
        assert_eq!(err.to_string(), "Unauthenticated: Invalid credentials");
    }

    #[tokio::test]
    async fn test_login_wrong_password_records_failure() {
        let mut users = MockUserRepo::new();
        let user = test_user(2);
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_record_failed_login()
            .with(eq(1))
            .times(1)
            .returning(|_| Ok(false));

        let svc = service(users, MockHistoryRepo::new(), MockRoleRepo::new(), MockRevokedRepo::new());
        let err = svc
            .login(LoginReq {
                username: "alice".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_login_fifth_failure_locks_with_generic_response() {
        let mut users = MockUserRepo::new();
        let mut user = test_user(2);
        user.failed_login_count = 4;
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_record_failed_login()
            .times(1)
            .returning(|_| Ok(true));

        let svc = service(users, MockHistoryRepo::new(), MockRoleRepo::new(), MockRevokedRepo::new());
        let err = svc
            .login(LoginReq {
                username: "alice".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();

        // Locking is not distinguishable from any other login failure
        assert_eq!(err.to_string(), "Unauthenticated: Invalid credentials");
    }

    #[tokio::test]
    async fn test_login_locked_account_rejected_even_with_correct_password() {
        let mut users = MockUserRepo::new();
        let mut user = test_user(2);
        user.locked = true;
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        // Neither the counter reset nor a failure record may fire

        let svc = service(users, MockHistoryRepo::new(), MockRoleRepo::new(), MockRevokedRepo::new());
        let err = svc
            .login(LoginReq {
                username: "alice".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_login_disabled_account_rejected() {
        let mut users = MockUserRepo::new();
        let mut user = test_user(2);
        user.enabled = false;
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));

        let svc = service(users, MockHistoryRepo::new(), MockRoleRepo::new(), MockRevokedRepo::new());
        let err = svc
            .login(LoginReq {
                username: "alice".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_login_expired_guest_blocked_without_counter_change() {
        let mut users = MockUserRepo::new();
        let mut user = test_user(1);
        user.password_expires_at = Utc::now() - Duration::days(1);
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        // No record_failed_login, no reset: the mocks would panic on a call

        let mut roles_repo = MockRoleRepo::new();
        roles_repo
            .expect_find_by_id()
            .with(eq(1))
            .returning(|_| Ok(Some(guest_role())));

        let svc = service(users, MockHistoryRepo::new(), roles_repo, MockRevokedRepo::new());
        let err = svc
            .login(LoginReq {
                username: "alice".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "UNAUTHENTICATED");
        assert!(err.to_string().contains("expired"));
        assert!(err.to_string().contains("administrator"));
    }

    #[tokio::test]
    async fn test_login_expired_non_guest_must_change_password() {
        let mut users = MockUserRepo::new();
        let mut user = test_user(2);
        user.password_expires_at = Utc::now() - Duration::days(1);
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        users.expect_reset_failed_login_count().returning(|_| Ok(()));

        let mut roles_repo = MockRoleRepo::new();
        roles_repo
            .expect_find_by_id()
            .returning(|_| Ok(Some(user_role())));

        let svc = service(users, MockHistoryRepo::new(), roles_repo, MockRevokedRepo::new());
        let resp = svc
            .login(LoginReq {
                username: "alice".to_string(),
                password: TEST_PASSWORD.to_string(),
            })
            .await
            .unwrap();

        assert!(resp.must_change_password);
    }

    #[tokio::test]
    async fn test_refresh_rotates_and_revokes_old_token() {
        let claims = Claims::new_refresh("alice", "USER", 7200);
        let token = encode_jwt(&claims, &secret()).unwrap();
        let old_jti = claims.jti;

        let mut users = MockUserRepo::new();
        let user = test_user(2);
        users
            .expect_find_by_username()
            .with(eq("alice"))
            .returning(move |_| Ok(Some(user.clone())));

        let mut roles_repo = MockRoleRepo::new();
        roles_repo
            .expect_find_by_id()
            .returning(|_| Ok(Some(user_role())));

        let mut revoked = MockRevokedRepo::new();
        revoked
            .expect_is_revoked()
            .with(eq(old_jti))
            .returning(|_| Ok(false));
        revoked
            .expect_revoke()
            .withf(move |jti, username, _| *jti == old_jti && username == "alice")
            .times(1)
            .returning(|_, _, _| Ok(()));

        let svc = service(users, MockHistoryRepo::new(), roles_repo, revoked);
        let resp = svc
            .refresh(RefreshReq {
                refresh_token: token,
            })
            .await
            .unwrap();

        let new_refresh = decode_jwt(&resp.refresh_token, &secret()).unwrap();
        assert_ne!(new_refresh.jti, old_jti);
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let claims = Claims::new_access("alice", "USER", 3600);
        let token = encode_jwt(&claims, &secret()).unwrap();

        let svc = service(
            MockUserRepo::new(),
            MockHistoryRepo::new(),
            MockRoleRepo::new(),
            MockRevokedRepo::new(),
        );
        let err = svc
            .refresh(RefreshReq {
                refresh_token: token,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_refresh_rejects_revoked_token() {
        let claims = Claims::new_refresh("alice", "USER", 7200);
        let token = encode_jwt(&claims, &secret()).unwrap();

        let mut revoked = MockRevokedRepo::new();
        revoked.expect_is_revoked().returning(|_| Ok(true));

        let svc = service(MockUserRepo::new(), MockHistoryRepo::new(), MockRoleRepo::new(), revoked);
        let err = svc
            .refresh(RefreshReq {
                refresh_token: token,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_refresh_rejects_token_predating_password_change() {
        let claims = Claims::new_refresh("alice", "USER", 7200);
        let token = encode_jwt(&claims, &secret()).unwrap();

        let mut users = MockUserRepo::new();
        let mut user = test_user(2);
        user.tokens_invalid_before = Some(Utc::now() + Duration::seconds(60));
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));

        let mut revoked = MockRevokedRepo::new();
        revoked.expect_is_revoked().returning(|_| Ok(false));

        let svc = service(users, MockHistoryRepo::new(), MockRoleRepo::new(), revoked);
        let err = svc
            .refresh(RefreshReq {
                refresh_token: token,
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_logout_inserts_ledger_row_with_natural_expiry() {
        let claims = Claims::new_access("alice", "USER", 3600);
        let token = encode_jwt(&claims, &secret()).unwrap();
        let jti = claims.jti;
        let expires_at = claims.expires_at();

        let mut revoked = MockRevokedRepo::new();
        revoked
            .expect_revoke()
            .withf(move |j, username, exp| *j == jti && username == "alice" && *exp == expires_at)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let svc = service(MockUserRepo::new(), MockHistoryRepo::new(), MockRoleRepo::new(), revoked);
        svc.logout(&token).await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_expired_token_is_noop() {
        let mut claims = Claims::new_access("alice", "USER", 3600);
        claims.iat -= 7200;
        claims.exp = claims.iat + 3600;
        let token = encode_jwt(&claims, &secret()).unwrap();

        // No revoke expected; the mock would panic on an unexpected call
        let svc = service(
            MockUserRepo::new(),
            MockHistoryRepo::new(),
            MockRoleRepo::new(),
            MockRevokedRepo::new(),
        );
        svc.logout(&token).await.unwrap();
    }

    #[tokio::test]
    async fn test_logout_garbage_token_rejected() {
        let svc = service(
            MockUserRepo::new(),
            MockHistoryRepo::new(),
            MockRoleRepo::new(),
            MockRevokedRepo::new(),
        );
        let err = svc.logout("not-a-token").await.unwrap_err();
        assert_eq!(err.kind(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_change_password_happy_path() {
        let mut users = MockUserRepo::new();
        let user = test_user(2);
        let changed = user.clone();
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));
        users
            .expect_change_password()
            .withf(|id, new_hash| {
                *id == 1 && bcrypt::verify("Brand-New-Pass7!", new_hash).unwrap_or(false)
            })
            .times(1)
            .returning(move |_, _| Ok(changed.clone()));

        let mut history = MockHistoryRepo::new();
        history
            .expect_recent_hashes()
            .with(eq(1), eq(PASSWORD_HISTORY_LIMIT))
            .returning(|_, _| Ok(vec![]));

        let svc = service(users, history, MockRoleRepo::new(), MockRevokedRepo::new());
        svc.change_password(
            &principal(),
            ChangePasswordReq {
                current_password: TEST_PASSWORD.to_string(),
                new_password: "Brand-New-Pass7!".to_string(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_change_password_wrong_current_rejected() {
        let mut users = MockUserRepo::new();
        let user = test_user(2);
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));

        let svc = service(users, MockHistoryRepo::new(), MockRoleRepo::new(), MockRevokedRepo::new());
        let err = svc
            .change_password(
                &principal(),
                ChangePasswordReq {
                    current_password: "wrong".to_string(),
                    new_password: "Brand-New-Pass7!".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn test_change_password_policy_violations_are_itemized() {
        let mut users = MockUserRepo::new();
        let user = test_user(2);
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));

        let mut history = MockHistoryRepo::new();
        history.expect_recent_hashes().returning(|_, _| Ok(vec![]));

        let svc = service(users, history, MockRoleRepo::new(), MockRevokedRepo::new());
        let err = svc
            .change_password(
                &principal(),
                ChangePasswordReq {
                    current_password: TEST_PASSWORD.to_string(),
                    new_password: "weak".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "INVALID_INPUT");
        assert!(err.to_string().contains("TOO_SHORT"));
    }

    #[tokio::test]
    async fn test_change_password_rejects_reuse() {
        let mut users = MockUserRepo::new();
        let user = test_user(2);
        let old_hash = bcrypt::hash("Old-Password7!", 4).unwrap();
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));

        let mut history = MockHistoryRepo::new();
        history
            .expect_recent_hashes()
            .returning(move |_, _| Ok(vec![old_hash.clone()]));

        let svc = service(users, history, MockRoleRepo::new(), MockRevokedRepo::new());
        let err = svc
            .change_password(
                &principal(),
                ChangePasswordReq {
                    current_password: TEST_PASSWORD.to_string(),
                    new_password: "Old-Password7!".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "INVALID_INPUT");
        assert!(err.to_string().contains("REUSED"));
    }

    #[tokio::test]
    async fn test_change_password_forbidden_for_guest() {
        let mut users = MockUserRepo::new();
        let user = test_user(1);
        users
            .expect_find_by_username()
            .returning(move |_| Ok(Some(user.clone())));

        let svc = service(users, MockHistoryRepo::new(), MockRoleRepo::new(), MockRevokedRepo::new());
        let guest = Principal {
            user_id: 1,
            username: "alice".to_string(),
            role_id: 1,
            role_name: "GUEST".to_string(),
        };
        let err = svc
            .change_password(
                &guest,
                ChangePasswordReq {
                    current_password: TEST_PASSWORD.to_string(),
                    new_password: "Brand-New-Pass7!".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "FORBIDDEN");
    }

    #[tokio::test]
    async fn test_create_user_forces_password_change() {
        let mut roles_repo = MockRoleRepo::new();
        roles_repo
            .expect_find_by_name()
            .with(eq("USER"))
            .returning(|_| Ok(Some(user_role())));

        let mut users = MockUserRepo::new();
        users.expect_find_by_username().returning(|_| Ok(None));
        users
            .expect_create()
            .withf(|new_user| new_user.force_password_change && new_user.role_id == 2)
            .times(1)
            .returning(|new_user| {
                let mut user = test_user(new_user.role_id);
                user.username = new_user.username.clone();
                user.force_password_change = true;
                Ok(user)
            });

        let svc = service(users, MockHistoryRepo::new(), roles_repo, MockRevokedRepo::new());
        let info = svc
            .create_user(CreateUserReq {
                username: "dave".to_string(),
                email: Some("dave@example.com".to_string()),
                first_name: None,
                last_name: None,
                company: None,
                role: "USER".to_string(),
                password: "Initial-Pass7!".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(info.username, "dave");
        assert!(info.force_password_change);
    }

    #[tokio::test]
    async fn test_create_user_duplicate_username_rejected() {
        let mut roles_repo = MockRoleRepo::new();
        roles_repo
            .expect_find_by_name()
            .returning(|_| Ok(Some(user_role())));

        let mut users = MockUserRepo::new();
        users
            .expect_find_by_username()
            .returning(|_| Ok(Some(test_user(2))));

        let svc = service(users, MockHistoryRepo::new(), roles_repo, MockRevokedRepo::new());
        let err = svc
            .create_user(CreateUserReq {
                username: "alice".to_string(),
                email: None,
                first_name: None,
                last_name: None,
                company: None,
                role: "USER".to_string(),
                password: "Initial-Pass7!".to_string(),
            })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "INVALID_INPUT");
    }

    #[tokio::test]
    async fn test_mint_service_token() {
        let mut users = MockUserRepo::new();
        let mut jenkins = test_user(5);
        jenkins.username = "jenkins".to_string();
        users
            .expect_find_by_username()
            .with(eq("jenkins"))
            .returning(move |_| Ok(Some(jenkins.clone())));

        let mut roles_repo = MockRoleRepo::new();
        roles_repo.expect_find_by_id().with(eq(5)).returning(|_| {
            Ok(Some(Role {
                id: 5,
                name: "JENKINS_SERVICE".to_string(),
                description: None,
            }))
        });

        let svc = service(users, MockHistoryRepo::new(), roles_repo, MockRevokedRepo::new());
        let resp = svc
            .mint_service_token(ServiceTokenReq {
                username: "jenkins".to_string(),
                expires_in: None,
            })
            .await
            .unwrap();

        assert_eq!(resp.expires_in, 86_400);
        let claims = decode_jwt(&resp.token, &secret()).unwrap();
        assert_eq!(claims.token_type, TokenType::ServiceAccount);
        assert_eq!(claims.sub, "jenkins");
        assert_eq!(claims.role, "JENKINS_SERVICE");
    }
}
