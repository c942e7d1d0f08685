use shared_rate_limit::RateLimitState;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use worklog_service_api::{build_router, state::AppState};
use worklog_service_infra::auth::{
    AuthServiceImpl, CachedAuthorizer, PgPasswordHistoryRepository, PgRevokedTokenRepository,
    PgRoleRepository, PgUserRepository,
};
use worklog_service_infra::bootstrap;
use worklog_service_infra::expense::{ExpenseServiceImpl, PgExpenseRepository};
use worklog_service_infra::notifier::{EmailNotifier, SmtpConfig, SmtpEmailSender};
use worklog_service_infra::scheduler::Scheduler;
use worklog_service_infra::storage::{ReceiptStoreConfig, S3ReceiptStore};

/// Exit codes: 0 normal, 1 startup invariant failed, 2 configuration parse error
const EXIT_INVARIANT: i32 = 1;
const EXIT_CONFIG_PARSE: i32 = 2;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    tracing::info!("Worklog service starting");

    let config = match shared_config::Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration parse error");
            std::process::exit(EXIT_CONFIG_PARSE);
        },
    };

    // Mandatory secrets first: a bad signing secret or a missing bootstrap
    // password refuses startup before anything touches the network.
    let jwt_secret = match bootstrap::check_startup_invariants(&config) {
        Ok(secret) => secret,
        Err(e) => {
            tracing::error!(error = %e, "Startup invariant failed");
            std::process::exit(EXIT_INVARIANT);
        },
    };

    let pool = match shared_db::init_pool(
        &config.database_url,
        config.database_max_connections,
        Duration::from_secs(config.database_acquire_timeout_seconds),
    )
    .await
    {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!(error = %e, "Database unreachable at startup");
            std::process::exit(EXIT_INVARIANT);
        },
    };

    tracing::info!("Database connected");

    // Seed manifest reconciliation and initial administrator
    if let Err(e) = bootstrap::run(&pool, &config.admin_bootstrap_password).await {
        tracing::error!(error = %e, "Bootstrap failed");
        std::process::exit(EXIT_INVARIANT);
    }

    let user_repo = PgUserRepository::new(pool.clone());
    let history_repo = PgPasswordHistoryRepository::new(pool.clone());
    let role_repo = PgRoleRepository::new(pool.clone());
    let revoked_repo = PgRevokedTokenRepository::new(pool.clone());
    let authorizer = Arc::new(CachedAuthorizer::new(pool.clone()));

    let email_sender = match SmtpEmailSender::new(SmtpConfig::from_config(&config)) {
        Ok(sender) => Arc::new(sender),
        Err(e) => {
            tracing::error!(error = %e, "Mail sender initialization failed");
            std::process::exit(EXIT_INVARIANT);
        },
    };

    let notifier = Arc::new(EmailNotifier::new(
        email_sender,
        Arc::new(user_repo.clone()),
        shared_config::Config::split_recipients(&config.admin_recipients),
        shared_config::Config::split_recipients(&config.approver_recipients),
    ));

    let receipt_store = Arc::new(S3ReceiptStore::new(ReceiptStoreConfig::from_config(&config)));

    let auth_service = Arc::new(AuthServiceImpl::new(
        user_repo.clone(),
        history_repo,
        role_repo.clone(),
        revoked_repo.clone(),
        jwt_secret.clone(),
        config.access_token_expiration,
        config.refresh_token_expiration,
        config.service_token_expiration,
    ));

    let expense_service = Arc::new(ExpenseServiceImpl::new(
        PgExpenseRepository::new(pool.clone()),
        authorizer.clone(),
        notifier.clone(),
        receipt_store,
    ));

    let app_state = AppState {
        auth_service: auth_service.clone(),
        admin_service: auth_service,
        expense_service,
        authorizer,
        user_repo: Arc::new(user_repo),
        role_repo: Arc::new(role_repo),
        revoked_tokens: Arc::new(revoked_repo),
        notifier,
        jwt_secret,
    };

    tracing::info!("Services initialized");

    // Background jobs start before the listener so the first scan cannot be
    // missed by a slow bind.
    Scheduler::new(
        app_state.user_repo.clone(),
        app_state.revoked_tokens.clone(),
        app_state.notifier.clone(),
        config.expiration_scan_hour,
        Duration::from_secs(config.revoked_token_gc_interval_seconds),
    )
    .spawn();

    tracing::info!("Scheduler started");

    let rate_limit = RateLimitState::new(
        config.rate_limit_enabled,
        config.auth_rate_limit_max,
        Duration::from_secs(config.auth_rate_limit_window_seconds),
    );

    let app = build_router(
        app_state,
        rate_limit,
        Duration::from_secs(config.request_timeout_seconds),
    );

    let host: IpAddr = config
        .host
        .parse()
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    let addr = SocketAddr::from((host, config.port));

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(error = %e, addr = %addr, "Failed to bind listener");
            std::process::exit(EXIT_INVARIANT);
        },
    };

    tracing::info!(addr = %addr, "Worklog service listening");

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    {
        tracing::error!(error = %e, "Server terminated");
        std::process::exit(EXIT_INVARIANT);
    }
}
