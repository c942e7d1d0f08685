pub mod authorization;
pub mod repository;
pub mod service;

pub use authorization::CachedAuthorizer;
pub use repository::{
    PgPasswordHistoryRepository, PgRevokedTokenRepository, PgRoleRepository, PgUserRepository,
};
pub use service::AuthServiceImpl;
