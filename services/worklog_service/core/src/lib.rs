//! Domain layer of the worklog security core.
//!
//! Holds the entities, repository and service contracts, the password policy
//! engine, the authorization evaluator, the expense workflow state machine,
//! and the notification event vocabulary. Everything here is persistence- and
//! transport-agnostic; the infra crate supplies Postgres and SMTP.

pub mod domains;
pub mod events;
