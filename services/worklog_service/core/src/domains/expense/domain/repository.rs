use super::model::{Expense, ExpenseEdit, NewExpense};
use super::workflow::{ExpenseEvent, TransitionContext, WorkflowEmission};
use async_trait::async_trait;
use shared_error::AppError;

/// Expense persistence.
///
/// `transition` is the serializable unit of work of the workflow engine:
/// implementations read the row under a row-level lock, evaluate the
/// transition plan against the locked state, apply the side-effect stamps,
/// and commit. The losing side of two racing transitions observes the
/// already-moved state and fails with INVALID_TRANSITION.
#[async_trait]
pub trait ExpenseRepository: Send + Sync {
    async fn create(&self, expense: &NewExpense) -> Result<Expense, AppError>;

    async fn find_by_id(&self, id: i64) -> Result<Option<Expense>, AppError>;

    async fn list_for_owner(&self, owner_username: &str) -> Result<Vec<Expense>, AppError>;

    async fn list_all(&self) -> Result<Vec<Expense>, AppError>;

    /// Draft-only edit of non-approval fields; the status is part of the
    /// WHERE clause so a concurrent transition wins over a stale edit.
    async fn update_draft(&self, id: i64, edit: &ExpenseEdit) -> Result<Expense, AppError>;

    /// Execute one workflow transition atomically. Returns the row after the
    /// move together with the emission the state machine decided, so callers
    /// build the notification from committed state and never re-derive which
    /// event to announce.
    async fn transition(
        &self,
        id: i64,
        event: ExpenseEvent,
        ctx: &TransitionContext,
    ) -> Result<(Expense, WorkflowEmission), AppError>;

    /// Remove a Draft row. Fails with INVALID_TRANSITION once the expense
    /// has left Draft.
    async fn delete_draft(&self, id: i64) -> Result<Expense, AppError>;

    /// Attach or clear the opaque receipt handle on a Draft row.
    async fn set_receipt_ref(&self, id: i64, receipt_ref: Option<&str>)
        -> Result<Expense, AppError>;
}
