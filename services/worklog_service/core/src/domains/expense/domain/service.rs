use super::model::Expense;
use crate::domains::auth::domain::authorization::Principal;
use crate::domains::expense::dto::expense_dto::{CreateExpenseReq, RejectExpenseReq, UpdateExpenseReq};
use async_trait::async_trait;
use shared_error::AppError;

/// Expense workflow service contract.
///
/// Every method takes the authenticated principal explicitly; visibility is
/// governed by the owner-or-admin rule, and a hidden record surfaces as
/// NOT_FOUND rather than FORBIDDEN.
#[async_trait]
pub trait ExpenseService: Send + Sync {
    async fn create(&self, principal: &Principal, req: CreateExpenseReq)
        -> Result<Expense, AppError>;

    async fn get(&self, principal: &Principal, id: i64) -> Result<Expense, AppError>;

    /// Own expenses, or every expense for holders of EXPENSE:ADMIN.
    async fn list(&self, principal: &Principal) -> Result<Vec<Expense>, AppError>;

    async fn update(
        &self,
        principal: &Principal,
        id: i64,
        req: UpdateExpenseReq,
    ) -> Result<Expense, AppError>;

    async fn delete(&self, principal: &Principal, id: i64) -> Result<(), AppError>;

    async fn submit(&self, principal: &Principal, id: i64) -> Result<Expense, AppError>;

    async fn approve(&self, principal: &Principal, id: i64) -> Result<Expense, AppError>;

    async fn reject(
        &self,
        principal: &Principal,
        id: i64,
        req: RejectExpenseReq,
    ) -> Result<Expense, AppError>;

    async fn resubmit(&self, principal: &Principal, id: i64) -> Result<Expense, AppError>;

    async fn mark_reimbursed(&self, principal: &Principal, id: i64) -> Result<Expense, AppError>;

    /// Attach a receipt blob to a Draft expense and store its handle.
    async fn attach_receipt(
        &self,
        principal: &Principal,
        id: i64,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<Expense, AppError>;

    /// Fetch the receipt bytes attached to a visible expense.
    async fn get_receipt(&self, principal: &Principal, id: i64) -> Result<Vec<u8>, AppError>;
}
