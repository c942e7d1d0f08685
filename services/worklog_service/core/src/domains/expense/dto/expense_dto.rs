use crate::domains::expense::domain::model::{Expense, ExpenseStatus};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Request to create a Draft expense owned by the caller
#[derive(Serialize, Deserialize, ToSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateExpenseReq {
    pub expense_date: NaiveDate,

    /// Must be strictly positive
    #[schema(example = "42.50")]
    pub amount: Decimal,

    #[validate(length(max = 200))]
    pub client: Option<String>,

    #[validate(length(max = 200))]
    pub project: Option<String>,

    #[validate(length(max = 100))]
    pub expense_type: Option<String>,

    #[validate(length(max = 100))]
    pub payment_method: Option<String>,

    #[validate(length(max = 200))]
    pub vendor: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Draft-only edit request; absent fields are left unchanged.
///
/// The approval-gated fields have no representation here and so can never be
/// written through an edit.
#[derive(Serialize, Deserialize, ToSchema, Validate, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateExpenseReq {
    pub expense_date: Option<NaiveDate>,

    pub amount: Option<Decimal>,

    #[validate(length(max = 200))]
    pub client: Option<String>,

    #[validate(length(max = 200))]
    pub project: Option<String>,

    #[validate(length(max = 100))]
    pub expense_type: Option<String>,

    #[validate(length(max = 100))]
    pub payment_method: Option<String>,

    #[validate(length(max = 200))]
    pub vendor: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,
}

/// Reject request; the reason is mandatory and persisted on the row
#[derive(Serialize, Deserialize, ToSchema, Validate)]
pub struct RejectExpenseReq {
    #[validate(length(min = 1, max = 2000))]
    #[schema(example = "Receipt is missing")]
    pub reason: String,
}

/// Expense as returned by every expense endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseResp {
    pub id: i64,
    pub owner_username: String,
    pub expense_date: NaiveDate,
    pub amount: Decimal,
    pub client: Option<String>,
    pub project: Option<String>,
    pub expense_type: Option<String>,
    pub payment_method: Option<String>,
    pub vendor: Option<String>,
    pub description: Option<String>,
    pub receipt_ref: Option<String>,
    pub status: ExpenseStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub reimbursed_at: Option<DateTime<Utc>>,
    pub resubmitted_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<Expense> for ExpenseResp {
    fn from(e: Expense) -> Self {
        Self {
            id: e.id,
            owner_username: e.owner_username,
            expense_date: e.expense_date,
            amount: e.amount,
            client: e.client,
            project: e.project,
            expense_type: e.expense_type,
            payment_method: e.payment_method,
            vendor: e.vendor,
            description: e.description,
            receipt_ref: e.receipt_ref,
            status: e.status,
            submitted_at: e.submitted_at,
            approved_by: e.approved_by,
            approved_at: e.approved_at,
            rejection_reason: e.rejection_reason,
            reimbursed_at: e.reimbursed_at,
            resubmitted_count: e.resubmitted_count,
            created_at: e.created_at,
        }
    }
}
