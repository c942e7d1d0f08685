use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// The six expense states. `Reimbursed` is terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "varchar", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ExpenseStatus {
    Draft,
    Submitted,
    Approved,
    Rejected,
    Resubmitted,
    Reimbursed,
}

impl ExpenseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExpenseStatus::Reimbursed)
    }

    /// Only Draft rows are editable by their owner.
    pub fn is_editable(&self) -> bool {
        matches!(self, ExpenseStatus::Draft)
    }
}

impl std::fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExpenseStatus::Draft => "DRAFT",
            ExpenseStatus::Submitted => "SUBMITTED",
            ExpenseStatus::Approved => "APPROVED",
            ExpenseStatus::Rejected => "REJECTED",
            ExpenseStatus::Resubmitted => "RESUBMITTED",
            ExpenseStatus::Reimbursed => "REIMBURSED",
        };
        write!(f, "{}", name)
    }
}

/// Expense entity (domain model)
///
/// `owner_username` is immutable after creation. The approval-gated fields
/// (`approved_by`, `approved_at`, `reimbursed_at`) are written only by
/// workflow transitions, never through edits.
#[derive(Debug, Clone, FromRow)]
pub struct Expense {
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
    /// Opaque handle into the receipt blob store
    pub receipt_ref: Option<String>,
    pub status: ExpenseStatus,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub reimbursed_at: Option<DateTime<Utc>>,
    pub resubmitted_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Fields that must be populated before `submit` is legal.
    pub fn missing_required_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        let blank = |v: &Option<String>| v.as_deref().map_or(true, |s| s.trim().is_empty());

        if blank(&self.client) {
            missing.push("client");
        }
        if blank(&self.project) {
            missing.push("project");
        }
        if blank(&self.expense_type) {
            missing.push("expense_type");
        }
        if blank(&self.payment_method) {
            missing.push("payment_method");
        }
        if blank(&self.vendor) {
            missing.push("vendor");
        }
        missing
    }
}

/// Fields for creating an expense; it always starts in Draft, owned by the actor.
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub owner_username: String,
    pub expense_date: NaiveDate,
    pub amount: Decimal,
    pub client: Option<String>,
    pub project: Option<String>,
    pub expense_type: Option<String>,
    pub payment_method: Option<String>,
    pub vendor: Option<String>,
    pub description: Option<String>,
}

/// Draft-only edit. Approval-gated fields have no representation here,
/// which is what keeps them unreachable through `edit`.
#[derive(Debug, Clone, Default)]
pub struct ExpenseEdit {
    pub expense_date: Option<NaiveDate>,
    pub amount: Option<Decimal>,
    pub client: Option<String>,
    pub project: Option<String>,
    pub expense_type: Option<String>,
    pub payment_method: Option<String>,
    pub vendor: Option<String>,
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn draft() -> Expense {
        let now = Utc::now();
        Expense {
            id: 1,
            owner_username: "dave".to_string(),
            expense_date: now.date_naive(),
            amount: Decimal::new(12_50, 2),
            client: Some("Acme".to_string()),
            project: Some("Rollout".to_string()),
            expense_type: Some("Travel".to_string()),
            payment_method: Some("Corporate card".to_string()),
            vendor: Some("Rail Co".to_string()),
            description: Some("Site visit".to_string()),
            receipt_ref: None,
            status: ExpenseStatus::Draft,
            submitted_at: None,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            reimbursed_at: None,
            resubmitted_count: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_terminal_and_editable() {
        assert!(ExpenseStatus::Reimbursed.is_terminal());
        assert!(!ExpenseStatus::Approved.is_terminal());
        assert!(ExpenseStatus::Draft.is_editable());
        assert!(!ExpenseStatus::Submitted.is_editable());
    }

    #[test]
    fn test_missing_required_fields() {
        assert!(draft().missing_required_fields().is_empty());

        let mut incomplete = draft();
        incomplete.vendor = None;
        incomplete.client = Some("   ".to_string());
        let missing = incomplete.missing_required_fields();
        assert_eq!(missing, vec!["client", "vendor"]);
    }

    #[test]
    fn test_status_wire_format() {
        assert_eq!(serde_json::to_string(&ExpenseStatus::Draft).unwrap(), "\"DRAFT\"");
        let back: ExpenseStatus = serde_json::from_str("\"RESUBMITTED\"").unwrap();
        assert_eq!(back, ExpenseStatus::Resubmitted);
    }
}
