//! The expense approval state machine.
//!
//! `plan_transition` is a pure function from (current row, event, actor
//! context) to the next state. It owns every policy rule of the workflow:
//! who may fire which event, four-eyes, required-field guards, and
//! terminality. Persistence runs the plan inside a row-locked transaction so
//! two racing calls cannot both succeed.

use super::model::{Expense, ExpenseStatus};
use shared_error::AppError;

/// Workflow events an actor can fire against an existing expense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseEvent {
    Submit,
    Approve,
    Reject,
    Resubmit,
    MarkReimbursed,
}

impl std::fmt::Display for ExpenseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExpenseEvent::Submit => "submit",
            ExpenseEvent::Approve => "approve",
            ExpenseEvent::Reject => "reject",
            ExpenseEvent::Resubmit => "resubmit",
            ExpenseEvent::MarkReimbursed => "mark-reimbursed",
        };
        write!(f, "{}", name)
    }
}

/// Actor context evaluated against the locked row
#[derive(Debug, Clone)]
pub struct TransitionContext {
    pub actor_username: String,
    /// Whether the actor's role holds EXPENSE:APPROVE
    pub has_approve: bool,
    /// Required for `Reject`
    pub rejection_reason: Option<String>,
}

/// Notification emitted as the transition's side effect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowEmission {
    Submitted,
    Approved,
    Rejected,
    Reimbursed,
}

/// The outcome of a legal transition
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    pub next_status: ExpenseStatus,
    pub emission: WorkflowEmission,
}

/// Decide whether `event` is legal for `expense` fired by `ctx`'s actor.
///
/// Authority is checked before state legality: an actor who may never fire
/// the event gets FORBIDDEN even when the state would also have refused it.
/// A permitted actor firing an event the current state does not accept gets
/// INVALID_TRANSITION and the row stays untouched.
pub fn plan_transition(
    expense: &Expense,
    event: ExpenseEvent,
    ctx: &TransitionContext,
) -> Result<TransitionPlan, AppError> {
    let is_owner = ctx.actor_username == expense.owner_username;

    match event {
        ExpenseEvent::Submit | ExpenseEvent::Resubmit => {
            if !is_owner {
                return Err(AppError::Forbidden(format!(
                    "Only the owner may {} an expense",
                    event
                )));
            }
        },
        ExpenseEvent::Approve | ExpenseEvent::Reject | ExpenseEvent::MarkReimbursed => {
            if !ctx.has_approve {
                return Err(AppError::Forbidden(format!(
                    "{} requires the EXPENSE:APPROVE permission",
                    event
                )));
            }
            // Four-eyes: approver and owner must differ, always.
            if is_owner {
                return Err(AppError::Forbidden(format!(
                    "The owner may not {} their own expense",
                    event
                )));
            }
        },
    }

    let next_status = match (expense.status, event) {
        (ExpenseStatus::Draft, ExpenseEvent::Submit) => {
            let missing = expense.missing_required_fields();
            if !missing.is_empty() {
                return Err(AppError::InvalidInput(format!(
                    "Cannot submit with missing fields: {}",
                    missing.join(", ")
                )));
            }
            ExpenseStatus::Submitted
        },
        (ExpenseStatus::Submitted | ExpenseStatus::Resubmitted, ExpenseEvent::Approve) => {
            ExpenseStatus::Approved
        },
        (ExpenseStatus::Submitted | ExpenseStatus::Resubmitted, ExpenseEvent::Reject) => {
            if ctx.rejection_reason.as_deref().map_or(true, |r| r.trim().is_empty()) {
                return Err(AppError::InvalidInput(
                    "A rejection reason is required".to_string(),
                ));
            }
            ExpenseStatus::Rejected
        },
        (ExpenseStatus::Rejected, ExpenseEvent::Resubmit) => ExpenseStatus::Resubmitted,
        (ExpenseStatus::Approved, ExpenseEvent::MarkReimbursed) => ExpenseStatus::Reimbursed,
        (status, event) => {
            return Err(AppError::InvalidTransition(format!(
                "Cannot {} an expense in state {}",
                event, status
            )));
        },
    };

    let emission = match event {
        // Resubmission re-announces the expense to approvers
        ExpenseEvent::Submit | ExpenseEvent::Resubmit => WorkflowEmission::Submitted,
        ExpenseEvent::Approve => WorkflowEmission::Approved,
        ExpenseEvent::Reject => WorkflowEmission::Rejected,
        ExpenseEvent::MarkReimbursed => WorkflowEmission::Reimbursed,
    };

    Ok(TransitionPlan {
        next_status,
        emission,
    })
}
