use async_trait::async_trait;
use rust_decimal::Decimal;
use shared_error::AppError;
use std::sync::Arc;
use worklog_service_core::domains::auth::domain::authorization::{
    actions, owner_or_admin, resources, Authorizer, PermissionCode, Principal,
};
use worklog_service_core::domains::expense::domain::{
    model::{Expense, ExpenseEdit, ExpenseStatus, NewExpense},
    receipt::ReceiptStore,
    repository::ExpenseRepository,
    service::ExpenseService,
    workflow::{ExpenseEvent, TransitionContext, WorkflowEmission},
};
use worklog_service_core::domains::expense::dto::expense_dto::{
    CreateExpenseReq, RejectExpenseReq, UpdateExpenseReq,
};
use worklog_service_core::events::{NotificationEvent, Notifier};

/// Expense workflow service implementation
///
/// Permission and visibility gates run here; the legality of each transition
/// is decided by the state machine inside the repository's locked unit of
/// work. Notifications are queued after commit and never fail the request.
pub struct ExpenseServiceImpl<R>
where
    R: ExpenseRepository,
{
    repo: R,
    authorizer: Arc<dyn Authorizer>,
    notifier: Arc<dyn Notifier>,
    receipt_store: Arc<dyn ReceiptStore>,
}

impl<R> ExpenseServiceImpl<R>
where
    R: ExpenseRepository,
{
    pub fn new(
        repo: R,
        authorizer: Arc<dyn Authorizer>,
        notifier: Arc<dyn Notifier>,
        receipt_store: Arc<dyn ReceiptStore>,
    ) -> Self {
        Self {
            repo,
            authorizer,
            notifier,
            receipt_store,
        }
    }

    async fn has_approve(&self, principal: &Principal) -> Result<bool, AppError> {
        self.authorizer
            .has_permission(
                principal.role_id,
                &PermissionCode::new(resources::EXPENSE, actions::APPROVE),
            )
            .await
    }

    /// Load a row the principal may see, hiding existence otherwise.
    async fn load_visible(&self, principal: &Principal, id: i64) -> Result<Expense, AppError> {
        let expense = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

        let allowed = owner_or_admin(
            self.authorizer.as_ref(),
            principal,
            &expense.owner_username,
            resources::EXPENSE,
        )
        .await?;

        if allowed {
            return Ok(expense);
        }

        // Approvers see expenses only once they enter the workflow; a Draft
        // stays private to its owner until submitted.
        if expense.status != ExpenseStatus::Draft && self.has_approve(principal).await? {
            return Ok(expense);
        }

        // NOT_FOUND, not FORBIDDEN: existence is part of the secret
        Err(AppError::NotFound("Expense not found".to_string()))
    }

    async fn run_transition(
        &self,
        principal: &Principal,
        id: i64,
        event: ExpenseEvent,
        rejection_reason: Option<String>,
    ) -> Result<Expense, AppError> {
        // Visibility first so a hidden row 404s before any policy error.
        self.load_visible(principal, id).await?;

        let ctx = TransitionContext {
            actor_username: principal.username.clone(),
            has_approve: self.has_approve(principal).await?,
            rejection_reason,
        };

        let (moved, emission) = self.repo.transition(id, event, &ctx).await?;

        self.emit(&moved, emission).await;

        Ok(moved)
    }

    /// Queue the notification the state machine decided on, built from
    /// committed row state. Delivery problems are an operational concern;
    /// the transition stands regardless.
    async fn emit(&self, expense: &Expense, emission: WorkflowEmission) {
        let notification = match emission {
            WorkflowEmission::Submitted => NotificationEvent::ExpenseSubmitted {
                expense_id: expense.id,
                owner_username: expense.owner_username.clone(),
                amount: expense.amount,
                resubmitted_count: expense.resubmitted_count,
            },
            WorkflowEmission::Approved => NotificationEvent::ExpenseApproved {
                expense_id: expense.id,
                owner_username: expense.owner_username.clone(),
                approved_by: expense.approved_by.clone().unwrap_or_default(),
            },
            WorkflowEmission::Rejected => NotificationEvent::ExpenseRejected {
                expense_id: expense.id,
                owner_username: expense.owner_username.clone(),
                reason: expense.rejection_reason.clone().unwrap_or_default(),
            },
            WorkflowEmission::Reimbursed => NotificationEvent::ExpenseReimbursed {
                expense_id: expense.id,
                owner_username: expense.owner_username.clone(),
            },
        };

        if let Err(e) = self.notifier.notify(notification).await {
            tracing::error!(
                expense_id = expense.id,
                error = %e,
                "Failed to queue workflow notification"
            );
        }
    }
}

#[async_trait]
impl<R> ExpenseService for ExpenseServiceImpl<R>
where
    R: ExpenseRepository + Send + Sync,
{
    async fn create(
        &self,
        principal: &Principal,
        req: CreateExpenseReq,
    ) -> Result<Expense, AppError> {
        self.authorizer
            .require_permission(
                principal,
                &PermissionCode::new(resources::EXPENSE, actions::CREATE),
            )
            .await?;

        if req.amount <= Decimal::ZERO {
            return Err(AppError::InvalidInput("Amount must be positive".to_string()));
        }

        let new_expense = NewExpense {
            owner_username: principal.username.clone(),
            expense_date: req.expense_date,
            amount: req.amount,
            client: req.client,
            project: req.project,
            expense_type: req.expense_type,
            payment_method: req.payment_method,
            vendor: req.vendor,
            description: req.description,
        };

        self.repo.create(&new_expense).await
    }

    async fn get(&self, principal: &Principal, id: i64) -> Result<Expense, AppError> {
        self.load_visible(principal, id).await
    }

    async fn list(&self, principal: &Principal) -> Result<Vec<Expense>, AppError> {
        let is_admin = self
            .authorizer
            .has_permission(
                principal.role_id,
                &PermissionCode::new(resources::EXPENSE, actions::ADMIN),
            )
            .await?;

        if is_admin {
            self.repo.list_all().await
        } else {
            self.repo.list_for_owner(&principal.username).await
        }
    }

    async fn update(
        &self,
        principal: &Principal,
        id: i64,
        req: UpdateExpenseReq,
    ) -> Result<Expense, AppError> {
        let expense = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

        // Edits follow the owner-or-admin rule, approvers have no edit rights
        let allowed = owner_or_admin(
            self.authorizer.as_ref(),
            principal,
            &expense.owner_username,
            resources::EXPENSE,
        )
        .await?;
        if !allowed {
            return Err(AppError::NotFound("Expense not found".to_string()));
        }

        if let Some(amount) = req.amount {
            if amount <= Decimal::ZERO {
                return Err(AppError::InvalidInput("Amount must be positive".to_string()));
            }
        }

        let edit = ExpenseEdit {
            expense_date: req.expense_date,
            amount: req.amount,
            client: req.client,
            project: req.project,
            expense_type: req.expense_type,
            payment_method: req.payment_method,
            vendor: req.vendor,
            description: req.description,
        };

        self.repo.update_draft(id, &edit).await
    }

    async fn delete(&self, principal: &Principal, id: i64) -> Result<(), AppError> {
        let expense = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

        let allowed = owner_or_admin(
            self.authorizer.as_ref(),
            principal,
            &expense.owner_username,
            resources::EXPENSE,
        )
        .await?;
        if !allowed {
            return Err(AppError::NotFound("Expense not found".to_string()));
        }

        let deleted = self.repo.delete_draft(id).await?;

        // Best effort: the row is gone either way, a stranded blob is an
        // operational cleanup, not a user-facing failure.
        if let Some(receipt_ref) = &deleted.receipt_ref {
            if let Err(e) = self.receipt_store.delete(receipt_ref).await {
                tracing::error!(
                    expense_id = id,
                    receipt_ref = %receipt_ref,
                    error = %e,
                    "Failed to delete receipt blob for deleted expense"
                );
            }
        }

        Ok(())
    }

    async fn submit(&self, principal: &Principal, id: i64) -> Result<Expense, AppError> {
        self.run_transition(principal, id, ExpenseEvent::Submit, None).await
    }

    async fn approve(&self, principal: &Principal, id: i64) -> Result<Expense, AppError> {
        self.run_transition(principal, id, ExpenseEvent::Approve, None).await
    }

    async fn reject(
        &self,
        principal: &Principal,
        id: i64,
        req: RejectExpenseReq,
    ) -> Result<Expense, AppError> {
        self.run_transition(principal, id, ExpenseEvent::Reject, Some(req.reason)).await
    }

    async fn resubmit(&self, principal: &Principal, id: i64) -> Result<Expense, AppError> {
        self.run_transition(principal, id, ExpenseEvent::Resubmit, None).await
    }

    async fn mark_reimbursed(&self, principal: &Principal, id: i64) -> Result<Expense, AppError> {
        self.run_transition(principal, id, ExpenseEvent::MarkReimbursed, None).await
    }

    async fn attach_receipt(
        &self,
        principal: &Principal,
        id: i64,
        bytes: Vec<u8>,
        mime: &str,
    ) -> Result<Expense, AppError> {
        let expense = self.load_visible(principal, id).await?;

        let allowed = owner_or_admin(
            self.authorizer.as_ref(),
            principal,
            &expense.owner_username,
            resources::EXPENSE,
        )
        .await?;
        if !allowed {
            return Err(AppError::NotFound("Expense not found".to_string()));
        }

        if !expense.status.is_editable() {
            return Err(AppError::InvalidTransition(
                "Receipts can only be attached to Draft expenses".to_string(),
            ));
        }

        let handle = self
            .receipt_store
            .put(&expense.owner_username, id, bytes, mime)
            .await?;

        self.repo.set_receipt_ref(id, Some(&handle)).await
    }

    async fn get_receipt(&self, principal: &Principal, id: i64) -> Result<Vec<u8>, AppError> {
        let expense = self.load_visible(principal, id).await?;

        let handle = expense
            .receipt_ref
            .ok_or_else(|| AppError::NotFound("No receipt attached".to_string()))?;

        self.receipt_store.get(&handle).await
    }
}
