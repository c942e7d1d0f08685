use async_trait::async_trait;
use chrono::Utc;
use shared_error::AppError;
use sqlx::PgPool;
use worklog_service_core::domains::expense::domain::{
    model::{Expense, ExpenseEdit, NewExpense},
    repository::ExpenseRepository,
    workflow::{plan_transition, ExpenseEvent, TransitionContext, WorkflowEmission},
};

/// PostgreSQL implementation of expense persistence.
///
/// Workflow transitions run as one transaction around `SELECT ... FOR UPDATE`,
/// so concurrent events against the same row serialise: the second reader
/// observes the already-moved state and the plan rejects it.
#[derive(Clone)]
pub struct PgExpenseRepository {
    pool: PgPool,
}

impl PgExpenseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM expenses WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ExpenseRepository for PgExpenseRepository {
    async fn create(&self, expense: &NewExpense) -> Result<Expense, AppError> {
        let now = Utc::now();
        let created = sqlx::query_as::<_, Expense>(
            r#"
            INSERT INTO expenses (
                owner_username, expense_date, amount, client, project,
                expense_type, payment_method, vendor, description,
                receipt_ref, status, resubmitted_count, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NULL, 'DRAFT', 0, $10, $10)
            RETURNING *
            "#,
        )
        .bind(&expense.owner_username)
        .bind(expense.expense_date)
        .bind(expense.amount)
        .bind(&expense.client)
        .bind(&expense.project)
        .bind(&expense.expense_type)
        .bind(&expense.payment_method)
        .bind(&expense.vendor)
        .bind(&expense.description)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Expense>, AppError> {
        let expense = sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(expense)
    }

    async fn list_for_owner(&self, owner_username: &str) -> Result<Vec<Expense>, AppError> {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT * FROM expenses WHERE owner_username = $1 ORDER BY expense_date DESC, id DESC",
        )
        .bind(owner_username)
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    async fn list_all(&self) -> Result<Vec<Expense>, AppError> {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT * FROM expenses ORDER BY expense_date DESC, id DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(expenses)
    }

    async fn update_draft(&self, id: i64, edit: &ExpenseEdit) -> Result<Expense, AppError> {
        // Draft-only by WHERE clause: a concurrent transition wins over a
        // stale edit, which then reports the conflict instead of clobbering.
        let updated = sqlx::query_as::<_, Expense>(
            r#"
            UPDATE expenses
            SET expense_date = COALESCE($2, expense_date),
                amount = COALESCE($3, amount),
                client = COALESCE($4, client),
                project = COALESCE($5, project),
                expense_type = COALESCE($6, expense_type),
                payment_method = COALESCE($7, payment_method),
                vendor = COALESCE($8, vendor),
                description = COALESCE($9, description),
                updated_at = NOW()
            WHERE id = $1 AND status = 'DRAFT'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(edit.expense_date)
        .bind(edit.amount)
        .bind(&edit.client)
        .bind(&edit.project)
        .bind(&edit.expense_type)
        .bind(&edit.payment_method)
        .bind(&edit.vendor)
        .bind(&edit.description)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(expense) => Ok(expense),
            None if self.exists(id).await? => Err(AppError::InvalidTransition(
                "Only Draft expenses can be edited".to_string(),
            )),
            None => Err(AppError::NotFound("Expense not found".to_string())),
        }
    }

    async fn transition(
        &self,
        id: i64,
        event: ExpenseEvent,
        ctx: &TransitionContext,
    ) -> Result<(Expense, WorkflowEmission), AppError> {
        let mut tx = self.pool.begin().await?;

        let current =
            sqlx::query_as::<_, Expense>("SELECT * FROM expenses WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::NotFound("Expense not found".to_string()))?;

        let plan = plan_transition(&current, event, ctx)?;
        let now = Utc::now();

        let updated = match event {
            ExpenseEvent::Submit => {
                sqlx::query_as::<_, Expense>(
                    r#"
                    UPDATE expenses
                    SET status = $2, submitted_at = $3, updated_at = $3
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(plan.next_status)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            },
            ExpenseEvent::Approve => {
                sqlx::query_as::<_, Expense>(
                    r#"
                    UPDATE expenses
                    SET status = $2, approved_by = $3, approved_at = $4, updated_at = $4
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(plan.next_status)
                .bind(&ctx.actor_username)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            },
            ExpenseEvent::Reject => {
                sqlx::query_as::<_, Expense>(
                    r#"
                    UPDATE expenses
                    SET status = $2, rejection_reason = $3, updated_at = $4
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(plan.next_status)
                .bind(&ctx.rejection_reason)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            },
            ExpenseEvent::Resubmit => {
                sqlx::query_as::<_, Expense>(
                    r#"
                    UPDATE expenses
                    SET status = $2, resubmitted_count = resubmitted_count + 1, updated_at = $3
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(plan.next_status)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            },
            ExpenseEvent::MarkReimbursed => {
                sqlx::query_as::<_, Expense>(
                    r#"
                    UPDATE expenses
                    SET status = $2, reimbursed_at = $3, updated_at = $3
                    WHERE id = $1
                    RETURNING *
                    "#,
                )
                .bind(id)
                .bind(plan.next_status)
                .bind(now)
                .fetch_one(&mut *tx)
                .await?
            },
        };

        tx.commit().await?;

        Ok((updated, plan.emission))
    }

    async fn delete_draft(&self, id: i64) -> Result<Expense, AppError> {
        let deleted = sqlx::query_as::<_, Expense>(
            "DELETE FROM expenses WHERE id = $1 AND status = 'DRAFT' RETURNING *",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match deleted {
            Some(expense) => Ok(expense),
            None if self.exists(id).await? => Err(AppError::InvalidTransition(
                "Only Draft expenses can be deleted".to_string(),
            )),
            None => Err(AppError::NotFound("Expense not found".to_string())),
        }
    }

    async fn set_receipt_ref(
        &self,
        id: i64,
        receipt_ref: Option<&str>,
    ) -> Result<Expense, AppError> {
        let updated = sqlx::query_as::<_, Expense>(
            r#"
            UPDATE expenses
            SET receipt_ref = $2, updated_at = NOW()
            WHERE id = $1 AND status = 'DRAFT'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(receipt_ref)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(expense) => Ok(expense),
            None if self.exists(id).await? => Err(AppError::InvalidTransition(
                "Receipts can only be attached to Draft expenses".to_string(),
            )),
            None => Err(AppError::NotFound("Expense not found".to_string())),
        }
    }
}
