use crate::extractors::CurrentUser;
use crate::state::AppState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use shared_error::AppError;
use validator::Validate;
use worklog_service_core::domains::auth::dto::auth_dto::ErrorResp;
use worklog_service_core::domains::expense::dto::expense_dto::{
    CreateExpenseReq, ExpenseResp, RejectExpenseReq, UpdateExpenseReq,
};

/// Create an expense in Draft, owned by the caller
#[utoipa::path(
    post,
    path = "/api/expenses",
    tag = "expenses",
    operation_id = "create_expense",
    request_body = CreateExpenseReq,
    responses(
        (status = 201, description = "Expense created", body = ExpenseResp),
        (status = 400, description = "Invalid input", body = ErrorResp),
        (status = 403, description = "Missing EXPENSE:CREATE", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_expense(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<CreateExpenseReq>,
) -> Result<(StatusCode, Json<ExpenseResp>), AppError> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let expense = state.expense_service.create(&principal, payload).await?;
    Ok((StatusCode::CREATED, Json(expense.into())))
}

/// List expenses: own, or every expense for EXPENSE:ADMIN holders
#[utoipa::path(
    get,
    path = "/api/expenses",
    tag = "expenses",
    operation_id = "list_expenses",
    responses(
        (status = 200, description = "Expenses visible to the caller", body = [ExpenseResp]),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_expenses(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<Vec<ExpenseResp>>, AppError> {
    let expenses = state.expense_service.list(&principal).await?;
    Ok(Json(expenses.into_iter().map(Into::into).collect()))
}

/// Fetch one expense under the owner-or-admin rule
#[utoipa::path(
    get,
    path = "/api/expenses/{id}",
    tag = "expenses",
    operation_id = "get_expense",
    params(("id" = i64, Path, description = "Expense id")),
    responses(
        (status = 200, description = "The expense", body = ExpenseResp),
        (status = 404, description = "Absent or not visible", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_expense(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ExpenseResp>, AppError> {
    let expense = state.expense_service.get(&principal, id).await?;
    Ok(Json(expense.into()))
}

/// Edit a Draft expense (non-approval fields only)
#[utoipa::path(
    put,
    path = "/api/expenses/{id}",
    tag = "expenses",
    operation_id = "update_expense",
    params(("id" = i64, Path, description = "Expense id")),
    request_body = UpdateExpenseReq,
    responses(
        (status = 200, description = "Updated expense", body = ExpenseResp),
        (status = 404, description = "Absent or not visible", body = ErrorResp),
        (status = 409, description = "Not in Draft", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_expense(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExpenseReq>,
) -> Result<Json<ExpenseResp>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let expense = state.expense_service.update(&principal, id, payload).await?;
    Ok(Json(expense.into()))
}

/// Delete a Draft expense; the receipt blob is removed best-effort
#[utoipa::path(
    delete,
    path = "/api/expenses/{id}",
    tag = "expenses",
    operation_id = "delete_expense",
    params(("id" = i64, Path, description = "Expense id")),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 404, description = "Absent or not visible", body = ErrorResp),
        (status = 409, description = "Not in Draft", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_expense(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.expense_service.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Submit a Draft expense for approval
#[utoipa::path(
    post,
    path = "/api/expenses/{id}/submit",
    tag = "workflow",
    operation_id = "submit_expense",
    params(("id" = i64, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense submitted", body = ExpenseResp),
        (status = 400, description = "Required fields missing", body = ErrorResp),
        (status = 409, description = "Not legal in current state", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn submit_expense(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ExpenseResp>, AppError> {
    let expense = state.expense_service.submit(&principal, id).await?;
    Ok(Json(expense.into()))
}

/// Approve a submitted expense (four-eyes: approver ≠ owner)
#[utoipa::path(
    post,
    path = "/api/expenses/{id}/approve",
    tag = "workflow",
    operation_id = "approve_expense",
    params(("id" = i64, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense approved", body = ExpenseResp),
        (status = 403, description = "Not an eligible approver", body = ErrorResp),
        (status = 409, description = "Not legal in current state", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn approve_expense(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ExpenseResp>, AppError> {
    let expense = state.expense_service.approve(&principal, id).await?;
    Ok(Json(expense.into()))
}

/// Reject a submitted expense with a mandatory reason
#[utoipa::path(
    post,
    path = "/api/expenses/{id}/reject",
    tag = "workflow",
    operation_id = "reject_expense",
    params(("id" = i64, Path, description = "Expense id")),
    request_body = RejectExpenseReq,
    responses(
        (status = 200, description = "Expense rejected", body = ExpenseResp),
        (status = 400, description = "Missing reason", body = ErrorResp),
        (status = 403, description = "Not an eligible approver", body = ErrorResp),
        (status = 409, description = "Not legal in current state", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn reject_expense(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    Json(payload): Json<RejectExpenseReq>,
) -> Result<Json<ExpenseResp>, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let expense = state.expense_service.reject(&principal, id, payload).await?;
    Ok(Json(expense.into()))
}

/// Resubmit a rejected expense
#[utoipa::path(
    post,
    path = "/api/expenses/{id}/resubmit",
    tag = "workflow",
    operation_id = "resubmit_expense",
    params(("id" = i64, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense resubmitted", body = ExpenseResp),
        (status = 409, description = "Not legal in current state", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn resubmit_expense(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ExpenseResp>, AppError> {
    let expense = state.expense_service.resubmit(&principal, id).await?;
    Ok(Json(expense.into()))
}

/// Mark an approved expense as reimbursed (terminal)
#[utoipa::path(
    post,
    path = "/api/expenses/{id}/reimburse",
    tag = "workflow",
    operation_id = "reimburse_expense",
    params(("id" = i64, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Expense reimbursed", body = ExpenseResp),
        (status = 403, description = "Not an eligible approver", body = ErrorResp),
        (status = 409, description = "Not legal in current state", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn reimburse_expense(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ExpenseResp>, AppError> {
    let expense = state.expense_service.mark_reimbursed(&principal, id).await?;
    Ok(Json(expense.into()))
}

/// Attach a receipt blob to a Draft expense
#[utoipa::path(
    put,
    path = "/api/expenses/{id}/receipt",
    tag = "expenses",
    operation_id = "attach_receipt",
    params(("id" = i64, Path, description = "Expense id")),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 200, description = "Receipt attached", body = ExpenseResp),
        (status = 409, description = "Not in Draft", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn attach_receipt(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ExpenseResp>, AppError> {
    if body.is_empty() {
        return Err(AppError::InvalidInput("Receipt body is empty".to_string()));
    }

    let mime = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let expense = state
        .expense_service
        .attach_receipt(&principal, id, body.to_vec(), mime)
        .await?;
    Ok(Json(expense.into()))
}

/// Download the receipt attached to a visible expense
#[utoipa::path(
    get,
    path = "/api/expenses/{id}/receipt",
    tag = "expenses",
    operation_id = "get_receipt",
    params(("id" = i64, Path, description = "Expense id")),
    responses(
        (status = 200, description = "Receipt bytes"),
        (status = 404, description = "Absent, hidden, or no receipt", body = ErrorResp),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_receipt(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i64>,
) -> Result<([(header::HeaderName, &'static str); 1], Vec<u8>), AppError> {
    let bytes = state.expense_service.get_receipt(&principal, id).await?;
    Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes))
}
