//! API Routes
//!
//! HTTP endpoint definitions.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::domain::{AccountPage, AccountView, NewTransaction, PageRequest, Transaction, UserView};
use crate::error::AppError;
use crate::export::transactions_to_csv;
use crate::services::{AccountService, TransactionService, UserService};

use super::state::AppState;

// =========================================================================
// Request types
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ListAccountsQuery {
    /// Owner username filter; empty means no filter
    #[serde(rename = "userID", default)]
    pub user_id: String,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(rename = "pageSize", default)]
    pub page_size: Option<u32>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Accounts
        .route("/account", get(list_accounts).put(update_account))
        .route("/account/_draft", get(draft_account))
        .route("/account/:account_id", get(get_account))
        .route(
            "/account/transactions-in-csv/:account_id",
            get(export_account_transactions),
        )
        // Users
        .route("/user", get(list_users).post(update_user))
        .route("/user/_draft", get(draft_user))
        .route("/user/:user_id", get(get_user))
        // Transactions
        .route("/transaction", post(record_transaction))
        .route("/transaction/:transaction_id", get(get_transaction))
}

// =========================================================================
// Accounts
// =========================================================================

/// GET /account/:account_id
async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> Result<Json<AccountView>, AppError> {
    let service = AccountService::new(state.storage);
    Ok(Json(service.get_by_id(account_id).await?))
}

/// GET /account/_draft
async fn draft_account(State(state): State<AppState>) -> Json<AccountView> {
    Json(AccountService::new(state.storage).draft())
}

/// GET /account?userID=&page=&pageSize=
async fn list_accounts(
    State(state): State<AppState>,
    Query(query): Query<ListAccountsQuery>,
) -> Result<Json<AccountPage>, AppError> {
    let page = state.paging.request(query.page, query.page_size);
    let service = AccountService::new(state.storage);
    Ok(Json(service.list_all(page, Some(query.user_id.as_str())).await?))
}

/// PUT /account
async fn update_account(
    State(state): State<AppState>,
    Json(view): Json<AccountView>,
) -> Result<Json<AccountView>, AppError> {
    let service = AccountService::new(state.storage);
    Ok(Json(service.update(view).await?))
}

/// GET /account/transactions-in-csv/:account_id
async fn export_account_transactions(
    State(state): State<AppState>,
    Path(account_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let service = AccountService::new(state.storage);
    let transactions = service.list_transactions(account_id).await?;
    let body = transactions_to_csv(&transactions)?;

    tracing::debug!(account_id, records = transactions.len(), "Transactions exported");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=transactions.csv"),
        ],
        body,
    ))
}

// =========================================================================
// Users
// =========================================================================

/// GET /user/:user_id
async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(UserService::new(state.storage).get(user_id).await?))
}

/// GET /user
async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserView>>, AppError> {
    Ok(Json(UserService::new(state.storage).list_all().await?))
}

/// GET /user/_draft
async fn draft_user(State(state): State<AppState>) -> Json<UserView> {
    Json(UserService::new(state.storage).draft())
}

/// POST /user
async fn update_user(
    State(state): State<AppState>,
    Json(view): Json<UserView>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(UserService::new(state.storage).update(view).await?))
}

// =========================================================================
// Transactions
// =========================================================================

/// POST /transaction
async fn record_transaction(
    State(state): State<AppState>,
    Json(request): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let service = TransactionService::new(state.storage);
    let transaction = service.record(request).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// GET /transaction/:transaction_id
async fn get_transaction(
    State(state): State<AppState>,
    Path(transaction_id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    let service = TransactionService::new(state.storage);
    Ok(Json(service.get(transaction_id).await?))
}
