use std::sync::Arc;

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::award::AwardRequest;
use super::domain::{FootprintId, UserId};
use super::error::CreditError;
use super::input::{FootprintPatch, FootprintSubmission};
use super::repository::{FootprintRepository, WalletRepository};
use super::service::CarbonCreditService;

/// Header carrying the authenticated user identifier.
pub const USER_HEADER: &str = "x-user-id";
/// Header carrying the caller's role; `admin` unlocks privileged routes.
pub const ROLE_HEADER: &str = "x-user-role";

/// Router builder exposing footprint, wallet, and admin endpoints.
pub fn credit_router<F, W>(service: Arc<CarbonCreditService<F, W>>) -> Router
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/footprints",
            post(submit_handler::<F, W>).get(list_handler::<F, W>),
        )
        .route(
            "/api/v1/footprints/:footprint_id",
            patch(update_handler::<F, W>).delete(delete_handler::<F, W>),
        )
        .route("/api/v1/credits/award", post(award_handler::<F, W>))
        .route("/api/v1/wallet", get(wallet_handler::<F, W>))
        .route(
            "/api/v1/wallet/transactions",
            get(transactions_handler::<F, W>),
        )
        .route("/api/v1/admin/summary", get(summary_handler::<F, W>))
        .route(
            "/api/v1/admin/wallets/:user/reconcile",
            post(reconcile_handler::<F, W>),
        )
        .with_state(service)
}

/// Identity handed over by the upstream authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user: UserId,
    pub is_admin: bool,
}

impl Caller {
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, ApiError> {
        let user = headers
            .get(USER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(ApiError::Unauthenticated)?;
        let is_admin = headers
            .get(ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|role| role.trim().eq_ignore_ascii_case("admin"))
            .unwrap_or(false);

        Ok(Self {
            user: UserId::new(user),
            is_admin,
        })
    }

    fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    fn require_owner_or_admin(&self, owner: &UserId) -> Result<(), ApiError> {
        if self.is_admin || &self.user == owner {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }
}

/// Transport-level failure: authorization problems plus every engine error.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing x-user-id header")]
    Unauthenticated,
    #[error("administrator role required")]
    Forbidden,
    #[error(transparent)]
    Credit(#[from] CreditError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Credit(CreditError::InvalidRequest(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Credit(CreditError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match &self {
            ApiError::Unauthenticated => {
                (StatusCode::UNAUTHORIZED, "unauthenticated", self.to_string())
            }
            ApiError::Forbidden => (StatusCode::FORBIDDEN, "forbidden", self.to_string()),
            ApiError::Credit(err) => {
                let status = match err {
                    CreditError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                    CreditError::DuplicateSubmission { .. } => StatusCode::CONFLICT,
                    CreditError::NotFound(_) => StatusCode::NOT_FOUND,
                    CreditError::InvalidUser | CreditError::InvalidScore(_) => {
                        StatusCode::UNPROCESSABLE_ENTITY
                    }
                    CreditError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    CreditError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let message = if matches!(err, CreditError::Internal(_)) {
                    error!(error = %err, "unexpected credit engine failure");
                    "unexpected error; please retry later".to_string()
                } else {
                    err.to_string()
                };
                (status, err.kind(), message)
            }
        };

        let payload = json!({
            "error": kind,
            "message": message,
        });
        (status, Json(payload)).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) user: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TransactionsQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

pub(crate) async fn submit_handler<F, W>(
    State(service): State<Arc<CarbonCreditService<F, W>>>,
    headers: HeaderMap,
    submission: Result<Json<FootprintSubmission>, JsonRejection>,
) -> Result<Response, ApiError>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    let caller = Caller::from_headers(&headers)?;
    let Json(submission) = submission?;
    let receipt = service.submit_footprint(&caller.user, submission)?;
    Ok((StatusCode::CREATED, Json(receipt)).into_response())
}

pub(crate) async fn list_handler<F, W>(
    State(service): State<Arc<CarbonCreditService<F, W>>>,
    headers: HeaderMap,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, ApiError>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    let caller = Caller::from_headers(&headers)?;
    let Query(query) = query?;
    let requested = query
        .user
        .filter(|user| !user.trim().is_empty())
        .map(UserId::new);

    let records = match (caller.is_admin, requested) {
        (true, requested) => service.list_footprints(requested.as_ref())?,
        (false, Some(requested)) if requested != caller.user => return Err(ApiError::Forbidden),
        (false, _) => service.list_footprints(Some(&caller.user))?,
    };
    Ok(Json(records).into_response())
}

pub(crate) async fn update_handler<F, W>(
    State(service): State<Arc<CarbonCreditService<F, W>>>,
    headers: HeaderMap,
    Path(footprint_id): Path<String>,
    changes: Result<Json<FootprintPatch>, JsonRejection>,
) -> Result<Response, ApiError>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    let caller = Caller::from_headers(&headers)?;
    let Json(changes) = changes?;
    let id = FootprintId(footprint_id);
    let existing = service.get_footprint(&id)?;
    caller.require_owner_or_admin(&existing.user)?;

    let record = service.update_footprint(&id, changes)?;
    Ok(Json(record).into_response())
}

pub(crate) async fn delete_handler<F, W>(
    State(service): State<Arc<CarbonCreditService<F, W>>>,
    headers: HeaderMap,
    Path(footprint_id): Path<String>,
) -> Result<Response, ApiError>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    let caller = Caller::from_headers(&headers)?;
    caller.require_admin()?;

    service.delete_footprint(&FootprintId(footprint_id.clone()))?;
    Ok(Json(json!({ "deleted": footprint_id })).into_response())
}

pub(crate) async fn award_handler<F, W>(
    State(service): State<Arc<CarbonCreditService<F, W>>>,
    headers: HeaderMap,
    request: Result<Json<AwardRequest>, JsonRejection>,
) -> Result<Response, ApiError>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    let caller = Caller::from_headers(&headers)?;
    caller.require_admin()?;
    let Json(request) = request?;

    let summary = service.manual_award(request)?;
    Ok(Json(summary).into_response())
}

pub(crate) async fn wallet_handler<F, W>(
    State(service): State<Arc<CarbonCreditService<F, W>>>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    let caller = Caller::from_headers(&headers)?;
    let overview = service.get_wallet(&caller.user)?;
    Ok(Json(overview).into_response())
}

pub(crate) async fn transactions_handler<F, W>(
    State(service): State<Arc<CarbonCreditService<F, W>>>,
    headers: HeaderMap,
    query: Result<Query<TransactionsQuery>, QueryRejection>,
) -> Result<Response, ApiError>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    let caller = Caller::from_headers(&headers)?;
    let Query(query) = query?;
    let transactions = service.get_transactions(&caller.user, query.limit)?;
    Ok(Json(transactions).into_response())
}

pub(crate) async fn summary_handler<F, W>(
    State(service): State<Arc<CarbonCreditService<F, W>>>,
    headers: HeaderMap,
) -> Result<Response, ApiError>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    let caller = Caller::from_headers(&headers)?;
    caller.require_admin()?;

    let summary = service.admin_summary()?;
    Ok(Json(summary).into_response())
}

pub(crate) async fn reconcile_handler<F, W>(
    State(service): State<Arc<CarbonCreditService<F, W>>>,
    headers: HeaderMap,
    Path(user): Path<String>,
) -> Result<Response, ApiError>
where
    F: FootprintRepository + 'static,
    W: WalletRepository + 'static,
{
    let caller = Caller::from_headers(&headers)?;
    caller.require_admin()?;

    let wallet = service.reconcile_wallet(&UserId::new(user))?;
    Ok(Json(wallet).into_response())
}
