//! # REST API
//!
//! Builds the axum router that exposes the vault over HTTP. All endpoints
//! share application state through axum's `State` extractor.
//!
//! Caller identity is taken from the `x-caller` header. This is a devnet
//! convenience: whatever sits in front of a production deployment is
//! responsible for authenticating callers before the vault sees them.
//!
//! ## Endpoints
//!
//! | Method | Path                            | Description                        |
//! |--------|---------------------------------|------------------------------------|
//! | GET    | `/health`                       | Liveness probe                     |
//! | GET    | `/status`                       | Vault policy and record counts     |
//! | POST   | `/assets`                       | Devnet: mint an asset unit         |
//! | POST   | `/assets/approve`               | Devnet: approve the vault for a unit |
//! | POST   | `/assets/approve-all`           | Devnet: blanket vault approval     |
//! | GET    | `/assets/:collection/:unit`     | Owner of a unit                    |
//! | POST   | `/deposits`                     | Deposit a unit                     |
//! | GET    | `/records`                      | Records by depositor and/or status |
//! | GET    | `/records/:id`                  | Record by id                       |
//! | POST   | `/records/:id/redeem`           | Redeem a record                    |
//! | GET    | `/claims/:id`                   | Claim supply, metadata, holders    |
//! | GET    | `/claims/:id/balances/:holder`  | Holder balance                     |
//! | POST   | `/claims/:id/transfer`          | Devnet: move fractions             |
//! | GET    | `/events`                       | Vault event journal                |

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use shardvault_contracts::{
    DepositRecord, FractionVault, RecordStatus, VaultError, VaultEvent, VaultStats,
};
use shardvault_protocol::custody::{AssetCustody, AssetRegistry, CustodyError};
use shardvault_protocol::ledger::{FractionBook, LedgerError};
use shardvault_protocol::{Address, ClaimId, CollectionRef, RecordId, UnitId};

use crate::metrics::SharedMetrics;

/// Header carrying the caller identity.
pub const CALLER_HEADER: &str = "x-caller";

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The vault core.
    pub vault: Arc<FractionVault>,
    /// In-memory custody provider backing the vault.
    pub registry: Arc<AssetRegistry>,
    /// In-memory fraction ledger backing the vault.
    pub book: Arc<FractionBook>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .route("/assets", post(mint_asset_handler))
        .route("/assets/approve", post(approve_handler))
        .route("/assets/approve-all", post(approve_all_handler))
        .route("/assets/:collection/:unit", get(asset_handler))
        .route("/deposits", post(deposit_handler))
        .route("/records", get(list_records_handler))
        .route("/records/:id", get(record_handler))
        .route("/records/:id/redeem", post(redeem_handler))
        .route("/claims/:id", get(claim_handler))
        .route("/claims/:id/balances/:holder", get(balance_handler))
        .route("/claims/:id/transfer", post(transfer_handler))
        .route("/events", get(events_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// An error with the HTTP status it maps to.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

impl From<VaultError> for ApiError {
    fn from(err: VaultError) -> Self {
        let status = match &err {
            VaultError::NotFound(_) => StatusCode::NOT_FOUND,
            VaultError::AlreadyRedeemed(_) => StatusCode::CONFLICT,
            VaultError::InsufficientOwnership { .. } => StatusCode::FORBIDDEN,
            VaultError::CustodyTransferFailed(_) | VaultError::LedgerOperationFailed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            VaultError::ClaimIdInUse(_)
            | VaultError::IdSpaceExhausted
            | VaultError::InvalidConfig(_)
            | VaultError::RollbackFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.to_string())
    }
}

impl From<CustodyError> for ApiError {
    fn from(err: CustodyError) -> Self {
        let status = match &err {
            CustodyError::UnknownAsset(_) => StatusCode::NOT_FOUND,
            CustodyError::AlreadyExists(_) => StatusCode::CONFLICT,
            CustodyError::NotOwner { .. } | CustodyError::NotApproved(_) => StatusCode::FORBIDDEN,
            CustodyError::AlreadyLocked(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let status = match &err {
            LedgerError::ZeroAmount => StatusCode::BAD_REQUEST,
            _ => StatusCode::UNPROCESSABLE_ENTITY,
        };
        Self::new(status, err.to_string())
    }
}

/// Short label for the rejection metric.
fn rejection_reason(err: &VaultError) -> &'static str {
    match err {
        VaultError::NotFound(_) => "not_found",
        VaultError::AlreadyRedeemed(_) => "already_redeemed",
        VaultError::InsufficientOwnership { .. } => "insufficient_ownership",
        VaultError::CustodyTransferFailed(_) => "custody_transfer_failed",
        VaultError::LedgerOperationFailed(_) => "ledger_operation_failed",
        VaultError::ClaimIdInUse(_) => "claim_id_in_use",
        VaultError::IdSpaceExhausted => "id_space_exhausted",
        VaultError::InvalidConfig(_) => "invalid_config",
        VaultError::RollbackFailed { .. } => "rollback_failed",
    }
}

/// Extracts the caller identity from the request headers.
fn caller(headers: &HeaderMap) -> Result<Address, ApiError> {
    let value = headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::UNAUTHORIZED,
                format!("missing {CALLER_HEADER} header"),
            )
        })?;
    Ok(Address::new(value))
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Node software version.
    pub version: String,
    /// Fraction units minted per deposit.
    pub fraction_supply: u64,
    /// Address the vault holds custodied assets under.
    pub custody_address: String,
    /// Record counts by status.
    pub records: VaultStats,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Body of `POST /assets`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MintAssetRequest {
    pub collection: String,
    pub unit_id: u64,
    pub owner: String,
}

/// Body of `POST /assets/approve`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveRequest {
    pub collection: String,
    pub unit_id: u64,
}

/// Body of `POST /assets/approve-all`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveAllRequest {
    pub approved: bool,
}

/// Response payload for asset endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct AssetResponse {
    pub collection: String,
    pub unit_id: u64,
    pub owner: Option<Address>,
    /// The active record custodying this unit, if any.
    pub active_record: Option<RecordId>,
}

/// Body of `POST /deposits`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DepositRequest {
    pub collection: String,
    pub unit_id: u64,
}

/// Response payload for `POST /deposits`.
#[derive(Debug, Serialize, Deserialize)]
pub struct DepositResponse {
    pub record_id: RecordId,
    pub claim_id: ClaimId,
    pub fraction_supply: u64,
}

/// Query string of `GET /records`.
#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    pub depositor: Option<String>,
    pub status: Option<String>,
}

/// Response payload for `GET /claims/:id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClaimResponse {
    pub claim_id: ClaimId,
    pub total_supply: u64,
    pub uri: String,
    pub holders: Vec<HolderBalance>,
}

/// One holder's balance of a claim.
#[derive(Debug, Serialize, Deserialize)]
pub struct HolderBalance {
    pub holder: Address,
    pub balance: u64,
}

/// Response payload for balance endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub claim_id: ClaimId,
    pub holder: Address,
    pub balance: u64,
}

/// Body of `POST /claims/:id/transfer`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransferRequest {
    pub to: String,
    pub amount: u64,
}

/// Query string of `GET /events`.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub since: usize,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status`: vault policy and record counts.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(StatusResponse {
        version: state.version.clone(),
        fraction_supply: state.vault.fraction_supply(),
        custody_address: state.vault.config().custody_address.to_string(),
        records: state.vault.stats(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// `POST /assets`: devnet faucet for asset units.
async fn mint_asset_handler(
    State(state): State<AppState>,
    Json(req): Json<MintAssetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let owner = Address::new(req.owner);
    if owner.is_blank() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "owner must not be blank"));
    }
    let collection = CollectionRef::new(req.collection);
    state
        .registry
        .mint_unit(&collection, UnitId(req.unit_id), &owner)?;

    Ok((
        StatusCode::CREATED,
        Json(AssetResponse {
            collection: collection.to_string(),
            unit_id: req.unit_id,
            owner: Some(owner),
            active_record: None,
        }),
    ))
}

/// `POST /assets/approve`: the caller approves the vault for one unit.
async fn approve_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ApproveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller(&headers)?;
    let collection = CollectionRef::new(req.collection);
    let custody = state.registry.custody_address().clone();
    state
        .registry
        .approve(&caller, &collection, UnitId(req.unit_id), &custody)?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /assets/approve-all`: the caller grants or revokes blanket approval.
async fn approve_all_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ApproveAllRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller(&headers)?;
    let custody = state.registry.custody_address().clone();
    state
        .registry
        .set_approval_for_all(&caller, &custody, req.approved);
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /assets/:collection/:unit`: current owner of a unit.
async fn asset_handler(
    State(state): State<AppState>,
    Path((collection, unit)): Path<(String, u64)>,
) -> Result<Json<AssetResponse>, ApiError> {
    let collection = CollectionRef::new(collection);
    let owner = state
        .registry
        .owner_of(&collection, UnitId(unit))
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "asset not found"))?;
    let active_record = state
        .vault
        .active_record_for(&collection, UnitId(unit))
        .map(|r| r.record_id);

    Ok(Json(AssetResponse {
        collection: collection.to_string(),
        unit_id: unit,
        owner: Some(owner),
        active_record,
    }))
}

/// `POST /deposits`: lock a unit and mint its fractions to the caller.
async fn deposit_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DepositRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let caller = caller(&headers)?;
    let collection = CollectionRef::new(req.collection);

    let record_id = state
        .vault
        .deposit(&caller, &collection, UnitId(req.unit_id))
        .map_err(|e| {
            state.metrics.reject("deposit", rejection_reason(&e));
            ApiError::from(e)
        })?;
    let record = state.vault.get_record(record_id)?;

    state.metrics.deposits_total.inc();
    state
        .metrics
        .active_records
        .set(state.vault.stats().active as i64);

    Ok((
        StatusCode::CREATED,
        Json(DepositResponse {
            record_id,
            claim_id: record.claim_id,
            fraction_supply: record.fraction_supply,
        }),
    ))
}

/// `POST /records/:id/redeem`: burn the full supply and release the unit.
async fn redeem_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<DepositRecord>, ApiError> {
    let caller = caller(&headers)?;
    let record_id = RecordId(id);

    state.vault.redeem(&caller, record_id).map_err(|e| {
        state.metrics.reject("redeem", rejection_reason(&e));
        ApiError::from(e)
    })?;

    state.metrics.redemptions_total.inc();
    state
        .metrics
        .active_records
        .set(state.vault.stats().active as i64);

    Ok(Json(state.vault.get_record(record_id)?))
}

/// `GET /records/:id`: a single record.
async fn record_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<DepositRecord>, ApiError> {
    Ok(Json(state.vault.get_record(RecordId(id))?))
}

/// `GET /records?depositor=&status=`: filtered record listing in id order.
async fn list_records_handler(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
) -> Result<Json<Vec<DepositRecord>>, ApiError> {
    let status = query
        .status
        .as_deref()
        .map(str::parse::<RecordStatus>)
        .transpose()
        .map_err(|e| ApiError::new(StatusCode::BAD_REQUEST, e))?;

    let records = match (query.depositor, status) {
        (Some(depositor), status) => state
            .vault
            .records_by_depositor(&Address::new(depositor))
            .into_iter()
            .filter(|r| status.map_or(true, |s| r.status == s))
            .collect(),
        (None, Some(status)) => state.vault.records_by_status(status),
        (None, None) => {
            let mut all = state.vault.records_by_status(RecordStatus::Active);
            all.extend(state.vault.records_by_status(RecordStatus::Redeemed));
            all.sort_by_key(|r| r.record_id);
            all
        }
    };
    Ok(Json(records))
}

/// `GET /claims/:id`: supply, metadata URI, and holders of a claim.
async fn claim_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let claim_id = ClaimId(id);
    if state.book.claim_info(claim_id).is_none() {
        return Err(ApiError::new(StatusCode::NOT_FOUND, format!("claim {claim_id} not found")));
    }
    let holders = state
        .book
        .holders(claim_id)
        .into_iter()
        .map(|(holder, balance)| HolderBalance { holder, balance })
        .collect();

    Ok(Json(ClaimResponse {
        claim_id,
        total_supply: state.vault.get_claim_supply(claim_id),
        uri: state.book.uri(claim_id),
        holders,
    }))
}

/// `GET /claims/:id/balances/:holder`: live balance of one holder.
async fn balance_handler(
    State(state): State<AppState>,
    Path((id, holder)): Path<(u64, String)>,
) -> Json<BalanceResponse> {
    let claim_id = ClaimId(id);
    let holder = Address::new(holder);
    let balance = state.vault.get_claim_balance(claim_id, &holder);
    Json(BalanceResponse {
        claim_id,
        holder,
        balance,
    })
}

/// `POST /claims/:id/transfer`: the caller moves fractions to another holder.
async fn transfer_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(req): Json<TransferRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let caller = caller(&headers)?;
    let to = Address::new(req.to);
    if to.is_blank() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "recipient must not be blank"));
    }
    let claim_id = ClaimId(id);
    state.book.transfer(claim_id, &caller, &to, req.amount)?;

    Ok(Json(BalanceResponse {
        claim_id,
        balance: state.vault.get_claim_balance(claim_id, &caller),
        holder: caller,
    }))
}

/// `GET /events?since=N`: journal entries from position `N`.
async fn events_handler(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<VaultEvent>> {
    Json(state.vault.events_since(query.since))
}
