//! # REST + JSON-RPC API
//!
//! Builds the axum router that exposes the dev node's HTTP interface.
//! All endpoints share application state through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path                                  | Description                       |
//! |--------|---------------------------------------|-----------------------------------|
//! | GET    | `/health`                             | Liveness probe                    |
//! | GET    | `/status`                             | Token and chain summary           |
//! | POST   | `/rpc`                                | JSON-RPC 2.0 gateway              |
//! | GET    | `/ws`                                 | WebSocket stream of ledger events |
//! | GET    | `/accounts/:address`                  | Balance, delegate, votes, nonce   |
//! | GET    | `/accounts/:address/votes/:block`     | Voting power at a settled block   |
//! | GET    | `/accounts/:address/checkpoints/:idx` | One checkpoint                    |
//! | GET    | `/events?from=N&limit=M`              | Page through the event journal    |
//!
//! ## JSON-RPC methods
//!
//! Params are named objects. Transactions take the sender as `from`, the
//! way unlocked dev accounts work on a local network.
//!
//! | Method               | Params                                   |
//! |----------------------|------------------------------------------|
//! | `mgov_delegate`      | `from`, `delegatee`                      |
//! | `mgov_delegateBySig` | `delegatee`, `nonce`, `expiry`, `v`, `r`, `s` |
//! | `mgov_mint`          | `from`, `to` (optional), `amount`        |
//! | `mgov_burn`          | `from`, `account`, `amount`              |
//! | `mgov_transfer`      | `from`, `to`, `amount`                   |
//! | `mgov_approve`       | `from`, `spender`, `amount`              |
//! | `mgov_transferFrom`  | `from`, `owner`, `to`, `amount`          |
//! | `mgov_mine`          | none                                     |
//! | `mgov_setAutomine`   | `enabled`                                |
//! | `mgov_blockNumber`   | none                                     |
//! | `mgov_domainSeparator` | none                                   |

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use mgov_contracts::{DevChain, ErrorKind, EventRecord, GovError, SignedDelegation};
use mgov_protocol::types::amount_serde;
use mgov_protocol::{Address, Amount, BlockNumber};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::SharedMetrics;

/// Broadcast channel capacity for live event streaming.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Upper bound on records returned by one `GET /events` page.
pub const MAX_EVENTS_PAGE: usize = 1_000;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// The chain, shared between handlers and the interval miner.
pub type SharedChain = Arc<RwLock<DevChain>>;

/// Shared application state available to all request handlers.
///
/// Cheap to clone — everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub chain: SharedChain,
    /// Reference to Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Broadcast channel for ledger events emitted by accepted transactions.
    pub event_tx: broadcast::Sender<EventRecord>,
}

/// What an accepted transaction did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Block the transaction landed in (pending when automine is off).
    pub block: BlockNumber,
    /// Whether that block is already sealed.
    pub mined: bool,
    pub events: Vec<EventRecord>,
    /// Recovered delegator, for signed delegations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signer: Option<Address>,
}

impl AppState {
    pub fn new(version: impl Into<String>, chain: DevChain, metrics: SharedMetrics) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        metrics.latest_block.set(chain.latest_block_number() as i64);
        Self {
            version: version.into(),
            chain: Arc::new(RwLock::new(chain)),
            metrics,
            event_tx,
        }
    }

    /// Runs one transaction under the write lock and records its outcome.
    pub fn submit<T>(
        &self,
        tx: impl FnOnce(&mut DevChain) -> Result<T, GovError>,
    ) -> Result<(T, TxReceipt), GovError> {
        let started = Instant::now();
        let mut chain = self.chain.write();
        let seen = chain.token().events().len() as u64;

        let result = tx(&mut *chain);

        let events = chain.token().events_since(seen).to_vec();
        let (block, mined) = match chain.pending_block() {
            Some(pending) => (pending.number, false),
            None => (chain.latest_block_number(), true),
        };
        self.metrics
            .latest_block
            .set(chain.latest_block_number() as i64);
        drop(chain);
        self.metrics
            .transaction_latency_seconds
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(output) => {
                self.metrics.transactions_submitted_total.inc();
                self.metrics.observe_events(&events);
                for record in &events {
                    // No subscribers is fine.
                    let _ = self.event_tx.send(record.clone());
                }
                Ok((
                    output,
                    TxReceipt {
                        block,
                        mined,
                        events,
                        signer: None,
                    },
                ))
            }
            Err(e) => {
                self.metrics.transactions_failed_total.inc();
                tracing::info!(error = %e, kind = ?e.kind(), "transaction rejected");
                Err(e)
            }
        }
    }

    /// Seals the pending block (or mines an empty one).
    pub fn mine(&self) -> BlockNumber {
        let number = self.chain.write().mine();
        self.metrics.latest_block.set(number as i64);
        tracing::debug!(block = number, "block mined");
        number
    }
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
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/accounts/:address/votes/:block", get(votes_handler))
        .route(
            "/accounts/:address/checkpoints/:index",
            get(checkpoint_handler),
        )
        .route("/events", get(events_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;
/// The ledger cannot answer or perform the request yet (e.g. unsettled block).
pub const PRECONDITION_FAILED: i32 = -32000;
/// Ownership or signed-delegation checks failed.
pub const UNAUTHORIZED: i32 = -32001;
/// Balance or allowance rules rejected the transaction.
pub const LEDGER_REJECTED: i32 = -32002;

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Named method parameters.
    pub params: Option<serde_json::Value>,
    /// Request identifier. Echoed back in the response.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: serde_json::Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

impl From<GovError> for JsonRpcError {
    fn from(e: GovError) -> Self {
        let kind = e.kind();
        let (code, label) = match kind {
            ErrorKind::Precondition => (PRECONDITION_FAILED, "precondition"),
            ErrorKind::Authorization => (UNAUTHORIZED, "authorization"),
            ErrorKind::Ledger => (LEDGER_REJECTED, "ledger"),
            ErrorKind::Invariant => (INTERNAL_ERROR, "invariant"),
        };
        Self {
            code,
            message: e.to_string(),
            data: Some(serde_json::json!({ "kind": label })),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DelegateParams {
    from: Address,
    delegatee: Address,
}

#[derive(Debug, Deserialize)]
struct MintParams {
    from: Address,
    to: Option<Address>,
    #[serde(with = "amount_serde")]
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct BurnParams {
    from: Address,
    account: Address,
    #[serde(with = "amount_serde")]
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct TransferParams {
    from: Address,
    to: Address,
    #[serde(with = "amount_serde")]
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct ApproveParams {
    from: Address,
    spender: Address,
    #[serde(with = "amount_serde")]
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct TransferFromParams {
    from: Address,
    owner: Address,
    to: Address,
    #[serde(with = "amount_serde")]
    amount: Amount,
}

#[derive(Debug, Deserialize)]
struct SetAutomineParams {
    enabled: bool,
}

fn parse_params<T: DeserializeOwned>(params: Option<serde_json::Value>) -> Result<T, JsonRpcError> {
    let value = params.unwrap_or(serde_json::Value::Null);
    serde_json::from_value(value)
        .map_err(|e| JsonRpcError::new(INVALID_PARAMS, format!("Invalid params: {}", e)))
}

fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value, JsonRpcError> {
    serde_json::to_value(value)
        .map_err(|e| JsonRpcError::new(INTERNAL_ERROR, format!("Internal error: {}", e)))
}

/// Routes one JSON-RPC call.
fn dispatch(
    state: &AppState,
    method: &str,
    params: Option<serde_json::Value>,
) -> Result<serde_json::Value, JsonRpcError> {
    match method {
        "mgov_blockNumber" => Ok(serde_json::json!(state.chain.read().latest_block_number())),
        "mgov_domainSeparator" => {
            let separator = state.chain.read().token().domain_separator();
            Ok(serde_json::json!(format!("0x{}", hex::encode(separator))))
        }
        "mgov_mine" => Ok(serde_json::json!(state.mine())),
        "mgov_setAutomine" => {
            let p: SetAutomineParams = parse_params(params)?;
            state.chain.write().set_automine(p.enabled);
            Ok(serde_json::json!(p.enabled))
        }
        "mgov_delegate" => {
            let p: DelegateParams = parse_params(params)?;
            let (_, receipt) = state.submit(|c| c.delegate(p.from, p.delegatee))?;
            to_json(&receipt)
        }
        "mgov_delegateBySig" => {
            let request: SignedDelegation = parse_params(params)?;
            let (signer, mut receipt) = state.submit(|c| c.delegate_by_sig(&request))?;
            receipt.signer = Some(signer);
            to_json(&receipt)
        }
        "mgov_mint" => {
            let p: MintParams = parse_params(params)?;
            let (_, receipt) = state.submit(|c| match p.to {
                Some(to) => c.mint_to(p.from, to, p.amount),
                None => c.mint(p.from, p.amount),
            })?;
            to_json(&receipt)
        }
        "mgov_burn" => {
            let p: BurnParams = parse_params(params)?;
            let (_, receipt) = state.submit(|c| c.burn(p.from, p.account, p.amount))?;
            to_json(&receipt)
        }
        "mgov_transfer" => {
            let p: TransferParams = parse_params(params)?;
            let (_, receipt) = state.submit(|c| c.transfer(p.from, p.to, p.amount))?;
            to_json(&receipt)
        }
        "mgov_approve" => {
            let p: ApproveParams = parse_params(params)?;
            let (_, receipt) = state.submit(|c| c.approve(p.from, p.spender, p.amount))?;
            to_json(&receipt)
        }
        "mgov_transferFrom" => {
            let p: TransferFromParams = parse_params(params)?;
            let (_, receipt) =
                state.submit(|c| c.transfer_from(p.from, p.owner, p.to, p.amount))?;
            to_json(&receipt)
        }
        _ => Err(JsonRpcError::new(
            METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )),
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /status`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub version: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub chain_id: u64,
    pub owner: Address,
    #[serde(with = "amount_serde")]
    pub total_supply: Amount,
    pub latest_block: BlockNumber,
    pub latest_timestamp: u64,
    /// Number of the open pending block, if transactions are waiting.
    pub pending_block: Option<BlockNumber>,
    pub automine: bool,
    pub event_count: usize,
    /// ISO-8601 timestamp of the response.
    pub timestamp: String,
}

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub address: Address,
    #[serde(with = "amount_serde")]
    pub balance: Amount,
    /// Current delegatee; the zero address if the account never delegated.
    pub delegates: Address,
    #[serde(with = "amount_serde")]
    pub current_votes: Amount,
    /// Nonce the next signed delegation must carry.
    pub nonce: u64,
    pub num_checkpoints: usize,
}

/// Response payload for `GET /accounts/:address/votes/:block`.
#[derive(Debug, Serialize, Deserialize)]
pub struct VotesResponse {
    pub address: Address,
    pub block: BlockNumber,
    #[serde(with = "amount_serde")]
    pub votes: Amount,
}

/// Query string for `GET /events`.
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    /// First sequence number to return.
    pub from: Option<u64>,
    pub limit: Option<usize>,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health` — returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /status` — token metadata and chain position.
async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let chain = state.chain.read();
    let token = chain.token();
    let latest = chain.latest_block();

    let resp = StatusResponse {
        version: state.version.clone(),
        name: token.name().to_string(),
        symbol: token.symbol().to_string(),
        decimals: token.decimals(),
        chain_id: token.config().chain_id,
        owner: token.owner(),
        total_supply: token.total_supply(),
        latest_block: latest.number,
        latest_timestamp: latest.timestamp,
        pending_block: chain.pending_block().map(|b| b.number),
        automine: chain.automine(),
        event_count: token.events().len(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    };
    Json(resp)
}

/// `POST /rpc` — JSON-RPC 2.0 gateway.
///
/// Unknown methods return error code -32601 (Method not found). Ledger
/// rejections carry the ledger's own message and a `kind` in `data`.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError::new(
                INVALID_REQUEST,
                "Invalid Request: jsonrpc must be \"2.0\"",
            )),
            id: req.id,
        });
    }

    let (result, error) = match dispatch(&state, &req.method, req.params) {
        Ok(value) => (Some(value), None),
        Err(e) => (None, Some(e)),
    };

    Json(JsonRpcResponse {
        jsonrpc: "2.0".into(),
        result,
        error,
        id: req.id,
    })
}

/// `GET /ws` — WebSocket upgrade for live event streaming.
///
/// Clients receive each accepted transaction's [`EventRecord`]s as JSON
/// text frames. Client messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: AppState) {
    let mut rx = state.event_tx.subscribe();

    loop {
        tokio::select! {
            event = rx.recv() => {
                match event {
                    Ok(record) => {
                        let payload = match serde_json::to_string(&record) {
                            Ok(s) => s,
                            Err(e) => {
                                tracing::warn!("failed to serialize ws event: {}", e);
                                continue;
                            }
                        };
                        if socket.send(Message::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!("ws subscriber lagged by {} events", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    }
}

/// `GET /accounts/:address` — balance, delegation and voting state.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let address: Address = match address.parse() {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    let chain = state.chain.read();
    let token = chain.token();
    let account = AccountResponse {
        address,
        balance: token.balance_of(&address),
        delegates: token.delegates(&address),
        current_votes: token.current_votes(&address),
        nonce: token.nonces(&address),
        num_checkpoints: token.num_checkpoints(&address),
    };
    (StatusCode::OK, Json(account)).into_response()
}

/// `GET /accounts/:address/votes/:block` — voting power at a settled block.
///
/// Returns 400 for blocks that are not settled yet.
async fn votes_handler(
    Path((address, block)): Path<(String, BlockNumber)>,
    State(state): State<AppState>,
) -> Response {
    let address: Address = match address.parse() {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match state.chain.read().token().prior_votes(&address, block) {
        Ok(votes) => (
            StatusCode::OK,
            Json(VotesResponse {
                address,
                block,
                votes,
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, e),
    }
}

/// `GET /accounts/:address/checkpoints/:index` — one checkpoint, 404 past
/// the end of the log.
async fn checkpoint_handler(
    Path((address, index)): Path<(String, usize)>,
    State(state): State<AppState>,
) -> Response {
    let address: Address = match address.parse() {
        Ok(a) => a,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
    };

    match state.chain.read().token().checkpoint_at(&address, index) {
        Ok(checkpoint) => (StatusCode::OK, Json(checkpoint)).into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, e),
    }
}

/// `GET /events` — a page of the event journal starting at `from`.
async fn events_handler(
    Query(query): Query<EventsQuery>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let limit = query.limit.unwrap_or(MAX_EVENTS_PAGE).min(MAX_EVENTS_PAGE);
    let chain = state.chain.read();
    let page: Vec<EventRecord> = chain
        .token()
        .events_since(query.from.unwrap_or(0))
        .iter()
        .take(limit)
        .cloned()
        .collect();
    Json(page)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
