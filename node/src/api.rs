//! # REST + JSON-RPC + WebSocket API
//!
//! Builds the axum router that exposes the ledger. All handlers share one
//! [`SharedLedger`], so every mutation is serialized behind its lock.
//!
//! ## Endpoints
//!
//! | Method | Path                   | Description                          |
//! |--------|------------------------|--------------------------------------|
//! | GET    | `/health`              | Liveness probe                       |
//! | GET    | `/token`               | Token metadata and supply            |
//! | GET    | `/accounts/:address`   | Balance of one account               |
//! | POST   | `/rpc`                 | JSON-RPC 2.0 gateway                 |
//! | GET    | `/ws`                  | Live Transfer / Approval events      |
//!
//! ## JSON-RPC Methods
//!
//! Amounts travel as decimal strings of smallest units. Mutating methods
//! take the caller's address as their first parameter; the node performs no
//! signature checks of its own.
//!
//! | Method               | Params                            | Result  |
//! |----------------------|-----------------------------------|---------|
//! | `corgi_name`         | none                              | string  |
//! | `corgi_symbol`       | none                              | string  |
//! | `corgi_decimals`     | none                              | 18      |
//! | `corgi_totalSupply`  | none                              | amount  |
//! | `corgi_owner`        | none                              | address |
//! | `corgi_balanceOf`    | `[account]`                       | amount  |
//! | `corgi_allowance`    | `[owner, spender]`                | amount  |
//! | `corgi_transfer`     | `[caller, to, amount]`            | `true`  |
//! | `corgi_approve`      | `[caller, spender, amount]`       | `true`  |
//! | `corgi_transferFrom` | `[caller, from, to, amount]`      | `true`  |
//! | `corgi_burn`         | `[caller, amount]`                | `true`  |
//! | `corgi_burnFrom`     | `[caller, from, amount]`          | `true`  |

use std::time::Instant;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use corgi_contracts::{EventRecord, EventSink, Operation, SharedLedger, TokenError};
use corgi_protocol::config::DECIMALS;
use corgi_protocol::units::{amount_string, format_units, Amount};
use corgi_protocol::Address;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone; everything sits behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    /// The hosted ledger.
    pub ledger: SharedLedger,
    /// Live event feed. Fed by [`BroadcastSink`] under the ledger lock.
    pub event_tx: broadcast::Sender<EventRecord>,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
}

/// Forwards ledger events onto a tokio broadcast channel.
///
/// Sending never blocks; with no subscribers the event is simply dropped.
pub struct BroadcastSink {
    tx: broadcast::Sender<EventRecord>,
    metrics: SharedMetrics,
}

impl BroadcastSink {
    pub fn new(tx: broadcast::Sender<EventRecord>, metrics: SharedMetrics) -> Self {
        Self { tx, metrics }
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, record: &EventRecord) {
        self.metrics.events_published_total.inc();
        let _ = self.tx.send(record.clone());
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
        .route("/token", get(token_handler))
        .route("/accounts/:address", get(account_handler))
        .route("/rpc", post(rpc_handler))
        .route("/ws", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// JSON-RPC Types
// ---------------------------------------------------------------------------

/// A JSON-RPC 2.0 request envelope.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version. Must be "2.0".
    pub jsonrpc: String,
    /// The method to invoke.
    pub method: String,
    /// Positional parameters.
    pub params: Option<Value>,
    /// Request identifier. Echoed back in the response.
    pub id: Value,
}

/// A JSON-RPC 2.0 response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version. Always "2.0".
    pub jsonrpc: String,
    /// The result on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    /// Request identifier, echoed from the request.
    pub id: Value,
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Short human-readable error description.
    pub message: String,
    /// Optional structured error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Error codes. Each ledger error gets its own so clients can tell them
/// apart without parsing messages.
pub mod codes {
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INSUFFICIENT_BALANCE: i32 = -32010;
    pub const INSUFFICIENT_ALLOWANCE: i32 = -32011;
    pub const INVALID_RECIPIENT: i32 = -32012;
    pub const INVALID_SENDER: i32 = -32013;
    pub const INVALID_APPROVER: i32 = -32014;
    pub const INVALID_SPENDER: i32 = -32015;
    pub const ARITHMETIC_OVERFLOW: i32 = -32016;
    pub const INVARIANT_VIOLATION: i32 = -32017;
}

impl JsonRpcError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: codes::INVALID_PARAMS,
            message: format!("Invalid params: {}", message.into()),
            data: None,
        }
    }
}

impl From<TokenError> for JsonRpcError {
    fn from(err: TokenError) -> Self {
        let code = match err {
            TokenError::InsufficientBalance { .. } => codes::INSUFFICIENT_BALANCE,
            TokenError::InsufficientAllowance { .. } => codes::INSUFFICIENT_ALLOWANCE,
            TokenError::InvalidRecipient => codes::INVALID_RECIPIENT,
            TokenError::InvalidSender => codes::INVALID_SENDER,
            TokenError::InvalidApprover => codes::INVALID_APPROVER,
            TokenError::InvalidSpender => codes::INVALID_SPENDER,
            TokenError::ArithmeticOverflow { .. } => codes::ARITHMETIC_OVERFLOW,
            TokenError::InvariantViolation(_) => codes::INVARIANT_VIOLATION,
        };
        Self {
            code,
            message: err.to_string(),
            data: Some(serde_json::json!({ "kind": err.kind() })),
        }
    }
}

// ---------------------------------------------------------------------------
// Response Types
// ---------------------------------------------------------------------------

/// Response payload for `GET /accounts/:address`.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    /// Account address.
    pub address: Address,
    /// Balance in smallest units.
    #[serde(with = "amount_string")]
    pub balance: Amount,
    /// Balance in whole tokens, for display.
    pub balance_formatted: String,
}

/// Generic error body returned by REST endpoints on failure.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 if the node is alive.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

/// `GET /token`: token metadata and current supply.
async fn token_handler(State(state): State<AppState>) -> impl IntoResponse {
    let (metadata, holders) = state
        .ledger
        .read(|ledger| (ledger.metadata(), ledger.holder_count()));
    Json(serde_json::json!({
        "version": state.version,
        "token": metadata,
        "holders": holders,
    }))
}

/// `GET /accounts/:address`: balance of one account. Unknown accounts
/// report zero.
async fn account_handler(
    Path(address): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let address = match Address::from_hex(&address) {
        Ok(a) => a,
        Err(e) => {
            let err = ErrorResponse {
                error: e.to_string(),
            };
            return (StatusCode::BAD_REQUEST, Json(serde_json::json!(err))).into_response();
        }
    };

    let balance = state.ledger.read(|ledger| ledger.balance_of(&address));
    let resp = AccountResponse {
        address,
        balance,
        balance_formatted: format_units(balance, DECIMALS),
    };
    (StatusCode::OK, Json(serde_json::json!(resp))).into_response()
}

/// `POST /rpc`: JSON-RPC 2.0 gateway.
async fn rpc_handler(
    State(state): State<AppState>,
    Json(req): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    if req.jsonrpc != "2.0" {
        return Json(JsonRpcResponse {
            jsonrpc: "2.0".into(),
            result: None,
            error: Some(JsonRpcError {
                code: codes::INVALID_REQUEST,
                message: "Invalid Request: jsonrpc must be \"2.0\"".into(),
                data: None,
            }),
            id: req.id,
        });
    }

    tracing::debug!(method = %req.method, "rpc call");

    let (result, error) = match dispatch(&state, &req.method, req.params.as_ref()) {
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

/// Routes one JSON-RPC method to the ledger.
fn dispatch(state: &AppState, method: &str, params: Option<&Value>) -> Result<Value, JsonRpcError> {
    let p = Params(params);
    let ledger = &state.ledger;

    match method {
        "corgi_name" => Ok(Value::from(ledger.read(|l| l.name().to_string()))),
        "corgi_symbol" => Ok(Value::from(ledger.read(|l| l.symbol().to_string()))),
        "corgi_decimals" => Ok(Value::from(ledger.read(|l| l.decimals()))),
        "corgi_totalSupply" => Ok(amount_value(ledger.read(|l| l.total_supply()))),
        "corgi_owner" => Ok(Value::from(ledger.read(|l| l.owner().to_hex()))),
        "corgi_balanceOf" => {
            let account = p.address(0, "account")?;
            Ok(amount_value(ledger.read(|l| l.balance_of(&account))))
        }
        "corgi_allowance" => {
            let owner = p.address(0, "owner")?;
            let spender = p.address(1, "spender")?;
            Ok(amount_value(
                ledger.read(|l| l.allowance(&owner, &spender)),
            ))
        }
        "corgi_transfer" => submit(
            state,
            Operation::Transfer {
                caller: p.address(0, "caller")?,
                to: p.address(1, "to")?,
                amount: p.amount(2, "amount")?,
            },
        ),
        "corgi_approve" => submit(
            state,
            Operation::Approve {
                caller: p.address(0, "caller")?,
                spender: p.address(1, "spender")?,
                amount: p.amount(2, "amount")?,
            },
        ),
        "corgi_transferFrom" => submit(
            state,
            Operation::TransferFrom {
                caller: p.address(0, "caller")?,
                from: p.address(1, "from")?,
                to: p.address(2, "to")?,
                amount: p.amount(3, "amount")?,
            },
        ),
        "corgi_burn" => submit(
            state,
            Operation::Burn {
                caller: p.address(0, "caller")?,
                amount: p.amount(1, "amount")?,
            },
        ),
        "corgi_burnFrom" => submit(
            state,
            Operation::BurnFrom {
                caller: p.address(0, "caller")?,
                from: p.address(1, "from")?,
                amount: p.amount(2, "amount")?,
            },
        ),
        _ => Err(JsonRpcError {
            code: codes::METHOD_NOT_FOUND,
            message: format!("Method not found: {}", method),
            data: None,
        }),
    }
}

/// Applies a mutating operation, recording metrics either way.
fn submit(state: &AppState, op: Operation) -> Result<Value, JsonRpcError> {
    let started = Instant::now();
    let result = state.ledger.submit(&op);
    state
        .metrics
        .operation_latency_seconds
        .observe(started.elapsed().as_secs_f64());

    match result {
        Ok(events) => {
            state
                .metrics
                .operations_applied_total
                .with_label_values(&[op.name()])
                .inc();
            let (supply, holders) = state
                .ledger
                .read(|l| (l.total_supply(), l.holder_count()));
            state.metrics.observe_ledger(supply, holders);
            tracing::info!(
                op = op.name(),
                caller = %op.caller(),
                events = events.len(),
                "operation applied"
            );
            Ok(Value::Bool(true))
        }
        Err(e) => {
            state
                .metrics
                .operations_rejected_total
                .with_label_values(&[op.name(), e.kind()])
                .inc();
            tracing::info!(op = op.name(), caller = %op.caller(), error = %e, "operation rejected");
            Err(e.into())
        }
    }
}

fn amount_value(amount: Amount) -> Value {
    Value::String(amount.to_string())
}

/// Positional parameter accessor.
struct Params<'a>(Option<&'a Value>);

impl Params<'_> {
    fn get(&self, index: usize, name: &str) -> Result<&Value, JsonRpcError> {
        self.0
            .and_then(|p| p.as_array())
            .and_then(|arr| arr.get(index))
            .ok_or_else(|| JsonRpcError::invalid_params(format!("missing {} at position {}", name, index)))
    }

    fn address(&self, index: usize, name: &str) -> Result<Address, JsonRpcError> {
        let raw = self
            .get(index, name)?
            .as_str()
            .ok_or_else(|| JsonRpcError::invalid_params(format!("{} must be a hex string", name)))?;
        Address::from_hex(raw).map_err(|e| JsonRpcError::invalid_params(format!("{}: {}", name, e)))
    }

    /// Accepts a decimal string or a non-negative JSON integer.
    fn amount(&self, index: usize, name: &str) -> Result<Amount, JsonRpcError> {
        let value = self.get(index, name)?;
        if let Some(n) = value.as_u64() {
            return Ok(Amount::from(n));
        }
        value
            .as_str()
            .and_then(|s| s.parse::<Amount>().ok())
            .ok_or_else(|| {
                JsonRpcError::invalid_params(format!("{} must be an unsigned integer string", name))
            })
    }
}

/// `GET /ws`: WebSocket upgrade for live event streaming.
///
/// Clients receive JSON-encoded [`EventRecord`]s in ledger order. Client
/// messages are ignored.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

/// Drives a single WebSocket connection until the client disconnects or
/// the channel closes.
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
                        if socket.send(Message::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Sequence numbers let the client see the gap.
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

/// Builds application state around an existing ledger handle.
pub fn app_state(
    version: String,
    ledger: SharedLedger,
    event_tx: broadcast::Sender<EventRecord>,
    metrics: SharedMetrics,
) -> AppState {
    let (supply, holders) = ledger.read(|l| (l.total_supply(), l.holder_count()));
    metrics.observe_ledger(supply, holders);
    AppState {
        version,
        ledger,
        event_tx,
        metrics,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use corgi_contracts::{Ledger, LedgerEvent};
    use corgi_protocol::config::{INITIAL_SUPPLY, ONE_TOKEN};
    use http_body_util::BodyExt;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn deployer() -> Address {
        Address::dev(0)
    }

    /// Creates a test AppState around a freshly deployed CorgiCoin ledger.
    fn test_app_state() -> AppState {
        let (event_tx, _) = broadcast::channel(16);
        let metrics = Arc::new(crate::metrics::NodeMetrics::new());
        let sink = BroadcastSink::new(event_tx.clone(), Arc::clone(&metrics));
        let ledger = SharedLedger::with_sink(
            Ledger::deploy(deployer()).expect("deploy"),
            Arc::new(sink),
        );
        ledger.flush_events();
        app_state("0.1.0-test".into(), ledger, event_tx, metrics)
    }

    async fn get(router: &Router, path: &str) -> (StatusCode, Vec<u8>) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    async fn post_json(router: &Router, path: &str, body: Value) -> (StatusCode, Vec<u8>) {
        let req = Request::builder()
            .method("POST")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap();
        let resp = router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let body = resp
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        (status, body)
    }

    /// Calls a JSON-RPC method and returns the decoded response.
    async fn rpc(router: &Router, method: &str, params: Value) -> JsonRpcResponse {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });
        let (status, bytes) = post_json(router, "/rpc", body).await;
        assert_eq!(status, StatusCode::OK);
        serde_json::from_slice(&bytes).unwrap()
    }

    fn hex(a: Address) -> String {
        a.to_hex()
    }

    fn tokens(n: u128) -> String {
        (n * ONE_TOKEN).to_string()
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn token_endpoint_reports_metadata() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, "/token").await;
        assert_eq!(status, StatusCode::OK);
        let json: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["token"]["name"], "CorgiCoin");
        assert_eq!(json["token"]["symbol"], "CORGI");
        assert_eq!(json["token"]["decimals"], 18);
        assert_eq!(json["token"]["total_supply"], INITIAL_SUPPLY.to_string());
        assert_eq!(json["holders"], 1);
    }

    #[tokio::test]
    async fn account_endpoint_reports_balance() {
        let router = create_router(test_app_state());
        let (status, body) = get(&router, &format!("/accounts/{}", hex(deployer()))).await;
        assert_eq!(status, StatusCode::OK);
        let resp: AccountResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(resp.balance, INITIAL_SUPPLY);
        assert_eq!(resp.balance_formatted, "100000000000");

        let (status, _) = get(&router, "/accounts/not-an-address").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn rpc_queries_return_metadata() {
        let router = create_router(test_app_state());

        let resp = rpc(&router, "corgi_name", serde_json::json!([])).await;
        assert_eq!(resp.result.unwrap(), "CorgiCoin");
        let resp = rpc(&router, "corgi_symbol", serde_json::json!([])).await;
        assert_eq!(resp.result.unwrap(), "CORGI");
        let resp = rpc(&router, "corgi_decimals", serde_json::json!([])).await;
        assert_eq!(resp.result.unwrap(), 18);
        let resp = rpc(&router, "corgi_totalSupply", serde_json::json!([])).await;
        assert_eq!(resp.result.unwrap(), INITIAL_SUPPLY.to_string());
        let resp = rpc(&router, "corgi_owner", serde_json::json!([])).await;
        assert_eq!(resp.result.unwrap(), hex(deployer()));
    }

    #[tokio::test]
    async fn rpc_transfer_moves_balance_and_broadcasts() {
        let state = test_app_state();
        let mut events = state.event_tx.subscribe();
        let router = create_router(state);
        let alice = Address::dev(1);

        let resp = rpc(
            &router,
            "corgi_transfer",
            serde_json::json!([hex(deployer()), hex(alice), tokens(50)]),
        )
        .await;
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap(), true);

        let resp = rpc(&router, "corgi_balanceOf", serde_json::json!([hex(alice)])).await;
        assert_eq!(resp.result.unwrap(), tokens(50));

        let record = events.try_recv().unwrap();
        assert_eq!(record.seq, 1);
        assert_eq!(
            record.event,
            LedgerEvent::Transfer {
                from: deployer(),
                to: alice,
                value: 50 * ONE_TOKEN
            }
        );
    }

    #[tokio::test]
    async fn rpc_transfer_without_funds_returns_distinct_code() {
        let router = create_router(test_app_state());
        let resp = rpc(
            &router,
            "corgi_transfer",
            serde_json::json!([hex(Address::dev(1)), hex(deployer()), "1"]),
        )
        .await;
        let err = resp.error.unwrap();
        assert_eq!(err.code, codes::INSUFFICIENT_BALANCE);
        assert_eq!(err.data.unwrap()["kind"], "insufficient_balance");

        let resp = rpc(
            &router,
            "corgi_balanceOf",
            serde_json::json!([hex(deployer())]),
        )
        .await;
        assert_eq!(resp.result.unwrap(), INITIAL_SUPPLY.to_string());
    }

    #[tokio::test]
    async fn rpc_transfer_to_zero_rejected() {
        let router = create_router(test_app_state());
        let resp = rpc(
            &router,
            "corgi_transfer",
            serde_json::json!([hex(deployer()), hex(Address::ZERO), 1]),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, codes::INVALID_RECIPIENT);
    }

    #[tokio::test]
    async fn rpc_allowance_flow() {
        let router = create_router(test_app_state());
        let spender = Address::dev(1);
        let recipient = Address::dev(2);

        let resp = rpc(
            &router,
            "corgi_approve",
            serde_json::json!([hex(deployer()), hex(spender), tokens(100)]),
        )
        .await;
        assert_eq!(resp.result.unwrap(), true);

        let resp = rpc(
            &router,
            "corgi_transferFrom",
            serde_json::json!([hex(spender), hex(deployer()), hex(recipient), tokens(50)]),
        )
        .await;
        assert_eq!(resp.result.unwrap(), true);

        let resp = rpc(
            &router,
            "corgi_allowance",
            serde_json::json!([hex(deployer()), hex(spender)]),
        )
        .await;
        assert_eq!(resp.result.unwrap(), tokens(50));

        let resp = rpc(
            &router,
            "corgi_transferFrom",
            serde_json::json!([hex(spender), hex(deployer()), hex(recipient), tokens(51)]),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, codes::INSUFFICIENT_ALLOWANCE);
    }

    #[tokio::test]
    async fn rpc_burn_reduces_supply() {
        let state = test_app_state();
        let metrics = Arc::clone(&state.metrics);
        let router = create_router(state);

        let resp = rpc(
            &router,
            "corgi_burn",
            serde_json::json!([hex(deployer()), tokens(1_000)]),
        )
        .await;
        assert_eq!(resp.result.unwrap(), true);

        let resp = rpc(&router, "corgi_totalSupply", serde_json::json!([])).await;
        assert_eq!(
            resp.result.unwrap(),
            (INITIAL_SUPPLY - 1_000 * ONE_TOKEN).to_string()
        );
        assert_eq!(
            metrics.total_supply_tokens.get(),
            100_000_000_000 - 1_000
        );

        let resp = rpc(
            &router,
            "corgi_burn",
            serde_json::json!([hex(Address::dev(1)), "1"]),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, codes::INSUFFICIENT_BALANCE);
        assert_eq!(
            metrics
                .operations_rejected_total
                .with_label_values(&["burn", "insufficient_balance"])
                .get(),
            1
        );
    }

    #[tokio::test]
    async fn rpc_burn_from_spends_allowance() {
        let router = create_router(test_app_state());
        let spender = Address::dev(1);

        rpc(
            &router,
            "corgi_approve",
            serde_json::json!([hex(deployer()), hex(spender), "10"]),
        )
        .await;
        let resp = rpc(
            &router,
            "corgi_burnFrom",
            serde_json::json!([hex(spender), hex(deployer()), "4"]),
        )
        .await;
        assert_eq!(resp.result.unwrap(), true);

        let resp = rpc(
            &router,
            "corgi_allowance",
            serde_json::json!([hex(deployer()), hex(spender)]),
        )
        .await;
        assert_eq!(resp.result.unwrap(), "6");
    }

    #[tokio::test]
    async fn rpc_rejects_bad_params() {
        let router = create_router(test_app_state());

        let resp = rpc(&router, "corgi_balanceOf", serde_json::json!([])).await;
        assert_eq!(resp.error.unwrap().code, codes::INVALID_PARAMS);

        let resp = rpc(&router, "corgi_balanceOf", serde_json::json!(["0x1234"])).await;
        assert_eq!(resp.error.unwrap().code, codes::INVALID_PARAMS);

        let resp = rpc(
            &router,
            "corgi_transfer",
            serde_json::json!([hex(deployer()), hex(Address::dev(1)), "-5"]),
        )
        .await;
        assert_eq!(resp.error.unwrap().code, codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn rpc_unknown_method() {
        let router = create_router(test_app_state());
        let resp = rpc(&router, "eth_chainId", serde_json::json!([])).await;
        assert_eq!(resp.error.unwrap().code, codes::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn rpc_invalid_version_returns_error() {
        let router = create_router(test_app_state());
        let body = serde_json::json!({
            "jsonrpc": "1.0",
            "method": "corgi_name",
            "params": [],
            "id": 9
        });
        let (status, bytes) = post_json(&router, "/rpc", body).await;
        assert_eq!(status, StatusCode::OK);
        let resp: JsonRpcResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(resp.error.unwrap().code, codes::INVALID_REQUEST);
        assert_eq!(resp.id, serde_json::json!(9));
    }
}
