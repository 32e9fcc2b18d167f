//! Dashboard API route handlers.
//!
//! All endpoints return JSON. State is shared via `Arc<DashboardState>`.
//! Every handler loads what it needs from the store and runs the pure
//! analytics over it; nothing is cached between requests.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::analytics::allocation::{holding_weights, portfolio_value, summarize, HoldingWeight, PortfolioSummary};
use crate::analytics::drift::{drift_report, model_for, rebalance_orders, DriftReport};
use crate::analytics::goals::{
    analyze_goal, analyze_goals, goal_order, record_progress, share_goal, unshare_goal, GoalAnalysis,
};
use crate::analytics::optimize::{optimize_goals, GoalOptimization};
use crate::analytics::suitability::{check_suitability, SuitabilityReport};
use crate::copilot::{Answer, Copilot, HostUsage};
use crate::orders::{next_status, transition, ExecutionReport, SimulatedExecutor};
use crate::recommend::{DecisionRecord, RecommendationEngine};
use crate::storage::WealthStore;
use crate::types::{
    AssetClass, ChatTurn, Client, Goal, NextBestAction, Order, OrderOrigin, OrderSide, OrderStatus, Priority,
    RiskCategory, WealthError,
};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct DashboardState {
    pub store: WealthStore,
    pub copilot: Copilot,
    pub engine: RecommendationEngine,
    pub executor: SimulatedExecutor,
    /// Held across every read-modify-write of a client or its blotter.
    writes: Mutex<()>,
    /// Fixed analysis date; `None` means today.
    as_of: Option<NaiveDate>,
}

impl DashboardState {
    pub fn new(store: WealthStore, copilot: Copilot, engine: RecommendationEngine) -> Self {
        Self {
            store,
            copilot,
            engine,
            executor: SimulatedExecutor::new(),
            writes: Mutex::new(()),
            as_of: None,
        }
    }

    /// Pin the analysis date.
    pub fn with_as_of(mut self, date: NaiveDate) -> Self {
        self.as_of = Some(date);
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }
}

pub type AppState = Arc<DashboardState>;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error. Domain failures map to 4xx, everything else to 500.
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<WealthError>() {
            Some(
                WealthError::ClientNotFound(_)
                | WealthError::GoalNotFound(_)
                | WealthError::OrderNotFound(_)
                | WealthError::AccountNotFound(_),
            ) => StatusCode::NOT_FOUND,
            Some(
                WealthError::InvalidTransition { .. }
                | WealthError::InsufficientPosition { .. }
                | WealthError::InsufficientCash { .. },
            ) => StatusCode::CONFLICT,
            Some(
                WealthError::InvalidRiskScore(_)
                | WealthError::Parse(_)
                | WealthError::UnknownDependency { .. }
                | WealthError::DependencyCycle(_),
            ) => StatusCode::BAD_REQUEST,
            Some(WealthError::Storage(_)) | None => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl<E: Into<anyhow::Error>> From<E> for ApiError {
    fn from(e: E) -> Self {
        Self(e.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        } else {
            debug!(status = %status, error = %self.0, "Request rejected");
        }
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

pub type ApiResult<T> = Result<Json<T>, ApiError>;

// ---------------------------------------------------------------------------
// Request & response types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub copilot_online: bool,
    pub model: Option<String>,
    pub usage: Option<HostUsage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookResponse {
    pub clients: usize,
    pub total_aum: Decimal,
    pub high_priority: usize,
    pub alerts: Vec<NextBestAction>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientSummary {
    pub id: String,
    pub name: String,
    pub segment: String,
    pub advisor: String,
    pub risk_category: RiskCategory,
    pub total_value: Decimal,
    pub drift_pct: f64,
    pub open_actions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClientDetail {
    pub client: Client,
    pub total_value: Decimal,
    pub model: String,
    pub suitability: SuitabilityReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct PortfolioResponse {
    pub summary: PortfolioSummary,
    pub holdings: Vec<HoldingWeight>,
    pub drift: DriftReport,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalsResponse {
    pub analyses: Vec<GoalAnalysis>,
    /// Goal ids in funding order
    pub funding_order: Vec<String>,
    pub optimization: GoalOptimization,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<NextBestAction>,
    pub decisions: Vec<DecisionRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RebalanceResponse {
    pub drift: DriftReport,
    pub orders: Vec<Order>,
    /// Open rebalance orders cancelled in favour of this proposal
    pub superseded: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExecuteResponse {
    pub report: ExecutionReport,
    pub orders: Vec<Order>,
}

#[derive(Debug, Deserialize)]
pub struct NewOrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    #[serde(default)]
    pub account_id: Option<String>,
    /// Required when the client does not already hold the symbol
    #[serde(default)]
    pub asset_class: Option<AssetClass>,
    #[serde(default)]
    pub rationale: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressRequest {
    pub date: NaiveDate,
    pub amount: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct ShareRequest {
    pub member: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
}

// ---------------------------------------------------------------------------
// Route handlers: book & clients
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        copilot_online: state.copilot.is_online(),
        model: state.copilot.host_model().map(str::to_string),
        usage: state.copilot.host_usage(),
    })
}

/// GET /api/book
pub async fn get_book(State(state): State<AppState>) -> ApiResult<BookResponse> {
    let clients = state.store.list_clients()?;
    let alerts = state.engine.book_alerts(&clients, state.today());

    Ok(Json(BookResponse {
        clients: clients.len(),
        total_aum: clients.iter().map(portfolio_value).sum(),
        high_priority: alerts.iter().filter(|a| a.priority == Priority::High).count(),
        alerts,
    }))
}

/// GET /api/clients
pub async fn list_clients(State(state): State<AppState>) -> ApiResult<Vec<ClientSummary>> {
    let today = state.today();
    let cfg = state.engine.config();

    let summaries = state
        .store
        .list_clients()?
        .into_iter()
        .map(|c| ClientSummary {
            total_value: portfolio_value(&c),
            drift_pct: drift_report(&c, cfg).total_drift,
            open_actions: state.engine.next_best_actions(&c, today).0.len(),
            risk_category: c.risk_profile.category,
            id: c.id,
            name: c.name,
            segment: c.segment,
            advisor: c.advisor,
        })
        .collect();

    Ok(Json(summaries))
}

/// GET /api/clients/:id
pub async fn get_client(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ClientDetail> {
    let client = state.store.client(&id)?;
    Ok(Json(ClientDetail {
        total_value: portfolio_value(&client),
        model: model_for(&client.risk_profile).name,
        suitability: check_suitability(&client, state.today(), state.engine.config()),
        client,
    }))
}

/// DELETE /api/clients/:id
pub async fn delete_client(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    let _guard = state.writes.lock().await;
    if !state.store.delete_client(&id)? {
        return Err(WealthError::ClientNotFound(id).into());
    }
    info!(client_id = %id, "Client removed");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/clients/:id/portfolio
pub async fn get_portfolio(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<PortfolioResponse> {
    let client = state.store.client(&id)?;
    Ok(Json(PortfolioResponse {
        summary: summarize(&client),
        holdings: holding_weights(&client),
        drift: drift_report(&client, state.engine.config()),
    }))
}

/// GET /api/clients/:id/goals
pub async fn get_goals(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<GoalsResponse> {
    let client = state.store.client(&id)?;
    let today = state.today();

    let funding_order = goal_order(&client.goals)?.into_iter().map(|g| g.id.clone()).collect();
    Ok(Json(GoalsResponse {
        analyses: analyze_goals(&client, today, state.engine.config()),
        funding_order,
        optimization: optimize_goals(&client, today)?,
    }))
}

/// POST /api/clients/:id/goals/:goal_id/progress
pub async fn post_goal_progress(
    State(state): State<AppState>,
    Path((id, goal_id)): Path<(String, String)>,
    Json(req): Json<ProgressRequest>,
) -> ApiResult<GoalAnalysis> {
    if req.amount < Decimal::ZERO {
        return Err(WealthError::Parse("progress amount must not be negative".into()).into());
    }

    let _guard = state.writes.lock().await;
    let mut client = state.store.client(&id)?;
    let rate = model_for(&client.risk_profile).expected_return_pct;
    let goal = client
        .goal_mut(&goal_id)
        .ok_or_else(|| WealthError::GoalNotFound(goal_id.clone()))?;
    record_progress(goal, req.date, req.amount);
    let analysis = analyze_goal(goal, state.today(), rate, state.engine.config());

    state.store.save_client(&client)?;
    info!(client_id = %id, goal_id = %goal_id, amount = %req.amount, "Goal progress recorded");
    Ok(Json(analysis))
}

/// POST /api/clients/:id/goals/:goal_id/share
pub async fn post_goal_share(
    State(state): State<AppState>,
    Path((id, goal_id)): Path<(String, String)>,
    Json(req): Json<ShareRequest>,
) -> ApiResult<Goal> {
    if req.member.trim().is_empty() {
        return Err(WealthError::Parse("member must not be empty".into()).into());
    }

    let _guard = state.writes.lock().await;
    let mut client = state.store.client(&id)?;
    let goal = client
        .goal_mut(&goal_id)
        .ok_or_else(|| WealthError::GoalNotFound(goal_id.clone()))?;
    share_goal(goal, req.member.trim(), req.role.trim());
    let shared = goal.clone();

    state.store.save_client(&client)?;
    Ok(Json(shared))
}

/// DELETE /api/clients/:id/goals/:goal_id/share/:member
pub async fn delete_goal_share(
    State(state): State<AppState>,
    Path((id, goal_id, member)): Path<(String, String, String)>,
) -> ApiResult<Goal> {
    let _guard = state.writes.lock().await;
    let mut client = state.store.client(&id)?;
    let goal = client
        .goal_mut(&goal_id)
        .ok_or_else(|| WealthError::GoalNotFound(goal_id.clone()))?;
    if !unshare_goal(goal, member.trim()) {
        debug!(client_id = %id, goal_id = %goal_id, member = %member, "Goal was not shared with member");
        return Ok(Json(goal.clone()));
    }
    let unshared = goal.clone();

    state.store.save_client(&client)?;
    info!(client_id = %id, goal_id = %goal_id, member = %member, "Goal share removed");
    Ok(Json(unshared))
}

/// GET /api/clients/:id/actions
pub async fn get_actions(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ActionsResponse> {
    let client = state.store.client(&id)?;
    let (actions, decisions) = state.engine.next_best_actions(&client, state.today());
    Ok(Json(ActionsResponse { actions, decisions }))
}

// ---------------------------------------------------------------------------
// Route handlers: orders
// ---------------------------------------------------------------------------

/// GET /api/clients/:id/orders
pub async fn get_orders(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<Order>> {
    state.store.client(&id)?;
    Ok(Json(state.store.orders(&id)?))
}

/// POST /api/clients/:id/orders
pub async fn post_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<NewOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let symbol = req.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Err(WealthError::Parse("symbol must not be empty".into()).into());
    }
    if req.quantity <= Decimal::ZERO || req.price <= Decimal::ZERO {
        return Err(WealthError::Parse("quantity and price must be positive".into()).into());
    }

    let _guard = state.writes.lock().await;
    let client = state.store.client(&id)?;
    let held = client.holdings().find(|h| h.symbol == symbol);

    let asset_class = req
        .asset_class
        .or(held.map(|h| h.asset_class))
        .ok_or_else(|| WealthError::Parse(format!("asset_class is required for new symbol {symbol}")))?;

    let account_id = match &req.account_id {
        Some(account_id) => client
            .accounts
            .iter()
            .find(|a| &a.id == account_id)
            .map(|a| a.id.clone())
            .ok_or_else(|| WealthError::AccountNotFound(account_id.clone()))?,
        None => client
            .accounts
            .iter()
            .find(|a| a.holdings.iter().any(|h| h.symbol == symbol))
            .or_else(|| client.accounts.first())
            .map(|a| a.id.clone())
            .ok_or_else(|| WealthError::AccountNotFound(format!("{id}: client has no accounts")))?,
    };

    let amount = req
        .quantity
        .checked_mul(req.price)
        .ok_or_else(|| WealthError::Parse("quantity times price is out of range".into()))?
        .round_dp(2);

    let order = Order::pending(
        &client.id,
        &account_id,
        &symbol,
        asset_class,
        req.side,
        req.quantity,
        amount,
        req.rationale.unwrap_or_else(|| "Advisor order".to_string()),
        Utc::now(),
    );
    state.store.add_orders(&id, std::slice::from_ref(&order))?;

    info!(client_id = %id, order = %order, "Order created");
    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /api/clients/:id/rebalance
pub async fn post_rebalance(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<RebalanceResponse> {
    let _guard = state.writes.lock().await;
    let client = state.store.client(&id)?;
    let cfg = state.engine.config();

    let now = Utc::now();
    let drift = drift_report(&client, cfg);
    let orders = rebalance_orders(&client, &model_for(&client.risk_profile), cfg, now);

    // A fresh proposal replaces any earlier one still on the blotter.
    let mut blotter = state.store.orders(&id)?;
    let mut superseded = Vec::new();
    for order in blotter
        .iter_mut()
        .filter(|o| o.origin == OrderOrigin::Rebalance && o.is_open())
    {
        transition(order, OrderStatus::Cancelled, now)?;
        superseded.push(order.id.clone());
    }
    blotter.extend(orders.iter().cloned());
    state.store.save_orders(&id, &blotter)?;

    info!(
        client_id = %id,
        drift = format!("{:.2}", drift.total_drift),
        orders = orders.len(),
        superseded = superseded.len(),
        "Rebalance proposed"
    );
    Ok(Json(RebalanceResponse { drift, orders, superseded }))
}

/// POST /api/clients/:id/orders/execute
pub async fn post_execute(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ExecuteResponse> {
    let _guard = state.writes.lock().await;
    let mut client = state.store.client(&id)?;
    let mut orders = state.store.orders(&id)?;

    let report = state.executor.execute_batch(&mut client, &mut orders, Utc::now());
    state.store.save_client(&client)?;
    state.store.save_orders(&id, &orders)?;

    Ok(Json(ExecuteResponse { report, orders }))
}

/// POST /api/orders/:client_id/:order_id/advance
pub async fn post_advance(
    State(state): State<AppState>,
    Path((client_id, order_id)): Path<(String, String)>,
) -> ApiResult<Order> {
    let _guard = state.writes.lock().await;
    let mut client = state.store.client(&client_id)?;
    let mut orders = state.store.orders(&client_id)?;
    let order = orders
        .iter_mut()
        .find(|o| o.id == order_id)
        .ok_or_else(|| WealthError::OrderNotFound(order_id.clone()))?;

    let now = Utc::now();
    match next_status(order.status) {
        Some(OrderStatus::Submitted) => state.executor.submit(order, now)?,
        Some(OrderStatus::Filled) => {
            state.executor.fill(&mut client, order, now)?;
            state.store.save_client(&client)?;
        }
        _ => {
            return Err(WealthError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Filled,
            }
            .into())
        }
    }

    let advanced = order.clone();
    state.store.save_orders(&client_id, &orders)?;
    Ok(Json(advanced))
}

/// POST /api/orders/:client_id/:order_id/cancel
pub async fn post_cancel(
    State(state): State<AppState>,
    Path((client_id, order_id)): Path<(String, String)>,
) -> ApiResult<Order> {
    let _guard = state.writes.lock().await;
    state.store.client(&client_id)?;
    let mut orders = state.store.orders(&client_id)?;
    let order = orders
        .iter_mut()
        .find(|o| o.id == order_id)
        .ok_or_else(|| WealthError::OrderNotFound(order_id.clone()))?;

    transition(order, OrderStatus::Cancelled, Utc::now())?;
    let cancelled = order.clone();
    state.store.save_orders(&client_id, &orders)?;

    info!(client_id = %client_id, order_id = %order_id, "Order cancelled");
    Ok(Json(cancelled))
}

// ---------------------------------------------------------------------------
// Route handlers: copilot
// ---------------------------------------------------------------------------

/// POST /api/clients/:id/copilot
pub async fn post_copilot(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<QuestionRequest>,
) -> ApiResult<Answer> {
    let client = state.store.client(&id)?;
    let asked_at = Utc::now();
    let answer = state.copilot.ask(&client, &req.question, state.today()).await;

    // Only the history append is serialized; the host call runs unlocked.
    let _guard = state.writes.lock().await;
    state.store.client(&id)?;
    state
        .copilot
        .record_exchange(&state.store, &id, &req.question, asked_at, &answer)?;
    Ok(Json(answer))
}

/// GET /api/clients/:id/copilot
pub async fn get_copilot_history(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Vec<ChatTurn>> {
    state.store.client(&id)?;
    Ok(Json(state.store.chat_history(&id)?))
}

/// DELETE /api/clients/:id/copilot
pub async fn delete_copilot_history(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, ApiError> {
    state.store.client(&id)?;
    let _guard = state.writes.lock().await;
    state.store.clear_chat(&id)?;
    info!(client_id = %id, "Copilot history cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/clients/:id/brief
pub async fn post_brief(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Answer> {
    let client = state.store.client(&id)?;
    Ok(Json(state.copilot.meeting_brief(&client, state.today()).await))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyticsConfig;
    use crate::copilot::LlmHost;
    use crate::data::seed::demo_clients;
    use crate::types::AnswerSource;
    use rust_decimal_macros::dec;
    use std::time::Duration;
    use tokio::sync::Notify;

    fn state_with(copilot: Copilot) -> AppState {
        let store = WealthStore::in_memory();
        store.seed_if_empty(&demo_clients()).unwrap();
        Arc::new(
            DashboardState::new(store, copilot, RecommendationEngine::new(AnalyticsConfig::default()))
                .with_as_of(NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()),
        )
    }

    fn test_state() -> AppState {
        state_with(Copilot::offline(AnalyticsConfig::default()))
    }

    /// Host that answers only once the gate is opened.
    struct GatedHost {
        gate: Arc<Notify>,
    }

    #[async_trait::async_trait]
    impl LlmHost for GatedHost {
        async fn complete(&self, _system: &str, _prompt: &str) -> anyhow::Result<String> {
            self.gate.notified().await;
            Ok("Allocation is close to the Income & Stability model.".to_string())
        }

        fn model_name(&self) -> &str {
            "gated"
        }
    }

    fn buy_request(quantity: Decimal, price: Decimal) -> NewOrderRequest {
        NewOrderRequest {
            symbol: "VT".into(),
            side: OrderSide::Buy,
            quantity,
            price,
            account_id: None,
            asset_class: Some(AssetClass::Equity),
            rationale: None,
        }
    }

    #[test]
    fn test_error_status_mapping() {
        let not_found = ApiError::from(WealthError::ClientNotFound("x".into()));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);

        let conflict = ApiError::from(WealthError::InvalidTransition {
            from: OrderStatus::Filled,
            to: OrderStatus::Cancelled,
        });
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let short = ApiError::from(WealthError::InsufficientCash {
            account: "a-004-trust".into(),
            needed: dec!(500000),
            available: dec!(310000),
        });
        assert_eq!(short.status(), StatusCode::CONFLICT);

        let bad = ApiError::from(WealthError::DependencyCycle("a, b".into()));
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

        let other = ApiError::from(anyhow::anyhow!("disk full"));
        assert_eq!(other.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_error_status_survives_context() {
        use anyhow::Context;
        let err: anyhow::Result<()> = Err(WealthError::OrderNotFound("o1".into())).context("loading blotter");
        assert_eq!(ApiError::from(err.unwrap_err()).status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_book_handler() {
        let Json(book) = get_book(State(test_state())).await.unwrap();
        assert_eq!(book.clients, 5);
        assert!(book.total_aum > Decimal::ZERO);
        assert!(book.high_priority > 0);
        assert!(book.alerts.windows(2).all(|w| w[0].priority <= w[1].priority));
    }

    #[tokio::test]
    async fn test_list_clients_handler() {
        let Json(clients) = list_clients(State(test_state())).await.unwrap();
        assert_eq!(clients.len(), 5);
        assert_eq!(clients[0].id, "c-001");
        assert_eq!(clients[0].risk_category, RiskCategory::ModeratelyConservative);
    }

    #[tokio::test]
    async fn test_goals_handler_orders_dependencies() {
        let Json(goals) = get_goals(State(test_state()), Path("c-002".to_string())).await.unwrap();
        let emergency = goals.funding_order.iter().position(|g| g == "g-oka-emg").unwrap();
        let home = goals.funding_order.iter().position(|g| g == "g-oka-home").unwrap();
        assert!(emergency < home);
        assert_eq!(goals.analyses.len(), 3);
    }

    #[tokio::test]
    async fn test_post_order_requires_asset_class_for_new_symbol() {
        let state = test_state();
        let req = NewOrderRequest {
            symbol: "XYZ".into(),
            side: OrderSide::Buy,
            quantity: Decimal::ONE,
            price: Decimal::TEN,
            account_id: None,
            asset_class: None,
            rationale: None,
        };
        let err = post_order(State(state), Path("c-001".to_string()), Json(req)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_order_rejects_overflowing_amount() {
        let state = test_state();
        let huge = Decimal::from_i128_with_scale(100_000_000_000_000_000_000, 0);
        let err = post_order(State(state.clone()), Path("c-002".to_string()), Json(buy_request(huge, huge)))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(state.store.orders("c-002").unwrap().is_empty());

        let (status, Json(order)) = post_order(State(state), Path("c-002".to_string()), Json(buy_request(dec!(3), dec!(115.005))))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order.amount, dec!(345.02));
    }

    #[tokio::test]
    async fn test_post_order_infers_account_and_class() {
        let state = test_state();
        let req = NewOrderRequest {
            symbol: "mub".into(),
            side: OrderSide::Sell,
            quantity: Decimal::TEN,
            price: Decimal::new(10650, 2),
            account_id: None,
            asset_class: None,
            rationale: None,
        };
        let (status, Json(order)) = post_order(State(state.clone()), Path("c-001".to_string()), Json(req))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order.symbol, "MUB");
        assert_eq!(order.account_id, "a-001-tax");
        assert_eq!(order.asset_class, AssetClass::FixedIncome);
        assert_eq!(order.amount, Decimal::new(106500, 2));
        assert_eq!(state.store.orders("c-001").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_progress_handler() {
        let state = test_state();
        let req = ProgressRequest {
            date: NaiveDate::from_ymd_opt(2026, 10, 15).unwrap(),
            amount: Decimal::new(30000, 0),
        };
        let Json(analysis) = post_goal_progress(
            State(state.clone()),
            Path(("c-002".to_string(), "g-oka-emg".to_string())),
            Json(req),
        )
        .await
        .unwrap();
        assert_eq!(analysis.goal_id, "g-oka-emg");

        let client = state.store.client("c-002").unwrap();
        let goal = client.goal("g-oka-emg").unwrap();
        assert_eq!(goal.progress.len(), 5);
        assert_eq!(goal.current_amount, Decimal::new(30000, 0));
    }

    #[tokio::test]
    async fn test_unknown_goal_is_not_found() {
        let req = ShareRequest { member: "Sam".into(), role: "viewer".into() };
        let err = post_goal_share(
            State(test_state()),
            Path(("c-001".to_string(), "nope".to_string())),
            Json(req),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_repeat_rebalance_supersedes_open_proposal() {
        let state = test_state();
        let id = || Path("c-001".to_string());

        let Json(first) = post_rebalance(State(state.clone()), id()).await.unwrap();
        assert!(!first.orders.is_empty());
        assert!(first.superseded.is_empty());

        // An advisor order on the blotter is left alone.
        let (_, Json(manual)) = post_order(State(state.clone()), id(), Json(buy_request(dec!(10), dec!(115))))
            .await
            .unwrap();

        let Json(second) = post_rebalance(State(state.clone()), id()).await.unwrap();
        let first_ids: Vec<_> = first.orders.iter().map(|o| o.id.clone()).collect();
        assert_eq!(second.superseded, first_ids);

        let Json(executed) = post_execute(State(state.clone()), id()).await.unwrap();
        assert!(executed.report.failed.is_empty(), "{:?}", executed.report.failed);
        assert_eq!(executed.report.filled.len(), second.orders.len() + 1);
        assert!(executed.report.filled.contains(&manual.id));
        for order in executed.orders.iter().filter(|o| first_ids.contains(&o.id)) {
            assert_eq!(order.status, OrderStatus::Cancelled);
        }

        let client = state.store.client("c-001").unwrap();
        assert!(client.accounts.iter().all(|a| a.cash_balance >= Decimal::ZERO));
        let drift = drift_report(&client, state.engine.config());
        assert!(drift.total_drift < 1.0, "drift after execution {}", drift.total_drift);
    }

    #[tokio::test]
    async fn test_copilot_host_call_does_not_block_writes() {
        let gate = Arc::new(Notify::new());
        let host = GatedHost { gate: gate.clone() };
        let state = state_with(Copilot::new(Some(Box::new(host)), AnalyticsConfig::default()));

        let question = QuestionRequest { question: "How is the allocation looking?".into() };
        let pending = tokio::spawn(post_copilot(State(state.clone()), Path("c-001".to_string()), Json(question)));
        tokio::task::yield_now().await;

        let share = ShareRequest { member: "Tom Chen".into(), role: "viewer".into() };
        let shared = tokio::time::timeout(
            Duration::from_secs(1),
            post_goal_share(
                State(state.clone()),
                Path(("c-001".to_string(), "g-chen-edu".to_string())),
                Json(share),
            ),
        )
        .await
        .expect("goal share waited on the copilot");
        assert_eq!(shared.unwrap().0.shared_with.len(), 2);

        gate.notify_one();
        let Json(answer) = pending.await.unwrap().unwrap();
        assert_eq!(answer.source, AnswerSource::Host);

        let history = state.store.chat_history("c-001").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].source, AnswerSource::Advisor);
        assert_eq!(history[1].text, answer.text);
    }

    #[tokio::test]
    async fn test_delete_client_handler() {
        let state = test_state();
        post_rebalance(State(state.clone()), Path("c-001".to_string())).await.unwrap();

        let status = delete_client(State(state.clone()), Path("c-001".to_string())).await.unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!state.store.client_ids().unwrap().contains(&"c-001".to_string()));
        assert!(state.store.orders("c-001").unwrap().is_empty());

        let err = delete_client(State(state), Path("c-001".to_string())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_goal_share_handler() {
        let state = test_state();
        let path = || Path(("c-001".to_string(), "g-chen-edu".to_string(), "lily chen".to_string()));

        let Json(goal) = delete_goal_share(State(state.clone()), path()).await.unwrap();
        assert!(goal.shared_with.is_empty());
        let stored = state.store.client("c-001").unwrap();
        assert!(stored.goal("g-chen-edu").unwrap().shared_with.is_empty());

        // Removing an absent member is a no-op.
        let Json(again) = delete_goal_share(State(state), path()).await.unwrap();
        assert!(again.shared_with.is_empty());
    }

    #[tokio::test]
    async fn test_health_reports_copilot_mode() {
        let Json(report) = health(State(test_state())).await;
        assert_eq!(report.status, "ok");
        assert!(!report.copilot_online);
        assert_eq!(report.model, None);
        assert_eq!(report.usage, None);
    }
}
