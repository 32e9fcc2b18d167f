//! Simulated order lifecycle.
//!
//! Orders move Pending → Submitted → Filled, or to Cancelled from either
//! open state. Nothing is routed to a venue: a fill is applied directly to
//! the client's holdings and cash at the order's reference price.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::types::{AssetClass, Client, Holding, Order, OrderOrigin, OrderSide, OrderStatus, WealthError};

impl Order {
    /// A new Pending order.
    #[allow(clippy::too_many_arguments)]
    pub fn pending(
        client_id: &str,
        account_id: &str,
        symbol: &str,
        asset_class: AssetClass,
        side: OrderSide,
        quantity: Decimal,
        amount: Decimal,
        rationale: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            client_id: client_id.to_string(),
            account_id: account_id.to_string(),
            symbol: symbol.to_string(),
            asset_class,
            side,
            quantity,
            amount,
            status: OrderStatus::Pending,
            origin: OrderOrigin::Advisor,
            rationale,
            created_at: now,
            updated_at: now,
        }
    }

    /// Same order, attributed to `origin`.
    pub fn tagged(mut self, origin: OrderOrigin) -> Self {
        self.origin = origin;
        self
    }

    /// Whether the order can still move.
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    /// Price implied by notional over quantity (zero for an empty order).
    pub fn reference_price(&self) -> Decimal {
        if self.quantity.is_zero() {
            Decimal::ZERO
        } else {
            (self.amount / self.quantity).round_dp(4)
        }
    }
}

/// Whether `from → to` is a legal move.
pub fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    matches!(
        (from, to),
        (OrderStatus::Pending, OrderStatus::Submitted)
            | (OrderStatus::Submitted, OrderStatus::Filled)
            | (OrderStatus::Pending, OrderStatus::Cancelled)
            | (OrderStatus::Submitted, OrderStatus::Cancelled)
    )
}

/// Move an order to a new status, stamping `updated_at`.
pub fn transition(order: &mut Order, to: OrderStatus, now: DateTime<Utc>) -> Result<(), WealthError> {
    if !can_transition(order.status, to) {
        return Err(WealthError::InvalidTransition { from: order.status, to });
    }
    debug!(order_id = %order.id, from = %order.status, to = %to, "Order transition");
    order.status = to;
    order.updated_at = now;
    Ok(())
}

/// The next status on the happy path, if any.
pub fn next_status(status: OrderStatus) -> Option<OrderStatus> {
    match status {
        OrderStatus::Pending => Some(OrderStatus::Submitted),
        OrderStatus::Submitted => Some(OrderStatus::Filled),
        OrderStatus::Filled | OrderStatus::Cancelled => None,
    }
}

// ---------------------------------------------------------------------------
// Execution result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FailedOrder {
    pub order_id: String,
    pub symbol: String,
    pub reason: String,
}

/// Result of executing a batch of orders.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub filled: Vec<String>,
    pub failed: Vec<FailedOrder>,
    pub total_bought: Decimal,
    pub total_sold: Decimal,
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// Always-dry-run executor: fills are book entries only.
#[derive(Debug, Default)]
pub struct SimulatedExecutor;

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Pending → Submitted.
    pub fn submit(&self, order: &mut Order, now: DateTime<Utc>) -> Result<(), WealthError> {
        transition(order, OrderStatus::Submitted, now)
    }

    /// Submitted → Filled, applying the trade to the client's account.
    /// The client is untouched when the fill is rejected.
    pub fn fill(&self, client: &mut Client, order: &mut Order, now: DateTime<Utc>) -> Result<(), WealthError> {
        if !can_transition(order.status, OrderStatus::Filled) {
            return Err(WealthError::InvalidTransition {
                from: order.status,
                to: OrderStatus::Filled,
            });
        }
        apply_fill(client, order)?;
        transition(order, OrderStatus::Filled, now)?;

        info!(
            client_id = %client.id,
            order_id = %order.id,
            side = %order.side,
            symbol = %order.symbol,
            quantity = %order.quantity,
            amount = format!("${:.2}", order.amount),
            "[SIMULATED] Order filled"
        );
        Ok(())
    }

    /// Submit and fill every open order in sequence. Failures are recorded
    /// and leave the order where it stopped.
    pub fn execute_batch(&self, client: &mut Client, orders: &mut [Order], now: DateTime<Utc>) -> ExecutionReport {
        let mut report = ExecutionReport::default();

        for order in orders.iter_mut().filter(|o| !o.status.is_terminal()) {
            let result = match order.status {
                OrderStatus::Pending => self
                    .submit(order, now)
                    .and_then(|_| self.fill(client, order, now)),
                _ => self.fill(client, order, now),
            };

            match result {
                Ok(()) => {
                    match order.side {
                        OrderSide::Buy => report.total_bought += order.amount,
                        OrderSide::Sell => report.total_sold += order.amount,
                    }
                    report.filled.push(order.id.clone());
                }
                Err(e) => {
                    warn!(order_id = %order.id, symbol = %order.symbol, error = %e, "Simulated execution failed");
                    report.failed.push(FailedOrder {
                        order_id: order.id.clone(),
                        symbol: order.symbol.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            client_id = %client.id,
            filled = report.filled.len(),
            failed = report.failed.len(),
            bought = %report.total_bought,
            sold = %report.total_sold,
            "Batch executed"
        );
        report
    }
}

fn default_risk_rating(class: AssetClass) -> u8 {
    match class {
        AssetClass::Equity => 6,
        AssetClass::FixedIncome => 3,
        AssetClass::Alternatives => 5,
        AssetClass::Cash => 1,
    }
}

fn apply_fill(client: &mut Client, order: &Order) -> Result<(), WealthError> {
    let account = client
        .accounts
        .iter_mut()
        .find(|a| a.id == order.account_id)
        .ok_or_else(|| WealthError::AccountNotFound(order.account_id.clone()))?;

    match order.side {
        OrderSide::Buy => {
            if account.cash_balance < order.amount {
                return Err(WealthError::InsufficientCash {
                    account: account.id.clone(),
                    needed: order.amount,
                    available: account.cash_balance,
                });
            }
            match account.holdings.iter_mut().find(|h| h.symbol == order.symbol) {
                Some(holding) => holding.quantity += order.quantity,
                None => account.holdings.push(Holding {
                    symbol: order.symbol.clone(),
                    name: order.symbol.clone(),
                    asset_class: order.asset_class,
                    sector: order.asset_class.to_string(),
                    quantity: order.quantity,
                    price: order.reference_price(),
                    risk_rating: default_risk_rating(order.asset_class),
                }),
            }
            account.cash_balance -= order.amount;
        }
        OrderSide::Sell => {
            let idx = account
                .holdings
                .iter()
                .position(|h| h.symbol == order.symbol)
                .ok_or_else(|| WealthError::InsufficientPosition {
                    symbol: order.symbol.clone(),
                    needed: order.quantity,
                    available: Decimal::ZERO,
                })?;
            let available = account.holdings[idx].quantity;
            if available < order.quantity {
                return Err(WealthError::InsufficientPosition {
                    symbol: order.symbol.clone(),
                    needed: order.quantity,
                    available,
                });
            }
            account.holdings[idx].quantity -= order.quantity;
            if account.holdings[idx].quantity.is_zero() {
                account.holdings.remove(idx);
            }
            account.cash_balance += order.amount;
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
