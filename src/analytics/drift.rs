//! Model portfolios and drift.
//!
//! Each risk band has a target asset-class mix. Drift is half the sum of
//! absolute weight differences, i.e. the share of the portfolio that would
//! have to move to land back on the model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::allocation::{allocation_by_asset_class, portfolio_value};
use crate::config::AnalyticsConfig;
use crate::types::{dec_to_f64, money, AssetClass, Client, Order, OrderOrigin, OrderSide, RiskCategory, RiskProfile};

// ---------------------------------------------------------------------------
// Model portfolios
// ---------------------------------------------------------------------------

/// Instrument a model portfolio buys to fill an asset class.
#[derive(Debug, Clone, Serialize)]
pub struct Proxy {
    pub symbol: String,
    pub name: String,
    pub reference_price: Decimal,
}

/// Target asset-class mix for one risk band.
#[derive(Debug, Clone, Serialize)]
pub struct ModelPortfolio {
    pub category: RiskCategory,
    pub name: String,
    /// Percent per asset class, summing to 100
    pub targets: BTreeMap<AssetClass, f64>,
    pub expected_return_pct: f64,
    pub proxies: BTreeMap<AssetClass, Proxy>,
}

impl ModelPortfolio {
    /// The model for a risk band.
    pub fn for_category(category: RiskCategory) -> Self {
        let (name, equity, fixed_income, alternatives, cash, expected) = match category {
            RiskCategory::Conservative => ("Capital Preservation", 20.0, 60.0, 5.0, 15.0, 3.5),
            RiskCategory::ModeratelyConservative => ("Income & Stability", 35.0, 50.0, 5.0, 10.0, 4.5),
            RiskCategory::Moderate => ("Balanced", 55.0, 35.0, 5.0, 5.0, 5.5),
            RiskCategory::Growth => ("Growth", 70.0, 20.0, 7.0, 3.0, 6.5),
            RiskCategory::Aggressive => ("Aggressive Growth", 85.0, 8.0, 5.0, 2.0, 7.5),
        };

        let targets = BTreeMap::from([
            (AssetClass::Equity, equity),
            (AssetClass::FixedIncome, fixed_income),
            (AssetClass::Alternatives, alternatives),
            (AssetClass::Cash, cash),
        ]);

        Self {
            category,
            name: name.to_string(),
            targets,
            expected_return_pct: expected,
            proxies: default_proxies(),
        }
    }

    /// Target weight for a class (0 when the model omits it).
    pub fn target(&self, class: AssetClass) -> f64 {
        self.targets.get(&class).copied().unwrap_or(0.0)
    }

    /// All five models, conservative first.
    pub fn all() -> Vec<ModelPortfolio> {
        RiskCategory::ALL.iter().map(|c| Self::for_category(*c)).collect()
    }
}

fn default_proxies() -> BTreeMap<AssetClass, Proxy> {
    let proxy = |symbol: &str, name: &str, price: Decimal| Proxy {
        symbol: symbol.to_string(),
        name: name.to_string(),
        reference_price: price,
    };
    BTreeMap::from([
        (AssetClass::Equity, proxy("VT", "Total World Stock ETF", dec!(115))),
        (AssetClass::FixedIncome, proxy("BND", "Total Bond Market ETF", dec!(72))),
        (AssetClass::Alternatives, proxy("IAU", "Gold Trust", dec!(48))),
        (AssetClass::Cash, proxy("SGOV", "0-3 Month Treasury ETF", dec!(100))),
    ])
}

/// Select the model portfolio recommended for a risk profile.
pub fn model_for(profile: &RiskProfile) -> ModelPortfolio {
    ModelPortfolio::for_category(profile.category)
}

// ---------------------------------------------------------------------------
// Drift
// ---------------------------------------------------------------------------

/// Half the summed absolute differences over the union of asset classes.
pub fn drift(current: &BTreeMap<AssetClass, f64>, target: &BTreeMap<AssetClass, f64>) -> f64 {
    let classes: BTreeSet<&AssetClass> = current.keys().chain(target.keys()).collect();
    let total: f64 = classes
        .into_iter()
        .map(|c| {
            let cur = current.get(c).copied().unwrap_or(0.0);
            let tgt = target.get(c).copied().unwrap_or(0.0);
            (cur - tgt).abs()
        })
        .sum();
    total / 2.0
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftRow {
    pub asset_class: AssetClass,
    pub current_pct: f64,
    pub target_pct: f64,
    /// current − target; positive means overweight
    pub delta_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DriftReport {
    pub model: String,
    pub category: RiskCategory,
    pub rows: Vec<DriftRow>,
    pub total_drift: f64,
    pub needs_rebalance: bool,
    pub high_drift: bool,
}

impl DriftReport {
    pub fn row(&self, class: AssetClass) -> Option<&DriftRow> {
        self.rows.iter().find(|r| r.asset_class == class)
    }
}

/// Compare a client's allocation to the model for their risk band.
pub fn drift_report(client: &Client, cfg: &AnalyticsConfig) -> DriftReport {
    let model = model_for(&client.risk_profile);
    let current = allocation_by_asset_class(client);
    let total_drift = drift(&current, &model.targets);

    let rows = AssetClass::ALL
        .iter()
        .map(|class| {
            let current_pct = current.get(class).copied().unwrap_or(0.0);
            let target_pct = model.target(*class);
            DriftRow {
                asset_class: *class,
                current_pct,
                target_pct,
                delta_pct: current_pct - target_pct,
            }
        })
        .collect();

    // An empty portfolio has nothing to rebalance.
    let has_assets = portfolio_value(client) > Decimal::ZERO;

    debug!(
        client_id = %client.id,
        model = %model.name,
        drift = format!("{total_drift:.2}"),
        "Drift computed"
    );

    DriftReport {
        model: model.name,
        category: model.category,
        rows,
        total_drift,
        needs_rebalance: has_assets && total_drift > cfg.drift_threshold,
        high_drift: has_assets && total_drift > cfg.high_drift_threshold,
    }
}

// ---------------------------------------------------------------------------
// Rebalance proposals
// ---------------------------------------------------------------------------

/// Propose Pending orders that move each non-cash asset class to its model
/// weight. Cash absorbs the difference. Sells are listed before buys.
pub fn rebalance_orders(
    client: &Client,
    model: &ModelPortfolio,
    cfg: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> Vec<Order> {
    let total = portfolio_value(client);
    if total <= Decimal::ZERO || client.accounts.is_empty() {
        return Vec::new();
    }
    let current = allocation_by_asset_class(client);

    // Buys land in the account holding the most cash.
    let buy_account = client
        .accounts
        .iter()
        .max_by(|a, b| a.cash_balance.cmp(&b.cash_balance))
        .map(|a| a.id.clone())
        .unwrap_or_default();

    let mut sells = Vec::new();
    let mut buys = Vec::new();

    for class in AssetClass::ALL.iter().filter(|c| **c != AssetClass::Cash) {
        let delta_pct = model.target(*class) - current.get(class).copied().unwrap_or(0.0);
        let amount = money(delta_pct / 100.0 * dec_to_f64(total));
        if amount.abs() < cfg.min_trade_amount {
            continue;
        }

        if amount > Decimal::ZERO {
            let Some(proxy) = model.proxies.get(class) else { continue };
            // Reuse the client's own price when they already hold the proxy.
            let price = client
                .holdings()
                .find(|h| h.symbol == proxy.symbol)
                .map(|h| h.price)
                .unwrap_or(proxy.reference_price);
            if price <= Decimal::ZERO {
                continue;
            }
            buys.push(Order::pending(
                &client.id,
                &buy_account,
                &proxy.symbol,
                *class,
                OrderSide::Buy,
                (amount / price).round_dp(4),
                amount,
                format!("Rebalance {class} toward {:.1}% target", model.target(*class)),
                now,
            )
            .tagged(OrderOrigin::Rebalance));
        } else {
            // Trim the largest position in the overweight class.
            let largest = client
                .accounts
                .iter()
                .flat_map(|a| a.holdings.iter().map(move |h| (a, h)))
                .filter(|(_, h)| h.asset_class == *class && h.price > Decimal::ZERO)
                .max_by(|(_, a), (_, b)| a.market_value().cmp(&b.market_value()));
            let Some((account, holding)) = largest else { continue };

            let wanted = (-amount / holding.price).round_dp(4);
            let quantity = wanted.min(holding.quantity);
            sells.push(Order::pending(
                &client.id,
                &account.id,
                &holding.symbol,
                *class,
                OrderSide::Sell,
                quantity,
                (quantity * holding.price).round_dp(2),
                format!("Rebalance {class} toward {:.1}% target", model.target(*class)),
                now,
            )
            .tagged(OrderOrigin::Rebalance));
        }
    }

    sells.extend(buys);
    sells
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
