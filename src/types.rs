//! Shared types for WEALTHDESK.
//!
//! These types form the data model used across all modules.
//! Analytics, recommendation, storage and the dashboard all depend on
//! them, never on each other's internals.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Money helpers
// ---------------------------------------------------------------------------

/// Lossy conversion used when money feeds percentage math.
pub fn dec_to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

/// Convert a computed float back to a cent-rounded amount.
pub fn money(value: f64) -> Decimal {
    if !value.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64(value).unwrap_or(Decimal::ZERO).round_dp(2)
}

// ---------------------------------------------------------------------------
// Risk profile
// ---------------------------------------------------------------------------

/// Risk category derived from the 1–10 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Conservative,
    ModeratelyConservative,
    Moderate,
    Growth,
    Aggressive,
}

impl RiskCategory {
    pub const ALL: &'static [RiskCategory] = &[
        RiskCategory::Conservative,
        RiskCategory::ModeratelyConservative,
        RiskCategory::Moderate,
        RiskCategory::Growth,
        RiskCategory::Aggressive,
    ];

    /// Map a risk score onto its band. Scores outside 1–10 are rejected.
    pub fn from_score(score: u8) -> Result<Self, WealthError> {
        match score {
            1..=2 => Ok(RiskCategory::Conservative),
            3..=4 => Ok(RiskCategory::ModeratelyConservative),
            5..=6 => Ok(RiskCategory::Moderate),
            7..=8 => Ok(RiskCategory::Growth),
            9..=10 => Ok(RiskCategory::Aggressive),
            other => Err(WealthError::InvalidRiskScore(other)),
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskCategory::Conservative => write!(f, "Conservative"),
            RiskCategory::ModeratelyConservative => write!(f, "Moderately Conservative"),
            RiskCategory::Moderate => write!(f, "Moderate"),
            RiskCategory::Growth => write!(f, "Growth"),
            RiskCategory::Aggressive => write!(f, "Aggressive"),
        }
    }
}

/// A client's assessed appetite for risk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskProfile {
    /// 1 (lowest) to 10 (highest)
    pub score: u8,
    pub category: RiskCategory,
    pub last_assessed: NaiveDate,
    pub time_horizon_years: u32,
}

impl RiskProfile {
    /// Build a profile, deriving the category from the score.
    pub fn new(score: u8, last_assessed: NaiveDate, time_horizon_years: u32) -> Result<Self, WealthError> {
        Ok(Self {
            score,
            category: RiskCategory::from_score(score)?,
            last_assessed,
            time_horizon_years,
        })
    }

    /// Days since the profile was last assessed (never negative).
    pub fn age_days(&self, today: NaiveDate) -> i64 {
        (today - self.last_assessed).num_days().max(0)
    }
}

impl fmt::Display for RiskProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}/10, assessed {}, horizon {}y)",
            self.category, self.score, self.last_assessed, self.time_horizon_years,
        )
    }
}

// ---------------------------------------------------------------------------
// Holdings & accounts
// ---------------------------------------------------------------------------

/// Broad asset class used for allocation and model portfolios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetClass {
    Equity,
    FixedIncome,
    Alternatives,
    Cash,
}

impl AssetClass {
    pub const ALL: &'static [AssetClass] = &[
        AssetClass::Equity,
        AssetClass::FixedIncome,
        AssetClass::Alternatives,
        AssetClass::Cash,
    ];
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetClass::Equity => write!(f, "Equity"),
            AssetClass::FixedIncome => write!(f, "Fixed Income"),
            AssetClass::Alternatives => write!(f, "Alternatives"),
            AssetClass::Cash => write!(f, "Cash"),
        }
    }
}

/// Case-insensitive parse with a few common aliases.
impl std::str::FromStr for AssetClass {
    type Err = WealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-', ' '], "").as_str() {
            "equity" | "equities" | "stock" | "stocks" => Ok(AssetClass::Equity),
            "fixedincome" | "bond" | "bonds" => Ok(AssetClass::FixedIncome),
            "alternatives" | "alternative" | "alts" => Ok(AssetClass::Alternatives),
            "cash" | "moneymarket" => Ok(AssetClass::Cash),
            _ => Err(WealthError::Parse(format!("Unknown asset class: {s}"))),
        }
    }
}

/// A position in a single security.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub name: String,
    pub asset_class: AssetClass,
    pub sector: String,
    pub quantity: Decimal,
    pub price: Decimal,
    /// Product risk rating, 1–10 on the same scale as the client score
    pub risk_rating: u8,
}

impl Holding {
    pub fn market_value(&self) -> Decimal {
        self.quantity * self.price
    }
}

impl fmt::Display for Holding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} × ${:.2} = ${:.2} [{}]",
            self.symbol,
            self.quantity,
            self.price,
            self.market_value(),
            self.asset_class,
        )
    }
}

/// An investment account (brokerage, retirement, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub cash_balance: Decimal,
    pub holdings: Vec<Holding>,
}

impl Account {
    pub fn holdings_value(&self) -> Decimal {
        self.holdings.iter().map(Holding::market_value).sum()
    }

    pub fn total_value(&self) -> Decimal {
        self.holdings_value() + self.cash_balance
    }
}

// ---------------------------------------------------------------------------
// Goals
// ---------------------------------------------------------------------------

/// Goal priority; lower ordinal is funded first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GoalPriority {
    Essential,
    Important,
    Aspirational,
}

/// A dated snapshot of a goal's balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressPoint {
    pub date: NaiveDate,
    pub amount: Decimal,
}

/// A household member a goal is shared with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalShare {
    pub member: String,
    /// "viewer" | "contributor" | "owner"
    pub role: String,
}

/// A named savings target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: String,
    pub name: String,
    /// "retirement" | "education" | "home" | "emergency" | ...
    pub kind: String,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub target_date: NaiveDate,
    pub monthly_contribution: Decimal,
    pub priority: GoalPriority,
    #[serde(default)]
    pub progress: Vec<ProgressPoint>,
    /// Ids of goals that must be funded before this one
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub shared_with: Vec<GoalShare>,
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (${:.0} of ${:.0} by {}, +${:.0}/mo)",
            self.name,
            self.current_amount,
            self.target_amount,
            self.target_date,
            self.monthly_contribution,
        )
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A client household and everything the advisor knows about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub name: String,
    pub email: String,
    /// "mass-affluent" | "hnw" | "uhnw"
    pub segment: String,
    pub advisor: String,
    pub risk_profile: RiskProfile,
    pub accounts: Vec<Account>,
    pub goals: Vec<Goal>,
    /// Monthly amount the client can direct toward goals
    pub monthly_surplus: Decimal,
    pub joined: NaiveDate,
}

impl Client {
    /// All holdings across accounts.
    pub fn holdings(&self) -> impl Iterator<Item = &Holding> {
        self.accounts.iter().flat_map(|a| a.holdings.iter())
    }

    pub fn cash_balance(&self) -> Decimal {
        self.accounts.iter().map(|a| a.cash_balance).sum()
    }

    pub fn goal(&self, goal_id: &str) -> Option<&Goal> {
        self.goals.iter().find(|g| g.id == goal_id)
    }

    pub fn goal_mut(&mut self, goal_id: &str) -> Option<&mut Goal> {
        self.goals.iter_mut().find(|g| g.id == goal_id)
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} | {} accounts | {} goals",
            self.name,
            self.id,
            self.risk_profile.category,
            self.accounts.len(),
            self.goals.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// Simulated order lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Submitted,
    Filled,
    Cancelled,
}

impl OrderStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Submitted => write!(f, "submitted"),
            OrderStatus::Filled => write!(f, "filled"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Who proposed an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderOrigin {
    #[default]
    Advisor,
    /// Generated by a rebalance proposal; superseded by the next one.
    Rebalance,
}

/// A simulated order. Never routed to a real venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub client_id: String,
    pub account_id: String,
    pub symbol: String,
    pub asset_class: AssetClass,
    pub side: OrderSide,
    pub quantity: Decimal,
    /// Notional in USD at the reference price
    pub amount: Decimal,
    pub status: OrderStatus,
    #[serde(default)]
    pub origin: OrderOrigin,
    pub rationale: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} {} (${:.2}) {}",
            self.status, self.side, self.quantity, self.symbol, self.amount, self.id,
        )
    }
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Rebalance,
    RefreshRiskProfile,
    InvestCash,
    IncreaseContribution,
    ReduceConcentration,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Rebalance => write!(f, "Rebalance"),
            ActionKind::RefreshRiskProfile => write!(f, "Refresh risk profile"),
            ActionKind::InvestCash => write!(f, "Invest cash"),
            ActionKind::IncreaseContribution => write!(f, "Increase contribution"),
            ActionKind::ReduceConcentration => write!(f, "Reduce concentration"),
        }
    }
}

/// Priority shared by actions and suitability findings. `High` sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::High => write!(f, "HIGH"),
            Priority::Medium => write!(f, "MEDIUM"),
            Priority::Low => write!(f, "LOW"),
        }
    }
}

/// A generated recommendation for the advisor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextBestAction {
    pub id: String,
    pub client_id: String,
    pub kind: ActionKind,
    pub priority: Priority,
    pub title: String,
    pub detail: String,
    /// Dollar amount the action moves or closes
    pub impact: Decimal,
}

impl fmt::Display for NextBestAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {} (${:.0})", self.priority, self.kind, self.title, self.impact)
    }
}

// ---------------------------------------------------------------------------
// Copilot conversation
// ---------------------------------------------------------------------------

/// Where a copilot answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnswerSource {
    /// The host LLM produced the text.
    Host,
    /// The deterministic offline answer was used.
    Fallback,
    /// The advisor's own message.
    Advisor,
}

/// One message in a client's copilot conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub source: AnswerSource,
    pub text: String,
    pub at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for WEALTHDESK.
#[derive(Debug, thiserror::Error)]
pub enum WealthError {
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    #[error("Goal not found: {0}")]
    GoalNotFound(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Invalid risk score {0}: must be between 1 and 10")]
    InvalidRiskScore(u8),

    #[error("Invalid order transition: {from} -> {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Goal {goal} depends on unknown goal {dependency}")]
    UnknownDependency { goal: String, dependency: String },

    #[error("Goal dependency cycle involving: {0}")]
    DependencyCycle(String),

    #[error("Insufficient position in {symbol}: need {needed}, have {available}")]
    InsufficientPosition {
        symbol: String,
        needed: Decimal,
        available: Decimal,
    },

    #[error("Insufficient cash in account {account}: need {needed}, have {available}")]
    InsufficientCash {
        account: String,
        needed: Decimal,
        available: Decimal,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
