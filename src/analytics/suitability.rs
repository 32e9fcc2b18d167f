//! Suitability and concentration checks.
//!
//! Compares what a client holds against what their risk profile allows:
//! equity exposure versus the model, product risk versus the client score,
//! single-name and sector concentration, and the age of the assessment.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

use super::allocation::{allocation_by_asset_class, allocation_by_sector, holding_weights};
use super::drift::model_for;
use crate::config::AnalyticsConfig;
use crate::types::{AssetClass, Client, Priority};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FindingKind {
    EquityAboveTolerance { equity_pct: f64, limit_pct: f64 },
    ProductRiskExceedsProfile { symbol: String, product_risk: u8, client_score: u8 },
    SingleHoldingConcentration { symbol: String, weight_pct: f64, limit_pct: f64 },
    SectorConcentration { sector: String, weight_pct: f64, limit_pct: f64 },
    StaleRiskProfile { age_days: i64, limit_days: i64 },
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingKind::EquityAboveTolerance { equity_pct, limit_pct } => {
                write!(f, "Equity at {equity_pct:.1}% exceeds the {limit_pct:.1}% limit")
            }
            FindingKind::ProductRiskExceedsProfile { symbol, product_risk, client_score } => {
                write!(f, "{symbol} risk {product_risk}/10 exceeds client score {client_score}/10")
            }
            FindingKind::SingleHoldingConcentration { symbol, weight_pct, limit_pct } => {
                write!(f, "{symbol} is {weight_pct:.1}% of the portfolio (limit {limit_pct:.1}%)")
            }
            FindingKind::SectorConcentration { sector, weight_pct, limit_pct } => {
                write!(f, "{sector} sector is {weight_pct:.1}% of holdings (limit {limit_pct:.1}%)")
            }
            FindingKind::StaleRiskProfile { age_days, limit_days } => {
                write!(f, "Risk profile is {age_days} days old (review every {limit_days})")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub severity: Priority,
    pub kind: FindingKind,
    pub message: String,
}

impl Finding {
    fn new(severity: Priority, kind: FindingKind) -> Self {
        let message = kind.to_string();
        Self { severity, kind, message }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SuitabilityReport {
    pub client_id: String,
    pub findings: Vec<Finding>,
    /// No high-severity finding
    pub is_suitable: bool,
}

impl SuitabilityReport {
    pub fn concentration_findings(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| {
            matches!(
                f.kind,
                FindingKind::SingleHoldingConcentration { .. } | FindingKind::SectorConcentration { .. }
            )
        })
    }
}

/// Run every suitability and concentration check for a client.
pub fn check_suitability(client: &Client, today: NaiveDate, cfg: &AnalyticsConfig) -> SuitabilityReport {
    let model = model_for(&client.risk_profile);
    let mut findings = Vec::new();

    let equity_pct = allocation_by_asset_class(client)
        .get(&AssetClass::Equity)
        .copied()
        .unwrap_or(0.0);
    let equity_limit = model.target(AssetClass::Equity) + cfg.equity_tolerance_pct;
    if equity_pct > equity_limit {
        findings.push(Finding::new(
            Priority::High,
            FindingKind::EquityAboveTolerance {
                equity_pct,
                limit_pct: equity_limit,
            },
        ));
    }

    let weights = holding_weights(client);
    for w in &weights {
        if w.risk_rating > client.risk_profile.score {
            // Two or more points above the client's score is a hard mismatch.
            let severity = if w.risk_rating >= client.risk_profile.score + 2 {
                Priority::High
            } else {
                Priority::Medium
            };
            findings.push(Finding::new(
                severity,
                FindingKind::ProductRiskExceedsProfile {
                    symbol: w.symbol.clone(),
                    product_risk: w.risk_rating,
                    client_score: client.risk_profile.score,
                },
            ));
        }
        if w.weight_pct > cfg.concentration_limit_pct {
            findings.push(Finding::new(
                Priority::Medium,
                FindingKind::SingleHoldingConcentration {
                    symbol: w.symbol.clone(),
                    weight_pct: w.weight_pct,
                    limit_pct: cfg.concentration_limit_pct,
                },
            ));
        }
    }

    for (sector, weight_pct) in allocation_by_sector(client) {
        if weight_pct > cfg.sector_limit_pct {
            findings.push(Finding::new(
                Priority::Low,
                FindingKind::SectorConcentration {
                    sector,
                    weight_pct,
                    limit_pct: cfg.sector_limit_pct,
                },
            ));
        }
    }

    let age_days = client.risk_profile.age_days(today);
    if age_days > cfg.risk_review_days {
        findings.push(Finding::new(
            Priority::Medium,
            FindingKind::StaleRiskProfile {
                age_days,
                limit_days: cfg.risk_review_days,
            },
        ));
    }

    findings.sort_by_key(|f| f.severity);
    let is_suitable = !findings.iter().any(|f| f.severity == Priority::High);

    SuitabilityReport {
        client_id: client.id.clone(),
        findings,
        is_suitable,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
