//! Next-best-action engine.
//!
//! Runs a fixed set of threshold checks over a client (drift, risk profile
//! age, idle cash, goal funding, concentration) and turns each one that
//! fires into a ranked recommendation for the advisor.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::analytics::allocation::{allocation_by_asset_class, portfolio_value};
use crate::analytics::drift::{drift_report, model_for};
use crate::analytics::goals::{analyze_goals, GoalStatus};
use crate::analytics::suitability::{check_suitability, FindingKind};
use crate::config::AnalyticsConfig;
use crate::types::{dec_to_f64, money, ActionKind, AssetClass, Client, NextBestAction, Priority};

// ---------------------------------------------------------------------------
// Decision log
// ---------------------------------------------------------------------------

/// Outcome of one check, kept whether or not it produced an action.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRecord {
    pub check: ActionKind,
    pub triggered: bool,
    pub reason: String,
}

impl DecisionRecord {
    fn triggered(check: ActionKind, reason: impl Into<String>) -> Self {
        Self { check, triggered: true, reason: reason.into() }
    }

    fn skipped(check: ActionKind, reason: impl Into<String>) -> Self {
        Self { check, triggered: false, reason: reason.into() }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct RecommendationEngine {
    config: AnalyticsConfig,
}

impl RecommendationEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Run every check for one client.
    ///
    /// Returns the actions sorted by priority then impact, plus a decision
    /// log with one or more entries per check.
    pub fn next_best_actions(&self, client: &Client, today: NaiveDate) -> (Vec<NextBestAction>, Vec<DecisionRecord>) {
        let mut actions = Vec::new();
        let mut decisions = Vec::new();

        self.check_rebalance(client, &mut actions, &mut decisions);
        self.check_risk_profile(client, today, &mut actions, &mut decisions);
        self.check_cash(client, &mut actions, &mut decisions);
        self.check_goals(client, today, &mut actions, &mut decisions);
        self.check_concentration(client, today, &mut actions, &mut decisions);

        actions.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| b.impact.cmp(&a.impact)));

        debug!(
            client_id = %client.id,
            actions = actions.len(),
            checks = decisions.len(),
            "Next best actions generated"
        );

        (actions, decisions)
    }

    /// Actions across a whole book, highest priority first.
    pub fn book_alerts(&self, clients: &[Client], today: NaiveDate) -> Vec<NextBestAction> {
        let mut all: Vec<NextBestAction> = clients
            .iter()
            .flat_map(|c| self.next_best_actions(c, today).0)
            .collect();
        all.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| b.impact.cmp(&a.impact)));

        info!(
            clients = clients.len(),
            alerts = all.len(),
            high = all.iter().filter(|a| a.priority == Priority::High).count(),
            "Book alerts generated"
        );
        all
    }

    fn check_rebalance(&self, client: &Client, actions: &mut Vec<NextBestAction>, decisions: &mut Vec<DecisionRecord>) {
        let report = drift_report(client, &self.config);
        if !report.needs_rebalance {
            decisions.push(DecisionRecord::skipped(
                ActionKind::Rebalance,
                format!("drift {:.1}% within {:.1}%", report.total_drift, self.config.drift_threshold),
            ));
            return;
        }

        let priority = if report.high_drift { Priority::High } else { Priority::Medium };
        let impact = money(report.total_drift / 100.0 * dec_to_f64(portfolio_value(client)));
        actions.push(action(
            client,
            ActionKind::Rebalance,
            priority,
            format!("Rebalance to the {} model", report.model),
            format!(
                "Portfolio has drifted {:.1}% from target (threshold {:.1}%)",
                report.total_drift, self.config.drift_threshold
            ),
            impact,
        ));
        decisions.push(DecisionRecord::triggered(
            ActionKind::Rebalance,
            format!("drift {:.1}%", report.total_drift),
        ));
    }

    fn check_risk_profile(
        &self,
        client: &Client,
        today: NaiveDate,
        actions: &mut Vec<NextBestAction>,
        decisions: &mut Vec<DecisionRecord>,
    ) {
        let age = client.risk_profile.age_days(today);
        let limit = self.config.risk_review_days;
        if age <= limit {
            decisions.push(DecisionRecord::skipped(
                ActionKind::RefreshRiskProfile,
                format!("assessed {age} days ago"),
            ));
            return;
        }

        let priority = if age > limit * 2 { Priority::High } else { Priority::Medium };
        actions.push(action(
            client,
            ActionKind::RefreshRiskProfile,
            priority,
            "Refresh risk profile".to_string(),
            format!(
                "Last assessed {} ({age} days ago); current category {}",
                client.risk_profile.last_assessed, client.risk_profile.category
            ),
            Decimal::ZERO,
        ));
        decisions.push(DecisionRecord::triggered(
            ActionKind::RefreshRiskProfile,
            format!("{age} days exceeds {limit}"),
        ));
    }

    fn check_cash(&self, client: &Client, actions: &mut Vec<NextBestAction>, decisions: &mut Vec<DecisionRecord>) {
        let total = portfolio_value(client);
        let cash = client.cash_balance();
        let model = model_for(&client.risk_profile);
        let cash_target = model.target(AssetClass::Cash);
        let cash_pct = allocation_by_asset_class(client)
            .get(&AssetClass::Cash)
            .copied()
            .unwrap_or(0.0);

        let idle = cash > self.config.idle_cash_threshold;
        let overweight = cash_pct > cash_target + self.config.excess_cash_pct;
        if !idle && !overweight {
            decisions.push(DecisionRecord::skipped(
                ActionKind::InvestCash,
                format!("cash {cash_pct:.1}% (target {cash_target:.1}%)"),
            ));
            return;
        }

        let keep = money(cash_target / 100.0 * dec_to_f64(total));
        let excess = (cash - keep).max(Decimal::ZERO);
        if excess < self.config.min_trade_amount {
            decisions.push(DecisionRecord::skipped(
                ActionKind::InvestCash,
                format!("excess cash ${excess:.2} below minimum trade"),
            ));
            return;
        }

        actions.push(action(
            client,
            ActionKind::InvestCash,
            Priority::Medium,
            format!("Invest ${excess:.0} of idle cash"),
            format!(
                "Cash is ${cash:.0} ({cash_pct:.1}% of portfolio) against a {cash_target:.1}% target in the {} model",
                model.name
            ),
            excess,
        ));
        decisions.push(DecisionRecord::triggered(
            ActionKind::InvestCash,
            format!("excess cash ${excess:.2}"),
        ));
    }

    fn check_goals(
        &self,
        client: &Client,
        today: NaiveDate,
        actions: &mut Vec<NextBestAction>,
        decisions: &mut Vec<DecisionRecord>,
    ) {
        for analysis in analyze_goals(client, today, &self.config) {
            let priority = match analysis.status {
                GoalStatus::OffTrack => Priority::High,
                GoalStatus::AtRisk => Priority::Medium,
                GoalStatus::OnTrack | GoalStatus::Achieved => {
                    decisions.push(DecisionRecord::skipped(
                        ActionKind::IncreaseContribution,
                        format!("{} is {:?}", analysis.name, analysis.status),
                    ));
                    continue;
                }
            };
            if analysis.contribution_shortfall <= Decimal::ZERO {
                decisions.push(DecisionRecord::skipped(
                    ActionKind::IncreaseContribution,
                    format!("{} has no monthly shortfall", analysis.name),
                ));
                continue;
            }

            actions.push(action(
                client,
                ActionKind::IncreaseContribution,
                priority,
                format!(
                    "Increase {} contribution by ${:.0}/mo",
                    analysis.name, analysis.contribution_shortfall
                ),
                format!(
                    "Projected ${:.0} leaves a ${:.0} gap; ${:.0}/mo needed over {} months",
                    analysis.projected, analysis.funding_gap, analysis.required_monthly, analysis.months_remaining
                ),
                analysis.contribution_shortfall,
            ));
            decisions.push(DecisionRecord::triggered(
                ActionKind::IncreaseContribution,
                format!("{} is {:?}", analysis.name, analysis.status),
            ));
        }
    }

    fn check_concentration(
        &self,
        client: &Client,
        today: NaiveDate,
        actions: &mut Vec<NextBestAction>,
        decisions: &mut Vec<DecisionRecord>,
    ) {
        let total = dec_to_f64(portfolio_value(client));
        let report = check_suitability(client, today, &self.config);
        let mut fired = false;

        for finding in report.concentration_findings() {
            let (title, excess_pct, priority) = match &finding.kind {
                FindingKind::SingleHoldingConcentration { symbol, weight_pct, limit_pct } => {
                    (format!("Trim {symbol} position"), weight_pct - limit_pct, Priority::Medium)
                }
                FindingKind::SectorConcentration { sector, weight_pct, limit_pct } => {
                    (format!("Diversify out of {sector}"), weight_pct - limit_pct, Priority::Low)
                }
                _ => continue,
            };
            fired = true;
            actions.push(action(
                client,
                ActionKind::ReduceConcentration,
                priority,
                title,
                finding.message.clone(),
                money(excess_pct / 100.0 * total),
            ));
            decisions.push(DecisionRecord::triggered(ActionKind::ReduceConcentration, finding.message.clone()));
        }

        if !fired {
            decisions.push(DecisionRecord::skipped(
                ActionKind::ReduceConcentration,
                "no position or sector above limits",
            ));
        }
    }
}

fn action(
    client: &Client,
    kind: ActionKind,
    priority: Priority,
    title: String,
    detail: String,
    impact: Decimal,
) -> NextBestAction {
    NextBestAction {
        id: Uuid::new_v4().to_string(),
        client_id: client.id.clone(),
        kind,
        priority,
        title,
        detail,
        impact,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
