//! Goal funding math.
//!
//! Projects each goal forward with monthly compounding at the expected
//! return of the client's model portfolio, then measures the gap to the
//! target. Also owns progress history, goal dependencies and sharing.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::drift::model_for;
use super::pct;
use crate::config::AnalyticsConfig;
use crate::types::{dec_to_f64, money, Client, Goal, GoalShare, ProgressPoint, WealthError};

const DAYS_PER_MONTH: f64 = 30.4375;

// ---------------------------------------------------------------------------
// Time value of money
// ---------------------------------------------------------------------------

/// Whole months from `today` until `date`. Past dates yield 0.
pub fn months_until(today: NaiveDate, date: NaiveDate) -> u32 {
    if date <= today {
        return 0;
    }
    let mut months = (date.year() - today.year()) * 12 + date.month() as i32 - today.month() as i32;
    if date.day() < today.day() {
        months -= 1;
    }
    months.max(0) as u32
}

fn monthly_rate(annual_return_pct: f64) -> f64 {
    annual_return_pct / 100.0 / 12.0
}

/// Future value of `current` plus `monthly` contributions after `months`,
/// compounding monthly. A zero rate grows linearly.
pub fn projected_value(current: Decimal, monthly: Decimal, annual_return_pct: f64, months: u32) -> Decimal {
    let i = monthly_rate(annual_return_pct);
    let n = months as f64;
    let pv = dec_to_f64(current);
    let pmt = dec_to_f64(monthly);

    if i.abs() < 1e-12 {
        return money(pv + pmt * n);
    }
    let growth = (1.0 + i).powf(n);
    money(pv * growth + pmt * (growth - 1.0) / i)
}

/// Monthly contribution needed to reach `target` in `months`.
/// With no time left the whole remaining gap is due now.
pub fn required_monthly(current: Decimal, target: Decimal, annual_return_pct: f64, months: u32) -> Decimal {
    if months == 0 {
        return (target - current).max(Decimal::ZERO);
    }
    let i = monthly_rate(annual_return_pct);
    let n = months as f64;
    let growth = if i.abs() < 1e-12 { 1.0 } else { (1.0 + i).powf(n) };
    let remaining = dec_to_f64(target) - dec_to_f64(current) * growth;
    if remaining <= 0.0 {
        return Decimal::ZERO;
    }
    if i.abs() < 1e-12 {
        return money(remaining / n);
    }
    money(remaining * i / (growth - 1.0))
}

// ---------------------------------------------------------------------------
// Goal analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GoalStatus {
    Achieved,
    OnTrack,
    AtRisk,
    OffTrack,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalAnalysis {
    pub goal_id: String,
    pub name: String,
    pub progress_pct: f64,
    pub months_remaining: u32,
    /// Value at target date at the current contribution
    pub projected: Decimal,
    /// target − projected, floored at 0
    pub funding_gap: Decimal,
    pub required_monthly: Decimal,
    /// required − current contribution, floored at 0
    pub contribution_shortfall: Decimal,
    pub status: GoalStatus,
    /// Average monthly balance growth observed in progress history
    pub velocity: Option<Decimal>,
}

/// Analyze one goal at a given expected annual return.
pub fn analyze_goal(goal: &Goal, today: NaiveDate, annual_return_pct: f64, cfg: &AnalyticsConfig) -> GoalAnalysis {
    let months = months_until(today, goal.target_date);
    let projected = projected_value(goal.current_amount, goal.monthly_contribution, annual_return_pct, months);
    let required = required_monthly(goal.current_amount, goal.target_amount, annual_return_pct, months);

    let progress_pct = if goal.target_amount > Decimal::ZERO {
        pct(goal.current_amount, goal.target_amount).min(100.0)
    } else {
        100.0
    };

    let status = if goal.current_amount >= goal.target_amount {
        GoalStatus::Achieved
    } else if projected >= goal.target_amount {
        GoalStatus::OnTrack
    } else if dec_to_f64(projected) >= dec_to_f64(goal.target_amount) * cfg.at_risk_ratio {
        GoalStatus::AtRisk
    } else {
        GoalStatus::OffTrack
    };

    GoalAnalysis {
        goal_id: goal.id.clone(),
        name: goal.name.clone(),
        progress_pct,
        months_remaining: months,
        projected,
        funding_gap: (goal.target_amount - projected).max(Decimal::ZERO),
        required_monthly: required,
        contribution_shortfall: (required - goal.monthly_contribution).max(Decimal::ZERO),
        status,
        velocity: contribution_velocity(goal),
    }
}

/// Analyze every goal of a client at their model portfolio's expected return.
pub fn analyze_goals(client: &Client, today: NaiveDate, cfg: &AnalyticsConfig) -> Vec<GoalAnalysis> {
    let rate = model_for(&client.risk_profile).expected_return_pct;
    client
        .goals
        .iter()
        .map(|g| analyze_goal(g, today, rate, cfg))
        .collect()
}

// ---------------------------------------------------------------------------
// Progress history
// ---------------------------------------------------------------------------

/// Record a dated balance. History stays ascending by date; a second point
/// on the same date replaces the first. The goal's current amount follows
/// the latest point.
pub fn record_progress(goal: &mut Goal, date: NaiveDate, amount: Decimal) {
    match goal.progress.binary_search_by(|p| p.date.cmp(&date)) {
        Ok(idx) => goal.progress[idx].amount = amount,
        Err(idx) => goal.progress.insert(idx, ProgressPoint { date, amount }),
    }
    if let Some(latest) = goal.progress.last() {
        goal.current_amount = latest.amount;
    }
}

/// Average monthly balance change across the recorded history. Needs at
/// least two points spanning at least one day.
pub fn contribution_velocity(goal: &Goal) -> Option<Decimal> {
    let first = goal.progress.first()?;
    let last = goal.progress.last()?;
    let days = (last.date - first.date).num_days();
    if days <= 0 {
        return None;
    }
    let months = days as f64 / DAYS_PER_MONTH;
    Some(money(dec_to_f64(last.amount - first.amount) / months))
}

// ---------------------------------------------------------------------------
// Dependencies
// ---------------------------------------------------------------------------

/// Order goals so every goal follows the goals it depends on. Among goals
/// that are free at the same time, priority then target date then id wins.
pub fn goal_order(goals: &[Goal]) -> Result<Vec<&Goal>, WealthError> {
    let by_id: HashMap<&str, &Goal> = goals.iter().map(|g| (g.id.as_str(), g)).collect();
    let mut remaining: HashMap<&str, usize> = HashMap::new();

    for goal in goals {
        for dep in &goal.depends_on {
            if !by_id.contains_key(dep.as_str()) {
                return Err(WealthError::UnknownDependency {
                    goal: goal.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        let unique: BTreeSet<&str> = goal.depends_on.iter().map(String::as_str).collect();
        remaining.insert(goal.id.as_str(), unique.len());
    }

    let sort_key = |g: &Goal| (g.priority, g.target_date, g.id.clone());
    let mut ready: Vec<&Goal> = goals
        .iter()
        .filter(|g| remaining.get(g.id.as_str()) == Some(&0))
        .collect();
    let mut ordered = Vec::with_capacity(goals.len());

    while !ready.is_empty() {
        ready.sort_by_key(|g| sort_key(*g));
        let next = ready.remove(0);
        ordered.push(next);

        for goal in goals {
            let depends = goal.depends_on.iter().any(|d| d == &next.id);
            if !depends {
                continue;
            }
            if let Some(count) = remaining.get_mut(goal.id.as_str()) {
                *count -= 1;
                if *count == 0 {
                    ready.push(goal);
                }
            }
        }
    }

    if ordered.len() < goals.len() {
        let placed: BTreeSet<&str> = ordered.iter().map(|g| g.id.as_str()).collect();
        let stuck: Vec<&str> = goals
            .iter()
            .map(|g| g.id.as_str())
            .filter(|id| !placed.contains(id))
            .collect();
        return Err(WealthError::DependencyCycle(stuck.join(", ")));
    }

    Ok(ordered)
}

// ---------------------------------------------------------------------------
// Sharing
// ---------------------------------------------------------------------------

/// Share a goal with a household member. Re-sharing updates the role.
pub fn share_goal(goal: &mut Goal, member: &str, role: &str) {
    match goal
        .shared_with
        .iter_mut()
        .find(|s| s.member.eq_ignore_ascii_case(member))
    {
        Some(existing) => existing.role = role.to_string(),
        None => goal.shared_with.push(GoalShare {
            member: member.to_string(),
            role: role.to_string(),
        }),
    }
}

/// Stop sharing with a member. Returns whether anything was removed.
pub fn unshare_goal(goal: &mut Goal, member: &str) -> bool {
    let before = goal.shared_with.len();
    goal.shared_with.retain(|s| !s.member.eq_ignore_ascii_case(member));
    goal.shared_with.len() != before
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
