//! Goal optimization.
//!
//! Splits the client's monthly surplus across goals in dependency order,
//! then priority, then deadline, and suggests how to close whatever the
//! surplus cannot cover.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use super::drift::model_for;
use super::goals::{goal_order, months_until, projected_value, required_monthly};
use crate::types::{Client, WealthError};

/// Longest horizon searched when proposing a later target date.
const MAX_EXTENSION_MONTHS: u32 = 600;

#[derive(Debug, Clone, Serialize)]
pub struct ContributionPlan {
    pub goal_id: String,
    pub name: String,
    pub current_contribution: Decimal,
    pub required_monthly: Decimal,
    pub allocated: Decimal,
    /// required − allocated, floored at 0
    pub shortfall: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GoalSuggestion {
    /// Raise the monthly contribution to `to`.
    IncreaseContribution { goal_id: String, from: Decimal, to: Decimal },
    /// Push the target date out by `extra_months`.
    ExtendTargetDate {
        goal_id: String,
        extra_months: u32,
        new_date: NaiveDate,
    },
    /// Lower the target to what the funded contribution reaches on time.
    ReduceTarget { goal_id: String, achievable: Decimal },
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalOptimization {
    pub monthly_surplus: Decimal,
    pub plan: Vec<ContributionPlan>,
    pub unallocated: Decimal,
    pub suggestions: Vec<GoalSuggestion>,
}

/// Allocate the monthly surplus and build suggestions for underfunded goals.
pub fn optimize_goals(client: &Client, today: NaiveDate) -> Result<GoalOptimization, WealthError> {
    let rate = model_for(&client.risk_profile).expected_return_pct;
    let ordered = goal_order(&client.goals)?;

    let mut budget = client.monthly_surplus.max(Decimal::ZERO);
    let mut plan = Vec::with_capacity(ordered.len());
    let mut suggestions = Vec::new();

    for goal in ordered {
        let months = months_until(today, goal.target_date);
        let required = required_monthly(goal.current_amount, goal.target_amount, rate, months);
        // Past-due goals need a lump sum, not a monthly allocation.
        let allocated = if months == 0 { Decimal::ZERO } else { required.min(budget) };
        budget -= allocated;

        if goal.monthly_contribution < required {
            suggestions.push(GoalSuggestion::IncreaseContribution {
                goal_id: goal.id.clone(),
                from: goal.monthly_contribution,
                to: required,
            });
        }

        if allocated < required {
            let funded = allocated.max(goal.monthly_contribution);
            if let Some(total_months) = months_to_reach(goal.current_amount, funded, goal.target_amount, rate) {
                if total_months > months {
                    if let Some(new_date) = today.checked_add_months(Months::new(total_months)) {
                        suggestions.push(GoalSuggestion::ExtendTargetDate {
                            goal_id: goal.id.clone(),
                            extra_months: total_months - months,
                            new_date,
                        });
                    }
                }
            }
            suggestions.push(GoalSuggestion::ReduceTarget {
                goal_id: goal.id.clone(),
                achievable: projected_value(goal.current_amount, funded, rate, months),
            });
        }

        plan.push(ContributionPlan {
            goal_id: goal.id.clone(),
            name: goal.name.clone(),
            current_contribution: goal.monthly_contribution,
            required_monthly: required,
            allocated,
            shortfall: (required - allocated).max(Decimal::ZERO),
        });
    }

    debug!(
        client_id = %client.id,
        goals = plan.len(),
        suggestions = suggestions.len(),
        unallocated = %budget,
        "Goal optimization complete"
    );

    Ok(GoalOptimization {
        monthly_surplus: client.monthly_surplus,
        plan,
        unallocated: budget,
        suggestions,
    })
}

/// Months needed for `current` plus `monthly` to reach `target`, searched
/// up to a fixed horizon. `None` when the target is out of reach.
pub fn months_to_reach(current: Decimal, monthly: Decimal, target: Decimal, annual_return_pct: f64) -> Option<u32> {
    (0..=MAX_EXTENSION_MONTHS).find(|n| projected_value(current, monthly, annual_return_pct, *n) >= target)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
