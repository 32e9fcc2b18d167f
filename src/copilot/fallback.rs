//! Offline answers.
//!
//! Used when no host LLM is configured or the host fails. Answers are
//! composed from the same analytics snapshot the prompt is built from.

use chrono::Utc;
use serde::Serialize;
use std::fmt::Write;

use super::prompt::ClientContext;
use crate::analytics::drift::{model_for, rebalance_orders};
use crate::analytics::goals::GoalStatus;
use crate::config::AnalyticsConfig;
use crate::types::{AssetClass, Client, Priority};

/// What an advisor question is about, judged by keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Intent {
    Orders,
    Rebalance,
    Goals,
    Risk,
    Cash,
    Summary,
}

/// First match wins. Goals come first so "buy a home" is not read as a trade.
const INTENT_KEYWORDS: &[(Intent, &[&str])] = &[
    (
        Intent::Goals,
        &["goal", "retire", "college", "education", "saving", "on track", "afford", "home", "house"],
    ),
    (Intent::Orders, &["order", "trade", "buy", "sell"]),
    (Intent::Rebalance, &["drift", "rebalanc", "allocation", "model"]),
    (Intent::Risk, &["risk", "suitab", "concentrat", "exposure"]),
    (Intent::Cash, &["cash", "idle", "liquid"]),
];

impl Intent {
    pub fn classify(question: &str) -> Self {
        let q = question.to_lowercase();
        INTENT_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| q.contains(w)))
            .map(|(intent, _)| *intent)
            .unwrap_or(Intent::Summary)
    }
}

/// Deterministic answer for an intent.
pub fn answer(intent: Intent, client: &Client, ctx: &ClientContext, cfg: &AnalyticsConfig) -> String {
    match intent {
        Intent::Orders => orders(client, ctx, cfg),
        Intent::Rebalance => rebalance(ctx),
        Intent::Goals => goals(ctx),
        Intent::Risk => risk(ctx),
        Intent::Cash => cash(ctx),
        Intent::Summary => summary(ctx),
    }
}

/// Offline meeting brief.
pub fn brief(ctx: &ClientContext) -> String {
    let mut out = format!("Meeting brief for {}.\n{}\n", ctx.client_name, summary(ctx));

    if !ctx.actions.is_empty() {
        out.push_str("\nTalking points:\n");
        for a in ctx.actions.iter().take(3) {
            let _ = writeln!(out, "- {}: {}", a.title, a.detail);
        }
    }

    let compliance: Vec<_> = ctx
        .suitability
        .findings
        .iter()
        .filter(|f| f.severity == Priority::High)
        .collect();
    if !compliance.is_empty() {
        out.push_str("\nCompliance:\n");
        for f in compliance {
            let _ = writeln!(out, "- {}", f.message);
        }
    }

    out.trim_end().to_string()
}

fn summary(ctx: &ClientContext) -> String {
    let mut out = format!(
        "{} holds ${:.2} across {} positions with ${:.2} in cash. Risk profile is {} ({}/10) against the {} model, with {:.1}% drift.",
        ctx.client_name,
        ctx.summary.total_value,
        ctx.summary.positions,
        ctx.summary.cash,
        ctx.risk_category,
        ctx.risk_score,
        ctx.drift.model,
        ctx.drift.total_drift,
    );
    match ctx.actions.first() {
        Some(top) => {
            let _ = write!(out, " Top priority: {}.", top.title);
        }
        None => out.push_str(" No actions are outstanding."),
    }
    out
}

fn rebalance(ctx: &ClientContext) -> String {
    let d = &ctx.drift;
    let mut out = format!(
        "{}'s portfolio has drifted {:.1}% from the {} model.",
        ctx.client_name, d.total_drift, d.model
    );

    let largest = d
        .rows
        .iter()
        .max_by(|a, b| a.delta_pct.abs().total_cmp(&b.delta_pct.abs()));
    if let Some(row) = largest.filter(|r| r.delta_pct.abs() > 0.0) {
        let _ = write!(
            out,
            " {} is the largest gap at {:.1}% against a {:.1}% target.",
            row.asset_class, row.current_pct, row.target_pct
        );
    }

    out.push_str(if d.high_drift {
        " Drift is well past tolerance; rebalance soon."
    } else if d.needs_rebalance {
        " A rebalance is recommended."
    } else {
        " The allocation is within tolerance."
    });
    out
}

fn goals(ctx: &ClientContext) -> String {
    if ctx.goals.is_empty() {
        return format!("{} has no goals on file.", ctx.client_name);
    }

    let mut out = format!("{} has {} goals:", ctx.client_name, ctx.goals.len());
    for g in &ctx.goals {
        let status = match g.status {
            GoalStatus::Achieved => "achieved".to_string(),
            GoalStatus::OnTrack => "on track".to_string(),
            GoalStatus::AtRisk => format!("at risk, needs ${:.2}/month more", g.contribution_shortfall),
            GoalStatus::OffTrack => format!("off track, needs ${:.2}/month more", g.contribution_shortfall),
        };
        let _ = write!(out, "\n- {} is {:.0}% funded, {}.", g.name, g.progress_pct, status);
    }
    out
}

fn risk(ctx: &ClientContext) -> String {
    let mut out = format!(
        "{} is profiled {} ({}/10), last assessed {}.",
        ctx.client_name, ctx.risk_category, ctx.risk_score, ctx.risk_assessed
    );
    if ctx.suitability.findings.is_empty() {
        out.push_str(" There are no suitability findings.");
    } else {
        for f in &ctx.suitability.findings {
            let _ = write!(out, "\n- [{}] {}", f.severity, f.message);
        }
    }
    out
}

fn cash(ctx: &ClientContext) -> String {
    let current = ctx.drift.row(AssetClass::Cash).map(|r| r.current_pct).unwrap_or(0.0);
    let target = ctx.drift.row(AssetClass::Cash).map(|r| r.target_pct).unwrap_or(0.0);
    format!(
        "{} has ${:.2} in cash, {:.1}% of the portfolio against a {:.1}% model target.",
        ctx.client_name, ctx.summary.cash, current, target
    )
}

fn orders(client: &Client, ctx: &ClientContext, cfg: &AnalyticsConfig) -> String {
    let proposed = rebalance_orders(client, &model_for(&client.risk_profile), cfg, Utc::now());
    if proposed.is_empty() {
        return format!(
            "No trades are needed to bring {} back to the {} model.",
            ctx.client_name, ctx.drift.model
        );
    }

    let mut out = format!(
        "Rebalancing {} to the {} model takes {} trades:",
        ctx.client_name,
        ctx.drift.model,
        proposed.len()
    );
    for o in &proposed {
        let _ = write!(out, "\n- {} {} {} (${:.2})", o.side, o.quantity, o.symbol, o.amount);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::seed::demo_clients;
    use chrono::NaiveDate;

    fn ctx_for(index: usize) -> (Client, ClientContext) {
        let client = demo_clients().remove(index);
        let today = NaiveDate::from_ymd_opt(2026, 10, 15).unwrap();
        let ctx = ClientContext::gather(&client, today, &AnalyticsConfig::default());
        (client, ctx)
    }

    #[test]
    fn test_classify_intents() {
        assert_eq!(Intent::classify("Should we rebalance?"), Intent::Rebalance);
        assert_eq!(Intent::classify("What trades would that take?"), Intent::Orders);
        assert_eq!(Intent::classify("Is the RETIREMENT goal on track?"), Intent::Goals);
        assert_eq!(Intent::classify("Can they afford to buy a home?"), Intent::Goals);
        assert_eq!(Intent::classify("Should we sell VTI for the house?"), Intent::Goals);
        assert_eq!(Intent::classify("Buy more bonds?"), Intent::Orders);
        assert_eq!(Intent::classify("Any suitability concerns?"), Intent::Risk);
        assert_eq!(Intent::classify("how much idle cash"), Intent::Cash);
        assert_eq!(Intent::classify("Tell me about this client"), Intent::Summary);
        assert_eq!(Intent::classify(""), Intent::Summary);
    }

    #[test]
    fn test_rebalance_answer_names_model() {
        let (client, ctx) = ctx_for(0);
        let text = answer(Intent::Rebalance, &client, &ctx, &AnalyticsConfig::default());
        assert!(text.contains("Income & Stability"));
        assert!(text.contains("Equity is the largest gap"));
    }

    #[test]
    fn test_goals_answer_lists_each_goal() {
        let (client, ctx) = ctx_for(1);
        let text = answer(Intent::Goals, &client, &ctx, &AnalyticsConfig::default());
        assert!(text.starts_with("David Okafor has 3 goals:"));
        assert!(text.contains("Emergency fund"));
        assert!(text.contains("First home down payment"));
    }

    #[test]
    fn test_orders_answer_lists_trades() {
        let (client, ctx) = ctx_for(0);
        let text = answer(Intent::Orders, &client, &ctx, &AnalyticsConfig::default());
        assert!(text.contains("SELL"));
        assert!(text.contains("BUY"));
    }

    #[test]
    fn test_risk_answer_reports_findings() {
        let (client, ctx) = ctx_for(2);
        let text = answer(Intent::Risk, &client, &ctx, &AnalyticsConfig::default());
        assert!(text.contains("Aggressive"));
        assert!(text.contains("NVDA"));
    }

    #[test]
    fn test_brief_includes_talking_points() {
        let (_, ctx) = ctx_for(0);
        let text = brief(&ctx);
        assert!(text.starts_with("Meeting brief for Margaret Chen."));
        assert!(text.contains("Talking points:"));
    }
}
