//! Prompt construction.
//!
//! Everything the copilot says about a client is computed here first, so
//! the host LLM and the offline answers work from the same numbers.

use chrono::NaiveDate;
use std::fmt::Write;

use crate::analytics::allocation::{summarize, top_holdings, HoldingWeight, PortfolioSummary};
use crate::analytics::drift::{drift_report, DriftReport};
use crate::analytics::goals::{analyze_goals, GoalAnalysis};
use crate::analytics::suitability::{check_suitability, SuitabilityReport};
use crate::config::AnalyticsConfig;
use crate::recommend::RecommendationEngine;
use crate::types::{Client, NextBestAction};

/// Number of positions listed in the prompt.
const PROMPT_TOP_HOLDINGS: usize = 5;

/// Analytics snapshot of one client at one date.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub client_id: String,
    pub client_name: String,
    pub today: NaiveDate,
    pub risk_score: u8,
    pub risk_category: String,
    pub risk_assessed: NaiveDate,
    pub summary: PortfolioSummary,
    pub top_holdings: Vec<HoldingWeight>,
    pub drift: DriftReport,
    pub goals: Vec<GoalAnalysis>,
    pub suitability: SuitabilityReport,
    pub actions: Vec<NextBestAction>,
}

impl ClientContext {
    pub fn gather(client: &Client, today: NaiveDate, cfg: &AnalyticsConfig) -> Self {
        let engine = RecommendationEngine::new(cfg.clone());
        let (actions, _) = engine.next_best_actions(client, today);

        Self {
            client_id: client.id.clone(),
            client_name: client.name.clone(),
            today,
            risk_score: client.risk_profile.score,
            risk_category: client.risk_profile.category.to_string(),
            risk_assessed: client.risk_profile.last_assessed,
            summary: summarize(client),
            top_holdings: top_holdings(client, PROMPT_TOP_HOLDINGS),
            drift: drift_report(client, cfg),
            goals: analyze_goals(client, today, cfg),
            suitability: check_suitability(client, today, cfg),
            actions,
        }
    }
}

pub fn system_prompt() -> &'static str {
    "You are an assistant to a licensed financial advisor. You answer questions \
     about one client using only the data provided below.\n\n\
     RULES:\n\
     1. Quote figures exactly as given. Never invent holdings, balances or goals.\n\
     2. If the data does not answer the question, say so plainly.\n\
     3. Write for the advisor, not the client. Be concise: at most six sentences or a short list.\n\
     4. Do not give tax or legal advice. Flag suitability concerns when they are relevant."
}

/// Render the client snapshot as plain text.
pub fn render_context(ctx: &ClientContext) -> String {
    let mut out = String::with_capacity(2000);
    let s = &ctx.summary;

    let _ = writeln!(out, "CLIENT: {} ({})", ctx.client_name, ctx.client_id);
    let _ = writeln!(out, "DATE: {}", ctx.today);
    let _ = writeln!(
        out,
        "RISK PROFILE: score {}/10, {} (assessed {})",
        ctx.risk_score, ctx.risk_category, ctx.risk_assessed
    );
    let _ = writeln!(
        out,
        "PORTFOLIO: total ${:.2}, invested ${:.2}, cash ${:.2}, {} positions",
        s.total_value, s.invested_value, s.cash, s.positions
    );

    out.push_str("\nALLOCATION vs MODEL (");
    out.push_str(&ctx.drift.model);
    out.push_str("):\n");
    for row in &ctx.drift.rows {
        let _ = writeln!(
            out,
            "- {}: {:.1}% (target {:.1}%, {:+.1})",
            row.asset_class, row.current_pct, row.target_pct, row.delta_pct
        );
    }
    let _ = writeln!(
        out,
        "Total drift {:.1}%{}",
        ctx.drift.total_drift,
        if ctx.drift.needs_rebalance { ", rebalance recommended" } else { "" }
    );

    if !ctx.top_holdings.is_empty() {
        out.push_str("\nTOP HOLDINGS:\n");
        for h in &ctx.top_holdings {
            let _ = writeln!(out, "- {} {}: ${:.2} ({:.1}%)", h.symbol, h.name, h.value, h.weight_pct);
        }
    }

    if !ctx.goals.is_empty() {
        out.push_str("\nGOALS:\n");
        for g in &ctx.goals {
            let _ = writeln!(
                out,
                "- {}: {:.0}% funded, {:?}, {} months left, projected gap ${:.2}, needs ${:.2}/month",
                g.name, g.progress_pct, g.status, g.months_remaining, g.funding_gap, g.required_monthly
            );
        }
    }

    if !ctx.suitability.findings.is_empty() {
        out.push_str("\nSUITABILITY FINDINGS:\n");
        for f in &ctx.suitability.findings {
            let _ = writeln!(out, "- [{}] {}", f.severity, f.message);
        }
    }

    if !ctx.actions.is_empty() {
        out.push_str("\nRECOMMENDED ACTIONS:\n");
        for a in &ctx.actions {
            let _ = writeln!(out, "- {a}");
        }
    }

    out
}

/// Prompt for a free-form advisor question.
pub fn question_prompt(ctx: &ClientContext, question: &str) -> String {
    let mut prompt = render_context(ctx);
    prompt.push_str("\nADVISOR QUESTION: ");
    prompt.push_str(question.trim());
    prompt.push('\n');
    prompt
}

/// Prompt for a pre-meeting brief.
pub fn brief_prompt(ctx: &ClientContext) -> String {
    let mut prompt = render_context(ctx);
    prompt.push_str(
        "\nWrite a meeting brief for the advisor: a one-line overview, the two or \
         three most important talking points, and any compliance items to raise.\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::seed::demo_clients;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[test]
    fn test_system_prompt_not_empty() {
        let sp = system_prompt();
        assert!(sp.contains("advisor"));
        assert!(sp.contains("Never invent"));
    }

    #[test]
    fn test_context_renders_all_sections() {
        let client = demo_clients().remove(0);
        let ctx = ClientContext::gather(&client, today(), &AnalyticsConfig::default());
        let text = render_context(&ctx);

        assert!(text.contains("CLIENT: Margaret Chen (c-001)"));
        assert!(text.contains("RISK PROFILE: score 4/10"));
        assert!(text.contains("ALLOCATION vs MODEL"));
        assert!(text.contains("TOP HOLDINGS"));
        assert!(text.contains("Grandchildren's education"));
        assert!(text.contains("RECOMMENDED ACTIONS"));
    }

    #[test]
    fn test_question_prompt_appends_question() {
        let client = demo_clients().remove(1);
        let ctx = ClientContext::gather(&client, today(), &AnalyticsConfig::default());
        let prompt = question_prompt(&ctx, "  How much idle cash?  ");
        assert!(prompt.ends_with("ADVISOR QUESTION: How much idle cash?\n"));
    }

    #[test]
    fn test_brief_prompt_asks_for_brief() {
        let client = demo_clients().remove(2);
        let ctx = ClientContext::gather(&client, today(), &AnalyticsConfig::default());
        assert!(brief_prompt(&ctx).contains("meeting brief"));
    }
}
