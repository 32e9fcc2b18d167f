//! End-to-end advisor workflows: seed, analyse, rebalance, execute,
//! persist, and ask the copilot.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::path::PathBuf;

use wealthdesk::analytics::allocation::portfolio_value;
use wealthdesk::analytics::drift::{drift_report, model_for, rebalance_orders};
use wealthdesk::analytics::goals::goal_order;
use wealthdesk::analytics::optimize::optimize_goals;
use wealthdesk::config::AnalyticsConfig;
use wealthdesk::copilot::{Copilot, Intent};
use wealthdesk::data::seed::demo_clients;
use wealthdesk::orders::SimulatedExecutor;
use wealthdesk::recommend::RecommendationEngine;
use wealthdesk::storage::{JsonFileStore, WealthStore};
use wealthdesk::types::{ActionKind, AnswerSource, OrderSide, OrderStatus, Priority};

use crate::mock_host::MockHost;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
}

fn temp_store_path() -> PathBuf {
    let mut p = std::env::temp_dir();
    p.push(format!("wealthdesk_it_{}.json", uuid::Uuid::new_v4()));
    p
}

#[test]
fn test_rebalance_execute_and_persist() {
    let path = temp_store_path();
    let cfg = AnalyticsConfig::default();

    {
        let store = WealthStore::new(Box::new(JsonFileStore::open(&path).unwrap()));
        assert!(store.seed_if_empty(&demo_clients()).unwrap());

        let mut client = store.client("c-001").unwrap();
        let before = drift_report(&client, &cfg);
        assert!(before.needs_rebalance);
        let value_before = portfolio_value(&client);

        let mut orders = rebalance_orders(&client, &model_for(&client.risk_profile), &cfg, Utc::now());
        assert!(orders.iter().any(|o| o.side == OrderSide::Sell));
        assert!(orders.iter().any(|o| o.side == OrderSide::Buy));
        store.add_orders(&client.id, &orders).unwrap();

        let report = SimulatedExecutor::new().execute_batch(&mut client, &mut orders, Utc::now());
        assert!(report.failed.is_empty(), "{:?}", report.failed);
        assert_eq!(report.filled.len(), orders.len());
        assert!(orders.iter().all(|o| o.status == OrderStatus::Filled));

        // Trades move value between classes; the total only shifts by rounding.
        let value_after = portfolio_value(&client);
        assert!((value_after - value_before).abs() < Decimal::ONE);

        let after = drift_report(&client, &cfg);
        assert!(after.total_drift < 1.0, "drift after rebalance {}", after.total_drift);
        assert!(!after.needs_rebalance);

        store.save_client(&client).unwrap();
        store.save_orders(&client.id, &orders).unwrap();
    }

    // Everything survives a reopen.
    let store = WealthStore::new(Box::new(JsonFileStore::open(&path).unwrap()));
    assert_eq!(store.list_clients().unwrap().len(), 5);
    let client = store.client("c-001").unwrap();
    assert!(!drift_report(&client, &cfg).needs_rebalance);
    let orders = store.orders("c-001").unwrap();
    assert!(!orders.is_empty());
    assert!(orders.iter().all(|o| o.status == OrderStatus::Filled));

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_book_alerts_cover_each_check() {
    let engine = RecommendationEngine::new(AnalyticsConfig::default());
    let alerts = engine.book_alerts(&demo_clients(), today());

    let kinds: Vec<ActionKind> = alerts.iter().map(|a| a.kind).collect();
    assert!(kinds.contains(&ActionKind::Rebalance));
    assert!(kinds.contains(&ActionKind::RefreshRiskProfile));
    assert!(kinds.contains(&ActionKind::InvestCash));
    assert!(kinds.contains(&ActionKind::ReduceConcentration));
    assert!(kinds.contains(&ActionKind::IncreaseContribution));

    assert_eq!(alerts[0].priority, Priority::High);
    assert!(alerts.windows(2).all(|w| w[0].priority <= w[1].priority));
}

#[test]
fn test_conservative_client_is_quiet() {
    let engine = RecommendationEngine::new(AnalyticsConfig::default());
    let whitfield = demo_clients().into_iter().find(|c| c.id == "c-004").unwrap();
    let (actions, decisions) = engine.next_best_actions(&whitfield, today());

    assert!(actions.iter().all(|a| a.kind != ActionKind::RefreshRiskProfile));
    assert!(actions.iter().all(|a| a.kind != ActionKind::IncreaseContribution));
    assert!(decisions.iter().any(|d| !d.triggered));
}

#[test]
fn test_goal_dependencies_drive_funding() {
    let okafor = demo_clients().into_iter().find(|c| c.id == "c-002").unwrap();

    let order: Vec<&str> = goal_order(&okafor.goals)
        .unwrap()
        .into_iter()
        .map(|g| g.id.as_str())
        .collect();
    let emg = order.iter().position(|id| *id == "g-oka-emg").unwrap();
    let home = order.iter().position(|id| *id == "g-oka-home").unwrap();
    assert!(emg < home);

    let plan = optimize_goals(&okafor, today()).unwrap();
    assert_eq!(plan.plan[0].goal_id, order[0]);
    let allocated: Decimal = plan.plan.iter().map(|p| p.allocated).sum();
    assert_eq!(allocated + plan.unallocated, okafor.monthly_surplus);
}

#[tokio::test]
async fn test_copilot_grounds_prompt_and_records_history() {
    let host = MockHost::with_replies(&["Equity is well above the Income & Stability model."]);
    let copilot = Copilot::new(Some(Box::new(host.clone())), AnalyticsConfig::default());
    let store = WealthStore::in_memory();
    store.seed_if_empty(&demo_clients()).unwrap();
    let client = store.client("c-001").unwrap();

    let answer = copilot
        .converse(&store, &client, "Should we rebalance Margaret?", today())
        .await
        .unwrap();
    assert_eq!(answer.source, AnswerSource::Host);
    assert_eq!(answer.intent, Intent::Rebalance);

    let prompts = host.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("CLIENT: Margaret Chen (c-001)"));
    assert!(prompts[0].contains("Income & Stability"));
    assert!(prompts[0].contains("ADVISOR QUESTION: Should we rebalance Margaret?"));

    // Scripted replies are exhausted: the empty reply falls back.
    let answer = copilot.converse(&store, &client, "Any idle cash?", today()).await.unwrap();
    assert_eq!(answer.source, AnswerSource::Fallback);
    assert_eq!(answer.intent, Intent::Cash);

    let history = store.chat_history("c-001").unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1].source, AnswerSource::Host);
    assert_eq!(history[3].source, AnswerSource::Fallback);
}

#[tokio::test]
async fn test_copilot_host_failure_falls_back() {
    let host = MockHost::new();
    host.set_error("HTTP 503: unavailable");
    let copilot = Copilot::new(Some(Box::new(host.clone())), AnalyticsConfig::default());
    let rivera = demo_clients().into_iter().find(|c| c.id == "c-003").unwrap();

    let brief = copilot.meeting_brief(&rivera, today()).await;
    assert_eq!(brief.source, AnswerSource::Fallback);
    assert!(brief.text.contains("Alex Rivera"));
    assert_eq!(host.prompts().len(), 1);
}
