//! Allocation aggregation.
//!
//! Rolls holdings and cash up across accounts into asset-class and
//! sector weights.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::pct;
use crate::types::{AssetClass, Client};

/// Holdings weight after aggregating the same symbol across accounts.
#[derive(Debug, Clone, Serialize)]
pub struct HoldingWeight {
    pub symbol: String,
    pub name: String,
    pub asset_class: AssetClass,
    pub sector: String,
    pub value: Decimal,
    pub weight_pct: f64,
    pub risk_rating: u8,
}

/// Headline figures for a client's whole book.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSummary {
    pub total_value: Decimal,
    pub invested_value: Decimal,
    pub cash: Decimal,
    pub positions: usize,
    pub allocation: BTreeMap<AssetClass, f64>,
    pub sectors: BTreeMap<String, f64>,
}

/// Holdings market value plus cash across all accounts.
pub fn portfolio_value(client: &Client) -> Decimal {
    client.accounts.iter().map(|a| a.total_value()).sum()
}

/// Dollar value per asset class. Account cash counts as `Cash`.
/// Every class is present, even at zero.
pub fn asset_class_values(client: &Client) -> BTreeMap<AssetClass, Decimal> {
    let mut values: BTreeMap<AssetClass, Decimal> =
        AssetClass::ALL.iter().map(|c| (*c, Decimal::ZERO)).collect();

    for holding in client.holdings() {
        *values.entry(holding.asset_class).or_insert(Decimal::ZERO) += holding.market_value();
    }
    *values.entry(AssetClass::Cash).or_insert(Decimal::ZERO) += client.cash_balance();

    values
}

/// Percent of total value per asset class. An empty portfolio maps every
/// class to 0.
pub fn allocation_by_asset_class(client: &Client) -> BTreeMap<AssetClass, f64> {
    let total = portfolio_value(client);
    asset_class_values(client)
        .into_iter()
        .map(|(class, value)| (class, pct(value, total)))
        .collect()
}

/// Percent of invested (non-cash-balance) value per sector.
pub fn allocation_by_sector(client: &Client) -> BTreeMap<String, f64> {
    let invested: Decimal = client.holdings().map(|h| h.market_value()).sum();
    let mut by_sector: BTreeMap<String, Decimal> = BTreeMap::new();
    for holding in client.holdings() {
        *by_sector.entry(holding.sector.clone()).or_insert(Decimal::ZERO) += holding.market_value();
    }
    by_sector
        .into_iter()
        .map(|(sector, value)| (sector, pct(value, invested)))
        .collect()
}

/// Positions aggregated by symbol, weighted against total portfolio value,
/// sorted largest first.
pub fn holding_weights(client: &Client) -> Vec<HoldingWeight> {
    let total = portfolio_value(client);
    let mut by_symbol: HashMap<&str, HoldingWeight> = HashMap::new();

    for holding in client.holdings() {
        let entry = by_symbol
            .entry(holding.symbol.as_str())
            .or_insert_with(|| HoldingWeight {
                symbol: holding.symbol.clone(),
                name: holding.name.clone(),
                asset_class: holding.asset_class,
                sector: holding.sector.clone(),
                value: Decimal::ZERO,
                weight_pct: 0.0,
                risk_rating: holding.risk_rating,
            });
        entry.value += holding.market_value();
    }

    let mut weights: Vec<HoldingWeight> = by_symbol
        .into_values()
        .map(|mut w| {
            w.weight_pct = pct(w.value, total);
            w
        })
        .collect();
    weights.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.symbol.cmp(&b.symbol)));
    weights
}

/// The `n` largest positions.
pub fn top_holdings(client: &Client, n: usize) -> Vec<HoldingWeight> {
    let mut weights = holding_weights(client);
    weights.truncate(n);
    weights
}

pub fn summarize(client: &Client) -> PortfolioSummary {
    let cash = client.cash_balance();
    let total_value = portfolio_value(client);
    PortfolioSummary {
        total_value,
        invested_value: total_value - cash,
        cash,
        positions: holding_weights(client).len(),
        allocation: allocation_by_asset_class(client),
        sectors: allocation_by_sector(client),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::{Account, Holding, RiskProfile};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    pub(crate) fn holding(symbol: &str, class: AssetClass, sector: &str, value: Decimal) -> Holding {
        Holding {
            symbol: symbol.to_string(),
            name: format!("{symbol} fund"),
            asset_class: class,
            sector: sector.to_string(),
            quantity: value,
            price: dec!(1),
            risk_rating: 5,
        }
    }

    pub(crate) fn client_with(score: u8, cash: Decimal, holdings: Vec<Holding>) -> Client {
        Client {
            id: "c-test".into(),
            name: "Test Client".into(),
            email: "test@example.com".into(),
            segment: "mass-affluent".into(),
            advisor: "A. Advisor".into(),
            risk_profile: RiskProfile::new(score, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(), 15)
                .unwrap(),
            accounts: vec![Account {
                id: "acc-1".into(),
                name: "Brokerage".into(),
                kind: "taxable".into(),
                cash_balance: cash,
                holdings,
            }],
            goals: Vec::new(),
            monthly_surplus: dec!(1000),
            joined: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
        }
    }

    #[test]
    fn test_allocation_includes_cash_balance() {
        let client = client_with(
            5,
            dec!(1000),
            vec![
                holding("VTI", AssetClass::Equity, "Broad Market", dec!(6000)),
                holding("BND", AssetClass::FixedIncome, "Aggregate Bond", dec!(3000)),
            ],
        );
        let alloc = allocation_by_asset_class(&client);
        assert!((alloc[&AssetClass::Equity] - 60.0).abs() < 1e-9);
        assert!((alloc[&AssetClass::FixedIncome] - 30.0).abs() < 1e-9);
        assert!((alloc[&AssetClass::Cash] - 10.0).abs() < 1e-9);
        assert_eq!(alloc[&AssetClass::Alternatives], 0.0);
        assert_eq!(portfolio_value(&client), dec!(10000));
    }

    #[test]
    fn test_empty_portfolio_is_all_zero() {
        let client = client_with(5, Decimal::ZERO, Vec::new());
        let alloc = allocation_by_asset_class(&client);
        assert_eq!(alloc.len(), AssetClass::ALL.len());
        assert!(alloc.values().all(|v| *v == 0.0));
        assert!(allocation_by_sector(&client).is_empty());
        assert!(top_holdings(&client, 5).is_empty());
    }

    #[test]
    fn test_sector_weights_exclude_cash_balance() {
        let client = client_with(
            5,
            dec!(5000),
            vec![
                holding("XLK", AssetClass::Equity, "Technology", dec!(3000)),
                holding("XLV", AssetClass::Equity, "Healthcare", dec!(1000)),
            ],
        );
        let sectors = allocation_by_sector(&client);
        assert!((sectors["Technology"] - 75.0).abs() < 1e-9);
        assert!((sectors["Healthcare"] - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_holding_weights_aggregate_across_accounts() {
        let mut client = client_with(
            5,
            Decimal::ZERO,
            vec![holding("VTI", AssetClass::Equity, "Broad Market", dec!(4000))],
        );
        client.accounts.push(Account {
            id: "acc-2".into(),
            name: "IRA".into(),
            kind: "retirement".into(),
            cash_balance: Decimal::ZERO,
            holdings: vec![
                holding("VTI", AssetClass::Equity, "Broad Market", dec!(2000)),
                holding("BND", AssetClass::FixedIncome, "Aggregate Bond", dec!(4000)),
            ],
        });

        let weights = holding_weights(&client);
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].symbol, "VTI");
        assert_eq!(weights[0].value, dec!(6000));
        assert!((weights[0].weight_pct - 60.0).abs() < 1e-9);

        let top = top_holdings(&client, 1);
        assert_eq!(top.len(), 1);
    }

    #[test]
    fn test_summary() {
        let client = client_with(
            5,
            dec!(2500),
            vec![holding("VTI", AssetClass::Equity, "Broad Market", dec!(7500))],
        );
        let summary = summarize(&client);
        assert_eq!(summary.total_value, dec!(10000));
        assert_eq!(summary.invested_value, dec!(7500));
        assert_eq!(summary.cash, dec!(2500));
        assert_eq!(summary.positions, 1);
    }
}
