//! Seed clients.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{
    Account, AssetClass, Client, Goal, GoalPriority, GoalShare, Holding, ProgressPoint, RiskCategory,
    RiskProfile,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn profile(score: u8, assessed: NaiveDate, horizon: u32) -> RiskProfile {
    RiskProfile {
        score,
        category: RiskCategory::from_score(score).unwrap_or(RiskCategory::Moderate),
        last_assessed: assessed,
        time_horizon_years: horizon,
    }
}

fn holding(
    symbol: &str,
    name: &str,
    class: AssetClass,
    sector: &str,
    quantity: Decimal,
    price: Decimal,
    risk: u8,
) -> Holding {
    Holding {
        symbol: symbol.to_string(),
        name: name.to_string(),
        asset_class: class,
        sector: sector.to_string(),
        quantity,
        price,
        risk_rating: risk,
    }
}

fn account(id: &str, name: &str, kind: &str, cash: Decimal, holdings: Vec<Holding>) -> Account {
    Account {
        id: id.to_string(),
        name: name.to_string(),
        kind: kind.to_string(),
        cash_balance: cash,
        holdings,
    }
}

#[allow(clippy::too_many_arguments)]
fn goal(
    id: &str,
    name: &str,
    kind: &str,
    target: Decimal,
    current: Decimal,
    target_date: NaiveDate,
    monthly: Decimal,
    priority: GoalPriority,
) -> Goal {
    Goal {
        id: id.to_string(),
        name: name.to_string(),
        kind: kind.to_string(),
        target_amount: target,
        current_amount: current,
        target_date,
        monthly_contribution: monthly,
        priority,
        progress: Vec::new(),
        depends_on: Vec::new(),
        shared_with: Vec::new(),
    }
}

/// The demo book of business.
pub fn demo_clients() -> Vec<Client> {
    vec![chen(), okafor(), rivera(), whitfield(), nakamura()]
}

/// Moderately conservative retiree, equity-heavy after a long bull run and
/// with a risk profile overdue for review.
fn chen() -> Client {
    let mut education = goal(
        "g-chen-edu",
        "Grandchildren's education",
        "education",
        dec!(120000),
        dec!(38000),
        day(2034, 9, 1),
        dec!(400),
        GoalPriority::Important,
    );
    education.shared_with.push(GoalShare {
        member: "Lily Chen".into(),
        role: "viewer".into(),
    });

    Client {
        id: "c-001".into(),
        name: "Margaret Chen".into(),
        email: "margaret.chen@example.com".into(),
        segment: "hnw".into(),
        advisor: "Jordan Blake".into(),
        risk_profile: profile(4, day(2024, 3, 12), 8),
        accounts: vec![
            account(
                "a-001-ira",
                "Rollover IRA",
                "retirement",
                dec!(12500),
                vec![
                    holding("VTI", "Vanguard Total Stock Market ETF", AssetClass::Equity, "Broad Market", dec!(1450), dec!(285.40), 6),
                    holding("VXUS", "Vanguard Total International Stock ETF", AssetClass::Equity, "International", dec!(2100), dec!(64.10), 6),
                    holding("BND", "Vanguard Total Bond Market ETF", AssetClass::FixedIncome, "Aggregate Bond", dec!(2600), dec!(72.80), 3),
                ],
            ),
            account(
                "a-001-tax",
                "Joint Brokerage",
                "taxable",
                dec!(8200),
                vec![
                    holding("SCHD", "Schwab US Dividend Equity ETF", AssetClass::Equity, "Dividend", dec!(3200), dec!(27.90), 5),
                    holding("MUB", "iShares National Muni Bond ETF", AssetClass::FixedIncome, "Municipal Bond", dec!(900), dec!(106.50), 2),
                ],
            ),
        ],
        goals: vec![
            goal(
                "g-chen-ret",
                "Retirement income reserve",
                "retirement",
                dec!(900000),
                dec!(820000),
                day(2029, 1, 1),
                dec!(1000),
                GoalPriority::Essential,
            ),
            education,
        ],
        monthly_surplus: dec!(2500),
        joined: day(2012, 5, 4),
    }
}

/// Young family sitting on a large cash pile, saving for a first home once
/// the emergency fund is complete.
fn okafor() -> Client {
    let mut emergency = goal(
        "g-oka-emg",
        "Emergency fund",
        "emergency",
        dec!(36000),
        dec!(29000),
        day(2027, 6, 1),
        dec!(750),
        GoalPriority::Essential,
    );
    emergency.progress = vec![
        ProgressPoint { date: day(2025, 10, 1), amount: dec!(20500) },
        ProgressPoint { date: day(2026, 2, 1), amount: dec!(24000) },
        ProgressPoint { date: day(2026, 6, 1), amount: dec!(26800) },
        ProgressPoint { date: day(2026, 10, 1), amount: dec!(29000) },
    ];

    let mut home = goal(
        "g-oka-home",
        "First home down payment",
        "home",
        dec!(150000),
        dec!(41000),
        day(2029, 6, 1),
        dec!(1200),
        GoalPriority::Important,
    );
    home.depends_on.push("g-oka-emg".into());
    home.shared_with.push(GoalShare {
        member: "Priya Okafor".into(),
        role: "contributor".into(),
    });

    let college = goal(
        "g-oka-529",
        "Children's college",
        "education",
        dec!(180000),
        dec!(15500),
        day(2040, 9, 1),
        dec!(300),
        GoalPriority::Aspirational,
    );

    Client {
        id: "c-002".into(),
        name: "David Okafor".into(),
        email: "david.okafor@example.com".into(),
        segment: "mass-affluent".into(),
        advisor: "Jordan Blake".into(),
        risk_profile: profile(6, day(2026, 2, 20), 15),
        accounts: vec![
            account(
                "a-002-tax",
                "Family Brokerage",
                "taxable",
                dec!(68000),
                vec![
                    holding("VOO", "Vanguard S&P 500 ETF", AssetClass::Equity, "Large Cap", dec!(95), dec!(520.00), 6),
                    holding("AGG", "iShares Core US Aggregate Bond ETF", AssetClass::FixedIncome, "Aggregate Bond", dec!(300), dec!(98.70), 3),
                ],
            ),
            account(
                "a-002-529",
                "529 Plan",
                "education",
                dec!(0),
                vec![holding("VT", "Vanguard Total World Stock ETF", AssetClass::Equity, "Global", dec!(135), dec!(115.00), 6)],
            ),
        ],
        goals: vec![college, home, emergency],
        monthly_surplus: dec!(3200),
        joined: day(2021, 8, 16),
    }
}

/// Aggressive tech professional with a single-stock concentration from
/// employer grants.
fn rivera() -> Client {
    Client {
        id: "c-003".into(),
        name: "Alex Rivera".into(),
        email: "alex.rivera@example.com".into(),
        segment: "hnw".into(),
        advisor: "Sam Ortiz".into(),
        risk_profile: profile(9, day(2026, 5, 2), 25),
        accounts: vec![
            account(
                "a-003-tax",
                "Individual Brokerage",
                "taxable",
                dec!(9000),
                vec![
                    holding("NVDA", "NVIDIA Corp", AssetClass::Equity, "Technology", dec!(2400), dec!(128.50), 9),
                    holding("QQQ", "Invesco QQQ Trust", AssetClass::Equity, "Technology", dec!(210), dec!(480.20), 7),
                    holding("VWO", "Vanguard Emerging Markets ETF", AssetClass::Equity, "Emerging Markets", dec!(900), dec!(44.30), 8),
                ],
            ),
            account(
                "a-003-401k",
                "401(k)",
                "retirement",
                dec!(2500),
                vec![
                    holding("VTI", "Vanguard Total Stock Market ETF", AssetClass::Equity, "Broad Market", dec!(400), dec!(285.40), 6),
                    holding("BND", "Vanguard Total Bond Market ETF", AssetClass::FixedIncome, "Aggregate Bond", dec!(250), dec!(72.80), 3),
                ],
            ),
        ],
        goals: vec![goal(
            "g-riv-fire",
            "Financial independence at 50",
            "retirement",
            dec!(3000000),
            dec!(640000),
            day(2038, 1, 1),
            dec!(4500),
            GoalPriority::Important,
        )],
        monthly_surplus: dec!(6000),
        joined: day(2019, 11, 1),
    }
}

/// Conservative trust client close to her model, with a large cash reserve.
fn whitfield() -> Client {
    Client {
        id: "c-004".into(),
        name: "Eleanor Whitfield".into(),
        email: "eleanor.whitfield@example.com".into(),
        segment: "uhnw".into(),
        advisor: "Sam Ortiz".into(),
        risk_profile: profile(2, day(2026, 7, 15), 5),
        accounts: vec![account(
            "a-004-trust",
            "Family Trust",
            "trust",
            dec!(310000),
            vec![
                holding("VTI", "Vanguard Total Stock Market ETF", AssetClass::Equity, "Broad Market", dec!(1400), dec!(285.40), 6),
                holding("VXUS", "Vanguard Total International Stock ETF", AssetClass::Equity, "International", dec!(2000), dec!(64.10), 6),
                holding("BND", "Vanguard Total Bond Market ETF", AssetClass::FixedIncome, "Aggregate Bond", dec!(7000), dec!(72.80), 3),
                holding("MUB", "iShares National Muni Bond ETF", AssetClass::FixedIncome, "Municipal Bond", dec!(4500), dec!(106.50), 2),
                holding("TIP", "iShares TIPS Bond ETF", AssetClass::FixedIncome, "Inflation Protected", dec!(3300), dec!(109.20), 2),
                holding("IAU", "iShares Gold Trust", AssetClass::Alternatives, "Commodities", dec!(2100), dec!(48.00), 2),
            ],
        )],
        goals: vec![goal(
            "g-whi-legacy",
            "Charitable legacy gift",
            "legacy",
            dec!(250000),
            dec!(250000),
            day(2030, 12, 31),
            dec!(0),
            GoalPriority::Aspirational,
        )],
        monthly_surplus: dec!(0),
        joined: day(2008, 2, 11),
    }
}

/// Growth saver in a single Roth IRA, a few points off the model.
fn nakamura() -> Client {
    Client {
        id: "c-005".into(),
        name: "Kenji Nakamura".into(),
        email: "kenji.nakamura@example.com".into(),
        segment: "emerging-affluent".into(),
        advisor: "Jordan Blake".into(),
        risk_profile: profile(7, day(2026, 9, 1), 20),
        accounts: vec![account(
            "a-005-roth",
            "Roth IRA",
            "retirement",
            dec!(3000),
            vec![
                holding("VTI", "Vanguard Total Stock Market ETF", AssetClass::Equity, "Broad Market", dec!(100), dec!(285.40), 6),
                holding("VXUS", "Vanguard Total International Stock ETF", AssetClass::Equity, "International", dec!(300), dec!(64.10), 6),
                holding("SCHD", "Schwab US Dividend Equity ETF", AssetClass::Equity, "Dividend", dec!(700), dec!(27.90), 5),
                holding("BND", "Vanguard Total Bond Market ETF", AssetClass::FixedIncome, "Aggregate Bond", dec!(200), dec!(72.80), 3),
                holding("IAU", "iShares Gold Trust", AssetClass::Alternatives, "Commodities", dec!(150), dec!(48.00), 2),
            ],
        )],
        goals: vec![goal(
            "g-nak-sabb",
            "Sabbatical year",
            "travel",
            dec!(60000),
            dec!(30000),
            day(2030, 6, 1),
            dec!(800),
            GoalPriority::Important,
        )],
        monthly_surplus: dec!(1500),
        joined: day(2023, 4, 3),
    }
}
