//! Rule-based strategy advisor.
//!
//! Pure threshold lookups over the aggregated portfolio: price zones,
//! accumulation batching, band-trade guidance, fund sufficiency,
//! negative-cost progress, risk tags, a completion estimate and a fixed
//! four-step action list. Display rounding is part of the contract:
//! percentages to one decimal, currency to two.

use serde::Serialize;
use std::fmt;

use super::aggregator::{InstrumentReport, PortfolioSummary};

/// Minimum holding before band trades are worth running.
pub const MIN_BAND_SHARES: i64 = 10;

/// Buffer applied to accumulation cost for slippage and fees.
pub const SLIPPAGE_BUFFER: f64 = 1.02;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Danger,
    Warning,
    Info,
    Success,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceZone {
    FarAboveCost,
    AboveCost,
    NearCost,
    BelowCost,
    FarBelowCost,
}

impl PriceZone {
    pub fn classify(price_vs_cost: f64) -> Self {
        if price_vs_cost > 0.15 {
            PriceZone::FarAboveCost
        } else if price_vs_cost > 0.05 {
            PriceZone::AboveCost
        } else if price_vs_cost > -0.05 {
            PriceZone::NearCost
        } else if price_vs_cost > -0.15 {
            PriceZone::BelowCost
        } else {
            PriceZone::FarBelowCost
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            PriceZone::FarAboveCost => Severity::Danger,
            PriceZone::AboveCost => Severity::Warning,
            PriceZone::NearCost => Severity::Info,
            PriceZone::BelowCost | PriceZone::FarBelowCost => Severity::Success,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriceZone::FarAboveCost => "price is running high, wait for a pullback",
            PriceZone::AboveCost => "price is moderately above cost",
            PriceZone::NearCost => "price is fair",
            PriceZone::BelowCost => "price is below cost, a dip-buying window",
            PriceZone::FarBelowCost => "price is deeply below cost, exceptional entry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceAssessment {
    /// Deviation of the last price from average cost, in percent.
    pub deviation_pct: f64,
    pub zone: PriceZone,
    pub severity: Severity,
    pub label: &'static str,
    pub advice: String,
}

pub fn assess_price(last_price: f64, avg_cost: f64) -> PriceAssessment {
    let price_vs_cost = price_vs_cost(last_price, avg_cost);
    let zone = PriceZone::classify(price_vs_cost);
    let advice = match zone {
        PriceZone::FarAboveCost => format!(
            "current price is {:.1}% above cost, wait for a pullback below ${:.2}",
            price_vs_cost * 100.0,
            avg_cost * 1.05
        ),
        PriceZone::AboveCost => format!(
            "price is {:.1}% above cost, buy small or wait for a better entry",
            price_vs_cost * 100.0
        ),
        PriceZone::NearCost => "price is close to the average cost, a good moment to buy".to_string(),
        PriceZone::BelowCost => format!(
            "price is {:.1}% below cost, buy actively",
            price_vs_cost.abs() * 100.0
        ),
        PriceZone::FarBelowCost => format!(
            "price is {:.1}% below cost, a strong case for buying in size",
            price_vs_cost.abs() * 100.0
        ),
    };
    PriceAssessment {
        deviation_pct: price_vs_cost * 100.0,
        zone,
        severity: zone.severity(),
        label: zone.label(),
        advice,
    }
}

fn price_vs_cost(last_price: f64, avg_cost: f64) -> f64 {
    if avg_cost > 0.0 {
        (last_price - avg_cost) / avg_cost
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AccumulationPlan {
    pub shares_needed: i64,
    pub priority: Priority,
    pub summary: String,
    pub action: String,
}

pub fn plan_accumulation(target_shares: i64, current_shares: i64) -> AccumulationPlan {
    let shares_needed = (target_shares - current_shares).max(0);
    let (priority, summary, action) = if shares_needed == 0 {
        (
            Priority::Low,
            "target holding reached".to_string(),
            "start band operations to work the cost down".to_string(),
        )
    } else if shares_needed <= 10 {
        (
            Priority::High,
            format!("close to target, {shares_needed} shares to go"),
            format!("buy the remaining {shares_needed} shares in one order"),
        )
    } else if shares_needed <= 30 {
        (
            Priority::Medium,
            format!("medium-term target, {shares_needed} shares to go"),
            format!(
                "buy in 3 batches of {} shares, one to two weeks apart",
                shares_needed / 3
            ),
        )
    } else {
        (
            Priority::Medium,
            format!("long-term target, {shares_needed} shares to go"),
            format!(
                "buy in 6 batches of {} shares, one batch per month",
                shares_needed / 6
            ),
        )
    };
    AccumulationPlan {
        shares_needed,
        priority,
        summary,
        action,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandGuidance {
    pub advice: String,
    pub detail: String,
    pub profit_estimate: String,
}

pub fn band_guidance(
    current_shares: i64,
    last_price: f64,
    avg_cost: f64,
) -> BandGuidance {
    if current_shares < MIN_BAND_SHARES {
        return BandGuidance {
            advice: "holding is too small, accumulate before running band trades".to_string(),
            detail: "band trades on a small position earn little, build it to 20 shares or more first"
                .to_string(),
            profit_estimate: "band operations unsuitable right now".to_string(),
        };
    }

    let deviation = price_vs_cost(last_price, avg_cost);
    if deviation > 0.1 {
        let sell_shares = (current_shares / 3).min(8);
        let expected = sell_shares as f64 * last_price * 0.1;
        BandGuidance {
            advice: format!("sell {sell_shares} shares for a band round trip"),
            detail: format!(
                "target sell price ${:.2}, buy back around ${:.2}",
                last_price * 1.05,
                last_price * 0.95
            ),
            profit_estimate: format!("expected profit per round trip: ${expected:.2}"),
        }
    } else if deviation < -0.1 {
        BandGuidance {
            advice: "price is depressed, hold and wait for the rebound".to_string(),
            detail: format!(
                "wait for the price to recover above ${:.2} before selling",
                avg_cost * 1.1
            ),
            profit_estimate: "band operations unsuitable right now".to_string(),
        }
    } else {
        let sell_shares = (current_shares / 4).min(5);
        let expected = sell_shares as f64 * last_price * 0.08;
        BandGuidance {
            advice: format!("room for a small band trade, sell {sell_shares} shares"),
            detail: "conservative target: sell into an 8% rise, buy back on an 8% dip".to_string(),
            profit_estimate: format!("expected profit: ${expected:.2}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FundingAssessment {
    /// Cost of finishing the accumulation, slippage buffer included.
    pub funds_needed: f64,
    pub advice: String,
    pub strategy: String,
}

pub fn assess_funding(
    shares_needed: i64,
    last_price: f64,
    available_funds: f64,
) -> FundingAssessment {
    let funds_needed = shares_needed as f64 * last_price * SLIPPAGE_BUFFER;
    let (advice, strategy) = if available_funds > funds_needed * 1.5 {
        (
            "funds are ample, the accumulation target is affordable now",
            "deploy in one go and put the remainder toward other instruments",
        )
    } else if available_funds > funds_needed {
        (
            "funds roughly cover the accumulation target",
            "deploy in 2-3 batches and keep a reserve for opportunities",
        )
    } else if available_funds > funds_needed * 0.5 {
        (
            "funds are limited, stage the buying",
            "deploy half now and let band profits fund the rest",
        )
    } else {
        (
            "funds are insufficient, more band profit is needed",
            "focus on band operations to raise funds before accumulating further",
        )
    };
    FundingAssessment {
        funds_needed,
        advice: advice.to_string(),
        strategy: strategy.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NegativeCostOutlook {
    pub progress_pct: f64,
    pub remaining_profit_needed: f64,
    pub severity: Severity,
    pub advice: String,
    pub detail: String,
}

pub fn negative_cost_outlook(band_profit: f64, initial_investment: f64) -> NegativeCostOutlook {
    let progress_pct = if initial_investment > 0.0 {
        band_profit / initial_investment * 100.0
    } else {
        0.0
    };
    let remaining = (initial_investment - band_profit).max(0.0);

    let (severity, advice, detail) = if progress_pct >= 100.0 {
        (
            Severity::Success,
            "negative cost achieved".to_string(),
            "the holding was paid for by harvested profit, growth from here is pure gain"
                .to_string(),
        )
    } else if progress_pct >= 80.0 {
        (
            Severity::Warning,
            format!("close to negative cost, progress {progress_pct:.1}%"),
            format!("${remaining:.2} more band profit reaches negative cost"),
        )
    } else if progress_pct >= 50.0 {
        (
            Severity::Info,
            format!("negative-cost progress {progress_pct:.1}%"),
            format!("past the halfway mark, keep the band trades going, ${remaining:.2} to go"),
        )
    } else if progress_pct > 0.0 {
        (
            Severity::Info,
            format!("profit harvesting has started, progress {progress_pct:.1}%"),
            format!("a solid start, ${remaining:.2} of band profit still to earn"),
        )
    } else {
        (
            Severity::Secondary,
            "negative-cost strategy not started".to_string(),
            format!("begin band operations, the target is ${initial_investment:.2} of profit"),
        )
    };

    NegativeCostOutlook {
        progress_pct,
        remaining_profit_needed: remaining,
        severity,
        advice,
        detail,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskAssessment {
    pub volatility: RiskLevel,
    pub position: RiskLevel,
}

pub fn assess_risk(price_deviation: f64, position_progress: f64) -> RiskAssessment {
    let volatility = if price_deviation.abs() > 0.2 {
        RiskLevel::High
    } else if price_deviation.abs() > 0.1 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    let position = if position_progress > 0.8 {
        RiskLevel::High
    } else if position_progress > 0.4 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    };
    RiskAssessment { volatility, position }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CompletionEstimate {
    /// Months of steady deployment until the accumulation target is met.
    Months(f64),
    NeedsFunding,
}

impl fmt::Display for CompletionEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionEstimate::Months(months) => {
                write!(f, "roughly {months:.0} months to reach the accumulation target")
            }
            CompletionEstimate::NeedsFunding => {
                f.write_str("more funds are needed before a timeline makes sense")
            }
        }
    }
}

pub fn estimate_completion(
    shares_needed: i64,
    last_price: f64,
    available_funds: f64,
) -> CompletionEstimate {
    if shares_needed > 0 && available_funds > 0.0 {
        let outlay = shares_needed as f64 * last_price;
        let monthly_deployable = (available_funds / 6.0).min(outlay / 3.0);
        if monthly_deployable > 0.0 {
            return CompletionEstimate::Months((outlay / monthly_deployable).max(1.0));
        }
    }
    CompletionEstimate::NeedsFunding
}

/// The fixed four-step action list: price judgment, accumulation step,
/// band step, negative-cost step, always in that order.
pub fn action_steps(
    price_deviation: f64,
    shares_needed: i64,
    current_shares: i64,
    outlook: &NegativeCostOutlook,
) -> Vec<String> {
    let mut steps = Vec::with_capacity(4);

    steps.push(if price_deviation < -0.1 {
        "buy now: the price is well below cost".to_string()
    } else if price_deviation > 0.1 {
        "wait for a pullback: the price is running above cost".to_string()
    } else {
        "buy in moderation: the price is reasonable".to_string()
    });

    steps.push(if shares_needed > 0 {
        if shares_needed <= 10 {
            format!("finish accumulating: buy the last {shares_needed} shares in one order")
        } else {
            format!(
                "accumulate in batches: buy {} shares at a time",
                (shares_needed / 3).min(10)
            )
        }
    } else {
        "start band operations: the accumulation target is met".to_string()
    });

    steps.push(if current_shares >= MIN_BAND_SHARES {
        "harvest the band: sell part of the holding into a 10% rise".to_string()
    } else {
        "build the holding: accumulate before running band trades".to_string()
    });

    steps.push(if outlook.progress_pct < 100.0 {
        format!(
            "work toward negative cost: ${:.0} of band profit to go",
            outlook.remaining_profit_needed
        )
    } else {
        "enjoy the gains: the position is fully funded by harvested profit".to_string()
    });

    steps
}

/// Everything the presentation layer needs to advise on one instrument.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationBundle {
    pub code: String,
    pub name: String,
    pub last_price: f64,
    pub avg_cost: f64,
    pub current_shares: i64,
    pub target_shares: i64,
    pub band_profit: f64,
    pub initial_investment: f64,
    pub price: PriceAssessment,
    pub accumulation: AccumulationPlan,
    pub band: BandGuidance,
    pub funding: FundingAssessment,
    pub negative_cost: NegativeCostOutlook,
    pub risk: RiskAssessment,
    pub completion: CompletionEstimate,
    pub action_steps: Vec<String>,
}

pub fn recommend(report: &InstrumentReport, available_funds: f64) -> RecommendationBundle {
    let deviation = price_vs_cost(report.last_price, report.avg_cost);
    let price = assess_price(report.last_price, report.avg_cost);
    let accumulation = plan_accumulation(report.target_shares, report.current_shares);
    let shares_needed = accumulation.shares_needed;
    let band = band_guidance(report.current_shares, report.last_price, report.avg_cost);
    let funding = assess_funding(shares_needed, report.last_price, available_funds);
    let negative_cost = negative_cost_outlook(report.band_profit, report.initial_investment);
    let risk = assess_risk(deviation, report.progress);
    let completion = estimate_completion(shares_needed, report.last_price, available_funds);
    let action_steps = action_steps(deviation, shares_needed, report.current_shares, &negative_cost);

    RecommendationBundle {
        code: report.code.clone(),
        name: report.name.clone(),
        last_price: report.last_price,
        avg_cost: report.avg_cost,
        current_shares: report.current_shares,
        target_shares: report.target_shares,
        band_profit: report.band_profit,
        initial_investment: report.initial_investment,
        price,
        accumulation,
        band,
        funding,
        negative_cost,
        risk,
        completion,
        action_steps,
    }
}

/// One bundle per instrument, in portfolio order.
pub fn generate_suggestions(portfolio: &PortfolioSummary) -> Vec<RecommendationBundle> {
    portfolio
        .instruments
        .iter()
        .map(|report| recommend(report, portfolio.total_available_funds))
        .collect()
}
