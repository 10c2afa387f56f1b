//! Plain-text report adapter.
//!
//! Renders the portfolio summary and the advisor's recommendations into a
//! console-friendly report file.

use crate::domain::advisor::{Priority, RecommendationBundle, RiskLevel};
use crate::domain::aggregator::PortfolioSummary;
use crate::domain::error::BandcostError;
use crate::ports::report_port::ReportPort;
use std::fs;
use std::path::Path;

pub struct TextReportAdapter;

fn risk_word(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
    }
}

fn priority_word(priority: Priority) -> &'static str {
    match priority {
        Priority::Low => "low",
        Priority::Medium => "medium",
        Priority::High => "high",
    }
}

pub fn render(portfolio: &PortfolioSummary, suggestions: &[RecommendationBundle]) -> String {
    let mut out = String::new();

    out.push_str("=== Portfolio ===\n");
    for report in &portfolio.instruments {
        out.push_str(&format!(
            "{}  {} ({})  {}/{} shares  avg cost ${:.2}  price ${:.2}  value ${:.2}\n",
            report.code,
            report.name,
            report.market,
            report.current_shares,
            report.target_shares,
            report.avg_cost,
            report.last_price,
            report.current_value,
        ));
        out.push_str(&format!(
            "    total profit ${:.2}  band profit ${:.2}  fees ${:.2}  negative cost: {}\n",
            report.total_profit, report.band_profit, report.total_fees, report.status,
        ));
    }
    for skipped in &portfolio.skipped {
        out.push_str(&format!("{}  skipped: {}\n", skipped.code, skipped.reason));
    }

    out.push('\n');
    out.push_str(&format!(
        "Total band profit:     ${:.2}\n",
        portfolio.total_band_profit
    ));
    out.push_str(&format!(
        "Extra funds:           ${:.2}\n",
        portfolio.extra_funds
    ));
    out.push_str(&format!(
        "Total available funds: ${:.2}\n",
        portfolio.total_available_funds
    ));

    for bundle in suggestions {
        out.push('\n');
        out.push_str(&format!("=== {} ({}) ===\n", bundle.code, bundle.name));
        out.push_str(&format!(
            "price ${:.2} vs cost ${:.2} ({:+.1}%): {}\n",
            bundle.last_price, bundle.avg_cost, bundle.price.deviation_pct, bundle.price.label,
        ));
        out.push_str(&format!("  {}\n", bundle.price.advice));
        out.push_str(&format!(
            "holding: {} (priority {})\n",
            bundle.accumulation.summary,
            priority_word(bundle.accumulation.priority),
        ));
        out.push_str(&format!("  {}\n", bundle.accumulation.action));
        out.push_str(&format!("band: {}\n", bundle.band.advice));
        out.push_str(&format!("  {}\n", bundle.band.detail));
        out.push_str(&format!("  {}\n", bundle.band.profit_estimate));
        out.push_str(&format!(
            "funding: {} (needs ${:.2})\n",
            bundle.funding.advice, bundle.funding.funds_needed
        ));
        out.push_str(&format!("  {}\n", bundle.funding.strategy));
        out.push_str(&format!("negative cost: {}\n", bundle.negative_cost.advice));
        out.push_str(&format!("  {}\n", bundle.negative_cost.detail));
        out.push_str(&format!(
            "risk: volatility {}, position {}\n",
            risk_word(bundle.risk.volatility),
            risk_word(bundle.risk.position),
        ));
        out.push_str(&format!("timeline: {}\n", bundle.completion));
        out.push_str("steps:\n");
        for (i, step) in bundle.action_steps.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, step));
        }
    }

    out
}

impl ReportPort for TextReportAdapter {
    fn write(
        &self,
        portfolio: &PortfolioSummary,
        suggestions: &[RecommendationBundle],
        output_path: &Path,
    ) -> Result<(), BandcostError> {
        let content = render(portfolio, suggestions);
        fs::write(output_path, content)?;
        Ok(())
    }
}
