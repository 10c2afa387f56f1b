//! Portfolio-level aggregation of per-instrument replay results.

use serde::{Serialize, Serializer};
use std::fmt;

use super::accountant::HoldingSummary;
use super::instrument::Instrument;

/// Whether band profit has paid back the capital originally invested.
#[derive(Debug, Clone, PartialEq)]
pub enum NegativeCostStatus {
    Achieved,
    /// Percent of the initial investment recovered so far.
    Progress(f64),
    NotYet,
}

impl NegativeCostStatus {
    pub fn evaluate(band_profit: f64, initial_investment: f64) -> Self {
        if initial_investment > 0.0 && band_profit >= initial_investment {
            NegativeCostStatus::Achieved
        } else if initial_investment > 0.0 && band_profit > 0.0 {
            NegativeCostStatus::Progress(band_profit / initial_investment * 100.0)
        } else {
            NegativeCostStatus::NotYet
        }
    }
}

impl fmt::Display for NegativeCostStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegativeCostStatus::Achieved => f.write_str("achieved"),
            NegativeCostStatus::Progress(pct) => write!(f, "progress {pct:.1}%"),
            NegativeCostStatus::NotYet => f.write_str("not yet achieved"),
        }
    }
}

impl Serialize for NegativeCostStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One instrument's replay result enriched with its static fields and
/// market valuation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentReport {
    pub code: String,
    pub name: String,
    pub market: String,
    pub current_shares: i64,
    pub target_shares: i64,
    pub initial_investment: f64,
    pub avg_cost: f64,
    pub total_fees: f64,
    pub last_price: f64,
    pub current_value: f64,
    pub total_profit: f64,
    pub band_profit: f64,
    /// Fraction of the accumulation target held, 0 when no target is set.
    pub progress: f64,
    pub status: NegativeCostStatus,
}

pub fn enrich(instrument: &Instrument, summary: &HoldingSummary) -> InstrumentReport {
    let progress = if instrument.target_shares > 0 {
        summary.current_shares as f64 / instrument.target_shares as f64
    } else {
        0.0
    };
    InstrumentReport {
        code: instrument.code.clone(),
        name: instrument.name.clone(),
        market: instrument.market.clone(),
        current_shares: summary.current_shares,
        target_shares: instrument.target_shares,
        initial_investment: instrument.initial_investment,
        avg_cost: summary.avg_cost,
        total_fees: summary.total_fees,
        last_price: instrument.last_price,
        current_value: summary.current_shares as f64 * instrument.last_price,
        total_profit: summary.total_profit,
        band_profit: summary.band_profit,
        progress,
        status: NegativeCostStatus::evaluate(summary.band_profit, instrument.initial_investment),
    }
}

/// An instrument whose ledger could not be replayed. Kept alongside the
/// summaries rather than failing the whole portfolio, so one corrupt
/// ledger does not hide the rest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedInstrument {
    pub code: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioSummary {
    pub instruments: Vec<InstrumentReport>,
    pub skipped: Vec<SkippedInstrument>,
    pub total_band_profit: f64,
    pub extra_funds: f64,
    /// Capital considered earned and safe to redeploy: band profit across
    /// the fleet plus the external fund pool.
    pub total_available_funds: f64,
}

impl PortfolioSummary {
    pub fn assemble(
        instruments: Vec<InstrumentReport>,
        skipped: Vec<SkippedInstrument>,
        extra_funds: f64,
    ) -> Self {
        let total_band_profit: f64 = instruments.iter().map(|r| r.band_profit).sum();
        PortfolioSummary {
            instruments,
            skipped,
            total_band_profit,
            extra_funds,
            total_available_funds: total_band_profit + extra_funds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_instrument(code: &str) -> Instrument {
        Instrument {
            code: code.into(),
            name: "Apple".into(),
            market: "NASDAQ".into(),
            target_shares: 100,
            initial_investment: 1000.0,
            seed_shares: 0,
            seed_avg_cost: 0.0,
            seed_fees: 0.0,
            last_price: 12.0,
        }
    }

    fn sample_summary() -> HoldingSummary {
        HoldingSummary {
            current_shares: 50,
            avg_cost: 10.0,
            total_profit: -405.0,
            band_profit: 95.0,
            total_cost: 1005.0,
            total_fees: 10.0,
        }
    }

    #[test]
    fn status_achieved_when_band_profit_covers_investment() {
        let status = NegativeCostStatus::evaluate(1000.0, 1000.0);
        assert_eq!(status, NegativeCostStatus::Achieved);
        assert_eq!(status.to_string(), "achieved");
    }

    #[test]
    fn status_progress_reports_one_decimal() {
        let status = NegativeCostStatus::evaluate(500.0, 1000.0);
        assert_eq!(status.to_string(), "progress 50.0%");
    }

    #[test]
    fn status_not_yet_without_band_profit() {
        let status = NegativeCostStatus::evaluate(0.0, 1000.0);
        assert_eq!(status, NegativeCostStatus::NotYet);
        assert_eq!(status.to_string(), "not yet achieved");
    }

    #[test]
    fn status_not_yet_when_investment_is_zero() {
        // Without invested capital there is nothing to pay back, whatever
        // the band profit says.
        assert_eq!(
            NegativeCostStatus::evaluate(5000.0, 0.0),
            NegativeCostStatus::NotYet
        );
    }

    #[test]
    fn enrich_computes_value_and_progress() {
        let report = enrich(&sample_instrument("AAPL"), &sample_summary());
        assert_relative_eq!(report.current_value, 600.0);
        assert_relative_eq!(report.progress, 0.5);
        assert_eq!(report.status.to_string(), "progress 9.5%");
    }

    #[test]
    fn enrich_guards_zero_target() {
        let mut inst = sample_instrument("AAPL");
        inst.target_shares = 0;
        let report = enrich(&inst, &sample_summary());
        assert_relative_eq!(report.progress, 0.0);
    }

    #[test]
    fn assemble_sums_band_profit_and_funds() {
        let a = enrich(&sample_instrument("AAPL"), &sample_summary());
        let mut b_summary = sample_summary();
        b_summary.band_profit = 30.0;
        let b = enrich(&sample_instrument("MSFT"), &b_summary);

        let portfolio = PortfolioSummary::assemble(vec![a, b], Vec::new(), 200.0);
        assert_relative_eq!(portfolio.total_band_profit, 125.0);
        assert_relative_eq!(portfolio.extra_funds, 200.0);
        assert_relative_eq!(portfolio.total_available_funds, 325.0);
    }

    #[test]
    fn assemble_empty_portfolio() {
        let portfolio = PortfolioSummary::assemble(Vec::new(), Vec::new(), 0.0);
        assert!(portfolio.instruments.is_empty());
        assert_relative_eq!(portfolio.total_available_funds, 0.0);
    }

    #[test]
    fn status_serializes_as_display_string() {
        let json = serde_json::to_string(&NegativeCostStatus::Progress(50.0)).unwrap();
        assert_eq!(json, "\"progress 50.0%\"");
    }
}
