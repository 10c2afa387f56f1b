//! Engine entry points: the context object tying the ledger to the
//! accountant, aggregator and advisor.
//!
//! Built per call around a borrowed ledger; no shared state survives
//! between computations, and every call recomputes from the ledger
//! snapshot it is handed.

use super::accountant::{self, HoldingSummary, ReplayTrace};
use super::advisor::{self, RecommendationBundle};
use super::aggregator::{self, PortfolioSummary, SkippedInstrument};
use super::error::BandcostError;
use crate::ports::ledger_port::LedgerPort;

pub struct Engine<'a> {
    ledger: &'a dyn LedgerPort,
    trace: Option<&'a dyn ReplayTrace>,
}

impl<'a> Engine<'a> {
    pub fn new(ledger: &'a dyn LedgerPort) -> Self {
        Engine { ledger, trace: None }
    }

    pub fn with_trace(ledger: &'a dyn LedgerPort, trace: &'a dyn ReplayTrace) -> Self {
        Engine {
            ledger,
            trace: Some(trace),
        }
    }

    /// Replay one instrument's ledger. `Ok(None)` when the code is unknown;
    /// a ledger that fails integrity checks is an error, not a summary.
    pub fn summarize_instrument(
        &self,
        code: &str,
    ) -> Result<Option<HoldingSummary>, BandcostError> {
        let Some(instrument) = self.ledger.get_instrument(code)? else {
            return Ok(None);
        };
        let trades = self.ledger.get_trades(code)?;
        let summary = accountant::replay_traced(&instrument, &trades, self.trace)?;
        Ok(Some(summary))
    }

    /// Replay every instrument and fold the results into fleet totals.
    /// Instruments whose ledger cannot be replayed are reported in
    /// `skipped` instead of poisoning the whole portfolio.
    pub fn summarize_portfolio(&self) -> Result<PortfolioSummary, BandcostError> {
        let instruments = self.ledger.list_instruments()?;
        let extra_funds = self
            .ledger
            .get_fund_pool()?
            .map(|pool| pool.extra_funds)
            .unwrap_or(0.0);

        let mut reports = Vec::with_capacity(instruments.len());
        let mut skipped = Vec::new();
        for instrument in &instruments {
            let trades = self.ledger.get_trades(&instrument.code)?;
            match accountant::replay_traced(instrument, &trades, self.trace) {
                Ok(summary) => reports.push(aggregator::enrich(instrument, &summary)),
                Err(err) => skipped.push(SkippedInstrument {
                    code: instrument.code.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        Ok(PortfolioSummary::assemble(reports, skipped, extra_funds))
    }

    /// One recommendation bundle per instrument, in portfolio order.
    pub fn generate_suggestions(&self) -> Result<Vec<RecommendationBundle>, BandcostError> {
        let portfolio = self.summarize_portfolio()?;
        Ok(advisor::generate_suggestions(&portfolio))
    }
}
