//! Weighted-average-cost replay over an instrument's trade history.
//!
//! Folds the ordered trade ledger, starting from the instrument's seed
//! holding, into current shares, average cost, realized profit and band
//! profit. Average cost is classic weighted-average accounting: every buy
//! re-weights it, no sell ever moves it. Realized profit on a sell is
//! measured against the running average cost at that moment, not against
//! matched lots.

use chrono::NaiveDate;
use serde::Serialize;

use super::instrument::Instrument;
use super::trade::{Trade, TradeSide};

/// Per-instrument computed state. Ephemeral: recomputed from the ledger on
/// every call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingSummary {
    pub current_shares: i64,
    pub avg_cost: f64,
    /// Realized running profit. Capital deployed into the open position
    /// counts as negative profit-to-date.
    pub total_profit: f64,
    /// Realized profit from trades funded as band operations, floored at 0.
    pub band_profit: f64,
    pub total_cost: f64,
    pub total_fees: f64,
}

/// Fold state carried across the replay, exposed to [`ReplayTrace`]
/// observers after each trade. `band_profit` here is the raw running value;
/// the floor is applied only to the reported summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayState {
    pub current_shares: i64,
    pub buy_shares: i64,
    pub weighted_cost: f64,
    pub total_cost: f64,
    pub total_fees: f64,
    pub total_profit: f64,
    pub band_profit: f64,
}

impl ReplayState {
    fn seeded(instrument: &Instrument) -> Self {
        let seed_basis = if instrument.seed_shares > 0 {
            instrument.seed_shares as f64 * instrument.seed_avg_cost
        } else {
            0.0
        };
        ReplayState {
            current_shares: instrument.seed_shares,
            buy_shares: instrument.seed_shares,
            weighted_cost: seed_basis,
            total_cost: seed_basis,
            total_fees: instrument.seed_fees,
            total_profit: 0.0,
            band_profit: 0.0,
        }
    }

    fn apply(&mut self, trade: &Trade) -> Result<(), ReplayError> {
        let gross = trade.gross();
        self.total_fees += trade.fee;

        match trade.side {
            TradeSide::Buy => {
                let outflow = gross + trade.fee;
                self.current_shares += trade.shares;
                self.buy_shares += trade.shares;
                self.total_cost += outflow;
                // Fees stay out of the weighted basis: cost per share used
                // for future sell profit is price-only.
                self.weighted_cost += gross;
                self.total_profit -= outflow;
            }
            TradeSide::Sell => {
                if trade.shares > self.current_shares {
                    return Err(ReplayError::SellExceedsHoldings {
                        code: trade.code.clone(),
                        id: trade.id,
                        date: trade.date,
                        held: self.current_shares,
                        sold: trade.shares,
                    });
                }
                let inflow = gross - trade.fee;
                self.current_shares -= trade.shares;
                let avg_cost = self.weighted_cost / self.buy_shares.max(1) as f64;
                let realized = inflow - trade.shares as f64 * avg_cost;
                self.total_profit += realized;
                if trade.fund_source.is_band_operation() {
                    self.band_profit += realized;
                }
            }
        }
        Ok(())
    }

    fn into_summary(self, instrument: &Instrument) -> HoldingSummary {
        let avg_cost = if self.buy_shares > 0 {
            self.weighted_cost / self.buy_shares as f64
        } else {
            instrument.seed_avg_cost
        };
        HoldingSummary {
            current_shares: self.current_shares,
            avg_cost,
            total_profit: self.total_profit,
            band_profit: self.band_profit.max(0.0),
            total_cost: self.total_cost,
            total_fees: self.total_fees,
        }
    }
}

/// Observer hook for replay steps. The engine itself stays silent; a caller
/// that wants per-trade visibility (e.g. a verbose CLI) attaches one.
pub trait ReplayTrace {
    fn trade_applied(&self, trade: &Trade, state: &ReplayState);
}

/// Replay `trades` (already in ledger order: date ascending, insertion
/// order breaking ties) on top of the instrument's seed holding.
pub fn replay(instrument: &Instrument, trades: &[Trade]) -> Result<HoldingSummary, ReplayError> {
    replay_traced(instrument, trades, None)
}

pub fn replay_traced(
    instrument: &Instrument,
    trades: &[Trade],
    trace: Option<&dyn ReplayTrace>,
) -> Result<HoldingSummary, ReplayError> {
    let mut state = ReplayState::seeded(instrument);
    for trade in trades {
        state.apply(trade)?;
        if let Some(observer) = trace {
            observer.trade_applied(trade, &state);
        }
    }
    Ok(state.into_summary(instrument))
}

/// A sell larger than the current holding is a ledger integrity violation:
/// replay rejects it rather than letting the share count go negative.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReplayError {
    #[error(
        "sell of {sold} shares on {date} exceeds holding of {held} for {code} (trade {id})"
    )]
    SellExceedsHoldings {
        code: String,
        id: i64,
        date: NaiveDate,
        held: i64,
        sold: i64,
    },
}
