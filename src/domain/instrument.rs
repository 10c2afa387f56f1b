//! Instrument records and the typed post-creation patch.

use serde::Serialize;

/// A tracked stock. The `seed_*` fields capture the holding state at the
/// moment the instrument was added; everything the trade ledger can move
/// (share count, average cost, fees) is recomputed by replay and never
/// written back here.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Instrument {
    pub code: String,
    pub name: String,
    pub market: String,
    pub target_shares: i64,
    pub initial_investment: f64,
    pub seed_shares: i64,
    pub seed_avg_cost: f64,
    pub seed_fees: f64,
    pub last_price: f64,
}

impl Instrument {
    pub fn validate(&self) -> Result<(), InvalidInstrument> {
        if self.code.trim().is_empty() {
            return Err(InvalidInstrument::EmptyCode);
        }
        if self.target_shares < 0 {
            return Err(InvalidInstrument::NegativeTargetShares(self.target_shares));
        }
        if self.seed_shares < 0 {
            return Err(InvalidInstrument::NegativeSeedShares(self.seed_shares));
        }
        if self.seed_avg_cost < 0.0 || self.seed_fees < 0.0 || self.last_price < 0.0 {
            return Err(InvalidInstrument::NegativeAmount);
        }
        if self.initial_investment < 0.0 {
            return Err(InvalidInstrument::NegativeAmount);
        }
        Ok(())
    }
}

/// The only fields legitimately mutable after creation. Derived fields
/// (share count, average cost, fee total) have no counterpart here on
/// purpose: they come from the trade ledger.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstrumentPatch {
    pub name: Option<String>,
    pub market: Option<String>,
    pub target_shares: Option<i64>,
    pub initial_investment: Option<f64>,
    pub last_price: Option<f64>,
}

impl InstrumentPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.market.is_none()
            && self.target_shares.is_none()
            && self.initial_investment.is_none()
            && self.last_price.is_none()
    }

    pub fn validate(&self) -> Result<(), InvalidInstrument> {
        if let Some(target) = self.target_shares {
            if target < 0 {
                return Err(InvalidInstrument::NegativeTargetShares(target));
            }
        }
        if let Some(investment) = self.initial_investment {
            if investment < 0.0 {
                return Err(InvalidInstrument::NegativeAmount);
            }
        }
        if let Some(price) = self.last_price {
            if price < 0.0 {
                return Err(InvalidInstrument::NegativeAmount);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidInstrument {
    #[error("instrument code must not be empty")]
    EmptyCode,

    #[error("target share count must be non-negative, got {0}")]
    NegativeTargetShares(i64),

    #[error("seed share count must be non-negative, got {0}")]
    NegativeSeedShares(i64),

    #[error("monetary fields must be non-negative")]
    NegativeAmount,
}
