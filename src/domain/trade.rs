//! Trade records: direction, quantity, pricing, fee, funding source.

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Flat brokerage fee applied when a trade is recorded without one.
pub const DEFAULT_TRADE_FEE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeSide {
    type Err = InvalidTrade;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "buy" => Ok(TradeSide::Buy),
            "sell" => Ok(TradeSide::Sell),
            other => Err(InvalidTrade::UnknownSide(other.to_string())),
        }
    }
}

/// Where the money for a trade came from. Band operations are the
/// round trips whose realized profit counts toward negative cost;
/// anything else is tracked but never credited to band profit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FundSource {
    BandOperation,
    NewCapital,
    Other(String),
}

impl FundSource {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "band" | "band-operation" | "band_operation" => FundSource::BandOperation,
            "capital" | "new-capital" | "new_capital" => FundSource::NewCapital,
            _ => FundSource::Other(s.trim().to_string()),
        }
    }

    pub fn is_band_operation(&self) -> bool {
        matches!(self, FundSource::BandOperation)
    }

    pub fn as_str(&self) -> &str {
        match self {
            FundSource::BandOperation => "band",
            FundSource::NewCapital => "capital",
            FundSource::Other(s) => s,
        }
    }
}

impl fmt::Display for FundSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    /// Assigned by the ledger on insert; insertion order breaks date ties
    /// during replay.
    pub id: i64,
    pub code: String,
    pub date: NaiveDate,
    pub side: TradeSide,
    pub shares: i64,
    pub price: f64,
    pub fee: f64,
    pub fund_source: FundSource,
    pub notes: String,
}

impl Trade {
    pub fn gross(&self) -> f64 {
        self.shares as f64 * self.price
    }

    /// Field validation applied at the recording boundary (CLI, CSV import).
    /// Replay assumes trades have already passed this.
    pub fn validate(&self) -> Result<(), InvalidTrade> {
        if self.shares <= 0 {
            return Err(InvalidTrade::NonPositiveShares(self.shares));
        }
        if self.price <= 0.0 {
            return Err(InvalidTrade::NonPositivePrice(self.price));
        }
        if self.fee < 0.0 {
            return Err(InvalidTrade::NegativeFee(self.fee));
        }
        Ok(())
    }
}

/// Sort into replay order: date ascending, insertion order ascending.
pub fn sort_for_replay(trades: &mut [Trade]) {
    trades.sort_by(|a, b| a.date.cmp(&b.date).then(a.id.cmp(&b.id)));
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum InvalidTrade {
    #[error("share quantity must be positive, got {0}")]
    NonPositiveShares(i64),

    #[error("price must be positive, got {0}")]
    NonPositivePrice(f64),

    #[error("fee must be non-negative, got {0}")]
    NegativeFee(f64),

    #[error("unknown trade side {0:?} (expected buy or sell)")]
    UnknownSide(String),
}
