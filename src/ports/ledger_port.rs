//! Position ledger access port trait.

use crate::domain::error::BandcostError;
use crate::domain::fund_pool::FundPool;
use crate::domain::instrument::{Instrument, InstrumentPatch};
use crate::domain::trade::Trade;

/// Read/write access to the position ledger. The engine uses only the
/// read side; the write side serves the recording surface (CLI, CSV
/// import). Implementations are assumed single-writer per instrument.
pub trait LedgerPort {
    fn get_instrument(&self, code: &str) -> Result<Option<Instrument>, BandcostError>;

    /// All instruments, ordered by code.
    fn list_instruments(&self) -> Result<Vec<Instrument>, BandcostError>;

    /// Trades for one instrument in replay order: date ascending,
    /// insertion order breaking date ties.
    fn get_trades(&self, code: &str) -> Result<Vec<Trade>, BandcostError>;

    /// The current fund pool, absent before first initialization.
    fn get_fund_pool(&self) -> Result<Option<FundPool>, BandcostError>;

    /// Insert a new instrument; a duplicate code is a conflict error.
    fn add_instrument(&self, instrument: &Instrument) -> Result<(), BandcostError>;

    /// Apply a typed patch to an existing instrument. Derived fields have
    /// no representation in the patch and cannot be written.
    fn update_instrument(&self, code: &str, patch: &InstrumentPatch)
        -> Result<(), BandcostError>;

    /// Remove an instrument and cascade-delete its trades.
    fn remove_instrument(&self, code: &str) -> Result<(), BandcostError>;

    /// Record a trade; the ledger assigns and returns the id (the `id`
    /// field of the argument is ignored).
    fn add_trade(&self, trade: &Trade) -> Result<i64, BandcostError>;

    fn delete_trade(&self, id: i64) -> Result<(), BandcostError>;

    /// Overwrite the fund pool; the latest value wins.
    fn set_extra_funds(&self, amount: f64) -> Result<(), BandcostError>;
}
