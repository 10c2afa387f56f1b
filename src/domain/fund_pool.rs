//! Externally supplied capital, tracked apart from band profit.

use serde::Serialize;

/// The single logical pool of extra deployable capital. Updates
/// overwrite: the latest record wins, there is no history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FundPool {
    pub extra_funds: f64,
}

impl FundPool {
    pub fn new(extra_funds: f64) -> Self {
        FundPool { extra_funds }
    }
}
