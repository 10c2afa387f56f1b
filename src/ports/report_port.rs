//! Report generation port trait.

use crate::domain::advisor::RecommendationBundle;
use crate::domain::aggregator::PortfolioSummary;
use crate::domain::error::BandcostError;
use std::path::Path;

/// Port for writing portfolio reports.
pub trait ReportPort {
    fn write(
        &self,
        portfolio: &PortfolioSummary,
        suggestions: &[RecommendationBundle],
        output_path: &Path,
    ) -> Result<(), BandcostError>;
}
