//! CSV trade interchange adapter.
//!
//! Import format (header row required):
//! `date,side,shares,price,fee,fund_source,notes`; an empty fee cell
//! falls back to the configured default. Export prepends the instrument
//! code as the leading column.

use crate::domain::error::BandcostError;
use crate::domain::trade::{sort_for_replay, FundSource, Trade, TradeSide};
use chrono::NaiveDate;
use std::path::Path;

fn csv_err(line: usize, reason: impl ToString) -> BandcostError {
    BandcostError::Csv {
        line,
        reason: reason.to_string(),
    }
}

fn field<'a>(
    record: &'a csv::StringRecord,
    index: usize,
    name: &str,
    line: usize,
) -> Result<&'a str, BandcostError> {
    record
        .get(index)
        .ok_or_else(|| csv_err(line, format!("missing {name} column")))
}

/// Parse trades for one instrument from a CSV file. Ids are left at 0;
/// the ledger assigns them on insert. Rows are validated the same way the
/// interactive recording path validates them. A leading `code` column
/// (as written by [`export_trades`]) is recognized and skipped.
pub fn import_trades(
    path: &Path,
    code: &str,
    default_fee: f64,
) -> Result<Vec<Trade>, BandcostError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_err(1, e))?;

    let headers = reader.headers().map_err(|e| csv_err(1, e))?;
    let offset = usize::from(headers.get(0).is_some_and(|h| h.trim() == "code"));

    let mut trades = Vec::new();

    for (index, result) in reader.records().enumerate() {
        // Header occupies line 1.
        let line = index + 2;
        let record = result.map_err(|e| csv_err(line, e))?;

        let date_str = field(&record, offset, "date", line)?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| csv_err(line, format!("invalid date: {e}")))?;

        let side: TradeSide = field(&record, offset + 1, "side", line)?
            .parse()
            .map_err(|e| csv_err(line, e))?;

        let shares: i64 = field(&record, offset + 2, "shares", line)?
            .trim()
            .parse()
            .map_err(|e| csv_err(line, format!("invalid shares: {e}")))?;

        let price: f64 = field(&record, offset + 3, "price", line)?
            .trim()
            .parse()
            .map_err(|e| csv_err(line, format!("invalid price: {e}")))?;

        let fee_str = field(&record, offset + 4, "fee", line)?.trim();
        let fee: f64 = if fee_str.is_empty() {
            default_fee
        } else {
            fee_str
                .parse()
                .map_err(|e| csv_err(line, format!("invalid fee: {e}")))?
        };

        let fund_source = FundSource::parse(field(&record, offset + 5, "fund_source", line)?);
        let notes = record.get(offset + 6).unwrap_or("").to_string();

        let trade = Trade {
            id: 0,
            code: code.to_string(),
            date,
            side,
            shares,
            price,
            fee,
            fund_source,
            notes,
        };
        trade.validate().map_err(|e| csv_err(line, e))?;
        trades.push(trade);
    }

    Ok(trades)
}

/// Write trades to a CSV file in replay order, instrument code first.
pub fn export_trades(path: &Path, trades: &[Trade]) -> Result<(), BandcostError> {
    let mut sorted = trades.to_vec();
    sort_for_replay(&mut sorted);

    let mut writer = csv::Writer::from_path(path).map_err(|e| csv_err(1, e))?;
    writer
        .write_record([
            "code",
            "date",
            "side",
            "shares",
            "price",
            "fee",
            "fund_source",
            "notes",
        ])
        .map_err(|e| csv_err(1, e))?;

    for (index, trade) in sorted.iter().enumerate() {
        let row = [
            trade.code.clone(),
            trade.date.format("%Y-%m-%d").to_string(),
            trade.side.to_string(),
            trade.shares.to_string(),
            trade.price.to_string(),
            trade.fee.to_string(),
            trade.fund_source.to_string(),
            trade.notes.clone(),
        ];
        writer
            .write_record(&row)
            .map_err(|e| csv_err(index + 2, e))?;
    }

    writer.flush().map_err(BandcostError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn import_parses_rows() {
        let file = csv_file(
            "date,side,shares,price,fee,fund_source,notes\n\
             2025-03-10,buy,100,10.0,5.0,capital,opening buy\n\
             2025-03-12,sell,50,12.0,5.0,band,harvest\n",
        );
        let trades = import_trades(file.path(), "AAPL", 5.0).unwrap();

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].shares, 100);
        assert_eq!(trades[0].notes, "opening buy");
        assert_eq!(trades[1].side, TradeSide::Sell);
        assert!(trades[1].fund_source.is_band_operation());
    }

    #[test]
    fn import_empty_fee_uses_default() {
        let file = csv_file(
            "date,side,shares,price,fee,fund_source,notes\n\
             2025-03-10,buy,100,10.0,,capital,\n",
        );
        let trades = import_trades(file.path(), "AAPL", 7.5).unwrap();
        assert!((trades[0].fee - 7.5).abs() < f64::EPSILON);
    }

    #[test]
    fn import_reports_line_of_bad_side() {
        let file = csv_file(
            "date,side,shares,price,fee,fund_source,notes\n\
             2025-03-10,buy,100,10.0,5.0,capital,\n\
             2025-03-11,hold,100,10.0,5.0,capital,\n",
        );
        let err = import_trades(file.path(), "AAPL", 5.0).unwrap_err();
        match err {
            BandcostError::Csv { line, reason } => {
                assert_eq!(line, 3);
                assert!(reason.contains("hold"));
            }
            other => panic!("expected csv error, got {other}"),
        }
    }

    #[test]
    fn import_rejects_zero_shares() {
        let file = csv_file(
            "date,side,shares,price,fee,fund_source,notes\n\
             2025-03-10,buy,0,10.0,5.0,capital,\n",
        );
        let err = import_trades(file.path(), "AAPL", 5.0).unwrap_err();
        assert!(matches!(err, BandcostError::Csv { line: 2, .. }));
    }

    #[test]
    fn import_rejects_bad_date() {
        let file = csv_file(
            "date,side,shares,price,fee,fund_source,notes\n\
             10/03/2025,buy,100,10.0,5.0,capital,\n",
        );
        let err = import_trades(file.path(), "AAPL", 5.0).unwrap_err();
        assert!(matches!(err, BandcostError::Csv { line: 2, .. }));
    }

    #[test]
    fn export_then_import_round_trips() {
        let source = csv_file(
            "date,side,shares,price,fee,fund_source,notes\n\
             2025-03-10,buy,100,10.5,5.0,capital,opening\n\
             2025-03-12,sell,40,12.25,5.0,band,harvest\n",
        );
        let mut trades = import_trades(source.path(), "AAPL", 5.0).unwrap();
        // Assign ids the way a ledger would.
        for (i, trade) in trades.iter_mut().enumerate() {
            trade.id = i as i64 + 1;
        }

        let target = NamedTempFile::new().unwrap();
        export_trades(target.path(), &trades).unwrap();
        let reimported = import_trades(target.path(), "AAPL", 5.0).unwrap();

        assert_eq!(reimported.len(), 2);
        assert_eq!(reimported[0].date, trades[0].date);
        assert_eq!(reimported[0].shares, trades[0].shares);
        assert!((reimported[1].price - 12.25).abs() < f64::EPSILON);
        assert_eq!(reimported[1].notes, "harvest");
    }

    #[test]
    fn export_writes_replay_order() {
        let file = csv_file(
            "date,side,shares,price,fee,fund_source,notes\n\
             2025-03-12,buy,10,10.0,5.0,capital,later\n\
             2025-03-10,buy,10,10.0,5.0,capital,earlier\n",
        );
        let trades = import_trades(file.path(), "AAPL", 5.0).unwrap();

        let target = NamedTempFile::new().unwrap();
        export_trades(target.path(), &trades).unwrap();
        let reimported = import_trades(target.path(), "AAPL", 5.0).unwrap();

        assert_eq!(reimported[0].notes, "earlier");
        assert_eq!(reimported[1].notes, "later");
    }
}
