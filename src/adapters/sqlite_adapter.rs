//! SQLite ledger adapter.
//!
//! Stores instruments, trades and the fund pool. Instrument rows hold the
//! seed fields only; derived holding state is recomputed by the engine on
//! every read path and never written back.

use crate::domain::error::BandcostError;
use crate::domain::fund_pool::FundPool;
use crate::domain::instrument::{Instrument, InstrumentPatch};
use crate::domain::trade::{FundSource, Trade, TradeSide};
use crate::ports::config_port::ConfigPort;
use crate::ports::ledger_port::LedgerPort;
use chrono::NaiveDate;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

const DEFAULT_DB_PATH: &str = "bandcost.db";

fn pool_err(e: r2d2::Error) -> BandcostError {
    BandcostError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> BandcostError {
    BandcostError::DatabaseQuery {
        reason: e.to_string(),
    }
}

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BandcostError> {
        let db_path = config
            .get_string("database", "path")
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let pool_size = config.get_int("database", "pool_size", 4) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        Ok(Self { pool })
    }

    pub fn in_memory() -> Result<Self, BandcostError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;
        Ok(Self { pool })
    }

    fn conn(
        &self,
    ) -> Result<r2d2::PooledConnection<SqliteConnectionManager>, BandcostError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), BandcostError> {
        let conn = self.conn()?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS instruments (
                code TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                market TEXT NOT NULL,
                target_shares INTEGER NOT NULL DEFAULT 100,
                initial_investment REAL NOT NULL DEFAULT 0,
                seed_shares INTEGER NOT NULL DEFAULT 0,
                seed_avg_cost REAL NOT NULL DEFAULT 0,
                seed_fees REAL NOT NULL DEFAULT 0,
                last_price REAL NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS trades (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT NOT NULL REFERENCES instruments(code),
                trade_date TEXT NOT NULL,
                side TEXT NOT NULL,
                shares INTEGER NOT NULL,
                price REAL NOT NULL,
                fee REAL NOT NULL DEFAULT 5,
                fund_source TEXT NOT NULL,
                notes TEXT NOT NULL DEFAULT '',
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_trades_code ON trades(code);
            CREATE TABLE IF NOT EXISTS fund_pool (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                extra_funds REAL NOT NULL DEFAULT 0,
                updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );",
        )
        .map_err(query_err)?;

        // Seed the fund pool so the latest-wins update always has a row.
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM fund_pool", [], |row| row.get(0))
            .map_err(query_err)?;
        if rows == 0 {
            conn.execute("INSERT INTO fund_pool (extra_funds) VALUES (0)", [])
                .map_err(query_err)?;
        }

        Ok(())
    }
}

fn instrument_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Instrument> {
    Ok(Instrument {
        code: row.get(0)?,
        name: row.get(1)?,
        market: row.get(2)?,
        target_shares: row.get(3)?,
        initial_investment: row.get(4)?,
        seed_shares: row.get(5)?,
        seed_avg_cost: row.get(6)?,
        seed_fees: row.get(7)?,
        last_price: row.get(8)?,
    })
}

fn trade_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Trade> {
    let date_str: String = row.get(2)?;
    let date = NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let side_str: String = row.get(3)?;
    let side: TradeSide =
        side_str
            .parse()
            .map_err(|e: crate::domain::trade::InvalidTrade| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
    let source_str: String = row.get(7)?;
    Ok(Trade {
        id: row.get(0)?,
        code: row.get(1)?,
        date,
        side,
        shares: row.get(4)?,
        price: row.get(5)?,
        fee: row.get(6)?,
        fund_source: FundSource::parse(&source_str),
        notes: row.get(8)?,
    })
}

const INSTRUMENT_COLUMNS: &str = "code, name, market, target_shares, initial_investment, \
     seed_shares, seed_avg_cost, seed_fees, last_price";

const TRADE_COLUMNS: &str = "id, code, trade_date, side, shares, price, fee, fund_source, notes";

impl LedgerPort for SqliteAdapter {
    fn get_instrument(&self, code: &str) -> Result<Option<Instrument>, BandcostError> {
        let conn = self.conn()?;
        let query = format!("SELECT {INSTRUMENT_COLUMNS} FROM instruments WHERE code = ?1");
        conn.query_row(&query, params![code], instrument_from_row)
            .optional()
            .map_err(query_err)
    }

    fn list_instruments(&self) -> Result<Vec<Instrument>, BandcostError> {
        let conn = self.conn()?;
        let query = format!("SELECT {INSTRUMENT_COLUMNS} FROM instruments ORDER BY code");
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let rows = stmt.query_map([], instrument_from_row).map_err(query_err)?;

        let mut instruments = Vec::new();
        for row in rows {
            instruments.push(row.map_err(query_err)?);
        }
        Ok(instruments)
    }

    fn get_trades(&self, code: &str) -> Result<Vec<Trade>, BandcostError> {
        let conn = self.conn()?;
        let query = format!(
            "SELECT {TRADE_COLUMNS} FROM trades WHERE code = ?1 \
             ORDER BY trade_date ASC, id ASC"
        );
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let rows = stmt
            .query_map(params![code], trade_from_row)
            .map_err(query_err)?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row.map_err(query_err)?);
        }
        Ok(trades)
    }

    fn get_fund_pool(&self) -> Result<Option<FundPool>, BandcostError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT extra_funds FROM fund_pool ORDER BY updated_at DESC, id DESC LIMIT 1",
            [],
            |row| Ok(FundPool::new(row.get(0)?)),
        )
        .optional()
        .map_err(query_err)
    }

    fn add_instrument(&self, instrument: &Instrument) -> Result<(), BandcostError> {
        instrument.validate()?;
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO instruments (code, name, market, target_shares, initial_investment, \
             seed_shares, seed_avg_cost, seed_fees, last_price) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                instrument.code,
                instrument.name,
                instrument.market,
                instrument.target_shares,
                instrument.initial_investment,
                instrument.seed_shares,
                instrument.seed_avg_cost,
                instrument.seed_fees,
                instrument.last_price,
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(BandcostError::DuplicateInstrument {
                    code: instrument.code.clone(),
                })
            }
            Err(e) => Err(query_err(e)),
        }
    }

    fn update_instrument(
        &self,
        code: &str,
        patch: &InstrumentPatch,
    ) -> Result<(), BandcostError> {
        patch.validate()?;
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        let exists: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM instruments WHERE code = ?1",
                params![code],
                |row| row.get(0),
            )
            .map_err(query_err)?;
        if exists == 0 {
            return Err(BandcostError::UnknownInstrument { code: code.into() });
        }

        if let Some(name) = &patch.name {
            tx.execute(
                "UPDATE instruments SET name = ?1 WHERE code = ?2",
                params![name, code],
            )
            .map_err(query_err)?;
        }
        if let Some(market) = &patch.market {
            tx.execute(
                "UPDATE instruments SET market = ?1 WHERE code = ?2",
                params![market, code],
            )
            .map_err(query_err)?;
        }
        if let Some(target_shares) = patch.target_shares {
            tx.execute(
                "UPDATE instruments SET target_shares = ?1 WHERE code = ?2",
                params![target_shares, code],
            )
            .map_err(query_err)?;
        }
        if let Some(initial_investment) = patch.initial_investment {
            tx.execute(
                "UPDATE instruments SET initial_investment = ?1 WHERE code = ?2",
                params![initial_investment, code],
            )
            .map_err(query_err)?;
        }
        if let Some(last_price) = patch.last_price {
            tx.execute(
                "UPDATE instruments SET last_price = ?1 WHERE code = ?2",
                params![last_price, code],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)
    }

    fn remove_instrument(&self, code: &str) -> Result<(), BandcostError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        tx.execute("DELETE FROM trades WHERE code = ?1", params![code])
            .map_err(query_err)?;
        let removed = tx
            .execute("DELETE FROM instruments WHERE code = ?1", params![code])
            .map_err(query_err)?;
        if removed == 0 {
            return Err(BandcostError::UnknownInstrument { code: code.into() });
        }

        tx.commit().map_err(query_err)
    }

    fn add_trade(&self, trade: &Trade) -> Result<i64, BandcostError> {
        trade.validate()?;
        if self.get_instrument(&trade.code)?.is_none() {
            return Err(BandcostError::UnknownInstrument {
                code: trade.code.clone(),
            });
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO trades (code, trade_date, side, shares, price, fee, fund_source, notes) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                trade.code,
                trade.date.format("%Y-%m-%d").to_string(),
                trade.side.as_str(),
                trade.shares,
                trade.price,
                trade.fee,
                trade.fund_source.as_str(),
                trade.notes,
            ],
        )
        .map_err(query_err)?;

        Ok(conn.last_insert_rowid())
    }

    fn delete_trade(&self, id: i64) -> Result<(), BandcostError> {
        let conn = self.conn()?;
        let removed = conn
            .execute("DELETE FROM trades WHERE id = ?1", params![id])
            .map_err(query_err)?;
        if removed == 0 {
            return Err(BandcostError::UnknownTrade { id });
        }
        Ok(())
    }

    fn set_extra_funds(&self, amount: f64) -> Result<(), BandcostError> {
        let conn = self.conn()?;
        let updated = conn
            .execute(
                "UPDATE fund_pool SET extra_funds = ?1, updated_at = CURRENT_TIMESTAMP \
                 WHERE id = (SELECT id FROM fund_pool ORDER BY updated_at DESC, id DESC LIMIT 1)",
                params![amount],
            )
            .map_err(query_err)?;
        if updated == 0 {
            conn.execute(
                "INSERT INTO fund_pool (extra_funds) VALUES (?1)",
                params![amount],
            )
            .map_err(query_err)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
        adapter
    }

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
            last_price: 10.0,
        }
    }

    fn sample_trade(code: &str, day: u32, side: TradeSide) -> Trade {
        Trade {
            id: 0,
            code: code.into(),
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            side,
            shares: 10,
            price: 10.0,
            fee: 5.0,
            fund_source: FundSource::NewCapital,
            notes: String::new(),
        }
    }

    #[test]
    fn in_memory_initialization() {
        adapter();
    }

    #[test]
    fn schema_initialization_is_idempotent() {
        let adapter = adapter();
        adapter.initialize_schema().unwrap();
        // Re-running must not duplicate the fund pool seed row.
        let pool = adapter.get_fund_pool().unwrap().unwrap();
        assert!((pool.extra_funds - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn add_and_get_instrument() {
        let adapter = adapter();
        adapter.add_instrument(&sample_instrument("AAPL")).unwrap();

        let fetched = adapter.get_instrument("AAPL").unwrap().unwrap();
        assert_eq!(fetched, sample_instrument("AAPL"));
    }

    #[test]
    fn get_unknown_instrument_is_none() {
        let adapter = adapter();
        assert!(adapter.get_instrument("XYZ").unwrap().is_none());
    }

    #[test]
    fn duplicate_instrument_is_conflict() {
        let adapter = adapter();
        adapter.add_instrument(&sample_instrument("AAPL")).unwrap();
        let err = adapter.add_instrument(&sample_instrument("AAPL")).unwrap_err();
        assert!(matches!(
            err,
            BandcostError::DuplicateInstrument { code } if code == "AAPL"
        ));
    }

    #[test]
    fn list_instruments_ordered_by_code() {
        let adapter = adapter();
        adapter.add_instrument(&sample_instrument("MSFT")).unwrap();
        adapter.add_instrument(&sample_instrument("AAPL")).unwrap();

        let codes: Vec<String> = adapter
            .list_instruments()
            .unwrap()
            .into_iter()
            .map(|i| i.code)
            .collect();
        assert_eq!(codes, vec!["AAPL", "MSFT"]);
    }

    #[test]
    fn patch_updates_only_named_fields() {
        let adapter = adapter();
        adapter.add_instrument(&sample_instrument("AAPL")).unwrap();

        let patch = InstrumentPatch {
            last_price: Some(12.5),
            target_shares: Some(150),
            ..Default::default()
        };
        adapter.update_instrument("AAPL", &patch).unwrap();

        let fetched = adapter.get_instrument("AAPL").unwrap().unwrap();
        assert!((fetched.last_price - 12.5).abs() < f64::EPSILON);
        assert_eq!(fetched.target_shares, 150);
        assert_eq!(fetched.name, "Apple");
        assert_eq!(fetched.seed_shares, 0);
    }

    #[test]
    fn patch_unknown_instrument_fails() {
        let adapter = adapter();
        let patch = InstrumentPatch {
            last_price: Some(12.5),
            ..Default::default()
        };
        let err = adapter.update_instrument("XYZ", &patch).unwrap_err();
        assert!(matches!(err, BandcostError::UnknownInstrument { .. }));
    }

    #[test]
    fn remove_instrument_cascades_trades() {
        let adapter = adapter();
        adapter.add_instrument(&sample_instrument("AAPL")).unwrap();
        adapter.add_instrument(&sample_instrument("MSFT")).unwrap();
        adapter
            .add_trade(&sample_trade("AAPL", 10, TradeSide::Buy))
            .unwrap();
        adapter
            .add_trade(&sample_trade("MSFT", 10, TradeSide::Buy))
            .unwrap();

        adapter.remove_instrument("AAPL").unwrap();

        assert!(adapter.get_instrument("AAPL").unwrap().is_none());
        assert!(adapter.get_trades("AAPL").unwrap().is_empty());
        assert_eq!(adapter.get_trades("MSFT").unwrap().len(), 1);
    }

    #[test]
    fn remove_unknown_instrument_fails() {
        let adapter = adapter();
        let err = adapter.remove_instrument("XYZ").unwrap_err();
        assert!(matches!(err, BandcostError::UnknownInstrument { .. }));
    }

    #[test]
    fn add_trade_requires_instrument() {
        let adapter = adapter();
        let err = adapter
            .add_trade(&sample_trade("XYZ", 10, TradeSide::Buy))
            .unwrap_err();
        assert!(matches!(err, BandcostError::UnknownInstrument { .. }));
    }

    #[test]
    fn trades_replay_order_breaks_date_ties_by_insertion() {
        let adapter = adapter();
        adapter.add_instrument(&sample_instrument("AAPL")).unwrap();

        let later = adapter
            .add_trade(&sample_trade("AAPL", 12, TradeSide::Buy))
            .unwrap();
        let earlier = adapter
            .add_trade(&sample_trade("AAPL", 10, TradeSide::Buy))
            .unwrap();
        let tied = adapter
            .add_trade(&sample_trade("AAPL", 12, TradeSide::Buy))
            .unwrap();

        let ids: Vec<i64> = adapter
            .get_trades("AAPL")
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![earlier, later, tied]);
    }

    #[test]
    fn trade_round_trips_fields() {
        let adapter = adapter();
        adapter.add_instrument(&sample_instrument("AAPL")).unwrap();

        let mut trade = sample_trade("AAPL", 10, TradeSide::Sell);
        trade.fund_source = FundSource::BandOperation;
        trade.notes = "harvest".into();
        let id = adapter.add_trade(&trade).unwrap();

        let fetched = &adapter.get_trades("AAPL").unwrap()[0];
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.side, TradeSide::Sell);
        assert!(fetched.fund_source.is_band_operation());
        assert_eq!(fetched.notes, "harvest");
    }

    #[test]
    fn delete_trade_unknown_id_fails() {
        let adapter = adapter();
        let err = adapter.delete_trade(42).unwrap_err();
        assert!(matches!(err, BandcostError::UnknownTrade { id: 42 }));
    }

    #[test]
    fn delete_trade_removes_row() {
        let adapter = adapter();
        adapter.add_instrument(&sample_instrument("AAPL")).unwrap();
        let id = adapter
            .add_trade(&sample_trade("AAPL", 10, TradeSide::Buy))
            .unwrap();

        adapter.delete_trade(id).unwrap();
        assert!(adapter.get_trades("AAPL").unwrap().is_empty());
    }

    #[test]
    fn fund_pool_starts_at_zero_and_latest_wins() {
        let adapter = adapter();
        let pool = adapter.get_fund_pool().unwrap().unwrap();
        assert!((pool.extra_funds - 0.0).abs() < f64::EPSILON);

        adapter.set_extra_funds(2500.0).unwrap();
        adapter.set_extra_funds(1800.0).unwrap();

        let pool = adapter.get_fund_pool().unwrap().unwrap();
        assert!((pool.extra_funds - 1800.0).abs() < f64::EPSILON);
    }
}
