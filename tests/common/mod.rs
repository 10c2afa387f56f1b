#![allow(dead_code)]

use bandcost::domain::error::BandcostError;
use bandcost::domain::fund_pool::FundPool;
use bandcost::domain::instrument::{Instrument, InstrumentPatch};
use bandcost::domain::trade::{sort_for_replay, FundSource, Trade, TradeSide};
use bandcost::ports::ledger_port::LedgerPort;
use chrono::NaiveDate;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// In-memory ledger for engine tests, no database involved.
pub struct MockLedger {
    instruments: RefCell<BTreeMap<String, Instrument>>,
    trades: RefCell<Vec<Trade>>,
    fund_pool: RefCell<Option<FundPool>>,
    next_id: RefCell<i64>,
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            instruments: RefCell::new(BTreeMap::new()),
            trades: RefCell::new(Vec::new()),
            fund_pool: RefCell::new(None),
            next_id: RefCell::new(1),
        }
    }

    pub fn with_instrument(self, instrument: Instrument) -> Self {
        self.instruments
            .borrow_mut()
            .insert(instrument.code.clone(), instrument);
        self
    }

    pub fn with_trade(self, trade: Trade) -> Self {
        {
            let mut next_id = self.next_id.borrow_mut();
            let mut trade = trade;
            trade.id = *next_id;
            *next_id += 1;
            self.trades.borrow_mut().push(trade);
        }
        self
    }

    pub fn with_funds(self, amount: f64) -> Self {
        *self.fund_pool.borrow_mut() = Some(FundPool::new(amount));
        self
    }
}

impl LedgerPort for MockLedger {
    fn get_instrument(&self, code: &str) -> Result<Option<Instrument>, BandcostError> {
        Ok(self.instruments.borrow().get(code).cloned())
    }

    fn list_instruments(&self) -> Result<Vec<Instrument>, BandcostError> {
        Ok(self.instruments.borrow().values().cloned().collect())
    }

    fn get_trades(&self, code: &str) -> Result<Vec<Trade>, BandcostError> {
        let mut trades: Vec<Trade> = self
            .trades
            .borrow()
            .iter()
            .filter(|t| t.code == code)
            .cloned()
            .collect();
        sort_for_replay(&mut trades);
        Ok(trades)
    }

    fn get_fund_pool(&self) -> Result<Option<FundPool>, BandcostError> {
        Ok(*self.fund_pool.borrow())
    }

    fn add_instrument(&self, instrument: &Instrument) -> Result<(), BandcostError> {
        let mut instruments = self.instruments.borrow_mut();
        if instruments.contains_key(&instrument.code) {
            return Err(BandcostError::DuplicateInstrument {
                code: instrument.code.clone(),
            });
        }
        instruments.insert(instrument.code.clone(), instrument.clone());
        Ok(())
    }

    fn update_instrument(
        &self,
        code: &str,
        patch: &InstrumentPatch,
    ) -> Result<(), BandcostError> {
        patch.validate()?;
        let mut instruments = self.instruments.borrow_mut();
        let Some(instrument) = instruments.get_mut(code) else {
            return Err(BandcostError::UnknownInstrument { code: code.into() });
        };
        if let Some(name) = &patch.name {
            instrument.name = name.clone();
        }
        if let Some(market) = &patch.market {
            instrument.market = market.clone();
        }
        if let Some(target_shares) = patch.target_shares {
            instrument.target_shares = target_shares;
        }
        if let Some(initial_investment) = patch.initial_investment {
            instrument.initial_investment = initial_investment;
        }
        if let Some(last_price) = patch.last_price {
            instrument.last_price = last_price;
        }
        Ok(())
    }

    fn remove_instrument(&self, code: &str) -> Result<(), BandcostError> {
        if self.instruments.borrow_mut().remove(code).is_none() {
            return Err(BandcostError::UnknownInstrument { code: code.into() });
        }
        self.trades.borrow_mut().retain(|t| t.code != code);
        Ok(())
    }

    fn add_trade(&self, trade: &Trade) -> Result<i64, BandcostError> {
        trade.validate()?;
        if !self.instruments.borrow().contains_key(&trade.code) {
            return Err(BandcostError::UnknownInstrument {
                code: trade.code.clone(),
            });
        }
        let mut next_id = self.next_id.borrow_mut();
        let id = *next_id;
        *next_id += 1;
        let mut trade = trade.clone();
        trade.id = id;
        self.trades.borrow_mut().push(trade);
        Ok(id)
    }

    fn delete_trade(&self, id: i64) -> Result<(), BandcostError> {
        let mut trades = self.trades.borrow_mut();
        let before = trades.len();
        trades.retain(|t| t.id != id);
        if trades.len() == before {
            return Err(BandcostError::UnknownTrade { id });
        }
        Ok(())
    }

    fn set_extra_funds(&self, amount: f64) -> Result<(), BandcostError> {
        *self.fund_pool.borrow_mut() = Some(FundPool::new(amount));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_instrument(code: &str, target_shares: i64, initial_investment: f64) -> Instrument {
    Instrument {
        code: code.to_string(),
        name: format!("{code} Test Co"),
        market: "NASDAQ".to_string(),
        target_shares,
        initial_investment,
        seed_shares: 0,
        seed_avg_cost: 0.0,
        seed_fees: 0.0,
        last_price: 10.0,
    }
}

pub fn make_buy(code: &str, day: u32, shares: i64, price: f64, fee: f64) -> Trade {
    Trade {
        id: 0,
        code: code.to_string(),
        date: date(2025, 3, day),
        side: TradeSide::Buy,
        shares,
        price,
        fee,
        fund_source: FundSource::NewCapital,
        notes: String::new(),
    }
}

pub fn make_sell(code: &str, day: u32, shares: i64, price: f64, fee: f64) -> Trade {
    Trade {
        side: TradeSide::Sell,
        ..make_buy(code, day, shares, price, fee)
    }
}

pub fn make_band_sell(code: &str, day: u32, shares: i64, price: f64, fee: f64) -> Trade {
    Trade {
        fund_source: FundSource::BandOperation,
        ..make_sell(code, day, shares, price, fee)
    }
}
