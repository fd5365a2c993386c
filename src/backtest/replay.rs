// src/backtest/replay.rs
use crate::config::TradingConfig;
use crate::strategies::Strategy;
use crate::types::{Candle, Quote, Signal};
use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;
use tracing::info;

/// Cumulative realized PnL and drawdown after one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BacktestPoint {
    pub timestamp: DateTime<Utc>,
    pub pnl: Decimal,
    pub drawdown: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BacktestReport {
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    /// Percent, 0 when there were no trades.
    pub win_rate: Decimal,
    pub total_pnl: Decimal,
    pub avg_pnl: Decimal,
    pub sharpe: Decimal,
    pub max_drawdown: Decimal,
    pub history: Vec<BacktestPoint>,
}

/// Replays `candles` (oldest first) through `strategy`.
///
/// Each close becomes a quote with bid == ask. A `Buy` enters
/// `config.stake_size` when flat, a `Sell` exits when holding; the fee
/// `fee_rate * (entry + exit) * stake` is charged per round trip. A trade
/// with non-positive net profit counts as a loss.
pub fn run_backtest<S: Strategy + ?Sized>(
    strategy: &mut S,
    candles: &[Candle],
    config: &TradingConfig,
    fee_rate: Decimal,
) -> BacktestReport {
    let stake = config.stake_size;
    let mut entry: Option<Decimal> = None;
    let mut profits: Vec<Decimal> = Vec::new();
    let mut report = BacktestReport::default();
    let mut peak = Decimal::ZERO;

    for candle in candles {
        let price = candle.close;
        let quote = Quote::from_close(price, candle.timestamp);

        match (strategy.next(&quote, config), entry) {
            (Signal::Buy, None) => entry = Some(price),
            (Signal::Sell, Some(entry_price)) => {
                let gross = (price - entry_price) * stake;
                let fee = fee_rate * (entry_price + price) * stake;
                let profit = gross - fee;
                profits.push(profit);
                report.total_pnl += profit;
                if profit > Decimal::ZERO {
                    report.wins += 1;
                } else {
                    report.losses += 1;
                }
                entry = None;
            }
            _ => {}
        }

        if report.total_pnl > peak {
            peak = report.total_pnl;
        }
        let drawdown = peak - report.total_pnl;
        if drawdown > report.max_drawdown {
            report.max_drawdown = drawdown;
        }
        report.history.push(BacktestPoint {
            timestamp: candle.timestamp,
            pnl: report.total_pnl,
            drawdown,
        });
    }

    report.trades = profits.len();
    if report.trades > 0 {
        let n = Decimal::from(report.trades);
        report.win_rate = Decimal::from(report.wins) / n * Decimal::ONE_HUNDRED;
        report.avg_pnl = report.total_pnl / n;
    }
    report.sharpe = sharpe(&profits);

    info!(
        "Backtest ({}): trades={}, wins={}, losses={}, win rate={}%, total pnl={}, max dd={}",
        strategy.name(),
        report.trades,
        report.wins,
        report.losses,
        report.win_rate.round_dp(2),
        report.total_pnl,
        report.max_drawdown
    );
    report
}

/// `mean / sample stddev * sqrt(n)`; 0 below two trades or with no spread.
fn sharpe(profits: &[Decimal]) -> Decimal {
    if profits.len() < 2 {
        return Decimal::ZERO;
    }
    let n = Decimal::from(profits.len());
    let mean = profits.iter().sum::<Decimal>() / n;
    let variance = profits
        .iter()
        .map(|p| (*p - mean) * (*p - mean))
        .sum::<Decimal>()
        / (n - Decimal::ONE);
    let stddev = variance.sqrt().unwrap_or(Decimal::ZERO);
    if stddev.is_zero() {
        return Decimal::ZERO;
    }
    mean / stddev * n.sqrt().unwrap_or(Decimal::ZERO)
}
