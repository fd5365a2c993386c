// src/backtest/grid.rs
use crate::connectors::traits::BrokerClient;
use crate::error::BacktestError;
use crate::types::Candle;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

/// Best entry/exit pair found for one market.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub pair: String,
    pub entry_threshold: Decimal,
    pub exit_threshold: Decimal,
    pub total_pnl: Decimal,
    pub win_rate: Decimal,
    /// Number of (entry, exit) combinations simulated.
    pub evaluated: usize,
}

#[derive(Debug, Default)]
struct GridRun {
    pnl: Decimal,
    trades: usize,
    wins: usize,
}

impl GridRun {
    fn win_rate(&self) -> Decimal {
        if self.trades == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.wins) / Decimal::from(self.trades) * Decimal::ONE_HUNDRED
    }
}

/// Breakout-and-stop simulation: enter once the close is `entry` above the
/// first close, exit once it is `exit` below the entry price.
fn simulate(closes: &[Decimal], entry: Decimal, exit: Decimal, fee_rate: Decimal) -> GridRun {
    let mut run = GridRun::default();
    let Some(&first) = closes.first() else {
        return run;
    };
    let trigger = first * (Decimal::ONE + entry);
    let mut held: Option<Decimal> = None;

    for &price in closes {
        if held.is_none() && price > trigger {
            held = Some(price);
        }
        if let Some(entry_price) = held {
            if price < entry_price * (Decimal::ONE - exit) {
                let profit = (price - entry_price) - (entry_price + price) * fee_rate;
                run.pnl += profit;
                run.trades += 1;
                if profit > Decimal::ZERO {
                    run.wins += 1;
                }
                held = None;
            }
        }
    }
    run
}

/// Every threshold from `start` to `end` inclusive, `step` apart.
fn grid_axis(start: Decimal, end: Decimal, step: Decimal) -> Result<Vec<Decimal>, BacktestError> {
    if step <= Decimal::ZERO || start > end {
        return Err(BacktestError::InvalidGrid { start, end, step });
    }
    let mut axis = Vec::new();
    let mut t = start;
    while t <= end {
        axis.push(t);
        t += step;
    }
    Ok(axis)
}

/// Simulates every (entry, exit) in `[start, end]²` and keeps the one with
/// the highest total PnL. Ties go to the earlier combination (ascending
/// entry, then ascending exit).
pub fn run_threshold_grid_search(
    candles: &[Candle],
    fee_rate: Decimal,
    start: Decimal,
    end: Decimal,
    step: Decimal,
) -> Result<ThresholdResult, BacktestError> {
    let axis = grid_axis(start, end, step)?;
    let closes: Vec<Decimal> = candles.iter().map(|c| c.close).collect();

    let mut best: Option<(Decimal, Decimal, GridRun)> = None;
    let mut evaluated = 0;
    for &entry in &axis {
        for &exit in &axis {
            let run = simulate(&closes, entry, exit, fee_rate);
            evaluated += 1;
            let better = match &best {
                Some((_, _, b)) => run.pnl > b.pnl,
                None => true,
            };
            if better {
                best = Some((entry, exit, run));
            }
        }
    }

    // the axis always holds at least `start`
    let (entry_threshold, exit_threshold, run) = best.unwrap_or((start, start, GridRun::default()));
    Ok(ThresholdResult {
        pair: String::new(),
        entry_threshold,
        exit_threshold,
        total_pnl: run.pnl,
        win_rate: run.win_rate(),
        evaluated,
    })
}

/// Runs the grid for every pair with data. Pairs without candles are
/// skipped.
pub fn optimize_thresholds(
    markets: &[(String, Vec<Candle>)],
    fee_rate: Decimal,
    start: Decimal,
    end: Decimal,
    step: Decimal,
) -> Result<Vec<ThresholdResult>, BacktestError> {
    let mut results = Vec::new();
    for (pair, candles) in markets {
        if candles.is_empty() {
            warn!("No candles for {}, skipping threshold search", pair);
            continue;
        }
        let mut result = run_threshold_grid_search(candles, fee_rate, start, end, step)?;
        result.pair = pair.clone();
        info!(
            "Thresholds for {}: entry={} exit={} pnl={} win rate={}%",
            pair,
            result.entry_threshold,
            result.exit_threshold,
            result.total_pnl,
            result.win_rate.round_dp(2)
        );
        results.push(result);
    }
    Ok(results)
}

/// Fetches one-minute candles since `since` for each pair and optimizes
/// them. Pairs whose history cannot be fetched are skipped.
pub async fn optimize_pairs(
    client: &dyn BrokerClient,
    pairs: &[String],
    since: DateTime<Utc>,
    fee_rate: Decimal,
    start: Decimal,
    end: Decimal,
    step: Decimal,
) -> Result<Vec<ThresholdResult>, BacktestError> {
    let mut markets = Vec::with_capacity(pairs.len());
    for pair in pairs {
        match client.get_candles(pair, since, 60).await {
            Ok(candles) => markets.push((pair.clone(), candles)),
            Err(e) => warn!("Failed to fetch candles for {}: {}", pair, e),
        }
    }
    optimize_thresholds(&markets, fee_rate, start, end, step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn candles(closes: &[Decimal]) -> Vec<Candle> {
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, c)| Candle {
                timestamp: t0 + chrono::Duration::minutes(i as i64),
                open: *c,
                high: *c,
                low: *c,
                close: *c,
                volume: dec!(1),
            })
            .collect()
    }

    #[test]
    fn axis_is_inclusive() {
        assert_eq!(
            grid_axis(dec!(0.01), dec!(0.05), dec!(0.02)).unwrap(),
            vec![dec!(0.01), dec!(0.03), dec!(0.05)]
        );
    }

    #[test]
    fn rejects_bad_grids() {
        assert!(matches!(
            grid_axis(dec!(0.01), dec!(0.05), dec!(0)),
            Err(BacktestError::InvalidGrid { .. })
        ));
        assert!(matches!(
            grid_axis(dec!(0.05), dec!(0.01), dec!(0.01)),
            Err(BacktestError::InvalidGrid { .. })
        ));
    }

    #[test]
    fn four_combinations_and_first_best_wins() {
        let c = candles(&[dec!(100), dec!(105), dec!(95), dec!(100)]);
        let r = run_threshold_grid_search(&c, dec!(0), dec!(0.01), dec!(0.05), dec!(0.04)).unwrap();
        assert_eq!(r.evaluated, 4);
        // entry 0.01 buys 105 and stops out at 95; entry 0.05 never triggers
        assert_eq!(r.entry_threshold, dec!(0.05));
        assert_eq!(r.exit_threshold, dec!(0.01));
        assert_eq!(r.total_pnl, dec!(0));
        assert_eq!(r.win_rate, dec!(0));
    }

    #[test]
    fn fee_reduces_profit() {
        let run = simulate(&[dec!(100), dec!(110), dec!(100)], dec!(0.05), dec!(0.05), dec!(0.001));
        // -10 - 210 * 0.001
        assert_eq!(run.pnl, dec!(-10.21));
        assert_eq!(run.trades, 1);
    }

    #[test]
    fn pairs_without_candles_are_skipped() {
        let markets = vec![
            ("XBTZAR".to_string(), candles(&[dec!(1), dec!(2)])),
            ("ETHZAR".to_string(), Vec::new()),
        ];
        let r = optimize_thresholds(&markets, dec!(0), dec!(0.01), dec!(0.02), dec!(0.01)).unwrap();
        assert_eq!(r.len(), 1);
        assert_eq!(r[0].pair, "XBTZAR");
    }
}
