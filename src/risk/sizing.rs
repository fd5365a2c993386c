// src/risk/sizing.rs
//! Position sizers turn equity + config into a stake amount.

use crate::config::{SizerKind, TradingConfig};
use rust_decimal::Decimal;

pub trait PositionSizer: Send + Sync {
    fn size(&self, equity: Decimal, config: &TradingConfig) -> Decimal;

    fn name(&self) -> &str;
}

/// Always stakes `config.stake_size`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FixedSizer;

impl PositionSizer for FixedSizer {
    fn size(&self, _equity: Decimal, config: &TradingConfig) -> Decimal {
        config.stake_size
    }

    fn name(&self) -> &str {
        "fixed"
    }
}

/// Kelly criterion sizing: `f = p - (1 - p) / b`.
///
/// The result is clamped to `[0, config.stake_size]`; the configured stake
/// is a hard ceiling whatever the fraction says.
#[derive(Debug, Clone, Copy)]
pub struct KellySizer {
    win_prob: Decimal,
    win_loss_ratio: Decimal,
}

impl KellySizer {
    pub fn new(win_prob: Decimal, win_loss_ratio: Decimal) -> Self {
        Self {
            win_prob,
            win_loss_ratio,
        }
    }

    pub fn fraction(&self) -> Decimal {
        if self.win_loss_ratio <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.win_prob - (Decimal::ONE - self.win_prob) / self.win_loss_ratio
    }
}

impl PositionSizer for KellySizer {
    fn size(&self, equity: Decimal, config: &TradingConfig) -> Decimal {
        (self.fraction() * equity)
            .min(config.stake_size)
            .max(Decimal::ZERO)
    }

    fn name(&self) -> &str {
        "kelly"
    }
}

pub fn sizer_from_config(config: &TradingConfig) -> Box<dyn PositionSizer> {
    match config.position_sizer_type {
        SizerKind::Fixed => Box::new(FixedSizer),
        SizerKind::Kelly => Box::new(KellySizer::new(
            config.kelly_win_prob,
            config.kelly_win_loss_ratio,
        )),
    }
}
