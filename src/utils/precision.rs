// src/utils/precision.rs
use rust_decimal::Decimal;

/// Smallest increment the exchange accepts for prices and volumes (8 dp).
pub const DEFAULT_STEP: Decimal = Decimal::from_parts(1, 0, 0, false, 8);

/// Rounds a volume DOWN to a multiple of `step_size` so an order never
/// exceeds the intended stake. 10.999 with step 1 -> 10.
pub fn normalize_quantity(amount: Decimal, step_size: Decimal) -> Decimal {
    if step_size.is_zero() {
        return amount;
    }
    ((amount / step_size).floor() * step_size).normalize()
}

/// Rounds a price to the NEAREST multiple of `tick_size`. 100.16 with tick 0.1 -> 100.2.
pub fn normalize_price(price: Decimal, tick_size: Decimal) -> Decimal {
    if tick_size.is_zero() {
        return price;
    }
    ((price / tick_size).round() * tick_size).normalize()
}
