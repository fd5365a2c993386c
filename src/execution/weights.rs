// src/execution/weights.rs
//! Slice weight schedules for VWAP execution.
use rust_decimal::Decimal;

/// `n` weights of `1/n`. The last one absorbs the rounding remainder so the
/// schedule sums to exactly one.
pub fn equal_weights(n: usize) -> Vec<Decimal> {
    let n = n.max(1);
    let w = Decimal::ONE / Decimal::from(n);
    let mut weights = vec![w; n];
    weights[n - 1] = Decimal::ONE - w * Decimal::from(n - 1);
    weights
}

/// Splits `volumes` into `n` contiguous buckets and weights each by its
/// share of the total. Bucket `i` covers `[i*len/n, (i+1)*len/n)`.
///
/// Falls back to [`equal_weights`] when there is no data or no volume.
pub fn bucket_weights(volumes: &[Decimal], n: usize) -> Vec<Decimal> {
    let n = n.max(1);
    let total: Decimal = volumes.iter().sum();
    if volumes.is_empty() || total <= Decimal::ZERO {
        return equal_weights(n);
    }

    let len = volumes.len();
    let sums: Vec<Decimal> = (0..n)
        .map(|i| {
            let start = i * len / n;
            let end = if i + 1 == n { len } else { (i + 1) * len / n };
            volumes[start..end].iter().sum()
        })
        .collect();

    normalize(sums, total)
}

/// Per-slice blend `hybrid*hist + (1-hybrid)*book`. Both inputs must have the
/// same length.
pub fn blend(hist: &[Decimal], book: &[Decimal], hybrid_weight: Decimal) -> Vec<Decimal> {
    hist.iter()
        .zip(book)
        .map(|(h, b)| hybrid_weight * h + (Decimal::ONE - hybrid_weight) * b)
        .collect()
}

fn normalize(mut sums: Vec<Decimal>, total: Decimal) -> Vec<Decimal> {
    let last = sums.len() - 1;
    let mut assigned = Decimal::ZERO;
    for s in sums.iter_mut().take(last) {
        *s /= total;
        assigned += *s;
    }
    // rounding up in earlier shares can overshoot by a few ulps
    sums[last] = (Decimal::ONE - assigned).max(Decimal::ZERO);
    sums
}
