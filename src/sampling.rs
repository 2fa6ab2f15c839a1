//! Sampling position pre-computation for projection walks.
//!
//! A walk over `[start, end)` emits either every `stride`-th position or,
//! in log mode, geometrically spaced positions. Positions are computed up
//! front and then iterated, so the walk itself never mutates its cursor.

/// Compute the positions a projection walk visits inside `[start, end)`.
///
/// The arithmetic walk advances a float cursor by `stride` and emits its
/// floor. The log walk emits `start`, then advances the cursor by the
/// geometric rule `factor^(log_factor(cursor - start) + 1)` with
/// `factor = (end - start)^(1 / nsamples)` and
/// `nsamples = (end - start + 1) / stride`; positions whose floor equals
/// the previous cursor's floor are skipped. A log walk whose factor cannot
/// advance the cursor degrades to the arithmetic rule, and a cursor that
/// stops growing ends the walk.
pub fn sample_positions(start: i64, end: i64, stride: i64, log_scale: bool) -> Vec<i64> {
    let mut out = Vec::new();
    if end <= start || stride <= 0 {
        return out;
    }

    let span = (end - start) as f64;
    let nsamples = (end - start + 1) / stride;
    let factor = if nsamples > 0 {
        span.powf(1.0 / nsamples as f64)
    } else {
        f64::INFINITY
    };

    if !log_scale || !factor.is_finite() || factor <= 1.0 {
        let mut cursor = start as f64;
        while cursor < end as f64 {
            out.push(cursor as i64);
            cursor += stride as f64;
        }
        return out;
    }

    out.push(start);
    let mut cursor = start as f64;
    loop {
        let prev = cursor as i64;
        let next = if prev == start {
            factor
        } else {
            factor.powf(((cursor - start as f64).ln() / factor.ln()) + 1.0)
        };
        if !next.is_finite() || next <= cursor {
            break;
        }
        cursor = next;
        if cursor >= end as f64 {
            break;
        }
        if cursor as i64 != prev {
            out.push(cursor as i64);
        }
    }
    out
}
