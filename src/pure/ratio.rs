//! The split-ratio manager: initialise, normalise, adjust, remove, add and
//! reorder the ratio lists that drive window sizing within a stacked cell.
use crate::error::{Error, Result};

/// Ratios below this are clamped during adjustment. Intentionally a hard
/// constant; do not make this user-configurable without
/// re-checking every call site that assumes the default.
pub const MIN_RATIO: f64 = 0.1;

/// The default resize step applied by a single `resize grow`/`shrink`
/// command. Also a hard constant.
pub const DEFAULT_RESIZE_DELTA: f64 = 0.1;

/// `n` equal ratios of `1/n`; empty for `n <= 0`.
pub fn initialize(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Normalise a list of non-negative ratios so that it sums to 1. Returns
/// equal ratios if the input sums to zero (or is empty).
pub fn normalize(ratios: &[f64]) -> Vec<f64> {
    let sum: f64 = ratios.iter().sum();

    if sum <= 0.0 {
        return initialize(ratios.len());
    }

    ratios.iter().map(|r| r / sum).collect()
}

/// Adjust the boundary between windows `i` and `i+1`: grow `i` by `delta`,
/// shrink `i+1` by the same amount, clamping the shrinking side at `min`
/// and feeding the shortfall back to its partner. The result is
/// renormalised before being returned.
pub fn adjust(ratios: &[f64], i: usize, delta: f64, min: f64) -> Result<Vec<f64>> {
    let n = ratios.len();
    if n < 2 {
        return Err(Error::MissingEntity(
            "split adjustment requires at least two windows".into(),
        ));
    }
    if i + 1 >= n {
        return Err(Error::MissingEntity(format!(
            "boundary index {i} out of range for {n} windows"
        )));
    }

    let mut out = ratios.to_vec();
    let pair_sum = out[i] + out[i + 1];

    let new_i = out[i] + delta;
    let new_j = out[i + 1] - delta;

    let (clamped_i, clamped_j) = if new_i < min {
        (min, pair_sum - min)
    } else if new_j < min {
        (pair_sum - min, min)
    } else {
        (new_i, new_j)
    };

    out[i] = clamped_i;
    out[i + 1] = clamped_j;

    Ok(normalize(&out))
}

/// Drop the ratio at index `k`, redistributing its share equally across the
/// remaining entries, then normalise. For `n <= 1` the result is `[1.0]`.
pub fn remove(ratios: &[f64], k: usize) -> Vec<f64> {
    let n = ratios.len();
    if n <= 1 {
        return vec![1.0];
    }

    let dropped = ratios[k];
    let remaining = n - 1;
    let bonus = dropped / remaining as f64;

    let mut out: Vec<f64> = ratios
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != k)
        .map(|(_, r)| r + bonus)
        .collect();

    out = normalize(&out);
    out
}

/// Insert a new window at index `k`. The newcomer takes `1/(n+1)`; existing
/// ratios are scaled by `n/(n+1)` to make room, then the list is
/// normalised.
pub fn add(ratios: &[f64], k: usize) -> Vec<f64> {
    let n = ratios.len();
    let new_n = n + 1;
    let scale = n as f64 / new_n as f64;
    let new_share = 1.0 / new_n as f64;

    let mut out: Vec<f64> = ratios.iter().map(|r| r * scale).collect();
    let k = k.min(out.len());
    out.insert(k, new_share);

    normalize(&out)
}

/// Move the ratio at index `o` to index `t`, preserving the ratio's value
/// (it travels with its window).
pub fn reorder(ratios: &[f64], o: usize, t: usize) -> Vec<f64> {
    let mut out = ratios.to_vec();
    if o >= out.len() || t >= out.len() {
        return out;
    }
    let v = out.remove(o);
    out.insert(t, v);
    out
}

/// Whether `ratios` sums to 1 within `eps` and every entry is non-negative.
pub fn is_valid(ratios: &[f64], eps: f64) -> bool {
    if ratios.iter().any(|r| *r < 0.0) {
        return false;
    }
    (ratios.iter().sum::<f64>() - 1.0).abs() <= eps
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[test]
    fn initialize_equal_thirds() {
        let r = initialize(3);
        assert_eq!(r.len(), 3);
        assert!((r.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(r.iter().all(|x| (x - 1.0 / 3.0).abs() < 1e-9));
    }

    #[test]
    fn initialize_zero_is_empty() {
        assert!(initialize(0).is_empty());
    }

    #[test]
    fn normalize_zero_sum_falls_back_to_equal() {
        let r = normalize(&[0.0, 0.0, 0.0]);
        assert!(r.iter().all(|x| (x - 1.0 / 3.0).abs() < 1e-9));
    }

    #[test]
    fn adjustment_clamps_at_minimum() {
        let ratios = vec![0.15, 0.85];
        let out = adjust(&ratios, 0, -0.10, MIN_RATIO).unwrap();

        assert!((out[0] - 0.10).abs() < 1e-6);
        assert!((out[1] - 0.90).abs() < 1e-6);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn adjustment_requires_two_windows() {
        assert!(adjust(&[1.0], 0, 0.1, MIN_RATIO).is_err());
    }

    #[test]
    fn adjustment_rejects_out_of_range_index() {
        assert!(adjust(&[0.5, 0.5], 1, 0.1, MIN_RATIO).is_err());
    }

    #[test]
    fn removal_round_trip() {
        let initial = initialize(4);
        let out = remove(&initial, 2);

        assert_eq!(out.len(), 3);
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        let first = out[0];
        assert!(out.iter().all(|x| (x - first).abs() < 1e-9));
    }

    #[test]
    fn removal_to_single_window() {
        assert_eq!(remove(&[1.0], 0), vec![1.0]);
    }

    #[test]
    fn addition_scales_proportionally() {
        let before = vec![0.2, 0.3, 0.5];
        let after = add(&before, 1);

        assert_eq!(after.len(), 4);
        // Ratio between any two surviving entries is preserved.
        let ratio_before = before[0] / before[2];
        let survivors: Vec<f64> = after
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != 1)
            .map(|(_, r)| *r)
            .collect();
        let ratio_after = survivors[0] / survivors[2];
        assert!((ratio_before - ratio_after).abs() < 1e-6);
    }

    #[test]
    fn reorder_preserves_value() {
        let ratios = vec![0.1, 0.2, 0.7];
        let out = reorder(&ratios, 0, 2);

        assert_eq!(out, vec![0.2, 0.7, 0.1]);
    }

    #[quickcheck]
    fn qc_initialize_then_normalize_is_identity(n: u8) -> bool {
        let n = (n % 20) as usize;
        initialize(n) == normalize(&initialize(n))
    }

    #[quickcheck]
    fn qc_normalize_is_idempotent(raw: Vec<f64>) -> bool {
        let positive: Vec<f64> = raw.into_iter().map(f64::abs).filter(|x| x.is_finite()).collect();
        if positive.is_empty() {
            return true;
        }
        let once = normalize(&positive);
        let twice = normalize(&once);
        once.iter().zip(twice.iter()).all(|(a, b)| (a - b).abs() < 1e-9)
    }

    #[quickcheck]
    fn qc_adjust_never_drops_below_minimum(n: u8, i: u8, delta: f64) -> bool {
        let n = 2 + (n % 8) as usize;
        let ratios = initialize(n);
        let i = (i as usize) % (n - 1);
        if !delta.is_finite() {
            return true;
        }
        let delta = delta.clamp(-1.0, 1.0);
        match adjust(&ratios, i, delta, MIN_RATIO) {
            Ok(out) => out.iter().all(|r| *r >= MIN_RATIO - 1e-9),
            Err(_) => true,
        }
    }

    #[quickcheck]
    fn qc_removal_round_trip(n: u8, k: u8) -> bool {
        let n = 2 + (n % 10) as usize;
        let k = (k as usize) % n;
        let initial = initialize(n);
        let out = remove(&initial, k);

        out.len() == n - 1
            && (out.iter().sum::<f64>() - 1.0).abs() < 1e-9
            && out.iter().all(|r| (r - out[0]).abs() < 1e-9)
    }

    // Growing a boundary by `delta` and then shrinking it back by the same
    // amount is the identity as long as neither side ever touches the
    // minimum clamp; generate both directions from one declaration so the
    // property can't drift out of sync with its own inverse.
    macro_rules! are_boundary_inverses {
        ($name:ident => $delta:expr) => {
            paste::paste! {
                #[test]
                fn [<$name _forward_then_back>]() {
                    let ratios = vec![0.5, 0.5];
                    let grown = adjust(&ratios, 0, $delta, MIN_RATIO).unwrap();
                    let back = adjust(&grown, 0, -$delta, MIN_RATIO).unwrap();
                    assert!((back[0] - ratios[0]).abs() < 1e-9);
                    assert!((back[1] - ratios[1]).abs() < 1e-9);
                }

                #[test]
                fn [<$name _back_then_forward>]() {
                    let ratios = vec![0.5, 0.5];
                    let shrunk = adjust(&ratios, 0, -$delta, MIN_RATIO).unwrap();
                    let back = adjust(&shrunk, 0, $delta, MIN_RATIO).unwrap();
                    assert!((back[0] - ratios[0]).abs() < 1e-9);
                    assert!((back[1] - ratios[1]).abs() < 1e-9);
                }
            }
        };
    }

    are_boundary_inverses!(small_step => 0.05);
    are_boundary_inverses!(default_delta => DEFAULT_RESIZE_DELTA);

    #[quickcheck]
    fn qc_addition_preserves_surviving_ratios(a: f64, b: f64, c: f64) -> bool {
        if ![a, b, c].iter().all(|x| x.is_finite() && *x > 0.0) {
            return true;
        }
        let before = normalize(&[a, b, c]);
        let after = add(&before, 1);

        let survivors: Vec<f64> =
            after.iter().enumerate().filter(|(i, _)| *i != 1).map(|(_, r)| *r).collect();

        if before[0] == 0.0 || before[2] == 0.0 || survivors[2] == 0.0 {
            return true;
        }
        ((before[0] / before[2]) - (survivors[0] / survivors[2])).abs() < 1e-6
    }
}
