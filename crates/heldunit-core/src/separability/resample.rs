//! Sampling-rate reconciliation and snapshot alignment.

use crate::error::{HeldUnitError, HeldUnitResult};
use crate::types::WaveformSet;

/// Linearly interpolate every snapshot onto a lower sampling rate.
///
/// Sample `j` of the output sits at time `j / target_hz`; the value is
/// interpolated between the two bracketing input samples. Only
/// downsampling is supported; the comparison always moves the
/// higher-rate set down to the common rate.
pub(crate) fn downsample(set: &WaveformSet, target_hz: f64) -> WaveformSet {
    let fs = set.sampling_rate_hz();
    debug_assert!(target_hz <= fs);
    let n = set.n_samples();
    if n == 0 || (fs - target_hz).abs() < f64::EPSILON {
        return set.clone();
    }

    let ratio = target_hz / fs;
    // Output samples cover [0, n/fs), endpoint excluded.
    let n_new = (n as f64 * ratio).ceil() as usize;

    let rows = set
        .rows()
        .iter()
        .map(|row| {
            (0..n_new)
                .map(|j| {
                    let pos = j as f64 / ratio;
                    let i0 = pos.floor() as usize;
                    let i1 = (i0 + 1).min(n - 1);
                    let frac = pos - i0 as f64;
                    row[i0] * (1.0 - frac) + row[i1] * frac
                })
                .collect()
        })
        .collect();
    WaveformSet::from_rows_unchecked(rows, target_hz)
}

/// Bring two waveform sets to a common rate and snapshot length.
///
/// Rate first: the higher-rate set is downsampled to the lower rate. Then
/// length: the longer set loses its leading samples, since peak alignment
/// is anchored to the snapshot end.
pub(crate) fn reconcile(
    a: &WaveformSet,
    b: &WaveformSet,
) -> HeldUnitResult<(WaveformSet, WaveformSet)> {
    let common_hz = a.sampling_rate_hz().min(b.sampling_rate_hz());
    let mut a = downsample(a, common_hz);
    let mut b = downsample(b, common_hz);

    let (na, nb) = (a.n_samples(), b.n_samples());
    if na > nb {
        a = a.trim_leading(na - nb);
    } else if nb > na {
        b = b.trim_leading(nb - na);
    }

    if a.n_samples() == 0 {
        return Err(HeldUnitError::DimensionMismatch {
            len_a: na,
            len_b: nb,
        });
    }
    Ok((a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(rows: Vec<Vec<f64>>, fs: f64) -> WaveformSet {
        WaveformSet::new(rows, fs).unwrap()
    }

    #[test]
    fn test_downsample_halves_samples() {
        let s = set(vec![vec![0.0, 1.0, 2.0, 3.0]], 4000.0);
        let out = downsample(&s, 2000.0);
        assert_eq!(out.n_samples(), 2);
        assert_eq!(out.sampling_rate_hz(), 2000.0);
        // Every second sample survives unchanged under linear interpolation.
        assert_eq!(out.rows()[0], vec![0.0, 2.0]);
    }

    #[test]
    fn test_downsample_interpolates_between_samples() {
        let s = set(vec![vec![0.0, 3.0, 6.0]], 3000.0);
        let out = downsample(&s, 2000.0);
        assert_eq!(out.n_samples(), 2);
        assert!((out.rows()[0][0] - 0.0).abs() < 1e-12);
        assert!((out.rows()[0][1] - 4.5).abs() < 1e-12);
    }

    #[test]
    fn test_reconcile_trims_leading_edge_of_longer() {
        let a = set(vec![vec![9.0, 1.0, 2.0, 3.0]], 1000.0);
        let b = set(vec![vec![4.0, 5.0, 6.0]], 1000.0);
        let (a2, b2) = reconcile(&a, &b).unwrap();
        assert_eq!(a2.rows()[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(b2.rows()[0], vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_reconcile_is_order_symmetric() {
        let a = set(vec![vec![9.0, 1.0, 2.0, 3.0]], 1000.0);
        let b = set(vec![vec![4.0, 5.0, 6.0]], 1000.0);
        let (a1, b1) = reconcile(&a, &b).unwrap();
        let (b2, a2) = reconcile(&b, &a).unwrap();
        assert_eq!(a1, a2);
        assert_eq!(b1, b2);
    }

    #[test]
    fn test_reconcile_mixed_rates() {
        let a = set(vec![vec![0.0, 1.0, 2.0, 3.0]], 4000.0);
        let b = set(vec![vec![0.0, 2.0]], 2000.0);
        let (a2, b2) = reconcile(&a, &b).unwrap();
        assert_eq!(a2.sampling_rate_hz(), 2000.0);
        assert_eq!(a2.n_samples(), b2.n_samples());
    }
}
