/*!
Turn a close series into fixed-length lookback windows paired with a target some steps ahead
*/
use crate::{Error, Result};

/// The default number of observations per window: one trading week
pub const LOOKBACK: usize = 7;

/// Training windows for a single horizon
#[derive(Debug, Clone, PartialEq)]
pub struct Windows {
    /// Observations per window
    pub lookback: usize,
    /// Steps between a window's last observation and its target
    pub horizon: usize,
    /// The windows, each exactly `lookback` long
    pub inputs: Vec<Vec<f32>>,
    /// One target per window
    pub targets: Vec<f32>,
    /// The latest `lookback` observations, the input for the out-of-sample forecast
    pub last_sequence: Vec<f32>,
}

impl Windows {
    /// Number of windows
    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    /// Whether there are no windows
    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// The row of the source series holding the target of window `i`
    #[inline]
    pub fn target_index(&self, i: usize) -> usize {
        i + self.lookback - 1 + self.horizon
    }
}

/// Window `series` with `lookback` observations per window, each targeting the value `horizon` steps after its last
/// observation.
///
/// A series of `n` points yields `n - horizon - lookback + 1` windows; it must hold at least `lookback + horizon`.
pub fn prepare(series: &[f32], lookback: usize, horizon: usize) -> Result<Windows> {
    if lookback == 0 || horizon == 0 {
        return Err(Error::Config(format!(
            "lookback ({}) and horizon ({}) must both be positive",
            lookback, horizon
        )));
    }
    let need = lookback + horizon;
    if series.len() < need {
        return Err(Error::InsufficientData {
            have: series.len(),
            need,
        });
    }
    let count = series.len() - need + 1;
    let mut inputs = Vec::with_capacity(count);
    let mut targets = Vec::with_capacity(count);
    for (i, window) in series.windows(lookback).take(count).enumerate() {
        inputs.push(window.to_vec());
        targets.push(series[i + lookback - 1 + horizon]);
    }
    let last_sequence = series[series.len() - lookback..].to_vec();
    Ok(Windows {
        lookback,
        horizon,
        inputs,
        targets,
        last_sequence,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(n: usize) -> Vec<f32> {
        (0..n).map(|i| i as f32).collect()
    }

    #[test]
    fn window_counts_and_targets() {
        let s = series(12);
        for horizon in 1..=3 {
            let w = prepare(&s, LOOKBACK, horizon).unwrap();
            assert_eq!(w.len(), 12 - horizon - LOOKBACK + 1);
            for (i, (input, target)) in w.inputs.iter().zip(&w.targets).enumerate() {
                assert_eq!(input.len(), LOOKBACK);
                assert_eq!(input[0], i as f32);
                assert_eq!(*target, s[w.target_index(i)]);
                assert_eq!(*target, input[LOOKBACK - 1] + horizon as f32);
            }
            assert_eq!(w.last_sequence, vec![5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0]);
        }
    }

    #[test]
    fn exact_minimum_length() {
        let w = prepare(&series(8), 7, 1).unwrap();
        assert_eq!(w.len(), 1);
        assert_eq!(w.targets, vec![7.0]);
        assert_eq!(w.inputs, vec![series(7)]);
    }

    #[test]
    fn too_short_or_degenerate() {
        match prepare(&series(9), 7, 3) {
            Err(Error::InsufficientData { have: 9, need: 10 }) => {}
            other => panic!("unexpected {:?}", other),
        }
        assert!(prepare(&series(9), 0, 1).is_err());
        assert!(prepare(&series(9), 7, 0).is_err());
    }
}
