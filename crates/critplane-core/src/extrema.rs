//! Turning-point extraction and stress binning
//!
//! A resolved stress signal is reduced to its alternating local minima and
//! maxima ("turning points"). Oscillations smaller than one bin width are
//! treated as noise and skipped. Every turning point is then quantized to an
//! integer bin index, which is what the rainflow counter consumes.
//!
//! ## Binning
//!
//! ```text
//! binWidth = (globalMax - globalMin) / (numBins - 1)
//! center_i = globalMin + i * binWidth
//! bin(v)   = floor((v - globalMin) / binWidth + 0.5), clamped to [0, numBins - 1]
//! ```

use crate::error::{FatigueError, Result};

/// Default number of stress bins
pub const DEFAULT_NUM_BINS: usize = 100;

/// Uniform stress bins spanning the range of one signal
#[derive(Debug, Clone, PartialEq)]
pub struct StressBins {
    pub global_min: f64,
    pub global_max: f64,
    pub bin_width: f64,
    pub num_bins: usize,
}

impl StressBins {
    /// Fit `num_bins` bins to the range of `signal`
    ///
    /// # Errors
    ///
    /// - `InvalidConfig` if `num_bins < 2`
    /// - `SignalTooShort` for an empty signal
    /// - `NonFiniteSample` if the signal contains NaN or infinity
    pub fn from_signal(signal: &[f64], num_bins: usize) -> Result<Self> {
        if num_bins < 2 {
            return Err(FatigueError::config(
                "num_stress_bins",
                format!("must be greater than 1, got {num_bins}"),
            ));
        }
        if signal.is_empty() {
            return Err(FatigueError::SignalTooShort { len: 0 });
        }
        if let Some(index) = signal.iter().position(|v| !v.is_finite()) {
            return Err(FatigueError::NonFiniteSample { index });
        }

        let global_min = signal.iter().copied().fold(f64::INFINITY, f64::min);
        let global_max = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bin_width = (global_max - global_min) / (num_bins - 1) as f64;

        Ok(Self {
            global_min,
            global_max,
            bin_width,
            num_bins,
        })
    }

    /// A constant signal has zero-width bins
    pub fn is_degenerate(&self) -> bool {
        self.bin_width <= 0.0
    }

    /// Physical stress at the center of every bin, ascending
    pub fn centers(&self) -> Vec<f64> {
        (0..self.num_bins)
            .map(|i| i as f64 * self.bin_width + self.global_min)
            .collect()
    }

    /// Bin index of a stress value
    pub fn bin_index(&self, value: f64) -> usize {
        if self.is_degenerate() {
            return 0;
        }
        let raw = ((value - self.global_min) / self.bin_width + 0.5).floor();
        if raw <= 0.0 {
            0
        } else {
            (raw as usize).min(self.num_bins - 1)
        }
    }
}

/// Alternating turning points of a signal
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtremaSequence {
    /// Sample index of every turning point
    pub indices: Vec<usize>,
    /// Raw signal value at every turning point
    pub values: Vec<f64>,
    /// Quantized bin index of every turning point
    pub bins: Vec<usize>,
}

impl ExtremaSequence {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Locates turning points of one resolved signal
#[derive(Debug, Clone)]
pub struct ExtremaExtractor<'a> {
    signal: &'a [f64],
    bins: StressBins,
}

impl<'a> ExtremaExtractor<'a> {
    /// Prepare the extractor for `signal` with `num_bins` stress bins
    ///
    /// # Errors
    ///
    /// Signals shorter than three samples are rejected with `SignalTooShort`;
    /// see [`StressBins::from_signal`] for the other cases.
    pub fn new(signal: &'a [f64], num_bins: usize) -> Result<Self> {
        if signal.len() < 3 {
            return Err(FatigueError::SignalTooShort { len: signal.len() });
        }
        let bins = StressBins::from_signal(signal, num_bins)?;
        Ok(Self { signal, bins })
    }

    pub fn bins(&self) -> &StressBins {
        &self.bins
    }

    /// Find alternating minima and maxima using a noise threshold of one bin width
    ///
    /// The first and the last sample are always part of the result. A constant
    /// signal yields the first sample only.
    pub fn locate(&self) -> ExtremaSequence {
        let signal = self.signal;
        let width = self.bins.bin_width;
        let last = signal.len() - 1;

        if self.bins.is_degenerate() {
            return ExtremaSequence {
                indices: vec![0],
                values: vec![signal[0]],
                bins: vec![0],
            };
        }

        let mut indices = Vec::with_capacity(signal.len().min(1024));
        indices.push(0);

        // Direction of the first excursion larger than one bin
        let mut i = 1;
        while i < signal.len() && (signal[i] - signal[0]).abs() < width {
            i += 1;
        }

        if i < signal.len() {
            let mut looking_for_maximum = signal[i] > signal[0];
            let mut last_min = f64::INFINITY;
            let mut last_min_index = 0;
            let mut last_max = f64::NEG_INFINITY;
            let mut last_max_index = 0;

            for (k, &sp) in signal.iter().enumerate().skip(i) {
                if sp > last_max {
                    last_max = sp;
                    last_max_index = k;
                }
                if sp < last_min {
                    last_min = sp;
                    last_min_index = k;
                }

                if looking_for_maximum {
                    if sp < last_max - width {
                        indices.push(last_max_index);
                        last_min = sp;
                        last_min_index = k;
                        looking_for_maximum = false;
                    }
                } else if sp > last_min + width {
                    indices.push(last_min_index);
                    last_max = sp;
                    last_max_index = k;
                    looking_for_maximum = true;
                }
            }
        }

        if indices.last() != Some(&last) {
            indices.push(last);
        }

        let values: Vec<f64> = indices.iter().map(|&k| signal[k]).collect();
        let bins = values.iter().map(|&v| self.bins.bin_index(v)).collect();
        ExtremaSequence {
            indices,
            values,
            bins,
        }
    }
}
