//! Rainflow cycle counting on quantized turning points
//!
//! Single streaming pass with an explicit stack of open turning points
//! (the residual). Each incoming bin index is compared against the two most
//! recent stack entries:
//!
//! - same direction as the last step: the last entry is not a turning point
//!   any more and is dropped
//! - range of the new step at least the range of the last step: the last two
//!   entries form a closed cycle, recorded at `matrix[last][second_last]`
//!
//! The lowest stack slot uses a separate rule controlled by the boundary
//! cursor `ir`. Entries left on the stack after one pass form the residual;
//! running the counter once more over the residual concatenated with itself
//! closes the remaining half cycles.

use nalgebra::DMatrix;

/// Square matrix of cycle counts indexed by `(from_bin, to_bin)`
#[derive(Debug, Clone, PartialEq)]
pub struct RainflowMatrix {
    counts: DMatrix<f64>,
}

impl RainflowMatrix {
    pub fn zeros(num_bins: usize) -> Self {
        Self {
            counts: DMatrix::zeros(num_bins, num_bins),
        }
    }

    /// Wrap an existing count matrix (must be square)
    pub fn from_counts(counts: DMatrix<f64>) -> Self {
        assert!(counts.is_square(), "rainflow matrix must be square");
        Self { counts }
    }

    pub fn num_bins(&self) -> usize {
        self.counts.nrows()
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.counts[(from, to)]
    }

    /// Add `count` cycles between two bins
    pub fn add(&mut self, from: usize, to: usize, count: f64) {
        self.counts[(from, to)] += count;
    }

    pub fn total_cycles(&self) -> f64 {
        self.counts.sum()
    }

    pub fn is_zero(&self) -> bool {
        self.counts.iter().all(|&c| c == 0.0)
    }

    pub fn as_matrix(&self) -> &DMatrix<f64> {
        &self.counts
    }

    /// Non-zero cells as `(from, to, count)`
    pub fn nonzero(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.counts.nrows();
        (0..n).flat_map(move |i| {
            (0..n).filter_map(move |j| {
                let c = self.counts[(i, j)];
                (c != 0.0).then_some((i, j, c))
            })
        })
    }
}

/// Outcome of one streaming pass
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RainflowPass {
    /// Unclosed turning points (stack without its top entry)
    pub residual: Vec<usize>,
    /// Number of cycles recorded in the matrix during the pass
    pub closed_cycles: usize,
    /// Entries dropped because the signal continued in the same direction
    pub discarded_points: usize,
    /// Stack height when the pass ended
    pub stack_height: usize,
}

/// Rainflow counter accumulating into one matrix over any number of passes
#[derive(Debug, Clone)]
pub struct RainflowCounter {
    matrix: RainflowMatrix,
    first_pass: Option<RainflowPass>,
    repeated_pass: Option<RainflowPass>,
}

impl RainflowCounter {
    pub fn new(num_bins: usize) -> Self {
        Self {
            matrix: RainflowMatrix::zeros(num_bins),
            first_pass: None,
            repeated_pass: None,
        }
    }

    /// Run one streaming pass over `data`, adding closed cycles to the matrix
    ///
    /// # Panics
    ///
    /// If a bin index is outside the matrix.
    pub fn count(&mut self, data: &[usize]) -> RainflowPass {
        let num_bins = self.matrix.num_bins();
        let mut stack = vec![0_i64; data.len()];
        let mut iz = 0_usize;
        let mut ir = 1_usize;
        let mut closed_cycles = 0;
        let mut discarded_points = 0;

        for &bin in data {
            assert!(bin < num_bins, "bin {bin} outside rainflow matrix of size {num_bins}");
            let s = bin as i64;
            loop {
                if iz > ir {
                    let second_last = stack[iz - 2];
                    let last = stack[iz - 1];
                    if (s - last) * (last - second_last) >= 0 {
                        iz -= 1;
                        discarded_points += 1;
                        continue;
                    }
                    if (s - last).abs() >= (last - second_last).abs() {
                        self.matrix.add(last as usize, second_last as usize, 1.0);
                        iz -= 2;
                        closed_cycles += 1;
                        continue;
                    }
                } else if iz == ir {
                    let last = stack[iz - 1];
                    if (s - last) * last >= 0 {
                        iz -= 1;
                        discarded_points += 1;
                        continue;
                    }
                    if s.abs() > last.abs() {
                        ir += 1;
                    }
                }
                break;
            }
            stack[iz] = s;
            iz += 1;
        }

        let residual = stack[..iz.saturating_sub(1)]
            .iter()
            .map(|&v| v as usize)
            .collect();
        RainflowPass {
            residual,
            closed_cycles,
            discarded_points,
            stack_height: iz,
        }
    }

    /// Count the residual concatenated with itself
    pub fn repeat_residual(&mut self, residual: &[usize]) -> RainflowPass {
        let doubled: Vec<usize> = residual.iter().chain(residual).copied().collect();
        self.count(&doubled)
    }

    /// First pass over the turning points followed by the repeated-residual pass
    pub fn count_with_repeated_residual(&mut self, extrema_bins: &[usize]) -> &RainflowMatrix {
        let first = self.count(extrema_bins);
        let repeated = self.repeat_residual(&first.residual);
        self.first_pass = Some(first);
        self.repeated_pass = Some(repeated);
        &self.matrix
    }

    /// Statistics of the first pass, if [`Self::count_with_repeated_residual`] ran
    pub fn first_pass(&self) -> Option<&RainflowPass> {
        self.first_pass.as_ref()
    }

    /// Statistics of the repeated-residual pass
    pub fn repeated_pass(&self) -> Option<&RainflowPass> {
        self.repeated_pass.as_ref()
    }

    pub fn matrix(&self) -> &RainflowMatrix {
        &self.matrix
    }

    pub fn into_matrix(self) -> RainflowMatrix {
        self.matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_closed_cycle() {
        let mut counter = RainflowCounter::new(100);
        let pass = counter.count(&[0, 99, 0, 99]);
        assert_eq!(pass.closed_cycles, 1);
        assert_eq!(counter.matrix().get(0, 99), 1.0);
        assert_eq!(counter.matrix().total_cycles(), 1.0);
        assert!(pass.residual.is_empty());
    }

    #[test]
    fn test_half_cycle_stays_in_residual() {
        let mut counter = RainflowCounter::new(100);
        let pass = counter.count(&[0, 99, 0]);
        assert_eq!(pass.closed_cycles, 0);
        assert_eq!(pass.residual, vec![99]);
        assert_eq!(pass.stack_height, 2);
        assert!(counter.matrix().is_zero());
    }

    #[test]
    fn test_inner_cycle_is_extracted_first() {
        // 10 -> 60 -> 40 -> 80: the 60/40 excursion closes inside the larger swing
        let mut counter = RainflowCounter::new(100);
        let pass = counter.count(&[10, 60, 40, 80, 5]);
        assert_eq!(counter.matrix().get(40, 60), 1.0);
        assert_eq!(pass.closed_cycles, 1);
    }

    #[test]
    fn test_reference_sequence_with_repeat() {
        let bins = [0, 42, 14, 71, 0, 57, 0, 85, 28, 99];
        let mut counter = RainflowCounter::new(100);
        let matrix = counter.count_with_repeated_residual(&bins).clone();

        assert_eq!(matrix.get(14, 42), 1.0);
        assert_eq!(matrix.get(57, 0), 1.0);
        assert_eq!(matrix.get(0, 71), 1.0);
        assert_eq!(matrix.get(28, 85), 1.0);
        assert_eq!(matrix.total_cycles(), 4.0);
        assert_eq!(matrix.nonzero().count(), 4);

        let first = counter.first_pass().unwrap();
        assert_eq!(first.closed_cycles, 4);
        assert_eq!(first.discarded_points, 1);
        assert_eq!(first.stack_height, 1);
        assert!(first.residual.is_empty());
    }

    #[test]
    fn test_repeat_residual_doubles_input() {
        let mut counter = RainflowCounter::new(10);
        let pass = counter.repeat_residual(&[2, 8]);
        // [2, 8, 2, 8]: one cycle between 2 and 8
        assert_eq!(pass.closed_cycles, 1);
        assert_eq!(counter.matrix().get(2, 8), 1.0);
    }

    #[test]
    fn test_empty_input() {
        let mut counter = RainflowCounter::new(4);
        let pass = counter.count(&[]);
        assert_eq!(pass, RainflowPass::default());
        assert!(counter.matrix().is_zero());
    }

    #[test]
    #[should_panic]
    fn test_bin_outside_matrix_panics() {
        let mut counter = RainflowCounter::new(4);
        counter.count(&[0, 7]);
    }
}
