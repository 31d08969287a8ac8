//! Energy-normalized cross-correlation similarity search with quadratic
//! sub-sample refinement, per spec §4.4.

use temposcale_core::Sample;

/// Outcome of one similarity search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchResult {
    /// Integer argmax offset `j0`, used to extract the optimal block.
    pub index: usize,
    /// Sub-sample-refined optimum `j*`, used only for clock arithmetic.
    pub refined: f64,
}

/// Find the offset in `search_block` whose `window_size`-frame sub-block best
/// matches `target`, scored by energy-normalized cross-correlation.
///
/// `target[c]` has `window_size` samples; `search_block[c]` has
/// `num_candidates + window_size - 1` samples. `epsilon` guards the score
/// denominator against divide-by-zero.
pub fn find_optimal_block(
    target: &[Vec<Sample>],
    search_block: &[Vec<Sample>],
    window_size: usize,
    num_candidates: usize,
    epsilon: f64,
) -> SearchResult {
    debug_assert_eq!(target.len(), search_block.len());
    let channels = target.len();

    // Target energy per channel.
    let mut target_energy = vec![0.0f64; channels];
    for c in 0..channels {
        target_energy[c] = target[c].iter().map(|&x| (x as f64) * (x as f64)).sum();
    }

    // Candidate energies per channel via sliding-sum recurrence.
    let mut candidate_energy = vec![vec![0.0f64; num_candidates]; channels];
    for c in 0..channels {
        let s = &search_block[c];
        let mut e: f64 = s[0..window_size]
            .iter()
            .map(|&x| (x as f64) * (x as f64))
            .sum();
        candidate_energy[c][0] = e;
        for j in 1..num_candidates {
            let leaving = s[j - 1] as f64;
            let entering = s[j - 1 + window_size] as f64;
            e = e - leaving * leaving + entering * entering;
            candidate_energy[c][j] = e;
        }
    }

    // Dot products D[j] = sum_c sum_k T[c,k] * S[c, j+k].
    let mut dot = vec![0.0f64; num_candidates];
    for j in 0..num_candidates {
        let mut acc = 0.0f64;
        for c in 0..channels {
            let t = &target[c];
            let s = &search_block[c];
            for k in 0..window_size {
                acc += (t[k] as f64) * (s[j + k] as f64);
            }
        }
        dot[j] = acc;
    }

    // Score each offset, tie-break to the lower j.
    let score = |j: usize| -> f64 {
        let denom: f64 = (0..channels).map(|c| target_energy[c] * candidate_energy[c][j]).sum::<f64>() + epsilon;
        dot[j].signum() * dot[j] * dot[j] / denom
    };

    let mut best_j = 0usize;
    let mut best_score = score(0);
    for j in 1..num_candidates {
        let s = score(j);
        if s > best_score {
            best_score = s;
            best_j = j;
        }
    }

    let refined = if best_j > 0 && best_j < num_candidates - 1 {
        let y_minus = score(best_j - 1);
        let y0 = best_score;
        let y_plus = score(best_j + 1);
        let denom = y_minus - 2.0 * y0 + y_plus;
        let offset = if denom.abs() > f64::EPSILON {
            0.5 * (y_minus - y_plus) / denom
        } else {
            0.0
        };
        (best_j as f64 + offset).clamp(0.0, (num_candidates - 1) as f64)
    } else {
        best_j as f64
    };

    SearchResult {
        index: best_j,
        refined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(len: usize, freq: f64, sample_rate: f64, phase0: f64) -> Vec<Sample> {
        (0..len)
            .map(|i| {
                ((2.0 * std::f64::consts::PI * freq * (i as f64 + phase0) / sample_rate).sin())
                    as Sample
            })
            .collect()
    }

    #[test]
    fn exact_match_is_found() {
        let window_size = 64;
        let num_candidates = 9;
        let search_len = num_candidates + window_size - 1;

        let search = sine(search_len, 440.0, 44100.0, 0.0);
        let target: Vec<Sample> = search[4..4 + window_size].to_vec();

        let result = find_optimal_block(
            &[target],
            &[search],
            window_size,
            num_candidates,
            f32::EPSILON as f64,
        );
        assert_eq!(result.index, 4);
    }

    #[test]
    fn ties_break_to_lower_index() {
        // A flat-zero target and search block score every offset at 0.0.
        let window_size = 8;
        let num_candidates = 5;
        let search_len = num_candidates + window_size - 1;
        let target = vec![0.0 as Sample; window_size];
        let search = vec![0.0 as Sample; search_len];
        let result = find_optimal_block(
            &[target],
            &[search],
            window_size,
            num_candidates,
            f32::EPSILON as f64,
        );
        assert_eq!(result.index, 0);
    }

    #[test]
    fn refined_offset_is_within_bounds() {
        let window_size = 64;
        let num_candidates = 9;
        let search_len = num_candidates + window_size - 1;
        let search = sine(search_len, 300.0, 44100.0, 0.0);
        let target: Vec<Sample> = search[3..3 + window_size].to_vec();
        let result = find_optimal_block(
            &[target],
            &[search],
            window_size,
            num_candidates,
            f32::EPSILON as f64,
        );
        assert!(result.refined >= 0.0 && result.refined <= (num_candidates - 1) as f64);
    }
}
