//! Materializes the target block, search block, and candidate sub-blocks
//! from the input buffer, per spec §4.3. Thin wrappers over
//! `InputBuffer::peek_zero_prepend`.

use crate::input_buffer::InputBuffer;
use temposcale_core::Sample;

/// Extract `ola_window_size` frames starting at `target_block_index`.
pub fn extract_target_block(
    input: &InputBuffer,
    target_block_index: i64,
    ola_window_size: usize,
    dest: &mut [Vec<Sample>],
) {
    input.peek_zero_prepend(dest, target_block_index, ola_window_size);
}

/// Extract `search_block_size` frames starting at `search_block_index`.
pub fn extract_search_block(
    input: &InputBuffer,
    search_block_index: i64,
    search_block_size: usize,
    dest: &mut [Vec<Sample>],
) {
    input.peek_zero_prepend(dest, search_block_index, search_block_size);
}

/// Extract the `ola_window_size`-frame sub-block of `search_block` starting
/// at candidate offset `j`.
pub fn extract_candidate_block(
    search_block: &[Vec<Sample>],
    j: usize,
    ola_window_size: usize,
    dest: &mut [Vec<Sample>],
) {
    for (ch, out) in search_block.iter().zip(dest.iter_mut()) {
        out.clear();
        out.extend_from_slice(&ch[j..j + ola_window_size]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_block_slices_at_offset() {
        let search_block = vec![vec![0.0f32, 1.0, 2.0, 3.0, 4.0, 5.0]];
        let mut dest = vec![Vec::new()];
        extract_candidate_block(&search_block, 2, 3, &mut dest);
        assert_eq!(dest[0], vec![2.0, 3.0, 4.0]);
    }
}
