//! Row-of-Pascal's-triangle computation
//!
//! Pure native code: no handle, no foreign calls, safe to run on any thread.

/// Compute row `n` of Pascal's triangle (1-based; row 1 is `[1]`).
///
/// The row is built in place: cell 0 is seeded with 1 and never revisited,
/// and each widening sweep updates interior cells left to right from the
/// cell's pre-overwrite value plus the pre-overwrite value of its left
/// neighbor, carried in a scalar.
///
/// Row 0 is empty. Values overflow `u64` past row 68.
pub fn pascal_row(n: usize) -> Vec<u64> {
    let mut row = vec![0u64; n];
    if n == 0 {
        return row;
    }
    row[0] = 1;

    for width in 1..n {
        let mut carry = 1u64;
        for cell in row[1..=width].iter_mut() {
            let old = *cell;
            *cell = carry + old;
            carry = old;
        }
    }

    row
}
