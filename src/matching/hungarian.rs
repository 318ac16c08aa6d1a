//! Maximum-weight bipartite assignment (Kuhn-Munkres, O(n³)).

const INF: i64 = i64::MAX / 4;

/// Assigns each row to a distinct column maximizing the summed weight.
///
/// Rectangular inputs are padded to square with zero-weight dummies. The
/// result has one entry per row: `Some(col)` for a real column, `None` when
/// the row landed on a dummy column.
///
/// ```
/// use crossupload_core::matching::max_weight_assignment;
///
/// let weights = vec![vec![90, 100], vec![0, 95]];
/// assert_eq!(max_weight_assignment(&weights), vec![Some(0), Some(1)]);
/// ```
#[must_use]
pub fn max_weight_assignment(weights: &[Vec<i64>]) -> Vec<Option<usize>> {
    let rows = weights.len();
    let cols = weights.iter().map(Vec::len).max().unwrap_or(0);
    let n = rows.max(cols);
    if n == 0 {
        return Vec::new();
    }

    // 1-based cost matrix, negated for minimization.
    let cost = |i: usize, j: usize| -> i64 {
        weights
            .get(i - 1)
            .and_then(|row| row.get(j - 1))
            .map_or(0, |w| -*w)
    };

    let mut u = vec![0i64; n + 1];
    let mut v = vec![0i64; n + 1];
    let mut p = vec![0usize; n + 1];
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![INF; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = INF;
            let mut j1 = 0usize;
            for j in 1..=n {
                if used[j] {
                    continue;
                }
                let cur = cost(i0, j) - u[i0] - v[j];
                if cur < minv[j] {
                    minv[j] = cur;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![None; rows];
    for j in 1..=n {
        let row = p[j];
        if row >= 1 && row <= rows && j <= cols {
            assignment[row - 1] = Some(j - 1);
        }
    }
    assignment
}
