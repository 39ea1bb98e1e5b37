/// Transport limit applied to every returned geometry.
pub const MAX_GEOMETRY_POINTS: usize = 500;

/// Thin a path to roughly `max_points` by keeping every k-th position,
/// where `k = ceil(len / max_points)`.
///
/// Paths already within the limit come back unchanged. The final position
/// is always kept so a closed loop still ends on its start.
pub fn downsample(path: &[[f64; 2]], max_points: usize) -> Vec<[f64; 2]> {
    if path.len() <= max_points || max_points == 0 {
        return path.to_vec();
    }

    let step = path.len().div_ceil(max_points);
    let mut sampled: Vec<[f64; 2]> = path.iter().step_by(step).copied().collect();

    if let Some(&last) = path.last() {
        if sampled.last() != Some(&last) {
            sampled.push(last);
        }
    }

    sampled
}
