// Arclength resampling of polylines.
//
// restroke(points, fractions) → one point per fraction, placed at that
// fraction of the polyline's total arclength (linear interpolation inside
// the segment that contains it).

use glam::Vec3;

/// Resample `points` at the given fractions of total arclength.
///
/// Fractions are clamped into [0, 1] and need not be sorted or distinct.
/// Zero-length segments are skipped. If the polyline has fewer than 2
/// usable points (or zero total length) the result is empty; callers treat
/// a short result as "stroke too short".
pub fn restroke(points: &[Vec3], fractions: &[f32]) -> Vec<Vec3> {
    // Collapse consecutive duplicates so every segment has positive length.
    let mut usable: Vec<Vec3> = Vec::with_capacity(points.len());
    for &p in points {
        if usable.last().is_none_or(|&last| last.distance_squared(p) > 0.0) {
            usable.push(p);
        }
    }
    if usable.len() < 2 {
        return Vec::new();
    }

    // cumulative[i] = arclength from usable[0] to usable[i]
    let mut cumulative = Vec::with_capacity(usable.len());
    let mut total = 0.0f32;
    cumulative.push(0.0);
    for w in usable.windows(2) {
        total += w[0].distance(w[1]);
        cumulative.push(total);
    }
    if total <= 0.0 {
        return Vec::new();
    }

    let last = usable.len() - 1;
    fractions
        .iter()
        .map(|&t| {
            let target = t.clamp(0.0, 1.0) * total;
            if target <= 0.0 {
                return usable[0];
            }
            if target >= total {
                return usable[last];
            }
            // First vertex whose cumulative length reaches the target.
            let hi = cumulative.partition_point(|&c| c < target).clamp(1, last);
            let lo = hi - 1;
            let seg = cumulative[hi] - cumulative[lo];
            let s = (target - cumulative[lo]) / seg;
            usable[lo].lerp(usable[hi], s)
        })
        .collect()
}

/// Evenly spaced fractions `i / count` for `i in 0..=count` (open strip).
pub fn strip_fractions(count: usize) -> Vec<f32> {
    let count = count.max(1);
    (0..=count).map(|i| i as f32 / count as f32).collect()
}

/// Evenly spaced fractions `i / count` for `i in 0..count` (closed loop,
/// the final point coincides with the first and is omitted).
pub fn loop_fractions(count: usize) -> Vec<f32> {
    let count = count.max(1);
    (0..count).map(|i| i as f32 / count as f32).collect()
}
