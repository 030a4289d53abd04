//! Survey flight paths.

use survey_core::path_length_m;
use survey_core::spatial::METERS_PER_DEGREE;

/// Closed square ring of `side_m` meters centered on `[lon, lat]`, measured
/// with the same planar scale the server uses.
pub fn square_ring(center: [f64; 2], side_m: f64) -> Vec<[f64; 2]> {
    let [lon, lat] = center;
    let half = side_m / 2.0 / METERS_PER_DEGREE;
    let (half_lon, half_lat) = (half, half);

    vec![
        [lon - half_lon, lat - half_lat],
        [lon + half_lon, lat - half_lat],
        [lon + half_lon, lat + half_lat],
        [lon - half_lon, lat + half_lat],
        [lon - half_lon, lat - half_lat],
    ]
}

/// Constant-speed walk along a ring of `[lon, lat]` points.
pub struct RingPath {
    points: Vec<[f64; 2]>,
    /// Distance from the start to each point, meters.
    offsets: Vec<f64>,
}

impl RingPath {
    pub fn new(points: Vec<[f64; 2]>) -> Self {
        let mut offsets = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, point) in points.iter().enumerate() {
            if i > 0 {
                total += path_length_m(&[points[i - 1], *point]);
            }
            offsets.push(total);
        }
        Self { points, offsets }
    }

    pub fn length_m(&self) -> f64 {
        self.offsets.last().copied().unwrap_or(0.0)
    }

    /// Position after covering `fraction` (clamped to 0..=1) of the ring.
    pub fn position_at(&self, fraction: f64) -> Option<[f64; 2]> {
        let first = *self.points.first()?;
        let length = self.length_m();
        if length <= 0.0 {
            return Some(first);
        }

        let target = fraction.clamp(0.0, 1.0) * length;
        for i in 1..self.points.len() {
            let (start, end) = (self.offsets[i - 1], self.offsets[i]);
            if target <= end {
                let span = end - start;
                let t = if span > 0.0 { (target - start) / span } else { 0.0 };
                let (a, b) = (self.points[i - 1], self.points[i]);
                return Some([a[0] + t * (b[0] - a[0]), a[1] + t * (b[1] - a[1])]);
            }
        }
        self.points.last().copied()
    }
}
