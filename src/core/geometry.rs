//! Joint angle computation.

use crate::pose::types::{FrameSize, Keypoint};
use serde::{Deserialize, Serialize};

/// Three landmark indices forming an angle; the angle is measured at `vertex`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointTriplet {
    pub first: usize,
    pub vertex: usize,
    pub last: usize,
}

impl JointTriplet {
    pub const fn new(first: usize, vertex: usize, last: usize) -> Self {
        Self {
            first,
            vertex,
            last,
        }
    }

    /// Landmark indices in anchor-vertex-anchor order.
    pub fn indices(&self) -> [usize; 3] {
        [self.first, self.vertex, self.last]
    }

    /// Angle at the vertex in pixel space, or `None` if a landmark is missing.
    pub fn angle_in(&self, keypoints: &[Keypoint], frame: FrameSize) -> Option<f64> {
        let a = keypoints.get(self.first)?.to_pixels(frame);
        let b = keypoints.get(self.vertex)?.to_pixels(frame);
        let c = keypoints.get(self.last)?.to_pixels(frame);
        Some(angle(a, b, c))
    }
}

/// Angle in degrees at vertex `b` formed by points `a`, `b` and `c`.
///
/// Returns a value in [0, 180]. Coincident points (a zero-length arm)
/// yield 0 instead of NaN.
pub fn angle(a: (f64, f64), b: (f64, f64), c: (f64, f64)) -> f64 {
    let ab = (a.0 - b.0, a.1 - b.1);
    let cb = (c.0 - b.0, c.1 - b.1);

    let dot = ab.0 * cb.0 + ab.1 * cb.1;
    let mag_ab = (ab.0 * ab.0 + ab.1 * ab.1).sqrt();
    let mag_cb = (cb.0 * cb.0 + cb.1 * cb.1).sqrt();

    if mag_ab == 0.0 || mag_cb == 0.0 {
        return 0.0;
    }

    let cosine = (dot / (mag_ab * mag_cb)).clamp(-1.0, 1.0);
    cosine.acos().to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_line() {
        let deg = angle((0.0, 0.0), (0.5, 0.0), (1.0, 0.0));
        assert!((deg - 180.0).abs() < 1e-6);
    }

    #[test]
    fn test_right_angle() {
        let deg = angle((0.0, 0.0), (0.5, 0.0), (0.5, 0.5));
        assert!((deg - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_folded_arm() {
        let deg = angle((1.0, 0.0), (0.0, 0.0), (2.0, 0.0));
        assert!(deg.abs() < 1e-6);
    }

    #[test]
    fn test_coincident_points_return_zero() {
        assert_eq!(angle((1.0, 1.0), (1.0, 1.0), (2.0, 3.0)), 0.0);
        assert_eq!(angle((0.0, 0.0), (1.0, 1.0), (1.0, 1.0)), 0.0);
    }

    #[test]
    fn test_triplet_uses_pixel_space() {
        // A right angle in normalized space is not a right angle on a 2:1 frame.
        let keypoints = vec![
            Keypoint::new(0.0, 0.0),
            Keypoint::new(0.5, 0.0),
            Keypoint::new(0.5, 0.5),
        ];
        let triplet = JointTriplet::new(0, 1, 2);

        let square = triplet.angle_in(&keypoints, FrameSize::new(100, 100)).unwrap();
        assert!((square - 90.0).abs() < 1e-6);

        let wide = triplet.angle_in(&keypoints, FrameSize::new(200, 100)).unwrap();
        assert!((wide - 90.0).abs() < 1e-6);

        let skewed = JointTriplet::new(0, 1, 2);
        let keypoints = vec![
            Keypoint::new(0.0, 0.0),
            Keypoint::new(0.5, 0.5),
            Keypoint::new(1.0, 0.0),
        ];
        let square = skewed.angle_in(&keypoints, FrameSize::new(100, 100)).unwrap();
        let wide = skewed.angle_in(&keypoints, FrameSize::new(200, 100)).unwrap();
        assert!((square - 90.0).abs() < 1e-6);
        // Stretching x opens the angle: cos = -0.6 on the 2:1 frame.
        assert!((wide - 126.869_897_645).abs() < 1e-6);
    }

    #[test]
    fn test_triplet_missing_landmark() {
        let keypoints = vec![Keypoint::new(0.0, 0.0), Keypoint::new(0.5, 0.0)];
        assert!(JointTriplet::new(0, 1, 2)
            .angle_in(&keypoints, FrameSize::default())
            .is_none());
    }
}
