//! Eye-Aspect-Ratio (EAR) Computation
//!
//! Turns six 2D eye-contour landmarks into a scalar measure of eye
//! openness. A low EAR indicates closed or closing eyes.
//!
//! Point ordering per eye: outer corner, two upper-lid points, inner
//! corner, two lower-lid points.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 2D landmark coordinate in pixel space.
pub type Point = (f64, f64);

/// EAR computation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EarError {
    #[error("expected 6 eye contour points, got {0}")]
    WrongPointCount(usize),

    #[error("degenerate eye geometry: horizontal span is zero")]
    DegenerateGeometry,
}

/// Six eye-contour landmarks in canonical order.
///
/// Index 0 is the outer corner, 1-2 the upper lid, 3 the inner corner,
/// 4-5 the lower lid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EyeLandmarks(pub [Point; 6]);

impl EyeLandmarks {
    /// Build landmarks from a slice, rejecting anything but exactly six points.
    pub fn from_points(points: &[Point]) -> Result<Self, EarError> {
        let arr: [Point; 6] = points
            .try_into()
            .map_err(|_| EarError::WrongPointCount(points.len()))?;
        Ok(Self(arr))
    }

    /// The eye's EAR: `(|p2-p6| + |p3-p5|) / (2 * |p1-p4|)`.
    pub fn aspect_ratio(&self) -> Result<f64, EarError> {
        eye_aspect_ratio(self)
    }
}

/// Euclidean distance between two points.
fn euclidean(a: Point, b: Point) -> f64 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}

/// Compute a single eye's aspect ratio.
///
/// The numerator sums the two vertical lid distances; the denominator is
/// twice the horizontal corner-to-corner distance. A zero or non-finite
/// horizontal span is reported as [`EarError::DegenerateGeometry`] rather
/// than dividing by zero.
pub fn eye_aspect_ratio(eye: &EyeLandmarks) -> Result<f64, EarError> {
    let p = &eye.0;
    let vertical_a = euclidean(p[1], p[5]);
    let vertical_b = euclidean(p[2], p[4]);
    let horizontal = euclidean(p[0], p[3]);

    if horizontal == 0.0 || !horizontal.is_finite() {
        return Err(EarError::DegenerateGeometry);
    }

    let ratio = (vertical_a + vertical_b) / (2.0 * horizontal);
    if !ratio.is_finite() {
        return Err(EarError::DegenerateGeometry);
    }
    Ok(ratio)
}

/// Mean EAR of both eyes, the per-tick openness signal.
pub fn mean_ear(left: &EyeLandmarks, right: &EyeLandmarks) -> Result<f64, EarError> {
    Ok((eye_aspect_ratio(left)? + eye_aspect_ratio(right)?) / 2.0)
}
