//! Parametric street centerlines, parameter samplers, and local frames.

extern crate cgmath;
extern crate rand;

use cgmath::prelude::*;
use cgmath::{Matrix2, Point2, Vector2};
use rand::distributions::{Distribution, Normal};
use rand::Rng;

use crate::Error;

/// A parametric 2D curve mapping a scalar in [0, 1] to a plane point.
///
/// The domain is not enforced: out-of-range parameters extrapolate a
/// `Line` and wrap periodically around an `Ellipse`.
#[derive(Debug, Clone, Copy)]
pub enum Curve {
    /// A straight segment from the origin along +x.
    Line { length: f64 },
    /// An axis-aligned ellipse centered at the origin. `width` and
    /// `height` are the full diameters.
    Ellipse { width: f64, height: f64 },
}

impl Curve {
    pub fn evaluate(&self, t: f64) -> Point2<f64> {
        match *self {
            Curve::Line { length } => Point2::new(t * length, 0.0),
            Curve::Ellipse { width, height } => {
                let angle = 2.0 * std::f64::consts::PI * t;
                Point2::new(angle.cos() * width / 2.0, angle.sin() * height / 2.0)
            }
        }
    }

    /// Unit tangent of the curve at `t`.
    ///
    /// Fails when the derivative has zero magnitude (a zero-length line or
    /// a fully collapsed ellipse) since the direction is undefined there.
    pub fn tangent(&self, t: f64) -> Result<Vector2<f64>, Error> {
        let d = match *self {
            Curve::Line { length } => Vector2::new(length, 0.0),
            Curve::Ellipse { width, height } => {
                let angle = 2.0 * std::f64::consts::PI * t;
                Vector2::new(-angle.sin() * width / 2.0, angle.cos() * height / 2.0)
            }
        };
        let norm = d.magnitude();
        if norm < 1e-12 {
            return Err(Error::DegenerateGeometry(format!(
                "zero tangent on {:?} at t = {}",
                self, t
            )));
        }
        Ok(d / norm)
    }
}

/// `count` i.i.d. uniform parameter draws in [0, 1).
pub fn samples_random<R: Rng>(count: usize, rng: &mut R) -> Vec<f64> {
    (0..count).map(|_| rng.gen_range(0.0, 1.0)).collect()
}

/// Evenly spaced parameters from `start / length` to 1 with one value per
/// `interval` of arc, each jittered by `Normal(0, interval_noise / length)`.
///
/// The output is not re-sorted after the jitter, so near-duplicate or
/// locally out-of-order samples are possible.
pub fn samples_interval<R: Rng>(
    start: f64,
    length: f64,
    interval: f64,
    interval_noise: f64,
    rng: &mut R,
) -> Vec<f64> {
    let count = (length / interval) as usize;
    if count == 0 {
        return Vec::new();
    }
    let first = start / length;
    let noise = Normal::new(0.0, interval_noise / length);
    (0..count)
        .map(|i| {
            let t = if count == 1 {
                first
            } else {
                first + (1.0 - first) * i as f64 / (count - 1) as f64
            };
            t + noise.sample(rng)
        })
        .collect()
}

/// Point and unit tangent of `curve` at `t`.
pub fn local_frame(curve: &Curve, t: f64) -> Result<(Point2<f64>, Vector2<f64>), Error> {
    Ok((curve.evaluate(t), curve.tangent(t)?))
}

/// Per sample, the curve point and a 2x2 frame with rows `[normal, tangent]`
/// where `normal = (tangent.y, -tangent.x)`.
pub fn samples_and_local_frames(
    samples: &[f64],
    curve: &Curve,
) -> Result<(Vec<Point2<f64>>, Vec<Matrix2<f64>>), Error> {
    let mut points = Vec::with_capacity(samples.len());
    let mut frames = Vec::with_capacity(samples.len());
    for &t in samples {
        let (point, tangent) = local_frame(curve, t)?;
        let normal = Vector2::new(tangent.y, -tangent.x);
        points.push(point);
        frames.push(Matrix2::from_cols(normal, tangent).transpose());
    }
    Ok((points, frames))
}

#[test]
fn test_line_evaluate() {
    let line = Curve::Line { length: 100.0 };
    let p = line.evaluate(0.5);
    assert!(p.x == 50.0 && p.y == 0.0);
    let q = line.evaluate(0.0);
    assert!(q.x == 0.0 && q.y == 0.0);
}

#[test]
fn test_ellipse_on_ellipse() {
    let ellipse = Curve::Ellipse {
        width: 40.0,
        height: 20.0,
    };
    for i in 0..17 {
        let p = ellipse.evaluate(i as f64 / 17.0);
        let r = (p.x / 20.0).powi(2) + (p.y / 10.0).powi(2);
        assert!((r - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_tangent_unit_and_perpendicular_normal() {
    let ellipse = Curve::Ellipse {
        width: 30.0,
        height: 12.0,
    };
    for i in 0..11 {
        let t = i as f64 / 11.0;
        let tangent = ellipse.tangent(t).unwrap();
        assert!((tangent.magnitude() - 1.0).abs() < 1e-12);
        let normal = Vector2::new(tangent.y, -tangent.x);
        assert!(tangent.dot(normal).abs() < 1e-12);
    }
}

#[test]
fn test_degenerate_tangent_fails() {
    let line = Curve::Line { length: 0.0 };
    assert!(line.tangent(0.3).is_err());
    let point = Curve::Ellipse {
        width: 0.0,
        height: 0.0,
    };
    assert!(point.tangent(0.0).is_err());
}

#[test]
fn test_samples_random_in_range() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    let mut rng = StdRng::seed_from_u64(1);
    let samples = samples_random(100, &mut rng);
    assert_eq!(samples.len(), 100);
    assert!(samples.iter().all(|&t| 0.0 <= t && t < 1.0));
}

#[test]
fn test_samples_interval_count_and_spacing() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    let mut rng = StdRng::seed_from_u64(2);
    let samples = samples_interval(0.0, 100.0, 10.0, 0.0, &mut rng);
    assert_eq!(samples.len(), 10);
    assert!(samples[0].abs() < 1e-12);
    assert!((samples[9] - 1.0).abs() < 1e-12);
    // evenly spaced when unjittered
    for w in samples.windows(2) {
        assert!((w[1] - w[0] - 1.0 / 9.0).abs() < 1e-12);
    }
}

#[test]
fn test_samples_interval_jitter_not_sorted_back() {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    let mut rng = StdRng::seed_from_u64(3);
    let samples = samples_interval(0.0, 100.0, 5.0, 2.0, &mut rng);
    assert_eq!(samples.len(), 20);
    // jitter moved every sample off the exact grid
    let clean = samples_interval(0.0, 100.0, 5.0, 0.0, &mut rng);
    assert!(samples.iter().zip(&clean).any(|(a, b)| (a - b).abs() > 0.0));
}
