//! Functions for perturbing scene geometry and projections.
//!
//! All functions return new values instead of mutating their inputs, and
//! draw from a caller-owned random number generator so runs can be
//! reproduced by seeding it.

extern crate cgmath;
extern crate rand;

use cgmath::prelude::*;
use cgmath::{Matrix3, Point2, Point3};
use rand::distributions::{Distribution, Normal};
use rand::Rng;

use crate::geometry::{from_rodrigues, to_rodrigues};
use crate::Error;

/// Sigma floor: a zero-sigma axis still draws from a continuous
/// distribution instead of collapsing to exactly zero variance.
const SIGMA_EPS: f64 = 1e-10;

/// Perturb each point with independent per-axis Gaussian noise.
pub fn perturb_points<R: Rng>(
    points: &[Point3<f64>],
    sigmas: [f64; 3],
    rng: &mut R,
) -> Vec<Point3<f64>> {
    let normals = [
        Normal::new(0.0, sigmas[0].max(SIGMA_EPS)),
        Normal::new(0.0, sigmas[1].max(SIGMA_EPS)),
        Normal::new(0.0, sigmas[2].max(SIGMA_EPS)),
    ];
    points
        .iter()
        .map(|point| {
            Point3::new(
                point.x + normals[0].sample(rng),
                point.y + normals[1].sample(rng),
                point.z + normals[2].sample(rng),
            )
        })
        .collect()
}

/// Perturb a normalized projection with the same Gaussian sigma on both axes.
pub fn perturb_projection<R: Rng>(
    projection: Point2<f64>,
    sigma: f64,
    rng: &mut R,
) -> Point2<f64> {
    let normal = Normal::new(0.0, sigma.max(SIGMA_EPS));
    Point2::new(
        projection.x + normal.sample(rng),
        projection.y + normal.sample(rng),
    )
}

/// Perturb the angle magnitude of each rotation, keeping its axis.
///
/// Each rotation is taken through its axis-angle form, the angle is
/// perturbed with `Normal(0, angle_sigma)` and the axis left untouched.
/// An identity rotation has no axis to preserve and is rejected.
pub fn perturb_rotations<R: Rng>(
    rotations: &[Matrix3<f64>],
    angle_sigma: f64,
    rng: &mut R,
) -> Result<Vec<Matrix3<f64>>, Error> {
    let normal = Normal::new(0.0, angle_sigma);
    rotations
        .iter()
        .map(|rotation| {
            let rodrigues = to_rodrigues(rotation)?;
            let angle = rodrigues.magnitude();
            let angle_perturbed = angle + normal.sample(rng);
            Ok(from_rodrigues(rodrigues * (angle_perturbed / angle)))
        })
        .collect()
}

#[cfg(test)]
use cgmath::{Rad, Vector3};
#[cfg(test)]
use rand::rngs::StdRng;
#[cfg(test)]
use rand::SeedableRng;

#[test]
fn test_perturb_points_zero_sigma_floor() {
    let mut rng = StdRng::seed_from_u64(11);
    let points = vec![Point3::new(1.0, 2.0, 3.0), Point3::new(-4.0, 0.0, 9.5)];
    let perturbed = perturb_points(&points, [0.0, 0.0, 0.0], &mut rng);
    for (a, b) in points.iter().zip(&perturbed) {
        let delta = b - a;
        // moved, but by less than the 1e-9 the sigma floor allows
        assert!(delta.magnitude() > 0.0);
        assert!(delta.x.abs() < 1e-9 && delta.y.abs() < 1e-9 && delta.z.abs() < 1e-9);
    }
}

#[test]
fn test_perturb_points_does_not_mutate_input() {
    let mut rng = StdRng::seed_from_u64(12);
    let points = vec![Point3::new(1.0, 1.0, 1.0)];
    let _ = perturb_points(&points, [5.0, 5.0, 5.0], &mut rng);
    assert!(points[0].x == 1.0 && points[0].y == 1.0 && points[0].z == 1.0);
}

#[test]
fn test_perturb_rotations_preserves_axis() {
    let mut rng = StdRng::seed_from_u64(13);
    let rotation = Matrix3::from_axis_angle(Vector3::new(0.0, 0.0, 1.0), Rad(0.8));
    let perturbed = perturb_rotations(&[rotation], 0.05, &mut rng).unwrap();
    let rodrigues = to_rodrigues(&perturbed[0]).unwrap();
    let axis = rodrigues.normalize();
    assert!((axis - Vector3::new(0.0, 0.0, 1.0)).magnitude() < 1e-9);
    // angle moved but stayed in the neighborhood
    assert!((rodrigues.magnitude() - 0.8).abs() < 1.0);
}

#[test]
fn test_perturb_identity_rotation_fails() {
    use cgmath::SquareMatrix;
    let mut rng = StdRng::seed_from_u64(14);
    let result = perturb_rotations(&[Matrix3::identity()], 0.1, &mut rng);
    assert!(result.is_err());
}
