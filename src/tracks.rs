//! Track synthesis: project every scene point into every shot, cull by
//! field of view, facing, and depth, perturb the survivors, and emit
//! observations with synthesized descriptors.

extern crate cgmath;
extern crate indicatif;
extern crate rand;
extern crate serde;

use cgmath::prelude::*;
use cgmath::Point3;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::geometry::Pose;
use crate::noise::perturb_projection;
use crate::reconstruction::{Observation, Point, Reconstruction, TracksManager};
use crate::Error;

pub const DESCRIPTOR_SIZE: usize = 128;
const DESCRIPTOR_NON_ZEROES: usize = 5;
const DEFAULT_SCALE: f64 = 0.004;

pub(crate) fn progress_bar(length: u64, message: &str, verbose: bool) -> ProgressBar {
    if !verbose {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(length);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{msg} {bar:40} {pos}/{len} ({eta})")
            .progress_chars("=> "),
    );
    pb.set_message(message);
    pb
}

/// Per-shot arrays of (x, y, scale) features, descriptors, and colors,
/// index-aligned with each other and with the emitted observation order.
#[derive(Debug, Default, Clone, Serialize)]
pub struct ShotFeatures {
    pub features: Vec<(f64, f64, f64)>,
    pub descriptors: Vec<Vec<f32>>,
    pub colors: Vec<[u8; 3]>,
}

/// A sparse 128-dimensional descriptor: 5 distinct random dimensions get
/// a rounded random value in [1, 255], the rest stay zero.
fn synthesize_descriptor<R: Rng>(rng: &mut R) -> Vec<f32> {
    let mut descriptor = vec![0.0f32; DESCRIPTOR_SIZE];
    for index in rand::seq::index::sample(rng, DESCRIPTOR_SIZE, DESCRIPTOR_NON_ZEROES).iter() {
        descriptor[index] = rng.gen_range(1.0f64, 255.0).round() as f32;
    }
    descriptor
}

fn is_in_front(coordinates: Point3<f64>, pose: &Pose) -> bool {
    (coordinates - pose.get_origin()).dot(pose.get_rotation_matrix().row(2)) > 0.0
}

fn check_depth(coordinates: Point3<f64>, pose: &Pose, maximum_depth: f64) -> bool {
    pose.transform(coordinates).z < maximum_depth
}

/// Generate projection data from a reconstruction, considering a maximum
/// viewing depth and Gaussian noise added to the ideal projections.
///
/// Every point is projected into every shot and kept when it falls inside
/// the sensor extent, in front of the camera, and closer than
/// `maximum_depth` along the viewing axis. Surviving projections are
/// perturbed per axis with sigma `noise / max(width, height)`. Descriptors
/// are cached per point, so the same point carries an identical descriptor
/// in every shot that sees it.
pub fn generate_track_data<R: Rng>(
    reconstruction: &Reconstruction,
    maximum_depth: f64,
    noise: f64,
    verbose: bool,
    rng: &mut R,
) -> Result<(BTreeMap<String, ShotFeatures>, TracksManager), Error> {
    let mut tracks_manager = TracksManager::new();

    let mut track_descriptors = BTreeMap::new();
    for track_id in reconstruction.points.keys() {
        track_descriptors.insert(track_id.clone(), synthesize_descriptor(rng));
    }

    let all_points: Vec<&Point> = reconstruction.points.values().collect();
    let all_coordinates: Vec<Point3<f64>> =
        all_points.iter().map(|point| point.coordinates).collect();

    let pb = progress_bar(
        reconstruction.shots.len() as u64,
        "Synthesizing tracks",
        verbose,
    );
    let mut shot_features = BTreeMap::new();
    for (shot_id, shot) in &reconstruction.shots {
        let camera = reconstruction.cameras.get(&shot.camera_id).ok_or_else(|| {
            Error::InvalidCameraModel(format!(
                "shot {} references unknown camera {}",
                shot_id, shot.camera_id
            ))
        })?;

        let projections = camera.project_many(&shot.pose, &all_coordinates);
        let perturbation = noise / f64::from(camera.width.max(camera.height));

        let mut inside = ShotFeatures::default();
        for (point, projection) in all_points.iter().zip(projections) {
            if !camera.is_inside(projection) {
                continue;
            }
            if !is_in_front(point.coordinates, &shot.pose) {
                continue;
            }
            if !check_depth(point.coordinates, &shot.pose, maximum_depth) {
                continue;
            }

            let projection = perturb_projection(projection, perturbation, rng);
            let feature_id = inside.features.len();
            inside
                .features
                .push((projection.x, projection.y, DEFAULT_SCALE));
            inside
                .descriptors
                .push(track_descriptors[&point.id].clone());
            inside.colors.push(point.color);
            tracks_manager.add_observation(
                shot_id,
                &point.id,
                Observation {
                    x: projection.x,
                    y: projection.y,
                    scale: DEFAULT_SCALE,
                    r: point.color[0],
                    g: point.color[1],
                    b: point.color[2],
                    feature_id,
                },
            );
        }
        shot_features.insert(shot_id.clone(), inside);
        pb.inc(1);
    }
    pb.finish_and_clear();

    Ok((shot_features, tracks_manager))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Camera;
    use crate::street::{add_points_to_reconstruction, add_shots_to_reconstruction};
    use cgmath::{Matrix3, Vector3};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    // world-to-camera rotation of a camera on the x axis looking along +x
    fn forward_rotation() -> Matrix3<f64> {
        Matrix3::from_cols(
            Vector3::new(0.0, -1.0, 0.0),
            Vector3::new(0.0, 0.0, -1.0),
            Vector3::new(1.0, 0.0, 0.0),
        )
        .transpose()
    }

    fn scene_with_points(
        camera_xs: &[f64],
        points: &[Point3<f64>],
    ) -> Reconstruction {
        let mut reconstruction = Reconstruction::new();
        add_points_to_reconstruction(points, [200, 100, 50], &mut reconstruction);
        let camera = Camera::perspective("cam", 800, 600, 1.0723).unwrap();
        let ids: Vec<String> = (0..camera_xs.len())
            .map(|i| format!("shot_{:04}", i))
            .collect();
        let positions: Vec<Point3<f64>> =
            camera_xs.iter().map(|&x| Point3::new(x, 0.0, 1.7)).collect();
        let rotations = vec![forward_rotation(); camera_xs.len()];
        add_shots_to_reconstruction(&ids, &positions, &rotations, camera, &mut reconstruction)
            .unwrap();
        reconstruction
    }

    #[test]
    fn test_on_axis_point_is_retained_near_center() {
        let mut rng = StdRng::seed_from_u64(31);
        let reconstruction = scene_with_points(&[0.0], &[Point3::new(10.0, 0.0, 1.7)]);
        let (features, tracks) =
            generate_track_data(&reconstruction, 50.0, 0.0, false, &mut rng).unwrap();
        assert_eq!(tracks.num_observations(), 1);
        let shot = &features["shot_0000"];
        assert_eq!(shot.features.len(), 1);
        let (x, y, scale) = shot.features[0];
        assert!(x.abs() < 1e-8 && y.abs() < 1e-8);
        assert!(scale == 0.004);
    }

    #[test]
    fn test_point_behind_camera_is_never_observed() {
        let mut rng = StdRng::seed_from_u64(32);
        let reconstruction = scene_with_points(&[0.0], &[Point3::new(-10.0, 0.0, 1.7)]);
        let (_, tracks) =
            generate_track_data(&reconstruction, 50.0, 0.0, false, &mut rng).unwrap();
        assert_eq!(tracks.num_observations(), 0);
    }

    #[test]
    fn test_point_at_camera_origin_is_never_observed() {
        let mut rng = StdRng::seed_from_u64(33);
        let reconstruction = scene_with_points(&[0.0], &[Point3::new(0.0, 0.0, 1.7)]);
        let (_, tracks) =
            generate_track_data(&reconstruction, 50.0, 0.0, false, &mut rng).unwrap();
        assert_eq!(tracks.num_observations(), 0);
    }

    #[test]
    fn test_point_beyond_maximum_depth_is_culled() {
        let mut rng = StdRng::seed_from_u64(34);
        let reconstruction = scene_with_points(&[0.0], &[Point3::new(60.0, 0.0, 1.7)]);
        let (_, tracks) =
            generate_track_data(&reconstruction, 50.0, 0.0, false, &mut rng).unwrap();
        assert_eq!(tracks.num_observations(), 0);
    }

    #[test]
    fn test_descriptors_are_sparse_and_shared_across_shots() {
        let mut rng = StdRng::seed_from_u64(35);
        // two cameras both see the same point
        let reconstruction =
            scene_with_points(&[0.0, 5.0], &[Point3::new(10.0, 0.0, 1.7)]);
        let (features, tracks) =
            generate_track_data(&reconstruction, 50.0, 0.0, false, &mut rng).unwrap();
        assert_eq!(tracks.num_observations(), 2);
        let a = &features["shot_0000"].descriptors[0];
        let b = &features["shot_0001"].descriptors[0];
        assert_eq!(a, b);
        assert_eq!(a.len(), DESCRIPTOR_SIZE);
        let non_zeroes: Vec<&f32> = a.iter().filter(|v| **v != 0.0).collect();
        assert_eq!(non_zeroes.len(), 5);
        assert!(non_zeroes.iter().all(|v| 1.0 <= **v && **v <= 255.0));
    }

    #[test]
    fn test_feature_indices_are_contiguous() {
        let mut rng = StdRng::seed_from_u64(36);
        let points: Vec<Point3<f64>> = (0..8)
            .map(|i| Point3::new(10.0 + i as f64, (i as f64 - 4.0) / 2.0, 1.7))
            .collect();
        let reconstruction = scene_with_points(&[0.0], &points);
        let (features, tracks) =
            generate_track_data(&reconstruction, 50.0, 0.0, false, &mut rng).unwrap();
        let observed = tracks.observations_of_shot("shot_0000").unwrap();
        assert!(!observed.is_empty());
        let mut indices: Vec<usize> = observed.values().map(|o| o.feature_id).collect();
        indices.sort();
        let expected: Vec<usize> = (0..indices.len()).collect();
        assert_eq!(indices, expected);
        // aligned with the per-shot arrays
        assert_eq!(features["shot_0000"].features.len(), observed.len());
        assert_eq!(features["shot_0000"].colors.len(), observed.len());
    }

    #[test]
    fn test_straight_line_end_to_end() {
        // ten cameras along a 100 unit line, one point ten units ahead of
        // the first camera: only the first camera observes it
        let mut rng = StdRng::seed_from_u64(37);
        let camera_xs: Vec<f64> = (0..10).map(|i| i as f64 * 100.0 / 9.0).collect();
        let reconstruction = scene_with_points(&camera_xs, &[Point3::new(10.0, 0.0, 1.7)]);
        let (features, tracks) =
            generate_track_data(&reconstruction, 50.0, 0.0, false, &mut rng).unwrap();
        assert_eq!(tracks.num_observations(), 1);
        assert_eq!(features["shot_0000"].features.len(), 1);
        let (x, y, _) = features["shot_0000"].features[0];
        assert!(x.abs() < 1e-8 && y.abs() < 1e-8);
        for i in 1..10 {
            assert!(features[&format!("shot_{:04}", i)].features.is_empty());
        }
    }

    #[test]
    fn test_projection_noise_scales_with_sensor() {
        let mut rng = StdRng::seed_from_u64(38);
        let reconstruction = scene_with_points(&[0.0], &[Point3::new(10.0, 0.0, 1.7)]);
        let (features, _) =
            generate_track_data(&reconstruction, 50.0, 8.0, false, &mut rng).unwrap();
        let (x, y, _) = features["shot_0000"].features[0];
        // sigma is 8 / 800 = 0.01; a 10 sigma excursion would be absurd
        assert!(x.abs() < 0.1 && y.abs() < 0.1);
        assert!(x != 0.0 || y != 0.0);
    }
}
