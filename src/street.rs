//! Street scene geometry and scene-graph assembly.
//!
//! Builds wall and floor point clouds plus a camera trajectory around a
//! centerline curve, and assembles them into a [`Reconstruction`].

extern crate cgmath;
extern crate itertools;
extern crate rand;

use cgmath::prelude::*;
use cgmath::{Matrix3, Point2, Point3, Vector2, Vector3};
use itertools::izip;
use rand::Rng;

use crate::curve::{local_frame, samples_and_local_frames, Curve};
use crate::geometry::{Camera, Pose};
use crate::reconstruction::{Reconstruction, RigCamera, RigInstance};
use crate::Error;

/// Offset curve: each sample point moved `shift / 2` along the local
/// normal `(-tangent.y, tangent.x)`.
pub fn generate_samples_shifted(
    samples: &[f64],
    curve: &Curve,
    shift: f64,
) -> Result<Vec<Point2<f64>>, Error> {
    samples
        .iter()
        .map(|&t| {
            let (point, tangent) = local_frame(curve, t)?;
            let normal = Vector2::new(-tangent.y, tangent.x);
            Ok(point + normal * (shift / 2.0))
        })
        .collect()
}

/// Two wall point clouds at `+-y_size / 2` lateral offset from the curve,
/// each point lifted to a uniformly random height in [0, z_size).
pub fn generate_xy_planes<R: Rng>(
    samples: &[f64],
    curve: &Curve,
    z_size: f64,
    y_size: f64,
    rng: &mut R,
) -> Result<Vec<Point3<f64>>, Error> {
    let left = generate_samples_shifted(samples, curve, y_size)?;
    let right = generate_samples_shifted(samples, curve, -y_size)?;
    Ok(left
        .into_iter()
        .chain(right.into_iter())
        .map(|p| Point3::new(p.x, p.y, rng.gen::<f64>() * z_size))
        .collect())
}

/// Floor point cloud at z = 0: curve points scattered along the local
/// normal by uniform noise in [-thickness / 2, thickness / 2).
pub fn generate_z_plane<R: Rng>(
    samples: &[f64],
    curve: &Curve,
    thickness: f64,
    rng: &mut R,
) -> Result<Vec<Point3<f64>>, Error> {
    samples
        .iter()
        .map(|&t| {
            let (point, tangent) = local_frame(curve, t)?;
            let normal = Vector2::new(-tangent.y, tangent.x);
            let shifted = point + normal * ((rng.gen::<f64>() - 0.5) * thickness);
            Ok(Point3::new(shifted.x, shifted.y, 0.0))
        })
        .collect()
}

/// Walls and floor of a street of the given width and wall height around
/// the centerline curve.
pub fn generate_street<R: Rng>(
    samples: &[f64],
    curve: &Curve,
    height: f64,
    width: f64,
    rng: &mut R,
) -> Result<(Vec<Point3<f64>>, Vec<Point3<f64>>), Error> {
    let walls = generate_xy_planes(samples, curve, height, width, rng)?;
    let floor = generate_z_plane(samples, curve, width, rng)?;
    Ok((walls, floor))
}

/// Camera positions and world-to-camera rotations along the curve.
///
/// Positions are the curve points lifted to z = `height`. Rotation rows
/// are `[normal, [0, 0, -1], tangent]`: the camera looks along the
/// direction of travel with a fixed vertical axis.
pub fn generate_cameras(
    samples: &[f64],
    curve: &Curve,
    height: f64,
) -> Result<(Vec<Point3<f64>>, Vec<Matrix3<f64>>), Error> {
    let (points, frames) = samples_and_local_frames(samples, curve)?;
    let positions = points
        .iter()
        .map(|p| Point3::new(p.x, p.y, height))
        .collect();
    let rotations = frames
        .iter()
        .map(|frame| {
            let normal = frame.row(0);
            let tangent = frame.row(1);
            Matrix3::from_cols(
                Vector3::new(normal.x, normal.y, 0.0),
                Vector3::new(0.0, 0.0, -1.0),
                Vector3::new(tangent.x, tangent.y, 0.0),
            )
            .transpose()
        })
        .collect();
    Ok((positions, rotations))
}

/// Register `camera` and create one shot per (id, position, rotation)
/// triple. The three sequences must have equal lengths.
pub fn add_shots_to_reconstruction(
    shot_ids: &[String],
    positions: &[Point3<f64>],
    rotations: &[Matrix3<f64>],
    camera: Camera,
    reconstruction: &mut Reconstruction,
) -> Result<(), Error> {
    if shot_ids.len() != positions.len() || positions.len() != rotations.len() {
        return Err(Error::DimensionMismatch(format!(
            "{} shot ids, {} positions, {} rotations",
            shot_ids.len(),
            positions.len(),
            rotations.len()
        )));
    }
    let camera_id = camera.id.clone();
    reconstruction.add_camera(camera);
    for (shot_id, position, rotation) in izip!(shot_ids, positions, rotations) {
        let mut pose = Pose::from_rotation(*rotation);
        pose.set_origin(*position);
        reconstruction.create_shot(shot_id, &camera_id, pose);
    }
    Ok(())
}

/// Create one point per coordinate with the given color. Identities are
/// assigned sequentially, continuing from the current point count, so
/// repeated calls never collide.
pub fn add_points_to_reconstruction(
    points: &[Point3<f64>],
    color: [u8; 3],
    reconstruction: &mut Reconstruction,
) {
    let shift = reconstruction.num_points();
    for (i, point) in points.iter().enumerate() {
        reconstruction
            .create_point(&format!("{}", shift + i), *point)
            .color = color;
    }
}

/// Create rig instances from per-instance shot id lists and rig poses.
///
/// Rig cameras are registered once (deduplicated by id) and paired with
/// each instance's shots by index. The instance pose is the world-to-rig
/// transform `(R, -R * origin)`.
pub fn add_rigs_to_reconstruction(
    rig_shots: &[Vec<String>],
    positions: &[Point3<f64>],
    rotations: &[Matrix3<f64>],
    rig_cameras: &[RigCamera],
    reconstruction: &mut Reconstruction,
) -> Result<(), Error> {
    if rig_shots.len() != positions.len() || positions.len() != rotations.len() {
        return Err(Error::DimensionMismatch(format!(
            "{} rig shot lists, {} positions, {} rotations",
            rig_shots.len(),
            positions.len(),
            rotations.len()
        )));
    }
    for rig_camera in rig_cameras {
        reconstruction.add_rig_camera(rig_camera.clone());
    }
    for (i, (shots, position, rotation)) in izip!(rig_shots, positions, rotations).enumerate() {
        if shots.len() != rig_cameras.len() {
            return Err(Error::DimensionMismatch(format!(
                "rig instance {} has {} shots for {} rig cameras",
                i,
                shots.len(),
                rig_cameras.len()
            )));
        }
        let pairs = rig_cameras
            .iter()
            .zip(shots)
            .map(|(rig_camera, shot_id)| (rig_camera.id.clone(), shot_id.clone()))
            .collect();
        let pose = Pose::new(*rotation, -(*rotation * position.to_vec()));
        reconstruction.add_rig_instance(RigInstance {
            id: i.to_string(),
            shots: pairs,
            pose,
        });
    }
    Ok(())
}

/// Points sharing one color.
#[derive(Debug, Clone)]
pub struct PointGroup {
    pub points: Vec<Point3<f64>>,
    pub color: [u8; 3],
}

/// Shots sharing one camera model.
#[derive(Debug, Clone)]
pub struct ShotGroup {
    pub camera: Camera,
    pub shot_ids: Vec<String>,
    pub positions: Vec<Point3<f64>>,
    pub rotations: Vec<Matrix3<f64>>,
}

/// Rig instances sharing one set of rig cameras.
#[derive(Debug, Clone)]
pub struct RigGroup {
    pub rig_cameras: Vec<RigCamera>,
    pub shots: Vec<Vec<String>>,
    pub positions: Vec<Point3<f64>>,
    pub rotations: Vec<Matrix3<f64>>,
}

/// Assemble a full scene graph from point, shot, and rig groups.
pub fn create_reconstruction(
    point_groups: &[PointGroup],
    shot_groups: &[ShotGroup],
    rig_groups: &[RigGroup],
) -> Result<Reconstruction, Error> {
    let mut reconstruction = Reconstruction::new();
    for group in point_groups {
        add_points_to_reconstruction(&group.points, group.color, &mut reconstruction);
    }
    for group in shot_groups {
        add_shots_to_reconstruction(
            &group.shot_ids,
            &group.positions,
            &group.rotations,
            group.camera.clone(),
            &mut reconstruction,
        )?;
    }
    for group in rig_groups {
        add_rigs_to_reconstruction(
            &group.shots,
            &group.positions,
            &group.rotations,
            &group.rig_cameras,
            &mut reconstruction,
        )?;
    }
    Ok(reconstruction)
}

#[cfg(test)]
use rand::rngs::StdRng;
#[cfg(test)]
use rand::SeedableRng;

#[test]
fn test_walls_straddle_the_centerline() {
    let mut rng = StdRng::seed_from_u64(21);
    let curve = Curve::Line { length: 100.0 };
    let samples: Vec<f64> = (0..10).map(|i| i as f64 / 9.0).collect();
    let walls = generate_xy_planes(&samples, &curve, 12.0, 20.0, &mut rng).unwrap();
    assert_eq!(walls.len(), 20);
    // a line along +x has normals along +-y, so walls sit at y = +-10
    for wall in &walls {
        assert!((wall.y.abs() - 10.0).abs() < 1e-9);
        assert!(0.0 <= wall.z && wall.z < 12.0);
    }
}

#[test]
fn test_floor_scatter_is_bounded() {
    let mut rng = StdRng::seed_from_u64(22);
    let curve = Curve::Line { length: 100.0 };
    let samples: Vec<f64> = (0..50).map(|i| i as f64 / 49.0).collect();
    let floor = generate_z_plane(&samples, &curve, 20.0, &mut rng).unwrap();
    for p in &floor {
        assert!(p.z == 0.0);
        assert!(p.y.abs() <= 10.0);
    }
}

#[test]
fn test_camera_rotations_are_orthonormal() {
    let curve = Curve::Ellipse {
        width: 80.0,
        height: 40.0,
    };
    let samples: Vec<f64> = (0..12).map(|i| i as f64 / 12.0).collect();
    let (positions, rotations) = generate_cameras(&samples, &curve, 1.7).unwrap();
    assert_eq!(positions.len(), rotations.len());
    for (position, rotation) in positions.iter().zip(&rotations) {
        assert!(position.z == 1.7);
        let rt = rotation * rotation.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((rt[i][j] - expected).abs() < 1e-9);
            }
        }
        assert!((rotation.determinant() - 1.0).abs() < 1e-9);
    }
}

#[test]
fn test_add_shots_rejects_mismatched_lengths() {
    let mut reconstruction = Reconstruction::new();
    let camera = Camera::perspective("cam", 800, 600, 1.0).unwrap();
    let ids = vec!["shot_0".to_string(), "shot_1".to_string()];
    let positions = vec![Point3::new(0.0, 0.0, 1.0)];
    let rotations = vec![Matrix3::from_angle_z(cgmath::Rad(0.1))];
    let result =
        add_shots_to_reconstruction(&ids, &positions, &rotations, camera, &mut reconstruction);
    assert!(result.is_err());
}

#[test]
fn test_point_ids_continue_across_calls() {
    let mut reconstruction = Reconstruction::new();
    add_points_to_reconstruction(
        &[Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)],
        [255, 0, 0],
        &mut reconstruction,
    );
    add_points_to_reconstruction(&[Point3::new(2.0, 0.0, 0.0)], [0, 255, 0], &mut reconstruction);
    assert_eq!(reconstruction.num_points(), 3);
    assert!(reconstruction.points.contains_key("2"));
    assert_eq!(reconstruction.points["2"].color, [0, 255, 0]);
}

#[test]
fn test_rig_instance_pose_inverts_origin() {
    let mut reconstruction = Reconstruction::new();
    let rotation = Matrix3::from_angle_z(cgmath::Rad(0.4));
    let origin = Point3::new(5.0, -1.0, 2.0);
    let rig_cameras = vec![RigCamera {
        id: "front".to_string(),
        pose: Pose::from_rotation(Matrix3::from_angle_z(cgmath::Rad(0.0))),
    }];
    add_rigs_to_reconstruction(
        &[vec!["shot_0".to_string()]],
        &[origin],
        &[rotation],
        &rig_cameras,
        &mut reconstruction,
    )
    .unwrap();
    let instance = &reconstruction.rig_instances["0"];
    // pose (R, -R * origin) maps the rig origin to zero
    let mapped = instance.pose.transform(origin);
    assert!(mapped.to_vec().magnitude() < 1e-12);
}

#[test]
fn test_create_reconstruction_assembles_all_groups() {
    let camera = Camera::perspective("cam", 800, 600, 1.0).unwrap();
    let rotation = Matrix3::from_angle_z(cgmath::Rad(0.2));
    let reconstruction = create_reconstruction(
        &[PointGroup {
            points: vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 2.0, 3.0)],
            color: [255, 0, 0],
        }],
        &[ShotGroup {
            camera,
            shot_ids: vec!["shot_0".to_string()],
            positions: vec![Point3::new(0.0, 0.0, 1.7)],
            rotations: vec![rotation],
        }],
        &[RigGroup {
            rig_cameras: vec![RigCamera {
                id: "front".to_string(),
                pose: Pose::from_rotation(rotation),
            }],
            shots: vec![vec!["shot_0".to_string()]],
            positions: vec![Point3::new(0.0, 0.0, 1.7)],
            rotations: vec![rotation],
        }],
    )
    .unwrap();
    assert_eq!(reconstruction.num_points(), 2);
    assert_eq!(reconstruction.num_shots(), 1);
    assert_eq!(reconstruction.num_cameras(), 1);
    assert_eq!(reconstruction.rig_cameras.len(), 1);
    assert_eq!(reconstruction.rig_instances.len(), 1);
    assert_eq!(reconstruction.rig_instances["0"].shots[0].1, "shot_0");
    assert_eq!(reconstruction.points["1"].color, [255, 0, 0]);
}
