//! Scene-graph and track containers populated by the generators.

extern crate cgmath;
extern crate serde;

use cgmath::Point3;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::geometry::{Camera, Pose};

/// A 3D scene point with an identity and a color.
#[derive(Debug, Clone, Serialize)]
pub struct Point {
    pub id: String,
    pub coordinates: Point3<f64>,
    pub color: [u8; 3],
}

/// One capture: a camera model reference plus a world-to-camera pose.
#[derive(Debug, Clone, Serialize)]
pub struct Shot {
    pub id: String,
    pub camera_id: String,
    pub pose: Pose,
}

/// A camera's fixed transform relative to its rig origin.
#[derive(Debug, Clone, Serialize)]
pub struct RigCamera {
    pub id: String,
    pub pose: Pose,
}

/// A group of shots sharing one rigid transform, as (rig camera id,
/// shot id) pairs plus the world-to-rig pose.
#[derive(Debug, Clone, Serialize)]
pub struct RigInstance {
    pub id: String,
    pub shots: Vec<(String, String)>,
    pub pose: Pose,
}

/// The scene graph: cameras, shots, points, and rig topology, all keyed
/// by string identity.
#[derive(Debug, Default, Serialize)]
pub struct Reconstruction {
    pub cameras: BTreeMap<String, Camera>,
    pub shots: BTreeMap<String, Shot>,
    pub points: BTreeMap<String, Point>,
    pub rig_cameras: BTreeMap<String, RigCamera>,
    pub rig_instances: BTreeMap<String, RigInstance>,
}

impl Reconstruction {
    pub fn new() -> Reconstruction {
        Default::default()
    }

    pub fn add_camera(&mut self, camera: Camera) {
        self.cameras.insert(camera.id.clone(), camera);
    }

    pub fn create_shot(&mut self, id: &str, camera_id: &str, pose: Pose) {
        self.shots.insert(
            id.to_string(),
            Shot {
                id: id.to_string(),
                camera_id: camera_id.to_string(),
                pose,
            },
        );
    }

    /// Insert a point and return a handle for setting its color.
    pub fn create_point(&mut self, id: &str, coordinates: Point3<f64>) -> &mut Point {
        self.points.insert(
            id.to_string(),
            Point {
                id: id.to_string(),
                coordinates,
                color: [0, 0, 0],
            },
        );
        self.points.get_mut(id).expect("point was just inserted")
    }

    /// Register a rig camera, keeping an existing entry with the same id.
    pub fn add_rig_camera(&mut self, rig_camera: RigCamera) {
        self.rig_cameras
            .entry(rig_camera.id.clone())
            .or_insert(rig_camera);
    }

    pub fn add_rig_instance(&mut self, rig_instance: RigInstance) {
        self.rig_instances
            .insert(rig_instance.id.clone(), rig_instance);
    }

    pub fn num_cameras(&self) -> usize {
        self.cameras.len()
    }

    pub fn num_shots(&self) -> usize {
        self.shots.len()
    }

    pub fn num_points(&self) -> usize {
        self.points.len()
    }
}

impl std::fmt::Display for Reconstruction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Synthetic scene with {} cameras, {} shots, and {} points",
            self.num_cameras(),
            self.num_shots(),
            self.num_points()
        )
    }
}

/// One shot's observation of one track: the noisy normalized projection,
/// a feature scale, the point color, and the per-shot feature index.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub feature_id: usize,
}

/// Append-only store of per-shot track observations.
///
/// At most one observation per (shot, track) pair is the caller's
/// contract; the container does not enforce it.
#[derive(Debug, Default, Serialize)]
pub struct TracksManager {
    observations: BTreeMap<String, BTreeMap<String, Observation>>,
}

impl TracksManager {
    pub fn new() -> TracksManager {
        Default::default()
    }

    pub fn add_observation(&mut self, shot_id: &str, track_id: &str, observation: Observation) {
        self.observations
            .entry(shot_id.to_string())
            .or_insert_with(BTreeMap::new)
            .insert(track_id.to_string(), observation);
    }

    /// Observations of one shot, keyed by track id.
    pub fn observations_of_shot(&self, shot_id: &str) -> Option<&BTreeMap<String, Observation>> {
        self.observations.get(shot_id)
    }

    pub fn num_observations(&self) -> usize {
        self.observations.values().map(|obs| obs.len()).sum()
    }

    /// Number of distinct tracks observed by at least one shot.
    pub fn num_tracks(&self) -> usize {
        self.observations
            .values()
            .flat_map(|obs| obs.keys())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

#[cfg(test)]
use cgmath::SquareMatrix;

#[test]
fn test_point_ids_and_colors() {
    let mut reconstruction = Reconstruction::new();
    reconstruction
        .create_point("0", Point3::new(1.0, 2.0, 3.0))
        .color = [10, 20, 30];
    assert_eq!(reconstruction.num_points(), 1);
    assert_eq!(reconstruction.points["0"].color, [10, 20, 30]);
}

#[test]
fn test_rig_camera_dedup() {
    use cgmath::Matrix3;
    let mut reconstruction = Reconstruction::new();
    let mut pose = Pose::from_rotation(Matrix3::identity());
    pose.set_origin(Point3::new(1.0, 0.0, 0.0));
    reconstruction.add_rig_camera(RigCamera {
        id: "left".to_string(),
        pose,
    });
    reconstruction.add_rig_camera(RigCamera {
        id: "left".to_string(),
        pose: Pose::from_rotation(Matrix3::identity()),
    });
    assert_eq!(reconstruction.rig_cameras.len(), 1);
    // the first registration wins
    let kept = &reconstruction.rig_cameras["left"];
    assert!((kept.pose.get_origin().x - 1.0).abs() < 1e-12);
}

#[test]
fn test_tracks_manager_counts() {
    let obs = |feature_id| Observation {
        x: 0.0,
        y: 0.0,
        scale: 0.004,
        r: 0,
        g: 0,
        b: 0,
        feature_id,
    };
    let mut tracks = TracksManager::new();
    tracks.add_observation("shot_0", "0", obs(0));
    tracks.add_observation("shot_0", "1", obs(1));
    tracks.add_observation("shot_1", "1", obs(0));
    assert_eq!(tracks.num_observations(), 3);
    assert_eq!(tracks.num_tracks(), 2);
    assert_eq!(tracks.observations_of_shot("shot_0").unwrap().len(), 2);
    assert!(tracks.observations_of_shot("shot_9").is_none());
}
