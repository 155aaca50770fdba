//! Simulated exif metadata derived from an assembled scene.

extern crate cgmath;
extern crate rand;
extern crate serde;

use cgmath::prelude::*;
use cgmath::Point3;
use rand::Rng;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::geometry::{shot_lla_and_compass, TopocentricConverter};
use crate::noise::perturb_points;
use crate::reconstruction::Reconstruction;
use crate::Error;

/// Nominal trajectory speed used to accumulate capture timestamps.
const SPEED_MS: f64 = 10.0;

#[derive(Debug, Clone, Serialize)]
pub struct GpsExif {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub dop: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompassExif {
    pub angle: f64,
}

/// Simulated capture metadata for one shot.
#[derive(Debug, Clone, Serialize)]
pub struct Exif {
    pub width: u32,
    pub height: u32,
    pub focal_ratio: f64,
    pub camera: String,
    pub make: String,
    pub capture_time: f64,
    pub gps: GpsExif,
    pub compass: CompassExif,
}

/// Generate fake exif metadata from the reconstruction.
///
/// Shots are traversed in ascending id order and the capture time grows
/// with the distance between consecutive camera origins at a nominal
/// speed. When shot ids are not named in trajectory order the timestamps
/// are still monotonic in id order, not in physical order. GPS positions
/// are the true origins perturbed by `gps_noise` on every axis and
/// converted through a topocentric reference anchored at the world origin.
///
/// Fails when a shot references a camera id missing from the
/// reconstruction.
pub fn generate_exifs<R: Rng>(
    reconstruction: &Reconstruction,
    gps_noise: f64,
    rng: &mut R,
) -> Result<BTreeMap<String, Exif>, Error> {
    let reference = TopocentricConverter::new(0.0, 0.0, 0.0);
    let mut previous_pose: Option<Point3<f64>> = None;
    let mut previous_time = 0.0;
    let mut exifs = BTreeMap::new();
    for (shot_id, shot) in &reconstruction.shots {
        let camera = reconstruction.cameras.get(&shot.camera_id).ok_or_else(|| {
            Error::InvalidCameraModel(format!(
                "shot {} references unknown camera {}",
                shot_id, shot.camera_id
            ))
        })?;
        let origin = shot.pose.get_origin();

        if let Some(previous) = previous_pose {
            previous_time += (origin - previous).magnitude() * SPEED_MS;
        }
        previous_pose = Some(origin);

        let perturbed = perturb_points(&[origin], [gps_noise; 3], rng)[0];
        let (_, _, _, compass) = shot_lla_and_compass(shot, &reference);
        let (latitude, longitude, altitude) =
            reference.to_lla(perturbed.x, perturbed.y, perturbed.z);

        exifs.insert(
            shot_id.clone(),
            Exif {
                width: camera.width,
                height: camera.height,
                focal_ratio: camera.focal,
                camera: camera.id.clone(),
                make: camera.id.clone(),
                capture_time: previous_time,
                gps: GpsExif {
                    latitude,
                    longitude,
                    altitude,
                    dop: gps_noise,
                },
                compass: CompassExif { angle: compass },
            },
        );
    }
    Ok(exifs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::Curve;
    use crate::geometry::Camera;
    use crate::street::{add_shots_to_reconstruction, generate_cameras};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn line_scene(count: usize) -> Reconstruction {
        let curve = Curve::Line { length: 90.0 };
        let samples: Vec<f64> = (0..count).map(|i| i as f64 / (count - 1) as f64).collect();
        let (positions, rotations) = generate_cameras(&samples, &curve, 1.7).unwrap();
        let camera = Camera::perspective("cam", 800, 600, 0.9).unwrap();
        let ids: Vec<String> = (0..count).map(|i| format!("shot_{:04}", i)).collect();
        let mut reconstruction = Reconstruction::new();
        add_shots_to_reconstruction(&ids, &positions, &rotations, camera, &mut reconstruction)
            .unwrap();
        reconstruction
    }

    #[test]
    fn test_capture_time_accumulates_distance_times_speed() {
        let mut rng = StdRng::seed_from_u64(41);
        let reconstruction = line_scene(10);
        let exifs = generate_exifs(&reconstruction, 0.0, &mut rng).unwrap();
        assert_eq!(exifs.len(), 10);
        // cameras are 10 apart, so time steps by 100 at speed 10
        for (i, (_, exif)) in exifs.iter().enumerate() {
            assert!((exif.capture_time - i as f64 * 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_capture_time_is_monotonic_in_id_order() {
        let mut rng = StdRng::seed_from_u64(42);
        let reconstruction = line_scene(25);
        let exifs = generate_exifs(&reconstruction, 3.0, &mut rng).unwrap();
        let times: Vec<f64> = exifs.values().map(|e| e.capture_time).collect();
        for w in times.windows(2) {
            assert!(w[0] <= w[1]);
        }
    }

    #[test]
    fn test_gps_without_noise_stays_near_anchor() {
        let mut rng = StdRng::seed_from_u64(43);
        let reconstruction = line_scene(5);
        let exifs = generate_exifs(&reconstruction, 0.0, &mut rng).unwrap();
        for exif in exifs.values() {
            // 90 east-west units stay within a fraction of a degree
            assert!(exif.gps.latitude.abs() < 1e-3);
            assert!(exif.gps.longitude.abs() < 1e-2);
            assert!(exif.gps.dop == 0.0);
        }
    }

    #[test]
    fn test_compass_faces_east_along_x() {
        let mut rng = StdRng::seed_from_u64(44);
        let reconstruction = line_scene(3);
        let exifs = generate_exifs(&reconstruction, 0.0, &mut rng).unwrap();
        for exif in exifs.values() {
            // a line street along +x means the cameras look due east
            assert!((exif.compass.angle - 90.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_unknown_camera_id_fails() {
        let mut rng = StdRng::seed_from_u64(45);
        let mut reconstruction = line_scene(3);
        let pose = reconstruction.shots["shot_0000"].pose.clone();
        reconstruction.create_shot("shot_9999", "ghost", pose);
        assert!(generate_exifs(&reconstruction, 0.0, &mut rng).is_err());
    }
}
