//! Camera, pose, and geodetic primitives used by the scene generators.

extern crate cgmath;
extern crate serde;

use cgmath::prelude::*;
use cgmath::{AbsDiffEq, Matrix3, Point2, Point3, Quaternion, Rad, Vector3};
use serde::Serialize;

use crate::reconstruction::Shot;
use crate::Error;

const WGS84_A: f64 = 6378137.0;
const WGS84_B: f64 = 6356752.314245;

/// Convert a Rodrigues vector to a rotation matrix.
pub fn from_rodrigues(x: Vector3<f64>) -> Matrix3<f64> {
    let theta2 = x.dot(x);
    if theta2 > Rad::<f64>::default_epsilon() {
        Matrix3::from_axis_angle(x.normalize(), Rad(x.magnitude()))
    } else {
        // taylor series approximation from ceres-solver
        Matrix3::from(Quaternion::from(Matrix3::new(
            1.0, x[2], -x[1], -x[2], 1.0, x[0], x[1], -x[0], 1.0,
        )))
    }
}

/// Convert a rotation matrix to a Rodrigues vector.
///
/// The identity rotation has no defined axis and is rejected.
pub fn to_rodrigues(m: &Matrix3<f64>) -> Result<Vector3<f64>, Error> {
    let q = Quaternion::from(*m);
    let s = q.s.min(1.0).max(-1.0);
    let sin_half2 = 1.0 - s * s;
    if sin_half2 < std::f64::EPSILON {
        return Err(Error::DegenerateGeometry(
            "rotation with zero angle has no axis".to_string(),
        ));
    }
    let angle = 2.0 * s.acos();
    let axis = q.v / sin_half2.sqrt();
    Ok(axis.normalize() * angle)
}

/// A perspective camera with normalized intrinsics.
///
/// Projections are in pixel-normalized coordinates: the longer sensor
/// dimension spans (-0.5, 0.5) and `focal` is relative to it.
#[derive(Debug, Clone, Serialize)]
pub struct Camera {
    pub id: String,
    pub width: u32,
    pub height: u32,
    pub focal: f64,
}

impl Camera {
    /// Create a perspective camera. A camera with a zero sensor dimension
    /// cannot bound its field of view and is rejected.
    pub fn perspective(id: &str, width: u32, height: u32, focal: f64) -> Result<Camera, Error> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidCameraModel(format!(
                "camera {} has a zero sensor dimension ({}x{})",
                id, width, height
            )));
        }
        Ok(Camera {
            id: id.to_string(),
            width,
            height,
            focal,
        })
    }

    /// Project world points through `pose` into normalized image coordinates.
    pub fn project_many(&self, pose: &Pose, points: &[Point3<f64>]) -> Vec<Point2<f64>> {
        points
            .iter()
            .map(|point| {
                let p = pose.transform(*point);
                Point2::new(self.focal * p.x / p.z, self.focal * p.y / p.z)
            })
            .collect()
    }

    /// True if a normalized projection falls inside the sensor extent. The
    /// longer dimension spans (-0.5, 0.5), the shorter a proportionally
    /// scaled range. Bounds are strict.
    pub fn is_inside(&self, projection: Point2<f64>) -> bool {
        let w = f64::from(self.width);
        let h = f64::from(self.height);
        if self.width > self.height {
            let bound = h / (2.0 * w);
            -0.5 < projection.x && projection.x < 0.5 && -bound < projection.y && projection.y < bound
        } else {
            let bound = w / (2.0 * h);
            -0.5 < projection.y && projection.y < 0.5 && -bound < projection.x && projection.x < bound
        }
    }
}

/// A world-to-camera transform `p_camera = R * p_world + t`.
#[derive(Debug, Clone, Serialize)]
pub struct Pose {
    rotation: Matrix3<f64>,
    translation: Vector3<f64>,
}

impl Pose {
    pub fn new(rotation: Matrix3<f64>, translation: Vector3<f64>) -> Pose {
        Pose {
            rotation,
            translation,
        }
    }

    pub fn from_rotation(rotation: Matrix3<f64>) -> Pose {
        Pose {
            rotation,
            translation: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    /// Place the camera origin at `origin` in world coordinates.
    pub fn set_origin(&mut self, origin: Point3<f64>) {
        self.translation = -(self.rotation * origin.to_vec());
    }

    /// Camera origin in world coordinates (`-R^T t`).
    pub fn get_origin(&self) -> Point3<f64> {
        Point3::from_vec(-(self.rotation.transpose() * self.translation))
    }

    pub fn get_rotation_matrix(&self) -> Matrix3<f64> {
        self.rotation
    }

    /// Map a world point into the camera frame.
    pub fn transform(&self, point: Point3<f64>) -> Point3<f64> {
        Point3::from_vec(self.rotation * point.to_vec() + self.translation)
    }
}

/// Converts coordinates in a topocentric frame (x east, y north, z up,
/// anchored at a reference geodetic position) to WGS84 lat/lon/alt.
#[derive(Debug, Clone, Copy)]
pub struct TopocentricConverter {
    pub lat: f64,
    pub lon: f64,
    pub alt: f64,
}

impl TopocentricConverter {
    pub fn new(lat: f64, lon: f64, alt: f64) -> TopocentricConverter {
        TopocentricConverter { lat, lon, alt }
    }

    pub fn to_lla(&self, x: f64, y: f64, z: f64) -> (f64, f64, f64) {
        let origin = ecef_from_lla(self.lat, self.lon, self.alt);
        let lat = self.lat.to_radians();
        let lon = self.lon.to_radians();
        let east = Vector3::new(-lon.sin(), lon.cos(), 0.0);
        let north = Vector3::new(
            -lat.sin() * lon.cos(),
            -lat.sin() * lon.sin(),
            lat.cos(),
        );
        let up = Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin());
        let ecef = origin + east * x + north * y + up * z;
        lla_from_ecef(ecef)
    }
}

fn ecef_from_lla(lat: f64, lon: f64, alt: f64) -> Vector3<f64> {
    let a2 = WGS84_A * WGS84_A;
    let b2 = WGS84_B * WGS84_B;
    let lat = lat.to_radians();
    let lon = lon.to_radians();
    let l = 1.0 / (a2 * lat.cos().powi(2) + b2 * lat.sin().powi(2)).sqrt();
    Vector3::new(
        (a2 * l + alt) * lat.cos() * lon.cos(),
        (a2 * l + alt) * lat.cos() * lon.sin(),
        (b2 * l + alt) * lat.sin(),
    )
}

fn lla_from_ecef(ecef: Vector3<f64>) -> (f64, f64, f64) {
    let a = WGS84_A;
    let b = WGS84_B;
    let ea2 = (a * a - b * b) / (a * a);
    let eb2 = (a * a - b * b) / (b * b);
    let p = (ecef.x * ecef.x + ecef.y * ecef.y).sqrt();
    let theta = (ecef.z * a).atan2(p * b);
    let lon = ecef.y.atan2(ecef.x);
    let lat = (ecef.z + eb2 * b * theta.sin().powi(3)).atan2(p - ea2 * a * theta.cos().powi(3));
    let n = a / (1.0 - ea2 * lat.sin().powi(2)).sqrt();
    let alt = p / lat.cos() - n;
    (lat.to_degrees(), lon.to_degrees(), alt)
}

/// Geodetic position and compass heading of a shot with respect to a
/// topocentric reference. The heading is the viewing direction projected
/// to the east/north plane, in degrees in [0, 360).
pub fn shot_lla_and_compass(
    shot: &Shot,
    reference: &TopocentricConverter,
) -> (f64, f64, f64, f64) {
    let origin = shot.pose.get_origin();
    let (lat, lon, alt) = reference.to_lla(origin.x, origin.y, origin.z);
    // camera viewing axis in world coordinates
    let forward = shot.pose.get_rotation_matrix().row(2);
    let angle = forward.x.atan2(forward.y).to_degrees();
    (lat, lon, alt, (angle + 360.0) % 360.0)
}

#[test]
fn test_zero_dimension_camera_rejected() {
    assert!(Camera::perspective("bad", 0, 600, 1.0).is_err());
    assert!(Camera::perspective("bad", 800, 0, 1.0).is_err());
    assert!(Camera::perspective("good", 800, 600, 1.0).is_ok());
}

#[test]
fn test_project_on_axis() {
    let camera = Camera::perspective("cam", 800, 600, 1.0).unwrap();
    let pose = Pose::from_rotation(Matrix3::identity());
    let projections = camera.project_many(&pose, &[Point3::new(0.0, 0.0, 5.0)]);
    assert!(projections[0].x.abs() < 1e-12 && projections[0].y.abs() < 1e-12);
}

#[test]
fn test_is_inside_bounds() {
    let camera = Camera::perspective("cam", 800, 600, 1.0).unwrap();
    assert!(camera.is_inside(Point2::new(0.0, 0.0)));
    assert!(camera.is_inside(Point2::new(0.49, 0.37)));
    assert!(!camera.is_inside(Point2::new(0.51, 0.0)));
    // shorter dimension spans +-600/1600
    assert!(!camera.is_inside(Point2::new(0.0, 0.38)));
    // portrait sensor swaps the dominant axis
    let portrait = Camera::perspective("cam", 600, 800, 1.0).unwrap();
    assert!(portrait.is_inside(Point2::new(0.0, 0.49)));
    assert!(!portrait.is_inside(Point2::new(0.38, 0.0)));
}

#[test]
fn test_pose_origin_roundtrip() {
    let rotation = Matrix3::from_angle_z(Rad(0.7));
    let mut pose = Pose::from_rotation(rotation);
    let origin = Point3::new(3.0, -2.0, 1.5);
    pose.set_origin(origin);
    let back = pose.get_origin();
    assert!((back - origin).magnitude() < 1e-12);
    // the origin maps to the camera center
    let centered = pose.transform(origin);
    assert!(centered.to_vec().magnitude() < 1e-12);
}

#[test]
fn test_rodrigues_roundtrip() {
    let rotation = Matrix3::from_axis_angle(Vector3::new(0.0, 0.0, 1.0), Rad(0.5));
    let rodrigues = to_rodrigues(&rotation).unwrap();
    assert!((rodrigues - Vector3::new(0.0, 0.0, 0.5)).magnitude() < 1e-9);
    let back = from_rodrigues(rodrigues);
    for i in 0..3 {
        assert!((back.row(i) - rotation.row(i)).magnitude() < 1e-9);
    }
}

#[test]
fn test_to_rodrigues_identity_fails() {
    assert!(to_rodrigues(&Matrix3::identity()).is_err());
}

#[test]
fn test_to_lla_at_anchor() {
    let reference = TopocentricConverter::new(0.0, 0.0, 0.0);
    let (lat, lon, alt) = reference.to_lla(0.0, 0.0, 0.0);
    assert!(lat.abs() < 1e-9 && lon.abs() < 1e-9 && alt.abs() < 1e-6);
    // one meter north moves latitude, not longitude
    let (lat, lon, _) = reference.to_lla(0.0, 1.0, 0.0);
    assert!(lat > 0.0 && lon.abs() < 1e-9);
}
