//! Synthetic ground truth generation for structure-from-motion pipelines.
//!
//! Builds 3D street scenes (walls, floor), camera trajectories along a
//! parametric curve, and noisy 2D observations of the scene points, plus
//! simulated exif metadata (GPS, timestamps, compass). The output is meant
//! as input for testing reconstruction algorithms, not for rendering.
//!
//! Example usage:
//! ```
//! use street2sfm::*;
//! use rand::rngs::StdRng;
//! use rand::SeedableRng;
//!
//! let mut rng = StdRng::seed_from_u64(42);
//! // a straight street of length 100
//! let curve = Curve::Line { length: 100.0 };
//! let samples = samples_interval(0.0, 100.0, 10.0, 0.2, &mut rng);
//! // walls and floor around the centerline
//! let (walls, floor) = generate_street(&samples, &curve, 12.0, 20.0, &mut rng).unwrap();
//! // cameras along the centerline
//! let (positions, rotations) = generate_cameras(&samples, &curve, 1.7).unwrap();
//! // assemble the scene graph
//! let camera = Camera::perspective("camera_0", 800, 600, 0.9).unwrap();
//! let shot_ids = (0..positions.len()).map(|i| format!("shot_{:04}", i)).collect::<Vec<_>>();
//! let mut reconstruction = Reconstruction::new();
//! add_points_to_reconstruction(&walls, [120, 90, 70], &mut reconstruction);
//! add_points_to_reconstruction(&floor, [90, 90, 90], &mut reconstruction);
//! add_shots_to_reconstruction(&shot_ids, &positions, &rotations, camera, &mut reconstruction).unwrap();
//! // project points into every shot, cull and perturb
//! let (_features, tracks) =
//!     generate_track_data(&reconstruction, 40.0, 1.0, false, &mut rng).unwrap();
//! // simulated capture metadata
//! let exifs = generate_exifs(&reconstruction, 1.5, &mut rng).unwrap();
//! assert!(tracks.num_observations() > 0);
//! assert_eq!(exifs.len(), reconstruction.num_shots());
//! ```

pub mod curve;
pub mod exif;
pub mod geometry;
pub mod noise;
pub mod reconstruction;
pub mod street;
pub mod tracks;

pub use crate::curve::*;
pub use crate::exif::*;
pub use crate::geometry::*;
pub use crate::noise::*;
pub use crate::reconstruction::*;
pub use crate::street::*;
pub use crate::tracks::*;

#[derive(Debug)]
pub enum Error {
    /// A curve tangent or rotation axis with zero magnitude.
    DegenerateGeometry(String),
    /// Parallel input sequences of unequal length.
    DimensionMismatch(String),
    /// A camera model that cannot project (e.g. zero sensor dimensions).
    InvalidCameraModel(String),
    Json(serde_json::Error),
    IOError(std::io::Error),
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::IOError(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::DegenerateGeometry(msg) => write!(f, "degenerate geometry: {}", msg),
            Error::DimensionMismatch(msg) => write!(f, "dimension mismatch: {}", msg),
            Error::InvalidCameraModel(msg) => write!(f, "invalid camera model: {}", msg),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::IOError(e) => write!(f, "io error: {}", e),
        }
    }
}
