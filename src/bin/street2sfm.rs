extern crate rand;
extern crate serde_json;
extern crate street2sfm;
extern crate structopt;

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::BufWriter;
use structopt::StructOpt;

use street2sfm::*;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "street2sfm",
    about = "Generate a synthetic street scene with tracks and exif metadata for SfM testing"
)]
struct Opt {
    /// Street centerline: "line" or "ellipse".
    #[structopt(long = "curve", default_value = "line")]
    curve: String,

    /// Length of a line street.
    #[structopt(long = "length", default_value = "100")]
    length: f64,

    /// Full x diameter of an ellipse street.
    #[structopt(long = "ellipse-width", default_value = "100")]
    ellipse_width: f64,

    /// Full y diameter of an ellipse street.
    #[structopt(long = "ellipse-height", default_value = "60")]
    ellipse_height: f64,

    /// Arc distance between consecutive camera samples.
    #[structopt(long = "interval", default_value = "5")]
    interval: f64,

    /// Gaussian jitter of the sampling interval.
    #[structopt(long = "interval-noise", default_value = "0.2")]
    interval_noise: f64,

    /// Street width (lateral wall distance).
    #[structopt(long = "width", default_value = "20")]
    width: f64,

    /// Wall height.
    #[structopt(long = "height", default_value = "12")]
    height: f64,

    /// Camera height above the floor.
    #[structopt(long = "camera-height", default_value = "1.7")]
    camera_height: f64,

    /// Sensor width in pixels.
    #[structopt(long = "sensor-width", default_value = "800")]
    sensor_width: u32,

    /// Sensor height in pixels.
    #[structopt(long = "sensor-height", default_value = "600")]
    sensor_height: u32,

    /// Focal length as a ratio of the longer sensor dimension.
    #[structopt(long = "focal", default_value = "0.9")]
    focal: f64,

    /// Maximum depth at which points are still observed.
    #[structopt(long = "maximum-depth", default_value = "40")]
    maximum_depth: f64,

    /// Projection noise in pixels.
    #[structopt(long = "noise", default_value = "1.0")]
    noise: f64,

    /// GPS noise in world units.
    #[structopt(long = "gps-noise", default_value = "1.5")]
    gps_noise: f64,

    /// Gaussian noise added to camera positions (per axis).
    #[structopt(long = "position-noise", default_value = "0.0")]
    position_noise: f64,

    /// Gaussian noise added to camera rotation angles.
    #[structopt(long = "rotation-noise", default_value = "0.0")]
    rotation_noise: f64,

    /// Seed for the random number generator.
    #[structopt(long = "seed", default_value = "0")]
    seed: u64,

    /// Display a progress bar while synthesizing tracks.
    #[structopt(long = "verbose")]
    verbose: bool,

    /// Output directory for reconstruction.json, tracks.json,
    /// features.json, and exifs.json.
    #[structopt(name = "OUTPUT", parse(from_os_str))]
    output: std::path::PathBuf,
}

fn write_json<T: serde::Serialize>(
    path: &std::path::Path,
    value: &T,
) -> Result<(), Error> {
    let file = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}

fn main() -> Result<(), Error> {
    let opt = Opt::from_args();
    let mut rng = StdRng::seed_from_u64(opt.seed);

    let (curve, arc_length) = match opt.curve.as_str() {
        "line" => (
            Curve::Line { length: opt.length },
            opt.length,
        ),
        "ellipse" => (
            Curve::Ellipse {
                width: opt.ellipse_width,
                height: opt.ellipse_height,
            },
            // rough perimeter, good enough to pick a sample count
            std::f64::consts::PI * (opt.ellipse_width + opt.ellipse_height) / 2.0,
        ),
        other => {
            eprintln!("unknown curve type: {} (expected line or ellipse)", other);
            std::process::exit(1);
        }
    };

    let samples = samples_interval(0.0, arc_length, opt.interval, opt.interval_noise, &mut rng);
    let (walls, floor) = generate_street(&samples, &curve, opt.height, opt.width, &mut rng)?;
    let (mut positions, mut rotations) = generate_cameras(&samples, &curve, opt.camera_height)?;
    if opt.position_noise > 0.0 {
        positions = perturb_points(&positions, [opt.position_noise; 3], &mut rng);
    }
    if opt.rotation_noise > 0.0 {
        rotations = perturb_rotations(&rotations, opt.rotation_noise, &mut rng)?;
    }

    let camera = Camera::perspective("camera_0", opt.sensor_width, opt.sensor_height, opt.focal)?;
    let shot_ids: Vec<String> = (0..positions.len())
        .map(|i| format!("shot_{:04}", i))
        .collect();

    let mut reconstruction = Reconstruction::new();
    add_points_to_reconstruction(&walls, [120, 90, 70], &mut reconstruction);
    add_points_to_reconstruction(&floor, [90, 90, 90], &mut reconstruction);
    add_shots_to_reconstruction(&shot_ids, &positions, &rotations, camera, &mut reconstruction)?;

    let (features, tracks) = generate_track_data(
        &reconstruction,
        opt.maximum_depth,
        opt.noise,
        opt.verbose,
        &mut rng,
    )?;
    let exifs = generate_exifs(&reconstruction, opt.gps_noise, &mut rng)?;

    println!(
        "{} and {} observations of {} tracks",
        reconstruction,
        tracks.num_observations(),
        tracks.num_tracks()
    );

    std::fs::create_dir_all(&opt.output)?;
    write_json(&opt.output.join("reconstruction.json"), &reconstruction)?;
    write_json(&opt.output.join("tracks.json"), &tracks)?;
    write_json(&opt.output.join("features.json"), &features)?;
    write_json(&opt.output.join("exifs.json"), &exifs)?;

    Ok(())
}
