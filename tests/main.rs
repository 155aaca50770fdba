use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn line_street() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let out = dir.path().join("line");

    let mut cmd = Command::cargo_bin("street2sfm")?;
    cmd.arg("--seed").arg("7").arg(&out);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Synthetic scene"));

    for name in &[
        "reconstruction.json",
        "tracks.json",
        "features.json",
        "exifs.json",
    ] {
        assert!(out.join(name).exists(), "missing {}", name);
    }

    Ok(())
}

#[test]
fn ellipse_street() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let out = dir.path().join("ellipse");

    let mut cmd = Command::cargo_bin("street2sfm")?;
    cmd.arg("--curve")
        .arg("ellipse")
        .arg("--seed")
        .arg("7")
        .arg(&out);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Synthetic scene"));

    Ok(())
}

#[test]
fn noised_cameras() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let out = dir.path().join("noised");

    let mut cmd = Command::cargo_bin("street2sfm")?;
    cmd.arg("--position-noise")
        .arg("0.1")
        .arg("--rotation-noise")
        .arg("0.01")
        .arg("--seed")
        .arg("3")
        .arg(&out);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("observations"));

    Ok(())
}

#[test]
fn same_seed_same_output() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempdir()?;
    let out_a = dir.path().join("a");
    let out_b = dir.path().join("b");

    for out in &[&out_a, &out_b] {
        let mut cmd = Command::cargo_bin("street2sfm")?;
        cmd.arg("--seed").arg("99").arg(out);
        cmd.assert().success();
    }

    let tracks_a = std::fs::read_to_string(out_a.join("tracks.json"))?;
    let tracks_b = std::fs::read_to_string(out_b.join("tracks.json"))?;
    assert_eq!(tracks_a, tracks_b);

    Ok(())
}
