mod common;

use std::fs;

use assert_cmd::Command;
use common::{TestWorkspace, city_stats, fixture_path};
use predicates::str::contains;

fn city_reconcile() -> Command {
    Command::cargo_bin("city-reconcile").expect("binary exists")
}

#[test]
fn listings_writes_base_statistics() {
    let workspace = TestWorkspace::new();
    let raw_dir = workspace.path().join("raw");
    fs::create_dir(&raw_dir).expect("raw dir");
    fs::copy(fixture_path("wien_listings.csv"), raw_dir.join("wien.csv")).expect("copy listings");
    let descriptors = workspace.write(
        "sources.json",
        r#"[{"country": "Austria", "city": "Wien", "filename": "wien.csv"}]"#,
    );
    let output = workspace.path().join("stats.json");

    city_reconcile()
        .args([
            "listings",
            "-d",
            descriptors.to_str().unwrap(),
            "--raw-dir",
            raw_dir.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .success();

    let stats = workspace.read_json("stats.json");
    let rows = stats.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "vienna");
    assert_eq!(rows[0]["city"], "Wien");
    assert_eq!(rows[0]["count"], 4);
    assert_eq!(rows[0]["avg_price_private_room"].as_f64(), Some(100.0));
}

#[test]
fn failing_run_leaves_no_output() {
    let workspace = TestWorkspace::new();
    let raw_dir = workspace.path().join("raw");
    fs::create_dir(&raw_dir).expect("raw dir");
    fs::copy(fixture_path("wien_listings.csv"), raw_dir.join("wien.csv")).expect("copy listings");
    let descriptors = workspace.write(
        "sources.json",
        r#"[{"country": "Austria", "city": "Wien", "filename": "wien.csv", "currency": "XYZ"}]"#,
    );
    let output = workspace.path().join("stats.json");

    city_reconcile()
        .args([
            "listings",
            "-d",
            descriptors.to_str().unwrap(),
            "--raw-dir",
            raw_dir.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("XYZ"));

    assert!(!output.exists());
    assert!(!workspace.path().join(".stats.json.partial").exists());
}

#[test]
fn affordability_reads_rent_sheets_and_previews() {
    let workspace = TestWorkspace::new();
    let stats = workspace.write_stats(
        "stats.json",
        &[
            city_stats("Austria", "Wien", Some(100.0), Some(200.0), 12),
            city_stats("Spain", "Mallorca", Some(80.0), Some(250.0), 40),
        ],
    );
    let output = workspace.path().join("affordability.json");

    city_reconcile()
        .args([
            "affordability",
            "-s",
            stats.to_str().unwrap(),
            "-r",
            fixture_path("rents.csv").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--preview",
        ])
        .assert()
        .success()
        .stdout(contains("affordability_private_room_vs_1bed_rent"))
        .stdout(contains("vienna"));

    let records = workspace.read_json("affordability.json");
    let rows = records.as_array().expect("array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], "vienna");
    assert_eq!(rows[0]["city_norm_rent"], "wien");
    assert_eq!(rows[0]["rent_1bed_month"].as_f64(), Some(1000.0));
    assert_eq!(
        rows[0]["affordability_private_room_vs_1bed_rent"].as_f64(),
        Some(3.0)
    );
}

#[test]
fn affordability_rejects_missing_year() {
    let workspace = TestWorkspace::new();
    let stats = workspace.write_stats(
        "stats.json",
        &[city_stats("Austria", "Wien", Some(100.0), Some(200.0), 12)],
    );
    let output = workspace.path().join("affordability.json");

    city_reconcile()
        .args([
            "affordability",
            "-s",
            stats.to_str().unwrap(),
            "-r",
            fixture_path("rents.csv").to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
            "--year",
            "2019",
        ])
        .assert()
        .failure()
        .stderr(contains("2019"));

    assert!(!output.exists());
}

#[test]
fn density_and_housing_pressure_write_rounded_records() {
    let workspace = TestWorkspace::new();
    let stats = workspace.write_stats(
        "stats.json",
        &[
            city_stats("Austria", "Wien", None, None, 10_000),
            city_stats("Portugal", "Lisbon", None, None, 20_000),
        ],
    );

    city_reconcile()
        .args([
            "density",
            "-s",
            stats.to_str().unwrap(),
            "-p",
            fixture_path("population.csv").to_str().unwrap(),
            "-o",
            workspace.path().join("density.json").to_str().unwrap(),
        ])
        .assert()
        .success();
    let density = workspace.read_json("density.json");
    assert_eq!(density[0]["id"], "lisbon");
    assert_eq!(density[0]["airbnbs_per_1k"].as_f64(), Some(36.7));
    assert_eq!(density[1]["airbnbs_per_1k"].as_f64(), Some(5.21));

    city_reconcile()
        .args([
            "housing-pressure",
            "-s",
            stats.to_str().unwrap(),
            "--housing",
            fixture_path("housing.csv").to_str().unwrap(),
            "-o",
            workspace.path().join("pressure.json").to_str().unwrap(),
        ])
        .assert()
        .success();
    let pressure = workspace.read_json("pressure.json");
    assert_eq!(pressure[1]["id"], "lisbon");
    assert_eq!(pressure[1]["airbnb_share"].as_f64(), Some(2.5));
}

#[test]
fn config_file_overrides_fuzzy_threshold() {
    let workspace = TestWorkspace::new();
    let config = workspace.write("pipeline.yml", "fuzzy_threshold: 1.5\n");
    let stats = workspace.write_stats("stats.json", &[]);

    city_reconcile()
        .args([
            "--config",
            config.to_str().unwrap(),
            "density",
            "-s",
            stats.to_str().unwrap(),
            "-p",
            fixture_path("population.csv").to_str().unwrap(),
            "-o",
            workspace.path().join("density.json").to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("threshold"));
}

#[test]
fn timeline_and_slim_reduce_listing_exports() {
    let workspace = TestWorkspace::new();
    let input = fixture_path("wien_listings.csv");

    city_reconcile()
        .args([
            "timeline",
            "-i",
            input.to_str().unwrap(),
            "-o",
            workspace.path().join("timeline.csv").to_str().unwrap(),
        ])
        .assert()
        .success();
    let timeline = fs::read_to_string(workspace.path().join("timeline.csv")).expect("timeline");
    let lines: Vec<&str> = timeline.lines().collect();
    assert_eq!(
        lines,
        vec![
            "id,latitude,longitude,room_type,first_year,last_year",
            "1,48.2,16.3,Private room,2016,2023",
        ]
    );

    city_reconcile()
        .args([
            "slim",
            "-i",
            input.to_str().unwrap(),
            "-o",
            workspace.path().join("slim.csv").to_str().unwrap(),
        ])
        .assert()
        .success();
    let slim = fs::read_to_string(workspace.path().join("slim.csv")).expect("slim");
    let lines: Vec<&str> = slim.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "latitude,longitude,price,room_type,name");
    assert_eq!(lines[2], "48.3,16.4,1200,Entire home/apt,\"Altbau, quiet\"");
    assert_eq!(lines[3], "48.1,16.2,,Entire home/apt,Unpriced");
}
