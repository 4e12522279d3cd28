#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use city_reconcile::listings::CityStats;
use serde_json::Value;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Base statistics row with both room-type prices set.
pub fn city_stats(
    country: &str,
    city: &str,
    private_room: Option<f64>,
    entire_home: Option<f64>,
    count: u64,
) -> CityStats {
    CityStats {
        id: city.to_lowercase().replace(' ', "_"),
        country: country.to_string(),
        city: city.to_string(),
        avg_price: private_room.or(entire_home),
        avg_price_private_room: private_room,
        avg_price_entire_home: entire_home,
        count,
        lat: None,
        lng: None,
    }
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents.as_bytes())
            .expect("write temp file contents");
        path
    }

    /// Serializes base statistics into the workspace.
    pub fn write_stats(&self, name: &str, stats: &[CityStats]) -> PathBuf {
        let json = serde_json::to_string_pretty(stats).expect("serialize stats");
        self.write(name, &json)
    }

    /// Parses a JSON output file written by a command.
    pub fn read_json(&self, name: &str) -> Value {
        let contents = fs::read_to_string(self.path().join(name)).expect("read output");
        serde_json::from_str(&contents).expect("parse output JSON")
    }
}
