use std::fs;
use std::path::PathBuf;

use log::info;

use crate::app_response::AppResponse;
use crate::place_model::Place;

/// Writes single places to standalone JSON files so a contributor can share
/// what they added.
pub struct PlaceExporter {
    dir: PathBuf,
}

impl PlaceExporter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn export(&self, place: &Place) -> Result<PathBuf, AppResponse> {
        fs::create_dir_all(&self.dir)?;

        let path = self.dir.join(export_file_name(place));
        let json = serde_json::to_string_pretty(place)?;
        fs::write(&path, json)?;

        info!("Exported place {} to {}", place.id, path.display());
        Ok(path)
    }
}

/// `<name>_<id>.json`, with each whitespace run and path separator in the
/// name and the id replaced by `_`. The result is always a single path
/// component ending in `.json`.
pub fn export_file_name(place: &Place) -> String {
    format!(
        "{}_{}.json",
        file_name_part(&place.name),
        file_name_part(&place.id.to_string())
    )
}

fn file_name_part(raw: &str) -> String {
    let mut part = String::with_capacity(raw.len());
    let mut in_gap = false;

    for c in raw.chars() {
        if c.is_whitespace() || c == '/' || c == '\\' || c.is_control() {
            if !in_gap {
                part.push('_');
            }
            in_gap = true;
        } else {
            part.push(c);
            in_gap = false;
        }
    }

    part
}
