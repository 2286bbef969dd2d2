use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

pub const DEFAULT_DB_NAME: &str = "accessible_places";
pub const DEFAULT_OVERPASS_ENDPOINT: &str = "https://overpass-api.de/api/interpreter";
pub const DEFAULT_AREA_NAME: &str = "Lebanon";

/// Settings handed over by the host when a repository is created.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Store name; the LMDB directory is `<db_name>.lmdb`.
    pub db_name: String,
    pub overpass_endpoint: String,
    pub area_name: String,
    /// `amenity` values requested from the catalog.
    pub amenities: Vec<String>,
    /// Required value of the `wheelchair` tag.
    pub wheelchair: String,
    /// Where newly added places are exported; no export when unset.
    pub export_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_name: DEFAULT_DB_NAME.to_string(),
            overpass_endpoint: DEFAULT_OVERPASS_ENDPOINT.to_string(),
            area_name: DEFAULT_AREA_NAME.to_string(),
            amenities: vec!["restaurant".to_string(), "cafe".to_string()],
            wheelchair: "yes".to_string(),
            export_dir: None,
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        let config: AppConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        if self.db_name.trim().is_empty() {
            return Err(AppResponse::BadRequest("db_name must not be empty".to_string()));
        }
        if self.amenities.is_empty() {
            return Err(AppResponse::BadRequest(
                "amenities must list at least one value".to_string(),
            ));
        }
        Ok(())
    }
}
