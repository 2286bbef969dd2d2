//! Overpass catalog client.
//!
//! Fetches wheelchair-accessible amenities for the configured area once per
//! session and maps them into [`Place`] records. The catalog is best-effort:
//! [`fetch_or_empty`] turns any failure into an empty list.

use std::collections::HashMap;

use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::app_config::AppConfig;
use crate::app_response::AppResponse;
use crate::place_model::{AccessFlag, Place, PlaceId};

const UNNAMED: &str = "Unnamed";
const UNKNOWN_TYPE: &str = "Unknown";

/// Source of session-only catalog entries.
#[allow(async_fn_in_trait)]
pub trait CatalogSource {
    async fn fetch(&self) -> Result<Vec<Place>, AppResponse>;
}

/// Runs `source` and degrades any failure to an empty catalog.
pub async fn fetch_or_empty<S: CatalogSource>(source: &S) -> Vec<Place> {
    match source.fetch().await {
        Ok(places) => {
            info!("Catalog fetch returned {} places", places.len());
            places
        }
        Err(e) => {
            warn!("Catalog fetch failed, continuing with stored places only: {e}");
            Vec::new()
        }
    }
}

/// Client for the Overpass interpreter endpoint.
#[derive(Clone)]
pub struct OverpassFetcher {
    client: Client,
    endpoint: String,
    query: String,
}

impl OverpassFetcher {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.overpass_endpoint.clone(),
            query: build_query(&config.area_name, &config.amenities, &config.wheelchair),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }
}

impl CatalogSource for OverpassFetcher {
    async fn fetch(&self) -> Result<Vec<Place>, AppResponse> {
        debug!("Querying catalog at {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("data", self.query.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        parse_response(&body)
    }
}

/// Overpass QL for amenities of the given kinds inside the named area.
pub fn build_query(area_name: &str, amenities: &[String], wheelchair: &str) -> String {
    format!(
        "[out:json][timeout:25];\n\
         area[\"name\"=\"{area}\"]->.searchArea;\n\
         (\n  node[\"amenity\"~\"^({kinds})$\"]\
         [\"wheelchair\"=\"{wheelchair}\"](area.searchArea);\n);\n\
         out body;",
        area = escape_ql(area_name),
        kinds = amenities
            .iter()
            .map(|a| escape_ql(a))
            .collect::<Vec<_>>()
            .join("|"),
        wheelchair = escape_ql(wheelchair),
    )
}

fn escape_ql(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    #[serde(default)]
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Maps an Overpass JSON body into catalog places.
pub fn parse_response(body: &str) -> Result<Vec<Place>, AppResponse> {
    let response: OverpassResponse = serde_json::from_str(body)?;

    let places = response
        .elements
        .into_iter()
        .filter_map(|element| {
            let place = element_to_place(element);
            if place.is_none() {
                debug!("Skipping catalog element without coordinates");
            }
            place
        })
        .collect();

    Ok(places)
}

fn element_to_place(element: OverpassElement) -> Option<Place> {
    let (lat, lon) = (element.lat?, element.lon?);
    let mut tags = element.tags;

    Some(Place {
        id: PlaceId::Number(element.id),
        name: tags.remove("name").unwrap_or_else(|| UNNAMED.to_string()),
        lat,
        lon,
        place_type: tags
            .remove("amenity")
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
        city: tags.remove("addr:city"),
        caza: None,
        province: tags.remove("addr:province"),
        image: tags.remove("image"),
        link: tags.remove("website"),
        contact: tags.remove("phone").or_else(|| tags.remove("contact:phone")),
        rating: 0,
        review: None,
        parking: AccessFlag::No,
        entrance: AccessFlag::No,
        seating: AccessFlag::No,
        toilet: AccessFlag::No,
    })
}
