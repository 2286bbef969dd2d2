//! Data model definitions for accessible places.
//!
//! [`Place`] is the single record kind handled by the crate. It is stored in
//! the LMDB place store as part of a JSON array, returned to the host as JSON
//! and built either from an Overpass element or from a [`PlaceForm`] filled
//! in by the user.
//!
//! # Persisted layout
//!
//! ```json
//! {
//!   "id": 1718000000000,
//!   "name": "Cafe X",
//!   "lat": 33.9,
//!   "lon": 35.5,
//!   "type": "cafe",
//!   "city": "Beirut",
//!   "rating": 3,
//!   "review": "Accessible parking: yes\n...",
//!   "parking": "yes",
//!   "entrance": "yes",
//!   "seating": "no",
//!   "toilet": "no"
//! }
//! ```
//!
//! Optional fields may be absent or `null`; records written by earlier
//! sessions stay readable as long as the required fields are present.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;

/// Highest rating a place can carry.
pub const MAX_RATING: u8 = 5;

/// Identifier of a place.
///
/// Overpass elements and timestamp-derived ids are numbers; entries written
/// by other tools may carry a string id, which is kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlaceId {
    Number(i64),
    Text(String),
}

impl PlaceId {
    /// Reads an id typed or forwarded by the host as text.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        match raw.parse::<i64>() {
            Ok(n) => PlaceId::Number(n),
            Err(_) => PlaceId::Text(raw.to_string()),
        }
    }

    /// Numeric text ids become `Number`, so `Text("7")` and `Number(7)` name
    /// the same place.
    pub fn normalized(&self) -> PlaceId {
        match self {
            PlaceId::Number(n) => PlaceId::Number(*n),
            PlaceId::Text(s) => PlaceId::parse(s),
        }
    }

    pub fn same_as(&self, other: &PlaceId) -> bool {
        self.normalized() == other.normalized()
    }

    pub fn matches(&self, raw: &str) -> bool {
        self.same_as(&PlaceId::parse(raw))
    }
}

impl Display for PlaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaceId::Number(n) => write!(f, "{}", n),
            PlaceId::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Answer to one accessibility question, serialized as `"yes"` / `"no"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessFlag {
    Yes,
    #[default]
    No,
}

impl AccessFlag {
    pub fn is_yes(self) -> bool {
        self == AccessFlag::Yes
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessFlag::Yes => "yes",
            AccessFlag::No => "no",
        }
    }
}

/// A point of interest with its accessibility metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub id: PlaceId,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "type")]
    pub place_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caza: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub province: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default)]
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<String>,
    #[serde(default)]
    pub parking: AccessFlag,
    #[serde(default)]
    pub entrance: AccessFlag,
    #[serde(default)]
    pub seating: AccessFlag,
    #[serde(default)]
    pub toilet: AccessFlag,
}

impl Place {
    /// Flags in the order parking, entrance, seating, toilet.
    pub fn flags(&self) -> [AccessFlag; 4] {
        [self.parking, self.entrance, self.seating, self.toilet]
    }
}

/// Rating given to a user-submitted place: one star for being listed plus
/// one per satisfied accessibility flag, capped at [`MAX_RATING`].
pub fn derive_rating(flags: &[AccessFlag]) -> u8 {
    let yes = flags.iter().filter(|f| f.is_yes()).count();
    (1 + yes).min(MAX_RATING as usize) as u8
}

/// Review text generated from the accessibility flags, one line per flag.
pub fn derive_review(
    parking: AccessFlag,
    entrance: AccessFlag,
    seating: AccessFlag,
    toilet: AccessFlag,
) -> String {
    [
        format!("Accessible parking: {}", parking.as_str()),
        format!("Step-free entrance: {}", entrance.as_str()),
        format!("Accessible seating: {}", seating.as_str()),
        format!("Accessible toilet: {}", toilet.as_str()),
    ]
    .join("\n")
}

/// Add-place input exactly as typed into the host form.
///
/// Coordinates arrive as text; [`PlaceForm::validate`] turns the form into
/// the checked values the repository needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceForm {
    pub name: String,
    pub lat: String,
    pub lon: String,
    #[serde(rename = "type")]
    pub place_type: String,
    pub city: Option<String>,
    pub caza: Option<String>,
    pub province: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub contact: Option<String>,
    pub parking: AccessFlag,
    pub entrance: AccessFlag,
    pub seating: AccessFlag,
    pub toilet: AccessFlag,
}

impl PlaceForm {
    /// Checks the required fields and builds the place under `id`.
    pub fn into_place(self, id: PlaceId) -> Result<Place, AppResponse> {
        let missing: Vec<&str> = [
            ("name", &self.name),
            ("lat", &self.lat),
            ("lon", &self.lon),
            ("type", &self.place_type),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| *field)
        .collect();

        if !missing.is_empty() {
            return Err(AppResponse::ValidationError(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let lat = parse_coordinate("lat", &self.lat)?;
        let lon = parse_coordinate("lon", &self.lon)?;

        let flags = [self.parking, self.entrance, self.seating, self.toilet];

        Ok(Place {
            id,
            name: self.name.trim().to_string(),
            lat,
            lon,
            place_type: self.place_type.trim().to_string(),
            city: non_blank(self.city),
            caza: non_blank(self.caza),
            province: non_blank(self.province),
            image: non_blank(self.image),
            link: non_blank(self.link),
            contact: non_blank(self.contact),
            rating: derive_rating(&flags),
            review: Some(derive_review(self.parking, self.entrance, self.seating, self.toilet)),
            parking: self.parking,
            entrance: self.entrance,
            seating: self.seating,
            toilet: self.toilet,
        })
    }
}

fn parse_coordinate(field: &str, raw: &str) -> Result<f64, AppResponse> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(AppResponse::ValidationError(format!(
            "Field '{field}' is not a valid coordinate: {raw}"
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
