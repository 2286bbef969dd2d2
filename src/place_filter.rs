//! Filtering of the place list for the map view.
//!
//! The host either picks one category from a selector or fills in the
//! search panel. Both arrive as a single [`SearchCriteria`] value:
//!
//! ```json
//! {"mode":"category","category":"cafe"}
//! {"mode":"search","name":"cafe","city":"","rating":"3","parking":true}
//! ```

use serde::{Deserialize, Serialize};

use crate::place_model::Place;

/// Category value that matches every place.
pub const ALL_CATEGORIES: &str = "All";

/// Free-text terms shorter than this match nothing.
const MIN_TERM_CHARS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SearchCriteria {
    Category { category: String },
    Search(SearchQuery),
}

impl SearchCriteria {
    pub fn all() -> Self {
        SearchCriteria::Category {
            category: ALL_CATEGORIES.to_string(),
        }
    }

    pub fn category(category: impl Into<String>) -> Self {
        SearchCriteria::Category {
            category: category.into(),
        }
    }

    pub fn matches(&self, place: &Place) -> bool {
        match self {
            SearchCriteria::Category { category } => {
                category.eq_ignore_ascii_case(ALL_CATEGORIES)
                    || place.place_type.to_lowercase() == category.to_lowercase()
            }
            SearchCriteria::Search(query) => query.matches(place),
        }
    }
}

/// Search panel state. Text fields are taken as typed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchQuery {
    pub name: String,
    pub city: String,
    /// Minimum rating; ignored unless it parses to a number of at least 1.
    pub rating: String,
    pub parking: bool,
    pub entrance: bool,
    pub seating: bool,
    pub toilet: bool,
}

impl SearchQuery {
    pub fn matches(&self, place: &Place) -> bool {
        text_matches(&self.name, &place.name)
            && text_matches(&self.city, place.city.as_deref().unwrap_or(""))
            && self.rating_matches(place.rating)
            && (!self.parking || place.parking.is_yes())
            && (!self.entrance || place.entrance.is_yes())
            && (!self.seating || place.seating.is_yes())
            && (!self.toilet || place.toilet.is_yes())
    }

    fn min_rating(&self) -> Option<f64> {
        self.rating
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|threshold| *threshold >= 1.0)
    }

    fn rating_matches(&self, rating: u8) -> bool {
        match self.min_rating() {
            Some(threshold) => f64::from(rating) >= threshold,
            None => true,
        }
    }
}

// Empty terms match everything; one or two characters match nothing so
// that a half-typed term does not flood the map.
fn text_matches(term: &str, value: &str) -> bool {
    match term.chars().count() {
        0 => true,
        n if n < MIN_TERM_CHARS => false,
        _ => value.to_lowercase().contains(&term.to_lowercase()),
    }
}

/// Places matching `criteria`, in their original order.
pub fn filter_places(places: &[Place], criteria: &SearchCriteria) -> Vec<Place> {
    places
        .iter()
        .filter(|place| criteria.matches(place))
        .cloned()
        .collect()
}
