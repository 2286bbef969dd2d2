//! Session state of the map: every known place, plus the manual subset that
//! is mirrored into the [`PlaceStore`].
//!
//! The repository starts with the stored manual entries only. Once the
//! catalog fetch resolves, [`PlaceRepository::merge_catalog`] puts the
//! fetched entries in front of them. Mutations always update memory first
//! and then rewrite the manual set in the store.

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::app_config::AppConfig;
use crate::app_response::AppResponse;
use crate::catalog_fetcher::{fetch_or_empty, CatalogSource};
use crate::place_export::PlaceExporter;
use crate::place_filter::{filter_places, SearchCriteria};
use crate::place_model::{Place, PlaceForm, PlaceId, MAX_RATING};
use crate::place_store::PlaceStore;

pub struct PlaceRepository {
    places: Vec<Place>,
    manual: Vec<Place>,
    store: PlaceStore,
    exporter: Option<PlaceExporter>,
    catalog_merged: bool,
}

impl PlaceRepository {
    /// Opens the store named in `config` and seeds the session with its entries.
    pub fn open(config: &AppConfig) -> Result<Self, AppResponse> {
        let store = PlaceStore::init(&config.db_name)?;
        let exporter = config.export_dir.as_ref().map(|dir| PlaceExporter::new(dir));
        Ok(Self::with_store(store, exporter))
    }

    pub fn with_store(store: PlaceStore, exporter: Option<PlaceExporter>) -> Self {
        let manual = store.load();
        info!("Repository seeded with {} manual places", manual.len());

        Self {
            places: manual.clone(),
            manual,
            store,
            exporter,
            catalog_merged: false,
        }
    }

    pub fn places(&self) -> &[Place] {
        &self.places
    }

    pub fn manual_places(&self) -> &[Place] {
        &self.manual
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.id.matches(id))
    }

    pub fn is_catalog_merged(&self) -> bool {
        self.catalog_merged
    }

    pub fn store(&self) -> &PlaceStore {
        &self.store
    }

    pub fn filter(&self, criteria: &SearchCriteria) -> Vec<Place> {
        filter_places(&self.places, criteria)
    }

    /// Places the fetched catalog ahead of the manual entries.
    ///
    /// Only the first call has an effect. Catalog entries whose id is already
    /// taken by a manual entry are dropped. `Text("7")` and `Number(7)` count
    /// as the same id.
    pub fn merge_catalog(&mut self, fetched: Vec<Place>) -> usize {
        if self.catalog_merged {
            warn!(
                "Catalog already merged for this session; ignoring {} places",
                fetched.len()
            );
            return 0;
        }
        self.catalog_merged = true;

        let mut merged: Vec<Place> = Vec::with_capacity(fetched.len() + self.places.len());
        for place in fetched {
            if merged.iter().chain(&self.manual).any(|p| p.id.same_as(&place.id)) {
                debug!("Dropping catalog place {} with a duplicate id", place.id);
                continue;
            }
            merged.push(place);
        }

        let added = merged.len();
        merged.extend(self.places.drain(..));
        self.places = merged;

        info!(
            "Merged {} catalog places; {} places in session",
            added,
            self.places.len()
        );
        added
    }

    /// Fetches the catalog from `source` and merges it. Fetch failures leave
    /// the session with its manual entries only.
    pub async fn load_catalog<S: CatalogSource>(&mut self, source: &S) -> usize {
        if self.catalog_merged {
            warn!("Catalog already loaded for this session");
            return 0;
        }
        let fetched = fetch_or_empty(source).await;
        self.merge_catalog(fetched)
    }

    /// Validates the form, stores the new place and exports it.
    pub fn add_place(&mut self, form: PlaceForm) -> Result<Place, AppResponse> {
        let id = self.next_manual_id();
        let place = match form.into_place(id) {
            Ok(place) => place,
            Err(e) => {
                warn!("Rejected new place: {e}");
                return Err(e);
            }
        };

        self.places.push(place.clone());
        self.manual.push(place.clone());
        self.persist()?;

        if let Some(exporter) = &self.exporter {
            if let Err(e) = exporter.export(&place) {
                warn!("Export of place {} failed: {e}", place.id);
            }
        }

        info!("Added place {} ({})", place.id, place.name);
        Ok(place)
    }

    /// Sets the rating of place `id`. Only whole ratings from 1 to 5 are accepted.
    ///
    /// Returns `Ok(None)` when no place has that id, whatever the rating.
    pub fn update_rating(
        &mut self,
        id: &str,
        new_rating: &str,
    ) -> Result<Option<Place>, AppResponse> {
        let Some(index) = self.places.iter().position(|p| p.id.matches(id)) else {
            debug!("update_rating: no place with id {id}");
            return Ok(None);
        };
        let rating = parse_rating(new_rating)?;

        let place = &mut self.places[index];
        place.rating = rating;
        let updated = place.clone();

        let is_manual = match self.manual.iter_mut().find(|p| p.id == updated.id) {
            Some(stored) => {
                stored.rating = rating;
                true
            }
            None => false,
        };
        if is_manual {
            self.persist()?;
        }

        info!("Rating of place {} set to {}", updated.id, rating);
        Ok(Some(updated))
    }

    /// Removes place `id` from the session and, for manual entries, from the
    /// store.
    ///
    /// Returns `Ok(None)` when no place has that id.
    pub fn delete_place(&mut self, id: &str) -> Result<Option<Place>, AppResponse> {
        let Some(index) = self.places.iter().position(|p| p.id.matches(id)) else {
            debug!("delete_place: no place with id {id}");
            return Ok(None);
        };
        let removed = self.places.remove(index);

        let before = self.manual.len();
        self.manual.retain(|p| p.id != removed.id);
        if self.manual.len() != before {
            self.persist()?;
        }

        info!("Deleted place {} ({})", removed.id, removed.name);
        Ok(Some(removed))
    }

    /// Flushes the store and ends the session.
    pub fn close(self) -> Result<(), AppResponse> {
        self.store.close()
    }

    fn persist(&self) -> Result<(), AppResponse> {
        self.store.save_all(&self.manual).map_err(|e| {
            warn!("Store write failed; session and store now differ: {e}");
            e
        })
    }

    fn next_manual_id(&self) -> PlaceId {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or_default();

        let mut candidate = now;
        while self.places.iter().any(|p| p.id.same_as(&PlaceId::Number(candidate))) {
            candidate += 1;
        }
        PlaceId::Number(candidate)
    }
}

fn parse_rating(raw: &str) -> Result<u8, AppResponse> {
    match raw.trim().parse::<i64>() {
        Ok(value) if (1..=i64::from(MAX_RATING)).contains(&value) => Ok(value as u8),
        _ => Err(AppResponse::ValidationError(format!(
            "Rating must be a whole number from 1 to {MAX_RATING}, got '{raw}'"
        ))),
    }
}
