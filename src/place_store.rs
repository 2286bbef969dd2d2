use std::fs;
use std::path::PathBuf;

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};

use crate::app_response::AppResponse;
use crate::place_model::Place;

/// Key holding the JSON array of user-submitted places.
pub const PLACES_KEY: &str = "accessible_places";

const DATABASE_NAME: &str = "places";
const MAP_SIZE: usize = 10 * 1024 * 1024;

/// LMDB-backed storage for manual place entries.
///
/// The whole manual set lives under [`PLACES_KEY`] as one JSON array, so a
/// save is a single write transaction and readers never see half of it.
pub struct PlaceStore {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl PlaceStore {
    /// Opens (or creates) `<name>.lmdb`.
    pub fn init(name: &str) -> Result<Self, AppResponse> {
        let path = PathBuf::from(format!("{name}.lmdb"));
        fs::create_dir_all(&path)?;

        let env = Environment::new()
            .set_max_dbs(1)
            .set_map_size(MAP_SIZE)
            .open(&path)?;
        let db = env.create_db(Some(DATABASE_NAME), DatabaseFlags::empty())?;

        info!("Place store opened at {}", path.display());
        Ok(Self { env, db, path })
    }

    /// Reads the manual places. Missing or unreadable data yields an empty list.
    pub fn load(&self) -> Vec<Place> {
        let bytes = match self.read_raw() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!("No stored places under '{}'", PLACES_KEY);
                return Vec::new();
            }
            Err(e) => {
                warn!("Could not read stored places, starting empty: {e}");
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Place>>(&bytes) {
            Ok(places) => {
                info!("Loaded {} stored places", places.len());
                places
            }
            Err(e) => {
                warn!("Stored places are malformed, starting empty: {e}");
                Vec::new()
            }
        }
    }

    /// Replaces the stored manual places with `places`.
    pub fn save_all(&self, places: &[Place]) -> Result<(), AppResponse> {
        let json = serde_json::to_vec(places)?;
        self.write_raw(&json)?;
        debug!("Saved {} places to the store", places.len());
        Ok(())
    }

    fn read_raw(&self) -> Result<Option<Vec<u8>>, AppResponse> {
        let txn = self.env.begin_ro_txn()?;
        let bytes = match txn.get(self.db, &PLACES_KEY) {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(AppResponse::from(e)),
        };
        txn.commit()?;
        Ok(bytes)
    }

    pub(crate) fn write_raw(&self, bytes: &[u8]) -> Result<(), AppResponse> {
        let mut txn = self.env.begin_rw_txn()?;
        txn.put(self.db, &PLACES_KEY, &bytes, WriteFlags::empty())?;
        txn.commit()?;
        Ok(())
    }

    /// Flushes pending writes and releases the environment.
    pub fn close(self) -> Result<(), AppResponse> {
        self.env.sync(true)?;
        info!("Place store at {} closed", self.path.display());
        Ok(())
    }
}
