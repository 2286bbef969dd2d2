//! # Accessible Places Core
//!
//! Offline-first data core for a wheelchair-accessibility map of Lebanon.
//! It keeps the places shown on the map, persists the ones users contribute
//! in an LMDB store, pulls wheelchair-accessible restaurants and cafés from
//! the Overpass API once per session, and filters the list for the map view.
//!
//! The map itself (markers, popups, forms) lives in the host application,
//! which talks to this crate through the C functions below. Every payload is
//! JSON and every call answers with a serialized [`AppResponse`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use accessible_places_core::{create_repository, add_place, free_response};
//! use std::ffi::CString;
//!
//! let config = CString::new(r#"{"db_name":"accessible_places"}"#).unwrap();
//! let state = create_repository(config.as_ptr());
//!
//! let form = CString::new(
//!     r#"{"name":"Cafe X","lat":"33.9","lon":"35.5","type":"cafe","parking":"yes"}"#,
//! ).unwrap();
//! let response = add_place(state, form.as_ptr());
//! free_response(response);
//! ```
//!
//! ## FFI Functions
//!
//! - [`create_repository`] - Open the store and start a session
//! - [`load_catalog`] - Fetch the Overpass catalog and merge it (blocking)
//! - [`get_all_places`] - Every place in the session
//! - [`filter_places`] - Places matching a search criteria value
//! - [`add_place`] - Add a place from the host form
//! - [`update_rating`] - Change the rating of a place
//! - [`delete_place`] - Remove a place
//! - [`close_repository`] - Flush the store and end the session
//! - [`free_response`] - Release a response string

pub mod app_config;
pub mod app_response;
pub mod catalog_fetcher;
pub mod place_export;
pub mod place_filter;
pub mod place_model;
pub mod place_repository;
pub mod place_store;

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Serialize;

use crate::app_config::AppConfig;
use crate::app_response::AppResponse;
use crate::catalog_fetcher::OverpassFetcher;
use crate::place_filter::SearchCriteria;
use crate::place_model::PlaceForm;
use crate::place_repository::PlaceRepository;

/// Session handle owned by the host between [`create_repository`] and
/// [`close_repository`].
pub struct AppState {
    pub repository: PlaceRepository,
    pub fetcher: OverpassFetcher,
}

impl AppState {
    pub fn init(config: &AppConfig) -> Result<Self, AppResponse> {
        config.validate()?;
        Ok(Self {
            repository: PlaceRepository::open(config)?,
            fetcher: OverpassFetcher::new(config),
        })
    }
}

/// Opens the place store and seeds a session with the stored places.
///
/// # Parameters
///
/// * `config_json` - Null-terminated JSON [`AppConfig`]; `{}` selects the defaults
///
/// # Returns
///
/// A pointer to the session state, or null when the configuration is invalid
/// or the store cannot be opened. Release it with [`close_repository`].
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_repository(config_json: *const c_char) -> *mut AppState {
    if config_json.is_null() {
        warn!("Null config pointer passed to create_repository");
        return std::ptr::null_mut();
    }

    let json = match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(s) => s,
        Err(e) => {
            warn!("Invalid UTF-8 in config parameter: {e}");
            return std::ptr::null_mut();
        }
    };

    let config = match AppConfig::from_json(json) {
        Ok(config) => config,
        Err(e) => {
            warn!("Rejected repository config: {e}");
            return std::ptr::null_mut();
        }
    };

    match AppState::init(&config) {
        Ok(state) => {
            info!("Repository '{}' ready with {} places", config.db_name, state.repository.len());
            Box::into_raw(Box::new(state))
        }
        Err(e) => {
            warn!("Failed to open repository '{}': {e}", config.db_name);
            std::ptr::null_mut()
        }
    }
}

/// Fetches the Overpass catalog and merges it into the session.
///
/// Blocks the calling thread until the request finishes, so hosts should call
/// it off their UI thread. A failed fetch is not an error: the session simply
/// keeps its stored places. Only the first call per session fetches.
///
/// # Returns
///
/// `Ok` with the JSON array of all places after the merge.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn load_catalog(state: *mut AppState) -> *const c_char {
    let state = match unsafe { state.as_mut() } {
        Some(s) => s,
        None => return bad_request("Null state pointer passed to load_catalog"),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            let error = AppResponse::FetchError(format!("Could not start fetch runtime: {e}"));
            return response_to_c_string(&error);
        }
    };

    let AppState { repository, fetcher } = state;
    runtime.block_on(repository.load_catalog(&*fetcher));

    ok_json(repository.places())
}

/// Returns every place in the session as a JSON array.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_all_places(state: *mut AppState) -> *const c_char {
    let state = match unsafe { state.as_ref() } {
        Some(s) => s,
        None => return bad_request("Null state pointer passed to get_all_places"),
    };

    ok_json(state.repository.places())
}

/// Returns the places matching a [`SearchCriteria`] JSON value.
///
/// ```json
/// {"mode":"category","category":"All"}
/// {"mode":"search","name":"cafe","city":"","rating":"3","parking":true}
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn filter_places(
    state: *mut AppState,
    criteria_json: *const c_char,
) -> *const c_char {
    let state = match unsafe { state.as_ref() } {
        Some(s) => s,
        None => return bad_request("Null state pointer passed to filter_places"),
    };

    let json = match c_ptr_to_string(criteria_json, "criteria") {
        Ok(json) => json,
        Err(error_ptr) => return error_ptr,
    };

    let criteria: SearchCriteria = match serde_json::from_str(&json) {
        Ok(c) => c,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid criteria JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    ok_json(&state.repository.filter(&criteria))
}

/// Adds a place from the host form and persists it.
///
/// # JSON Format
///
/// ```json
/// {
///   "name": "Cafe X", "lat": "33.9", "lon": "35.5", "type": "cafe",
///   "city": "Beirut",
///   "parking": "yes", "entrance": "yes", "seating": "no", "toilet": "no"
/// }
/// ```
///
/// # Returns
///
/// `Ok` with the stored place (id, rating and review filled in), or
/// `ValidationError` when a required field is missing; the session is left
/// untouched in that case.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn add_place(state: *mut AppState, form_json: *const c_char) -> *const c_char {
    let state = match unsafe { state.as_mut() } {
        Some(s) => s,
        None => return bad_request("Null state pointer passed to add_place"),
    };

    let json = match c_ptr_to_string(form_json, "form") {
        Ok(json) => json,
        Err(error_ptr) => return error_ptr,
    };

    let form: PlaceForm = match serde_json::from_str(&json) {
        Ok(f) => f,
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Invalid form JSON: {e}"));
            return response_to_c_string(&error);
        }
    };

    match state.repository.add_place(form) {
        Ok(place) => ok_json(&place),
        Err(e) => response_to_c_string(&e),
    }
}

/// Sets the rating (1 to 5) of the place with the given id. An unknown id is
/// `NotFound` even when the rating is also invalid.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn update_rating(
    state: *mut AppState,
    id: *const c_char,
    rating: *const c_char,
) -> *const c_char {
    let state = match unsafe { state.as_mut() } {
        Some(s) => s,
        None => return bad_request("Null state pointer passed to update_rating"),
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };

    let rating_str = match c_ptr_to_string(rating, "rating") {
        Ok(rating) => rating,
        Err(error_ptr) => return error_ptr,
    };

    match state.repository.update_rating(&id_str, &rating_str) {
        Ok(Some(place)) => ok_json(&place),
        Ok(None) => {
            let not_found = AppResponse::NotFound(format!("No place found with id: {id_str}"));
            response_to_c_string(&not_found)
        }
        Err(e) => response_to_c_string(&e),
    }
}

/// Removes the place with the given id from the session and the store.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn delete_place(state: *mut AppState, id: *const c_char) -> *const c_char {
    let state = match unsafe { state.as_mut() } {
        Some(s) => s,
        None => return bad_request("Null state pointer passed to delete_place"),
    };

    let id_str = match c_ptr_to_string(id, "id") {
        Ok(id) => id,
        Err(error_ptr) => return error_ptr,
    };

    match state.repository.delete_place(&id_str) {
        Ok(Some(_)) => response_to_c_string(&AppResponse::success("Place deleted successfully")),
        Ok(None) => {
            let not_found = AppResponse::NotFound(format!("No place found with id: {id_str}"));
            response_to_c_string(&not_found)
        }
        Err(e) => response_to_c_string(&e),
    }
}

/// Flushes the store and frees the session. The pointer must not be used afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_repository(state: *mut AppState) -> *const c_char {
    if state.is_null() {
        return bad_request("Null state pointer passed to close_repository");
    }

    let state = unsafe { *Box::from_raw(state) };

    match state.repository.close() {
        Ok(_) => response_to_c_string(&AppResponse::success("Repository closed successfully")),
        Err(e) => response_to_c_string(&e),
    }
}

/// Releases a string returned by any function of this crate.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

fn ok_json<T: Serialize + ?Sized>(value: &T) -> *const c_char {
    match serde_json::to_string(value) {
        Ok(json) => response_to_c_string(&AppResponse::Ok(json)),
        Err(e) => {
            let error = AppResponse::SerializationError(format!("Failed to serialize result: {e}"));
            response_to_c_string(&error)
        }
    }
}

fn bad_request(msg: &str) -> *const c_char {
    response_to_c_string(&AppResponse::BadRequest(msg.to_string()))
}

/// Serializes `response` into a C string owned by the caller.
///
/// Returns null if serialization or C string creation fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string argument, answering with a `BadRequest` response for
/// null pointers and invalid UTF-8.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
