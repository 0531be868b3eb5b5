//! HTTP adapters for the service traits in [`crate::services`].

pub mod nominatim;
pub mod open_meteo;
