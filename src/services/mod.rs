//! Narrow interfaces to the external services a run depends on.

pub mod geocoder;
pub mod weather_archive;
