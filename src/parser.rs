//! JSON decoders for the geocoding and historical-weather payloads.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::services::geocoder::{Coordinate, Place};
use crate::services::weather_archive::RawObservation;

#[derive(Deserialize)]
struct NominatimHit {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Deserialize)]
struct ArchiveResponse {
    daily: ArchiveDaily,
}

#[derive(Deserialize)]
struct ArchiveDaily {
    time: Vec<NaiveDate>,
    #[serde(default)]
    precipitation_sum: Vec<Option<f64>>,
}

/// Decodes a Nominatim `/search` response and returns its first hit.
///
/// Nominatim encodes coordinates as strings; an empty array means no match.
pub fn parse_geocode(bytes: &[u8]) -> Result<Option<Place>> {
    let hits: Vec<NominatimHit> =
        serde_json::from_slice(bytes).context("Failed to parse geocoding response")?;

    let Some(hit) = hits.into_iter().next() else {
        return Ok(None);
    };

    let latitude: f64 = hit
        .lat
        .parse()
        .with_context(|| format!("Invalid latitude '{}'", hit.lat))?;
    let longitude: f64 = hit
        .lon
        .parse()
        .with_context(|| format!("Invalid longitude '{}'", hit.lon))?;

    Ok(Some(Place {
        coordinate: Coordinate {
            latitude,
            longitude,
        },
        display_name: hit.display_name,
    }))
}

/// Decodes an Open-Meteo archive response with `daily=precipitation_sum`.
///
/// Days past the end of a short `precipitation_sum` array are reported as missing.
pub fn parse_daily_archive(bytes: &[u8]) -> Result<Vec<RawObservation>> {
    let response: ArchiveResponse =
        serde_json::from_slice(bytes).context("Failed to parse archive response")?;
    let daily = response.daily;

    Ok(daily
        .time
        .into_iter()
        .enumerate()
        .map(|(i, date)| RawObservation {
            date,
            precipitation_mm: daily.precipitation_sum.get(i).copied().flatten(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_geocode_first_hit() {
        let body = br#"[
            {"lat": "19.0544", "lon": "72.8691", "display_name": "Mumbai, Maharashtra, India"},
            {"lat": "18.9", "lon": "72.8", "display_name": "Mumbai Suburban"}
        ]"#;
        let place = parse_geocode(body).unwrap().unwrap();
        assert_eq!(place.display_name, "Mumbai, Maharashtra, India");
        assert_eq!(place.coordinate.latitude, 19.0544);
        assert_eq!(place.coordinate.longitude, 72.8691);
    }

    #[test]
    fn test_parse_geocode_no_match() {
        assert!(parse_geocode(b"[]").unwrap().is_none());
    }

    #[test]
    fn test_parse_geocode_invalid_json() {
        assert!(parse_geocode(b"<html>").is_err());
    }

    #[test]
    fn test_parse_geocode_bad_latitude() {
        let body = br#"[{"lat": "north", "lon": "72.8", "display_name": "x"}]"#;
        assert!(parse_geocode(body).is_err());
    }

    #[test]
    fn test_parse_daily_archive_with_nulls() {
        let body = br#"{
            "latitude": 19.0,
            "longitude": 72.875,
            "daily": {
                "time": ["2015-01-01", "2015-01-02", "2015-01-03"],
                "precipitation_sum": [0.0, null, 12.4]
            }
        }"#;
        let days = parse_daily_archive(body).unwrap();
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].precipitation_mm, Some(0.0));
        assert_eq!(days[1].precipitation_mm, None);
        assert_eq!(days[2].date, NaiveDate::from_ymd_opt(2015, 1, 3).unwrap());
        assert_eq!(days[2].precipitation_mm, Some(12.4));
    }

    #[test]
    fn test_parse_daily_archive_missing_values_column() {
        let body = br#"{"daily": {"time": ["2015-01-01"]}}"#;
        let days = parse_daily_archive(body).unwrap();
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].precipitation_mm, None);
    }

    #[test]
    fn test_parse_daily_archive_error_payload() {
        let body = br#"{"error": true, "reason": "Parameter 'start_date' is out of range"}"#;
        assert!(parse_daily_archive(body).is_err());
    }
}
