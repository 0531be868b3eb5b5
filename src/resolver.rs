//! Location resolution with bounded retries.

use tracing::{error, info, warn};

use crate::config::ResolverConfig;
use crate::error::{RainfallError, Result};
use crate::services::geocoder::{GeocodeError, Geocoder, Place};

/// Resolves `query` to a [`Place`], retrying while the geocoder is unavailable.
///
/// Waits `config.delay` between attempts. A missing match or a non-transient
/// failure ends resolution immediately with [`RainfallError::LocationNotFound`];
/// running out of attempts yields [`RainfallError::TransientServiceUnavailable`].
#[tracing::instrument(skip(geocoder, config), fields(attempts = config.attempts))]
pub async fn resolve<G: Geocoder + ?Sized>(
    geocoder: &G,
    query: &str,
    config: &ResolverConfig,
) -> Result<Place> {
    let attempts = config.attempts.max(1);

    for attempt in 1..=attempts {
        match geocoder.geocode(query).await {
            Ok(Some(place)) => {
                info!(
                    attempt,
                    latitude = place.coordinate.latitude,
                    longitude = place.coordinate.longitude,
                    display_name = %place.display_name,
                    "Location resolved"
                );
                return Ok(place);
            }
            Ok(None) => {
                warn!("No geocoding match");
                return Err(RainfallError::LocationNotFound {
                    query: query.to_string(),
                });
            }
            Err(GeocodeError::Failed(reason)) => {
                warn!(%reason, "Geocoding failed");
                return Err(RainfallError::LocationNotFound {
                    query: query.to_string(),
                });
            }
            Err(GeocodeError::Unavailable(reason)) => {
                if attempt < attempts {
                    warn!(attempt, %reason, delay_secs = config.delay.as_secs_f64(), "Geocoder unavailable, retrying");
                    tokio::time::sleep(config.delay).await;
                } else {
                    error!(attempt, %reason, "Geocoder unavailable, attempts exhausted");
                }
            }
        }
    }

    Err(RainfallError::TransientServiceUnavailable { attempts })
}
