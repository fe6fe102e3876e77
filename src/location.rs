//! Device position for centering the map.
//!
//! A terminal has no GPS, so the "device" position comes from IP geolocation
//! (IpApi via `ipgeolocate`) or from coordinates set in `config.toml`. The
//! user refuses the permission by setting the location mode to `off`.

use crate::config::{LocationConfig, LocationMode};
use crate::error::LocationError;
use crate::models::Coordinates;
use ipgeolocate::{Locator, Service};
use std::future::Future;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
}

pub trait LocationProvider: Send + Sync + 'static {
    fn request_permission(&self) -> impl Future<Output = Permission> + Send;

    fn current_position(&self) -> impl Future<Output = Result<Coordinates, LocationError>> + Send;
}

/// Asks for permission, then for the position.
pub async fn acquire<L: LocationProvider>(provider: &L) -> Result<Coordinates, LocationError> {
    match provider.request_permission().await {
        Permission::Granted => provider.current_position().await,
        Permission::Denied => Err(LocationError::PermissionDenied),
    }
}

/// Location provider driven by the `[location]` config section.
#[derive(Debug, Clone)]
pub struct DeviceLocation {
    mode: LocationMode,
    lookup_ip: String,
    manual: Coordinates,
}

impl DeviceLocation {
    pub fn from_config(config: &LocationConfig) -> Self {
        Self {
            mode: config.mode,
            lookup_ip: config.lookup_ip.clone(),
            manual: Coordinates::new(config.manual_lat, config.manual_lon),
        }
    }
}

impl LocationProvider for DeviceLocation {
    async fn request_permission(&self) -> Permission {
        match self.mode {
            LocationMode::Off => Permission::Denied,
            LocationMode::Ip | LocationMode::Manual => Permission::Granted,
        }
    }

    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        match self.mode {
            LocationMode::Manual => Ok(self.manual),
            LocationMode::Off => Err(LocationError::PermissionDenied),
            LocationMode::Ip => {
                // An empty address asks IpApi for the caller's own location.
                match Locator::get(&self.lookup_ip, Service::IpApi).await {
                    Ok(loc) => {
                        let lat = loc.latitude.parse::<f64>();
                        let lon = loc.longitude.parse::<f64>();
                        match (lat, lon) {
                            (Ok(lat), Ok(lon)) => {
                                info!("Geolocation successful - ({}, {})", lat, lon);
                                Ok(Coordinates::new(lat, lon))
                            }
                            _ => {
                                error!(
                                    "Geolocation returned unparsable coordinates ({}, {})",
                                    loc.latitude, loc.longitude
                                );
                                Err(LocationError::PositionUnavailable(
                                    "unparsable coordinates".to_string(),
                                ))
                            }
                        }
                    }
                    Err(e) => {
                        error!("Error using geolocation service: {}", e);
                        Err(LocationError::PositionUnavailable(e.to_string()))
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: LocationMode) -> LocationConfig {
        LocationConfig {
            mode,
            lookup_ip: String::new(),
            manual_lat: 48.85,
            manual_lon: 2.35,
        }
    }

    #[tokio::test]
    async fn manual_mode_returns_configured_position() {
        let provider = DeviceLocation::from_config(&config(LocationMode::Manual));
        assert_eq!(acquire(&provider).await, Ok(Coordinates::new(48.85, 2.35)));
    }

    #[tokio::test]
    async fn off_mode_refuses_permission() {
        let provider = DeviceLocation::from_config(&config(LocationMode::Off));
        assert_eq!(provider.request_permission().await, Permission::Denied);
        assert_eq!(acquire(&provider).await, Err(LocationError::PermissionDenied));
    }
}
