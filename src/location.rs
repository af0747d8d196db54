//! The device geolocation collaborator, consumed through a narrow trait.
//!
//! Location lookup is a bounded, best-effort operation: denial, failure, or
//! timeout produces `None` and the expense is created with null location
//! fields. It must never block expense creation.

use std::time::Duration;

use crate::Error;

/// The place name used when reverse geocoding returns nothing usable.
pub const UNKNOWN_LOCATION: &str = "Unknown location";

/// Whether the user granted access to the device's location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    /// The user allowed location access.
    Granted,
    /// The user refused location access.
    Denied,
}

/// A raw device position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    /// Degrees north of the equator, negative for south.
    pub latitude: f64,
    /// Degrees east of the prime meridian, negative for west.
    pub longitude: f64,
}

/// A position resolved to a human-readable place name.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    /// The reverse-geocoded place name, or the unknown-location placeholder.
    pub name: String,
    /// Degrees north of the equator, negative for south.
    pub latitude: f64,
    /// Degrees east of the prime meridian, negative for west.
    pub longitude: f64,
}

/// Access to the device's geolocation services.
pub trait LocationProvider: Send + Sync {
    /// Ask the user for permission to read the device location.
    fn request_permission(&self) -> impl Future<Output = Result<PermissionStatus, Error>> + Send;

    /// The device's current position.
    fn current_position(&self) -> impl Future<Output = Result<Position, Error>> + Send;

    /// Resolve a position to an address string.
    fn reverse_geocode(
        &self,
        position: Position,
    ) -> impl Future<Output = Result<String, Error>> + Send;
}

/// Run the full permission, position, and geocode flow with a deadline.
///
/// Returns `None` if permission is denied, any step fails, or the deadline
/// passes. An empty geocode result falls back to [UNKNOWN_LOCATION] rather
/// than `None`: the coordinates are still worth keeping.
pub async fn resolve_location<P: LocationProvider>(
    provider: &P,
    deadline: Duration,
) -> Option<ResolvedLocation> {
    match tokio::time::timeout(deadline, lookup(provider)).await {
        Ok(Ok(resolved)) => Some(resolved),
        Ok(Err(error)) => {
            tracing::debug!("location lookup failed: {error}");
            None
        }
        Err(_) => {
            tracing::debug!("location lookup timed out after {deadline:?}");
            None
        }
    }
}

async fn lookup<P: LocationProvider>(provider: &P) -> Result<ResolvedLocation, Error> {
    if provider.request_permission().await? == PermissionStatus::Denied {
        return Err(Error::Location("location permission denied".to_string()));
    }

    let position = provider.current_position().await?;

    let name = match provider.reverse_geocode(position).await {
        Ok(address) if !address.trim().is_empty() => address,
        // Coordinates without an address are still useful.
        _ => UNKNOWN_LOCATION.to_string(),
    };

    Ok(ResolvedLocation {
        name,
        latitude: position.latitude,
        longitude: position.longitude,
    })
}

#[cfg(test)]
mod resolve_location_tests {
    use std::time::Duration;

    use crate::Error;

    use super::{
        LocationProvider, PermissionStatus, Position, ResolvedLocation, UNKNOWN_LOCATION,
        resolve_location,
    };

    /// A scripted provider for tests. Failures are stored as strings because
    /// [Error] is not `Clone`.
    struct FakeProvider {
        permission: PermissionStatus,
        position: Result<Position, String>,
        address: Result<String, String>,
        delay: Duration,
    }

    impl FakeProvider {
        fn granted_at(latitude: f64, longitude: f64, address: &str) -> Self {
            Self {
                permission: PermissionStatus::Granted,
                position: Ok(Position {
                    latitude,
                    longitude,
                }),
                address: Ok(address.to_string()),
                delay: Duration::ZERO,
            }
        }
    }

    impl LocationProvider for FakeProvider {
        async fn request_permission(&self) -> Result<PermissionStatus, Error> {
            Ok(self.permission)
        }

        async fn current_position(&self) -> Result<Position, Error> {
            tokio::time::sleep(self.delay).await;
            self.position.clone().map_err(Error::Location)
        }

        async fn reverse_geocode(&self, _position: Position) -> Result<String, Error> {
            self.address.clone().map_err(Error::Location)
        }
    }

    #[tokio::test]
    async fn resolves_granted_lookup() {
        let provider = FakeProvider::granted_at(-36.85, 174.76, "1 Queen Street, Auckland");

        let resolved = resolve_location(&provider, Duration::from_secs(1)).await;

        assert_eq!(
            resolved,
            Some(ResolvedLocation {
                name: "1 Queen Street, Auckland".to_string(),
                latitude: -36.85,
                longitude: 174.76,
            })
        );
    }

    #[tokio::test]
    async fn denied_permission_returns_none() {
        let mut provider = FakeProvider::granted_at(0.0, 0.0, "somewhere");
        provider.permission = PermissionStatus::Denied;

        let resolved = resolve_location(&provider, Duration::from_secs(1)).await;

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn failed_position_returns_none() {
        let mut provider = FakeProvider::granted_at(0.0, 0.0, "somewhere");
        provider.position = Err("no GPS fix".to_string());

        let resolved = resolve_location(&provider, Duration::from_secs(1)).await;

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn empty_address_falls_back_to_placeholder() {
        let provider = FakeProvider::granted_at(-36.85, 174.76, "  ");

        let resolved = resolve_location(&provider, Duration::from_secs(1)).await;

        assert_eq!(resolved.unwrap().name, UNKNOWN_LOCATION);
    }

    #[tokio::test]
    async fn failed_geocode_keeps_coordinates() {
        let mut provider = FakeProvider::granted_at(-36.85, 174.76, "unused");
        provider.address = Err("geocoder offline".to_string());

        let resolved = resolve_location(&provider, Duration::from_secs(1)).await.unwrap();

        assert_eq!(resolved.name, UNKNOWN_LOCATION);
        assert_eq!(resolved.latitude, -36.85);
    }

    #[tokio::test]
    async fn slow_lookup_times_out() {
        let mut provider = FakeProvider::granted_at(0.0, 0.0, "somewhere");
        provider.delay = Duration::from_millis(200);

        let resolved = resolve_location(&provider, Duration::from_millis(10)).await;

        assert_eq!(resolved, None);
    }
}
