use std::future::Future;

use crowdmap_shared::{Bounds, LatLng, LocationUnavailable};

use crate::cluster::DEFAULT_CLUSTER_OPTIONS;
use crate::sdk::{MapOptions, MapSurface};

// Map levels follow the provider: 1 is street level, larger is further out.
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 10;
pub const DEFAULT_LEVEL: u8 = 8;
/// Level used after a successful geolocation fix or a list-row jump.
pub const FOCUS_LEVEL: u8 = 4;

pub const DEFAULT_CENTER: LatLng = LatLng::new(37.5665, 126.9780);

/// Service area the reset button returns to.
pub const SERVICE_BOUNDS: Bounds = Bounds {
    south_west: LatLng::new(37.4133, 126.7341),
    north_east: LatLng::new(37.7151, 127.2693),
};

/// One-shot position source.
pub trait Geolocator {
    fn current_position(&self) -> impl Future<Output = Result<LatLng, LocationUnavailable>>;
}

/// Camera bounds, level limits and user-triggered navigation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewController {
    pub default_bounds: Bounds,
    pub min_level: u8,
    pub max_level: u8,
}

impl Default for ViewController {
    fn default() -> Self {
        Self {
            default_bounds: SERVICE_BOUNDS,
            min_level: MIN_LEVEL,
            max_level: MAX_LEVEL,
        }
    }
}

impl ViewController {
    pub fn map_options(&self) -> MapOptions {
        MapOptions {
            center: DEFAULT_CENTER,
            level: self.clamp_level(DEFAULT_LEVEL),
            min_level: self.min_level,
            max_level: self.max_level,
            cluster: DEFAULT_CLUSTER_OPTIONS,
        }
    }

    pub fn clamp_level(&self, level: u8) -> u8 {
        level.clamp(self.min_level, self.max_level)
    }

    pub fn apply_limits<S: MapSurface>(&self, map: &S) {
        map.set_level_limits(self.min_level, self.max_level);
    }

    pub fn reset_to_default_bounds<S: MapSurface>(&self, map: &S) {
        map.set_bounds(self.default_bounds);
    }

    /// Center on `position`; the level is clamped into the allowed range.
    /// Returns the level actually applied.
    pub fn center_on<S: MapSurface>(&self, map: &S, position: LatLng, level: u8) -> u8 {
        let level = self.clamp_level(level);
        map.set_center(position, level);
        level
    }

    /// Move to a geolocation result. Failures leave the camera where it is.
    pub fn apply_location_fix<S: MapSurface>(
        &self,
        map: &S,
        fix: Result<LatLng, LocationUnavailable>,
    ) -> Result<LatLng, LocationUnavailable> {
        let position = fix?;
        self.center_on(map, position, FOCUS_LEVEL);
        Ok(position)
    }

    pub async fn go_to_user_location<S: MapSurface, G: Geolocator>(
        &self,
        map: &S,
        geolocator: &G,
    ) -> Result<LatLng, LocationUnavailable> {
        let fix = geolocator.current_position().await;
        self.apply_location_fix(map, fix)
    }
}
