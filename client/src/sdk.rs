use crowdmap_shared::{Bounds, EntityId, LatLng};
use thiserror::Error;

use crate::icons::IconAsset;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map SDK is not available")]
    SdkMissing,
    #[error("map container #{0} not found")]
    ContainerMissing(String),
    #[error("map SDK call failed: {0}")]
    Js(String),
}

/// Clustering parameters. Points coalesce into a cluster glyph at
/// `min_level` and above; `grid_size` is the cell edge in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterOptions {
    pub min_level: u8,
    pub grid_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapOptions {
    pub center: LatLng,
    pub level: u8,
    pub min_level: u8,
    pub max_level: u8,
    pub cluster: ClusterOptions,
}

/// Loads a map into a page container. The engine never reaches for a global
/// map object; everything after this goes through the returned [`MapSurface`].
pub trait MapSdk {
    type Surface: MapSurface;

    fn load_map(&self, container_id: &str, options: &MapOptions) -> Result<Self::Surface, MapError>;
}

/// Operations on a loaded map. Markers are opaque handles owned by the
/// caller; the surface only mutates the native objects behind them.
pub trait MapSurface {
    type Marker: Clone;

    /// New marker, not yet attached to the cluster pool.
    fn create_marker(&self, position: LatLng, icon: &IconAsset, title: &str) -> Self::Marker;
    fn move_marker(&self, marker: &Self::Marker, position: LatLng);
    fn set_marker_icon(&self, marker: &Self::Marker, icon: &IconAsset);
    /// Clicking the marker reports `id`, never a captured entity value.
    fn bind_marker_click(&self, marker: &Self::Marker, id: &EntityId);
    /// Remove the marker from the map and drop its listeners.
    fn detach_marker(&self, marker: &Self::Marker);

    fn cluster_clear(&self);
    fn cluster_add(&self, markers: &[Self::Marker]);

    /// Show the single shared overlay above `anchor`, replacing any content.
    fn open_overlay(&self, anchor: &Self::Marker, content: &str);
    fn close_overlay(&self);

    fn set_bounds(&self, bounds: Bounds);
    fn set_center(&self, center: LatLng, level: u8);
    fn set_level_limits(&self, min_level: u8, max_level: u8);
    /// Recompute layout after the container size changed.
    fn relayout(&self);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use super::*;

    #[derive(Debug)]
    pub struct FakeMarkerState {
        pub serial: usize,
        pub position: Cell<LatLng>,
        pub icon_src: RefCell<String>,
        pub title: String,
        pub click_id: RefCell<Option<EntityId>>,
        pub detached: Cell<bool>,
    }

    pub type FakeMarker = Rc<FakeMarkerState>;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Create(usize),
        Move(usize),
        SetIcon(usize),
        BindClick(usize),
        Detach(usize),
        ClusterClear,
        ClusterAdd(Vec<usize>),
        OpenOverlay(usize),
        CloseOverlay,
        SetBounds(Bounds),
        SetCenter(LatLng, u8),
        SetLevelLimits(u8, u8),
        Relayout,
    }

    /// Records every call so tests can assert on native churn.
    #[derive(Default)]
    pub struct RecordingMap {
        pub calls: RefCell<Vec<Call>>,
        pub overlay_content: RefCell<Option<String>>,
        next_serial: Cell<usize>,
    }

    impl RecordingMap {
        pub fn take_calls(&self) -> Vec<Call> {
            std::mem::take(&mut *self.calls.borrow_mut())
        }

        fn record(&self, call: Call) {
            self.calls.borrow_mut().push(call);
        }
    }

    impl MapSurface for RecordingMap {
        type Marker = FakeMarker;

        fn create_marker(&self, position: LatLng, icon: &IconAsset, title: &str) -> FakeMarker {
            let serial = self.next_serial.get();
            self.next_serial.set(serial + 1);
            self.record(Call::Create(serial));
            Rc::new(FakeMarkerState {
                serial,
                position: Cell::new(position),
                icon_src: RefCell::new(icon.src.clone()),
                title: title.to_string(),
                click_id: RefCell::new(None),
                detached: Cell::new(false),
            })
        }

        fn move_marker(&self, marker: &FakeMarker, position: LatLng) {
            self.record(Call::Move(marker.serial));
            marker.position.set(position);
        }

        fn set_marker_icon(&self, marker: &FakeMarker, icon: &IconAsset) {
            self.record(Call::SetIcon(marker.serial));
            *marker.icon_src.borrow_mut() = icon.src.clone();
        }

        fn bind_marker_click(&self, marker: &FakeMarker, id: &EntityId) {
            self.record(Call::BindClick(marker.serial));
            *marker.click_id.borrow_mut() = Some(id.clone());
        }

        fn detach_marker(&self, marker: &FakeMarker) {
            self.record(Call::Detach(marker.serial));
            marker.detached.set(true);
        }

        fn cluster_clear(&self) {
            self.record(Call::ClusterClear);
        }

        fn cluster_add(&self, markers: &[FakeMarker]) {
            self.record(Call::ClusterAdd(markers.iter().map(|m| m.serial).collect()));
        }

        fn open_overlay(&self, anchor: &FakeMarker, content: &str) {
            self.record(Call::OpenOverlay(anchor.serial));
            *self.overlay_content.borrow_mut() = Some(content.to_string());
        }

        fn close_overlay(&self) {
            self.record(Call::CloseOverlay);
            *self.overlay_content.borrow_mut() = None;
        }

        fn set_bounds(&self, bounds: Bounds) {
            self.record(Call::SetBounds(bounds));
        }

        fn set_center(&self, center: LatLng, level: u8) {
            self.record(Call::SetCenter(center, level));
        }

        fn set_level_limits(&self, min_level: u8, max_level: u8) {
            self.record(Call::SetLevelLimits(min_level, max_level));
        }

        fn relayout(&self) {
            self.record(Call::Relayout);
        }
    }

    pub struct FakeSdk;

    impl MapSdk for FakeSdk {
        type Surface = RecordingMap;

        fn load_map(&self, container_id: &str, _options: &MapOptions) -> Result<RecordingMap, MapError> {
            if container_id.is_empty() {
                return Err(MapError::ContainerMissing(container_id.to_string()));
            }
            Ok(RecordingMap::default())
        }
    }
}
