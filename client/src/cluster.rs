use crowdmap_shared::EntityId;

use crate::markers::MarkerReconciler;
use crate::sdk::{ClusterOptions, MapSurface};

/// Points coalesce into a cluster glyph from this map level outwards.
pub const CLUSTER_MIN_LEVEL: u8 = 6;
/// Cluster cell edge, screen pixels.
pub const CLUSTER_GRID_SIZE: u32 = 60;

pub const DEFAULT_CLUSTER_OPTIONS: ClusterOptions = ClusterOptions {
    min_level: CLUSTER_MIN_LEVEL,
    grid_size: CLUSTER_GRID_SIZE,
};

/// Keeps the clustering layer's pool equal to the filtered id list.
/// Every sync is a full rebuild over existing handles; no marker is
/// created or destroyed here.
#[derive(Debug, Default)]
pub struct ClusterManager {
    pool: Vec<EntityId>,
}

impl ClusterManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the pool and re-add handles for `filtered`, in order. Ids with no
    /// handle are skipped. Returns the new pool size.
    pub fn sync_visible<S: MapSurface>(
        &mut self,
        filtered: &[EntityId],
        markers: &MarkerReconciler<S::Marker>,
        map: &S,
    ) -> usize {
        let mut pool = Vec::with_capacity(filtered.len());
        let mut handles = Vec::with_capacity(filtered.len());
        for id in filtered {
            if let Some(marker) = markers.marker(id) {
                pool.push(id.clone());
                handles.push(marker.clone());
            }
        }

        map.cluster_clear();
        if !handles.is_empty() {
            map.cluster_add(&handles);
        }
        self.pool = pool;
        self.pool.len()
    }

    #[cfg(test)]
    pub fn pool(&self) -> &[EntityId] {
        &self.pool
    }

    pub fn clear<S: MapSurface>(&mut self, map: &S) {
        map.cluster_clear();
        self.pool.clear();
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crowdmap_shared::{ApiContract, EntityStore};

    use super::*;
    use crate::icons::IconCache;
    use crate::sdk::testing::{Call, RecordingMap};

    fn loaded() -> (RecordingMap, EntityStore, MarkerReconciler<crate::sdk::testing::FakeMarker>) {
        let map = RecordingMap::default();
        let mut store = EntityStore::new();
        store
            .replace(
                &json!({ "ok": true, "items": [
                    { "area_cd": "1", "name": "A", "lat": 37.5, "lon": 127.0 },
                    { "area_cd": "2", "name": "B", "lat": 37.6, "lon": 127.1 },
                    { "area_cd": "3", "name": "C", "lat": 37.7, "lon": 127.2 }
                ]}),
                ApiContract::Congestion,
            )
            .unwrap();
        let mut markers = MarkerReconciler::new();
        markers.reconcile(&store, &map, &mut IconCache::new());
        map.take_calls();
        (map, store, markers)
    }

    #[test]
    fn rebuilds_pool_in_given_order() {
        let (map, _store, markers) = loaded();
        let mut cluster = ClusterManager::new();
        let ids = vec![EntityId::from("3"), EntityId::from("1")];

        assert_eq!(cluster.sync_visible(&ids, &markers, &map), 2);
        assert_eq!(cluster.pool(), ids.as_slice());
        assert_eq!(map.take_calls(), vec![Call::ClusterClear, Call::ClusterAdd(vec![2, 0])]);
    }

    #[test]
    fn unknown_ids_are_skipped() {
        let (map, _store, markers) = loaded();
        let mut cluster = ClusterManager::new();
        let n = cluster.sync_visible(&[EntityId::from("2"), EntityId::from("x")], &markers, &map);
        assert_eq!(n, 1);
        assert_eq!(cluster.pool(), &[EntityId::from("2")]);
    }

    #[test]
    fn empty_filter_just_clears() {
        let (map, _store, markers) = loaded();
        let mut cluster = ClusterManager::new();
        cluster.sync_visible(&[EntityId::from("1")], &markers, &map);
        map.take_calls();

        assert_eq!(cluster.sync_visible(&[], &markers, &map), 0);
        assert_eq!(map.take_calls(), vec![Call::ClusterClear]);
        assert!(cluster.pool().is_empty());
    }

    #[test]
    fn sync_never_touches_markers() {
        let (map, _store, markers) = loaded();
        let mut cluster = ClusterManager::new();
        let all = vec![EntityId::from("1"), EntityId::from("2"), EntityId::from("3")];
        cluster.sync_visible(&all, &markers, &map);
        cluster.sync_visible(&all, &markers, &map);
        assert!(
            map.take_calls()
                .iter()
                .all(|c| matches!(c, Call::ClusterClear | Call::ClusterAdd(_)))
        );
    }
}
