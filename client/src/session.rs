use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crowdmap_shared::{
    ApiContract, Entity, EntityId, EntityStore, IngestError, LevelFilter, StoreDiff, filter,
};

use crate::cluster::ClusterManager;
use crate::fetch::{FetchSequencer, FetchTicket};
use crate::icons::IconCache;
use crate::markers::{MarkerReconciler, ReconcileResult};
use crate::overlay::InfoOverlay;
use crate::sdk::{MapError, MapSdk, MapSurface};
use crate::view::{FOCUS_LEVEL, ViewController};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub diff: StoreDiff,
    pub reconcile: ReconcileResult,
    pub pruned: usize,
    pub visible: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied(SyncReport),
    /// The store and markers were left exactly as they were.
    Rejected(IngestError),
    /// Superseded by a newer fetch, or the session is gone.
    Discarded,
}

/// One mounted map and everything synchronized onto it. A fetch result flows
/// store -> reconciler -> prune -> filter -> cluster -> overlay inside one
/// call, so nothing downstream observes a half-applied store.
pub struct MapSession<S: MapSurface> {
    map: Rc<S>,
    contract: ApiContract,
    store: EntityStore,
    icons: IconCache,
    markers: MarkerReconciler<S::Marker>,
    cluster: ClusterManager,
    overlay: InfoOverlay,
    view: ViewController,
    search: String,
    level_filter: LevelFilter,
    visible: Vec<EntityId>,
    sequencer: FetchSequencer,
}

impl<S: MapSurface> MapSession<S> {
    /// Load a map into `container_id` and apply the view limits.
    pub fn open<K>(
        sdk: &K,
        container_id: &str,
        view: ViewController,
        contract: ApiContract,
    ) -> Result<Self, MapError>
    where
        K: MapSdk<Surface = S>,
    {
        let map = sdk.load_map(container_id, &view.map_options())?;
        view.apply_limits(&map);
        Ok(Self::with_surface(map, view, contract))
    }

    pub fn with_surface(map: S, view: ViewController, contract: ApiContract) -> Self {
        Self {
            map: Rc::new(map),
            contract,
            store: EntityStore::new(),
            icons: IconCache::new(),
            markers: MarkerReconciler::new(),
            cluster: ClusterManager::new(),
            overlay: InfoOverlay::new(),
            view,
            search: String::new(),
            level_filter: LevelFilter::All,
            visible: Vec::new(),
            sequencer: FetchSequencer::new(),
        }
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.sequencer.begin()
    }

    #[cfg(test)]
    pub fn is_current(&self, ticket: FetchTicket) -> bool {
        self.sequencer.is_current(ticket)
    }

    pub fn apply_fetch(&mut self, ticket: FetchTicket, result: Result<Value, IngestError>) -> FetchOutcome {
        if !self.sequencer.is_current(ticket) {
            return FetchOutcome::Discarded;
        }
        let diff = match result.and_then(|body| self.store.replace(&body, self.contract)) {
            Ok(diff) => diff,
            Err(err) => return FetchOutcome::Rejected(err),
        };

        let reconcile = self.markers.reconcile(&self.store, &*self.map, &mut self.icons);
        let pruned = self.markers.prune(&diff.removed, &*self.map);
        let visible = self.refilter();
        self.overlay.refresh(&self.store, &self.markers, &*self.map);

        FetchOutcome::Applied(SyncReport {
            diff,
            reconcile,
            pruned,
            visible,
        })
    }

    /// Recompute the filtered ids and rebuild the cluster pool from them.
    fn refilter(&mut self) -> usize {
        self.visible = filter(&self.store, &self.search, &self.level_filter);
        self.cluster.sync_visible(&self.visible, &self.markers, &*self.map)
    }

    /// Takes the debounced search value, never raw keystrokes.
    pub fn set_search(&mut self, search: &str) -> usize {
        if self.search == search {
            return self.visible.len();
        }
        self.search = search.to_string();
        self.refilter()
    }

    pub fn set_level_filter(&mut self, level_filter: LevelFilter) -> usize {
        if self.level_filter == level_filter {
            return self.visible.len();
        }
        self.level_filter = level_filter;
        self.refilter()
    }

    #[cfg(test)]
    pub fn search(&self) -> &str {
        &self.search
    }

    #[cfg(test)]
    pub fn level_filter(&self) -> &LevelFilter {
        &self.level_filter
    }

    #[cfg(test)]
    pub fn visible_ids(&self) -> &[EntityId] {
        &self.visible
    }

    pub fn visible_entities(&self) -> impl Iterator<Item = &Entity> {
        self.visible.iter().filter_map(|id| self.store.get(id))
    }

    #[cfg(test)]
    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.store.get(id)
    }

    pub fn show_overlay(&mut self, id: &EntityId) -> bool {
        self.overlay.show_for(id, &self.store, &self.markers, &*self.map)
    }

    pub fn hide_overlay(&mut self) {
        self.overlay.hide(&*self.map);
    }

    #[cfg(test)]
    pub fn overlay_id(&self) -> Option<&EntityId> {
        self.overlay.open_id()
    }

    /// Jump to an entity and open its overlay (list-row click).
    pub fn focus_entity(&mut self, id: &EntityId) -> bool {
        let Some(position) = self.store.get(id).map(|e| e.position) else {
            return false;
        };
        self.view.center_on(&*self.map, position, FOCUS_LEVEL);
        self.show_overlay(id)
    }

    pub fn reset_view(&self) {
        self.view.reset_to_default_bounds(&*self.map);
    }

    pub fn relayout(&self) {
        self.map.relayout();
    }

    pub fn latest_update(&self) -> Option<DateTime<Utc>> {
        self.store.latest_update_timestamp()
    }

    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    /// View settings plus a shared map handle, for camera moves that must
    /// await something without holding the session.
    pub fn camera(&self) -> (ViewController, Rc<S>) {
        (self.view, Rc::clone(&self.map))
    }

    #[cfg(test)]
    pub fn map(&self) -> &S {
        &self.map
    }

    #[cfg(test)]
    pub fn is_torn_down(&self) -> bool {
        self.sequencer.is_closed()
    }

    /// Release everything placed on the map. Fetches still in flight will
    /// come back as `Discarded`. Safe to call twice.
    pub fn teardown(&mut self) {
        if self.sequencer.is_closed() {
            return;
        }
        self.sequencer.close();
        self.overlay.hide(&*self.map);
        self.cluster.clear(&*self.map);
        self.markers.teardown(&*self.map);
        self.store.clear();
        self.visible.clear();
    }
}
