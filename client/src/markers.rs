use std::collections::HashMap;
use std::rc::Rc;

use crowdmap_shared::{CrowdLevel, EntityId, EntityStore, LatLng};

use crate::icons::{IconAsset, IconCache};
use crate::sdk::MapSurface;

/// A native marker plus what it was last set to, so unchanged entities cost
/// no native calls.
#[derive(Debug, Clone)]
pub struct MarkerHandle<M> {
    pub marker: M,
    pub last_known_level: CrowdLevel,
    pub last_known_position: LatLng,
    icon: Rc<IconAsset>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileResult {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Owns the id -> marker mapping. One handle per id; a handle is updated in
/// place for as long as its id keeps showing up in fetches.
#[derive(Debug)]
pub struct MarkerReconciler<M> {
    handles: HashMap<EntityId, MarkerHandle<M>>,
}

impl<M> Default for MarkerReconciler<M> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }
}

impl<M: Clone> MarkerReconciler<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Align handles with the store: create for new ids, move/re-icon
    /// changed ones, leave the rest alone. Never removes handles.
    pub fn reconcile<S>(&mut self, store: &EntityStore, map: &S, icons: &mut IconCache) -> ReconcileResult
    where
        S: MapSurface<Marker = M>,
    {
        let mut result = ReconcileResult::default();
        for entity in store.iter() {
            let Some(handle) = self.handles.get_mut(&entity.id) else {
                let icon = icons.get(&entity.level);
                let marker = map.create_marker(entity.position, &icon, &entity.name);
                map.bind_marker_click(&marker, &entity.id);
                self.handles.insert(
                    entity.id.clone(),
                    MarkerHandle {
                        marker,
                        last_known_level: entity.level.clone(),
                        last_known_position: entity.position,
                        icon,
                    },
                );
                result.created += 1;
                continue;
            };

            let moved = handle.last_known_position != entity.position;
            let relevelled = handle.last_known_level != entity.level;
            if !moved && !relevelled {
                result.unchanged += 1;
                continue;
            }

            if moved {
                map.move_marker(&handle.marker, entity.position);
                handle.last_known_position = entity.position;
            }
            if relevelled {
                let icon = icons.get(&entity.level);
                // Aliases of one category share an asset; skip the native call.
                if !Rc::ptr_eq(&icon, &handle.icon) {
                    map.set_marker_icon(&handle.marker, &icon);
                    handle.icon = icon;
                }
                handle.last_known_level = entity.level.clone();
            }
            result.updated += 1;
        }
        result
    }

    /// Detach and forget handles for ids that vanished from the latest fetch.
    /// Returns how many were removed.
    pub fn prune<S>(&mut self, stale: &[EntityId], map: &S) -> usize
    where
        S: MapSurface<Marker = M>,
    {
        let mut removed = 0;
        for id in stale {
            if let Some(handle) = self.handles.remove(id) {
                map.detach_marker(&handle.marker);
                removed += 1;
            }
        }
        removed
    }

    #[cfg(test)]
    pub fn get(&self, id: &EntityId) -> Option<&MarkerHandle<M>> {
        self.handles.get(id)
    }

    pub fn marker(&self, id: &EntityId) -> Option<&M> {
        self.handles.get(id).map(|h| &h.marker)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Detach every marker and clear the mapping.
    pub fn teardown<S>(&mut self, map: &S)
    where
        S: MapSurface<Marker = M>,
    {
        for (_, handle) in self.handles.drain() {
            map.detach_marker(&handle.marker);
        }
    }
}
