use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::entity::{Entity, EntityId};
use crate::error::IngestError;
use crate::wire::{ApiContract, parse_payload};

/// What changed between the previous store contents and a replacement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreDiff {
    pub added: Vec<EntityId>,
    pub changed: Vec<EntityId>,
    pub unchanged: usize,
    /// Ids present before the replace and absent after it.
    pub removed: Vec<EntityId>,
    /// Items dropped at ingestion (bad coordinates, missing name, non-records).
    pub rejected: usize,
}

/// Canonical id -> entity mapping, in fetch order.
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a fetched payload and swap it in as the new contents.
    /// On error the previous contents are kept as they were.
    pub fn replace(&mut self, body: &Value, contract: ApiContract) -> Result<StoreDiff, IngestError> {
        let items = parse_payload(body, contract)?;
        let mut rejected = 0;
        let mut entities = Vec::with_capacity(items.len());
        for item in items {
            match item.and_then(|raw| raw.into_entity()) {
                Ok(entity) => entities.push(entity),
                Err(_) => rejected += 1,
            }
        }
        let mut diff = self.replace_entities(entities);
        diff.rejected = rejected;
        Ok(diff)
    }

    /// Install already-normalized entities. A repeated id keeps its first
    /// position and the later record's attributes.
    pub fn replace_entities(&mut self, incoming: Vec<Entity>) -> StoreDiff {
        let mut entities: Vec<Entity> = Vec::with_capacity(incoming.len());
        let mut index: HashMap<EntityId, usize> = HashMap::with_capacity(incoming.len());
        for entity in incoming {
            if let Some(&slot) = index.get(&entity.id) {
                entities[slot] = entity;
            } else {
                index.insert(entity.id.clone(), entities.len());
                entities.push(entity);
            }
        }

        let mut diff = StoreDiff::default();
        for entity in &entities {
            match self.get(&entity.id) {
                None => diff.added.push(entity.id.clone()),
                Some(previous) if previous != entity => diff.changed.push(entity.id.clone()),
                Some(_) => diff.unchanged += 1,
            }
        }
        diff.removed = self
            .entities
            .iter()
            .filter(|old| !index.contains_key(&old.id))
            .map(|old| old.id.clone())
            .collect();

        self.entities = entities;
        self.index = index;
        diff
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.index.get(id).and_then(|&i| self.entities.get(i))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Most recent `updated_at` across all entities, for the status line.
    pub fn latest_update_timestamp(&self) -> Option<DateTime<Utc>> {
        self.entities.iter().filter_map(|e| e.updated_at).max()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.index.clear();
    }
}
