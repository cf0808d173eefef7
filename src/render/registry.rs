use crate::engine::{Engine, Entity};
use crate::render::mesh_factory::FurnitureNode;
use crate::scene::Furniture;
use std::collections::HashMap;

/// A furniture node together with the record and selection it was last
/// synchronized from.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub node: FurnitureNode,
    pub record: Furniture,
    pub selected: bool,
}

/// Furniture id to scene node, plus the side table that maps every tagged
/// descendant back to its owning id.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
    owners: HashMap<Entity, String>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RegistryEntry> {
        self.entries.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &str) -> Option<&mut RegistryEntry> {
        self.entries.get_mut(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &RegistryEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    pub fn roots(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries.values().map(|entry| entry.node.root)
    }

    /// Roots that switch detail levels by distance.
    pub fn lod_roots(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entries
            .values()
            .filter(|entry| entry.node.is_model())
            .map(|entry| entry.node.root)
    }

    pub fn selected_ids(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.selected)
            .map(|(id, _)| id.as_str())
    }

    /// Registers a freshly built node and tags its whole subtree.
    pub fn insert(&mut self, engine: &Engine, entry: RegistryEntry) {
        let id = entry.record.id.clone();
        self.tag_subtree(engine, entry.node.root, &id);
        self.entries.insert(id, entry);
    }

    /// Drops the entry and every tag pointing at it.
    pub fn remove(&mut self, id: &str) -> Option<RegistryEntry> {
        let entry = self.entries.remove(id)?;
        self.owners.retain(|_, owner| owner != id);
        Some(entry)
    }

    pub fn tag_subtree(&mut self, engine: &Engine, root: Entity, id: &str) {
        for entity in engine.descendants(root) {
            self.owners.insert(entity, id.to_string());
        }
    }

    pub fn untag(&mut self, entity: Entity) {
        self.owners.remove(&entity);
    }

    pub fn tagged_owner(&self, entity: Entity) -> Option<&str> {
        self.owners.get(&entity).map(String::as_str)
    }

    /// Owning furniture id of any node: the side table first, then the
    /// nearest registered ancestor.
    pub fn owner_of(&self, engine: &Engine, entity: Entity) -> Option<&str> {
        if let Some(owner) = self.tagged_owner(entity) {
            return Some(owner);
        }
        let mut current = engine.parent(entity);
        while let Some(ancestor) = current {
            if let Some(owner) = self.tagged_owner(ancestor) {
                return Some(owner);
            }
            if let Some((id, _)) = self
                .entries
                .iter()
                .find(|(_, entry)| entry.node.root == ancestor)
            {
                return Some(id.as_str());
            }
            current = engine.parent(ancestor);
        }
        None
    }

    pub(crate) fn drain(&mut self) -> impl Iterator<Item = (String, RegistryEntry)> + '_ {
        self.owners.clear();
        self.entries.drain()
    }
}
