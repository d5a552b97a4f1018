use std::collections::{BTreeMap, BTreeSet};

use crate::model::*;

/// Resources and locations, keyed by name.
///
/// The two catalogs share one namespace: a name belongs to at most one
/// resource or one location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    resources: BTreeMap<String, Resource>,
    locations: BTreeMap<String, Location>,
}

/// What one reservation consumes while it is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demand<'c> {
    /// The location slot; exclusive.
    pub location: &'c str,
    /// Required ∪ selected optionals, deduplicated, in name order.
    pub resources: Vec<&'c Resource>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lookup ───────────────────────────────────────────────

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.get(name)
    }

    pub fn location(&self, name: &str) -> Option<&Location> {
        self.locations.get(name)
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.locations.values()
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    /// True if `name` is taken by a resource or a location.
    pub fn contains_name(&self, name: &str) -> bool {
        self.resources.contains_key(name) || self.locations.contains_key(name)
    }

    /// Resources a reservation at `location` with `optionals` consumes.
    /// `None` if the location is not catalogued. Unknown resource names are skipped.
    pub fn demand(&self, location: &str, optionals: &BTreeSet<String>) -> Option<Demand<'_>> {
        let (name, loc) = self.locations.get_key_value(location)?;
        let mut resources: BTreeMap<&str, &Resource> = BTreeMap::new();
        for r in loc.required.iter().chain(optionals.iter()) {
            if let Some(resource) = self.resources.get(r) {
                resources.insert(resource.name.as_str(), resource);
            }
        }
        Some(Demand {
            location: name.as_str(),
            resources: resources.into_values().collect(),
        })
    }

    /// Locations that list `resource` as required.
    pub fn locations_requiring(&self, resource: &str) -> Vec<String> {
        self.locations
            .values()
            .filter(|l| l.required.contains(resource))
            .map(|l| l.name.clone())
            .collect()
    }

    // ── Mutation (manager-only) ──────────────────────────────

    pub(crate) fn insert_resource(&mut self, resource: Resource) {
        self.resources.insert(resource.name.clone(), resource);
    }

    pub(crate) fn insert_location(&mut self, location: Location) {
        self.locations.insert(location.name.clone(), location);
    }

    pub(crate) fn remove_resource(&mut self, name: &str) -> Option<Resource> {
        self.resources.remove(name)
    }

    pub(crate) fn remove_location(&mut self, name: &str) -> Option<Location> {
        self.locations.remove(name)
    }

    pub(crate) fn resource_mut(&mut self, name: &str) -> Option<&mut Resource> {
        self.resources.get_mut(name)
    }

    pub(crate) fn location_mut(&mut self, name: &str) -> Option<&mut Location> {
        self.locations.get_mut(name)
    }

    pub(crate) fn locations_mut(&mut self) -> impl Iterator<Item = &mut Location> {
        self.locations.values_mut()
    }
}
