mod allocation;
mod catalog;
mod conflict;
mod error;
mod integrity;
mod mutations;
mod pricing;
mod queries;
mod store;

pub use allocation::refresh;
pub use catalog::{Catalog, Demand};
pub use error::ReservationError;
pub use pricing::{daily_rate, price, price_of};
pub use store::ReservationStore;

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::model::*;
use crate::snapshot::{self, Snapshot};

/// The whole mutable aggregate: catalogs, schedule, id counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    pub(crate) catalog: Catalog,
    pub(crate) store: ReservationStore,
    pub(crate) next_id: ReservationId,
}

impl Default for Model {
    fn default() -> Self {
        Self {
            catalog: Catalog::new(),
            store: ReservationStore::new(),
            next_id: ReservationId::FIRST,
        }
    }
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn store(&self) -> &ReservationStore {
        &self.store
    }

    /// Id the next booking will receive.
    pub fn next_id(&self) -> ReservationId {
        self.next_id
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            next_id: self.next_id.0,
            resources: self.catalog.resources().cloned().collect(),
            locations: self.catalog.locations().cloned().collect(),
            reservations: self.store.iter().cloned().collect(),
        }
    }

    /// Rebuild from a snapshot, rejecting duplicate names or dangling references.
    /// The id counter resumes past every stored id.
    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self, ReservationError> {
        let mut model = Model::new();
        let mut names = HashSet::new();
        for resource in snapshot.resources {
            if !names.insert(resource.name.clone()) {
                return Err(ReservationError::Persistence(format!("duplicate name {}", resource.name)));
            }
            model.catalog.insert_resource(resource);
        }
        for location in snapshot.locations {
            if !names.insert(location.name.clone()) {
                return Err(ReservationError::Persistence(format!("duplicate name {}", location.name)));
            }
            model.catalog.insert_location(location);
        }
        for reservation in snapshot.reservations {
            if model.store.contains(reservation.id) {
                return Err(ReservationError::Persistence(format!("duplicate id {}", reservation.id)));
            }
            model.store.insert(reservation);
        }
        if let Some(problem) = integrity::find_dangling(&model.catalog, &model.store) {
            return Err(ReservationError::Persistence(problem));
        }
        let after_stored = match model.store.max_id() {
            None => ReservationId::FIRST,
            Some(max) => max
                .next()
                .ok_or_else(|| ReservationError::Persistence(format!("reservation id {max} leaves no successor")))?,
        };
        model.next_id = ReservationId(snapshot.next_id).max(after_stored);
        Ok(model)
    }
}

/// Façade over the model: validates requests, issues ids, keeps the schedule conflict-free.
pub struct ReservationManager {
    model: Model,
    clock: Box<dyn Clock>,
    mutations_since_save: u64,
}

impl ReservationManager {
    pub fn new(model: Model, clock: Box<dyn Clock>) -> Self {
        Self {
            model,
            clock,
            mutations_since_save: 0,
        }
    }

    /// Load the model at `path`; a missing file starts an empty model.
    pub fn open(path: &Path, clock: Box<dyn Clock>) -> Result<Self, ReservationError> {
        let model = match snapshot::load(path).map_err(persistence_err)? {
            Some(snapshot) => Model::from_snapshot(snapshot)?,
            None => {
                info!(path = %path.display(), "no saved model, starting empty");
                Model::new()
            }
        };
        info!(
            resources = model.catalog.resource_count(),
            locations = model.catalog.location_count(),
            reservations = model.store.len(),
            "model loaded"
        );
        metrics::gauge!(crate::observability::RESERVATIONS_ACTIVE).set(model.store.len() as f64);
        Ok(Self::new(model, clock))
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Mutations applied since the last successful save or load.
    pub fn mutations_since_save(&self) -> u64 {
        self.mutations_since_save
    }

    /// Write the whole model to `path` (temp file + atomic rename).
    pub fn save(&mut self, path: &Path) -> Result<(), ReservationError> {
        let started = Instant::now();
        let result = snapshot::save(&self.model.to_snapshot(), path);
        metrics::histogram!(crate::observability::SNAPSHOT_SAVE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        match result {
            Ok(()) => {
                info!(path = %path.display(), reservations = self.model.store.len(), "model saved");
                self.mutations_since_save = 0;
                Ok(())
            }
            Err(e) => {
                warn!(path = %path.display(), "save failed: {e}");
                Err(persistence_err(e))
            }
        }
    }

    /// Replace the model with the one stored at `path`.
    /// On any failure (including a missing file) the current model is kept.
    pub fn reload(&mut self, path: &Path) -> Result<(), ReservationError> {
        let snapshot = snapshot::load(path)
            .map_err(persistence_err)?
            .ok_or_else(|| ReservationError::Persistence(format!("no saved model at {}", path.display())))?;
        self.model = Model::from_snapshot(snapshot)?;
        self.mutations_since_save = 0;
        metrics::gauge!(crate::observability::RESERVATIONS_ACTIVE).set(self.model.store.len() as f64);
        info!(path = %path.display(), reservations = self.model.store.len(), "model reloaded");
        Ok(())
    }

    /// Full re-sweep of the schedule.
    pub fn refresh(&mut self) -> RefreshReport {
        let report = refresh(&mut self.model.store, &self.model.catalog);
        if !report.is_converged() {
            info!(moved = report.moved_ids().len(), "schedule refreshed");
            self.record_mutation();
        }
        report
    }

    pub(super) fn record_mutation(&mut self) {
        self.mutations_since_save += 1;
        metrics::gauge!(crate::observability::RESERVATIONS_ACTIVE).set(self.model.store.len() as f64);
    }
}

fn persistence_err(e: std::io::Error) -> ReservationError {
    ReservationError::Persistence(e.to_string())
}
