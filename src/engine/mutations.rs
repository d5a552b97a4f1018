use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::limits::*;
use crate::model::*;

use super::conflict::validate_stay;
use super::{integrity, refresh, ReservationError, ReservationManager};

impl ReservationManager {
    /// Book a stay. The new reservation (and any later ones it collides with)
    /// may be moved forward to keep every resource within capacity.
    pub fn add_reservation(&mut self, request: ReservationRequest) -> Result<Placement, ReservationError> {
        let requested = validate_stay(request.start, request.end, self.clock.today())?;
        {
            let catalog = &self.model.catalog;
            let location = catalog
                .location(&request.location)
                .ok_or_else(|| ReservationError::UnknownLocation(request.location.clone()))?;
            if let Some(bad) = request.optionals.iter().find(|o| !location.offers(o)) {
                return Err(ReservationError::InvalidOptional {
                    location: request.location.clone(),
                    optional: bad.clone(),
                });
            }
            let demand = catalog
                .demand(&request.location, &request.optionals)
                .ok_or_else(|| ReservationError::UnknownLocation(request.location.clone()))?;
            if let Some(empty) = demand.resources.iter().find(|r| r.capacity == 0) {
                return Err(ReservationError::Unsatisfiable(empty.name.clone()));
            }
        }
        if self.model.store.len() >= MAX_RESERVATIONS {
            return Err(ReservationError::LimitExceeded("too many reservations"));
        }
        let id = self.model.next_id;
        let following = id
            .next()
            .ok_or(ReservationError::LimitExceeded("reservation ids exhausted"))?;

        self.model.next_id = following;
        self.model.store.insert(Reservation {
            id,
            stay: requested,
            location: request.location,
            optionals: request.optionals,
        });
        let report = refresh(&mut self.model.store, &self.model.catalog);
        let placed = self.model.store.get(id).map_or(requested, |r| r.stay);
        let others_moved: Vec<ReservationId> = report.moved_ids().into_iter().filter(|m| *m != id).collect();
        self.record_mutation();

        let placement = Placement { id, requested, placed, others_moved };
        let outcome = if placement.was_shifted() { "shifted" } else { "as_requested" };
        metrics::counter!(crate::observability::RESERVATIONS_ADDED_TOTAL, "outcome" => outcome).increment(1);
        info!(%id, %requested, %placed, moved = placement.others_moved.len(), outcome, "reservation added");
        Ok(placement)
    }

    pub fn delete_reservation(&mut self, id: ReservationId) -> Result<Reservation, ReservationError> {
        let removed = self
            .model
            .store
            .remove(id)
            .ok_or_else(|| ReservationError::NotFound(id.to_string()))?;
        self.record_mutation();
        info!(%id, "reservation deleted");
        Ok(removed)
    }

    pub fn add_resource(&mut self, name: &str, capacity: u32, unit_price: u64) -> Result<(), ReservationError> {
        check_name(name)?;
        if self.model.catalog.contains_name(name) {
            return Err(ReservationError::DuplicateName(name.to_string()));
        }
        if self.model.catalog.resource_count() >= MAX_RESOURCES {
            return Err(ReservationError::LimitExceeded("too many resources"));
        }
        self.model.catalog.insert_resource(Resource {
            name: name.to_string(),
            capacity,
            unit_price,
        });
        self.record_mutation();
        info!(resource = name, capacity, unit_price, "resource added");
        Ok(())
    }

    pub fn add_location(
        &mut self,
        name: &str,
        base_price: u64,
        required: BTreeSet<String>,
        optional: BTreeSet<String>,
    ) -> Result<(), ReservationError> {
        check_name(name)?;
        if self.model.catalog.contains_name(name) {
            return Err(ReservationError::DuplicateName(name.to_string()));
        }
        if let Some(missing) = required
            .iter()
            .chain(optional.iter())
            .find(|r| self.model.catalog.resource(r).is_none())
        {
            return Err(ReservationError::UnknownResource(missing.clone()));
        }
        if self.model.catalog.location_count() >= MAX_LOCATIONS {
            return Err(ReservationError::LimitExceeded("too many locations"));
        }
        info!(location = name, base_price, required = required.len(), optional = optional.len(), "location added");
        self.model.catalog.insert_location(Location {
            name: name.to_string(),
            base_price,
            required,
            optional,
        });
        self.record_mutation();
        Ok(())
    }

    /// Remove a resource along with every location that requires it.
    pub fn delete_resource(&mut self, name: &str) -> Result<CascadeReport, ReservationError> {
        let report = integrity::delete_resource(&mut self.model.catalog, &mut self.model.store, name)
            .ok_or_else(|| ReservationError::UnknownResource(name.to_string()))?;
        self.record_mutation();
        Ok(report)
    }

    pub fn delete_location(&mut self, name: &str) -> Result<CascadeReport, ReservationError> {
        let report = integrity::delete_location(&mut self.model.catalog, &mut self.model.store, name)
            .ok_or_else(|| ReservationError::UnknownLocation(name.to_string()))?;
        self.record_mutation();
        Ok(report)
    }

    /// Set the unit price of a resource or the base price of a location.
    ///
    /// A zero price is ignored and reported as `Ok(false)`.
    pub fn update_price(&mut self, name: &str, value: u64) -> Result<bool, ReservationError> {
        let catalog = &mut self.model.catalog;
        if catalog.resource(name).is_none() && catalog.location(name).is_none() {
            return Err(ReservationError::NotFound(name.to_string()));
        }
        if value == 0 {
            debug!(name, "ignoring zero price");
            return Ok(false);
        }
        if let Some(resource) = catalog.resource_mut(name) {
            resource.unit_price = value;
        } else if let Some(location) = catalog.location_mut(name) {
            location.base_price = value;
        }
        self.record_mutation();
        info!(name, price = value, "price updated");
        Ok(true)
    }

    /// Set a resource's capacity. Lowering it re-sweeps the schedule and
    /// returns what moved; a zero capacity is ignored and yields `Ok(None)`.
    pub fn update_quantity(&mut self, name: &str, value: u32) -> Result<Option<RefreshReport>, ReservationError> {
        let resource = self
            .model
            .catalog
            .resource_mut(name)
            .ok_or_else(|| ReservationError::UnknownResource(name.to_string()))?;
        if value == 0 {
            debug!(resource = name, "ignoring zero quantity");
            return Ok(None);
        }
        let previous = std::mem::replace(&mut resource.capacity, value);
        let report = if value < previous {
            refresh(&mut self.model.store, &self.model.catalog)
        } else {
            RefreshReport::default()
        };
        self.record_mutation();
        info!(resource = name, from = previous, to = value, moved = report.displacements.len(), "quantity updated");
        Ok(Some(report))
    }
}

fn check_name(name: &str) -> Result<(), ReservationError> {
    if name.trim().is_empty() {
        return Err(ReservationError::LimitExceeded("name must not be empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(ReservationError::LimitExceeded("name too long"));
    }
    Ok(())
}
