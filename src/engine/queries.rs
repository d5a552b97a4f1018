use crate::model::*;

use super::conflict::validate_stay;
use super::{pricing, ReservationError, ReservationManager};

impl ReservationManager {
    /// All reservations in schedule order.
    pub fn reservations(&self) -> impl Iterator<Item = &Reservation> {
        self.model.store.iter()
    }

    pub fn reservation(&self, id: ReservationId) -> Result<&Reservation, ReservationError> {
        self.model
            .store
            .get(id)
            .ok_or_else(|| ReservationError::NotFound(id.to_string()))
    }

    /// Record plus the location's required resources and the total price.
    pub fn reservation_details(&self, id: ReservationId) -> Result<ReservationDetails, ReservationError> {
        let reservation = self.reservation(id)?;
        let required = self
            .model
            .catalog
            .location(&reservation.location)
            .map(|l| l.required.clone())
            .ok_or_else(|| ReservationError::UnknownLocation(reservation.location.clone()))?;
        let price = pricing::price_of(&self.model.catalog, reservation)?;
        Ok(ReservationDetails {
            reservation: reservation.clone(),
            required,
            price,
        })
    }

    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.model.catalog.resources()
    }

    pub fn locations(&self) -> impl Iterator<Item = &Location> {
        self.model.catalog.locations()
    }

    /// A location with each related resource tagged required or optional.
    /// A resource both required and optional is listed once, as required.
    pub fn location_details(&self, name: &str) -> Result<LocationDetails, ReservationError> {
        let location = self
            .model
            .catalog
            .location(name)
            .ok_or_else(|| ReservationError::UnknownLocation(name.to_string()))?;
        let mut relations: Vec<(String, Relation)> = location
            .required
            .iter()
            .map(|r| (r.clone(), Relation::Required))
            .collect();
        relations.extend(
            location
                .optional
                .iter()
                .filter(|r| !location.required.contains(*r))
                .map(|r| (r.clone(), Relation::Optional)),
        );
        let reservations = self.model.store.iter().filter(|r| r.location == name).count();
        Ok(LocationDetails {
            location: location.clone(),
            relations,
            reservations,
        })
    }

    /// Price a prospective booking without touching the schedule.
    ///
    /// Applies the same date checks as `add_reservation`, so a quote that
    /// succeeds is for a stay that could be booked today.
    pub fn quote(&self, request: &ReservationRequest) -> Result<u64, ReservationError> {
        let stay = validate_stay(request.start, request.end, self.clock.today())?;
        pricing::price(&self.model.catalog, &stay, &request.location, &request.optionals)
    }

    pub fn price_of(&self, id: ReservationId) -> Result<u64, ReservationError> {
        pricing::price_of(&self.model.catalog, self.reservation(id)?)
    }
}
