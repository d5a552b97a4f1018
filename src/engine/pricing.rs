use std::collections::BTreeSet;

use crate::model::*;

use super::catalog::Catalog;
use super::ReservationError;

/// Price per day: location base price plus every required and selected optional resource.
pub fn daily_rate(catalog: &Catalog, location: &str, optionals: &BTreeSet<String>) -> Result<u64, ReservationError> {
    let loc = catalog
        .location(location)
        .ok_or_else(|| ReservationError::UnknownLocation(location.to_string()))?;
    if let Some(bad) = optionals.iter().find(|o| !loc.offers(o)) {
        return Err(ReservationError::InvalidOptional {
            location: location.to_string(),
            optional: bad.clone(),
        });
    }

    let consumed: BTreeSet<&String> = loc.required.iter().chain(optionals.iter()).collect();
    let mut total = loc.base_price;
    for name in consumed {
        let resource = catalog
            .resource(name)
            .ok_or_else(|| ReservationError::UnknownResource(name.clone()))?;
        total = total.saturating_add(resource.unit_price);
    }
    Ok(total)
}

/// Total price of a stay: `daily_rate × days`, days counted inclusively.
pub fn price(catalog: &Catalog, stay: &Stay, location: &str, optionals: &BTreeSet<String>) -> Result<u64, ReservationError> {
    Ok(daily_rate(catalog, location, optionals)?.saturating_mul(stay.days()))
}

pub fn price_of(catalog: &Catalog, reservation: &Reservation) -> Result<u64, ReservationError> {
    price(catalog, &reservation.stay, &reservation.location, &reservation.optionals)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn set(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn catalog() -> Catalog {
        let mut c = Catalog::new();
        c.insert_resource(Resource { name: "Chair".into(), capacity: 2, unit_price: 3 });
        c.insert_resource(Resource { name: "Projector".into(), capacity: 1, unit_price: 7 });
        c.insert_location(Location {
            name: "Room".into(),
            base_price: 10,
            required: BTreeSet::new(),
            optional: BTreeSet::new(),
        });
        c.insert_location(Location {
            name: "Hall".into(),
            base_price: 100,
            required: set(&["Chair"]),
            optional: set(&["Projector", "Chair"]),
        });
        c
    }

    #[test]
    fn single_day_is_one_day() {
        let c = catalog();
        let stay = Stay::new(day(1), day(1));
        assert_eq!(price(&c, &stay, "Room", &BTreeSet::new()).unwrap(), 10);
    }

    #[test]
    fn required_and_optionals_add_per_day() {
        let c = catalog();
        let stay = Stay::new(day(1), day(3));
        assert_eq!(price(&c, &stay, "Hall", &BTreeSet::new()).unwrap(), (100 + 3) * 3);
        assert_eq!(price(&c, &stay, "Hall", &set(&["Projector"])).unwrap(), (100 + 3 + 7) * 3);
    }

    #[test]
    fn optional_that_is_also_required_counts_once() {
        let c = catalog();
        assert_eq!(daily_rate(&c, "Hall", &set(&["Chair"])).unwrap(), 103);
    }

    #[test]
    fn pricing_is_deterministic() {
        let c = catalog();
        let stay = Stay::new(day(2), day(9));
        let opts = set(&["Projector"]);
        assert_eq!(price(&c, &stay, "Hall", &opts), price(&c, &stay, "Hall", &opts));
    }

    #[test]
    fn unknown_location_and_bad_optional() {
        let c = catalog();
        let stay = Stay::new(day(1), day(1));
        assert!(matches!(
            price(&c, &stay, "Attic", &BTreeSet::new()),
            Err(ReservationError::UnknownLocation(_))
        ));
        assert!(matches!(
            price(&c, &stay, "Room", &set(&["Projector"])),
            Err(ReservationError::InvalidOptional { .. })
        ));
    }

    #[test]
    fn price_of_reservation() {
        let c = catalog();
        let r = Reservation {
            id: ReservationId(1),
            stay: Stay::new(day(1), day(2)),
            location: "Hall".into(),
            optionals: set(&["Projector"]),
        };
        assert_eq!(price_of(&c, &r).unwrap(), 110 * 2);
    }
}
