//! Referential-integrity policy: the one place catalog deletions cascade.
//!
//! - Deleting a location deletes its reservations.
//! - Deleting a resource deletes every location that requires it (and so
//!   their reservations), and strips it from the remaining locations'
//!   optional menus and from every reservation's selected optionals.
//!
//! Removal only ever relaxes capacity, so none of this triggers a refresh.

use tracing::info;

use crate::model::*;

use super::catalog::Catalog;
use super::store::ReservationStore;

pub(crate) fn delete_location(catalog: &mut Catalog, store: &mut ReservationStore, name: &str) -> Option<CascadeReport> {
    catalog.remove_location(name)?;
    let removed = store.remove_where(|r| r.location == name);
    let report = CascadeReport {
        removed_locations: vec![name.to_string()],
        removed_reservations: removed.iter().map(|r| r.id).collect(),
        stripped_reservations: Vec::new(),
    };
    info!(location = name, reservations = removed.len(), "location deleted");
    Some(report)
}

pub(crate) fn delete_resource(catalog: &mut Catalog, store: &mut ReservationStore, name: &str) -> Option<CascadeReport> {
    catalog.remove_resource(name)?;
    let mut report = CascadeReport::default();

    for location in catalog.locations_requiring(name) {
        if let Some(sub) = delete_location(catalog, store, &location) {
            report.absorb(sub);
        }
    }
    for location in catalog.locations_mut() {
        location.optional.remove(name);
    }
    store.for_each_mut(|r| {
        if r.optionals.remove(name) {
            report.stripped_reservations.push(r.id);
        }
    });

    info!(
        resource = name,
        locations = report.removed_locations.len(),
        reservations = report.removed_reservations.len(),
        stripped = report.stripped_reservations.len(),
        "resource deleted"
    );
    Some(report)
}

/// First dangling reference in a model, if any. Used to vet loaded snapshots.
pub(crate) fn find_dangling(catalog: &Catalog, store: &ReservationStore) -> Option<String> {
    for location in catalog.locations() {
        if let Some(missing) = location
            .required
            .iter()
            .chain(location.optional.iter())
            .find(|r| catalog.resource(r).is_none())
        {
            return Some(format!("location {} references unknown resource {missing}", location.name));
        }
    }
    for r in store.iter() {
        let Some(location) = catalog.location(&r.location) else {
            return Some(format!("{} references unknown location {}", r.id, r.location));
        };
        if let Some(bad) = r.optionals.iter().find(|o| !location.offers(o)) {
            return Some(format!("{} selects {bad}, not offered by {}", r.id, r.location));
        }
        if r.stay.start > r.stay.end {
            return Some(format!("{} ends before it starts", r.id));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::NaiveDate;

    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn set(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn fixture() -> (Catalog, ReservationStore) {
        let mut c = Catalog::new();
        for name in ["Chair", "Projector", "Lamp"] {
            c.insert_resource(Resource { name: name.into(), capacity: 2, unit_price: 1 });
        }
        c.insert_location(Location {
            name: "Room".into(),
            base_price: 10,
            required: set(&["Chair"]),
            optional: set(&["Projector"]),
        });
        c.insert_location(Location {
            name: "Hall".into(),
            base_price: 10,
            required: set(&["Lamp"]),
            optional: set(&["Projector"]),
        });
        let mut store = ReservationStore::new();
        for (id, loc, opts) in [(1, "Room", &["Projector"][..]), (2, "Hall", &["Projector"][..]), (3, "Hall", &[][..])] {
            store.insert(Reservation {
                id: ReservationId(id),
                stay: Stay::new(day(id as u32), day(id as u32)),
                location: loc.into(),
                optionals: set(opts),
            });
        }
        (c, store)
    }

    #[test]
    fn deleting_location_drops_its_reservations() {
        let (mut c, mut store) = fixture();
        let report = delete_location(&mut c, &mut store, "Hall").unwrap();
        assert_eq!(report.removed_reservations, vec![ReservationId(2), ReservationId(3)]);
        assert!(c.location("Hall").is_none());
        assert_eq!(store.len(), 1);
        assert!(find_dangling(&c, &store).is_none());
    }

    #[test]
    fn deleting_required_resource_drops_requiring_locations() {
        let (mut c, mut store) = fixture();
        let report = delete_resource(&mut c, &mut store, "Chair").unwrap();
        assert_eq!(report.removed_locations, vec!["Room".to_string()]);
        assert_eq!(report.removed_reservations, vec![ReservationId(1)]);
        assert!(store.get(ReservationId(1)).is_none());
        assert!(find_dangling(&c, &store).is_none());
    }

    #[test]
    fn deleting_optional_resource_strips_selections() {
        let (mut c, mut store) = fixture();
        let report = delete_resource(&mut c, &mut store, "Projector").unwrap();
        assert!(report.removed_locations.is_empty());
        assert_eq!(report.stripped_reservations, vec![ReservationId(1), ReservationId(2)]);
        assert!(c.locations().all(|l| !l.optional.contains("Projector")));
        assert!(store.iter().all(|r| r.optionals.is_empty()));
        assert_eq!(store.len(), 3);
        assert!(find_dangling(&c, &store).is_none());
    }

    #[test]
    fn deleting_unknown_is_none() {
        let (mut c, mut store) = fixture();
        assert!(delete_resource(&mut c, &mut store, "Sofa").is_none());
        assert!(delete_location(&mut c, &mut store, "Attic").is_none());
    }

    #[test]
    fn find_dangling_reports_missing_location() {
        let (mut c, store) = fixture();
        c.remove_location("Room");
        let msg = find_dangling(&c, &store).unwrap();
        assert!(msg.contains("unknown location Room"), "{msg}");
    }
}
