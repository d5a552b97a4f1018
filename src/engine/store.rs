use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::*;

/// Reservations in schedule order plus an id index.
///
/// `records` holds the only copy of each reservation; `order` lists ids sorted
/// by `stay.start`, ties kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservationStore {
    order: Vec<ReservationId>,
    records: HashMap<ReservationId, Reservation>,
}

impl ReservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: ReservationId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn get(&self, id: ReservationId) -> Option<&Reservation> {
        self.records.get(&id)
    }

    /// Id at a schedule position.
    pub fn id_at(&self, pos: usize) -> Option<ReservationId> {
        self.order.get(pos).copied()
    }

    /// Reservations in schedule order.
    pub fn iter(&self) -> impl Iterator<Item = &Reservation> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    pub fn max_id(&self) -> Option<ReservationId> {
        self.records.keys().max().copied()
    }

    /// Insert maintaining sort order; equal starts go after existing ones.
    /// Returns the schedule position.
    pub fn insert(&mut self, reservation: Reservation) -> usize {
        if self.records.contains_key(&reservation.id) {
            self.unlink(reservation.id);
        }
        let pos = self.insertion_point(reservation.stay.start);
        self.order.insert(pos, reservation.id);
        self.records.insert(reservation.id, reservation);
        pos
    }

    /// Remove by id.
    pub fn remove(&mut self, id: ReservationId) -> Option<Reservation> {
        let reservation = self.records.remove(&id)?;
        self.unlink(id);
        Some(reservation)
    }

    /// Move a reservation to `stay` and re-insert it at its new sorted position.
    pub(crate) fn reschedule(&mut self, id: ReservationId, stay: Stay) -> Option<usize> {
        if !self.records.contains_key(&id) {
            return None;
        }
        self.unlink(id);
        let pos = self.insertion_point(stay.start);
        self.order.insert(pos, id);
        if let Some(r) = self.records.get_mut(&id) {
            r.stay = stay;
        }
        Some(pos)
    }

    /// Remove every reservation matching `matches`, returning them in schedule order.
    pub(crate) fn remove_where(&mut self, mut matches: impl FnMut(&Reservation) -> bool) -> Vec<Reservation> {
        let mut removed = Vec::new();
        let records = &mut self.records;
        self.order.retain(|id| {
            let Some(r) = records.get(id) else {
                return false;
            };
            if matches(r) {
                if let Some(r) = records.remove(id) {
                    removed.push(r);
                }
                false
            } else {
                true
            }
        });
        removed
    }

    /// Mutable access for edits that leave `stay` alone (e.g. stripping optionals).
    pub(crate) fn for_each_mut(&mut self, mut f: impl FnMut(&mut Reservation)) {
        for id in &self.order {
            if let Some(r) = self.records.get_mut(id) {
                let start = r.stay.start;
                f(r);
                debug_assert_eq!(r.stay.start, start, "for_each_mut must not move reservations");
            }
        }
    }

    /// First position whose start is strictly after `start`.
    fn insertion_point(&self, start: NaiveDate) -> usize {
        self.order.partition_point(|id| {
            self.records
                .get(id)
                .is_some_and(|r| r.stay.start <= start)
        })
    }

    fn unlink(&mut self, id: ReservationId) {
        if let Some(pos) = self.order.iter().position(|o| *o == id) {
            self.order.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn day(n: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, n).unwrap()
    }

    fn reservation(id: u64, start: u32, end: u32) -> Reservation {
        Reservation {
            id: ReservationId(id),
            stay: Stay::new(day(start), day(end)),
            location: "Room".into(),
            optionals: Default::default(),
        }
    }

    fn ids(store: &ReservationStore) -> Vec<u64> {
        store.iter().map(|r| r.id.0).collect()
    }

    #[test]
    fn insert_keeps_start_order() {
        let mut store = ReservationStore::new();
        store.insert(reservation(1, 20, 21));
        store.insert(reservation(2, 5, 6));
        store.insert(reservation(3, 10, 12));
        assert_eq!(ids(&store), vec![2, 3, 1]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn equal_starts_keep_insertion_order() {
        let mut store = ReservationStore::new();
        store.insert(reservation(1, 5, 6));
        store.insert(reservation(2, 5, 9));
        let pos = store.insert(reservation(3, 5, 5));
        assert_eq!(pos, 2);
        assert_eq!(ids(&store), vec![1, 2, 3]);
    }

    #[test]
    fn lookup_by_id() {
        let mut store = ReservationStore::new();
        store.insert(reservation(1, 5, 6));
        assert_eq!(store.get(ReservationId(1)).unwrap().stay.start, day(5));
        assert!(store.get(ReservationId(9)).is_none());
        assert!(store.contains(ReservationId(1)));
    }

    #[test]
    fn remove_middle_preserves_order() {
        let mut store = ReservationStore::new();
        for (i, start) in [1, 3, 5].into_iter().enumerate() {
            store.insert(reservation(i as u64 + 1, start, start));
        }
        let removed = store.remove(ReservationId(2)).unwrap();
        assert_eq!(removed.id, ReservationId(2));
        assert_eq!(ids(&store), vec![1, 3]);
        assert!(store.get(ReservationId(2)).is_none());
    }

    #[test]
    fn remove_nonexistent_returns_none() {
        let mut store = ReservationStore::new();
        store.insert(reservation(1, 1, 2));
        assert!(store.remove(ReservationId(5)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn reschedule_moves_after_equal_starts() {
        let mut store = ReservationStore::new();
        store.insert(reservation(1, 1, 2));
        store.insert(reservation(2, 3, 4));
        store.insert(reservation(3, 8, 9));
        let pos = store
            .reschedule(ReservationId(1), Stay::new(day(3), day(4)))
            .unwrap();
        assert_eq!(pos, 1);
        assert_eq!(ids(&store), vec![2, 1, 3]);
        assert_eq!(store.get(ReservationId(1)).unwrap().stay.end, day(4));
        assert!(store.reschedule(ReservationId(42), Stay::new(day(1), day(1))).is_none());
    }

    #[test]
    fn reinsert_same_id_replaces() {
        let mut store = ReservationStore::new();
        store.insert(reservation(1, 1, 2));
        store.insert(reservation(1, 9, 9));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(ReservationId(1)).unwrap().stay.start, day(9));
    }

    #[test]
    fn remove_where_returns_dropped_in_order() {
        let mut store = ReservationStore::new();
        store.insert(reservation(1, 4, 4));
        store.insert(reservation(2, 1, 1));
        store.insert(reservation(3, 2, 2));
        let removed = store.remove_where(|r| r.id.0 != 3);
        let removed_ids: Vec<u64> = removed.iter().map(|r| r.id.0).collect();
        assert_eq!(removed_ids, vec![2, 1]);
        assert_eq!(ids(&store), vec![3]);
        assert_eq!(store.max_id(), Some(ReservationId(3)));
    }

    #[test]
    fn id_at_follows_schedule() {
        let mut store = ReservationStore::new();
        store.insert(reservation(7, 9, 9));
        store.insert(reservation(8, 2, 2));
        assert_eq!(store.id_at(0), Some(ReservationId(8)));
        assert_eq!(store.id_at(1), Some(ReservationId(7)));
        assert_eq!(store.id_at(2), None);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert(u32),
        Remove(usize),
        Reschedule(usize, u32),
    }

    fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
        let op = prop_oneof![
            3 => (1u32..8).prop_map(Op::Insert),
            1 => any::<usize>().prop_map(Op::Remove),
            2 => (any::<usize>(), 1u32..8).prop_map(|(i, s)| Op::Reschedule(i, s)),
        ];
        prop::collection::vec(op, 0..60)
    }

    proptest! {
        #[test]
        fn order_holds_under_mixed_operations(ops in arb_ops()) {
            let mut store = ReservationStore::new();
            // (id, start, arrival); arrival grows on every insert or reschedule.
            let mut expected: Vec<(u64, u32, u64)> = Vec::new();
            let mut next_id = 1u64;
            let mut arrival = 0u64;

            for op in ops {
                arrival += 1;
                match op {
                    Op::Insert(start) => {
                        store.insert(reservation(next_id, start, start + 1));
                        expected.push((next_id, start, arrival));
                        next_id += 1;
                    }
                    Op::Remove(pick) => {
                        if expected.is_empty() {
                            continue;
                        }
                        let (id, _, _) = expected.remove(pick % expected.len());
                        prop_assert!(store.remove(ReservationId(id)).is_some());
                    }
                    Op::Reschedule(pick, start) => {
                        if expected.is_empty() {
                            continue;
                        }
                        let len = expected.len();
                        let entry = &mut expected[pick % len];
                        let moved = store.reschedule(ReservationId(entry.0), Stay::new(day(start), day(start + 1)));
                        prop_assert!(moved.is_some());
                        entry.1 = start;
                        entry.2 = arrival;
                    }
                }

                let starts: Vec<NaiveDate> = store.iter().map(|r| r.stay.start).collect();
                prop_assert!(starts.windows(2).all(|w| w[0] <= w[1]));

                let mut want = expected.clone();
                want.sort_by_key(|&(_, start, arrived)| (start, arrived));
                let want_ids: Vec<u64> = want.iter().map(|&(id, _, _)| id).collect();
                prop_assert_eq!(ids(&store), want_ids);
                prop_assert_eq!(store.len(), expected.len());
            }
        }
    }
}
