use std::collections::VecDeque;

use crate::contacts::ContactSet;
use crate::hashing::HashMap;
use crate::person::PersonId;

/// Records contacts for retrospective queries. The engine calls [`ContactTracer::record`] with
/// every location's contacts and [`ContactTracer::advance_time_slot`] on its own cadence;
/// implementations keep their own copy of whatever they need.
pub trait ContactTracer: Send {
    fn record(&mut self, contacts: &ContactSet);

    fn advance_time_slot(&mut self);

    /// Contacts of `person_id` over the retained history, as `(other, count)` sorted by id.
    fn contact_counts(&self, person_id: PersonId) -> Vec<(PersonId, u32)>;

    fn reset(&mut self);
}

type SlotCounts = HashMap<PersonId, HashMap<PersonId, u32>>;

/// Keeps per-person contact counts for the most recent `storage_slots` time slots.
#[derive(Debug)]
pub struct MaxSlotContactTracer {
    storage_slots: usize,
    slots: VecDeque<SlotCounts>,
}

impl MaxSlotContactTracer {
    /// # Panics
    ///
    /// Panics if `storage_slots` is zero.
    #[must_use]
    pub fn new(storage_slots: usize) -> MaxSlotContactTracer {
        assert!(storage_slots > 0, "a contact tracer needs at least one slot");
        let mut slots = VecDeque::with_capacity(storage_slots);
        slots.push_back(SlotCounts::default());
        MaxSlotContactTracer {
            storage_slots,
            slots,
        }
    }

    #[must_use]
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }
}

impl ContactTracer for MaxSlotContactTracer {
    fn record(&mut self, contacts: &ContactSet) {
        let Some(current) = self.slots.back_mut() else {
            return;
        };
        for &(a, b) in contacts {
            *current.entry(a).or_default().entry(b).or_insert(0) += 1;
            *current.entry(b).or_default().entry(a).or_insert(0) += 1;
        }
    }

    fn advance_time_slot(&mut self) {
        self.slots.push_back(SlotCounts::default());
        while self.slots.len() > self.storage_slots {
            self.slots.pop_front();
        }
    }

    fn contact_counts(&self, person_id: PersonId) -> Vec<(PersonId, u32)> {
        let mut totals: HashMap<PersonId, u32> = HashMap::default();
        for slot in &self.slots {
            if let Some(counts) = slot.get(&person_id) {
                for (&other, &count) in counts {
                    *totals.entry(other).or_insert(0) += count;
                }
            }
        }
        let mut totals: Vec<_> = totals.into_iter().collect();
        totals.sort_unstable_by_key(|&(other, _)| other);
        totals
    }

    fn reset(&mut self) {
        self.slots.clear();
        self.slots.push_back(SlotCounts::default());
    }
}
