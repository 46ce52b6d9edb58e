//! Locations are the places where contacts happen. The catalog of location types is closed
//! ([`LocationType`]); what distinguishes one type from another is data: its default
//! [`ContactRate`], its visitor hours and whether a regulation may lock it.
//!
//! A [`Location`] holds the immutable identity and initial state of a place. The mutable
//! [`LocationState`] lives in the engine's state snapshot and implements the location
//! capabilities: `sync` with the clock, `update_rules` from a regulation and admission of
//! persons.
mod contact_rate;
mod rule;

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

pub use contact_rate::ContactRate;
pub use rule::{LocationRule, RuleValue};

use crate::hashing::IndexSet;
use crate::person::PersonId;
use crate::time::{SimTime, HOURS_PER_DAY};

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LocationId(pub usize);

impl Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LocationType {
    Home,
    School,
    Office,
    GroceryStore,
    RetailStore,
    HairSalon,
    Restaurant,
    Bar,
    Hospital,
}

impl LocationType {
    pub const ALL: [LocationType; 9] = [
        LocationType::Home,
        LocationType::School,
        LocationType::Office,
        LocationType::GroceryStore,
        LocationType::RetailStore,
        LocationType::HairSalon,
        LocationType::Restaurant,
        LocationType::Bar,
        LocationType::Hospital,
    ];

    /// Whether a regulation may lock locations of this type.
    #[must_use]
    pub fn is_lockable(self) -> bool {
        !matches!(self, LocationType::Home | LocationType::Hospital)
    }

    #[must_use]
    pub fn default_contact_rate(self) -> ContactRate {
        match self {
            LocationType::Home => ContactRate::new(0, 1, 0, 1.0, 0.5, 0.0),
            LocationType::School => ContactRate::new(5, 1, 0, 0.1, 0.0, 0.1),
            LocationType::Office => ContactRate::new(2, 2, 0, 0.1, 0.01, 0.01),
            LocationType::GroceryStore => ContactRate::new(1, 1, 0, 0.01, 0.05, 0.05),
            LocationType::RetailStore => ContactRate::new(1, 1, 0, 0.01, 0.05, 0.05),
            LocationType::HairSalon => ContactRate::new(1, 1, 0, 0.5, 0.3, 0.1),
            LocationType::Restaurant => ContactRate::new(1, 1, 1, 0.3, 0.05, 0.05),
            LocationType::Bar => ContactRate::new(2, 1, 2, 0.1, 0.05, 0.1),
            LocationType::Hospital => ContactRate::new(1, 1, 0, 0.1, 0.05, 0.0),
        }
    }

    /// `[open, close)` hours during which visitors are admitted; `None` means always.
    #[must_use]
    pub fn default_visitor_hours(self) -> Option<(u32, u32)> {
        match self {
            LocationType::Home | LocationType::Hospital => None,
            LocationType::School => Some((7, 15)),
            LocationType::Office | LocationType::HairSalon => Some((9, 17)),
            LocationType::GroceryStore => Some((7, 21)),
            LocationType::RetailStore => Some((9, 21)),
            LocationType::Restaurant => Some((11, 22)),
            LocationType::Bar => Some((17, HOURS_PER_DAY)),
        }
    }
}

/// Mutable state of one location.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LocationState {
    pub location_type: LocationType,
    pub contact_rate: ContactRate,
    /// Persons that belong here (residents, employees, pupils).
    pub assignees: IndexSet<PersonId>,
    pub assignees_in_location: IndexSet<PersonId>,
    pub visitors_in_location: IndexSet<PersonId>,
    pub lock: bool,
    pub visitor_capacity: Option<usize>,
    pub visitor_hours: Option<(u32, u32)>,
    /// Whether visitors are admitted this tick. Refreshed by `sync`.
    pub is_open: bool,
}

impl LocationState {
    #[must_use]
    pub fn new(location_type: LocationType) -> LocationState {
        LocationState {
            location_type,
            contact_rate: location_type.default_contact_rate(),
            assignees: IndexSet::default(),
            assignees_in_location: IndexSet::default(),
            visitors_in_location: IndexSet::default(),
            lock: false,
            visitor_capacity: None,
            visitor_hours: location_type.default_visitor_hours(),
            is_open: true,
        }
    }

    /// Refreshes the opening state for the tick at `sim_time`.
    pub fn sync(&mut self, sim_time: SimTime) {
        let within_hours = self
            .visitor_hours
            .is_none_or(|(open, close)| open <= sim_time.hour && sim_time.hour < close);
        self.is_open = !self.lock && within_hours;
    }

    /// Applies `rule` field by field; `RuleValue::Default` restores the value from `initial`.
    pub fn update_rules(&mut self, rule: &LocationRule, initial: &LocationState) {
        rule.contact_rate
            .apply(&mut self.contact_rate, &initial.contact_rate);
        rule.lock.apply(&mut self.lock, &initial.lock);
        match &rule.visitor_capacity {
            RuleValue::Unchanged => {}
            RuleValue::Default => self.visitor_capacity = initial.visitor_capacity,
            RuleValue::Set(capacity) => self.visitor_capacity = Some(*capacity),
        }
        if self.lock {
            self.is_open = false;
        }
    }

    #[must_use]
    pub fn is_assignee(&self, person_id: PersonId) -> bool {
        self.assignees.contains(&person_id)
    }

    #[must_use]
    pub fn contains(&self, person_id: PersonId) -> bool {
        self.assignees_in_location.contains(&person_id)
            || self.visitors_in_location.contains(&person_id)
    }

    /// Whether `person_id` may enter, or stay, now. A lock turns away everybody, occupants
    /// included. Otherwise occupants may stay and assignees may enter; other visitors also need
    /// the location to be open and below its visitor capacity.
    #[must_use]
    pub fn accepts(&self, person_id: PersonId) -> bool {
        if self.lock {
            return false;
        }
        if self.contains(person_id) || self.is_assignee(person_id) {
            return true;
        }
        self.is_open
            && self
                .visitor_capacity
                .is_none_or(|capacity| self.visitors_in_location.len() < capacity)
    }

    pub fn add_person(&mut self, person_id: PersonId) {
        if self.is_assignee(person_id) {
            self.assignees_in_location.insert(person_id);
        } else {
            self.visitors_in_location.insert(person_id);
        }
    }

    pub fn remove_person(&mut self, person_id: PersonId) {
        self.assignees_in_location.shift_remove(&person_id);
        self.visitors_in_location.shift_remove(&person_id);
    }

    #[must_use]
    pub fn num_persons_in_location(&self) -> usize {
        self.assignees_in_location.len() + self.visitors_in_location.len()
    }
}

/// Identity and initial state of a location.
#[derive(Clone, Debug)]
pub struct Location {
    id: LocationId,
    init_state: LocationState,
}

impl Location {
    #[must_use]
    pub fn new(id: LocationId, location_type: LocationType) -> Location {
        Location {
            id,
            init_state: LocationState::new(location_type),
        }
    }

    #[must_use]
    pub fn with_contact_rate(mut self, contact_rate: ContactRate) -> Location {
        self.init_state.contact_rate = contact_rate;
        self
    }

    #[must_use]
    pub fn with_visitor_hours(mut self, visitor_hours: Option<(u32, u32)>) -> Location {
        self.init_state.visitor_hours = visitor_hours;
        self
    }

    #[must_use]
    pub fn with_visitor_capacity(mut self, capacity: usize) -> Location {
        self.init_state.visitor_capacity = Some(capacity);
        self
    }

    #[must_use]
    pub fn with_assignees(mut self, assignees: impl IntoIterator<Item = PersonId>) -> Location {
        self.init_state.assignees.extend(assignees);
        self
    }

    #[must_use]
    pub fn id(&self) -> LocationId {
        self.id
    }

    #[must_use]
    pub fn location_type(&self) -> LocationType {
        self.init_state.location_type
    }

    #[must_use]
    pub fn init_state(&self) -> &LocationState {
        &self.init_state
    }

    /// A fresh copy of the initial state, with nobody inside.
    #[must_use]
    pub fn reset(&self) -> LocationState {
        let mut state = self.init_state.clone();
        state.assignees_in_location.clear();
        state.visitors_in_location.clear();
        state
    }
}
