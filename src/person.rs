//! Persons and their per-tick state.
//!
//! A [`Person`] is the immutable description of one member of the population (age, risk, home,
//! routine) together with its initial [`PersonState`]. The engine owns the mutable states; the
//! behavior that reads them (where to go next, how to react to a regulation) lives here.
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::infection::{summary_of, InfectionState, InfectionSummary};
use crate::location::{LocationId, LocationType};
use crate::regulation::PandemicRegulation;
use crate::registry::Registry;
use crate::testing::TestResult;
use crate::time::SimTime;

/// Multiplier applied to a person's spread probability when wearing a facial covering.
pub const FACIAL_COVERING_MULTIPLIER: f64 = 0.5;
/// Multiplier applied to a person's spread probability when practicing good hygiene.
pub const GOOD_HYGIENE_MULTIPLIER: f64 = 0.8;

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub usize);

impl Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}", self.0)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Risk {
    #[default]
    Low,
    High,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strain {
    Primary,
    Variant,
}

impl Strain {
    pub const ALL: [Strain; 2] = [Strain::Primary, Strain::Variant];
}

/// Be at `location` during hours `[start_hour, end_hour)` of every day.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutineEntry {
    pub location: LocationId,
    pub start_hour: u32,
    pub end_hour: u32,
}

impl RoutineEntry {
    #[must_use]
    pub fn is_active(&self, sim_time: SimTime) -> bool {
        self.start_hour <= sim_time.hour && sim_time.hour < self.end_hour
    }
}

/// The part of a person's behavior a regulation may change.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonPolicy {
    pub stay_home_if_sick: bool,
    pub avoid_location_types: Vec<LocationType>,
}

/// Per-strain infection bookkeeping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrainState {
    /// `None` until the infection model has seen this person.
    pub infection: Option<InfectionState>,
    /// Scales the spread probability of this person when infectious.
    pub spread_multiplier: f64,
    /// Probability of not having been infected since the last infection update.
    pub not_infection_probability: f64,
    /// `(location, not_infection_probability)` after every infectious contact, in order.
    pub not_infection_probability_history: Vec<(LocationId, f64)>,
    pub test_result: TestResult,
}

impl Default for StrainState {
    fn default() -> Self {
        StrainState {
            infection: None,
            spread_multiplier: 1.0,
            not_infection_probability: 1.0,
            not_infection_probability_history: Vec::new(),
            test_result: TestResult::Untested,
        }
    }
}

impl StrainState {
    #[must_use]
    pub fn summary(&self) -> InfectionSummary {
        summary_of(self.infection.as_ref())
    }

    #[must_use]
    pub fn is_infectious(&self) -> bool {
        self.summary().is_infectious()
    }

    /// Records one contact with an infectious person spreading with `spread_probability`.
    pub fn expose(&mut self, location: LocationId, spread_probability: f64) {
        self.not_infection_probability *= 1.0 - spread_probability;
        self.not_infection_probability_history
            .push((location, self.not_infection_probability));
    }

    /// Location whose accumulated exposure first crosses `marker`.
    #[must_use]
    pub fn exposure_location(&self, marker: f64) -> Option<LocationId> {
        self.not_infection_probability_history
            .iter()
            .find(|(_, not_infection_probability)| marker < 1.0 - not_infection_probability)
            .map(|&(location, _)| location)
    }

    pub fn reset_exposure(&mut self) {
        self.not_infection_probability = 1.0;
        self.not_infection_probability_history.clear();
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonState {
    pub current_location: Option<LocationId>,
    pub risk: Risk,
    pub primary: StrainState,
    pub variant: StrainState,
    /// Result of the last test, both strains combined.
    pub test_result: TestResult,
    pub policy: PersonPolicy,
}

impl PersonState {
    #[must_use]
    pub fn strain(&self, strain: Strain) -> &StrainState {
        match strain {
            Strain::Primary => &self.primary,
            Strain::Variant => &self.variant,
        }
    }

    pub fn strain_mut(&mut self, strain: Strain) -> &mut StrainState {
        match strain {
            Strain::Primary => &mut self.primary,
            Strain::Variant => &mut self.variant,
        }
    }

    /// The worse of both strains.
    #[must_use]
    pub fn infection_summary(&self) -> InfectionSummary {
        self.primary.summary().worst(self.variant.summary())
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.infection_summary() == InfectionSummary::Dead
    }

    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.infection_summary() == InfectionSummary::Critical
    }

    #[must_use]
    pub fn is_symptomatic(&self) -> bool {
        [&self.primary, &self.variant]
            .iter()
            .any(|s| s.infection.as_ref().is_some_and(InfectionState::is_symptomatic))
    }

    #[must_use]
    pub fn tested_positive(&self) -> bool {
        matches!(self.test_result, TestResult::Positive | TestResult::Critical)
    }
}

#[derive(Clone, Debug)]
pub struct Person {
    id: PersonId,
    age: u32,
    home: LocationId,
    hospital: Option<LocationId>,
    routine: Vec<RoutineEntry>,
    init_state: PersonState,
}

impl Person {
    #[must_use]
    pub fn new(id: PersonId, age: u32, risk: Risk, home: LocationId) -> Person {
        Person {
            id,
            age,
            home,
            hospital: None,
            routine: Vec::new(),
            init_state: PersonState {
                risk,
                ..PersonState::default()
            },
        }
    }

    #[must_use]
    pub fn with_hospital(mut self, hospital: LocationId) -> Person {
        self.hospital = Some(hospital);
        self
    }

    #[must_use]
    pub fn with_routine(mut self, routine: impl IntoIterator<Item = RoutineEntry>) -> Person {
        self.routine.extend(routine);
        self
    }

    /// Starts the person in `infection` for `strain`.
    #[must_use]
    pub fn with_infection(mut self, strain: Strain, infection: InfectionState) -> Person {
        self.init_state.strain_mut(strain).infection = Some(infection);
        self
    }

    #[must_use]
    pub fn with_spread_multiplier(mut self, multiplier: f64) -> Person {
        for strain in Strain::ALL {
            self.init_state.strain_mut(strain).spread_multiplier = multiplier;
        }
        self
    }

    #[must_use]
    pub fn id(&self) -> PersonId {
        self.id
    }

    #[must_use]
    pub fn age(&self) -> u32 {
        self.age
    }

    #[must_use]
    pub fn risk(&self) -> Risk {
        self.init_state.risk
    }

    #[must_use]
    pub fn home(&self) -> LocationId {
        self.home
    }

    #[must_use]
    pub fn hospital(&self) -> Option<LocationId> {
        self.hospital
    }

    #[must_use]
    pub fn routine(&self) -> &[RoutineEntry] {
        &self.routine
    }

    #[must_use]
    pub fn init_state(&self) -> &PersonState {
        &self.init_state
    }

    /// A fresh copy of the initial state.
    #[must_use]
    pub fn reset(&self) -> PersonState {
        self.init_state.clone()
    }

    /// Where this person wants to be at `sim_time`; `None` once dead.
    #[must_use]
    pub fn desired_location(
        &self,
        state: &PersonState,
        sim_time: SimTime,
        registry: &Registry,
    ) -> Option<LocationId> {
        if state.is_dead() {
            return None;
        }
        if state.is_critical() {
            return Some(self.hospital.unwrap_or(self.home));
        }
        if state.policy.stay_home_if_sick && (state.is_symptomatic() || state.tested_positive()) {
            return Some(self.home);
        }
        let avoided = |location: LocationId| {
            registry
                .location_type(location)
                .is_some_and(|t| state.policy.avoid_location_types.contains(&t))
        };
        let destination = self
            .routine
            .iter()
            .find(|entry| entry.is_active(sim_time) && !avoided(entry.location))
            .map_or(self.home, |entry| entry.location);
        Some(destination)
    }

    /// Updates `state` to follow `regulation`. Multipliers are recomputed from the initial
    /// state, so applying the same regulation twice has no further effect.
    pub fn receive_regulation(&self, state: &mut PersonState, regulation: &PandemicRegulation) {
        let mut factor = 1.0;
        if regulation.wear_facial_coverings {
            factor *= FACIAL_COVERING_MULTIPLIER;
        }
        if regulation.practice_good_hygiene {
            factor *= GOOD_HYGIENE_MULTIPLIER;
        }
        for strain in Strain::ALL {
            state.strain_mut(strain).spread_multiplier =
                self.init_state.strain(strain).spread_multiplier * factor;
        }
        state.policy = PersonPolicy {
            stay_home_if_sick: regulation.stay_home_if_sick,
            avoid_location_types: regulation
                .risk_to_avoid_location_types
                .get(&state.risk)
                .cloned()
                .unwrap_or_default(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infection::Compartment;
    use assert_approx_eq::assert_approx_eq;

    fn registry() -> Registry {
        let mut registry = Registry::default();
        registry
            .register_location(LocationId(0), LocationType::Home)
            .unwrap();
        registry
            .register_location(LocationId(1), LocationType::Office)
            .unwrap();
        registry
            .register_location(LocationId(2), LocationType::Hospital)
            .unwrap();
        registry
            .register_location(LocationId(3), LocationType::Bar)
            .unwrap();
        registry
    }

    fn worker() -> Person {
        Person::new(PersonId(7), 35, Risk::High, LocationId(0))
            .with_hospital(LocationId(2))
            .with_routine([
                RoutineEntry {
                    location: LocationId(1),
                    start_hour: 9,
                    end_hour: 17,
                },
                RoutineEntry {
                    location: LocationId(3),
                    start_hour: 17,
                    end_hour: 20,
                },
            ])
    }

    #[test]
    fn follows_routine() {
        let registry = registry();
        let person = worker();
        let state = person.reset();
        assert_eq!(
            person.desired_location(&state, SimTime::new(0, 8), &registry),
            Some(LocationId(0))
        );
        assert_eq!(
            person.desired_location(&state, SimTime::new(0, 9), &registry),
            Some(LocationId(1))
        );
        assert_eq!(
            person.desired_location(&state, SimTime::new(3, 18), &registry),
            Some(LocationId(3))
        );
    }

    #[test]
    fn sick_and_dead_persons() {
        let registry = registry();
        let person = worker();
        let mut state = person.reset();
        state.policy.stay_home_if_sick = true;
        state.primary.infection = Some(InfectionState::new(Compartment::Symptomatic, 0.1));
        assert_eq!(
            person.desired_location(&state, SimTime::new(0, 10), &registry),
            Some(LocationId(0))
        );

        state.variant.infection = Some(InfectionState::new(Compartment::Hospitalized, 0.1));
        assert_eq!(
            person.desired_location(&state, SimTime::new(0, 10), &registry),
            Some(LocationId(2))
        );

        state.variant.infection = Some(InfectionState::new(Compartment::Dead, 0.1));
        assert!(state.is_dead());
        assert_eq!(
            person.desired_location(&state, SimTime::new(0, 10), &registry),
            None
        );
    }

    #[test]
    fn regulation_sets_policy_and_multipliers() {
        let registry = registry();
        let person = worker().with_spread_multiplier(2.0);
        let mut state = person.reset();
        let regulation = PandemicRegulation::new(2)
            .with_stay_home_if_sick(true)
            .with_good_hygiene(true)
            .with_facial_coverings(true)
            .with_avoided_location_types(Risk::High, vec![LocationType::Bar]);

        person.receive_regulation(&mut state, &regulation);
        let once = state.clone();
        person.receive_regulation(&mut state, &regulation);
        assert_eq!(state, once);

        assert_approx_eq!(state.primary.spread_multiplier, 2.0 * 0.5 * 0.8);
        assert_approx_eq!(state.variant.spread_multiplier, 2.0 * 0.5 * 0.8);
        assert!(state.policy.stay_home_if_sick);
        // The bar is avoided, so the person goes home instead.
        assert_eq!(
            person.desired_location(&state, SimTime::new(0, 18), &registry),
            Some(LocationId(0))
        );

        person.receive_regulation(&mut state, &PandemicRegulation::new(0));
        assert_eq!(state.policy, PersonPolicy::default());
        assert_approx_eq!(state.primary.spread_multiplier, 2.0);
    }

    #[test]
    fn exposure_attribution_follows_history() {
        let mut strain = StrainState::default();
        strain.expose(LocationId(1), 0.1);
        strain.expose(LocationId(3), 0.5);
        assert_approx_eq!(strain.not_infection_probability, 0.45);
        assert_eq!(strain.exposure_location(0.05), Some(LocationId(1)));
        assert_eq!(strain.exposure_location(0.3), Some(LocationId(3)));
        assert_eq!(strain.exposure_location(0.6), None);
        strain.reset_exposure();
        assert_approx_eq!(strain.not_infection_probability, 1.0);
        assert!(strain.not_infection_probability_history.is_empty());
    }
}
