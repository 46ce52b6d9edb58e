use std::collections::BTreeMap;

use serde::Serialize;

use crate::hashing::IndexMap;
use crate::infection::InfectionSummary;
use crate::location::{Location, LocationId, LocationState, LocationType};
use crate::person::{Person, PersonId, PersonState};
use crate::testing::GlobalTestingState;
use crate::time::SimTime;

pub type InfectionSummaryCounts = BTreeMap<InfectionSummary, usize>;

/// Zero for every summary category.
#[must_use]
pub fn empty_infection_summary() -> InfectionSummaryCounts {
    InfectionSummary::ALL.into_iter().map(|s| (s, 0)).collect()
}

/// Everything an observer can read about a running simulation.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PandemicSimState {
    pub person_states: IndexMap<PersonId, PersonState>,
    pub location_states: IndexMap<LocationId, LocationState>,
    /// Exposures attributed to each location type so far.
    pub location_type_infection_summary: BTreeMap<LocationType, usize>,
    /// Both strains combined. Rebuilt on every infection update, all zero before the first.
    pub global_infection_summary: InfectionSummaryCounts,
    pub primary_infection_summary: InfectionSummaryCounts,
    pub variant_infection_summary: InfectionSummaryCounts,
    pub global_testing_state: GlobalTestingState,
    pub primary_testing_state: GlobalTestingState,
    pub variant_testing_state: GlobalTestingState,
    pub sim_time: SimTime,
    /// Stage of the most recently imposed regulation.
    pub regulation_stage: u32,
    /// Sum of the stages of every imposed regulation.
    pub regulation_stage_sum: u64,
    pub infection_above_threshold: bool,
}

impl PandemicSimState {
    /// Initial state with every person at home.
    #[must_use]
    pub fn new(persons: &[Person], locations: &[Location]) -> PandemicSimState {
        let mut location_states: IndexMap<LocationId, LocationState> = locations
            .iter()
            .map(|location| (location.id(), location.reset()))
            .collect();
        let person_states = persons
            .iter()
            .map(|person| {
                let mut state = person.reset();
                if let Some(home) = location_states.get_mut(&person.home()) {
                    home.add_person(person.id());
                    state.current_location = Some(person.home());
                }
                (person.id(), state)
            })
            .collect();
        let location_type_infection_summary = locations
            .iter()
            .map(|location| (location.location_type(), 0))
            .collect();
        let population_size = persons.len();
        PandemicSimState {
            person_states,
            location_states,
            location_type_infection_summary,
            global_infection_summary: empty_infection_summary(),
            primary_infection_summary: empty_infection_summary(),
            variant_infection_summary: empty_infection_summary(),
            global_testing_state: GlobalTestingState::new(population_size),
            primary_testing_state: GlobalTestingState::new(population_size),
            variant_testing_state: GlobalTestingState::new(population_size),
            sim_time: SimTime::default(),
            regulation_stage: 0,
            regulation_stage_sum: 0,
            infection_above_threshold: false,
        }
    }

    #[must_use]
    pub fn population_size(&self) -> usize {
        self.person_states.len()
    }

    /// Mean regulation stage per elapsed day; zero on day 0.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_stage(&self) -> f64 {
        if self.sim_time.day == 0 {
            0.0
        } else {
            self.regulation_stage_sum as f64 / f64::from(self.sim_time.day)
        }
    }

    /// Recounts every testing view from the person results.
    ///
    /// # Panics
    ///
    /// Panics if any view disagrees with its counters.
    pub fn check_testing_state(&self) {
        let population_size = self.population_size();
        let states = || self.person_states.values();
        self.global_testing_state.check(
            "combined",
            states().map(|s| &s.test_result),
            population_size,
        );
        self.primary_testing_state.check(
            "primary",
            states().map(|s| &s.primary.test_result),
            population_size,
        );
        self.variant_testing_state.check(
            "variant",
            states().map(|s| &s.variant.test_result),
            population_size,
        );
    }
}
