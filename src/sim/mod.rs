//! The simulation engine.
//!
//! A [`PandemicSim`] owns the authoritative [`PandemicSimState`] and advances it one tick (one
//! simulated hour) at a time. Every tick runs the same phases in the same order:
//!
//! 1. locations resynchronize with the clock,
//! 2. persons move, in a fresh random order,
//! 3. every location draws its contacts, which lower the non-infection probability of the
//!    non-infectious party of each infectious contact,
//! 4. on the infection update cadence both infection models advance every person and the
//!    infection summaries are recounted,
//! 5. on the testing cadence persons are tested and the testing counters updated,
//! 6. the threshold flag, contact tracer slot and clock are advanced,
//! 7. the testing counters are recounted from the persons; any disagreement panics.
//!
//! Engines share nothing mutable, so independent engines can run on separate threads.
mod builder;
mod state;

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::SliceRandom;

pub use builder::PandemicSimBuilder;
pub use state::{empty_infection_summary, InfectionSummaryCounts, PandemicSimState};

use crate::config::PandemicSimOpts;
use crate::contacts::{compute_contacts, ContactSet, ContactTracer};
use crate::define_rng;
use crate::error::PandemicError;
use crate::hashing::IndexMap;
use crate::infection::{InfectionModel, InfectionSummary};
use crate::location::{Location, LocationId, LocationType, RuleValue};
use crate::log::{debug, info, trace};
use crate::person::{Person, PersonId, PersonState, Strain};
use crate::random::{RngData, RngId};
use crate::regulation::{PandemicRegulation, SocialDistancing};
use crate::registry::Registry;
use crate::testing::PandemicTesting;
use crate::time::{SimTime, SimTimeInterval};

define_rng!(PersonOrderRng);
define_rng!(ContactRng);
define_rng!(InfectionRng);
define_rng!(VariantInfectionRng);
define_rng!(TestingRng);
define_rng!(VariantStartRng);

fn draw_variant_start_day(rngs: &RngData, (lo, hi): (u32, u32)) -> u32 {
    if lo >= hi {
        lo
    } else {
        rngs.sample_range(VariantStartRng, lo..hi)
    }
}

pub struct PandemicSim {
    registry: Arc<Registry>,
    persons: Vec<Person>,
    locations: Vec<Location>,
    type_to_locations: BTreeMap<LocationType, Vec<LocationId>>,
    infection_model: Box<dyn InfectionModel>,
    variant_infection_model: Box<dyn InfectionModel>,
    pandemic_testing: Box<dyn PandemicTesting>,
    contact_tracer: Option<Box<dyn ContactTracer>>,
    infection_update_interval: SimTimeInterval,
    testing_interval: SimTimeInterval,
    contact_tracer_interval: SimTimeInterval,
    infection_threshold: usize,
    hospital_capacity: usize,
    variant_start_days: (u32, u32),
    variant_start_day: u32,
    rngs: RngData,
    state: PandemicSimState,
}

impl PandemicSim {
    #[must_use]
    pub fn builder(
        registry: Arc<Registry>,
        locations: Vec<Location>,
        persons: Vec<Person>,
    ) -> PandemicSimBuilder {
        PandemicSimBuilder::new(registry, locations, persons)
    }

    /// Builds an engine with the default infection models, random testing and, if enabled, a
    /// contact tracer, all parametrized by `opts`.
    ///
    /// # Errors
    ///
    /// See [`PandemicSimBuilder::build`].
    pub fn from_opts(
        registry: Arc<Registry>,
        locations: Vec<Location>,
        persons: Vec<Person>,
        opts: PandemicSimOpts,
    ) -> Result<PandemicSim, PandemicError> {
        PandemicSimBuilder::new(registry, locations, persons)
            .opts(opts)
            .build()
    }

    #[must_use]
    pub fn state(&self) -> &PandemicSimState {
        &self.state
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    #[must_use]
    pub fn persons(&self) -> &[Person] {
        &self.persons
    }

    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[must_use]
    pub fn locations_of_type(&self, location_type: LocationType) -> &[LocationId] {
        self.type_to_locations
            .get(&location_type)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn contact_tracer(&self) -> Option<&dyn ContactTracer> {
        self.contact_tracer.as_deref()
    }

    #[must_use]
    pub fn variant_start_day(&self) -> u32 {
        self.variant_start_day
    }

    #[must_use]
    pub fn infection_threshold(&self) -> usize {
        self.infection_threshold
    }

    #[must_use]
    pub fn hospital_capacity(&self) -> usize {
        self.hospital_capacity
    }

    fn variant_active(&self, sim_time: SimTime) -> bool {
        sim_time.day >= self.variant_start_day
    }

    /// Advances the simulation by one tick.
    ///
    /// # Panics
    ///
    /// Panics if an internal consistency check fails: a probability out of bounds, an infection
    /// transition the state machine forbids, or testing counters that disagree with a recount.
    pub fn step(&mut self) {
        let sim_time = self.state.sim_time;
        for location in self.state.location_states.values_mut() {
            location.sync(sim_time);
        }

        let mut order: Vec<usize> = (0..self.persons.len()).collect();
        self.rngs.sample(PersonOrderRng, |rng| order.shuffle(rng));
        for index in order {
            self.step_person(index, sim_time);
        }

        let strains: &[Strain] = if self.variant_active(sim_time) {
            &Strain::ALL
        } else {
            &[Strain::Primary]
        };
        let PandemicSimState {
            person_states,
            location_states,
            ..
        } = &mut self.state;
        for (&location_id, location) in location_states.iter() {
            let contacts = self
                .rngs
                .sample(ContactRng, |rng| compute_contacts(location, rng));
            if let Some(tracer) = self.contact_tracer.as_mut() {
                tracer.record(&contacts);
            }
            accumulate_exposure(person_states, location_id, &contacts, strains);
        }

        if self.infection_update_interval.trigger_at_interval(sim_time) {
            self.update_infections(sim_time);
        }
        if self.testing_interval.trigger_at_interval(sim_time) {
            self.update_testing();
        }

        self.state.infection_above_threshold = self
            .state
            .global_testing_state
            .count(InfectionSummary::Infected)
            >= self.infection_threshold;

        if let Some(tracer) = self.contact_tracer.as_mut() {
            if self.contact_tracer_interval.trigger_at_interval(sim_time) {
                tracer.advance_time_slot();
            }
        }

        self.state.sim_time.step();
        self.state.check_testing_state();
    }

    /// Runs `hours` ticks.
    pub fn step_day(&mut self, hours: u32) {
        for _ in 0..hours {
            self.step();
        }
    }

    fn step_person(&mut self, index: usize, sim_time: SimTime) {
        let person = &self.persons[index];
        let PandemicSimState {
            person_states,
            location_states,
            ..
        } = &mut self.state;
        let Some((_, state)) = person_states.get_index_mut(index) else {
            return;
        };
        let destination = match person.desired_location(state, sim_time, &self.registry) {
            None => None,
            Some(desired)
                if location_states
                    .get(&desired)
                    .is_some_and(|location| location.accepts(person.id())) =>
            {
                Some(desired)
            }
            Some(refused) => {
                trace!("{} refused at {refused}, going home", person.id());
                Some(person.home())
            }
        };
        if destination == state.current_location {
            return;
        }
        if let Some(current) = state.current_location {
            if let Some(location) = location_states.get_mut(&current) {
                location.remove_person(person.id());
            }
        }
        if let Some(destination) = destination {
            if let Some(location) = location_states.get_mut(&destination) {
                location.add_person(person.id());
            }
        }
        state.current_location = destination;
    }

    fn update_infections(&mut self, sim_time: SimTime) {
        let variant_active = self.variant_active(sim_time);
        let mut global_summary = empty_infection_summary();
        let mut primary_summary = empty_infection_summary();
        let mut variant_summary = empty_infection_summary();
        let PandemicSimState {
            person_states,
            location_type_infection_summary,
            ..
        } = &mut self.state;

        for (person, state) in self.persons.iter().zip(person_states.values_mut()) {
            progress_strain(
                &self.rngs,
                InfectionRng,
                self.infection_model.as_mut(),
                &self.registry,
                location_type_infection_summary,
                person,
                state,
                Strain::Primary,
            );
            if variant_active {
                progress_strain(
                    &self.rngs,
                    VariantInfectionRng,
                    self.variant_infection_model.as_mut(),
                    &self.registry,
                    location_type_infection_summary,
                    person,
                    state,
                    Strain::Variant,
                );
            }
            for strain in Strain::ALL {
                state.strain_mut(strain).reset_exposure();
            }

            *global_summary.entry(state.infection_summary()).or_insert(0) += 1;
            *primary_summary.entry(state.primary.summary()).or_insert(0) += 1;
            *variant_summary.entry(state.variant.summary()).or_insert(0) += 1;
        }

        debug!("infection update at {sim_time}: {global_summary:?}");
        self.state.global_infection_summary = global_summary;
        self.state.primary_infection_summary = primary_summary;
        self.state.variant_infection_summary = variant_summary;
    }

    fn update_testing(&mut self) {
        let PandemicSimState {
            person_states,
            global_testing_state,
            primary_testing_state,
            variant_testing_state,
            ..
        } = &mut self.state;
        let testing = self.pandemic_testing.as_ref();
        for state in person_states.values_mut() {
            let admitted = self
                .rngs
                .sample(TestingRng, |rng| testing.admit_person(state, rng));
            if !admitted {
                continue;
            }
            let outcome = self
                .rngs
                .sample(TestingRng, |rng| testing.test_person(state, rng));
            global_testing_state.record(outcome.combined, state.test_result);
            primary_testing_state.record(outcome.primary, state.primary.test_result);
            variant_testing_state.record(outcome.variant, state.variant.test_result);
            state.test_result = outcome.combined;
            state.primary.test_result = outcome.primary;
            state.variant.test_result = outcome.variant;
        }
    }

    /// Applies `regulation` to every location and person.
    ///
    /// Social distancing levels and rule fields set to `RuleValue::Default` are computed from
    /// each location's initial state. `RuleValue::Unchanged` fields and
    /// `SocialDistancing::Unchanged` keep what earlier regulations set. Imposing the same
    /// regulation twice changes nothing. A lock also sends current occupants home on the next
    /// tick.
    ///
    /// # Errors
    ///
    /// Returns `PandemicError::InvalidRegulation` without changing anything if the regulation
    /// does not validate.
    pub fn impose_regulation(&mut self, regulation: &PandemicRegulation) -> Result<(), PandemicError> {
        regulation.validate()?;
        info!(
            "imposing stage {} regulation on day {}",
            regulation.stage, self.state.sim_time.day
        );

        for (location, state) in self
            .locations
            .iter()
            .zip(self.state.location_states.values_mut())
        {
            let initial = location.init_state();
            let mut rule = regulation.rule_for(location.location_type());
            match regulation.social_distancing {
                SocialDistancing::Unchanged => {}
                SocialDistancing::Default => rule.contact_rate = RuleValue::Default,
                SocialDistancing::Level(level) => {
                    rule.contact_rate = RuleValue::Set(
                        state
                            .contact_rate
                            .with_social_distancing(&initial.contact_rate, level),
                    );
                }
            }
            state.update_rules(&rule, initial);
        }

        for (person, state) in self
            .persons
            .iter()
            .zip(self.state.person_states.values_mut())
        {
            person.receive_regulation(state, regulation);
        }

        self.state.regulation_stage = regulation.stage;
        self.state.regulation_stage_sum += u64::from(regulation.stage);
        Ok(())
    }

    /// Restores the initial state: every person back home with their initial infection, all
    /// counters cleared, models and tracer reset and a new variant start day drawn. Random
    /// streams continue where they were.
    pub fn reset(&mut self) {
        self.infection_model.reset();
        self.variant_infection_model.reset();
        if let Some(tracer) = self.contact_tracer.as_mut() {
            tracer.reset();
        }
        self.state = PandemicSimState::new(&self.persons, &self.locations);
        self.variant_start_day = draw_variant_start_day(&self.rngs, self.variant_start_days);
        info!(
            "reset simulation, variant starts on day {}",
            self.variant_start_day
        );
    }
}

/// Lowers the non-infection probability of the non-infectious party of every contact with
/// an infectious person, separately for each of `strains`.
fn accumulate_exposure(
    person_states: &mut IndexMap<PersonId, PersonState>,
    location_id: LocationId,
    contacts: &ContactSet,
    strains: &[Strain],
) {
    for &(a, b) in contacts {
        for &strain in strains {
            let (Some(first), Some(second)) = (person_states.get(&a), person_states.get(&b))
            else {
                continue;
            };
            let first_infectious = first.strain(strain).is_infectious();
            if first_infectious == second.strain(strain).is_infectious() {
                continue;
            }
            let (source, target) = if first_infectious {
                (first, b)
            } else {
                (second, a)
            };
            let source = source.strain(strain);
            let spread_probability = source
                .infection
                .map_or(0.0, |infection| infection.spread_probability)
                * source.spread_multiplier;
            if let Some(target) = person_states.get_mut(&target) {
                target
                    .strain_mut(strain)
                    .expose(location_id, spread_probability.clamp(0.0, 1.0));
            }
        }
    }
}

/// Advances one strain of one person and attributes a new exposure to the location that
/// caused it.
#[allow(clippy::too_many_arguments)]
fn progress_strain<R: RngId>(
    rngs: &RngData,
    rng_id: R,
    model: &mut dyn InfectionModel,
    registry: &Registry,
    location_type_infection_summary: &mut BTreeMap<LocationType, usize>,
    person: &Person,
    state: &mut PersonState,
    strain: Strain,
) {
    let risk = state.risk;
    let strain_state = state.strain_mut(strain);
    let not_infection_probability = strain_state.not_infection_probability;
    assert!(
        (0.0..=1.0).contains(&not_infection_probability),
        "{strain:?} non-infection probability of {} is {not_infection_probability}",
        person.id()
    );

    let previous = strain_state.summary();
    let next = rngs.sample(rng_id, |rng| {
        model.step(
            strain_state.infection.as_ref(),
            person.age(),
            risk,
            1.0 - not_infection_probability,
            rng,
        )
    });
    assert!(
        next.summary().may_follow(previous),
        "{strain:?} infection of {} went from {previous:?} to {:?}",
        person.id(),
        next.summary()
    );

    if let Some(marker) = next.exposure_marker {
        let location_type = strain_state
            .exposure_location(marker)
            .and_then(|location| registry.location_type(location));
        if let Some(location_type) = location_type {
            trace!("{} exposed to {strain:?} at a {location_type:?}", person.id());
            *location_type_infection_summary
                .entry(location_type)
                .or_insert(0) += 1;
        }
    }
    strain_state.infection = Some(next);
}
