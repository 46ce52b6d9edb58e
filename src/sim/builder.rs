use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::PandemicSimOpts;
use crate::contacts::{ContactTracer, MaxSlotContactTracer};
use crate::error::PandemicError;
use crate::hashing::HashSet;
use crate::infection::{InfectionModel, SeirModel, SeirParams};
use crate::location::{Location, LocationId, LocationType};
use crate::log::info;
use crate::person::{Person, Strain};
use crate::random::RngData;
use crate::registry::Registry;
use crate::sim::{draw_variant_start_day, PandemicSim, PandemicSimState};
use crate::testing::PandemicTesting;
use crate::time::SimTimeInterval;

/// Collects everything a [`PandemicSim`] is made of. Anything not given explicitly comes from
/// [`PandemicSimOpts::default`].
pub struct PandemicSimBuilder {
    registry: Arc<Registry>,
    locations: Vec<Location>,
    persons: Vec<Person>,
    opts: PandemicSimOpts,
    infection_model: Option<Box<dyn InfectionModel>>,
    variant_infection_model: Option<Box<dyn InfectionModel>>,
    pandemic_testing: Option<Box<dyn PandemicTesting>>,
    contact_tracer: Option<Box<dyn ContactTracer>>,
}

impl PandemicSimBuilder {
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        locations: Vec<Location>,
        persons: Vec<Person>,
    ) -> PandemicSimBuilder {
        PandemicSimBuilder {
            registry,
            locations,
            persons,
            opts: PandemicSimOpts::default(),
            infection_model: None,
            variant_infection_model: None,
            pandemic_testing: None,
            contact_tracer: None,
        }
    }

    /// Takes seeds, rates, cadences and limits from `opts`. Models, testing policy and tracer
    /// set explicitly on the builder still take precedence.
    #[must_use]
    pub fn opts(mut self, opts: PandemicSimOpts) -> Self {
        self.opts = opts;
        self
    }

    #[must_use]
    pub fn seed(mut self, seed: u64) -> Self {
        self.opts.seed = seed;
        self
    }

    #[must_use]
    pub fn infection_model(mut self, model: Box<dyn InfectionModel>) -> Self {
        self.infection_model = Some(model);
        self
    }

    #[must_use]
    pub fn variant_infection_model(mut self, model: Box<dyn InfectionModel>) -> Self {
        self.variant_infection_model = Some(model);
        self
    }

    #[must_use]
    pub fn pandemic_testing(mut self, testing: Box<dyn PandemicTesting>) -> Self {
        self.pandemic_testing = Some(testing);
        self
    }

    #[must_use]
    pub fn contact_tracer(mut self, tracer: Box<dyn ContactTracer>) -> Self {
        self.contact_tracer = Some(tracer);
        self
    }

    #[must_use]
    pub fn infection_update_interval(mut self, interval: SimTimeInterval) -> Self {
        self.opts.infection_update_interval = interval;
        self
    }

    #[must_use]
    pub fn testing_interval(mut self, interval: SimTimeInterval) -> Self {
        self.opts.testing_interval = interval;
        self
    }

    #[must_use]
    pub fn contact_tracer_interval(mut self, interval: SimTimeInterval) -> Self {
        self.opts.contact_tracer_interval = interval;
        self
    }

    #[must_use]
    pub fn infection_threshold(mut self, threshold: usize) -> Self {
        self.opts.infection_threshold = threshold;
        self
    }

    #[must_use]
    pub fn hospital_capacity(mut self, capacity: usize) -> Self {
        self.opts.hospital_capacity = capacity;
        self
    }

    /// The variant start day is drawn from `[lo, hi)`; `lo == hi` fixes it.
    #[must_use]
    pub fn variant_start_days(mut self, lo: u32, hi: u32) -> Self {
        self.opts.variant_start_day_lo = lo;
        self.opts.variant_start_day_hi = hi;
        self
    }

    #[must_use]
    pub fn required_location_types(mut self, location_types: Vec<LocationType>) -> Self {
        self.opts.required_location_types = location_types;
        self
    }

    fn check_population(&self) -> Result<BTreeMap<LocationType, Vec<LocationId>>, PandemicError> {
        let mut type_to_locations: BTreeMap<LocationType, Vec<LocationId>> = BTreeMap::new();
        let mut location_ids = HashSet::default();
        for location in &self.locations {
            if !location_ids.insert(location.id()) {
                return Err(PandemicError::DuplicateLocation(location.id()));
            }
            self.registry.check_location(location)?;
            type_to_locations
                .entry(location.location_type())
                .or_default()
                .push(location.id());
        }

        let mut person_ids = HashSet::default();
        for person in &self.persons {
            if !person_ids.insert(person.id()) {
                return Err(PandemicError::DuplicatePerson(person.id()));
            }
            if !self.registry.contains_person(person.id()) {
                return Err(PandemicError::UnknownPerson(person.id()));
            }
            let referenced = std::iter::once(person.home())
                .chain(person.hospital())
                .chain(person.routine().iter().map(|entry| entry.location));
            for location_id in referenced {
                if !location_ids.contains(&location_id) {
                    return Err(PandemicError::UnknownLocation(location_id));
                }
            }
            check_initial_spread(person)?;
        }

        for &location_type in &self.opts.required_location_types {
            if !type_to_locations.contains_key(&location_type) {
                return Err(PandemicError::MissingLocationType(location_type));
            }
        }
        Ok(type_to_locations)
    }

    /// Validates everything and builds the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid, an id is duplicated or missing from the
    /// registry, a person references a location the engine does not have, a person starts with
    /// a spread probability outside `[0, 1]` or a negative spread multiplier, or a required
    /// location type is absent.
    pub fn build(self) -> Result<PandemicSim, PandemicError> {
        self.opts.validate()?;
        let type_to_locations = self.check_population()?;

        let opts = self.opts;
        // Default models advance by the time that passes between two infection updates.
        let seir_params = SeirParams {
            delta_t: opts.infection_update_interval.length_in_days(),
            ..SeirParams::default()
        };
        let infection_model: Box<dyn InfectionModel> = match self.infection_model {
            Some(model) => model,
            None => Box::new(SeirModel::new(
                seir_params.clone(),
                opts.primary_spread(),
                opts.pandemic_start_limit,
                opts.pandemic_seed_probability,
            )?),
        };
        let variant_infection_model: Box<dyn InfectionModel> = match self.variant_infection_model
        {
            Some(model) => model,
            None => Box::new(SeirModel::new(
                seir_params,
                opts.variant_spread(),
                opts.variant_pandemic_start_limit,
                opts.pandemic_seed_probability,
            )?),
        };
        let pandemic_testing: Box<dyn PandemicTesting> = match self.pandemic_testing {
            Some(testing) => testing,
            None => Box::new(opts.testing()),
        };
        let contact_tracer: Option<Box<dyn ContactTracer>> = match self.contact_tracer {
            Some(tracer) => Some(tracer),
            None if opts.use_contact_tracer => Some(Box::new(MaxSlotContactTracer::new(
                opts.contact_tracer_history_size,
            ))),
            None => None,
        };

        let rngs = RngData::new(opts.seed);
        let variant_start_days = (opts.variant_start_day_lo, opts.variant_start_day_hi);
        let variant_start_day = draw_variant_start_day(&rngs, variant_start_days);
        let state = PandemicSimState::new(&self.persons, &self.locations);
        info!(
            "created simulation with {} persons and {} locations (seed {}, variant starts on day {})",
            self.persons.len(),
            self.locations.len(),
            opts.seed,
            variant_start_day
        );
        Ok(PandemicSim {
            registry: self.registry,
            persons: self.persons,
            locations: self.locations,
            type_to_locations,
            infection_model,
            variant_infection_model,
            pandemic_testing,
            contact_tracer,
            infection_update_interval: opts.infection_update_interval,
            testing_interval: opts.testing_interval,
            contact_tracer_interval: opts.contact_tracer_interval,
            infection_threshold: opts.infection_threshold,
            hospital_capacity: opts.hospital_capacity,
            variant_start_days,
            variant_start_day,
            rngs,
            state,
        })
    }
}

fn check_initial_spread(person: &Person) -> Result<(), PandemicError> {
    for strain in Strain::ALL {
        let state = person.init_state().strain(strain);
        if let Some(infection) = &state.infection {
            let p = infection.spread_probability;
            if !(0.0..=1.0).contains(&p) {
                return Err(PandemicError::InvalidConfig(format!(
                    "{} starts with {strain:?} spread probability {p} outside [0, 1]",
                    person.id()
                )));
            }
        }
        let multiplier = state.spread_multiplier;
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(PandemicError::InvalidConfig(format!(
                "{} starts with invalid {strain:?} spread multiplier {multiplier}",
                person.id()
            )));
        }
    }
    Ok(())
}
