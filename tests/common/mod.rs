#![allow(dead_code)]

use std::sync::Arc;

use pandemic_sim::prelude::*;

/// A small town: households of four, a school, an office, a grocery store, a bar and a
/// hospital. Children go to school, adults to the office, and everybody shops in the evening.
/// The first `num_infected` persons start symptomatic with the primary strain.
pub fn town(num_persons: usize, num_infected: usize) -> (Arc<Registry>, Vec<Location>, Vec<Person>) {
    let num_homes = num_persons.div_ceil(4);
    let school = LocationId(num_homes);
    let office = LocationId(num_homes + 1);
    let grocery = LocationId(num_homes + 2);
    let bar = LocationId(num_homes + 3);
    let hospital = LocationId(num_homes + 4);

    let mut persons = Vec::with_capacity(num_persons);
    let mut pupils = Vec::new();
    let mut workers = Vec::new();
    for id in 0..num_persons {
        let age = 3 + u32::try_from(id * 13 % 85).unwrap();
        let risk = if age >= 65 { Risk::High } else { Risk::Low };
        let mut routine = Vec::new();
        if age < 18 {
            pupils.push(PersonId(id));
            routine.push(RoutineEntry {
                location: school,
                start_hour: 8,
                end_hour: 15,
            });
        } else {
            if age < 65 {
                workers.push(PersonId(id));
                routine.push(RoutineEntry {
                    location: office,
                    start_hour: 9,
                    end_hour: 17,
                });
            }
            if id % 3 == 0 {
                routine.push(RoutineEntry {
                    location: bar,
                    start_hour: 19,
                    end_hour: 22,
                });
            }
        }
        routine.push(RoutineEntry {
            location: grocery,
            start_hour: 17,
            end_hour: 18,
        });

        let mut person = Person::new(PersonId(id), age, risk, LocationId(id / 4))
            .with_hospital(hospital)
            .with_routine(routine);
        if id < num_infected {
            person = person.with_infection(
                Strain::Primary,
                InfectionState::new(Compartment::Symptomatic, 0.3),
            );
        }
        persons.push(person);
    }

    let mut locations: Vec<Location> = (0..num_homes)
        .map(|home| {
            Location::new(LocationId(home), LocationType::Home)
                .with_assignees((4 * home..num_persons.min(4 * home + 4)).map(PersonId))
        })
        .collect();
    locations.push(Location::new(school, LocationType::School).with_assignees(pupils));
    locations.push(Location::new(office, LocationType::Office).with_assignees(workers));
    locations.push(Location::new(grocery, LocationType::GroceryStore));
    locations.push(Location::new(bar, LocationType::Bar));
    locations.push(Location::new(hospital, LocationType::Hospital));

    let registry = Arc::new(Registry::from_population(&locations, &persons).unwrap());
    (registry, locations, persons)
}

pub fn town_sim(num_persons: usize, num_infected: usize, seed: u64) -> PandemicSim {
    let (registry, locations, persons) = town(num_persons, num_infected);
    PandemicSim::builder(registry, locations, persons)
        .seed(seed)
        .build()
        .unwrap()
}
