//! Read-only id lookup shared by engines.
//!
//! The registry is built once, before any engine, from the locations and persons that exist.
//! Engines receive it as an `Arc<Registry>` and check at construction that everything they are
//! given is registered with the same type.
use crate::error::PandemicError;
use crate::hashing::{IndexMap, IndexSet};
use crate::location::{Location, LocationId, LocationType};
use crate::person::{Person, PersonId};

#[derive(Clone, Debug, Default)]
pub struct Registry {
    location_types: IndexMap<LocationId, LocationType>,
    person_ids: IndexSet<PersonId>,
}

impl Registry {
    /// Registers every location and person.
    ///
    /// # Errors
    ///
    /// Returns an error if an id is given twice.
    pub fn from_population(
        locations: &[Location],
        persons: &[Person],
    ) -> Result<Registry, PandemicError> {
        let mut registry = Registry::default();
        for location in locations {
            registry.register_location(location.id(), location.location_type())?;
        }
        for person in persons {
            registry.register_person(person.id())?;
        }
        Ok(registry)
    }

    pub fn register_location(
        &mut self,
        id: LocationId,
        location_type: LocationType,
    ) -> Result<(), PandemicError> {
        if self.location_types.contains_key(&id) {
            return Err(PandemicError::DuplicateLocation(id));
        }
        self.location_types.insert(id, location_type);
        Ok(())
    }

    pub fn register_person(&mut self, id: PersonId) -> Result<(), PandemicError> {
        if !self.person_ids.insert(id) {
            return Err(PandemicError::DuplicatePerson(id));
        }
        Ok(())
    }

    #[must_use]
    pub fn location_type(&self, id: LocationId) -> Option<LocationType> {
        self.location_types.get(&id).copied()
    }

    #[must_use]
    pub fn contains_location(&self, id: LocationId) -> bool {
        self.location_types.contains_key(&id)
    }

    #[must_use]
    pub fn contains_person(&self, id: PersonId) -> bool {
        self.person_ids.contains(&id)
    }

    /// Whether at least one location of `location_type` is registered.
    #[must_use]
    pub fn has_location_type(&self, location_type: LocationType) -> bool {
        self.location_types.values().any(|&t| t == location_type)
    }

    #[must_use]
    pub fn num_locations(&self) -> usize {
        self.location_types.len()
    }

    #[must_use]
    pub fn num_persons(&self) -> usize {
        self.person_ids.len()
    }

    /// Checks that `location` is registered with its own type.
    pub fn check_location(&self, location: &Location) -> Result<(), PandemicError> {
        match self.location_type(location.id()) {
            None => Err(PandemicError::UnknownLocation(location.id())),
            Some(registered) if registered != location.location_type() => {
                Err(PandemicError::LocationTypeMismatch {
                    location: location.id(),
                    registered,
                    found: location.location_type(),
                })
            }
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::person::Risk;

    #[test]
    fn duplicates_are_rejected() {
        let mut registry = Registry::default();
        registry
            .register_location(LocationId(0), LocationType::Home)
            .unwrap();
        assert!(matches!(
            registry.register_location(LocationId(0), LocationType::Bar),
            Err(PandemicError::DuplicateLocation(LocationId(0)))
        ));
        registry.register_person(PersonId(3)).unwrap();
        assert!(matches!(
            registry.register_person(PersonId(3)),
            Err(PandemicError::DuplicatePerson(PersonId(3)))
        ));
    }

    #[test]
    fn lookups() {
        let locations = vec![
            Location::new(LocationId(0), LocationType::Home),
            Location::new(LocationId(1), LocationType::Bar),
        ];
        let persons = vec![Person::new(PersonId(0), 30, Risk::Low, LocationId(0))];
        let registry = Registry::from_population(&locations, &persons).unwrap();
        assert_eq!(registry.location_type(LocationId(1)), Some(LocationType::Bar));
        assert_eq!(registry.location_type(LocationId(2)), None);
        assert!(registry.contains_person(PersonId(0)));
        assert!(!registry.contains_person(PersonId(1)));
        assert!(registry.has_location_type(LocationType::Home));
        assert!(!registry.has_location_type(LocationType::Hospital));
        assert_eq!(registry.num_locations(), 2);
        assert_eq!(registry.num_persons(), 1);

        registry.check_location(&locations[1]).unwrap();
        let impostor = Location::new(LocationId(1), LocationType::School);
        assert!(matches!(
            registry.check_location(&impostor),
            Err(PandemicError::LocationTypeMismatch { .. })
        ));
        let stranger = Location::new(LocationId(9), LocationType::School);
        assert!(matches!(
            registry.check_location(&stranger),
            Err(PandemicError::UnknownLocation(LocationId(9)))
        ));
    }
}
