//! An agent-based pandemic simulation engine.
//!
//! A population of persons moves between typed locations (homes, schools, offices, stores,
//! hospitals, ...) following daily routines. Every hour each occupied location draws random
//! contacts among the persons inside it, and contacts with infectious persons lower the chance of
//! staying healthy. Two strains are tracked independently: a primary strain present from the
//! start and a variant that appears on a randomly drawn day. Periodically:
//! * an infection model advances every person through its compartments,
//! * a testing policy tests persons and updates population-wide test counters,
//! * externally imposed regulations close locations, reduce contact rates and change how
//!   persons behave.
//!
//! The central object is the [`PandemicSim`](sim::PandemicSim) engine. It owns all state, is
//! deterministic given its seed and exposes a read-only snapshot
//! ([`PandemicSimState`](sim::PandemicSimState)) for reward computation and reporting:
//!
//! ```
//! use std::sync::Arc;
//! use pandemic_sim::prelude::*;
//!
//! let locations = vec![
//!     Location::new(LocationId(0), LocationType::Home).with_assignees([PersonId(0), PersonId(1)]),
//!     Location::new(LocationId(1), LocationType::GroceryStore),
//! ];
//! let persons = vec![
//!     Person::new(PersonId(0), 34, Risk::Low, LocationId(0)),
//!     Person::new(PersonId(1), 71, Risk::High, LocationId(0)),
//! ];
//! let registry = Arc::new(Registry::from_population(&locations, &persons).unwrap());
//! let mut sim = PandemicSim::builder(registry, locations, persons).seed(42).build().unwrap();
//!
//! sim.impose_regulation(&default_regulations()[1]).unwrap();
//! sim.step_day(24);
//! assert_eq!(sim.state().sim_time.day, 1);
//! ```
pub mod config;
pub mod contacts;
pub mod error;
pub mod hashing;
pub mod infection;
pub mod location;
pub mod log;
pub mod person;
pub mod prelude;
pub mod random;
pub mod registry;
pub mod regulation;
pub mod report;
pub mod sim;
pub mod testing;
pub mod time;

// Re-exported for use in macros and so models can name the rng traits without a direct
// dependency.
pub use rand;
