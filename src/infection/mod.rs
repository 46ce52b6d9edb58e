//! Infection states and the models that advance them.
//!
//! An [`InfectionModel`] is the only thing allowed to produce a new [`InfectionState`]. The
//! engine keeps two independent instances, one per [`crate::person::Strain`], and checks every
//! transition it receives against [`InfectionSummary::may_follow`].
mod seir;

use rand::RngCore;
use serde::{Deserialize, Serialize};

pub use seir::{SeirModel, SeirParams, SpreadProbabilityParams};

use crate::person::Risk;

/// Coarse infection category used by counters, testing and the person state machine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum InfectionSummary {
    None,
    Exposed,
    Infected,
    Critical,
    Recovered,
    Dead,
}

impl InfectionSummary {
    pub const ALL: [InfectionSummary; 6] = [
        InfectionSummary::None,
        InfectionSummary::Exposed,
        InfectionSummary::Infected,
        InfectionSummary::Critical,
        InfectionSummary::Recovered,
        InfectionSummary::Dead,
    ];

    /// Persons in these categories spread the infection to their contacts.
    #[must_use]
    pub fn is_infectious(self) -> bool {
        matches!(self, InfectionSummary::Infected | InfectionSummary::Critical)
    }

    /// Whether a person labelled `previous` on the last update may carry this label now.
    #[must_use]
    pub fn may_follow(self, previous: InfectionSummary) -> bool {
        use InfectionSummary::{Critical, Dead, Exposed, Infected, None, Recovered};
        match self {
            None => previous == None,
            Exposed => matches!(previous, None | Exposed),
            Infected => matches!(previous, Exposed | Infected),
            Critical => matches!(previous, Infected | Critical),
            Recovered => matches!(previous, Infected | Critical | Recovered),
            Dead => matches!(previous, Critical | Dead),
        }
    }

    fn severity(self) -> u8 {
        match self {
            InfectionSummary::None => 0,
            InfectionSummary::Recovered => 1,
            InfectionSummary::Exposed => 2,
            InfectionSummary::Infected => 3,
            InfectionSummary::Critical => 4,
            InfectionSummary::Dead => 5,
        }
    }

    /// The more severe of two labels; used for the combined view of both strains.
    #[must_use]
    pub fn worst(self, other: InfectionSummary) -> InfectionSummary {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

/// Compartments of the SEIR state machine.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    Susceptible,
    Exposed,
    Asymptomatic,
    PreSymptomatic,
    Symptomatic,
    Hospitalized,
    Recovered,
    Dead,
}

impl Compartment {
    #[must_use]
    pub fn summary(self) -> InfectionSummary {
        match self {
            Compartment::Susceptible => InfectionSummary::None,
            Compartment::Exposed => InfectionSummary::Exposed,
            Compartment::Asymptomatic | Compartment::PreSymptomatic | Compartment::Symptomatic => {
                InfectionSummary::Infected
            }
            Compartment::Hospitalized => InfectionSummary::Critical,
            Compartment::Recovered => InfectionSummary::Recovered,
            Compartment::Dead => InfectionSummary::Dead,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfectionState {
    pub compartment: Compartment,
    /// Probability that this person infects one contact during a tick.
    pub spread_probability: f64,
    /// Set only on the update that moved the person into an infected state; the uniform draw
    /// that caused the exposure, used to find the location responsible for it.
    pub exposure_marker: Option<f64>,
}

impl InfectionState {
    #[must_use]
    pub fn new(compartment: Compartment, spread_probability: f64) -> InfectionState {
        InfectionState {
            compartment,
            spread_probability,
            exposure_marker: None,
        }
    }

    #[must_use]
    pub fn susceptible() -> InfectionState {
        InfectionState::new(Compartment::Susceptible, 0.0)
    }

    #[must_use]
    pub fn summary(&self) -> InfectionSummary {
        self.compartment.summary()
    }

    #[must_use]
    pub fn is_infectious(&self) -> bool {
        self.summary().is_infectious()
    }

    #[must_use]
    pub fn is_symptomatic(&self) -> bool {
        matches!(
            self.compartment,
            Compartment::Symptomatic | Compartment::Hospitalized
        )
    }

    #[must_use]
    pub fn is_critical(&self) -> bool {
        self.compartment == Compartment::Hospitalized
    }

    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.compartment == Compartment::Dead
    }
}

/// Summary of an optional infection state; never exposed is `None`.
#[must_use]
pub fn summary_of(state: Option<&InfectionState>) -> InfectionSummary {
    state.map_or(InfectionSummary::None, InfectionState::summary)
}

/// Advances one person's infection state for one infection update.
///
/// `infection_probability` is the probability that the person was infected by their contacts
/// since the previous update. Implementations must only produce transitions allowed by
/// [`InfectionSummary::may_follow`].
pub trait InfectionModel: Send {
    fn step(
        &mut self,
        state: Option<&InfectionState>,
        age: u32,
        risk: Risk,
        infection_probability: f64,
        rng: &mut dyn RngCore,
    ) -> InfectionState;

    /// Forgets any run-level bookkeeping, e.g. how many persons were seeded.
    fn reset(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_predecessors() {
        use InfectionSummary::*;
        assert!(Exposed.may_follow(None));
        assert!(!Infected.may_follow(None));
        assert!(Dead.may_follow(Critical));
        assert!(!Dead.may_follow(Infected));
        assert!(!None.may_follow(Recovered));
        assert!(Recovered.may_follow(Infected));
        assert!(!Exposed.may_follow(Recovered));
        for summary in InfectionSummary::ALL {
            assert!(summary.may_follow(summary));
        }
        // A dead person stays dead.
        for summary in InfectionSummary::ALL {
            assert_eq!(summary.may_follow(Dead), summary == Dead);
        }
    }

    #[test]
    fn worst_of_two() {
        use InfectionSummary::*;
        assert_eq!(Recovered.worst(Exposed), Exposed);
        assert_eq!(Dead.worst(Infected), Dead);
        assert_eq!(None.worst(Recovered), Recovered);
        assert_eq!(Critical.worst(Critical), Critical);
    }

    #[test]
    fn compartments_map_to_summaries() {
        assert_eq!(summary_of(Option::None), InfectionSummary::None);
        let state = InfectionState::new(Compartment::PreSymptomatic, 0.1);
        assert_eq!(state.summary(), InfectionSummary::Infected);
        assert!(state.is_infectious());
        assert!(!state.is_symptomatic());
        let state = InfectionState::new(Compartment::Hospitalized, 0.1);
        assert!(state.is_critical() && state.is_symptomatic());
        assert!(!InfectionState::susceptible().is_infectious());
    }
}
