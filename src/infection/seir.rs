use rand::{Rng, RngCore};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::error::PandemicError;
use crate::infection::{Compartment, InfectionModel, InfectionState};
use crate::log::trace;
use crate::person::Risk;

/// Upper bounds (inclusive) of the age groups 0-4, 5-17, 18-49, 50-64; everyone older is 65+.
const AGE_GROUP_BOUNDS: [u32; 4] = [4, 17, 49, 64];

fn age_group(age: u32) -> usize {
    AGE_GROUP_BOUNDS
        .iter()
        .position(|&bound| age <= bound)
        .unwrap_or(AGE_GROUP_BOUNDS.len())
}

/// Gaussian from which a newly exposed person's spread probability is drawn.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpreadProbabilityParams {
    pub mean: f64,
    pub sigma: f64,
}

impl Default for SpreadProbabilityParams {
    fn default() -> Self {
        SpreadProbabilityParams {
            mean: 0.02,
            sigma: 0.01,
        }
    }
}

/// Transition rates are per day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeirParams {
    /// Exposed -> infectious (σ).
    pub exposed_rate: f64,
    /// Fraction of exposed persons that never develop symptoms (τ).
    pub asymptomatic_proportion: f64,
    /// Pre-symptomatic -> symptomatic (ρ).
    pub pre_symptomatic_rate: f64,
    pub asymptomatic_recovery_rate: f64,
    pub symptomatic_recovery_rate: f64,
    /// Symptomatic -> hospitalized, scaled by the hospitalization ratio (η).
    pub hospitalization_rate: f64,
    pub hospital_recovery_rate: f64,
    /// Hospitalized -> dead, scaled by the fatality ratio (μ).
    pub hospital_death_rate: f64,
    /// Symptomatic hospitalization ratio per age group, low risk.
    pub hospitalization_ratio_low_risk: [f64; 5],
    pub hospitalization_ratio_high_risk: [f64; 5],
    /// Hospital fatality ratio per age group.
    pub hospital_fatality_ratio: [f64; 5],
    /// Length of one infection update, in days.
    pub delta_t: f64,
}

impl Default for SeirParams {
    fn default() -> Self {
        let low_risk = [0.000_279, 0.000_215, 0.013_215, 0.028_563, 0.033_873];
        SeirParams {
            exposed_rate: 1.0 / 2.9,
            asymptomatic_proportion: 0.57,
            pre_symptomatic_rate: 1.0 / 2.3,
            asymptomatic_recovery_rate: 1.0 / 4.0,
            symptomatic_recovery_rate: 1.0 / 4.0,
            hospitalization_rate: 0.1695,
            hospital_recovery_rate: 1.0 / 10.7,
            hospital_death_rate: 1.0 / 8.1,
            hospitalization_ratio_low_risk: low_risk,
            hospitalization_ratio_high_risk: low_risk.map(|ratio| ratio * 10.0),
            hospital_fatality_ratio: [0.04, 0.123_65, 0.031_22, 0.107_45, 0.231_58],
            delta_t: 1.0,
        }
    }
}

impl SeirParams {
    fn hospitalization_ratio(&self, age: u32, risk: Risk) -> f64 {
        let ratios = match risk {
            Risk::Low => &self.hospitalization_ratio_low_risk,
            Risk::High => &self.hospitalization_ratio_high_risk,
        };
        ratios[age_group(age)].clamp(0.0, 1.0)
    }

    fn fatality_ratio(&self, age: u32) -> f64 {
        self.hospital_fatality_ratio[age_group(age)].clamp(0.0, 1.0)
    }
}

/// Stochastic compartmental model (S, E, asymptomatic, pre-symptomatic, symptomatic,
/// hospitalized, R, D).
///
/// Each update, the competing exits `r_1..r_k` of the current compartment fire together with
/// probability `1 - exp(-(r_1 + ... + r_k) * delta_t)` and one of them is picked in proportion to
/// its rate. Susceptible persons are exposed with the infection probability handed in by the
/// engine.
#[derive(Clone, Debug)]
pub struct SeirModel {
    params: SeirParams,
    spread_distribution: Normal<f64>,
    pandemic_start_limit: usize,
    seed_probability: f64,
    num_seeded: usize,
}

impl SeirModel {
    /// # Errors
    ///
    /// Returns `PandemicError::InvalidConfig` if the spread distribution cannot be built or
    /// `seed_probability` is not a probability.
    pub fn new(
        params: SeirParams,
        spread: SpreadProbabilityParams,
        pandemic_start_limit: usize,
        seed_probability: f64,
    ) -> Result<SeirModel, PandemicError> {
        let spread_distribution = Normal::new(spread.mean, spread.sigma).map_err(|e| {
            PandemicError::InvalidConfig(format!("spread probability distribution: {e}"))
        })?;
        if !(0.0..=1.0).contains(&seed_probability) {
            return Err(PandemicError::InvalidConfig(format!(
                "seed probability must be within [0, 1], got {seed_probability}"
            )));
        }
        if params.delta_t <= 0.0 {
            return Err(PandemicError::InvalidConfig(
                "infection update length must be positive".to_string(),
            ));
        }
        Ok(SeirModel {
            params,
            spread_distribution,
            pandemic_start_limit,
            seed_probability,
            num_seeded: 0,
        })
    }

    /// Default rates with the given spread distribution.
    ///
    /// # Errors
    ///
    /// See [`SeirModel::new`].
    pub fn with_spread(
        spread: SpreadProbabilityParams,
        pandemic_start_limit: usize,
    ) -> Result<SeirModel, PandemicError> {
        SeirModel::new(SeirParams::default(), spread, pandemic_start_limit, 0.05)
    }

    #[must_use]
    pub fn params(&self) -> &SeirParams {
        &self.params
    }

    #[must_use]
    pub fn num_seeded(&self) -> usize {
        self.num_seeded
    }

    fn draw_spread_probability(&self, rng: &mut dyn RngCore) -> f64 {
        self.spread_distribution.sample(rng).clamp(0.0, 1.0)
    }

    /// Picks one of the competing `exits` or stays in `current`.
    fn transition(
        &self,
        current: Compartment,
        exits: &[(f64, Compartment)],
        rng: &mut dyn RngCore,
    ) -> Compartment {
        let total: f64 = exits.iter().map(|(rate, _)| rate).sum();
        if total <= 0.0 {
            return current;
        }
        let exit_probability = 1.0 - (-total * self.params.delta_t).exp();
        if rng.random::<f64>() >= exit_probability {
            return current;
        }
        let mut pick = rng.random::<f64>() * total;
        for &(rate, next) in exits {
            if pick < rate {
                return next;
            }
            pick -= rate;
        }
        exits.last().map_or(current, |&(_, next)| next)
    }

    fn expose(&self, marker: Option<f64>, rng: &mut dyn RngCore) -> InfectionState {
        InfectionState {
            compartment: Compartment::Exposed,
            spread_probability: self.draw_spread_probability(rng),
            exposure_marker: marker,
        }
    }
}

impl InfectionModel for SeirModel {
    fn step(
        &mut self,
        state: Option<&InfectionState>,
        age: u32,
        risk: Risk,
        infection_probability: f64,
        rng: &mut dyn RngCore,
    ) -> InfectionState {
        let Some(state) = state else {
            if self.num_seeded < self.pandemic_start_limit
                && rng.random::<f64>() < self.seed_probability
            {
                self.num_seeded += 1;
                trace!("seeding exposure {} of {}", self.num_seeded, self.pandemic_start_limit);
                return self.expose(None, rng);
            }
            return self.step(
                Some(&InfectionState::susceptible()),
                age,
                risk,
                infection_probability,
                rng,
            );
        };

        let params = &self.params;
        let next = match state.compartment {
            Compartment::Susceptible => {
                let draw = rng.random::<f64>();
                if draw < infection_probability {
                    return self.expose(Some(draw), rng);
                }
                Compartment::Susceptible
            }
            Compartment::Exposed => {
                let tau = params.asymptomatic_proportion;
                self.transition(
                    Compartment::Exposed,
                    &[
                        (tau * params.exposed_rate, Compartment::Asymptomatic),
                        ((1.0 - tau) * params.exposed_rate, Compartment::PreSymptomatic),
                    ],
                    rng,
                )
            }
            Compartment::Asymptomatic => self.transition(
                Compartment::Asymptomatic,
                &[(params.asymptomatic_recovery_rate, Compartment::Recovered)],
                rng,
            ),
            Compartment::PreSymptomatic => self.transition(
                Compartment::PreSymptomatic,
                &[(params.pre_symptomatic_rate, Compartment::Symptomatic)],
                rng,
            ),
            Compartment::Symptomatic => {
                let pi = params.hospitalization_ratio(age, risk);
                self.transition(
                    Compartment::Symptomatic,
                    &[
                        ((1.0 - pi) * params.symptomatic_recovery_rate, Compartment::Recovered),
                        (pi * params.hospitalization_rate, Compartment::Hospitalized),
                    ],
                    rng,
                )
            }
            Compartment::Hospitalized => {
                let nu = params.fatality_ratio(age);
                self.transition(
                    Compartment::Hospitalized,
                    &[
                        ((1.0 - nu) * params.hospital_recovery_rate, Compartment::Recovered),
                        (nu * params.hospital_death_rate, Compartment::Dead),
                    ],
                    rng,
                )
            }
            Compartment::Recovered | Compartment::Dead => state.compartment,
        };
        InfectionState::new(next, state.spread_probability)
    }

    fn reset(&mut self) {
        self.num_seeded = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infection::InfectionSummary;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    fn model(pandemic_start_limit: usize) -> SeirModel {
        SeirModel::with_spread(SpreadProbabilityParams::default(), pandemic_start_limit).unwrap()
    }

    #[test]
    fn age_groups() {
        assert_eq!(age_group(0), 0);
        assert_eq!(age_group(4), 0);
        assert_eq!(age_group(5), 1);
        assert_eq!(age_group(18), 2);
        assert_eq!(age_group(64), 3);
        assert_eq!(age_group(65), 4);
        assert_eq!(age_group(110), 4);
    }

    #[test]
    fn certain_exposure_sets_marker() {
        let mut model = model(0);
        let mut rng = SmallRng::seed_from_u64(1);
        let state = model.step(None, 30, Risk::Low, 1.0, &mut rng);
        assert_eq!(state.compartment, Compartment::Exposed);
        let marker = state.exposure_marker.unwrap();
        assert!((0.0..1.0).contains(&marker));
        assert!((0.0..=1.0).contains(&state.spread_probability));

        // The marker is only reported on the update that caused the exposure.
        let next = model.step(Some(&state), 30, Risk::Low, 0.0, &mut rng);
        assert!(next.exposure_marker.is_none());
    }

    #[test]
    fn no_exposure_without_probability() {
        let mut model = model(0);
        let mut rng = SmallRng::seed_from_u64(1);
        let mut state = None;
        for _ in 0..100 {
            state = Some(model.step(state.as_ref(), 30, Risk::High, 0.0, &mut rng));
        }
        assert_eq!(state.unwrap().summary(), InfectionSummary::None);
    }

    #[test]
    fn seeding_is_limited_and_unattributed() {
        let mut model = SeirModel::new(
            SeirParams::default(),
            SpreadProbabilityParams::default(),
            3,
            1.0,
        )
        .unwrap();
        let mut rng = SmallRng::seed_from_u64(5);
        let states: Vec<_> = (0..10)
            .map(|_| model.step(None, 30, Risk::Low, 0.0, &mut rng))
            .collect();
        let seeded: Vec<_> = states
            .iter()
            .filter(|s| s.compartment == Compartment::Exposed)
            .collect();
        assert_eq!(seeded.len(), 3);
        assert!(seeded.iter().all(|s| s.exposure_marker.is_none()));
        assert_eq!(model.num_seeded(), 3);

        model.reset();
        assert_eq!(model.num_seeded(), 0);
    }

    #[test]
    fn transitions_follow_state_machine() {
        let mut model = model(5);
        let mut rng = SmallRng::seed_from_u64(11);
        for person in 0..200 {
            let age = person % 90;
            let risk = if person % 3 == 0 { Risk::High } else { Risk::Low };
            let mut state: Option<InfectionState> = None;
            for _ in 0..120 {
                let previous = crate::infection::summary_of(state.as_ref());
                let next = model.step(state.as_ref(), age, risk, 0.2, &mut rng);
                assert!(
                    next.summary().may_follow(previous),
                    "{previous:?} -> {:?}",
                    next.summary()
                );
                state = Some(next);
            }
        }
    }

    #[test]
    fn everybody_leaves_exposed_eventually() {
        let mut model = model(0);
        let mut rng = SmallRng::seed_from_u64(3);
        let mut state = InfectionState::new(Compartment::Exposed, 0.1);
        for _ in 0..365 {
            state = model.step(Some(&state), 40, Risk::Low, 0.0, &mut rng);
        }
        assert!(matches!(
            state.summary(),
            InfectionSummary::Recovered | InfectionSummary::Dead
        ));
    }

    #[test]
    fn rejects_invalid_configuration() {
        let spread = SpreadProbabilityParams {
            mean: 0.02,
            sigma: -1.0,
        };
        assert!(SeirModel::with_spread(spread, 5).is_err());
        assert!(SeirModel::new(
            SeirParams::default(),
            SpreadProbabilityParams::default(),
            5,
            1.5
        )
        .is_err());
    }
}
