//! Regulations: government-style policies applied atomically to every location and person.
//!
//! A [`PandemicRegulation`] is not a delta. Imposing one replaces whatever the previous
//! regulation set, so applying the same regulation twice leaves the simulation unchanged.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::PandemicError;
use crate::location::{LocationRule, LocationType, RuleValue};
use crate::person::Risk;

/// How a regulation changes the contact rates of every location.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum SocialDistancing {
    /// Leave contact rates as they are.
    #[default]
    Unchanged,
    /// Restore every location's initial contact rate.
    Default,
    /// Scale the initial contact fractions by `1 - level`; minimums are kept.
    Level(f64),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PandemicRegulation {
    pub stage: u32,
    pub social_distancing: SocialDistancing,
    /// Rule overrides per location type. A contact rate derived from `social_distancing`
    /// replaces an override's contact rate.
    pub location_type_rules: BTreeMap<LocationType, LocationRule>,
    pub stay_home_if_sick: bool,
    pub practice_good_hygiene: bool,
    pub wear_facial_coverings: bool,
    pub risk_to_avoid_location_types: BTreeMap<Risk, Vec<LocationType>>,
}

impl PandemicRegulation {
    #[must_use]
    pub fn new(stage: u32) -> PandemicRegulation {
        PandemicRegulation {
            stage,
            ..PandemicRegulation::default()
        }
    }

    #[must_use]
    pub fn with_social_distancing(mut self, social_distancing: SocialDistancing) -> Self {
        self.social_distancing = social_distancing;
        self
    }

    /// Merges `rule` into the override for `location_type`.
    #[must_use]
    pub fn with_rule(mut self, location_type: LocationType, rule: LocationRule) -> Self {
        let merged = self
            .location_type_rules
            .remove(&location_type)
            .unwrap_or_default()
            .merge(rule);
        self.location_type_rules.insert(location_type, merged);
        self
    }

    #[must_use]
    pub fn with_stay_home_if_sick(mut self, stay_home_if_sick: bool) -> Self {
        self.stay_home_if_sick = stay_home_if_sick;
        self
    }

    #[must_use]
    pub fn with_good_hygiene(mut self, practice_good_hygiene: bool) -> Self {
        self.practice_good_hygiene = practice_good_hygiene;
        self
    }

    #[must_use]
    pub fn with_facial_coverings(mut self, wear_facial_coverings: bool) -> Self {
        self.wear_facial_coverings = wear_facial_coverings;
        self
    }

    #[must_use]
    pub fn with_avoided_location_types(
        mut self,
        risk: Risk,
        location_types: Vec<LocationType>,
    ) -> Self {
        self.risk_to_avoid_location_types.insert(risk, location_types);
        self
    }

    /// Rule pushed to every location of `location_type`, without the distancing contact rate.
    #[must_use]
    pub fn rule_for(&self, location_type: LocationType) -> LocationRule {
        self.location_type_rules
            .get(&location_type)
            .cloned()
            .unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), PandemicError> {
        if let SocialDistancing::Level(level) = self.social_distancing {
            if !(0.0..=1.0).contains(&level) {
                return Err(PandemicError::InvalidRegulation(format!(
                    "stage {}: social distancing level must be within [0, 1], got {level}",
                    self.stage
                )));
            }
        }
        for (location_type, rule) in &self.location_type_rules {
            rule.validate_for(*location_type).map_err(|e| {
                PandemicError::InvalidRegulation(format!(
                    "stage {}: {location_type:?}: {e}",
                    self.stage
                ))
            })?;
        }
        Ok(())
    }
}

fn lock_rules(
    location_types: &[LocationType],
    locked: bool,
) -> impl Iterator<Item = (LocationType, LocationRule)> + '_ {
    location_types.iter().map(move |&location_type| {
        let rule = LocationRule {
            lock: RuleValue::Set(locked),
            ..LocationRule::default()
        };
        (location_type, rule)
    })
}

/// Five regulations of increasing restriction, stages 0 through 4.
#[must_use]
pub fn default_regulations() -> Vec<PandemicRegulation> {
    use LocationType::{Bar, HairSalon, Office, Restaurant, RetailStore, School};
    let lockable: Vec<LocationType> = LocationType::ALL
        .into_iter()
        .filter(|t| t.is_lockable())
        .collect();
    let stages: [(f64, &[LocationType], Vec<LocationType>, Vec<LocationType>); 5] = [
        (0.0, &[], vec![], vec![]),
        (0.2, &[], vec![], vec![Bar, Restaurant, HairSalon]),
        (0.3, &[Bar], vec![Bar], vec![Bar, Restaurant, HairSalon, RetailStore]),
        (
            0.5,
            &[Bar, Restaurant, HairSalon, School],
            vec![Bar, Restaurant, HairSalon],
            vec![Bar, Restaurant, HairSalon, RetailStore, Office],
        ),
        (
            0.7,
            &[Bar, Restaurant, HairSalon, School, Office, RetailStore],
            vec![Bar, Restaurant, HairSalon, RetailStore],
            vec![Bar, Restaurant, HairSalon, RetailStore, Office],
        ),
    ];

    stages
        .into_iter()
        .zip(0u32..)
        .map(|((distancing, locked, avoid_low, avoid_high), stage)| {
            let mut regulation = PandemicRegulation::new(stage)
                .with_stay_home_if_sick(stage >= 1)
                .with_good_hygiene(stage >= 1)
                .with_facial_coverings(stage >= 2)
                .with_avoided_location_types(Risk::Low, avoid_low)
                .with_avoided_location_types(Risk::High, avoid_high);
            regulation.social_distancing = if stage == 0 {
                SocialDistancing::Default
            } else {
                SocialDistancing::Level(distancing)
            };
            // Unlock everything first so that a lower stage lifts a higher stage's locks.
            regulation.location_type_rules = lock_rules(&lockable, false).collect();
            for (location_type, rule) in lock_rules(locked, true) {
                regulation = regulation.with_rule(location_type, rule);
            }
            regulation
        })
        .collect()
}

/// Run `stage` until `end_day` (exclusive); `None` means forever.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSchedule {
    pub stage: u32,
    pub end_day: Option<u32>,
}

/// Stage in effect on `day`, or `None` once the schedule has run out.
#[must_use]
pub fn stage_for_day(schedule: &[StageSchedule], day: u32) -> Option<u32> {
    schedule
        .iter()
        .find(|entry| entry.end_day.is_none_or(|end_day| day < end_day))
        .map(|entry| entry.stage)
}
