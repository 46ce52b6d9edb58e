//! The testing state machine: per-person test results, the global counters they feed and the
//! policy that decides who gets tested.
//!
//! A test result maps onto an [`InfectionSummary`] bucket (see [`TestResult::to_summary`]). The
//! [`GlobalTestingState`] counters are only ever changed by moving one person from the bucket of
//! their previous result to the bucket of their new result, so they always sum to the population
//! size. The engine re-derives the buckets from every person after each tick and panics if they
//! disagree.
use std::collections::BTreeMap;

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::error::PandemicError;
use crate::infection::InfectionSummary;
use crate::person::{PersonState, Strain};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TestResult {
    #[default]
    Untested,
    Negative,
    Positive,
    Critical,
    Dead,
}

impl TestResult {
    /// Bucket of this result. A negative result after a positive or critical one means the person
    /// recovered.
    #[must_use]
    pub fn to_summary(self, previous: Option<TestResult>) -> InfectionSummary {
        match self {
            TestResult::Untested => InfectionSummary::None,
            TestResult::Negative => match previous {
                Some(TestResult::Positive | TestResult::Critical) => InfectionSummary::Recovered,
                _ => InfectionSummary::None,
            },
            TestResult::Positive => InfectionSummary::Infected,
            TestResult::Critical => InfectionSummary::Critical,
            TestResult::Dead => InfectionSummary::Dead,
        }
    }
}

/// Population-wide test counters for one view (primary, variant or combined).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalTestingState {
    pub summary: BTreeMap<InfectionSummary, usize>,
    pub num_tests: usize,
}

impl GlobalTestingState {
    /// Everybody starts untested, i.e. in the `None` bucket.
    #[must_use]
    pub fn new(population_size: usize) -> GlobalTestingState {
        let summary = InfectionSummary::ALL
            .into_iter()
            .map(|s| {
                let count = if s == InfectionSummary::None {
                    population_size
                } else {
                    0
                };
                (s, count)
            })
            .collect();
        GlobalTestingState {
            summary,
            num_tests: 0,
        }
    }

    #[must_use]
    pub fn count(&self, summary: InfectionSummary) -> usize {
        self.summary.get(&summary).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.summary.values().sum()
    }

    /// Moves one person from the bucket of `previous` to the bucket of `new`.
    ///
    /// # Panics
    ///
    /// Panics if the bucket being decremented is empty.
    pub fn record(&mut self, new: TestResult, previous: TestResult) {
        if new == previous {
            return;
        }
        let new_summary = new.to_summary(Some(previous));
        let mut previous_summary = previous.to_summary(None);
        // A negative after recovery was counted as `Recovered`; if nobody is left in `None`
        // the person must be there.
        // TODO: track the bucket each person is counted in instead of guessing it here.
        if previous_summary == InfectionSummary::None && self.count(InfectionSummary::None) == 0 {
            previous_summary = InfectionSummary::Recovered;
        }
        let previous_count = self.summary.entry(previous_summary).or_insert(0);
        assert!(
            *previous_count > 0,
            "testing bucket {previous_summary:?} is empty while moving a person to {new_summary:?}"
        );
        *previous_count -= 1;
        *self.summary.entry(new_summary).or_insert(0) += 1;
        self.num_tests += 1;
    }

    /// Recounts the buckets from every person's result in this view and panics if they disagree
    /// with the counters. Persons whose last result is negative may be counted either as `None`
    /// or as `Recovered`.
    ///
    /// # Panics
    ///
    /// Panics on any mismatch.
    pub fn check<'a>(
        &self,
        view: &str,
        results: impl IntoIterator<Item = &'a TestResult>,
        population_size: usize,
    ) {
        let mut expected: BTreeMap<InfectionSummary, usize> = BTreeMap::new();
        for result in results {
            let bucket = match result {
                TestResult::Untested | TestResult::Negative => InfectionSummary::None,
                other => other.to_summary(None),
            };
            *expected.entry(bucket).or_insert(0) += 1;
        }
        let expected_count = |s| expected.get(&s).copied().unwrap_or(0);
        assert_eq!(
            self.total(),
            population_size,
            "{view} testing counts do not sum to the population size: {:?}",
            self.summary
        );
        assert_eq!(
            expected_count(InfectionSummary::None),
            self.count(InfectionSummary::None) + self.count(InfectionSummary::Recovered),
            "{view} testing state disagrees with person results on untested/negative: {:?}",
            self.summary
        );
        for bucket in [
            InfectionSummary::Exposed,
            InfectionSummary::Infected,
            InfectionSummary::Critical,
            InfectionSummary::Dead,
        ] {
            assert_eq!(
                expected_count(bucket),
                self.count(bucket),
                "{view} testing state disagrees with person results on {bucket:?}: {:?}",
                self.summary
            );
        }
    }
}

/// New results of one test, per view.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TestOutcome {
    pub combined: TestResult,
    pub primary: TestResult,
    pub variant: TestResult,
}

/// Decides who is tested and what the tests say.
pub trait PandemicTesting: Send {
    fn admit_person(&self, person: &PersonState, rng: &mut dyn RngCore) -> bool;

    fn test_person(&self, person: &PersonState, rng: &mut dyn RngCore) -> TestOutcome;
}

/// Tests persons at random with rates depending on their condition, with false positive and
/// false negative noise.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomPandemicTesting {
    pub spontaneous_testing_rate: f64,
    pub symp_testing_rate: f64,
    pub critical_testing_rate: f64,
    pub retest_rate: f64,
    pub false_positive_rate: f64,
    pub false_negative_rate: f64,
}

impl Default for RandomPandemicTesting {
    fn default() -> Self {
        RandomPandemicTesting {
            spontaneous_testing_rate: 1.0,
            symp_testing_rate: 1.0,
            critical_testing_rate: 1.0,
            retest_rate: 0.033,
            false_positive_rate: 0.0,
            false_negative_rate: 0.0,
        }
    }
}

impl RandomPandemicTesting {
    pub fn validate(&self) -> Result<(), PandemicError> {
        for (name, rate) in [
            ("spontaneous_testing_rate", self.spontaneous_testing_rate),
            ("symp_testing_rate", self.symp_testing_rate),
            ("critical_testing_rate", self.critical_testing_rate),
            ("retest_rate", self.retest_rate),
            ("false_positive_rate", self.false_positive_rate),
            ("false_negative_rate", self.false_negative_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(PandemicError::InvalidConfig(format!(
                    "{name} must be within [0, 1], got {rate}"
                )));
            }
        }
        Ok(())
    }

    fn test_summary(&self, summary: InfectionSummary, rng: &mut dyn RngCore) -> TestResult {
        match summary {
            InfectionSummary::Dead => TestResult::Dead,
            InfectionSummary::Infected | InfectionSummary::Critical => {
                if rng.random::<f64>() < self.false_negative_rate {
                    TestResult::Negative
                } else if summary == InfectionSummary::Critical {
                    TestResult::Critical
                } else {
                    TestResult::Positive
                }
            }
            _ => {
                if rng.random::<f64>() < self.false_positive_rate {
                    TestResult::Positive
                } else {
                    TestResult::Negative
                }
            }
        }
    }
}

impl PandemicTesting for RandomPandemicTesting {
    fn admit_person(&self, person: &PersonState, rng: &mut dyn RngCore) -> bool {
        if person.test_result == TestResult::Dead {
            return false;
        }
        if person.is_dead() {
            return true;
        }
        let rate = if person.tested_positive() {
            self.retest_rate
        } else if person.is_critical() {
            self.critical_testing_rate
        } else if person.is_symptomatic() {
            self.symp_testing_rate
        } else {
            self.spontaneous_testing_rate
        };
        rng.random::<f64>() < rate
    }

    fn test_person(&self, person: &PersonState, rng: &mut dyn RngCore) -> TestOutcome {
        if person.is_dead() {
            return TestOutcome {
                combined: TestResult::Dead,
                primary: TestResult::Dead,
                variant: TestResult::Dead,
            };
        }
        TestOutcome {
            combined: self.test_summary(person.infection_summary(), rng),
            primary: self.test_summary(person.strain(Strain::Primary).summary(), rng),
            variant: self.test_summary(person.strain(Strain::Variant).summary(), rng),
        }
    }
}
