//! Engine options, loadable from JSON.
//!
//! Every field has a default, so a configuration file only needs to name what it changes:
//!
//! ```json
//! {
//!     "seed": 42,
//!     "infection_threshold": 20,
//!     "variant_start_day_lo": 30,
//!     "variant_start_day_hi": 60
//! }
//! ```
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PandemicError;
use crate::infection::SpreadProbabilityParams;
use crate::location::LocationType;
use crate::log::info;
use crate::testing::RandomPandemicTesting;
use crate::time::SimTimeInterval;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PandemicSimOpts {
    /// Base seed of every random stream of the engine.
    pub seed: u64,
    pub infection_spread_rate_mean: f64,
    pub infection_spread_rate_sigma: f64,
    pub variant_spread_rate_mean: f64,
    pub variant_spread_rate_sigma: f64,
    /// Number of never-exposed persons each infection model may seed spontaneously.
    pub pandemic_start_limit: usize,
    pub variant_pandemic_start_limit: usize,
    /// Probability that a never-exposed person is seeded, while the limit allows it.
    pub pandemic_seed_probability: f64,
    pub spontaneous_testing_rate: f64,
    pub symp_testing_rate: f64,
    pub critical_testing_rate: f64,
    pub retest_rate: f64,
    pub testing_false_positive_rate: f64,
    pub testing_false_negative_rate: f64,
    pub use_contact_tracer: bool,
    pub contact_tracer_history_size: usize,
    /// `infection_above_threshold` is set once this many persons tested positive.
    pub infection_threshold: usize,
    /// Reported only; not enforced by the engine.
    pub hospital_capacity: usize,
    /// The variant start day is drawn from `[lo, hi)`; `lo == hi` fixes it.
    pub variant_start_day_lo: u32,
    pub variant_start_day_hi: u32,
    pub infection_update_interval: SimTimeInterval,
    pub testing_interval: SimTimeInterval,
    pub contact_tracer_interval: SimTimeInterval,
    /// Construction fails unless at least one location of each of these types exists.
    pub required_location_types: Vec<LocationType>,
}

impl Default for PandemicSimOpts {
    fn default() -> Self {
        let testing = RandomPandemicTesting::default();
        PandemicSimOpts {
            seed: 0,
            infection_spread_rate_mean: 0.02,
            infection_spread_rate_sigma: 0.01,
            variant_spread_rate_mean: 0.03,
            variant_spread_rate_sigma: 0.01,
            pandemic_start_limit: 5,
            variant_pandemic_start_limit: 5,
            pandemic_seed_probability: 0.05,
            spontaneous_testing_rate: testing.spontaneous_testing_rate,
            symp_testing_rate: testing.symp_testing_rate,
            critical_testing_rate: testing.critical_testing_rate,
            retest_rate: testing.retest_rate,
            testing_false_positive_rate: testing.false_positive_rate,
            testing_false_negative_rate: testing.false_negative_rate,
            use_contact_tracer: false,
            contact_tracer_history_size: 10,
            infection_threshold: 10,
            hospital_capacity: 10,
            variant_start_day_lo: 366,
            variant_start_day_hi: 367,
            infection_update_interval: SimTimeInterval::days(1),
            testing_interval: SimTimeInterval::days(1),
            contact_tracer_interval: SimTimeInterval::days(1),
            required_location_types: Vec::new(),
        }
    }
}

impl PandemicSimOpts {
    /// Reads and validates options from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the options are invalid.
    pub fn load_from_file(path: &Path) -> Result<PandemicSimOpts, PandemicError> {
        info!("loading simulation options from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        let opts: PandemicSimOpts = serde_json::from_reader(reader)?;
        opts.validate()?;
        Ok(opts)
    }

    /// Parses and validates options from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string cannot be parsed or the options are invalid.
    pub fn from_json_str(json: &str) -> Result<PandemicSimOpts, PandemicError> {
        let opts: PandemicSimOpts = serde_json::from_str(json)?;
        opts.validate()?;
        Ok(opts)
    }

    #[must_use]
    pub fn primary_spread(&self) -> SpreadProbabilityParams {
        SpreadProbabilityParams {
            mean: self.infection_spread_rate_mean,
            sigma: self.infection_spread_rate_sigma,
        }
    }

    #[must_use]
    pub fn variant_spread(&self) -> SpreadProbabilityParams {
        SpreadProbabilityParams {
            mean: self.variant_spread_rate_mean,
            sigma: self.variant_spread_rate_sigma,
        }
    }

    #[must_use]
    pub fn testing(&self) -> RandomPandemicTesting {
        RandomPandemicTesting {
            spontaneous_testing_rate: self.spontaneous_testing_rate,
            symp_testing_rate: self.symp_testing_rate,
            critical_testing_rate: self.critical_testing_rate,
            retest_rate: self.retest_rate,
            false_positive_rate: self.testing_false_positive_rate,
            false_negative_rate: self.testing_false_negative_rate,
        }
    }

    pub fn validate(&self) -> Result<(), PandemicError> {
        for (name, spread) in [
            ("infection", self.primary_spread()),
            ("variant", self.variant_spread()),
        ] {
            if !(0.0..=1.0).contains(&spread.mean) {
                return Err(PandemicError::InvalidConfig(format!(
                    "{name} spread rate mean must be within [0, 1], got {}",
                    spread.mean
                )));
            }
            if !spread.sigma.is_finite() || spread.sigma < 0.0 {
                return Err(PandemicError::InvalidConfig(format!(
                    "{name} spread rate sigma must be finite and non-negative, got {}",
                    spread.sigma
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.pandemic_seed_probability) {
            return Err(PandemicError::InvalidConfig(format!(
                "pandemic_seed_probability must be within [0, 1], got {}",
                self.pandemic_seed_probability
            )));
        }
        self.testing().validate()?;
        if self.use_contact_tracer && self.contact_tracer_history_size == 0 {
            return Err(PandemicError::InvalidConfig(
                "contact_tracer_history_size must be positive".to_string(),
            ));
        }
        if self.variant_start_day_lo > self.variant_start_day_hi {
            return Err(PandemicError::InvalidConfig(format!(
                "variant start range [{}, {}) is empty",
                self.variant_start_day_lo, self.variant_start_day_hi
            )));
        }
        self.infection_update_interval.validate()?;
        self.testing_interval.validate()?;
        self.contact_tracer_interval.validate()?;
        Ok(())
    }
}
