//! Simulated time. A [`SimTime`] is a day counter plus an hour-of-day tick; one engine step
//! advances it by one hour. [`SimTimeInterval`] expresses the periodic triggers ("every N days")
//! that drive infection updates, testing and contact tracer rotation.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::error::PandemicError;

/// Number of ticks in a simulated day.
pub const HOURS_PER_DAY: u32 = 24;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime {
    pub day: u32,
    pub hour: u32,
}

impl SimTime {
    /// # Panics
    ///
    /// Panics if `hour >= HOURS_PER_DAY`.
    #[must_use]
    pub fn new(day: u32, hour: u32) -> SimTime {
        assert!(hour < HOURS_PER_DAY, "hour {hour} out of range");
        SimTime { day, hour }
    }

    /// Advances one tick. Time never decreases.
    pub fn step(&mut self) {
        self.hour += 1;
        if self.hour == HOURS_PER_DAY {
            self.hour = 0;
            self.day += 1;
        }
    }

    /// Ticks elapsed since day 0, hour 0.
    #[must_use]
    pub fn total_hours(&self) -> u64 {
        u64::from(self.day) * u64::from(HOURS_PER_DAY) + u64::from(self.hour)
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {} hour {:02}", self.day, self.hour)
    }
}

/// A periodic trigger.
///
/// With `day > 0` the interval fires at `offset_hour` of every `day`-th day counted from
/// `offset_day`. Otherwise, with `hour > 0`, it fires every `hour` ticks counted from
/// `offset_day`/`offset_hour`. An interval with both set to zero never fires and is rejected by
/// [`SimTimeInterval::validate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimTimeInterval {
    pub day: u32,
    pub hour: u32,
    pub offset_day: u32,
    pub offset_hour: u32,
}

impl SimTimeInterval {
    /// Fires on the last tick of every `days`-th day, so that everything accumulated during the
    /// day is seen by the trigger.
    #[must_use]
    pub fn days(days: u32) -> SimTimeInterval {
        SimTimeInterval {
            day: days,
            hour: 0,
            offset_day: 0,
            offset_hour: HOURS_PER_DAY - 1,
        }
    }

    /// Fires every `hours` ticks, starting with the first tick.
    #[must_use]
    pub fn hours(hours: u32) -> SimTimeInterval {
        SimTimeInterval {
            day: 0,
            hour: hours,
            offset_day: 0,
            offset_hour: 0,
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset_day: u32, offset_hour: u32) -> SimTimeInterval {
        self.offset_day = offset_day;
        self.offset_hour = offset_hour;
        self
    }

    /// Simulated time between two firings, in days.
    #[must_use]
    pub fn length_in_days(&self) -> f64 {
        if self.day > 0 {
            f64::from(self.day)
        } else {
            f64::from(self.hour) / f64::from(HOURS_PER_DAY)
        }
    }

    pub fn validate(&self) -> Result<(), PandemicError> {
        if self.day == 0 && self.hour == 0 {
            return Err(PandemicError::InvalidConfig(
                "time interval must span at least one day or one hour".to_string(),
            ));
        }
        if self.offset_hour >= HOURS_PER_DAY {
            return Err(PandemicError::InvalidConfig(format!(
                "interval offset hour {} out of range",
                self.offset_hour
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn trigger_at_interval(&self, sim_time: SimTime) -> bool {
        if sim_time.day < self.offset_day {
            return false;
        }
        if self.day > 0 {
            sim_time.hour == self.offset_hour && (sim_time.day - self.offset_day) % self.day == 0
        } else if self.hour > 0 {
            let offset = SimTime {
                day: self.offset_day,
                hour: self.offset_hour,
            }
            .total_hours();
            let now = sim_time.total_hours();
            now >= offset && (now - offset) % u64::from(self.hour) == 0
        } else {
            false
        }
    }
}

impl Default for SimTimeInterval {
    fn default() -> Self {
        SimTimeInterval::days(1)
    }
}
