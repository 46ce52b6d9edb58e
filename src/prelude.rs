pub use crate::config::PandemicSimOpts;
pub use crate::contacts::{ContactTracer, MaxSlotContactTracer};
pub use crate::error::PandemicError;
pub use crate::infection::{
    Compartment, InfectionModel, InfectionState, InfectionSummary, SeirModel, SeirParams,
};
pub use crate::location::{
    ContactRate, Location, LocationId, LocationRule, LocationState, LocationType, RuleValue,
};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::person::{Person, PersonId, PersonState, Risk, RoutineEntry, Strain};
pub use crate::registry::Registry;
pub use crate::regulation::{default_regulations, PandemicRegulation, SocialDistancing};
pub use crate::report::{DailySummaryReport, Report, ReportWriter};
pub use crate::sim::{PandemicSim, PandemicSimBuilder, PandemicSimState};
pub use crate::testing::{PandemicTesting, RandomPandemicTesting, TestResult};
pub use crate::time::{SimTime, SimTimeInterval, HOURS_PER_DAY};
pub use crate::{define_report, define_rng};
